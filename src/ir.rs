use once_cell::sync::Lazy;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::fmt;

/// Closed vocabulary of node discriminants understood by the layout passes.
///
/// Anything outside the vocabulary is kept verbatim in [`NodeKind::Other`] and
/// laid out as a plain statement box.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum NodeKind {
    EventStart,
    If,
    Match,
    While,
    Foreach,
    Lock,
    ErrorHandler,
    Fork,
    ParallelFlow,
    Transaction,
    Retry,
    Empty,
    Draft,
    Comment,
    Return,
    Stop,
    Fail,
    Panic,
    Break,
    Continue,
    Variable,
    Assign,
    FunctionCall,
    MethodCall,
    RemoteActionCall,
    ResourceActionCall,
    AgentCall,
    NpFunction,
    Other(String),
}

static NODE_KINDS: Lazy<HashMap<&'static str, NodeKind>> = Lazy::new(|| {
    NodeKind::VOCABULARY
        .iter()
        .map(|kind| (kind.as_str(), kind.clone()))
        .collect()
});

impl NodeKind {
    pub const VOCABULARY: [NodeKind; 28] = [
        NodeKind::EventStart,
        NodeKind::If,
        NodeKind::Match,
        NodeKind::While,
        NodeKind::Foreach,
        NodeKind::Lock,
        NodeKind::ErrorHandler,
        NodeKind::Fork,
        NodeKind::ParallelFlow,
        NodeKind::Transaction,
        NodeKind::Retry,
        NodeKind::Empty,
        NodeKind::Draft,
        NodeKind::Comment,
        NodeKind::Return,
        NodeKind::Stop,
        NodeKind::Fail,
        NodeKind::Panic,
        NodeKind::Break,
        NodeKind::Continue,
        NodeKind::Variable,
        NodeKind::Assign,
        NodeKind::FunctionCall,
        NodeKind::MethodCall,
        NodeKind::RemoteActionCall,
        NodeKind::ResourceActionCall,
        NodeKind::AgentCall,
        NodeKind::NpFunction,
    ];

    pub fn as_str(&self) -> &str {
        match self {
            NodeKind::EventStart => "EVENT_START",
            NodeKind::If => "IF",
            NodeKind::Match => "MATCH",
            NodeKind::While => "WHILE",
            NodeKind::Foreach => "FOREACH",
            NodeKind::Lock => "LOCK",
            NodeKind::ErrorHandler => "ERROR_HANDLER",
            NodeKind::Fork => "FORK",
            NodeKind::ParallelFlow => "PARALLEL_FLOW",
            NodeKind::Transaction => "TRANSACTION",
            NodeKind::Retry => "RETRY",
            NodeKind::Empty => "EMPTY",
            NodeKind::Draft => "DRAFT",
            NodeKind::Comment => "COMMENT",
            NodeKind::Return => "RETURN",
            NodeKind::Stop => "STOP",
            NodeKind::Fail => "FAIL",
            NodeKind::Panic => "PANIC",
            NodeKind::Break => "BREAK",
            NodeKind::Continue => "CONTINUE",
            NodeKind::Variable => "VARIABLE",
            NodeKind::Assign => "ASSIGN",
            NodeKind::FunctionCall => "FUNCTION_CALL",
            NodeKind::MethodCall => "METHOD_CALL",
            NodeKind::RemoteActionCall => "REMOTE_ACTION_CALL",
            NodeKind::ResourceActionCall => "RESOURCE_ACTION_CALL",
            NodeKind::AgentCall => "AGENT_CALL",
            NodeKind::NpFunction => "NP_FUNCTION",
            NodeKind::Other(raw) => raw,
        }
    }

    /// Canonical hook name used in diagnostics, e.g. `ERROR_HANDLER` -> `ErrorHandler`.
    pub fn dispatch_name(&self) -> String {
        pascal_case(self.as_str())
    }

    pub fn is_known(&self) -> bool {
        !matches!(self, NodeKind::Other(_))
    }

    /// Groups kinds into the constructs the passes dispatch on.
    pub fn construct(&self) -> Construct {
        match self {
            NodeKind::If | NodeKind::Match => Construct::Conditional,
            NodeKind::While | NodeKind::Foreach | NodeKind::Lock => Construct::Loop,
            NodeKind::ErrorHandler => Construct::ErrorHandler,
            NodeKind::Fork => Construct::Fork,
            NodeKind::EventStart => Construct::EventStart,
            NodeKind::Empty => Construct::Empty,
            NodeKind::Draft => Construct::Draft,
            NodeKind::Comment => Construct::Comment,
            NodeKind::RemoteActionCall | NodeKind::ResourceActionCall => Construct::ApiCall,
            NodeKind::AgentCall => Construct::AgentCall,
            NodeKind::NpFunction => Construct::Prompt,
            NodeKind::ParallelFlow
            | NodeKind::Transaction
            | NodeKind::Retry
            | NodeKind::Return
            | NodeKind::Stop
            | NodeKind::Fail
            | NodeKind::Panic
            | NodeKind::Break
            | NodeKind::Continue
            | NodeKind::Variable
            | NodeKind::Assign
            | NodeKind::FunctionCall
            | NodeKind::MethodCall
            | NodeKind::Other(_) => Construct::Statement,
        }
    }

    /// Kinds whose branches the layout understands. Branches on any other
    /// kind are dropped during normalization.
    pub fn supports_branches(&self) -> bool {
        matches!(
            self,
            NodeKind::If
                | NodeKind::Match
                | NodeKind::While
                | NodeKind::Foreach
                | NodeKind::Lock
                | NodeKind::ErrorHandler
                | NodeKind::Fork
        )
    }

    pub fn terminates_flow(&self) -> bool {
        matches!(
            self,
            NodeKind::Return | NodeKind::Stop | NodeKind::Fail | NodeKind::Panic
        )
    }
}

impl From<String> for NodeKind {
    fn from(raw: String) -> Self {
        NODE_KINDS
            .get(raw.as_str())
            .cloned()
            .unwrap_or(NodeKind::Other(raw))
    }
}

impl From<&str> for NodeKind {
    fn from(raw: &str) -> Self {
        NodeKind::from(raw.to_string())
    }
}

impl From<NodeKind> for String {
    fn from(kind: NodeKind) -> Self {
        kind.as_str().to_string()
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Coarse construct families; every pass matches on these exhaustively.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Construct {
    Conditional,
    Loop,
    ErrorHandler,
    Fork,
    EventStart,
    Empty,
    Draft,
    Comment,
    ApiCall,
    AgentCall,
    Prompt,
    Statement,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum BranchKind {
    Conditional,
    Else,
    Body,
    OnFailure,
    Worker,
    Other(String),
}

impl BranchKind {
    pub fn as_str(&self) -> &str {
        match self {
            BranchKind::Conditional => "CONDITIONAL",
            BranchKind::Else => "ELSE",
            BranchKind::Body => "BODY",
            BranchKind::OnFailure => "ON_FAILURE",
            BranchKind::Worker => "WORKER",
            BranchKind::Other(raw) => raw,
        }
    }
}

impl From<String> for BranchKind {
    fn from(raw: String) -> Self {
        match raw.as_str() {
            "CONDITIONAL" => BranchKind::Conditional,
            "ELSE" => BranchKind::Else,
            "BODY" => BranchKind::Body,
            "ON_FAILURE" => BranchKind::OnFailure,
            "WORKER" => BranchKind::Worker,
            _ => BranchKind::Other(raw),
        }
    }
}

impl From<BranchKind> for String {
    fn from(kind: BranchKind) -> Self {
        kind.as_str().to_string()
    }
}

/// Role of a node the layout synthesized rather than read from the source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SyntheticRole {
    /// "Nothing here yet" target inside an empty branch.
    Placeholder,
    /// Terminator appended to a sequence (root flow, failure lane, worker lane).
    LastNode,
    /// Entry marker at the head of a failure or worker lane.
    StartNode,
    StartContainer,
    EndContainer,
    /// Join node where conditional arms reconverge.
    EndIf,
    SuggestionButton,
}

impl SyntheticRole {
    pub fn as_str(self) -> &'static str {
        match self {
            SyntheticRole::Placeholder => "empty",
            SyntheticRole::LastNode => "last",
            SyntheticRole::StartNode => "start",
            SyntheticRole::StartContainer => "start-container",
            SyntheticRole::EndContainer => "end-container",
            SyntheticRole::EndIf => "endif",
            SyntheticRole::SuggestionButton => "button",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SyntheticId {
    pub parent: NodeId,
    pub role: SyntheticRole,
    pub index: usize,
    pub label: Option<String>,
}

/// Node identity: either the id carried by the source tree or a structured
/// key for a node the layout created. Rendered to a string only on output.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum NodeId {
    Source(String),
    Synthetic(Box<SyntheticId>),
}

impl NodeId {
    pub fn new(id: impl Into<String>) -> Self {
        NodeId::Source(id.into())
    }

    pub fn synthetic(
        parent: &NodeId,
        role: SyntheticRole,
        index: usize,
        label: Option<&str>,
    ) -> Self {
        NodeId::Synthetic(Box::new(SyntheticId {
            parent: parent.clone(),
            role,
            index,
            label: label.map(str::to_string),
        }))
    }

    pub fn role(&self) -> Option<SyntheticRole> {
        match self {
            NodeId::Source(_) => None,
            NodeId::Synthetic(synthetic) => Some(synthetic.role),
        }
    }

    pub fn is_synthetic(&self) -> bool {
        matches!(self, NodeId::Synthetic(_))
    }
}

impl Default for NodeId {
    fn default() -> Self {
        NodeId::Source(String::new())
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeId::Source(id) => f.write_str(id),
            NodeId::Synthetic(synthetic) => {
                write!(
                    f,
                    "{}-{}-{}",
                    synthetic.parent,
                    synthetic.role.as_str(),
                    synthetic.index
                )?;
                if let Some(label) = &synthetic.label {
                    write!(f, "-{label}")?;
                }
                Ok(())
            }
        }
    }
}

impl Serialize for NodeId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for NodeId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        String::deserialize(deserializer).map(NodeId::Source)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct LinePosition {
    pub line: u32,
    pub offset: u32,
}

impl LinePosition {
    pub fn new(line: u32, offset: u32) -> Self {
        Self { line, offset }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LineRange {
    pub file_name: String,
    pub start_line: LinePosition,
    pub end_line: LinePosition,
}

impl LineRange {
    pub fn new(start_line: LinePosition, end_line: LinePosition) -> Self {
        Self {
            file_name: String::new(),
            start_line,
            end_line,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CodeData<K> {
    pub node: Option<K>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line_range: Option<LineRange>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_code: Option<String>,
}

impl<K> Default for CodeData<K> {
    fn default() -> Self {
        Self {
            node: None,
            line_range: None,
            source_code: None,
        }
    }
}

impl<K> CodeData<K> {
    pub fn of(kind: K) -> Self {
        Self {
            node: Some(kind),
            line_range: None,
            source_code: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Metadata {
    pub label: String,
    pub description: String,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub draft: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Property {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Metadata>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
    pub optional: bool,
    pub editable: bool,
    pub advanced: bool,
    pub hidden: bool,
}

impl Property {
    pub fn with_value(value: Value) -> Self {
        Self {
            value: Some(value),
            editable: true,
            ..Default::default()
        }
    }

    pub fn has_value(&self) -> bool {
        match &self.value {
            None | Some(Value::Null) => false,
            Some(Value::String(text)) => !text.is_empty(),
            Some(Value::Array(items)) => !items.is_empty(),
            Some(Value::Bool(flag)) => *flag,
            Some(_) => true,
        }
    }
}

pub type Properties = BTreeMap<String, Property>;

/// Own and container footprint of a node or branch, in half-widths from the
/// node's horizontal center.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Size {
    /// Left half-width of the node's own box.
    pub lw: f32,
    /// Right half-width of the node's own box.
    pub rw: f32,
    pub h: f32,
    /// Left half-width of everything the node encloses.
    pub clw: f32,
    pub crw: f32,
    pub ch: f32,
}

impl Size {
    pub fn leaf(lw: f32, rw: f32, h: f32) -> Self {
        Self {
            lw,
            rw,
            h,
            clw: lw,
            crw: rw,
            ch: h,
        }
    }

    pub fn container(lw: f32, rw: f32, h: f32, clw: f32, crw: f32, ch: f32) -> Self {
        Self {
            lw,
            rw,
            h,
            clw,
            crw,
            ch,
        }
    }

    pub fn width(&self) -> f32 {
        self.lw + self.rw
    }

    pub fn container_width(&self) -> f32 {
        self.clw + self.crw
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

/// Geometry slot shared by the passes. The size half is written by sizing,
/// the origin half by positioning; each stays `None` until its pass ran.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Geometry {
    size: Option<Size>,
    origin: Option<Point>,
    top_level: bool,
}

impl Geometry {
    pub fn size(&self) -> Option<&Size> {
        self.size.as_ref()
    }

    pub fn size_mut(&mut self) -> Option<&mut Size> {
        self.size.as_mut()
    }

    pub fn set_size(&mut self, size: Size) {
        self.size = Some(size);
    }

    pub fn origin(&self) -> Option<Point> {
        self.origin
    }

    pub fn set_origin(&mut self, x: f32, y: f32) {
        self.origin = Some(Point { x, y });
    }

    pub fn is_top_level(&self) -> bool {
        self.top_level
    }

    pub fn set_top_level(&mut self, top_level: bool) {
        self.top_level = top_level;
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlowNode {
    #[serde(default)]
    pub id: NodeId,
    #[serde(default)]
    pub metadata: Metadata,
    #[serde(default)]
    pub codedata: CodeData<NodeKind>,
    #[serde(default)]
    pub returning: bool,
    #[serde(default)]
    pub branches: Vec<Branch>,
    #[serde(default)]
    pub properties: Properties,
    #[serde(default)]
    pub suggested: bool,
    #[serde(skip)]
    pub geometry: Option<Geometry>,
}

impl FlowNode {
    pub fn new(id: impl Into<String>, kind: NodeKind) -> Self {
        Self::with_id(NodeId::new(id), kind)
    }

    pub fn with_id(id: NodeId, kind: NodeKind) -> Self {
        Self {
            id,
            codedata: CodeData::of(kind),
            ..Default::default()
        }
    }

    /// Synthetic `EMPTY` node with a fresh geometry slot.
    pub fn empty(id: NodeId) -> Self {
        Self {
            geometry: Some(Geometry::default()),
            ..Self::with_id(id, NodeKind::Empty)
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.metadata.label = label.into();
        self
    }

    pub fn with_branch(mut self, branch: Branch) -> Self {
        self.branches.push(branch);
        self
    }

    pub fn with_line_range(mut self, line_range: LineRange) -> Self {
        self.codedata.line_range = Some(line_range);
        self
    }

    pub fn with_property(mut self, key: impl Into<String>, value: Value) -> Self {
        self.properties.insert(key.into(), Property::with_value(value));
        self
    }

    pub fn returning(mut self, returning: bool) -> Self {
        self.returning = returning;
        self
    }

    pub fn kind(&self) -> Option<&NodeKind> {
        self.codedata.node.as_ref()
    }

    pub fn is_kind(&self, kind: &NodeKind) -> bool {
        self.kind() == Some(kind)
    }

    /// True when control does not continue past this node.
    pub fn is_returning(&self) -> bool {
        self.returning || self.kind().is_some_and(NodeKind::terminates_flow)
    }

    /// `EMPTY` node standing in for a missing statement (not a terminator).
    pub fn is_placeholder(&self) -> bool {
        self.is_kind(&NodeKind::Empty) && self.id.role() != Some(SyntheticRole::LastNode)
    }

    pub fn is_last_node_marker(&self) -> bool {
        self.is_kind(&NodeKind::Empty) && self.id.role() == Some(SyntheticRole::LastNode)
    }

    pub fn is_draft(&self) -> bool {
        self.metadata.draft
    }

    /// Whether the node renders a binding or type label under its box.
    pub fn has_binding_label(&self) -> bool {
        ["variable", "type"]
            .iter()
            .any(|key| self.properties.get(*key).is_some_and(Property::has_value))
    }

    pub fn size(&self) -> Option<&Size> {
        self.geometry.as_ref().and_then(Geometry::size)
    }

    pub fn origin(&self) -> Option<Point> {
        self.geometry.as_ref().and_then(Geometry::origin)
    }

    pub fn branch(&self, kind: &BranchKind) -> Option<&Branch> {
        self.branches
            .iter()
            .find(|branch| branch.branch_kind() == Some(kind))
    }

    pub fn branch_index(&self, kind: &BranchKind) -> Option<usize> {
        self.branches
            .iter()
            .position(|branch| branch.branch_kind() == Some(kind))
    }

    pub fn line_range(&self) -> Option<&LineRange> {
        self.codedata.line_range.as_ref()
    }

    /// Clears geometry on this node and everything below it.
    pub fn hide(&mut self) {
        self.geometry = None;
        for branch in &mut self.branches {
            branch.hide();
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Branch {
    #[serde(default)]
    pub label: String,
    /// `block` or `worker`.
    #[serde(default)]
    pub kind: String,
    #[serde(default)]
    pub codedata: CodeData<BranchKind>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repeatable: Option<String>,
    #[serde(default)]
    pub properties: Properties,
    #[serde(default)]
    pub children: Vec<FlowNode>,
    #[serde(skip)]
    pub geometry: Option<Geometry>,
}

impl Branch {
    pub fn new(label: impl Into<String>, kind: BranchKind) -> Self {
        let block_kind = if kind == BranchKind::Worker { "worker" } else { "block" };
        Self {
            label: label.into(),
            kind: block_kind.to_string(),
            codedata: CodeData::of(kind),
            ..Default::default()
        }
    }

    pub fn with_children(mut self, children: Vec<FlowNode>) -> Self {
        self.children = children;
        self
    }

    pub fn with_line_range(mut self, line_range: LineRange) -> Self {
        self.codedata.line_range = Some(line_range);
        self
    }

    pub fn branch_kind(&self) -> Option<&BranchKind> {
        self.codedata.node.as_ref()
    }

    pub fn line_range(&self) -> Option<&LineRange> {
        self.codedata.line_range.as_ref()
    }

    /// Pattern texts of a match arm, in declaration order.
    pub fn patterns(&self) -> Vec<String> {
        let Some(Value::Array(items)) = self
            .properties
            .get("patterns")
            .and_then(|p| p.value.as_ref())
        else {
            return Vec::new();
        };
        items
            .iter()
            .filter_map(|item| match item {
                Value::String(text) => Some(text.clone()),
                Value::Object(fields) => fields
                    .get("value")
                    .and_then(Value::as_str)
                    .map(str::to_string),
                _ => None,
            })
            .collect()
    }

    pub fn is_default_arm(&self) -> bool {
        self.label == "_" || self.patterns().first().is_some_and(|pattern| pattern == "_")
    }

    /// Text shown on the edge entering this branch.
    pub fn display_label(&self) -> String {
        let patterns = self.patterns();
        if patterns.is_empty() {
            self.label.clone()
        } else {
            patterns.join(" | ")
        }
    }

    pub fn has_real_children(&self) -> bool {
        self.children.iter().any(|child| !child.is_placeholder())
    }

    /// Single placeholder child and nothing else.
    pub fn is_placeholder_only(&self) -> bool {
        self.children.len() == 1 && self.children[0].is_placeholder()
    }

    pub fn size(&self) -> Option<&Size> {
        self.geometry.as_ref().and_then(Geometry::size)
    }

    pub fn origin(&self) -> Option<Point> {
        self.geometry.as_ref().and_then(Geometry::origin)
    }

    pub fn hide(&mut self) {
        self.geometry = None;
        for child in &mut self.children {
            child.hide();
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Flow {
    #[serde(default)]
    pub file_name: String,
    #[serde(default)]
    pub nodes: Vec<FlowNode>,
}

impl Flow {
    pub fn new(nodes: Vec<FlowNode>) -> Self {
        Self {
            file_name: String::new(),
            nodes,
        }
    }

    /// Depth-first search for a node by id, including synthetic ones.
    pub fn find(&self, id: &NodeId) -> Option<&FlowNode> {
        fn search<'a>(nodes: &'a [FlowNode], id: &NodeId) -> Option<&'a FlowNode> {
            for node in nodes {
                if &node.id == id {
                    return Some(node);
                }
                for branch in &node.branches {
                    if let Some(found) = search(&branch.children, id) {
                        return Some(found);
                    }
                }
            }
            None
        }
        search(&self.nodes, id)
    }
}

fn pascal_case(raw: &str) -> String {
    raw.split('_')
        .filter(|part| !part.is_empty())
        .map(|part| {
            let lower = part.to_ascii_lowercase();
            let mut chars = lower.chars();
            match chars.next() {
                Some(first) => first.to_ascii_uppercase().to_string() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect()
}
