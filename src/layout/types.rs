use std::collections::HashMap;
use std::fmt;

use crate::ir::{Flow, LinePosition, NodeId, NodeKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GraphNodeKind {
    Statement,
    ApiCall,
    AgentCall,
    Prompt,
    Comment,
    Draft,
    EventStart,
    Conditional,
    Loop,
    ErrorHandler,
    Fork,
    /// Placeholder inside an empty branch.
    Empty,
    /// Terminator at the end of a sequence.
    End,
    StartContainer,
    EndContainer,
    EndIf,
    Button,
}

impl GraphNodeKind {
    pub fn as_str(self) -> &'static str {
        match self {
            GraphNodeKind::Statement => "statement",
            GraphNodeKind::ApiCall => "api-call",
            GraphNodeKind::AgentCall => "agent-call",
            GraphNodeKind::Prompt => "prompt",
            GraphNodeKind::Comment => "comment",
            GraphNodeKind::Draft => "draft",
            GraphNodeKind::EventStart => "event-start",
            GraphNodeKind::Conditional => "conditional",
            GraphNodeKind::Loop => "loop",
            GraphNodeKind::ErrorHandler => "error-handler",
            GraphNodeKind::Fork => "fork",
            GraphNodeKind::Empty => "empty",
            GraphNodeKind::End => "end",
            GraphNodeKind::StartContainer => "start-container",
            GraphNodeKind::EndContainer => "end-container",
            GraphNodeKind::EndIf => "end-if",
            GraphNodeKind::Button => "button",
        }
    }
}

/// Tree node or branch that logically owns an edge or placeholder.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Owner {
    Node(NodeId),
    Branch {
        node: NodeId,
        index: usize,
        label: String,
    },
}

impl fmt::Display for Owner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Owner::Node(id) => write!(f, "{id}"),
            Owner::Branch { node, label, .. } => write!(f, "{node}/{label}"),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct NodePayload {
    pub label: String,
    pub source_kind: Option<NodeKind>,
    pub visible: bool,
    pub show_button: bool,
    pub draft: bool,
    pub insertion_target: Option<LinePosition>,
    pub owner: Option<Owner>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GraphNode {
    pub id: NodeId,
    pub kind: GraphNodeKind,
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub payload: NodePayload,
}

impl GraphNode {
    pub fn new(id: NodeId, kind: GraphNodeKind, x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            id,
            kind,
            x,
            y,
            width,
            height,
            payload: NodePayload {
                visible: true,
                ..Default::default()
            },
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.payload.label = label.into();
        self
    }

    pub fn center_x(&self) -> f32 {
        self.x + self.width / 2.0
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum EdgeId {
    /// Plain control-flow link between two graph nodes.
    Link { source: NodeId, target: NodeId },
    /// Edge entering branch `index` of a container node.
    BranchIn { node: NodeId, index: usize },
}

impl EdgeId {
    pub fn link(source: &NodeId, target: &NodeId) -> Self {
        EdgeId::Link {
            source: source.clone(),
            target: target.clone(),
        }
    }

    pub fn branch_in(node: &NodeId, index: usize) -> Self {
        EdgeId::BranchIn {
            node: node.clone(),
            index,
        }
    }
}

impl fmt::Display for EdgeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EdgeId::Link { source, target } => write!(f, "{source}-to-{target}"),
            EdgeId::BranchIn { node, index } => write!(f, "{node}-branch-{index}"),
        }
    }
}

/// Rendering hints carried on an edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EdgeHints {
    pub broken_line: bool,
    pub show_add_button: bool,
    pub show_arrow: bool,
    pub align_bottom: bool,
    pub show_button_always: bool,
}

impl Default for EdgeHints {
    fn default() -> Self {
        Self {
            broken_line: false,
            show_add_button: true,
            show_arrow: true,
            align_bottom: false,
            show_button_always: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct GraphEdge {
    pub id: EdgeId,
    pub source: NodeId,
    pub target: NodeId,
    pub label: Option<String>,
    pub insertion_target: Option<LinePosition>,
    pub owner: Option<Owner>,
    pub hints: EdgeHints,
}

/// Flat node/edge output of graph assembly, in creation order.
#[derive(Debug, Clone, Default)]
pub struct Graph {
    pub nodes: Vec<GraphNode>,
    pub edges: Vec<GraphEdge>,
    node_index: HashMap<NodeId, usize>,
    edge_index: HashMap<EdgeId, usize>,
}

impl Graph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a node. Returns `false` and keeps the first one when the id
    /// is already taken.
    pub fn add_node(&mut self, node: GraphNode) -> bool {
        if self.node_index.contains_key(&node.id) {
            return false;
        }
        self.node_index.insert(node.id.clone(), self.nodes.len());
        self.nodes.push(node);
        true
    }

    pub fn add_edge(&mut self, edge: GraphEdge) -> bool {
        if self.edge_index.contains_key(&edge.id) {
            return false;
        }
        self.edge_index.insert(edge.id.clone(), self.edges.len());
        self.edges.push(edge);
        true
    }

    pub fn contains(&self, id: &NodeId) -> bool {
        self.node_index.contains_key(id)
    }

    pub fn node(&self, id: &NodeId) -> Option<&GraphNode> {
        self.node_index.get(id).map(|idx| &self.nodes[*idx])
    }

    pub fn node_mut(&mut self, id: &NodeId) -> Option<&mut GraphNode> {
        self.node_index.get(id).map(|idx| &mut self.nodes[*idx])
    }

    pub fn edge(&self, id: &EdgeId) -> Option<&GraphEdge> {
        self.edge_index.get(id).map(|idx| &self.edges[*idx])
    }

    pub fn edge_mut(&mut self, id: &EdgeId) -> Option<&mut GraphEdge> {
        self.edge_index.get(id).map(|idx| &mut self.edges[*idx])
    }

    pub fn edges_from<'a, 'b>(
        &'a self,
        id: &'b NodeId,
    ) -> impl Iterator<Item = &'a GraphEdge> + use<'a, 'b> {
        self.edges.iter().filter(move |edge| &edge.source == id)
    }

    pub fn edges_to<'a, 'b>(
        &'a self,
        id: &'b NodeId,
    ) -> impl Iterator<Item = &'a GraphEdge> + use<'a, 'b> {
        self.edges.iter().filter(move |edge| &edge.target == id)
    }

    /// Ids of the edges leaving `id`, in creation order.
    pub fn outgoing_ids(&self, id: &NodeId) -> Vec<EdgeId> {
        self.edges_from(id).map(|edge| edge.id.clone()).collect()
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }
}

/// Axis-aligned box around the visible graph nodes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub min_x: f32,
    pub min_y: f32,
    pub max_x: f32,
    pub max_y: f32,
}

impl Bounds {
    pub fn of_graph(graph: &Graph) -> Option<Self> {
        let mut visible = graph.nodes.iter().filter(|node| node.payload.visible);
        let first = visible.next()?;
        let mut bounds = Bounds {
            min_x: first.x,
            min_y: first.y,
            max_x: first.x + first.width,
            max_y: first.y + first.height,
        };
        for node in visible {
            bounds.min_x = bounds.min_x.min(node.x);
            bounds.min_y = bounds.min_y.min(node.y);
            bounds.max_x = bounds.max_x.max(node.x + node.width);
            bounds.max_y = bounds.max_y.max(node.y + node.height);
        }
        Some(bounds)
    }

    pub fn width(&self) -> f32 {
        self.max_x - self.min_x
    }

    pub fn height(&self) -> f32 {
        self.max_y - self.min_y
    }

    pub fn center(&self) -> (f32, f32) {
        (
            (self.min_x + self.max_x) / 2.0,
            (self.min_y + self.max_y) / 2.0,
        )
    }
}

/// Result of one full pipeline run.
#[derive(Debug, Clone)]
pub struct Layout {
    /// Normalized, sized and positioned copy of the input tree.
    pub tree: Flow,
    pub graph: Graph,
    pub width: f32,
    pub height: f32,
}

impl Layout {
    pub fn bounds(&self) -> Option<Bounds> {
        Bounds::of_graph(&self.graph)
    }
}
