//! Normalization: gives every node a geometry slot, fills empty branches
//! with placeholders and brackets lanes with start/end markers, so the
//! later passes never see a branch without children.

use serde_json::json;
use tracing::{debug, warn};

use super::traverse::{FlowVisitor, traverse_flow};
use crate::config::{ErrorHandlerConfig, LayoutConfig};
use crate::ir::{
    Branch, BranchKind, Flow, FlowNode, Geometry, NodeId, NodeKind, Property, SyntheticRole,
};

const FAILURE_LANE: &str = "ON_FAILURE";
/// Kind given to nodes that arrive without a discriminant.
const UNKNOWN_KIND: &str = "UNKNOWN";

pub fn normalize(flow: &mut Flow, config: &LayoutConfig) {
    let span = tracing::debug_span!("normalize", nodes = flow.nodes.len());
    let _guard = span.enter();

    let mut visitor = InitVisitor {
        error_handlers: &config.error_handlers,
    };
    traverse_flow(&mut flow.nodes, &mut visitor);
    mark_top_level_handler(flow);
    append_terminator(flow);
}

struct InitVisitor<'a> {
    error_handlers: &'a ErrorHandlerConfig,
}

impl FlowVisitor for InitVisitor<'_> {
    fn visit_malformed(&mut self, node: &mut FlowNode) {
        warn!(node = %node.id, "node has no kind discriminant, laying out as a statement");
        node.codedata.node = Some(NodeKind::Other(UNKNOWN_KIND.to_string()));
        self.begin_node(node);
    }

    fn begin_node(&mut self, node: &mut FlowNode) {
        node.geometry = Some(Geometry::default());
        let supported = node.kind().is_some_and(NodeKind::supports_branches);
        if !supported && !node.branches.is_empty() {
            debug!(
                node = %node.id,
                branches = node.branches.len(),
                "dropping branches of unsupported construct"
            );
            node.branches.clear();
        }
    }

    fn begin_statement(&mut self, node: &mut FlowNode) {
        if let Some(kind) = node.kind().filter(|kind| !kind.is_known()) {
            warn!(node = %node.id, kind = %kind, "unknown node kind, laying out as a statement");
        }
        self.begin_node(node);
    }

    fn begin_conditional(&mut self, node: &mut FlowNode) {
        node.geometry = Some(Geometry::default());
        let id = node.id.clone();
        for (index, branch) in node.branches.iter_mut().enumerate() {
            fill_branch(&id, index, branch);
        }

        let is_match = node.is_kind(&NodeKind::Match);
        let has_default = if is_match {
            node.branches.iter().any(Branch::is_default_arm)
        } else {
            node.branches.iter().any(|branch| {
                branch.label == "Else" || branch.branch_kind() == Some(&BranchKind::Else)
            })
        };
        if has_default {
            return;
        }

        let index = node.branches.len();
        let mut branch = if is_match {
            let mut arm = Branch::new("_", BranchKind::Conditional);
            arm.repeatable = Some("ONE_OR_MORE".to_string());
            arm.properties
                .insert("patterns".to_string(), Property::with_value(json!([{ "value": "_" }])));
            arm
        } else {
            let mut arm = Branch::new("Else", BranchKind::Else);
            arm.repeatable = Some("ZERO_OR_MORE".to_string());
            arm
        };
        branch.codedata.line_range = node.codedata.line_range.clone();
        let mut placeholder = FlowNode::empty(NodeId::synthetic(
            &id,
            SyntheticRole::Placeholder,
            index,
            Some(branch.label.as_str()),
        ));
        placeholder.metadata.draft = true;
        branch.children.push(placeholder);
        branch.geometry = Some(Geometry::default());
        debug!(node = %id, label = %branch.label, "synthesized draft default branch");
        node.branches.push(branch);
    }

    fn begin_loop(&mut self, node: &mut FlowNode) {
        node.geometry = Some(Geometry::default());
        if node.branches.is_empty() {
            warn!(node = %node.id, "loop without body branch, synthesizing one");
            node.branches.push(Branch::new("Body", BranchKind::Body));
        }
        if node.branches.len() > 1 {
            debug!(node = %node.id, "loop carries extra branches, keeping the body only");
            node.branches.truncate(1);
        }
        let id = node.id.clone();
        fill_branch(&id, 0, &mut node.branches[0]);
    }

    fn begin_error_handler(&mut self, node: &mut FlowNode) {
        node.geometry = Some(Geometry::default());
        let id = node.id.clone();

        let mut branches = std::mem::take(&mut node.branches);
        let body = take_branch(&mut branches, &BranchKind::Body).unwrap_or_else(|| {
            warn!(node = %id, "error handler without body branch, synthesizing one");
            Branch::new("Body", BranchKind::Body)
        });
        let failure = take_branch(&mut branches, &BranchKind::OnFailure).unwrap_or_else(|| {
            warn!(node = %id, "error handler without failure branch, synthesizing one");
            Branch::new("On Failure", BranchKind::OnFailure)
        });
        if !branches.is_empty() {
            debug!(node = %id, extra = branches.len(), "dropping extra error handler branches");
        }
        node.branches = vec![body, failure];

        fill_branch(&id, 0, &mut node.branches[0]);

        let failure = &mut node.branches[1];
        strip_lane_markers(&id, failure);
        fill_branch(&id, 1, failure);
        let mut start = FlowNode::with_id(
            NodeId::synthetic(&id, SyntheticRole::StartNode, 0, Some(FAILURE_LANE)),
            NodeKind::EventStart,
        )
        .with_label("On Error");
        start.codedata.line_range = failure.codedata.line_range.clone();
        start.geometry = Some(Geometry::default());
        failure.children.insert(0, start);
        failure.children.push(FlowNode::empty(NodeId::synthetic(
            &id,
            SyntheticRole::LastNode,
            0,
            Some(FAILURE_LANE),
        )));
    }

    fn end_error_handler(&mut self, node: &mut FlowNode) {
        if !self.error_handlers.is_collapsed(&node.id.to_string()) {
            return;
        }
        if let Some(failure) = node.branches.get_mut(1) {
            debug!(node = %node.id, "collapsing failure region");
            failure.hide();
        }
    }

    fn begin_fork(&mut self, node: &mut FlowNode) {
        node.geometry = Some(Geometry::default());
        let id = node.id.clone();
        if node.branches.is_empty() {
            let mut lane = Branch::new("Empty", BranchKind::Worker);
            lane.repeatable = Some("ZERO_OR_MORE".to_string());
            node.branches.push(lane);
        }

        for (index, lane) in node.branches.iter_mut().enumerate() {
            strip_lane_markers(&id, lane);
            fill_branch(&id, index, lane);
            let mut start = FlowNode::with_id(
                NodeId::synthetic(&id, SyntheticRole::StartNode, index, Some(lane.label.as_str())),
                NodeKind::EventStart,
            )
            .with_label(lane.label.clone());
            start.geometry = Some(Geometry::default());
            lane.children.insert(0, start);
            lane.children.push(FlowNode::empty(NodeId::synthetic(
                &id,
                SyntheticRole::LastNode,
                index,
                Some(lane.label.as_str()),
            )));
        }
    }
}

/// Drops placeholders next to real statements and gives an empty branch a
/// single placeholder.
fn fill_branch(owner: &NodeId, index: usize, branch: &mut Branch) {
    if branch.has_real_children() {
        branch.children.retain(|child| !child.is_placeholder());
    } else if branch.children.len() != 1 {
        branch.children = vec![FlowNode::empty(NodeId::synthetic(
            owner,
            SyntheticRole::Placeholder,
            index,
            Some(branch.label.as_str()),
        ))];
    }
    branch.geometry = Some(Geometry::default());
}

fn strip_lane_markers(owner: &NodeId, branch: &mut Branch) {
    branch.children.retain(|child| match &child.id {
        NodeId::Synthetic(synthetic) => {
            &synthetic.parent != owner
                || !matches!(synthetic.role, SyntheticRole::StartNode | SyntheticRole::LastNode)
        }
        NodeId::Source(_) => true,
    });
}

fn take_branch(branches: &mut Vec<Branch>, kind: &BranchKind) -> Option<Branch> {
    let index = branches
        .iter()
        .position(|branch| branch.branch_kind() == Some(kind))?;
    Some(branches.remove(index))
}

fn mark_top_level_handler(flow: &mut Flow) {
    if let Some(node) = flow.nodes.get_mut(1)
        && node.is_kind(&NodeKind::ErrorHandler)
        && let Some(geometry) = node.geometry.as_mut()
    {
        geometry.set_top_level(true);
    }
}

fn append_terminator(flow: &mut Flow) {
    let Some(last) = flow.nodes.last() else {
        return;
    };
    if last.is_returning() || last.is_last_node_marker() {
        return;
    }
    let id = NodeId::synthetic(&last.id, SyntheticRole::LastNode, 0, None);
    flow.nodes.push(FlowNode::empty(id));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::CodeData;

    fn normalized(nodes: Vec<FlowNode>) -> Flow {
        let mut flow = Flow::new(nodes);
        normalize(&mut flow, &LayoutConfig::default());
        flow
    }

    fn conditional(then: Vec<FlowNode>) -> FlowNode {
        FlowNode::new("if", NodeKind::If)
            .with_branch(Branch::new("Then", BranchKind::Conditional).with_children(then))
    }

    #[test]
    fn empty_branch_gets_placeholder_and_else_is_synthesized() {
        let flow = normalized(vec![conditional(Vec::new())]);
        let node = &flow.nodes[0];
        assert_eq!(node.branches.len(), 2);
        assert!(node.branches[0].is_placeholder_only());
        assert_eq!(node.branches[0].children[0].id.to_string(), "if-empty-0-Then");
        let otherwise = &node.branches[1];
        assert_eq!(otherwise.label, "Else");
        assert!(otherwise.is_placeholder_only());
        assert!(otherwise.children[0].is_draft());
        assert!(node.branches.iter().all(|branch| branch.geometry.is_some()));
    }

    #[test]
    fn match_gets_default_arm() {
        let arm = Branch::new("1", BranchKind::Conditional)
            .with_children(vec![FlowNode::new("a", NodeKind::Variable)]);
        let flow = normalized(vec![FlowNode::new("m", NodeKind::Match).with_branch(arm)]);
        let node = &flow.nodes[0];
        assert_eq!(node.branches.len(), 2);
        assert!(node.branches[1].is_default_arm());
        assert_eq!(node.branches[1].display_label(), "_");
    }

    #[test]
    fn normalization_is_idempotent() {
        let mut flow = normalized(vec![
            conditional(vec![FlowNode::new("a", NodeKind::Variable)]),
            FlowNode::new("eh", NodeKind::ErrorHandler)
                .with_branch(Branch::new("Body", BranchKind::Body))
                .with_branch(Branch::new("On Failure", BranchKind::OnFailure)),
            FlowNode::new("fork", NodeKind::Fork),
        ]);
        let before = serde_json::to_string(&flow).unwrap();
        normalize(&mut flow, &LayoutConfig::default());
        let after = serde_json::to_string(&flow).unwrap();
        assert_eq!(before, after);
        assert_eq!(flow.nodes[0].branches.len(), 2);
        assert_eq!(flow.nodes[0].branches[0].children.len(), 1);
    }

    #[test]
    fn failure_lane_is_bracketed() {
        let body = Branch::new("Body", BranchKind::Body)
            .with_children(vec![FlowNode::new("call", NodeKind::FunctionCall)]);
        let flow = normalized(vec![
            FlowNode::new("eh", NodeKind::ErrorHandler)
                .with_branch(body)
                .with_branch(Branch::new("On Failure", BranchKind::OnFailure)),
        ]);
        let failure = &flow.nodes[0].branches[1];
        let ids: Vec<String> = failure.children.iter().map(|c| c.id.to_string()).collect();
        assert_eq!(
            ids,
            vec!["eh-start-0-ON_FAILURE", "eh-empty-1-On Failure", "eh-last-0-ON_FAILURE"]
        );
        assert!(failure.children[0].is_kind(&NodeKind::EventStart));
        assert_eq!(failure.children[0].metadata.label, "On Error");
    }

    #[test]
    fn collapsed_failure_region_loses_geometry() {
        let mut config = LayoutConfig::default();
        config.error_handlers.collapse = true;
        let mut flow = Flow::new(vec![
            FlowNode::new("eh", NodeKind::ErrorHandler)
                .with_branch(Branch::new("Body", BranchKind::Body))
                .with_branch(Branch::new("On Failure", BranchKind::OnFailure)),
        ]);
        normalize(&mut flow, &config);
        let failure = &flow.nodes[0].branches[1];
        assert!(failure.geometry.is_none());
        assert!(failure.children.iter().all(|child| child.geometry.is_none()));
        assert!(flow.nodes[0].branches[0].geometry.is_some());
    }

    #[test]
    fn fork_without_lanes_gets_worker_lane() {
        let flow = normalized(vec![FlowNode::new("fork", NodeKind::Fork)]);
        let lane = &flow.nodes[0].branches[0];
        assert_eq!(lane.label, "Empty");
        assert_eq!(lane.children.len(), 3);
        assert_eq!(lane.children[0].id.role(), Some(SyntheticRole::StartNode));
        assert!(lane.children[1].is_placeholder());
        assert!(lane.children[2].is_last_node_marker());
    }

    #[test]
    fn unsupported_branches_are_dropped() {
        let flow = normalized(vec![
            FlowNode::new("p", NodeKind::ParallelFlow)
                .with_branch(Branch::new("w1", BranchKind::Worker))
                .returning(true),
        ]);
        assert!(flow.nodes[0].branches.is_empty());
        assert_eq!(flow.nodes.len(), 1);
    }

    #[test]
    fn nodes_without_kind_become_plain_statements() {
        let mut lone = FlowNode::new("lone", NodeKind::If);
        lone.codedata = CodeData::default();
        lone.branches.push(Branch::new("Then", BranchKind::Conditional));
        let mut nested = FlowNode::new("nested", NodeKind::Variable);
        nested.codedata = CodeData::default();

        let flow = normalized(vec![lone, conditional(vec![nested])]);
        let root = &flow.nodes[0];
        assert_eq!(root.kind(), Some(&NodeKind::Other(UNKNOWN_KIND.to_string())));
        assert!(root.branches.is_empty());
        assert!(root.geometry.is_some());

        let then = &flow.nodes[1].branches[0];
        assert_eq!(then.children.len(), 1);
        assert_eq!(then.children[0].id, NodeId::new("nested"));
        assert!(then.children[0].geometry.is_some());
        assert!(then.children[0].kind().is_some());
    }

    #[test]
    fn terminator_follows_non_returning_tail() {
        let flow = normalized(vec![FlowNode::new("a", NodeKind::Variable)]);
        assert_eq!(flow.nodes.len(), 2);
        assert!(flow.nodes[1].is_last_node_marker());
        assert_eq!(flow.nodes[1].id.to_string(), "a-last-0");

        let flow = normalized(vec![FlowNode::new("r", NodeKind::Return)]);
        assert_eq!(flow.nodes.len(), 1);
    }

    #[test]
    fn second_root_error_handler_is_top_level() {
        let flow = normalized(vec![
            FlowNode::new("start", NodeKind::EventStart),
            FlowNode::new("eh", NodeKind::ErrorHandler),
        ]);
        let geometry = flow.nodes[1].geometry.as_ref().unwrap();
        assert!(geometry.is_top_level());
    }
}
