//! Second assembly traversal: attaches insertion targets (the source
//! position where a statement added on an edge would be spliced) and owning
//! tree node or branch to edges and placeholders built by the node factory.

use tracing::{debug, error};

use super::traverse::{FlowVisitor, traverse_flow};
use super::types::{EdgeId, Graph, GraphNodeKind, Owner};
use crate::ir::{Branch, BranchKind, Flow, FlowNode, LinePosition, NodeId, SyntheticRole};

pub fn attach_link_targets(flow: &mut Flow, graph: &mut Graph) {
    let span = tracing::debug_span!("link_targets", edges = graph.edge_count());
    let _guard = span.enter();
    let mut visitor = LinkTargetVisitor { graph };
    traverse_flow(&mut flow.nodes, &mut visitor);
}

struct LinkTargetVisitor<'g> {
    graph: &'g mut Graph,
}

fn after(position: LinePosition, columns: u32) -> LinePosition {
    LinePosition::new(position.line, position.offset + columns)
}

fn branch_owner(node: &FlowNode, index: usize, branch: &Branch) -> Owner {
    Owner::Branch {
        node: node.id.clone(),
        index,
        label: branch.label.clone(),
    }
}

fn branch_entry(branch: &Branch) -> Option<LinePosition> {
    branch
        .line_range()
        .map(|range| after(range.start_line, 1))
}

impl LinkTargetVisitor<'_> {
    fn set_target(&mut self, edge: &EdgeId, target: Option<LinePosition>, owner: Owner) {
        let Some(edge) = self.graph.edge_mut(edge) else {
            return;
        };
        if target.is_some() {
            edge.insertion_target = target;
        }
        edge.owner = Some(owner);
    }

    /// When `edge` enters a placeholder, the placeholder inherits the target.
    fn target_placeholder(&mut self, edge: &EdgeId, target: Option<LinePosition>, owner: &Owner) {
        let Some(placeholder) = self.graph.edge(edge).map(|edge| edge.target.clone()) else {
            return;
        };
        if let Some(graph_node) = self.graph.node_mut(&placeholder)
            && graph_node.kind == GraphNodeKind::Empty
        {
            graph_node.payload.insertion_target = target;
            graph_node.payload.owner = Some(owner.clone());
        }
    }

    fn target_out_edges(&mut self, source: &NodeId, target: Option<LinePosition>, owner: &Owner) {
        for edge in self.graph.outgoing_ids(source) {
            self.set_target(&edge, target, owner.clone());
        }
    }

    /// Loop and error handler bodies are entered through exactly one edge.
    fn target_single_body(&mut self, node: &FlowNode, entry: &NodeId, body_index: usize) {
        let out_edges = self.graph.outgoing_ids(entry);
        if out_edges.len() != 1 {
            debug!(node = %node.id, edges = out_edges.len(), "expected a single body edge");
            return;
        }
        let Some(body) = node.branches.get(body_index) else {
            error!(node = %node.id, "container without body branch");
            return;
        };
        let owner = branch_owner(node, body_index, body);
        let target = branch_entry(body);
        self.set_target(&out_edges[0], target, owner.clone());
        self.target_placeholder(&out_edges[0], target, &owner);
    }

    fn target_construct_exit(&mut self, node: &FlowNode, marker: &NodeId) {
        let end = node.line_range().map(|range| range.end_line);
        self.target_out_edges(marker, end, &Owner::Node(node.id.clone()));
    }
}

impl FlowVisitor for LinkTargetVisitor<'_> {
    fn begin_node(&mut self, node: &mut FlowNode) {
        if node.geometry.is_none() {
            return;
        }
        if let Some(range) = node.line_range() {
            let end = range.end_line;
            self.target_out_edges(&node.id, Some(end), &Owner::Node(node.id.clone()));
        }
    }

    fn begin_comment(&mut self, node: &mut FlowNode) {
        if node.geometry.is_none() {
            return;
        }
        if let Some(range) = node.line_range() {
            let next_line = LinePosition::new(range.end_line.line + 1, 0);
            self.target_out_edges(&node.id, Some(next_line), &Owner::Node(node.id.clone()));
        }
    }

    fn begin_event_start(&mut self, node: &mut FlowNode) {
        if node.geometry.is_none() {
            return;
        }
        if let Some(range) = node.line_range() {
            let start = after(range.start_line, 1);
            self.target_out_edges(&node.id, Some(start), &Owner::Node(node.id.clone()));
        }
    }

    fn begin_conditional(&mut self, node: &mut FlowNode) {
        if node.geometry.is_none() {
            return;
        }
        for (index, branch) in node.branches.iter().enumerate() {
            let edge = EdgeId::branch_in(&node.id, index);
            if self.graph.edge(&edge).is_none() {
                error!(node = %node.id, branch = %branch.label, "branch edge not found");
                continue;
            }
            let owner = branch_owner(node, index, branch);
            let target = branch_entry(branch);
            self.set_target(&edge, target, owner.clone());
            self.target_placeholder(&edge, target, &owner);
        }
        let join = NodeId::synthetic(&node.id, SyntheticRole::EndIf, 0, None);
        self.target_construct_exit(node, &join);
    }

    fn begin_loop(&mut self, node: &mut FlowNode) {
        if node.geometry.is_none() {
            return;
        }
        let id = node.id.clone();
        self.target_single_body(node, &id, 0);
        let end = NodeId::synthetic(&node.id, SyntheticRole::EndContainer, 0, None);
        self.target_construct_exit(node, &end);
    }

    fn begin_error_handler(&mut self, node: &mut FlowNode) {
        if node.geometry.is_none() {
            return;
        }
        let start = NodeId::synthetic(&node.id, SyntheticRole::StartContainer, 0, None);
        match node.branch_index(&BranchKind::Body) {
            Some(body) => self.target_single_body(node, &start, body),
            None => debug!(node = %node.id, "error handler without body branch"),
        }
        let end = NodeId::synthetic(&node.id, SyntheticRole::EndContainer, 0, None);
        self.target_construct_exit(node, &end);
        let id = node.id.clone();
        self.target_construct_exit(node, &id);
    }

    fn begin_fork(&mut self, node: &mut FlowNode) {
        if node.geometry.is_none() {
            return;
        }
        for (index, lane) in node.branches.iter().enumerate() {
            let owner = branch_owner(node, index, lane);
            self.set_target(&EdgeId::branch_in(&node.id, index), None, owner.clone());

            let Some(start) = lane.children.first() else {
                error!(node = %node.id, lane = %lane.label, "worker lane without start marker");
                continue;
            };
            let Some(edge) = self.graph.outgoing_ids(&start.id).into_iter().next() else {
                error!(node = %node.id, lane = %lane.label, "worker lane edge not found");
                continue;
            };
            let brace = lane
                .codedata
                .source_code
                .as_deref()
                .and_then(|source| source.find("{\n"))
                .map_or(0, |index| index as u32 + 1);
            let target = lane
                .line_range()
                .map(|range| after(range.start_line, brace));
            self.set_target(&edge, target, owner);
        }
        let end = NodeId::synthetic(&node.id, SyntheticRole::EndContainer, 0, None);
        self.target_construct_exit(node, &end);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LayoutConfig;
    use crate::ir::{LineRange, NodeKind};
    use crate::layout::init::normalize;
    use crate::layout::node_factory::build_graph;
    use crate::layout::position::position_flow;
    use crate::layout::sizing::size_flow;

    fn range(start: (u32, u32), end: (u32, u32)) -> LineRange {
        LineRange::new(
            LinePosition::new(start.0, start.1),
            LinePosition::new(end.0, end.1),
        )
    }

    fn targeted(nodes: Vec<FlowNode>) -> Graph {
        let config = LayoutConfig::default();
        let mut flow = Flow::new(nodes);
        normalize(&mut flow, &config);
        size_flow(&mut flow, &config);
        position_flow(&mut flow, &config);
        let mut graph = build_graph(&mut flow, &config);
        attach_link_targets(&mut flow, &mut graph);
        graph
    }

    fn edge_between<'a>(
        graph: &'a Graph,
        source: &str,
        target: &str,
    ) -> &'a crate::layout::GraphEdge {
        graph
            .edges
            .iter()
            .find(|edge| edge.source.to_string() == source && edge.target.to_string() == target)
            .unwrap()
    }

    #[test]
    fn statements_target_their_end() {
        let graph = targeted(vec![
            FlowNode::new("a", NodeKind::Variable).with_line_range(range((3, 4), (3, 20))),
            FlowNode::new("c", NodeKind::Comment).with_line_range(range((4, 4), (4, 30))),
        ]);
        let edge = edge_between(&graph, "a", "c");
        assert_eq!(edge.insertion_target, Some(LinePosition::new(3, 20)));
        assert_eq!(edge.owner, Some(Owner::Node(NodeId::new("a"))));
        let edge = edge_between(&graph, "c", "c-last-0");
        assert_eq!(edge.insertion_target, Some(LinePosition::new(5, 0)));
    }

    #[test]
    fn branch_edges_target_branch_start() {
        let then = Branch::new("Then", BranchKind::Conditional)
            .with_line_range(range((5, 10), (7, 5)))
            .with_children(vec![
                FlowNode::new("a", NodeKind::Variable).with_line_range(range((6, 8), (6, 20))),
            ]);
        let node = FlowNode::new("if", NodeKind::If)
            .with_line_range(range((5, 4), (7, 5)))
            .with_branch(then);
        let graph = targeted(vec![node]);

        let then_in = graph.edge(&EdgeId::branch_in(&NodeId::new("if"), 0)).unwrap();
        assert_eq!(then_in.insertion_target, Some(LinePosition::new(5, 11)));
        assert!(matches!(&then_in.owner, Some(Owner::Branch { index: 0, .. })));

        let else_in = graph.edge(&EdgeId::branch_in(&NodeId::new("if"), 1)).unwrap();
        assert_eq!(else_in.insertion_target, Some(LinePosition::new(5, 5)));
        let placeholder = graph.node(&else_in.target).unwrap();
        assert_eq!(placeholder.payload.insertion_target, Some(LinePosition::new(5, 5)));

        let join = NodeId::synthetic(&NodeId::new("if"), SyntheticRole::EndIf, 0, None);
        let exit = graph.edges_from(&join).next().unwrap();
        assert_eq!(exit.insertion_target, Some(LinePosition::new(7, 5)));
        assert_eq!(exit.owner, Some(Owner::Node(NodeId::new("if"))));
    }

    #[test]
    fn empty_loop_placeholder_gets_body_target() {
        let body = Branch::new("Body", BranchKind::Body).with_line_range(range((2, 15), (3, 5)));
        let node = FlowNode::new("w", NodeKind::While)
            .with_line_range(range((2, 4), (3, 5)))
            .with_branch(body);
        let graph = targeted(vec![node]);
        let entry = graph.edge(&EdgeId::branch_in(&NodeId::new("w"), 0)).unwrap();
        assert_eq!(entry.insertion_target, Some(LinePosition::new(2, 16)));
        let placeholder = graph.node(&entry.target).unwrap();
        assert_eq!(placeholder.kind, GraphNodeKind::Empty);
        assert_eq!(placeholder.payload.insertion_target, Some(LinePosition::new(2, 16)));
    }

    #[test]
    fn fork_lanes_target_past_the_opening_brace() {
        let mut lane = Branch::new("w1", BranchKind::Worker)
            .with_line_range(range((10, 4), (12, 5)))
            .with_children(vec![FlowNode::new("a", NodeKind::FunctionCall)]);
        lane.codedata.source_code = Some("worker w1 {\n    foo();\n}".to_string());
        let node = FlowNode::new("fork", NodeKind::Fork).with_branch(lane);
        let graph = targeted(vec![node]);
        let edge = edge_between(&graph, "fork-start-0-w1", "a");
        assert_eq!(edge.insertion_target, Some(LinePosition::new(10, 4 + 11)));
    }
}
