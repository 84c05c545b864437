//! Graph assembly: turns the positioned tree into graph nodes and edges.
//!
//! Sequences are chained through `last`, the most recently created node of
//! the current sequence. Container exit hooks add the edges into and out of
//! their branches and the synthetic join / end-of-container markers.

use tracing::{error, trace, warn};

use super::traverse::{FlowVisitor, traverse_flow};
use super::types::{EdgeHints, EdgeId, Graph, GraphEdge, GraphNode, GraphNodeKind};
use crate::config::LayoutConfig;
use crate::ir::{
    Branch, BranchKind, Construct, Flow, FlowNode, NodeId, NodeKind, Point, Size, SyntheticRole,
};

pub fn build_graph(flow: &mut Flow, config: &LayoutConfig) -> Graph {
    let span = tracing::debug_span!("build_graph", nodes = flow.nodes.len());
    let _guard = span.enter();

    let mut visitor = NodeFactoryVisitor::new(config);
    traverse_flow(&mut flow.nodes, &mut visitor);
    tracing::debug!(
        nodes = visitor.graph.node_count(),
        edges = visitor.graph.edge_count(),
        "graph assembled"
    );
    visitor.graph
}

struct NodeFactoryVisitor<'a> {
    config: &'a LayoutConfig,
    graph: Graph,
    last: Option<NodeId>,
    suggestion_placed: bool,
}

fn placement(node: &FlowNode) -> Option<(Point, Size)> {
    let geometry = node.geometry.as_ref()?;
    Some((geometry.origin()?, *geometry.size()?))
}

fn marker_id(node: &NodeId, role: SyntheticRole) -> NodeId {
    NodeId::synthetic(node, role, 0, None)
}

fn graph_node_kind(construct: Construct) -> GraphNodeKind {
    match construct {
        Construct::Conditional => GraphNodeKind::Conditional,
        Construct::Loop => GraphNodeKind::Loop,
        Construct::ErrorHandler => GraphNodeKind::ErrorHandler,
        Construct::Fork => GraphNodeKind::Fork,
        Construct::EventStart => GraphNodeKind::EventStart,
        Construct::Empty => GraphNodeKind::Empty,
        Construct::Draft => GraphNodeKind::Draft,
        Construct::Comment => GraphNodeKind::Comment,
        Construct::ApiCall => GraphNodeKind::ApiCall,
        Construct::AgentCall => GraphNodeKind::AgentCall,
        Construct::Prompt => GraphNodeKind::Prompt,
        Construct::Statement => GraphNodeKind::Statement,
    }
}

impl<'a> NodeFactoryVisitor<'a> {
    fn new(config: &'a LayoutConfig) -> Self {
        Self {
            config,
            graph: Graph::new(),
            last: None,
            suggestion_placed: false,
        }
    }

    fn push_node(&mut self, node: GraphNode) -> bool {
        let id = node.id.clone();
        let added = self.graph.add_node(node);
        if !added {
            warn!(node = %id, "duplicate graph node id, keeping the first");
        }
        added
    }

    /// Adds an edge when both endpoints exist; otherwise logs and omits it.
    fn create_edge(
        &mut self,
        id: EdgeId,
        source: &NodeId,
        target: &NodeId,
        label: Option<String>,
        hints: EdgeHints,
    ) -> bool {
        for endpoint in [source, target] {
            if !self.graph.contains(endpoint) {
                error!(
                    edge = %id,
                    missing = %endpoint,
                    "edge endpoint not found in graph, omitting edge"
                );
                return false;
            }
        }
        trace!(edge = %id, "edge");
        self.graph.add_edge(GraphEdge {
            id,
            source: source.clone(),
            target: target.clone(),
            label: label.filter(|text| !text.is_empty()),
            insertion_target: None,
            owner: None,
            hints,
        })
    }

    fn link(&mut self, source: &NodeId, target: &NodeId, hints: EdgeHints) -> bool {
        self.create_edge(EdgeId::link(source, target), source, target, None, hints)
    }

    /// Chains `id` after the previous node of the current sequence.
    fn update_links(&mut self, id: &NodeId, hints: EdgeHints) {
        if let Some(previous) = self.last.take() {
            self.link(&previous, id, hints);
        }
        self.last = Some(id.clone());
    }

    fn add_flow_node(&mut self, node: &FlowNode) {
        let Some((origin, size)) = placement(node) else {
            return;
        };
        let Some(kind) = node.kind() else {
            return;
        };
        let construct = kind.construct();
        let mut graph_node = GraphNode::new(
            node.id.clone(),
            graph_node_kind(construct),
            origin.x,
            origin.y,
            size.width(),
            size.h,
        )
        .with_label(node.metadata.label.clone());
        graph_node.payload.source_kind = Some(kind.clone());
        graph_node.payload.draft = node.is_draft();
        if self.push_node(graph_node) {
            self.update_links(&node.id, EdgeHints::default());
        }
        if !matches!(construct, Construct::Comment | Construct::EventStart | Construct::Draft) {
            self.add_suggestion_button(node, origin, size);
        }
    }

    fn add_marker(&mut self, id: NodeId, kind: GraphNodeKind, x: f32, y: f32, visible: bool) {
        let width = self.config.empty_node_width;
        let mut marker = GraphNode::new(id, kind, x, y, width, width);
        marker.payload.visible = visible;
        self.push_node(marker);
    }

    fn add_suggestion_button(&mut self, node: &FlowNode, origin: Point, size: Size) {
        if !node.suggested || self.suggestion_placed {
            return;
        }
        self.suggestion_placed = true;
        let cfg = self.config;
        let button = GraphNode::new(
            marker_id(&node.id, SyntheticRole::SuggestionButton),
            GraphNodeKind::Button,
            origin.x + size.lw + cfg.gap_x / 2.0,
            origin.y - cfg.button_node_height + 10.0,
            cfg.button_node_height,
            cfg.button_node_height,
        );
        self.push_node(button);
    }

    /// Graph node an edge entering `branch` should target.
    fn branch_start(&self, branch: &Branch) -> Option<NodeId> {
        let first = branch.children.first()?;
        let id = if first.is_kind(&NodeKind::ErrorHandler) {
            marker_id(&first.id, SyntheticRole::StartContainer)
        } else {
            first.id.clone()
        };
        self.graph.contains(&id).then_some(id)
    }

    /// Graph node an edge leaving `branch` should start from.
    fn branch_end(&self, branch: &Branch) -> Option<NodeId> {
        let last = branch.children.last()?;
        let id = match last.kind()?.construct() {
            Construct::Conditional => marker_id(&last.id, SyntheticRole::EndIf),
            Construct::Loop | Construct::Fork => marker_id(&last.id, SyntheticRole::EndContainer),
            Construct::ErrorHandler => {
                let expanded = last
                    .branch(&BranchKind::OnFailure)
                    .is_some_and(|failure| failure.geometry.is_some());
                if expanded {
                    marker_id(&last.id, SyntheticRole::EndContainer)
                } else {
                    last.id.clone()
                }
            }
            _ => last.id.clone(),
        };
        self.graph.contains(&id).then_some(id)
    }

    /// In and out edges of a branch holding only a placeholder.
    fn link_placeholder_branch(
        &mut self,
        container: &NodeId,
        index: usize,
        branch: &Branch,
        join: &NodeId,
        label: Option<String>,
    ) -> bool {
        let placeholder = &branch.children[0];
        let draft = placeholder.is_draft();
        let linked_in = self.create_edge(
            EdgeId::branch_in(container, index),
            container,
            &placeholder.id,
            if draft { None } else { label },
            EdgeHints {
                broken_line: draft,
                show_add_button: false,
                ..Default::default()
            },
        );
        let linked_out = self.link(
            &placeholder.id,
            join,
            EdgeHints {
                broken_line: draft || join.role() == Some(SyntheticRole::EndIf),
                show_add_button: false,
                align_bottom: true,
                ..Default::default()
            },
        );
        linked_in && linked_out
    }
}

impl FlowVisitor for NodeFactoryVisitor<'_> {
    fn begin_node(&mut self, node: &mut FlowNode) {
        self.add_flow_node(node);
    }

    fn end_branch(&mut self, _owner: &NodeId, _index: usize, _branch: &mut Branch) {
        self.last = None;
    }

    fn begin_empty(&mut self, node: &mut FlowNode) {
        let Some((origin, size)) = placement(node) else {
            return;
        };
        let width = self.config.empty_node_width;
        if node.is_last_node_marker() {
            let Some(previous) = self.last.clone() else {
                trace!(node = %node.id, "terminator without predecessor, not rendered");
                return;
            };
            let hints = EdgeHints {
                show_button_always: self.graph.node_count() == 1,
                ..Default::default()
            };
            let end = GraphNode::new(
                node.id.clone(),
                GraphNodeKind::End,
                origin.x + size.lw - width / 2.0,
                origin.y,
                width,
                width,
            );
            if self.push_node(end) {
                self.link(&previous, &node.id, hints);
                self.last = Some(node.id.clone());
            }
            return;
        }

        let mut placeholder = GraphNode::new(
            node.id.clone(),
            GraphNodeKind::Empty,
            origin.x + size.lw - width / 2.0,
            origin.y,
            width,
            width,
        );
        placeholder.payload.draft = node.is_draft();
        placeholder.payload.show_button = !node.is_draft();
        placeholder.payload.source_kind = node.kind().cloned();
        if self.push_node(placeholder) {
            self.update_links(&node.id, EdgeHints::default());
        }
    }

    fn begin_conditional(&mut self, node: &mut FlowNode) {
        self.add_flow_node(node);
        self.last = None;
    }

    fn end_conditional(&mut self, node: &mut FlowNode) {
        let Some((origin, size)) = placement(node) else {
            return;
        };
        if !self.graph.contains(&node.id) {
            error!(node = %node.id, "conditional graph node not found");
            return;
        }

        for (index, branch) in node.branches.iter().enumerate() {
            if branch.children.is_empty() || branch.is_placeholder_only() {
                continue;
            }
            let Some(start) = self.branch_start(branch) else {
                error!(node = %node.id, branch = %branch.label, "branch start not found in graph");
                continue;
            };
            self.create_edge(
                EdgeId::branch_in(&node.id, index),
                &node.id,
                &start,
                Some(branch.display_label()),
                EdgeHints::default(),
            );
        }

        let width = self.config.empty_node_width;
        let join = marker_id(&node.id, SyntheticRole::EndIf);
        self.add_marker(
            join.clone(),
            GraphNodeKind::EndIf,
            origin.x + size.lw - width / 2.0,
            origin.y + size.ch - width / 2.0,
            true,
        );

        for (index, branch) in node.branches.iter().enumerate() {
            let Some(last) = branch.children.last() else {
                error!(node = %node.id, branch = %branch.label, "branch without children");
                continue;
            };
            if branch.is_placeholder_only() {
                let label = Some(branch.display_label());
                self.link_placeholder_branch(&node.id, index, branch, &join, label);
                continue;
            }
            if last.is_returning() {
                trace!(node = %node.id, branch = %branch.label, "branch returns, no join edge");
                continue;
            }
            let Some(end) = self.branch_end(branch) else {
                error!(node = %node.id, branch = %branch.label, "branch end not found in graph");
                continue;
            };
            self.link(
                &end,
                &join,
                EdgeHints {
                    align_bottom: true,
                    ..Default::default()
                },
            );
        }

        self.last = Some(join);
    }

    fn begin_loop(&mut self, node: &mut FlowNode) {
        self.add_flow_node(node);
        self.last = None;
    }

    fn end_loop(&mut self, node: &mut FlowNode) {
        let Some((origin, size)) = placement(node) else {
            return;
        };
        if !self.graph.contains(&node.id) {
            error!(node = %node.id, "loop graph node not found");
            return;
        }
        let Some(body) = node.branches.first() else {
            error!(node = %node.id, "loop without body branch");
            return;
        };

        let width = self.config.empty_node_width;
        let end = marker_id(&node.id, SyntheticRole::EndContainer);
        self.add_marker(
            end.clone(),
            GraphNodeKind::EndContainer,
            origin.x + size.lw - width / 2.0,
            origin.y + size.ch - width / 2.0,
            true,
        );
        self.last = Some(end.clone());

        if body.is_placeholder_only() {
            self.link_placeholder_branch(&node.id, 0, body, &end, None);
            return;
        }

        match self.branch_start(body) {
            Some(start) => {
                self.create_edge(
                    EdgeId::branch_in(&node.id, 0),
                    &node.id,
                    &start,
                    None,
                    EdgeHints::default(),
                );
            }
            None => error!(node = %node.id, "loop body start not found in graph"),
        }
        let returning = body.children.last().is_some_and(FlowNode::is_returning);
        match self.branch_end(body) {
            Some(last) => {
                self.link(
                    &last,
                    &end,
                    EdgeHints {
                        align_bottom: true,
                        show_add_button: !returning,
                        ..Default::default()
                    },
                );
            }
            None => error!(node = %node.id, "loop body end not found in graph"),
        }
    }

    fn begin_error_handler(&mut self, node: &mut FlowNode) {
        let Some((origin, size)) = placement(node) else {
            return;
        };
        let width = self.config.empty_node_width;
        let top_level = node.geometry.as_ref().is_some_and(|geometry| geometry.is_top_level());
        let start = marker_id(&node.id, SyntheticRole::StartContainer);
        self.add_marker(
            start.clone(),
            GraphNodeKind::StartContainer,
            origin.x + size.lw - width / 2.0,
            origin.y - width / 2.0,
            !top_level,
        );
        self.update_links(&start, EdgeHints::default());
        self.add_suggestion_button(node, origin, size);
        self.last = None;
    }

    fn end_error_handler(&mut self, node: &mut FlowNode) {
        let Some((origin, size)) = placement(node) else {
            return;
        };
        let start = marker_id(&node.id, SyntheticRole::StartContainer);
        if !self.graph.contains(&start) {
            error!(node = %node.id, "error handler start marker not found");
            return;
        }
        let Some(body) = node.branch(&BranchKind::Body) else {
            error!(node = %node.id, "error handler without body branch");
            return;
        };

        let entry = if body.is_placeholder_only() {
            Some(body.children[0].id.clone()).filter(|id| self.graph.contains(id))
        } else {
            self.branch_start(body)
        };
        match entry {
            Some(entry) => {
                let hints = EdgeHints {
                    show_add_button: !body.is_placeholder_only(),
                    ..Default::default()
                };
                self.create_edge(EdgeId::branch_in(&node.id, 0), &start, &entry, None, hints);
            }
            None => error!(node = %node.id, "error handler body start not found in graph"),
        }

        let marker = self.config.while_node_width;
        let body_bottom = match (body.origin(), body.size()) {
            (Some(body_origin), Some(body_size)) => body_origin.y + body_size.ch,
            _ => origin.y,
        };
        let mut error_node = GraphNode::new(
            node.id.clone(),
            GraphNodeKind::ErrorHandler,
            origin.x + size.lw - marker / 2.0,
            body_bottom,
            marker,
            marker,
        )
        .with_label(node.metadata.label.clone());
        error_node.payload.source_kind = node.kind().cloned();
        self.push_node(error_node);

        if let Some(body_end) = self.branch_end(body) {
            let placeholder_end = body.is_placeholder_only();
            self.link(
                &body_end,
                &node.id,
                EdgeHints {
                    show_add_button: !placeholder_end,
                    show_arrow: false,
                    ..Default::default()
                },
            );
        }

        let failure = node
            .branch(&BranchKind::OnFailure)
            .filter(|failure| failure.geometry.is_some());
        let Some(failure) = failure else {
            self.last = Some(node.id.clone());
            return;
        };

        let width = self.config.empty_node_width;
        let end = marker_id(&node.id, SyntheticRole::EndContainer);
        self.add_marker(
            end.clone(),
            GraphNodeKind::EndContainer,
            origin.x + size.lw - width / 2.0,
            origin.y + size.ch - width / 2.0,
            true,
        );
        if let Some(failure_end) = failure
            .children
            .last()
            .filter(|child| child.is_last_node_marker())
            .map(|child| child.id.clone())
            .filter(|id| self.graph.contains(id))
        {
            self.link(
                &failure_end,
                &end,
                EdgeHints {
                    show_add_button: false,
                    align_bottom: true,
                    ..Default::default()
                },
            );
        }
        self.last = Some(end);
    }

    fn begin_fork(&mut self, node: &mut FlowNode) {
        self.add_flow_node(node);
        self.last = None;
    }

    fn end_fork(&mut self, node: &mut FlowNode) {
        let Some((origin, size)) = placement(node) else {
            return;
        };
        if !self.graph.contains(&node.id) {
            error!(node = %node.id, "fork graph node not found");
            return;
        }

        let width = self.config.empty_node_width;
        let end = marker_id(&node.id, SyntheticRole::EndContainer);
        self.add_marker(
            end.clone(),
            GraphNodeKind::EndContainer,
            origin.x + size.lw - width / 2.0,
            origin.y + size.ch - width / 2.0,
            true,
        );

        for (index, lane) in node.branches.iter().enumerate() {
            match self.branch_start(lane) {
                Some(start) => {
                    self.create_edge(
                        EdgeId::branch_in(&node.id, index),
                        &node.id,
                        &start,
                        Some(lane.label.clone()),
                        EdgeHints {
                            show_add_button: false,
                            ..Default::default()
                        },
                    );
                }
                None => error!(
                    node = %node.id,
                    lane = %lane.label,
                    "worker lane start not found in graph"
                ),
            }
            match self.branch_end(lane) {
                Some(lane_end) => {
                    self.link(
                        &lane_end,
                        &end,
                        EdgeHints {
                            show_add_button: false,
                            align_bottom: true,
                            ..Default::default()
                        },
                    );
                }
                None => error!(
                    node = %node.id,
                    lane = %lane.label,
                    "worker lane end not found in graph"
                ),
            }
        }
        self.last = Some(end);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::init::normalize;
    use crate::layout::position::position_flow;
    use crate::layout::sizing::size_flow;

    fn assembled(nodes: Vec<FlowNode>) -> (Flow, Graph) {
        let config = LayoutConfig::default();
        let mut flow = Flow::new(nodes);
        normalize(&mut flow, &config);
        size_flow(&mut flow, &config);
        position_flow(&mut flow, &config);
        let graph = build_graph(&mut flow, &config);
        (flow, graph)
    }

    fn edge_pairs(graph: &Graph) -> Vec<(String, String)> {
        graph
            .edges
            .iter()
            .map(|edge| (edge.source.to_string(), edge.target.to_string()))
            .collect()
    }

    fn pair(source: &str, target: &str) -> (String, String) {
        (source.to_string(), target.to_string())
    }

    #[test]
    fn single_statement_links_to_terminator() {
        let (_, graph) = assembled(vec![FlowNode::new("a", NodeKind::Variable)]);
        assert_eq!(graph.node_count(), 2);
        assert_eq!(graph.nodes[1].kind, GraphNodeKind::End);
        assert_eq!(edge_pairs(&graph), vec![pair("a", "a-last-0")]);
        assert!(graph.edges[0].hints.show_button_always);
    }

    #[test]
    fn conditional_gets_join_and_branch_edges() {
        let node = FlowNode::new("if", NodeKind::If).with_branch(
            Branch::new("Then", BranchKind::Conditional)
                .with_children(vec![FlowNode::new("a", NodeKind::Variable)]),
        );
        let (_, graph) = assembled(vec![node]);
        let join = NodeId::synthetic(&NodeId::new("if"), SyntheticRole::EndIf, 0, None);
        assert!(graph.contains(&join));
        assert_eq!(graph.edges_from(&NodeId::new("if")).count(), 2);
        assert_eq!(graph.edges_to(&join).count(), 2);

        let then_in = graph.edge(&EdgeId::branch_in(&NodeId::new("if"), 0)).unwrap();
        assert_eq!(then_in.label.as_deref(), Some("Then"));
        let else_in = graph.edge(&EdgeId::branch_in(&NodeId::new("if"), 1)).unwrap();
        assert!(else_in.hints.broken_line);
        assert_eq!(else_in.label, None);
        assert!(
            graph
                .edges_from(&join)
                .any(|edge| edge.target.to_string() == "if-last-0")
        );
    }

    #[test]
    fn returning_branches_do_not_converge() {
        let node = FlowNode::new("if", NodeKind::If)
            .with_branch(
                Branch::new("Then", BranchKind::Conditional)
                    .with_children(vec![FlowNode::new("r", NodeKind::Return)]),
            )
            .with_branch(
                Branch::new("Else", BranchKind::Else)
                    .with_children(vec![FlowNode::new("b", NodeKind::Variable)]),
            );
        let (_, graph) = assembled(vec![node]);
        let join = NodeId::synthetic(&NodeId::new("if"), SyntheticRole::EndIf, 0, None);
        let converging: Vec<String> = graph.edges_to(&join).map(|e| e.source.to_string()).collect();
        assert_eq!(converging, vec!["b"]);
    }

    #[test]
    fn empty_loop_touches_its_placeholder() {
        let (flow, graph) = assembled(vec![FlowNode::new("w", NodeKind::While)]);
        let placeholder = &flow.nodes[0].branches[0].children[0].id;
        assert_eq!(graph.node(placeholder).unwrap().kind, GraphNodeKind::Empty);
        assert_eq!(graph.edges_to(placeholder).count(), 1);
        assert_eq!(graph.edges_from(placeholder).count(), 1);
        let end = NodeId::synthetic(&NodeId::new("w"), SyntheticRole::EndContainer, 0, None);
        assert_eq!(graph.edges_from(placeholder).next().unwrap().target, end);
    }

    #[test]
    fn error_handler_threads_two_chains() {
        let body = Branch::new("Body", BranchKind::Body)
            .with_children(vec![FlowNode::new("call", NodeKind::FunctionCall)]);
        let node = FlowNode::new("eh", NodeKind::ErrorHandler)
            .with_branch(body)
            .with_branch(Branch::new("On Failure", BranchKind::OnFailure));
        let (_, graph) = assembled(vec![node]);
        let pairs = edge_pairs(&graph);
        assert!(pairs.contains(&pair("eh-start-container-0", "call")));
        assert!(pairs.contains(&pair("call", "eh")));
        assert!(pairs.contains(&pair("eh-start-0-ON_FAILURE", "eh-empty-1-On Failure")));
        assert!(pairs.contains(&pair("eh-empty-1-On Failure", "eh-last-0-ON_FAILURE")));
        assert!(pairs.contains(&pair("eh-last-0-ON_FAILURE", "eh-end-container-0")));
        assert!(pairs.contains(&pair("eh-end-container-0", "eh-last-0")));
        assert_eq!(graph.edge_count(), 6);
    }

    #[test]
    fn collapsed_error_handler_ends_at_error_node() {
        let config = LayoutConfig {
            error_handlers: crate::config::ErrorHandlerConfig {
                collapse: true,
                expanded: None,
            },
            ..Default::default()
        };
        let mut flow = Flow::new(vec![
            FlowNode::new("eh", NodeKind::ErrorHandler)
                .with_branch(Branch::new("Body", BranchKind::Body))
                .with_branch(Branch::new("On Failure", BranchKind::OnFailure)),
        ]);
        normalize(&mut flow, &config);
        size_flow(&mut flow, &config);
        position_flow(&mut flow, &config);
        let graph = build_graph(&mut flow, &config);
        assert!(!graph.contains(&NodeId::new("eh-start-0-ON_FAILURE")));
        assert!(edge_pairs(&graph).contains(&pair("eh", "eh-last-0")));
    }

    #[test]
    fn fork_lanes_join_at_end_container() {
        let lane = |label: &str, child: &str| {
            Branch::new(label, BranchKind::Worker)
                .with_children(vec![FlowNode::new(child, NodeKind::FunctionCall)])
        };
        let node = FlowNode::new("fork", NodeKind::Fork)
            .with_branch(lane("w1", "a"))
            .with_branch(lane("w2", "b"));
        let (_, graph) = assembled(vec![node]);
        let pairs = edge_pairs(&graph);
        for (index, (label, child)) in [("w1", "a"), ("w2", "b")].into_iter().enumerate() {
            let start = format!("fork-start-{index}-{label}");
            let last = format!("fork-last-{index}-{label}");
            assert!(pairs.contains(&pair("fork", &start)));
            assert!(pairs.contains(&pair(&start, child)));
            assert!(pairs.contains(&pair(child, &last)));
            assert!(pairs.contains(&pair(&last, "fork-end-container-0")));
        }
    }

    #[test]
    fn missing_endpoints_are_omitted() {
        let config = LayoutConfig::default();
        let mut visitor = NodeFactoryVisitor::new(&config);
        let added =
            visitor.link(&NodeId::new("ghost"), &NodeId::new("other"), EdgeHints::default());
        assert!(!added);
        assert_eq!(visitor.graph.edge_count(), 0);
    }

    #[test]
    fn first_suggested_node_gets_button() {
        let mut first = FlowNode::new("a", NodeKind::Variable);
        first.suggested = true;
        let mut second = FlowNode::new("b", NodeKind::Variable);
        second.suggested = true;
        let (_, graph) = assembled(vec![first, second]);
        let buttons: Vec<&GraphNode> = graph
            .nodes
            .iter()
            .filter(|node| node.kind == GraphNodeKind::Button)
            .collect();
        assert_eq!(buttons.len(), 1);
        assert_eq!(buttons[0].id.to_string(), "a-button-0");
    }
}
