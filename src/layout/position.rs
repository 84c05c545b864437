//! Top-down positioning.
//!
//! Each call receives the horizontal center of its sequence and the y at
//! which the node starts, and returns the y where the next sibling starts.
//! Coordinates are therefore a pure function of the sized tree.

use tracing::{error, trace};

use crate::config::LayoutConfig;
use crate::ir::{BranchKind, Construct, Flow, FlowNode, Size};

#[derive(Debug, Clone, Copy, PartialEq)]
struct Cursor {
    center_x: f32,
    y: f32,
}

impl Cursor {
    fn at(self, y: f32) -> Self {
        Self { y, ..self }
    }
}

/// Assigns origins to every sized node and branch. Returns the y just past
/// the last root node.
pub fn position_flow(flow: &mut Flow, config: &LayoutConfig) -> f32 {
    let span = tracing::debug_span!("position", nodes = flow.nodes.len());
    let _guard = span.enter();

    let center_x = flow
        .nodes
        .iter()
        .filter_map(FlowNode::size)
        .fold(0.0_f32, |acc, size| acc.max(size.clw))
        + config.canvas_padding;
    let cursor = Cursor {
        center_x,
        y: config.start_y,
    };
    place_sequence(&mut flow.nodes, cursor, config)
}

fn place_sequence(nodes: &mut [FlowNode], cursor: Cursor, config: &LayoutConfig) -> f32 {
    nodes
        .iter_mut()
        .fold(cursor.y, |y, node| place_node(node, cursor.at(y), config))
}

fn place_node(node: &mut FlowNode, cursor: Cursor, config: &LayoutConfig) -> f32 {
    let Some(construct) = node.kind().map(|kind| kind.construct()) else {
        return cursor.y;
    };
    let Some(geometry) = node.geometry.as_mut() else {
        return cursor.y;
    };
    let Some(size) = geometry.size().copied() else {
        error!(node = %node.id, "node reached positioning without a size, skipping subtree");
        return cursor.y;
    };

    let Cursor { center_x, y } = cursor;
    match construct {
        Construct::Comment => geometry.set_origin(center_x - config.node_width / 2.0, y),
        _ => geometry.set_origin(center_x - size.lw, y),
    }
    trace!(node = %node.id, x = center_x - size.lw, y, "positioned");

    match construct {
        Construct::Conditional | Construct::Fork => place_side_by_side(node, &size, cursor, config),
        Construct::Loop => place_loop_body(node, &size, cursor, config),
        Construct::ErrorHandler => place_error_regions(node, cursor, config),
        _ => {}
    }

    y + size.ch + config.gap_y
}

/// Branches sit left to right below the split marker, the first one starting
/// at the node's left container edge.
fn place_side_by_side(node: &mut FlowNode, size: &Size, cursor: Cursor, config: &LayoutConfig) {
    let branch_y = cursor.y + size.h + config.gap_y;
    let mut x = cursor.center_x - size.clw;
    for branch in &mut node.branches {
        let Some(geometry) = branch.geometry.as_mut() else {
            continue;
        };
        let Some(branch_size) = geometry.size().copied() else {
            error!(node = %node.id, branch = %branch.label, "branch without size, skipping");
            continue;
        };
        geometry.set_origin(x, branch_y);
        let lane = Cursor {
            center_x: x + branch_size.clw,
            y: branch_y,
        };
        place_sequence(&mut branch.children, lane, config);
        x += branch_size.clw + branch_size.crw + config.gap_x;
    }
}

fn place_loop_body(node: &mut FlowNode, size: &Size, cursor: Cursor, config: &LayoutConfig) {
    let Some(body) = node.branches.first_mut() else {
        return;
    };
    let Some(geometry) = body.geometry.as_mut() else {
        return;
    };
    let Some(body_size) = geometry.size().copied() else {
        error!(node = %node.id, "loop body without size, skipping");
        return;
    };
    let body_y = cursor.y + size.h + config.gap_y;
    geometry.set_origin(cursor.center_x - body_size.clw, body_y);
    place_sequence(&mut body.children, cursor.at(body_y), config);
}

/// The protected body starts level with the handler; the failure region
/// starts below the error marker that closes the body.
fn place_error_regions(node: &mut FlowNode, cursor: Cursor, config: &LayoutConfig) {
    let marker = config.while_node_width;
    let mut body_height = 0.0;

    if let Some(index) = node.branch_index(&BranchKind::Body) {
        let body = &mut node.branches[index];
        if let Some(geometry) = body.geometry.as_mut() {
            match geometry.size().copied() {
                Some(body_size) => {
                    geometry.set_origin(cursor.center_x - body_size.clw, cursor.y);
                    body_height = body_size.ch;
                    place_sequence(&mut body.children, cursor, config);
                }
                None => error!(node = %node.id, "error handler body without size, skipping"),
            }
        }
    }

    if let Some(index) = node.branch_index(&BranchKind::OnFailure) {
        let failure = &mut node.branches[index];
        if let Some(geometry) = failure.geometry.as_mut() {
            match geometry.size().copied() {
                Some(failure_size) => {
                    let failure_y = cursor.y + body_height + marker + config.gap_y;
                    geometry.set_origin(cursor.center_x - failure_size.clw, failure_y);
                    place_sequence(&mut failure.children, cursor.at(failure_y), config);
                }
                None => error!(node = %node.id, "failure region without size, skipping"),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{Branch, NodeKind, Point};
    use crate::layout::init::normalize;
    use crate::layout::sizing::size_flow;

    fn positioned(nodes: Vec<FlowNode>) -> (Flow, f32) {
        let config = LayoutConfig::default();
        let mut flow = Flow::new(nodes);
        normalize(&mut flow, &config);
        size_flow(&mut flow, &config);
        let bottom = position_flow(&mut flow, &config);
        (flow, bottom)
    }

    fn origin(node: &FlowNode) -> Point {
        node.origin().unwrap()
    }

    #[test]
    fn sequence_advances_by_height_and_gap() {
        let (flow, bottom) = positioned(vec![
            FlowNode::new("a", NodeKind::Variable),
            FlowNode::new("b", NodeKind::Variable),
        ]);
        assert_eq!(origin(&flow.nodes[0]), Point { x: 40.0, y: 50.0 });
        assert_eq!(origin(&flow.nodes[1]), Point { x: 40.0, y: 153.0 });
        assert_eq!(origin(&flow.nodes[2]), Point { x: 170.0, y: 256.0 });
        assert_eq!(bottom, 356.0);
    }

    #[test]
    fn conditional_branches_sit_side_by_side() {
        let node = FlowNode::new("if", NodeKind::If).with_branch(
            Branch::new("Then", BranchKind::Conditional)
                .with_children(vec![FlowNode::new("a", NodeKind::Variable)]),
        );
        let (flow, bottom) = positioned(vec![node]);
        let node = &flow.nodes[0];
        assert_eq!(origin(node), Point { x: 317.5, y: 50.0 });
        assert_eq!(node.branches[0].origin(), Some(Point { x: 40.0, y: 165.0 }));
        assert_eq!(node.branches[1].origin(), Some(Point { x: 380.0, y: 165.0 }));
        assert_eq!(origin(&node.branches[0].children[0]), Point { x: 40.0, y: 165.0 });
        assert_eq!(origin(&node.branches[1].children[0]), Point { x: 510.0, y: 165.0 });
        assert_eq!(origin(&flow.nodes[1]), Point { x: 340.0, y: 390.0 });
        assert_eq!(bottom, 490.0);
    }

    #[test]
    fn failure_region_starts_below_the_body() {
        let node = FlowNode::new("eh", NodeKind::ErrorHandler)
            .with_branch(Branch::new("Body", BranchKind::Body))
            .with_branch(Branch::new("On Failure", BranchKind::OnFailure));
        let (flow, _) = positioned(vec![node]);
        let node = &flow.nodes[0];
        let body = node.branches[0].origin().unwrap();
        let failure = node.branches[1].origin().unwrap();
        let body_height = node.branches[0].size().unwrap().ch;
        assert_eq!(body.y, 50.0);
        assert_eq!(failure.y, 50.0 + body_height + 52.0 + 50.0);
    }

    #[test]
    fn unsized_nodes_are_skipped() {
        let config = LayoutConfig::default();
        let mut flow = Flow::new(vec![FlowNode::new("a", NodeKind::Variable)]);
        normalize(&mut flow, &config);
        let bottom = position_flow(&mut flow, &config);
        assert_eq!(bottom, config.start_y);
        assert!(flow.nodes.iter().all(|node| node.origin().is_none()));
    }

    #[test]
    fn positioning_is_repeatable() {
        let config = LayoutConfig::default();
        let node = FlowNode::new("w", NodeKind::Foreach);
        let (mut flow, bottom) = positioned(vec![node]);
        let before = flow.clone();
        let again = position_flow(&mut flow, &config);
        assert_eq!(bottom, again);
        assert_eq!(
            before.nodes[0].branches[0].children[0].geometry,
            flow.nodes[0].branches[0].children[0].geometry
        );
    }
}
