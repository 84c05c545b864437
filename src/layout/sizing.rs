//! Bottom-up sizing. Every size is computed in an exit hook, so children
//! and branches are always sized before the node that contains them.
//! Nodes and branches without a geometry slot (hidden regions) are skipped.

use serde_json::Value;
use tracing::{error, trace};

use super::traverse::{FlowVisitor, traverse_flow};
use crate::config::LayoutConfig;
use crate::ir::{Branch, BranchKind, Flow, FlowNode, NodeId, Size};

pub fn size_flow(flow: &mut Flow, config: &LayoutConfig) {
    let span = tracing::debug_span!("size", nodes = flow.nodes.len());
    let _guard = span.enter();
    let mut visitor = SizingVisitor { config };
    traverse_flow(&mut flow.nodes, &mut visitor);
}

struct SizingVisitor<'a> {
    config: &'a LayoutConfig,
}

impl SizingVisitor<'_> {
    fn apply(&self, node: &mut FlowNode, size: Size) {
        if let Some(geometry) = node.geometry.as_mut() {
            trace!(node = %node.id, ?size, "sized");
            geometry.set_size(size);
        }
    }

    fn base_size(&self, node: &FlowNode) -> Size {
        let cfg = self.config;
        let half = cfg.node_width / 2.0;
        let mut height = cfg.node_height + cfg.node_border * 2.0;
        if node.has_binding_label() {
            height += cfg.label_height;
        }
        Size::leaf(half, half, height)
    }

    fn api_call_size(&self, node: &FlowNode, extra_right: f32) -> Size {
        let cfg = self.config;
        let half = cfg.node_width / 2.0;
        let right = half + cfg.gap_x + cfg.node_height + cfg.label_height + extra_right;
        let mut height = cfg.node_height;
        if node.has_binding_label() {
            height += cfg.label_height;
        }
        Size::leaf(half, right, height)
    }

    /// Lays branches side by side under a split marker of `marker` width.
    /// Returns `None` when a branch has not been sized.
    fn side_by_side(&self, node: &FlowNode, marker: f32, extra_height: f32) -> Option<Size> {
        let cfg = self.config;
        let sizes: Vec<Size> = node
            .branches
            .iter()
            .filter_map(|branch| branch.size().copied())
            .collect();
        if sizes.len() != node.branches.len() {
            error!(node = %node.id, "branch without size under split node");
            return None;
        }
        let (first, last) = (sizes.first()?, sizes.last()?);
        let middle: f32 = if sizes.len() > 2 {
            sizes[1..sizes.len() - 1]
                .iter()
                .map(Size::container_width)
                .sum()
        } else {
            0.0
        };
        let bar = first.crw + middle + last.clw + cfg.gap_x * (sizes.len() as f32 - 1.0);
        let tallest = sizes
            .iter()
            .fold(0.0_f32, |acc, size| acc.max(size.ch.max(cfg.gap_y)));
        Some(Size::container(
            marker / 2.0,
            marker / 2.0,
            marker,
            first.clw + bar / 2.0,
            bar / 2.0 + last.crw,
            tallest + marker + extra_height,
        ))
    }
}

impl FlowVisitor for SizingVisitor<'_> {
    fn end_node(&mut self, node: &mut FlowNode) {
        let size = self.base_size(node);
        self.apply(node, size);
    }

    fn end_event_start(&mut self, node: &mut FlowNode) {
        let cfg = self.config;
        let width = (cfg.node_width / 3.0).round();
        let height = (cfg.node_height / 1.5).round() + cfg.node_border * 2.0;
        self.apply(node, Size::leaf(width / 2.0, width / 2.0, height));
    }

    fn end_empty(&mut self, node: &mut FlowNode) {
        let cfg = self.config;
        let half = cfg.end_node_width / 2.0;
        let container_half = cfg.empty_node_container_width / 2.0;
        let container_height = if node.is_last_node_marker() {
            cfg.node_height
        } else {
            cfg.end_node_width
        };
        self.apply(
            node,
            Size::container(
                half,
                half,
                cfg.end_node_width,
                container_half,
                container_half,
                container_height,
            ),
        );
    }

    fn end_comment(&mut self, node: &mut FlowNode) {
        let cfg = self.config;
        self.apply(node, Size::leaf(0.0, cfg.comment_node_width, cfg.node_height));
    }

    fn end_api_call(&mut self, node: &mut FlowNode) {
        let size = self.api_call_size(node, 0.0);
        self.apply(node, size);
    }

    fn end_agent_call(&mut self, node: &mut FlowNode) {
        let cfg = self.config;
        let mut size = self.api_call_size(node, cfg.label_width);
        let tools = node
            .metadata
            .data
            .as_ref()
            .and_then(|data| data.get("tools"))
            .and_then(Value::as_array)
            .map_or(0, Vec::len);
        let agent = &cfg.agent;
        let mut height = cfg.node_height
            + agent.tool_section_gap
            + agent.add_tool_button_width
            + agent.tool_gap * 2.0;
        height += tools as f32 * (cfg.node_height + agent.tool_gap);
        size.h = height;
        size.ch = height;
        self.apply(node, size);
    }

    fn end_prompt(&mut self, node: &mut FlowNode) {
        let cfg = self.config;
        let half = cfg.prompt_node_width / 2.0;
        self.apply(node, Size::leaf(half, half, cfg.prompt_node_height));
    }

    fn end_branch(&mut self, _owner: &NodeId, _index: usize, branch: &mut Branch) {
        let cfg = self.config;
        if branch.geometry.is_none() {
            return;
        }
        let mut left = 0.0_f32;
        let mut right = 0.0_f32;
        let mut height = 0.0_f32;
        for size in branch.children.iter().filter_map(FlowNode::size) {
            left = left.max(size.clw);
            right = right.max(size.crw);
            if height > 0.0 {
                height += cfg.gap_y;
            }
            height += size.ch;
        }
        let height = height.max(cfg.node_height * 2.0);
        if let Some(geometry) = branch.geometry.as_mut() {
            geometry.set_size(Size::leaf(left, right, height));
        }
    }

    fn end_conditional(&mut self, node: &mut FlowNode) {
        if node.geometry.is_none() {
            return;
        }
        let cfg = self.config;
        if let Some(size) = self.side_by_side(node, cfg.if_node_width, cfg.gap_y * 5.0 / 2.0) {
            self.apply(node, size);
        }
    }

    fn end_fork(&mut self, node: &mut FlowNode) {
        if node.geometry.is_none() {
            return;
        }
        let cfg = self.config;
        if let Some(size) = self.side_by_side(node, cfg.while_node_width, cfg.gap_y) {
            self.apply(node, size);
        }
    }

    fn end_loop(&mut self, node: &mut FlowNode) {
        let cfg = self.config;
        let (mut left, mut right, mut height) = (0.0_f32, 0.0_f32, 0.0_f32);
        if let Some(body) = node.branches.first().and_then(Branch::size) {
            left = body.clw.max(cfg.gap_x);
            right = body.crw.max(cfg.gap_x);
            height = body.ch;
        }
        let marker = cfg.while_node_width;
        let size = Size::container(
            marker / 2.0,
            marker / 2.0,
            marker,
            left + cfg.gap_x / 2.0,
            right + cfg.gap_x / 2.0,
            height + marker + cfg.gap_y * 2.0,
        );
        self.apply(node, size);
    }

    fn end_error_handler(&mut self, node: &mut FlowNode) {
        if node.geometry.is_none() {
            return;
        }
        let cfg = self.config;
        let (mut left, mut right, mut height) = (0.0_f32, 0.0_f32, 0.0_f32);

        let body_index = node.branch_index(&BranchKind::Body);
        let failure_index = node.branch_index(&BranchKind::OnFailure);

        let mut body_height = None;
        if let Some(body) = body_index
            .and_then(|index| node.branches.get_mut(index))
            .and_then(|branch| branch.geometry.as_mut())
            .and_then(|geometry| geometry.size_mut())
        {
            left = left.max(body.clw.max(cfg.gap_x));
            right = right.max(body.crw.max(cfg.gap_x));
            body.ch += cfg.gap_y;
            height = body.ch;
            body_height = Some(body.ch);
        }
        if let Some(failure) = failure_index
            .and_then(|index| node.branches.get(index))
            .and_then(Branch::size)
        {
            left = left.max(failure.clw.max(cfg.gap_x));
            right = right.max(failure.crw.max(cfg.gap_x));
            height = body_height.unwrap_or_default() + failure.ch + cfg.gap_y;
        }

        let marker = cfg.while_node_width;
        let size = Size::container(
            marker / 2.0,
            marker / 2.0,
            marker,
            left + cfg.gap_x / 2.0,
            right + cfg.gap_x / 2.0,
            height + marker + cfg.gap_y,
        );
        self.apply(node, size);
    }
}
