//! Layout pipeline: normalization, sizing, positioning and graph assembly
//! over a control-flow tree.
//!
//! Every pass is a [`traverse::FlowVisitor`] (positioning is a plain fold) and
//! works on a private copy of the caller's tree, so running the pipeline
//! twice on the same input yields the same [`Layout`].

pub mod init;
pub mod link_target;
pub mod node_factory;
pub mod position;
pub mod sizing;
pub mod traverse;
pub(crate) mod types;

pub use types::*;

use crate::config::LayoutConfig;
use crate::ir::Flow;

/// Normalizes, sizes and positions a copy of `flow` without assembling a
/// graph.
pub fn layout_tree(flow: &Flow, config: &LayoutConfig) -> Flow {
    let mut tree = flow.clone();
    init::normalize(&mut tree, config);
    sizing::size_flow(&mut tree, config);
    position::position_flow(&mut tree, config);
    tree
}

pub fn compute_layout(flow: &Flow, config: &LayoutConfig) -> Layout {
    let span = tracing::debug_span!("layout", file = %flow.file_name, roots = flow.nodes.len());
    let _guard = span.enter();

    let mut tree = flow.clone();
    init::normalize(&mut tree, config);
    sizing::size_flow(&mut tree, config);
    let bottom = position::position_flow(&mut tree, config);
    let mut graph = node_factory::build_graph(&mut tree, config);
    link_target::attach_link_targets(&mut tree, &mut graph);

    let (width, height) = match Bounds::of_graph(&graph) {
        Some(bounds) => (
            bounds.max_x + config.canvas_padding,
            bottom.max(bounds.max_y) + config.canvas_padding,
        ),
        None => (config.canvas_padding * 2.0, bottom + config.canvas_padding),
    };
    tracing::debug!(
        nodes = graph.node_count(),
        edges = graph.edge_count(),
        width,
        height,
        "layout complete"
    );

    Layout {
        tree,
        graph,
        width,
        height,
    }
}
