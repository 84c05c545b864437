//! Contracts consumed by the host around a laid-out diagram: persisted
//! pan/zoom per diagram and node-to-source lookup.

use std::collections::HashMap;

use crate::ir::{Flow, FlowNode, LineRange, NodeId};
use crate::layout::Bounds;

pub const MIN_ZOOM: f32 = 0.1;
pub const MAX_ZOOM: f32 = 1.0;

/// Pan offset and zoom factor of a rendered diagram.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub offset_x: f32,
    pub offset_y: f32,
    pub zoom: f32,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            offset_x: 0.0,
            offset_y: 0.0,
            zoom: 1.0,
        }
    }
}

impl Viewport {
    /// Largest zoom (capped at 1) that shows all of `bounds` inside a
    /// `canvas_width` x `canvas_height` canvas, with the bounds centered.
    pub fn fit(bounds: &Bounds, canvas_width: f32, canvas_height: f32) -> Self {
        let width = bounds.width().max(1.0);
        let height = bounds.height().max(1.0);
        let zoom = (canvas_width / width)
            .min(canvas_height / height)
            .clamp(MIN_ZOOM, MAX_ZOOM);
        let (center_x, center_y) = bounds.center();
        Self {
            offset_x: canvas_width / 2.0 - center_x * zoom,
            offset_y: canvas_height / 2.0 - center_y * zoom,
            zoom,
        }
    }
}

pub trait ViewportStore {
    fn get(&self, key: &str) -> Option<Viewport>;
    fn set(&mut self, key: &str, viewport: Viewport);
}

#[derive(Debug, Clone, Default)]
pub struct MemoryViewportStore {
    entries: HashMap<String, Viewport>,
}

impl MemoryViewportStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ViewportStore for MemoryViewportStore {
    fn get(&self, key: &str) -> Option<Viewport> {
        self.entries.get(key).copied()
    }

    fn set(&mut self, key: &str, viewport: Viewport) {
        self.entries.insert(key.to_string(), viewport);
    }
}

/// Returns the viewport stored under `key`, or fits `bounds` to the canvas
/// and stores the result.
pub fn restore_or_fit<S: ViewportStore + ?Sized>(
    store: &mut S,
    key: &str,
    bounds: Option<Bounds>,
    canvas_width: f32,
    canvas_height: f32,
) -> Viewport {
    if let Some(viewport) = store.get(key) {
        tracing::debug!(key, zoom = viewport.zoom, "restored viewport");
        return viewport;
    }
    let viewport = bounds
        .map(|bounds| Viewport::fit(&bounds, canvas_width, canvas_height))
        .unwrap_or_default();
    store.set(key, viewport);
    viewport
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceLocation {
    pub file_name: String,
    pub range: LineRange,
}

pub trait SourceLocator {
    fn locate(&self, id: &NodeId) -> Option<SourceLocation>;
}

/// Id-to-location index over the source nodes of a flow. Synthetic nodes
/// have no source and are not indexed.
#[derive(Debug, Clone, Default)]
pub struct FlowSourceIndex {
    locations: HashMap<NodeId, SourceLocation>,
}

impl FlowSourceIndex {
    pub fn from_flow(flow: &Flow) -> Self {
        let mut index = Self::default();
        index.insert_all(&flow.nodes, &flow.file_name);
        index
    }

    fn insert_all(&mut self, nodes: &[FlowNode], file_name: &str) {
        for node in nodes {
            if !node.id.is_synthetic()
                && let Some(range) = node.line_range()
            {
                let file_name = if range.file_name.is_empty() {
                    file_name.to_string()
                } else {
                    range.file_name.clone()
                };
                self.locations.insert(
                    node.id.clone(),
                    SourceLocation {
                        file_name,
                        range: range.clone(),
                    },
                );
            }
            for branch in &node.branches {
                self.insert_all(&branch.children, file_name);
            }
        }
    }

    pub fn len(&self) -> usize {
        self.locations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locations.is_empty()
    }
}

impl SourceLocator for FlowSourceIndex {
    fn locate(&self, id: &NodeId) -> Option<SourceLocation> {
        self.locations.get(id).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LayoutConfig;
    use crate::ir::{Branch, BranchKind, LinePosition, NodeKind, SyntheticRole};
    use crate::layout::compute_layout;

    fn range(line: u32) -> LineRange {
        LineRange::new(LinePosition::new(line, 4), LinePosition::new(line, 20))
    }

    #[test]
    fn fit_centers_and_caps_zoom() {
        let bounds = Bounds {
            min_x: 0.0,
            min_y: 0.0,
            max_x: 200.0,
            max_y: 100.0,
        };
        let viewport = Viewport::fit(&bounds, 800.0, 600.0);
        assert_eq!(viewport.zoom, 1.0);
        assert_eq!(viewport.offset_x, 300.0);
        assert_eq!(viewport.offset_y, 250.0);

        let tall = Bounds { max_y: 1200.0, ..bounds };
        assert_eq!(Viewport::fit(&tall, 800.0, 600.0).zoom, 0.5);
    }

    #[test]
    fn stored_viewport_wins_over_fit() {
        let layout = compute_layout(
            &Flow::new(vec![FlowNode::new("a", NodeKind::Variable)]),
            &LayoutConfig::default(),
        );
        let mut store = MemoryViewportStore::new();
        let first = restore_or_fit(&mut store, "main.bal", layout.bounds(), 1200.0, 800.0);
        assert_eq!(store.get("main.bal"), Some(first));

        let moved = Viewport {
            offset_x: -40.0,
            ..first
        };
        store.set("main.bal", moved);
        let restored = restore_or_fit(&mut store, "main.bal", layout.bounds(), 1200.0, 800.0);
        assert_eq!(restored, moved);
    }

    #[test]
    fn missing_bounds_fall_back_to_identity() {
        let mut store = MemoryViewportStore::new();
        assert_eq!(restore_or_fit(&mut store, "k", None, 10.0, 10.0), Viewport::default());
    }

    #[test]
    fn index_resolves_nested_source_nodes() {
        let mut flow = Flow::new(vec![
            FlowNode::new("a", NodeKind::Variable).with_line_range(range(2)),
            FlowNode::new("w", NodeKind::While).with_line_range(range(3)).with_branch(
                Branch::new("Body", BranchKind::Body).with_children(vec![
                    FlowNode::new("b", NodeKind::FunctionCall).with_line_range(range(4)),
                ]),
            ),
        ]);
        flow.file_name = "main.bal".to_string();
        let index = FlowSourceIndex::from_flow(&flow);
        assert_eq!(index.len(), 3);
        let found = index.locate(&NodeId::new("b")).unwrap();
        assert_eq!(found.file_name, "main.bal");
        assert_eq!(found.range.start_line.line, 4);

        let marker = NodeId::synthetic(&NodeId::new("a"), SyntheticRole::LastNode, 0, None);
        assert!(index.locate(&marker).is_none());
    }
}
