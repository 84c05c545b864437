use crate::ir::LinePosition;
use crate::layout::{GraphEdge, GraphNode, Layout};
use serde::Serialize;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

#[derive(Debug, Serialize)]
pub struct LayoutDump {
    pub file_name: String,
    pub width: f32,
    pub height: f32,
    pub nodes: Vec<NodeDump>,
    pub edges: Vec<EdgeDump>,
}

#[derive(Debug, Serialize)]
pub struct NodeDump {
    pub id: String,
    pub kind: String,
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub label: String,
    pub source_kind: Option<String>,
    pub visible: bool,
    pub show_button: bool,
    pub draft: bool,
    pub insertion_target: Option<LinePosition>,
    pub owner: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct EdgeDump {
    pub id: String,
    pub from: String,
    pub to: String,
    pub label: Option<String>,
    pub insertion_target: Option<LinePosition>,
    pub owner: Option<String>,
    pub broken_line: bool,
    pub show_add_button: bool,
    pub show_arrow: bool,
    pub align_bottom: bool,
    pub show_button_always: bool,
}

impl From<&GraphNode> for NodeDump {
    fn from(node: &GraphNode) -> Self {
        NodeDump {
            id: node.id.to_string(),
            kind: node.kind.as_str().to_string(),
            x: node.x,
            y: node.y,
            width: node.width,
            height: node.height,
            label: node.payload.label.clone(),
            source_kind: node.payload.source_kind.as_ref().map(|kind| kind.to_string()),
            visible: node.payload.visible,
            show_button: node.payload.show_button,
            draft: node.payload.draft,
            insertion_target: node.payload.insertion_target,
            owner: node.payload.owner.as_ref().map(|owner| owner.to_string()),
        }
    }
}

impl From<&GraphEdge> for EdgeDump {
    fn from(edge: &GraphEdge) -> Self {
        EdgeDump {
            id: edge.id.to_string(),
            from: edge.source.to_string(),
            to: edge.target.to_string(),
            label: edge.label.clone(),
            insertion_target: edge.insertion_target,
            owner: edge.owner.as_ref().map(|owner| owner.to_string()),
            broken_line: edge.hints.broken_line,
            show_add_button: edge.hints.show_add_button,
            show_arrow: edge.hints.show_arrow,
            align_bottom: edge.hints.align_bottom,
            show_button_always: edge.hints.show_button_always,
        }
    }
}

impl LayoutDump {
    pub fn from_layout(layout: &Layout) -> Self {
        LayoutDump {
            file_name: layout.tree.file_name.clone(),
            width: layout.width,
            height: layout.height,
            nodes: layout.graph.nodes.iter().map(NodeDump::from).collect(),
            edges: layout.graph.edges.iter().map(EdgeDump::from).collect(),
        }
    }
}

/// Writes the pretty-printed dump to `path`, or to stdout when `path` is
/// `None`.
pub fn write_layout_dump(path: Option<&Path>, layout: &Layout) -> anyhow::Result<()> {
    let dump = LayoutDump::from_layout(layout);
    match path {
        Some(path) => {
            let file = File::create(path)?;
            let writer = BufWriter::new(file);
            serde_json::to_writer_pretty(writer, &dump)?;
        }
        None => {
            let mut stdout = std::io::stdout().lock();
            serde_json::to_writer_pretty(&mut stdout, &dump)?;
            writeln!(stdout)?;
        }
    }
    Ok(())
}
