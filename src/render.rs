//! SVG preview of an assembled graph. The host renders the real diagram;
//! this exists so a layout can be eyeballed from the command line.

use crate::config::{LayoutConfig, RenderConfig};
use crate::layout::{GraphEdge, GraphNode, GraphNodeKind, Layout};
use crate::theme::Theme;
use anyhow::Result;
use std::path::Path;

pub fn render_svg(layout: &Layout, theme: &Theme, config: &LayoutConfig) -> String {
    let mut svg = String::new();
    let width = layout.width.max(200.0);
    let height = layout.height.max(200.0);

    svg.push_str(&format!(
        "<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"{width}\" height=\"{height}\" viewBox=\"0 0 {width} {height}\">",
    ));
    svg.push_str(&format!(
        "<rect width=\"100%\" height=\"100%\" fill=\"{}\"/>",
        theme.background
    ));
    svg.push_str("<defs>");
    svg.push_str(&format!(
        "<marker id=\"arrow\" viewBox=\"0 0 10 10\" refX=\"10\" refY=\"5\" markerWidth=\"6\" markerHeight=\"6\" orient=\"auto-start-reverse\"><path d=\"M 0 0 L 10 5 L 0 10 z\" fill=\"{}\"/></marker>",
        theme.line_color
    ));
    svg.push_str("</defs>");

    let graph = &layout.graph;
    for edge in &graph.edges {
        let (Some(source), Some(target)) = (graph.node(&edge.source), graph.node(&edge.target))
        else {
            continue;
        };
        svg.push_str(&edge_svg(edge, source, target, theme, config));
    }

    for node in graph.nodes.iter().filter(|node| node.payload.visible) {
        svg.push_str(&node_svg(node, theme, config));
    }

    svg.push_str("</svg>");
    svg
}

/// Orthogonal route from the bottom of `source` to `target`. Edges that
/// align to the bottom bend level with the target; all others bend halfway.
fn edge_points(edge: &GraphEdge, source: &GraphNode, target: &GraphNode) -> Vec<(f32, f32)> {
    let start = (source.center_x(), source.y + source.height);
    let end_x = target.center_x();
    if (start.0 - end_x).abs() < 0.5 {
        return vec![start, (end_x, target.y)];
    }
    if edge.hints.align_bottom {
        let bend_y = target.y + target.height / 2.0;
        let end = if start.0 < end_x { target.x } else { target.x + target.width };
        return vec![start, (start.0, bend_y), (end, bend_y)];
    }
    let bend_y = start.1 + (target.y - start.1) / 2.0;
    vec![start, (start.0, bend_y), (end_x, bend_y), (end_x, target.y)]
}

fn points_to_path(points: &[(f32, f32)]) -> String {
    let mut d = String::new();
    for (idx, (x, y)) in points.iter().enumerate() {
        let op = if idx == 0 { "M" } else { " L" };
        d.push_str(&format!("{op} {x:.2} {y:.2}"));
    }
    d
}

fn edge_svg(
    edge: &GraphEdge,
    source: &GraphNode,
    target: &GraphNode,
    theme: &Theme,
    config: &LayoutConfig,
) -> String {
    let points = edge_points(edge, source, target);
    let mut out = String::new();
    let dash = if edge.hints.broken_line { " stroke-dasharray=\"4 4\"" } else { "" };
    let marker = if edge.hints.show_arrow { " marker-end=\"url(#arrow)\"" } else { "" };
    out.push_str(&format!(
        "<path d=\"{}\" fill=\"none\" stroke=\"{}\" stroke-width=\"{}\"{dash}{marker}/>",
        points_to_path(&points),
        theme.line_color,
        config.node_border
    ));

    if let Some(label) = &edge.label {
        let Some(&(x, y1)) = points.last() else {
            return out;
        };
        let y0 = points[points.len().saturating_sub(2)].1;
        let y = (y0 + y1) / 2.0;
        let label_w = text_width(label, theme) + 12.0;
        let label_h = theme.font_size + 8.0;
        out.push_str(&format!(
            "<rect x=\"{:.2}\" y=\"{:.2}\" width=\"{label_w:.2}\" height=\"{label_h:.2}\" rx=\"4\" ry=\"4\" fill=\"{}\"/>",
            x - label_w / 2.0,
            y - label_h / 2.0,
            theme.edge_label_background
        ));
        out.push_str(&text_svg(x, y, "middle", label, &theme.node_text_color, theme));
    }
    out
}

fn node_svg(node: &GraphNode, theme: &Theme, config: &LayoutConfig) -> String {
    let (x, y, w, h) = (node.x, node.y, node.width, node.height);
    let (cx, cy) = (x + w / 2.0, y + h / 2.0);
    let stroke_width = config.node_border;
    let (fill, border, dash) = if node.payload.draft {
        (&theme.draft_fill, &theme.draft_border, " stroke-dasharray=\"5 3\"")
    } else {
        (&theme.node_fill, &theme.node_border, "")
    };

    match node.kind {
        GraphNodeKind::Statement
        | GraphNodeKind::ApiCall
        | GraphNodeKind::AgentCall
        | GraphNodeKind::Prompt
        | GraphNodeKind::Draft
        | GraphNodeKind::Fork => {
            let mut out = format!(
                "<rect x=\"{x:.2}\" y=\"{y:.2}\" width=\"{w:.2}\" height=\"{h:.2}\" rx=\"8\" ry=\"8\" fill=\"{fill}\" stroke=\"{border}\" stroke-width=\"{stroke_width}\"{dash}/>"
            );
            let label = &node.payload.label;
            out.push_str(&text_svg(cx, cy, "middle", label, &theme.node_text_color, theme));
            out
        }
        GraphNodeKind::EventStart => {
            let mut out = format!(
                "<rect x=\"{x:.2}\" y=\"{y:.2}\" width=\"{w:.2}\" height=\"{h:.2}\" rx=\"{:.2}\" ry=\"{:.2}\" fill=\"{fill}\" stroke=\"{border}\" stroke-width=\"{stroke_width}\"/>",
                h / 2.0,
                h / 2.0
            );
            let label = &node.payload.label;
            out.push_str(&text_svg(cx, cy, "middle", label, &theme.node_text_color, theme));
            out
        }
        GraphNodeKind::Comment => {
            let label = &node.payload.label;
            text_svg(x, cy, "start", label, &theme.comment_text_color, theme)
        }
        GraphNodeKind::Conditional | GraphNodeKind::Loop => {
            let mut out = format!(
                "<polygon points=\"{cx:.2},{y:.2} {:.2},{cy:.2} {cx:.2},{:.2} {x:.2},{cy:.2}\" fill=\"{fill}\" stroke=\"{border}\" stroke-width=\"{stroke_width}\"/>",
                x + w,
                y + h
            );
            let label_x = x + w + 6.0;
            let label = &node.payload.label;
            out.push_str(&text_svg(label_x, cy, "start", label, &theme.node_text_color, theme));
            out
        }
        GraphNodeKind::ErrorHandler => format!(
            "<circle cx=\"{cx:.2}\" cy=\"{cy:.2}\" r=\"{:.2}\" fill=\"{fill}\" stroke=\"{}\" stroke-width=\"{stroke_width}\"/>",
            w / 2.0,
            theme.error_color
        ),
        GraphNodeKind::Empty => {
            let stroke = if node.payload.show_button {
                &theme.marker_fill
            } else {
                &theme.draft_border
            };
            format!(
                "<circle cx=\"{cx:.2}\" cy=\"{cy:.2}\" r=\"{:.2}\" fill=\"{}\" stroke=\"{stroke}\" stroke-width=\"{stroke_width}\"{dash}/>",
                w / 2.0,
                theme.background
            )
        }
        GraphNodeKind::Button => {
            let mut out = format!(
                "<circle cx=\"{cx:.2}\" cy=\"{cy:.2}\" r=\"{:.2}\" fill=\"{}\"/>",
                w / 2.0,
                theme.marker_fill
            );
            out.push_str(&text_svg(cx, cy, "middle", "+", &theme.background, theme));
            out
        }
        GraphNodeKind::End
        | GraphNodeKind::StartContainer
        | GraphNodeKind::EndContainer
        | GraphNodeKind::EndIf => format!(
            "<circle cx=\"{cx:.2}\" cy=\"{cy:.2}\" r=\"{:.2}\" fill=\"{}\"/>",
            w / 4.0,
            theme.marker_fill
        ),
    }
}

fn text_svg(x: f32, y: f32, anchor: &str, text: &str, fill: &str, theme: &Theme) -> String {
    if text.is_empty() {
        return String::new();
    }
    format!(
        "<text x=\"{x:.2}\" y=\"{:.2}\" text-anchor=\"{anchor}\" font-family=\"{}\" font-size=\"{}\" fill=\"{fill}\">{}</text>",
        y + theme.font_size / 3.0,
        theme.font_family,
        theme.font_size,
        escape_xml(text)
    )
}

fn text_width(text: &str, theme: &Theme) -> f32 {
    text.chars().count() as f32 * theme.font_size * 0.6
}

pub fn write_output_svg(svg: &str, output: Option<&Path>) -> Result<()> {
    match output {
        Some(path) => {
            std::fs::write(path, svg)?;
        }
        None => {
            print!("{}", svg);
        }
    }
    Ok(())
}

#[cfg(feature = "png")]
pub fn write_output_png(svg: &str, output: &Path, render_cfg: &RenderConfig) -> Result<()> {
    let mut opt = usvg::Options::default();
    opt.font_family = "Inter".to_string();
    if let Some(size) = usvg::Size::from_wh(render_cfg.width, render_cfg.height) {
        opt.default_size = size;
    }

    let tree = usvg::Tree::from_str(svg, &opt)?;
    let size = tree.size().to_int_size();
    let mut pixmap = resvg::tiny_skia::Pixmap::new(size.width(), size.height())
        .ok_or_else(|| anyhow::anyhow!("Failed to allocate pixmap"))?;

    match parse_hex_color(&render_cfg.background) {
        Some([r, g, b, a]) => pixmap.fill(resvg::tiny_skia::Color::from_rgba8(r, g, b, a)),
        None => tracing::warn!(
            background = %render_cfg.background,
            "unreadable background colour, leaving the canvas transparent"
        ),
    }

    let mut pixmap_mut = pixmap.as_mut();
    resvg::render(&tree, resvg::tiny_skia::Transform::default(), &mut pixmap_mut);
    pixmap.save_png(output)?;
    Ok(())
}

#[cfg(not(feature = "png"))]
pub fn write_output_png(_svg: &str, _output: &Path, _render_cfg: &RenderConfig) -> Result<()> {
    Err(anyhow::anyhow!("PNG output requires the `png` feature"))
}

/// `#RGB`, `#RRGGBB` or `#RRGGBBAA` as RGBA bytes.
#[cfg_attr(not(feature = "png"), allow(dead_code))]
fn parse_hex_color(input: &str) -> Option<[u8; 4]> {
    let hex = input.trim().strip_prefix('#')?;
    if !hex.is_ascii() {
        return None;
    }
    let channel = |range: std::ops::Range<usize>| u8::from_str_radix(&hex[range], 16).ok();
    match hex.len() {
        3 => {
            let short = |idx: usize| channel(idx..idx + 1).map(|v| v * 17);
            Some([short(0)?, short(1)?, short(2)?, 255])
        }
        6 => Some([channel(0..2)?, channel(2..4)?, channel(4..6)?, 255]),
        8 => Some([channel(0..2)?, channel(2..4)?, channel(4..6)?, channel(6..8)?]),
        _ => None,
    }
}

fn escape_xml(input: &str) -> String {
    input
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}
