use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use flow_diagram_rs::config::LayoutConfig;
use flow_diagram_rs::ir::{Branch, BranchKind, Flow, FlowNode, NodeKind};
use flow_diagram_rs::layout::compute_layout;
use flow_diagram_rs::parser::parse_flow;
use flow_diagram_rs::render::render_svg;
use flow_diagram_rs::theme::Theme;
use std::hint::black_box;

/// Sequence of `statements` nodes with an if, a while and an error handler
/// inserted every few statements, nested `depth` levels deep.
fn synthetic_flow(statements: usize, depth: usize) -> Flow {
    fn block(prefix: &str, statements: usize, depth: usize) -> Vec<FlowNode> {
        let mut nodes = Vec::with_capacity(statements + 3);
        for i in 0..statements {
            let id = format!("{prefix}{i}");
            let node = match (i % 7, depth) {
                (3, d) if d > 0 => FlowNode::new(id.clone(), NodeKind::If)
                    .with_branch(
                        Branch::new("Then", BranchKind::Conditional)
                            .with_children(block(&format!("{id}t"), statements / 3, d - 1)),
                    )
                    .with_branch(
                        Branch::new("Else", BranchKind::Else)
                            .with_children(block(&format!("{id}e"), statements / 4, d - 1)),
                    ),
                (5, d) if d > 0 => FlowNode::new(id.clone(), NodeKind::While).with_branch(
                    Branch::new("Body", BranchKind::Body)
                        .with_children(block(&format!("{id}b"), statements / 3, d - 1)),
                ),
                (6, d) if d > 0 => FlowNode::new(id.clone(), NodeKind::ErrorHandler)
                    .with_branch(
                        Branch::new("Body", BranchKind::Body)
                            .with_children(block(&format!("{id}b"), statements / 4, d - 1)),
                    )
                    .with_branch(Branch::new("On Failure", BranchKind::OnFailure)),
                (1, _) => FlowNode::new(id, NodeKind::RemoteActionCall).with_label("client->get"),
                _ => FlowNode::new(id, NodeKind::Variable).with_label("int x = 0"),
            };
            nodes.push(node);
        }
        nodes
    }
    let mut nodes = vec![FlowNode::new("start", NodeKind::EventStart)];
    nodes.extend(block("n", statements, depth));
    Flow::new(nodes)
}

fn bench_parse(c: &mut Criterion) {
    let mut group = c.benchmark_group("parse");
    for (statements, depth) in [(10usize, 1usize), (40, 2), (120, 3)] {
        let name = format!("flow_{statements}_{depth}");
        let input =
            serde_json::to_string(&synthetic_flow(statements, depth)).expect("serialize failed");
        group.bench_with_input(BenchmarkId::from_parameter(name), &input, |b, data| {
            b.iter(|| {
                let flow = parse_flow(black_box(data)).expect("parse failed");
                black_box(flow.nodes.len());
            });
        });
    }
    group.finish();
}

fn bench_layout(c: &mut Criterion) {
    let mut group = c.benchmark_group("layout");
    let config = LayoutConfig::default();
    for (statements, depth) in [(10usize, 1usize), (40, 2), (120, 3), (400, 2)] {
        let name = format!("flow_{statements}_{depth}");
        let flow = synthetic_flow(statements, depth);
        group.bench_with_input(BenchmarkId::from_parameter(name), &flow, |b, flow| {
            b.iter(|| {
                let layout = compute_layout(black_box(flow), &config);
                black_box(layout.graph.node_count());
            });
        });
    }
    group.finish();
}

fn bench_collapsed_layout(c: &mut Criterion) {
    let mut group = c.benchmark_group("layout_collapsed_error_handlers");
    let mut config = LayoutConfig::default();
    config.error_handlers.collapse = true;
    for (statements, depth) in [(40usize, 2usize), (120, 3)] {
        let name = format!("flow_{statements}_{depth}");
        let flow = synthetic_flow(statements, depth);
        group.bench_with_input(BenchmarkId::from_parameter(name), &flow, |b, flow| {
            b.iter(|| {
                let layout = compute_layout(black_box(flow), &config);
                black_box(layout.graph.edge_count());
            });
        });
    }
    group.finish();
}

fn bench_render(c: &mut Criterion) {
    let mut group = c.benchmark_group("render");
    let theme = Theme::modern();
    let config = LayoutConfig::default();
    for (statements, depth) in [(40usize, 2usize), (120, 3)] {
        let name = format!("flow_{statements}_{depth}");
        let layout = compute_layout(&synthetic_flow(statements, depth), &config);
        group.bench_with_input(BenchmarkId::from_parameter(name), &layout, |b, layout| {
            b.iter(|| {
                let svg = render_svg(black_box(layout), &theme, &config);
                black_box(svg.len());
            });
        });
    }
    group.finish();
}

criterion_group!(
    benches,
    bench_parse,
    bench_layout,
    bench_collapsed_layout,
    bench_render
);
criterion_main!(benches);
