use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use layered_graph_layout::config::Config;
use layered_graph_layout::ir::parse_graph_spec;
use layered_graph_layout::render::render_svg;
use layered_graph_layout::{Direction, Graph, LayoutOptions, LayoutSettings};
use std::hint::black_box;

/// A chain of `nodes` plus `extra_edges` skip edges; every seventh skip
/// points backwards so ranking has cycles to break.
fn dense_graph(nodes: usize, extra_edges: usize) -> Graph {
    let mut graph = Graph::new(Direction::TopDown, LayoutSettings::default());
    let ids: Vec<_> = (0..nodes)
        .map(|i| graph.add_node(40.0 + (i % 5) as f32 * 8.0, 24.0, format!("N{i}")))
        .collect();
    for pair in ids.windows(2) {
        let _ = graph.add_edge(pair[0], pair[1], None);
    }
    let mut count = 0usize;
    'outer: for i in 0..nodes {
        for j in (i + 2)..nodes {
            if count >= extra_edges {
                break 'outer;
            }
            let label = (count % 4 == 0).then_some(30.0);
            let (from, to) = if count % 7 == 0 { (j, i) } else { (i, j) };
            let _ = graph.add_edge(ids[from], ids[to], label);
            count += 1;
        }
    }
    graph
}

fn topology_source(nodes: usize) -> String {
    let edges: Vec<String> = (1..nodes)
        .map(|i| format!("{{ from: \"n{}\", to: \"n{i}\", label: \"e{i}\" }}", i / 2))
        .collect();
    format!("{{ direction: \"LR\", edges: [{}] }}", edges.join(", "))
}

fn bench_layout(c: &mut Criterion) {
    let mut group = c.benchmark_group("layout");
    for (nodes, extra_edges) in [(20usize, 30usize), (40, 80), (80, 320)] {
        let name = format!("dense_{}_{}", nodes, extra_edges);
        group.bench_with_input(
            BenchmarkId::from_parameter(name),
            &(nodes, extra_edges),
            |b, &(nodes, extra_edges)| {
                b.iter_batched(
                    || dense_graph(nodes, extra_edges),
                    |mut graph| {
                        graph.update_layout(LayoutOptions::default());
                        black_box(graph.state());
                    },
                    criterion::BatchSize::SmallInput,
                );
            },
        );
    }
    group.finish();
}

fn bench_passes(c: &mut Criterion) {
    let mut group = c.benchmark_group("layout_passes");
    for passes in [1usize, 6, 12] {
        group.bench_with_input(BenchmarkId::from_parameter(passes), &passes, |b, &passes| {
            b.iter_batched(
                || dense_graph(40, 80),
                |mut graph| {
                    graph.update_layout(LayoutOptions {
                        detangle_passes: passes,
                    });
                    black_box(graph.node_count());
                },
                criterion::BatchSize::SmallInput,
            );
        });
    }
    group.finish();
}

fn bench_routes(c: &mut Criterion) {
    let mut graph = dense_graph(60, 180);
    graph.update_layout(LayoutOptions::default());
    let ids: Vec<_> = graph.edges().map(|edge| edge.id()).collect();
    c.bench_function("routes_dense_60_180", |b| {
        b.iter(|| {
            let total: usize = ids
                .iter()
                .filter_map(|id| graph.route(*id))
                .map(|route| route.commands().len())
                .sum();
            black_box(total);
        });
    });
}

fn bench_end_to_end(c: &mut Criterion) {
    let mut group = c.benchmark_group("end_to_end");
    let config = Config::default();
    for nodes in [16usize, 64] {
        let input = topology_source(nodes);
        group.bench_with_input(BenchmarkId::from_parameter(nodes), &input, |b, data| {
            b.iter(|| {
                let spec = parse_graph_spec(black_box(data)).expect("parse failed");
                let mut diagram = spec.build(&config).expect("build failed");
                diagram.graph.update_layout(config.options);
                let svg = render_svg(&diagram, &config.theme, &config.sizing);
                black_box(svg.len());
            });
        });
    }
    group.finish();
}

criterion_group!(
    name = benches;
    config = Criterion::default();
    targets = bench_layout, bench_passes, bench_routes, bench_end_to_end
);
criterion_main!(benches);
