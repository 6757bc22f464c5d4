use criterion::{Criterion, criterion_group, criterion_main};
use pioneer::graph::CrossRefGraph;
use pioneer::query::QueryEngine;
use pioneer::types::SymbolType;

fn linear_chain(len: usize) -> CrossRefGraph {
    let mut graph = CrossRefGraph::new();
    let mut prev = graph.add_symbol("f0", SymbolType::Function);
    for i in 1..len {
        let cur = graph.add_symbol(&format!("f{i}"), SymbolType::Function);
        graph.add_call(prev, cur);
        prev = cur;
    }
    graph.finalize();
    graph
}

fn fan_out(branches: usize) -> CrossRefGraph {
    let mut graph = CrossRefGraph::new();
    let root = graph.add_symbol("root", SymbolType::Function);
    for i in 0..branches {
        let leaf = graph.add_symbol(&format!("leaf{i}"), SymbolType::Function);
        graph.add_call(root, leaf);
    }
    graph.finalize();
    graph
}

fn bench_forward_trace(c: &mut Criterion) {
    let graph = linear_chain(500);
    let engine = QueryEngine::new(&graph);

    c.bench_function("forward_trace_500_chain", |b| {
        b.iter(|| {
            let mut count = 0;
            engine
                .forward_trace("f0", &mut |_path| {
                    count += 1;
                    true
                })
                .unwrap();
            count
        })
    });
}

fn bench_find_symbols(c: &mut Criterion) {
    let graph = fan_out(2000);
    let engine = QueryEngine::new(&graph);

    c.bench_function("find_symbols_2000_fanout", |b| {
        b.iter(|| engine.find_symbols(&["leaf".to_string()]))
    });
}

criterion_group!(benches, bench_forward_trace, bench_find_symbols);
criterion_main!(benches);
