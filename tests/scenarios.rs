//! Black-box end-to-end tests: write fixture source files, run the
//! pipeline, assert on query results.

use std::fs;

use pioneer::indexing;
use pioneer::persistence::{self, LoadMode};
use pioneer::query::QueryEngine;
use tempfile::TempDir;

fn index_fixture(files: &[(&str, &str)]) -> (TempDir, pioneer::graph::CrossRefGraph) {
    let dir = TempDir::new().unwrap();
    for (name, contents) in files {
        fs::write(dir.path().join(name), contents).unwrap();
    }
    let graph = indexing::run(dir.path(), 2, &[]).unwrap();
    (dir, graph)
}

#[test]
fn trivial_chain_emits_one_path() {
    let (_dir, graph) = index_fixture(&[("a.c", "void a(){ b(); }"), ("b.c", "void b(){}")]);
    let query = QueryEngine::new(&graph);

    let mut paths = Vec::new();
    query
        .find_paths("a.c::a", "b.c::b", &mut |p| {
            paths.push(p.to_vec());
            true
        })
        .unwrap();

    assert_eq!(paths, vec![vec!["a.c::a".to_string(), "b.c::b".to_string()]]);
}

#[test]
fn forward_trace_reaches_end_sentinel() {
    let (_dir, graph) = index_fixture(&[("main.c", "void leaf(){} void caller(){ leaf(); }")]);
    let query = QueryEngine::new(&graph);

    let mut paths = Vec::new();
    query
        .find_paths("main.c::caller", "END", &mut |p| {
            paths.push(p.to_vec());
            true
        })
        .unwrap();

    assert_eq!(
        paths,
        vec![vec![
            "main.c::caller".to_string(),
            "main.c::leaf".to_string(),
            "END".to_string()
        ]]
    );
}

#[test]
fn backtrace_emits_both_roots() {
    let (_dir, graph) = index_fixture(&[(
        "x.c",
        "void t(){} void p(){ t(); } void q(){ t(); }",
    )]);
    let query = QueryEngine::new(&graph);

    let mut paths = Vec::new();
    query
        .find_paths("START", "x.c::t", &mut |p| {
            paths.push(p.to_vec());
            true
        })
        .unwrap();
    paths.sort();

    let mut expected = vec![
        vec!["x.c::p".to_string(), "x.c::t".to_string()],
        vec!["x.c::q".to_string(), "x.c::t".to_string()],
    ];
    expected.sort();
    assert_eq!(paths, expected);
}

#[test]
fn cyclic_calls_do_not_duplicate_or_hang() {
    let (_dir, graph) = index_fixture(&[("c.c", "void f(){ g(); } void g(){ f(); }")]);
    let query = QueryEngine::new(&graph);

    let mut paths = Vec::new();
    query
        .find_paths("c.c::f", "c.c::g", &mut |p| {
            paths.push(p.to_vec());
            true
        })
        .unwrap();

    assert_eq!(paths, vec![vec!["c.c::f".to_string(), "c.c::g".to_string()]]);
}

#[test]
fn data_flow_resolves_source_and_sink() {
    let (_dir, graph) = index_fixture(&[("m.py", "def make():\n    return 1\ndef use():\n    x = make()\n")]);
    let query = QueryEngine::new(&graph);

    assert_eq!(query.data_sources("use.x").unwrap(), vec!["make".to_string()]);
    assert_eq!(query.data_sinks("make").unwrap(), vec!["use.x".to_string()]);
}

#[test]
fn incompatible_schema_is_rejected_then_fresh_index_succeeds() {
    let dir = TempDir::new().unwrap();
    let index_path = dir.path().join(".pioneer.json");
    fs::write(&index_path, r#"{"metadata":{"version":"0.9.0"}}"#).unwrap();

    let err = persistence::load(&index_path, LoadMode::Full).unwrap_err();
    assert!(matches!(err, pioneer::error::PioneerError::SchemaIncompatible { .. }));

    fs::write(dir.path().join("a.c"), "void a(){}").unwrap();
    let graph = indexing::run(dir.path(), 1, &[]).unwrap();
    persistence::save(&graph, &index_path).unwrap();

    let loaded = persistence::load(&index_path, LoadMode::Full).unwrap();
    assert!(loaded.get_uid("a.c::a").is_some());
}

#[test]
fn cross_file_call_resolution_via_short_name() {
    let (_dir, graph) = index_fixture(&[
        ("util.c", "int helper(){ return 1; }"),
        ("main.c", "int helper(); void run(){ helper(); }"),
    ]);
    let query = QueryEngine::new(&graph);
    let mut paths = Vec::new();
    query
        .find_paths("main.c::run", "util.c::helper", &mut |p| {
            paths.push(p.to_vec());
            true
        })
        .unwrap();
    assert_eq!(paths.len(), 1);
}
