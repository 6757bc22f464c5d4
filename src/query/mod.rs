//! Query engine. Holds a non-owning reference to a finalized graph;
//! every path-enumeration operation is a DFS whose stack frames hold
//! iterator handles directly into the graph's own adjacency sets —
//! recursion gives us this for free, since each recursive call's local
//! `neighbors` binding is exactly such a handle, with no neighbor-list copy.

use std::collections::{HashMap, HashSet, VecDeque};

use crate::error::{PioneerError, PioneerResult};
use crate::graph::CrossRefGraph;
use crate::types::{END_SENTINEL, SymbolType, SymbolUid, START_SENTINEL};

/// Stop enumeration when a callback returns `false`; this threads that
/// signal back up the recursion.
type PathCallback<'a> = dyn FnMut(&[String]) -> bool + 'a;

pub struct QueryEngine<'g> {
    graph: &'g CrossRefGraph,
}

impl<'g> QueryEngine<'g> {
    pub fn new(graph: &'g CrossRefGraph) -> Self {
        Self { graph }
    }

    pub fn has_symbol(&self, name: &str) -> bool {
        self.graph.get_uid(name).is_some()
    }

    /// Every symbol whose qualified name contains every pattern as a
    /// substring, narrowed left-to-right.
    pub fn find_symbols(&self, patterns: &[String]) -> Vec<String> {
        let mut candidates: Vec<&str> = self
            .graph
            .symbols_iter()
            .filter_map(|s| self.graph.get_name(s.uid))
            .collect();

        for pattern in patterns {
            candidates.retain(|name| name.contains(pattern.as_str()));
        }

        candidates.into_iter().map(String::from).collect()
    }

    pub fn data_sources(&self, var: &str) -> PioneerResult<Vec<String>> {
        let uid = self.resolve(var)?;
        Ok(self.names(self.graph.get_data_sources(uid)))
    }

    pub fn data_sinks(&self, src: &str) -> PioneerResult<Vec<String>> {
        let uid = self.resolve(src)?;
        Ok(self.names(self.graph.get_data_sinks(uid)))
    }

    pub fn variables_in(&self, pattern: &str) -> Vec<String> {
        self.graph
            .symbols_iter()
            .filter(|s| s.ty == SymbolType::Variable)
            .filter_map(|s| self.graph.get_name(s.uid))
            .filter(|name| name.contains(pattern))
            .map(String::from)
            .collect()
    }

    /// Dispatches on sentinel endpoints.
    pub fn find_paths(&self, start: &str, end: &str, callback: &mut PathCallback<'_>) -> PioneerResult<()> {
        match (start, end) {
            (START_SENTINEL, END_SENTINEL) => Err(PioneerError::BadQueryShape {
                reason: "--start and --end cannot both be sentinels".to_string(),
            }),
            (START_SENTINEL, _) => self.backtrace(end, callback),
            (_, END_SENTINEL) => self.forward_trace(start, callback),
            _ => self.bidirectional(start, end, callback),
        }
    }

    /// DFS on the reverse call graph from `sym`; emits a path, root first,
    /// every time traversal reaches a node with no callers.
    pub fn backtrace(&self, sym: &str, callback: &mut PathCallback<'_>) -> PioneerResult<()> {
        let target = self.resolve(sym)?;
        let mut in_path = HashSet::from([target]);
        let mut path = vec![target];
        backtrace_dfs(self.graph, self.graph.call_rev_map(), target, &mut in_path, &mut path, callback);
        Ok(())
    }

    /// DFS on the forward call graph from `sym` to `END`.
    pub fn forward_trace(&self, sym: &str, callback: &mut PathCallback<'_>) -> PioneerResult<()> {
        let start = self.resolve(sym)?;
        let Some(end) = self.graph.end_uid() else {
            return Ok(()); // ungraph not finalized; nothing to trace to
        };
        let mut in_path = HashSet::from([start]);
        let mut path = vec![start];
        dfs(self.graph, self.graph.call_fwd_map(), start, end, None, &mut in_path, &mut path, callback);
        Ok(())
    }

    /// DFS on the forward data-flow graph from `src` to `var`.
    pub fn find_data_flow_paths(&self, src: &str, var: &str, callback: &mut PathCallback<'_>) -> PioneerResult<()> {
        let start = self.resolve(src)?;
        let end = self.resolve(var)?;
        let mut in_path = HashSet::from([start]);
        let mut path = vec![start];
        dfs(self.graph, self.graph.data_fwd_map(), start, end, None, &mut in_path, &mut path, callback);
        Ok(())
    }

    /// Bidirectional search: reverse-reachability from `end` first,
    /// then a pruned forward DFS from `start`.
    fn bidirectional(&self, start: &str, end: &str, callback: &mut PathCallback<'_>) -> PioneerResult<()> {
        let start_uid = self.resolve(start)?;
        let end_uid = self.resolve(end)?;

        let can_reach_end = reverse_reachable(self.graph.call_rev_map(), end_uid);
        if !can_reach_end.contains(&start_uid) {
            return Ok(());
        }

        let mut in_path = HashSet::from([start_uid]);
        let mut path = vec![start_uid];
        dfs(
            self.graph,
            self.graph.call_fwd_map(),
            start_uid,
            end_uid,
            Some(&can_reach_end),
            &mut in_path,
            &mut path,
            callback,
        );
        Ok(())
    }

    fn resolve(&self, name: &str) -> PioneerResult<SymbolUid> {
        self.graph.get_uid(name).ok_or_else(|| PioneerError::SymbolNotFound {
            name: name.to_string(),
            suggestions: self.suggest(name),
        })
    }

    fn suggest(&self, name: &str) -> Vec<String> {
        self.graph
            .symbols_iter()
            .filter_map(|s| self.graph.get_name(s.uid))
            .filter(|candidate| candidate.contains(name))
            .take(5)
            .map(String::from)
            .collect()
    }

    fn names(&self, uids: Option<&HashSet<SymbolUid>>) -> Vec<String> {
        uids.into_iter()
            .flatten()
            .filter_map(|&uid| self.graph.get_name(uid))
            .map(String::from)
            .collect()
    }
}

fn reverse_reachable(call_rev: &HashMap<SymbolUid, HashSet<SymbolUid>>, end: SymbolUid) -> HashSet<SymbolUid> {
    let mut visited = HashSet::from([end]);
    let mut queue = VecDeque::from([end]);
    let empty = HashSet::new();

    while let Some(node) = queue.pop_front() {
        for &caller in call_rev.get(&node).unwrap_or(&empty) {
            if visited.insert(caller) {
                queue.push_back(caller);
            }
        }
    }
    visited
}

/// Generic forward-adjacency path enumerator shared by `forward_trace`,
/// `find_data_flow_paths`, and the bidirectional search's pruned phase.
/// Returns `false` once the callback asks to stop; callers bail out as
/// soon as a recursive call returns `false`.
#[allow(clippy::too_many_arguments)]
fn dfs(
    graph: &CrossRefGraph,
    adjacency: &HashMap<SymbolUid, HashSet<SymbolUid>>,
    current: SymbolUid,
    end: SymbolUid,
    prune: Option<&HashSet<SymbolUid>>,
    in_path: &mut HashSet<SymbolUid>,
    path: &mut Vec<SymbolUid>,
    callback: &mut PathCallback<'_>,
) -> bool {
    let empty = HashSet::new();
    let neighbors = adjacency.get(&current).unwrap_or(&empty);

    for &next in neighbors {
        if let Some(allowed) = prune {
            if !allowed.contains(&next) {
                continue;
            }
        }
        if next == end {
            path.push(next);
            let should_continue = emit(graph, path, callback);
            path.pop();
            if !should_continue {
                return false;
            }
            continue;
        }
        if in_path.contains(&next) {
            continue; // already on the current path; skip to avoid a cycle
        }
        in_path.insert(next);
        path.push(next);
        let should_continue = dfs(graph, adjacency, next, end, prune, in_path, path, callback);
        path.pop();
        in_path.remove(&next);
        if !should_continue {
            return false;
        }
    }
    true
}

fn backtrace_dfs(
    graph: &CrossRefGraph,
    call_rev: &HashMap<SymbolUid, HashSet<SymbolUid>>,
    current: SymbolUid,
    in_path: &mut HashSet<SymbolUid>,
    path: &mut Vec<SymbolUid>,
    callback: &mut PathCallback<'_>,
) -> bool {
    let empty = HashSet::new();
    let callers = call_rev.get(&current).unwrap_or(&empty);

    if callers.is_empty() {
        let names: Vec<String> = path
            .iter()
            .rev()
            .filter_map(|&uid| graph.get_name(uid))
            .map(String::from)
            .collect();
        return callback(&names);
    }

    for &caller in callers {
        if in_path.contains(&caller) {
            continue;
        }
        in_path.insert(caller);
        path.push(caller);
        let should_continue = backtrace_dfs(graph, call_rev, caller, in_path, path, callback);
        path.pop();
        in_path.remove(&caller);
        if !should_continue {
            return false;
        }
    }
    true
}

fn emit(graph: &CrossRefGraph, path: &[SymbolUid], callback: &mut PathCallback<'_>) -> bool {
    let names: Vec<String> = path.iter().filter_map(|&uid| graph.get_name(uid)).map(String::from).collect();
    callback(&names)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::SymbolType;

    fn chain_graph() -> CrossRefGraph {
        let mut g = CrossRefGraph::new();
        let a = g.add_symbol_with_file("a.c::a", "a.c", SymbolType::Function);
        let b = g.add_symbol_with_file("b.c::b", "b.c", SymbolType::Function);
        g.add_call(a, b);
        g.finalize();
        g
    }

    #[test]
    fn trivial_chain_emits_one_path() {
        let g = chain_graph();
        let q = QueryEngine::new(&g);
        let mut paths = Vec::new();
        q.find_paths("a.c::a", "b.c::b", &mut |p| {
            paths.push(p.to_vec());
            true
        })
        .unwrap();
        assert_eq!(paths, vec![vec!["a.c::a".to_string(), "b.c::b".to_string()]]);
    }

    #[test]
    fn forward_trace_reaches_end_sentinel() {
        let mut g = CrossRefGraph::new();
        let leaf = g.add_symbol_with_file("main.c::leaf", "main.c", SymbolType::Function);
        let caller = g.add_symbol_with_file("main.c::caller", "main.c", SymbolType::Function);
        g.add_call(caller, leaf);
        g.finalize();

        let q = QueryEngine::new(&g);
        let mut paths = Vec::new();
        q.find_paths("main.c::caller", "END", &mut |p| {
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
        let mut g = CrossRefGraph::new();
        let t = g.add_symbol_with_file("x.c::t", "x.c", SymbolType::Function);
        let p = g.add_symbol_with_file("x.c::p", "x.c", SymbolType::Function);
        let q_ = g.add_symbol_with_file("x.c::q", "x.c", SymbolType::Function);
        g.add_call(p, t);
        g.add_call(q_, t);
        g.finalize();

        let q = QueryEngine::new(&g);
        let mut paths = Vec::new();
        q.backtrace("x.c::t", &mut |p| {
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
        let mut g = CrossRefGraph::new();
        let f = g.add_symbol_with_file("c.c::f", "c.c", SymbolType::Function);
        let gg = g.add_symbol_with_file("c.c::g", "c.c", SymbolType::Function);
        g.add_call(f, gg);
        g.add_call(gg, f);
        g.finalize();

        let q = QueryEngine::new(&g);
        let mut paths = Vec::new();
        q.find_paths("c.c::f", "c.c::g", &mut |p| {
            paths.push(p.to_vec());
            true
        })
        .unwrap();
        assert_eq!(paths, vec![vec!["c.c::f".to_string(), "c.c::g".to_string()]]);
    }

    #[test]
    fn data_flow_resolves_one_hop_source_and_sink() {
        let mut g = CrossRefGraph::new();
        let make = g.add_symbol("make", SymbolType::Function);
        let var = g.add_symbol("use.x", SymbolType::Variable);
        g.add_data_flow(make, var);
        g.finalize();

        let q = QueryEngine::new(&g);
        assert_eq!(q.data_sources("use.x").unwrap(), vec!["make".to_string()]);
        assert_eq!(q.data_sinks("make").unwrap(), vec!["use.x".to_string()]);
    }

    #[test]
    fn callback_false_stops_enumeration_within_one_step() {
        let mut g = CrossRefGraph::new();
        let t = g.add_symbol_with_file("x.c::t", "x.c", SymbolType::Function);
        let p = g.add_symbol_with_file("x.c::p", "x.c", SymbolType::Function);
        let q_ = g.add_symbol_with_file("x.c::q", "x.c", SymbolType::Function);
        g.add_call(p, t);
        g.add_call(q_, t);
        g.finalize();

        let q = QueryEngine::new(&g);
        let mut count = 0;
        q.backtrace("x.c::t", &mut |_p| {
            count += 1;
            false
        })
        .unwrap();
        assert_eq!(count, 1);
    }

    #[test]
    fn find_symbols_narrows_conjunctively() {
        let mut g = CrossRefGraph::new();
        g.add_symbol("Foo::bar", SymbolType::Function);
        g.add_symbol("Foo::baz", SymbolType::Function);
        g.add_symbol("Other::bar", SymbolType::Function);
        g.finalize();

        let q = QueryEngine::new(&g);
        let found = q.find_symbols(&["Foo".to_string(), "bar".to_string()]);
        assert_eq!(found, vec!["Foo::bar".to_string()]);
    }

    #[test]
    fn both_sentinels_is_bad_query_shape() {
        let g = chain_graph();
        let q = QueryEngine::new(&g);
        let err = q.find_paths("START", "END", &mut |_| true).unwrap_err();
        assert!(matches!(err, PioneerError::BadQueryShape {.. }));
    }

    #[test]
    fn symbol_not_found_carries_suggestions() {
        let g = chain_graph();
        let q = QueryEngine::new(&g);
        let err = q.find_paths("a.c::a", "nonexistent", &mut |_| true).unwrap_err();
        match err {
            PioneerError::SymbolNotFound { name,.. } => assert_eq!(name, "nonexistent"),
            other => panic!("expected SymbolNotFound, got {other:?}"),
        }
    }
}
