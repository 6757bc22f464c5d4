//! Cross-reference graph: UID-keyed symbol table, file provenance,
//! and four adjacency maps (call forward/reverse, data-flow forward/reverse).
//!
//! Hand-rolled rather than built on a generic graph crate: the DFS path
//! enumerator in `crate::query` needs iterator handles directly into these
//! adjacency sets ("State representation"), which a generic edge-list
//! API does not expose without a copy.

use std::collections::{HashMap, HashSet};

use crate::pool::StringPool;
use crate::types::{END_SYMBOL_NAME, FileUid, SymbolType, SymbolUid};

#[derive(Debug, Clone)]
pub struct Symbol {
    pub uid: SymbolUid,
    pub name_idx: u32,
    pub ty: SymbolType,
    pub file_uid: Option<FileUid>,
}

/// Build-then-freeze cross-reference graph (Lifecycle).
#[derive(Debug, Default)]
pub struct CrossRefGraph {
    name_pool: StringPool,
    path_pool: StringPool,

    name_to_uid: HashMap<Box<str>, SymbolUid>,
    symbols: HashMap<SymbolUid, Symbol>,

    path_to_file: HashMap<Box<str>, FileUid>,
    file_paths: HashMap<FileUid, u32>,
    file_symbols: HashMap<FileUid, Vec<SymbolUid>>,

    call_fwd: HashMap<SymbolUid, HashSet<SymbolUid>>,
    call_rev: HashMap<SymbolUid, HashSet<SymbolUid>>,
    data_fwd: HashMap<SymbolUid, HashSet<SymbolUid>>,
    data_rev: HashMap<SymbolUid, HashSet<SymbolUid>>,

    next_symbol_uid: u64,
    next_file_uid: u64,
    end_uid: Option<SymbolUid>,
    finalized: bool,
}

impl CrossRefGraph {
    pub fn new() -> Self {
        Self {
            next_symbol_uid: 1,
            next_file_uid: 1,
                ..Default::default()
        }
    }

    pub fn is_finalized(&self) -> bool {
        self.finalized
    }

    pub fn end_uid(&self) -> Option<SymbolUid> {
        self.end_uid
    }

    /// `add_symbol(name, type)`: idempotent on `name`. On a repeat call the
    /// type argument *overwrites* the stored type (open question: /// preserve last-write-wins, do not "improve" this).
    pub fn add_symbol(&mut self, name: &str, ty: SymbolType) -> SymbolUid {
        if let Some(&uid) = self.name_to_uid.get(name) {
            if let Some(symbol) = self.symbols.get_mut(&uid) {
                symbol.ty = ty;
            }
            return uid;
        }

        let uid = SymbolUid::new(self.next_symbol_uid).expect("next_symbol_uid is never 0");
        self.next_symbol_uid += 1;

        let name_idx = self.name_pool.intern(name);
        self.name_to_uid.insert(name.into(), uid);
        self.symbols.insert(
            uid,
            Symbol {
                uid,
                name_idx,
                ty,
                file_uid: None,
            },
        );
        uid
    }

    /// `add_symbol(name, path, type)`: as above, then attaches file
    /// provenance. First attachment wins ; later calls with a different
    /// path are ignored.
    pub fn add_symbol_with_file(&mut self, name: &str, path: &str, ty: SymbolType) -> SymbolUid {
        let uid = self.add_symbol(name, ty);
        let file_uid = self.get_or_create_file_uid(path);
        self.attach_file(uid, file_uid);
        uid
    }

    fn attach_file(&mut self, uid: SymbolUid, file_uid: FileUid) {
        let symbol = self
            .symbols
            .get_mut(&uid)
            .expect("uid returned by add_symbol always exists");
        if symbol.file_uid.is_some() {
            return;
        }
        symbol.file_uid = Some(file_uid);
        self.file_symbols.entry(file_uid).or_default().push(uid);
    }

    pub fn get_or_create_file_uid(&mut self, path: &str) -> FileUid {
        if let Some(&uid) = self.path_to_file.get(path) {
            return uid;
        }
        let uid = FileUid::new(self.next_file_uid).expect("next_file_uid is never 0");
        self.next_file_uid += 1;
        let path_idx = self.path_pool.intern(path);
        self.path_to_file.insert(path.into(), uid);
        self.file_paths.insert(uid, path_idx);
        uid
    }

    /// Inserts into both forward and reverse call adjacencies. Idempotent.
    pub fn add_call(&mut self, caller: SymbolUid, callee: SymbolUid) {
        debug_assert_ne!(Some(caller), self.end_uid, "END must not have outgoing calls");
        self.call_fwd.entry(caller).or_default().insert(callee);
        self.call_rev.entry(callee).or_default().insert(caller);
    }

    /// Inserts into both forward and reverse data-flow adjacencies.
    pub fn add_data_flow(&mut self, source: SymbolUid, variable: SymbolUid) {
        self.data_fwd.entry(source).or_default().insert(variable);
        self.data_rev.entry(variable).or_default().insert(source);
    }

    /// Allocates `END`, connects every call-edge-less `Function` to it, then
    /// compacts. After this, the graph is read-only by convention (no `&mut
    /// self` methods are offered past this point besides this one, which is
    /// itself a no-op if called twice).
    pub fn finalize(&mut self) {
        if self.finalized {
            return;
        }

        let end_uid = SymbolUid::new(self.next_symbol_uid).expect("next_symbol_uid is never 0");
        self.next_symbol_uid += 1;
        let name_idx = self.name_pool.intern(END_SYMBOL_NAME);
        self.name_to_uid.insert(END_SYMBOL_NAME.into(), end_uid);
        self.symbols.insert(
            end_uid,
            Symbol {
                uid: end_uid,
                name_idx,
                ty: SymbolType::End,
                file_uid: None,
            },
        );
        self.end_uid = Some(end_uid);

        let leaf_functions: Vec<SymbolUid> = self
            .symbols
            .values()
            .filter(|s| {
                s.ty == SymbolType::Function
                    && self.call_fwd.get(&s.uid).is_none_or(|set| set.is_empty())
            })
            .map(|s| s.uid)
            .collect();

        for caller in leaf_functions {
            self.add_call(caller, end_uid);
        }

        self.call_fwd.shrink_to_fit();
        self.call_rev.shrink_to_fit();
        self.data_fwd.shrink_to_fit();
        self.data_rev.shrink_to_fit();
        self.symbols.shrink_to_fit();

        self.finalized = true;
    }

    // --- Read operations; all return empty/invalid on lookup miss. ---

    pub fn get_uid(&self, name: &str) -> Option<SymbolUid> {
        self.name_to_uid.get(name).copied()
    }

    pub fn get_symbol(&self, uid: SymbolUid) -> Option<&Symbol> {
        self.symbols.get(&uid)
    }

    pub fn get_name(&self, uid: SymbolUid) -> Option<&str> {
        self.symbols
            .get(&uid)
            .and_then(|s| self.name_pool.get(s.name_idx))
    }

    pub fn get_callees(&self, uid: SymbolUid) -> Option<&HashSet<SymbolUid>> {
        self.call_fwd.get(&uid)
    }

    pub fn get_callers(&self, uid: SymbolUid) -> Option<&HashSet<SymbolUid>> {
        self.call_rev.get(&uid)
    }

    pub fn get_data_sources(&self, variable_uid: SymbolUid) -> Option<&HashSet<SymbolUid>> {
        self.data_rev.get(&variable_uid)
    }

    pub fn get_data_sinks(&self, source_uid: SymbolUid) -> Option<&HashSet<SymbolUid>> {
        self.data_fwd.get(&source_uid)
    }

    pub fn is_variable(&self, uid: SymbolUid) -> bool {
        self.symbols
            .get(&uid)
            .is_some_and(|s| s.ty == SymbolType::Variable)
    }

    pub fn get_file_path(&self, file_uid: FileUid) -> Option<&str> {
        self.file_paths
            .get(&file_uid)
            .and_then(|&idx| self.path_pool.get(idx))
    }

    pub fn get_symbol_file_uid(&self, uid: SymbolUid) -> Option<FileUid> {
        self.symbols.get(&uid).and_then(|s| s.file_uid)
    }

    pub fn get_file_symbols(&self, file_uid: FileUid) -> &[SymbolUid] {
        self.file_symbols
            .get(&file_uid)
            .map(|v| v.as_slice())
            .unwrap_or(&[])
    }

    pub fn symbols_iter(&self) -> impl Iterator<Item = &Symbol> {
        self.symbols.values()
    }

    pub fn files_iter(&self) -> impl Iterator<Item = (FileUid, &str)> {
        self.file_paths
            .iter()
            .filter_map(|(&uid, &idx)| self.path_pool.get(idx).map(|p| (uid, p)))
    }

    pub fn call_fwd_map(&self) -> &HashMap<SymbolUid, HashSet<SymbolUid>> {
        &self.call_fwd
    }

    pub fn call_rev_map(&self) -> &HashMap<SymbolUid, HashSet<SymbolUid>> {
        &self.call_rev
    }

    pub fn data_fwd_map(&self) -> &HashMap<SymbolUid, HashSet<SymbolUid>> {
        &self.data_fwd
    }

    pub fn data_rev_map(&self) -> &HashMap<SymbolUid, HashSet<SymbolUid>> {
        &self.data_rev
    }

    pub fn symbol_count(&self) -> usize {
        self.symbols.len()
    }

    pub fn file_count(&self) -> usize {
        self.file_paths.len()
    }

    /// Reconstructs a graph from persisted sections. Used only by
    /// `crate::persistence::reader`.
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn from_parts(
        name_to_uid: HashMap<Box<str>, SymbolUid>,
        symbol_types: HashMap<SymbolUid, SymbolType>,
        call_fwd: HashMap<SymbolUid, HashSet<SymbolUid>>,
        data_fwd: HashMap<SymbolUid, HashSet<SymbolUid>>,
        file_paths: HashMap<FileUid, Box<str>>,
        file_symbols: HashMap<FileUid, Vec<SymbolUid>>,
        symbol_files: HashMap<SymbolUid, FileUid>,
        end_uid: Option<SymbolUid>,
    ) -> Self {
        let mut graph = CrossRefGraph::new();

        for (name, &uid) in &name_to_uid {
            let idx = graph.name_pool.intern(name);
            graph.name_to_uid.insert(name.clone(), uid);
            let ty = symbol_types.get(&uid).copied().unwrap_or(SymbolType::Function);
            let file_uid = symbol_files.get(&uid).copied();
            graph.symbols.insert(
                uid,
                Symbol {
                    uid,
                    name_idx: idx,
                    ty,
                    file_uid,
                },
            );
            graph.next_symbol_uid = graph.next_symbol_uid.max(uid.value() + 1);
        }

        for (&file_uid, path) in &file_paths {
            let idx = graph.path_pool.intern(path);
            graph.path_to_file.insert(path.clone(), file_uid);
            graph.file_paths.insert(file_uid, idx);
            graph.next_file_uid = graph.next_file_uid.max(file_uid.value() + 1);
        }
        graph.file_symbols = file_symbols;

        for (caller, callees) in call_fwd {
            for callee in callees {
                graph.add_call(caller, callee);
            }
        }
        for (source, variables) in data_fwd {
            for variable in variables {
                graph.add_data_flow(source, variable);
            }
        }

        graph.end_uid = end_uid;
        graph.finalized = true;
        graph
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_symbol_is_idempotent_on_name() {
        let mut g = CrossRefGraph::new();
        let a = g.add_symbol("f", SymbolType::Function);
        let b = g.add_symbol("f", SymbolType::Function);
        assert_eq!(a, b);
        assert_eq!(g.symbol_count(), 1);
    }

    #[test]
    fn repeated_add_symbol_overwrites_type_but_not_file() {
        let mut g = CrossRefGraph::new();
        let uid = g.add_symbol_with_file("f", "a.c", SymbolType::Function);
        g.add_symbol("f", SymbolType::Variable);
        assert_eq!(g.get_symbol(uid).unwrap().ty, SymbolType::Variable);
        assert_eq!(g.get_symbol_file_uid(uid), Some(g.get_or_create_file_uid("a.c")));
    }

    #[test]
    fn first_file_attachment_wins() {
        let mut g = CrossRefGraph::new();
        let uid = g.add_symbol_with_file("f", "a.c", SymbolType::Function);
        let first_file = g.get_symbol_file_uid(uid).unwrap();
        g.add_symbol_with_file("f", "b.c", SymbolType::Function);
        assert_eq!(g.get_symbol_file_uid(uid), Some(first_file));
        assert_eq!(g.get_file_path(first_file), Some("a.c"));
    }

    #[test]
    fn call_edges_are_bidirectionally_consistent() {
        let mut g = CrossRefGraph::new();
        let a = g.add_symbol("a", SymbolType::Function);
        let b = g.add_symbol("b", SymbolType::Function);
        g.add_call(a, b);
        assert!(g.get_callees(a).unwrap().contains(&b));
        assert!(g.get_callers(b).unwrap().contains(&a));
    }

    #[test]
    fn call_edges_are_sets_not_multisets() {
        let mut g = CrossRefGraph::new();
        let a = g.add_symbol("a", SymbolType::Function);
        let b = g.add_symbol("b", SymbolType::Function);
        g.add_call(a, b);
        g.add_call(a, b);
        assert_eq!(g.get_callees(a).unwrap().len(), 1);
    }

    #[test]
    fn finalize_connects_leaves_to_end() {
        let mut g = CrossRefGraph::new();
        let leaf = g.add_symbol("leaf", SymbolType::Function);
        let caller = g.add_symbol("caller", SymbolType::Function);
        g.add_call(caller, leaf);
        g.finalize();

        let end = g.end_uid().unwrap();
        assert!(g.get_callees(leaf).unwrap().contains(&end));
        assert!(g.get_callees(end).is_none_or(|s| s.is_empty()));
        // caller has an outgoing edge already, so it must not gain a second one to END.
        assert!(!g.get_callees(caller).unwrap().contains(&end));
    }

    #[test]
    fn finalize_is_idempotent() {
        let mut g = CrossRefGraph::new();
        g.add_symbol("f", SymbolType::Function);
        g.finalize();
        let end_before = g.end_uid();
        g.finalize();
        assert_eq!(g.end_uid(), end_before);
        assert_eq!(g.symbol_count(), 2); // f + END, not duplicated
    }

    #[test]
    fn data_flow_edges_are_bidirectional() {
        let mut g = CrossRefGraph::new();
        let src = g.add_symbol("make", SymbolType::Function);
        let var = g.add_symbol("x", SymbolType::Variable);
        g.add_data_flow(src, var);
        assert!(g.get_data_sinks(src).unwrap().contains(&var));
        assert!(g.get_data_sources(var).unwrap().contains(&src));
    }

    #[test]
    fn lookup_miss_returns_none_not_error() {
        let g = CrossRefGraph::new();
        assert_eq!(g.get_uid("missing"), None);
        assert_eq!(g.get_callees(SymbolUid::new(42).unwrap()), None);
    }
}
