//! Phases 2-4. Parallel extraction over `std::thread::scope`,
//! batched single-threaded population, finalize.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Mutex;

use tracing::{debug, info, warn};

use crate::error::{ErrorContext, PioneerResult};
use crate::extract::{Language, file_basename};
use crate::graph::CrossRefGraph;
use crate::indexing::records::{CallRecord, FunctionRecord, VariableRecord, short_name};
use crate::indexing::walker::discover_files;
use crate::types::SymbolType;

/// Worker-local buffer flush threshold (Phase 2): once a thread-local
/// stream exceeds this many records, the worker locks the matching global
/// accumulator and moves its buffer in bulk.
const LOCAL_FLUSH_THRESHOLD: usize = 1000;

#[derive(Default)]
struct Accumulators {
    functions: Mutex<Vec<FunctionRecord>>,
    calls: Mutex<Vec<CallRecord>>,
    variables: Mutex<Vec<VariableRecord>>,
}

/// Runs the full indexing pipeline over `root` and returns a finalized graph.
pub fn run(root: &std::path::Path, threads: usize, ignore_dirs: &[String]) -> PioneerResult<CrossRefGraph> {
    info!(target: "indexing", root = %root.display(), "discovering source files");
    let files = discover_files(root, ignore_dirs);
    info!(target: "indexing", count = files.len(), "discovered files");

    let accum = Accumulators::default();
    parallel_extract(&files, threads, &accum);

    let functions = accum.functions.into_inner().expect("mutex not poisoned");
    let calls = accum.calls.into_inner().expect("mutex not poisoned");
    let variables = accum.variables.into_inner().expect("mutex not poisoned");

    info!(
        target: "pipeline",
        functions = functions.len(),
        calls = calls.len(),
        variables = variables.len(),
        "extraction complete, populating graph"
    );

    let mut graph = CrossRefGraph::new();
    populate(&mut graph, files.len(), functions, calls, variables);

    info!(target: "pipeline", symbols = graph.symbol_count(), "finalizing graph");
    graph.finalize();
    Ok(graph)
}

/// Phase 2 — parallel parse. Each worker owns a contiguous slice
/// of `files` directly, borrowed for the scope's lifetime; no `Arc` needed.
fn parallel_extract(files: &[(PathBuf, Language)], threads: usize, accum: &Accumulators) {
    if files.is_empty() {
        return;
    }
    let worker_count = threads.max(1).min(files.len());
    let chunk_size = files.len().div_ceil(worker_count);
    let output_lock = Mutex::new(());

    std::thread::scope(|scope| {
        for (worker_idx, slice) in files.chunks(chunk_size).enumerate() {
            scope.spawn(move || extract_slice(worker_idx, slice, accum, &output_lock));
        }
    });
}

fn extract_slice(
    worker_idx: usize,
    slice: &[(PathBuf, Language)],
    accum: &Accumulators,
    output_lock: &Mutex<()>,
) {
    let mut extractors: HashMap<Language, Box<dyn crate::extract::LanguageExtractor>> = HashMap::new();

    let mut local_functions = Vec::new();
    let mut local_calls = Vec::new();
    let mut local_variables = Vec::new();

    for (path, lang) in slice {
        let source = match std::fs::read_to_string(path).with_path(path.clone()) {
            Ok(s) => s,
            Err(err) => {
                warn!(target: "indexing", path = %path.display(), error = %err, "skipping unreadable file");
                continue;
            }
        };

        let extractor = extractors.entry(*lang).or_insert_with(|| lang.extractor());
        let path_str = path.to_string_lossy().to_string();
        let Some(extracted) = extractor.extract(&path_str, &source) else {
            warn!(target: "indexing", path = %path.display(), language = %lang, "parse failed, skipping file");
            continue;
        };

        for func in &extracted.functions {
            let qualified_name = if *lang == Language::C && func.containing_class.is_none() && func.namespace_path.is_empty() {
                format!("{}::{}", file_basename(&path_str), func.qualified_name)
            } else {
                func.qualified_name.clone()
            };
            local_functions.push(FunctionRecord {
                qualified_name,
                file_path: path_str.clone(),
                param_types: func.param_types.clone(),
            });
        }

        for (caller, call) in &extracted.calls {
            let caller_name = if *lang == Language::C && !caller.contains("::") {
                format!("{}::{}", file_basename(&path_str), caller)
            } else {
                caller.clone()
            };
            local_calls.push(CallRecord {
                caller_name,
                callee_name: call.qualified_name.clone(),
            });
        }

        for var in &extracted.variables {
            local_variables.push(VariableRecord {
                qualified_name: var.qualified_name.clone(),
                value_source: var.value_source.clone(),
                from_function_call: var.from_function_call,
            });
        }

        if local_functions.len() >= LOCAL_FLUSH_THRESHOLD {
            flush(&accum.functions, &mut local_functions);
        }
        if local_calls.len() >= LOCAL_FLUSH_THRESHOLD {
            flush(&accum.calls, &mut local_calls);
        }
        if local_variables.len() >= LOCAL_FLUSH_THRESHOLD {
            flush(&accum.variables, &mut local_variables);
        }
    }

    flush(&accum.functions, &mut local_functions);
    flush(&accum.calls, &mut local_calls);
    flush(&accum.variables, &mut local_variables);

    let _guard = output_lock.lock().expect("output lock not poisoned");
    debug!(target: "pipeline", worker = worker_idx, files = slice.len(), "worker finished");
}

fn flush<T>(global: &Mutex<Vec<T>>, local: &mut Vec<T>) {
    if local.is_empty() {
        return;
    }
    let mut guard = global.lock().expect("accumulator mutex not poisoned");
    guard.append(local);
}

/// Batch size thresholds (Phase 3), keyed by total discovered file
/// count. Chunks are taken over the flattened record streams rather than
/// re-grouped by file: no graph invariant depends on file-granularity
/// batching, only on in-order processing of each stream, which flattening
/// preserves.
fn batch_size(file_count: usize) -> usize {
    if file_count > 50_000 {
        2000
    } else if file_count > 10_000 {
        5000
    } else {
        10_000
    }
}

/// Phase 3 — batched population. Single-threaded; this is where
/// first-writer-wins short-name resolution and overload disambiguation
/// happen, so determinism only needs to hold within this function.
fn populate(
    graph: &mut CrossRefGraph,
    file_count: usize,
    functions: Vec<FunctionRecord>,
    calls: Vec<CallRecord>,
    variables: Vec<VariableRecord>,
) {
    let batch = batch_size(file_count);

    // short_name -> first qualified_name bound to it.
    let mut short_names: HashMap<String, String> = HashMap::new();
    // qualified_name -> first-seen param_types, for overload disambiguation.
    let mut seen_signatures: HashMap<String, Vec<String>> = HashMap::new();

    for chunk in functions.chunks(batch) {
        for record in chunk {
            let qualified_name = disambiguate(record, &mut seen_signatures);
            graph.add_symbol_with_file(&qualified_name, &record.file_path, SymbolType::Function);
            short_names
                .entry(short_name(&qualified_name).to_string())
                .or_insert(qualified_name);
        }
    }

    for chunk in calls.chunks(batch) {
        for record in chunk {
            let callee_short = short_name(&record.callee_name);
            let resolved_callee = short_names
                .get(callee_short)
                .cloned()
                .unwrap_or_else(|| record.callee_name.clone());

            let caller_uid = graph.add_symbol(&record.caller_name, SymbolType::Function);
            let callee_uid = graph.add_symbol(&resolved_callee, SymbolType::Function);
            graph.add_call(caller_uid, callee_uid);
        }
    }

    for chunk in variables.chunks(batch) {
        for record in chunk {
            let var_uid = graph.add_symbol(&record.qualified_name, SymbolType::Variable);

            let Some(source) = record.value_source.as_ref().filter(|s| !s.is_empty()) else {
                continue;
            };

            let (resolved_source, source_type) = if record.from_function_call {
                let short = short_name(source);
                let resolved = short_names.get(short).cloned().unwrap_or_else(|| source.clone());
                (resolved, SymbolType::Function)
            } else {
                (source.clone(), SymbolType::Variable)
            };

            let source_uid = graph.add_symbol(&resolved_source, source_type);
            graph.add_data_flow(source_uid, var_uid);
        }
    }
}

/// Overload-signature disambiguation (decision): when a later
/// `FunctionRecord` collides on qualified name with a different
/// `param_types` list already bound to that name, append `(T1, T2)`.
fn disambiguate(record: &FunctionRecord, seen: &mut HashMap<String, Vec<String>>) -> String {
    match seen.get(&record.qualified_name) {
        None => {
            seen.insert(record.qualified_name.clone(), record.param_types.clone());
            record.qualified_name.clone()
        }
        Some(existing) if *existing == record.param_types => record.qualified_name.clone(),
        Some(_) => format!("{}({})", record.qualified_name, record.param_types.join(", ")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn disambiguate_leaves_first_signature_untouched() {
        let mut seen = HashMap::new();
        let record = FunctionRecord {
            qualified_name: "f".into(),
            file_path: "a.c".into(),
            param_types: vec!["int".into()],
        };
        assert_eq!(disambiguate(&record, &mut seen), "f");
    }

    #[test]
    fn disambiguate_appends_signature_on_param_type_collision() {
        let mut seen = HashMap::new();
        let first = FunctionRecord {
            qualified_name: "f".into(),
            file_path: "a.c".into(),
            param_types: vec!["int".into()],
        };
        let second = FunctionRecord {
            qualified_name: "f".into(),
            file_path: "b.c".into(),
            param_types: vec!["char".into()],
        };
        disambiguate(&first, &mut seen);
        assert_eq!(disambiguate(&second, &mut seen), "f(char)");
    }

    #[test]
    fn batch_size_follows_file_count_thresholds() {
        assert_eq!(batch_size(100), 10_000);
        assert_eq!(batch_size(20_000), 5000);
        assert_eq!(batch_size(60_000), 2000);
    }

    #[test]
    fn populate_resolves_short_name_callee() {
        let mut graph = CrossRefGraph::new();
        let functions = vec![FunctionRecord {
            qualified_name: "a.c::b".into(),
            file_path: "a.c".into(),
            param_types: vec![],
        }];
        let calls = vec![CallRecord {
            caller_name: "a.c::a".into(),
            callee_name: "b".into(),
        }];
        populate(&mut graph, 1, functions, calls, Vec::new());

        let caller = graph.get_uid("a.c::a").unwrap();
        let callee = graph.get_uid("a.c::b").unwrap();
        assert!(graph.get_callees(caller).unwrap().contains(&callee));
    }
}
