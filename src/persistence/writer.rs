//! Streaming writer: emits the eight top-level sections as compact,
//! no-whitespace, JSON-escaped text, flushing to disk every ~32 MiB to
//! bound peak memory on very large graphs.

use std::io::{BufWriter, Write};
use std::path::Path;

use crate::error::{ErrorContext, PioneerResult};
use crate::graph::CrossRefGraph;
use crate::types::SymbolType;

use super::{FLUSH_THRESHOLD_BYTES, SCHEMA_VERSION};

struct StreamingWriter<W: Write> {
    inner: BufWriter<W>,
    pending: usize,
}

impl<W: Write> StreamingWriter<W> {
    fn new(inner: W) -> Self {
        Self {
            inner: BufWriter::new(inner),
            pending: 0,
        }
    }

    fn write_raw(&mut self, s: &str) -> std::io::Result<()> {
        self.pending += s.len();
        self.inner.write_all(s.as_bytes())?;
        if self.pending >= FLUSH_THRESHOLD_BYTES {
            self.inner.flush()?;
            self.pending = 0;
        }
        Ok(())
    }

    fn write_escaped_string(&mut self, s: &str) -> std::io::Result<()> {
        self.write_raw("\"")?;
        for ch in s.chars() {
            match ch {
                '"' => self.write_raw("\\\"")?,
                '\\' => self.write_raw("\\\\")?,
                '\n' => self.write_raw("\\n")?,
                '\r' => self.write_raw("\\r")?,
                '\t' => self.write_raw("\\t")?,
                c if (c as u32) < 0x20 => self.write_raw(&format!("\\u{:04x}", c as u32))?,
                c => {
                    let mut buf = [0u8; 4];
                    self.write_raw(c.encode_utf8(&mut buf))?
                }
            }
        }
        self.write_raw("\"")
    }

    fn finish(mut self) -> std::io::Result<()> {
        self.inner.flush()
    }
}

/// Serializes a finalized graph to `path` in this module's wire format.
pub fn save(graph: &CrossRefGraph, path: &Path) -> PioneerResult<()> {
    let file = std::fs::File::create(path).with_path(path)?;
    let mut w = StreamingWriter::new(file);
    write_document(graph, &mut w).with_path(path)?;
    w.finish().with_path(path)?;
    Ok(())
}

fn write_document<W: Write>(graph: &CrossRefGraph, w: &mut StreamingWriter<W>) -> std::io::Result<()> {
    w.write_raw("{")?;

    write_metadata(graph, w)?;
    w.write_raw(",")?;
    write_symbol_types(graph, w)?;
    w.write_raw(",")?;
    write_call_mapping(graph, w)?;
    w.write_raw(",")?;
    write_data_flow(graph, w)?;
    w.write_raw(",")?;
    write_file_paths(graph, w)?;
    w.write_raw(",")?;
    write_file_symbols(graph, w)?;
    w.write_raw(",")?;
    write_symbol_files(graph, w)?;
    w.write_raw(",")?;
    write_path_trie(graph, w)?;

    w.write_raw("}")
}

fn write_metadata<W: Write>(graph: &CrossRefGraph, w: &mut StreamingWriter<W>) -> std::io::Result<()> {
    let functions = graph
        .symbols_iter()
        .filter(|s| s.ty == SymbolType::Function)
        .count();
    let variables = graph
        .symbols_iter()
        .filter(|s| s.ty == SymbolType::Variable)
        .count();

    w.write_raw("\"metadata\":{")?;
    w.write_raw("\"version\":")?;
    w.write_escaped_string(SCHEMA_VERSION)?;
    w.write_raw(",\"counts\":{")?;
    w.write_raw(&format!(
        "\"symbols\":{},\"functions\":{},\"variables\":{},\"files\":{}",
        graph.symbol_count(),
        functions,
        variables,
        graph.file_count()
    ))?;
    w.write_raw("}")?;
    w.write_raw(&format!(
        ",\"end_uid\":{}",
        graph.end_uid().map(|u| u.value() as i64).unwrap_or(-1)
    ))?;
    w.write_raw(",\"names\":{")?;
    let mut first = true;
    for symbol in graph.symbols_iter() {
        if let Some(name) = graph.get_name(symbol.uid) {
            if !first {
                w.write_raw(",")?;
            }
            first = false;
            w.write_escaped_string(name)?;
            w.write_raw(&format!(":{}", symbol.uid.value()))?;
        }
    }
    w.write_raw("}}")
}

fn write_symbol_types<W: Write>(graph: &CrossRefGraph, w: &mut StreamingWriter<W>) -> std::io::Result<()> {
    w.write_raw("\"symbol_types\":{")?;
    let mut first = true;
    for symbol in graph.symbols_iter() {
        if !first {
            w.write_raw(",")?;
        }
        first = false;
        w.write_raw(&format!("\"{}\":{}", symbol.uid.value(), symbol.ty.to_wire()))?;
    }
    w.write_raw("}")
}

fn write_adjacency<W: Write>(
    map: &std::collections::HashMap<crate::types::SymbolUid, std::collections::HashSet<crate::types::SymbolUid>>,
    w: &mut StreamingWriter<W>,
) -> std::io::Result<()> {
    let mut first_entry = true;
    for (from, tos) in map {
        if tos.is_empty() {
            continue;
        }
        if !first_entry {
            w.write_raw(",")?;
        }
        first_entry = false;
        w.write_raw(&format!("\"{}\":[", from.value()))?;
        let mut first_item = true;
        for to in tos {
            if !first_item {
                w.write_raw(",")?;
            }
            first_item = false;
            w.write_raw(&to.value().to_string())?;
        }
        w.write_raw("]")?;
    }
    Ok(())
}

fn write_call_mapping<W: Write>(graph: &CrossRefGraph, w: &mut StreamingWriter<W>) -> std::io::Result<()> {
    w.write_raw("\"call_mapping\":{")?;
    write_adjacency(graph.call_fwd_map(), w)?;
    w.write_raw("}")
}

fn write_data_flow<W: Write>(graph: &CrossRefGraph, w: &mut StreamingWriter<W>) -> std::io::Result<()> {
    w.write_raw("\"data_flow\":{")?;
    write_adjacency(graph.data_fwd_map(), w)?;
    w.write_raw("}")
}

fn write_file_paths<W: Write>(graph: &CrossRefGraph, w: &mut StreamingWriter<W>) -> std::io::Result<()> {
    w.write_raw("\"file_paths\":{")?;
    let mut first = true;
    for (file_uid, path) in graph.files_iter() {
        if !first {
            w.write_raw(",")?;
        }
        first = false;
        w.write_raw(&format!("\"{}\":", file_uid.value()))?;
        w.write_escaped_string(path)?;
    }
    w.write_raw("}")
}

fn write_file_symbols<W: Write>(graph: &CrossRefGraph, w: &mut StreamingWriter<W>) -> std::io::Result<()> {
    w.write_raw("\"file_symbols\":{")?;
    let mut first = true;
    for (file_uid, _) in graph.files_iter() {
        let symbols = graph.get_file_symbols(file_uid);
        if !first {
            w.write_raw(",")?;
        }
        first = false;
        w.write_raw(&format!("\"{}\":[", file_uid.value()))?;
        let mut first_item = true;
        for uid in symbols {
            if !first_item {
                w.write_raw(",")?;
            }
            first_item = false;
            w.write_raw(&uid.value().to_string())?;
        }
        w.write_raw("]")?;
    }
    w.write_raw("}")
}

fn write_symbol_files<W: Write>(graph: &CrossRefGraph, w: &mut StreamingWriter<W>) -> std::io::Result<()> {
    w.write_raw("\"symbol_files\":{")?;
    let mut first = true;
    for symbol in graph.symbols_iter() {
        if let Some(file_uid) = graph.get_symbol_file_uid(symbol.uid) {
            if !first {
                w.write_raw(",")?;
            }
            first = false;
            w.write_raw(&format!("\"{}\":{}", symbol.uid.value(), file_uid.value()))?;
        }
    }
    w.write_raw("}")
}

/// `path_trie` is a nested directory tree; each node lists the `file_uid`s
/// of files directly contained in that directory. Built once at save time
/// from the flat path table.
fn write_path_trie<W: Write>(graph: &CrossRefGraph, w: &mut StreamingWriter<W>) -> std::io::Result<()> {
    #[derive(Default)]
    struct TrieNode {
        files: Vec<u64>,
        children: std::collections::BTreeMap<String, TrieNode>,
    }

    let mut root = TrieNode::default();
    for (file_uid, path) in graph.files_iter() {
        let mut node = &mut root;
        let p = Path::new(path);
        let mut components: Vec<_> = p
            .components()
            .map(|c| c.as_os_str().to_string_lossy().into_owned())
            .collect();
        components.pop();
        for dir in components {
            node = node.children.entry(dir).or_default();
        }
        node.files.push(file_uid.value());
    }

    fn write_node<W: Write>(node: &TrieNode, w: &mut StreamingWriter<W>) -> std::io::Result<()> {
        w.write_raw("{\"files\":[")?;
        let mut first = true;
        for f in &node.files {
            if !first {
                w.write_raw(",")?;
            }
            first = false;
            w.write_raw(&f.to_string())?;
        }
        w.write_raw("],\"children\":{")?;
        let mut first = true;
        for (name, child) in &node.children {
            if !first {
                w.write_raw(",")?;
            }
            first = false;
            w.write_escaped_string(name)?;
            w.write_raw(":")?;
            write_node(child, w)?;
        }
        w.write_raw("}}")
    }

    w.write_raw("\"path_trie\":")?;
    write_node(&root, w)
}
