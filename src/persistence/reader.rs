//! Event-driven reader: walks the on-disk document with a small
//! token-level lookahead, dispatching to a section-aware handler. Sections
//! outside the requested `LoadMode` are skipped via a depth counter without
//! ever being materialized into graph data structures.

use std::collections::{HashMap, HashSet};
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use crate::error::{PioneerError, PioneerResult};
use crate::graph::CrossRefGraph;
use crate::types::{FileUid, SymbolType, SymbolUid};

use super::is_schema_compatible;

/// Partial-load mode (table).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadMode {
    /// Everything except `path_trie`.
    Full,
    /// Symbols, types, file tables — no edges.
    WithPaths,
    /// Symbol names, UIDs, types only.
    SymbolsOnly,
}

impl LoadMode {
    fn wants_edges(self) -> bool {
        matches!(self, LoadMode::Full)
    }

    fn wants_files(self) -> bool {
        matches!(self, LoadMode::Full | LoadMode::WithPaths)
    }
}

#[derive(Debug, PartialEq)]
enum Token {
    LBrace,
    RBrace,
    LBracket,
    RBracket,
    Colon,
    Comma,
    Str(String),
    Num(i64),
    Eof,
}

struct Lexer<R: Read> {
    bytes: std::io::Bytes<R>,
    lookahead: Option<u8>,
}

impl<R: Read> Lexer<R> {
    fn new(reader: R) -> Self {
        Self {
            bytes: reader.bytes(),
            lookahead: None,
        }
    }

    fn next_byte(&mut self) -> std::io::Result<Option<u8>> {
        if let Some(b) = self.lookahead.take() {
            return Ok(Some(b));
        }
        match self.bytes.next() {
            Some(r) => r.map(Some),
            None => Ok(None),
        }
    }

    fn peek_byte(&mut self) -> std::io::Result<Option<u8>> {
        if self.lookahead.is_none() {
            self.lookahead = match self.bytes.next() {
                Some(r) => Some(r?),
                None => None,
            };
        }
        Ok(self.lookahead)
    }

    fn next_token(&mut self) -> PioneerResult<Token> {
        loop {
            let Some(b) = self.next_byte().map_err(io_err)? else {
                return Ok(Token::Eof);
            };
            match b {
                b' ' | b'\t' | b'\n' | b'\r' => continue,
                b'{' => return Ok(Token::LBrace),
                b'}' => return Ok(Token::RBrace),
                b'[' => return Ok(Token::LBracket),
                b']' => return Ok(Token::RBracket),
                b':' => return Ok(Token::Colon),
                b',' => return Ok(Token::Comma),
                b'"' => return self.read_string().map(Token::Str),
                b'-' | b'0'..=b'9' => return self.read_number(b).map(Token::Num),
                other => {
                    return Err(index_parse_error(format!(
                        "unexpected byte 0x{other:02x} in index file"
                    )));
                }
            }
        }
    }

    fn read_string(&mut self) -> PioneerResult<String> {
        // Raw UTF-8 bytes pass through unescaped from the writer ;
        // only control characters, quotes, and backslashes are escaped. We
        // accumulate bytes rather than chars so multi-byte sequences are
        // never split.
        let mut buf: Vec<u8> = Vec::new();
        loop {
            let b = self
                .next_byte()
                .map_err(io_err)?
                .ok_or_else(|| index_parse_error("unterminated string"))?;
            match b {
                b'"' => {
                    return String::from_utf8(buf)
                        .map_err(|_| index_parse_error("invalid utf-8 in string literal"));
                }
                b'\\' => {
                    let esc = self
                        .next_byte()
                        .map_err(io_err)?
                        .ok_or_else(|| index_parse_error("unterminated escape"))?;
                    match esc {
                        b'"' => buf.push(b'"'),
                        b'\\' => buf.push(b'\\'),
                        b'/' => buf.push(b'/'),
                        b'n' => buf.push(b'\n'),
                        b'r' => buf.push(b'\r'),
                        b't' => buf.push(b'\t'),
                        b'u' => {
                            let mut hex = [0u8; 4];
                            for slot in &mut hex {
                                *slot = self
                                    .next_byte()
                                    .map_err(io_err)?
                                    .ok_or_else(|| index_parse_error("bad unicode escape"))?;
                            }
                            let code = u32::from_str_radix(std::str::from_utf8(&hex).unwrap_or("0"), 16)
                                .unwrap_or(0);
                            if let Some(c) = char::from_u32(code) {
                                let mut tmp = [0u8; 4];
                                buf.extend_from_slice(c.encode_utf8(&mut tmp).as_bytes());
                            }
                        }
                        other => buf.push(other),
                    }
                }
                other => buf.push(other),
            }
        }
    }

    fn read_number(&mut self, first: u8) -> PioneerResult<i64> {
        let mut digits = vec![first];
        while let Some(b) = self.peek_byte().map_err(io_err)? {
            if b.is_ascii_digit() {
                digits.push(b);
                self.next_byte().map_err(io_err)?;
            } else {
                break;
            }
        }
        std::str::from_utf8(&digits)
            .ok()
            .and_then(|s| s.parse().ok())
            .ok_or_else(|| index_parse_error("invalid number literal"))
    }
}

fn io_err(e: std::io::Error) -> PioneerError {
    PioneerError::IoError {
        path: Default::default(),
        source: e,
    }
}

fn index_parse_error(reason: impl Into<String>) -> PioneerError {
    PioneerError::IndexParseError {
        path: Default::default(),
        reason: reason.into(),
    }
}

struct Parser<R: Read> {
    lexer: Lexer<R>,
    /// Depth of nested braces/brackets still being discarded by the
    /// current `skip_value` call.
    skip_depth: u32,
}

impl<R: Read> Parser<R> {
    fn new(reader: R) -> Self {
        Self {
            lexer: Lexer::new(reader),
            skip_depth: 0,
        }
    }

    fn expect(&mut self, want: &Token) -> PioneerResult<()> {
        let tok = self.lexer.next_token()?;
        if &tok != want {
            return Err(index_parse_error(format!("expected {want:?}, found {tok:?}")));
        }
        Ok(())
    }

    /// Consumes a value that is known to begin with `first`, discarding it
    /// entirely without building any data structure. `first` is typically
    /// the token already consumed to decide which branch to take.
    fn skip_value(&mut self, first: Token) -> PioneerResult<()> {
        match first {
            Token::LBrace | Token::LBracket => {
                self.skip_depth += 1;
                while self.skip_depth > 0 {
                    match self.lexer.next_token()? {
                        Token::LBrace | Token::LBracket => self.skip_depth += 1,
                        Token::RBrace | Token::RBracket => self.skip_depth -= 1,
                        Token::Eof => {
                            return Err(index_parse_error("unexpected end of file while skipping"));
                        }
                        _ => {}
                    }
                }
                Ok(())
            }
            Token::Str(_) | Token::Num(_) => Ok(()),
            other => Err(index_parse_error(format!("cannot skip token {other:?}"))),
        }
    }

    /// Drives an object's `key: value` pairs, calling `on_key` with the key
    /// and leaving it responsible for consuming exactly one value (parsed
    /// or skipped).
    fn parse_object(
        &mut self,
        mut on_key: impl FnMut(&mut Self, &str) -> PioneerResult<()>,
    ) -> PioneerResult<()> {
        self.expect(&Token::LBrace)?;
        let mut tok = self.lexer.next_token()?;
        if tok == Token::RBrace {
            return Ok(());
        }
        loop {
            let key = match tok {
                Token::Str(s) => s,
                other => return Err(index_parse_error(format!("expected object key, found {other:?}"))),
            };
            self.expect(&Token::Colon)?;
            on_key(self, &key)?;
            tok = self.lexer.next_token()?;
            match tok {
                Token::Comma => {
                    tok = self.lexer.next_token()?;
                    continue;
                }
                Token::RBrace => return Ok(()),
                other => return Err(index_parse_error(format!("expected ',' or '}}', found {other:?}"))),
            }
        }
    }

    fn parse_string_value(&mut self) -> PioneerResult<String> {
        match self.lexer.next_token()? {
            Token::Str(s) => Ok(s),
            other => Err(index_parse_error(format!("expected string, found {other:?}"))),
        }
    }

    fn parse_number_value(&mut self) -> PioneerResult<i64> {
        match self.lexer.next_token()? {
            Token::Num(n) => Ok(n),
            other => Err(index_parse_error(format!("expected number, found {other:?}"))),
        }
    }

    /// Parses an array of numbers, e.g. call/data-flow adjacency targets.
    fn parse_number_array(&mut self) -> PioneerResult<Vec<i64>> {
        self.expect(&Token::LBracket)?;
        let mut out = Vec::new();
        let mut tok = self.lexer.next_token()?;
        if tok == Token::RBracket {
            return Ok(out);
        }
        loop {
            match tok {
                Token::Num(n) => out.push(n),
                other => return Err(index_parse_error(format!("expected number in array, found {other:?}"))),
            }
            tok = self.lexer.next_token()?;
            match tok {
                Token::Comma => tok = self.lexer.next_token()?,
                Token::RBracket => return Ok(out),
                other => return Err(index_parse_error(format!("expected ',' or ']', found {other:?}"))),
            }
        }
    }

    fn skip_next_value(&mut self) -> PioneerResult<()> {
        let tok = self.lexer.next_token()?;
        self.skip_value(tok)
    }

    /// Like `parse_object`, but `on_key` returns `Some(value)` once the
    /// region it cares about has been fully consumed, at which point the
    /// rest of the top-level object — and the rest of the document — is
    /// never read.
    fn parse_object_while<T>(
        &mut self,
        mut on_key: impl FnMut(&mut Self, &str) -> PioneerResult<Option<T>>,
    ) -> PioneerResult<Option<T>> {
        self.expect(&Token::LBrace)?;
        let mut tok = self.lexer.next_token()?;
        if tok == Token::RBrace {
            return Ok(None);
        }
        loop {
            let key = match tok {
                Token::Str(s) => s,
                other => return Err(index_parse_error(format!("expected object key, found {other:?}"))),
            };
            self.expect(&Token::Colon)?;
            if let Some(found) = on_key(self, &key)? {
                return Ok(Some(found));
            }
            tok = self.lexer.next_token()?;
            match tok {
                Token::Comma => {
                    tok = self.lexer.next_token()?;
                    continue;
                }
                Token::RBrace => return Ok(None),
                other => return Err(index_parse_error(format!("expected ',' or '}}', found {other:?}"))),
            }
        }
    }
}

fn check_version<R: Read>(p: &mut Parser<R>) -> PioneerResult<()> {
    let version = p.parse_string_value()?;
    if !is_schema_compatible(&version) {
        return Err(PioneerError::SchemaIncompatible {
            found: version,
            expected: super::SCHEMA_VERSION.to_string(),
        });
    }
    Ok(())
}

fn open_parser(path: &Path) -> PioneerResult<Parser<BufReader<File>>> {
    if !path.exists() {
        return Err(PioneerError::IndexMissing {
            path: path.to_path_buf(),
        });
    }
    let file = File::open(path).map_err(|e| PioneerError::IoError {
        path: path.to_path_buf(),
        source: e,
    })?;
    Ok(Parser::new(BufReader::new(file)))
}

fn read_metadata_names<R: Read>(p: &mut Parser<R>) -> PioneerResult<Vec<String>> {
    let mut names = Vec::new();
    p.parse_object(|p, key| match key {
        "version" => check_version(p),
        "names" => p.parse_object(|p, name| {
            names.push(name.to_string());
            p.parse_number_value().map(|_| ())
        }),
        _ => p.skip_next_value(),
    })?;
    Ok(names)
}

fn skip_metadata_checking_version<R: Read>(p: &mut Parser<R>) -> PioneerResult<()> {
    p.parse_object(|p, key| match key {
        "version" => check_version(p),
        _ => p.skip_next_value(),
    })
}

fn read_file_paths<R: Read>(p: &mut Parser<R>) -> PioneerResult<Vec<(FileUid, String)>> {
    let mut out = Vec::new();
    p.parse_object(|p, uid_str| {
        let path = p.parse_string_value()?;
        if let Some(uid) = uid_str.parse::<u64>().ok().and_then(FileUid::new) {
            out.push((uid, path));
        }
        Ok(())
    })?;
    Ok(out)
}

/// Every indexed symbol name. Stops reading once `metadata.names` has been
/// consumed; `symbol_types`, the edge tables, and the file tables are never
/// touched.
pub fn stream_all_symbols(path: &Path) -> PioneerResult<Vec<String>> {
    let mut parser = open_parser(path)?;
    let names = parser.parse_object_while(|p, key| match key {
        "metadata" => read_metadata_names(p).map(Some),
        _ => p.skip_next_value().map(|_| None),
    })?;
    Ok(names.unwrap_or_default())
}

/// Symbol names containing every pattern as a substring, narrowed
/// left-to-right — the streaming counterpart of `QueryEngine::find_symbols`.
pub fn stream_search_symbols(path: &Path, patterns: &[String]) -> PioneerResult<Vec<String>> {
    let mut names = stream_all_symbols(path)?;
    for pattern in patterns {
        names.retain(|name| name.contains(pattern.as_str()));
    }
    Ok(names)
}

/// Every `(file_uid, path)` pair. Stops reading once `file_paths` has been
/// consumed; `file_symbols`, `symbol_files`, and `path_trie` are never
/// touched.
pub fn stream_file_paths(path: &Path) -> PioneerResult<Vec<(FileUid, String)>> {
    let mut parser = open_parser(path)?;
    let paths = parser.parse_object_while(|p, key| match key {
        "metadata" => skip_metadata_checking_version(p).map(|_| None),
        "file_paths" => read_file_paths(p).map(Some),
        _ => p.skip_next_value().map(|_| None),
    })?;
    Ok(paths.unwrap_or_default())
}

pub fn load(path: &Path, mode: LoadMode) -> PioneerResult<CrossRefGraph> {
    if !path.exists() {
        return Err(PioneerError::IndexMissing {
            path: path.to_path_buf(),
        });
    }
    let file = File::open(path).map_err(|e| PioneerError::IoError {
        path: path.to_path_buf(),
        source: e,
    })?;
    load_from_reader(BufReader::new(file), mode)
}

pub fn load_from_reader(reader: impl Read, mode: LoadMode) -> PioneerResult<CrossRefGraph> {
    let mut parser = Parser::new(reader);

    let mut name_to_uid: HashMap<Box<str>, SymbolUid> = HashMap::new();
    let mut end_uid: Option<SymbolUid> = None;
    let mut symbol_types: HashMap<SymbolUid, SymbolType> = HashMap::new();
    let mut call_fwd: HashMap<SymbolUid, HashSet<SymbolUid>> = HashMap::new();
    let mut data_fwd: HashMap<SymbolUid, HashSet<SymbolUid>> = HashMap::new();
    let mut file_paths: HashMap<FileUid, Box<str>> = HashMap::new();
    let mut file_symbols: HashMap<FileUid, Vec<SymbolUid>> = HashMap::new();
    let mut symbol_files: HashMap<SymbolUid, FileUid> = HashMap::new();

    parser.parse_object(|p, key| match key {
        "metadata" => p.parse_object(|p, key| match key {
            "version" => check_version(p),
            "end_uid" => {
                let value = p.parse_number_value()?;
                end_uid = if value > 0 {
                    SymbolUid::new(value as u64)
                } else {
                    None
                };
                Ok(())
            }
            "names" => p.parse_object(|p, name| {
                let uid_value = p.parse_number_value()?;
                if let Some(uid) = SymbolUid::new(uid_value as u64) {
                    name_to_uid.insert(name.into(), uid);
                }
                Ok(())
            }),
            _ => p.skip_next_value(),
        }),
        "symbol_types" => p.parse_object(|p, uid_str| {
            let ty_code = p.parse_number_value()?;
            if let (Ok(uid_raw), Some(ty)) = (uid_str.parse::<u64>(), SymbolType::from_wire(ty_code as u8)) {
                if let Some(uid) = SymbolUid::new(uid_raw) {
                    symbol_types.insert(uid, ty);
                }
            }
            Ok(())
        }),
        "call_mapping" => {
            if mode.wants_edges() {
                p.parse_object(|p, uid_str| {
                    let targets = p.parse_number_array()?;
                    if let Some(caller) = uid_str.parse::<u64>().ok().and_then(SymbolUid::new) {
                        let set = call_fwd.entry(caller).or_default();
                        for t in targets {
                            if let Some(callee) = SymbolUid::new(t as u64) {
                                set.insert(callee);
                            }
                        }
                    }
                    Ok(())
                })
            } else {
                p.skip_next_value()
            }
        }
        "data_flow" => {
            if mode.wants_edges() {
                p.parse_object(|p, uid_str| {
                    let targets = p.parse_number_array()?;
                    if let Some(source) = uid_str.parse::<u64>().ok().and_then(SymbolUid::new) {
                        let set = data_fwd.entry(source).or_default();
                        for t in targets {
                            if let Some(var) = SymbolUid::new(t as u64) {
                                set.insert(var);
                            }
                        }
                    }
                    Ok(())
                })
            } else {
                p.skip_next_value()
            }
        }
        "file_paths" => {
            if mode.wants_files() {
                p.parse_object(|p, uid_str| {
                    let path = p.parse_string_value()?;
                    if let Some(uid) = uid_str.parse::<u64>().ok().and_then(FileUid::new) {
                        file_paths.insert(uid, path.into());
                    }
                    Ok(())
                })
            } else {
                p.skip_next_value()
            }
        }
        "file_symbols" => {
            if mode.wants_files() {
                p.parse_object(|p, uid_str| {
                    let members = p.parse_number_array()?;
                    if let Some(file_uid) = uid_str.parse::<u64>().ok().and_then(FileUid::new) {
                        let list = file_symbols.entry(file_uid).or_default();
                        for m in members {
                            if let Some(sym) = SymbolUid::new(m as u64) {
                                list.push(sym);
                            }
                        }
                    }
                    Ok(())
                })
            } else {
                p.skip_next_value()
            }
        }
        "symbol_files" => {
            if mode.wants_files() {
                p.parse_object(|p, uid_str| {
                    let file_uid_value = p.parse_number_value()?;
                    if let (Some(sym), Some(file_uid)) = (
                        uid_str.parse::<u64>().ok().and_then(SymbolUid::new),
                        FileUid::new(file_uid_value as u64),
                    ) {
                        symbol_files.insert(sym, file_uid);
                    }
                    Ok(())
                })
            } else {
                p.skip_next_value()
            }
        }
        // path_trie is never materialized by the main graph load.
        _ => p.skip_next_value(),
    })?;

    Ok(CrossRefGraph::from_parts(
        name_to_uid,
        symbol_types,
        call_fwd,
        data_fwd,
        file_paths,
        file_symbols,
        symbol_files,
        end_uid,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::SymbolType;
    use tempfile::TempDir;

    fn roundtrip_graph() -> CrossRefGraph {
        let mut g = CrossRefGraph::new();
        let a = g.add_symbol_with_file("a.c::a", "a.c", SymbolType::Function);
        let b = g.add_symbol_with_file("b.c::b", "b.c", SymbolType::Function);
        g.add_call(a, b);
        let var = g.add_symbol("m.use.x", SymbolType::Variable);
        g.add_data_flow(a, var);
        g.finalize();
        g
    }

    #[test]
    fn full_load_round_trips_edges_and_files() {
        let g = roundtrip_graph();
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(".pioneer.json");
        super::super::writer::save(&g, &path).unwrap();

        let loaded = load(&path, LoadMode::Full).unwrap();
        assert_eq!(loaded.symbol_count(), g.symbol_count());
        let a = loaded.get_uid("a.c::a").unwrap();
        let b = loaded.get_uid("b.c::b").unwrap();
        assert!(loaded.get_callees(a).unwrap().contains(&b));
        assert_eq!(loaded.get_file_path(loaded.get_symbol_file_uid(a).unwrap()), Some("a.c"));
    }

    #[test]
    fn symbols_only_load_skips_edges_and_files() {
        let g = roundtrip_graph();
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(".pioneer.json");
        super::super::writer::save(&g, &path).unwrap();

        let loaded = load(&path, LoadMode::SymbolsOnly).unwrap();
        assert_eq!(loaded.symbol_count(), g.symbol_count());
        let a = loaded.get_uid("a.c::a").unwrap();
        assert!(loaded.get_callees(a).is_none());
        assert_eq!(loaded.get_symbol_file_uid(a), None);
    }

    #[test]
    fn with_paths_load_has_files_but_no_edges() {
        let g = roundtrip_graph();
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(".pioneer.json");
        super::super::writer::save(&g, &path).unwrap();

        let loaded = load(&path, LoadMode::WithPaths).unwrap();
        let a = loaded.get_uid("a.c::a").unwrap();
        assert!(loaded.get_callees(a).is_none());
        assert!(loaded.get_symbol_file_uid(a).is_some());
    }

    #[test]
    fn incompatible_schema_is_rejected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(".pioneer.json");
        std::fs::write(&path, r#"{"metadata":{"version":"0.9.0","counts":{},"end_uid":-1,"names":{}},"symbol_types":{},"call_mapping":{},"data_flow":{},"file_paths":{},"file_symbols":{},"symbol_files":{},"path_trie":{}}"#).unwrap();

        let err = load(&path, LoadMode::Full).unwrap_err();
        assert!(matches!(err, PioneerError::SchemaIncompatible {.. }));
    }

    #[test]
    fn missing_index_file_is_reported() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nope.json");
        let err = load(&path, LoadMode::Full).unwrap_err();
        assert!(matches!(err, PioneerError::IndexMissing {.. }));
    }

    #[test]
    fn stream_all_symbols_matches_full_load() {
        let g = roundtrip_graph();
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(".pioneer.json");
        super::super::writer::save(&g, &path).unwrap();

        let mut names = stream_all_symbols(&path).unwrap();
        names.sort_unstable();
        assert_eq!(names, vec!["a.c::a", "b.c::b", "m.use.x"]);
    }

    #[test]
    fn stream_search_symbols_narrows_by_pattern() {
        let g = roundtrip_graph();
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(".pioneer.json");
        super::super::writer::save(&g, &path).unwrap();

        let found = stream_search_symbols(&path, &["a.c".to_string()]).unwrap();
        assert_eq!(found, vec!["a.c::a".to_string()]);
    }

    #[test]
    fn stream_file_paths_lists_every_file() {
        let g = roundtrip_graph();
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(".pioneer.json");
        super::super::writer::save(&g, &path).unwrap();

        let mut paths: Vec<String> = stream_file_paths(&path).unwrap().into_iter().map(|(_, p)| p).collect();
        paths.sort_unstable();
        assert_eq!(paths, vec!["a.c".to_string(), "b.c".to_string()]);
    }

    #[test]
    fn stream_all_symbols_rejects_incompatible_schema() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(".pioneer.json");
        std::fs::write(&path, r#"{"metadata":{"version":"0.9.0","counts":{},"end_uid":-1,"names":{}},"symbol_types":{},"call_mapping":{},"data_flow":{},"file_paths":{},"file_symbols":{},"symbol_files":{},"path_trie":{}}"#).unwrap();

        let err = stream_all_symbols(&path).unwrap_err();
        assert!(matches!(err, PioneerError::SchemaIncompatible {.. }));
    }
}
