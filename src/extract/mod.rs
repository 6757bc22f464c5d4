//! Extraction-adapter contract. The adapters themselves are
//! collaborators built on `tree-sitter`, consumed through this narrow
//! capability interface; the cross-reference model never looks past the
//! record shapes defined here.

mod c;
mod cpp;
mod python;

pub use c::CExtractor;
pub use cpp::CppExtractor;
pub use python::PythonExtractor;

use serde::{Deserialize, Serialize};

/// Languages known to the indexer (Phase 1 extension table).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Language {
    Python,
    C,
    Cpp,
}

impl Language {
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "py" => Some(Language::Python),
            "c" | "h" => Some(Language::C),
            "cpp" | "cc" | "cxx" | "hpp" | "hh" | "hxx" => Some(Language::Cpp),
            _ => None,
        }
    }

    pub fn from_path(path: &std::path::Path) -> Option<Self> {
        path.extension()
            .and_then(|ext| ext.to_str())
            .and_then(Self::from_extension)
    }

    pub fn scope_separator(self) -> &'static str {
        match self {
            Language::Python => ".",
            Language::C | Language::Cpp => "::",
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Language::Python => "Python",
            Language::C => "C",
            Language::Cpp => "C++",
        }
    }

    pub fn extractor(self) -> Box<dyn LanguageExtractor> {
        match self {
            Language::Python => Box::new(PythonExtractor::new()),
            Language::C => Box::new(CExtractor::new()),
            Language::Cpp => Box::new(CppExtractor::new()),
        }
    }
}

impl std::fmt::Display for Language {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// `FunctionDef`.
#[derive(Debug, Clone)]
pub struct FunctionDef {
    pub simple_name: String,
    pub qualified_name: String,
    pub containing_class: Option<String>,
    pub namespace_path: Vec<String>,
    pub param_types: Vec<String>,
    pub start_line: u32,
    pub end_line: u32,
}

/// `FunctionCall`. `qualified_name` is best-effort and often equal
/// to `name`.
#[derive(Debug, Clone)]
pub struct FunctionCall {
    pub name: String,
    pub qualified_name: String,
    pub line: u32,
}

/// `VariableDef`.
#[derive(Debug, Clone)]
pub struct VariableDef {
    pub name: String,
    pub qualified_name: String,
    pub containing_func: Option<String>,
    pub value_source: Option<String>,
    pub from_function_call: bool,
    pub line: u32,
}

/// A parsed source file: the result of `parse` plus the three extraction
/// operations, run together since tree-sitter trees are cheapest to walk
/// once.
#[derive(Debug, Clone, Default)]
pub struct ExtractedFile {
    pub functions: Vec<FunctionDef>,
    pub calls: Vec<(String, FunctionCall)>, // (containing function qualified name, call)
    pub variables: Vec<VariableDef>,
}

/// A language extractor is a polymorphic capability with three operations
/// beyond parsing: `extract_functions`, `extract_calls`,
/// `extract_variables`. Implementations here run all three in one pass
/// over the parsed tree and return the combined record set.
pub trait LanguageExtractor: Send {
    /// Parses `source` and extracts all function/call/variable records in
    /// one pass. Returns `None` if tree-sitter produced no tree.
    fn extract(&mut self, file_path: &str, source: &str) -> Option<ExtractedFile>;

    fn language(&self) -> Language;
}

/// C top-level functions are prefixed with the file basename if the
/// extractor did not supply a scope.
pub fn file_basename(path: &str) -> String {
    std::path::Path::new(path)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(path)
        .to_string()
}
