//! Top-level error type: one `thiserror` enum, one recovery-suggestion
//! helper, and an `ErrorContext` trait for attaching context at call sites.

use std::path::PathBuf;

use thiserror::Error;

pub type PioneerResult<T> = Result<T, PioneerError>;

#[derive(Debug, Error)]
pub enum PioneerError {
    #[error("no index found at {path}")]
    IndexMissing { path: PathBuf },

    #[error("index schema {found} is incompatible with reader schema {expected}")]
    SchemaIncompatible { found: String, expected: String },

    #[error("I/O error on {path}: {source}")]
    IoError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse source file {path} ({language})")]
    SourceParseError { path: PathBuf, language: String },

    #[error("failed to parse index file {path}: {reason}")]
    IndexParseError { path: PathBuf, reason: String },

    #[error("symbol not found: {name}")]
    SymbolNotFound {
        name: String,
        suggestions: Vec<String>,
    },

    #[error("invalid query: {reason}")]
    BadQueryShape { reason: String },

    #[error("invalid regular expression: {pattern}")]
    BadRegex { pattern: String },

    #[error("configuration error: {reason}")]
    ConfigError { reason: String },
}

impl PioneerError {
    /// Short, actionable hints surfaced alongside the error, never embedded
    /// in the message itself.
    pub fn recovery_suggestions(&self) -> Vec<&'static str> {
        match self {
            PioneerError::IndexMissing {.. } => vec!["run `pioneer index` first"],
            PioneerError::SchemaIncompatible {.. } => vec!["re-run `pioneer index` to rebuild"],
            PioneerError::IoError {.. } => vec!["check the file exists and is readable"],
            PioneerError::SourceParseError {.. } => {
                vec!["the file was skipped; indexing continues"]
            }
            PioneerError::IndexParseError {.. } => {
                vec!["the index file is corrupt; re-run `pioneer index`"]
            }
            PioneerError::SymbolNotFound { suggestions,.. } if !suggestions.is_empty() => {
                vec!["did you mean one of the suggested names?"]
            }
            PioneerError::SymbolNotFound {.. } => vec!["check the qualified name spelling"],
            PioneerError::BadQueryShape {.. } => {
                vec!["`--start` and `--end` cannot both be sentinels"]
            }
            PioneerError::BadRegex {.. } => vec!["check the regex syntax"],
            PioneerError::ConfigError {.. } => vec!["check pioneer.toml for typos"],
        }
    }

    /// Process exit code per: 0 success, 1 any error.
    pub fn exit_code(&self) -> i32 {
        1
    }
}

/// Extension trait for attaching a file path to an arbitrary I/O result.
pub trait ErrorContext<T> {
    fn with_path(self, path: impl Into<PathBuf>) -> PioneerResult<T>;
}

impl<T> ErrorContext<T> for std::io::Result<T> {
    fn with_path(self, path: impl Into<PathBuf>) -> PioneerResult<T> {
        self.map_err(|source| PioneerError::IoError {
            path: path.into(),
            source,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn symbol_not_found_suggests_when_present() {
        let err = PioneerError::SymbolNotFound {
            name: "foo".into(),
            suggestions: vec!["foobar".into()],
        };
        assert!(err.recovery_suggestions()[0].contains("did you mean"));
    }

    #[test]
    fn every_error_has_exit_code_one() {
        let err = PioneerError::BadRegex {
            pattern: "(".into(),
        };
        assert_eq!(err.exit_code(), 1);
    }
}
