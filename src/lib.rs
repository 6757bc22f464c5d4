//! Cross-reference indexer and path-finding query engine for Python, C, and C++.
//!
//! Five components, leaves first: the string pool (`pool`), the
//! cross-reference graph (`graph`), the indexing pipeline (`indexing`), the
//! persistence layer (`persistence`), and the query engine (`query`).
//! `extract` is the narrow capability interface the pipeline consumes for
//! language-specific syntax extraction; `grep` is a sibling utility outside
//! the core.

pub mod cli;
pub mod config;
pub mod error;
pub mod extract;
pub mod graph;
pub mod grep;
pub mod indexing;
pub mod logging;
pub mod persistence;
pub mod pool;
pub mod query;
pub mod types;
