//! Command-line surface. Not part of the core; a thin `clap` derive
//! front end that routes to indexing, persistence, and query operations.

mod commands;

use clap::builder::styling::{AnsiColor, Effects, Styles};
use clap::{Parser, Subcommand};

pub use commands::dispatch;

fn clap_cargo_style() -> Styles {
    Styles::styled()
        .header(AnsiColor::Green.on_default() | Effects::BOLD)
        .usage(AnsiColor::Green.on_default() | Effects::BOLD)
        .literal(AnsiColor::Cyan.on_default() | Effects::BOLD)
        .placeholder(AnsiColor::Cyan.on_default())
}

#[derive(Debug, Parser)]
#[command(name = "pioneer", version, about = "Cross-reference indexer and path-finding query engine", styles = clap_cargo_style())]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Build (or rebuild) the cross-reference index for the current directory.
    Index,
    /// List every indexed symbol.
    List,
    /// Search symbols whose qualified name contains every given pattern.
    Search { patterns: Vec<String> },
    /// Enumerate paths between two symbols (or to/from the synthetic sentinels).
    Query {
        #[arg(long)]
        start: Option<String>,
        #[arg(long)]
        end: String,
        /// Force root-terminated backtrace from `--end`, ignoring `--start`.
        #[arg(long)]
        backtrace: bool,
        /// Resolve `--start`/`--end` as substring patterns instead of exact qualified names.
        #[arg(long)]
        pattern: bool,
        /// Print each path as a single `->`-joined chain instead of one name per line.
        #[arg(long)]
        path: bool,
    },
    /// Print the type of a symbol.
    Type { symbol: String },
    /// List the data-flow sources of a variable.
    DataSources { patterns: Vec<String> },
    /// List the data-flow sinks of a source symbol.
    DataSinks { patterns: Vec<String> },
    /// List variables whose qualified name contains every given pattern.
    Vars { patterns: Vec<String> },
    /// List symbols with a class/namespace scope matching every given pattern.
    Member { patterns: Vec<String> },
    /// Search indexed source files for a pattern, independent of the graph.
    Grep {
        pattern: String,
        #[arg(long)]
        regex: bool,
        #[arg(long)]
        ignore_case: bool,
    },
    /// Write a starter `pioneer.toml`.
    Init {
        #[arg(long)]
        force: bool,
    },
    /// Print the resolved, layered configuration.
    Config,
}
