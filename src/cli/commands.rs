//! Command dispatch. Each handler loads settings/index as needed and
//! prints through `console`/`comfy-table`, matching the rest of this corpus.

use std::path::Path;

use comfy_table::Table;
use console::style;

use crate::config::Settings;
use crate::error::{PioneerError, PioneerResult};
use crate::graph::CrossRefGraph;
use crate::persistence::{self, LoadMode};
use crate::query::QueryEngine;
use crate::types::SymbolType;
use crate::{grep, indexing};

use super::Commands;

pub fn dispatch(command: Commands, settings: &Settings) -> PioneerResult<()> {
    match command {
        Commands::Index => cmd_index(settings),
        Commands::List => cmd_list(settings),
        Commands::Search { patterns } => cmd_search(settings, &patterns),
        Commands::Query {
            start,
            end,
            backtrace,
            pattern,
            path,
        } => cmd_query(settings, start, end, backtrace, pattern, path),
        Commands::Type { symbol } => cmd_type(settings, &symbol),
        Commands::DataSources { patterns } => cmd_data_sources(settings, &patterns),
        Commands::DataSinks { patterns } => cmd_data_sinks(settings, &patterns),
        Commands::Vars { patterns } => cmd_vars(settings, &patterns),
        Commands::Member { patterns } => cmd_member(settings, &patterns),
        Commands::Grep { pattern, regex, ignore_case } => cmd_grep(settings, &pattern, regex, ignore_case),
        Commands::Init { force } => cmd_init(force),
        Commands::Config => cmd_config(settings),
    }
}

fn load_graph(settings: &Settings) -> PioneerResult<CrossRefGraph> {
    persistence::load(&index_path(settings)?, LoadMode::Full)
}

fn cmd_index(settings: &Settings) -> PioneerResult<()> {
    let root = std::env::current_dir().map_err(|e| PioneerError::IoError {
        path: Path::new(".").to_path_buf(),
        source: e,
    })?;
    let graph = indexing::run(&root, settings.indexing.resolved_threads(), &settings.indexing.ignore_dirs)?;
    let index_path = settings.index_path(&root);
    persistence::save(&graph, &index_path)?;
    println!(
        "{} {} symbols, {} files indexed",
        style("done:").green().bold(),
        graph.symbol_count(),
        graph.file_count()
    );
    Ok(())
}

fn index_path(settings: &Settings) -> PioneerResult<std::path::PathBuf> {
    let root = std::env::current_dir().map_err(|e| PioneerError::IoError {
        path: Path::new(".").to_path_buf(),
        source: e,
    })?;
    Ok(settings.index_path(&root))
}

fn cmd_list(settings: &Settings) -> PioneerResult<()> {
    let mut names = persistence::stream_all_symbols(&index_path(settings)?)?;
    names.sort_unstable();
    for name in names {
        println!("{name}");
    }
    Ok(())
}

fn cmd_search(settings: &Settings, patterns: &[String]) -> PioneerResult<()> {
    for name in persistence::stream_search_symbols(&index_path(settings)?, patterns)? {
        println!("{name}");
    }
    Ok(())
}

fn resolve_endpoint(query: &QueryEngine<'_>, value: &str, as_pattern: bool) -> PioneerResult<String> {
    if !as_pattern || value == "START" || value == "END" {
        return Ok(value.to_string());
    }
    query
        .find_symbols(&[value.to_string()])
        .into_iter()
        .next()
        .ok_or_else(|| PioneerError::SymbolNotFound {
            name: value.to_string(),
            suggestions: Vec::new(),
        })
}

fn cmd_query(
    settings: &Settings,
    start: Option<String>,
    end: String,
    backtrace: bool,
    as_pattern: bool,
    as_path: bool,
) -> PioneerResult<()> {
    let graph = load_graph(settings)?;
    let query = QueryEngine::new(&graph);
    let end = resolve_endpoint(&query, &end, as_pattern)?;

    let mut print_path = |names: &[String]| -> bool {
        if as_path {
            println!("{}", names.join(" -> "));
        } else {
            for name in names {
                println!("{name}");
            }
            println!();
        }
        true
    };

    if backtrace {
        query.backtrace(&end, &mut print_path)?;
        return Ok(());
    }

    let start = match start {
        Some(s) => resolve_endpoint(&query, &s, as_pattern)?,
        None => "START".to_string(),
    };
    query.find_paths(&start, &end, &mut print_path)
}

fn cmd_type(settings: &Settings, symbol: &str) -> PioneerResult<()> {
    let graph = load_graph(settings)?;
    let uid = graph.get_uid(symbol).ok_or_else(|| PioneerError::SymbolNotFound {
        name: symbol.to_string(),
        suggestions: QueryEngine::new(&graph).find_symbols(&[symbol.to_string()]).into_iter().take(5).collect(),
    })?;
    let ty = graph.get_symbol(uid).map(|s| s.ty).unwrap_or(SymbolType::Function);
    println!(
        "{symbol}: {}",
        match ty {
            SymbolType::Function => "function",
            SymbolType::Variable => "variable",
            SymbolType::End => "end",
        }
    );
    Ok(())
}

fn cmd_data_sources(settings: &Settings, patterns: &[String]) -> PioneerResult<()> {
    let graph = load_graph(settings)?;
    let query = QueryEngine::new(&graph);
    for var in query.find_symbols(patterns) {
        for source in query.data_sources(&var)? {
            println!("{source} -> {var}");
        }
    }
    Ok(())
}

fn cmd_data_sinks(settings: &Settings, patterns: &[String]) -> PioneerResult<()> {
    let graph = load_graph(settings)?;
    let query = QueryEngine::new(&graph);
    for src in query.find_symbols(patterns) {
        for sink in query.data_sinks(&src)? {
            println!("{src} -> {sink}");
        }
    }
    Ok(())
}

fn cmd_vars(settings: &Settings, patterns: &[String]) -> PioneerResult<()> {
    let graph = load_graph(settings)?;
    let query = QueryEngine::new(&graph);
    let pattern = patterns.first().map(String::as_str).unwrap_or("");
    for name in query.variables_in(pattern) {
        println!("{name}");
    }
    Ok(())
}

fn cmd_member(settings: &Settings, patterns: &[String]) -> PioneerResult<()> {
    let graph = load_graph(settings)?;
    let query = QueryEngine::new(&graph);
    for name in query.find_symbols(patterns) {
        if name.contains("::") || name.contains('.') {
            println!("{name}");
        }
    }
    Ok(())
}

fn cmd_grep(settings: &Settings, pattern: &str, regex: bool, ignore_case: bool) -> PioneerResult<()> {
    let graph = load_graph(settings)?;
    let paths: Vec<String> = graph.files_iter().map(|(_, p)| p.to_string()).collect();
    for m in grep::run(&paths, pattern, regex, ignore_case)? {
        println!("{}:{}:{}", m.path, m.line_number, m.line);
    }
    Ok(())
}

fn cmd_init(force: bool) -> PioneerResult<()> {
    let path = Path::new(Settings::CONFIG_FILE_NAME);
    if path.exists() && !force {
        return Err(PioneerError::ConfigError {
            reason: format!("{} already exists; pass --force to overwrite", path.display()),
        });
    }
    Settings::default().save(path)?;
    println!("{} wrote {}", style("done:").green().bold(), path.display());
    Ok(())
}

fn cmd_config(settings: &Settings) -> PioneerResult<()> {
    let mut table = Table::new();
    table.set_header(vec!["key", "value"]);
    table.add_row(vec!["index_file", &settings.index_file]);
    table.add_row(vec!["indexing.threads", &settings.indexing.resolved_threads().to_string()]);
    table.add_row(vec!["indexing.ignore_dirs", &settings.indexing.ignore_dirs.join(", ")]);
    table.add_row(vec!["logging.default", &settings.logging.default]);
    println!("{table}");
    Ok(())
}
