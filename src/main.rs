use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context};
use clap::Parser;
use relgraph::config::EngineConfig;
use relgraph::execution::{ClickHouseConnection, ConnectionRegistry, DatabaseConnection};
use relgraph::graph::MappedGraph;
use relgraph::mapping::Mapping;
use relgraph::query_planner::parse_query;

/// relgraph - graph pattern queries answered by SQL
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// YAML mapping of tables to triples
    #[arg(long, short)]
    mapping: PathBuf,

    /// Triple patterns with optional FILTER clauses
    #[arg(long, short, conflicts_with = "query_file")]
    query: Option<String>,

    /// File holding the query
    #[arg(long)]
    query_file: Option<PathBuf>,

    /// Engine configuration YAML (defaults to RELGRAPH_* environment variables)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Run the statements against ClickHouse (CLICKHOUSE_* environment variables)
    #[arg(long)]
    execute: bool,

    /// Stop after this many results
    #[arg(long)]
    limit: Option<usize>,
}

fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    // Initialize logger - defaults to INFO level, can be overridden with RUST_LOG env var
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => EngineConfig::from_yaml_file(path),
        None => EngineConfig::from_env(),
    }
    .context("Configuration error")?;

    let mapping = Mapping::from_yaml_file(&cli.mapping)
        .with_context(|| format!("Cannot load mapping {}", cli.mapping.display()))?;

    let text = match (&cli.query, &cli.query_file) {
        (Some(query), _) => query.clone(),
        (None, Some(path)) => fs::read_to_string(path)
            .with_context(|| format!("Cannot read query file {}", path.display()))?,
        (None, None) => bail!("Either --query or --query-file is required"),
    };
    let query = parse_query(&text)?;

    let mut registry = ConnectionRegistry::new();
    if cli.execute {
        let connection: Arc<dyn DatabaseConnection> =
            Arc::new(ClickHouseConnection::from_env().context("Cannot connect to ClickHouse")?);
        for name in mapping.database_names() {
            registry.register(name, Arc::clone(&connection));
        }
    }

    let graph = MappedGraph::new(mapping.into_bridges(), Arc::new(registry), config);

    let statements = graph.explain(&query.patterns, query.filter.as_ref())?;
    if statements.is_empty() {
        println!("-- The pattern cannot match any mapped data");
    }
    for sql in &statements {
        println!("{};", sql);
    }

    if cli.execute {
        let mut results = graph.query(&query.patterns, query.filter.as_ref())?;
        let mut count = 0;
        for binding in results.by_ref() {
            if cli.limit.is_some_and(|limit| count >= limit) {
                break;
            }
            let binding = binding?;
            let row: Vec<String> = binding.iter().map(|(k, v)| format!("?{}={}", k, v)).collect();
            println!("{}", row.join("\t"));
            count += 1;
        }
        results.close()?;
        log::info!("{} result(s)", count);
    }
    Ok(())
}
