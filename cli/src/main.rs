//! Netgraph CLI: run network queries against graph files
//!
//! A graph file is a serialized `PropertyGraph`; a network file is the
//! persisted records of one network, loaded through the graph cache.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use comfy_table::{ContentArrangement, Table};
use netgraph::cache::NetworkData;
use netgraph::{
    DuplicateSet, EngineConfig, GraphCache, InMemoryRepository, NetworkId, PropertyGraph, PropertyValue, QueryEngine,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "netgraph", version, about = "Network query CLI")]
struct Cli {
    /// Engine configuration (YAML or JSON)
    #[arg(long, global = true, env = "NETGRAPH_CONFIG")]
    config: Option<PathBuf>,

    /// Output format
    #[arg(long, default_value = "table", global = true)]
    format: OutputFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Clone, Copy, PartialEq, ValueEnum)]
enum OutputFormat {
    Table,
    Json,
    Csv,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a query over a graph file
    Query {
        /// The query string
        query: String,

        /// Graph JSON file
        #[arg(long)]
        graph: PathBuf,
    },
    /// Build a network from persisted records and run a query over it
    Network {
        /// The query string
        query: String,

        /// Network records JSON file
        #[arg(long)]
        data: PathBuf,

        /// Schema locale; defaults to the configured one
        #[arg(long)]
        locale: Option<String>,
    },
    /// List vertices of a network that look like the same person
    Duplicates {
        /// Network records JSON file
        #[arg(long)]
        data: PathBuf,

        /// Schema locale; defaults to the configured one
        #[arg(long)]
        locale: Option<String>,
    },
    /// Compile a query and report syntax errors
    Check {
        /// The query string
        query: String,
    },
    /// Start an interactive shell over a graph file
    Shell {
        /// Graph JSON file
        #[arg(long)]
        graph: PathBuf,
    },
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    if let Err(e) = run(cli).await {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config = match &cli.config {
        Some(path) => EngineConfig::from_file(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => EngineConfig::default(),
    };
    let engine = QueryEngine::from_config(&config);

    match cli.command {
        Commands::Query { query, graph } => {
            let graph = load_graph(&graph)?;
            let result = engine.run(&query, graph)?;
            print_graph(&result, cli.format)
        }
        Commands::Network { query, data, locale } => {
            let locale = locale.unwrap_or_else(|| config.default_locale.clone());
            let (cache, network) = load_network(&data)?;
            let result = engine.execute(&cache, network, &locale, &query).await?;
            print_graph(&result, cli.format)
        }
        Commands::Duplicates { data, locale } => {
            let locale = locale.unwrap_or_else(|| config.default_locale.clone());
            let (cache, network) = load_network(&data)?;
            let sets = cache.duplicates(network, &locale, &config.duplicates).await?;
            print_duplicates(&sets, &config.duplicates.label_prop, cli.format)
        }
        Commands::Check { query } => {
            let statements = engine.compile(&query)?;
            println!("OK: {} statement(s)", statements.len());
            Ok(())
        }
        Commands::Shell { graph } => Shell::new(&engine, load_graph(&graph)?, cli.format).run(),
    }
}

fn load_graph(path: &Path) -> Result<PropertyGraph> {
    let content = std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    let graph: PropertyGraph =
        serde_json::from_str(&content).with_context(|| format!("parsing graph {}", path.display()))?;
    info!("Loaded {} vertices, {} edges", graph.vertex_count(), graph.edge_count());
    Ok(graph)
}

/// A cache over a single network read from a records file
fn load_network(data: &Path) -> Result<(GraphCache, NetworkId)> {
    let content = std::fs::read_to_string(data).with_context(|| format!("reading {}", data.display()))?;
    let records: NetworkData =
        serde_json::from_str(&content).with_context(|| format!("parsing network {}", data.display()))?;

    let network = NetworkId::random();
    let repository = Arc::new(InMemoryRepository::new());
    repository.insert_network(network, records)?;
    Ok((GraphCache::new(repository), network))
}

/// One line of shell input
#[derive(Debug, PartialEq)]
enum ShellCommand<'a> {
    Quit,
    Help,
    Stats,
    Last,
    Check(&'a str),
    Format(OutputFormat),
    Query(&'a str),
    Invalid(String),
}

impl<'a> ShellCommand<'a> {
    fn parse(line: &'a str) -> Option<Self> {
        let line = line.trim();
        if line.is_empty() {
            return None;
        }
        let Some(command) = line.strip_prefix(':') else {
            return Some(ShellCommand::Query(line));
        };
        let (name, arg) = command.split_once(char::is_whitespace).unwrap_or((command, ""));
        let arg = arg.trim();
        Some(match name {
            "q" | "quit" | "exit" => ShellCommand::Quit,
            "h" | "help" => ShellCommand::Help,
            "stats" => ShellCommand::Stats,
            "last" => ShellCommand::Last,
            "check" if !arg.is_empty() => ShellCommand::Check(arg),
            "format" => match OutputFormat::from_str(arg, true) {
                Ok(format) => ShellCommand::Format(format),
                Err(_) => ShellCommand::Invalid(format!("unknown format '{}', use table, json or csv", arg)),
            },
            other => ShellCommand::Invalid(format!("unknown command :{}", other)),
        })
    }
}

const SHELL_HELP: &str = "\
Commands:
  <query>          Run a query over the loaded graph
  :check <query>   Compile without running
  :last            Print the last result again
  :format <fmt>    Switch output to table, json or csv
  :stats           Sizes of the loaded graph and the last result
  :quit            Exit shell";

/// Interactive loop over one loaded graph; every query starts from it
struct Shell<'a> {
    engine: &'a QueryEngine,
    graph: PropertyGraph,
    format: OutputFormat,
    last: Option<PropertyGraph>,
}

impl<'a> Shell<'a> {
    fn new(engine: &'a QueryEngine, graph: PropertyGraph, format: OutputFormat) -> Self {
        Self {
            engine,
            graph,
            format,
            last: None,
        }
    }

    fn run(mut self) -> Result<()> {
        println!("Netgraph shell: {}. :help for commands.\n", describe(&self.graph));
        let stdin = std::io::stdin();
        let mut line = String::new();

        loop {
            eprint!("netgraph> ");
            line.clear();
            if stdin.read_line(&mut line)? == 0 {
                break;
            }
            let Some(command) = ShellCommand::parse(&line) else {
                continue;
            };
            if command == ShellCommand::Quit {
                break;
            }
            if let Err(e) = self.handle(command) {
                eprintln!("Error: {:#}", e);
            }
        }
        Ok(())
    }

    fn handle(&mut self, command: ShellCommand<'_>) -> Result<()> {
        match command {
            ShellCommand::Quit => {}
            ShellCommand::Help => println!("{}", SHELL_HELP),
            ShellCommand::Stats => println!("{}", self.stats()),
            ShellCommand::Last => match &self.last {
                Some(result) => print_graph(result, self.format)?,
                None => println!("No query has run yet"),
            },
            ShellCommand::Check(query) => {
                let statements = self.engine.compile(query)?;
                println!("OK: {} statement(s)", statements.len());
            }
            ShellCommand::Format(format) => self.format = format,
            ShellCommand::Query(query) => {
                let result = self.engine.run(query, self.graph.clone())?;
                print_graph(&result, self.format)?;
                self.last = Some(result);
            }
            ShellCommand::Invalid(message) => eprintln!("{}", message),
        }
        Ok(())
    }

    fn stats(&self) -> String {
        let last = self.last.as_ref().map_or_else(|| "none".to_string(), describe);
        format!("loaded: {}\nlast result: {}", describe(&self.graph), last)
    }
}

fn describe(graph: &PropertyGraph) -> String {
    let mut text = format!("{} vertices, {} edges", graph.vertex_count(), graph.edge_count());
    if let Some(members) = graph.grouped_vertices() {
        text.push_str(&format!(" (grouped from {} vertices)", members.len()));
    }
    text
}

/// Column names: `id` followed by every vertex property, in first-seen order
fn columns(graph: &PropertyGraph) -> Vec<String> {
    let mut columns = vec!["id".to_string()];
    for vertex in graph.vertices() {
        for key in vertex.props.keys() {
            if !columns.iter().any(|c| c.eq_ignore_ascii_case(key)) {
                columns.push(key.to_string());
            }
        }
    }
    columns
}

/// Display text of a cell; missing values are blank
fn cell(value: Option<&PropertyValue>, format: OutputFormat) -> String {
    let text = value.map(PropertyValue::plain_text).unwrap_or_default();
    if format == OutputFormat::Csv && text.contains([',', '"', '\n']) {
        format!("\"{}\"", text.replace('"', "\"\""))
    } else {
        text
    }
}

/// Rows of cells, the id first
fn rows(graph: &PropertyGraph, columns: &[String], format: OutputFormat) -> Vec<Vec<String>> {
    graph
        .vertices()
        .iter()
        .map(|vertex| {
            std::iter::once(vertex.id.to_string())
                .chain(columns[1..].iter().map(|column| cell(vertex.props.get(column), format)))
                .collect()
        })
        .collect()
}

fn print_table(header: &[String], rows: Vec<Vec<String>>) {
    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(header);
    for row in rows {
        table.add_row(row);
    }
    println!("{}", table);
}

fn print_graph(graph: &PropertyGraph, format: OutputFormat) -> Result<()> {
    if format == OutputFormat::Json {
        println!("{}", serde_json::to_string_pretty(graph)?);
        return Ok(());
    }

    let columns = columns(graph);
    let rows = rows(graph, &columns, format);
    match format {
        OutputFormat::Csv => {
            println!("{}", columns.join(","));
            for row in rows {
                println!("{}", row.join(","));
            }
        }
        _ if graph.is_empty() => println!("(no vertices)"),
        _ => {
            print_table(&columns, rows);
            println!("{}", describe(graph));
        }
    }
    Ok(())
}

fn print_duplicates(sets: &[DuplicateSet], label_prop: &str, format: OutputFormat) -> Result<()> {
    if format == OutputFormat::Json {
        println!("{}", serde_json::to_string_pretty(sets)?);
        return Ok(());
    }

    let header: Vec<String> = ["score", "vertex", "label", "duplicates"].map(String::from).to_vec();
    let rows: Vec<Vec<String>> = sets
        .iter()
        .map(|set| {
            let duplicates: Vec<String> = set.duplicates.iter().map(|v| v.id.to_string()).collect();
            vec![
                set.score.to_string(),
                set.vertex.id.to_string(),
                cell(set.vertex.props.get(label_prop), format),
                duplicates.join(" "),
            ]
        })
        .collect();
    match format {
        OutputFormat::Csv => {
            println!("{}", header.join(","));
            for row in rows {
                println!("{}", row.join(","));
            }
        }
        _ if sets.is_empty() => println!("(no duplicates)"),
        _ => print_table(&header, rows),
    }
    Ok(())
}
