//! calcscope CLI - analyze dashboard calculation expressions
//!
//! Usage:
//!   calcscope preprocess <expression>
//!   calcscope analyze-expr <expression>
//!   calcscope analyze <bundles.json> [--format tree|summary|json]
//!   calcscope chain <bundles.json> --request <id> --alias <alias>
//!
//! Examples:
//!   calcscope preprocess 'maxOver(sum({sales}), [{region}])'
//!   calcscope analyze captures/requests.json --format summary
//!   calcscope chain captures/requests.json --request r-1 --alias margin

use calcscope::analysis::analyze_expression;
use calcscope::config::Settings;
use calcscope::dsl;
use calcscope::hierarchy::{build_hierarchy, Hierarchy, HierarchyNode};
use calcscope::model::RequestBundle;
use clap::{Parser, Subcommand, ValueEnum};
use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "calcscope")]
#[command(about = "calcscope - cost and dependency analysis for dashboard calculations")]
#[command(version)]
struct Cli {
    /// Path to a TOML config file (overrides the default search)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the SQL a DSL expression is rewritten to
    Preprocess {
        /// DSL expression
        expression: String,
    },

    /// Parse and cost a single DSL expression, printed as JSON
    AnalyzeExpr {
        /// DSL expression
        expression: String,
    },

    /// Build the request hierarchy from captured request bundles
    Analyze {
        /// JSON file holding one bundle or an array of bundles
        file: PathBuf,

        /// Output format
        #[arg(short, long, default_value = "tree")]
        format: OutputFormat,
    },

    /// Print the dependency chain of one expression in one request
    Chain {
        /// JSON file holding one bundle or an array of bundles
        file: PathBuf,

        /// Request id
        #[arg(short, long)]
        request: String,

        /// Expression alias
        #[arg(short, long)]
        alias: String,
    },
}

#[derive(Clone, ValueEnum)]
enum OutputFormat {
    /// Indented tree with per-node metrics
    Tree,
    /// Counts and tagged requests only
    Summary,
    /// Full hierarchy as JSON
    Json,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let settings = match load_settings(cli.config.as_deref()) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Config error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    match cli.command {
        Commands::Preprocess { expression } => {
            println!("{}", dsl::preprocess(&expression));
            ExitCode::SUCCESS
        }
        Commands::AnalyzeExpr { expression } => cmd_analyze_expr(&expression, &settings),
        Commands::Analyze { file, format } => cmd_analyze(&file, format, &settings),
        Commands::Chain {
            file,
            request,
            alias,
        } => cmd_chain(&file, &request, &alias, &settings),
    }
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn load_settings(path: Option<&Path>) -> calcscope::config::SettingsResult<Settings> {
    match path {
        Some(path) => Settings::from_file(path),
        None => Settings::load(),
    }
}

fn read_bundles(file: &Path) -> Result<Vec<RequestBundle>, String> {
    let source = fs::read_to_string(file)
        .map_err(|e| format!("Error reading file '{}': {}", file.display(), e))?;
    let value: serde_json::Value = serde_json::from_str(&source)
        .map_err(|e| format!("Invalid JSON in '{}': {}", file.display(), e))?;
    let bundles: Result<Vec<RequestBundle>, _> = if value.is_array() {
        serde_json::from_value(value)
    } else {
        serde_json::from_value::<RequestBundle>(value).map(|bundle| vec![bundle])
    };
    bundles.map_err(|e| format!("Invalid request bundle in '{}': {}", file.display(), e))
}

fn build_from_file(file: &Path, settings: &Settings) -> Result<Hierarchy, String> {
    let bundles = read_bundles(file)?;
    let doc_links = settings.docs.resolver();
    Ok(build_hierarchy(&bundles, &settings.analysis, doc_links.as_ref()))
}

fn cmd_analyze_expr(expression: &str, settings: &Settings) -> ExitCode {
    let doc_links = settings.docs.resolver();
    let analysis = match analyze_expression(expression, doc_links.as_ref()) {
        Ok(a) => a,
        Err(e) => {
            eprintln!("{}", e);
            return ExitCode::FAILURE;
        }
    };

    match serde_json::to_string_pretty(&analysis) {
        Ok(json) => {
            println!("{}", json);
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Serialization error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn cmd_analyze(file: &Path, format: OutputFormat, settings: &Settings) -> ExitCode {
    let hierarchy = match build_from_file(file, settings) {
        Ok(h) => h,
        Err(e) => {
            eprintln!("{}", e);
            return ExitCode::FAILURE;
        }
    };

    match format {
        OutputFormat::Tree => print_tree(&hierarchy.root, 0),
        OutputFormat::Summary => print_summary(&hierarchy),
        OutputFormat::Json => match serde_json::to_string_pretty(&hierarchy) {
            Ok(json) => println!("{}", json),
            Err(e) => {
                eprintln!("Serialization error: {}", e);
                return ExitCode::FAILURE;
            }
        },
    }
    ExitCode::SUCCESS
}

fn print_tree(node: &HierarchyNode, depth: usize) {
    let metrics = &node.metrics;
    let label = match &node.name {
        Some(name) => format!("{} ({})", name, node.key),
        None => node.key.clone(),
    };
    let tags: Vec<String> = metrics.tags.iter().map(|t| t.to_string()).collect();
    println!(
        "{:indent$}{}  requests={} cost={} duration={:.3}s{}{}",
        "",
        label,
        metrics.request_count,
        metrics.cost,
        metrics.duration,
        if metrics.has_error { " error" } else { "" },
        if tags.is_empty() {
            String::new()
        } else {
            format!(" [{}]", tags.join(", "))
        },
        indent = depth * 2
    );
    for child in &node.children {
        print_tree(child, depth + 1);
    }
}

fn print_summary(hierarchy: &Hierarchy) {
    let counts = &hierarchy.counts;
    println!("Dashboards: {}", counts.dashboards);
    println!("Analyses:   {}", counts.analyses);
    println!("Sheets:     {}", counts.sheets);
    println!("Visuals:    {}", counts.visuals);
    println!("Requests:   {}", counts.requests);
    println!("Total cost: {}", hierarchy.root.metrics.cost);

    let tagged: Vec<&HierarchyNode> = hierarchy
        .root
        .requests()
        .into_iter()
        .filter(|node| !node.metrics.tags.is_empty())
        .collect();
    if tagged.is_empty() {
        return;
    }

    println!();
    println!("Tagged requests:");
    for node in tagged {
        let tags: Vec<String> = node.metrics.tags.iter().map(|t| t.to_string()).collect();
        println!("  - {} [{}]", node.key, tags.join(", "));
    }
}

fn cmd_chain(file: &Path, request: &str, alias: &str, settings: &Settings) -> ExitCode {
    let hierarchy = match build_from_file(file, settings) {
        Ok(h) => h,
        Err(e) => {
            eprintln!("{}", e);
            return ExitCode::FAILURE;
        }
    };

    let doc_links = settings.docs.resolver();
    let Some(chain) = hierarchy.dependency_chain(
        request,
        alias,
        doc_links.as_ref(),
        settings.analysis.dependency_mode,
    ) else {
        eprintln!("No expression '{}' in request '{}'", alias, request);
        return ExitCode::FAILURE;
    };

    for dep in &chain {
        println!(
            "{:indent$}{} ({}) cost={}{}",
            "",
            dep.alias,
            dep.kind,
            dep.cost,
            dep.doc_link
                .as_deref()
                .map(|link| format!("  {}", link))
                .unwrap_or_default(),
            indent = dep.level as usize * 2
        );
    }
    ExitCode::SUCCESS
}
