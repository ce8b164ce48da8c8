//! Mind Map Command Line Interface
//!
//! Generates mind maps from text and inspects existing ones.
//!
//! # Usage
//!
//! ```bash
//! # Generate from a markdown file (needs GEMINI_API_KEY)
//! mindmap_cli generate --file notes.md --svg map.svg
//!
//! # Build a tree from flat records
//! mindmap_cli build --file records.json -o json
//!
//! # Search, export, render an existing map (records or nested tree JSON)
//! mindmap_cli search ownership --file records.json
//! mindmap_cli export --file tree.json
//! mindmap_cli render --file records.json --highlight rust > map.svg
//! ```

use std::io::{self, IsTerminal, Read};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{anyhow, bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use serde_json::Value;

use mindmap::ai::{GeminiClient, ResilientGenerator};
use mindmap::extract::FileTextExtractor;
use mindmap::graph::{highlight_ids, normalize_value, records_from_value, render_svg};
use mindmap::{
    export_lines, search, Completion, LayoutEngine, MapNode, MapSession, MindMapConfig,
    MindMapNode, PositionedNode, TreeBuilder, ViewportController,
};

#[derive(Parser)]
#[command(name = "mindmap_cli")]
#[command(version = "0.1.0")]
#[command(about = "Turn text into mind maps and inspect them")]
#[command(long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format: json, text, or pretty (default)
    #[arg(long, short = 'o', global = true, default_value = "pretty", value_enum)]
    format: OutputFormat,

    /// YAML configuration file
    #[arg(long, short, global = true, env = "MINDMAP_CONFIG")]
    config: Option<PathBuf>,
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Json,
    Text,
    Pretty,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate a mind map from a document or inline text
    Generate {
        /// Document to read (.txt, .text, .md, .markdown)
        #[arg(short, long, conflicts_with = "text")]
        file: Option<PathBuf>,

        /// Inline text (reads stdin if neither --file nor --text is given)
        #[arg(short, long)]
        text: Option<String>,

        /// Also write the fitted map as SVG
        #[arg(long)]
        svg: Option<PathBuf>,
    },

    /// Build a tree from flat node records
    Build {
        /// Records file (reads stdin if not provided)
        #[arg(short, long)]
        file: Option<PathBuf>,
    },

    /// List nodes whose topic or content matches a query
    Search {
        query: String,

        /// Records or tree file (reads stdin if not provided)
        #[arg(short, long)]
        file: Option<PathBuf>,
    },

    /// Print the indented Topic/Content outline
    Export {
        /// Records or tree file (reads stdin if not provided)
        #[arg(short, long)]
        file: Option<PathBuf>,
    },

    /// Lay out a map and write it as SVG
    Render {
        /// Records or tree file (reads stdin if not provided)
        #[arg(short, long)]
        file: Option<PathBuf>,

        /// Output path (stdout if not provided)
        #[arg(long)]
        output: Option<PathBuf>,

        /// Highlight nodes matching this query
        #[arg(long)]
        highlight: Option<String>,
    },
}

// =============================================================================
// MAIN
// =============================================================================

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();

    let result = match load_config(cli.config.as_deref()) {
        Ok(config) => run(cli.command, &config, cli.format).await,
        Err(e) => Err(e),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            if cli.format == OutputFormat::Json {
                println!("{}", serde_json::json!({ "error": format!("{e:#}") }));
            } else {
                eprintln!("{}: {:#}", "error".red().bold(), e);
            }
            ExitCode::FAILURE
        }
    }
}

fn load_config(path: Option<&Path>) -> Result<MindMapConfig> {
    MindMapConfig::load(path).map_err(|e| anyhow!(e.user_message()))
}

async fn run(command: Commands, config: &MindMapConfig, format: OutputFormat) -> Result<()> {
    match command {
        Commands::Generate { file, text, svg } => {
            cmd_generate(config, file, text, svg, format).await
        }
        Commands::Build { file } => cmd_build(file, format),
        Commands::Search { query, file } => cmd_search(config, &query, file, format),
        Commands::Export { file } => cmd_export(file, format),
        Commands::Render {
            file,
            output,
            highlight,
        } => cmd_render(config, file, output, highlight),
    }
}

// =============================================================================
// COMMAND IMPLEMENTATIONS
// =============================================================================

async fn cmd_generate(
    config: &MindMapConfig,
    file: Option<PathBuf>,
    text: Option<String>,
    svg: Option<PathBuf>,
    format: OutputFormat,
) -> Result<()> {
    let client = GeminiClient::new(config.ai.clone())
        .map_err(|e| anyhow!("{e} (set GEMINI_API_KEY)"))?;
    let generator = ResilientGenerator::new(Arc::new(client), config.retry.clone());
    let mut session = MapSession::from_config(config);

    let completion = match (file, text) {
        (Some(path), _) => {
            session
                .load_file(&FileTextExtractor, &generator, &path)
                .await
        }
        (None, Some(text)) => session.generate_from_text(&generator, &text).await,
        (None, None) => {
            let text = read_input(None)?;
            session.generate_from_text(&generator, &text).await
        }
    };

    if completion != Completion::Applied {
        bail!(session
            .error()
            .unwrap_or("generation did not complete")
            .to_string());
    }

    let (Some(map), Some(viewport)) = (session.map(), session.viewport()) else {
        bail!("no map was produced");
    };

    if let Some(path) = svg {
        let document = render_svg(
            &map.positioned,
            &viewport.view_box(),
            &config.layout,
            &Default::default(),
        );
        std::fs::write(&path, document)
            .with_context(|| format!("Failed to write '{}'", path.display()))?;
        if format == OutputFormat::Pretty {
            println!("{} Wrote {}", "OK".green(), path.display());
        }
    }

    print_tree(&map.tree, format)
}

fn cmd_build(file: Option<PathBuf>, format: OutputFormat) -> Result<()> {
    let value = read_json(file)?;
    let records = records_from_value(&value).map_err(|e| anyhow!("Invalid records: {e}"))?;
    let tree = TreeBuilder::new()
        .build(&records)
        .map_err(|e| anyhow!("Invalid records: {e}"))?;

    if format == OutputFormat::Pretty {
        println!(
            "{} Built tree of {} node(s) from {} record(s)",
            "OK".green(),
            tree.node_count(),
            records.len()
        );
    }
    print_tree(&tree, format)
}

fn cmd_search(
    config: &MindMapConfig,
    query: &str,
    file: Option<PathBuf>,
    format: OutputFormat,
) -> Result<()> {
    let tree = load_tree(file)?;
    let positioned = LayoutEngine::new(config.layout.clone()).layout(&tree);
    let hits = search(query, &positioned);

    match format {
        OutputFormat::Json => {
            let output: Vec<_> = hits
                .iter()
                .map(|n| {
                    serde_json::json!({ "id": n.id, "topic": n.topic, "x": n.x, "y": n.y })
                })
                .collect();
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        OutputFormat::Text => {
            for node in &hits {
                println!("{}\t{}", node.id, node.topic);
            }
        }
        OutputFormat::Pretty => {
            println!("{} {} match(es) for '{}'", "OK".green(), hits.len(), query);
            for node in &hits {
                println!("  {} {}", node.id.dimmed(), node.topic.bold());
            }
        }
    }
    Ok(())
}

fn cmd_export(file: Option<PathBuf>, format: OutputFormat) -> Result<()> {
    let tree = load_tree(file)?;
    let lines = export_lines(&tree);
    if format == OutputFormat::Json {
        println!("{}", serde_json::to_string_pretty(&lines)?);
    } else {
        for line in lines {
            println!("{line}");
        }
    }
    Ok(())
}

fn cmd_render(
    config: &MindMapConfig,
    file: Option<PathBuf>,
    output: Option<PathBuf>,
    highlight: Option<String>,
) -> Result<()> {
    let tree = load_tree(file)?;
    let positioned: PositionedNode = LayoutEngine::new(config.layout.clone()).layout(&tree);
    let viewport =
        ViewportController::fitted(config.viewport_config(), config.surface_size(), &positioned);
    let highlighted = highlight
        .map(|q| highlight_ids(&q, &positioned))
        .unwrap_or_default();

    let document = render_svg(&positioned, &viewport.view_box(), &config.layout, &highlighted);
    match output {
        Some(path) => std::fs::write(&path, document)
            .with_context(|| format!("Failed to write '{}'", path.display()))?,
        None => print!("{document}"),
    }
    Ok(())
}

// =============================================================================
// HELPERS
// =============================================================================

/// Deepest tree printed as nested JSON; serialization recurses per level
const MAX_JSON_DEPTH: usize = 128;

fn print_tree(tree: &MindMapNode, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => {
            let depth = tree.depth();
            if depth > MAX_JSON_DEPTH {
                bail!(
                    "Tree is {depth} levels deep; nested JSON output stops at {MAX_JSON_DEPTH}. \
                     Use -o text"
                );
            }
            println!("{}", serde_json::to_string_pretty(tree)?);
        }
        OutputFormat::Text | OutputFormat::Pretty => {
            for line in export_lines(tree) {
                println!("{line}");
            }
        }
    }
    Ok(())
}

/// Flat records (array or `{nodes: [...]}`) or a nested tree object
fn load_tree(file: Option<PathBuf>) -> Result<MindMapNode> {
    let mut value = read_json(file)?;
    if value.get("topic").is_some() && value.get("nodes").is_none() {
        normalize_value(&mut value);
        return serde_json::from_value(value).context("Invalid tree");
    }
    let records = records_from_value(&value).map_err(|e| anyhow!("Invalid records: {e}"))?;
    TreeBuilder::new()
        .build(&records)
        .map_err(|e| anyhow!("Invalid records: {e}"))
}

fn read_json(file: Option<PathBuf>) -> Result<Value> {
    let source = read_input(file)?;
    serde_json::from_str(&source).context("Input is not valid JSON")
}

fn read_input(file: Option<PathBuf>) -> Result<String> {
    match file {
        Some(path) => std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read '{}'", path.display())),
        None => {
            if io::stdin().is_terminal() {
                bail!("No input provided. Use --file or pipe input via stdin.");
            }
            let mut buffer = String::new();
            io::stdin()
                .read_to_string(&mut buffer)
                .context("Failed to read stdin")?;
            Ok(buffer)
        }
    }
}
