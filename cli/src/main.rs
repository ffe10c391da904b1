//! Docsim CLI: ingest documents and run similarity searches
//!
//! Works against a local document store snapshot file.

use anyhow::Context;
use clap::{Parser, Subcommand};
use comfy_table::{ContentArrangement, Table};
use docsim::{DocsimConfig, DocumentId, DocumentStore, SearchEngine, SearchHit};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Extensions read as plain text; anything else ingests as empty text.
const TEXT_EXTENSIONS: &[&str] = &["txt", "py", "js", "html", "css", "json", "md"];

#[derive(Parser)]
#[command(name = "docsim", version, about = "Docsim document similarity search")]
struct Cli {
    /// YAML config file
    #[arg(long, global = true, env = "DOCSIM_CONFIG")]
    config: Option<PathBuf>,

    /// Document store file (overrides the config)
    #[arg(long, global = true, env = "DOCSIM_STORE")]
    store: Option<PathBuf>,

    /// Output format
    #[arg(long, default_value = "table", global = true)]
    format: OutputFormat,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, clap::ValueEnum)]
enum OutputFormat {
    Table,
    Json,
    Csv,
}

#[derive(Subcommand)]
enum Commands {
    /// Add files to the store and embed them
    Ingest {
        /// Files to ingest
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
    /// Rank stored documents against a query
    Search {
        /// Query text
        query: String,

        /// Maximum number of results
        #[arg(long)]
        top_k: Option<usize>,

        /// Minimum similarity a result must exceed
        #[arg(long)]
        threshold: Option<f32>,
    },
    /// List stored documents
    List,
    /// Remove a document
    Remove {
        /// Document id
        id: u64,
    },
    /// Embed documents that have no vector yet
    EmbedPending,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let level = if cli.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::WARN
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run(cli).await {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let mut config = match &cli.config {
        Some(path) => DocsimConfig::load(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => DocsimConfig::default(),
    };
    if let Some(store_path) = &cli.store {
        config.store_path = store_path.clone();
    }

    let store = Arc::new(
        DocumentStore::open(&config.store_path)
            .with_context(|| format!("failed to open store {}", config.store_path.display()))?,
    );
    let engine = SearchEngine::from_config(&config, store.clone());

    match cli.command {
        Commands::Ingest { files } => run_ingest(&engine, &files, &config.store_path).await,
        Commands::Search {
            query,
            top_k,
            threshold,
        } => {
            let defaults = engine.defaults();
            let hits = engine
                .search(
                    &query,
                    top_k.unwrap_or(defaults.top_k),
                    threshold.unwrap_or(defaults.score_threshold),
                )
                .await?;
            print_hits(&hits, &cli.format)
        }
        Commands::List => run_list(&store, &cli.format),
        Commands::Remove { id } => {
            let record = store.remove(DocumentId::new(id))?;
            store.save(&config.store_path)?;
            println!("Removed {} ({})", record.id, record.name);
            Ok(())
        }
        Commands::EmbedPending => {
            let result = engine.embed_pending().await;
            store.save(&config.store_path)?;
            println!("Embedded {} document(s)", result?);
            Ok(())
        }
    }
}

async fn run_ingest(engine: &SearchEngine, files: &[PathBuf], store_path: &Path) -> anyhow::Result<()> {
    let mut failed = 0;

    for path in files {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        let text = extract_text(path)?;

        match engine.ingest(&name, &text).await {
            Ok(id) => println!("Ingested {} as {}", name, id),
            Err(e) => {
                eprintln!("Failed to embed {}: {}", name, e);
                failed += 1;
            }
        }
    }

    // Save even on failure: unembedded records can be retried with embed-pending.
    engine.store().save(store_path)?;

    if failed > 0 {
        anyhow::bail!("{} of {} file(s) stored without an embedding", failed, files.len());
    }
    Ok(())
}

fn extract_text(path: &Path) -> anyhow::Result<String> {
    let is_text = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| TEXT_EXTENSIONS.contains(&e.to_lowercase().as_str()))
        .unwrap_or(false);

    if !is_text {
        tracing::warn!("Unsupported file type, storing empty text: {}", path.display());
        return Ok(String::new());
    }

    let bytes = std::fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

fn print_hits(hits: &[SearchHit], format: &OutputFormat) -> anyhow::Result<()> {
    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(hits)?);
        }
        OutputFormat::Csv => {
            println!("id,name,score");
            for hit in hits {
                println!("{},{},{:.4}", hit.id, csv_escape(&hit.name), hit.score);
            }
        }
        OutputFormat::Table => {
            if hits.is_empty() {
                println!("(no results)");
                return Ok(());
            }

            let mut table = Table::new();
            table.set_content_arrangement(ContentArrangement::Dynamic);
            table.set_header(vec!["id", "name", "score"]);
            for hit in hits {
                table.add_row(vec![hit.id.to_string(), hit.name.clone(), format!("{:.4}", hit.score)]);
            }

            println!("{}", table);
            println!("{} result(s)", hits.len());
        }
    }
    Ok(())
}

fn run_list(store: &DocumentStore, format: &OutputFormat) -> anyhow::Result<()> {
    let records = store.snapshot()?;

    match format {
        OutputFormat::Json => {
            let rows: Vec<_> = records
                .iter()
                .map(|r| {
                    serde_json::json!({
                        "id": r.id,
                        "name": r.name,
                        "embedded": r.has_vector(),
                        "chars": r.text.chars().count(),
                        "uploaded_at": r.uploaded_at,
                    })
                })
                .collect();
            println!("{}", serde_json::to_string_pretty(&rows)?);
        }
        OutputFormat::Csv => {
            println!("id,name,embedded,chars,uploaded_at");
            for r in &records {
                println!(
                    "{},{},{},{},{}",
                    r.id,
                    csv_escape(&r.name),
                    r.has_vector(),
                    r.text.chars().count(),
                    r.uploaded_at
                );
            }
        }
        OutputFormat::Table => {
            if records.is_empty() {
                println!("(no documents)");
                return Ok(());
            }

            let mut table = Table::new();
            table.set_content_arrangement(ContentArrangement::Dynamic);
            table.set_header(vec!["id", "name", "embedded", "chars", "uploaded"]);
            for r in &records {
                let uploaded = chrono::DateTime::from_timestamp(r.uploaded_at, 0)
                    .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
                    .unwrap_or_default();
                table.add_row(vec![
                    r.id.to_string(),
                    r.name.clone(),
                    if r.has_vector() { "yes" } else { "no" }.to_string(),
                    r.text.chars().count().to_string(),
                    uploaded,
                ]);
            }

            println!("{}", table);
            println!("{} document(s)", records.len());
        }
    }
    Ok(())
}

fn csv_escape(s: &str) -> String {
    if s.contains(',') || s.contains('"') || s.contains('\n') {
        format!("\"{}\"", s.replace('"', "\"\""))
    } else {
        s.to_string()
    }
}
