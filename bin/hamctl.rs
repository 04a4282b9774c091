use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use hamfts::api::types::parse_metadata;
use hamfts::api::DocumentRequest;
use hamfts::client::parse_metadata_arg;
use hamfts::{ClientConfig, HamftsClient};
use serde::Serialize;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "hamctl")]
#[command(about = "Command-line client for a hamfts server", long_about = None)]
struct Cli {
    /// Server base URL
    #[arg(long, env = "HAMFTS_SERVER", default_value = "http://localhost:8080")]
    server: String,

    /// Request timeout in seconds
    #[arg(long, env = "HAMFTS_TIMEOUT_SECS", default_value = "10")]
    timeout_secs: u64,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Find documents containing every word of the query
    Search { query: String },
    /// Add or replace a document
    Add {
        id: String,
        content: String,
        /// Metadata as a JSON object, e.g. '{"category":"animals"}'
        metadata: Option<String>,
    },
    /// Add every document from a JSON array file in one batch
    Import {
        /// File holding `[{"id": ..., "content": ..., "metadata": {...}}, ...]`
        file: PathBuf,
    },
    /// Fetch one document
    Get { id: String },
    /// List all document ids
    List,
    /// Delete a document
    Delete { id: String },
    /// Show index statistics
    Stats,
    /// Reclaim space held by deleted documents
    Compact,
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn run(cli: Cli) -> Result<()> {
    let client = HamftsClient::new(
        ClientConfig::new(cli.server).with_timeout_secs(cli.timeout_secs),
    )?;

    match cli.command {
        Command::Search { query } => {
            let docs = client.search(&query).context("search failed")?;
            print_json(&docs)?;
        }
        Command::Add {
            id,
            content,
            metadata,
        } => {
            let mut request = DocumentRequest::new(id.clone(), content);
            if let Some(raw) = metadata {
                request = request.with_metadata(parse_metadata_arg(&raw)?);
            }
            client.add_document(&request).context("add failed")?;
            println!("Document {} added", id);
        }
        Command::Import { file } => {
            let raw = std::fs::read_to_string(&file)
                .with_context(|| format!("failed to read {}", file.display()))?;
            let requests: Vec<DocumentRequest> =
                serde_json::from_str(&raw).context("expected a JSON array of documents")?;
            for request in &requests {
                parse_metadata(request.metadata.clone())
                    .with_context(|| format!("document {}", request.id))?;
            }
            let added = client.add_documents(&requests).context("import failed")?;
            println!("{} documents added", added);
        }
        Command::Get { id } => match client.get_document(&id).context("get failed")? {
            Some(doc) => print_json(&doc)?,
            None => anyhow::bail!("document {} not found", id),
        },
        Command::List => {
            for id in client.list_documents().context("list failed")? {
                println!("{}", id);
            }
        }
        Command::Delete { id } => {
            client.delete_document(&id).context("delete failed")?;
            println!("Document {} deleted", id);
        }
        Command::Stats => {
            let stats = client.stats().context("stats failed")?;
            print_json(&stats)?;
        }
        Command::Compact => {
            let report = client.compact().context("compact failed")?;
            print_json(&report)?;
        }
    }
    Ok(())
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    if let Err(e) = run(cli) {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}
