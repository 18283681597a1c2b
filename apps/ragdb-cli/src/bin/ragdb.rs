use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

use ragdb_core::config::{Config, Settings};
use ragdb_core::data_processor::DataProcessor;
use ragdb_core::types::{parse_batch, Document, TenantId};
use ragdb_engine::{Assistant, IndexManager};
use ragdb_generate::generator_from_settings;
use ragdb_vector::FsIndexStore;

#[derive(Parser)]
#[command(name = "ragdb")]
#[command(version = "0.1")]
#[command(about = "Per-tenant document retrieval", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Rebuild a tenant's index from a JSON array of {id, text} objects ("-" reads stdin)
    IngestJson { tenant: String, file: PathBuf },
    /// Rebuild a tenant's index from text files; directories are walked for .txt and .md
    IngestFiles {
        tenant: String,
        #[arg(required = true)]
        paths: Vec<PathBuf>,
    },
    /// Print the best matching snippets as JSON
    Search {
        tenant: String,
        query: String,
        #[arg(long)]
        top_k: Option<usize>,
    },
    /// Answer a question from the tenant's documents
    Ask {
        tenant: String,
        question: String,
        #[arg(long)]
        top_k: Option<usize>,
    },
    /// Print a summary of the tenant's current index
    Status { tenant: String },
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = fmt().with_env_filter(filter).with_target(false).with_writer(io::stderr).try_init();
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn read_json_documents(file: &Path) -> Result<Vec<Document>> {
    let raw = if file == Path::new("-") {
        let mut buf = String::new();
        io::stdin().read_to_string(&mut buf).context("reading documents from stdin")?;
        buf
    } else {
        fs::read_to_string(file).with_context(|| format!("reading {}", file.display()))?
    };
    Ok(parse_batch(&raw)?)
}

fn read_file_documents(processor: &DataProcessor, paths: &[PathBuf]) -> Result<Vec<Document>> {
    let files = processor.collect_files(paths);
    let pb = ProgressBar::new(files.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} files {msg}")?
            .progress_chars("#>-"),
    );
    let mut documents = Vec::with_capacity(files.len());
    for file in &files {
        pb.set_message(file.display().to_string());
        documents.push(processor.read_document(file).with_context(|| format!("ingesting {}", file.display()))?);
        pb.inc(1);
    }
    pb.finish_and_clear();
    Ok(documents)
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();
    let base = std::env::current_dir().context("resolving working directory")?;
    let settings: Settings = Config::load().and_then(|c| c.settings()).context("loading configuration")?;

    let index_dir = settings.index_dir(&base);
    let manager = IndexManager::new(FsIndexStore::new(&index_dir), settings.chunking);
    let tenant = |raw: &str| TenantId::new(raw).context("invalid tenant id");

    match cli.command {
        Commands::IngestJson { tenant: t, file } => {
            let documents = read_json_documents(&file)?;
            let handle = manager.build_index(&tenant(&t)?, documents)?;
            print_json(&handle)?;
        }
        Commands::IngestFiles { tenant: t, paths } => {
            let processor = DataProcessor::new(settings.chunking);
            let documents = read_file_documents(&processor, &paths)?;
            info!(files = documents.len(), "read documents");
            let handle = manager.build_index(&tenant(&t)?, documents)?;
            print_json(&handle)?;
        }
        Commands::Search { tenant: t, query, top_k } => {
            let k = top_k.unwrap_or(settings.search.top_k);
            let snippets = manager.search(&tenant(&t)?, &query, k)?;
            print_json(&snippets)?;
        }
        Commands::Ask { tenant: t, question, top_k } => {
            let k = top_k.unwrap_or(settings.search.top_k);
            let generator = generator_from_settings(&settings, &base)?;
            let answer = Assistant::new(&manager, generator.as_ref()).ask(&tenant(&t)?, &question, k)?;
            print_json(&answer)?;
        }
        Commands::Status { tenant: t } => {
            print_json(&manager.status(&tenant(&t)?)?)?;
        }
    }
    Ok(())
}
