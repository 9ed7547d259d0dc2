use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use chatgraph::{
    config::Config,
    graph::build_recorder,
    ingest::{IngestQueue, IngestService},
    media::{OcrClient, SpeechClient},
    model::GenerationBackend,
    retrieval::Retriever,
    server::{AppState, RpcServer},
    storage::SqliteStorage,
};

#[derive(Parser)]
#[command(name = "chatgraph", version, about = "RAG chat service with per-turn reasoning graphs")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run the RPC server (the default when no subcommand is given)
    Serve,
    /// Ingest a single file synchronously and exit
    Ingest {
        /// Path to the file to ingest
        path: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Load configuration
    let config = match Config::from_env() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            std::process::exit(1);
        }
    };

    // Initialize logging
    init_logging(&config);

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => serve(config).await,
        Command::Ingest { path } => ingest_once(config, path).await,
    }
}

async fn serve(config: Config) -> anyhow::Result<()> {
    info!(
        version = env!("CARGO_PKG_VERSION"),
        "Chatgraph server starting..."
    );

    // Initialize storage
    let storage = match SqliteStorage::new(&config.database).await {
        Ok(s) => {
            info!(path = %config.database.path.display(), "Database initialized");
            s
        }
        Err(e) => {
            error!(error = %e, "Failed to initialize database");
            return Err(e.into());
        }
    };

    // Model backend
    let model = GenerationBackend::from_config(&config.model)?;
    info!(backend = ?config.model.backend, "Model backend initialized");

    // Retrieval is optional; absence disables it for the process lifetime
    let retriever = match &config.retrieval {
        Some(retrieval_config) => {
            let retriever = Retriever::new(retrieval_config)?;
            info!(vector_url = %retrieval_config.vector_url, "Retrieval capability enabled");
            Some(retriever)
        }
        None => {
            info!("Retrieval capability not configured");
            None
        }
    };

    // Reasoning-graph recorder arm
    let recorder = build_recorder(&config.graph, Arc::new(storage.clone()))?;
    info!(backend = ?config.graph.backend, "Graph recorder initialized");

    // Ingestion service + background queue
    let ingest = Arc::new(IngestService::from_config(
        &config.ingest,
        config.retrieval.as_ref(),
    )?);
    let (ingest_queue, _ingest_worker) =
        IngestQueue::start(ingest.clone(), config.ingest.queue_capacity);
    info!("Ingestion queue started");

    // Media capabilities for the OCR/voice endpoints
    let ocr = match &config.ingest.ocr_url {
        Some(url) => Some(OcrClient::new(url)?),
        None => None,
    };
    let speech = match &config.ingest.speech_url {
        Some(url) => Some(SpeechClient::new(url)?),
        None => None,
    };

    // Create application state
    let state = Arc::new(AppState::new(
        config,
        storage,
        model,
        retriever,
        recorder,
        ingest,
        ingest_queue,
        ocr,
        speech,
    ));

    // Start RPC server
    let server = RpcServer::new(state);

    if let Err(e) = server.run().await {
        error!(error = %e, "Server error");
        return Err(e.into());
    }

    info!("Server shutdown complete");
    Ok(())
}

async fn ingest_once(config: Config, path: PathBuf) -> anyhow::Result<()> {
    let ingest = IngestService::from_config(&config.ingest, config.retrieval.as_ref())?;
    ingest.ingest(&path).await;
    info!(path = %path.display(), "Ingest finished");
    Ok(())
}

/// Initialize tracing/logging
fn init_logging(config: &Config) {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.logging.level));

    match config.logging.format {
        chatgraph::config::LogFormat::Json => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().json().with_writer(std::io::stderr))
                .init();
        }
        chatgraph::config::LogFormat::Pretty => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().with_writer(std::io::stderr))
                .init();
        }
    }
}
