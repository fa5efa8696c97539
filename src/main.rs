use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tokio::net::TcpListener;

use rag_assistant::core::config::{AppPaths, ConfigService};
use rag_assistant::core::logging;
use rag_assistant::embedding::create_embedder;
use rag_assistant::history::ChatSession;
use rag_assistant::rag::{Chunker, Ingestor, QuestionRequest};
use rag_assistant::server;
use rag_assistant::state::AppState;

#[derive(Parser)]
#[command(name = "rag-assistant")]
#[command(about = "Question answering over a local document corpus", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP server
    Serve {
        /// Port to listen on (overrides config and PORT)
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Chunk, embed and index documents
    Ingest {
        /// Input directory or file (default: <project>/data)
        #[arg(short, long)]
        input: Option<PathBuf>,

        /// Output index directory (default: <data dir>/index)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Answer a single question and exit
    Ask {
        /// The question to answer
        question: String,

        /// Skip the corpus and ask the generator directly
        #[arg(long)]
        open_domain: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let paths = Arc::new(AppPaths::new());
    logging::init(&paths);

    match cli.command {
        Commands::Serve { port } => serve(paths, port).await,
        Commands::Ingest { input, output } => ingest(paths, input, output).await,
        Commands::Ask {
            question,
            open_domain,
        } => ask(paths, question, open_domain).await,
    }
}

async fn serve(paths: Arc<AppPaths>, port: Option<u16>) -> anyhow::Result<()> {
    let state = AppState::initialize(paths).await?;

    let port = port.unwrap_or(state.settings.server.port);
    let bind_addr = format!("{}:{}", state.settings.server.host, port);

    let listener = TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("Failed to bind to {}", bind_addr))?;
    let addr = listener.local_addr()?;
    tracing::info!("Listening on {}", addr);

    let app = server::router(state);
    axum::serve(listener, app).await.context("Server error")?;

    Ok(())
}

async fn ingest(
    paths: Arc<AppPaths>,
    input: Option<PathBuf>,
    output: Option<PathBuf>,
) -> anyhow::Result<()> {
    let settings = ConfigService::new(paths.clone())
        .load_settings()
        .context("Failed to load configuration")?;

    let input = input.unwrap_or_else(|| paths.documents_dir.clone());
    let output = output.unwrap_or_else(|| paths.index_dir.clone());

    let embedder = create_embedder(&settings.embedding).context("Failed to create embedder")?;
    let ingestor = Ingestor::new(Chunker::from_config(&settings.chunking), embedder);

    let report = ingestor
        .ingest_path(&input, &output)
        .await
        .with_context(|| format!("Failed to ingest {}", input.display()))?;

    tracing::info!(
        "Indexed {} chunks from {} documents into {}",
        report.chunks,
        report.documents,
        output.display()
    );
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

async fn ask(paths: Arc<AppPaths>, question: String, open_domain: bool) -> anyhow::Result<()> {
    if question.trim().is_empty() {
        anyhow::bail!("Question must not be empty");
    }

    let state = AppState::initialize(paths).await?;
    let mut session = ChatSession::new();
    let request = QuestionRequest {
        question,
        open_domain_mode: open_domain,
        summary_mode: false,
    };

    let turn = state.answers.answer(&mut session, &request).await;
    println!("[{}] {}", turn.source, turn.bot_answer);
    Ok(())
}
