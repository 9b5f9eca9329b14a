//! # chatdocs CLI
//!
//! ```bash
//! chatdocs --config ./config/chatdocs.toml <command>
//! ```
//!
//! | Command | Description |
//! |---------|-------------|
//! | `chatdocs serve` | Start the HTTP API |
//! | `chatdocs ingest <files>...` | Ingest documents into a namespace |
//! | `chatdocs ask "<question>"` | Ask one question against a namespace |

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;

use chatdocs::config::{load_config, Config};
use chatdocs::embedding::create_embedder;
use chatdocs::index::InMemoryIndex;
use chatdocs::ingest::{run_with_completion, FileRef, IngestDeps, IngestRequest};
use chatdocs::llm::create_model;
use chatdocs::models::{Credential, Role, Settings};
use chatdocs::playback::{CancelFlag, IntervalTick, JsonFileSink};
use chatdocs::progress::StderrReporter;
use chatdocs::server::{run_server, AppState};
use chatdocs::session::{ChatSession, SessionDeps};
use chatdocs::storage::create_storage;

/// chatdocs, a retrieval-augmented document chat service.
#[derive(Parser)]
#[command(
    name = "chatdocs",
    about = "A retrieval-augmented document chat service",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/chatdocs.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP API server.
    Serve,

    /// Ingest documents (by storage filename) into a namespace.
    Ingest {
        /// Filenames under the configured storage prefix.
        files: Vec<String>,

        /// Namespace to ingest into.
        #[arg(long, default_value = "default")]
        namespace: String,

        /// Chunk size in characters.
        #[arg(long)]
        chunk_size: Option<usize>,
    },

    /// Ask one question against a namespace.
    Ask {
        question: String,

        /// Namespace to retrieve from.
        #[arg(long, default_value = "default")]
        namespace: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "chatdocs=info".into()),
        )
        .init();

    let cli = Cli::parse();
    let config = load_config(&cli.config)?;

    match cli.command {
        Commands::Serve => {
            let state = build_state(&config)?;
            run_server(state).await
        }
        Commands::Ingest {
            files,
            namespace,
            chunk_size,
        } => run_ingest(&config, files, namespace, chunk_size).await,
        Commands::Ask {
            question,
            namespace,
        } => run_ask(&config, &question, namespace).await,
    }
}

fn build_state(config: &Config) -> Result<AppState> {
    let storage = create_storage(&config.storage)?;
    let embedder = create_embedder(&config.embedding)?;
    let index = Arc::new(InMemoryIndex::new(embedder));
    let model = create_model(&config.model)?;
    Ok(AppState {
        config: Arc::new(config.clone()),
        storage,
        index,
        model,
    })
}

async fn run_ingest(
    config: &Config,
    files: Vec<String>,
    namespace: String,
    chunk_size: Option<usize>,
) -> Result<()> {
    let storage = create_storage(&config.storage)?;
    let embedder = create_embedder(&config.embedding)?;
    let index = InMemoryIndex::new(embedder);

    let settings = Settings {
        chunk_size: chunk_size.unwrap_or_else(|| Settings::default().chunk_size),
        ..Settings::default()
    };

    let request = IngestRequest {
        files: files.into_iter().map(|filename| FileRef { filename }).collect(),
        settings,
        namespace,
        credential: Credential::none(),
    };

    let deps = IngestDeps {
        storage: storage.as_ref(),
        index: &index,
        limits: &config.limits,
        document_prefix: &config.storage.prefix,
        overlap: config.chunking.overlap,
    };

    let summary = run_with_completion(&deps, &request, &StderrReporter).await?;

    println!("ingest");
    println!("  files: {}", summary.files);
    println!("  chunks: {}", summary.chunks);
    println!("  batches: {}", summary.batches);
    println!("ok");
    Ok(())
}

async fn run_ask(config: &Config, question: &str, namespace: String) -> Result<()> {
    let embedder = create_embedder(&config.embedding)?;
    let index = InMemoryIndex::new(embedder);
    let model = create_model(&config.model)?;
    let sink = JsonFileSink::new(config.persistence.conversations.clone());

    let mut session = ChatSession::new(namespace);
    let deps = SessionDeps {
        index: &index,
        model: model.as_ref(),
        sink: &sink,
        settings: Settings::default(),
        credential: Credential::none(),
    };

    let mut ticks = IntervalTick::new();
    session
        .send(question, &deps, &CancelFlag::new(), &mut ticks)
        .await?;

    for message in &session.conversation.messages {
        match message.role {
            Role::Assistant => println!("{}", message.content),
            Role::Source => println!("\n{}", message.content),
            Role::User => {}
        }
    }
    Ok(())
}
