use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpListener;

use catalog_assistant::context::ConversationWindow;
use catalog_assistant::core::config::Settings;
use catalog_assistant::core::logging::{self, Console};
use catalog_assistant::ingest::{CancellationToken, IngestOptions};
use catalog_assistant::server;
use catalog_assistant::state::{AppState, Services};

#[derive(Parser, Debug)]
#[command(
    name = "catalog-assistant",
    about = "Product catalog assistant: ingest a catalog, then chat with it"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Embed a catalog JSON document into the vector index and row store
    Ingest {
        /// Catalog document (one JSON object or an array of objects)
        #[arg(long, short)]
        input: PathBuf,

        /// Destroy and rebuild the index even when its dimension matches
        #[arg(long, default_value_t = false)]
        recreate: bool,
    },
    /// Interactive chat on stdin/stdout
    Chat,
    /// Serve the HTTP API
    Serve {
        #[arg(long, env = "PORT")]
        port: Option<u16>,
    },
}

impl Command {
    /// The chat REPL owns the terminal, so its logs go to the file only.
    fn console(&self) -> Console {
        match self {
            Command::Chat => Console::Off,
            Command::Ingest { .. } | Command::Serve { .. } => Console::Stderr,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let settings = Settings::from_env().context("Invalid configuration")?;
    logging::init(&settings.paths, cli.command.console());

    let services = Services::build(settings)
        .await
        .context("Failed to initialize services")?;

    match cli.command {
        Command::Ingest { input, recreate } => ingest(&services, input, recreate).await,
        Command::Chat => chat(&services).await,
        Command::Serve { port } => serve(&services, port).await,
    }
}

async fn ingest(services: &Services, input: PathBuf, recreate: bool) -> anyhow::Result<()> {
    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupt received; stopping after the current batch");
            trigger.cancel();
        }
    });

    let report = services
        .ingestion_pipeline()
        .ingest_file(&input, IngestOptions { recreate }, &cancel)
        .await
        .with_context(|| format!("Ingestion of {} failed", input.display()))?;

    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

async fn chat(services: &Services) -> anyhow::Result<()> {
    let assistant = services
        .assistant()
        .await
        .context("Failed to prepare the assistant")?;
    let mut window = ConversationWindow::new(services.window_config());

    let mut stdout = tokio::io::stdout();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    stdout
        .write_all(
            b"Welcome to the Product Assistant! Type 'quit' to exit, 'reset' to clear history.\n",
        )
        .await?;

    loop {
        stdout.write_all(b"\nYou: ").await?;
        stdout.flush().await?;
        let Some(line) = lines.next_line().await? else {
            break;
        };
        let query = line.trim();
        match query.to_lowercase().as_str() {
            "" => continue,
            "quit" => {
                stdout.write_all(b"Goodbye!\n").await?;
                break;
            }
            "reset" => {
                window.reset();
                stdout.write_all(b"Conversation history cleared.\n").await?;
                continue;
            }
            _ => {}
        }

        let reply = match assistant.ask(&mut window, query).await {
            Ok(reply) => reply.answer,
            Err(err) => {
                tracing::error!("{}", err);
                "Sorry, I couldn't generate an answer right now. Please try again.".to_string()
            }
        };
        stdout
            .write_all(format!("\nAssistant: {}\n", reply).as_bytes())
            .await?;
    }
    Ok(())
}

async fn serve(services: &Services, port: Option<u16>) -> anyhow::Result<()> {
    let state = AppState::initialize(services)
        .await
        .context("Failed to prepare the assistant")?;
    let port = port.unwrap_or(services.settings.port);
    let bind_addr = format!("0.0.0.0:{}", port);

    let listener = TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("Failed to bind to {}", bind_addr))?;
    tracing::info!("Listening on {}", listener.local_addr()?);

    axum::serve(listener, server::router::router(state))
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await
        .context("Server error")?;
    Ok(())
}
