use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{anyhow, Result};
use clap::{Parser, Subcommand};
use tracing::{debug, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use finance_chat_core::{
    ChatRole, ChatSession, Config, ConversationStore, GeminiClient, Generator, SubmitOutcome,
};

mod app;
mod handler;
mod tui;
mod ui;

use app::App;

const DEFAULT_LOG_FILTER: &str = "finance_chat=info,finance_chat_core=info";
const LOG_FILE: &str = "finance-chat.log";

#[derive(Parser)]
#[command(name = "finance-chat")]
#[command(about = "Chat with a Gemini-backed personal finance assistant")]
#[command(version)]
struct Cli {
    /// Gemini model to use (overrides the config file)
    #[arg(short, long, global = true)]
    model: Option<String>,

    /// Conversation snapshot file (overrides the config file)
    #[arg(short, long, global = true)]
    session: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Ask a single question and print the answer
    Ask {
        /// Your question
        question: String,
    },
    /// Print the saved conversation
    History,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // .env is optional
    let dotenv = dotenvy::dotenv();

    // Logging is best effort; the chat works without it
    let logging = match cli.command {
        None => init_file_logging(),
        Some(_) => init_stderr_logging(),
    };
    if let Err(e) = logging {
        eprintln!("Logging disabled: {}", e);
    }
    if let Err(e) = dotenv {
        debug!("no .env file loaded: {}", e);
    }

    let config = Config::load().unwrap_or_else(|e| {
        tracing::warn!(error = %e, "could not read config file, using defaults");
        Config::new()
    });
    let session = build_session(&config, cli.model, cli.session);

    match cli.command {
        None => run_tui(session).await,
        Some(Commands::Ask { question }) => ask(session, &question).await,
        Some(Commands::History) => {
            print_history(&session);
            Ok(())
        }
    }
}

fn build_session(
    config: &Config,
    model: Option<String>,
    session_path: Option<PathBuf>,
) -> ChatSession {
    let model = model.unwrap_or_else(|| config.model());
    let path = session_path.unwrap_or_else(|| config.session_path());

    let store = ConversationStore::open(&path);
    let base_url = config.base_url();
    let generator = config.api_key().map(|key| {
        Arc::new(GeminiClient::new(&key).with_base_url(&base_url)) as Arc<dyn Generator>
    });

    info!(
        model = %model,
        session = %path.display(),
        credential = generator.is_some(),
        "starting session"
    );

    ChatSession::new(store, generator, model)
}

async fn run_tui(session: ChatSession) -> Result<()> {
    tui::install_panic_hook();
    let mut terminal = tui::init()?;
    let mut events = tui::EventHandler::new();
    let mut app = App::new(session);

    let result = async {
        while !app.should_quit {
            terminal.draw(|frame| ui::render(&mut app, frame))?;

            match events.next().await {
                Some(event) => handler::handle_event(&mut app, event).await,
                None => break,
            }
        }
        Ok::<(), anyhow::Error>(())
    }
    .await;

    app.abandon_pending();
    tui::restore()?;
    result
}

async fn ask(mut session: ChatSession, question: &str) -> Result<()> {
    match session.submit(question).await {
        SubmitOutcome::Empty => Err(anyhow!("question is empty")),
        SubmitOutcome::Busy => Err(anyhow!("a request is already in flight")),
        SubmitOutcome::MissingCredential | SubmitOutcome::Answered | SubmitOutcome::Failed(_) => {
            if let Some(reply) = session.messages().last() {
                println!("{}", reply.text);
            }
            Ok(())
        }
    }
}

fn print_history(session: &ChatSession) {
    for msg in session.messages() {
        let speaker = match msg.role {
            ChatRole::User => "You",
            ChatRole::Assistant => "AI",
        };
        println!("{}: {}\n", speaker, msg.text);
    }
}

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| DEFAULT_LOG_FILTER.into())
}

/// The TUI owns stderr, so interactive runs log to a file.
fn init_file_logging() -> Result<()> {
    let log_dir = Config::data_dir()?;
    std::fs::create_dir_all(&log_dir)?;
    let log_file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_dir.join(LOG_FILE))?;

    tracing_subscriber::registry()
        .with(env_filter())
        .with(
            tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(std::sync::Mutex::new(log_file)),
        )
        .try_init()
        .map_err(|e| anyhow!("Failed to initialize tracing: {}", e))
}

fn init_stderr_logging() -> Result<()> {
    tracing_subscriber::registry()
        .with(env_filter())
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .try_init()
        .map_err(|e| anyhow!("Failed to initialize tracing: {}", e))
}
