use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use parlance::recognizer::ConsoleRecognizer;
use parlance::session::{ChatSession, SessionEvent};
use parlance::{Config, KeyStore};

/// Parlance - streaming voice chat client for LLM endpoints
#[derive(Parser)]
#[command(name = "parlance", version, about)]
struct Cli {
    /// Completion endpoint URL
    #[arg(long, env = "PARLANCE_ENDPOINT")]
    endpoint: Option<String>,

    /// Model identifier passed to the endpoint
    #[arg(long, env = "PARLANCE_MODEL")]
    model: Option<String>,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Store the endpoint API key
    SetKey {
        /// The API key value
        key: String,
    },
    /// Show where the API key is stored and whether one is set
    ShowKey,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Set up logging based on verbosity
    let filter = match cli.verbose {
        0 => "info,parlance=info",
        1 => "info,parlance=debug",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .with_writer(std::io::stderr)
        .init();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("fatal: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    if let Some(cmd) = cli.command {
        return match cmd {
            Command::SetKey { key } => cmd_set_key(&key),
            Command::ShowKey => cmd_show_key(),
        };
    }

    let config = Config::load_with_overrides(cli.endpoint, cli.model)?;

    tracing::info!(
        endpoint = %config.endpoint,
        model = %config.model,
        auto_answer = config.auto_answer,
        "starting parlance"
    );

    let (session, handle, mut events) =
        ChatSession::new(config, Box::new(ConsoleRecognizer::new()))?;

    // Print session events while the loop runs
    let printer = tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            match event {
                SessionEvent::InterimPreview(text) => eprintln!("... {text}"),
                SessionEvent::FinalChunk(text) => println!("you: {text}"),
                SessionEvent::QuestionDetected(_) => {}
                SessionEvent::ReplyStarted => print!("assistant: "),
                SessionEvent::ReplyDelta(delta) => {
                    use std::io::Write;
                    print!("{delta}");
                    let _ = std::io::stdout().flush();
                }
                SessionEvent::ReplyFinished => println!(),
                SessionEvent::Notice(text) => eprintln!("! {text}"),
            }
        }
    });

    // Ctrl-C aborts an in-flight reply; a second one is the default handler
    let interrupt_handle = handle.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            if interrupt_handle.is_busy() {
                interrupt_handle.abort();
            } else {
                interrupt_handle.stop().await;
            }
        }
    });

    session.run().await?;
    printer.abort();

    Ok(())
}

/// Store the endpoint API key
fn cmd_set_key(key: &str) -> anyhow::Result<()> {
    let store = KeyStore::default_location();
    store.save(key)?;
    println!("API key saved");
    Ok(())
}

/// Show where the API key is stored and whether one is set
fn cmd_show_key() -> anyhow::Result<()> {
    let store = KeyStore::default_location();
    match store.load() {
        Some(key) => {
            let tail: String = key
                .chars()
                .skip(key.chars().count().saturating_sub(4))
                .collect();
            println!("API key set (ends in ...{tail}) at {}", store.path().display());
        }
        None => println!("No API key stored at {}", store.path().display()),
    }
    Ok(())
}
