use std::fmt::Display;
use std::io::{BufRead, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};

use writing_assistant::assistant::Assistant;
use writing_assistant::config::Config;
use writing_assistant::document::MediaType;
use writing_assistant::prompt::{ContinuationStyle, ImprovementFocus, DEFAULT_SUGGESTIONS};
use writing_assistant::server;
use writing_assistant::session::{ChatSession, DraftSession};

#[derive(Parser)]
#[command(name = "writing-assistant", about = "Document chat, drafting help and writing feedback")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve the HTTP API for the browser client
    Serve,
    /// Index a .txt or .pdf file into the shared corpus
    Ingest {
        /// File to upload
        path: PathBuf,
    },
    /// Ask a single question against the corpus
    Ask {
        /// The question
        question: String,
    },
    /// Interactive document chat; one question per line
    Chat,
    /// Suggest ways to continue a piece of text
    Suggest {
        /// Current text
        text: String,
        #[arg(long, default_value = "general")]
        style: String,
        #[arg(long, default_value_t = DEFAULT_SUGGESTIONS)]
        count: usize,
    },
    /// Continue, rewrite or enhance a draft
    Draft {
        /// Current draft
        text: String,
        #[arg(long, value_enum, default_value_t = DraftAction::Continue)]
        action: DraftAction,
        #[arg(long, default_value = "general")]
        style: String,
    },
    /// Analyse a text and suggest improvements
    Improve {
        /// Text to analyse
        text: String,
        #[arg(long, default_value = "general")]
        focus: String,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum DraftAction {
    Continue,
    Rewrite,
    Enhance,
}

fn init_tracing(json: bool) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info".into());
    if json {
        tracing_subscriber::fmt().json().with_env_filter(filter).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    let config = Config::from_env()?;
    init_tracing(config.json_logs);

    // Every command except `serve` talks to the clients directly.
    let connect = || Assistant::new(&config);

    let code = match cli.command {
        Commands::Serve => {
            server::run_server(&config).await?;
            ExitCode::SUCCESS
        }
        Commands::Ingest { path } => {
            let media_type = MediaType::from_path(&path).context(format!(
                "Unsupported file type: {} (expected .txt or .pdf)",
                path.display()
            ))?;
            let bytes =
                std::fs::read(&path).context(format!("Failed to read {}", path.display()))?;
            let name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();

            let assistant = connect().await?;
            report(
                assistant.ingest_upload(&name, &bytes, media_type.mime()).await,
                |report| println!("{}", report.message()),
            )
        }
        Commands::Ask { question } => {
            let assistant = connect().await?;
            let mut chat = ChatSession::default();
            report(assistant.ask(&mut chat, &question).await, |answer| {
                println!("\n{}\n", answer.text);
                for (i, source) in answer.sources.iter().enumerate() {
                    println!(
                        "[{}] {} #{} (score {:.3})",
                        i + 1,
                        source.source,
                        source.chunk_index,
                        source.score
                    );
                }
            })
        }
        Commands::Chat => {
            let assistant = connect().await?;
            let mut chat = ChatSession::default();
            let stdin = std::io::stdin();
            prompt_marker()?;
            for line in stdin.lock().lines() {
                let line = line.context("Failed to read line")?;
                if line.trim().is_empty() {
                    prompt_marker()?;
                    continue;
                }
                match assistant.ask(&mut chat, &line).await {
                    Ok(answer) => println!("AI: {}\n", answer.text),
                    Err(e) => eprintln!("{}\n", e),
                }
                prompt_marker()?;
            }
            ExitCode::SUCCESS
        }
        Commands::Suggest { text, style, count } => {
            let assistant = connect().await?;
            let mut draft = DraftSession::default();
            draft.set_text(text);
            draft.set_style(ContinuationStyle::from_name(&style));
            draft.set_count(count);
            report(assistant.suggest(&draft).await, |suggestions| {
                if suggestions.items.is_empty() {
                    println!("{}", suggestions.raw);
                }
                for item in suggestions.items {
                    println!("{}. {}", item.number, item.text);
                }
            })
        }
        Commands::Draft {
            text,
            action,
            style,
        } => {
            let assistant = connect().await?;
            let mut draft = DraftSession::default();
            draft.set_text(text);
            draft.set_style(ContinuationStyle::from_name(&style));
            let result = match action {
                DraftAction::Continue => assistant.continue_draft(&mut draft).await,
                DraftAction::Rewrite => assistant.rewrite(&mut draft).await,
                DraftAction::Enhance => assistant.enhance(&mut draft).await,
            };
            report(result, |text| println!("{}", text))
        }
        Commands::Improve { text, focus } => {
            let assistant = connect().await?;
            let result = assistant
                .improve(&text, ImprovementFocus::from_name(&focus))
                .await;
            report(result, |improvement| {
                println!("{}\n", improvement.analysis);
                println!(
                    "Text Statistics: {} words, {} characters",
                    improvement.stats.words, improvement.stats.characters
                );
            })
        }
    };

    Ok(code)
}

/// Shows a successful result, or prints the user-facing error and yields a
/// failing exit status so scripts can detect it.
fn report<T, E: Display>(result: Result<T, E>, show: impl FnOnce(T)) -> ExitCode {
    match result {
        Ok(value) => {
            show(value);
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("{}", e);
            ExitCode::FAILURE
        }
    }
}

fn prompt_marker() -> Result<()> {
    print!("You: ");
    std::io::stdout().flush().context("Failed to flush stdout")
}
