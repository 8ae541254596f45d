//! # coursemate CLI
//!
//! ## Usage
//!
//! ```bash
//! coursemate --config ./config/coursemate.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `coursemate serve` | Load courses and start the HTTP API |
//! | `coursemate ask "<question>"` | Answer one question and print the sources |
//! | `coursemate courses` | List loaded course titles |
//! | `coursemate ingest` | Parse and embed the docs folder, report counts |
//!
//! The index lives in memory, so every command loads `[docs].root` first.
//! `serve` and `ask` need the generation API key; `courses` and `ingest`
//! only need embeddings.

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use coursemate::config::load_config;
use coursemate::{app, logging, server};

/// coursemate: ask questions about your course materials.
#[derive(Parser)]
#[command(
    name = "coursemate",
    about = "Retrieval-augmented assistant for course materials",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/coursemate.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP API server.
    Serve,

    /// Answer a single question.
    Ask {
        /// The question.
        query: String,

        /// Continue an existing session.
        #[arg(long)]
        session: Option<String>,
    },

    /// List loaded courses.
    Courses,

    /// Load the docs folder and report what was ingested.
    Ingest,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = load_config(&cli.config)?;
    logging::init(&config.logging.level)?;

    match cli.command {
        Commands::Serve => {
            let assistant = app::bootstrap(&config).await?;
            server::run_server(&config.server.bind, assistant).await?;
        }
        Commands::Ask { query, session } => {
            let assistant = app::bootstrap(&config).await?;
            let result = assistant.answer(&query, session.as_deref()).await?;
            println!("{}", result.answer);
            if !result.sources.is_empty() {
                println!();
                println!("Sources:");
                for source in &result.sources {
                    match &source.link {
                        Some(link) => println!("  - {} ({})", source.label, link),
                        None => println!("  - {}", source.label),
                    }
                }
            }
            println!();
            println!("session: {}", result.session_id);
        }
        Commands::Courses => {
            let (store, _) = app::load_store(&config).await?;
            let titles = store.course_titles().await?;
            println!("{} course(s)", titles.len());
            for title in titles {
                println!("  {}", title);
            }
        }
        Commands::Ingest => {
            let (_, summary) = app::load_store(&config).await?;
            println!(
                "ingested {} course(s), {} chunk(s); skipped {} duplicate(s)",
                summary.courses_added, summary.chunks_added, summary.skipped
            );
        }
    }

    Ok(())
}
