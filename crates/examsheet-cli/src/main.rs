//! examsheet CLI — the user-facing command-line interface.

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "examsheet", version, about = "MCQ exam delivery and grading tool")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Submit an answer sheet for the active exam
    Submit {
        /// Student name as it should appear in the results
        #[arg(long)]
        name: String,

        /// Comma-separated answers, blanks allowed (e.g. "A,B,,D,E")
        #[arg(long)]
        answers: String,

        /// Config file path
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// List the exam catalog
    Exams {
        /// Config file path
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Select the active exam (instructor)
    SetActive {
        /// Exam id to activate
        #[arg(long)]
        exam_id: String,

        /// Teacher key override (defaults to the configured key)
        #[arg(long)]
        key: Option<String>,

        /// Config file path
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Per-student results and item analysis (instructor)
    Dashboard {
        /// Exam id (defaults to the active exam)
        #[arg(long)]
        exam_id: Option<String>,

        /// Dump the item analysis as JSON
        #[arg(long)]
        json: bool,

        /// Config file path
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Create a starter config file
    Init,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("examsheet=info".parse().unwrap()),
        )
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Submit {
            name,
            answers,
            config,
        } => commands::submit::execute(name, answers, config).await,
        Commands::Exams { config } => commands::exams::execute(config).await,
        Commands::SetActive {
            exam_id,
            key,
            config,
        } => commands::set_active::execute(exam_id, key, config).await,
        Commands::Dashboard {
            exam_id,
            json,
            config,
        } => commands::dashboard::execute(exam_id, json, config).await,
        Commands::Init => commands::init::execute(),
    };

    if let Err(e) = result {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}
