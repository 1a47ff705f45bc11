mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "codequest-cli")]
#[command(about = "CodeQuest CLI - Run and grade learner submissions locally", long_about = None)]
struct Cli {
    /// Sandbox configuration file (defaults to config/sandbox.json)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Execute a submission once and print the execution result
    Run {
        /// Submission source file
        #[arg(short, long)]
        file: PathBuf,

        /// Input passed to the entry point, as JSON
        #[arg(short, long)]
        input: Option<String>,
    },

    /// Run a submission against a challenge's test cases
    Test {
        /// Submission source file (defaults to the challenge's solution)
        #[arg(short, long)]
        file: Option<PathBuf>,

        /// Challenge file: `{ "tests": [...] }` or a bare array of test cases
        #[arg(short, long)]
        challenge: PathBuf,
    },

    /// Print the entry point the grader would invoke
    Entry {
        /// Submission source file
        #[arg(short, long)]
        file: PathBuf,
    },
}

fn main() -> Result<()> {
    // Diagnostics go to stderr so command output stays machine-readable
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run { file, input } => {
            commands::run(cli.config.as_deref(), &file, input.as_deref())?;
        }
        Commands::Test { file, challenge } => {
            let passed = commands::test(cli.config.as_deref(), file.as_deref(), &challenge)?;
            if !passed {
                std::process::exit(1);
            }
        }
        Commands::Entry { file } => {
            commands::entry(&file)?;
        }
    }

    Ok(())
}
