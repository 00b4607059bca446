use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "parseval",
    version,
    about = "Benchmark how faithfully LLM providers extract structured data"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Run the full test-case × provider grid
    Run {
        #[arg(short, long, default_value = "parseval.yaml")]
        config: PathBuf,
        /// Baseline the grid, then re-run it with optimizer-revised prompts
        #[arg(long)]
        optimize: bool,
        /// Write the full result artifact as JSON
        #[arg(long)]
        json_out: Option<PathBuf>,
        /// Override the configured parallelism
        #[arg(long)]
        parallel: Option<usize>,
        /// Override the configured per-call timeout
        #[arg(long)]
        timeout_seconds: Option<u64>,
    },
    /// List the discovered test cases without running anything
    Cases {
        #[arg(short, long, default_value = "parseval.yaml")]
        config: PathBuf,
    },
    /// Render a result artifact previously written by `run --json-out`
    Report {
        /// Path to the JSON artifact
        artifact: PathBuf,
    },
}
