use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "promptlens", version, about = "Prompt quality metrics from Claude Code transcripts")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Analyze recent transcripts and emit a JSON report
    Analyze(AnalyzeArgs),
    /// Show how a single message is classified
    Classify(ClassifyArgs),
}

#[derive(Parser, Default)]
pub struct AnalyzeArgs {
    /// Only include transcripts modified in the last N days (default 7)
    #[arg(long)]
    pub days: Option<u32>,

    /// Maximum prompts kept after sorting by recency (default 100)
    #[arg(long)]
    pub limit: Option<usize>,

    /// Show example prompts in full instead of cutting them at 200 characters
    #[arg(long, short)]
    pub verbose: bool,

    /// Case-insensitive substring filter on the project directory name
    #[arg(long)]
    pub project: Option<String>,

    /// Write the report to this file instead of stdout
    #[arg(long, short)]
    pub output: Option<PathBuf>,

    /// Claude projects directory (default ~/.claude/projects)
    #[arg(long, env = "PROMPTLENS_PROJECTS_DIR")]
    pub projects_dir: Option<PathBuf>,
}

#[derive(Parser)]
pub struct ClassifyArgs {
    /// Message text to classify
    pub text: String,
}
