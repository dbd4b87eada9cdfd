//! Clap argument types.

use clap::{Parser, ValueEnum};
use std::path::PathBuf;

/// LLM-assisted file review and rewrite CLI.
#[derive(Parser, Debug)]
#[command(name = "redline", version, about)]
pub struct Cli {
    /// Workspace root (default: current directory).
    #[arg(long, global = true, default_value = ".")]
    pub path: PathBuf,

    #[command(subcommand)]
    pub command: Command,
}

/// Available commands.
#[derive(clap::Subcommand, Debug)]
pub enum Command {
    /// Start an interactive chat session.
    Chat,

    /// Review one file, or the whole workspace.
    Review(ReviewArgs),

    /// Review the whole workspace and print the accumulated project notes.
    Project(ProjectArgs),

    /// Review a line range of one file (never modifies anything).
    Selection(SelectionArgs),

    /// Review uncommitted git changes.
    Diff(DiffArgs),

    /// Explain what a file does.
    Explain(ExplainArgs),

    /// Generate code from a description.
    Generate(GenerateArgs),

    /// Watch the workspace and re-review files as they change.
    Watch,

    /// Interactively configure the backend and credential.
    Configure,
}

/// Output format for review results.
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum OutputFormat {
    Terminal,
    Json,
}

/// Arguments for the `review` subcommand.
#[derive(Parser, Debug)]
pub struct ReviewArgs {
    /// File to review, relative to the workspace root. Omit to review
    /// everything matching the configured filters.
    pub file: Option<String>,

    /// Apply suggested rewrites without prompting.
    #[arg(long, default_value_t = false)]
    pub apply: bool,

    /// Ask for a rewrite instead of a review (single file only).
    #[arg(long, default_value_t = false)]
    pub refactor: bool,

    /// Output format.
    #[arg(long, value_enum, default_value_t = OutputFormat::Terminal)]
    pub format: OutputFormat,

    /// Disable the live progress display.
    #[arg(long, default_value_t = false)]
    pub no_progress: bool,
}

/// Arguments for the `project` subcommand.
#[derive(Parser, Debug)]
pub struct ProjectArgs {
    /// Disable the live progress display.
    #[arg(long, default_value_t = false)]
    pub no_progress: bool,
}

/// Arguments for the `selection` subcommand.
#[derive(Parser, Debug)]
pub struct SelectionArgs {
    /// File to review, relative to the workspace root.
    pub file: String,

    /// First line of the selection (1-based, inclusive).
    #[arg(long)]
    pub start: usize,

    /// Last line of the selection (inclusive).
    #[arg(long)]
    pub end: usize,
}

/// Arguments for the `diff` subcommand.
#[derive(Parser, Debug)]
pub struct DiffArgs {
    /// Output format.
    #[arg(long, value_enum, default_value_t = OutputFormat::Terminal)]
    pub format: OutputFormat,
}

/// Arguments for the `explain` subcommand.
#[derive(Parser, Debug)]
pub struct ExplainArgs {
    /// File to explain, relative to the workspace root.
    pub file: String,
}

/// Arguments for the `generate` subcommand.
#[derive(Parser, Debug)]
pub struct GenerateArgs {
    /// What to generate.
    pub description: String,

    /// Write the generated code to this file instead of stdout.
    #[arg(long)]
    pub out: Option<PathBuf>,
}
