//! CLI parse: clap types for carechat. No behavior; definitions only.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// carechat CLI - patient chat relay over multiple LLM providers
#[derive(Parser)]
#[command(name = "carechat")]
#[command(about = "Patient chat relay: one question, one provider, bounded per-user context")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Workspace root directory (holds config/ and the default store)
    #[arg(long, default_value = ".")]
    pub workspace: PathBuf,

    /// Configuration file path (overrides default config loading)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging (default: off, except for `serve`)
    #[arg(long, default_value = "false")]
    pub verbose: bool,

    /// Log level (trace, debug, info, warn, error, off)
    #[arg(long)]
    pub log_level: Option<String>,

    /// Log format (json, text)
    #[arg(long)]
    pub log_format: Option<String>,

    /// Log output (stdout, stderr, file, file+stderr)
    #[arg(long)]
    pub log_output: Option<String>,

    /// Log file path (if output includes "file")
    #[arg(long)]
    pub log_file: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the HTTP server
    Serve {
        /// Bind address (default from config: 127.0.0.1)
        #[arg(long)]
        bind: Option<String>,
        /// Port (default from config or PORT: 5000)
        #[arg(long)]
        port: Option<u16>,
    },
    /// Ask a single question from the terminal
    Ask {
        /// The question
        message: String,
        /// Provider: openai, gemini, grok, deepseek
        #[arg(long, default_value = "openai")]
        provider: String,
        /// Context string (repeatable)
        #[arg(long = "context")]
        contexts: Vec<String>,
        /// User id whose stored context and history apply
        #[arg(long)]
        user: Option<String>,
        /// Forward recent history for --user
        #[arg(long)]
        history: bool,
        /// Output format (text or json)
        #[arg(long, default_value = "text")]
        format: String,
    },
    /// Stored context lists
    Context {
        #[command(subcommand)]
        command: ContextCommands,
    },
    /// Stored interaction history
    History {
        #[command(subcommand)]
        command: HistoryCommands,
    },
    /// Patient records
    Patient {
        #[command(subcommand)]
        command: PatientCommands,
    },
    /// Show provider configuration
    Providers {
        /// Output format (text or json)
        #[arg(long, default_value = "text")]
        format: String,
    },
}

#[derive(Subcommand)]
pub enum ContextCommands {
    /// Show a user's context list, newest first
    Show { user: String },
    /// Remove a user's context list
    Clear { user: String },
}

#[derive(Subcommand)]
pub enum HistoryCommands {
    /// Show a user's interaction history
    Show {
        user: String,
        /// Output format (text or json)
        #[arg(long, default_value = "text")]
        format: String,
    },
    /// Show a user's recent distinct questions, newest first
    Questions { user: String },
}

#[derive(Subcommand)]
pub enum PatientCommands {
    /// Import patient records from a JSON file (one object or an array)
    Import { file: PathBuf },
    /// Show a patient summary and appointments
    Show {
        id: String,
        /// Output format (text or json)
        #[arg(long, default_value = "text")]
        format: String,
    },
    /// List stored patient ids
    List,
}
