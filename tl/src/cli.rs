//! CLI command definitions and subcommands

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use tracing::debug;

use crate::config::Config;
use crate::tools::DispatchMode;

/// Prompt used when `ask` is given none
pub const DEFAULT_PROMPT: &str =
    "What's the weather in Seattle today, should I bring an umbrella, and what time is it right now? Use tools as needed.";

/// toolloop - bounded tool-calling conversations with an OpenAI-compatible model
#[derive(Parser)]
#[command(
    name = "tl",
    about = "Run a bounded tool-calling conversation against an OpenAI-compatible chat endpoint",
    version
)]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true, help = "Path to config file")]
    pub config: Option<PathBuf>,

    /// Log level (TRACE, DEBUG, INFO, WARN, ERROR)
    #[arg(
        short = 'l',
        long = "log-level",
        global = true,
        help = "Log level (TRACE, DEBUG, INFO, WARN, ERROR)"
    )]
    pub log_level: Option<String>,

    /// Subcommand to execute (defaults to `ask`)
    #[command(subcommand)]
    pub command: Option<Command>,
}

/// CLI subcommands
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Ask the model a question, letting it call tools
    Ask(AskArgs),

    /// Print the tool catalogue advertised to the model
    Tools,

    /// Print the effective configuration
    Config,
}

/// Arguments for `tl ask`
#[derive(Debug, Clone, Default, Args)]
pub struct AskArgs {
    /// Question for the model
    pub prompt: Option<String>,

    /// Maximum model calls for this run
    #[arg(short = 't', long)]
    pub max_turns: Option<u32>,

    /// Run tool calls one at a time
    #[arg(short, long)]
    pub sequential: bool,

    /// Seed for the weather tool
    #[arg(long)]
    pub seed: Option<u64>,

    /// Output format
    #[arg(short, long, default_value = "text")]
    pub format: OutputFormat,
}

impl AskArgs {
    /// Prompt to send, falling back to the built-in question
    pub fn prompt(&self) -> &str {
        self.prompt
            .as_deref()
            .filter(|p| !p.trim().is_empty())
            .unwrap_or(DEFAULT_PROMPT)
    }

    /// Apply command-line overrides on top of the loaded configuration
    pub fn apply(&self, config: &mut Config) {
        debug!(?self.max_turns, self.sequential, ?self.seed, "AskArgs::apply: called");
        if let Some(max_turns) = self.max_turns {
            config.orchestrator.max_turns = max_turns;
        }
        if self.sequential {
            config.orchestrator.dispatch = DispatchMode::Sequential;
        }
        if let Some(seed) = self.seed {
            config.tools.weather_seed = Some(seed);
        }
    }
}

/// Get the log file path
pub fn get_log_path() -> PathBuf {
    debug!("get_log_path: called");
    let path = dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("toolloop")
        .join("logs")
        .join("toolloop.log");
    debug!(?path, "get_log_path: returning path");
    path
}

/// Generate the after_help text with the environment it depends on
pub fn generate_after_help() -> String {
    debug!("generate_after_help: called");
    let defaults = Config::default();
    let mut help = String::new();

    help.push_str("Environment:\n");
    for var in [&defaults.llm.project_env, &defaults.llm.location_env] {
        let icon = match std::env::var(var) {
            Ok(value) if !value.trim().is_empty() => "\u{2705}",
            _ => "\u{274C}",
        };
        help.push_str(&format!("  {} {}\n", icon, var));
    }

    help.push('\n');
    help.push_str(&format!("Logs are written to: {}\n", get_log_path().display()));
    help
}

/// Output format for `ask`
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        debug!(%s, "OutputFormat::from_str: called");
        match s.to_lowercase().as_str() {
            "text" | "plain" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            _ => Err(format!("Unknown format: {}. Use: text or json", s)),
        }
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Text => write!(f, "text"),
            Self::Json => write!(f, "json"),
        }
    }
}
