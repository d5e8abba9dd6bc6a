//! toolloop - bounded tool-calling conversations
//!
//! CLI entry point: loads configuration, wires the model client and tool
//! registry together, and runs one conversation.

use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use clap::{CommandFactory, FromArgMatches};
use colored::Colorize;
use eyre::{Context, Result};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use toolloop::cli::{AskArgs, Cli, Command, OutputFormat, generate_after_help};
use toolloop::config::Config;
use toolloop::llm::create_client;
use toolloop::orchestrator::{Orchestrator, RunOutcome};
use toolloop::tools::ToolRegistry;

fn setup_logging(cli_log_level: Option<&str>, config_log_level: Option<&str>) -> Result<()> {
    // Create log directory
    let log_dir = dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("toolloop")
        .join("logs");

    fs::create_dir_all(&log_dir).context("Failed to create log directory")?;

    // Determine log level with priority: CLI --log-level > config file > default (INFO)
    let level = match cli_log_level.or(config_log_level) {
        Some(s) => match s.to_uppercase().as_str() {
            "TRACE" => tracing::Level::TRACE,
            "DEBUG" => tracing::Level::DEBUG,
            "INFO" => tracing::Level::INFO,
            "WARN" | "WARNING" => tracing::Level::WARN,
            "ERROR" => tracing::Level::ERROR,
            _ => {
                eprintln!("Warning: Unknown log-level '{}', defaulting to INFO", s);
                tracing::Level::INFO
            }
        },
        None => tracing::Level::INFO,
    };

    let log_file = fs::File::create(log_dir.join("toolloop.log")).context("Failed to create log file")?;

    tracing_subscriber::fmt()
        .with_writer(log_file)
        .with_ansi(false)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()))
        .init();

    info!("Logging initialized (level: {:?})", level);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cmd = Cli::command().after_help(generate_after_help());
    let cli = Cli::from_arg_matches(&cmd.get_matches())?;

    let config = Config::load(cli.config.as_ref()).context("Failed to load configuration")?;

    setup_logging(cli.log_level.as_deref(), config.log_level.as_deref()).context("Failed to setup logging")?;

    debug!(command = ?cli.command, "main: dispatching command");
    match cli.command {
        Some(Command::Ask(args)) => {
            debug!("main: matched Ask command");
            cmd_ask(config, &args).await
        }
        Some(Command::Tools) => {
            debug!("main: matched Tools command");
            cmd_tools(&config)
        }
        Some(Command::Config) => {
            debug!("main: matched Config command");
            cmd_config(&config)
        }
        None => {
            debug!("main: no command specified, running ask with defaults");
            cmd_ask(config, &AskArgs::default()).await
        }
    }
}

/// Run one conversation and print the answer
async fn cmd_ask(mut config: Config, args: &AskArgs) -> Result<()> {
    debug!(?args, "cmd_ask: called");
    args.apply(&mut config);

    let resolved = config.validate().context("Invalid configuration")?;
    info!(model = %resolved.model, base_url = %resolved.base_url, "Resolved model endpoint");

    let registry = Arc::new(ToolRegistry::standard(&config.tools).context("Failed to build tool registry")?);
    let llm = create_client(&resolved, &config.auth).context("Failed to create model client")?;

    let orchestrator = Orchestrator::new(llm, registry, config.orchestrator.clone(), &resolved.model)
        .with_extra_body(resolved.extra_body.clone());

    let cancel = CancellationToken::new();
    let ctrl_c = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received, cancelling run");
            ctrl_c.cancel();
        }
    });

    let prompt = args.prompt();
    info!(prompt_len = prompt.len(), "Starting run");
    let outcome = orchestrator
        .run_with_cancel(prompt, &cancel)
        .await
        .context("Conversation failed")?;

    match args.format {
        OutputFormat::Text => print_text(prompt, &outcome),
        OutputFormat::Json => print_json(prompt, &outcome)?,
    }
    Ok(())
}

fn print_text(prompt: &str, outcome: &RunOutcome) {
    println!("{} {}", "Prompt:".bold(), prompt);

    if outcome.tool_activity.is_empty() {
        println!("{} {}", "Tool calls:".bold(), "none".dimmed());
    } else {
        println!("{}", "Tool calls:".bold());
        for activity in &outcome.tool_activity {
            let status = if activity.is_error {
                "error".red()
            } else {
                "ok".green()
            };
            println!(
                "  [turn {}] {} {} {} {}",
                activity.turn,
                activity.tool_name.yellow(),
                activity.arguments,
                status,
                format!("({}, {:?})", activity.call_id, activity.elapsed).dimmed()
            );
        }
    }

    println!();
    println!("{} {}", "Final answer:".bright_cyan().bold(), outcome.answer);
    println!(
        "{}",
        format!(
            "{} turn(s), {} input / {} output tokens",
            outcome.turns, outcome.usage.input_tokens, outcome.usage.output_tokens
        )
        .dimmed()
    );
}

fn print_json(prompt: &str, outcome: &RunOutcome) -> Result<()> {
    let activity: Vec<_> = outcome
        .tool_activity
        .iter()
        .map(|a| {
            serde_json::json!({
                "turn": a.turn,
                "id": a.call_id,
                "name": a.tool_name,
                "arguments": a.arguments,
                "is_error": a.is_error,
                "elapsed_ms": a.elapsed.as_millis() as u64,
            })
        })
        .collect();

    let report = serde_json::json!({
        "prompt": prompt,
        "answer": outcome.answer,
        "turns": outcome.turns,
        "usage": {
            "input_tokens": outcome.usage.input_tokens,
            "output_tokens": outcome.usage.output_tokens,
        },
        "tool_calls": activity,
    });
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

/// Print the tool catalogue as sent to the model
fn cmd_tools(config: &Config) -> Result<()> {
    debug!("cmd_tools: called");
    let registry = ToolRegistry::standard(&config.tools).context("Failed to build tool registry")?;
    let schemas: Vec<_> = registry.definitions().iter().map(|d| d.to_openai_schema()).collect();
    println!("{}", serde_json::to_string_pretty(&schemas)?);
    Ok(())
}

/// Print the effective configuration
fn cmd_config(config: &Config) -> Result<()> {
    debug!("cmd_config: called");
    print!("{}", serde_yaml::to_string(config).context("Failed to serialize config")?);
    Ok(())
}
