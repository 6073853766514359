//! Line-oriented front end: parses text commands and prints results.

use crate::commands;
use crate::config::resolve_api_key;
use crate::engine::StreamOutcome;
use crate::models::{CitationView, Role};
use crate::providers::masked_api_key;
use crate::state::{AppState, DashboardEvent};
use anyhow::{Context, Result};
use clap::{CommandFactory, Parser, Subcommand};
use std::io::Write;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast;
use uuid::Uuid;

// Each input line is parsed as its own command line; the first word names the subcommand
#[derive(Debug, Parser)]
#[command(name = "llm-pulse", multicall = true)]
struct ConsoleLine {
    #[command(subcommand)]
    command: ConsoleCommand,
}

#[derive(Debug, Clone, PartialEq, Subcommand)]
pub enum ConsoleCommand {
    /// List tracked models
    Models,
    /// Tracked models ordered by rank
    Rankings,
    /// Competitor models ordered by rank
    Competitors,
    /// Totals and averages across tracked models
    Summary,
    /// Everything the dashboard shows, as JSON
    Snapshot,
    /// Start tracking a model
    AddModel {
        #[arg(required = true, trailing_var_arg = true)]
        name: Vec<String>,
    },
    /// Stop tracking a model
    RemoveModel { id: String },
    /// List monitoring prompts
    Prompts,
    /// Search prompts by label, text, country or language
    Search {
        #[arg(trailing_var_arg = true)]
        term: Vec<String>,
    },
    /// Add a prompt: <label> | <text> [| <country> [| <language>]]
    AddPrompt {
        #[arg(required = true, trailing_var_arg = true, allow_hyphen_values = true)]
        fields: Vec<String>,
    },
    /// Remove a monitoring prompt
    RemovePrompt { id: String },
    /// Citation sources, optionally filtered by a search term
    Citations {
        #[arg(long, value_enum, default_value_t = CitationView::Domain)]
        view: CitationView,
        #[arg(trailing_var_arg = true)]
        term: Vec<String>,
    },
    /// List provider configs
    Providers,
    /// Toggle a provider on or off
    Enable { id: String },
    /// Set a provider's API key (literal or env:VAR)
    Key { id: String, api_key: String },
    /// Toggle whether a provider's key is shown
    ShowKey { id: String },
    /// Pick the model a provider uses
    Select { id: String, model: String },
    /// Pick the tracked model the chat talks to
    ChatModel { id: String },
    /// Send a saved prompt with the brand name filled in
    UsePrompt { id: String },
    /// Send a chat message
    Send {
        #[arg(required = true, trailing_var_arg = true, allow_hyphen_values = true)]
        text: Vec<String>,
    },
    /// Stop the reply that is streaming
    Stop,
    /// Show the chat transcript
    Messages,
    /// Clear the chat transcript
    Clear,
    /// Show general settings
    Settings,
    /// Set the brand name used in prompts
    Brand {
        #[arg(trailing_var_arg = true)]
        name: Vec<String>,
    },
    /// Set the automation interval in minutes
    Interval { minutes: u32 },
    /// Set the time range (24h, 7d, 30d, 90d)
    Range { range: String },
    /// Leave the console
    #[command(alias = "exit")]
    Quit,
}

impl ConsoleCommand {
    /// Parses one console line. Help requests and usage errors come back as
    /// the text clap renders for them.
    pub fn parse(line: &str) -> Result<Self, String> {
        ConsoleLine::try_parse_from(line.split_whitespace())
            .map(|parsed| parsed.command)
            .map_err(|e| e.render().to_string())
    }
}

fn help_text() -> String {
    ConsoleLine::command().render_help().to_string()
}

/// Reads commands from stdin until `quit` or end of input.
pub async fn run_console(state: AppState) -> Result<()> {
    let printer = tokio::spawn(print_events(state.subscribe(), std::io::stdout()));
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut last_stream: Option<Uuid> = None;

    println!("{}", help_text());
    loop {
        print!("> ");
        std::io::stdout().flush().context("Failed to flush stdout")?;

        let Some(line) = lines.next_line().await.context("Failed to read from stdin")? else {
            break;
        };
        if line.trim().is_empty() {
            continue;
        }

        match ConsoleCommand::parse(&line) {
            Ok(ConsoleCommand::Quit) => break,
            Ok(command) => {
                if let Err(e) = execute(&state, command, &mut last_stream).await {
                    println!("error: {}", e);
                }
            }
            Err(e) => print!("{}", e),
        }
    }

    state.engine.shutdown().await;
    printer.abort();
    log::info!("Console closed");
    Ok(())
}

async fn execute(
    state: &AppState,
    command: ConsoleCommand,
    last_stream: &mut Option<Uuid>,
) -> Result<(), String> {
    match command {
        ConsoleCommand::Models | ConsoleCommand::Rankings | ConsoleCommand::Competitors => {
            let models = match command {
                ConsoleCommand::Models => commands::list_models(state).await?,
                ConsoleCommand::Rankings => commands::rankings(state).await?,
                _ => commands::list_competitors(state).await?,
            };
            for m in models {
                println!(
                    "#{:<3} {:<20} id={:<14} sentiment={}% mentions={} change={:+} {}ms accuracy={}%",
                    m.rank,
                    m.name,
                    m.id,
                    m.sentiment,
                    m.mentions,
                    m.change,
                    m.response_time_ms,
                    m.accuracy
                );
            }
        }
        ConsoleCommand::Summary => {
            let s = commands::dashboard_summary(state).await?;
            println!(
                "{} models, {} mentions, sentiment {}%, response {}ms, accuracy {}%",
                s.tracked_count,
                s.total_mentions,
                s.avg_sentiment,
                s.avg_response_time_ms,
                s.avg_accuracy
            );
        }
        ConsoleCommand::Snapshot => {
            let snapshot = commands::dashboard_snapshot(state).await?;
            let text = serde_json::to_string_pretty(&snapshot).map_err(|e| e.to_string())?;
            println!("{}", text);
        }
        ConsoleCommand::AddModel { name } => {
            let model = commands::add_model(state, name.join(" ")).await?;
            println!("added {} ({}) at rank {}", model.name, model.id, model.rank);
        }
        ConsoleCommand::RemoveModel { id } => commands::remove_model(state, id).await?,
        ConsoleCommand::Prompts | ConsoleCommand::Search { .. } => {
            let prompts = match command {
                ConsoleCommand::Search { term } => {
                    commands::search_prompts(state, term.join(" ")).await?
                }
                _ => commands::list_prompts(state).await?,
            };
            for (i, p) in prompts.iter().enumerate() {
                let tags: Vec<&str> = [p.country.as_deref(), p.language.as_deref()]
                    .into_iter()
                    .flatten()
                    .collect();
                let tags = tags.join("/");
                println!("Prompt #{} [{}] {}: {} {}", i + 1, p.id, p.label, p.prompt, tags);
            }
        }
        ConsoleCommand::AddPrompt { fields } => {
            let joined = fields.join(" ");
            let mut parts = joined.split('|').map(|p| p.trim().to_string());
            let label = parts.next().unwrap_or_default();
            let text = parts.next().unwrap_or_default();
            let (country, language) = (parts.next(), parts.next());
            let prompt = commands::add_prompt(state, label, text, country, language).await?;
            println!("added prompt {} ({})", prompt.label, prompt.id);
        }
        ConsoleCommand::RemovePrompt { id } => commands::remove_prompt(state, id).await?,
        ConsoleCommand::Citations { view, term } => {
            for c in commands::list_citations(state, view, term.join(" ")).await? {
                println!("{:>3}. {:<50} {}", c.position, c.domain, c.total_citations);
            }
        }
        ConsoleCommand::Providers => {
            for p in commands::list_providers(state).await? {
                let key_status = match resolve_api_key(&p) {
                    Ok(_) => "ready",
                    Err(_) => "missing",
                };
                println!(
                    "{:<14} {:<12} {} model={} of [{}] key={} ({})",
                    p.id,
                    p.name,
                    if p.enabled { "Enabled " } else { "Disabled" },
                    p.selected_model,
                    p.models.join(", "),
                    masked_api_key(&p),
                    key_status
                );
            }
        }
        ConsoleCommand::Enable { id } => {
            let enabled = commands::toggle_enabled(state, id).await?;
            println!("{}", if enabled { "enabled" } else { "disabled" });
        }
        ConsoleCommand::Key { id, api_key } => commands::set_api_key(state, id, api_key).await?,
        ConsoleCommand::ShowKey { id } => {
            let shown = commands::toggle_show_key(state, id).await?;
            println!("key {}", if shown { "shown" } else { "hidden" });
        }
        ConsoleCommand::Select { id, model } => {
            commands::set_selected_model(state, id, model).await?
        }
        ConsoleCommand::ChatModel { id } => commands::select_chat_model(state, id).await?,
        ConsoleCommand::UsePrompt { id } => {
            let text = commands::apply_prompt(state, id).await?;
            let handle = commands::send_message(state, text).await?;
            *last_stream = Some(handle.assistant_message_id);
        }
        ConsoleCommand::Send { text } => {
            let handle = commands::send_message(state, text.join(" ")).await?;
            *last_stream = Some(handle.assistant_message_id);
        }
        ConsoleCommand::Stop => {
            if let Some(id) = last_stream.take() {
                commands::stop_generation(state, id.to_string()).await?;
            }
        }
        ConsoleCommand::Messages => {
            for m in commands::get_messages(state).await? {
                let who = match m.role {
                    Role::User => "you".to_string(),
                    Role::Assistant => m.llm.clone().unwrap_or_else(|| "assistant".to_string()),
                };
                println!("[{}] {}: {}", m.timestamp.format("%H:%M:%S"), who, m.content);
            }
        }
        ConsoleCommand::Clear => commands::clear_messages(state).await?,
        ConsoleCommand::Settings => {
            let s = commands::get_settings(state).await?;
            println!(
                "brand='{}' interval={}min range={}",
                s.brand_name, s.automation_interval_minutes, s.time_range
            );
        }
        ConsoleCommand::Brand { name } => commands::set_brand_name(state, name.join(" ")).await?,
        ConsoleCommand::Interval { minutes } => {
            commands::set_automation_interval(state, minutes).await?
        }
        ConsoleCommand::Range { range } => commands::set_time_range(state, range).await?,
        ConsoleCommand::Quit => {}
    }
    Ok(())
}

// Writes streamed replies to `out` as their chunks arrive
async fn print_events<W: Write>(mut rx: broadcast::Receiver<DashboardEvent>, mut out: W) {
    loop {
        let written = match rx.recv().await {
            Ok(DashboardEvent::AssistantMessageChunk { delta, is_first_chunk, .. }) => {
                let separator = if is_first_chunk { "" } else { " " };
                write!(out, "{}{}", separator, delta).and_then(|_| out.flush())
            }
            Ok(DashboardEvent::AssistantStreamFinished { outcome, .. }) => {
                let suffix = match outcome {
                    StreamOutcome::Completed => "",
                    StreamOutcome::Cancelled => " [stopped]",
                    StreamOutcome::Failed => " [failed]",
                };
                writeln!(out, "{}", suffix)
            }
            Ok(_) => Ok(()),
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                log::warn!("Console fell behind by {} events", skipped);
                Ok(())
            }
            Err(broadcast::error::RecvError::Closed) => break,
        };
        if let Err(e) = written {
            log::warn!("Failed to print streamed reply: {}", e);
        }
    }
}
