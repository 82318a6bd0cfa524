use std::io::{self, Write};
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use colored::Colorize;

use crate::budget::resolve_budget;
use crate::client::BackendClient;
use crate::config::Config;
use crate::error::SendError;
use crate::exchange::FinishReason;
use crate::ingest::DocumentIngestor;
use crate::session::SessionController;
use crate::settings::SharedSettings;

use super::args::ChatArgs;

pub(crate) async fn run(args: ChatArgs, config: &Config) -> Result<()> {
    let client = Arc::new(BackendClient::new(&config.backend)?);

    let mut chat_settings = config.chat.settings();
    if let Some(model) = args.model {
        resolve_budget(&model)
            .with_context(|| format!("Cannot start chat with model '{model}'"))?;
        chat_settings.model_id = model;
    }
    if let Some(temperature) = args.temperature {
        if !(0.0..=1.0).contains(&temperature) {
            bail!("Temperature {temperature} is out of range (expected 0.0..=1.0)");
        }
        chat_settings.temperature = temperature;
    }
    if let Some(effort) = args.reasoning_effort {
        chat_settings.reasoning_effort = effort;
    }

    let settings = Arc::new(SharedSettings::new(chat_settings));
    let mut controller = SessionController::new(client.clone(), settings.clone());

    if let Some(path) = args.document {
        ingest_and_load(&mut controller, client.as_ref(), &path).await?;
    } else {
        println!(
            "{}",
            "No document loaded. Use /open <path> to ingest one.".dimmed()
        );
    }

    println!("{}", "Type a question, or /help for commands.".dimmed());

    loop {
        print!("{} ", ">".bold());
        io::stdout().flush()?;

        let mut line = String::new();
        if io::stdin().read_line(&mut line)? == 0 {
            break;
        }
        let line = line.trim();

        if line.is_empty() {
            continue;
        }

        match line.split_once(' ').map_or((line, ""), |(cmd, rest)| (cmd, rest.trim())) {
            ("/quit", _) | ("/exit", _) => break,
            ("/help", _) => print_help(),
            ("/open", "") => println!("{}", "Usage: /open <path>".yellow()),
            ("/open", path) => {
                if let Err(err) =
                    ingest_and_load(&mut controller, client.as_ref(), Path::new(path)).await
                {
                    eprintln!("{} {err:#}", "Ingestion failed:".red());
                }
            }
            ("/reset", _) => {
                controller.reset_chat();
                println!("{}", "Conversation cleared; document kept.".dimmed());
            }
            ("/end", _) => match controller.end_chat() {
                Ok(summary) => {
                    println!(
                        "Session ended after {}s: {} question(s), {} answer(s), {} tokens used.",
                        summary.duration_secs, summary.user_turns, summary.assistant_turns,
                        summary.tokens_used
                    );
                }
                Err(err) => eprintln!("{} {err}", "Cannot end:".red()),
            },
            ("/model", "") => println!("{}", "Usage: /model <id>".yellow()),
            ("/model", model) => match resolve_budget(model) {
                Ok(budget) => {
                    settings.update(|current| current.model_id = model.to_string());
                    println!("Model set to {model} ({budget} token budget).");
                }
                Err(err) => eprintln!("{} {err}", "Cannot switch:".red()),
            },
            ("/budget", _) => {
                let budget = controller.session().budget();
                println!(
                    "{}: {} of {} tokens used, {} remaining.",
                    budget.model_id(),
                    budget.used(),
                    budget.total(),
                    budget.remaining()
                );
            }
            _ if line.starts_with('/') => {
                println!("{} {line}", "Unknown command:".yellow());
            }
            _ => send(&mut controller, line).await,
        }
    }

    Ok(())
}

async fn send(controller: &mut SessionController, text: &str) {
    let result = controller
        .send_message(text, |update| {
            print!("{}", update.delta);
            let _ = io::stdout().flush();
        })
        .await;
    println!();

    match result {
        Ok(outcome) if outcome.finish == FinishReason::Error => {
            eprintln!("{}", outcome.turn.display_content().red());
            eprintln!("{}", "The stream dropped; you can retry the question.".dimmed());
        }
        Ok(outcome) => {
            if outcome.finish != FinishReason::Stop {
                println!("{}", format!("(finish reason: {})", outcome.finish).yellow());
            }
            let line = format!(
                "{} of {} tokens used",
                outcome.budget.used(),
                outcome.budget.total()
            );
            if outcome.budget.is_exhausted() {
                println!("{}", format!("{line}; budget exhausted, /reset to start over").red());
            } else {
                println!("{}", line.dimmed());
            }
        }
        Err(SendError::Transport(err)) => {
            eprintln!("{} {err}", "Could not reach the chat backend:".red());
        }
        Err(SendError::Session(err)) => {
            eprintln!("{} {err}", "Cannot send:".red());
        }
    }
}

async fn ingest_and_load(
    controller: &mut SessionController,
    ingestor: &dyn DocumentIngestor,
    path: &Path,
) -> Result<()> {
    println!("{}", format!("Ingesting {}...", path.display()).dimmed());
    let handle = ingestor.ingest(&[path]).await?;
    controller.load_document(handle.clone());
    println!("Document ready ({handle}). Ask away.");
    Ok(())
}

fn print_help() {
    println!("Commands:");
    println!("  /open <path>   ingest a document and start over");
    println!("  /reset         clear the conversation, keep the document");
    println!("  /end           end the session and print a summary");
    println!("  /model <id>    switch the model for the next message");
    println!("  /budget        show token usage for this session");
    println!("  /quit          leave");
}
