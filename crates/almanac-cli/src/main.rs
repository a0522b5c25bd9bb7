use almanac_core::db;
use almanac_core::error::CoreError;
use almanac_core::repository::SqliteEventStore;
use clap::Parser;
use owo_colors::{OwoColorize, Style};
use tracing_subscriber::EnvFilter;

mod cli;
mod commands;
mod config;
mod parser;
mod util;
mod views;

use cli::{Commands, EventSubcommand, OccurrenceSubcommand, ReminderSubcommand};

const LOG_ENV: &str = "ALMANAC_LOG";

#[tokio::main]
async fn main() {
    init_tracing();

    let cli = cli::Cli::parse();

    let config = match config::Config::new() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{} Invalid configuration: {}", "Error:".red().bold(), e);
            std::process::exit(1);
        }
    };

    let pool = match db::establish_connection(&config.database_path).await {
        Ok(pool) => pool,
        Err(e) => {
            handle_error(e.into());
            std::process::exit(1);
        }
    };
    let store = SqliteEventStore::new(pool);

    let user_id = match util::resolve_user(cli.user.as_deref(), &config) {
        Ok(user_id) => user_id,
        Err(e) => {
            handle_error(e);
            std::process::exit(1);
        }
    };

    let result = match cli.command {
        Commands::Event(command) => match command.command {
            EventSubcommand::Add(command) => {
                commands::event::add_event(&store, &config, user_id, command).await
            }
            EventSubcommand::Edit(command) => {
                commands::event::edit_event(&store, &config, command).await
            }
            EventSubcommand::Delete(command) => {
                commands::event::delete_event(&store, &config, command).await
            }
            EventSubcommand::Show(command) => {
                commands::event::show_event(&store, &config, command).await
            }
        },
        Commands::Agenda(command) => {
            commands::agenda::show_agenda(&store, &config, user_id, command).await
        }
        Commands::Occurrence(command) => match command.command {
            OccurrenceSubcommand::Edit(command) => {
                commands::occurrence::edit_occurrence(&store, &config, command).await
            }
            OccurrenceSubcommand::Delete(command) => {
                commands::occurrence::delete_occurrence(&store, &config, command).await
            }
            OccurrenceSubcommand::Restore(command) => {
                commands::occurrence::restore_occurrence(&store, &config, command).await
            }
        },
        Commands::Reminder(command) => match command.command {
            ReminderSubcommand::Add(command) => {
                commands::reminder::add_reminder(&store, &config, command).await
            }
            ReminderSubcommand::Remove(command) => {
                commands::reminder::remove_reminder(&store, &config, command).await
            }
            ReminderSubcommand::Upcoming(command) => {
                commands::reminder::upcoming_reminders(&store, &config, user_id, command).await
            }
        },
    };

    if let Err(e) = result {
        handle_error(e);
        std::process::exit(1);
    }
}

/// Logs go to stderr so table output stays clean; `ALMANAC_LOG=debug` shows expansion detail.
fn init_tracing() {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn handle_error(err: anyhow::Error) {
    let error_style = Style::new().red().bold();

    match err.chain().find_map(|e| e.downcast_ref::<CoreError>()) {
        Some(CoreError::NotFound(s)) => {
            eprintln!("{} {}", "Error:".style(error_style), s);
        }
        Some(CoreError::InvalidInput(s)) => {
            eprintln!("{} Invalid input: {}", "Error:".style(error_style), s);
        }
        Some(CoreError::InvalidRule(s)) => {
            eprintln!(
                "{} Invalid recurrence: {}",
                "Error:".style(error_style),
                s.yellow()
            );
        }
        Some(CoreError::WindowTooLarge { produced, limit }) => {
            eprintln!(
                "{} Too many occurrences in this window ({} produced, limit {}).",
                "Error:".style(error_style),
                produced,
                limit
            );
            eprintln!("Narrow the window with --from/--to or --days.");
        }
        Some(CoreError::MalformedOccurrenceId(s)) => {
            eprintln!(
                "{} Malformed occurrence id: {}",
                "Error:".style(error_style),
                s.yellow()
            );
            eprintln!("Copy occurrence ids from `almanac agenda`.");
        }
        Some(core_error) if !core_error.is_client_error() => {
            tracing::error!(error = ?core_error, "storage failure");
            eprintln!("{} {:#}", "Error:".style(error_style), err);
        }
        _ => eprintln!("{} {}", "Error:".style(error_style), err),
    }
}
