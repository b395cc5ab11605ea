//! Receipts CLI - receipt tracking and spending analytics in your terminal

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};

mod commands;
mod output;

use commands::{analytics, auth, delete, demo, edit, list, logs, search, upload};
use receipts_core::LogEvent;

/// Receipts - upload, edit and analyze receipts from your terminal
#[derive(Parser)]
#[command(name = "receipts", version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List all receipts
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Search receipts on the server
    Search(search::SearchArgs),

    /// Upload a receipt image
    Upload {
        /// Path to the image file
        file: PathBuf,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Edit fields of a receipt
    Edit(edit::EditArgs),

    /// Delete a receipt
    Delete {
        /// Receipt ID
        id: i64,
        /// Skip confirmation prompt
        #[arg(long, short)]
        force: bool,
    },

    /// Show spending analytics
    Analytics(analytics::AnalyticsArgs),

    /// Start sign-in and print the provider URL
    Login,

    /// Finish sign-in with the code from the redirect
    Callback {
        /// Authorization code
        code: String,
    },

    /// Show the signed-in user
    Whoami {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Sign out
    Logout,

    /// View and manage the event log
    Logs {
        #[command(subcommand)]
        command: logs::LogsCommands,
    },

    /// Manage demo mode
    Demo {
        #[command(subcommand)]
        command: Option<demo::DemoCommands>,
    },
}

impl Commands {
    fn name(&self) -> &'static str {
        match self {
            Commands::List { .. } => "list",
            Commands::Search(_) => "search",
            Commands::Upload { .. } => "upload",
            Commands::Edit(_) => "edit",
            Commands::Delete { .. } => "delete",
            Commands::Analytics(_) => "analytics",
            Commands::Login => "login",
            Commands::Callback { .. } => "callback",
            Commands::Whoami { .. } => "whoami",
            Commands::Logout => "logout",
            Commands::Logs { .. } => "logs",
            Commands::Demo { .. } => "demo",
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let logger = commands::get_logger();
    commands::log_event(
        &logger,
        LogEvent::new("command_executed").with_command(cli.command.name()),
    );
    drop(logger);

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            output::error(&output::describe_error(&e));
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::List { json } => list::run(json),
        Commands::Search(args) => search::run(args),
        Commands::Upload { file, json } => upload::run(&file, json),
        Commands::Edit(args) => edit::run(args),
        Commands::Delete { id, force } => delete::run(id, force),
        Commands::Analytics(args) => analytics::run(args),
        Commands::Login => auth::login(),
        Commands::Callback { code } => auth::callback(&code),
        Commands::Whoami { json } => auth::whoami(json),
        Commands::Logout => auth::logout(),
        Commands::Logs { command } => logs::run(command),
        Commands::Demo { command } => demo::run(command),
    }
}
