use anyhow::Result;
use chrono::Utc;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::prelude::*;

use tallybook::config::Configuration;

mod commands;

use commands::*;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[arg(short, long, value_name = "FILE")]
    path: PathBuf,
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Materialize due recurring transactions and save
    Process(process::Command),
    Balances(balances::Command),
    Register(register::Command),
    Categories(categories::Command),
    Timeline(timeline::Command),
    Duplicates(duplicates::Command),
    Budgets(budgets::Command),
    Goals(goals::Command),
    Upcoming(upcoming::Command),
    Insights(insights::Command),
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let get_rust_log = || -> String {
        let fallback = match cli.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        };
        std::env::var("RUST_LOG").unwrap_or_else(|_| fallback.into())
    };

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(get_rust_log()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let session = Session {
        path: cli.path.clone(),
        config: Configuration::load_or_default(cli.config.as_deref())?,
        now: Utc::now(),
    };

    match &cli.command {
        Some(Commands::Process(cmd)) => process::execute_command(&session, cmd),
        Some(Commands::Balances(cmd)) => balances::execute_command(&session, cmd),
        Some(Commands::Register(cmd)) => register::execute_command(&session, cmd),
        Some(Commands::Categories(cmd)) => categories::execute_command(&session, cmd),
        Some(Commands::Timeline(cmd)) => timeline::execute_command(&session, cmd),
        Some(Commands::Duplicates(cmd)) => duplicates::execute_command(&session, cmd),
        Some(Commands::Budgets(cmd)) => budgets::execute_command(&session, cmd),
        Some(Commands::Goals(cmd)) => goals::execute_command(&session, cmd),
        Some(Commands::Upcoming(cmd)) => upcoming::execute_command(&session, cmd),
        Some(Commands::Insights(cmd)) => insights::execute_command(&session, cmd),
        None => balances::execute_command(&session, &balances::Command::default()),
    }
}
