use clap::Args;
use colored::Colorize;

use super::{money, Session};

#[derive(Debug, Args)]
pub struct Command {
    /// Show what would be created without saving
    #[arg(short = 'n', long)]
    pub dry_run: bool,
}

pub fn execute_command(session: &Session, cmd: &Command) -> anyhow::Result<()> {
    let ledger = session.load()?;
    let (ledger, created) = ledger.apply_recurring(&session.processor()?, session.now);

    for tx in created.iter() {
        let line = format!(
            "{} {:8} {:>12} {} {}",
            tx.date,
            tx.kind,
            money(&tx.amount),
            tx.category_or_default(),
            tx.description
        );
        println!("{}", if tx.is_income() { line.green() } else { line.red() });
    }

    if cmd.dry_run {
        return Ok(());
    }

    session.save(&ledger)?;

    println!("{} created, balance {}", created.len(), money(ledger.balance()));

    Ok(())
}
