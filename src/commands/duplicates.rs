use clap::Args;
use colored::Colorize;

use tallybook::duplicates::{count_duplicates, find_duplicate_groups};

use super::{money, Session};

#[derive(Debug, Args)]
pub struct Command {
    /// Delete all but the oldest of each duplicate set and save
    #[arg(short, long)]
    pub remove: bool,
}

pub fn execute_command(session: &Session, cmd: &Command) -> anyhow::Result<()> {
    let ledger = session.load()?;

    for group in find_duplicate_groups(ledger.transactions()) {
        println!("{} ({})", group.key.yellow(), group.count());
        for tx in group.transactions.iter() {
            let stamped = tx
                .timestamp
                .map(|t| t.to_rfc3339())
                .unwrap_or_else(|| "-".to_owned());
            println!("  {:24} {:32} {:>12}", tx.id, stamped, money(&tx.amount));
        }
    }

    let count = count_duplicates(ledger.transactions());
    if !cmd.remove || count == 0 {
        println!("{} duplicate(s)", count);
        return Ok(());
    }

    let (ledger, removed) = ledger.without_duplicates();
    session.save(&ledger)?;

    println!("removed {} duplicate(s), balance {}", removed, money(ledger.balance()));

    Ok(())
}
