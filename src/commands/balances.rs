use chrono::Datelike;
use clap::Args;

use tallybook::balances::{monthly_totals, running_balance};

use super::{money, Session};

#[derive(Debug, Default, Args)]
pub struct Command {
    /// Only transactions dated on or before this day
    #[arg(short, long)]
    pub before: Option<String>,
}

pub fn execute_command(session: &Session, cmd: &Command) -> anyhow::Result<()> {
    let ledger = session.load_processed()?;
    let today = session.today()?;

    let balance = match &cmd.before {
        Some(before) => {
            let before = super::parse_day(before)?;
            let upto = ledger
                .transactions()
                .iter()
                .filter(|tx| tx.date <= before)
                .cloned()
                .collect::<Vec<_>>();
            running_balance(&upto)
        }
        None => ledger.balance().clone(),
    };

    let totals = monthly_totals(ledger.transactions(), today.year(), today.month());

    println!("{:12} {:>14}", "balance", money(&balance));
    println!("{:12} {:>14}", "income", money(&totals.income));
    println!("{:12} {:>14}", "expenses", money(&totals.expenses));
    println!("{:12} {:>14}", "net", money(&totals.net()));

    Ok(())
}
