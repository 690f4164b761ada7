use clap::Args;

use tallybook::insights;

use super::Session;

#[derive(Debug, Args)]
pub struct Command {}

pub fn execute_command(session: &Session, _cmd: &Command) -> anyhow::Result<()> {
    let ledger = session.load_processed()?;

    for insight in insights::generate(ledger.transactions(), ledger.budgets(), session.today()?) {
        println!("{}", insight);
    }

    Ok(())
}
