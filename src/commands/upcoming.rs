use clap::Args;
use colored::Colorize;

use tallybook::schedule;

use super::{money, Session};

#[derive(Debug, Args)]
pub struct Command {
    /// Days to look ahead, defaults to the configured horizon
    #[arg(short, long)]
    pub days: Option<u64>,
}

pub fn execute_command(session: &Session, cmd: &Command) -> anyhow::Result<()> {
    let ledger = session.load()?;
    let today = session.today()?;
    let horizon = cmd.days.unwrap_or(session.config.upcoming_days);

    for upcoming in schedule::upcoming(ledger.recurring(), today, horizon) {
        let rule = upcoming.rule;
        let line = format!(
            "{} {:>4}d {:10} {:8} {:>12} {}",
            upcoming.date,
            upcoming.days_until,
            rule.frequency.label(),
            rule.kind,
            money(&rule.amount),
            rule.description
        );
        println!(
            "{}",
            if upcoming.is_overdue() {
                line.red()
            } else if upcoming.is_due_soon() {
                line.yellow()
            } else {
                line.normal()
            }
        );
    }

    Ok(())
}
