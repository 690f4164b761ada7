use clap::Args;
use colored::Colorize;

use tallybook::budgets::{alerts, budget_status, BudgetLevel};

use super::{money, parse_month, Session};

#[derive(Debug, Args)]
pub struct Command {
    /// YYYY-MM, defaults to the current month
    #[arg(short, long)]
    pub month: Option<String>,
    /// Only budgets at or past the warning threshold
    #[arg(short, long)]
    pub alerts: bool,
}

pub fn execute_command(session: &Session, cmd: &Command) -> anyhow::Result<()> {
    let ledger = session.load_processed()?;
    let (year, month) = parse_month(cmd.month.as_deref(), session.today()?)?;

    let statuses = budget_status(
        ledger.budgets(),
        ledger.transactions(),
        year,
        month,
        &session.config.budget_warning(),
    );
    let statuses = if cmd.alerts { alerts(statuses) } else { statuses };

    if let Some(width) = statuses.iter().map(|s| s.category.len()).max() {
        for status in statuses {
            let line = format!(
                "{:width$} {:>12} / {:>12} {:>8}% {:>12}",
                status.category,
                money(&status.spent),
                money(&status.limit),
                status.percentage().round(1).with_scale(1),
                money(&status.remaining()),
                width = width
            );
            println!(
                "{}",
                match status.level {
                    BudgetLevel::Ok => line.normal(),
                    BudgetLevel::Warning => line.yellow(),
                    BudgetLevel::Exceeded => line.red(),
                }
            );
        }
    }

    Ok(())
}
