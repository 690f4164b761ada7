use clap::Args;
use colored::Colorize;

use tallybook::budgets::goal_progress;

use super::{money, Session};

#[derive(Debug, Args)]
pub struct Command {}

pub fn execute_command(session: &Session, _cmd: &Command) -> anyhow::Result<()> {
    let ledger = session.load()?;
    let today = session.today()?;

    for goal in ledger.goals() {
        let progress = goal_progress(goal, today);
        let deadline = match progress.days_until_deadline {
            Some(days) if days < 0 => format!("{} days overdue", -days),
            Some(days) => format!("{} days left", days),
            None => "".to_owned(),
        };
        let line = format!(
            "{:24} {:>12} / {:>12} {:>6}% {}",
            goal.name,
            money(&goal.current),
            money(&goal.target),
            progress.percentage.round(1).with_scale(1),
            deadline
        );
        println!("{}", if progress.completed { line.green() } else { line.normal() });
    }

    Ok(())
}
