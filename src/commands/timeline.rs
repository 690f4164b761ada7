use clap::Args;

use tallybook::balances::{balance_over_time, daily_activity, monthly_trends};

use super::{money, Session};

#[derive(Debug, Args)]
pub struct Command {
    #[arg(short, long, default_value_t = 6)]
    pub months: u32,
    /// Also list per day activity for this many trailing days
    #[arg(short, long)]
    pub days: Option<u64>,
    /// Print the running balance after every transaction
    #[arg(short, long)]
    pub balance: bool,
}

pub fn execute_command(session: &Session, cmd: &Command) -> anyhow::Result<()> {
    let ledger = session.load_processed()?;
    let today = session.today()?;

    for trend in monthly_trends(ledger.transactions(), today, cmd.months) {
        println!(
            "{}-{:02} {:>12} {:>12} {:>12}",
            trend.year,
            trend.month,
            money(&trend.totals.income),
            money(&trend.totals.expenses),
            money(&trend.totals.net())
        );
    }

    if let Some(days) = cmd.days {
        println!();
        for day in daily_activity(ledger.transactions(), today, days) {
            println!(
                "{} {:>4} {:>12} {:>12}",
                day.date,
                day.count,
                money(&day.totals.income),
                money(&day.totals.expenses)
            );
        }
    }

    if cmd.balance {
        println!();
        for point in balance_over_time(ledger.transactions()) {
            println!("{} {:>12}", point.date, money(&point.balance));
        }
    }

    Ok(())
}
