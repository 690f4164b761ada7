use chrono::Datelike;
use clap::Args;

use tallybook::{balances::{category_breakdown, top_categories}, model::*};

use super::{money, parse_month, Session};

#[derive(Debug, Args)]
pub struct Command {
    /// YYYY-MM, defaults to the current month
    #[arg(short, long)]
    pub month: Option<String>,
    /// Break down income instead of expenses
    #[arg(short, long)]
    pub income: bool,
    #[arg(short, long, default_value_t = 10)]
    pub limit: usize,
}

pub fn execute_command(session: &Session, cmd: &Command) -> anyhow::Result<()> {
    let ledger = session.load_processed()?;
    let (year, month) = parse_month(cmd.month.as_deref(), session.today()?)?;
    let kind = if cmd.income { Kind::Income } else { Kind::Expense };

    let breakdown = category_breakdown(ledger.transactions(), |tx| {
        tx.kind == kind && tx.date.year() == year && tx.date.month() == month
    });

    let total: BigDecimal = breakdown.values().sum();
    let top = top_categories(&breakdown, cmd.limit);

    if let Some(width) = top.iter().map(|(name, _)| name.len()).max() {
        for (name, value) in top {
            let share = if total.is_zero() {
                BigDecimal::zero()
            } else {
                value * BigDecimal::from(100) / &total
            };
            println!(
                "{:width$} {:>12} {:>6}%",
                name,
                money(value),
                share.round(1).with_scale(1),
                width = width
            );
        }
    }

    println!("{} {}-{:02} {}", kind, year, month, money(&total));

    Ok(())
}
