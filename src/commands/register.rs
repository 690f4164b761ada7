use clap::Args;
use colored::Colorize;
use ellipse::Ellipse;
use regex::Regex;
use terminal_size::{terminal_size, Width};

use tallybook::model::*;

use super::{money, parse_day, Session};

#[derive(Debug, Args)]
pub struct Command {
    /// Matched against description and category
    pub pattern: Option<String>,
    #[arg(short, long)]
    pub before: Option<String>,
    #[arg(short, long)]
    pub after: Option<String>,
    #[arg(short, long)]
    pub cumulative: bool,
    /// Only occurrences of recurring rules
    #[arg(short, long)]
    pub recurring: bool,
    #[arg(long)]
    pub width: Option<u16>,
}

struct Format {
    leading_width: usize,
    category_width: usize,
    value_width: usize,
    cumulative_width: Option<usize>,
}

impl Format {
    pub fn new(cmd: &Command) -> Self {
        let fixed_spaces = 3;

        let maximum_width = match (cmd.width, terminal_size()) {
            (Some(w), _) | (None, Some((Width(w), _))) => w as usize,
            _ => 160,
        }
        .max(60);

        let value_width = 14;
        let cumulative_width = if cmd.cumulative {
            Some(value_width)
        } else {
            None
        };
        let after_values =
            maximum_width - value_width - cumulative_width.unwrap_or_default() - fixed_spaces;
        let category_width = after_values / 3;
        let leading_width = after_values - category_width;

        Self {
            leading_width,
            category_width,
            value_width,
            cumulative_width,
        }
    }
}

struct Row<'r> {
    tx: &'r Transaction,
    cumulative: &'r BigDecimal,
}

impl<'r> Row<'r> {
    fn format(self, format: &Format) -> String {
        let prefix = format!("{} {}", self.tx.date, self.tx.description);
        let category = self.tx.category_or_default();
        let value = money(&self.tx.signed_amount());

        match format.cumulative_width {
            Some(cumulative_width) => format!(
                "{:leading_width$} {:category_width$} {:>value_width$} {:>cumulative_width$}",
                prefix.as_str().truncate_ellipse(format.leading_width - 3),
                category.truncate_ellipse(format.category_width - 3),
                value,
                money(self.cumulative),
                leading_width = format.leading_width,
                category_width = format.category_width,
                value_width = format.value_width,
                cumulative_width = cumulative_width,
            ),
            None => format!(
                "{:leading_width$} {:category_width$} {:>value_width$}",
                prefix.as_str().truncate_ellipse(format.leading_width - 3),
                category.truncate_ellipse(format.category_width - 3),
                value,
                leading_width = format.leading_width,
                category_width = format.category_width,
                value_width = format.value_width,
            ),
        }
    }
}

pub fn execute_command(session: &Session, cmd: &Command) -> anyhow::Result<()> {
    let ledger = session.load_processed()?;

    let after = cmd.after.as_deref().map(parse_day).transpose()?;
    let before = cmd.before.as_deref().map(parse_day).transpose()?;
    let compiled = cmd.pattern.as_deref().map(Regex::new).transpose()?;

    let mut cumulative = BigDecimal::zero();
    let format = Format::new(cmd);
    for tx in ledger
        .transactions()
        .iter()
        .sorted_by_key(|tx| (tx.date, tx.timestamp))
        .filter(|tx| !cmd.recurring || tx.recurring_id.is_some())
        .filter(|tx| before.map_or(true, |before| tx.date < before))
        .filter(|tx| after.map_or(true, |after| tx.date >= after))
        .filter(|tx| {
            compiled
                .as_ref()
                .map_or(true, |c| c.is_match(&tx.description) || c.is_match(&tx.category))
        })
    {
        cumulative += tx.signed_amount();

        let row = Row {
            tx,
            cumulative: &cumulative,
        };

        println!(
            "{}",
            if tx.is_income() {
                row.format(&format).green()
            } else {
                row.format(&format).normal()
            }
        );
    }

    Ok(())
}
