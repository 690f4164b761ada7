use std::collections::{BTreeMap, HashMap};

use chrono::{Datelike, Days, Months};

use crate::model::*;

/// Income minus expenses over every transaction. Order does not matter.
pub fn running_balance(transactions: &[Transaction]) -> BigDecimal {
    transactions.iter().map(|tx| tx.signed_amount()).sum()
}

#[derive(Debug, PartialEq, Clone, Default)]
pub struct MonthlyTotals {
    pub income: BigDecimal,
    pub expenses: BigDecimal,
}

impl MonthlyTotals {
    pub fn net(&self) -> BigDecimal {
        &self.income - &self.expenses
    }

    fn add(mut self, tx: &Transaction) -> Self {
        match tx.kind {
            Kind::Income => self.income += &tx.amount,
            Kind::Expense => self.expenses += &tx.amount,
        }
        self
    }
}

fn in_month(tx: &Transaction, year: i32, month: u32) -> bool {
    tx.date.year() == year && tx.date.month() == month
}

pub fn monthly_totals(transactions: &[Transaction], year: i32, month: u32) -> MonthlyTotals {
    transactions
        .iter()
        .filter(|tx| in_month(tx, year, month))
        .fold(MonthlyTotals::default(), |acc, tx| acc.add(tx))
}

/// Sums amounts per category over the transactions matching `predicate`.
/// Blank categories are reported as "Other".
pub fn category_breakdown<P>(transactions: &[Transaction], predicate: P) -> BTreeMap<String, BigDecimal>
where
    P: Fn(&Transaction) -> bool,
{
    transactions
        .iter()
        .filter(|tx| predicate(tx))
        .fold(BTreeMap::new(), |mut acc, tx| {
            *acc.entry(tx.category_or_default().to_owned())
                .or_insert_with(BigDecimal::zero) += &tx.amount;
            acc
        })
}

/// Expense categories of one calendar month.
pub fn monthly_spending(transactions: &[Transaction], year: i32, month: u32) -> BTreeMap<String, BigDecimal> {
    category_breakdown(transactions, |tx| tx.is_expense() && in_month(tx, year, month))
}

/// Largest categories first, at most `limit` of them. Ties are ordered by name.
pub fn top_categories(breakdown: &BTreeMap<String, BigDecimal>, limit: usize) -> Vec<(&str, &BigDecimal)> {
    breakdown
        .iter()
        .sorted_by(|a, b| b.1.cmp(a.1).then_with(|| a.0.cmp(b.0)))
        .take(limit)
        .map(|(k, v)| (k.as_str(), v))
        .collect_vec()
}

#[derive(Debug, PartialEq, Clone)]
pub struct BalancePoint {
    pub date: NaiveDate,
    pub balance: BigDecimal,
}

/// One point per transaction, chronological. Same-day transactions are
/// accumulated by timestamp so the series is stable across calls.
pub fn balance_over_time(transactions: &[Transaction]) -> Vec<BalancePoint> {
    transactions
        .iter()
        .sorted_by_key(|tx| (tx.date, tx.timestamp))
        .scan(BigDecimal::zero(), |balance, tx| {
            *balance += tx.signed_amount();
            Some(BalancePoint {
                date: tx.date,
                balance: balance.clone(),
            })
        })
        .collect_vec()
}

#[derive(Debug, PartialEq, Clone)]
pub struct MonthlyTrend {
    pub year: i32,
    pub month: u32,
    pub totals: MonthlyTotals,
}

/// Totals for the `months` calendar months ending with the month of `as_of`,
/// oldest first. Months without activity report zeros.
pub fn monthly_trends(transactions: &[Transaction], as_of: NaiveDate, months: u32) -> Vec<MonthlyTrend> {
    let first_of_month = as_of.with_day(1).unwrap_or(as_of);

    (0..months)
        .rev()
        .filter_map(|back| first_of_month.checked_sub_months(Months::new(back)))
        .map(|month| MonthlyTrend {
            year: month.year(),
            month: month.month(),
            totals: monthly_totals(transactions, month.year(), month.month()),
        })
        .collect_vec()
}

#[derive(Debug, PartialEq, Clone)]
pub struct DailyActivity {
    pub date: NaiveDate,
    pub totals: MonthlyTotals,
    pub count: usize,
}

/// Per day totals over the trailing `days` days ending at `as_of`. Days with no
/// transactions are left out.
pub fn daily_activity(transactions: &[Transaction], as_of: NaiveDate, days: u64) -> Vec<DailyActivity> {
    let since = as_of
        .checked_sub_days(Days::new(days.saturating_sub(1)))
        .unwrap_or(NaiveDate::MIN);

    let by_day: HashMap<NaiveDate, Vec<&Transaction>> = transactions
        .iter()
        .filter(|tx| tx.date >= since && tx.date <= as_of)
        .map(|tx| (tx.date, tx))
        .into_group_map();

    by_day
        .into_iter()
        .sorted_by_key(|(date, _)| *date)
        .map(|(date, txs)| DailyActivity {
            date,
            count: txs.len(),
            totals: txs
                .into_iter()
                .fold(MonthlyTotals::default(), |acc, tx| acc.add(tx)),
        })
        .collect_vec()
}
