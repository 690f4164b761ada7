use std::collections::{BTreeMap, HashMap};

use bigdecimal::Signed;
use chrono::{Datelike, Months};
use lazy_static::lazy_static;
use regex::Regex;

use crate::{balances, model::*};

lazy_static! {
    static ref SUBSCRIPTION: Regex =
        Regex::new(r"(?i)netflix|spotify|prime|subscription|membership|hulu|disney").unwrap();
}

#[derive(Debug, PartialEq, Clone)]
pub enum Insight {
    SpendingIncreased {
        category: String,
        percent: BigDecimal,
        this_month: BigDecimal,
        last_month: BigDecimal,
    },
    SpendingDecreased {
        category: String,
        percent: BigDecimal,
    },
    BudgetAlmostReached {
        category: String,
        percent: BigDecimal,
        remaining: BigDecimal,
    },
    BudgetExceeded {
        category: String,
        over: BigDecimal,
    },
    Subscriptions {
        count: usize,
        total: BigDecimal,
    },
    HighSavingsRate(BigDecimal),
    LowSavingsRate(BigDecimal),
    Overspending(BigDecimal),
    TopSpendingDay {
        date: NaiveDate,
        total: BigDecimal,
    },
}

impl std::fmt::Display for Insight {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Insight::SpendingIncreased {
                category,
                percent,
                this_month,
                last_month,
            } => write!(
                f,
                "{} spending up {}% ({} this month, {} last month)",
                category,
                percent.round(0),
                this_month.with_scale(2),
                last_month.with_scale(2)
            ),
            Insight::SpendingDecreased { category, percent } => {
                write!(f, "{} spending down {}%", category, percent.round(0))
            }
            Insight::BudgetAlmostReached {
                category,
                percent,
                remaining,
            } => write!(
                f,
                "{} budget {}% used, {} remaining",
                category,
                percent.round(0),
                remaining.with_scale(2)
            ),
            Insight::BudgetExceeded { category, over } => {
                write!(f, "{} budget exceeded by {}", category, over.with_scale(2))
            }
            Insight::Subscriptions { count, total } => {
                write!(f, "{} subscription(s) costing {}", count, total.with_scale(2))
            }
            Insight::HighSavingsRate(rate) => write!(f, "saving {}% of income", rate.round(0)),
            Insight::LowSavingsRate(rate) => {
                write!(f, "savings rate is {}%, aim for 20%", rate.round(0))
            }
            Insight::Overspending(by) => {
                write!(f, "spending {} more than earning", by.with_scale(2))
            }
            Insight::TopSpendingDay { date, total } => {
                write!(f, "spent {} on {}", total.with_scale(2), date)
            }
        }
    }
}

fn percent_change(now: &BigDecimal, before: &BigDecimal) -> BigDecimal {
    (now - before) * BigDecimal::from(100) / before
}

fn month_over_month(
    this_month: &BTreeMap<String, BigDecimal>,
    last_month: &BTreeMap<String, BigDecimal>,
) -> Vec<Insight> {
    let threshold = BigDecimal::from(30);

    this_month
        .iter()
        .filter_map(|(category, now)| {
            let before = last_month.get(category).filter(|v| !v.is_zero())?;
            let percent = percent_change(now, before);
            if percent > threshold {
                Some(Insight::SpendingIncreased {
                    category: category.clone(),
                    percent,
                    this_month: now.clone(),
                    last_month: before.clone(),
                })
            } else if percent < -threshold.clone() {
                Some(Insight::SpendingDecreased {
                    category: category.clone(),
                    percent: -percent,
                })
            } else {
                None
            }
        })
        .collect_vec()
}

fn budget_warnings(budgets: &Budgets, spending: &BTreeMap<String, BigDecimal>) -> Vec<Insight> {
    let hundred = BigDecimal::from(100);
    let almost = BigDecimal::from(90);

    budgets
        .iter()
        .filter(|(_, limit)| !limit.is_zero())
        .filter_map(|(category, limit)| {
            let spent = spending.get(category).cloned().unwrap_or_else(BigDecimal::zero);
            let percent = &spent * &hundred / limit;
            if percent >= hundred {
                Some(Insight::BudgetExceeded {
                    category: category.clone(),
                    over: spent - limit,
                })
            } else if percent >= almost {
                Some(Insight::BudgetAlmostReached {
                    category: category.clone(),
                    percent,
                    remaining: limit - spent,
                })
            } else {
                None
            }
        })
        .collect_vec()
}

/// Observations about the month containing `today`, compared with the month
/// before it.
pub fn generate(transactions: &[Transaction], budgets: &Budgets, today: NaiveDate) -> Vec<Insight> {
    let (year, month) = (today.year(), today.month());
    let previous = today
        .with_day(1)
        .and_then(|d| d.checked_sub_months(Months::new(1)))
        .unwrap_or(today);

    let this_month = balances::monthly_spending(transactions, year, month);
    let last_month = balances::monthly_spending(transactions, previous.year(), previous.month());

    let mut insights = month_over_month(&this_month, &last_month);
    insights.extend(budget_warnings(budgets, &this_month));

    let current = transactions
        .iter()
        .filter(|tx| tx.is_expense() && tx.date.year() == year && tx.date.month() == month)
        .collect_vec();

    let subscriptions = current
        .iter()
        .filter(|tx| SUBSCRIPTION.is_match(&tx.description))
        .collect_vec();
    if !subscriptions.is_empty() {
        insights.push(Insight::Subscriptions {
            count: subscriptions.len(),
            total: subscriptions.iter().map(|tx| tx.amount.clone()).sum(),
        });
    }

    let totals = balances::monthly_totals(transactions, year, month);
    let net = totals.net();
    if totals.income.is_positive() {
        let rate = &net * BigDecimal::from(100) / &totals.income;
        if rate >= BigDecimal::from(20) {
            insights.push(Insight::HighSavingsRate(rate));
        } else if rate < BigDecimal::from(10) && rate.is_positive() {
            insights.push(Insight::LowSavingsRate(rate));
        } else if net.is_negative() {
            insights.push(Insight::Overspending(-net));
        }
    } else if net.is_negative() {
        insights.push(Insight::Overspending(-net));
    }

    let by_day: HashMap<NaiveDate, BigDecimal> =
        current.iter().fold(HashMap::new(), |mut acc, tx| {
            *acc.entry(tx.date).or_insert_with(BigDecimal::zero) += &tx.amount;
            acc
        });
    if let Some((date, total)) = by_day
        .into_iter()
        .sorted_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)))
        .next()
    {
        if total > BigDecimal::from(100) {
            insights.push(Insight::TopSpendingDay { date, total });
        }
    }

    insights
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::*;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).expect("inline date error")
    }

    fn dec(text: &str) -> BigDecimal {
        BigDecimal::from_str(text).unwrap()
    }

    fn expense(category: &str, description: &str, amount: &str, date: NaiveDate) -> Transaction {
        Transaction::new(description, Kind::Expense, dec(amount), category, description, date)
    }

    #[test]
    fn test_subscription_pattern() {
        assert!(SUBSCRIPTION.is_match("Netflix Premium"));
        assert!(SUBSCRIPTION.is_match("gym membership"));
        assert!(!SUBSCRIPTION.is_match("groceries"));
    }

    #[test]
    fn test_generate() {
        let today = ymd(2024, 3, 20);
        let transactions = vec![
            Transaction::new("pay", Kind::Income, dec("1000"), "Salary", "", ymd(2024, 3, 1)),
            expense("Groceries", "market", "50", ymd(2024, 2, 10)),
            expense("Groceries", "market", "80", ymd(2024, 3, 10)),
            expense("Entertainment", "Netflix", "15.99", ymd(2024, 3, 2)),
            expense("Dining", "dinner", "100", ymd(2024, 2, 12)),
            expense("Dining", "dinner", "20", ymd(2024, 3, 12)),
            expense("Housing", "rent", "500", ymd(2024, 3, 1)),
        ];
        let budgets: Budgets = [("Groceries".to_owned(), dec("85"))].into_iter().collect();

        let insights = generate(&transactions, &budgets, today);

        assert!(insights.contains(&Insight::SpendingIncreased {
            category: "Groceries".into(),
            percent: dec("60"),
            this_month: dec("80"),
            last_month: dec("50"),
        }));
        assert!(insights.contains(&Insight::SpendingDecreased {
            category: "Dining".into(),
            percent: dec("80"),
        }));
        assert!(insights
            .iter()
            .any(|i| matches!(i, Insight::BudgetAlmostReached { category, .. } if category == "Groceries")));
        assert!(insights.contains(&Insight::Subscriptions {
            count: 1,
            total: dec("15.99"),
        }));
        // 1000 in, 615.99 out.
        assert!(insights.contains(&Insight::HighSavingsRate(dec("38.401"))));
        assert!(insights.contains(&Insight::TopSpendingDay {
            date: ymd(2024, 3, 1),
            total: dec("500"),
        }));
    }

    #[test]
    fn test_overspending() {
        let transactions = vec![
            Transaction::new("pay", Kind::Income, dec("100"), "Salary", "", ymd(2024, 3, 1)),
            expense("Housing", "rent", "150", ymd(2024, 3, 1)),
        ];
        let insights = generate(&transactions, &Budgets::new(), ymd(2024, 3, 5));
        assert!(insights.contains(&Insight::Overspending(dec("50"))));
    }
}
