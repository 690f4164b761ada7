use bigdecimal::Signed;

use crate::{balances, model::*};

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum BudgetLevel {
    Ok,
    Warning,
    Exceeded,
}

#[derive(Debug, PartialEq, Clone)]
pub struct BudgetStatus {
    pub category: String,
    pub limit: BigDecimal,
    pub spent: BigDecimal,
    pub level: BudgetLevel,
}

impl BudgetStatus {
    /// Negative once the budget is overspent.
    pub fn remaining(&self) -> BigDecimal {
        &self.limit - &self.spent
    }

    pub fn percentage(&self) -> BigDecimal {
        percentage_of(&self.spent, &self.limit)
    }
}

fn percentage_of(part: &BigDecimal, whole: &BigDecimal) -> BigDecimal {
    if whole.is_zero() {
        BigDecimal::zero()
    } else {
        (part * BigDecimal::from(100) / whole).round(2)
    }
}

/// Spending per budgeted category for one month. `warning` is the percentage
/// of the limit from which a category is flagged; anything over 100% is
/// exceeded.
pub fn budget_status(
    budgets: &Budgets,
    transactions: &[Transaction],
    year: i32,
    month: u32,
    warning: &BigDecimal,
) -> Vec<BudgetStatus> {
    let spending = balances::monthly_spending(transactions, year, month);

    budgets
        .iter()
        .map(|(category, limit)| {
            let spent = spending.get(category).cloned().unwrap_or_else(BigDecimal::zero);
            let percentage = percentage_of(&spent, limit);
            let level = if percentage > BigDecimal::from(100) {
                BudgetLevel::Exceeded
            } else if percentage >= *warning {
                BudgetLevel::Warning
            } else {
                BudgetLevel::Ok
            };

            BudgetStatus {
                category: category.clone(),
                limit: limit.clone(),
                spent,
                level,
            }
        })
        .collect_vec()
}

pub fn alerts(statuses: Vec<BudgetStatus>) -> Vec<BudgetStatus> {
    statuses
        .into_iter()
        .filter(|s| s.level != BudgetLevel::Ok)
        .collect_vec()
}

#[derive(Debug, PartialEq, Clone)]
pub struct GoalProgress {
    pub percentage: BigDecimal,
    pub remaining: BigDecimal,
    pub completed: bool,
    pub days_until_deadline: Option<i64>,
}

pub fn goal_progress(goal: &Goal, today: NaiveDate) -> GoalProgress {
    let hundred = BigDecimal::from(100);
    let percentage = percentage_of(&goal.current, &goal.target);
    let remaining = &goal.target - &goal.current;

    GoalProgress {
        percentage: if percentage > hundred { hundred } else { percentage },
        remaining: if remaining.is_negative() {
            BigDecimal::zero()
        } else {
            remaining
        },
        completed: goal.current >= goal.target,
        days_until_deadline: goal.deadline.map(|d| (d - today).num_days()),
    }
}
