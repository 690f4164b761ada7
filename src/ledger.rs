use chrono::{DateTime, Utc};
use thiserror::Error;
use tracing::{debug, info};

use crate::{
    balances, duplicates,
    model::*,
    recurring::{Processed, Processor},
    validation::{self, ValidationError},
};

#[derive(Debug, Error, PartialEq)]
pub enum LedgerError {
    #[error("no {0} with id '{1}'")]
    NotFound(&'static str, String),
    #[error("{0} with id '{1}' already exists")]
    Conflict(&'static str, String),
    #[error(transparent)]
    Invalid(#[from] ValidationError),
}

/// All persisted state. Every change produces a new `Ledger`; the balance is
/// always recomputed from the transactions rather than adjusted in place.
#[derive(Debug, PartialEq, Clone, Default)]
pub struct Ledger {
    balance: BigDecimal,
    transactions: Vec<Transaction>,
    goals: Vec<Goal>,
    budgets: Budgets,
    recurring: Vec<RecurringRule>,
}

impl Ledger {
    pub fn new(
        transactions: Vec<Transaction>,
        goals: Vec<Goal>,
        budgets: Budgets,
        recurring: Vec<RecurringRule>,
    ) -> Self {
        Self {
            balance: BigDecimal::zero(),
            transactions,
            goals,
            budgets,
            recurring,
        }
        .reconciled()
    }

    pub fn balance(&self) -> &BigDecimal {
        &self.balance
    }

    /// Newest first.
    pub fn transactions(&self) -> &[Transaction] {
        &self.transactions
    }

    pub fn goals(&self) -> &[Goal] {
        &self.goals
    }

    pub fn budgets(&self) -> &Budgets {
        &self.budgets
    }

    pub fn recurring(&self) -> &[RecurringRule] {
        &self.recurring
    }

    pub fn find_transaction(&self, id: &str) -> Option<&Transaction> {
        self.transactions.iter().find(|tx| tx.id == id)
    }

    pub fn find_recurring(&self, id: &str) -> Option<&RecurringRule> {
        self.recurring.iter().find(|r| r.id == id)
    }

    pub fn reconciled(self) -> Self {
        Self {
            balance: balances::running_balance(&self.transactions),
            ..self
        }
    }

    pub fn with_transaction(self, tx: Transaction) -> Result<Self, LedgerError> {
        validation::validate_amount(&tx.amount)?;
        validation::validate_description(&tx.description, false)?;
        if self.find_transaction(&tx.id).is_some() {
            return Err(LedgerError::Conflict("transaction", tx.id));
        }

        Ok(self.with_transactions(vec![tx]))
    }

    fn with_transactions(self, mut added: Vec<Transaction>) -> Self {
        added.reverse();
        let transactions = added.into_iter().chain(self.transactions).collect_vec();

        Self {
            transactions,
            ..self
        }
        .reconciled()
    }

    pub fn update_transaction(self, tx: Transaction) -> Result<Self, LedgerError> {
        validation::validate_amount(&tx.amount)?;
        validation::validate_description(&tx.description, false)?;

        let position = self
            .transactions
            .iter()
            .position(|existing| existing.id == tx.id)
            .ok_or_else(|| LedgerError::NotFound("transaction", tx.id.clone()))?;

        let mut transactions = self.transactions;
        transactions[position] = tx;

        Ok(Self {
            transactions,
            ..self
        }
        .reconciled())
    }

    pub fn remove_transaction(self, id: &str) -> Result<Self, LedgerError> {
        if self.find_transaction(id).is_none() {
            return Err(LedgerError::NotFound("transaction", id.to_owned()));
        }

        let transactions = self
            .transactions
            .into_iter()
            .filter(|tx| tx.id != id)
            .collect_vec();

        Ok(Self {
            transactions,
            ..self
        }
        .reconciled())
    }

    pub fn with_recurring_rule(self, rule: RecurringRule) -> Result<Self, LedgerError> {
        validation::validate_rule(&rule)?;
        if self.find_recurring(&rule.id).is_some() {
            return Err(LedgerError::Conflict("recurring rule", rule.id));
        }

        let mut recurring = self.recurring;
        recurring.push(rule);

        Ok(Self { recurring, ..self })
    }

    /// Occurrences already materialized from the rule stay in the history.
    pub fn remove_recurring_rule(self, id: &str) -> Result<Self, LedgerError> {
        if self.find_recurring(id).is_none() {
            return Err(LedgerError::NotFound("recurring rule", id.to_owned()));
        }

        let recurring = self
            .recurring
            .into_iter()
            .filter(|r| r.id != id)
            .collect_vec();

        Ok(Self { recurring, ..self })
    }

    /// Pauses an active rule or resumes a paused one.
    pub fn toggle_recurring_rule(self, id: &str) -> Result<Self, LedgerError> {
        if self.find_recurring(id).is_none() {
            return Err(LedgerError::NotFound("recurring rule", id.to_owned()));
        }

        let recurring = self
            .recurring
            .into_iter()
            .map(|r| {
                if r.id == id {
                    RecurringRule {
                        active: !r.active,
                        ..r
                    }
                } else {
                    r
                }
            })
            .collect_vec();

        Ok(Self { recurring, ..self })
    }

    pub fn with_budget(self, category: &str, limit: BigDecimal) -> Result<Self, LedgerError> {
        validation::validate_amount(&limit)?;

        let mut budgets = self.budgets;
        budgets.insert(category.to_owned(), limit);

        Ok(Self { budgets, ..self })
    }

    pub fn remove_budget(self, category: &str) -> Result<Self, LedgerError> {
        let mut budgets = self.budgets;
        budgets
            .remove(category)
            .ok_or_else(|| LedgerError::NotFound("budget", category.to_owned()))?;

        Ok(Self { budgets, ..self })
    }

    pub fn with_goal(self, goal: Goal) -> Result<Self, LedgerError> {
        validation::validate_goal(&goal)?;
        if self.goals.iter().any(|g| g.id == goal.id) {
            return Err(LedgerError::Conflict("goal", goal.id));
        }

        let mut goals = self.goals;
        goals.push(goal);

        Ok(Self { goals, ..self })
    }

    pub fn update_goal(self, goal: Goal) -> Result<Self, LedgerError> {
        validation::validate_goal(&goal)?;

        let position = self
            .goals
            .iter()
            .position(|g| g.id == goal.id)
            .ok_or_else(|| LedgerError::NotFound("goal", goal.id.clone()))?;

        let mut goals = self.goals;
        goals[position] = goal;

        Ok(Self { goals, ..self })
    }

    /// Adds to a goal's saved amount. Goals are not linked to transactions, so
    /// the balance is left alone.
    pub fn contribute_to_goal(self, id: &str, amount: BigDecimal) -> Result<Self, LedgerError> {
        validation::validate_amount(&amount)?;

        let goal = self
            .goals
            .iter()
            .find(|g| g.id == id)
            .ok_or_else(|| LedgerError::NotFound("goal", id.to_owned()))?;

        let updated = Goal {
            current: &goal.current + amount,
            ..goal.clone()
        };

        self.update_goal(updated)
    }

    pub fn remove_goal(self, id: &str) -> Result<Self, LedgerError> {
        if !self.goals.iter().any(|g| g.id == id) {
            return Err(LedgerError::NotFound("goal", id.to_owned()));
        }

        let goals = self.goals.into_iter().filter(|g| g.id != id).collect_vec();

        Ok(Self { goals, ..self })
    }

    /// Runs the processor and folds its output back in. Returns the
    /// transactions that were created.
    pub fn apply_recurring(self, processor: &Processor, now: DateTime<Utc>) -> (Self, Vec<Transaction>) {
        let Processed {
            new_transactions,
            updated_rules,
        } = processor.process(&self.recurring, &self.transactions, now);

        if !new_transactions.is_empty() {
            info!("{} recurring transaction(s) processed", new_transactions.len());
        }

        let ledger = Self {
            recurring: updated_rules,
            ..self
        }
        .with_transactions(new_transactions.clone());

        (ledger, new_transactions)
    }

    /// Drops later copies of duplicated transactions, keeping the oldest. The
    /// surviving transactions stay in their existing order.
    pub fn without_duplicates(self) -> (Self, usize) {
        let kept = duplicates::surviving_positions(&self.transactions)
            .into_iter()
            .collect::<std::collections::HashSet<_>>();

        let before = self.transactions.len();
        let transactions = self
            .transactions
            .into_iter()
            .enumerate()
            .filter(|(i, _)| kept.contains(i))
            .map(|(_, tx)| tx)
            .collect_vec();
        let removed = before - transactions.len();

        debug!("removed {} duplicates", removed);

        (
            Self {
                transactions,
                ..self
            }
            .reconciled(),
            removed,
        )
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use chrono::{TimeZone, Timelike};

    use super::*;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).expect("inline date error")
    }

    fn dec(text: &str) -> BigDecimal {
        BigDecimal::from_str(text).unwrap()
    }

    fn sample() -> Ledger {
        Ledger::new(
            vec![
                Transaction::new("3", Kind::Expense, dec("100"), "Housing", "", ymd(2024, 1, 10)),
                Transaction::new("2", Kind::Expense, dec("200"), "Groceries", "", ymd(2024, 1, 5)),
                Transaction::new("1", Kind::Income, dec("1000"), "Salary", "", ymd(2024, 1, 1)),
            ],
            vec![],
            Budgets::new(),
            vec![],
        )
    }

    fn assert_reconciled(ledger: &Ledger) {
        assert_eq!(
            ledger.balance(),
            &balances::running_balance(ledger.transactions())
        );
    }

    #[test]
    fn test_new_reconciles() {
        let ledger = sample();
        assert_eq!(ledger.balance(), &dec("700"));
    }

    #[test]
    fn test_transaction_lifecycle() -> anyhow::Result<()> {
        let ledger = sample().with_transaction(Transaction::new(
            "4",
            Kind::Income,
            dec("50"),
            "Freelance",
            "",
            ymd(2024, 1, 12),
        ))?;
        assert_eq!(ledger.transactions()[0].id, "4");
        assert_eq!(ledger.balance(), &dec("750"));
        assert_reconciled(&ledger);

        let mut edited = ledger.find_transaction("2").unwrap().clone();
        edited.amount = dec("250");
        let ledger = ledger.update_transaction(edited)?;
        assert_eq!(ledger.balance(), &dec("700"));

        let ledger = ledger.remove_transaction("1")?;
        assert_eq!(ledger.balance(), &dec("-300"));
        assert_reconciled(&ledger);

        assert_eq!(
            ledger.remove_transaction("1"),
            Err(LedgerError::NotFound("transaction", "1".into()))
        );

        Ok(())
    }

    #[test]
    fn test_rejects_invalid_and_conflicting() {
        let zero = Transaction::new("9", Kind::Income, BigDecimal::zero(), "", "", ymd(2024, 1, 1));
        assert_eq!(
            sample().with_transaction(zero),
            Err(LedgerError::Invalid(ValidationError::NotPositive))
        );

        let again = Transaction::new("1", Kind::Income, dec("1"), "", "", ymd(2024, 1, 1));
        assert_eq!(
            sample().with_transaction(again),
            Err(LedgerError::Conflict("transaction", "1".into()))
        );
    }

    #[test]
    fn test_apply_recurring() -> anyhow::Result<()> {
        let rule = RecurringRule::new("rent", Kind::Expense, dec("500"), Frequency::Monthly, ymd(2024, 1, 1));
        let ledger = sample().with_recurring_rule(rule)?;
        let now = Utc.with_ymd_and_hms(2024, 1, 15, 9, 0, 0).unwrap();

        let (ledger, created) = ledger.apply_recurring(&Processor::default(), now);
        assert_eq!(created.len(), 1);
        assert_eq!(ledger.transactions()[0], created[0]);
        assert_eq!(ledger.balance(), &dec("200"));
        assert_eq!(
            ledger.find_recurring("rent").unwrap().last_processed_date(),
            Some(ymd(2024, 1, 15))
        );

        let (again, created) = ledger.clone().apply_recurring(&Processor::default(), now);
        assert!(created.is_empty());
        assert_eq!(again, ledger);

        Ok(())
    }

    #[test]
    fn test_toggle_and_remove_rule() -> anyhow::Result<()> {
        let rule = RecurringRule::new("gym", Kind::Expense, dec("30"), Frequency::Monthly, ymd(2024, 1, 1));
        let ledger = sample().with_recurring_rule(rule)?.toggle_recurring_rule("gym")?;
        assert!(!ledger.find_recurring("gym").unwrap().active);

        let ledger = ledger.toggle_recurring_rule("gym")?;
        assert!(ledger.find_recurring("gym").unwrap().active);

        let ledger = ledger.remove_recurring_rule("gym")?;
        assert!(ledger.recurring().is_empty());
        assert_eq!(
            ledger.toggle_recurring_rule("gym"),
            Err(LedgerError::NotFound("recurring rule", "gym".into()))
        );

        Ok(())
    }

    #[test]
    fn test_budgets() -> anyhow::Result<()> {
        let ledger = sample()
            .with_budget("Groceries", dec("300"))?
            .with_budget("Groceries", dec("350"))?;
        assert_eq!(ledger.budgets().len(), 1);
        assert_eq!(ledger.budgets()["Groceries"], dec("350"));

        let ledger = ledger.remove_budget("Groceries")?;
        assert!(ledger.budgets().is_empty());
        assert!(ledger.with_budget("Travel", BigDecimal::zero()).is_err());

        Ok(())
    }

    #[test]
    fn test_goals() -> anyhow::Result<()> {
        let goal = Goal {
            id: "car".into(),
            name: "New car".into(),
            target: dec("5000"),
            current: BigDecimal::zero(),
            deadline: None,
        };

        let ledger = sample().with_goal(goal)?.contribute_to_goal("car", dec("125.50"))?;
        assert_eq!(ledger.goals()[0].current, dec("125.50"));
        assert_eq!(ledger.balance(), &dec("700"));

        let ledger = ledger.remove_goal("car")?;
        assert!(ledger.goals().is_empty());

        Ok(())
    }

    #[test]
    fn test_without_duplicates() {
        let early = Utc.with_ymd_and_hms(2024, 1, 5, 8, 0, 0).unwrap();
        let late = Utc.with_ymd_and_hms(2024, 1, 5, 9, 0, 0).unwrap();
        let copy = Transaction::new("2b", Kind::Expense, dec("200"), "Groceries", "", ymd(2024, 1, 5));

        let mut ledger = sample();
        ledger.transactions[1].timestamp = Some(early);
        let ledger = ledger.with_transaction(copy.with_timestamp(late)).unwrap();
        assert_eq!(ledger.balance(), &dec("500"));

        let (ledger, removed) = ledger.without_duplicates();
        assert_eq!(removed, 1);
        assert_eq!(ledger.balance(), &dec("700"));
        assert!(ledger.find_transaction("2b").is_none());
        assert_eq!(
            ledger.transactions().iter().map(|tx| tx.id.as_str()).collect_vec(),
            vec!["3", "2", "1"]
        );
    }

    #[test]
    fn test_without_duplicates_sharing_an_id() {
        let copy = |hour| {
            Transaction {
                recurring_id: Some("rule-1".into()),
                ..Transaction::new("rule-1", Kind::Expense, dec("15.99"), "Entertainment", "Netflix", ymd(2024, 1, 15))
            }
            .with_timestamp(Utc.with_ymd_and_hms(2024, 1, 15, hour, 0, 0).unwrap())
        };
        let ledger = Ledger::new(vec![copy(10), copy(9)], vec![], Budgets::new(), vec![]);
        assert_eq!(duplicates::count_duplicates(ledger.transactions()), 1);

        let (ledger, removed) = ledger.without_duplicates();
        assert_eq!(removed, 1);
        assert_eq!(ledger.transactions().len(), 1);
        assert_eq!(ledger.transactions()[0].timestamp.map(|t| t.hour()), Some(9));
        assert_eq!(ledger.balance(), &dec("-15.99"));
    }
}
