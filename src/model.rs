use std::collections::BTreeMap;

use chrono::{DateTime, Utc};

pub use bigdecimal::{BigDecimal, Zero};
pub use chrono::NaiveDate;
pub use itertools::Itertools;

pub const DEFAULT_CATEGORY: &str = "Other";

#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash, PartialOrd, Ord)]
pub enum Kind {
    Income,
    Expense,
}

impl Kind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Kind::Income => "income",
            Kind::Expense => "expense",
        }
    }

    pub fn parse(text: &str) -> Option<Self> {
        match text.trim().to_ascii_lowercase().as_str() {
            "income" => Some(Kind::Income),
            "expense" => Some(Kind::Expense),
            _ => None,
        }
    }
}

impl std::fmt::Display for Kind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.pad(self.as_str())
    }
}

#[derive(Debug, PartialEq, Clone)]
pub struct Transaction {
    pub id: String,
    pub kind: Kind,
    pub amount: BigDecimal,
    pub category: String,
    pub description: String,
    pub date: NaiveDate,
    pub timestamp: Option<DateTime<Utc>>,
    pub recurring_id: Option<String>,
}

impl Transaction {
    pub fn new(
        id: impl Into<String>,
        kind: Kind,
        amount: BigDecimal,
        category: impl Into<String>,
        description: impl Into<String>,
        date: NaiveDate,
    ) -> Self {
        Self {
            id: id.into(),
            kind,
            amount,
            category: category.into(),
            description: description.into(),
            date,
            timestamp: None,
            recurring_id: None,
        }
    }

    pub fn with_timestamp(self, timestamp: DateTime<Utc>) -> Self {
        Self {
            timestamp: Some(timestamp),
            ..self
        }
    }

    /// Contribution of this transaction to the running balance.
    pub fn signed_amount(&self) -> BigDecimal {
        match self.kind {
            Kind::Income => self.amount.clone(),
            Kind::Expense => -self.amount.clone(),
        }
    }

    pub fn category_or_default(&self) -> &str {
        if self.category.trim().is_empty() {
            DEFAULT_CATEGORY
        } else {
            &self.category
        }
    }

    pub fn is_income(&self) -> bool {
        self.kind == Kind::Income
    }

    pub fn is_expense(&self) -> bool {
        self.kind == Kind::Expense
    }

    pub fn is_occurrence_of(&self, rule_id: &str) -> bool {
        self.recurring_id.as_deref() == Some(rule_id)
    }
}

#[derive(Debug, PartialEq, Eq, Clone, Hash)]
pub enum Frequency {
    Daily,
    Weekly,
    Biweekly,
    Monthly,
    Quarterly,
    Yearly,
    /// Whatever was stored, kept so the rule can be written back untouched.
    Unrecognized(String),
}

impl Frequency {
    pub fn as_str(&self) -> &str {
        match self {
            Frequency::Daily => "daily",
            Frequency::Weekly => "weekly",
            Frequency::Biweekly => "biweekly",
            Frequency::Monthly => "monthly",
            Frequency::Quarterly => "quarterly",
            Frequency::Yearly => "yearly",
            Frequency::Unrecognized(raw) => raw,
        }
    }

    pub fn label(&self) -> &str {
        match self {
            Frequency::Daily => "Daily",
            Frequency::Weekly => "Weekly",
            Frequency::Biweekly => "Bi-weekly",
            Frequency::Monthly => "Monthly",
            Frequency::Quarterly => "Quarterly",
            Frequency::Yearly => "Yearly",
            Frequency::Unrecognized(raw) => raw,
        }
    }
}

impl From<&str> for Frequency {
    fn from(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "daily" => Frequency::Daily,
            "weekly" => Frequency::Weekly,
            "biweekly" | "bi-weekly" => Frequency::Biweekly,
            "monthly" => Frequency::Monthly,
            "quarterly" => Frequency::Quarterly,
            "yearly" | "annually" => Frequency::Yearly,
            _ => Frequency::Unrecognized(value.to_owned()),
        }
    }
}

impl std::fmt::Display for Frequency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.pad(self.as_str())
    }
}

/// A calendar date attached to a recurring rule. Text that does not parse is
/// retained verbatim rather than rejected at load time.
#[derive(Debug, PartialEq, Eq, Clone)]
pub enum RuleDate {
    Parsed(NaiveDate),
    Unparsed(String),
}

impl RuleDate {
    pub fn parse(text: &str) -> Self {
        let trimmed = text.trim();
        // Timestamps like `2024-01-15T00:00:00.000Z` count as their date part.
        let date_part = trimmed.split('T').next().unwrap_or(trimmed);
        match NaiveDate::parse_from_str(date_part, "%Y-%m-%d") {
            Ok(date) => RuleDate::Parsed(date),
            Err(_) => RuleDate::Unparsed(text.to_owned()),
        }
    }

    pub fn date(&self) -> Option<NaiveDate> {
        match self {
            RuleDate::Parsed(date) => Some(*date),
            RuleDate::Unparsed(_) => None,
        }
    }
}

impl From<NaiveDate> for RuleDate {
    fn from(value: NaiveDate) -> Self {
        RuleDate::Parsed(value)
    }
}

impl std::fmt::Display for RuleDate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RuleDate::Parsed(date) => f.pad(&date.format("%Y-%m-%d").to_string()),
            RuleDate::Unparsed(raw) => f.pad(raw),
        }
    }
}

#[derive(Debug, PartialEq, Clone)]
pub struct RecurringRule {
    pub id: String,
    pub kind: Kind,
    pub amount: BigDecimal,
    pub category: String,
    pub description: String,
    pub frequency: Frequency,
    pub start_date: RuleDate,
    pub end_date: Option<RuleDate>,
    pub active: bool,
    pub last_processed: Option<RuleDate>,
}

impl RecurringRule {
    pub fn new(
        id: impl Into<String>,
        kind: Kind,
        amount: BigDecimal,
        frequency: Frequency,
        start_date: NaiveDate,
    ) -> Self {
        Self {
            id: id.into(),
            kind,
            amount,
            category: DEFAULT_CATEGORY.to_owned(),
            description: String::new(),
            frequency,
            start_date: start_date.into(),
            end_date: None,
            active: true,
            last_processed: None,
        }
    }

    pub fn described(self, category: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            category: category.into(),
            description: description.into(),
            ..self
        }
    }

    pub fn ending(self, end_date: NaiveDate) -> Self {
        Self {
            end_date: Some(end_date.into()),
            ..self
        }
    }

    pub fn processed_on(self, date: NaiveDate) -> Self {
        Self {
            last_processed: Some(date.into()),
            ..self
        }
    }

    pub fn paused(self) -> Self {
        Self {
            active: false,
            ..self
        }
    }

    pub fn last_processed_date(&self) -> Option<NaiveDate> {
        self.last_processed.as_ref().and_then(|d| d.date())
    }
}

#[derive(Debug, PartialEq, Clone)]
pub struct Goal {
    pub id: String,
    pub name: String,
    pub target: BigDecimal,
    pub current: BigDecimal,
    pub deadline: Option<NaiveDate>,
}

/// Monthly spending limit keyed by category name.
pub type Budgets = BTreeMap<String, BigDecimal>;
