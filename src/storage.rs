use std::{
    collections::BTreeMap,
    fs::File,
    io::{BufReader, BufWriter, Write},
    path::Path,
    str::FromStr,
    time::Instant,
};

use anyhow::{anyhow, Context, Result};
use bigdecimal::ToPrimitive;
use chrono::{DateTime, TimeZone, Utc};
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use tracing::{debug, info, span, warn, Level};

use crate::{ledger::Ledger, model::*};

/// Money as it appears in a state file: a JSON number or a numeric string.
/// Written back as a number when a float carries it exactly, otherwise as
/// decimal text.
#[derive(Debug, Clone, PartialEq)]
struct Amount(BigDecimal);

impl Serialize for Amount {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        if self.0 == self.0.with_scale(0) {
            if let Some(value) = self.0.to_i64() {
                return serializer.serialize_i64(value);
            }
        }
        let exact = self.0.to_f64().filter(|value| {
            BigDecimal::from_str(&value.to_string()).map_or(false, |back| back == self.0)
        });
        match exact {
            Some(value) => serializer.serialize_f64(value),
            None => serializer.serialize_str(&self.0.to_string()),
        }
    }
}

impl<'de> Deserialize<'de> for Amount {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Number(serde_json::Number),
            Text(String),
        }

        let text = match Raw::deserialize(deserializer)? {
            Raw::Number(n) => n.to_string(),
            Raw::Text(t) => t,
        };

        BigDecimal::from_str(text.trim())
            .map(Amount)
            .map_err(|_| de::Error::custom(format!("invalid amount '{}'", text)))
    }
}

/// Ids were historically generated from clock values and may be numbers.
fn string_or_number<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Number(serde_json::Number),
        Text(String),
    }

    Ok(match Raw::deserialize(deserializer)? {
        Raw::Number(n) => n.to_string(),
        Raw::Text(t) => t,
    })
}

fn optional_millis<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<DateTime<Utc>>, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Millis(i64),
        Text(String),
    }

    match Option::<Raw>::deserialize(deserializer)? {
        None => Ok(None),
        Some(Raw::Millis(ms)) => Utc
            .timestamp_millis_opt(ms)
            .single()
            .map(Some)
            .ok_or_else(|| de::Error::custom(format!("timestamp out of range: {}", ms))),
        Some(Raw::Text(text)) => DateTime::parse_from_rfc3339(&text)
            .map(|dt| Some(dt.with_timezone(&Utc)))
            .map_err(|_| de::Error::custom(format!("invalid timestamp '{}'", text))),
    }
}

fn serialize_millis<S: Serializer>(
    value: &Option<DateTime<Utc>>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    match value {
        Some(dt) => serializer.serialize_i64(dt.timestamp_millis()),
        None => serializer.serialize_none(),
    }
}

fn active_by_default() -> bool {
    true
}

/// Files written by older versions carry some fields under two spellings at
/// once, so each spelling gets its own slot and the canonical one wins.
fn either(preferred: Option<String>, other: Option<String>) -> Option<String> {
    preferred.or(other)
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TransactionRecord {
    #[serde(deserialize_with = "string_or_number")]
    id: String,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    kind: Option<String>,
    #[serde(rename(deserialize = "kind"), default, skip_serializing)]
    kind_alias: Option<String>,
    amount: Amount,
    #[serde(default)]
    category: String,
    #[serde(default)]
    description: String,
    date: String,
    #[serde(
        default,
        deserialize_with = "optional_millis",
        serialize_with = "serialize_millis",
        skip_serializing_if = "Option::is_none"
    )]
    timestamp: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    recurring_id: Option<String>,
    #[serde(rename(deserialize = "recurring_id"), default, skip_serializing)]
    recurring_id_snake: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RuleRecord {
    #[serde(deserialize_with = "string_or_number")]
    id: String,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    kind: Option<String>,
    #[serde(rename(deserialize = "kind"), default, skip_serializing)]
    kind_alias: Option<String>,
    amount: Amount,
    #[serde(default)]
    category: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    frequency: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    start_date: Option<String>,
    #[serde(rename(deserialize = "start_date"), default, skip_serializing)]
    start_date_snake: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    end_date: Option<String>,
    #[serde(rename(deserialize = "end_date"), default, skip_serializing)]
    end_date_snake: Option<String>,
    #[serde(default = "active_by_default")]
    active: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    last_processed: Option<String>,
    #[serde(rename(deserialize = "last_processed"), default, skip_serializing)]
    last_processed_snake: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
struct GoalRecord {
    #[serde(deserialize_with = "string_or_number")]
    id: String,
    #[serde(default)]
    name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    target: Option<Amount>,
    #[serde(rename(deserialize = "targetAmount"), default, skip_serializing)]
    target_camel: Option<Amount>,
    #[serde(rename(deserialize = "target_amount"), default, skip_serializing)]
    target_snake: Option<Amount>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    current: Option<Amount>,
    #[serde(rename(deserialize = "currentAmount"), default, skip_serializing)]
    current_camel: Option<Amount>,
    #[serde(rename(deserialize = "current_amount"), default, skip_serializing)]
    current_snake: Option<Amount>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    deadline: Option<String>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct StateRecord {
    balance: Option<Amount>,
    transactions: Vec<TransactionRecord>,
    goals: Vec<GoalRecord>,
    budgets: BTreeMap<String, Amount>,
    #[serde(alias = "recurring_transactions")]
    recurring_transactions: Vec<RuleRecord>,
}

fn parse_kind(text: Option<&str>) -> Result<Kind> {
    let text = text.ok_or_else(|| anyhow!("missing transaction type"))?;
    Kind::parse(text).ok_or_else(|| anyhow!("unknown transaction type '{}'", text))
}

fn parse_date(text: &str) -> Result<NaiveDate> {
    RuleDate::parse(text)
        .date()
        .ok_or_else(|| anyhow!("invalid date '{}'", text))
}

impl TransactionRecord {
    fn into_transaction(self) -> Result<Transaction> {
        let kind = parse_kind(either(self.kind, self.kind_alias).as_deref())?;
        let date = parse_date(&self.date)?;

        Ok(Transaction {
            id: self.id,
            kind,
            amount: self.amount.0,
            category: self.category,
            description: self.description,
            date,
            timestamp: self.timestamp,
            recurring_id: either(self.recurring_id, self.recurring_id_snake),
        })
    }
}

impl From<&Transaction> for TransactionRecord {
    fn from(tx: &Transaction) -> Self {
        Self {
            id: tx.id.clone(),
            kind: Some(tx.kind.as_str().to_owned()),
            kind_alias: None,
            amount: Amount(tx.amount.clone()),
            category: tx.category.clone(),
            description: tx.description.clone(),
            date: tx.date.format("%Y-%m-%d").to_string(),
            timestamp: tx.timestamp,
            recurring_id: tx.recurring_id.clone(),
            recurring_id_snake: None,
        }
    }
}

impl RuleRecord {
    /// Dates and frequencies are kept as written when they don't parse or are
    /// missing; the evaluator skips such rules.
    fn into_rule(self) -> Result<RecurringRule> {
        let kind = parse_kind(either(self.kind, self.kind_alias).as_deref())?;
        let start_date = either(self.start_date, self.start_date_snake).unwrap_or_default();
        let end_date = either(self.end_date, self.end_date_snake);
        let last_processed = either(self.last_processed, self.last_processed_snake);

        Ok(RecurringRule {
            id: self.id,
            kind,
            amount: self.amount.0,
            category: self.category,
            description: self.description,
            frequency: Frequency::from(self.frequency.as_str()),
            start_date: RuleDate::parse(&start_date),
            end_date: end_date.as_deref().map(RuleDate::parse),
            active: self.active,
            last_processed: last_processed.as_deref().map(RuleDate::parse),
        })
    }
}

impl From<&RecurringRule> for RuleRecord {
    fn from(rule: &RecurringRule) -> Self {
        Self {
            id: rule.id.clone(),
            kind: Some(rule.kind.as_str().to_owned()),
            kind_alias: None,
            amount: Amount(rule.amount.clone()),
            category: rule.category.clone(),
            description: rule.description.clone(),
            frequency: rule.frequency.as_str().to_owned(),
            start_date: Some(rule.start_date.to_string()),
            start_date_snake: None,
            end_date: rule.end_date.as_ref().map(|d| d.to_string()),
            end_date_snake: None,
            active: rule.active,
            last_processed: rule.last_processed.as_ref().map(|d| d.to_string()),
            last_processed_snake: None,
        }
    }
}

impl GoalRecord {
    fn into_goal(self) -> Result<Goal> {
        let target = self
            .target
            .or(self.target_camel)
            .or(self.target_snake)
            .ok_or_else(|| anyhow!("goal {}: missing target", self.id))?;
        let current = self
            .current
            .or(self.current_camel)
            .or(self.current_snake)
            .map_or_else(BigDecimal::zero, |c| c.0);

        let deadline = self.deadline.as_deref().and_then(|text| {
            let parsed = RuleDate::parse(text).date();
            if parsed.is_none() {
                warn!("goal {}: ignoring deadline '{}'", self.id, text);
            }
            parsed
        });

        Ok(Goal {
            id: self.id,
            name: self.name,
            target: target.0,
            current,
            deadline,
        })
    }
}

impl From<&Goal> for GoalRecord {
    fn from(goal: &Goal) -> Self {
        Self {
            id: goal.id.clone(),
            name: goal.name.clone(),
            target: Some(Amount(goal.target.clone())),
            target_camel: None,
            target_snake: None,
            current: Some(Amount(goal.current.clone())),
            current_camel: None,
            current_snake: None,
            deadline: goal.deadline.map(|d| d.format("%Y-%m-%d").to_string()),
        }
    }
}

impl StateRecord {
    fn into_ledger(self) -> Result<Ledger> {
        let transactions = self
            .transactions
            .into_iter()
            .map(|r| {
                let id = r.id.clone();
                r.into_transaction()
                    .with_context(|| format!("transaction {}", id))
            })
            .collect::<Result<Vec<_>>>()?;

        let recurring = self
            .recurring_transactions
            .into_iter()
            .map(|r| {
                let id = r.id.clone();
                r.into_rule().with_context(|| format!("recurring rule {}", id))
            })
            .collect::<Result<Vec<_>>>()?;

        let goals = self
            .goals
            .into_iter()
            .map(GoalRecord::into_goal)
            .collect::<Result<Vec<_>>>()?;

        let budgets = self
            .budgets
            .into_iter()
            .map(|(category, limit)| (category, limit.0))
            .collect();

        let ledger = Ledger::new(transactions, goals, budgets, recurring);

        if let Some(stored) = self.balance {
            if &stored.0 != ledger.balance() {
                debug!("stored balance {} differs from {}", stored.0, ledger.balance());
            }
        }

        Ok(ledger)
    }
}

impl From<&Ledger> for StateRecord {
    fn from(ledger: &Ledger) -> Self {
        Self {
            balance: Some(Amount(ledger.balance().clone())),
            transactions: ledger.transactions().iter().map(Into::into).collect(),
            goals: ledger.goals().iter().map(Into::into).collect(),
            budgets: ledger
                .budgets()
                .iter()
                .map(|(category, limit)| (category.clone(), Amount(limit.clone())))
                .collect(),
            recurring_transactions: ledger.recurring().iter().map(Into::into).collect(),
        }
    }
}

pub fn parse(text: &str) -> Result<Ledger> {
    let record: StateRecord = serde_json::from_str(text)?;
    record.into_ledger()
}

pub fn to_string(ledger: &Ledger) -> Result<String> {
    Ok(serde_json::to_string_pretty(&StateRecord::from(ledger))?)
}

/// Reads a state file. A file that doesn't exist yet is an empty ledger.
pub fn load(path: &Path) -> Result<Ledger> {
    let _span = span!(Level::INFO, "loading").entered();
    let started = Instant::now();

    if !path.exists() {
        info!("{} not found, starting empty", path.display());
        return Ok(Ledger::default());
    }

    let file = File::open(path).with_context(|| format!("opening {}", path.display()))?;
    let record: StateRecord = serde_json::from_reader(BufReader::new(file))
        .with_context(|| format!("reading {}", path.display()))?;
    let ledger = record.into_ledger()?;

    let elapsed = Instant::now() - started;
    info!(
        "loaded {} transactions, {} rules in {:?}",
        ledger.transactions().len(),
        ledger.recurring().len(),
        elapsed
    );

    Ok(ledger)
}

pub fn save(path: &Path, ledger: &Ledger) -> Result<()> {
    let file = File::create(path).with_context(|| format!("creating {}", path.display()))?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, &StateRecord::from(ledger))?;
    writer.flush()?;

    debug!("saved {}", path.display());

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).expect("inline date error")
    }

    fn dec(text: &str) -> BigDecimal {
        BigDecimal::from_str(text).unwrap()
    }

    #[test]
    fn test_missing_sections_default() -> Result<()> {
        let ledger = parse("{}")?;
        assert_eq!(ledger, Ledger::default());
        Ok(())
    }

    #[test]
    fn test_missing_file_is_empty() -> Result<()> {
        let ledger = load(Path::new("/nonexistent/tallybook/state.json"))?;
        assert!(ledger.transactions().is_empty());
        Ok(())
    }

    #[test]
    fn test_aliases_normalized() -> Result<()> {
        let ledger = parse(
            r#"{
                "balance": 1,
                "transactions": [
                    { "id": 1700000000000, "type": "income", "amount": "1000.50",
                      "category": "Salary", "date": "2024-01-01T00:00:00.000Z",
                      "timestamp": 1704067200000 },
                    { "id": "b", "kind": "expense", "amount": 20.25, "date": "2024-01-02",
                      "recurring_id": "rent" }
                ],
                "goals": [
                    { "id": "g1", "name": "Car", "targetAmount": 5000, "current_amount": "50" },
                    { "id": "g2", "name": "Trip", "target_amount": 900, "deadline": "soon" }
                ],
                "budgets": { "Groceries": 400 },
                "recurringTransactions": [
                    { "id": "rent", "type": "expense", "amount": 20.25, "frequency": "monthly",
                      "start_date": "2024-01-02", "last_processed": "2024-01-02" }
                ]
            }"#,
        )?;

        assert_eq!(ledger.balance(), &dec("980.25"));

        let first = &ledger.transactions()[0];
        assert_eq!(first.id, "1700000000000");
        assert_eq!(first.date, ymd(2024, 1, 1));
        assert_eq!(first.timestamp.map(|t| t.timestamp_millis()), Some(1704067200000));

        let second = &ledger.transactions()[1];
        assert_eq!(second.kind, Kind::Expense);
        assert!(second.is_occurrence_of("rent"));

        assert_eq!(ledger.goals()[0].target, dec("5000"));
        assert_eq!(ledger.goals()[0].current, dec("50"));
        assert_eq!(ledger.goals()[1].current, BigDecimal::zero());
        assert_eq!(ledger.goals()[1].deadline, None);

        assert_eq!(ledger.budgets()["Groceries"], dec("400"));

        let rule = &ledger.recurring()[0];
        assert!(rule.active);
        assert_eq!(rule.frequency, Frequency::Monthly);
        assert_eq!(rule.last_processed_date(), Some(ymd(2024, 1, 2)));

        Ok(())
    }

    #[test]
    fn test_malformed_rule_preserved() -> Result<()> {
        let text = r#"{
            "recurringTransactions": [
                { "id": "odd", "type": "expense", "amount": 5, "frequency": "fortnightly",
                  "startDate": "someday", "endDate": "2024-13-45", "active": false }
            ]
        }"#;

        let ledger = parse(text)?;
        let rule = &ledger.recurring()[0];
        assert_eq!(rule.start_date, RuleDate::Unparsed("someday".into()));
        assert!(!rule.active);

        let written = to_string(&ledger)?;
        assert!(written.contains(r#""frequency": "fortnightly""#));
        assert!(written.contains(r#""startDate": "someday""#));
        assert!(written.contains(r#""endDate": "2024-13-45""#));

        assert_eq!(parse(&written)?, ledger);

        Ok(())
    }

    #[test]
    fn test_round_trip_camel_case() -> Result<()> {
        let ledger = Ledger::default()
            .with_transaction(
                Transaction::new("t", Kind::Expense, dec("12.34"), "Food", "lunch", ymd(2024, 3, 1))
                    .with_timestamp(Utc.timestamp_millis_opt(1709294400123).unwrap()),
            )?
            .with_recurring_rule(
                RecurringRule::new("r", Kind::Income, dec("2500"), Frequency::Biweekly, ymd(2024, 1, 5))
                    .described("Salary", "paycheck")
                    .processed_on(ymd(2024, 2, 16)),
            )?
            .with_budget("Food", dec("300"))?;

        let written = to_string(&ledger)?;
        assert!(written.contains(r#""recurringTransactions""#));
        assert!(written.contains(r#""lastProcessed": "2024-02-16""#));
        assert!(written.contains(r#""type": "expense""#));
        assert!(written.contains(r#""timestamp": 1709294400123"#));
        assert!(written.contains(r#""balance": -12.34"#));

        assert_eq!(parse(&written)?, ledger);

        Ok(())
    }

    #[test]
    fn test_rejects_bad_transactions() {
        assert!(parse(r#"{ "transactions": [ { "id": "x", "type": "gift", "amount": 1, "date": "2024-01-01" } ] }"#).is_err());
        assert!(parse(r#"{ "transactions": [ { "id": "x", "type": "income", "amount": "lots", "date": "2024-01-01" } ] }"#).is_err());
        assert!(parse(r#"{ "transactions": [ { "id": "x", "type": "income", "amount": 1, "date": "yesterday" } ] }"#).is_err());
    }

    #[test]
    fn test_rule_with_both_spellings() -> Result<()> {
        let ledger = parse(
            r#"{
                "recurringTransactions": [
                    { "id": 1, "type": "expense", "amount": 5, "frequency": "monthly",
                      "startDate": "2024-01-01", "start_date": "2024-01-01",
                      "endDate": "2024-12-31", "end_date": "2024-06-30",
                      "last_processed": "2024-01-15", "lastProcessed": "2024-01-15" }
                ],
                "transactions": [
                    { "id": 1, "type": "expense", "kind": "expense", "amount": 5,
                      "date": "2024-01-15", "recurringId": "1", "recurring_id": "1" }
                ]
            }"#,
        )?;

        let rule = &ledger.recurring()[0];
        assert_eq!(rule.start_date, RuleDate::Parsed(ymd(2024, 1, 1)));
        assert_eq!(rule.end_date, Some(RuleDate::Parsed(ymd(2024, 12, 31))));
        assert_eq!(rule.last_processed_date(), Some(ymd(2024, 1, 15)));
        assert!(ledger.transactions()[0].is_occurrence_of("1"));

        let written = to_string(&ledger)?;
        assert!(!written.contains("last_processed"));
        assert_eq!(parse(&written)?, ledger);

        Ok(())
    }

    #[test]
    fn test_rule_missing_fields_does_not_block_others() -> Result<()> {
        let ledger = parse(
            r#"{
                "recurringTransactions": [
                    { "id": "broken", "type": "expense", "amount": 9 },
                    { "id": "rent", "type": "expense", "amount": 500, "frequency": "monthly",
                      "startDate": "2024-01-01" }
                ]
            }"#,
        )?;

        assert_eq!(ledger.recurring()[0].start_date, RuleDate::Unparsed("".into()));
        assert_eq!(ledger.recurring()[0].frequency, Frequency::Unrecognized("".into()));

        let now = Utc.with_ymd_and_hms(2024, 1, 15, 12, 0, 0).unwrap();
        let (ledger, created) = ledger.apply_recurring(&crate::recurring::Processor::default(), now);
        assert_eq!(created.len(), 1);
        assert!(created[0].is_occurrence_of("rent"));
        assert_eq!(ledger.recurring()[0].last_processed, None);
        assert_eq!(ledger.balance(), &dec("-500"));

        Ok(())
    }

    #[test]
    fn test_goal_with_both_spellings() -> Result<()> {
        let ledger = parse(
            r#"{ "goals": [ { "id": "g", "name": "Car", "target": 500, "target_amount": 500,
                              "current": 20, "current_amount": 20 } ] }"#,
        )?;
        assert_eq!(ledger.goals()[0].target, dec("500"));
        assert_eq!(ledger.goals()[0].current, dec("20"));
        Ok(())
    }

    #[test]
    fn test_precise_amount_kept() -> Result<()> {
        let precise = dec("1234567.123456789012345");
        let ledger = Ledger::default().with_budget("Savings", precise.clone())?;

        let written = to_string(&ledger)?;
        assert!(written.contains(r#""Savings": "1234567.123456789012345""#));
        assert_eq!(parse(&written)?.budgets()["Savings"], precise);

        Ok(())
    }
}
