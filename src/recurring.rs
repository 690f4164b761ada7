use std::{collections::HashSet, sync::atomic::AtomicU64, time::Instant};

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use tracing::{debug, info, span, Level};

use crate::{model::*, schedule};


#[derive(Debug, Default, PartialEq)]
pub struct Processed {
    pub new_transactions: Vec<Transaction>,
    /// Same length and order as the rules handed in.
    pub updated_rules: Vec<RecurringRule>,
}

fn id_factory(prefix: &str) -> impl FnMut() -> String + '_ {
    use std::sync::atomic::Ordering::SeqCst;
    let counter = AtomicU64::new(1);
    move || format!("{}-{}", prefix, counter.fetch_add(1, SeqCst))
}

/// Materializes due occurrences of recurring rules. Holds no state besides the
/// time zone that decides which calendar day "now" falls on.
#[derive(Debug, Clone)]
pub struct Processor {
    timezone: Tz,
}

impl Default for Processor {
    fn default() -> Self {
        Self { timezone: Tz::UTC }
    }
}

impl Processor {
    pub fn new(timezone: Tz) -> Self {
        Self { timezone }
    }

    pub fn timezone(&self) -> Tz {
        self.timezone
    }

    pub fn today(&self, now: DateTime<Utc>) -> NaiveDate {
        now.with_timezone(&self.timezone).date_naive()
    }

    pub fn process(
        &self,
        rules: &[RecurringRule],
        existing: &[Transaction],
        now: DateTime<Utc>,
    ) -> Processed {
        let _span = span!(Level::INFO, "recurring").entered();
        let started = Instant::now();

        let today = self.today(now);
        let prefix = format!("RECURRING-{}", now.timestamp_millis());
        let mut new_id = id_factory(&prefix);

        // Rules that already have an occurrence dated today.
        let mut fired: HashSet<&str> = existing
            .iter()
            .filter(|tx| tx.date == today)
            .filter_map(|tx| tx.recurring_id.as_deref())
            .collect();

        let mut new_transactions = Vec::new();
        let mut updated_rules = Vec::with_capacity(rules.len());

        for rule in rules {
            if !rule.active || rule.last_processed_date() == Some(today) {
                updated_rules.push(rule.clone());
                continue;
            }

            if !schedule::is_due(rule, today) {
                updated_rules.push(rule.clone());
                continue;
            }

            if fired.contains(rule.id.as_str()) {
                debug!("{} already has an occurrence on {}", rule.id, today);
            } else {
                debug!("{} materializing {} {}", rule.id, rule.kind, rule.amount);
                new_transactions.push(materialize(rule, new_id(), today, now));
                fired.insert(&rule.id);
            }

            updated_rules.push(rule.clone().processed_on(today));
        }

        let elapsed = Instant::now() - started;
        info!(
            "{} rules, {} new transactions for {} in {:?}",
            rules.len(),
            new_transactions.len(),
            today,
            elapsed
        );

        Processed {
            new_transactions,
            updated_rules,
        }
    }
}

fn materialize(
    rule: &RecurringRule,
    id: String,
    today: NaiveDate,
    now: DateTime<Utc>,
) -> Transaction {
    Transaction {
        id,
        kind: rule.kind,
        amount: rule.amount.clone(),
        category: rule.category.clone(),
        description: rule.description.clone(),
        date: today,
        timestamp: Some(now),
        recurring_id: Some(rule.id.clone()),
    }
}
