use chrono::{Days, Months};
use thiserror::Error;
use tracing::warn;

use crate::model::*;

#[derive(Debug, Error, PartialEq)]
pub enum ScheduleError {
    #[error("rule {0}: malformed {1} '{2}'")]
    MalformedDate(String, &'static str, String),
    #[error("rule {0}: unrecognized frequency '{1}'")]
    UnrecognizedFrequency(String, String),
    #[error("rule {0}: date out of range advancing {1}")]
    OutOfRange(String, NaiveDate),
}

impl Frequency {
    /// Moves `date` forward by one period. Month based periods clamp to the
    /// last day of the target month, so Jan 31 + 1 month is Feb 28/29.
    /// `None` for an unrecognized frequency or a date past chrono's range.
    pub fn advance(&self, date: NaiveDate) -> Option<NaiveDate> {
        match self {
            Frequency::Daily => date.checked_add_days(Days::new(1)),
            Frequency::Weekly => date.checked_add_days(Days::new(7)),
            Frequency::Biweekly => date.checked_add_days(Days::new(14)),
            Frequency::Monthly => date.checked_add_months(Months::new(1)),
            Frequency::Quarterly => date.checked_add_months(Months::new(3)),
            Frequency::Yearly => date.checked_add_months(Months::new(12)),
            Frequency::Unrecognized(_) => None,
        }
    }
}

fn parsed(rule: &RecurringRule, field: &'static str, value: &RuleDate) -> Result<NaiveDate, ScheduleError> {
    match value {
        RuleDate::Parsed(date) => Ok(*date),
        RuleDate::Unparsed(raw) => Err(ScheduleError::MalformedDate(
            rule.id.clone(),
            field,
            raw.clone(),
        )),
    }
}

/// Every date on the rule, checked. Any malformed field makes the whole rule
/// unschedulable.
struct Checked {
    start: NaiveDate,
    end: Option<NaiveDate>,
    last_processed: Option<NaiveDate>,
}

fn check(rule: &RecurringRule) -> Result<Checked, ScheduleError> {
    if let Frequency::Unrecognized(raw) = &rule.frequency {
        return Err(ScheduleError::UnrecognizedFrequency(
            rule.id.clone(),
            raw.clone(),
        ));
    }

    Ok(Checked {
        start: parsed(rule, "start date", &rule.start_date)?,
        end: rule
            .end_date
            .as_ref()
            .map(|d| parsed(rule, "end date", d))
            .transpose()?,
        last_processed: rule
            .last_processed
            .as_ref()
            .map(|d| parsed(rule, "last processed date", d))
            .transpose()?,
    })
}

fn advance(rule: &RecurringRule, date: NaiveDate) -> Result<NaiveDate, ScheduleError> {
    rule.frequency
        .advance(date)
        .ok_or_else(|| ScheduleError::OutOfRange(rule.id.clone(), date))
}

/// The first date the rule would fire on, ignoring `active`. `None` once the
/// next date is past the end date.
pub fn next_due_date(rule: &RecurringRule) -> Result<Option<NaiveDate>, ScheduleError> {
    let checked = check(rule)?;

    let next = match checked.last_processed {
        Some(last) => advance(rule, last)?,
        None => checked.start,
    };

    Ok(match checked.end {
        Some(end) if next > end => None,
        _ => Some(next),
    })
}

/// Strict form of [`is_due`], surfacing malformed rule data.
pub fn try_is_due(rule: &RecurringRule, as_of: NaiveDate) -> Result<bool, ScheduleError> {
    if !rule.active {
        return Ok(false);
    }

    let checked = check(rule)?;

    if let Some(end) = checked.end {
        if as_of > end {
            return Ok(false);
        }
    }

    match checked.last_processed {
        None => Ok(as_of >= checked.start),
        Some(last) => Ok(last < as_of && as_of >= advance(rule, last)?),
    }
}

pub fn is_due(rule: &RecurringRule, as_of: NaiveDate) -> bool {
    match try_is_due(rule, as_of) {
        Ok(due) => due,
        Err(e) => {
            warn!("{}, treating as not due", e);
            false
        }
    }
}

#[derive(Debug, PartialEq, Clone)]
pub struct Upcoming<'r> {
    pub rule: &'r RecurringRule,
    pub date: NaiveDate,
    /// Negative when the occurrence is overdue.
    pub days_until: i64,
}

impl<'r> Upcoming<'r> {
    pub fn is_overdue(&self) -> bool {
        self.days_until < 0
    }

    pub fn is_due_soon(&self) -> bool {
        (0..=3).contains(&self.days_until)
    }
}

/// Active rules whose next occurrence falls on or before `as_of + horizon_days`,
/// soonest first. Overdue occurrences are included.
pub fn upcoming(rules: &[RecurringRule], as_of: NaiveDate, horizon_days: u64) -> Vec<Upcoming<'_>> {
    let horizon = as_of
        .checked_add_days(Days::new(horizon_days))
        .unwrap_or(NaiveDate::MAX);

    rules
        .iter()
        .filter(|rule| rule.active)
        .filter_map(|rule| match next_due_date(rule) {
            Ok(next) => next.map(|date| (rule, date)),
            Err(e) => {
                warn!("{}", e);
                None
            }
        })
        .filter(|(_, date)| *date <= horizon)
        .map(|(rule, date)| Upcoming {
            rule,
            date,
            days_until: (date - as_of).num_days(),
        })
        .sorted_by_key(|u| (u.date, u.rule.id.clone()))
        .collect_vec()
}
