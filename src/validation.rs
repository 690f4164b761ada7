use std::str::FromStr;

use lazy_static::lazy_static;
use thiserror::Error;

use crate::model::*;

pub const MAXIMUM_DESCRIPTION: usize = 200;

lazy_static! {
    static ref MAXIMUM_AMOUNT: BigDecimal = BigDecimal::from(1_000_000_000);
    static ref EARLIEST_DATE: NaiveDate =
        NaiveDate::from_ymd_opt(2000, 1, 1).expect("inline date error");
}

#[derive(Debug, Error, PartialEq)]
pub enum ValidationError {
    #[error("please enter a valid number")]
    NotANumber(String),
    #[error("amount must be greater than 0")]
    NotPositive,
    #[error("amount is too large")]
    TooLarge,
    #[error("description is required")]
    MissingDescription,
    #[error("description is too long (max 200 characters)")]
    DescriptionTooLong,
    #[error("please select a category")]
    MissingCategory,
    #[error("date cannot be in the future")]
    FutureDate(NaiveDate),
    #[error("date is too far in the past")]
    AncientDate(NaiveDate),
    #[error("current amount cannot be negative")]
    NegativeProgress,
    #[error("target amount must be greater than 0")]
    NonPositiveTarget,
    #[error("end date must be after the start date")]
    EndBeforeStart,
    #[error("unrecognized frequency '{0}'")]
    UnrecognizedFrequency(String),
}

pub fn parse_amount(text: &str) -> Result<BigDecimal, ValidationError> {
    let amount = BigDecimal::from_str(text.trim())
        .map_err(|_| ValidationError::NotANumber(text.to_owned()))?;
    validate_amount(&amount)?;
    Ok(amount)
}

pub fn validate_amount(amount: &BigDecimal) -> Result<(), ValidationError> {
    if *amount <= BigDecimal::zero() {
        Err(ValidationError::NotPositive)
    } else if *amount > *MAXIMUM_AMOUNT {
        Err(ValidationError::TooLarge)
    } else {
        Ok(())
    }
}

pub fn validate_description(description: &str, required: bool) -> Result<(), ValidationError> {
    if required && description.trim().is_empty() {
        Err(ValidationError::MissingDescription)
    } else if description.chars().count() > MAXIMUM_DESCRIPTION {
        Err(ValidationError::DescriptionTooLong)
    } else {
        Ok(())
    }
}

pub fn validate_category(category: &str, required: bool) -> Result<(), ValidationError> {
    if required && category.trim().is_empty() {
        Err(ValidationError::MissingCategory)
    } else {
        Ok(())
    }
}

pub fn validate_date(date: NaiveDate, today: NaiveDate, allow_future: bool) -> Result<(), ValidationError> {
    if !allow_future && date > today {
        Err(ValidationError::FutureDate(date))
    } else if date < *EARLIEST_DATE {
        Err(ValidationError::AncientDate(date))
    } else {
        Ok(())
    }
}

pub fn validate_goal_amounts(current: &BigDecimal, target: &BigDecimal) -> Result<(), ValidationError> {
    if *current < BigDecimal::zero() {
        Err(ValidationError::NegativeProgress)
    } else if *target <= BigDecimal::zero() {
        Err(ValidationError::NonPositiveTarget)
    } else {
        Ok(())
    }
}

pub fn validate_transaction(tx: &Transaction, today: NaiveDate) -> Result<(), ValidationError> {
    validate_amount(&tx.amount)?;
    validate_description(&tx.description, false)?;
    validate_date(tx.date, today, false)
}

/// Rules may start in the future; the end date, if any, must come later.
pub fn validate_rule(rule: &RecurringRule) -> Result<(), ValidationError> {
    validate_amount(&rule.amount)?;
    validate_description(&rule.description, false)?;

    if let Frequency::Unrecognized(raw) = &rule.frequency {
        return Err(ValidationError::UnrecognizedFrequency(raw.clone()));
    }

    match (rule.start_date.date(), rule.end_date.as_ref().map(|d| d.date())) {
        (Some(start), Some(Some(end))) if end <= start => Err(ValidationError::EndBeforeStart),
        _ => Ok(()),
    }
}

pub fn validate_goal(goal: &Goal) -> Result<(), ValidationError> {
    validate_goal_amounts(&goal.current, &goal.target)
}
