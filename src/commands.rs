use std::path::PathBuf;

use anyhow::{anyhow, Result};
use chrono::{DateTime, Datelike, Utc};
use tracing::{info, span, Level};

use tallybook::{config::Configuration, ledger::Ledger, model::*, recurring::Processor, storage};

pub mod balances;
pub mod budgets;
pub mod categories;
pub mod duplicates;
pub mod goals;
pub mod insights;
pub mod process;
pub mod register;
pub mod timeline;
pub mod upcoming;

pub struct Session {
    pub path: PathBuf,
    pub config: Configuration,
    pub now: DateTime<Utc>,
}

impl Session {
    pub fn processor(&self) -> Result<Processor> {
        Ok(Processor::new(self.config.tz()?))
    }

    pub fn today(&self) -> Result<NaiveDate> {
        Ok(self.processor()?.today(self.now))
    }

    pub fn load(&self) -> Result<Ledger> {
        storage::load(&self.path)
    }

    /// The ledger as it would look after processing recurring rules, without
    /// writing anything back.
    pub fn load_processed(&self) -> Result<Ledger> {
        let _span = span!(Level::INFO, "processing").entered();
        let (ledger, created) = self.load()?.apply_recurring(&self.processor()?, self.now);
        if !created.is_empty() {
            info!("{} pending recurring transaction(s), run `process` to save", created.len());
        }
        Ok(ledger)
    }

    pub fn save(&self, ledger: &Ledger) -> Result<()> {
        storage::save(&self.path, ledger)
    }
}

/// `YYYY-MM`, or the current month when absent.
pub fn parse_month(text: Option<&str>, today: NaiveDate) -> Result<(i32, u32)> {
    match text {
        None => Ok((today.year(), today.month())),
        Some(text) => NaiveDate::parse_from_str(&format!("{}-01", text.trim()), "%Y-%m-%d")
            .map(|d| (d.year(), d.month()))
            .map_err(|_| anyhow!("expected YYYY-MM, got '{}'", text)),
    }
}

pub fn parse_day(text: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(text.trim(), "%Y-%m-%d").map_err(|_| anyhow!("expected YYYY-MM-DD, got '{}'", text))
}

pub fn money(value: &BigDecimal) -> String {
    format!("{}", value.round(2).with_scale(2))
}
