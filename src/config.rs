use std::{fs::File, path::Path, str::FromStr};

use anyhow::{anyhow, Context, Result};
use chrono_tz::Tz;
use serde::Deserialize;

use crate::model::*;

#[derive(Debug, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Configuration {
    /// IANA zone name deciding which calendar day "now" is.
    pub timezone: String,
    /// Percentage of a budget from which it's reported as a warning.
    pub budget_warning: u32,
    /// Days ahead listed by `upcoming`.
    pub upcoming_days: u64,
}

impl Default for Configuration {
    fn default() -> Self {
        Self {
            timezone: "UTC".to_owned(),
            budget_warning: 75,
            upcoming_days: 30,
        }
    }
}

impl Configuration {
    pub fn load(path: &Path) -> Result<Configuration> {
        let file = File::open(path).with_context(|| format!("opening {}", path.display()))?;
        let config: Configuration = serde_json::from_reader(file)
            .with_context(|| format!("reading {}", path.display()))?;
        config.tz()?;
        Ok(config)
    }

    pub fn load_or_default(path: Option<&Path>) -> Result<Configuration> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }

    pub fn tz(&self) -> Result<Tz> {
        Tz::from_str(&self.timezone).map_err(|e| anyhow!("timezone '{}': {}", self.timezone, e))
    }

    pub fn budget_warning(&self) -> BigDecimal {
        BigDecimal::from(self.budget_warning)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() -> Result<()> {
        let config: Configuration = serde_json::from_str("{}")?;
        assert_eq!(config.tz()?, Tz::UTC);
        assert_eq!(config.budget_warning(), BigDecimal::from(75));
        assert_eq!(config.upcoming_days, 30);
        Ok(())
    }

    #[test]
    fn test_timezone() -> Result<()> {
        let config: Configuration =
            serde_json::from_str(r#"{ "timezone": "America/Los_Angeles", "budgetWarning": 80 }"#)?;
        assert_eq!(config.tz()?, chrono_tz::America::Los_Angeles);
        assert_eq!(config.budget_warning, 80);

        let bad: Configuration = serde_json::from_str(r#"{ "timezone": "Mars/Olympus" }"#)?;
        assert!(bad.tz().is_err());
        Ok(())
    }

    #[test]
    fn test_load_names_missing_file() {
        let err = Configuration::load(Path::new("/nonexistent/tallybook.json")).unwrap_err();
        assert!(format!("{:#}", err).contains("/nonexistent/tallybook.json"));
    }
}
