pub mod balances;
pub mod budgets;
pub mod config;
pub mod duplicates;
pub mod insights;
pub mod ledger;
pub mod model;
pub mod recurring;
pub mod schedule;
pub mod storage;
pub mod validation;
