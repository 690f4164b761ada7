use std::collections::{HashMap, HashSet};

use tracing::debug;

use crate::model::*;

const KEY_DELIMITER: &str = "|";

/// Identity of a transaction for duplicate purposes: description, category,
/// amount to the cent, date and kind. Text fields compare case-insensitively.
pub fn duplicate_key(tx: &Transaction) -> String {
    [
        tx.description.trim().to_lowercase(),
        tx.category.trim().to_lowercase(),
        format!("{}", tx.amount.round(2).with_scale(2)),
        tx.date.format("%Y-%m-%d").to_string(),
        tx.kind.as_str().to_owned(),
    ]
    .join(KEY_DELIMITER)
}

/// Number of transactions whose key already appeared earlier in the slice.
pub fn count_duplicates(transactions: &[Transaction]) -> usize {
    let mut seen = HashSet::new();
    transactions
        .iter()
        .filter(|tx| !seen.insert(duplicate_key(tx)))
        .count()
}

/// Keeps the oldest transaction (by timestamp) of each duplicate set. The
/// result is ordered oldest first, not in input order. Transactions without
/// a timestamp count as oldest.
pub fn remove_duplicates(transactions: &[Transaction]) -> Vec<Transaction> {
    surviving_positions(transactions)
        .into_iter()
        .map(|i| transactions[i].clone())
        .collect_vec()
}

/// Positions in `transactions` of what [`remove_duplicates`] keeps, oldest
/// first. Ids play no part, so copies sharing an id are still told apart.
pub fn surviving_positions(transactions: &[Transaction]) -> Vec<usize> {
    let mut seen = HashSet::new();
    transactions
        .iter()
        .enumerate()
        .sorted_by_key(|(_, tx)| tx.timestamp)
        .filter(|(_, tx)| {
            let fresh = seen.insert(duplicate_key(tx));
            if !fresh {
                debug!("removing duplicate {:?} {} {}", tx.id, tx.description, tx.date);
            }
            fresh
        })
        .map(|(i, _)| i)
        .collect_vec()
}

#[derive(Debug, PartialEq, Clone)]
pub struct DuplicateGroup<'t> {
    pub key: String,
    pub transactions: Vec<&'t Transaction>,
}

impl<'t> DuplicateGroup<'t> {
    pub fn count(&self) -> usize {
        self.transactions.len()
    }
}

/// Sets of transactions sharing a key, for review before deletion. Groups
/// appear in the order their key was first seen.
pub fn find_duplicate_groups(transactions: &[Transaction]) -> Vec<DuplicateGroup<'_>> {
    let mut order: Vec<String> = Vec::new();
    let mut groups: HashMap<String, Vec<&Transaction>> = HashMap::new();

    for tx in transactions {
        let key = duplicate_key(tx);
        match groups.get_mut(&key) {
            Some(members) => members.push(tx),
            None => {
                order.push(key.clone());
                groups.insert(key, vec![tx]);
            }
        }
    }

    order
        .into_iter()
        .filter_map(|key| {
            groups
                .remove(&key)
                .filter(|members| members.len() > 1)
                .map(|transactions| DuplicateGroup { key, transactions })
        })
        .collect_vec()
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use chrono::{DateTime, TimeZone, Utc};

    use super::*;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).expect("inline date error")
    }

    fn at(hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 15, hour, 0, 0).unwrap()
    }

    fn coffee(id: &str, hour: u32) -> Transaction {
        Transaction::new(
            id,
            Kind::Expense,
            BigDecimal::from_str("4.5").unwrap(),
            "Coffee & Drinks",
            "Latte",
            ymd(2024, 1, 15),
        )
        .with_timestamp(at(hour))
    }

    #[test]
    fn test_key_normalizes() {
        let mut tx = coffee("1", 9);
        assert_eq!(duplicate_key(&tx), "latte|coffee & drinks|4.50|2024-01-15|expense");

        tx.description = "  LATTE ".into();
        tx.amount = BigDecimal::from_str("4.500").unwrap();
        assert_eq!(duplicate_key(&tx), duplicate_key(&coffee("2", 10)));
    }

    #[test]
    fn test_key_empty_fields() {
        let tx = Transaction::new("1", Kind::Income, BigDecimal::from(1), "", "", ymd(2024, 1, 1));
        assert_eq!(duplicate_key(&tx), "||1.00|2024-01-01|income");
    }

    #[test]
    fn test_key_distinguishes_kind() {
        let mut income = coffee("1", 9);
        income.kind = Kind::Income;
        assert_ne!(duplicate_key(&income), duplicate_key(&coffee("2", 9)));
    }

    #[test]
    fn test_count_duplicates() {
        let txs = vec![coffee("late", 11), coffee("early", 9)];
        assert_eq!(count_duplicates(&txs), 1);
        assert_eq!(count_duplicates(&[coffee("1", 9)]), 0);
        assert_eq!(count_duplicates(&[]), 0);
    }

    #[test]
    fn test_remove_keeps_earliest() {
        let txs = vec![coffee("late", 11), coffee("early", 9)];
        let kept = remove_duplicates(&txs);
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].id, "early");
    }

    #[test]
    fn test_remove_orders_oldest_first() {
        let mut other = coffee("other", 10);
        other.description = "Tea".into();
        let txs = vec![coffee("late", 11), other, coffee("early", 9)];

        let kept = remove_duplicates(&txs);
        assert_eq!(kept.iter().map(|tx| tx.id.as_str()).collect_vec(), vec!["early", "other"]);
    }

    #[test]
    fn test_remove_missing_timestamp_is_oldest() {
        let mut undated = coffee("undated", 9);
        undated.timestamp = None;
        let txs = vec![coffee("stamped", 1), undated];

        assert_eq!(remove_duplicates(&txs)[0].id, "undated");
    }

    #[test]
    fn test_remove_is_idempotent() {
        let mut tea = coffee("tea", 12);
        tea.description = "Tea".into();
        let txs = vec![coffee("a", 11), tea.clone(), coffee("b", 9), tea.with_timestamp(at(8))];

        let once = remove_duplicates(&txs);
        assert_eq!(remove_duplicates(&once), once);
        assert_eq!(count_duplicates(&once), 0);
    }

    #[test]
    fn test_surviving_positions_ignore_ids() {
        let txs = vec![coffee("same", 11), coffee("same", 9), coffee("same", 10)];
        assert_eq!(surviving_positions(&txs), vec![1]);
    }

    #[test]
    fn test_groups() {
        let mut tea = coffee("tea", 12);
        tea.description = "Tea".into();
        let txs = vec![tea, coffee("a", 11), coffee("b", 9), coffee("c", 10)];

        let groups = find_duplicate_groups(&txs);
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].count(), 3);
        assert_eq!(groups[0].key, duplicate_key(&txs[1]));
        assert_eq!(
            groups[0].transactions.iter().map(|tx| tx.id.as_str()).collect_vec(),
            vec!["a", "b", "c"]
        );
    }
}
