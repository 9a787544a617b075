use chrono::NaiveDateTime;
use std::cmp::Ordering;
use std::sync::Arc;

/// Where a record was read from: catalog index, file-derived key, read ordinal.
#[derive(Clone, Debug)]
pub struct RecordOrigin {
    pub source: usize,
    pub key: Arc<str>,
    pub seq: u64,
}

/// One parsed tick.
///
/// Ordered by timestamp, then symbol. The catalog index and the read ordinal
/// only break ties, so rows sharing a (timestamp, symbol) key keep the order
/// they had in their file.
#[derive(Clone, Debug)]
pub struct Record {
    pub symbol: Arc<str>,
    pub timestamp: NaiveDateTime,
    pub price: f64,
    pub size: i64,
    pub exchange: String,
    pub kind: String,
    pub source: usize,
    pub seq: u64,
}

impl Record {
    pub fn sort_key(&self) -> (NaiveDateTime, &str, usize, u64) {
        (self.timestamp, &self.symbol, self.source, self.seq)
    }
}

impl PartialEq for Record {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Record {}

impl Ord for Record {
    fn cmp(&self, other: &Self) -> Ordering {
        self.sort_key().cmp(&other.sort_key())
    }
}

impl PartialOrd for Record {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(h: u32, m: u32, s: u32, ms: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, 1)
            .unwrap()
            .and_hms_milli_opt(h, m, s, ms)
            .unwrap()
    }

    fn record(symbol: &str, timestamp: NaiveDateTime, source: usize, seq: u64) -> Record {
        Record {
            symbol: Arc::from(symbol),
            timestamp,
            price: 1.0,
            size: 1,
            exchange: "X".to_string(),
            kind: "L".to_string(),
            source,
            seq,
        }
    }

    #[test]
    fn test_earlier_timestamp_wins() {
        let a = record("A", at(10, 0, 0, 0), 0, 0);
        let b = record("B", at(9, 59, 59, 500), 1, 0);
        assert!(b < a);
    }

    #[test]
    fn test_symbol_breaks_timestamp_tie() {
        let a = record("AAPL", at(10, 0, 0, 0), 1, 0);
        let m = record("MSFT", at(10, 0, 0, 0), 0, 0);
        assert!(a < m);
    }

    #[test]
    fn test_read_order_breaks_full_key_tie() {
        let first = record("A", at(10, 0, 0, 0), 0, 3);
        let second = record("A", at(10, 0, 0, 0), 0, 4);
        assert!(first < second);
        assert_ne!(first, second);
    }
}
