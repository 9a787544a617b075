use crate::record::{Record, RecordOrigin};
use chrono::{NaiveDateTime, Timelike};
use std::fmt::{self, Write};
use std::sync::Arc;

pub const MERGED_HEADER: &str = "Symbol, Timestamp, Price, Size, Exchange, Type";

const DATE_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseError {
    pub reason: String,
}

impl ParseError {
    pub(crate) fn new(reason: impl Into<String>) -> Self {
        Self { reason: reason.into() }
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.reason)
    }
}

/// Line codec used by the merge engine. One line in, one record out, and back.
pub trait RecordCodec: Send + Sync {
    /// Header written as the first output line.
    fn header(&self) -> &str;

    fn parse(&self, line: &str, origin: &RecordOrigin) -> Result<Record, ParseError>;

    /// Appends the formatted record to `out` without a line terminator.
    fn format(&self, record: &Record, out: &mut String);
}

/// The tick layout.
///
/// Source files carry `date time.ms, price, size,exchange,type`. Merged
/// output prepends the symbol column. Both are accepted on input so an
/// earlier output can be fed back in as a source.
#[derive(Debug, Clone, Copy, Default)]
pub struct TickCodec;

impl RecordCodec for TickCodec {
    fn header(&self) -> &str {
        MERGED_HEADER
    }

    fn parse(&self, line: &str, origin: &RecordOrigin) -> Result<Record, ParseError> {
        let line = line.trim_end_matches(['\r', '\n']);
        let (head, rest) = line
            .split_once(',')
            .ok_or_else(|| ParseError::new("no field separator"))?;

        let (symbol, timestamp, rest) = match parse_timestamp(head.trim()) {
            Ok(timestamp) => (origin.key.clone(), timestamp, rest),
            Err(err) => {
                let symbol = head.trim();
                let (ts_field, rest) = rest.split_once(',').ok_or_else(|| err.clone())?;
                if symbol.is_empty() {
                    return Err(err);
                }
                let timestamp = parse_timestamp(ts_field.trim()).map_err(|_| err)?;
                let symbol = if symbol == &*origin.key {
                    origin.key.clone()
                } else {
                    Arc::from(symbol)
                };
                (symbol, timestamp, rest)
            }
        };

        let mut fields = rest.splitn(4, ',');
        let mut next_field = |name: &str| {
            fields
                .next()
                .map(str::trim)
                .ok_or_else(|| ParseError::new(format!("missing {} field", name)))
        };
        let price_field = next_field("price")?;
        let size_field = next_field("size")?;
        let exchange = next_field("exchange")?.to_string();
        let kind = next_field("type")?.to_string();

        let price = price_field
            .parse::<f64>()
            .map_err(|e| ParseError::new(format!("bad price {:?}: {}", price_field, e)))?;
        if !price.is_finite() {
            return Err(ParseError::new(format!("price {:?} is not finite", price_field)));
        }
        let size = size_field
            .parse::<i64>()
            .map_err(|e| ParseError::new(format!("bad size {:?}: {}", size_field, e)))?;

        Ok(Record {
            symbol,
            timestamp,
            price,
            size,
            exchange,
            kind,
            source: origin.source,
            seq: origin.seq,
        })
    }

    fn format(&self, record: &Record, out: &mut String) {
        let _ = write!(
            out,
            "{}, {}, {}, {},{},{}",
            record.symbol,
            record.timestamp.format("%Y-%m-%d %H:%M:%S%.3f"),
            record.price,
            record.size,
            record.exchange,
            record.kind
        );
    }
}

/// Parses `YYYY-MM-DD HH:MM:SS.m` where `m` is 1-3 digits counting milliseconds.
pub fn parse_timestamp(field: &str) -> Result<NaiveDateTime, ParseError> {
    let (date_time, millis) = field
        .rsplit_once('.')
        .ok_or_else(|| ParseError::new(format!("timestamp {:?} has no milliseconds", field)))?;

    if millis.is_empty() || millis.len() > 3 || !millis.bytes().all(|b| b.is_ascii_digit()) {
        return Err(ParseError::new(format!(
            "milliseconds {:?} must be 1-3 digits",
            millis
        )));
    }
    let millis: u32 = millis
        .parse()
        .map_err(|e| ParseError::new(format!("bad milliseconds {:?}: {}", millis, e)))?;

    NaiveDateTime::parse_from_str(date_time, DATE_TIME_FORMAT)
        .map_err(|e| ParseError::new(format!("bad timestamp {:?}: {}", date_time, e)))?
        .with_nanosecond(millis * 1_000_000)
        .ok_or_else(|| ParseError::new(format!("milliseconds out of range in {:?}", field)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn origin(key: &str) -> RecordOrigin {
        RecordOrigin {
            source: 2,
            key: Arc::from(key),
            seq: 7,
        }
    }

    #[test]
    fn test_parse_source_layout() {
        let record = TickCodec
            .parse("2024-03-01 10:00:00.5, 101.25, 300,NYSE,Limit", &origin("IBM"))
            .unwrap();

        let expected = NaiveDate::from_ymd_opt(2024, 3, 1)
            .unwrap()
            .and_hms_milli_opt(10, 0, 0, 5)
            .unwrap();
        assert_eq!(&*record.symbol, "IBM");
        assert_eq!(record.timestamp, expected);
        assert_eq!(record.price, 101.25);
        assert_eq!(record.size, 300);
        assert_eq!(record.exchange, "NYSE");
        assert_eq!(record.kind, "Limit");
        assert_eq!(record.source, 2);
        assert_eq!(record.seq, 7);
    }

    #[test]
    fn test_parse_merged_layout_keeps_symbol_column() {
        let record = TickCodec
            .parse("MSFT, 2024-03-01 10:00:00.050, 2, 5,Y,M\r", &origin("Result"))
            .unwrap();
        assert_eq!(&*record.symbol, "MSFT");
        assert_eq!(record.kind, "M");
        assert_eq!(record.timestamp.nanosecond(), 50_000_000);
    }

    #[test]
    fn test_format_pads_milliseconds() {
        let record = TickCodec
            .parse("2024-03-01 09:59:59.5, 2, 5,Y,M", &origin("B"))
            .unwrap();
        let mut line = String::new();
        TickCodec.format(&record, &mut line);
        assert_eq!(line, "B, 2024-03-01 09:59:59.005, 2, 5,Y,M");
    }

    #[test]
    fn test_formatted_line_parses_back_to_same_text() {
        let mut first = String::new();
        let record = TickCodec
            .parse("2024-03-01 09:30:00.123, 10.5, 100,Q,Market", &origin("AAPL"))
            .unwrap();
        TickCodec.format(&record, &mut first);

        let reparsed = TickCodec.parse(&first, &origin("Result")).unwrap();
        let mut second = String::new();
        TickCodec.format(&reparsed, &mut second);
        assert_eq!(first, second);
    }

    #[test]
    fn test_rejects_malformed_lines() {
        let cases = [
            "",
            "garbage",
            "2024-03-01 10:00:00, 1, 1,X,L",
            "2024-03-01 10:00:00.1234, 1, 1,X,L",
            "2024-03-01 10:00:00.1, abc, 1,X,L",
            "2024-03-01 10:00:00.1, NaN, 1,X,L",
            "2024-03-01 10:00:00.1, inf, 1,X,L",
            "2024-03-01 10:00:00.1, -infinity, 1,X,L",
            "2024-03-01 10:00:00.1, 1, 1.5,X,L",
            "2024-03-01 10:00:00.1, 1, 1,X",
            "SYM, not a time, 1, 1,X,L",
        ];
        for line in cases {
            assert!(
                TickCodec.parse(line, &origin("A")).is_err(),
                "expected {:?} to be rejected",
                line
            );
        }
    }
}
