#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

pub const SOURCE_HEADER: &str = "Timestamp, Price, Size, Exchange, Type";
pub const MERGED_HEADER: &str = "Symbol, Timestamp, Price, Size, Exchange, Type";

/// Writes a source file with the usual header line followed by `rows`.
pub fn write_source(dir: &Path, name: &str, rows: &[String]) -> PathBuf {
    let path = dir.join(name);
    let mut body = String::from(SOURCE_HEADER);
    body.push('\n');
    for row in rows {
        body.push_str(row);
        body.push('\n');
    }
    fs::write(&path, body).unwrap();
    path
}

pub fn read_lines(path: &Path) -> Vec<String> {
    fs::read_to_string(path)
        .unwrap()
        .lines()
        .map(str::to_string)
        .collect()
}

/// `HH:MM:SS.mmm` on 2024-01-02 for a millisecond offset from 09:30.
pub fn clock(offset_ms: u64) -> (String, String) {
    let total = 9 * 3_600_000 + 30 * 60_000 + offset_ms;
    let (h, m, s, ms) = (
        total / 3_600_000,
        (total / 60_000) % 60,
        (total / 1000) % 60,
        total % 1000,
    );
    let short = format!("2024-01-02 {:02}:{:02}:{:02}.{}", h, m, s, ms);
    let padded = format!("2024-01-02 {:02}:{:02}:{:02}.{:03}", h, m, s, ms);
    (short, padded)
}

/// A source row and the merged line it should produce.
pub struct Tick {
    pub offset_ms: u64,
    pub key: String,
    pub price: f64,
    pub size: i64,
    pub exchange: &'static str,
    pub kind: &'static str,
}

impl Tick {
    pub fn new(key: &str, offset_ms: u64, price: f64, size: i64) -> Self {
        Self {
            offset_ms,
            key: key.to_string(),
            price,
            size,
            exchange: "NYSE",
            kind: "Limit",
        }
    }

    pub fn source_row(&self) -> String {
        let (short, _) = clock(self.offset_ms);
        format!("{}, {}, {},{},{}", short, self.price, self.size, self.exchange, self.kind)
    }

    pub fn merged_line(&self) -> String {
        let (_, padded) = clock(self.offset_ms);
        format!(
            "{}, {}, {}, {},{},{}",
            self.key, padded, self.price, self.size, self.exchange, self.kind
        )
    }
}

/// Deterministic pseudo-random stream for fixture generation.
pub struct Lcg(u64);

impl Lcg {
    pub fn new(seed: u64) -> Self {
        Self(seed)
    }

    pub fn next(&mut self) -> u64 {
        self.0 = self
            .0
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1442695040888963407);
        self.0 >> 33
    }

    pub fn below(&mut self, bound: u64) -> u64 {
        self.next() % bound
    }
}
