//! Dataset summaries for terminal output.

use std::collections::BTreeMap;

use chrono::NaiveDate;

use crate::domain::{DataPoint, DataStatus, DataType};

pub mod format;

pub use format::format_summary;

/// Per-symbol view across the history window.
#[derive(Debug, Clone, PartialEq)]
pub struct SymbolSummary {
    pub symbol: String,
    pub name: String,
    /// Headline value on the newest date.
    pub latest: Option<f64>,
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub anomalies: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DatasetSummary {
    pub kind: DataType,
    pub first_date: Option<NaiveDate>,
    pub last_date: Option<NaiveDate>,
    pub points: usize,
    pub anomalies: usize,
    pub fixed: usize,
    pub symbols: Vec<SymbolSummary>,
}

/// Summarize a dataset; symbols are sorted by ticker.
pub fn summarize(kind: DataType, points: &[DataPoint]) -> DatasetSummary {
    let mut by_symbol: BTreeMap<&str, SymbolSummary> = BTreeMap::new();
    let mut newest: BTreeMap<&str, NaiveDate> = BTreeMap::new();

    for p in points {
        let symbol = p.data.symbol();
        let entry = by_symbol.entry(symbol).or_insert_with(|| SymbolSummary {
            symbol: symbol.to_string(),
            name: p.data.name().to_string(),
            latest: None,
            min: None,
            max: None,
            anomalies: 0,
        });
        if p.status == DataStatus::Anomaly {
            entry.anomalies += 1;
        }
        if let Some(v) = p.data.headline() {
            entry.min = Some(entry.min.map_or(v, |m| m.min(v)));
            entry.max = Some(entry.max.map_or(v, |m| m.max(v)));
        }
        let is_newest = newest.get(symbol).is_none_or(|d| p.timestamp > *d);
        if is_newest {
            newest.insert(symbol, p.timestamp);
            entry.latest = p.data.headline();
        }
    }

    DatasetSummary {
        kind,
        first_date: points.iter().map(|p| p.timestamp).min(),
        last_date: points.iter().map(|p| p.timestamp).max(),
        points: points.len(),
        anomalies: points.iter().filter(|p| p.status == DataStatus::Anomaly).count(),
        fixed: points.iter().filter(|p| p.status == DataStatus::Fixed).count(),
        symbols: by_symbol.into_values().collect(),
    }
}
