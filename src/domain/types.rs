//! Shared domain types.
//!
//! These types are serializable so the same values flow through:
//!
//! - the in-memory dataset store
//! - the JSON API (and the console client on the other side of it)
//! - the local review store
//! - CSV exports

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// Which reference dataset a record belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum DataType {
    Industry,
    Etf,
    Stock,
}

impl DataType {
    pub const ALL: [DataType; 3] = [DataType::Industry, DataType::Etf, DataType::Stock];

    /// Wire name (`industry`, `etf`, `stock`).
    pub fn as_str(self) -> &'static str {
        match self {
            DataType::Industry => "industry",
            DataType::Etf => "etf",
            DataType::Stock => "stock",
        }
    }

    /// Human-readable label for terminal output.
    pub fn display_name(self) -> &'static str {
        match self {
            DataType::Industry => "Industry Index",
            DataType::Etf => "ETF",
            DataType::Stock => "Stock",
        }
    }

    pub fn next(self) -> Self {
        match self {
            DataType::Industry => DataType::Etf,
            DataType::Etf => DataType::Stock,
            DataType::Stock => DataType::Industry,
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DataType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "industry" => Ok(DataType::Industry),
            "etf" => Ok(DataType::Etf),
            "stock" => Ok(DataType::Stock),
            other => Err(format!("unknown data type '{other}'")),
        }
    }
}

/// Review status of a single data point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum DataStatus {
    Normal,
    Anomaly,
    Fixed,
}

impl DataStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            DataStatus::Normal => "normal",
            DataStatus::Anomaly => "anomaly",
            DataStatus::Fixed => "fixed",
        }
    }
}

impl FromStr for DataStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "normal" => Ok(DataStatus::Normal),
            "anomaly" => Ok(DataStatus::Anomaly),
            "fixed" => Ok(DataStatus::Fixed),
            other => Err(format!("unknown data status '{other}'")),
        }
    }
}

/// Valuation ratios for an industry index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndustryIndex {
    pub date: NaiveDate,
    pub symbol: String,
    pub name: String,
    pub pe_ttm: Option<f64>,
    pub pb_lyr: Option<f64>,
    pub ps_ttm: Option<f64>,
    pub dividend_yield: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub percentiles: Option<Percentiles>,
}

/// Historical percentile (0-100) of each valuation ratio.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Percentiles {
    pub pe_ttm: f64,
    pub pb_lyr: f64,
    pub ps_ttm: f64,
    pub dividend_yield: f64,
}

/// Daily bar for an ETF.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EtfQuote {
    pub date: NaiveDate,
    pub symbol: String,
    pub name: String,
    pub setup_date: NaiveDate,
    pub open: f64,
    pub close: f64,
    pub high: f64,
    pub low: f64,
    pub pre_close: f64,
    pub volume: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub returns: Option<EtfReturns>,
}

/// Trailing returns in percent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EtfReturns {
    #[serde(rename = "1m")]
    pub m1: f64,
    #[serde(rename = "3m")]
    pub m3: f64,
    #[serde(rename = "6m")]
    pub m6: f64,
    #[serde(rename = "1y")]
    pub y1: f64,
    #[serde(rename = "1y_excess")]
    pub y1_excess: f64,
    #[serde(rename = "2y_excess")]
    pub y2_excess: f64,
    #[serde(rename = "3y_excess")]
    pub y3_excess: f64,
}

/// Daily bar plus fundamentals for a single stock.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StockQuote {
    pub date: NaiveDate,
    pub symbol: String,
    pub ipo_date: NaiveDate,
    pub market_cap: f64,
    pub open: f64,
    pub close: f64,
    pub high: f64,
    pub low: f64,
    pub pre_close: f64,
    pub volume: u64,
    pub pe_ttm: Option<f64>,
    pub dividend_yield: Option<f64>,
    pub yoy_revenue_growth: Option<f64>,
}

/// Payload of a data point.
///
/// Untagged on the wire; variant order matters for decoding because an
/// industry record has the loosest shape (all ratios optional).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Record {
    Stock(StockQuote),
    Etf(EtfQuote),
    Industry(IndustryIndex),
}

impl Record {
    pub fn symbol(&self) -> &str {
        match self {
            Record::Industry(r) => &r.symbol,
            Record::Etf(r) => &r.symbol,
            Record::Stock(r) => &r.symbol,
        }
    }

    /// Display name; stocks carry none so the ticker is used.
    pub fn name(&self) -> &str {
        match self {
            Record::Industry(r) => &r.name,
            Record::Etf(r) => &r.name,
            Record::Stock(r) => &r.symbol,
        }
    }

    /// Headline value shown in tables: PE for indices, close for ETFs and stocks.
    pub fn headline(&self) -> Option<f64> {
        match self {
            Record::Industry(r) => r.pe_ttm,
            Record::Etf(r) => Some(r.close),
            Record::Stock(r) => Some(r.close),
        }
    }
}

/// One timestamped record of financial data with a review status.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataPoint {
    pub id: String,
    pub timestamp: NaiveDate,
    pub status: DataStatus,
    #[serde(rename = "type")]
    pub kind: DataType,
    pub data: Record,
}

/// Lifecycle state of a pull task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    Running,
    Stopped,
    Error,
    Completed,
}

impl TaskStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            TaskStatus::Running => "running",
            TaskStatus::Stopped => "stopped",
            TaskStatus::Error => "error",
            TaskStatus::Completed => "completed",
        }
    }
}

impl FromStr for TaskStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "running" => Ok(TaskStatus::Running),
            "stopped" => Ok(TaskStatus::Stopped),
            "error" => Ok(TaskStatus::Error),
            "completed" => Ok(TaskStatus::Completed),
            other => Err(format!("unknown task status '{other}'")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContactKind {
    Email,
    Sms,
    Webhook,
}

/// Who gets notified about a task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlertContact {
    pub name: String,
    pub email: String,
    #[serde(rename = "type")]
    pub kind: ContactKind,
}

impl Default for AlertContact {
    fn default() -> Self {
        Self {
            name: "Default User".to_string(),
            email: "default@example.com".to_string(),
            kind: ContactKind::Email,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskConfig {
    /// Update interval in minutes.
    pub interval: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub symbols: Option<Vec<String>>,
    #[serde(default)]
    pub alert_contacts: Vec<AlertContact>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskProgress {
    pub current: usize,
    pub total: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_symbol: Option<String>,
}

/// A fake data-pull job whose output becomes a review batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PullTask {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: DataType,
    pub status: TaskStatus,
    pub last_run: Option<DateTime<Utc>>,
    pub next_run: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub progress: Option<TaskProgress>,
    pub config: TaskConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ReviewStatus {
    Pending,
    Approved,
    Rejected,
}

impl ReviewStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            ReviewStatus::Pending => "pending",
            ReviewStatus::Approved => "approved",
            ReviewStatus::Rejected => "rejected",
        }
    }
}

/// Quick valuation call from the PE/PB percentiles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Valuation {
    Undervalued,
    Fair,
    Overvalued,
}

impl Valuation {
    /// Mean percentile below 30 is cheap, above 70 is rich.
    pub fn from_percentiles(pe_percentile: f64, pb_percentile: f64) -> Self {
        let avg = (pe_percentile + pb_percentile) / 2.0;
        if avg < 30.0 {
            Valuation::Undervalued
        } else if avg > 70.0 {
            Valuation::Overvalued
        } else {
            Valuation::Fair
        }
    }
}

/// One row of a review batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewItem {
    pub symbol: String,
    pub name: String,
    pub value: f64,
    pub change: f64,
    pub is_abnormal: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub corrected_value: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pe: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pe_percentile: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pb: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pb_percentile: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ps: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ps_percentile: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dividend_yield: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dividend_yield_percentile: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub market_cap: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub volume: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub revenue_yoy: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub smart_valuation: Option<Valuation>,
}

/// A batch of review items awaiting human approval.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewTask {
    pub id: String,
    pub task_id: String,
    pub task_name: String,
    #[serde(rename = "type")]
    pub kind: DataType,
    pub status: ReviewStatus,
    pub created_at: DateTime<Utc>,
    pub data: Vec<ReviewItem>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub review_comment: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reviewed_by: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reviewed_at: Option<DateTime<Utc>>,
}
