//! JSON bodies exchanged over the HTTP API.
//!
//! Shared by the handlers and the console client so both ends agree on shape.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::domain::{DataPoint, PullTask, ReviewTask};
use crate::review::ReviewCounts;
use crate::scheduler::ScheduleInfo;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataResponse {
    pub data: Vec<DataPoint>,
}

/// `POST /api/data` body. Both fields arrive as raw strings and are
/// validated by the handler.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusUpdate {
    pub id: String,
    pub status: String,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct SuccessResponse {
    pub success: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleResponse {
    pub tasks: Vec<ScheduleInfo>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReviewsResponse {
    pub reviews: Vec<ReviewTask>,
    pub counts: ReviewCounts,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ApproveRequest {
    /// Corrected values keyed by symbol.
    #[serde(default)]
    pub edits: HashMap<String, f64>,
    #[serde(default)]
    pub comment: Option<String>,
    #[serde(default)]
    pub reviewer: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RejectRequest {
    #[serde(default)]
    pub comment: Option<String>,
    #[serde(default)]
    pub reviewer: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TasksResponse {
    pub tasks: Vec<PullTask>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}
