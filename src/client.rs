//! Blocking HTTP client for a running desk server.

use std::collections::HashMap;

use reqwest::blocking::{Client, Response};
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::domain::{DataPoint, DataStatus, DataType, PullTask, ReviewTask};
use crate::error::AppError;
use crate::server::wire::{
    ApproveRequest, DataResponse, ErrorResponse, RejectRequest, ReviewsResponse, ScheduleResponse,
    StatusUpdate, SuccessResponse, TasksResponse,
};
use crate::scheduler::ScheduleInfo;

pub const ENV_URL: &str = "REFDESK_URL";
pub const DEFAULT_URL: &str = "http://127.0.0.1:3000";

pub struct DeskClient {
    client: Client,
    base_url: String,
}

impl DeskClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// Client for `$REFDESK_URL`, or the default local address.
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();
        let url = std::env::var(ENV_URL).unwrap_or_else(|_| DEFAULT_URL.to_string());
        Self::new(url)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn fetch_data(&self, kind: DataType) -> Result<Vec<DataPoint>, AppError> {
        let resp = self
            .client
            .get(self.url("/api/data"))
            .query(&[("type", kind.as_str())])
            .send()
            .map_err(request_failed)?;
        let body: DataResponse = decode(resp)?;
        Ok(body.data)
    }

    pub fn update_status(&self, id: &str, status: DataStatus) -> Result<(), AppError> {
        let update = StatusUpdate {
            id: id.to_string(),
            status: status.as_str().to_string(),
        };
        let body: SuccessResponse = self.post("/api/data", &update)?;
        if !body.success {
            return Err(AppError::new(4, format!("Server refused status update for {id}.")));
        }
        Ok(())
    }

    pub fn schedule(&self) -> Result<Vec<ScheduleInfo>, AppError> {
        let body: ScheduleResponse = self.get("/api/schedule")?;
        Ok(body.tasks)
    }

    pub fn list_reviews(&self) -> Result<ReviewsResponse, AppError> {
        self.get("/api/reviews")
    }

    pub fn approve(&self, id: &str, edits: HashMap<String, f64>) -> Result<ReviewTask, AppError> {
        let req = ApproveRequest {
            edits,
            ..ApproveRequest::default()
        };
        self.post(&format!("/api/reviews/{id}/approve"), &req)
    }

    pub fn reject(&self, id: &str, comment: Option<String>) -> Result<ReviewTask, AppError> {
        let req = RejectRequest {
            comment,
            ..RejectRequest::default()
        };
        self.post(&format!("/api/reviews/{id}/reject"), &req)
    }

    pub fn list_tasks(&self) -> Result<Vec<PullTask>, AppError> {
        let body: TasksResponse = self.get("/api/tasks")?;
        Ok(body.tasks)
    }

    pub fn start_task(&self, id: &str) -> Result<PullTask, AppError> {
        self.post(&format!("/api/tasks/{id}/start"), &serde_json::json!({}))
    }

    pub fn stop_task(&self, id: &str) -> Result<PullTask, AppError> {
        self.post(&format!("/api/tasks/{id}/stop"), &serde_json::json!({}))
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, AppError> {
        let resp = self.client.get(self.url(path)).send().map_err(request_failed)?;
        decode(resp)
    }

    fn post<B: Serialize, T: DeserializeOwned>(&self, path: &str, body: &B) -> Result<T, AppError> {
        let resp = self
            .client
            .post(self.url(path))
            .json(body)
            .send()
            .map_err(request_failed)?;
        decode(resp)
    }
}

fn request_failed(e: reqwest::Error) -> AppError {
    AppError::new(4, format!("Desk request failed: {e}"))
}

fn decode<T: DeserializeOwned>(resp: Response) -> Result<T, AppError> {
    let status = resp.status();
    if !status.is_success() {
        let detail = resp
            .json::<ErrorResponse>()
            .map(|e| e.error)
            .unwrap_or_else(|_| "no details".to_string());
        return Err(AppError::new(4, format!("Desk returned {status}: {detail}")));
    }
    resp.json()
        .map_err(|e| AppError::new(4, format!("Failed to parse desk response: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_url_drops_trailing_slash() {
        let client = DeskClient::new("http://localhost:3000/");
        assert_eq!(client.base_url(), "http://localhost:3000");
        assert_eq!(client.url("/api/data"), "http://localhost:3000/api/data");
    }

    #[test]
    fn unreachable_server_is_a_runtime_error() {
        // Port 9 (discard) is closed on test hosts.
        let client = DeskClient::new("http://127.0.0.1:9");
        let err = client.fetch_data(DataType::Etf).unwrap_err();
        assert_eq!(err.exit_code(), 4);
        assert!(err.message().starts_with("Desk request failed"));
    }
}
