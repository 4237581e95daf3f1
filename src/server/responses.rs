//! JSON response bodies and helpers

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::Serialize;

use crate::package::types::{HistoryEntry, Record};
use crate::refresh::RefreshReport;

#[derive(Debug, Serialize)]
pub struct ApiError {
    pub error: String,
}

pub fn json_error(status: StatusCode, message: impl Into<String>) -> Response {
    (
        status,
        Json(ApiError {
            error: message.into(),
        }),
    )
        .into_response()
}

#[derive(Debug, Serialize)]
pub struct RootResponse {
    pub service: &'static str,
    pub version: &'static str,
    pub total_stacks: usize,
    pub last_updated: Option<DateTime<Utc>>,
    pub endpoints: IndexMap<&'static str, &'static str>,
}

#[derive(Debug, Serialize)]
pub struct StacksResponse {
    pub stacks: IndexMap<String, Record>,
    pub total_count: usize,
    pub last_refresh: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize)]
pub struct CategoryResponse {
    pub category: String,
    pub stacks: IndexMap<String, Record>,
    pub total_count: usize,
}

#[derive(Debug, Serialize)]
pub struct SearchResponse {
    pub query: String,
    pub stacks: IndexMap<String, Record>,
    pub total_count: usize,
}

#[derive(Debug, Serialize)]
pub struct TrendingResponse {
    pub stacks: Vec<Record>,
    pub sort_by: String,
    pub total_count: usize,
}

#[derive(Debug, Serialize)]
pub struct OutdatedResponse {
    pub stacks: IndexMap<String, Record>,
    pub threshold_days: i64,
    pub total_count: usize,
}

/// One record with its retained history
#[derive(Debug, Serialize)]
pub struct StackDetail {
    #[serde(flatten)]
    pub record: Record,
    pub history: Vec<HistoryEntry>,
}

#[derive(Debug, Serialize)]
pub struct RefreshResponse {
    pub success: bool,
    pub updated_stacks: usize,
    pub failed_stacks: Vec<String>,
    pub errors: IndexMap<String, String>,
    pub timestamp: DateTime<Utc>,
}

impl From<RefreshReport> for RefreshResponse {
    fn from(report: RefreshReport) -> Self {
        Self {
            success: report.is_saved(),
            updated_stacks: report.updated.len(),
            failed_stacks: report.failed,
            errors: report.errors,
            timestamp: report.timestamp,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct ReadyResponse {
    pub status: &'static str,
    pub total_count: usize,
}
