//! REST API types.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::Serialize;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::error::ServerError;
use crate::models::FlatRecord;
use crate::parser::ParseResult;
use crate::transform::column_schema;

/// Records included in a preview response.
pub const PREVIEW_ROWS: usize = 20;

/// Response of `POST /api/preview`
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PreviewResponse {
    /// Unique job identifier
    pub job_id: String,

    /// "ready" or "empty"
    pub status: String,

    pub record_count: usize,

    /// CSV header the conversion would produce
    pub columns: Vec<String>,

    pub encoding: String,

    /// First [`PREVIEW_ROWS`] records
    pub records: Vec<FlatRecord>,
}

impl From<ParseResult> for PreviewResponse {
    fn from(parsed: ParseResult) -> Self {
        let columns = column_schema(&parsed.records);
        let record_count = parsed.records.len();

        PreviewResponse {
            job_id: Uuid::new_v4().to_string(),
            status: if record_count == 0 { "empty" } else { "ready" }.to_string(),
            record_count,
            columns,
            encoding: parsed.encoding,
            records: parsed.records.into_iter().take(PREVIEW_ROWS).collect(),
        }
    }
}

/// Create an error response body
pub fn error_response(error: &str) -> Value {
    json!({ "error": error })
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = match &self {
            ServerError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ServerError::Convert(_) | ServerError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, Json(error_response(&self.to_string()))).into_response()
    }
}
