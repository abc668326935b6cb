use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use data_model::format_timestamp;
use serde::{Deserialize, Serialize};
use tracing::error;

use crate::blobs::{BlobServiceError, StoredBlob};

#[derive(Debug)]
pub struct BlobGateAPIError {
    status_code: StatusCode,
    message: String,
}

impl BlobGateAPIError {
    pub fn new(status_code: StatusCode, message: &str) -> Self {
        Self {
            status_code,
            message: message.to_string(),
        }
    }

    pub fn internal_error(e: anyhow::Error) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, &format!("{e:#}"))
    }

    pub fn not_found(message: &str) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }

    pub fn bad_request(message: &str) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn unauthorized(message: &str) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, message)
    }

    pub fn status_code(&self) -> StatusCode {
        self.status_code
    }
}

impl IntoResponse for BlobGateAPIError {
    fn into_response(self) -> Response {
        error!("API Error: {} - {}", self.status_code, self.message);
        (self.status_code, self.message).into_response()
    }
}

impl From<BlobServiceError> for BlobGateAPIError {
    fn from(e: BlobServiceError) -> Self {
        match e {
            BlobServiceError::InvalidInput(message) => Self::bad_request(&message),
            BlobServiceError::NotFound => Self::not_found("Blob not found"),
            BlobServiceError::Backend(err) => Self::internal_error(err.into()),
            BlobServiceError::Metadata(err) => Self::internal_error(err),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CreateBlob {
    pub id: String,
    pub data: String,
}

impl CreateBlob {
    pub fn validate(&self) -> Result<(), BlobGateAPIError> {
        if self.id.is_empty() {
            return Err(BlobGateAPIError::bad_request("id must not be empty"));
        }
        if self.data.is_empty() {
            return Err(BlobGateAPIError::bad_request("data must not be empty"));
        }
        Ok(())
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct BlobCreated {
    pub id: String,
    pub message: String,
}

impl BlobCreated {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            message: "Blob stored successfully".to_string(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Blob {
    pub id: String,
    /// Standard base64 of the stored bytes.
    pub data: String,
    pub size: u64,
    /// RFC 3339 in UTC.
    pub created_at: String,
}

impl From<StoredBlob> for Blob {
    fn from(blob: StoredBlob) -> Self {
        Self {
            id: blob.id.to_string(),
            data: blob.data,
            size: blob.size,
            created_at: format_timestamp(&blob.created_at),
        }
    }
}
