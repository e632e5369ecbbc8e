// Request-level failures and their HTTP rendering.

use std::convert::Infallible;

use axum::extract::multipart::MultipartError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;

use crate::store::StoreError;

#[derive(Error, Debug)]
pub enum IngestError {
    #[error("No IPA selected")]
    NoFile,

    #[error("File must be .ipa")]
    WrongExtension,

    #[error("Info.plist not found")]
    DescriptorMissing,

    #[error("Upload failed: {0}")]
    Upload(#[from] MultipartError),

    #[error("Storage error: {0}")]
    Storage(#[from] StoreError),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<Infallible> for IngestError {
    fn from(never: Infallible) -> Self {
        match never {}
    }
}

/// JSON body of every error response.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
}

impl IngestError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::NoFile | Self::WrongExtension | Self::DescriptorMissing => {
                StatusCode::BAD_REQUEST
            }
            Self::Upload(e) => e.status(),
            Self::Storage(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Client-facing message. Server faults stay generic so no paths leak.
    pub fn public_message(&self) -> String {
        match self {
            Self::Upload(e) => e.body_text(),
            Self::Storage(_) => "Failed to store upload".to_string(),
            Self::Internal(_) => "Internal error".to_string(),
            other => other.to_string(),
        }
    }
}

impl IntoResponse for IngestError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: self.public_message(),
        };
        (self.status(), Json(body)).into_response()
    }
}
