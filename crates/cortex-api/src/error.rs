// Copyright Cortex Authors
// SPDX-License-Identifier: Apache-2.0

//! Maps the core's error taxonomy onto decision API status codes, per the
//! configuration/dependency-unready/transient/malformed/fatal split.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;

/// Errors the HTTP layer can return.
#[derive(Error, Debug)]
pub enum Error {
    /// No pipeline is registered under the requested namespace/name.
    #[error("pipeline '{0}' not found")]
    PipelineNotFound(String),

    /// The request body failed to parse or convert into an engine request.
    #[error("malformed request: {0}")]
    MalformedRequest(String),

    /// A step reported a condition the API treats as caller-fatal (e.g.
    /// live-migration against an unknown source host).
    #[error("fatal: {0}")]
    Fatal(String),

    /// Anything else: transient step failure surfaced as a hard error by
    /// family policy, metrics render failure, etc.
    #[error("internal error: {0}")]
    Internal(String),
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

impl Error {
    /// The HTTP status this error maps to, shared between response
    /// rendering and request-duration metric labels.
    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self {
            Error::PipelineNotFound(_) => StatusCode::NOT_FOUND,
            Error::MalformedRequest(_) => StatusCode::BAD_REQUEST,
            Error::Fatal(_) | Error::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<cortex_engine::Error> for Error {
    fn from(err: cortex_engine::Error) -> Self {
        match err {
            cortex_engine::Error::Fatal { .. } => Error::Fatal(err.to_string()),
            cortex_engine::Error::Malformed { .. } => Error::MalformedRequest(err.to_string()),
            other => Error::Internal(other.to_string()),
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = ErrorBody {
            error: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}
