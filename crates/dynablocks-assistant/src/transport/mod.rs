//! Transport abstraction for the assistant endpoints.
//!
//! The chat panel and field advice only see [`AssistantTransport`]; the HTTP
//! implementation lives behind the `http` feature so the rest of the crate
//! can be exercised with in-process transports.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use std::time::Duration;
use thiserror::Error;

pub mod csrf;

#[cfg(feature = "http")]
mod http;

pub use csrf::{CsrfToken, TokenSource, CSRF_HEADER, CSRF_TOKEN_ENV};

#[cfg(feature = "http")]
pub use http::HttpTransport;

use crate::protocol::{ChatRequest, ChatResponse, FieldHelpResponse};

/// Errors from an assistant transport.
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("HTTP request failed: {0}")]
    HttpError(String),

    #[error("API error: {status} - {message}")]
    ApiError { status: u16, message: String },

    #[error("JSON parse error: {0}")]
    ParseError(String),

    #[error("Timeout after {0:?}")]
    Timeout(Duration),

    #[error("Transport not configured: {0}")]
    NotConfigured(String),
}

/// Request/response exchange with the server-side assistant.
#[async_trait]
pub trait AssistantTransport: Send + Sync {
    /// Send a chat question.
    async fn ask(&self, request: &ChatRequest) -> Result<ChatResponse, TransportError>;

    /// Fetch advice for one form field.
    async fn field_help(&self, field: &str) -> Result<FieldHelpResponse, TransportError>;

    /// Transport name for logs.
    fn name(&self) -> &str;
}

/// Decode a reply body.
///
/// The assistant answers failures with an error status and a regular
/// `{status, message}` body, so the body is decoded whatever the status.
/// Only an error status with a body of some other shape becomes
/// [`TransportError::ApiError`].
pub fn decode_reply<T: DeserializeOwned>(status: u16, body: &str) -> Result<T, TransportError> {
    match serde_json::from_str(body) {
        Ok(reply) => Ok(reply),
        Err(_) if !(200..300).contains(&status) => Err(TransportError::ApiError {
            status,
            message: body.to_string(),
        }),
        Err(e) => Err(TransportError::ParseError(e.to_string())),
    }
}
