//! # dynablocks-assistant
//!
//! Assistant chat and contextual field advice for dynamic block forms.
//!
//! This crate relays free-text questions, together with the current form
//! values, to a server-side assistant and keeps the replies in a chat
//! transcript. It also fetches per-field advice when a field gains focus.
//!
//! ## Important
//!
//! This crate is OPTIONAL. Dependency evaluation in `dynablocks-core` is
//! synchronous and never talks to the assistant.
//!
//! The HTTP transport is behind the `http` feature; everything else works
//! with any [`AssistantTransport`].
//!
//! ## Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use dynablocks_assistant::{AssistantConfig, ChatSession, CsrfToken, HttpTransport};
//!
//! let transport = HttpTransport::new(AssistantConfig::from_env()?, CsrfToken::from_env())?;
//! let mut chat = ChatSession::new(Arc::new(transport));
//! chat.send_question("Which court handles this claim?", context).await;
//! ```

pub mod advice;
pub mod chat;
pub mod config;
pub mod protocol;
pub mod transport;

pub use advice::{fetch_advice, ContextualAdvice};
pub use chat::{context_from_form, ChatMessage, ChatSession, Role, CONNECTION_ERROR_MESSAGE};
pub use config::{AssistantConfig, ConfigError, ASSISTANT_URL_ENV};
pub use protocol::{
    ChatRequest, ChatResponse, DocumentContext, FieldHelpResponse, Reply, DEFAULT_ERROR_MESSAGE,
};
pub use transport::{decode_reply, AssistantTransport, CsrfToken, TokenSource, TransportError};

#[cfg(feature = "http")]
pub use transport::HttpTransport;

use thiserror::Error;

/// Errors from setting up the assistant.
#[derive(Error, Debug)]
pub enum AssistantError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),
}

/// Build an HTTP transport from environment configuration.
#[cfg(feature = "http")]
pub fn http_transport_from_env() -> Result<HttpTransport, AssistantError> {
    let config = AssistantConfig::from_env()?;
    Ok(HttpTransport::new(config, CsrfToken::from_env())?)
}
