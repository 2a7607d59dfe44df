//! Chat transcript backed by an assistant transport.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, warn};

use dynablocks_core::InMemoryForm;

use crate::protocol::{ChatRequest, DocumentContext, Reply};
use crate::transport::AssistantTransport;

/// Shown when the assistant cannot be reached at all.
pub const CONNECTION_ERROR_MESSAGE: &str = "Connection error with server";

/// Author of a chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Assistant,
    Error,
}

impl Role {
    /// Style class of the rendered message.
    pub fn css_class(&self) -> &'static str {
        match self {
            Role::User => "user-message",
            Role::Assistant => "ai-message",
            Role::Error => "ai-error",
        }
    }

    pub fn speaker(&self) -> &'static str {
        match self {
            Role::User => "You",
            Role::Assistant | Role::Error => "AI",
        }
    }
}

/// One entry of the transcript.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
    pub sent_at: DateTime<Utc>,
}

impl ChatMessage {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            sent_at: Utc::now(),
        }
    }
}

/// Form values sent as question context.
pub fn context_from_form(form: &InMemoryForm) -> DocumentContext {
    form.values()
}

/// A chat panel session.
///
/// The pending indicator is published on a watch channel so a renderer can
/// show it while [`ChatSession::send_question`] is awaiting the reply.
pub struct ChatSession {
    transport: Arc<dyn AssistantTransport>,
    transcript: Vec<ChatMessage>,
    pending: watch::Sender<bool>,
}

impl ChatSession {
    pub fn new(transport: Arc<dyn AssistantTransport>) -> Self {
        Self {
            transport,
            transcript: Vec::new(),
            pending: watch::Sender::new(false),
        }
    }

    pub fn transcript(&self) -> &[ChatMessage] {
        &self.transcript
    }

    /// Whether a question is awaiting its reply.
    pub fn is_pending(&self) -> bool {
        *self.pending.borrow()
    }

    /// Observe the pending indicator.
    pub fn subscribe_pending(&self) -> watch::Receiver<bool> {
        self.pending.subscribe()
    }

    /// Ask a question and append both it and the reply to the transcript.
    ///
    /// Blank questions are ignored and return `None`. Otherwise returns the
    /// reply message, which is an error entry if the assistant failed or
    /// could not be reached.
    pub async fn send_question(
        &mut self,
        question: &str,
        context: DocumentContext,
    ) -> Option<&ChatMessage> {
        let question = question.trim();
        if question.is_empty() {
            return None;
        }

        self.transcript.push(ChatMessage::new(Role::User, question));
        self.pending.send_replace(true);

        let request = ChatRequest::new(question, context);
        let result = self.transport.ask(&request).await;
        self.pending.send_replace(false);

        let reply = match result {
            Ok(response) => match response.into_reply() {
                Reply::Answer(answer) => ChatMessage::new(Role::Assistant, answer),
                Reply::Failure(message) => {
                    debug!(message = %message, "assistant reported failure");
                    ChatMessage::new(Role::Error, message)
                }
            },
            Err(e) => {
                warn!(transport = self.transport.name(), error = %e, "assistant request failed");
                ChatMessage::new(Role::Error, CONNECTION_ERROR_MESSAGE)
            }
        };

        self.transcript.push(reply);
        self.transcript.last()
    }
}
