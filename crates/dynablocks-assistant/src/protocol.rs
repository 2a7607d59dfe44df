//! Request and response shapes of the assistant endpoints.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Action name of a chat question request.
pub const CHAT_QUESTION_ACTION: &str = "chat_question";

/// Status value of a successful response.
pub const STATUS_SUCCESS: &str = "success";

/// Shown when the assistant reports a failure without a message.
pub const DEFAULT_ERROR_MESSAGE: &str = "An error occurred";

/// Current form values sent along with a question.
pub type DocumentContext = BTreeMap<String, String>;

/// A free-text question for the assistant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatRequest {
    pub action: String,
    pub question: String,
    pub context: DocumentContext,
}

impl ChatRequest {
    pub fn new(question: impl Into<String>, context: DocumentContext) -> Self {
        Self {
            action: CHAT_QUESTION_ACTION.to_string(),
            question: question.into(),
            context,
        }
    }
}

/// Reply to a [`ChatRequest`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatResponse {
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub answer: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl ChatResponse {
    pub fn success(answer: impl Into<String>) -> Self {
        Self {
            status: STATUS_SUCCESS.to_string(),
            answer: Some(answer.into()),
            message: None,
        }
    }

    pub fn error(message: Option<String>) -> Self {
        Self {
            status: "error".to_string(),
            answer: None,
            message,
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == STATUS_SUCCESS
    }

    /// Interpret the response as something to show in the chat.
    ///
    /// A success without an answer counts as a failure.
    pub fn into_reply(self) -> Reply {
        match (self.is_success(), self.answer, self.message) {
            (true, Some(answer), _) => Reply::Answer(answer),
            (_, _, Some(message)) if !message.is_empty() => Reply::Failure(message),
            _ => Reply::Failure(DEFAULT_ERROR_MESSAGE.to_string()),
        }
    }
}

/// What a chat response amounts to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    Answer(String),
    Failure(String),
}

/// Advice for filling in one field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldHelpResponse {
    pub status: String,
    #[serde(default)]
    pub field_label: String,
    #[serde(default)]
    pub advice: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub examples: Option<Vec<String>>,
}

impl FieldHelpResponse {
    pub fn is_success(&self) -> bool {
        self.status == STATUS_SUCCESS
    }
}
