//! Contextual advice for the field being filled in.

use tracing::{debug, warn};

use crate::protocol::FieldHelpResponse;
use crate::transport::AssistantTransport;

/// Advice shown next to a focused field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContextualAdvice {
    pub field_label: String,
    pub advice: String,
    pub examples: Vec<String>,
}

impl ContextualAdvice {
    /// `None` unless the response reports success.
    pub fn from_response(response: FieldHelpResponse) -> Option<Self> {
        if !response.is_success() {
            return None;
        }
        Some(Self {
            field_label: response.field_label,
            advice: response.advice,
            examples: response.examples.unwrap_or_default(),
        })
    }

    /// Plain-text rendering of the advice panel.
    pub fn render(&self) -> String {
        let mut text = format!("{} - AI tips:\n{}", self.field_label, self.advice);
        if !self.examples.is_empty() {
            text.push_str("\nExamples: ");
            text.push_str(&self.examples.join(", "));
        }
        text
    }
}

/// Fetch advice for `field`. Failures are logged and yield `None`.
pub async fn fetch_advice(
    transport: &dyn AssistantTransport,
    field: &str,
) -> Option<ContextualAdvice> {
    match transport.field_help(field).await {
        Ok(response) => {
            let advice = ContextualAdvice::from_response(response);
            if advice.is_none() {
                debug!(field, "no advice available");
            }
            advice
        }
        Err(e) => {
            warn!(field, error = %e, "failed to fetch field advice");
            None
        }
    }
}
