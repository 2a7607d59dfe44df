//! HTTP transport for the assistant endpoints.

use async_trait::async_trait;
use tracing::debug;

use super::{decode_reply, AssistantTransport, CsrfToken, TransportError, CSRF_HEADER};
use crate::config::AssistantConfig;
use crate::protocol::{ChatRequest, ChatResponse, FieldHelpResponse};

/// Talks to the assistant over plain request/response HTTP.
#[derive(Debug)]
pub struct HttpTransport {
    config: AssistantConfig,
    csrf: CsrfToken,
    client: reqwest::Client,
}

impl HttpTransport {
    pub fn new(config: AssistantConfig, csrf: CsrfToken) -> Result<Self, TransportError> {
        config
            .validate()
            .map_err(|e| TransportError::NotConfigured(e.to_string()))?;

        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| TransportError::HttpError(e.to_string()))?;

        Ok(Self {
            config,
            csrf,
            client,
        })
    }

    pub fn config(&self) -> &AssistantConfig {
        &self.config
    }

    fn map_send_error(&self, e: reqwest::Error) -> TransportError {
        if e.is_timeout() {
            TransportError::Timeout(self.config.timeout)
        } else {
            TransportError::HttpError(e.to_string())
        }
    }

    async fn read_json<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, TransportError> {
        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| TransportError::ParseError(e.to_string()))?;
        decode_reply(status, &body)
    }
}

#[async_trait]
impl AssistantTransport for HttpTransport {
    async fn ask(&self, request: &ChatRequest) -> Result<ChatResponse, TransportError> {
        let url = self.config.chat_url();
        debug!(url = %url, "sending chat question");

        // Only expose the token here, at the point of use
        let response = self
            .client
            .post(url)
            .header(CSRF_HEADER, self.csrf.expose())
            .json(request)
            .send()
            .await
            .map_err(|e| self.map_send_error(e))?;

        Self::read_json(response).await
    }

    async fn field_help(&self, field: &str) -> Result<FieldHelpResponse, TransportError> {
        let url = self.config.field_help_url();
        debug!(url = %url, field, "requesting field help");

        let response = self
            .client
            .get(url)
            .query(&[("field", field)])
            .header(CSRF_HEADER, self.csrf.expose())
            .send()
            .await
            .map_err(|e| self.map_send_error(e))?;

        Self::read_json(response).await
    }

    fn name(&self) -> &str {
        "http"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chat::ChatSession;
    use crate::protocol::DocumentContext;
    use crate::transport::TokenSource;
    use std::sync::Arc;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// Serve one canned HTTP response and return the base URL.
    async fn serve_once(status_line: &'static str, body: &'static str) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = Vec::new();
            let mut chunk = [0u8; 1024];
            loop {
                let n = socket.read(&mut chunk).await.unwrap();
                request.extend_from_slice(&chunk[..n]);
                let text = String::from_utf8_lossy(&request).to_string();
                let Some(end) = text.find("\r\n\r\n") else {
                    if n == 0 {
                        break;
                    }
                    continue;
                };
                let length = text[..end]
                    .lines()
                    .find_map(|line| {
                        let (name, value) = line.split_once(':')?;
                        name.eq_ignore_ascii_case("content-length")
                            .then(|| value.trim().parse::<usize>().ok())
                            .flatten()
                    })
                    .unwrap_or(0);
                if n == 0 || request.len() >= end + 4 + length {
                    break;
                }
            }

            let response = format!(
                "HTTP/1.1 {status_line}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                body.len()
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            socket.shutdown().await.unwrap();
        });

        format!("http://{addr}")
    }

    fn transport(base_url: String) -> HttpTransport {
        HttpTransport::new(
            AssistantConfig::new(base_url),
            CsrfToken::new("token", TokenSource::Programmatic),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_error_status_message_reaches_chat() {
        let base_url = serve_once(
            "400 Bad Request",
            r#"{"status": "error", "message": "Invalid action"}"#,
        )
        .await;
        let mut session = ChatSession::new(Arc::new(transport(base_url)));

        let reply = session
            .send_question("What is a claim?", DocumentContext::new())
            .await
            .unwrap();
        assert_eq!(reply.content, "Invalid action");
    }

    #[tokio::test]
    async fn test_error_status_without_reply_body() {
        let base_url = serve_once("500 Internal Server Error", "oops").await;
        let result = transport(base_url).field_help("court").await;
        assert!(matches!(result, Err(TransportError::ApiError { status: 500, .. })));
    }

    #[test]
    fn test_rejects_invalid_base_url() {
        let result = HttpTransport::new(AssistantConfig::new("ftp://x"), CsrfToken::missing());
        assert!(matches!(result, Err(TransportError::NotConfigured(_))));
    }

    #[test]
    fn test_token_not_in_debug_output() {
        let secret = "csrf-secret-12345";
        let transport = HttpTransport::new(
            AssistantConfig::default(),
            CsrfToken::new(secret, TokenSource::Programmatic),
        )
        .unwrap();
        let debug = format!("{:?}", transport);
        assert!(!debug.contains(secret), "CSRF token was exposed in Debug output!");
        assert_eq!(transport.name(), "http");
    }
}
