//! HTTP webhook sink.
//!
//! POSTs each alert payload as JSON to a configured URL. The topic travels
//! in the `X-Alert-Topic` header so one endpoint can serve several topics.

use std::time::Duration;

use crate::traits::{AlertSink, NotifyError};

/// Header carrying the alert topic.
pub const TOPIC_HEADER: &str = "X-Alert-Topic";

#[derive(Debug)]
pub struct WebhookSink {
    /// Target URL (env vars already resolved).
    url: String,
    /// Shared HTTP client (connection pooling, request timeout).
    client: reqwest::Client,
}

impl WebhookSink {
    /// Create a webhook sink.
    ///
    /// Environment variable references (`${VAR_NAME}`) in `url` are
    /// resolved eagerly; a missing variable is a [`NotifyError::Config`].
    pub fn new(url: &str, timeout: Duration) -> Result<Self, NotifyError> {
        let resolved_url = resolve_env_vars(url)?;
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            url: resolved_url,
            client,
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait::async_trait]
impl AlertSink for WebhookSink {
    async fn publish(&self, topic: &str, payload: &str) -> Result<(), NotifyError> {
        let response = self
            .client
            .post(&self.url)
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .header(TOPIC_HEADER, topic)
            .body(payload.to_string())
            .send()
            .await?;
        let status = response.status();

        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            tracing::warn!(
                url = %self.url,
                %status,
                body = %body,
                "webhook returned non-2xx status"
            );
            return Err(NotifyError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        tracing::debug!(url = %self.url, topic, %status, "webhook alert delivered");
        Ok(())
    }

    fn sink_name(&self) -> &str {
        "webhook"
    }
}

/// Resolve `${VAR_NAME}` patterns in a string using `std::env::var`.
///
/// Returns an error if a referenced variable is not set.
fn resolve_env_vars(input: &str) -> Result<String, NotifyError> {
    let mut result = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' && chars.peek() == Some(&'{') {
            chars.next();
            let mut var_name = String::new();
            let mut closed = false;
            for c in chars.by_ref() {
                if c == '}' {
                    closed = true;
                    break;
                }
                var_name.push(c);
            }
            if !closed {
                return Err(NotifyError::Config(format!(
                    "unclosed env var reference in: {input}"
                )));
            }
            let value = std::env::var(&var_name).map_err(|_| {
                NotifyError::Config(format!("env var not found: {var_name}"))
            })?;
            result.push_str(&value);
        } else {
            result.push(ch);
        }
    }

    Ok(result)
}
