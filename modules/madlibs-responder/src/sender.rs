use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use cloudevents_http::EncodedEvent;
use tracing::warn;

/// Pluggable delivery backend for outbound events.
#[async_trait]
pub trait CallbackSender: Send + Sync {
    /// POST an encoded event to `url` and return the response status code.
    /// Non-success statuses are returned as-is, not treated as errors.
    async fn deliver(&self, url: &str, event: EncodedEvent) -> anyhow::Result<u16>;
}

/// Delivers over HTTP with a bounded wait per attempt. No retries.
pub struct HttpCallbackSender {
    http: reqwest::Client,
}

impl HttpCallbackSender {
    pub fn new(timeout: Duration) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self { http })
    }
}

#[async_trait]
impl CallbackSender for HttpCallbackSender {
    async fn deliver(&self, url: &str, event: EncodedEvent) -> anyhow::Result<u16> {
        let resp = event
            .apply(self.http.post(url))
            .send()
            .await
            .with_context(|| format!("POST to callback {url} failed"))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp
                .text()
                .await
                .unwrap_or_else(|e| format!("<unreadable body: {e}>"));
            warn!(status = %status, body = %body, "Callback returned non-success");
        }

        Ok(status.as_u16())
    }
}
