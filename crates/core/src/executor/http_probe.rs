//! Read-only HTTP probe executor.
//!
//! Issues a GET against a payload-supplied URL. Never accepts credentials
//! from the payload, applies a bounded request timeout, and maps every
//! distinguishable failure mode to a stable reason code. The response
//! envelope never carries a raw error chain.

use std::time::Duration;

use super::ExecutorOutcome;

const MODE: &str = "http_probe";

/// Payload keys that would smuggle credentials into the request. Their
/// presence fails the call before any I/O.
const CREDENTIAL_KEYS: &[&str] = &[
    "authorization",
    "credential",
    "credentials",
    "password",
    "secret",
    "token",
];

/// Maximum number of response body bytes echoed into the envelope.
const BODY_SNIPPET_LIMIT: usize = 2048;

#[derive(Debug, Clone)]
pub struct HttpProbeExecutor {
    client: reqwest::Client,
}

impl HttpProbeExecutor {
    /// Build a probe executor with a per-request timeout.
    pub fn new(timeout: Duration) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_default();
        Self { client }
    }

    pub async fn run(&self, action_type: &str, payload: &serde_json::Value) -> ExecutorOutcome {
        let Some(fields) = payload.as_object() else {
            return ExecutorOutcome::failure(MODE, "invalid_payload", "Payload must be a JSON object");
        };

        for key in fields.keys() {
            if CREDENTIAL_KEYS.contains(&key.to_ascii_lowercase().as_str()) {
                return ExecutorOutcome::failure(
                    MODE,
                    "payload_credentials_rejected",
                    format!("Payload field '{key}' is not accepted; credentials come from executor configuration"),
                );
            }
        }

        let Some(url) = fields.get("url").and_then(serde_json::Value::as_str) else {
            return ExecutorOutcome::failure(MODE, "invalid_payload", "Payload must contain a 'url' string");
        };
        if !url.starts_with("http://") && !url.starts_with("https://") {
            return ExecutorOutcome::failure(
                MODE,
                "invalid_payload",
                "Probe URL must use http or https",
            );
        }

        let response = match self.client.get(url).send().await {
            Ok(response) => response,
            Err(err) if err.is_timeout() => {
                return ExecutorOutcome::failure(
                    MODE,
                    "http_timeout",
                    format!("Probe of {url} timed out"),
                );
            }
            Err(err) => {
                return ExecutorOutcome::failure(MODE, "http_transport_error", err.to_string());
            }
        };

        let status = response.status();
        match status.as_u16() {
            200..=299 => {
                let body = response.text().await.unwrap_or_default();
                let snippet: String = body.chars().take(BODY_SNIPPET_LIMIT).collect();
                ExecutorOutcome::success(serde_json::json!({
                    "mode": MODE,
                    "actionType": action_type,
                    "url": url,
                    "statusCode": status.as_u16(),
                    "bodySnippet": snippet,
                }))
            }
            401 => ExecutorOutcome::failure(
                MODE,
                "http_unauthorized",
                format!("Probe of {url} returned 401"),
            ),
            403 => ExecutorOutcome::failure(
                MODE,
                "http_forbidden",
                format!("Probe of {url} returned 403"),
            ),
            404 => ExecutorOutcome::failure(
                MODE,
                "http_not_found",
                format!("Probe of {url} returned 404"),
            ),
            code => ExecutorOutcome::failure(
                MODE,
                "http_unexpected_status",
                format!("Probe of {url} returned unexpected status {code}"),
            ),
        }
    }
}
