//! # Coordinator HTTP Client
//!
//! Bearer-authenticated JSON client for the control plane. Error bodies
//! from the coordinator (`{"error": {"code", "message"}}`) are decoded
//! into [`ClientError::Api`] so subcommands can print the coordinator's
//! own message rather than a bare status code.

use serde_json::Value;
use url::Url;

/// Errors from CLI → coordinator calls.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// The coordinator URL did not parse.
    #[error("invalid coordinator URL: {0}")]
    Url(#[from] url::ParseError),
    /// Transport-level failure (connection refused, timeout, …).
    #[error("could not reach coordinator: {0}")]
    Http(#[from] reqwest::Error),
    /// The coordinator answered with an error envelope.
    #[error("{code}: {message}")]
    Api {
        /// HTTP status.
        status: u16,
        /// Machine-readable error code.
        code: String,
        /// Human-readable message.
        message: String,
    },
}

/// JSON client bound to one coordinator.
#[derive(Debug, Clone)]
pub struct CoordinatorClient {
    http: reqwest::Client,
    base: Url,
    token: Option<String>,
}

impl CoordinatorClient {
    /// Build a client for `base` (e.g. `http://127.0.0.1:8440`).
    pub fn new(base: &str, token: Option<String>) -> Result<Self, ClientError> {
        Ok(Self {
            http: reqwest::Client::new(),
            base: Url::parse(base)?,
            token,
        })
    }

    /// GET a JSON document.
    pub async fn get_json(&self, path: &str) -> Result<Value, ClientError> {
        let url = self.base.join(path)?;
        let mut request = self.http.get(url);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }
        decode_response(request.send().await?).await
    }

    /// POST a JSON document and return the JSON response.
    pub async fn post_json(&self, path: &str, body: &Value) -> Result<Value, ClientError> {
        let url = self.base.join(path)?;
        let mut request = self.http.post(url).json(body);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }
        decode_response(request.send().await?).await
    }
}

async fn decode_response(response: reqwest::Response) -> Result<Value, ClientError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response.json().await?);
    }

    // Try the coordinator's error envelope; fall back to the raw body.
    let status_code = status.as_u16();
    let body: Value = response.json().await.unwrap_or(Value::Null);
    let code = body["error"]["code"]
        .as_str()
        .unwrap_or("HTTP_ERROR")
        .to_string();
    let message = body["error"]["message"]
        .as_str()
        .map(str::to_string)
        .unwrap_or_else(|| format!("coordinator returned HTTP {status_code}"));
    Err(ClientError::Api {
        status: status_code,
        code,
        message,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_malformed_base_url() {
        assert!(CoordinatorClient::new("not a url", None).is_err());
    }

    #[test]
    fn accepts_plain_http_base() {
        assert!(CoordinatorClient::new("http://127.0.0.1:8440", None).is_ok());
    }

    #[tokio::test]
    async fn unreachable_coordinator_is_a_transport_error() {
        // Port 1 is never listening.
        let client = CoordinatorClient::new("http://127.0.0.1:1", None).unwrap();
        let err = client.get_json("/v1/tree").await.unwrap_err();
        assert!(matches!(err, ClientError::Http(_)));
    }
}
