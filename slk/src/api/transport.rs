use async_trait::async_trait;
use log::{debug, warn};
use reqwest::{Client, header};
use serde::de::DeserializeOwned;
use std::time::Duration;

use crate::error::{Result, SlackError};
use crate::models::Envelope;

pub const DEFAULT_API_URL: &str = "https://slack.com/api";

/// Total attempts for one call, the first one included.
pub const MAX_ATTEMPTS: u32 = 5;

/// Form parameters of one API call, encoded in order.
pub type Params = Vec<(&'static str, String)>;

/// What the transport needs to know about one HTTP exchange.
#[derive(Debug, Clone)]
pub struct RawResponse {
    pub status: u16,
    pub retry_after: Option<u64>,
    pub body: Vec<u8>,
}

impl RawResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Issues a single form-encoded POST. Retries and envelope checks live in
/// [`Transport`], so implementations only move bytes.
#[async_trait]
pub trait HttpSender: Send + Sync {
    async fn post_form(&self, method: &str, body: &str) -> Result<RawResponse>;
}

pub struct ReqwestSender {
    client: Client,
    base_url: String,
}

impl ReqwestSender {
    pub fn new(base_url: &str, token: &str) -> Result<Self> {
        let mut headers = header::HeaderMap::new();
        let bearer = header::HeaderValue::from_str(&format!("Bearer {}", token))
            .map_err(|_| SlackError::Transport("token is not a valid header value".to_string()))?;
        headers.insert(header::AUTHORIZATION, bearer);

        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .default_headers(headers)
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// The underlying client, bearer header included.
    pub fn http(&self) -> &Client {
        &self.client
    }
}

#[async_trait]
impl HttpSender for ReqwestSender {
    async fn post_form(&self, method: &str, body: &str) -> Result<RawResponse> {
        let url = format!("{}/{}", self.base_url, method);
        let response = self
            .client
            .post(&url)
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(body.to_string())
            .send()
            .await?;

        let status = response.status().as_u16();
        let retry_after = parse_retry_after(response.headers());
        let body = response.bytes().await?.to_vec();

        Ok(RawResponse {
            status,
            retry_after,
            body,
        })
    }
}

pub fn parse_retry_after(headers: &header::HeaderMap) -> Option<u64> {
    headers
        .get(header::RETRY_AFTER)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.trim().parse::<u64>().ok())
}

pub fn encode_form(params: &[(&str, String)]) -> String {
    params
        .iter()
        .map(|(key, value)| format!("{}={}", urlencoding::encode(key), urlencoding::encode(value)))
        .collect::<Vec<_>>()
        .join("&")
}

/// Wait before the next attempt once `attempt` (counted from 0) got a 429.
/// A missing or zero `Retry-After` falls back to `2^attempt` units.
pub fn backoff_delay(unit: Duration, attempt: u32, retry_after: Option<u64>) -> Duration {
    let units = match retry_after {
        Some(seconds) if seconds > 0 => seconds,
        _ => 1u64 << attempt.min(16),
    };
    unit.saturating_mul(u32::try_from(units).unwrap_or(u32::MAX))
}

pub struct Transport<S> {
    sender: S,
    backoff_unit: Duration,
    max_attempts: u32,
}

impl<S: HttpSender> Transport<S> {
    pub fn new(sender: S) -> Self {
        Self {
            sender,
            backoff_unit: Duration::from_secs(1),
            max_attempts: MAX_ATTEMPTS,
        }
    }

    /// Scale of one backoff step. Production uses one second.
    pub fn with_backoff_unit(mut self, unit: Duration) -> Self {
        self.backoff_unit = unit;
        self
    }

    pub fn sender(&self) -> &S {
        &self.sender
    }

    /// Calls `method` and returns the raw body of a successful envelope.
    pub async fn post(&self, method: &str, params: &[(&str, String)]) -> Result<Vec<u8>> {
        // encoded once so every retry replays the same bytes
        let body = encode_form(params);

        for attempt in 0..self.max_attempts {
            debug!(
                "POST {} (attempt {}/{}): {}",
                method,
                attempt + 1,
                self.max_attempts,
                shorten(&body)
            );
            let response = self.sender.post_form(method, &body).await?;

            if response.status == 429 {
                if attempt + 1 < self.max_attempts {
                    let delay = backoff_delay(self.backoff_unit, attempt, response.retry_after);
                    warn!("{} rate limited, retrying in {:?}", method, delay);
                    tokio::time::sleep(delay).await;
                }
                continue;
            }

            if !response.is_success() {
                return Err(SlackError::HttpStatus {
                    method: method.to_string(),
                    status: response.status,
                });
            }

            let envelope: Envelope = decode(method, &response.body)?;
            if !envelope.ok {
                return Err(SlackError::Api {
                    message: envelope.error.unwrap_or_else(|| "unknown error".to_string()),
                });
            }

            return Ok(response.body);
        }

        Err(SlackError::RateLimitExceeded {
            attempts: self.max_attempts,
        })
    }

    pub async fn call<T: DeserializeOwned>(
        &self,
        method: &str,
        params: &[(&str, String)],
    ) -> Result<T> {
        let body = self.post(method, params).await?;
        decode(method, &body)
    }
}

pub(crate) fn decode<T: DeserializeOwned>(method: &str, body: &[u8]) -> Result<T> {
    serde_json::from_slice(body).map_err(|source| SlackError::Decode {
        method: method.to_string(),
        source,
    })
}

// form bodies are percent-encoded, so byte slicing stays on ASCII
fn shorten(body: &str) -> &str {
    if body.len() > 200 { &body[..200] } else { body }
}
