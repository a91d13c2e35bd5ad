use thiserror::Error;

use crate::credentials::CredentialError;

/// Errors raised by the Slack client core.
///
/// Every variant is terminal for the command that hit it. Identity lookups
/// while formatting never produce one of these; they degrade to raw IDs.
#[derive(Error, Debug)]
pub enum SlackError {
    /// Network-level failure: connection, timeout, body read.
    #[error("HTTP request failed: {0}")]
    Transport(String),

    /// Every attempt was answered with HTTP 429.
    #[error("rate limited: max retries exceeded after {attempts} attempts")]
    RateLimitExceeded { attempts: u32 },

    /// The envelope came back with `ok: false`.
    #[error("slack API error: {message}")]
    Api { message: String },

    /// Non-2xx status other than 429.
    #[error("{method} failed with HTTP status {status}")]
    HttpStatus { method: String, status: u16 },

    #[error("parsing {method} response: {source}")]
    Decode {
        method: String,
        #[source]
        source: serde_json::Error,
    },

    /// A lookup ran against fetched data and found nothing.
    #[error("{kind} not found: {query}")]
    NotFound { kind: &'static str, query: String },

    #[error(
        "unrecognized time format: {0} (use 2024-01-15, 2024-01-15T14:00, \"2024-01-15 14:00\", 14:00, 1h, 2d, or unix timestamp)"
    )]
    UnrecognizedFormat(String),

    /// Mutually exclusive options were supplied together.
    #[error("{0}")]
    UsageConflict(String),

    #[error("not a valid Slack permalink: {0}")]
    InvalidPermalink(String),

    #[error("no token found. Run: slk auth <your-token>")]
    NoToken,

    #[error(transparent)]
    Credential(#[from] CredentialError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl SlackError {
    pub fn not_found(kind: &'static str, query: impl Into<String>) -> Self {
        SlackError::NotFound {
            kind,
            query: query.into(),
        }
    }
}

impl From<reqwest::Error> for SlackError {
    fn from(error: reqwest::Error) -> Self {
        SlackError::Transport(error.to_string())
    }
}

pub type Result<T> = std::result::Result<T, SlackError>;
