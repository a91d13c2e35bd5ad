//! Token storage in the operating system's credential store, and the order in
//! which a token is looked up.

use log::{debug, info};
use std::fmt;
use std::io::Write;
use std::process::{Command, Stdio};
use thiserror::Error;

use crate::error::SlackError;

pub const SERVICE: &str = "slk";
pub const ACCOUNT: &str = "slack-token";
pub const TOKEN_ENV: &str = "SLACK_TOKEN";

#[derive(Error, Debug)]
pub enum CredentialError {
    #[error("no token stored in the {0}")]
    NotFound(&'static str),

    #[error("credential store unavailable: {0}")]
    Unavailable(String),

    #[error("`{program}` failed: {stderr}")]
    Command { program: String, stderr: String },
}

/// A secret slot keyed by service and account.
pub trait CredentialStore {
    /// Human-readable backend name, used in status output.
    fn name(&self) -> &'static str;
    fn get(&self) -> Result<String, CredentialError>;
    fn set(&self, secret: &str) -> Result<(), CredentialError>;
    fn delete(&self) -> Result<(), CredentialError>;
}

/// The platform's native store: Keychain on macOS, Secret Service on Linux.
#[derive(Debug, Clone)]
pub struct SystemStore {
    service: String,
    account: String,
}

impl Default for SystemStore {
    fn default() -> Self {
        Self::new(SERVICE, ACCOUNT)
    }
}

impl SystemStore {
    pub fn new(service: &str, account: &str) -> Self {
        Self {
            service: service.to_string(),
            account: account.to_string(),
        }
    }
}

#[cfg(target_os = "macos")]
impl CredentialStore for SystemStore {
    fn name(&self) -> &'static str {
        "macOS Keychain"
    }

    fn get(&self) -> Result<String, CredentialError> {
        let out = run_command(
            "security",
            &["find-generic-password", "-s", &self.service, "-a", &self.account, "-w"],
            None,
        )?;
        non_empty(out, self.name())
    }

    fn set(&self, secret: &str) -> Result<(), CredentialError> {
        run_command(
            "security",
            &[
                "add-generic-password",
                "-U",
                "-s",
                &self.service,
                "-a",
                &self.account,
                "-w",
                secret,
            ],
            None,
        )
        .map(|_| ())
    }

    fn delete(&self) -> Result<(), CredentialError> {
        run_command(
            "security",
            &["delete-generic-password", "-s", &self.service, "-a", &self.account],
            None,
        )
        .map(|_| ())
    }
}

#[cfg(target_os = "linux")]
impl CredentialStore for SystemStore {
    fn name(&self) -> &'static str {
        "Secret Service"
    }

    fn get(&self) -> Result<String, CredentialError> {
        let out = run_command(
            "secret-tool",
            &["lookup", "service", &self.service, "account", &self.account],
            None,
        )?;
        non_empty(out, self.name())
    }

    fn set(&self, secret: &str) -> Result<(), CredentialError> {
        // secret-tool reads the secret from stdin, keeping it off the argv
        run_command(
            "secret-tool",
            &[
                "store",
                "--label",
                &self.service,
                "service",
                &self.service,
                "account",
                &self.account,
            ],
            Some(secret),
        )
        .map(|_| ())
    }

    fn delete(&self) -> Result<(), CredentialError> {
        run_command(
            "secret-tool",
            &["clear", "service", &self.service, "account", &self.account],
            None,
        )
        .map(|_| ())
    }
}

#[cfg(not(any(target_os = "macos", target_os = "linux")))]
impl CredentialStore for SystemStore {
    fn name(&self) -> &'static str {
        "credential store"
    }

    fn get(&self) -> Result<String, CredentialError> {
        Err(unsupported())
    }

    fn set(&self, _secret: &str) -> Result<(), CredentialError> {
        Err(unsupported())
    }

    fn delete(&self) -> Result<(), CredentialError> {
        Err(unsupported())
    }
}

#[cfg(not(any(target_os = "macos", target_os = "linux")))]
fn unsupported() -> CredentialError {
    CredentialError::Unavailable(format!(
        "no supported credential store on this platform; set {} instead",
        TOKEN_ENV
    ))
}

#[cfg(any(target_os = "macos", target_os = "linux"))]
fn non_empty(out: String, store: &'static str) -> Result<String, CredentialError> {
    let token = out.trim();
    if token.is_empty() {
        Err(CredentialError::NotFound(store))
    } else {
        Ok(token.to_string())
    }
}

#[cfg(any(target_os = "macos", target_os = "linux"))]
fn run_command(
    program: &str,
    args: &[&str],
    stdin: Option<&str>,
) -> Result<String, CredentialError> {
    let mut child = Command::new(program)
        .args(args)
        .stdin(if stdin.is_some() { Stdio::piped() } else { Stdio::null() })
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|e| CredentialError::Unavailable(format!("cannot run `{}`: {}", program, e)))?;

    if let (Some(input), Some(mut pipe)) = (stdin, child.stdin.take()) {
        pipe.write_all(input.as_bytes())
            .map_err(|e| CredentialError::Unavailable(format!("writing to `{}`: {}", program, e)))?;
    }

    let output = child
        .wait_with_output()
        .map_err(|e| CredentialError::Unavailable(format!("waiting for `{}`: {}", program, e)))?;
    // argv may hold the secret, so only the subcommand is logged
    debug!("{} {:?}: status = {}", program, args.first(), output.status);

    if output.status.success() {
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    } else {
        Err(CredentialError::Command {
            program: program.to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenSource {
    Keychain,
    Env,
}

impl fmt::Display for TokenSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenSource::Keychain => write!(f, "keychain"),
            TokenSource::Env => write!(f, "env"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct TokenResult {
    pub token: String,
    pub source: TokenSource,
}

/// Credential store first, then `env_token`. Store failures are not errors
/// here; they only mean the next source is tried.
pub fn resolve_token(
    store: &dyn CredentialStore,
    env_token: Option<String>,
) -> Result<TokenResult, SlackError> {
    match store.get() {
        Ok(token) if !token.is_empty() => {
            info!("using token from {}", store.name());
            return Ok(TokenResult {
                token,
                source: TokenSource::Keychain,
            });
        }
        Ok(_) => {}
        Err(e) => debug!("{} lookup failed: {}", store.name(), e),
    }

    match env_token.filter(|t| !t.is_empty()) {
        Some(token) => {
            info!("using token from {}", TOKEN_ENV);
            Ok(TokenResult {
                token,
                source: TokenSource::Env,
            })
        }
        None => Err(SlackError::NoToken),
    }
}

/// [`resolve_token`] against the process environment.
pub fn get_token(store: &dyn CredentialStore) -> Result<TokenResult, SlackError> {
    resolve_token(store, std::env::var(TOKEN_ENV).ok())
}

/// First eight characters followed by `...`; short tokens are fully hidden.
pub fn mask_token(token: &str) -> String {
    if token.chars().count() <= 8 {
        return "****".to_string();
    }
    let prefix: String = token.chars().take(8).collect();
    format!("{}...", prefix)
}
