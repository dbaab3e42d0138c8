//! Health probes for monitored services.
//!
//! Every probe failure (refused connection, timeout, unreadable body) is
//! folded into an unhealthy [`ProbeResult`] here, so nothing downstream has
//! to tell "the probe broke" apart from "the service is down".
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

pub mod http;
pub mod ssh;

/// Code reported by a probe: an HTTP status, a timeout in milliseconds,
/// `-1` for transport errors, or a free-form string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ProbeCode {
    Number(i64),
    Text(String),
}

impl ProbeCode {
    pub const TRANSPORT_ERROR: ProbeCode = ProbeCode::Number(-1);

    /// Parses a code written as plain text (legacy status files).
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        match trimmed.parse::<i64>() {
            Ok(n) => ProbeCode::Number(n),
            Err(_) => ProbeCode::Text(trimmed.to_string()),
        }
    }
}

impl fmt::Display for ProbeCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProbeCode::Number(n) => write!(f, "{n}"),
            ProbeCode::Text(s) => f.write_str(s),
        }
    }
}

impl From<i64> for ProbeCode {
    fn from(value: i64) -> Self {
        ProbeCode::Number(value)
    }
}

impl From<u16> for ProbeCode {
    fn from(value: u16) -> Self {
        ProbeCode::Number(value as i64)
    }
}

/// Outcome of a single check. Produced fresh on every run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeResult {
    pub healthy: bool,
    pub code: ProbeCode,
    pub message: String,
    pub timestamp: DateTime<Utc>,
}

impl ProbeResult {
    pub fn healthy(code: impl Into<ProbeCode>, message: impl Into<String>) -> Self {
        Self {
            healthy: true,
            code: code.into(),
            message: message.into(),
            timestamp: Utc::now(),
        }
    }

    pub fn unhealthy(code: impl Into<ProbeCode>, message: impl Into<String>) -> Self {
        Self {
            healthy: false,
            code: code.into(),
            message: message.into(),
            timestamp: Utc::now(),
        }
    }

    pub fn at(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }
}

/// Failures raised inside a probe before they are folded into a result.
#[derive(Error, Debug)]
pub enum ProbeError {
    #[error("Timeout")]
    Timeout { timeout_ms: u64 },
    #[error("Error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Port {port} error: {source}")]
    Connect {
        port: u16,
        #[source]
        source: std::io::Error,
    },
}

impl From<ProbeError> for ProbeResult {
    fn from(err: ProbeError) -> Self {
        let code = match &err {
            ProbeError::Timeout { timeout_ms } => ProbeCode::Number(*timeout_ms as i64),
            ProbeError::Http(_) | ProbeError::Connect { .. } => ProbeCode::TRANSPORT_ERROR,
        };
        ProbeResult::unhealthy(code, err.to_string())
    }
}

/// What to check for one service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServiceTarget {
    Http(http::HttpCheck),
    Ssh(ssh::SshCheck),
}

impl ServiceTarget {
    pub fn kind(&self) -> &'static str {
        match self {
            ServiceTarget::Http(_) => "http",
            ServiceTarget::Ssh(_) => "ssh",
        }
    }

    /// Human readable location (URL or host:port) used in logs.
    pub fn location(&self) -> String {
        match self {
            ServiceTarget::Http(check) => check.url.clone(),
            ServiceTarget::Ssh(check) => format!("{}:{}", check.host, check.port),
        }
    }
}

#[async_trait]
pub trait Prober {
    /// Runs one check. Never fails: errors become an unhealthy result.
    async fn probe(&self, target: &ServiceTarget, timeout: Duration) -> ProbeResult;
}

#[async_trait]
impl<P: Prober + Send + Sync + ?Sized> Prober for Arc<P> {
    async fn probe(&self, target: &ServiceTarget, timeout: Duration) -> ProbeResult {
        (**self).probe(target, timeout).await
    }
}

/// Prober backed by real network I/O.
pub struct NetworkProber {
    client: reqwest::Client,
}

impl Default for NetworkProber {
    fn default() -> Self {
        Self::new()
    }
}

impl NetworkProber {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::builder()
                .user_agent(crate::version::user_agent())
                .build()
                .unwrap_or_default(),
        }
    }
}

#[async_trait]
impl Prober for NetworkProber {
    async fn probe(&self, target: &ServiceTarget, timeout: Duration) -> ProbeResult {
        let outcome = match target {
            ServiceTarget::Http(check) => http::run_http_check(&self.client, check, timeout).await,
            ServiceTarget::Ssh(check) => ssh::run_ssh_check(check, timeout).await,
        };
        outcome.unwrap_or_else(ProbeResult::from)
    }
}
