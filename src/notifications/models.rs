use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::probes::ProbeCode;

pub const PUSHOVER_API_URL: &str = "https://api.pushover.net/1/messages.json";
pub const DEFAULT_TITLE_TEMPLATE: &str = "{service} {status}";
pub const DEFAULT_MESSAGE_TEMPLATE: &str = "{code} {message} ({client})";

/// Which way a service's health moved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Direction {
    Ok,
    Error,
}

impl Direction {
    pub fn from_healthy(healthy: bool) -> Self {
        if healthy { Direction::Ok } else { Direction::Error }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Ok => "OK",
            Direction::Error => "ERROR",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    Get,
    #[default]
    Post,
    Put,
}

/// A named webhook, selected per service through `ok_webhook` / `error_webhook`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", deny_unknown_fields)]
pub enum WebhookSpec {
    Http {
        url: String,
        #[serde(default)]
        method: HttpMethod,
        #[serde(default)]
        headers: BTreeMap<String, String>,
        /// Body template for POST/PUT. A JSON summary is sent when absent.
        #[serde(default)]
        body: Option<String>,
    },
    Pushover {
        token: String,
        user: String,
        #[serde(default)]
        title: Option<String>,
        #[serde(default)]
        message: Option<String>,
        #[serde(default)]
        priority: Option<i8>,
        #[serde(default = "default_pushover_url")]
        api_url: String,
    },
}

fn default_pushover_url() -> String {
    PUSHOVER_API_URL.to_string()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TlsMode {
    None,
    #[default]
    Starttls,
    Tls,
}

/// SMTP delivery settings plus the message templates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EmailSpec {
    pub server: String,
    #[serde(default = "default_smtp_port")]
    pub port: u16,
    #[serde(default)]
    pub tls: TlsMode,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    pub from: String,
    pub to: Vec<String>,
    #[serde(default)]
    pub subject: Option<String>,
    #[serde(default)]
    pub body: Option<String>,
}

fn default_smtp_port() -> u16 {
    587
}

/// One delivery target in a plan, carrying its resolved spec.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Channel {
    Webhook { name: String, spec: WebhookSpec },
    Email { name: String, spec: EmailSpec },
}

impl Channel {
    pub fn kind(&self) -> &'static str {
        match self {
            Channel::Webhook { .. } => "webhook",
            Channel::Email { .. } => "email",
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Channel::Webhook { name, .. } | Channel::Email { name, .. } => name,
        }
    }
}

/// What to tell whom about one service in one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationPlan {
    pub service_id: String,
    pub direction: Direction,
    pub code: ProbeCode,
    pub message: String,
    pub channels: Vec<Channel>,
}

impl NotificationPlan {
    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }
}
