use async_trait::async_trait;
use std::collections::BTreeMap;
use thiserror::Error;

use super::models::{EmailSpec, HttpMethod};

pub mod email;
pub mod webhook;

#[derive(Error, Debug)]
pub enum SenderError {
    #[error("Failed to send notification: {0}")]
    SendFailed(String),
    #[error("Invalid configuration for sender: {0}")]
    InvalidConfiguration(String),
    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),
    #[error("Invalid email address: {0}")]
    Address(#[from] lettre::address::AddressError),
    #[error("Failed to build email: {0}")]
    EmailBuild(#[from] lettre::error::Error),
    #[error("SMTP error: {0}")]
    Smtp(#[from] lettre::transport::smtp::Error),
}

/// Payload of a rendered webhook call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WebhookBody {
    Json(String),
    Form(Vec<(String, String)>),
}

/// A webhook call with every template already rendered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WebhookRequest {
    pub url: String,
    pub method: HttpMethod,
    pub headers: BTreeMap<String, String>,
    pub body: Option<WebhookBody>,
}

/// A rendered email; delivery settings come from the [`EmailSpec`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailMessage {
    pub subject: String,
    pub body: String,
}

/// Delivers rendered webhook calls. One attempt, no retry.
#[async_trait]
pub trait WebhookSender: Send + Sync {
    async fn send_webhook(&self, request: &WebhookRequest) -> Result<(), SenderError>;
}

/// Delivers rendered emails. One attempt, no retry.
#[async_trait]
pub trait EmailSender: Send + Sync {
    async fn send_email(&self, spec: &EmailSpec, message: &EmailMessage) -> Result<(), SenderError>;
}
