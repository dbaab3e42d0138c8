use async_trait::async_trait;
use lettre::message::{Mailbox, header::ContentType};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use std::time::Duration;
use tracing::debug;

use super::{EmailMessage, EmailSender, SenderError};
use crate::notifications::models::{
    DEFAULT_MESSAGE_TEMPLATE, DEFAULT_TITLE_TEMPLATE, EmailSpec, TlsMode,
};
use crate::notifications::template::{TemplateContext, render};

const SMTP_TIMEOUT: Duration = Duration::from_secs(15);

/// Renders subject and body of `spec` against `context`.
pub fn render_message(spec: &EmailSpec, context: &TemplateContext) -> EmailMessage {
    EmailMessage {
        subject: render(spec.subject.as_deref().unwrap_or(DEFAULT_TITLE_TEMPLATE), context),
        body: render(spec.body.as_deref().unwrap_or(DEFAULT_MESSAGE_TEMPLATE), context),
    }
}

/// Builds the MIME message; split out so it can be checked without a server.
pub fn build_message(spec: &EmailSpec, message: &EmailMessage) -> Result<Message, SenderError> {
    if spec.to.is_empty() {
        return Err(SenderError::InvalidConfiguration(
            "Email spec has no recipients.".to_string(),
        ));
    }

    let mut builder = Message::builder()
        .from(spec.from.parse::<Mailbox>()?)
        .subject(message.subject.clone())
        .header(ContentType::TEXT_PLAIN);
    for recipient in &spec.to {
        builder = builder.to(recipient.parse::<Mailbox>()?);
    }
    Ok(builder.body(message.body.clone())?)
}

fn transport(spec: &EmailSpec) -> Result<AsyncSmtpTransport<Tokio1Executor>, SenderError> {
    let builder = match spec.tls {
        TlsMode::None => AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&spec.server),
        TlsMode::Starttls => AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&spec.server)?,
        TlsMode::Tls => AsyncSmtpTransport::<Tokio1Executor>::relay(&spec.server)?,
    };
    let mut builder = builder.port(spec.port).timeout(Some(SMTP_TIMEOUT));
    if let (Some(username), Some(password)) = (&spec.username, &spec.password) {
        builder = builder.credentials(Credentials::new(username.clone(), password.clone()));
    }
    Ok(builder.build())
}

/// Sends email over SMTP. A fresh connection is opened per message.
#[derive(Debug, Default)]
pub struct SmtpEmailSender;

impl SmtpEmailSender {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl EmailSender for SmtpEmailSender {
    async fn send_email(&self, spec: &EmailSpec, message: &EmailMessage) -> Result<(), SenderError> {
        let email = build_message(spec, message)?;
        let mailer = transport(spec)?;
        let response = mailer.send(email).await?;
        if !response.is_positive() {
            return Err(SenderError::SendFailed(format!(
                "SMTP server answered {}",
                response.code()
            )));
        }
        debug!(server = %spec.server, recipients = spec.to.len(), "Email accepted by SMTP server.");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notifications::models::Direction;

    fn spec() -> EmailSpec {
        EmailSpec {
            server: "smtp.example.com".to_string(),
            port: 2525,
            tls: TlsMode::None,
            username: None,
            password: None,
            from: "Monitor <monitor@example.com>".to_string(),
            to: vec!["ops@example.com".to_string(), "oncall@example.com".to_string()],
            subject: Some("[{client}] {service} is {status}".to_string()),
            body: None,
        }
    }

    fn context() -> TemplateContext {
        TemplateContext {
            service: "db-01".to_string(),
            code: "-1".to_string(),
            message: "Port 22 error: connection refused".to_string(),
            client: "phoenix3".to_string(),
            status: Direction::Error,
        }
    }

    #[test]
    fn test_render_message() {
        let message = render_message(&spec(), &context());
        assert_eq!(message.subject, "[phoenix3] db-01 is ERROR");
        assert_eq!(message.body, "-1 Port 22 error: connection refused (phoenix3)");
    }

    #[test]
    fn test_build_message_includes_all_recipients() {
        let message = render_message(&spec(), &context());
        let email = build_message(&spec(), &message).unwrap();
        let raw = String::from_utf8(email.formatted()).unwrap();
        assert!(raw.contains("ops@example.com"));
        assert!(raw.contains("oncall@example.com"));
        assert!(raw.contains("Subject: [phoenix3] db-01 is ERROR"));
    }

    #[test]
    fn test_build_message_rejects_bad_addresses() {
        let mut bad_from = spec();
        bad_from.from = "not an address".to_string();
        let message = render_message(&bad_from, &context());
        assert!(matches!(build_message(&bad_from, &message), Err(SenderError::Address(_))));

        let mut no_recipients = spec();
        no_recipients.to.clear();
        assert!(matches!(
            build_message(&no_recipients, &message),
            Err(SenderError::InvalidConfiguration(_))
        ));
    }

    #[tokio::test]
    async fn test_unreachable_server_is_an_error() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let mut spec = spec();
        spec.server = "127.0.0.1".to_string();
        spec.port = port;
        let message = render_message(&spec, &context());

        let err = SmtpEmailSender::new().send_email(&spec, &message).await.unwrap_err();
        assert!(matches!(err, SenderError::Smtp(_)));
    }
}
