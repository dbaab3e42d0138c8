use std::sync::Arc;
use tracing::{error, info};

use super::models::{Channel, NotificationPlan};
use super::senders::{EmailSender, SenderError, WebhookSender, email, webhook};
use super::template::TemplateContext;

/// Result of one channel delivery attempt.
#[derive(Debug)]
pub struct ChannelOutcome {
    pub kind: &'static str,
    pub name: String,
    pub result: Result<(), SenderError>,
}

impl ChannelOutcome {
    pub fn is_success(&self) -> bool {
        self.result.is_ok()
    }
}

/// Delivers notification plans through the configured senders.
pub struct Dispatcher {
    webhook_sender: Arc<dyn WebhookSender>,
    email_sender: Arc<dyn EmailSender>,
    client_name: String,
}

impl Dispatcher {
    pub fn new(
        webhook_sender: Arc<dyn WebhookSender>,
        email_sender: Arc<dyn EmailSender>,
        client_name: impl Into<String>,
    ) -> Self {
        Self {
            webhook_sender,
            email_sender,
            client_name: client_name.into(),
        }
    }

    /// Attempts every channel of the plan once, in order. A failing channel
    /// never stops the remaining ones.
    pub async fn dispatch(&self, plan: &NotificationPlan) -> Vec<ChannelOutcome> {
        let context = TemplateContext::for_plan(plan, &self.client_name);
        let mut outcomes = Vec::with_capacity(plan.channels.len());

        for channel in &plan.channels {
            let result = match channel {
                Channel::Webhook { spec, .. } => {
                    let request = webhook::render_request(spec, &context);
                    self.webhook_sender.send_webhook(&request).await
                }
                Channel::Email { spec, .. } => {
                    let message = email::render_message(spec, &context);
                    self.email_sender.send_email(spec, &message).await
                }
            };

            match &result {
                Ok(()) => info!(
                    service = %plan.service_id,
                    channel = channel.kind(),
                    name = channel.name(),
                    direction = %plan.direction,
                    "Notification sent."
                ),
                Err(e) => error!(
                    service = %plan.service_id,
                    channel = channel.kind(),
                    name = channel.name(),
                    error = %e,
                    "Failed to send notification."
                ),
            }

            outcomes.push(ChannelOutcome {
                kind: channel.kind(),
                name: channel.name().to_string(),
                result,
            });
        }

        outcomes
    }
}
