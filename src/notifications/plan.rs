use super::models::{Channel, Direction, EmailSpec, NotificationPlan, WebhookSpec};
use crate::alerting::decision::Classification;
use crate::probes::ProbeResult;

/// A spec together with the name it was configured under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Named<T> {
    pub name: String,
    pub spec: T,
}

impl<T> Named<T> {
    pub fn new(name: impl Into<String>, spec: T) -> Self {
        Self {
            name: name.into(),
            spec,
        }
    }
}

/// Channels a service asked for explicitly, already resolved against the
/// global webhook and email tables.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChannelRouting {
    pub ok_webhook: Option<Named<WebhookSpec>>,
    pub error_webhook: Option<Named<WebhookSpec>>,
    pub email: Option<Named<EmailSpec>>,
}

impl ChannelRouting {
    pub fn has_override(&self) -> bool {
        self.ok_webhook.is_some() || self.error_webhook.is_some() || self.email.is_some()
    }

    fn webhook_for(&self, direction: Direction) -> Option<&Named<WebhookSpec>> {
        match direction {
            Direction::Ok => self.ok_webhook.as_ref(),
            Direction::Error => self.error_webhook.as_ref(),
        }
    }
}

pub const DEFAULT_EMAIL_NAME: &str = "default";

/// Turns classifications into notification plans.
#[derive(Debug, Clone, Default)]
pub struct PlanBuilder {
    /// Also notify on the very first observation of a service.
    pub notify_on_baseline: bool,
    /// Global email, used by services without any channel override.
    pub default_email: Option<EmailSpec>,
    /// Webhook used in both directions by services that name no webhook.
    pub default_webhook: Option<Named<WebhookSpec>>,
}

impl PlanBuilder {
    pub fn new(notify_on_baseline: bool) -> Self {
        Self {
            notify_on_baseline,
            ..Self::default()
        }
    }

    /// Returns `None` when the run must stay silent. A returned plan may
    /// still have no channels if nothing is configured for its direction.
    pub fn build(
        &self,
        service_id: &str,
        routing: &ChannelRouting,
        classification: Classification,
        probe: &ProbeResult,
    ) -> Option<NotificationPlan> {
        let direction = match classification {
            Classification::Transition(direction) => direction,
            Classification::Baseline if self.notify_on_baseline => Direction::from_healthy(probe.healthy),
            Classification::Baseline | Classification::Unchanged => return None,
        };

        let mut channels = Vec::new();

        let names_no_webhook = routing.ok_webhook.is_none() && routing.error_webhook.is_none();
        let webhook = routing.webhook_for(direction).or(if names_no_webhook {
            self.default_webhook.as_ref()
        } else {
            None
        });
        if let Some(hook) = webhook {
            channels.push(Channel::Webhook {
                name: hook.name.clone(),
                spec: hook.spec.clone(),
            });
        }

        // Email goes out alongside any webhook, never instead of it.
        if let Some(email) = &routing.email {
            channels.push(Channel::Email {
                name: email.name.clone(),
                spec: email.spec.clone(),
            });
        } else if !routing.has_override() {
            if let Some(spec) = &self.default_email {
                channels.push(Channel::Email {
                    name: DEFAULT_EMAIL_NAME.to_string(),
                    spec: spec.clone(),
                });
            }
        }

        Some(NotificationPlan {
            service_id: service_id.to_string(),
            direction,
            code: probe.code.clone(),
            message: probe.message.clone(),
            channels,
        })
    }
}
