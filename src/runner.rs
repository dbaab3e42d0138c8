//! One monitoring pass over every configured service.
//!
//! Services are handled strictly one after another. Whatever goes wrong for
//! one service (bad config, unreadable state, failed delivery) is recorded
//! in its report and the pass moves on to the next.
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::alerting::decision::{Classification, DecisionEngine, Evaluation};
use crate::config::{ConfigError, MonitorConfig, ServiceDefinition};
use crate::notifications::dispatcher::{ChannelOutcome, Dispatcher};
use crate::notifications::models::NotificationPlan;
use crate::notifications::plan::PlanBuilder;
use crate::notifications::senders::email::SmtpEmailSender;
use crate::notifications::senders::webhook::HttpWebhookSender;
use crate::probes::{NetworkProber, ProbeResult, Prober};
use crate::state::{FileStateStore, StateStore};

#[derive(Debug)]
pub enum ServiceStatus {
    /// Not probed because its configuration is invalid.
    Skipped(ConfigError),
    Checked {
        probe: ProbeResult,
        evaluation: Evaluation,
        plan: Option<NotificationPlan>,
        deliveries: Vec<ChannelOutcome>,
    },
}

#[derive(Debug)]
pub struct ServiceReport {
    pub service_id: String,
    pub status: ServiceStatus,
}

impl ServiceReport {
    pub fn classification(&self) -> Option<Classification> {
        match &self.status {
            ServiceStatus::Checked { evaluation, .. } => Some(evaluation.classification()),
            ServiceStatus::Skipped(_) => None,
        }
    }

    pub fn plan(&self) -> Option<&NotificationPlan> {
        match &self.status {
            ServiceStatus::Checked { plan, .. } => plan.as_ref(),
            ServiceStatus::Skipped(_) => None,
        }
    }

    pub fn deliveries(&self) -> &[ChannelOutcome] {
        match &self.status {
            ServiceStatus::Checked { deliveries, .. } => deliveries,
            ServiceStatus::Skipped(_) => &[],
        }
    }
}

#[derive(Debug, Default)]
pub struct RunReport {
    pub services: Vec<ServiceReport>,
}

impl RunReport {
    pub fn service(&self, service_id: &str) -> Option<&ServiceReport> {
        self.services.iter().find(|s| s.service_id == service_id)
    }

    pub fn checked(&self) -> usize {
        self.services.iter().filter(|s| s.classification().is_some()).count()
    }

    pub fn skipped(&self) -> usize {
        self.services.len() - self.checked()
    }

    pub fn transitions(&self) -> usize {
        self.services
            .iter()
            .filter(|s| matches!(s.classification(), Some(Classification::Transition(_))))
            .count()
    }

    /// Plans that had at least one channel to deliver to.
    pub fn notifications(&self) -> usize {
        self.services
            .iter()
            .filter(|s| s.plan().is_some_and(|p| !p.is_empty()))
            .count()
    }

    pub fn failed_deliveries(&self) -> usize {
        self.services
            .iter()
            .flat_map(|s| s.deliveries())
            .filter(|d| !d.is_success())
            .count()
    }

    pub fn state_errors(&self) -> usize {
        self.services
            .iter()
            .filter(|s| match &s.status {
                ServiceStatus::Checked { evaluation, .. } => {
                    evaluation.read_error.is_some() || evaluation.write_error.is_some()
                }
                ServiceStatus::Skipped(_) => false,
            })
            .count()
    }
}

pub struct Runner<P, S> {
    prober: P,
    engine: DecisionEngine<S>,
    planner: PlanBuilder,
    dispatcher: Dispatcher,
}

impl Runner<NetworkProber, FileStateStore> {
    /// Production wiring: network probes, file state, HTTP and SMTP senders.
    pub fn from_config(config: &MonitorConfig) -> Self {
        let dispatcher = Dispatcher::new(
            Arc::new(HttpWebhookSender::new()),
            Arc::new(SmtpEmailSender::new()),
            config.settings.client_name.clone(),
        );
        Runner::new(
            NetworkProber::new(),
            FileStateStore::new(&config.settings.status_dir),
            config.plan_builder(),
            dispatcher,
        )
    }
}

impl<P: Prober, S: StateStore> Runner<P, S> {
    pub fn new(prober: P, store: S, planner: PlanBuilder, dispatcher: Dispatcher) -> Self {
        Self {
            prober,
            engine: DecisionEngine::new(store),
            planner,
            dispatcher,
        }
    }

    pub fn store(&self) -> &S {
        self.engine.store()
    }

    pub async fn run(&self, services: Vec<Result<ServiceDefinition, ConfigError>>) -> RunReport {
        info!(services = services.len(), "Starting monitoring run.");
        let mut report = RunReport::default();

        for (index, entry) in services.into_iter().enumerate() {
            let service_report = match entry {
                Ok(service) => self.run_service(&service).await,
                Err(e) => {
                    let service_id = e
                        .service_id()
                        .map(str::to_string)
                        .unwrap_or_else(|| format!("#{index}"));
                    error!(service = %service_id, error = %e, "Skipping service with invalid configuration.");
                    ServiceReport {
                        service_id,
                        status: ServiceStatus::Skipped(e),
                    }
                }
            };
            report.services.push(service_report);
        }

        info!(
            checked = report.checked(),
            skipped = report.skipped(),
            transitions = report.transitions(),
            notifications = report.notifications(),
            failed_deliveries = report.failed_deliveries(),
            state_errors = report.state_errors(),
            "Monitoring run finished."
        );
        report
    }

    pub async fn run_service(&self, service: &ServiceDefinition) -> ServiceReport {
        let probe = self.prober.probe(&service.target, service.timeout).await;
        info!(
            service = %service.id,
            kind = service.target.kind(),
            target = %service.target.location(),
            healthy = probe.healthy,
            code = %probe.code,
            message = %probe.message,
            "Check completed."
        );

        let evaluation = self.engine.evaluate(&service.id, &probe);
        let plan = self
            .planner
            .build(&service.id, &service.routing, evaluation.classification(), &probe);

        let deliveries = match &plan {
            Some(plan) if plan.is_empty() => {
                warn!(service = %service.id, direction = %plan.direction, "Status changed but no notification channel is configured.");
                Vec::new()
            }
            Some(plan) => self.dispatcher.dispatch(plan).await,
            None => Vec::new(),
        };

        ServiceReport {
            service_id: service.id.clone(),
            status: ServiceStatus::Checked {
                probe,
                evaluation,
                plan,
                deliveries,
            },
        }
    }
}
