//! Classifies each run against the last known state of a service.
//!
//! Only the healthy flag decides whether something changed. A code moving
//! from 502 to 503 while the service stays down is not a transition.
use tracing::{debug, info, warn};

use crate::notifications::models::Direction;
use crate::probes::ProbeResult;
use crate::state::{StateError, StateRecord, StateStore};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    /// First observation; nothing to compare against.
    Baseline,
    /// The healthy flag flipped.
    Transition(Direction),
    Unchanged,
}

impl Classification {
    pub fn as_str(&self) -> &'static str {
        match self {
            Classification::Baseline => "baseline",
            Classification::Transition(Direction::Ok) => "transition_ok",
            Classification::Transition(Direction::Error) => "transition_error",
            Classification::Unchanged => "unchanged",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decision {
    pub classification: Classification,
    pub record: StateRecord,
}

/// Pure classification of `probe` against `prior`.
pub fn decide(service_id: &str, probe: &ProbeResult, prior: Option<&StateRecord>) -> Decision {
    let Some(prior) = prior else {
        return Decision {
            classification: Classification::Baseline,
            record: fresh_record(service_id, probe),
        };
    };

    if probe.healthy != prior.last_healthy {
        return Decision {
            classification: Classification::Transition(Direction::from_healthy(probe.healthy)),
            record: fresh_record(service_id, probe),
        };
    }

    // Same side of the boundary: keep when it flipped, refresh diagnostics.
    Decision {
        classification: Classification::Unchanged,
        record: StateRecord {
            service_id: service_id.to_string(),
            last_code: probe.code.clone(),
            last_message: probe.message.clone(),
            last_healthy: prior.last_healthy,
            last_changed_at: prior.last_changed_at,
            last_checked_at: probe.timestamp,
        },
    }
}

fn fresh_record(service_id: &str, probe: &ProbeResult) -> StateRecord {
    StateRecord {
        service_id: service_id.to_string(),
        last_code: probe.code.clone(),
        last_message: probe.message.clone(),
        last_healthy: probe.healthy,
        last_changed_at: probe.timestamp,
        last_checked_at: probe.timestamp,
    }
}

/// Result of evaluating one probe through the engine.
#[derive(Debug)]
pub struct Evaluation {
    pub decision: Decision,
    /// Prior state could not be read; the run was treated as a baseline.
    pub read_error: Option<StateError>,
    /// The new record could not be stored; the next run starts over.
    pub write_error: Option<StateError>,
}

impl Evaluation {
    pub fn classification(&self) -> Classification {
        self.decision.classification
    }
}

/// Reads prior state, classifies, and persists the updated record.
pub struct DecisionEngine<S> {
    store: S,
}

impl<S: StateStore> DecisionEngine<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn evaluate(&self, service_id: &str, probe: &ProbeResult) -> Evaluation {
        let (prior, read_error) = match self.store.read(service_id) {
            Ok(prior) => (prior, None),
            Err(e) => {
                warn!(service = %service_id, error = %e, "Failed to read prior state; treating run as baseline.");
                (None, Some(e))
            }
        };

        let decision = decide(service_id, probe, prior.as_ref());
        match decision.classification {
            Classification::Transition(direction) => info!(
                service = %service_id,
                direction = %direction,
                code = %probe.code,
                message = %probe.message,
                "Status changed."
            ),
            Classification::Baseline => info!(
                service = %service_id,
                healthy = probe.healthy,
                code = %probe.code,
                "Baseline established."
            ),
            Classification::Unchanged => debug!(service = %service_id, healthy = probe.healthy, "Status unchanged."),
        }

        let write_error = match self.store.write(&decision.record) {
            Ok(()) => None,
            Err(e) => {
                warn!(service = %service_id, error = %e, "Failed to persist state; next run will start from a fresh baseline.");
                if let Err(invalidate_err) = self.store.invalidate(service_id) {
                    warn!(service = %service_id, error = %invalidate_err, "Failed to invalidate stale state record.");
                }
                Some(e)
            }
        };

        Evaluation {
            decision,
            read_error,
            write_error,
        }
    }
}
