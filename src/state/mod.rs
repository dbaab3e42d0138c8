//! Last-known health per service, persisted between runs.
//!
//! Each invocation is a fresh process, so this is the only channel through
//! which one run learns what the previous run saw.
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;

use crate::probes::ProbeCode;

pub mod file_store;
pub mod memory_store;

pub use file_store::FileStateStore;
pub use memory_store::MemoryStateStore;

#[derive(Error, Debug)]
pub enum StateError {
    #[error("I/O error on state for '{service_id}': {source}")]
    Io {
        service_id: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Corrupted state record for '{service_id}': {reason}")]
    Corrupted { service_id: String, reason: String },
    #[error("Serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Persisted state of one service. At most one exists per service id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateRecord {
    pub service_id: String,
    pub last_code: ProbeCode,
    #[serde(default)]
    pub last_message: String,
    pub last_healthy: bool,
    /// When `last_healthy` last flipped (or was first observed).
    pub last_changed_at: DateTime<Utc>,
    pub last_checked_at: DateTime<Utc>,
}

/// Durable key-value mapping `service_id -> StateRecord`.
///
/// Implementations keep services independent: a broken record for one
/// service must never affect reads or writes of another.
pub trait StateStore {
    /// Returns `Ok(None)` for a service that was never written.
    fn read(&self, service_id: &str) -> Result<Option<StateRecord>, StateError>;

    /// Atomically replaces the record for `record.service_id`.
    fn write(&self, record: &StateRecord) -> Result<(), StateError>;

    /// Drops the record so the next run starts from a fresh baseline.
    fn invalidate(&self, service_id: &str) -> Result<(), StateError>;
}

impl<S: StateStore + ?Sized> StateStore for &S {
    fn read(&self, service_id: &str) -> Result<Option<StateRecord>, StateError> {
        (**self).read(service_id)
    }

    fn write(&self, record: &StateRecord) -> Result<(), StateError> {
        (**self).write(record)
    }

    fn invalidate(&self, service_id: &str) -> Result<(), StateError> {
        (**self).invalidate(service_id)
    }
}

impl<S: StateStore + ?Sized> StateStore for Box<S> {
    fn read(&self, service_id: &str) -> Result<Option<StateRecord>, StateError> {
        (**self).read(service_id)
    }

    fn write(&self, record: &StateRecord) -> Result<(), StateError> {
        (**self).write(record)
    }

    fn invalidate(&self, service_id: &str) -> Result<(), StateError> {
        (**self).invalidate(service_id)
    }
}

impl<S: StateStore + ?Sized> StateStore for Arc<S> {
    fn read(&self, service_id: &str) -> Result<Option<StateRecord>, StateError> {
        (**self).read(service_id)
    }

    fn write(&self, record: &StateRecord) -> Result<(), StateError> {
        (**self).write(record)
    }

    fn invalidate(&self, service_id: &str) -> Result<(), StateError> {
        (**self).invalidate(service_id)
    }
}
