use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use super::{StateError, StateRecord, StateStore};

/// In-process store for tests and dry runs. Individual services can be
/// made to fail reads or writes.
#[derive(Debug, Default)]
pub struct MemoryStateStore {
    records: Mutex<HashMap<String, StateRecord>>,
    failing_reads: Mutex<HashSet<String>>,
    failing_writes: Mutex<HashSet<String>>,
}

impl MemoryStateStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_record(self, record: StateRecord) -> Self {
        self.lock_records().insert(record.service_id.clone(), record);
        self
    }

    pub fn fail_reads_for(&self, service_id: &str) {
        lock(&self.failing_reads).insert(service_id.to_string());
    }

    pub fn fail_writes_for(&self, service_id: &str) {
        lock(&self.failing_writes).insert(service_id.to_string());
    }

    pub fn clear_failures(&self) {
        lock(&self.failing_reads).clear();
        lock(&self.failing_writes).clear();
    }

    pub fn get(&self, service_id: &str) -> Option<StateRecord> {
        self.lock_records().get(service_id).cloned()
    }

    pub fn len(&self) -> usize {
        self.lock_records().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock_records(&self) -> std::sync::MutexGuard<'_, HashMap<String, StateRecord>> {
        lock(&self.records)
    }

    fn injected(service_id: &str, op: &str) -> StateError {
        StateError::Io {
            service_id: service_id.to_string(),
            source: std::io::Error::other(format!("injected {op} failure")),
        }
    }
}

// A poisoned lock only means a test panicked mid-update; the map is still usable.
fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl StateStore for MemoryStateStore {
    fn read(&self, service_id: &str) -> Result<Option<StateRecord>, StateError> {
        if lock(&self.failing_reads).contains(service_id) {
            return Err(Self::injected(service_id, "read"));
        }
        Ok(self.get(service_id))
    }

    fn write(&self, record: &StateRecord) -> Result<(), StateError> {
        if lock(&self.failing_writes).contains(&record.service_id) {
            return Err(Self::injected(&record.service_id, "write"));
        }
        self.lock_records()
            .insert(record.service_id.clone(), record.clone());
        Ok(())
    }

    fn invalidate(&self, service_id: &str) -> Result<(), StateError> {
        self.lock_records().remove(service_id);
        Ok(())
    }
}
