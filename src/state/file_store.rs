use chrono::{DateTime, Utc};
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::{debug, info};

use super::{StateError, StateRecord, StateStore};
use crate::probes::ProbeCode;

/// One JSON file per service under `status_dir`.
///
/// Files are replaced through a temp file and a rename, so overlapping cron
/// invocations never see a half-written record.
#[derive(Debug, Clone)]
pub struct FileStateStore {
    status_dir: PathBuf,
}

impl FileStateStore {
    pub fn new(status_dir: impl Into<PathBuf>) -> Self {
        Self {
            status_dir: status_dir.into(),
        }
    }

    pub fn status_dir(&self) -> &Path {
        &self.status_dir
    }

    pub fn record_path(&self, service_id: &str) -> PathBuf {
        self.status_dir.join(format!("{}.json", file_stem(service_id)))
    }

    /// Status file written by the previous Python monitor: just the last code.
    fn legacy_path(&self, service_id: &str) -> PathBuf {
        self.status_dir.join(format!("{}.txt", file_stem(service_id)))
    }

    fn read_legacy(&self, service_id: &str) -> Result<Option<StateRecord>, StateError> {
        let path = self.legacy_path(service_id);
        let raw = match fs::read_to_string(&path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(source) => {
                return Err(StateError::Io {
                    service_id: service_id.to_string(),
                    source,
                });
            }
        };

        let code = ProbeCode::parse(&raw);
        let changed_at: DateTime<Utc> = fs::metadata(&path)
            .and_then(|m| m.modified())
            .map(DateTime::<Utc>::from)
            .unwrap_or_else(|_| Utc::now());
        info!(service = %service_id, path = ?path, code = %code, "Read legacy status file.");
        Ok(Some(StateRecord {
            service_id: service_id.to_string(),
            last_healthy: code == ProbeCode::Number(200),
            last_code: code,
            last_message: String::new(),
            last_changed_at: changed_at,
            last_checked_at: changed_at,
        }))
    }

    fn remove_if_exists(path: &Path, service_id: &str) -> Result<(), StateError> {
        match fs::remove_file(path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(source) => Err(StateError::Io {
                service_id: service_id.to_string(),
                source,
            }),
        }
    }
}

impl StateStore for FileStateStore {
    fn read(&self, service_id: &str) -> Result<Option<StateRecord>, StateError> {
        let path = self.record_path(service_id);
        let raw = match fs::read(&path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => return self.read_legacy(service_id),
            Err(source) => {
                return Err(StateError::Io {
                    service_id: service_id.to_string(),
                    source,
                });
            }
        };

        let record: StateRecord =
            serde_json::from_slice(&raw).map_err(|e| StateError::Corrupted {
                service_id: service_id.to_string(),
                reason: e.to_string(),
            })?;

        // Two ids can sanitize to the same file name.
        if record.service_id != service_id {
            return Err(StateError::Corrupted {
                service_id: service_id.to_string(),
                reason: format!("file belongs to '{}'", record.service_id),
            });
        }
        Ok(Some(record))
    }

    fn write(&self, record: &StateRecord) -> Result<(), StateError> {
        let io_err = |source| StateError::Io {
            service_id: record.service_id.clone(),
            source,
        };

        fs::create_dir_all(&self.status_dir).map_err(io_err)?;
        let payload = serde_json::to_vec_pretty(record)?;

        let mut tmp = NamedTempFile::new_in(&self.status_dir).map_err(io_err)?;
        tmp.write_all(&payload).map_err(io_err)?;
        tmp.as_file().sync_all().map_err(io_err)?;

        let path = self.record_path(&record.service_id);
        tmp.persist(&path).map_err(|e| io_err(e.error))?;
        debug!(service = %record.service_id, path = ?path, "State record written.");

        // The JSON record supersedes any legacy file from now on.
        Self::remove_if_exists(&self.legacy_path(&record.service_id), &record.service_id)
    }

    fn invalidate(&self, service_id: &str) -> Result<(), StateError> {
        Self::remove_if_exists(&self.record_path(service_id), service_id)?;
        Self::remove_if_exists(&self.legacy_path(service_id), service_id)
    }
}

/// Maps a service id onto a safe file name; `https://a:8080/x` becomes
/// `https___a_8080_x`.
pub fn file_stem(service_id: &str) -> String {
    service_id
        .chars()
        .map(|c| match c {
            'a'..='z' | 'A'..='Z' | '0'..='9' | '.' | '-' | '_' => c,
            _ => '_',
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn record(service_id: &str, healthy: bool, code: i64) -> StateRecord {
        let at = Utc.with_ymd_and_hms(2025, 8, 12, 10, 0, 0).unwrap();
        StateRecord {
            service_id: service_id.to_string(),
            last_code: ProbeCode::Number(code),
            last_message: "OK".to_string(),
            last_healthy: healthy,
            last_changed_at: at,
            last_checked_at: at,
        }
    }

    #[test]
    fn test_file_stem_replaces_separators() {
        assert_eq!(file_stem("https://api.example.com:8443/health"), "https___api.example.com_8443_health");
        assert_eq!(file_stem("db-01.internal"), "db-01.internal");
    }

    #[test]
    fn test_read_unknown_service_is_absent() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStateStore::new(dir.path().join("missing-subdir"));
        assert!(store.read("api1").unwrap().is_none());
    }

    #[test]
    fn test_write_then_read_and_replace() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStateStore::new(dir.path());

        store.write(&record("api1", true, 200)).unwrap();
        store.write(&record("api1", false, 500)).unwrap();

        let read = store.read("api1").unwrap().unwrap();
        assert!(!read.last_healthy);
        assert_eq!(read.last_code, ProbeCode::Number(500));
        assert!(store.record_path("api1").exists());

        // No temp files left behind.
        let entries: Vec<_> = fs::read_dir(dir.path()).unwrap().collect();
        assert_eq!(entries.len(), 1);
    }

    #[test]
    fn test_corrupted_record_is_isolated_per_service() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStateStore::new(dir.path());
        store.write(&record("api2", true, 200)).unwrap();
        fs::write(store.record_path("api1"), b"{ not json").unwrap();

        assert!(matches!(store.read("api1"), Err(StateError::Corrupted { .. })));
        assert!(store.read("api2").unwrap().unwrap().last_healthy);
    }

    #[test]
    fn test_colliding_file_name_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStateStore::new(dir.path());
        store.write(&record("host:22", true, 200)).unwrap();

        assert!(matches!(store.read("host/22"), Err(StateError::Corrupted { .. })));
    }

    #[test]
    fn test_legacy_status_file_is_read_and_superseded() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStateStore::new(dir.path());
        fs::write(dir.path().join("10.0.0.5.txt"), "200").unwrap();
        fs::write(dir.path().join("http___legacy_x.txt"), "-1\n").unwrap();

        let up = store.read("10.0.0.5").unwrap().unwrap();
        assert!(up.last_healthy);
        assert_eq!(up.last_code, ProbeCode::Number(200));

        let down = store.read("http://legacy/x").unwrap().unwrap();
        assert!(!down.last_healthy);

        store.write(&record("10.0.0.5", true, 200)).unwrap();
        assert!(!dir.path().join("10.0.0.5.txt").exists());
    }

    #[test]
    fn test_invalidate_removes_record() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStateStore::new(dir.path());
        store.write(&record("api1", true, 200)).unwrap();

        store.invalidate("api1").unwrap();
        assert!(store.read("api1").unwrap().is_none());
        // Invalidating twice is fine.
        store.invalidate("api1").unwrap();
    }
}
