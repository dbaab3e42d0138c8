//! Monitor configuration.
//!
//! Global settings are layered: config file, then `NEXUS_WATCH_*`
//! environment variables (a `.env` file is honoured), then CLI flags.
//! Service entries and channel definitions are validated one by one, so a
//! broken entry only takes out the services that depend on it.
use serde::Deserialize;
use serde_json::Value;
use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tracing::warn;

use crate::notifications::models::{EmailSpec, WebhookSpec, PUSHOVER_API_URL};
use crate::notifications::plan::{ChannelRouting, Named, PlanBuilder};
use crate::probes::http::HttpCheck;
use crate::probes::ssh::{DEFAULT_SSH_PORT, SshCheck};
use crate::probes::ServiceTarget;

pub const ENV_PREFIX: &str = "NEXUS_WATCH_";
pub const PUSHOVER_WEBHOOK_NAME: &str = "pushover";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file at {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to parse config: {0}")]
    Parse(String),
    #[error("Failed to load config from environment: {0}")]
    Env(#[from] envy::Error),
    #[error("Invalid service entry '{service}': {reason}")]
    InvalidService { service: String, reason: String },
    #[error("Service '{service}' references unknown webhook '{webhook}'")]
    UnknownWebhook { service: String, webhook: String },
    #[error("Service '{service}' references unknown email config '{email}'")]
    UnknownEmail { service: String, email: String },
    #[error("Duplicate service id '{0}'")]
    DuplicateService(String),
}

impl ConfigError {
    /// The service a per-service error belongs to.
    pub fn service_id(&self) -> Option<&str> {
        match self {
            ConfigError::InvalidService { service, .. }
            | ConfigError::UnknownWebhook { service, .. }
            | ConfigError::UnknownEmail { service, .. }
            | ConfigError::DuplicateService(service) => Some(service),
            ConfigError::Read { .. } | ConfigError::Parse(_) | ConfigError::Env(_) => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    Toml,
    Yaml,
}

impl ConfigFormat {
    /// `.toml` is TOML; everything else is read as YAML (which covers JSON).
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("toml") => ConfigFormat::Toml,
            _ => ConfigFormat::Yaml,
        }
    }
}

/// Global settings that may come from the file, the environment or the CLI.
#[derive(Deserialize, Default, Debug, Clone, PartialEq, Eq)]
pub struct PartialSettings {
    pub client_name: Option<String>,
    pub status_dir: Option<PathBuf>,
    pub default_timeout_ms: Option<u64>,
    pub notify_on_baseline: Option<bool>,
    pub log_dir: Option<PathBuf>,
}

impl PartialSettings {
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(envy::prefixed(ENV_PREFIX).from_env::<PartialSettings>()?)
    }

    /// Values set in `self` win over `lower`.
    pub fn over(self, lower: PartialSettings) -> PartialSettings {
        PartialSettings {
            client_name: self.client_name.or(lower.client_name),
            status_dir: self.status_dir.or(lower.status_dir),
            default_timeout_ms: self.default_timeout_ms.or(lower.default_timeout_ms),
            notify_on_baseline: self.notify_on_baseline.or(lower.notify_on_baseline),
            log_dir: self.log_dir.or(lower.log_dir),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    /// Name of the monitoring installation, available to templates as `{client}`.
    pub client_name: String,
    pub status_dir: PathBuf,
    pub default_timeout_ms: u64,
    pub notify_on_baseline: bool,
    pub log_dir: PathBuf,
}

impl Default for Settings {
    fn default() -> Self {
        Settings::from(PartialSettings::default())
    }
}

impl From<PartialSettings> for Settings {
    fn from(partial: PartialSettings) -> Self {
        Settings {
            client_name: partial.client_name.unwrap_or_else(default_client_name),
            status_dir: partial.status_dir.unwrap_or_else(default_status_dir),
            default_timeout_ms: partial.default_timeout_ms.unwrap_or(DEFAULT_TIMEOUT_MS),
            notify_on_baseline: partial.notify_on_baseline.unwrap_or(false),
            log_dir: partial.log_dir.unwrap_or_else(default_log_dir),
        }
    }
}

pub const DEFAULT_TIMEOUT_MS: u64 = 5000;

fn default_client_name() -> String {
    "phoenix3".to_string()
}

fn default_status_dir() -> PathBuf {
    PathBuf::from("/tmp/status_files/")
}

fn default_log_dir() -> PathBuf {
    PathBuf::from("logs")
}

// Raw file layout. Service entries and channel definitions stay untyped
// until a service resolves them.
#[derive(Deserialize, Debug, Default)]
struct FileConfig {
    #[serde(default, alias = "CLIENT_NAME")]
    client_name: Option<String>,
    #[serde(default, alias = "STATUS_DIR")]
    status_dir: Option<PathBuf>,
    #[serde(default, alias = "DEFAULT_TIMEOUT_MS")]
    default_timeout_ms: Option<u64>,
    #[serde(default, alias = "NOTIFY_ON_BASELINE")]
    notify_on_baseline: Option<bool>,
    #[serde(default, alias = "LOG_DIR")]
    log_dir: Option<PathBuf>,
    #[serde(default, alias = "PUSHOVER_API_TOKEN")]
    pushover_api_token: Option<String>,
    #[serde(default, alias = "PUSHOVER_USER_KEY")]
    pushover_user_key: Option<String>,
    #[serde(default)]
    webhooks: BTreeMap<String, Value>,
    #[serde(default)]
    email: Option<Value>,
    #[serde(default)]
    emails: BTreeMap<String, Value>,
    #[serde(default)]
    urls: Vec<Value>,
    #[serde(default, alias = "hosts-ssh")]
    hosts_ssh: Vec<Value>,
}

#[derive(Deserialize, Debug)]
#[serde(deny_unknown_fields)]
struct UrlEntry {
    #[serde(default)]
    name: Option<String>,
    url: String,
    #[serde(default, alias = "checkJson")]
    check_json: bool,
    #[serde(default, alias = "checkText")]
    check_text: bool,
    #[serde(default, alias = "expectedStatus")]
    expected_status: Option<u16>,
    #[serde(default, alias = "timeoutMs")]
    timeout_ms: Option<u64>,
    #[serde(default, alias = "okWebhook")]
    ok_webhook: Option<String>,
    #[serde(default, alias = "errorWebhook")]
    error_webhook: Option<String>,
    #[serde(default, alias = "emailConfigName")]
    email_config_name: Option<String>,
}

#[derive(Deserialize, Debug)]
#[serde(deny_unknown_fields)]
struct SshEntry {
    #[serde(default)]
    name: Option<String>,
    host: String,
    #[serde(default)]
    port: Option<u16>,
    #[serde(default, alias = "timeoutMs")]
    timeout_ms: Option<u64>,
    #[serde(default, alias = "okWebhook")]
    ok_webhook: Option<String>,
    #[serde(default, alias = "errorWebhook")]
    error_webhook: Option<String>,
    #[serde(default, alias = "emailConfigName")]
    email_config_name: Option<String>,
}

#[derive(Debug, Default)]
struct ChannelRefs {
    ok_webhook: Option<String>,
    error_webhook: Option<String>,
    email_config_name: Option<String>,
}

/// A fully resolved, runnable service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceDefinition {
    pub id: String,
    pub target: ServiceTarget,
    pub timeout: Duration,
    pub routing: ChannelRouting,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EntryKind {
    Url,
    Ssh,
}

#[derive(Debug, Clone)]
pub struct MonitorConfig {
    pub settings: Settings,
    /// Pushover credentials from the legacy top-level keys.
    pub pushover: Option<Named<WebhookSpec>>,
    webhooks: BTreeMap<String, Value>,
    email: Option<Value>,
    emails: BTreeMap<String, Value>,
    entries: Vec<(EntryKind, Value)>,
}

impl MonitorConfig {
    /// Loads the file, then layers `.env` and `NEXUS_WATCH_*` variables on top.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let mut config = Self::parse(&contents, ConfigFormat::from_path(path))?;

        dotenv::dotenv().ok();
        let env = PartialSettings::from_env()?;
        config.layer_settings(env);
        Ok(config)
    }

    /// Parses config text without consulting the environment.
    pub fn parse(contents: &str, format: ConfigFormat) -> Result<Self, ConfigError> {
        let value: Value = if contents.trim().is_empty() {
            Value::Object(Default::default())
        } else {
            match format {
                ConfigFormat::Toml => toml::from_str(contents).map_err(|e| ConfigError::Parse(e.to_string()))?,
                ConfigFormat::Yaml => serde_yaml::from_str(contents).map_err(|e| ConfigError::Parse(e.to_string()))?,
            }
        };
        // A YAML document holding only comments is null.
        let value = if value.is_null() { Value::Object(Default::default()) } else { value };
        let file: FileConfig = serde_json::from_value(value).map_err(|e| ConfigError::Parse(e.to_string()))?;

        let pushover = match (file.pushover_api_token, file.pushover_user_key) {
            (Some(token), Some(user)) if !token.is_empty() && !user.is_empty() => Some(Named::new(
                PUSHOVER_WEBHOOK_NAME,
                WebhookSpec::Pushover {
                    token,
                    user,
                    title: None,
                    message: None,
                    priority: None,
                    api_url: PUSHOVER_API_URL.to_string(),
                },
            )),
            _ => None,
        };

        let entries = file
            .urls
            .into_iter()
            .map(|v| (EntryKind::Url, v))
            .chain(file.hosts_ssh.into_iter().map(|v| (EntryKind::Ssh, v)))
            .collect();

        let settings = Settings::from(PartialSettings {
            client_name: file.client_name,
            status_dir: file.status_dir,
            default_timeout_ms: file.default_timeout_ms,
            notify_on_baseline: file.notify_on_baseline,
            log_dir: file.log_dir,
        });

        Ok(MonitorConfig {
            settings,
            webhooks: file.webhooks,
            email: file.email,
            emails: file.emails,
            pushover,
            entries,
        })
    }

    /// Applies higher-priority settings (environment, CLI) over the current ones.
    pub fn layer_settings(&mut self, overrides: PartialSettings) {
        let current = PartialSettings {
            client_name: Some(self.settings.client_name.clone()),
            status_dir: Some(self.settings.status_dir.clone()),
            default_timeout_ms: Some(self.settings.default_timeout_ms),
            notify_on_baseline: Some(self.settings.notify_on_baseline),
            log_dir: Some(self.settings.log_dir.clone()),
        };
        self.settings = Settings::from(overrides.over(current));
    }

    pub fn plan_builder(&self) -> PlanBuilder {
        PlanBuilder {
            notify_on_baseline: self.settings.notify_on_baseline,
            default_email: self.default_email(),
            default_webhook: self.pushover.clone(),
        }
    }

    /// Names of the configured webhooks, valid or not.
    pub fn webhook_names(&self) -> impl Iterator<Item = &str> {
        self.webhooks.keys().map(String::as_str)
    }

    /// The global email. A malformed one is dropped with a warning so
    /// services can still run without it.
    pub fn default_email(&self) -> Option<EmailSpec> {
        let raw = self.email.as_ref()?;
        match serde_json::from_value(raw.clone()) {
            Ok(spec) => Some(spec),
            Err(e) => {
                warn!(error = %e, "Ignoring malformed global email config.");
                None
            }
        }
    }

    /// Parses the named webhook; the legacy pushover webhook is found too.
    fn webhook(&self, service: &str, name: &str) -> Result<WebhookSpec, ConfigError> {
        match self.webhooks.get(name) {
            Some(raw) => serde_json::from_value(raw.clone()).map_err(|e| ConfigError::InvalidService {
                service: service.to_string(),
                reason: format!("webhook '{name}' is malformed: {e}"),
            }),
            None => self
                .pushover
                .as_ref()
                .filter(|p| p.name == name)
                .map(|p| p.spec.clone())
                .ok_or_else(|| ConfigError::UnknownWebhook {
                    service: service.to_string(),
                    webhook: name.to_string(),
                }),
        }
    }

    fn named_email(&self, service: &str, name: &str) -> Result<EmailSpec, ConfigError> {
        let raw = self.emails.get(name).ok_or_else(|| ConfigError::UnknownEmail {
            service: service.to_string(),
            email: name.to_string(),
        })?;
        serde_json::from_value(raw.clone()).map_err(|e| ConfigError::InvalidService {
            service: service.to_string(),
            reason: format!("email config '{name}' is malformed: {e}"),
        })
    }

    /// Resolves every service entry. Invalid entries come back as errors in
    /// place, so callers can report them and carry on with the rest.
    pub fn services(&self) -> Vec<Result<ServiceDefinition, ConfigError>> {
        let mut seen = HashSet::new();
        self.entries
            .iter()
            .enumerate()
            .map(|(index, (kind, raw))| {
                let service = self.resolve_entry(index, *kind, raw)?;
                if !seen.insert(service.id.clone()) {
                    return Err(ConfigError::DuplicateService(service.id));
                }
                Ok(service)
            })
            .collect()
    }

    fn resolve_entry(&self, index: usize, kind: EntryKind, raw: &Value) -> Result<ServiceDefinition, ConfigError> {
        let label = entry_label(index, kind, raw);
        let invalid = |reason: String| ConfigError::InvalidService {
            service: label.clone(),
            reason,
        };

        let (id, target, timeout_ms, refs) = match kind {
            EntryKind::Url => {
                let entry: UrlEntry = serde_json::from_value(raw.clone()).map_err(|e| invalid(e.to_string()))?;
                if !(entry.url.starts_with("http://") || entry.url.starts_with("https://")) {
                    return Err(invalid(format!("url '{}' must start with http:// or https://", entry.url)));
                }
                let mut check = HttpCheck::new(entry.url.clone());
                check.check_json = entry.check_json;
                check.check_text = entry.check_text;
                if let Some(status) = entry.expected_status {
                    check.expected_status = status;
                }
                let refs = ChannelRefs {
                    ok_webhook: entry.ok_webhook,
                    error_webhook: entry.error_webhook,
                    email_config_name: entry.email_config_name,
                };
                let id = entry.name.unwrap_or(entry.url);
                (id, ServiceTarget::Http(check), entry.timeout_ms, refs)
            }
            EntryKind::Ssh => {
                let entry: SshEntry = match raw {
                    Value::String(host) => SshEntry {
                        name: None,
                        host: host.clone(),
                        port: None,
                        timeout_ms: None,
                        ok_webhook: None,
                        error_webhook: None,
                        email_config_name: None,
                    },
                    other => serde_json::from_value(other.clone()).map_err(|e| invalid(e.to_string()))?,
                };
                if entry.host.trim().is_empty() {
                    return Err(invalid("host must not be empty".to_string()));
                }
                let port = entry.port.unwrap_or(DEFAULT_SSH_PORT);
                if port == 0 {
                    return Err(invalid("port must not be 0".to_string()));
                }
                let refs = ChannelRefs {
                    ok_webhook: entry.ok_webhook,
                    error_webhook: entry.error_webhook,
                    email_config_name: entry.email_config_name,
                };
                let id = entry.name.unwrap_or_else(|| entry.host.clone());
                let check = SshCheck { host: entry.host, port };
                (id, ServiceTarget::Ssh(check), entry.timeout_ms, refs)
            }
        };

        if id.trim().is_empty() {
            return Err(invalid("service name must not be empty".to_string()));
        }

        let timeout_ms = timeout_ms.unwrap_or(self.settings.default_timeout_ms);
        if timeout_ms == 0 {
            return Err(ConfigError::InvalidService {
                service: id,
                reason: "timeout must be greater than 0".to_string(),
            });
        }

        let routing = self.resolve_routing(&id, refs)?;
        Ok(ServiceDefinition {
            id,
            target,
            timeout: Duration::from_millis(timeout_ms),
            routing,
        })
    }

    fn resolve_routing(&self, service: &str, refs: ChannelRefs) -> Result<ChannelRouting, ConfigError> {
        let webhook = |name: Option<String>| -> Result<Option<Named<WebhookSpec>>, ConfigError> {
            let Some(name) = name else { return Ok(None) };
            let spec = self.webhook(service, &name)?;
            Ok(Some(Named::new(name, spec)))
        };

        let email = match refs.email_config_name {
            None => None,
            Some(name) => {
                let spec = self.named_email(service, &name)?;
                Some(Named::new(name, spec))
            }
        };

        Ok(ChannelRouting {
            ok_webhook: webhook(refs.ok_webhook)?,
            error_webhook: webhook(refs.error_webhook)?,
            email,
        })
    }
}

fn entry_label(index: usize, kind: EntryKind, raw: &Value) -> String {
    let field = |key: &str| raw.get(key).and_then(Value::as_str).map(str::to_string);
    match (kind, raw) {
        (EntryKind::Ssh, Value::String(host)) => host.clone(),
        (EntryKind::Url, _) => field("name")
            .or_else(|| field("url"))
            .unwrap_or_else(|| format!("urls[{index}]")),
        (EntryKind::Ssh, _) => field("name")
            .or_else(|| field("host"))
            .unwrap_or_else(|| format!("hosts_ssh[{index}]")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const YAML: &str = r#"
CLIENT_NAME: acme
STATUS_DIR: /var/lib/nexus-watch
DEFAULT_TIMEOUT_MS: 3000
webhooks:
  ops-error:
    type: http
    url: https://hooks.example.com/err
    body: '{{"text": "{service} {code} {message} ({client})"}}'
  ops-ok:
    type: http
    url: https://hooks.example.com/ok
    method: GET
emails:
  ops:
    server: smtp.example.com
    from: monitor@example.com
    to: [ops@example.com]
urls:
  - name: api1
    url: https://api.example.com/health
    checkJson: true
    errorWebhook: ops-error
    okWebhook: ops-ok
    emailConfigName: ops
  - name: api2
    url: https://api2.example.com/
    timeout_ms: 800
  - name: broken
    url: ftp://files.example.com
  - name: ghost-hook
    url: https://ghost.example.com
    error_webhook: nope
hosts-ssh:
  - 10.0.0.5
  - host: bastion.example.com
    port: 2222
    name: bastion
  - 10.0.0.5
"#;

    fn config() -> MonitorConfig {
        MonitorConfig::parse(YAML, ConfigFormat::Yaml).unwrap()
    }

    #[test]
    fn test_parse_yaml_legacy_keys() {
        let config = config();
        assert_eq!(config.settings.client_name, "acme");
        assert_eq!(config.settings.status_dir, PathBuf::from("/var/lib/nexus-watch"));
        assert_eq!(config.settings.default_timeout_ms, 3000);
        assert!(!config.settings.notify_on_baseline);
        assert_eq!(config.webhook_names().collect::<Vec<_>>(), vec!["ops-error", "ops-ok"]);
        assert!(config.pushover.is_none());
    }

    #[test]
    fn test_services_resolve_per_entry() {
        let services = config().services();
        assert_eq!(services.len(), 7);

        let api1 = services[0].as_ref().unwrap();
        assert_eq!(api1.id, "api1");
        assert_eq!(api1.timeout, Duration::from_millis(3000));
        match &api1.target {
            ServiceTarget::Http(check) => {
                assert!(check.check_json);
                assert_eq!(check.expected_status, 200);
            }
            other => panic!("unexpected target: {other:?}"),
        }
        assert_eq!(api1.routing.error_webhook.as_ref().unwrap().name, "ops-error");
        assert_eq!(api1.routing.ok_webhook.as_ref().unwrap().name, "ops-ok");
        assert_eq!(api1.routing.email.as_ref().unwrap().name, "ops");

        let api2 = services[1].as_ref().unwrap();
        assert_eq!(api2.timeout, Duration::from_millis(800));
        assert!(!api2.routing.has_override());

        assert!(matches!(&services[2], Err(ConfigError::InvalidService { service, .. }) if service == "broken"));
        assert!(matches!(&services[3], Err(ConfigError::UnknownWebhook { webhook, .. }) if webhook == "nope"));

        let host = services[4].as_ref().unwrap();
        assert_eq!(host.id, "10.0.0.5");
        assert_eq!(host.target, ServiceTarget::Ssh(SshCheck::new("10.0.0.5")));

        let bastion = services[5].as_ref().unwrap();
        assert_eq!(bastion.id, "bastion");
        assert_eq!(bastion.target.location(), "bastion.example.com:2222");

        assert!(matches!(&services[6], Err(ConfigError::DuplicateService(id)) if id == "10.0.0.5"));
    }

    #[test]
    fn test_unknown_fields_in_entry_are_rejected() {
        let config = MonitorConfig::parse(
            "urls:\n  - name: typo\n    url: https://x.example.com\n    chekJson: true\n",
            ConfigFormat::Yaml,
        )
        .unwrap();
        let services = config.services();
        let err = services[0].as_ref().unwrap_err();
        assert_eq!(err.service_id(), Some("typo"));
    }

    #[test]
    fn test_unknown_email_reference() {
        let config = MonitorConfig::parse(
            "urls:\n  - name: api\n    url: https://x.example.com\n    email_config_name: missing\n",
            ConfigFormat::Yaml,
        )
        .unwrap();
        assert!(matches!(config.services()[0], Err(ConfigError::UnknownEmail { .. })));
    }

    #[test]
    fn test_parse_toml() {
        let toml = r#"
client_name = "edge"
notify_on_baseline = true

[email]
server = "smtp.example.com"
port = 465
tls = "tls"
from = "monitor@example.com"
to = ["ops@example.com"]

[[urls]]
name = "api"
url = "https://api.example.com"

[[hosts_ssh]]
host = "db.example.com"
"#;
        let config = MonitorConfig::parse(toml, ConfigFormat::Toml).unwrap();
        assert_eq!(config.settings.client_name, "edge");
        assert!(config.settings.notify_on_baseline);
        assert_eq!(config.default_email().unwrap().port, 465);

        let builder = config.plan_builder();
        assert!(builder.notify_on_baseline);
        assert!(builder.default_email.is_some());
        assert!(config.services().iter().all(Result::is_ok));
    }

    #[test]
    fn test_legacy_pushover_keys_become_default_webhook() {
        let config = MonitorConfig::parse(
            "PUSHOVER_API_TOKEN: app\nPUSHOVER_USER_KEY: user\nurls:\n  - name: api\n    url: https://x.example.com\n    errorWebhook: pushover\n",
            ConfigFormat::Yaml,
        )
        .unwrap();
        let pushover = config.pushover.as_ref().unwrap();
        assert_eq!(pushover.name, PUSHOVER_WEBHOOK_NAME);
        assert!(config.plan_builder().default_webhook.is_some());

        let service = config.services().remove(0).unwrap();
        assert_eq!(service.routing.error_webhook.unwrap().name, PUSHOVER_WEBHOOK_NAME);

        let empty_keys = MonitorConfig::parse("PUSHOVER_API_TOKEN: ''\nPUSHOVER_USER_KEY: user\n", ConfigFormat::Yaml).unwrap();
        assert!(empty_keys.pushover.is_none());
    }

    #[test]
    fn test_settings_layering() {
        let mut config = config();
        config.layer_settings(PartialSettings {
            client_name: Some("from-env".to_string()),
            notify_on_baseline: Some(true),
            ..PartialSettings::default()
        });
        assert_eq!(config.settings.client_name, "from-env");
        assert!(config.settings.notify_on_baseline);
        assert_eq!(config.settings.default_timeout_ms, 3000);
    }

    #[test]
    fn test_empty_and_malformed_documents() {
        let empty = MonitorConfig::parse("", ConfigFormat::Yaml).unwrap();
        assert_eq!(empty.settings, Settings::default());
        assert!(empty.services().is_empty());

        assert!(matches!(
            MonitorConfig::parse("urls: 5\n", ConfigFormat::Yaml),
            Err(ConfigError::Parse(_))
        ));
        assert!(matches!(MonitorConfig::parse("urls = [", ConfigFormat::Toml), Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_malformed_webhook_only_affects_services_using_it() {
        let config = MonitorConfig::parse(
            "webhooks:\n  broken:\n    type: http\n    method: POST\n  pigeon:\n    type: carrier-pigeon\n\
             urls:\n  - name: healthy-svc\n    url: https://ok.example.com\n\
             \x20 - name: uses-broken\n    url: https://a.example.com\n    errorWebhook: broken\n\
             \x20 - name: uses-pigeon\n    url: https://b.example.com\n    okWebhook: pigeon\n",
            ConfigFormat::Yaml,
        )
        .unwrap();
        let services = config.services();
        assert_eq!(services.len(), 3);
        assert_eq!(services[0].as_ref().unwrap().id, "healthy-svc");
        for (index, id) in [(1, "uses-broken"), (2, "uses-pigeon")] {
            match &services[index] {
                Err(ConfigError::InvalidService { service, reason }) => {
                    assert_eq!(service, id);
                    assert!(reason.contains("malformed"), "{reason}");
                }
                other => panic!("unexpected result for {id}: {other:?}"),
            }
        }
    }

    #[test]
    fn test_malformed_email_configs() {
        let config = MonitorConfig::parse(
            "email:\n  server: smtp.example.com\n  to: [ops@example.com]\n\
             emails:\n  half:\n    server: smtp.example.com\n\
             urls:\n  - name: plain\n    url: https://ok.example.com\n\
             \x20 - name: uses-half\n    url: https://a.example.com\n    emailConfigName: half\n",
            ConfigFormat::Yaml,
        )
        .unwrap();
        assert!(config.default_email().is_none());
        assert!(config.plan_builder().default_email.is_none());

        let services = config.services();
        assert!(services[0].is_ok());
        assert!(matches!(&services[1], Err(ConfigError::InvalidService { service, .. }) if service == "uses-half"));
    }

    #[test]
    fn test_format_from_path() {
        assert_eq!(ConfigFormat::from_path(Path::new("monitor.toml")), ConfigFormat::Toml);
        assert_eq!(ConfigFormat::from_path(Path::new("monitor.yaml")), ConfigFormat::Yaml);
        assert_eq!(ConfigFormat::from_path(Path::new("monitor")), ConfigFormat::Yaml);
    }

    #[test]
    fn test_load_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("monitor.yml");
        fs::write(&path, "CLIENT_NAME: from-file\nurls: []\n").unwrap();
        // SAFETY: no other test in this crate touches the environment.
        unsafe { std::env::remove_var("NEXUS_WATCH_CLIENT_NAME") };
        let config = MonitorConfig::load(&path).unwrap();
        assert_eq!(config.settings.client_name, "from-file");

        let missing = MonitorConfig::load(&dir.path().join("nope.yml"));
        assert!(matches!(missing, Err(ConfigError::Read { .. })));
    }
}
