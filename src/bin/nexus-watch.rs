use clap::Parser;
use std::error::Error;
use std::path::{Path, PathBuf};
use tracing::{error, info};
use tracing_appender::rolling;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use nexus_watch::config::{MonitorConfig, PartialSettings, Settings};
use nexus_watch::runner::Runner;
use nexus_watch::version::VERSION;

/// Checks every configured service once and notifies on status changes.
/// Meant to be run from cron.
#[derive(Parser, Debug)]
#[command(name = "nexus-watch", version = VERSION)]
struct Args {
    /// Path to the monitor config (.toml, .yaml or .yml).
    #[arg(required_unless_present = "config", conflicts_with = "config")]
    path: Option<PathBuf>,

    /// Same as the positional path.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Directory for the rolling JSON log file.
    #[arg(long)]
    log_dir: Option<PathBuf>,

    /// Directory holding per-service state records.
    #[arg(long)]
    status_dir: Option<PathBuf>,

    /// Also notify on the first observation of a service.
    #[arg(long)]
    notify_on_baseline: bool,
}

impl Args {
    fn config_path(&self) -> Option<&Path> {
        self.config.as_deref().or(self.path.as_deref())
    }

    fn overrides(&self) -> PartialSettings {
        PartialSettings {
            log_dir: self.log_dir.clone(),
            status_dir: self.status_dir.clone(),
            notify_on_baseline: self.notify_on_baseline.then_some(true),
            ..PartialSettings::default()
        }
    }
}

fn init_logging(log_dir: &Path) {
    // JSON lines, rotated daily
    let file_appender = rolling::daily(log_dir, "nexus-watch.log");
    let file_layer = fmt::layer().with_writer(file_appender).with_ansi(false).json();

    let stdout_layer = fmt::layer().with_writer(std::io::stdout);

    // RUST_LOG wins; `info` otherwise.
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(file_layer)
        .with(stdout_layer)
        .init();
}

/// Log directory to use when the config itself could not be loaded.
fn fallback_log_dir(args: &Args) -> PathBuf {
    args.log_dir
        .clone()
        .or_else(|| PartialSettings::from_env().ok().and_then(|env| env.log_dir))
        .unwrap_or_else(|| Settings::default().log_dir)
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();
    let Some(config_path) = args.config_path() else {
        return Err("no config path given".into());
    };

    let config = match MonitorConfig::load(config_path) {
        Ok(mut config) => {
            config.layer_settings(args.overrides());
            config
        }
        Err(e) => {
            init_logging(&fallback_log_dir(&args));
            error!(path = ?config_path, error = %e, "Critical error loading configuration. Exiting.");
            return Err(e.into());
        }
    };

    init_logging(&config.settings.log_dir);
    let services = config.services();
    info!(
        version = VERSION,
        path = ?config_path,
        client = %config.settings.client_name,
        status_dir = ?config.settings.status_dir,
        notify_on_baseline = config.settings.notify_on_baseline,
        services = services.len(),
        "Loaded config, starting nexus-watch run."
    );

    let runner = Runner::from_config(&config);
    let report = runner.run(services).await;

    if report.failed_deliveries() > 0 || report.skipped() > 0 {
        error!(
            failed_deliveries = report.failed_deliveries(),
            skipped = report.skipped(),
            "Run completed with errors."
        );
    }
    Ok(())
}
