/// Build version. Release pipelines stamp it through `NEXUS_WATCH_VERSION`;
/// local builds fall back to the crate version.
pub const VERSION: &str = match option_env!("NEXUS_WATCH_VERSION") {
    Some(version) => version,
    None => env!("CARGO_PKG_VERSION"),
};

/// User agent sent by probes and webhook calls.
pub fn user_agent() -> String {
    format!("nexus-watch/{VERSION}")
}
