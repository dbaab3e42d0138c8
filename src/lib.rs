pub mod config;
pub mod probes;
pub mod state;

pub mod alerting;
pub mod notifications;
pub mod runner;
pub mod version;
