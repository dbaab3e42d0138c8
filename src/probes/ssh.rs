use std::time::Duration;
use tokio::net::TcpStream;

use super::{ProbeError, ProbeResult};

pub const DEFAULT_SSH_PORT: u16 = 22;

/// SSH reachability check: the port must accept a TCP connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SshCheck {
    pub host: String,
    pub port: u16,
}

impl SshCheck {
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port: DEFAULT_SSH_PORT,
        }
    }
}

pub(super) async fn run_ssh_check(check: &SshCheck, timeout: Duration) -> Result<ProbeResult, ProbeError> {
    let connect = TcpStream::connect((check.host.as_str(), check.port));
    match tokio::time::timeout(timeout, connect).await {
        Ok(Ok(_stream)) => Ok(ProbeResult::healthy(200i64, "SSH OK")),
        Ok(Err(source)) => Err(ProbeError::Connect { port: check.port, source }),
        Err(_) => Err(ProbeError::Timeout {
            timeout_ms: timeout.as_millis() as u64,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::probes::ProbeCode;

    #[tokio::test]
    async fn test_ssh_check_open_port() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let check = SshCheck {
            host: "127.0.0.1".into(),
            port,
        };

        let result = run_ssh_check(&check, Duration::from_secs(1)).await.unwrap();
        assert!(result.healthy);
        assert_eq!(result.code, ProbeCode::Number(200));
        assert_eq!(result.message, "SSH OK");
    }

    #[tokio::test]
    async fn test_ssh_check_closed_port() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);
        let check = SshCheck {
            host: "127.0.0.1".into(),
            port,
        };

        let result: ProbeResult = run_ssh_check(&check, Duration::from_secs(1))
            .await
            .unwrap_or_else(ProbeResult::from);
        assert!(!result.healthy);
        assert_eq!(result.code, ProbeCode::TRANSPORT_ERROR);
        assert!(result.message.starts_with(&format!("Port {port} error:")));
    }
}
