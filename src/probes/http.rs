use reqwest::Client;
use std::time::Duration;
use tracing::debug;

use super::{ProbeError, ProbeResult};

/// HTTP(S)/REST endpoint check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpCheck {
    pub url: String,
    pub expected_status: u16,
    /// Body must parse as JSON.
    pub check_json: bool,
    /// Body must not contain the text "500". Ignored when `check_json` is set.
    pub check_text: bool,
}

impl HttpCheck {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            expected_status: 200,
            check_json: false,
            check_text: false,
        }
    }
}

pub(super) async fn run_http_check(
    client: &Client,
    check: &HttpCheck,
    timeout: Duration,
) -> Result<ProbeResult, ProbeError> {
    let timeout_ms = timeout.as_millis() as u64;
    let response = client
        .get(&check.url)
        .timeout(timeout)
        .send()
        .await
        .map_err(|e| classify(e, timeout_ms))?;

    let status = response.status().as_u16();
    debug!(url = %check.url, status, "HTTP check response received.");
    if status != check.expected_status {
        return Ok(ProbeResult::unhealthy(status, format!("Unexpected status: {status}")));
    }

    if !check.check_json && !check.check_text {
        return Ok(ProbeResult::healthy(status, "OK"));
    }

    let body = response.text().await.map_err(|e| classify(e, timeout_ms))?;
    if check.check_json {
        if serde_json::from_str::<serde_json::Value>(&body).is_err() {
            return Ok(ProbeResult::unhealthy(status, format!("Invalid JSON response: {status}")));
        }
    } else if check.check_text && body.contains("500") {
        return Ok(ProbeResult::unhealthy(status, "500 found in response text"));
    }

    Ok(ProbeResult::healthy(status, "OK"))
}

fn classify(err: reqwest::Error, timeout_ms: u64) -> ProbeError {
    if err.is_timeout() {
        ProbeError::Timeout { timeout_ms }
    } else {
        ProbeError::Http(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::probes::ProbeCode;
    use axum::{Router, http::StatusCode, routing::get};

    async fn serve(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{addr}")
    }

    fn test_router() -> Router {
        Router::new()
            .route("/ok", get(|| async { "{\"status\":\"up\"}" }))
            .route("/plain", get(|| async { "not json at all" }))
            .route("/text500", get(|| async { "upstream said 500" }))
            .route("/json500", get(|| async { "{\"errors\":500}" }))
            .route(
                "/down",
                get(|| async { (StatusCode::SERVICE_UNAVAILABLE, "maintenance") }),
            )
            .route(
                "/slow",
                get(|| async {
                    tokio::time::sleep(Duration::from_secs(2)).await;
                    "late"
                }),
            )
    }

    async fn check(url: String, json: bool, text: bool) -> ProbeResult {
        let mut check = HttpCheck::new(url);
        check.check_json = json;
        check.check_text = text;
        let client = Client::new();
        run_http_check(&client, &check, Duration::from_millis(500))
            .await
            .unwrap_or_else(ProbeResult::from)
    }

    #[tokio::test]
    async fn test_http_check_ok() {
        let base = serve(test_router()).await;
        let result = check(format!("{base}/ok"), true, true).await;
        assert!(result.healthy);
        assert_eq!(result.code, ProbeCode::Number(200));
        assert_eq!(result.message, "OK");
    }

    #[tokio::test]
    async fn test_http_check_unexpected_status() {
        let base = serve(test_router()).await;
        let result = check(format!("{base}/down"), false, false).await;
        assert!(!result.healthy);
        assert_eq!(result.code, ProbeCode::Number(503));
        assert_eq!(result.message, "Unexpected status: 503");
    }

    #[tokio::test]
    async fn test_http_check_body_checks() {
        let base = serve(test_router()).await;

        let invalid_json = check(format!("{base}/plain"), true, false).await;
        assert!(!invalid_json.healthy);
        assert_eq!(invalid_json.message, "Invalid JSON response: 200");

        let plain_without_json_check = check(format!("{base}/plain"), false, true).await;
        assert!(plain_without_json_check.healthy);

        let text500 = check(format!("{base}/text500"), false, true).await;
        assert!(!text500.healthy);
        assert_eq!(text500.code, ProbeCode::Number(200));
    }

    #[tokio::test]
    async fn test_http_check_json_check_takes_precedence_over_text() {
        let base = serve(test_router()).await;

        let both = check(format!("{base}/json500"), true, true).await;
        assert!(both.healthy);
        assert_eq!(both.code, ProbeCode::Number(200));
        assert_eq!(both.message, "OK");

        let text_only = check(format!("{base}/json500"), false, true).await;
        assert!(!text_only.healthy);
        assert_eq!(text_only.message, "500 found in response text");
    }

    #[tokio::test]
    async fn test_http_check_timeout_is_normalized() {
        let base = serve(test_router()).await;
        let result = check(format!("{base}/slow"), false, false).await;
        assert!(!result.healthy);
        assert_eq!(result.code, ProbeCode::Number(500));
        assert_eq!(result.message, "Timeout");
    }

    #[tokio::test]
    async fn test_http_check_connection_error() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let result = check(format!("http://{addr}/"), false, false).await;
        assert!(!result.healthy);
        assert_eq!(result.code, ProbeCode::TRANSPORT_ERROR);
        assert!(result.message.starts_with("Error: "));
    }
}
