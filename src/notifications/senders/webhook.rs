use async_trait::async_trait;
use reqwest::{Client, Method, header};
use std::time::Duration;

use super::{SenderError, WebhookBody, WebhookRequest, WebhookSender};
use crate::notifications::models::{
    DEFAULT_MESSAGE_TEMPLATE, DEFAULT_TITLE_TEMPLATE, HttpMethod, WebhookSpec,
};
use crate::notifications::template::{TemplateContext, render, render_json, render_url};

const DEFAULT_WEBHOOK_TIMEOUT: Duration = Duration::from_secs(10);

/// Renders every template of `spec` against `context`.
pub fn render_request(spec: &WebhookSpec, context: &TemplateContext) -> WebhookRequest {
    match spec {
        WebhookSpec::Http {
            url,
            method,
            headers,
            body,
        } => {
            let body = match method {
                HttpMethod::Get => None,
                HttpMethod::Post | HttpMethod::Put => Some(WebhookBody::Json(match body {
                    Some(template) => render_json(template, context),
                    None => default_json_body(context),
                })),
            };
            WebhookRequest {
                url: render_url(url, context),
                method: *method,
                headers: headers
                    .iter()
                    .map(|(k, v)| (k.clone(), render(v, context)))
                    .collect(),
                body,
            }
        }
        WebhookSpec::Pushover {
            token,
            user,
            title,
            message,
            priority,
            api_url,
        } => {
            let title = render(title.as_deref().unwrap_or(DEFAULT_TITLE_TEMPLATE), context);
            let message = render(message.as_deref().unwrap_or(DEFAULT_MESSAGE_TEMPLATE), context);
            let mut form = vec![
                ("token".to_string(), token.clone()),
                ("user".to_string(), user.clone()),
                ("title".to_string(), title),
                ("message".to_string(), message),
            ];
            if let Some(priority) = priority {
                form.push(("priority".to_string(), priority.to_string()));
            }
            WebhookRequest {
                url: api_url.clone(),
                method: HttpMethod::Post,
                headers: Default::default(),
                body: Some(WebhookBody::Form(form)),
            }
        }
    }
}

fn default_json_body(context: &TemplateContext) -> String {
    serde_json::json!({
        "service": context.service,
        "status": context.status.as_str(),
        "code": context.code,
        "message": context.message,
        "client": context.client,
    })
    .to_string()
}

/// Sends webhook calls over HTTP(S).
pub struct HttpWebhookSender {
    client: Client,
}

impl Default for HttpWebhookSender {
    fn default() -> Self {
        Self::new()
    }
}

impl HttpWebhookSender {
    pub fn new() -> Self {
        Self::with_timeout(DEFAULT_WEBHOOK_TIMEOUT)
    }

    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            client: Client::builder()
                .timeout(timeout)
                .user_agent(crate::version::user_agent())
                .build()
                .unwrap_or_default(),
        }
    }
}

#[async_trait]
impl WebhookSender for HttpWebhookSender {
    async fn send_webhook(&self, request: &WebhookRequest) -> Result<(), SenderError> {
        let http_method = match request.method {
            HttpMethod::Get => Method::GET,
            HttpMethod::Post => Method::POST,
            HttpMethod::Put => Method::PUT,
        };

        let mut header_map = header::HeaderMap::new();
        for (key, value) in &request.headers {
            let header_name = header::HeaderName::from_bytes(key.as_bytes())
                .map_err(|e| SenderError::InvalidConfiguration(format!("Invalid header name: {e}")))?;
            let header_value = header::HeaderValue::from_str(value)
                .map_err(|e| SenderError::InvalidConfiguration(format!("Invalid header value: {e}")))?;
            header_map.insert(header_name, header_value);
        }

        let mut request_builder = self.client.request(http_method, &request.url);
        request_builder = match &request.body {
            Some(WebhookBody::Json(body)) => request_builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(body.clone()),
            Some(WebhookBody::Form(fields)) => request_builder.form(fields),
            None => request_builder,
        };
        // Configured headers win over the defaults above.
        request_builder = request_builder.headers(header_map);

        let response = request_builder.send().await?;
        let status = response.status();

        if !status.is_success() {
            let error_body = response
                .text()
                .await
                .unwrap_or_else(|_| "Failed to read error body".to_string());
            return Err(SenderError::SendFailed(format!(
                "Webhook returned non-success status: {status}. Body: {error_body}"
            )));
        }

        Ok(())
    }
}
