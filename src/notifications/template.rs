//! Placeholder substitution for notification payloads.
//!
//! Templates reference a fixed set of names: `{service}`, `{code}`,
//! `{message}`, `{client}` and `{status}`. Anything else in braces is left
//! untouched, and `{{` / `}}` produce literal braces. There is no
//! expression language.
use super::models::{Direction, NotificationPlan};

/// Values available to templates for one plan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateContext {
    pub service: String,
    pub code: String,
    pub message: String,
    pub client: String,
    pub status: Direction,
}

impl TemplateContext {
    pub fn for_plan(plan: &NotificationPlan, client: &str) -> Self {
        Self {
            service: plan.service_id.clone(),
            code: plan.code.to_string(),
            message: plan.message.clone(),
            client: client.to_string(),
            status: plan.direction,
        }
    }

    fn lookup(&self, key: &str) -> Option<&str> {
        match key {
            "service" => Some(&self.service),
            "code" => Some(&self.code),
            "message" => Some(&self.message),
            "client" => Some(&self.client),
            "status" => Some(self.status.as_str()),
            _ => None,
        }
    }
}

pub fn render(template: &str, context: &TemplateContext) -> String {
    render_with(template, context, |value| value.to_string())
}

/// Renders a URL template; substituted values are percent-encoded.
pub fn render_url(template: &str, context: &TemplateContext) -> String {
    render_with(template, context, |value| urlencoding::encode(value).into_owned())
}

/// Renders a JSON template; substituted values are escaped to stay inside
/// the surrounding string literal.
pub fn render_json(template: &str, context: &TemplateContext) -> String {
    render_with(template, context, json_escape)
}

fn render_with<F>(template: &str, context: &TemplateContext, encode: F) -> String
where
    F: Fn(&str) -> String,
{
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(pos) = rest.find(['{', '}']) {
        out.push_str(&rest[..pos]);
        let tail = &rest[pos..];

        if tail.starts_with("{{") {
            out.push('{');
            rest = &tail[2..];
        } else if tail.starts_with("}}") {
            out.push('}');
            rest = &tail[2..];
        } else if tail.starts_with('{') {
            match tail[1..].find('}') {
                Some(end) => {
                    let key = &tail[1..end + 1];
                    match context.lookup(key) {
                        Some(value) => out.push_str(&encode(value)),
                        None => out.push_str(&tail[..end + 2]),
                    }
                    rest = &tail[end + 2..];
                }
                None => {
                    out.push_str(tail);
                    rest = "";
                }
            }
        } else {
            out.push('}');
            rest = &tail[1..];
        }
    }
    out.push_str(rest);
    out
}

fn json_escape(value: &str) -> String {
    let quoted = serde_json::Value::String(value.to_string()).to_string();
    quoted[1..quoted.len() - 1].to_string()
}
