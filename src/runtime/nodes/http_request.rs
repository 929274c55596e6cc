//! HTTP request node
//!
//! Expected data: `{ "endpoint": "https://api.example.com/users/{{userId}}",
//! "method": "POST", "body": "{\"name\": {{json user.name}}}", "variableName": "res" }`
//!
//! Endpoint and body are rendered against the context before the call. The
//! call itself runs inside a single `http-request` step whose recorded value
//! is the next context, so a replayed run never sends the request twice.

use crate::{
    error::{EngineError, EngineResult},
    runtime::{
        executor::{NodeExecutor, NodeInvocation},
        step::run_step,
        template,
    },
    workflow::types::Context,
};
use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;

/// Settings shared by every HTTP request node of the process
#[derive(Debug, Clone)]
pub struct HttpRequestSettings {
    /// Per-request timeout
    pub timeout: Duration,
    /// Reject nodes without an output variable name
    pub require_variable_name: bool,
}

impl Default for HttpRequestSettings {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            require_variable_name: false,
        }
    }
}

/// Node configuration as saved by the editor
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct HttpRequestConfig {
    endpoint: Option<String>,
    method: Option<String>,
    body: Option<String>,
    variable_name: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum HttpMethod {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl HttpMethod {
    fn parse(method: Option<&str>) -> Option<Self> {
        let Some(method) = method.map(str::trim).filter(|m| !m.is_empty()) else {
            return Some(HttpMethod::Get);
        };
        match method.to_uppercase().as_str() {
            "GET" => Some(HttpMethod::Get),
            "POST" => Some(HttpMethod::Post),
            "PUT" => Some(HttpMethod::Put),
            "PATCH" => Some(HttpMethod::Patch),
            "DELETE" => Some(HttpMethod::Delete),
            _ => None,
        }
    }

    fn carries_body(self) -> bool {
        matches!(self, HttpMethod::Post | HttpMethod::Put | HttpMethod::Patch)
    }

    fn as_reqwest(self) -> reqwest::Method {
        match self {
            HttpMethod::Get => reqwest::Method::GET,
            HttpMethod::Post => reqwest::Method::POST,
            HttpMethod::Put => reqwest::Method::PUT,
            HttpMethod::Patch => reqwest::Method::PATCH,
            HttpMethod::Delete => reqwest::Method::DELETE,
        }
    }
}

/// Executor for `HTTP_REQUEST` nodes
#[derive(Debug, Clone)]
pub struct HttpRequestExecutor {
    client: reqwest::Client,
    require_variable_name: bool,
}

impl HttpRequestExecutor {
    pub fn new(settings: &HttpRequestSettings) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder().timeout(settings.timeout).build()?;
        Ok(Self {
            client,
            require_variable_name: settings.require_variable_name,
        })
    }
}

fn invalid(node_id: &str, reason: impl Into<String>) -> EngineError {
    EngineError::InvalidNodeConfig {
        node_id: node_id.to_string(),
        reason: reason.into(),
    }
}

/// Output variable names become context keys that later templates address
/// by dot path, so they must be plain identifiers.
fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_' || c == '$')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$')
}

fn is_json_content_type(content_type: &str) -> bool {
    let mime = content_type
        .split(';')
        .next()
        .unwrap_or("")
        .trim()
        .to_ascii_lowercase();
    mime == "application/json" || mime.ends_with("+json")
}

#[async_trait]
impl NodeExecutor for HttpRequestExecutor {
    async fn execute(&self, invocation: NodeInvocation<'_>) -> EngineResult<Context> {
        let NodeInvocation {
            node_id,
            config,
            context,
            step,
        } = invocation;

        // Validation and rendering are pure; only the request sits in the step.
        let config: HttpRequestConfig = serde_json::from_value(Value::Object(config.clone()))
            .map_err(|e| invalid(node_id, format!("invalid HTTP request configuration: {e}")))?;

        let endpoint = config
            .endpoint
            .as_deref()
            .map(str::trim)
            .filter(|endpoint| !endpoint.is_empty())
            .ok_or_else(|| invalid(node_id, "endpoint is required"))?;

        let variable_name = config
            .variable_name
            .as_deref()
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(str::to_string);
        match &variable_name {
            None if self.require_variable_name => {
                return Err(invalid(node_id, "variableName is required"));
            }
            Some(name) if !is_identifier(name) => {
                return Err(invalid(
                    node_id,
                    format!("variableName '{name}' must start with a letter, '_' or '$' and contain only letters, digits, '_' or '$'"),
                ));
            }
            _ => {}
        }

        let method = HttpMethod::parse(config.method.as_deref()).ok_or_else(|| {
            invalid(
                node_id,
                format!(
                    "unsupported HTTP method '{}'",
                    config.method.as_deref().unwrap_or_default()
                ),
            )
        })?;

        let rendered_endpoint =
            template::render(endpoint, &context).map_err(|source| EngineError::Template {
                node_id: node_id.to_string(),
                source,
            })?;
        let url = reqwest::Url::parse(&rendered_endpoint).map_err(|e| {
            invalid(
                node_id,
                format!("endpoint '{rendered_endpoint}' is not a valid URL: {e}"),
            )
        })?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(invalid(
                node_id,
                format!("endpoint '{rendered_endpoint}' must use http or https"),
            ));
        }

        let body = if method.carries_body() {
            let body_template = config
                .body
                .as_deref()
                .filter(|body| !body.trim().is_empty())
                .unwrap_or("{}");
            let rendered = template::render(body_template, &context)
                .map_err(|source| EngineError::Template {
                    node_id: node_id.to_string(),
                    source,
                })?;
            serde_json::from_str::<Value>(&rendered).map_err(|e| EngineError::MalformedBody {
                node_id: node_id.to_string(),
                reason: e.to_string(),
            })?;
            Some(rendered)
        } else {
            None
        };

        tracing::debug!("🌍 HTTP Request: {:?} {} (node '{}')", method, url, node_id);

        let client = self.client.clone();
        run_step(step, "http-request", async move {
            let mut request = client.request(method.as_reqwest(), url.clone());
            if let Some(body) = body {
                request = request.header(CONTENT_TYPE, "application/json").body(body);
            }

            let response = request.send().await.map_err(|source| EngineError::Http {
                node_id: node_id.to_string(),
                source,
            })?;

            let status = response.status();
            let status_text = status.canonical_reason().unwrap_or_default().to_string();
            tracing::debug!("📡 Response status: {}", status);

            if !status.is_success() {
                return Err(EngineError::HttpStatus {
                    node_id: node_id.to_string(),
                    status: status.as_u16(),
                    status_text,
                });
            }

            let json_response = response
                .headers()
                .get(CONTENT_TYPE)
                .and_then(|value| value.to_str().ok())
                .is_some_and(is_json_content_type);

            let text = response.text().await.map_err(|source| EngineError::Http {
                node_id: node_id.to_string(),
                source,
            })?;

            let data = if json_response {
                serde_json::from_str(&text).unwrap_or_else(|e| {
                    tracing::warn!(
                        "⚠️ Node '{}' got a JSON content type with an unparseable body ({}), keeping text",
                        node_id,
                        e
                    );
                    Value::String(text)
                })
            } else {
                Value::String(text)
            };

            tracing::info!("✅ HTTP request completed: {:?} {} (status: {})", method, url, status);

            let response_payload = json!({
                "httpResponse": {
                    "status": status.as_u16(),
                    "statusText": status_text,
                    "data": data,
                }
            });

            let mut next = context;
            match variable_name {
                Some(name) => {
                    next.insert(name, response_payload);
                }
                None => {
                    if let Value::Object(fields) = response_payload {
                        // Existing keys with the same name are overwritten.
                        next.extend(fields);
                    }
                }
            }
            Ok(next)
        })
        .await
    }
}
