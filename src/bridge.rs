//! Bridge between the remote model's flat tool-name space and the MCP-style
//! tool-execution backend.
//!
//! The remote protocol rejects `.` in tool names, so every catalog entry is
//! advertised under a sanitized name and mapped back to the original before
//! dispatch. The mapping is rebuilt from scratch on every catalog load.

use std::collections::HashMap;
use std::time::Duration;

use futures::future::BoxFuture;
use reqwest::Client;
use serde_json::{Value, json};
use url::Url;

use crate::error::{Error, Result};

const DEFAULT_TOOLS_PATH: &str = "mcp/tools";
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
const DISALLOWED_SEPARATOR: char = '.';

/// A tool as advertised to the remote model, keyed by its sanitized name.
#[derive(Debug, Clone)]
pub struct ToolDescriptor {
    pub name: String,
    pub description: String,
    pub parameters: Value,
}

/// A completed tool call parsed from an inbound model event.
#[derive(Debug, Clone)]
pub struct ToolCallRequest {
    pub name: String,
    pub args: Option<Value>,
    pub call_id: String,
}

/// The backend's answer to one tool call. `data` is always well-formed JSON,
/// falling back to an empty object when the response body was not.
#[derive(Debug, Clone)]
pub struct ToolCallResult {
    pub call_id: String,
    pub data: Value,
}

/// Seam between the session controller and the tool-execution service.
pub trait ToolBackend: Send {
    fn catalog(&mut self) -> BoxFuture<'_, Result<Vec<ToolDescriptor>>>;
    fn call(&self, request: ToolCallRequest) -> BoxFuture<'_, Result<ToolCallResult>>;
}

/// HTTP client for the tool-listing and tool-execution endpoints.
pub struct ToolBridge {
    client: Client,
    base_url: String,
    list_path: String,
    exec_path: String,
    mapping: HashMap<String, String>,
}

impl ToolBridge {
    /// Create a bridge against the given backend base URL.
    ///
    /// # Errors
    /// Returns an error if the URL is invalid or the HTTP client cannot be
    /// built.
    pub fn new(base_url: &str) -> Result<Self> {
        let parsed = Url::parse(base_url)?;
        let client = Client::builder().timeout(DEFAULT_TIMEOUT).build()?;
        Ok(Self {
            client,
            base_url: parsed.as_str().trim_end_matches('/').to_string(),
            list_path: DEFAULT_TOOLS_PATH.to_string(),
            exec_path: DEFAULT_TOOLS_PATH.to_string(),
            mapping: HashMap::new(),
        })
    }

    /// Override the listing and execution paths under the base URL.
    #[must_use]
    pub fn with_paths(mut self, list_path: &str, exec_path: &str) -> Self {
        self.list_path = list_path.trim_matches('/').to_string();
        self.exec_path = exec_path.trim_matches('/').to_string();
        self
    }

    /// Resolve a sanitized name back to the original tool identifier.
    ///
    /// A mapping miss is not an error: the given name is returned as-is,
    /// which covers tools invoked before any catalog load.
    #[must_use]
    pub fn resolve<'a>(&'a self, sanitized: &'a str) -> &'a str {
        self.mapping.get(sanitized).map_or(sanitized, String::as_str)
    }

    /// Fetch the tool catalog and rebuild the name mapping.
    ///
    /// Entries missing a name, description, or `input_schema` are skipped
    /// with a warning; an empty result after filtering is valid.
    ///
    /// # Errors
    /// Returns [`Error::CatalogLoad`] on a non-success status or a body that
    /// is not a JSON array.
    pub async fn load_catalog(&mut self) -> Result<Vec<ToolDescriptor>> {
        let url = format!("{}/{}", self.base_url, self.list_path);
        let response = self.client.get(&url).send().await?;
        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(Error::CatalogLoad(format!("{} {body}", status.as_u16())));
        }

        let parsed: Value = serde_json::from_str(&body)
            .map_err(|err| Error::CatalogLoad(format!("invalid JSON body: {err}")))?;
        let Value::Array(entries) = parsed else {
            return Err(Error::CatalogLoad("expected a JSON array of tools".to_string()));
        };

        Ok(self.rebuild(&entries))
    }

    fn rebuild(&mut self, entries: &[Value]) -> Vec<ToolDescriptor> {
        self.mapping.clear();

        let mut descriptors = Vec::with_capacity(entries.len());
        for entry in entries {
            let name = entry.get("name").and_then(Value::as_str);
            let description = entry.get("description").and_then(Value::as_str);
            let schema = entry.get("input_schema");
            let (Some(name), Some(description), Some(schema)) = (name, description, schema)
            else {
                tracing::warn!(?entry, "skipping tool entry with missing fields");
                continue;
            };

            let sanitized = sanitize_name(name);
            if self.mapping.contains_key(&sanitized) {
                // First entry wins; a silent overwrite would make dispatch
                // depend on catalog order in a non-obvious way.
                tracing::warn!(tool = name, %sanitized, "sanitized name collision, skipping");
                continue;
            }
            self.mapping.insert(sanitized.clone(), name.to_string());
            descriptors.push(ToolDescriptor {
                name: sanitized,
                description: description.to_string(),
                parameters: schema.clone(),
            });
        }
        descriptors
    }

    /// Execute one tool call against the backend.
    ///
    /// Success is determined purely by HTTP status: a 2xx with a non-JSON
    /// body yields an empty result object.
    ///
    /// # Errors
    /// Returns [`Error::ToolInvocation`] on a non-success status, carrying
    /// the status and response text.
    pub async fn invoke(&self, request: ToolCallRequest) -> Result<ToolCallResult> {
        let original = self.resolve(&request.name);
        let payload = json!({
            "tool": original,
            "params": request.args.clone().unwrap_or_else(|| json!({})),
            "request_id": request.call_id,
        });
        tracing::debug!(tool = original, call_id = %request.call_id, "dispatching tool call");

        let url = format!("{}/{}", self.base_url, self.exec_path);
        let response = self.client.post(&url).json(&payload).send().await?;
        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(Error::ToolInvocation { status: status.as_u16(), body });
        }

        let data = serde_json::from_str(&body).unwrap_or_else(|_| json!({}));
        Ok(ToolCallResult { call_id: request.call_id, data })
    }
}

impl ToolBackend for ToolBridge {
    fn catalog(&mut self) -> BoxFuture<'_, Result<Vec<ToolDescriptor>>> {
        Box::pin(self.load_catalog())
    }

    fn call(&self, request: ToolCallRequest) -> BoxFuture<'_, Result<ToolCallResult>> {
        Box::pin(self.invoke(request))
    }
}

fn sanitize_name(name: &str) -> String {
    name.replace(DISALLOWED_SEPARATOR, "_")
}
