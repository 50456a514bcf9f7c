//! GraphQL transport.
//!
//! `GraphQlExecutor` is the seam between the application and the hosted
//! API: callers only ever see the trait, so tests inject canned responses
//! and nothing reaches for an ambient client.

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, warn};

/// Executes GraphQL documents against a workspace.
#[async_trait]
pub trait GraphQlExecutor: Send + Sync {
    /// Run a query or mutation and return the response's `data` value.
    async fn execute(&self, query: &str, variables: Value) -> Result<Value>;
}

/// Connection settings for the hosted API.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// GraphQL endpoint URL.
    pub api_url: String,
    /// Workspace API token, sent as a bearer credential when present.
    pub api_token: Option<String>,
    /// Request timeout in seconds.
    pub timeout_seconds: u64,
    /// Transport-level retries per request.
    pub retries: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_url: String::new(),
            api_token: None,
            timeout_seconds: 60,
            retries: 2,
        }
    }
}

#[derive(Debug, Serialize)]
struct GraphQlRequest<'a> {
    query: &'a str,
    variables: &'a Value,
}

#[derive(Debug, Deserialize)]
struct GraphQlResponse {
    #[serde(default)]
    data: Option<Value>,
    #[serde(default)]
    errors: Vec<GraphQlErrorEntry>,
}

#[derive(Debug, Deserialize)]
struct GraphQlErrorEntry {
    message: String,
}

/// Reqwest-backed executor.
pub struct HttpGraphQlClient {
    config: ClientConfig,
    http_client: reqwest::Client,
}

impl HttpGraphQlClient {
    /// Create a client for the given endpoint.
    pub fn new(config: ClientConfig) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            config,
            http_client,
        })
    }

    async fn post_once(&self, request: &GraphQlRequest<'_>) -> Result<GraphQlResponse> {
        let mut builder = self.http_client.post(&self.config.api_url).json(request);
        if let Some(token) = &self.config.api_token {
            builder = builder.bearer_auth(token);
        }

        let response = builder.send().await.map_err(|e| {
            if e.is_timeout() {
                anyhow::anyhow!(
                    "Request timed out after {}s",
                    self.config.timeout_seconds
                )
            } else if e.is_connect() {
                anyhow::anyhow!("Cannot connect to API at {}", self.config.api_url)
            } else {
                anyhow::anyhow!("Failed to send request: {}", e)
            }
        })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(anyhow::anyhow!("API error {}: {}", status, body));
        }

        response
            .json()
            .await
            .context("Failed to parse GraphQL response")
    }
}

#[async_trait]
impl GraphQlExecutor for HttpGraphQlClient {
    async fn execute(&self, query: &str, variables: Value) -> Result<Value> {
        let request = GraphQlRequest {
            query,
            variables: &variables,
        };

        let mut last_error = None;
        for attempt in 0..=self.config.retries {
            if attempt > 0 {
                warn!("retrying request, attempt {}/{}", attempt, self.config.retries);
                tokio::time::sleep(Duration::from_millis(250 * attempt as u64)).await;
            }

            match self.post_once(&request).await {
                Ok(response) => {
                    // GraphQL-level errors come back with HTTP 200 and are
                    // not transient; surface them without further attempts.
                    if !response.errors.is_empty() {
                        let messages = response
                            .errors
                            .iter()
                            .map(|e| e.message.as_str())
                            .collect::<Vec<_>>()
                            .join("; ");
                        return Err(anyhow::anyhow!("GraphQL errors: {}", messages));
                    }
                    debug!("request succeeded on attempt {}", attempt + 1);
                    return response
                        .data
                        .ok_or_else(|| anyhow::anyhow!("GraphQL response carried no data"));
                }
                Err(e) => last_error = Some(e),
            }
        }

        Err(last_error.unwrap_or_else(|| anyhow::anyhow!("Request failed")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_config_default() {
        let config = ClientConfig::default();
        assert_eq!(config.timeout_seconds, 60);
        assert_eq!(config.retries, 2);
        assert!(config.api_token.is_none());
    }

    #[test]
    fn test_response_with_errors_deserializes() {
        let raw = r#"{"errors":[{"message":"forbidden"}]}"#;
        let response: GraphQlResponse = serde_json::from_str(raw).unwrap();
        assert!(response.data.is_none());
        assert_eq!(response.errors.len(), 1);
        assert_eq!(response.errors[0].message, "forbidden");
    }

    #[test]
    fn test_response_without_errors_deserializes() {
        let raw = r#"{"data":{"op":{"edges":[]}}}"#;
        let response: GraphQlResponse = serde_json::from_str(raw).unwrap();
        assert!(response.data.is_some());
        assert!(response.errors.is_empty());
    }
}
