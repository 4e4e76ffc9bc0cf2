use crate::config::EngineConfig;
use crate::domain::ports::{GraphqlRequest, GraphqlTransport};
use crate::utils::error::{MarkerError, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;

/// Headers reqwest computes itself; captured copies would conflict.
const MANAGED_HEADERS: [&str; 3] = ["content-length", "content-type", "host"];

/// Issues the engine's own GraphQL calls over HTTP.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
    endpoint: String,
}

impl HttpTransport {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            endpoint: endpoint.into(),
        }
    }

    pub fn from_config(config: &EngineConfig) -> Self {
        Self::new(config.marketplace.graphql_endpoint.clone())
    }
}

#[async_trait]
impl GraphqlTransport for HttpTransport {
    async fn execute(&self, request: &GraphqlRequest) -> Result<Value> {
        tracing::debug!(
            "Making GraphQL request {} to: {}",
            request.operation_name,
            self.endpoint
        );

        let mut builder = self.client.post(&self.endpoint).json(request);
        for (key, value) in &request.headers {
            if MANAGED_HEADERS.contains(&key.to_ascii_lowercase().as_str()) {
                continue;
            }
            builder = builder.header(key, value);
        }

        let response = builder.send().await?;
        let status = response.status();
        tracing::debug!("GraphQL response status: {}", status);

        if !status.is_success() {
            return Err(MarkerError::GraphqlError {
                message: format!("{} returned HTTP {}", request.operation_name, status),
            });
        }

        Ok(response.json().await?)
    }
}
