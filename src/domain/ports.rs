use crate::utils::error::Result;
use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;

/// A GraphQL call issued by the engine itself.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphqlRequest {
    pub operation_name: String,
    pub query: String,
    pub variables: Value,
    #[serde(skip)]
    pub headers: HashMap<String, String>,
}

/// Pass-through call capability offered by the transport collaborator.
#[async_trait]
pub trait GraphqlTransport: Send + Sync {
    async fn execute(&self, request: &GraphqlRequest) -> Result<Value>;
}

/// The embedded page-state document, readable once per page load.
pub trait PageStateSource: Send + Sync {
    fn load(&self) -> Result<Option<Value>>;
}
