use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::Result;

/// What a forwarded operation produced: a chain that can keep going, or a
/// terminal awaiting execution. The collaborator's interface contract
/// decides; nothing here inspects types at runtime.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChainStep {
    Chainable,
    Terminal,
}

/// Factory half of the wrapped-client contract.
pub trait QueryClient: Send + Sync + 'static {
    type Builder: ChainBuilder;

    fn select_from(&self, table: &str) -> Self::Builder;
}

/// Builder half of the wrapped-client contract: a fluent chain that accepts
/// named operations and finally executes.
#[async_trait]
pub trait ChainBuilder: Send + 'static {
    /// Apply one named operation with canonical JSON arguments. Fluent
    /// builders accumulate state, so this is infallible; failures surface at
    /// [`ChainBuilder::resolve`].
    fn apply(&mut self, method: &str, args: &[Value]) -> ChainStep;

    /// Execute the built query. `Err` models a transport/mechanism failure
    /// and is passed through untouched; `Ok` may still carry a backend error
    /// payload in [`RawResponse::error`].
    async fn resolve(self) -> Result<RawResponse>;
}

/// Undecorated execution result produced by the wrapped client.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RawResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ResponseError>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub count: Option<i64>,
}

impl RawResponse {
    pub fn with_data(data: Value) -> Self {
        Self {
            data: Some(data),
            ..Default::default()
        }
    }

    pub fn with_error(error: ResponseError) -> Self {
        Self {
            error: Some(error),
            ..Default::default()
        }
    }
}

/// Backend error payload carried inside a resolved response.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ResponseError {
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
}

impl ResponseError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            ..Default::default()
        }
    }
}

impl fmt::Display for ResponseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.code {
            Some(code) => write!(f, "{} ({code})", self.message),
            None => f.write_str(&self.message),
        }
    }
}
