//! In-memory collaborator for exercising recorded chains without a backend.
//!
//! [`RecordingClient`] captures every `select_from`/`apply` call it sees and
//! resolves with a configurable response, which is all the crate's own tests
//! need and is equally useful to downstream test suites.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::Value;

use crate::client::{ChainBuilder, ChainStep, QueryClient, RawResponse, ResponseError};
use crate::{Error, Result};

#[derive(Clone, Debug, PartialEq)]
pub struct RecordedCall {
    pub method: String,
    pub args: Vec<Value>,
}

impl RecordedCall {
    pub fn new(method: impl Into<String>, args: Vec<Value>) -> Self {
        Self {
            method: method.into(),
            args,
        }
    }
}

#[derive(Clone, Default)]
pub struct RecordingClient {
    calls: Arc<Mutex<Vec<RecordedCall>>>,
    response: Arc<Mutex<RawResponse>>,
    fail_resolve: Arc<Mutex<Option<String>>>,
}

impl RecordingClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Client whose chains resolve successfully with `data`.
    pub fn respond_with(data: Value) -> Self {
        let client = Self::new();
        client.set_response(RawResponse::with_data(data));
        client
    }

    /// Client whose chains resolve with a backend error payload.
    pub fn respond_error(message: impl Into<String>) -> Self {
        let client = Self::new();
        client.set_response(RawResponse::with_error(ResponseError::new(message)));
        client
    }

    pub fn set_response(&self, response: RawResponse) {
        *self.response.lock().expect("response poisoned") = response;
    }

    /// Make every subsequent resolve fail at the transport layer.
    pub fn fail_resolve(&self, message: impl Into<String>) {
        *self.fail_resolve.lock().expect("failure poisoned") = Some(message.into());
    }

    /// Every call seen so far, across all chains, in order.
    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().expect("call log poisoned").clone()
    }

    pub fn clear(&self) {
        self.calls.lock().expect("call log poisoned").clear();
    }
}

impl QueryClient for RecordingClient {
    type Builder = RecordingBuilder;

    fn select_from(&self, table: &str) -> RecordingBuilder {
        self.calls
            .lock()
            .expect("call log poisoned")
            .push(RecordedCall::new("select_from", vec![Value::from(table)]));
        RecordingBuilder {
            calls: self.calls.clone(),
            response: self.response.clone(),
            fail_resolve: self.fail_resolve.clone(),
        }
    }
}

#[derive(Debug)]
pub struct RecordingBuilder {
    calls: Arc<Mutex<Vec<RecordedCall>>>,
    response: Arc<Mutex<RawResponse>>,
    fail_resolve: Arc<Mutex<Option<String>>>,
}

#[async_trait]
impl ChainBuilder for RecordingBuilder {
    fn apply(&mut self, method: &str, args: &[Value]) -> ChainStep {
        self.calls
            .lock()
            .expect("call log poisoned")
            .push(RecordedCall::new(method, args.to_vec()));
        match method {
            "single" | "maybe_single" | "csv" | "geojson" | "explain" => ChainStep::Terminal,
            _ => ChainStep::Chainable,
        }
    }

    async fn resolve(self) -> Result<RawResponse> {
        if let Some(message) = self.fail_resolve.lock().expect("failure poisoned").clone() {
            return Err(Error::Client(message.into()));
        }
        Ok(self.response.lock().expect("response poisoned").clone())
    }
}
