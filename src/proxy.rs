use std::fmt;
use std::future::{Future, IntoFuture};
use std::pin::Pin;
use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::client::{ChainBuilder, ChainStep, QueryClient, ResponseError};
use crate::hooks::{ErrorEvent, HookContext, Hooks, SettledEvent, SuccessEvent};
use crate::meta::{to_value, MetaPatch, Mutation, QueryMeta};
use crate::methods::{classify, MethodKind};
use crate::{metrics, Error, Result};

/// Wrapped client handle. Each [`ProxyClient::select_from`] allocates a
/// fresh [`QueryMeta`], so concurrent chains never share a descriptor.
pub struct ProxyClient<C: QueryClient> {
    client: Arc<C>,
    hooks: Arc<Hooks>,
}

impl<C: QueryClient> ProxyClient<C> {
    /// Wrap a client with no lifecycle hooks.
    pub fn wrap(client: C) -> Self {
        Self::wrap_with_hooks(client, Hooks::default())
    }

    /// Wrap a client with a lifecycle hook configuration shared by every
    /// chain started from this handle.
    pub fn wrap_with_hooks(client: C, hooks: Hooks) -> Self {
        Self {
            client: Arc::new(client),
            hooks: Arc::new(hooks),
        }
    }

    /// Start a chain against `table`. Allocates the chain's descriptor and
    /// obtains the underlying builder.
    pub fn select_from(&self, table: &str) -> ProxyBuilder<C> {
        let chain = self.client.select_from(table);
        ProxyBuilder {
            chain,
            meta: Arc::new(Mutex::new(QueryMeta::for_table(table))),
            client: self.client.clone(),
            hooks: self.hooks.clone(),
            stage: ChainStep::Chainable,
        }
    }

    /// The wrapped client, untouched.
    pub fn client(&self) -> &C {
        &self.client
    }

    pub fn hooks(&self) -> &Hooks {
        &self.hooks
    }
}

impl<C: QueryClient> Clone for ProxyClient<C> {
    fn clone(&self) -> Self {
        Self {
            client: self.client.clone(),
            hooks: self.hooks.clone(),
        }
    }
}

/// One link of an intercepted chain. Every fluent method records the call
/// into the shared descriptor, forwards it to the underlying builder, and
/// hands the same wrapper back, so interception persists across the chain.
///
/// Awaiting the builder (or calling [`ProxyBuilder::execute`]) resolves the
/// chain and yields a [`QueryResponse`] carrying the accumulated metadata.
pub struct ProxyBuilder<C: QueryClient> {
    chain: C::Builder,
    meta: Arc<Mutex<QueryMeta>>,
    client: Arc<C>,
    hooks: Arc<Hooks>,
    stage: ChainStep,
}

impl<C: QueryClient> ProxyBuilder<C> {
    /// Record and forward one named operation. The typed surface below is a
    /// thin layer over this; it is public so callers can reach operations
    /// outside the fixed tables (recorded top-level, never replayed).
    pub fn call(mut self, method: &str, args: Vec<Value>) -> Self {
        let forwarded = self.record(method, &args);
        let forwarded = forwarded.as_deref().unwrap_or(&args);
        self.stage = self.chain.apply(method, forwarded);
        metrics::record_call();
        self
    }

    fn record(&self, method: &str, args: &[Value]) -> Option<Vec<Value>> {
        let mut meta = self.meta.lock().expect("query meta poisoned");
        match classify(method) {
            MethodKind::Mutation(mutation) => {
                meta.record_mutation(mutation, args);
                let hook = match mutation {
                    Mutation::Update => self.hooks.filters.record_for_update.as_ref(),
                    Mutation::Insert => self.hooks.filters.records_for_insert.as_ref(),
                    Mutation::Upsert => self.hooks.filters.records_for_upsert.as_ref(),
                    Mutation::Delete => None,
                };
                hook.map(|hook| {
                    let rewritten = hook(meta.values.clone().unwrap_or(Value::Null));
                    let mut forwarded = vec![rewritten];
                    if let Some(options) = meta.mutation_options.clone() {
                        forwarded.push(options);
                    }
                    forwarded
                })
            }
            MethodKind::Filter => {
                meta.record_filter(method, args);
                None
            }
            MethodKind::Modifier => {
                meta.record_modifier(method, args);
                None
            }
            MethodKind::Passthrough => {
                meta.record_top_level(method, args);
                None
            }
        }
    }

    // === filters ===

    pub fn eq(self, column: &str, value: impl Serialize) -> Self {
        let value = to_value(value);
        self.call("eq", vec![Value::from(column), value])
    }

    pub fn neq(self, column: &str, value: impl Serialize) -> Self {
        let value = to_value(value);
        self.call("neq", vec![Value::from(column), value])
    }

    pub fn gt(self, column: &str, value: impl Serialize) -> Self {
        let value = to_value(value);
        self.call("gt", vec![Value::from(column), value])
    }

    pub fn gte(self, column: &str, value: impl Serialize) -> Self {
        let value = to_value(value);
        self.call("gte", vec![Value::from(column), value])
    }

    pub fn lt(self, column: &str, value: impl Serialize) -> Self {
        let value = to_value(value);
        self.call("lt", vec![Value::from(column), value])
    }

    pub fn lte(self, column: &str, value: impl Serialize) -> Self {
        let value = to_value(value);
        self.call("lte", vec![Value::from(column), value])
    }

    pub fn like(self, column: &str, pattern: &str) -> Self {
        self.call("like", vec![Value::from(column), Value::from(pattern)])
    }

    pub fn ilike(self, column: &str, pattern: &str) -> Self {
        self.call("ilike", vec![Value::from(column), Value::from(pattern)])
    }

    pub fn like_all_of(self, column: &str, patterns: &[&str]) -> Self {
        self.call("like_all_of", vec![Value::from(column), to_value(patterns)])
    }

    pub fn like_any_of(self, column: &str, patterns: &[&str]) -> Self {
        self.call("like_any_of", vec![Value::from(column), to_value(patterns)])
    }

    pub fn ilike_all_of(self, column: &str, patterns: &[&str]) -> Self {
        self.call("ilike_all_of", vec![Value::from(column), to_value(patterns)])
    }

    pub fn ilike_any_of(self, column: &str, patterns: &[&str]) -> Self {
        self.call("ilike_any_of", vec![Value::from(column), to_value(patterns)])
    }

    pub fn is(self, column: &str, value: impl Serialize) -> Self {
        let value = to_value(value);
        self.call("is", vec![Value::from(column), value])
    }

    pub fn in_<T: Serialize>(self, column: &str, values: impl IntoIterator<Item = T>) -> Self {
        let values = Value::Array(values.into_iter().map(to_value).collect());
        self.call("in", vec![Value::from(column), values])
    }

    pub fn not(self, column: &str, operator: &str, value: impl Serialize) -> Self {
        let value = to_value(value);
        self.call(
            "not",
            vec![Value::from(column), Value::from(operator), value],
        )
    }

    pub fn or(self, filters: &str) -> Self {
        self.call("or", vec![Value::from(filters)])
    }

    pub fn or_with(self, filters: &str, options: Value) -> Self {
        self.call("or", vec![Value::from(filters), options])
    }

    pub fn and(self, filters: &str) -> Self {
        self.call("and", vec![Value::from(filters)])
    }

    pub fn and_with(self, filters: &str, options: Value) -> Self {
        self.call("and", vec![Value::from(filters), options])
    }

    pub fn contains(self, column: &str, value: impl Serialize) -> Self {
        let value = to_value(value);
        self.call("contains", vec![Value::from(column), value])
    }

    pub fn contained_by(self, column: &str, value: impl Serialize) -> Self {
        let value = to_value(value);
        self.call("contained_by", vec![Value::from(column), value])
    }

    pub fn range_gt(self, column: &str, range: &str) -> Self {
        self.call("range_gt", vec![Value::from(column), Value::from(range)])
    }

    pub fn range_gte(self, column: &str, range: &str) -> Self {
        self.call("range_gte", vec![Value::from(column), Value::from(range)])
    }

    pub fn range_lt(self, column: &str, range: &str) -> Self {
        self.call("range_lt", vec![Value::from(column), Value::from(range)])
    }

    pub fn range_lte(self, column: &str, range: &str) -> Self {
        self.call("range_lte", vec![Value::from(column), Value::from(range)])
    }

    pub fn range_adjacent(self, column: &str, range: &str) -> Self {
        self.call(
            "range_adjacent",
            vec![Value::from(column), Value::from(range)],
        )
    }

    pub fn overlaps(self, column: &str, value: impl Serialize) -> Self {
        let value = to_value(value);
        self.call("overlaps", vec![Value::from(column), value])
    }

    /// Raw filter escape hatch: `column`, operator name, criteria.
    pub fn filter(self, column: &str, operator: &str, criteria: impl Serialize) -> Self {
        let criteria = to_value(criteria);
        self.call(
            "filter",
            vec![Value::from(column), Value::from(operator), criteria],
        )
    }

    /// Match every key/value pair of `query` by equality.
    pub fn match_(self, query: impl Serialize) -> Self {
        let query = to_value(query);
        self.call("match", vec![query])
    }

    pub fn text_search(self, column: &str, query: &str) -> Self {
        self.call("text_search", vec![Value::from(column), Value::from(query)])
    }

    pub fn text_search_with(self, column: &str, query: &str, options: Value) -> Self {
        self.call(
            "text_search",
            vec![Value::from(column), Value::from(query), options],
        )
    }

    // === modifiers ===

    pub fn select(self, columns: &str) -> Self {
        self.call("select", vec![Value::from(columns)])
    }

    pub fn select_with(self, columns: &str, options: Value) -> Self {
        self.call("select", vec![Value::from(columns), options])
    }

    /// Zero-argument projection; recorded as `"*"`.
    pub fn select_all(self) -> Self {
        self.call("select", Vec::new())
    }

    pub fn order(self, column: &str) -> Self {
        self.call("order", vec![Value::from(column)])
    }

    pub fn order_with(self, column: &str, options: Value) -> Self {
        self.call("order", vec![Value::from(column), options])
    }

    pub fn limit(self, count: i64) -> Self {
        self.call("limit", vec![Value::from(count)])
    }

    pub fn limit_with(self, count: i64, options: Value) -> Self {
        self.call("limit", vec![Value::from(count), options])
    }

    pub fn range(self, from: i64, to: i64) -> Self {
        self.call("range", vec![Value::from(from), Value::from(to)])
    }

    pub fn range_with(self, from: i64, to: i64, options: Value) -> Self {
        self.call("range", vec![Value::from(from), Value::from(to), options])
    }

    /// Opaque cancellation token handed through to the client.
    pub fn abort_signal(self, signal: impl Serialize) -> Self {
        let signal = to_value(signal);
        self.call("abort_signal", vec![signal])
    }

    pub fn single(self) -> Self {
        self.call("single", Vec::new())
    }

    pub fn maybe_single(self) -> Self {
        self.call("maybe_single", Vec::new())
    }

    pub fn csv(self) -> Self {
        self.call("csv", Vec::new())
    }

    pub fn geojson(self) -> Self {
        self.call("geojson", Vec::new())
    }

    pub fn explain(self) -> Self {
        self.call("explain", Vec::new())
    }

    pub fn explain_with(self, options: Value) -> Self {
        self.call("explain", vec![options])
    }

    pub fn rollback(self) -> Self {
        self.call("rollback", Vec::new())
    }

    pub fn returns(self) -> Self {
        self.call("returns", Vec::new())
    }

    // === mutations ===

    pub fn update(self, values: impl Serialize) -> Self {
        let values = to_value(values);
        self.call("update", vec![values])
    }

    pub fn update_with(self, values: impl Serialize, options: Value) -> Self {
        let values = to_value(values);
        self.call("update", vec![values, options])
    }

    pub fn insert(self, values: impl Serialize) -> Self {
        let values = to_value(values);
        self.call("insert", vec![values])
    }

    pub fn insert_with(self, values: impl Serialize, options: Value) -> Self {
        let values = to_value(values);
        self.call("insert", vec![values, options])
    }

    pub fn upsert(self, values: impl Serialize) -> Self {
        let values = to_value(values);
        self.call("upsert", vec![values])
    }

    pub fn upsert_with(self, values: impl Serialize, options: Value) -> Self {
        let values = to_value(values);
        self.call("upsert", vec![values, options])
    }

    pub fn delete(self) -> Self {
        self.call("delete", Vec::new())
    }

    pub fn delete_with(self, options: Value) -> Self {
        self.call("delete", vec![options])
    }

    // === extension operations ===

    /// Snapshot of the chain's descriptor so far.
    pub fn query_meta(&self) -> QueryMeta {
        self.meta.lock().expect("query meta poisoned").clone()
    }

    /// Merge caller-supplied fields into the shared descriptor.
    pub fn add_query_meta(&self, patch: MetaPatch) {
        self.meta.lock().expect("query meta poisoned").merge(patch);
    }

    /// The wrapped client, untouched.
    pub fn client(&self) -> &C {
        &self.client
    }

    /// A proxy handle sharing this chain's client and hooks.
    pub fn proxy(&self) -> ProxyClient<C> {
        ProxyClient {
            client: self.client.clone(),
            hooks: self.hooks.clone(),
        }
    }

    /// Whether the last forwarded operation reported the chain terminal.
    pub fn is_terminal(&self) -> bool {
        self.stage == ChainStep::Terminal
    }

    /// Resolve the chain: run the phase hooks around the underlying
    /// execution and decorate the result with the accumulated metadata.
    ///
    /// A transport failure (`Err` from the underlying resolve) propagates
    /// untouched and fires no post-execution hook; a backend error payload
    /// inside a resolved response fires `on_error` instead of `on_success`,
    /// and `on_settled` fires in both cases, afterwards.
    pub async fn execute(self) -> Result<QueryResponse> {
        let ProxyBuilder {
            chain, meta, hooks, ..
        } = self;

        let phase = {
            let meta = meta.lock().expect("query meta poisoned");
            if meta.is_mutation() {
                &hooks.actions.mutations
            } else {
                &hooks.actions.queries
            }
        };

        let before_execution_result = phase.before_execution.as_ref().map(|hook| {
            let meta = meta.lock().expect("query meta poisoned");
            hook(&meta)
        });

        let raw = chain.resolve().await?;

        let query_meta = meta.lock().expect("query meta poisoned").clone();
        let response = QueryResponse {
            data: raw.data,
            error: raw.error,
            count: raw.count,
            query_meta,
        };
        let context = HookContext {
            before_execution_result,
        };

        match &response.error {
            Some(error) => {
                if let Some(hook) = &phase.on_error {
                    hook(ErrorEvent {
                        error,
                        query_meta: &response.query_meta,
                        context: &context,
                    });
                }
            }
            None => {
                if let Some(hook) = &phase.on_success {
                    hook(SuccessEvent {
                        data: response.data.as_ref(),
                        query_meta: &response.query_meta,
                        context: &context,
                    });
                }
            }
        }
        if let Some(hook) = &phase.on_settled {
            hook(SettledEvent {
                data: response.data.as_ref(),
                error: response.error.as_ref(),
                query_meta: &response.query_meta,
                context: &context,
            });
        }

        metrics::record_resolve(response.query_meta.is_mutation());
        tracing::debug!(
            target: "requery::resolve",
            table = %response.query_meta.from,
            mutation = ?response.query_meta.mutation,
            errored = response.error.is_some(),
            "chain resolved"
        );

        Ok(response)
    }
}

impl<C: QueryClient> fmt::Debug for ProxyBuilder<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let meta = self.meta.lock().expect("query meta poisoned");
        f.debug_struct("ProxyBuilder")
            .field("from", &meta.from)
            .field("mutation", &meta.mutation)
            .field("stage", &self.stage)
            .finish()
    }
}

impl<C: QueryClient> IntoFuture for ProxyBuilder<C> {
    type Output = Result<QueryResponse>;
    type IntoFuture = Pin<Box<dyn Future<Output = Result<QueryResponse>> + Send>>;

    fn into_future(self) -> Self::IntoFuture {
        Box::pin(self.execute())
    }
}

/// Execution result decorated with the chain's descriptor.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ResponseError>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub count: Option<i64>,
    pub query_meta: QueryMeta,
}

/// Anything that may carry a recorded descriptor.
pub trait MetaSource {
    fn recorded_meta(&self) -> Option<QueryMeta>;
}

impl<C: QueryClient> MetaSource for ProxyBuilder<C> {
    fn recorded_meta(&self) -> Option<QueryMeta> {
        Some(self.query_meta())
    }
}

impl MetaSource for QueryResponse {
    fn recorded_meta(&self) -> Option<QueryMeta> {
        Some(self.query_meta.clone())
    }
}

/// Extract the descriptor from a chain link or a resolved response. Fails
/// with a descriptive error when the object was not produced by a proxy
/// client.
pub fn meta_from_query(source: &dyn MetaSource) -> Result<QueryMeta> {
    source.recorded_meta().ok_or(Error::NotRecorded)
}
