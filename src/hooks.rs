use std::sync::Arc;

use serde_json::Value;

use crate::client::ResponseError;
use crate::meta::QueryMeta;

pub type RecordHook = Arc<dyn Fn(Value) -> Value + Send + Sync>;
pub type BeforeExecutionHook = Arc<dyn Fn(&QueryMeta) -> Value + Send + Sync>;
pub type ErrorHook = Arc<dyn Fn(ErrorEvent<'_>) + Send + Sync>;
pub type SuccessHook = Arc<dyn Fn(SuccessEvent<'_>) + Send + Sync>;
pub type SettledHook = Arc<dyn Fn(SettledEvent<'_>) + Send + Sync>;

/// Caller-owned lifecycle configuration, split into value-transform hooks
/// and phase action hooks.
#[derive(Clone, Default)]
pub struct Hooks {
    pub filters: FilterHooks,
    pub actions: ActionHooks,
}

impl Hooks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn queries(mut self, hooks: LifecycleHooks) -> Self {
        self.actions.queries = hooks;
        self
    }

    pub fn mutations(mut self, hooks: LifecycleHooks) -> Self {
        self.actions.mutations = hooks;
        self
    }

    /// Rewrite the record handed to `update` before it is forwarded.
    pub fn record_for_update(mut self, hook: impl Fn(Value) -> Value + Send + Sync + 'static) -> Self {
        self.filters.record_for_update = Some(Arc::new(hook));
        self
    }

    /// Rewrite the records handed to `insert` before they are forwarded.
    pub fn records_for_insert(
        mut self,
        hook: impl Fn(Value) -> Value + Send + Sync + 'static,
    ) -> Self {
        self.filters.records_for_insert = Some(Arc::new(hook));
        self
    }

    /// Rewrite the records handed to `upsert` before they are forwarded.
    pub fn records_for_upsert(
        mut self,
        hook: impl Fn(Value) -> Value + Send + Sync + 'static,
    ) -> Self {
        self.filters.records_for_upsert = Some(Arc::new(hook));
        self
    }
}

/// Value-transform hooks applied to mutation values on the forwarded call.
/// The metadata always records the original values.
#[derive(Clone, Default)]
pub struct FilterHooks {
    pub record_for_update: Option<RecordHook>,
    pub records_for_insert: Option<RecordHook>,
    pub records_for_upsert: Option<RecordHook>,
}

/// Action hooks, one set per phase. A chain with a recorded mutation runs
/// the `mutations` set; a read chain runs `queries`.
#[derive(Clone, Default)]
pub struct ActionHooks {
    pub mutations: LifecycleHooks,
    pub queries: LifecycleHooks,
}

#[derive(Clone, Default)]
pub struct LifecycleHooks {
    pub before_execution: Option<BeforeExecutionHook>,
    pub on_error: Option<ErrorHook>,
    pub on_success: Option<SuccessHook>,
    pub on_settled: Option<SettledHook>,
}

impl LifecycleHooks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Runs before the chain executes; the returned value is carried to the
    /// later hooks as [`HookContext::before_execution_result`].
    pub fn before_execution(
        mut self,
        hook: impl Fn(&QueryMeta) -> Value + Send + Sync + 'static,
    ) -> Self {
        self.before_execution = Some(Arc::new(hook));
        self
    }

    pub fn on_error(mut self, hook: impl Fn(ErrorEvent<'_>) + Send + Sync + 'static) -> Self {
        self.on_error = Some(Arc::new(hook));
        self
    }

    pub fn on_success(mut self, hook: impl Fn(SuccessEvent<'_>) + Send + Sync + 'static) -> Self {
        self.on_success = Some(Arc::new(hook));
        self
    }

    pub fn on_settled(mut self, hook: impl Fn(SettledEvent<'_>) + Send + Sync + 'static) -> Self {
        self.on_settled = Some(Arc::new(hook));
        self
    }
}

/// Shared context threaded through the post-execution hooks of one resolve.
#[derive(Clone, Debug, Default)]
pub struct HookContext {
    pub before_execution_result: Option<Value>,
}

pub struct ErrorEvent<'a> {
    pub error: &'a ResponseError,
    pub query_meta: &'a QueryMeta,
    pub context: &'a HookContext,
}

pub struct SuccessEvent<'a> {
    pub data: Option<&'a Value>,
    pub query_meta: &'a QueryMeta,
    pub context: &'a HookContext,
}

pub struct SettledEvent<'a> {
    pub data: Option<&'a Value>,
    pub error: Option<&'a ResponseError>,
    pub query_meta: &'a QueryMeta,
    pub context: &'a HookContext,
}
