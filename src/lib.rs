//! Requery — record-and-replay wrapper for fluent database query builders.
//!
//! Wrap a client and every chained call is forwarded to the real builder
//! while being recorded into a serializable [`QueryMeta`] descriptor; later,
//! [`replay`] rebuilds an equivalent live chain from the descriptor alone.

pub mod client;
mod error;
pub mod hooks;
pub mod meta;
pub mod methods;
pub mod metrics;
pub mod proxy;
pub mod replay;
pub mod testing;

pub use client::{ChainBuilder, ChainStep, QueryClient, RawResponse, ResponseError};
pub use error::{Error, ReplayError, Result};
pub use hooks::{ActionHooks, FilterHooks, HookContext, Hooks, LifecycleHooks};
pub use meta::{MetaMap, MetaPatch, Mutation, QueryMeta};
pub use methods::{classify, MethodKind, FILTER_METHODS, MODIFIER_METHODS, MUTATION_METHODS};
pub use proxy::{meta_from_query, MetaSource, ProxyBuilder, ProxyClient, QueryResponse};
pub use replay::replay;

pub mod prelude {
    pub use crate::{replay, Hooks, ProxyClient, QueryClient, QueryMeta, Result};
}
