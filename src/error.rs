use thiserror::Error;

use crate::meta::Mutation;

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
    #[error(
        "query was not produced by a proxy client; wrap the client with `ProxyClient::wrap` before chaining"
    )]
    NotRecorded,
    #[error("replay error: {0}")]
    Replay(ReplayError),
    #[error("client error: {0}")]
    Client(Box<dyn std::error::Error + Send + Sync>),
}

/// Causes a descriptor can fail to replay for, checked before any client call.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ReplayError {
    #[error("no target collection recorded")]
    MissingCollection,
    #[error("mutation `{0}` recorded without values")]
    MissingValues(Mutation),
}

pub type Result<T> = std::result::Result<T, Error>;
