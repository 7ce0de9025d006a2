use serde_json::Value;

use crate::client::{ChainBuilder, QueryClient};
use crate::error::ReplayError;
use crate::meta::{is_call_series, spread_args, Mutation, QueryMeta};
use crate::{metrics, Error, Result};

/// Rebuild a live, unexecuted chain from a recorded descriptor.
///
/// Synchronous and side-effect-free apart from the calls it makes on
/// `client`; execution stays with the caller, who can keep chaining on the
/// returned builder before awaiting it. Every failure surfaces as the
/// uniform [`Error::Replay`].
pub fn replay<C: QueryClient>(client: &C, meta: &QueryMeta) -> Result<C::Builder> {
    let builder = build(client, meta).map_err(Error::Replay)?;
    metrics::record_replay();
    tracing::debug!(
        target: "requery::replay",
        table = %meta.from,
        mutation = ?meta.mutation,
        "descriptor replayed"
    );
    Ok(builder)
}

fn build<C: QueryClient>(
    client: &C,
    meta: &QueryMeta,
) -> std::result::Result<C::Builder, ReplayError> {
    if meta.from.is_empty() {
        return Err(ReplayError::MissingCollection);
    }

    let mut query = client.select_from(&meta.from);

    if let Some(mutation) = meta.mutation {
        match mutation {
            Mutation::Delete => {
                let args: Vec<Value> = meta.mutation_options.clone().into_iter().collect();
                query.apply("delete", &args);
            }
            _ => {
                let values = meta
                    .values
                    .clone()
                    .ok_or(ReplayError::MissingValues(mutation))?;
                let mut args = vec![values];
                if let Some(options) = meta.mutation_options.clone() {
                    args.push(options);
                }
                query.apply(mutation.as_str(), &args);
            }
        }
    } else {
        // Reads always project; default to select-all when the chain never
        // recorded an explicit projection.
        match meta.modifiers.as_ref().and_then(|m| m.get("select")) {
            Some(recorded) => {
                query.apply("select", &spread_args(recorded));
            }
            None => {
                query.apply("select", &[Value::from("*")]);
            }
        }
    }

    // Filters are meaningless on insert and are skipped wholesale there.
    if meta.mutation != Some(Mutation::Insert) {
        if let Some(filters) = &meta.filters {
            for (name, recorded) in filters {
                if is_call_series(recorded) {
                    if let Value::Array(series) = recorded {
                        for call in series {
                            query.apply(name, &spread_args(call));
                        }
                    }
                } else {
                    query.apply(name, &spread_args(recorded));
                }
            }
        }
    }

    if let Some(modifiers) = &meta.modifiers {
        for (name, recorded) in modifiers {
            // The projection step above already consumed `select` for reads;
            // for mutations the entry replays here.
            if name == "select" && meta.mutation.is_none() {
                continue;
            }
            if recorded == &Value::Bool(true) {
                query.apply(name, &[]);
            } else {
                query.apply(name, &spread_args(recorded));
            }
        }
    }

    Ok(query)
}
