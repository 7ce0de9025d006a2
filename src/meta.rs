use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::map::Entry;
use serde_json::{Map as JsonMap, Value};

/// Insertion-ordered map backing the `filters` / `modifiers` namespaces.
///
/// serde_json's `preserve_order` feature is what makes iteration follow
/// first-recorded order; replay depends on that.
pub type MetaMap = JsonMap<String, Value>;

/// Write operations a chain can record. At most one per chain.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mutation {
    Update,
    Insert,
    Upsert,
    Delete,
}

impl Mutation {
    pub fn as_str(self) -> &'static str {
        match self {
            Mutation::Update => "update",
            Mutation::Insert => "insert",
            Mutation::Upsert => "upsert",
            Mutation::Delete => "delete",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "update" => Some(Mutation::Update),
            "insert" => Some(Mutation::Insert),
            "upsert" => Some(Mutation::Upsert),
            "delete" => Some(Mutation::Delete),
            _ => None,
        }
    }
}

impl fmt::Display for Mutation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Serializable descriptor of one query or mutation being built.
///
/// One instance is allocated per chain when the target collection is
/// selected; every wrapper along the chain mutates the same record. The
/// descriptor is plain data throughout, so it can cross process and cache
/// boundaries via serde.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryMeta {
    pub from: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mutation: Option<Mutation>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub values: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mutation_options: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filters: Option<MetaMap>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub modifiers: Option<MetaMap>,
    /// Top-level recordings of operations outside the classification tables.
    #[serde(flatten)]
    pub extra: MetaMap,
}

impl QueryMeta {
    pub fn for_table(table: impl Into<String>) -> Self {
        Self {
            from: table.into(),
            ..Default::default()
        }
    }

    pub fn is_mutation(&self) -> bool {
        self.mutation.is_some()
    }

    /// Record one filter invocation, promoting repeated invocations of the
    /// same name into a call series (one element per call, in call order).
    pub fn record_filter(&mut self, name: &str, args: &[Value]) {
        let filters = self.filters.get_or_insert_with(MetaMap::new);
        let Some(incoming) = canonical_args(args) else {
            filters.insert(name.to_string(), Value::Bool(true));
            return;
        };

        match filters.entry(name.to_string()) {
            Entry::Vacant(slot) => {
                slot.insert(incoming);
            }
            Entry::Occupied(mut slot) => {
                let existing = slot.get_mut();
                if is_call_series(existing) {
                    if let Value::Array(series) = existing {
                        series.push(call_tuple(args));
                    }
                } else {
                    let prior = std::mem::take(existing);
                    *existing = Value::Array(vec![wrap_call(prior), call_tuple(args)]);
                }
            }
        }
    }

    /// Record one modifier invocation. Repeats overwrite; the key keeps its
    /// first-recorded position in the map.
    pub fn record_modifier(&mut self, name: &str, args: &[Value]) {
        let modifiers = self.modifiers.get_or_insert_with(MetaMap::new);
        modifiers.insert(name.to_string(), modifier_value(name, args));
    }

    /// Record an operation outside the classification tables at the top
    /// level. A collection selection forwarded this way sets `from`.
    pub fn record_top_level(&mut self, name: &str, args: &[Value]) {
        if name == "from" {
            if let Some(Value::String(table)) = args.first() {
                self.from = table.clone();
            }
            return;
        }
        self.extra
            .insert(name.to_string(), modifier_value(name, args));
    }

    /// Record a mutation call. `delete` keeps its single optional argument as
    /// the options; the others split `(values, options?)`.
    pub fn record_mutation(&mut self, mutation: Mutation, args: &[Value]) {
        self.mutation = Some(mutation);
        if mutation == Mutation::Delete {
            self.mutation_options = canonical_args(args);
        } else {
            self.values = Some(args.first().cloned().unwrap_or(Value::Null));
            self.mutation_options = args.get(1).cloned();
        }
    }

    /// Merge caller-supplied fields into the descriptor. Escape hatch for
    /// metadata the recording path cannot infer.
    pub fn merge(&mut self, patch: MetaPatch) {
        if let Some(from) = patch.from {
            self.from = from;
        }
        if let Some(mutation) = patch.mutation {
            self.mutation = Some(mutation);
        }
        if let Some(values) = patch.values {
            self.values = Some(values);
        }
        if let Some(options) = patch.mutation_options {
            self.mutation_options = Some(options);
        }
        if let Some(filters) = patch.filters {
            let target = self.filters.get_or_insert_with(MetaMap::new);
            for (name, value) in filters {
                target.insert(name, value);
            }
        }
        if let Some(modifiers) = patch.modifiers {
            let target = self.modifiers.get_or_insert_with(MetaMap::new);
            for (name, value) in modifiers {
                target.insert(name, value);
            }
        }
        for (name, value) in patch.extra {
            self.extra.insert(name, value);
        }
    }
}

/// Partial [`QueryMeta`] for merge-style updates.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct MetaPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mutation: Option<Mutation>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub values: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mutation_options: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filters: Option<MetaMap>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub modifiers: Option<MetaMap>,
    #[serde(flatten)]
    pub extra: MetaMap,
}

/// Zero/one/many argument normalization: no arguments (or a lone `null`)
/// yields `None`, one argument passes through unwrapped, several become the
/// ordered argument list.
pub fn canonical_args(args: &[Value]) -> Option<Value> {
    match args {
        [] | [Value::Null] => None,
        [one] => Some(one.clone()),
        many => Some(Value::Array(many.to_vec())),
    }
}

/// True when a recorded filter value is a call series: a list whose every
/// element is itself a full argument tuple. An empty list counts, and
/// replays as a series of zero calls.
pub fn is_call_series(value: &Value) -> bool {
    match value {
        Value::Array(elements) => elements.iter().all(Value::is_array),
        _ => false,
    }
}

/// Expand a recorded value back into call arguments: a list spreads, any
/// other value is the sole argument.
pub fn spread_args(value: &Value) -> Vec<Value> {
    match value {
        Value::Array(elements) => elements.clone(),
        other => vec![other.clone()],
    }
}

fn modifier_value(name: &str, args: &[Value]) -> Value {
    match canonical_args(args) {
        Some(value) => value,
        None if name == "select" => Value::String("*".to_string()),
        None => Value::Bool(true),
    }
}

fn call_tuple(args: &[Value]) -> Value {
    Value::Array(args.to_vec())
}

fn wrap_call(existing: Value) -> Value {
    match existing {
        tuple @ Value::Array(_) => tuple,
        scalar => Value::Array(vec![scalar]),
    }
}

pub(crate) fn to_value<T: Serialize>(value: T) -> Value {
    serde_json::to_value(value).expect("failed to serialize query argument")
}
