use crate::meta::Mutation;

/// Read-narrowing predicate operations. Repeated invocation of one name in a
/// single chain is legal and recorded as a call series.
pub const FILTER_METHODS: [&str; 28] = [
    "eq",
    "neq",
    "gt",
    "gte",
    "lt",
    "lte",
    "like",
    "ilike",
    "like_all_of",
    "like_any_of",
    "ilike_all_of",
    "ilike_any_of",
    "is",
    "in",
    "not",
    "or",
    "and",
    "contains",
    "contained_by",
    "range_gt",
    "range_gte",
    "range_lt",
    "range_lte",
    "range_adjacent",
    "overlaps",
    "filter",
    "match",
    "text_search",
];

/// Non-predicate chain options. Repeated invocation overwrites.
pub const MODIFIER_METHODS: [&str; 12] = [
    "select",
    "order",
    "limit",
    "range",
    "abort_signal",
    "single",
    "maybe_single",
    "csv",
    "geojson",
    "explain",
    "rollback",
    "returns",
];

/// Write operations. Kept in parity with [`Mutation`].
pub const MUTATION_METHODS: [&str; 4] = ["update", "insert", "upsert", "delete"];

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MethodKind {
    Filter,
    Modifier,
    Mutation(Mutation),
    /// Not in any table; recorded at the metadata's top level and never
    /// replayed.
    Passthrough,
}

/// Classify an operation name against the fixed tables. Recorder and
/// replayer both route through this, so the tables stay in exact parity.
pub fn classify(name: &str) -> MethodKind {
    if let Some(mutation) = Mutation::from_name(name) {
        return MethodKind::Mutation(mutation);
    }
    if FILTER_METHODS.contains(&name) {
        return MethodKind::Filter;
    }
    if MODIFIER_METHODS.contains(&name) {
        return MethodKind::Modifier;
    }
    MethodKind::Passthrough
}
