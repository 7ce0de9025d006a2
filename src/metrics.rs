use std::fmt::Write as _;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::OnceLock;

pub struct Metrics {
    // Recording
    pub calls_recorded_total: AtomicU64,

    // Resolution
    pub queries_resolved_total: AtomicU64,
    pub mutations_resolved_total: AtomicU64,

    // Replay
    pub replays_total: AtomicU64,
}

impl Default for Metrics {
    fn default() -> Self {
        Self {
            calls_recorded_total: AtomicU64::new(0),
            queries_resolved_total: AtomicU64::new(0),
            mutations_resolved_total: AtomicU64::new(0),
            replays_total: AtomicU64::new(0),
        }
    }
}

static METRICS: OnceLock<Metrics> = OnceLock::new();

pub fn metrics() -> &'static Metrics {
    METRICS.get_or_init(Metrics::default)
}

pub(crate) fn record_call() {
    metrics().calls_recorded_total.fetch_add(1, Ordering::Relaxed);
}

pub(crate) fn record_resolve(is_mutation: bool) {
    if is_mutation {
        metrics()
            .mutations_resolved_total
            .fetch_add(1, Ordering::Relaxed);
    } else {
        metrics()
            .queries_resolved_total
            .fetch_add(1, Ordering::Relaxed);
    }
}

pub(crate) fn record_replay() {
    metrics().replays_total.fetch_add(1, Ordering::Relaxed);
}

pub fn render_prometheus() -> String {
    let m = metrics();
    let mut s = String::new();
    let _ = writeln!(
        s,
        "# TYPE calls_recorded_total counter\ncalls_recorded_total {}",
        m.calls_recorded_total.load(Ordering::Relaxed)
    );
    let _ = writeln!(
        s,
        "# TYPE queries_resolved_total counter\nqueries_resolved_total {}",
        m.queries_resolved_total.load(Ordering::Relaxed)
    );
    let _ = writeln!(
        s,
        "# TYPE mutations_resolved_total counter\nmutations_resolved_total {}",
        m.mutations_resolved_total.load(Ordering::Relaxed)
    );
    let _ = writeln!(
        s,
        "# TYPE replays_total counter\nreplays_total {}",
        m.replays_total.load(Ordering::Relaxed)
    );
    s
}
