use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::OnceLock;
use std::time::Instant;

/// Environment variable that turns profiling on at startup.
pub const PROFILE_ENV: &str = "PKBQL_PROFILE";

/// A snapshot of evaluation profiling counters.
///
/// Profiling is enabled via the `PKBQL_PROFILE` environment variable or
/// [`set_enabled`], and accumulates across every evaluation in the process.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QueryProfileSnapshot {
    /// Total nanoseconds spent evaluating clauses.
    pub clause_eval_ns: u64,
    /// Number of clauses evaluated.
    pub clause_eval_count: u64,
    /// Total nanoseconds spent joining result tables.
    pub join_ns: u64,
    /// Number of joins.
    pub join_count: u64,
    /// Total nanoseconds spent in PKB retrievals.
    pub pkb_retrieve_ns: u64,
    /// Number of PKB retrievals.
    pub pkb_retrieve_count: u64,
    /// Total nanoseconds spent projecting the final table.
    pub projection_ns: u64,
    /// Number of projections.
    pub projection_count: u64,
}

#[derive(Default)]
struct QueryProfileCounters {
    clause_eval_ns: AtomicU64,
    clause_eval_count: AtomicU64,
    join_ns: AtomicU64,
    join_count: AtomicU64,
    pkb_retrieve_ns: AtomicU64,
    pkb_retrieve_count: AtomicU64,
    projection_ns: AtomicU64,
    projection_count: AtomicU64,
}

static PROFILE_ENABLED: OnceLock<AtomicBool> = OnceLock::new();
static PROFILE_COUNTERS: OnceLock<QueryProfileCounters> = OnceLock::new();

fn enabled_flag() -> &'static AtomicBool {
    PROFILE_ENABLED.get_or_init(|| AtomicBool::new(std::env::var_os(PROFILE_ENV).is_some()))
}

/// True when counters are being collected.
pub fn profiling_enabled() -> bool {
    enabled_flag().load(Ordering::Relaxed)
}

/// Turns collection on or off for the whole process.
pub fn set_enabled(enabled: bool) {
    enabled_flag().store(enabled, Ordering::Relaxed);
}

fn counters() -> Option<&'static QueryProfileCounters> {
    profiling_enabled().then(|| PROFILE_COUNTERS.get_or_init(QueryProfileCounters::default))
}

pub(crate) fn profile_timer() -> Option<Instant> {
    profiling_enabled().then(Instant::now)
}

pub(crate) enum QueryProfileKind {
    /// One clause turned into a result table.
    ClauseEval,
    /// One result table join.
    Join,
    /// One relation or pattern lookup against the PKB.
    PkbRetrieve,
    /// Rendering the final table.
    Projection,
}

pub(crate) fn record_profile_timer(kind: QueryProfileKind, start: Option<Instant>) {
    let Some(start) = start else {
        return;
    };
    let Some(counters) = counters() else {
        return;
    };
    let nanos = start.elapsed().as_nanos().min(u64::MAX as u128) as u64;
    let (ns, count) = match kind {
        QueryProfileKind::ClauseEval => (&counters.clause_eval_ns, &counters.clause_eval_count),
        QueryProfileKind::Join => (&counters.join_ns, &counters.join_count),
        QueryProfileKind::PkbRetrieve => {
            (&counters.pkb_retrieve_ns, &counters.pkb_retrieve_count)
        }
        QueryProfileKind::Projection => (&counters.projection_ns, &counters.projection_count),
    };
    ns.fetch_add(nanos, Ordering::Relaxed);
    count.fetch_add(1, Ordering::Relaxed);
}

fn read(reset: bool) -> Option<QueryProfileSnapshot> {
    let counters = counters()?;
    let load = |counter: &AtomicU64| {
        if reset {
            counter.swap(0, Ordering::Relaxed)
        } else {
            counter.load(Ordering::Relaxed)
        }
    };
    Some(QueryProfileSnapshot {
        clause_eval_ns: load(&counters.clause_eval_ns),
        clause_eval_count: load(&counters.clause_eval_count),
        join_ns: load(&counters.join_ns),
        join_count: load(&counters.join_count),
        pkb_retrieve_ns: load(&counters.pkb_retrieve_ns),
        pkb_retrieve_count: load(&counters.pkb_retrieve_count),
        projection_ns: load(&counters.projection_ns),
        projection_count: load(&counters.projection_count),
    })
}

/// Current counter values, or `None` while profiling is disabled.
///
/// ```no_run
/// use pkbql::query::profile;
///
/// profile::set_enabled(true);
/// // ... evaluate some queries ...
/// if let Some(snapshot) = profile::snapshot() {
///     println!("joins: {} in {}ns", snapshot.join_count, snapshot.join_ns);
/// }
/// ```
pub fn snapshot() -> Option<QueryProfileSnapshot> {
    read(false)
}

/// Returns the current counters and zeroes them.
pub fn reset() -> Option<QueryProfileSnapshot> {
    read(true)
}
