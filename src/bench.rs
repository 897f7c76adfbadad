//! The benchmark driver: runs every case in order, measures it, and never
//! lets one failure take the run down.

use std::collections::BTreeMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use itertools::Itertools;

use crate::measure::MemoryProbe;
use crate::methods::{FetchFn, Method};

/// One (method, row-count, run) execution.
#[derive(Debug, Clone)]
pub struct BenchmarkCase {
    pub method: Method,
    pub row_count: u64,
    /// Zero-based repeat index. Also offsets the query window so repeated
    /// runs do not re-read the exact pages the previous run warmed.
    pub run: u32,
    pub query: String,
}

/// Paged `SELECT *` over the benchmark table.
///
/// `ORDER BY (SELECT NULL)` satisfies the OFFSET clause without imposing a
/// sort, the same query shape for every method so results stay comparable.
pub fn paged_query(table: &str, row_count: u64, offset: u64) -> String {
    format!(
        "SELECT * FROM {table} ORDER BY (SELECT NULL) \
         OFFSET {offset} ROWS FETCH NEXT {row_count} ROWS ONLY"
    )
}

/// Static cross-product of methods × tiers × runs, method-major so each
/// method's cases are contiguous and its connection is reused across them.
pub fn build_cases(
    table: &str,
    methods: &[Method],
    row_counts: &[u64],
    runs: u32,
) -> Vec<BenchmarkCase> {
    let mut cases = Vec::with_capacity(methods.len() * row_counts.len() * runs as usize);
    for &method in methods {
        for &row_count in row_counts {
            for run in 0..runs {
                let offset = u64::from(run) * row_count;
                cases.push(BenchmarkCase {
                    method,
                    row_count,
                    run,
                    query: paged_query(table, row_count, offset),
                });
            }
        }
    }
    cases
}

/// Outcome of one executed case. Immutable once recorded.
#[derive(Debug, Clone)]
pub struct BenchmarkResult {
    pub method: Method,
    pub row_count: u64,
    pub run: u32,
    pub duration: Duration,
    /// Peak RSS observed while the case ran, in bytes.
    pub peak_rss: u64,
    /// Peak RSS growth over the case's baseline, in bytes.
    pub rss_delta: u64,
    /// Rows actually materialized; zero on failure.
    pub rows_returned: u64,
    pub success: bool,
    pub error: Option<String>,
}

/// Ordered results of one full run. Never mutated after the run completes.
pub struct ResultSet {
    pub started_at: DateTime<Utc>,
    results: Vec<BenchmarkResult>,
}

impl ResultSet {
    pub fn new(started_at: DateTime<Utc>, results: Vec<BenchmarkResult>) -> Self {
        ResultSet { started_at, results }
    }

    pub fn results(&self) -> &[BenchmarkResult] {
        &self.results
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    /// Methods in first-seen order.
    pub fn methods(&self) -> Vec<Method> {
        self.results.iter().map(|r| r.method).unique().collect()
    }

    /// Row-count tiers, ascending.
    pub fn row_counts(&self) -> Vec<u64> {
        self.results.iter().map(|r| r.row_count).unique().sorted().collect()
    }

    /// Mean duration over the successful runs of one combination.
    pub fn mean_duration(&self, method: Method, row_count: u64) -> Option<Duration> {
        let durations: Vec<Duration> = self
            .successes(method, row_count)
            .map(|r| r.duration)
            .collect();
        mean_of(&durations)
    }

    /// Mean peak-RSS delta in bytes over the successful runs of one
    /// combination.
    pub fn mean_rss_delta(&self, method: Method, row_count: u64) -> Option<f64> {
        let deltas: Vec<u64> = self
            .successes(method, row_count)
            .map(|r| r.rss_delta)
            .collect();
        if deltas.is_empty() {
            return None;
        }
        Some(deltas.iter().sum::<u64>() as f64 / deltas.len() as f64)
    }

    pub fn failures(&self) -> impl Iterator<Item = &BenchmarkResult> {
        self.results.iter().filter(|r| !r.success)
    }

    fn successes(
        &self,
        method: Method,
        row_count: u64,
    ) -> impl Iterator<Item = &BenchmarkResult> + '_ {
        self.results
            .iter()
            .filter(move |r| r.success && r.method == method && r.row_count == row_count)
    }
}

fn mean_of(durations: &[Duration]) -> Option<Duration> {
    if durations.is_empty() {
        return None;
    }
    Some(durations.iter().sum::<Duration>() / durations.len() as u32)
}

/// Execute every case in listed order against the method mapping.
///
/// Guarantees: exactly one [BenchmarkResult] per case, in input order. Any
/// failure of a fetch callable (an error return, a panic, or a method
/// missing from the mapping) is recorded on that case and the run
/// continues. The timed window covers only the callable itself: connect (if
/// the adapter has not connected yet), query, materialize.
pub fn run_cases(
    cases: &[BenchmarkCase],
    methods: &mut BTreeMap<Method, FetchFn>,
    sample_interval: Duration,
) -> ResultSet {
    let started_at = Utc::now();
    let mut results = Vec::with_capacity(cases.len());

    for case in cases {
        log::info!(
            "case {} rows={} run={}",
            case.method,
            case.row_count,
            case.run
        );

        let result = match methods.get_mut(&case.method) {
            Some(fetch) => execute_case(case, fetch, sample_interval),
            None => failed(case, Duration::ZERO, 0, 0, "no adapter registered for method"),
        };

        if let Some(error) = &result.error {
            log::warn!(
                "case {} rows={} run={} failed: {}",
                case.method,
                case.row_count,
                case.run,
                error
            );
        } else {
            log::info!(
                "case {} rows={} run={} took {:.3}s",
                case.method,
                case.row_count,
                case.run,
                result.duration.as_secs_f64()
            );
        }

        results.push(result);
    }

    ResultSet::new(started_at, results)
}

fn execute_case(
    case: &BenchmarkCase,
    fetch: &mut FetchFn,
    sample_interval: Duration,
) -> BenchmarkResult {
    let probe = MemoryProbe::start(sample_interval);
    let started = Instant::now();
    let outcome = catch_unwind(AssertUnwindSafe(|| fetch(&case.query)));
    let duration = started.elapsed();

    match outcome {
        Ok(Ok(frame)) => {
            let rows_returned = frame.row_count();
            // Final memory sample happens while the frame is still alive.
            let memory = probe.finish();
            drop(frame);
            BenchmarkResult {
                method: case.method,
                row_count: case.row_count,
                run: case.run,
                duration,
                peak_rss: memory.peak,
                rss_delta: memory.delta(),
                rows_returned,
                success: true,
                error: None,
            }
        }
        Ok(Err(err)) => {
            let memory = probe.finish();
            failed(case, duration, memory.peak, memory.delta(), &err.to_string())
        }
        Err(panic) => {
            let memory = probe.finish();
            failed(case, duration, memory.peak, memory.delta(), &panic_message(panic))
        }
    }
}

fn failed(
    case: &BenchmarkCase,
    duration: Duration,
    peak_rss: u64,
    rss_delta: u64,
    error: &str,
) -> BenchmarkResult {
    BenchmarkResult {
        method: case.method,
        row_count: case.row_count,
        run: case.run,
        duration,
        peak_rss,
        rss_delta,
        rows_returned: 0,
        success: false,
        error: Some(error.to_string()),
    }
}

fn panic_message(panic: Box<dyn std::any::Any + Send>) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        format!("fetch callable panicked: {message}")
    } else if let Some(message) = panic.downcast_ref::<String>() {
        format!("fetch callable panicked: {message}")
    } else {
        "fetch callable panicked".to_string()
    }
}
