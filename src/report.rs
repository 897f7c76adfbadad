//! Turns a finished [ResultSet] into the two output artifacts: a markdown
//! report for humans and a raw CSV for later analysis.

use std::path::Path;

use serde::Serialize;
use sysinfo::System;

use crate::bench::ResultSet;
use crate::config::{BenchParams, SourceConfig};
use crate::errors::BenchError;
use crate::measure::bytes_to_mb;

/// Host facts recorded alongside the numbers, since a loading benchmark is
/// meaningless without knowing where it ran.
#[derive(Debug, Clone, Serialize)]
pub struct SystemInfo {
    pub platform: String,
    pub cpu_count: usize,
    pub total_memory_gb: f64,
    pub server_host: String,
    /// `"local"` when the SQL Server runs on this machine, else `"remote"`.
    pub network_context: &'static str,
}

impl SystemInfo {
    pub fn collect(source: &SourceConfig) -> Self {
        let mut sys = System::new();
        sys.refresh_memory();

        let platform = format!(
            "{} ({})",
            System::long_os_version().unwrap_or_else(|| std::env::consts::OS.to_string()),
            std::env::consts::ARCH
        );

        SystemInfo {
            platform,
            cpu_count: std::thread::available_parallelism().map_or(0, |n| n.get()),
            total_memory_gb: (sys.total_memory() as f64 / 1_073_741_824.0 * 10.0).round() / 10.0,
            server_host: source.server.clone(),
            network_context: if source.is_local() { "local" } else { "remote" },
        }
    }
}

/// Render the full markdown report.
pub fn render_markdown(
    results: &ResultSet,
    info: &SystemInfo,
    source: &SourceConfig,
    params: &BenchParams,
) -> String {
    let mut out = String::new();

    out.push_str("# SQL Server Data Loading Benchmark\n\n");
    out.push_str(&format!(
        "Generated: {}\n\n",
        results.started_at.format("%Y-%m-%d %H:%M:%S UTC")
    ));

    out.push_str("## Environment\n\n");
    out.push_str("| | |\n|---|---|\n");
    out.push_str(&format!("| Platform | {} |\n", info.platform));
    out.push_str(&format!("| CPUs | {} |\n", info.cpu_count));
    out.push_str(&format!("| Memory | {:.1} GB |\n", info.total_memory_gb));
    out.push_str(&format!(
        "| SQL Server host | {} ({}) |\n",
        info.server_host, info.network_context
    ));
    out.push_str(&format!("| Table | {} |\n\n", source.table));

    let methods = results.methods();
    let tiers = results.row_counts();

    out.push_str("## Duration by row count\n\n");
    out.push_str(&format!(
        "Mean wall-clock seconds over the successful runs of each \
         combination ({} per combination); `failed` where no run succeeded.\n\n",
        params.runs
    ));
    out.push_str(&table_header(&tiers));
    for method in &methods {
        out.push_str(&format!("| {method} |"));
        for &tier in &tiers {
            match results.mean_duration(*method, tier) {
                Some(duration) => out.push_str(&format!(" {:.3} |", duration.as_secs_f64())),
                None => out.push_str(" failed |"),
            }
        }
        out.push('\n');
    }
    out.push('\n');

    out.push_str("## Peak memory delta by row count\n\n");
    out.push_str("Mean peak-RSS growth in MB over the successful runs.\n\n");
    out.push_str(&table_header(&tiers));
    for method in &methods {
        out.push_str(&format!("| {method} |"));
        for &tier in &tiers {
            match results.mean_rss_delta(*method, tier) {
                Some(delta) => out.push_str(&format!(" {:.1} |", bytes_to_mb(delta as u64))),
                None => out.push_str(" failed |"),
            }
        }
        out.push('\n');
    }
    out.push('\n');

    if tiers.len() > 1 {
        out.push_str("## Scaling ratios\n\n");
        out.push_str("Duration growth factor between adjacent row-count tiers.\n\n");
        out.push_str("| Method |");
        for pair in tiers.windows(2) {
            out.push_str(&format!(
                " {} → {} |",
                format_count(pair[0]),
                format_count(pair[1])
            ));
        }
        out.push_str("\n|---|");
        out.push_str(&"---|".repeat(tiers.len() - 1));
        out.push('\n');
        for method in &methods {
            out.push_str(&format!("| {method} |"));
            for pair in tiers.windows(2) {
                let ratio = match (
                    results.mean_duration(*method, pair[0]),
                    results.mean_duration(*method, pair[1]),
                ) {
                    (Some(lo), Some(hi)) if lo.as_secs_f64() > 0.0 => {
                        Some(hi.as_secs_f64() / lo.as_secs_f64())
                    }
                    _ => None,
                };
                match ratio {
                    Some(ratio) => out.push_str(&format!(" {ratio:.2}x |")),
                    None => out.push_str(" n/a |"),
                }
            }
            out.push('\n');
        }
        out.push('\n');
    }

    let failures: Vec<_> = results.failures().collect();
    if !failures.is_empty() {
        out.push_str("## Failures\n\n");
        out.push_str("| Method | Rows | Run | Error |\n|---|---|---|---|\n");
        for failure in failures {
            out.push_str(&format!(
                "| {} | {} | {} | {} |\n",
                failure.method,
                format_count(failure.row_count),
                failure.run,
                failure.error.as_deref().unwrap_or("unknown")
            ));
        }
        out.push('\n');
    }

    out.push_str("## Methodology\n\n");
    out.push_str(
        "- The timed window is the full user-visible path: connect (on the \
         first case of a method), query, materialize the frame. Process \
         startup and result bookkeeping are excluded.\n",
    );
    out.push_str(&format!(
        "- Memory is process RSS sampled every {} ms plus a sample at case \
         start and end; the delta is peak minus the case's baseline. \
         Allocator retention means deltas after the first case of a process \
         can be understated.\n",
        params.sample_interval.as_millis()
    ));
    out.push_str(
        "- Cases run strictly sequentially on one thread; a failed case is \
         recorded and never retried.\n",
    );

    out
}

pub fn write_markdown(
    path: &Path,
    results: &ResultSet,
    info: &SystemInfo,
    source: &SourceConfig,
    params: &BenchParams,
) -> Result<(), BenchError> {
    std::fs::write(path, render_markdown(results, info, source, params))?;
    Ok(())
}

/// One CSV record per result, in execution order.
pub fn write_csv(path: &Path, results: &ResultSet) -> Result<(), BenchError> {
    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record([
        "timestamp",
        "method",
        "row_count",
        "run",
        "duration_seconds",
        "memory_peak_mb",
        "memory_delta_mb",
        "rows_returned",
        "success",
        "error",
    ])?;

    let timestamp = results.started_at.format("%Y-%m-%d %H:%M:%S").to_string();
    for result in results.results() {
        let record = [
            timestamp.clone(),
            result.method.label().to_string(),
            result.row_count.to_string(),
            result.run.to_string(),
            format!("{:.6}", result.duration.as_secs_f64()),
            format!("{:.3}", bytes_to_mb(result.peak_rss)),
            format!("{:.3}", bytes_to_mb(result.rss_delta)),
            result.rows_returned.to_string(),
            result.success.to_string(),
            result.error.clone().unwrap_or_default(),
        ];
        writer.write_record(&record)?;
    }
    writer.flush()?;
    Ok(())
}

fn table_header(tiers: &[u64]) -> String {
    let mut header = String::from("| Method |");
    for &tier in tiers {
        header.push_str(&format!(" {} |", format_count(tier)));
    }
    header.push_str("\n|---|");
    header.push_str(&"---|".repeat(tiers.len()));
    header.push('\n');
    header
}

/// Compact row counts for table headers: `100`, `1.0K`, `2.5M`.
pub fn format_count(n: u64) -> String {
    if n >= 1_000_000 {
        format!("{:.1}M", n as f64 / 1_000_000.0)
    } else if n >= 1_000 {
        format!("{:.1}K", n as f64 / 1_000.0)
    } else {
        n.to_string()
    }
}
