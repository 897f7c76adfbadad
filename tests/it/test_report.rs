use std::path::PathBuf;
use std::time::Duration;

use chrono::Utc;

use frame_bench::bench::{BenchmarkResult, ResultSet};
use frame_bench::config::{BenchParams, SourceConfig};
use frame_bench::methods::Method;
use frame_bench::report::{render_markdown, write_csv, SystemInfo};

fn result(
    method: Method,
    row_count: u64,
    run: u32,
    millis: u64,
    delta_mb: u64,
    error: Option<&str>,
) -> BenchmarkResult {
    BenchmarkResult {
        method,
        row_count,
        run,
        duration: Duration::from_millis(millis),
        peak_rss: (delta_mb + 100) * 1_048_576,
        rss_delta: delta_mb * 1_048_576,
        rows_returned: if error.is_none() { row_count } else { 0 },
        success: error.is_none(),
        error: error.map(str::to_string),
    }
}

fn fixture() -> ResultSet {
    ResultSet::new(
        Utc::now(),
        vec![
            result(Method::ArrowDirect, 100, 0, 100, 1, None),
            result(Method::ArrowDirect, 100, 1, 200, 3, None),
            result(Method::ArrowDirect, 1_000, 0, 300, 4, None),
            result(Method::RowsDirect, 100, 0, 50, 0, Some("login failed for user")),
            result(Method::RowsDirect, 1_000, 0, 50, 0, Some("login failed for user")),
        ],
    )
}

fn source() -> SourceConfig {
    SourceConfig {
        server: "localhost".into(),
        database: "bench".into(),
        user: "sa".into(),
        password: "secret".into(),
        port: 1433,
        encrypt: false,
        application_name: None,
        table: "dbo.trades".into(),
    }
}

fn params() -> BenchParams {
    BenchParams {
        row_counts: vec![100, 1_000],
        runs: 2,
        sample_interval: Duration::from_millis(10),
        report_path: PathBuf::from("benchmark_results.md"),
        csv_path: PathBuf::from("benchmark_results.csv"),
    }
}

fn info() -> SystemInfo {
    SystemInfo {
        platform: "Linux 6.8 (x86_64)".into(),
        cpu_count: 8,
        total_memory_gb: 32.0,
        server_host: "localhost".into(),
        network_context: "local",
    }
}

#[test]
fn markdown_tables_cover_methods_and_tiers() {
    let markdown = render_markdown(&fixture(), &info(), &source(), &params());

    // Duration table: mean of 100 ms and 200 ms at the 100-row tier.
    assert!(markdown.contains("| Method | 100 | 1.0K |"));
    assert!(markdown.contains("| arrow_direct | 0.150 | 0.300 |"));
    // A combination with no successful run renders as failed.
    assert!(markdown.contains("| rows_direct | failed | failed |"));

    // Memory table: mean delta of 1 MB and 3 MB.
    assert!(markdown.contains("| arrow_direct | 2.0 | 4.0 |"));

    // Scaling: 0.300 s over 0.150 s.
    assert!(markdown.contains("| Method | 100 → 1.0K |"));
    assert!(markdown.contains("| arrow_direct | 2.00x |"));
    assert!(markdown.contains("| rows_direct | n/a |"));

    // Failures are listed with their message.
    assert!(markdown.contains("## Failures"));
    assert!(markdown.contains("login failed for user"));

    // The methodology section names the sampler interval.
    assert!(markdown.contains("sampled every 10 ms"));
}

#[test]
fn markdown_omits_failure_section_when_clean() {
    let results = ResultSet::new(
        Utc::now(),
        vec![result(Method::ArrowDirect, 100, 0, 100, 1, None)],
    );
    let markdown = render_markdown(&results, &info(), &source(), &params());
    assert!(!markdown.contains("## Failures"));
    // A single tier has no adjacent pair to scale between.
    assert!(!markdown.contains("## Scaling ratios"));
}

#[test]
fn csv_has_one_record_per_result() {
    let path = std::env::temp_dir().join(format!(
        "frame_bench_results_{}.csv",
        std::process::id()
    ));

    let results = fixture();
    write_csv(&path, &results).unwrap();

    let raw = std::fs::read_to_string(&path).unwrap();
    let lines: Vec<&str> = raw.lines().collect();
    assert_eq!(lines.len(), 1 + results.len());
    assert!(lines[0].starts_with("timestamp,method,row_count,run,duration_seconds"));
    assert!(lines[1].contains("arrow_direct,100,0,0.100000"));
    assert!(lines[4].contains("login failed for user"));

    std::fs::remove_file(&path).unwrap();
}
