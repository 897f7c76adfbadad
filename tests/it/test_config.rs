use std::env;
use std::time::Duration;

use frame_bench::config::{BenchParams, SourceConfig};
use frame_bench::BenchError;

/// Environment mutation is process-global, so everything touching the
/// `MSSQL_*`/`BENCH_*` variables lives in this one test.
#[test]
fn environment_round_trip_and_failures() {
    let connection_vars = [
        ("MSSQL_SERVER", "db.example.com"),
        ("MSSQL_DB", "bench"),
        ("MSSQL_USER", "sa"),
        ("MSSQL_PWD", "secret"),
        ("SQL_BENCHMARK_TABLE", "dbo.trades"),
    ];
    for (var, value) in connection_vars {
        env::set_var(var, value);
    }
    env::remove_var("MSSQL_PORT");
    env::remove_var("MSSQL_ENCRYPT");
    env::remove_var("MSSQL_APPNAME");

    let config = SourceConfig::from_env().unwrap();
    assert_eq!(config.server, "db.example.com");
    assert_eq!(config.database, "bench");
    assert_eq!(config.table, "dbo.trades");
    assert_eq!(config.port, 1433);
    assert!(!config.encrypt);
    assert!(config.application_name.is_none());
    assert!(config.to_tiberius().is_ok());

    env::set_var("MSSQL_PORT", "1533");
    env::set_var("MSSQL_ENCRYPT", "true");
    env::set_var("MSSQL_APPNAME", "frame-bench");
    let config = SourceConfig::from_env().unwrap();
    assert_eq!(config.port, 1533);
    assert!(config.encrypt);
    assert_eq!(config.application_name.as_deref(), Some("frame-bench"));

    env::set_var("MSSQL_PORT", "not-a-port");
    let err = SourceConfig::from_env().unwrap_err();
    assert!(matches!(err, BenchError::InvalidEnv { var: "MSSQL_PORT", .. }));
    env::set_var("MSSQL_PORT", "1433");

    // Each required variable is reported by name when missing.
    for (var, value) in connection_vars {
        env::remove_var(var);
        let err = SourceConfig::from_env().unwrap_err();
        assert!(
            err.to_string().contains(var),
            "expected {var} in {err}",
        );
        env::set_var(var, value);
    }

    // Benchmark parameters: defaults, overrides, rejects.
    env::remove_var("BENCH_ROW_COUNTS");
    env::remove_var("BENCH_RUNS");
    env::remove_var("BENCH_SAMPLE_INTERVAL_MS");
    env::remove_var("BENCH_REPORT_PATH");
    env::remove_var("BENCH_CSV_PATH");

    let params = BenchParams::from_env().unwrap();
    assert_eq!(params.row_counts, vec![100, 1_000, 10_000, 100_000]);
    assert_eq!(params.runs, 3);
    assert_eq!(params.sample_interval, Duration::from_millis(10));
    assert_eq!(params.report_path.to_str(), Some("benchmark_results.md"));

    env::set_var("BENCH_ROW_COUNTS", "500, 5000");
    env::set_var("BENCH_RUNS", "5");
    env::set_var("BENCH_SAMPLE_INTERVAL_MS", "2");
    env::set_var("BENCH_REPORT_PATH", "/tmp/report.md");
    let params = BenchParams::from_env().unwrap();
    assert_eq!(params.row_counts, vec![500, 5_000]);
    assert_eq!(params.runs, 5);
    assert_eq!(params.sample_interval, Duration::from_millis(2));
    assert_eq!(params.report_path.to_str(), Some("/tmp/report.md"));

    env::set_var("BENCH_RUNS", "many");
    let err = BenchParams::from_env().unwrap_err();
    assert!(matches!(err, BenchError::InvalidEnv { var: "BENCH_RUNS", .. }));

    env::set_var("BENCH_RUNS", "3");
    env::set_var("BENCH_ROW_COUNTS", "100,zero");
    let err = BenchParams::from_env().unwrap_err();
    assert!(matches!(
        err,
        BenchError::InvalidEnv { var: "BENCH_ROW_COUNTS", .. }
    ));

    for var in [
        "MSSQL_SERVER",
        "MSSQL_DB",
        "MSSQL_USER",
        "MSSQL_PWD",
        "MSSQL_PORT",
        "MSSQL_ENCRYPT",
        "MSSQL_APPNAME",
        "SQL_BENCHMARK_TABLE",
        "BENCH_ROW_COUNTS",
        "BENCH_RUNS",
        "BENCH_SAMPLE_INTERVAL_MS",
        "BENCH_REPORT_PATH",
    ] {
        env::remove_var(var);
    }
}
