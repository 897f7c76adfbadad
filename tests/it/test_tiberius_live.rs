//! Tests against a live SQL Server. They need the `MSSQL_*` variables and
//! `SQL_BENCHMARK_TABLE` to point at a reachable instance, so they are
//! ignored by default; run them with `cargo test -- --ignored`.

use std::sync::Arc;

use itertools::Itertools;

use frame_bench::bench::{build_cases, paged_query, run_cases};
use frame_bench::config::SourceConfig;
use frame_bench::methods::{registry, Method};

fn init() -> (Arc<tokio::runtime::Runtime>, SourceConfig) {
    let _ = env_logger::builder().is_test(true).try_init();
    dotenvy::dotenv().ok();

    let config = SourceConfig::from_env().unwrap();
    let rt = Arc::new(
        tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap(),
    );
    (rt, config)
}

#[test]
#[ignore]
fn every_method_materializes_the_same_rows() {
    let (rt, config) = init();
    let mut methods = registry(rt, &config);
    let sql = paged_query(&config.table, 50, 0);

    let counts: Vec<u64> = Method::ALL
        .iter()
        .map(|method| {
            let fetch = methods.get_mut(method).unwrap();
            let frame = fetch(&sql).unwrap();
            frame.row_count()
        })
        .collect();

    assert_eq!(counts.iter().unique().count(), 1, "row counts diverged: {counts:?}");
    assert!(counts[0] <= 50);
}

#[test]
#[ignore]
fn driver_completes_against_live_server() {
    let (rt, config) = init();
    let mut methods = registry(rt, &config);
    let cases = build_cases(&config.table, &Method::ALL, &[10, 100], 1);

    let results = run_cases(&cases, &mut methods, std::time::Duration::from_millis(5));

    assert_eq!(results.len(), cases.len());
    for result in results.results() {
        assert!(result.success, "{} failed: {:?}", result.method, result.error);
    }
}
