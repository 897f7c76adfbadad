use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context;

use frame_bench::bench;
use frame_bench::config::{BenchParams, SourceConfig};
use frame_bench::methods::{self, Method};
use frame_bench::report::{self, SystemInfo};

fn main() -> ExitCode {
    env_logger::init();

    match try_main() {
        Ok(failures) => {
            // Individual case failures are already in the report; they do
            // not change the exit code.
            if failures > 0 {
                eprintln!("{failures} case(s) failed; see the report for details");
            }
            ExitCode::SUCCESS
        }
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::FAILURE
        }
    }
}

fn try_main() -> anyhow::Result<usize> {
    dotenvy::dotenv().ok();

    let source = SourceConfig::from_env().context("loading connection configuration")?;
    let params = BenchParams::from_env().context("loading benchmark parameters")?;

    let info = SystemInfo::collect(&source);
    if let Ok(json) = serde_json::to_string(&info) {
        log::info!("{json}");
    }

    println!(
        "Benchmarking {} methods x {} tiers x {} runs against {} ({})",
        Method::ALL.len(),
        params.row_counts.len(),
        params.runs,
        source.server,
        info.network_context,
    );

    let rt = Arc::new(
        tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .context("building tokio runtime")?,
    );

    let mut registry = methods::registry(rt, &source);
    let cases = bench::build_cases(&source.table, &Method::ALL, &params.row_counts, params.runs);
    let results = bench::run_cases(&cases, &mut registry, params.sample_interval);

    // Adapters drop here, releasing every connection before the artifacts
    // are written.
    drop(registry);

    report::write_markdown(&params.report_path, &results, &info, &source, &params)
        .with_context(|| format!("writing report to {}", params.report_path.display()))?;
    report::write_csv(&params.csv_path, &results)
        .with_context(|| format!("writing raw results to {}", params.csv_path.display()))?;

    let failures = results.failures().count();
    println!(
        "Completed {} cases ({} failed); report: {}, raw results: {}",
        results.len(),
        failures,
        params.report_path.display(),
        params.csv_path.display(),
    );

    Ok(failures)
}
