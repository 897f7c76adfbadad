//! Environment-based configuration, reified into plain structs at startup.
//!
//! Nothing else in the crate reads the environment; adapters and the driver
//! receive these structs by reference, which keeps them trivial to test with
//! fixtures.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use tiberius::{AuthMethod, Config, EncryptionLevel};

use crate::errors::BenchError;

pub const DEFAULT_ROW_COUNTS: &[u64] = &[100, 1_000, 10_000, 100_000];
pub const DEFAULT_RUNS: u32 = 3;
pub const DEFAULT_SAMPLE_INTERVAL_MS: u64 = 10;
pub const DEFAULT_REPORT_PATH: &str = "benchmark_results.md";
pub const DEFAULT_CSV_PATH: &str = "benchmark_results.csv";

/// Connection parameters for the SQL Server under test.
#[derive(Debug, Clone)]
pub struct SourceConfig {
    /// Server host, optionally `host\instance`.
    pub server: String,
    pub database: String,
    pub user: String,
    pub password: String,
    pub port: u16,
    /// Require TDS encryption. Implies trusting the server certificate,
    /// matching the original harness's `TrustServerCertificate=yes`.
    pub encrypt: bool,
    pub application_name: Option<String>,
    /// Table the paged benchmark queries read from.
    pub table: String,
}

impl SourceConfig {
    pub fn from_env() -> Result<Self, BenchError> {
        Ok(SourceConfig {
            server: required("MSSQL_SERVER")?,
            database: required("MSSQL_DB")?,
            user: required("MSSQL_USER")?,
            password: required("MSSQL_PWD")?,
            port: parsed_or("MSSQL_PORT", 1433)?,
            encrypt: parsed_or("MSSQL_ENCRYPT", false)?,
            application_name: optional("MSSQL_APPNAME"),
            table: required("SQL_BENCHMARK_TABLE")?,
        })
    }

    /// Build the tiberius [Config] for this source.
    ///
    /// SQL Server spells named instances `server\instance`; more than one
    /// backslash is rejected.
    pub fn to_tiberius(&self) -> Result<Config, BenchError> {
        let mut config = Config::new();

        let hosts: Vec<&str> = self.server.split('\\').collect();
        match hosts[..] {
            [host] => config.host(host),
            [host, instance] => {
                config.host(host);
                config.instance_name(instance);
            }
            _ => {
                return Err(BenchError::InvalidEnv {
                    var: "MSSQL_SERVER",
                    value: self.server.clone(),
                })
            }
        }
        config.port(self.port);
        config.database(&self.database);
        config.authentication(AuthMethod::sql_server(&self.user, &self.password));

        if self.encrypt {
            config.encryption(EncryptionLevel::Required);
            config.trust_cert();
        } else {
            config.encryption(EncryptionLevel::NotSupported);
        }

        if let Some(appname) = &self.application_name {
            config.application_name(appname);
        }

        Ok(config)
    }

    /// Whether the server host refers to the local machine.
    pub fn is_local(&self) -> bool {
        matches!(
            self.server.to_lowercase().as_str(),
            "localhost" | "127.0.0.1" | "." | "(local)"
        )
    }
}

/// Knobs of the benchmark itself, all optional in the environment.
#[derive(Debug, Clone)]
pub struct BenchParams {
    /// Row-count tiers, each benchmarked for every method.
    pub row_counts: Vec<u64>,
    /// Repeated runs per method×tier combination.
    pub runs: u32,
    /// Interval of the resident-memory sampler.
    pub sample_interval: Duration,
    pub report_path: PathBuf,
    pub csv_path: PathBuf,
}

impl BenchParams {
    pub fn from_env() -> Result<Self, BenchError> {
        let row_counts = match optional("BENCH_ROW_COUNTS") {
            Some(raw) => parse_row_counts(&raw)?,
            None => DEFAULT_ROW_COUNTS.to_vec(),
        };

        Ok(BenchParams {
            row_counts,
            runs: parsed_or("BENCH_RUNS", DEFAULT_RUNS)?,
            sample_interval: Duration::from_millis(parsed_or(
                "BENCH_SAMPLE_INTERVAL_MS",
                DEFAULT_SAMPLE_INTERVAL_MS,
            )?),
            report_path: optional("BENCH_REPORT_PATH")
                .map_or_else(|| PathBuf::from(DEFAULT_REPORT_PATH), PathBuf::from),
            csv_path: optional("BENCH_CSV_PATH")
                .map_or_else(|| PathBuf::from(DEFAULT_CSV_PATH), PathBuf::from),
        })
    }
}

fn parse_row_counts(raw: &str) -> Result<Vec<u64>, BenchError> {
    let invalid = || BenchError::InvalidEnv {
        var: "BENCH_ROW_COUNTS",
        value: raw.to_string(),
    };

    let counts = raw
        .split(',')
        .map(|part| part.trim().parse::<u64>())
        .collect::<Result<Vec<_>, _>>()
        .map_err(|_| invalid())?;

    if counts.is_empty() || counts.contains(&0) {
        return Err(invalid());
    }
    Ok(counts)
}

fn required(var: &'static str) -> Result<String, BenchError> {
    match env::var(var) {
        Ok(value) if !value.is_empty() => Ok(value),
        _ => Err(BenchError::MissingEnv(var)),
    }
}

fn optional(var: &str) -> Option<String> {
    env::var(var).ok().filter(|value| !value.is_empty())
}

fn parsed_or<T: std::str::FromStr>(var: &'static str, default: T) -> Result<T, BenchError> {
    match optional(var) {
        Some(raw) => raw.parse().map_err(|_| BenchError::InvalidEnv {
            var,
            value: raw.clone(),
        }),
        None => Ok(default),
    }
}
