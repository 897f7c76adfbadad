use thiserror::Error;

/// Errors that can be raised from this crate.
///
/// Only the configuration and report variants are fatal to a benchmark run;
/// everything else is captured by the driver and recorded as a failed case.
#[derive(Error, Debug)]
pub enum BenchError {
    #[error("missing required environment variable {0}")]
    MissingEnv(&'static str),

    #[error("invalid value for {var}: {value:?}")]
    InvalidEnv { var: &'static str, value: String },

    #[error("failed to connect to SQL Server: {0}")]
    Connect(#[source] tiberius::error::Error),

    #[error("query returned no result sets")]
    NoResultSets,

    #[error("query returned more than one result set")]
    MultipleResultSets,

    #[error("result data does not match the inferred schema: {0}")]
    DataSchemaMismatch(String),

    #[error(transparent)]
    Tiberius(#[from] tiberius::error::Error),

    #[error(transparent)]
    PoolManager(#[from] bb8_tiberius::Error),

    #[error(transparent)]
    Pool(#[from] bb8::RunError<bb8_tiberius::Error>),

    #[error(transparent)]
    Arrow(#[from] arrow::error::ArrowError),

    #[error(transparent)]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
