//! The access methods under benchmark, each exposed to the driver as a
//! uniform fetch callable.
//!
//! Methods are the cross-product of two connectivity paths (a raw tiberius
//! client, a bb8-pooled connection) and two target representations (Arrow
//! record batches, a labelled row frame). Adapters own their connection
//! state: it is established lazily inside the first fetch, so connection
//! cost lands in the first case's timed window, reused across the method's
//! remaining cases, and released when the adapter is dropped.

pub mod convert;
mod direct;
mod pooled;

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use tokio::runtime::Runtime;

pub use direct::DirectClient;
pub use pooled::PooledClient;

use crate::config::SourceConfig;
use crate::errors::BenchError;
use crate::frame::TabularFrame;

/// Fetch callable handed to the driver: SQL text in, materialized frame out.
pub type FetchFn = Box<dyn FnMut(&str) -> Result<TabularFrame, BenchError>>;

/// The fixed set of access methods.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Method {
    /// Raw tiberius client, result stream decoded straight into Arrow.
    ArrowDirect,
    /// Raw tiberius client, result set materialized as row tuples.
    RowsDirect,
    /// bb8-pooled connection, decoded into Arrow.
    ArrowPooled,
    /// bb8-pooled connection, materialized as row tuples.
    RowsPooled,
}

impl Method {
    pub const ALL: [Method; 4] = [
        Method::ArrowDirect,
        Method::RowsDirect,
        Method::ArrowPooled,
        Method::RowsPooled,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Method::ArrowDirect => "arrow_direct",
            Method::RowsDirect => "rows_direct",
            Method::ArrowPooled => "arrow_pooled",
            Method::RowsPooled => "rows_pooled",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Build the method→callable mapping the driver runs against.
///
/// Each method gets its own adapter instance, so no two methods share a
/// connection. The raw-client methods share nothing but the runtime; the
/// pooled methods each own their own pool.
pub fn registry(rt: Arc<Runtime>, config: &SourceConfig) -> BTreeMap<Method, FetchFn> {
    let mut methods: BTreeMap<Method, FetchFn> = BTreeMap::new();

    for method in Method::ALL {
        let fetch: FetchFn = match method {
            Method::ArrowDirect => {
                let mut client = DirectClient::new(rt.clone(), config.clone());
                Box::new(move |sql: &str| client.fetch_arrow(sql))
            }
            Method::RowsDirect => {
                let mut client = DirectClient::new(rt.clone(), config.clone());
                Box::new(move |sql: &str| client.fetch_rows(sql))
            }
            Method::ArrowPooled => {
                let mut client = PooledClient::new(rt.clone(), config.clone());
                Box::new(move |sql: &str| client.fetch_arrow(sql))
            }
            Method::RowsPooled => {
                let mut client = PooledClient::new(rt.clone(), config.clone());
                Box::new(move |sql: &str| client.fetch_rows(sql))
            }
        };
        methods.insert(method, fetch);
    }

    methods
}
