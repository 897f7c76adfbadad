use std::sync::Arc;

use bb8::Pool;
use bb8_tiberius::ConnectionManager;
use tokio::runtime::Runtime;

use super::convert;
use crate::config::SourceConfig;
use crate::errors::BenchError;
use crate::frame::TabularFrame;

/// The benchmark runs one case at a time, so the pool never needs more than
/// a single connection; what is being measured is the pool's checkout path.
const POOL_MAX_SIZE: u32 = 1;

/// Abstraction-layer path: a bb8 connection pool over tiberius.
///
/// The pool is built on the first fetch, every fetch checks a connection out
/// and returns it, and the pool is torn down when the adapter is dropped.
pub struct PooledClient {
    rt: Arc<Runtime>,
    config: SourceConfig,
    pool: Option<Pool<ConnectionManager>>,
}

impl PooledClient {
    pub fn new(rt: Arc<Runtime>, config: SourceConfig) -> Self {
        PooledClient { rt, config, pool: None }
    }

    pub fn fetch_arrow(&mut self, sql: &str) -> Result<TabularFrame, BenchError> {
        let pool = self.ensure_pool()?;

        let batches = self.rt.block_on(async {
            let mut conn = pool.get().await?;
            let stream = conn.query(sql, &[]).await?;
            convert::collect_batches(stream).await
        })?;
        Ok(TabularFrame::Columnar(batches))
    }

    pub fn fetch_rows(&mut self, sql: &str) -> Result<TabularFrame, BenchError> {
        let pool = self.ensure_pool()?;

        let rows = self.rt.block_on(async {
            let mut conn = pool.get().await?;
            let stream = conn.query(sql, &[]).await?;
            stream.into_first_result().await.map_err(BenchError::from)
        })?;
        Ok(TabularFrame::Rows(convert::rows_to_frame(rows)?))
    }

    fn ensure_pool(&mut self) -> Result<Pool<ConnectionManager>, BenchError> {
        if let Some(pool) = &self.pool {
            return Ok(pool.clone());
        }

        let config = self.config.to_tiberius()?;
        log::debug!("building connection pool for {}", config.get_addr());

        let manager = ConnectionManager::new(config);
        let pool = self
            .rt
            .block_on(Pool::builder().max_size(POOL_MAX_SIZE).build(manager))?;

        self.pool = Some(pool.clone());
        Ok(pool)
    }
}
