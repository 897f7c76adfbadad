use std::sync::Arc;

use tiberius::Client;
use tokio::net::TcpStream;
use tokio::runtime::Runtime;
use tokio_util::compat::{Compat, TokioAsyncWriteCompatExt};

use super::convert;
use crate::config::SourceConfig;
use crate::errors::BenchError;
use crate::frame::TabularFrame;

/// Raw tiberius client behind a synchronous face.
///
/// The async client is driven to completion on a shared current-thread
/// runtime; the connection is established on the first fetch and reused
/// until the adapter is dropped.
pub struct DirectClient {
    rt: Arc<Runtime>,
    config: SourceConfig,
    client: Option<Client<Compat<TcpStream>>>,
}

impl DirectClient {
    pub fn new(rt: Arc<Runtime>, config: SourceConfig) -> Self {
        DirectClient { rt, config, client: None }
    }

    /// Bulk columnar path: decode the result stream straight into Arrow.
    pub fn fetch_arrow(&mut self, sql: &str) -> Result<TabularFrame, BenchError> {
        self.ensure_connected()?;
        let rt = self.rt.clone();
        let client = self.client.as_mut().unwrap();

        let batches = rt.block_on(async {
            let stream = client.query(sql, &[]).await?;
            convert::collect_batches(stream).await
        })?;
        Ok(TabularFrame::Columnar(batches))
    }

    /// Row-oriented path: materialize the full result set as row tuples,
    /// then decode into a labelled frame.
    pub fn fetch_rows(&mut self, sql: &str) -> Result<TabularFrame, BenchError> {
        self.ensure_connected()?;
        let rt = self.rt.clone();
        let client = self.client.as_mut().unwrap();

        let rows = rt.block_on(async {
            let stream = client.query(sql, &[]).await?;
            stream.into_first_result().await
        })?;
        Ok(TabularFrame::Rows(convert::rows_to_frame(rows)?))
    }

    fn ensure_connected(&mut self) -> Result<(), BenchError> {
        if self.client.is_some() {
            return Ok(());
        }

        let config = self.config.to_tiberius()?;
        log::debug!("connecting to {}", config.get_addr());

        let client = self.rt.block_on(async {
            let tcp = TcpStream::connect(config.get_addr()).await?;
            tcp.set_nodelay(true)?;
            Client::connect(config, tcp.compat_write())
                .await
                .map_err(BenchError::Connect)
        })?;

        self.client = Some(client);
        Ok(())
    }
}
