use std::sync::Arc;

use snafu::ResultExt as _;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

use super::*;
use crate::platform::Tables;
use crate::store;

/// Hands out at most `size` connections at a time. A [PooledConnection] gives its slot back when dropped.
#[derive(Debug, Clone)]
pub struct Pool {
    database: Database,
    tables: Tables,
    permits: Arc<Semaphore>,
}

impl Pool {
    pub fn new(database: Database, tables: Tables, size: usize) -> Self {
        Self {
            database,
            tables,
            permits: Arc::new(Semaphore::new(size.max(1))),
        }
    }

    /// Refuse every further checkout. Connections already handed out stay valid until dropped.
    pub fn close(&self) {
        self.permits.close();
    }
}

impl store::Pool for Pool {
    type Connection = PooledConnection;

    async fn acquire(&self) -> Result<PooledConnection> {
        let permit = self
            .permits
            .clone()
            .acquire_owned()
            .await
            .context(PoolClosedSnafu)?;

        self.database.health().await.context(UnhealthySnafu)?;
        tracing::debug!(available = self.permits.available_permits(), "checked out a connection");

        Ok(PooledConnection {
            database: self.database.clone(),
            tables: self.tables.clone(),
            _permit: permit,
        })
    }
}

/// A connection checked out of the [Pool].
#[derive(Debug)]
pub struct PooledConnection {
    pub(super) database: Database,
    pub(super) tables: Tables,
    _permit: OwnedSemaphorePermit,
}

impl Drop for PooledConnection {
    fn drop(&mut self) {
        tracing::debug!("released a connection");
    }
}
