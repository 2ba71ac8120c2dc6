use std::sync::Arc;

use futures::future::join_all;
use tokio::sync::Mutex;

use crate::nodes::{ChainConnection, ConnectionError};

/// Every connection opened during a scenario group, kept for bulk teardown.
pub struct ConnectionPool<C> {
    connections: Mutex<Vec<Arc<C>>>,
}

impl<C> Default for ConnectionPool<C> {
    fn default() -> Self {
        Self {
            connections: Mutex::new(Vec::new()),
        }
    }
}

impl<C: ChainConnection> ConnectionPool<C> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn register(&self, connection: C) -> Arc<C> {
        let connection = Arc::new(connection);
        self.connections.lock().await.push(Arc::clone(&connection));
        connection
    }

    pub async fn len(&self) -> usize {
        self.connections.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Disconnects all registered connections concurrently and empties the
    /// pool. Failures are returned, never short-circuited.
    pub async fn disconnect_all(&self) -> Vec<ConnectionError> {
        let connections = std::mem::take(&mut *self.connections.lock().await);
        tracing::debug!(count = connections.len(), "disconnecting pooled connections");
        join_all(connections.iter().map(|connection| connection.disconnect()))
            .await
            .into_iter()
            .filter_map(Result::err)
            .collect()
    }
}
