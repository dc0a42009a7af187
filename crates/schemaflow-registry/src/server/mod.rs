//! In-memory, Confluent-compatible schema registry.
//!
//! Speaks the same REST dialect as the real service (error bodies, soft and
//! permanent deletes, global and per-subject compatibility) so the client,
//! the pipelines and `schemactl` can be exercised without an external
//! registry.
//!
//! ```ignore
//! let registry = LocalRegistry::start().await?;
//! let client = SchemaRegistryClient::new(registry.url())?;
//! ```

mod api;
pub mod compatibility;
mod store;

pub use api::router;
pub use store::{RegistryStore, StoreError, StoreResult};

use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::{TcpListener, ToSocketAddrs};
use tokio::task::JoinHandle;

/// A running local registry; stops when dropped.
pub struct LocalRegistry {
    addr: SocketAddr,
    store: Arc<RegistryStore>,
    task: JoinHandle<()>,
}

impl LocalRegistry {
    /// Serve on an ephemeral loopback port.
    pub async fn start() -> std::io::Result<Self> {
        Self::bind("127.0.0.1:0").await
    }

    pub async fn bind(addr: impl ToSocketAddrs) -> std::io::Result<Self> {
        let listener = TcpListener::bind(addr).await?;
        let addr = listener.local_addr()?;
        let store = Arc::new(RegistryStore::new());
        let app = router(Arc::clone(&store));

        let task = tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, app).await {
                tracing::error!(error = %e, "Local schema registry stopped");
            }
        });

        tracing::info!(addr = %addr, "Local schema registry listening");
        Ok(Self { addr, store, task })
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Base URL for [`crate::SchemaRegistryClient::new`].
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn store(&self) -> &Arc<RegistryStore> {
        &self.store
    }
}

impl Drop for LocalRegistry {
    fn drop(&mut self) {
        self.task.abort();
    }
}
