pub mod events;
pub mod export;
pub mod leaderboard;
pub mod progress;
pub mod session;
pub mod users;

use crate::auth::{IdentityProvider, LocalIdentity};
use crate::config::AppConfig;
use crate::protocol::ServerMessage;
use crate::store::{self, DocumentStore, MemoryStore, StoreResult};
use crate::types::SessionId;
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::{broadcast, RwLock};

use session::SessionEntry;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn DocumentStore>,
    pub identity: Arc<dyn IdentityProvider>,
    pub config: AppConfig,
    /// In-progress game sessions, never persisted
    pub sessions: Arc<RwLock<HashMap<SessionId, SessionEntry>>>,
    /// Broadcast channel for live feed clients
    pub live_broadcast: broadcast::Sender<ServerMessage>,
}

impl AppState {
    pub fn new(config: AppConfig) -> Self {
        Self::with_backends(
            Arc::new(MemoryStore::new()),
            Arc::new(LocalIdentity::new()),
            config,
        )
    }

    pub fn with_backends(
        store: Arc<dyn DocumentStore>,
        identity: Arc<dyn IdentityProvider>,
        config: AppConfig,
    ) -> Self {
        let (tx, _rx) = broadcast::channel(100);
        Self {
            store,
            identity,
            config,
            sessions: Arc::new(RwLock::new(HashMap::new())),
            live_broadcast: tx,
        }
    }

    /// Run a store call under the configured timeout
    pub(crate) async fn store_call<T, F>(&self, call: F) -> StoreResult<T>
    where
        F: Future<Output = StoreResult<T>>,
    {
        store::bounded(self.config.store_timeout, call).await
    }

    /// Push a message to every live feed client.
    pub fn notify(&self, msg: ServerMessage) {
        // No receivers connected is fine
        let _ = self.live_broadcast.send(msg);
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new(AppConfig::default())
    }
}
