use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{Mutex, RwLock};

use crate::gateway::{GatewayResult, TaskGateway};
use crate::workspace::Workspace;

/// Live workspaces keyed by user id. A workspace is loaded from the gateway
/// the first time its user is seen and kept for the life of the process.
#[derive(Default)]
pub struct SessionRegistry {
    sessions: RwLock<HashMap<String, Arc<Mutex<Workspace>>>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        SessionRegistry::default()
    }

    pub async fn open(&self, user_id: &str, gateway: &dyn TaskGateway) -> GatewayResult<Arc<Mutex<Workspace>>> {
        if let Some(workspace) = self.sessions.read().await.get(user_id) {
            return Ok(Arc::clone(workspace));
        }

        let tasks = gateway.list_tasks(user_id).await?;
        log::info!("🗂️  Opened workspace for user {} with {} tasks", user_id, tasks.len());

        let mut sessions = self.sessions.write().await;
        // Another request may have loaded it while we were reading the store.
        let workspace = sessions
            .entry(user_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(Workspace::new(tasks))));
        Ok(Arc::clone(workspace))
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }
}

/// Shared application state handed to every handler.
pub struct AppState {
    pub gateway: Arc<dyn TaskGateway>,
    pub sessions: SessionRegistry,
}

impl AppState {
    pub fn new(gateway: Arc<dyn TaskGateway>) -> Self {
        AppState {
            gateway,
            sessions: SessionRegistry::new(),
        }
    }

    pub async fn workspace(&self, user_id: &str) -> GatewayResult<Arc<Mutex<Workspace>>> {
        self.sessions.open(user_id, self.gateway.as_ref()).await
    }
}
