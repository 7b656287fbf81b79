use std::sync::Arc;

use tokio::sync::Mutex;
use towermap_core::session::EditorSession;

use crate::config::ServerConfig;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// This is cheaply cloneable (inner data is behind `Arc`).
#[derive(Clone)]
pub struct AppState {
    /// The single editor session. Every request takes the lock for the whole
    /// modify-persist cycle, so mutations never interleave.
    pub session: Arc<Mutex<EditorSession>>,
    /// Server configuration.
    pub config: Arc<ServerConfig>,
}

impl AppState {
    pub fn new(session: EditorSession, config: ServerConfig) -> Self {
        Self {
            session: Arc::new(Mutex::new(session)),
            config: Arc::new(config),
        }
    }
}
