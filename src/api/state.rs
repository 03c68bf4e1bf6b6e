use crate::application::ChainWatcher;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    /// Absent until a credential is configured; the surface stays up and
    /// reports the unconfigured state.
    pub watcher: Option<Arc<ChainWatcher>>,
}
