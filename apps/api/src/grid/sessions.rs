//! Per-owner controller sessions.
//!
//! One `LayoutController` per authenticated owner, created lazily on first
//! access and loaded exactly once (plus explicit reloads). Concurrent tabs
//! for the same owner share the session; concurrent *processes* are not
//! coordinated — last-save-wins is the only consistency guarantee.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use uuid::Uuid;

use crate::grid::controller::{LayoutController, LoadState};
use crate::grid::model::GridConfig;
use crate::grid::persist::LayoutStore;

pub struct SessionRegistry {
    sessions: Mutex<HashMap<Uuid, Arc<Mutex<LayoutController>>>>,
    store: Arc<dyn LayoutStore>,
    config: GridConfig,
    debounce: Duration,
}

impl SessionRegistry {
    pub fn new(store: Arc<dyn LayoutStore>, config: GridConfig, debounce: Duration) -> Self {
        Self {
            sessions: Mutex::new(HashMap::new()),
            store,
            config,
            debounce,
        }
    }

    /// Returns the owner's controller, creating and loading it on first
    /// access. The load-once check runs under the controller's own lock so a
    /// racing second request waits instead of double-loading.
    pub async fn get_or_create(&self, user_id: Uuid) -> Arc<Mutex<LayoutController>> {
        let controller = {
            let mut sessions = self.sessions.lock().await;
            Arc::clone(sessions.entry(user_id).or_insert_with(|| {
                Arc::new(Mutex::new(LayoutController::new(
                    user_id,
                    Arc::clone(&self.store),
                    self.config,
                    self.debounce,
                )))
            }))
        };

        {
            let mut ctrl = controller.lock().await;
            if *ctrl.state() == LoadState::Uninitialized {
                ctrl.load_layout().await;
            }
        }

        controller
    }
}
