//! Application state shared across all request handlers.

use resinkeep_core::broker::NotificationBroker;
use resinkeep_core::mutation::MutationCoordinator;
use resinkeep_core::query::QueryEngine;
use resinkeep_core::store::Store;
use std::sync::Arc;

/// Cheap to clone; every member shares its internals behind an `Arc`.
#[derive(Clone)]
pub struct AppState {
    /// Read side: searches, single-entity lookups, distinct values.
    pub engine: QueryEngine,
    /// Write side: validation, persistence and change events.
    pub coordinator: MutationCoordinator,
    /// Subscriptions of open WebSocket connections.
    pub broker: NotificationBroker,
}

impl AppState {
    pub fn new(store: Arc<dyn Store>, broker: NotificationBroker) -> Self {
        Self {
            engine: QueryEngine::new(store.clone()),
            coordinator: MutationCoordinator::new(store, broker.clone()),
            broker,
        }
    }
}
