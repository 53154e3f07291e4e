use tokio::sync::broadcast;
use tracing::trace;

use crate::application::ports::ChangeNotifier;
use crate::domain::entities::EntityChange;

const DEFAULT_CAPACITY: usize = 256;

/// Fan-out of [`EntityChange`] events to any number of view-layer subscribers.
/// Slow subscribers lag instead of blocking writers.
#[derive(Clone)]
pub struct ChangeBus {
    sender: broadcast::Sender<EntityChange>,
}

impl ChangeBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<EntityChange> {
        self.sender.subscribe()
    }
}

impl Default for ChangeBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl ChangeNotifier for ChangeBus {
    fn publish(&self, change: EntityChange) {
        trace!(
            entity_type = %change.kind,
            entity_id = %change.entity_id,
            change = ?change.change,
            "publishing entity change"
        );
        // No subscribers is fine.
        let _ = self.sender.send(change);
    }
}
