/// Notifications the editor publishes for UI collaborators.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorldEvent {
    AssetLimitWarning {
        current: usize,
        max: usize,
        threshold: usize,
    },
    AssetLimitReached {
        current: usize,
        max: usize,
    },
    WorldSaved {
        asset_count: usize,
        timestamp_ms: u64,
    },
    WorldSaveError {
        error: String,
        asset_count: usize,
    },
}

impl WorldEvent {
    pub fn name(&self) -> &'static str {
        match self {
            WorldEvent::AssetLimitWarning { .. } => "asset-limit-warning",
            WorldEvent::AssetLimitReached { .. } => "asset-limit-reached",
            WorldEvent::WorldSaved { .. } => "world-saved",
            WorldEvent::WorldSaveError { .. } => "world-save-error",
        }
    }
}

/// FIFO of pending notifications; consumers drain it once per frame.
#[derive(Debug, Default)]
pub struct EventQueue {
    pending: Vec<WorldEvent>,
}

impl EventQueue {
    pub fn push(&mut self, event: WorldEvent) {
        self.pending.push(event);
    }

    pub fn drain(&mut self) -> Vec<WorldEvent> {
        std::mem::take(&mut self.pending)
    }

    pub fn peek(&self) -> &[WorldEvent] {
        &self.pending
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn drain_returns_events_in_order_and_empties_queue() {
        let mut queue = EventQueue::default();
        queue.push(WorldEvent::AssetLimitReached { current: 5, max: 5 });
        queue.push(WorldEvent::WorldSaved {
            asset_count: 5,
            timestamp_ms: 1,
        });

        let names = queue
            .drain()
            .iter()
            .map(WorldEvent::name)
            .collect::<Vec<_>>();
        assert_eq!(names, vec!["asset-limit-reached", "world-saved"]);
        assert!(queue.is_empty());
    }
}
