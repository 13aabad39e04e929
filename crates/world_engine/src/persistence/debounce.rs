use std::time::{Duration, Instant};

pub const DEFAULT_SAVE_DEBOUNCE: Duration = Duration::from_millis(2000);

/// Trailing-edge debounce for world saves. Every mutation pushes the deadline
/// out by the window; the write fires once no mutation arrived for a full
/// window. Time is passed in so callers can simulate it.
#[derive(Debug)]
pub struct SaveDebouncer {
    window: Duration,
    deadline: Option<Instant>,
    coalesced: u32,
}

impl Default for SaveDebouncer {
    fn default() -> Self {
        Self::new(DEFAULT_SAVE_DEBOUNCE)
    }
}

impl SaveDebouncer {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            deadline: None,
            coalesced: 0,
        }
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    pub fn mark_dirty(&mut self, now: Instant) {
        self.deadline = Some(now + self.window);
        self.coalesced = self.coalesced.saturating_add(1);
    }

    pub fn is_pending(&self) -> bool {
        self.deadline.is_some()
    }

    /// Mutations folded into the pending write so far.
    pub fn pending_mutations(&self) -> u32 {
        self.coalesced
    }

    /// Returns `true` exactly once per burst, when the deadline has passed.
    pub fn poll(&mut self, now: Instant) -> bool {
        match self.deadline {
            Some(deadline) if now >= deadline => {
                self.cancel();
                true
            }
            _ => false,
        }
    }

    pub fn cancel(&mut self) {
        self.deadline = None;
        self.coalesced = 0;
    }
}
