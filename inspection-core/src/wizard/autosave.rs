//! Request sequencing and debounce timing for autosave.

use std::time::Duration;

use tokio::time::Instant;

/// Identifies one outgoing request.
///
/// `generation` is the controller's edit generation when the request was
/// built; a response is only applicable if no edit happened since.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SaveTicket {
    pub seq: u64,
    pub generation: u64,
}

/// Issues monotonically increasing tickets and remembers the latest.
#[derive(Debug, Default)]
pub struct SaveSequencer {
    last_issued: u64,
}

impl SaveSequencer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn issue(
        &mut self,
        generation: u64,
    ) -> SaveTicket {
        self.last_issued += 1;
        SaveTicket {
            seq: self.last_issued,
            generation,
        }
    }

    pub fn is_latest(
        &self,
        ticket: SaveTicket,
    ) -> bool {
        ticket.seq == self.last_issued
    }
}

/// Fires once `window` has passed since the last touch.
#[derive(Debug)]
pub struct Debouncer {
    window: Duration,
    deadline: Option<Instant>,
}

impl Debouncer {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            deadline: None,
        }
    }

    /// Re-arms the deadline `window` after `now`.
    pub fn touch(
        &mut self,
        now: Instant,
    ) {
        self.deadline = Some(now + self.window);
    }

    pub fn is_due(
        &self,
        now: Instant,
    ) -> bool {
        self.deadline.is_some_and(|deadline| now >= deadline)
    }

    pub fn disarm(&mut self) {
        self.deadline = None;
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub fn window(&self) -> Duration {
        self.window
    }
}
