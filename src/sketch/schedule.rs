/// Single-slot pending-work coalescing.
///
/// Any number of [`request`](FrameScheduler::request) calls between two host
/// ticks collapse into one execution on the next tick. The tick source is the
/// host's concern: an animation-frame callback in a browser, a vsync or timer
/// elsewhere.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FrameScheduler {
    pending: bool,
    requested: u64,
    coalesced: u64,
    executed: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SchedulerStats {
    pub requested: u64,
    pub coalesced: u64,
    pub executed: u64,
}

impl FrameScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` when this call scheduled new work, `false` when it was
    /// folded into an already pending tick.
    pub fn request(&mut self) -> bool {
        self.requested = self.requested.saturating_add(1);
        if self.pending {
            self.coalesced = self.coalesced.saturating_add(1);
            return false;
        }
        self.pending = true;
        true
    }

    pub fn is_pending(&self) -> bool {
        self.pending
    }

    /// Clears the pending slot, reporting whether work was due.
    pub fn take(&mut self) -> bool {
        if !self.pending {
            return false;
        }
        self.pending = false;
        self.executed = self.executed.saturating_add(1);
        true
    }

    pub fn run_if_pending<F, T>(&mut self, work: F) -> Option<T>
    where
        F: FnOnce() -> T,
    {
        if self.take() {
            Some(work())
        } else {
            None
        }
    }

    pub fn stats(&self) -> SchedulerStats {
        SchedulerStats {
            requested: self.requested,
            coalesced: self.coalesced,
            executed: self.executed,
        }
    }
}
