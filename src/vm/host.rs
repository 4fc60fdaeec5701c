//! The host's cooperative scheduling primitive.

/// Requests that the host call back into the emulator on its next turn.
///
/// When a scheduled continuation fires, the host calls
/// [`Vm::run_slice`](crate::vm::Vm::run_slice). A cancelled continuation
/// must never fire.
pub trait HostScheduler {
    /// Identifies one scheduled continuation.
    type Handle;

    /// Arrange for `run_slice` to be called on a later host turn.
    fn schedule_continuation(&mut self) -> Self::Handle;

    /// Withdraw a continuation that has not fired yet.
    fn cancel_continuation(&mut self, handle: Self::Handle);
}

/// A single-slot frame queue for hosts that poll once per frame.
///
/// The terminal and browser hosts check [`FrameQueue::take_due`] each frame
/// and run a slice when it returns true.
#[derive(Debug, Clone, Default)]
pub struct FrameQueue {
    next_handle: u64,
    due: Option<u64>,
}

impl FrameQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Is a continuation waiting for the next frame?
    pub fn is_due(&self) -> bool {
        self.due.is_some()
    }

    /// Consume the waiting continuation, if any.
    pub fn take_due(&mut self) -> bool {
        self.due.take().is_some()
    }
}

impl HostScheduler for FrameQueue {
    type Handle = u64;

    fn schedule_continuation(&mut self) -> u64 {
        self.next_handle += 1;
        self.due = Some(self.next_handle);
        self.next_handle
    }

    fn cancel_continuation(&mut self, handle: u64) {
        if self.due == Some(handle) {
            self.due = None;
        }
    }
}
