//! Flow control shared between a running reader and its handles

use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::Arc;

use tokio::sync::Notify;

/// Lifecycle of a line reader
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReaderState {
    /// Created; the source has not been opened yet
    NotStarted,
    /// Delivering lines
    Streaming,
    /// Delivery halted by `pause()`
    Paused,
    /// The source is finished or closed; buffered lines are draining
    EndOfInput,
    /// `end` has been emitted
    Closed,
}

/// Phases the reader task moves through; `Paused` is layered on top.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub(crate) enum Phase {
    NotStarted = 0,
    Streaming = 1,
    EndOfInput = 2,
    Closed = 3,
}

impl Phase {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => Phase::NotStarted,
            1 => Phase::Streaming,
            2 => Phase::EndOfInput,
            _ => Phase::Closed,
        }
    }
}

#[derive(Debug)]
pub(crate) struct Control {
    paused: AtomicBool,
    close_requested: AtomicBool,
    phase: AtomicU8,
    wake: Notify,
}

impl Control {
    pub(crate) fn new() -> Self {
        Self {
            paused: AtomicBool::new(false),
            close_requested: AtomicBool::new(false),
            phase: AtomicU8::new(Phase::NotStarted as u8),
            wake: Notify::new(),
        }
    }

    pub(crate) fn is_paused(&self) -> bool {
        self.paused.load(Ordering::Acquire)
    }

    pub(crate) fn close_requested(&self) -> bool {
        self.close_requested.load(Ordering::Acquire)
    }

    pub(crate) fn phase(&self) -> Phase {
        Phase::from_u8(self.phase.load(Ordering::Acquire))
    }

    pub(crate) fn set_phase(&self, phase: Phase) {
        self.phase.store(phase as u8, Ordering::Release);
    }

    /// Wait until a handle pauses, resumes or closes.
    ///
    /// The single reader task is the only waiter, so `notify_one` permits are
    /// never lost: a call made before this starts waiting completes it at once.
    pub(crate) async fn changed(&self) {
        self.wake.notified().await;
    }

    /// Wait until `close()` has been called
    pub(crate) async fn closed(&self) {
        while !self.close_requested() {
            self.changed().await;
        }
    }
}

/// Cloneable handle controlling a line reader from anywhere
///
/// Handles may be captured by listeners: a `line` listener that calls
/// [`ReaderHandle::pause`] stops delivery before the next line.
#[derive(Debug, Clone)]
pub struct ReaderHandle {
    control: Arc<Control>,
}

impl ReaderHandle {
    pub(crate) fn new(control: Arc<Control>) -> Self {
        Self { control }
    }

    /// Halt `line` delivery until [`resume`](Self::resume) is called.
    ///
    /// A line whose delivery is already in progress completes.
    pub fn pause(&self) {
        tracing::trace!("pause requested");
        self.control.paused.store(true, Ordering::Release);
        self.control.wake.notify_one();
    }

    /// Continue delivery from exactly the next undelivered line
    pub fn resume(&self) {
        tracing::trace!("resume requested");
        self.control.paused.store(false, Ordering::Release);
        self.control.wake.notify_one();
    }

    /// Stop reading the source early.
    ///
    /// Lines already read are still delivered, followed by a single `end`.
    /// Repeated calls have no further effect.
    pub fn close(&self) {
        tracing::trace!("close requested");
        self.control.close_requested.store(true, Ordering::Release);
        self.control.wake.notify_one();
    }

    /// True while delivery is paused
    pub fn is_paused(&self) -> bool {
        self.control.is_paused()
    }

    /// Current lifecycle state
    pub fn state(&self) -> ReaderState {
        match self.control.phase() {
            Phase::Closed => ReaderState::Closed,
            _ if self.control.is_paused() => ReaderState::Paused,
            Phase::NotStarted => ReaderState::NotStarted,
            Phase::Streaming => ReaderState::Streaming,
            Phase::EndOfInput => ReaderState::EndOfInput,
        }
    }
}
