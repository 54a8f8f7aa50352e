//! Outbound notifications from the controller to its host.

use std::collections::VecDeque;

use crate::error::ControlError;
use crate::recovery::Timer;
use crate::session::Phase;

/// What the terminal error panel shows
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailureReport {
    /// Human-readable classification of the failure
    pub message: String,
    /// Whether a manual "try again" can reload the source
    pub retryable: bool,
    /// Extra instructions for sources that need a different URL
    pub guidance: Option<String>,
}

/// Notifications drained by the host after every call into the controller
#[derive(Debug, Clone, PartialEq)]
pub enum ControllerEvent {
    /// Current playback position in seconds
    TimeUpdate(f64),
    /// Playback reached the end of the stream
    Ended,
    /// The session moved to a new phase
    PhaseChanged(Phase),
    /// The host must run this timer and report it via `timer_elapsed`
    TimerScheduled(Timer),
    /// Terminal failure; shown until the source changes or a reset
    Failed(FailureReport),
    /// Transient notice for a failed control command
    Notice(ControlError),
}

/// Ordered queue of pending notifications
#[derive(Debug, Default)]
pub(crate) struct Outbox {
    events: VecDeque<ControllerEvent>,
}

impl Outbox {
    pub(crate) fn push(&mut self, event: ControllerEvent) {
        self.events.push_back(event);
    }

    pub(crate) fn drain(&mut self) -> Vec<ControllerEvent> {
        self.events.drain(..).collect()
    }
}
