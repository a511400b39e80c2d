//! Time-boxed process lifetime.
//!
//! ```text
//! Starting --ChannelReady--> Running --WarningDue--> WarningIssued
//!     |                         |                         |
//!     +--------Signal-----------+---Signal/Deadline-------+--> Stopped
//! ```
//!
//! Whichever transition reaches `Stopped` is the only one that reports
//! `run_shutdown`, so the final summary and flush happen exactly once.

use std::time::Duration;

use tracing::info;

use crate::config::LifecycleConfig;
use crate::error::LifecycleError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    Starting,
    Running,
    WarningIssued,
    Stopped,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LifecycleEvent {
    /// The inbound update channel is established.
    ChannelReady,
    /// The pre-shutdown warning is due.
    WarningDue,
    /// The configured run duration elapsed.
    DeadlineReached,
    /// External termination signal.
    Signal,
}

/// A successful phase change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub from: Phase,
    pub to: Phase,
    /// The caller must run the shutdown routine.
    pub run_shutdown: bool,
}

/// The lifecycle state machine.
#[derive(Debug)]
pub struct Lifecycle {
    phase: Phase,
}

impl Default for Lifecycle {
    fn default() -> Self {
        Self::new()
    }
}

impl Lifecycle {
    pub fn new() -> Self {
        Self {
            phase: Phase::Starting,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn is_stopped(&self) -> bool {
        self.phase == Phase::Stopped
    }

    /// Applies an event.
    pub fn fire(&mut self, event: LifecycleEvent) -> Result<Transition, LifecycleError> {
        use LifecycleEvent::*;
        use Phase::*;

        let to = match (self.phase, event) {
            (Stopped, _) => return Err(LifecycleError::AlreadyStopped),
            (Starting, ChannelReady) => Running,
            (Running, WarningDue) => WarningIssued,
            // A zero warning lead puts the warning and the deadline at the same instant
            (Running | WarningIssued, DeadlineReached) => Stopped,
            (Starting | Running | WarningIssued, Signal) => Stopped,
            (phase, event) => return Err(LifecycleError::InvalidTransition { phase, event }),
        };

        let transition = Transition {
            from: self.phase,
            to,
            run_shutdown: to == Stopped,
        };
        info!(from = ?transition.from, to = ?transition.to, event = ?event, "Lifecycle transition");
        self.phase = to;
        Ok(transition)
    }
}

/// Offsets from process start at which timed behavior fires.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Schedule {
    /// When the warning fires; `None` for an unbounded run.
    pub warning_at: Option<Duration>,
    /// When the process stops; `None` for an unbounded run.
    pub deadline: Option<Duration>,
    /// Reminder offsets, sorted, deduplicated, all before the deadline.
    pub reminders: Vec<Duration>,
}

impl Schedule {
    pub fn from_config(config: &LifecycleConfig) -> Self {
        let deadline = config.run_duration.filter(|d| !d.is_zero());
        let warning_at = deadline.map(|d| d.saturating_sub(config.warning_lead));

        let mut reminders: Vec<Duration> = config
            .reminders
            .iter()
            .copied()
            .filter(|r| deadline.map_or(true, |d| *r < d))
            .collect();
        reminders.sort();
        reminders.dedup();

        Self {
            warning_at,
            deadline,
            reminders,
        }
    }

    pub fn is_unbounded(&self) -> bool {
        self.deadline.is_none()
    }
}
