//! Timed behavior of a bot run.
//!
//! Drives the [`Lifecycle`] state machine from tokio timers and an external
//! termination signal: startup announcement, reminders, the pre-shutdown
//! warning, and the final summary followed by a flush of the book.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use checklist_core::{
    broadcast, render_summary, Destination, DestinationRole, Lifecycle, LifecycleEvent, Outbound,
    Schedule, View,
};
use tokio::time::{sleep_until, Instant};
use tracing::{debug, error, info, warn};

use crate::handlers::LIST_TITLE;
use crate::outbound::publish;
use crate::state::BotState;

/// Why the run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    Deadline,
    Signal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Timer {
    // Order breaks ties between timers due at the same instant
    Reminder,
    Warning,
    Deadline,
}

/// Runs timed broadcasts against the shared state.
pub struct Scheduler {
    state: Arc<BotState>,
    outbound: Arc<dyn Outbound>,
    schedule: Schedule,
    lifecycle: Lifecycle,
}

impl Scheduler {
    pub fn new(state: Arc<BotState>, outbound: Arc<dyn Outbound>) -> Self {
        let schedule = Schedule::from_config(&state.config.lifecycle);
        Self {
            state,
            outbound,
            schedule,
            lifecycle: Lifecycle::new(),
        }
    }

    fn timers(&self) -> Vec<(Duration, Timer)> {
        let mut timers: Vec<(Duration, Timer)> = self
            .schedule
            .reminders
            .iter()
            .map(|at| (*at, Timer::Reminder))
            .collect();
        if let Some(at) = self.schedule.warning_at {
            timers.push((at, Timer::Warning));
        }
        if let Some(at) = self.schedule.deadline {
            timers.push((at, Timer::Deadline));
        }
        timers.sort();
        timers
    }

    /// Run until the deadline or until `signal` completes.
    ///
    /// The shutdown routine (final summary, flush) has run when this returns.
    pub async fn run<S>(mut self, signal: S) -> StopReason
    where
        S: Future<Output = ()>,
    {
        tokio::pin!(signal);

        self.fire(LifecycleEvent::ChannelReady);
        let start = Instant::now();
        self.announce_startup().await;

        for (at, timer) in self.timers() {
            tokio::select! {
                biased;
                _ = &mut signal => return self.stop(LifecycleEvent::Signal).await,
                _ = sleep_until(start + at) => {}
            }

            match timer {
                Timer::Reminder => self.remind().await,
                Timer::Warning => {
                    self.fire(LifecycleEvent::WarningDue);
                    self.issue_warning().await;
                }
                Timer::Deadline => return self.stop(LifecycleEvent::DeadlineReached).await,
            }
        }

        signal.await;
        self.stop(LifecycleEvent::Signal).await
    }

    fn fire(&mut self, event: LifecycleEvent) -> bool {
        match self.lifecycle.fire(event) {
            Ok(transition) => transition.run_shutdown,
            Err(e) => {
                warn!(error = %e, "Ignoring lifecycle event");
                false
            }
        }
    }

    async fn stop(&mut self, event: LifecycleEvent) -> StopReason {
        let reason = match event {
            LifecycleEvent::DeadlineReached => StopReason::Deadline,
            _ => StopReason::Signal,
        };
        if self.fire(event) {
            info!(reason = ?reason, "Shutting down");
            self.final_summary().await;
            if let Err(e) = self.state.book().lock().await.flush() {
                error!(error = %e, "Final flush failed");
            }
        }
        reason
    }

    async fn announce_startup(&self) {
        let Some(announce) = self.state.announce_chat() else {
            return;
        };
        let mut text = "✅ Checklist bot is online.".to_string();
        if let Some(deadline) = self.schedule.deadline {
            text.push_str(&format!(" Running for {} minutes.", deadline.as_secs() / 60));
        }
        let destination = Destination::new(announce.clone(), DestinationRole::Announce);
        broadcast(self.outbound.as_ref(), &[destination], &View::text(text)).await;
    }

    /// Re-render the list of every reminder target.
    async fn remind(&self) {
        let targets = self.state.reminder_targets().await;
        debug!(targets = targets.len(), "Sending reminders");
        for (scope, snapshot) in targets {
            let view = View::list(&scope, LIST_TITLE, &snapshot);
            publish(self.outbound.as_ref(), &scope, &snapshot, &view, None).await;
        }
    }

    async fn issue_warning(&self) {
        let lead = self.state.config.lifecycle.warning_lead.as_secs() / 60;
        self.summarize(&format!("⏳ Stopping in {} minutes.", lead)).await;
    }

    async fn final_summary(&self) {
        self.summarize("🛑 Checklist bot is stopping. Final status:").await;
    }

    async fn summarize(&self, headline: &str) {
        for (scope, snapshot) in self.state.reminder_targets().await {
            let view = View::text(format!("{}\n\n{}", headline, render_summary(&snapshot)));
            publish(self.outbound.as_ref(), &scope, &snapshot, &view, None).await;
        }
    }
}

/// Completes on Ctrl+C or, on Unix, SIGTERM.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Could not listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut term) => {
                term.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Could not listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C"),
        _ = terminate => info!("Received SIGTERM"),
    }
}
