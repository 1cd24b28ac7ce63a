//! Rest countdown between sets.
//!
//! The scheduler owns no timer of its own. A driver either calls [`tick`]
//! once per second, or calls [`sync`] with the current time, in which case
//! the remaining time is derived from a fixed deadline and timer jitter does
//! not accumulate. Completion is reported exactly once per countdown.
//!
//! [`tick`]: RestScheduler::tick
//! [`sync`]: RestScheduler::sync

use chrono::{DateTime, Duration, Utc};

/// What happened as a result of driving the scheduler
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RestEvent {
    /// Countdown still running
    Tick { remaining: u32 },
    /// Countdown reached zero (by tick, sync, or skip)
    Completed,
    /// Scheduler was not running; nothing happened
    Idle,
}

/// A single-shot countdown in whole seconds
#[derive(Clone, Debug, Default)]
pub struct RestScheduler {
    remaining: u32,
    deadline: Option<DateTime<Utc>>,
    running: bool,
}

impl RestScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Begin a countdown of `duration_seconds` starting at `now`
    ///
    /// A zero duration completes immediately.
    pub fn start(&mut self, duration_seconds: u32, now: DateTime<Utc>) -> RestEvent {
        if duration_seconds == 0 {
            self.stop();
            return RestEvent::Completed;
        }

        self.remaining = duration_seconds;
        self.deadline = Some(now + Duration::seconds(i64::from(duration_seconds)));
        self.running = true;
        tracing::debug!("Rest started: {}s", duration_seconds);
        RestEvent::Tick {
            remaining: duration_seconds,
        }
    }

    /// Advance the countdown by one second
    pub fn tick(&mut self) -> RestEvent {
        if !self.running {
            return RestEvent::Idle;
        }

        self.remaining = self.remaining.saturating_sub(1);
        self.settle()
    }

    /// Re-derive the remaining time from the deadline
    ///
    /// Remaining time only ever decreases, rounded up to the whole second.
    pub fn sync(&mut self, now: DateTime<Utc>) -> RestEvent {
        if !self.running {
            return RestEvent::Idle;
        }

        if let Some(deadline) = self.deadline {
            let left_ms = (deadline - now).num_milliseconds().max(0);
            let left = u32::try_from((left_ms + 999) / 1000).unwrap_or(u32::MAX);
            self.remaining = self.remaining.min(left);
        }
        self.settle()
    }

    /// End the countdown now
    pub fn skip(&mut self) -> RestEvent {
        if !self.running {
            return RestEvent::Idle;
        }

        tracing::debug!("Rest skipped with {}s left", self.remaining);
        self.stop();
        RestEvent::Completed
    }

    /// Cancel without reporting completion
    pub fn stop(&mut self) {
        self.running = false;
        self.remaining = 0;
        self.deadline = None;
    }

    pub fn remaining(&self) -> u32 {
        self.remaining
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    fn settle(&mut self) -> RestEvent {
        if self.remaining == 0 {
            self.stop();
            tracing::debug!("Rest complete");
            RestEvent::Completed
        } else {
            RestEvent::Tick {
                remaining: self.remaining,
            }
        }
    }
}

/// Render seconds as `m:ss`
pub fn format_countdown(remaining: u32) -> String {
    format!("{}:{:02}", remaining / 60, remaining % 60)
}
