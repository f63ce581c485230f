// src/core/progress.rs

//! Progress reporting for long-running payload work.
//!
//! A task is reported as `begin_task` followed by any number of `worked` steps and a final
//! `done`. The total may be unknown at first; a later `begin_task` with a known total
//! replaces it. Cancellation is cooperative: workers poll [`ProgressMonitor::is_cancelled`]
//! between steps.

use crate::CancellationToken;
use std::sync::atomic::Ordering;

/// Receives progress notifications from extraction.
pub trait ProgressMonitor {
    /// Starts (or restarts) a task. `total` is `None` when the step count is not yet known.
    fn begin_task(&mut self, name: &str, total: Option<u64>);
    /// Reports `units` more completed steps.
    fn worked(&mut self, units: u64);
    /// Marks the current task as finished.
    fn done(&mut self);
    /// Whether the caller asked to stop.
    fn is_cancelled(&self) -> bool {
        false
    }
}

/// A monitor that ignores every notification.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullProgress;

impl ProgressMonitor for NullProgress {
    fn begin_task(&mut self, _name: &str, _total: Option<u64>) {}
    fn worked(&mut self, _units: u64) {}
    fn done(&mut self) {}
}

/// A monitor that reports through the `log` facade and honors a [`CancellationToken`].
#[derive(Debug)]
pub struct LogProgress {
    task: String,
    total: Option<u64>,
    completed: u64,
    last_reported_percent: u64,
    token: CancellationToken,
}

impl LogProgress {
    /// Creates a monitor bound to `token`.
    pub fn new(token: CancellationToken) -> Self {
        Self {
            task: String::new(),
            total: None,
            completed: 0,
            last_reported_percent: 0,
            token,
        }
    }

    /// Steps completed in the current task.
    pub fn completed(&self) -> u64 {
        self.completed
    }
}

impl ProgressMonitor for LogProgress {
    fn begin_task(&mut self, name: &str, total: Option<u64>) {
        self.task = name.to_string();
        self.total = total;
        self.completed = 0;
        self.last_reported_percent = 0;
        match total {
            Some(total) => log::info!("{} ({} steps)", name, total),
            None => log::info!("{}", name),
        }
    }

    fn worked(&mut self, units: u64) {
        self.completed = self.completed.saturating_add(units);
        if let Some(total) = self.total.filter(|t| *t > 0) {
            let percent = self.completed.saturating_mul(100) / total;
            if percent >= self.last_reported_percent.saturating_add(10) {
                self.last_reported_percent = percent;
                log::debug!("{}: {}%", self.task, percent.min(100));
            }
        }
    }

    fn done(&mut self) {
        log::debug!("{}: done after {} steps", self.task, self.completed);
    }

    fn is_cancelled(&self) -> bool {
        self.token.load(Ordering::SeqCst)
    }
}

/// Records every notification; used by tests to check ordering.
#[cfg(test)]
#[derive(Debug, Default)]
pub(crate) struct RecordingProgress {
    pub(crate) events: Vec<String>,
    pub(crate) cancel_after: Option<u64>,
    worked_so_far: u64,
}

#[cfg(test)]
impl RecordingProgress {
    /// A recorder that reports cancellation once `limit` steps were worked.
    pub(crate) fn cancelling_after(limit: u64) -> Self {
        Self {
            cancel_after: Some(limit),
            ..Self::default()
        }
    }
}

#[cfg(test)]
impl ProgressMonitor for RecordingProgress {
    fn begin_task(&mut self, name: &str, total: Option<u64>) {
        self.events.push(format!("begin:{name}:{total:?}"));
    }

    fn worked(&mut self, units: u64) {
        self.worked_so_far += units;
        self.events.push(format!("worked:{units}"));
    }

    fn done(&mut self) {
        self.events.push("done".to_string());
    }

    fn is_cancelled(&self) -> bool {
        self.cancel_after
            .is_some_and(|limit| self.worked_so_far >= limit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::AtomicBool;

    #[test]
    fn test_log_progress_tracks_and_resets() {
        let token = Arc::new(AtomicBool::new(false));
        let mut monitor = LogProgress::new(token.clone());
        monitor.begin_task("count", None);
        monitor.worked(3);
        assert_eq!(monitor.completed(), 3);
        monitor.begin_task("extract", Some(10));
        assert_eq!(monitor.completed(), 0);
        monitor.worked(10);
        monitor.done();
        assert!(!monitor.is_cancelled());
        token.store(true, Ordering::SeqCst);
        assert!(monitor.is_cancelled());
    }

    #[test]
    fn test_recording_progress_cancels_after_limit() {
        let mut monitor = RecordingProgress::cancelling_after(2);
        monitor.worked(1);
        assert!(!monitor.is_cancelled());
        monitor.worked(1);
        assert!(monitor.is_cancelled());
        assert_eq!(monitor.events, vec!["worked:1", "worked:1"]);
    }
}
