//! Periodic refresh of the displayed code.
//!
//! One owned task per ticker. `start` aborts whatever task is running
//! before spawning the next, so two ticks never run for the same session.
//! Snapshots are published on a `watch` channel; the latest one is always
//! readable without waiting.

use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::verify::constants::TOTP_PERIOD;
use crate::verify::core::{self, TotpGenerator};
use crate::verify::types::*;

pub struct RefreshTicker {
    generator: TotpGenerator,
    period: Duration,
    tx: watch::Sender<TickSnapshot>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl RefreshTicker {
    pub fn new(generator: TotpGenerator, period: Duration) -> Self {
        let (tx, _) = watch::channel(TickSnapshot::default());
        Self {
            generator,
            period,
            tx,
            task: Mutex::new(None),
        }
    }

    /// (Re)start the refresh task.
    ///
    /// Returns `false` when nothing was scheduled: the store holds no secret
    /// (an idle snapshot is published instead) or there is no tokio runtime.
    pub fn start(&self) -> bool {
        let mut slot = self.slot();
        if let Some(previous) = slot.take() {
            previous.abort();
        }

        if !self.generator.store().is_set() {
            self.tx.send_replace(TickSnapshot::default());
            log::debug!("No shared secret, refresh task not scheduled");
            return false;
        }

        let runtime = match tokio::runtime::Handle::try_current() {
            Ok(handle) => handle,
            Err(e) => {
                log::warn!("Cannot schedule refresh task: {}", e);
                return false;
            }
        };

        let generator = self.generator.clone();
        let tx = self.tx.clone();
        let period = self.period;
        *slot = Some(runtime.spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                interval.tick().await;
                tx.send_replace(snapshot_at(&generator, core::current_unix_time()));
            }
        }));
        log::debug!("Refresh task scheduled every {:?}", period);
        true
    }

    /// Cancel the refresh task, if any. The last snapshot stays readable.
    pub fn stop(&self) {
        if let Some(task) = self.slot().take() {
            task.abort();
            log::debug!("Refresh task stopped");
        }
    }

    pub fn is_running(&self) -> bool {
        self.slot().as_ref().map_or(false, |task| !task.is_finished())
    }

    pub fn subscribe(&self) -> watch::Receiver<TickSnapshot> {
        self.tx.subscribe()
    }

    pub fn latest(&self) -> TickSnapshot {
        self.tx.borrow().clone()
    }

    fn slot(&self) -> MutexGuard<'_, Option<JoinHandle<()>>> {
        self.task.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Drop for RefreshTicker {
    fn drop(&mut self) {
        self.stop();
    }
}

impl std::fmt::Debug for RefreshTicker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RefreshTicker")
            .field("period", &self.period)
            .field("running", &self.is_running())
            .finish()
    }
}

/// What one tick publishes at `unix_seconds`.
pub fn snapshot_at(generator: &TotpGenerator, unix_seconds: u64) -> TickSnapshot {
    match generator.generate_at(unix_seconds) {
        Some(code) => TickSnapshot::from(&code),
        None => TickSnapshot {
            code: None,
            seconds_remaining: core::seconds_remaining_at(unix_seconds, TOTP_PERIOD),
            progress_percent: core::progress_percent_at(unix_seconds, TOTP_PERIOD),
        },
    }
}
