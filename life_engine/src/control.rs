// control.rs - Running/paused flag shared by the engine handle, workers and coordinator

use std::sync::{Mutex, PoisonError};
use tokio::sync::watch;
use tracing::info;

pub struct RunState {
    running: watch::Sender<bool>,
    stop_at: Mutex<Option<u64>>,
}

impl RunState {
    pub fn new(running: bool) -> Self {
        let (running, _) = watch::channel(running);
        Self {
            running,
            stop_at: Mutex::new(None),
        }
    }

    pub fn is_running(&self) -> bool {
        *self.running.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.running.subscribe()
    }

    /// Explicit start/pause from outside; drops any pending stop target.
    pub fn set_running(&self, running: bool) {
        *self.stop_at.lock().unwrap_or_else(PoisonError::into_inner) = None;
        self.publish(running);
    }

    /// Runs until generation `target` has been merged and applied, then pauses.
    pub fn run_until(&self, target: u64) {
        *self.stop_at.lock().unwrap_or_else(PoisonError::into_inner) = Some(target);
        self.publish(true);
    }

    /// Called by the coordinator before opening the cycle that follows `generation`.
    pub(crate) fn pause_if_reached(&self, generation: u64) -> bool {
        let mut stop_at = self.stop_at.lock().unwrap_or_else(PoisonError::into_inner);
        match *stop_at {
            Some(target) if generation >= target => {
                *stop_at = None;
                drop(stop_at);
                self.publish(false);
                true
            }
            _ => false,
        }
    }

    pub(crate) fn pause(&self) {
        self.publish(false);
    }

    fn publish(&self, running: bool) {
        let changed = self.running.send_if_modified(|current| {
            let changed = *current != running;
            *current = running;
            changed
        });
        if changed {
            info!(running, "run state changed");
        }
    }
}
