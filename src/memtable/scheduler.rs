// Copyright 2026 TempoLight Project Authors. Licensed under Apache-2.0.

use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};
use tracing::trace;

#[derive(Default)]
struct TimerState {
    deadline: Option<Instant>,
    /// Bumped on every schedule/cancel so a sleeping wait can tell a live
    /// deadline from a superseded one.
    epoch: u64,
    shutdown: bool,
}

/// Single-shot cancellable flush timer backed by one worker thread parked
/// on a condvar.
///
/// `cancel` is non-interruptive: a wait that already timed out is allowed
/// to notice the bumped epoch and skip the task on its own, and a task
/// currently running is never interrupted. `cancel_now` additionally wakes
/// the worker, for callers tearing the memtable down.
pub(crate) struct FlushScheduler {
    shared: Arc<(Mutex<TimerState>, Condvar)>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl FlushScheduler {
    /// Spawn the worker. `task` runs on the worker thread each time an
    /// armed deadline expires without being cancelled or superseded; it may
    /// return a delay to re-arm the timer (used when a timed flush leaves
    /// rows staged).
    pub fn spawn(task: impl Fn() -> Option<Duration> + Send + 'static) -> Self {
        let shared = Arc::new((Mutex::new(TimerState::default()), Condvar::new()));
        let worker_shared = shared.clone();
        let handle = std::thread::Builder::new()
            .name("memtable-flush".into())
            .spawn(move || {
                let (lock, cvar) = &*worker_shared;
                let mut state = lock.lock();
                loop {
                    if state.shutdown {
                        break;
                    }
                    let Some(deadline) = state.deadline else {
                        cvar.wait(&mut state);
                        continue;
                    };
                    let epoch = state.epoch;
                    let timed_out = cvar.wait_until(&mut state, deadline).timed_out();
                    if state.shutdown {
                        break;
                    }
                    // A cancel or a re-schedule while we slept supersedes
                    // this deadline.
                    if timed_out && state.epoch == epoch {
                        state.deadline = None;
                        drop(state);
                        trace!("flush timer fired");
                        let rearm = task();
                        state = lock.lock();
                        if let Some(delay) = rearm {
                            // Unless someone armed a fresh deadline while
                            // the task ran, keep the interval promise for
                            // the rows the task left behind.
                            if state.deadline.is_none() && !state.shutdown {
                                state.deadline = Some(Instant::now() + delay);
                                state.epoch += 1;
                            }
                        }
                    }
                }
            })
            .expect("failed to spawn flush worker");
        Self {
            shared,
            worker: Mutex::new(Some(handle)),
        }
    }

    /// Arm the single-shot timer `delay` from now, superseding any armed
    /// deadline.
    pub fn schedule(&self, delay: Duration) {
        let (lock, cvar) = &*self.shared;
        let mut state = lock.lock();
        state.deadline = Some(Instant::now() + delay);
        state.epoch += 1;
        cvar.notify_one();
    }

    /// Disarm without waking the worker.
    pub fn cancel(&self) {
        let (lock, _) = &*self.shared;
        let mut state = lock.lock();
        state.deadline = None;
        state.epoch += 1;
    }

    /// Disarm and wake the worker out of its sleep.
    pub fn cancel_now(&self) {
        let (lock, cvar) = &*self.shared;
        let mut state = lock.lock();
        state.deadline = None;
        state.epoch += 1;
        cvar.notify_one();
    }

    /// Stop and join the worker. Idempotent.
    pub fn shutdown(&self) {
        let Some(handle) = self.worker.lock().take() else {
            return;
        };
        {
            let (lock, cvar) = &*self.shared;
            let mut state = lock.lock();
            state.shutdown = true;
            cvar.notify_one();
        }
        let _ = handle.join();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn fires_once_after_delay() {
        let fired = Arc::new(AtomicUsize::new(0));
        let counter = fired.clone();
        let scheduler = FlushScheduler::spawn(move || {
            counter.fetch_add(1, Ordering::SeqCst);
            None
        });
        scheduler.schedule(Duration::from_millis(20));
        std::thread::sleep(Duration::from_millis(200));
        assert_eq!(fired.load(Ordering::SeqCst), 1);
        scheduler.shutdown();
    }

    #[test]
    fn cancel_prevents_firing() {
        let fired = Arc::new(AtomicUsize::new(0));
        let counter = fired.clone();
        let scheduler = FlushScheduler::spawn(move || {
            counter.fetch_add(1, Ordering::SeqCst);
            None
        });
        scheduler.schedule(Duration::from_millis(50));
        scheduler.cancel();
        std::thread::sleep(Duration::from_millis(200));
        assert_eq!(fired.load(Ordering::SeqCst), 0);
        scheduler.shutdown();
        scheduler.shutdown();
    }
}
