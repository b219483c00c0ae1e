//! Single-threaded cooperative timers.
//!
//! A scheduled task owns exactly one [`PhaseTimer`]. It runs one transition,
//! arms the timer, and yields to the event loop until the timer fires, so at
//! most one wake-up per task is ever pending and transitions never overlap.

use std::future::Future;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::runtime::{Builder, Runtime};
use tokio::task::JoinHandle;
use tokio::time::{sleep_until, Duration, Instant};

/// A state machine driven by timer expiry. It owns its one [`PhaseTimer`].
pub trait Timed {
    /// Runs the transition due at `now` and arms the timer for the next one.
    fn on_timer(&mut self, now: Instant);

    fn timer(&mut self) -> &mut PhaseTimer;
}

/// The single pending wake-up of a scheduled task. Observers read it
/// through a [`TimerView`].
#[derive(Debug, Default)]
pub struct PhaseTimer {
    deadline: Arc<Mutex<Option<Instant>>>,
}

impl PhaseTimer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn view(&self) -> TimerView {
        TimerView {
            deadline: Arc::clone(&self.deadline),
        }
    }

    /// Arms the timer `after` past `from`. Any previous deadline is replaced.
    pub fn arm(&mut self, from: Instant, after: Duration) -> Instant {
        let deadline = from + after;
        *self.deadline.lock().unwrap_or_else(PoisonError::into_inner) = Some(deadline);
        deadline
    }

    /// Suspends until the armed deadline and disarms. Returns the deadline
    /// itself, not the wake-up time, so chained phases do not drift.
    pub async fn wait(&mut self) -> Option<Instant> {
        let deadline = (*self.deadline.lock().unwrap_or_else(PoisonError::into_inner))?;
        sleep_until(deadline).await;
        *self.deadline.lock().unwrap_or_else(PoisonError::into_inner) = None;
        Some(deadline)
    }
}

/// Read-only view of a [`PhaseTimer`].
#[derive(Debug, Clone)]
pub struct TimerView {
    deadline: Arc<Mutex<Option<Instant>>>,
}

impl TimerView {
    pub fn remaining(&self, now: Instant) -> Duration {
        self.deadline
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .map(|deadline| deadline.saturating_duration_since(now))
            .unwrap_or_default()
    }
}

/// Drives `task` forever: fire, wait, repeat. The first transition runs immediately.
pub async fn drive<T: Timed>(mut task: T) {
    let mut now = Instant::now();
    loop {
        task.on_timer(now);
        match task.timer().wait().await {
            Some(deadline) => now = deadline,
            None => break,
        }
    }
}

/// Handle to a task spawned with [`spawn`].
#[derive(Debug)]
pub struct ScheduledTask {
    handle: JoinHandle<()>,
}

impl ScheduledTask {
    pub fn abort(&self) {
        self.handle.abort();
    }
}

/// Spawns `task` onto the current runtime.
pub fn spawn<T: Timed + Send + 'static>(task: T) -> ScheduledTask {
    ScheduledTask {
        handle: tokio::spawn(drive(task)),
    }
}

/// Owns the single-threaded event loop every controller, simulation and
/// display task runs on.
pub struct Scheduler {
    runtime: Runtime,
}

impl Scheduler {
    pub fn new() -> std::io::Result<Self> {
        let runtime = Builder::new_current_thread().enable_all().build()?;
        Ok(Self { runtime })
    }

    pub fn block_on<F: Future>(&self, future: F) -> F::Output {
        self.runtime.block_on(future)
    }
}
