//! Resettable inactivity countdown for per-player instances.
//!
//! One task per timer sleeps until the current deadline. Reset only moves
//! the deadline; the task re-checks it under the same lock before firing, so
//! an expiry racing a reset never evicts an instance that was just touched.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio::time::{sleep_until, Instant};

use crate::host::Player;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TimerState {
    Running,
    Fired,
    Cancelled,
}

struct Countdown {
    deadline: Instant,
    state: TimerState,
}

fn lock(countdown: &Mutex<Countdown>) -> MutexGuard<'_, Countdown> {
    countdown.lock().unwrap_or_else(PoisonError::into_inner)
}

pub struct EvictionTimer {
    countdown: Arc<Mutex<Countdown>>,
    timeout: Duration,
    task: JoinHandle<()>,
}

impl EvictionTimer {
    /// Start counting down; `on_expire` runs at most once, on the runtime.
    pub fn start<F>(runtime: &Handle, timeout: Duration, on_expire: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        let countdown = Arc::new(Mutex::new(Countdown {
            deadline: Instant::now() + timeout,
            state: TimerState::Running,
        }));
        let shared = Arc::clone(&countdown);
        let task = runtime.spawn(async move {
            loop {
                let deadline = {
                    let c = lock(&shared);
                    if c.state != TimerState::Running {
                        return;
                    }
                    c.deadline
                };
                sleep_until(deadline).await;
                let expired = {
                    let mut c = lock(&shared);
                    if c.state != TimerState::Running {
                        return;
                    }
                    if Instant::now() >= c.deadline {
                        c.state = TimerState::Fired;
                        true
                    } else {
                        false
                    }
                };
                if expired {
                    break;
                }
            }
            on_expire();
        });
        Self {
            countdown,
            timeout,
            task,
        }
    }

    /// Push the deadline back to a full timeout from now.
    /// Returns false once the timer has fired or been cancelled.
    pub fn reset(&self) -> bool {
        let mut c = lock(&self.countdown);
        if c.state != TimerState::Running {
            return false;
        }
        c.deadline = Instant::now() + self.timeout;
        true
    }

    /// Stop the countdown. Returns true if this call stopped a running
    /// timer, false if it had already fired or been cancelled.
    pub fn cancel(&self) -> bool {
        let mut c = lock(&self.countdown);
        if c.state != TimerState::Running {
            return false;
        }
        c.state = TimerState::Cancelled;
        self.task.abort();
        true
    }

    pub fn is_running(&self) -> bool {
        lock(&self.countdown).state == TimerState::Running
    }

    /// Time left before expiry, if still running.
    pub fn remaining(&self) -> Option<Duration> {
        let c = lock(&self.countdown);
        (c.state == TimerState::Running).then(|| c.deadline.saturating_duration_since(Instant::now()))
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

impl Drop for EvictionTimer {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Per-player capability attached to an instance built for one viewer.
pub struct PerPlayer {
    owner: Player,
    timer: EvictionTimer,
}

impl PerPlayer {
    pub(crate) fn new(owner: Player, timer: EvictionTimer) -> Self {
        Self { owner, timer }
    }

    pub fn owner(&self) -> &Player {
        &self.owner
    }

    pub fn timer(&self) -> &EvictionTimer {
        &self.timer
    }
}
