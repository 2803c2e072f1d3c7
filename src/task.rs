//! The task record and the worker body that runs it.

use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use tracing::{debug, warn};

use crate::status::{CompletionStatus, TaskState};

/// Milliseconds in `duration`, clamped to `u64::MAX`.
pub(crate) fn saturating_millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

/// Instants taken by the worker right after locking and right before
/// unlocking.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HoldWindow {
    pub locked_at: Instant,
    pub unlocking_at: Instant,
}

impl HoldWindow {
    pub fn held_for(&self) -> Duration {
        self.unlocking_at.saturating_duration_since(self.locked_at)
    }

    /// True when the two windows share any instant.
    pub fn overlaps(&self, other: &HoldWindow) -> bool {
        self.locked_at < other.unlocking_at && other.locked_at < self.unlocking_at
    }
}

/// Per-invocation state handed to the worker and moved back to the joiner.
///
/// The record owns a clone of the mutex handle, so the mutex stays alive
/// for as long as any record referencing it does.
#[derive(Debug)]
pub struct TaskRecord<T> {
    name: String,
    mutex: Arc<Mutex<T>>,
    wait_to_obtain: Duration,
    wait_to_release: Duration,
    state: TaskState,
    hold: Option<HoldWindow>,
}

impl<T> TaskRecord<T> {
    pub(crate) fn new(
        name: String,
        mutex: Arc<Mutex<T>>,
        wait_to_obtain: Duration,
        wait_to_release: Duration,
    ) -> Self {
        TaskRecord {
            name,
            mutex,
            wait_to_obtain,
            wait_to_release,
            state: TaskState::Created,
            hold: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn mutex(&self) -> &Arc<Mutex<T>> {
        &self.mutex
    }

    pub fn wait_to_obtain(&self) -> Duration {
        self.wait_to_obtain
    }

    pub fn wait_to_release(&self) -> Duration {
        self.wait_to_release
    }

    pub fn state(&self) -> TaskState {
        self.state
    }

    pub fn status(&self) -> CompletionStatus {
        self.state.status()
    }

    /// `None` unless the worker actually held the lock.
    pub fn hold_window(&self) -> Option<HoldWindow> {
        self.hold
    }

    fn advance(&mut self, next: TaskState) {
        debug_assert!(
            self.state.can_transition_to(next),
            "illegal transition {:?} -> {:?}",
            self.state,
            next
        );
        debug!(task = %self.name, from = ?self.state, to = ?next, "task state change");
        self.state = next;
    }

    /// Worker body: wait, lock, wait, unlock. Runs exactly once and always
    /// ends in a terminal state.
    pub(crate) fn run(mut self) -> Self {
        self.advance(TaskState::WaitingToLock);
        debug!(
            task = %self.name,
            wait_to_obtain_ms = saturating_millis(self.wait_to_obtain),
            wait_to_release_ms = saturating_millis(self.wait_to_release),
            "sleeping before lock"
        );
        thread::sleep(self.wait_to_obtain);

        debug!(task = %self.name, "trying to lock");
        let mutex = Arc::clone(&self.mutex);
        let guard = match mutex.lock() {
            Ok(guard) => guard,
            Err(poisoned) => {
                // Discard the guard without using the data behind it.
                drop(poisoned);
                warn!(task = %self.name, "mutex is poisoned, giving up");
                self.advance(TaskState::LockFailed);
                return self;
            }
        };
        let locked_at = Instant::now();
        self.advance(TaskState::HoldingLock);

        thread::sleep(self.wait_to_release);

        let unlocking_at = Instant::now();
        drop(guard);
        self.hold = Some(HoldWindow {
            locked_at,
            unlocking_at,
        });
        self.advance(TaskState::Released);
        debug!(task = %self.name, "lock released");
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(mutex: &Arc<Mutex<u32>>, obtain_ms: u64, release_ms: u64) -> TaskRecord<u32> {
        TaskRecord::new(
            "test-task".to_string(),
            Arc::clone(mutex),
            Duration::from_millis(obtain_ms),
            Duration::from_millis(release_ms),
        )
    }

    #[test]
    fn test_new_record_is_pending() {
        let mutex = Arc::new(Mutex::new(0));
        let task = record(&mutex, 10, 20);
        assert_eq!(task.state(), TaskState::Created);
        assert_eq!(task.status(), CompletionStatus::Pending);
        assert_eq!(task.wait_to_obtain(), Duration::from_millis(10));
        assert_eq!(task.wait_to_release(), Duration::from_millis(20));
        assert!(task.hold_window().is_none());
        assert_eq!(Arc::strong_count(&mutex), 2);
    }

    #[test]
    fn test_run_inline_succeeds() {
        let mutex = Arc::new(Mutex::new(0));
        let task = record(&mutex, 0, 30).run();
        assert_eq!(task.status(), CompletionStatus::Succeeded);
        let window = task.hold_window().unwrap();
        assert!(window.held_for() >= Duration::from_millis(30));
        // Released: the caller can lock again.
        assert!(mutex.try_lock().is_ok());
    }

    #[test]
    fn test_run_on_poisoned_mutex_fails() {
        let mutex = Arc::new(Mutex::new(0));
        let poisoner = Arc::clone(&mutex);
        let _ = thread::spawn(move || {
            let _guard = poisoner.lock().unwrap();
            panic!("poison the mutex");
        })
        .join();
        assert!(mutex.is_poisoned());

        let started = Instant::now();
        let task = record(&mutex, 0, 500).run();
        assert_eq!(task.status(), CompletionStatus::LockFailed);
        assert!(task.hold_window().is_none());
        // The hold wait is skipped on failure.
        assert!(started.elapsed() < Duration::from_millis(500));
    }

    #[test]
    fn test_saturating_millis_clamps_huge_durations() {
        assert_eq!(saturating_millis(Duration::from_millis(150)), 150);
        assert_eq!(saturating_millis(Duration::MAX), u64::MAX);
        assert_eq!(saturating_millis(Duration::from_secs(u64::MAX / 1000 + 1)), u64::MAX);
    }

    #[test]
    fn test_hold_window_overlap() {
        let base = Instant::now();
        let a = HoldWindow {
            locked_at: base,
            unlocking_at: base + Duration::from_millis(10),
        };
        let b = HoldWindow {
            locked_at: base + Duration::from_millis(10),
            unlocking_at: base + Duration::from_millis(20),
        };
        let c = HoldWindow {
            locked_at: base + Duration::from_millis(5),
            unlocking_at: base + Duration::from_millis(15),
        };
        assert!(!a.overlaps(&b));
        assert!(a.overlaps(&c));
        assert!(c.overlaps(&b));
    }
}
