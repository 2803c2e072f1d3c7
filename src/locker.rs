//==============================================================================
// Delayed Locker: spawn a worker that waits, locks, waits, unlocks
//==============================================================================

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use std::time::Duration;

use lazy_static::lazy_static;
use tracing::{debug, warn};

use crate::config::{DEFAULT_THREAD_NAME_PREFIX, LockerConfig};
use crate::error::LockerError;
use crate::spawner::{Spawner, ThreadSpawner};
use crate::task::{TaskRecord, saturating_millis};

lazy_static! {
    // Shared by the free functions so task numbering is process-wide.
    static ref DEFAULT_LOCKER: DelayedLocker = DelayedLocker::default();
}

/// Joinable handle to a running worker. Joining yields the task record.
#[derive(Debug)]
pub struct TaskHandle<T> {
    name: String,
    inner: JoinHandle<TaskRecord<T>>,
}

impl<T> TaskHandle<T> {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn thread_name(&self) -> Option<&str> {
        self.inner.thread().name()
    }

    /// Non-blocking: true once the worker reached a terminal state.
    pub fn is_finished(&self) -> bool {
        self.inner.is_finished()
    }

    /// Blocks until the worker terminates and hands the record back.
    pub fn join(self) -> Result<TaskRecord<T>, LockerError> {
        let name = self.name;
        self.inner
            .join()
            .map_err(|_| LockerError::WorkerPanicked { name })
    }
}

/// Spawns delayed-lock workers through a [`Spawner`].
#[derive(Debug)]
pub struct DelayedLocker<S = ThreadSpawner> {
    spawner: S,
    thread_name_prefix: String,
    default_wait_to_obtain: Duration,
    default_wait_to_release: Duration,
    next_id: AtomicU64,
}

impl Default for DelayedLocker<ThreadSpawner> {
    fn default() -> Self {
        DelayedLocker::new(ThreadSpawner::new())
    }
}

impl DelayedLocker<ThreadSpawner> {
    pub fn from_config(config: &LockerConfig) -> Result<Self, LockerError> {
        config.validate()?;
        let mut spawner = ThreadSpawner::new();
        if let Some(bytes) = config.stack_size {
            spawner = spawner.with_stack_size(bytes);
        }
        Ok(DelayedLocker::new(spawner)
            .with_thread_name_prefix(config.thread_name_prefix.clone())
            .with_default_waits(config.wait_to_obtain(), config.wait_to_release()))
    }
}

impl<S: Spawner> DelayedLocker<S> {
    pub fn new(spawner: S) -> Self {
        DelayedLocker {
            spawner,
            thread_name_prefix: DEFAULT_THREAD_NAME_PREFIX.to_string(),
            default_wait_to_obtain: Duration::ZERO,
            default_wait_to_release: Duration::ZERO,
            next_id: AtomicU64::new(0),
        }
    }

    pub fn with_thread_name_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.thread_name_prefix = prefix.into();
        self
    }

    pub fn with_default_waits(
        mut self,
        wait_to_obtain: Duration,
        wait_to_release: Duration,
    ) -> Self {
        self.default_wait_to_obtain = wait_to_obtain;
        self.default_wait_to_release = wait_to_release;
        self
    }

    /// Spawns a worker that sleeps `wait_to_obtain_ms`, locks `mutex`, sleeps
    /// `wait_to_release_ms` and unlocks.
    ///
    /// On spawn failure no worker exists and the task record has already
    /// been dropped, releasing its clone of `mutex`.
    pub fn start<T>(
        &self,
        mutex: &Arc<Mutex<T>>,
        wait_to_obtain_ms: u64,
        wait_to_release_ms: u64,
    ) -> Result<TaskHandle<T>, LockerError>
    where
        T: Send + 'static,
    {
        self.start_with(
            mutex,
            Duration::from_millis(wait_to_obtain_ms),
            Duration::from_millis(wait_to_release_ms),
        )
    }

    /// Like [`start`](Self::start) with the configured default waits.
    pub fn start_default<T>(&self, mutex: &Arc<Mutex<T>>) -> Result<TaskHandle<T>, LockerError>
    where
        T: Send + 'static,
    {
        self.start_with(mutex, self.default_wait_to_obtain, self.default_wait_to_release)
    }

    pub fn start_with<T>(
        &self,
        mutex: &Arc<Mutex<T>>,
        wait_to_obtain: Duration,
        wait_to_release: Duration,
    ) -> Result<TaskHandle<T>, LockerError>
    where
        T: Send + 'static,
    {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let name = format!("{}-{}", self.thread_name_prefix, id);
        let record = TaskRecord::new(
            name.clone(),
            Arc::clone(mutex),
            wait_to_obtain,
            wait_to_release,
        );

        match self.spawner.spawn(name.clone(), move || record.run()) {
            Ok(inner) => {
                debug!(
                    task = %name,
                    wait_to_obtain_ms = saturating_millis(wait_to_obtain),
                    wait_to_release_ms = saturating_millis(wait_to_release),
                    "worker started"
                );
                Ok(TaskHandle { name, inner })
            }
            Err(source) => {
                warn!(task = %name, error = %source, "failed to spawn worker");
                Err(LockerError::spawn(name, source))
            }
        }
    }

    pub fn join<T>(&self, handle: TaskHandle<T>) -> Result<TaskRecord<T>, LockerError> {
        handle.join()
    }
}

/// [`DelayedLocker::start`] on a process-wide default locker.
pub fn start<T>(
    mutex: &Arc<Mutex<T>>,
    wait_to_obtain_ms: u64,
    wait_to_release_ms: u64,
) -> Result<TaskHandle<T>, LockerError>
where
    T: Send + 'static,
{
    DEFAULT_LOCKER.start(mutex, wait_to_obtain_ms, wait_to_release_ms)
}

pub fn join<T>(handle: TaskHandle<T>) -> Result<TaskRecord<T>, LockerError> {
    handle.join()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::status::CompletionStatus;
    use std::io;
    use std::time::Instant;

    struct FailingSpawner;

    impl Spawner for FailingSpawner {
        fn spawn<F, R>(&self, _name: String, _f: F) -> io::Result<JoinHandle<R>>
        where
            F: FnOnce() -> R + Send + 'static,
            R: Send + 'static,
        {
            Err(io::Error::new(io::ErrorKind::WouldBlock, "injected spawn failure"))
        }
    }

    #[test]
    fn test_start_then_join_succeeds() {
        let mutex = Arc::new(Mutex::new(()));
        let handle = start(&mutex, 0, 0).unwrap();
        let task = join(handle).unwrap();
        assert_eq!(task.status(), CompletionStatus::Succeeded);
        assert!(Arc::ptr_eq(task.mutex(), &mutex));
    }

    #[test]
    fn test_elapsed_covers_both_waits() {
        let mutex = Arc::new(Mutex::new(0u8));
        let started = Instant::now();
        let task = start(&mutex, 100, 50).unwrap().join().unwrap();
        assert_eq!(task.status(), CompletionStatus::Succeeded);
        assert!(started.elapsed() >= Duration::from_millis(150));
    }

    #[test]
    fn test_spawn_failure_releases_record() {
        let mutex = Arc::new(Mutex::new(String::from("shared")));
        let locker = DelayedLocker::new(FailingSpawner);

        let err = locker.start(&mutex, 10, 10).unwrap_err();
        assert!(err.is_spawn_failure());
        assert_eq!(Arc::strong_count(&mutex), 1);
        assert!(mutex.try_lock().is_ok());
    }

    #[test]
    fn test_free_start_gives_each_task_its_own_name() {
        let mutex = Arc::new(Mutex::new(()));
        let first = start(&mutex, 0, 50).unwrap();
        let second = start(&mutex, 0, 50).unwrap();
        assert_ne!(first.name(), second.name());
        assert_ne!(first.thread_name(), second.thread_name());

        let first = join(first).unwrap();
        let second = join(second).unwrap();
        assert!(first.name().starts_with("delayed-locker-"));
        assert_ne!(first.name(), second.name());
    }

    #[test]
    fn test_worker_threads_are_named_in_sequence() {
        let mutex = Arc::new(Mutex::new(()));
        let locker = DelayedLocker::default().with_thread_name_prefix("holder");
        let first = locker.start(&mutex, 0, 0).unwrap();
        let second = locker.start(&mutex, 0, 0).unwrap();
        assert_eq!(first.name(), "holder-0");
        assert_eq!(second.thread_name(), Some("holder-1"));
        locker.join(first).unwrap();
        locker.join(second).unwrap();
    }

    #[test]
    fn test_is_finished_while_lock_is_held_elsewhere() {
        let mutex = Arc::new(Mutex::new(()));
        let guard = mutex.lock().unwrap();
        let handle = start(&mutex, 0, 0).unwrap();

        std::thread::sleep(Duration::from_millis(50));
        assert!(!handle.is_finished());

        drop(guard);
        let task = handle.join().unwrap();
        assert_eq!(task.status(), CompletionStatus::Succeeded);
    }

    #[test]
    fn test_start_default_uses_configured_waits() {
        let config = LockerConfig {
            wait_to_obtain_ms: 20,
            wait_to_release_ms: 30,
            ..LockerConfig::default()
        };
        let locker = DelayedLocker::from_config(&config).unwrap();
        let mutex = Arc::new(Mutex::new(()));
        let task = locker.start_default(&mutex).unwrap().join().unwrap();
        assert_eq!(task.wait_to_obtain(), Duration::from_millis(20));
        assert_eq!(task.wait_to_release(), Duration::from_millis(30));
        assert!(task.hold_window().unwrap().held_for() >= Duration::from_millis(30));
    }

    #[test]
    fn test_from_config_rejects_invalid() {
        let config = LockerConfig {
            thread_name_prefix: String::new(),
            ..LockerConfig::default()
        };
        assert!(matches!(
            DelayedLocker::from_config(&config),
            Err(LockerError::Config(_))
        ));
    }
}
