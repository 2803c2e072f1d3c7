//! Delayed mutex acquisition.
//!
//! [`start`] spawns a worker that sleeps, locks a shared `Arc<Mutex<T>>`,
//! sleeps while holding it, then unlocks. [`join`] waits for the worker and
//! hands the [`TaskRecord`] back so the caller can read its
//! [`CompletionStatus`].
//!
//! ```no_run
//! use std::sync::{Arc, Mutex};
//!
//! let mutex = Arc::new(Mutex::new(0));
//! let handle = delayed_locker::start(&mutex, 100, 50)?;
//! let task = delayed_locker::join(handle)?;
//! assert!(task.status().is_success());
//! # Ok::<(), delayed_locker::LockerError>(())
//! ```

pub mod config;
pub mod error;
pub mod locker;
pub mod logging;
pub mod spawner;
pub mod status;
pub mod task;

pub use config::LockerConfig;
pub use error::LockerError;
pub use locker::{DelayedLocker, TaskHandle, join, start};
pub use spawner::{Spawner, ThreadSpawner};
pub use status::{CompletionStatus, TaskState};
pub use task::{HoldWindow, TaskRecord};
