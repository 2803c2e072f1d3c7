//! The thread primitive the locker spawns workers through.

use std::io;
use std::thread::{self, JoinHandle};

/// Creates one named OS thread per call.
///
/// Implementations must either start `f` on a new thread or return an error
/// without running it. On error `f` is dropped, along with everything it
/// captured.
pub trait Spawner {
    fn spawn<F, R>(&self, name: String, f: F) -> io::Result<JoinHandle<R>>
    where
        F: FnOnce() -> R + Send + 'static,
        R: Send + 'static;
}

/// `std::thread::Builder` with an optional stack size.
#[derive(Debug, Clone, Default)]
pub struct ThreadSpawner {
    stack_size: Option<usize>,
}

impl ThreadSpawner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_stack_size(mut self, bytes: usize) -> Self {
        self.stack_size = Some(bytes);
        self
    }
}

impl Spawner for ThreadSpawner {
    fn spawn<F, R>(&self, name: String, f: F) -> io::Result<JoinHandle<R>>
    where
        F: FnOnce() -> R + Send + 'static,
        R: Send + 'static,
    {
        let mut builder = thread::Builder::new().name(name);
        if let Some(bytes) = self.stack_size {
            builder = builder.stack_size(bytes);
        }
        builder.spawn(f)
    }
}
