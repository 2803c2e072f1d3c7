//! Task lifecycle: the state machine a worker walks through and the
//! completion status the caller reads after joining.

use std::fmt;

/// Terminal outcome of a worker, as seen by the joiner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CompletionStatus {
    /// The worker has not reached a terminal state yet.
    Pending,
    /// The lock was taken, held for the release wait and released.
    Succeeded,
    /// The mutex could not be acquired.
    LockFailed,
}

impl CompletionStatus {
    pub fn is_success(self) -> bool {
        self == CompletionStatus::Succeeded
    }
}

impl fmt::Display for CompletionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            CompletionStatus::Pending => "pending",
            CompletionStatus::Succeeded => "succeeded",
            CompletionStatus::LockFailed => "lock failed",
        };
        f.write_str(text)
    }
}

/// Where a single task is in its run.
///
/// `Created -> WaitingToLock -> (LockFailed | HoldingLock -> Released)`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskState {
    Created,
    WaitingToLock,
    HoldingLock,
    LockFailed,
    Released,
}

impl TaskState {
    pub fn can_transition_to(self, next: TaskState) -> bool {
        use TaskState::*;
        matches!(
            (self, next),
            (Created, WaitingToLock)
                | (WaitingToLock, HoldingLock)
                | (WaitingToLock, LockFailed)
                | (HoldingLock, Released)
        )
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, TaskState::LockFailed | TaskState::Released)
    }

    pub fn status(self) -> CompletionStatus {
        match self {
            TaskState::Created | TaskState::WaitingToLock | TaskState::HoldingLock => {
                CompletionStatus::Pending
            }
            TaskState::LockFailed => CompletionStatus::LockFailed,
            TaskState::Released => CompletionStatus::Succeeded,
        }
    }
}
