//! Kernel-assigned identifiers

use core::fmt;
use serde::{Deserialize, Serialize};

/// Identifier for a task
///
/// Tasks are process-like units with their own address space. The kernel
/// assigns the value at creation and keeps it stable for the task's lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
#[repr(transparent)]
pub struct TaskId(u64);

impl TaskId {
    /// Reserved value that never names a live task
    pub const INVALID: TaskId = TaskId(0);

    /// Wraps a raw value returned by the kernel
    pub const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    /// Returns the raw value for marshaling
    pub const fn as_raw(&self) -> u64 {
        self.0
    }

    /// Returns whether this is something other than [`TaskId::INVALID`]
    pub const fn is_valid(&self) -> bool {
        self.0 != Self::INVALID.0
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Task({})", self.0)
    }
}

/// Identifier for a thread within a task
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
#[repr(transparent)]
pub struct ThreadId(u64);

impl ThreadId {
    pub const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    pub const fn as_raw(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for ThreadId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Thread({})", self.0)
    }
}

/// The bare value of a capability handle
///
/// Handles are namespaced per owning task. This type is `Copy` and carries no
/// ownership; user code holds handles through the owned wrappers in
/// `kernel_api::handle`, which pair every acquire with exactly one release.
/// `RawHandle` exists for the wire format, the C boundary and kernel
/// implementations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
#[repr(transparent)]
pub struct RawHandle(u64);

impl RawHandle {
    /// Value the kernel never hands out
    pub const NULL: RawHandle = RawHandle(0);

    pub const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    pub const fn as_raw(&self) -> u64 {
        self.0
    }

    pub const fn is_null(&self) -> bool {
        self.0 == Self::NULL.0
    }
}

impl fmt::Display for RawHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "handle:{}", self.0)
    }
}
