//! # Simulated Kernel
//!
//! This crate implements the kernel side of the Sahne syscall ABI in-process.
//!
//! ## Purpose
//!
//! The real kernel is only reachable through a hardware trap. The simulated
//! kernel lets the whole `kernel_api` surface run under `cargo test`:
//! - Same raw ABI (numbers, argument words, signed results)
//! - Real blocking (locks, inboxes and sleeps park host threads)
//! - Inspectable (tasks, handles, memory and the audit log are visible)
//! - Fault injection for error paths a healthy kernel never takes
//!
//! ## Philosophy
//!
//! **Testability is a first-class design constraint.**
//!
//! This is not a mock that replays canned answers: it keeps real kernel
//! state and enforces the same rules user code relies on. It does not load
//! code images, so a spawned task is driven by host code attached to it.
//!
//! ## Example
//!
//! ```
//! use core_types::ResourceMode;
//! use sim_kernel::SimulatedKernel;
//!
//! let kernel = SimulatedKernel::new();
//! let task = kernel.spawn_root_task();
//! let client = kernel.client(task).unwrap();
//!
//! let file = client
//!     .acquire_resource("test/file", ResourceMode::READ_WRITE | ResourceMode::CREATE)
//!     .unwrap();
//! assert_eq!(client.write_resource(&file, b"hello"), Ok(5));
//! client.release_resource(file).unwrap();
//! ```

pub mod config;
pub mod fault_injection;
mod handle_table;
mod info;
mod memory;
pub mod message_queue;
mod messaging;
pub mod resources;
mod state;
mod sync;
pub mod syscall_gate;
mod tasks;
mod user_memory;

pub use config::{KernelVersion, SimConfig, SimConfigError};
pub use fault_injection::{FaultPlan, MessageFault, SyscallFault};
pub use syscall_gate::{current_gate, ExitScope, SimGate, SyscallAuditLog, SyscallEvent, Terminated};

use core_types::{TaskId, ThreadId};
use fault_injection::FaultInjector;
use kernel_api::SyscallClient;
use state::{KernelState, Shared, TaskStatus};
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::{Duration as HostDuration, Instant as HostInstant};

/// Simulated kernel
///
/// Cloning gives another reference to the same kernel.
#[derive(Clone)]
pub struct SimulatedKernel {
    shared: Arc<Shared>,
}

impl SimulatedKernel {
    /// Creates a kernel with the default configuration and no faults
    pub fn new() -> Self {
        Self::build(SimConfig::default(), FaultInjector::default())
    }

    fn build(config: SimConfig, faults: FaultInjector) -> Self {
        log::debug!("simulated kernel booting with {:?}", config);
        Self {
            shared: Arc::new(Shared::new(config, faults)),
        }
    }

    /// Replaces the configuration.
    ///
    /// Builder-style: call before creating tasks, as this boots a fresh
    /// kernel that only keeps the pending fault plan.
    pub fn with_config(self, config: SimConfig) -> Self {
        let faults = std::mem::take(&mut self.shared.lock().faults);
        Self::build(config, faults)
    }

    /// Arms a fault plan. Builder-style, like [`SimulatedKernel::with_config`].
    pub fn with_fault_plan(self, plan: FaultPlan) -> Self {
        Self::build(self.shared.config.clone(), FaultInjector::new(plan))
    }

    pub fn config(&self) -> &SimConfig {
        &self.shared.config
    }

    /// Creates a task with no parent, as the boot loader would.
    pub fn spawn_root_task(&self) -> TaskId {
        let task = self
            .shared
            .lock()
            .create_task(None, Vec::new(), &self.shared.config);
        log::info!("root task {} created", task);
        task
    }

    /// A gate acting as `task`, or `None` if it is unknown or has exited.
    pub fn attach(&self, task: TaskId) -> Option<SimGate> {
        self.is_task_running(task)
            .then(|| SimGate::new(Arc::clone(&self.shared), task))
    }

    /// A typed client acting as `task`.
    pub fn client(&self, task: TaskId) -> Option<SyscallClient<SimGate>> {
        self.attach(task).map(SyscallClient::new)
    }

    /// Ends a task from outside, as a supervisor would.
    pub fn kill_task(&self, task: TaskId, code: i32) {
        self.shared.lock().exit_task(task, code);
        self.shared.wake_all();
    }

    /// Delivers an interrupt to `thread`.
    ///
    /// A blocked thread's call returns `Interrupted`; otherwise the interrupt
    /// stays pending until its next blocking call. Returns `false` if the
    /// thread does not exist or has exited.
    pub fn interrupt(&self, thread: ThreadId) -> bool {
        let delivered = match self.shared.lock().threads.get_mut(&thread) {
            Some(record) if record.exit_code.is_none() => {
                record.interrupt_pending = true;
                true
            }
            _ => false,
        };
        if delivered {
            log::debug!("interrupt delivered to {}", thread);
            self.shared.wake_all();
        }
        delivered
    }

    pub fn task_count(&self) -> usize {
        self.shared.lock().tasks.len()
    }

    pub fn is_task_running(&self, task: TaskId) -> bool {
        self.shared
            .lock()
            .tasks
            .get(&task)
            .is_some_and(|record| record.is_running())
    }

    pub fn task_exit_code(&self, task: TaskId) -> Option<i32> {
        match self.shared.lock().tasks.get(&task)?.status {
            TaskStatus::Exited(code) => Some(code),
            TaskStatus::Running => None,
        }
    }

    /// The argument bytes a task was spawned with
    pub fn task_args(&self, task: TaskId) -> Option<Vec<u8>> {
        Some(self.shared.lock().tasks.get(&task)?.args.clone())
    }

    pub fn task_parent(&self, task: TaskId) -> Option<TaskId> {
        self.shared.lock().tasks.get(&task)?.parent
    }

    /// Every kernel thread the task has had, live or not
    pub fn threads_of(&self, task: TaskId) -> Vec<ThreadId> {
        let state = self.shared.lock();
        let mut threads: Vec<ThreadId> = state
            .threads
            .iter()
            .filter(|(_, record)| record.task == task)
            .map(|(thread, _)| *thread)
            .collect();
        threads.sort();
        threads
    }

    pub fn thread_exit_code(&self, thread: ThreadId) -> Option<i32> {
        self.shared.lock().threads.get(&thread)?.exit_code
    }

    /// Live handles held by `task`
    pub fn handle_count(&self, task: TaskId) -> usize {
        self.shared
            .lock()
            .tasks
            .get(&task)
            .map_or(0, |record| record.handles.len())
    }

    /// Undelivered messages waiting for `task`
    pub fn inbox_len(&self, task: TaskId) -> usize {
        self.shared
            .lock()
            .tasks
            .get(&task)
            .map_or(0, |record| record.inbox.len())
    }

    /// Bytes of private and shared memory currently allocated
    pub fn memory_in_use(&self) -> usize {
        self.shared.lock().memory_in_use
    }

    /// Creates or replaces a resource, e.g. a code image to spawn from.
    pub fn insert_resource(&self, id: impl AsRef<[u8]>, contents: impl Into<Vec<u8>>) {
        self.shared
            .lock()
            .resources
            .insert(id.as_ref().to_vec(), contents.into());
    }

    pub fn resource_contents(&self, id: impl AsRef<[u8]>) -> Option<Vec<u8>> {
        self.shared.lock().resources.get(id.as_ref()).cloned()
    }

    pub fn remove_resource(&self, id: impl AsRef<[u8]>) -> Option<Vec<u8>> {
        self.shared.lock().resources.remove(id.as_ref())
    }

    /// Returns a snapshot of the audit log (test-only)
    pub fn audit_log(&self) -> SyscallAuditLog {
        self.shared.lock().audit.clone()
    }

    /// Clears the audit log (test-only)
    pub fn clear_audit_log(&self) {
        self.shared.lock().audit.clear();
    }

    /// Waits until one of `task`'s threads is parked in a blocking call.
    pub fn wait_until_blocked(&self, task: TaskId, timeout: HostDuration) -> Option<ThreadId> {
        self.wait_for(timeout, |state| {
            state
                .threads
                .iter()
                .filter(|(_, record)| record.task == task && record.blocked)
                .map(|(thread, _)| *thread)
                .min()
        })
    }

    /// Waits for `thread` to exit and returns its exit code.
    pub fn wait_for_thread_exit(&self, thread: ThreadId, timeout: HostDuration) -> Option<i32> {
        self.wait_for(timeout, |state| state.threads.get(&thread)?.exit_code)
    }

    fn wait_for<T>(
        &self,
        timeout: HostDuration,
        mut check: impl FnMut(&KernelState) -> Option<T>,
    ) -> Option<T> {
        let deadline = HostInstant::now() + timeout;
        let mut state = self.shared.lock();
        loop {
            if let Some(found) = check(&*state) {
                return Some(found);
            }
            let remaining = deadline.saturating_duration_since(HostInstant::now());
            if remaining.is_zero() {
                return None;
            }
            state = self.shared.wait(state, Some(remaining));
        }
    }
}

impl Default for SimulatedKernel {
    fn default() -> Self {
        Self::new()
    }
}

/// Runs host code acting as a task and catches its exit.
///
/// Returns `Err` with the exit details if `f` called `exit_task` or
/// `exit_thread` through a [`SimGate`]. Other panics propagate.
pub fn catch_exit<R>(f: impl FnOnce() -> R) -> Result<R, Terminated> {
    match panic::catch_unwind(AssertUnwindSafe(f)) {
        Ok(value) => Ok(value),
        Err(payload) => match payload.downcast::<Terminated>() {
            Ok(terminated) => Err(*terminated),
            Err(other) => panic::resume_unwind(other),
        },
    }
}
