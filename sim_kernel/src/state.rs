//! Kernel state shared by every gate of one simulated kernel.
//!
//! All state sits behind a single mutex. Blocking syscalls park on the
//! paired condvar and re-check their condition on every wakeup, so any state
//! change that could unblock someone calls [`Shared::wake_all`].

use core_types::{TaskId, ThreadId};
use kernel_api::ErrorCode;
use std::collections::HashMap;
use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};
use std::time::Instant as HostInstant;

use crate::config::SimConfig;
use crate::fault_injection::FaultInjector;
use crate::handle_table::{HandleTable, KernelObject};
use crate::memory::{Block, Mapping, SharedObject};
use crate::message_queue::MessageQueue;
use crate::resources::ResourceStore;
use crate::syscall_gate::SyscallAuditLog;

/// Handler result before encoding at the gate
pub(crate) type KernelResult<T = u64> = Result<T, ErrorCode>;

/// The task and thread a syscall runs on behalf of
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Caller {
    pub task: TaskId,
    pub thread: ThreadId,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum TaskStatus {
    Running,
    Exited(i32),
}

pub(crate) struct TaskRecord {
    pub parent: Option<TaskId>,
    pub args: Vec<u8>,
    pub status: TaskStatus,
    pub handles: HandleTable<KernelObject>,
    /// Private allocations keyed by base address
    pub allocations: HashMap<usize, Block>,
    pub mappings: Vec<Mapping>,
    pub inbox: MessageQueue,
}

impl TaskRecord {
    fn new(parent: Option<TaskId>, args: Vec<u8>, config: &SimConfig) -> Self {
        Self {
            parent,
            args,
            status: TaskStatus::Running,
            handles: HandleTable::new(config.max_handles_per_task),
            allocations: HashMap::new(),
            mappings: Vec::new(),
            inbox: MessageQueue::with_capacity(config.inbox_capacity),
        }
    }

    pub fn is_running(&self) -> bool {
        self.status == TaskStatus::Running
    }
}

#[derive(Debug)]
pub(crate) struct ThreadRecord {
    pub task: TaskId,
    pub exit_code: Option<i32>,
    pub interrupt_pending: bool,
    pub blocked: bool,
}

pub(crate) struct KernelState {
    pub tasks: HashMap<TaskId, TaskRecord>,
    pub threads: HashMap<ThreadId, ThreadRecord>,
    /// Host threads currently acting as a kernel thread of some task
    pub host_threads: HashMap<(TaskId, std::thread::ThreadId), ThreadId>,
    pub resources: ResourceStore,
    pub shared_memory: HashMap<u64, SharedObject>,
    /// Bytes of private and shared memory currently allocated
    pub memory_in_use: usize,
    pub audit: SyscallAuditLog,
    pub faults: FaultInjector,
    next_task: u64,
    next_thread: u64,
    next_shared: u64,
}

impl KernelState {
    pub fn new(faults: FaultInjector) -> Self {
        Self {
            tasks: HashMap::new(),
            threads: HashMap::new(),
            host_threads: HashMap::new(),
            resources: ResourceStore::new(),
            shared_memory: HashMap::new(),
            memory_in_use: 0,
            audit: SyscallAuditLog::new(),
            faults,
            next_task: 1,
            next_thread: 1,
            next_shared: 1,
        }
    }

    pub fn create_task(
        &mut self,
        parent: Option<TaskId>,
        args: Vec<u8>,
        config: &SimConfig,
    ) -> TaskId {
        let task = TaskId::from_raw(self.next_task);
        self.next_task += 1;
        self.tasks
            .insert(task, TaskRecord::new(parent, args, config));
        task
    }

    pub fn create_thread(&mut self, task: TaskId) -> ThreadId {
        let thread = ThreadId::from_raw(self.next_thread);
        self.next_thread += 1;
        self.threads.insert(
            thread,
            ThreadRecord {
                task,
                exit_code: None,
                interrupt_pending: false,
                blocked: false,
            },
        );
        thread
    }

    pub fn next_shared_id(&mut self) -> u64 {
        let id = self.next_shared;
        self.next_shared += 1;
        id
    }

    /// Consumes a pending interrupt for `thread`.
    pub fn take_interrupt(&mut self, thread: ThreadId) -> bool {
        match self.threads.get_mut(&thread) {
            Some(record) => std::mem::take(&mut record.interrupt_pending),
            None => false,
        }
    }

    /// Marks `thread` blocked or runnable; returns whether that changed.
    pub fn set_blocked(&mut self, thread: ThreadId, blocked: bool) -> bool {
        match self.threads.get_mut(&thread) {
            Some(record) if record.blocked != blocked => {
                record.blocked = blocked;
                true
            }
            _ => false,
        }
    }

    pub fn is_live(&self, caller: Caller) -> bool {
        let task_running = self
            .tasks
            .get(&caller.task)
            .is_some_and(TaskRecord::is_running);
        let thread_running = self
            .threads
            .get(&caller.thread)
            .is_some_and(|record| record.exit_code.is_none());
        task_running && thread_running
    }

    pub fn live_threads(&self, task: TaskId) -> usize {
        self.threads
            .values()
            .filter(|record| record.task == task && record.exit_code.is_none())
            .count()
    }

    /// Ends one thread. The task ends with it when no other thread is left.
    pub fn exit_thread(&mut self, caller: Caller, code: i32) {
        let Some(record) = self.threads.get_mut(&caller.thread) else {
            return;
        };
        if record.exit_code.is_some() {
            return;
        }
        record.exit_code = Some(code);
        record.blocked = false;
        self.host_threads.retain(|_, thread| *thread != caller.thread);
        if let Some(task) = self.tasks.get_mut(&caller.task) {
            crate::sync::release_locks_held_by(&mut task.handles, caller.thread);
        }
        log::debug!("{} of {} exited with code {}", caller.thread, caller.task, code);

        if self.live_threads(caller.task) == 0 {
            self.exit_task(caller.task, code);
        }
    }

    /// Ends a task and reclaims everything it owns.
    pub fn exit_task(&mut self, task: TaskId, code: i32) {
        let Some(record) = self.tasks.get_mut(&task) else {
            return;
        };
        if !record.is_running() {
            return;
        }
        record.status = TaskStatus::Exited(code);
        record.inbox.clear();
        let handles: Vec<KernelObject> = record.handles.drain().collect();
        let allocations: Vec<Block> = record.allocations.drain().map(|(_, block)| block).collect();
        let mappings = std::mem::take(&mut record.mappings);

        let leaked = handles.len();
        for object in handles {
            self.release_object(object);
        }
        for block in allocations {
            self.memory_in_use -= block.len();
        }
        for mapping in mappings {
            self.unref_shared(mapping.shared);
        }

        for record in self.threads.values_mut() {
            if record.task == task && record.exit_code.is_none() {
                record.exit_code = Some(code);
                record.blocked = false;
            }
        }
        self.host_threads.retain(|(owner, _), _| *owner != task);

        log::info!(
            "{} exited with code {} ({} handles reclaimed)",
            task,
            code,
            leaked
        );
    }

    /// Drops whatever kernel references a released handle held.
    pub fn release_object(&mut self, object: KernelObject) {
        if let KernelObject::SharedMemory(shared) = object {
            self.unref_shared(shared);
        }
    }

    pub fn unref_shared(&mut self, shared: u64) {
        let Some(object) = self.shared_memory.get_mut(&shared) else {
            return;
        };
        object.refs -= 1;
        if object.refs == 0 {
            if let Some(object) = self.shared_memory.remove(&shared) {
                self.memory_in_use -= object.block.len();
                log::debug!("shared memory object {} freed", shared);
            }
        }
    }
}

/// Looks up the calling task, failing if it is gone.
pub(crate) fn live_task(
    tasks: &mut HashMap<TaskId, TaskRecord>,
    task: TaskId,
) -> KernelResult<&mut TaskRecord> {
    match tasks.get_mut(&task) {
        Some(record) if record.is_running() => Ok(record),
        _ => Err(ErrorCode::InvalidOperation),
    }
}

pub(crate) struct Shared {
    state: Mutex<KernelState>,
    wakeup: Condvar,
    pub config: SimConfig,
    pub boot: HostInstant,
}

impl Shared {
    pub fn new(config: SimConfig, faults: FaultInjector) -> Self {
        Self {
            state: Mutex::new(KernelState::new(faults)),
            wakeup: Condvar::new(),
            config,
            boot: HostInstant::now(),
        }
    }

    /// A panicking test thread must not wedge every other gate.
    pub fn lock(&self) -> MutexGuard<'_, KernelState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn wake_all(&self) {
        self.wakeup.notify_all();
    }

    pub fn wait<'a>(
        &self,
        guard: MutexGuard<'a, KernelState>,
        timeout: Option<std::time::Duration>,
    ) -> MutexGuard<'a, KernelState> {
        match timeout {
            None => self
                .wakeup
                .wait(guard)
                .unwrap_or_else(PoisonError::into_inner),
            Some(timeout) => match self.wakeup.wait_timeout(guard, timeout) {
                Ok((guard, _)) => guard,
                Err(poisoned) => poisoned.into_inner().0,
            },
        }
    }

    /// Nanoseconds since this kernel booted.
    pub fn now_nanos(&self) -> u64 {
        u64::try_from(self.boot.elapsed().as_nanos()).unwrap_or(u64::MAX)
    }

    /// Runs `poll` until it produces a result, parking the caller in between.
    ///
    /// The caller returns `Interrupted` when an interrupt is pending and
    /// `poll` had nothing. A caller whose task or thread ends while parked
    /// gets `InvalidOperation`. With a `deadline`, the caller also wakes up
    /// on its own when the deadline passes; `poll` decides what that means.
    pub fn block_until<T>(
        &self,
        caller: Caller,
        deadline: Option<HostInstant>,
        mut poll: impl FnMut(&mut KernelState) -> Option<KernelResult<T>>,
    ) -> KernelResult<T> {
        let mut state = self.lock();
        loop {
            let outcome = if !state.is_live(caller) {
                Some(Err(ErrorCode::InvalidOperation))
            } else if let Some(result) = poll(&mut *state) {
                Some(result)
            } else if state.take_interrupt(caller.thread) {
                Some(Err(ErrorCode::Interrupted))
            } else {
                None
            };
            if let Some(result) = outcome {
                state.set_blocked(caller.thread, false);
                return result;
            }

            if state.set_blocked(caller.thread, true) {
                self.wake_all();
            }
            let timeout = deadline.map(|deadline| deadline.saturating_duration_since(HostInstant::now()));
            state = self.wait(state, timeout);
        }
    }
}
