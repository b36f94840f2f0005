//! The simulated kernel's side of the syscall boundary.
//!
//! [`SimGate`] implements [`kernel_api::SyscallGate`]: it carries the raw
//! number and argument words into the kernel, records the call in the audit
//! log, and returns the signed result word exactly as hardware would.

use core_types::TaskId;
use kernel_api::abi::{exit_code_from_word, SyscallArgs};
use kernel_api::{decode, encode, representable, ErrorCode, Syscall, SyscallGate};
use serde::{Deserialize, Serialize};
use std::cell::{Cell, RefCell};
use std::sync::Arc;

use crate::state::{Caller, KernelResult, Shared};
use crate::user_memory::size_word;

/// Syscall audit event (for testing and verification).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SyscallEvent {
    /// Syscall was invoked
    Invoked {
        task: TaskId,
        syscall_name: String,
        timestamp_nanos: u64,
    },
    /// Syscall completed successfully
    Completed {
        task: TaskId,
        syscall_name: String,
        value: u64,
        timestamp_nanos: u64,
    },
    /// Syscall was rejected
    Rejected {
        task: TaskId,
        syscall_name: String,
        error: ErrorCode,
        timestamp_nanos: u64,
    },
    /// The fault plan answered instead of the kernel
    FaultInjected {
        task: TaskId,
        syscall_name: String,
        raw_result: i64,
        timestamp_nanos: u64,
    },
}

impl SyscallEvent {
    pub fn task(&self) -> TaskId {
        match self {
            SyscallEvent::Invoked { task, .. }
            | SyscallEvent::Completed { task, .. }
            | SyscallEvent::Rejected { task, .. }
            | SyscallEvent::FaultInjected { task, .. } => *task,
        }
    }

    pub fn syscall_name(&self) -> &str {
        match self {
            SyscallEvent::Invoked { syscall_name, .. }
            | SyscallEvent::Completed { syscall_name, .. }
            | SyscallEvent::Rejected { syscall_name, .. }
            | SyscallEvent::FaultInjected { syscall_name, .. } => syscall_name,
        }
    }
}

/// Audit log for syscall operations.
#[derive(Debug, Clone, Default)]
pub struct SyscallAuditLog {
    events: Vec<SyscallEvent>,
}

impl SyscallAuditLog {
    pub fn new() -> Self {
        Self { events: Vec::new() }
    }

    pub fn record(&mut self, event: SyscallEvent) {
        self.events.push(event);
    }

    pub fn events(&self) -> &[SyscallEvent] {
        &self.events
    }

    pub fn clear(&mut self) {
        self.events.clear();
    }

    pub fn has_event<F>(&self, predicate: F) -> bool
    where
        F: Fn(&SyscallEvent) -> bool,
    {
        self.events.iter().any(predicate)
    }

    pub fn count_events<F>(&self, predicate: F) -> usize
    where
        F: Fn(&SyscallEvent) -> bool,
    {
        self.events.iter().filter(|e| predicate(e)).count()
    }
}

/// Whether a terminal syscall ended a task or just one thread
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitScope {
    Task,
    Thread,
}

/// Unwind payload thrown by [`SimGate::halt`] after a terminal syscall.
///
/// Host code acting as a task catches it with [`crate::catch_exit`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Terminated {
    pub task: TaskId,
    pub scope: ExitScope,
    pub code: i32,
}

thread_local! {
    static LAST_EXIT: Cell<Option<Terminated>> = const { Cell::new(None) };
    static CURRENT_GATE: RefCell<Option<SimGate>> = const { RefCell::new(None) };
}

pub(crate) fn record_exit(task: TaskId, scope: ExitScope, code: i32) {
    LAST_EXIT.with(|last| last.set(Some(Terminated { task, scope, code })));
}

/// Marks the current host thread as one started by `THREAD_CREATE`.
pub(crate) fn enter_sim_thread(gate: SimGate) {
    CURRENT_GATE.with(|current| *current.borrow_mut() = Some(gate));
}

/// The gate of the simulated thread running on this host thread.
///
/// Thread entry points use this to reach the kernel, the way code on real
/// hardware just traps. `None` outside threads made by `THREAD_CREATE`.
pub fn current_gate() -> Option<SimGate> {
    CURRENT_GATE.with(|current| current.borrow().clone())
}

/// One task's connection to a simulated kernel
///
/// Every host thread using a gate becomes a distinct kernel thread of the
/// gate's task on its first syscall.
#[derive(Clone)]
pub struct SimGate {
    kernel: Arc<Shared>,
    task: TaskId,
}

impl SimGate {
    pub(crate) fn new(kernel: Arc<Shared>, task: TaskId) -> Self {
        Self { kernel, task }
    }

    pub fn task(&self) -> TaskId {
        self.task
    }
}

impl std::fmt::Debug for SimGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SimGate").field("task", &self.task).finish()
    }
}

impl SyscallGate for SimGate {
    unsafe fn invoke(&self, number: u64, args: SyscallArgs) -> i64 {
        self.kernel.dispatch(self.task, number, args)
    }

    /// Unwinds out of the exiting task's code with a [`Terminated`] payload.
    ///
    /// Threads started by `THREAD_CREATE` run an `extern "C"` entry point
    /// that must not be unwound through, so they park for good instead.
    fn halt(&self) -> ! {
        let exit = LAST_EXIT.with(Cell::take).unwrap_or(Terminated {
            task: self.task,
            scope: ExitScope::Task,
            code: 0,
        });
        if CURRENT_GATE.with(|current| current.borrow().is_some()) {
            loop {
                std::thread::park();
            }
        }
        std::panic::resume_unwind(Box::new(exit))
    }
}

impl Shared {
    fn record(&self, event: SyscallEvent) {
        self.lock().audit.record(event);
    }

    pub(crate) fn dispatch(self: &Arc<Self>, task: TaskId, number: u64, args: SyscallArgs) -> i64 {
        let timestamp_nanos = self.now_nanos();
        let Some(call) = Syscall::from_number(number) else {
            log::warn!("{} issued unknown syscall {}", task, number);
            self.record(SyscallEvent::Rejected {
                task,
                syscall_name: format!("unknown({})", number),
                error: ErrorCode::UnknownSyscall,
                timestamp_nanos,
            });
            return ErrorCode::UnknownSyscall.to_raw();
        };
        let syscall_name = call.name().to_string();

        self.record(SyscallEvent::Invoked {
            task,
            syscall_name: syscall_name.clone(),
            timestamp_nanos,
        });

        let injected = self.lock().faults.syscall_override(call);
        let result = match injected {
            Some(raw_result) => {
                self.record(SyscallEvent::FaultInjected {
                    task,
                    syscall_name: syscall_name.clone(),
                    raw_result,
                    timestamp_nanos,
                });
                match call {
                    Syscall::TaskExit => {
                        record_exit(task, ExitScope::Task, exit_code_from_word(args[0]))
                    }
                    Syscall::ThreadExit => {
                        record_exit(task, ExitScope::Thread, exit_code_from_word(args[0]))
                    }
                    _ => {}
                }
                decode(raw_result)
            }
            None => self
                .enter(task)
                .and_then(|caller| self.execute(caller, call, args))
                .and_then(representable),
        };

        let timestamp_nanos = self.now_nanos();
        match result {
            Ok(value) => self.record(SyscallEvent::Completed {
                task,
                syscall_name,
                value,
                timestamp_nanos,
            }),
            Err(error) => self.record(SyscallEvent::Rejected {
                task,
                syscall_name,
                error,
                timestamp_nanos,
            }),
        }

        injected.unwrap_or_else(|| encode(result))
    }

    /// Resolves the calling host thread to a kernel thread of `task`.
    fn enter(&self, task: TaskId) -> KernelResult<Caller> {
        let mut state = self.lock();
        match state.tasks.get(&task) {
            Some(record) if record.is_running() => {}
            _ => return Err(ErrorCode::InvalidOperation),
        }
        let key = (task, std::thread::current().id());
        if let Some(&thread) = state.host_threads.get(&key) {
            return Ok(Caller { task, thread });
        }
        let thread = state.create_thread(task);
        state.host_threads.insert(key, thread);
        log::debug!("{} joined {} from a host thread", thread, task);
        Ok(Caller { task, thread })
    }

    fn execute(self: &Arc<Self>, caller: Caller, call: Syscall, args: SyscallArgs) -> KernelResult {
        let [a1, a2, a3, _, _] = args;
        match call {
            Syscall::MemoryAllocate => self.memory_allocate(caller, size_word(a1)?),
            Syscall::MemoryRelease => self.memory_release(caller, a1, size_word(a2)?),
            Syscall::TaskSpawn => self.task_spawn(caller, a1, a2, a3),
            Syscall::TaskExit => self.task_exit(caller, exit_code_from_word(a1)),
            Syscall::ResourceAcquire => self.resource_acquire(caller, a1, a2, a3),
            Syscall::ResourceRead => self.resource_read(caller, a1, a2, a3),
            Syscall::ResourceWrite => self.resource_write(caller, a1, a2, a3),
            Syscall::ResourceRelease => self.handle_release(caller, a1),
            Syscall::GetTaskId => Ok(caller.task.as_raw()),
            Syscall::TaskSleep => self.task_sleep(caller, a1),
            Syscall::LockCreate => self.lock_create(caller),
            Syscall::LockAcquire => self.lock_acquire(caller, a1, a2),
            Syscall::LockRelease => self.lock_release(caller, a1),
            Syscall::ThreadCreate => self.thread_create(caller, a1, size_word(a2)?, a3),
            Syscall::ThreadExit => self.thread_exit(caller, exit_code_from_word(a1)),
            Syscall::GetSystemTime => Ok(self.now_nanos()),
            Syscall::SharedMemCreate => self.shared_create(caller, size_word(a1)?),
            Syscall::SharedMemMap => {
                self.shared_map(caller, a1, size_word(a2)?, size_word(a3)?)
            }
            Syscall::SharedMemUnmap => self.shared_unmap(caller, a1, size_word(a2)?),
            Syscall::MessageSend => self.message_send(caller, a1, a2, a3),
            Syscall::MessageReceive => self.message_receive(caller, a1, a2, a3),
            Syscall::GetKernelInfo => self.kernel_info(a1),
            Syscall::TaskYield => {
                std::thread::yield_now();
                Ok(0)
            }
            Syscall::ResourceControl => self.resource_control(caller, a1, a2, a3),
        }
    }
}
