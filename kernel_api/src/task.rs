//! Task and thread lifecycle

use core_types::{TaskId, ThreadId};

use crate::abi::{exit_code_word, Syscall};
use crate::client::{buffer_word, SyscallClient};
use crate::error::{ErrorCode, SyscallResult};
use crate::gate::SyscallGate;
use crate::handle::ResourceHandle;
use crate::time::Duration;

/// Entry point of a new thread. Receives the `arg` given to `create_thread`.
pub type ThreadEntry = extern "C" fn(arg: u64);

impl<G: SyscallGate> SyscallClient<G> {
    /// Starts a new task whose code comes from an acquired resource.
    ///
    /// The kernel copies `args` into the new task; nothing is shared.
    pub fn spawn_task(&self, code: &ResourceHandle, args: &[u8]) -> SyscallResult<TaskId> {
        let value = unsafe {
            self.call(
                Syscall::TaskSpawn,
                &[code.word(), buffer_word(args), args.len() as u64],
            )
        }?;
        Ok(TaskId::from_raw(value))
    }

    /// Terminates the calling task. Every handle it owns is released by the
    /// kernel.
    pub fn exit_task(&self, code: i32) -> ! {
        log::debug!("exiting task with code {}", code);
        self.call_terminal(Syscall::TaskExit, &[exit_code_word(code)])
    }

    pub fn current_task_id(&self) -> SyscallResult<TaskId> {
        self.call_by_value(Syscall::GetTaskId, &[]).map(TaskId::from_raw)
    }

    /// Suspends the calling thread for at least `duration`.
    ///
    /// Blocking. Returns early only with `Interrupted`. A zero duration
    /// yields.
    pub fn sleep(&self, duration: Duration) -> SyscallResult<()> {
        self.call_by_value(Syscall::TaskSleep, &[duration.as_millis_ceil()])
            .map(drop)
    }

    /// Gives up the rest of the current scheduling quantum.
    pub fn yield_now(&self) -> SyscallResult<()> {
        self.call_by_value(Syscall::TaskYield, &[]).map(drop)
    }

    /// Starts a thread in this task running `entry(arg)`.
    ///
    /// `stack_size` is a lower bound on the new thread's stack.
    pub fn create_thread(
        &self,
        entry: ThreadEntry,
        stack_size: usize,
        arg: u64,
    ) -> SyscallResult<ThreadId> {
        if stack_size == 0 {
            return Err(ErrorCode::InvalidParameter);
        }
        let entry_word = entry as usize as u64;
        let value = unsafe {
            self.call(Syscall::ThreadCreate, &[entry_word, stack_size as u64, arg])
        }?;
        Ok(ThreadId::from_raw(value))
    }

    /// Terminates the calling thread. The task ends with it only if it was the
    /// last thread.
    pub fn exit_thread(&self, code: i32) -> ! {
        self.call_terminal(Syscall::ThreadExit, &[exit_code_word(code)])
    }
}
