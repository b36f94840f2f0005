//! Tasks and threads
//!
//! The simulated kernel does not load code images. Spawning checks the code
//! handle and registers the task; host code then acts as that task through
//! a gate from [`crate::SimulatedKernel::attach`]. Thread creation does start
//! a real host thread running the given entry point.

use core_types::{ResourceMode, TaskId, ThreadId};
use kernel_api::task::ThreadEntry;
use kernel_api::ErrorCode;
use std::sync::Arc;
use std::time::{Duration as HostDuration, Instant as HostInstant};

use crate::handle_table::KernelObject;
use crate::state::{live_task, Caller, KernelResult, Shared};
use crate::syscall_gate::{enter_sim_thread, record_exit, ExitScope, SimGate};
use crate::user_memory::user_bytes;

/// Host threads get at least this much stack whatever the caller asked for.
const MIN_HOST_STACK: usize = 64 * 1024;

impl Shared {
    pub(crate) fn task_spawn(
        &self,
        caller: Caller,
        code_handle: u64,
        args_address: u64,
        args_len: u64,
    ) -> KernelResult {
        let args = unsafe { user_bytes(args_address, args_len) }?.to_vec();
        let mut guard = self.lock();
        let state = &mut *guard;
        let task = live_task(&mut state.tasks, caller.task)?;
        let code = match task.handles.get(code_handle)? {
            KernelObject::Resource(code) if code.mode.contains(ResourceMode::READ) => code,
            _ => return Err(ErrorCode::TaskCreationFailed),
        };
        let image_len = state.resources.get(&code.id).map_or(0, Vec::len);
        if image_len == 0 {
            return Err(ErrorCode::TaskCreationFailed);
        }
        let image = String::from_utf8_lossy(&code.id).into_owned();

        let args_len = args.len();
        let child = state.create_task(Some(caller.task), args, &self.config);
        log::info!(
            "{} spawned {} from {:?} ({} byte image, {} bytes of args)",
            caller.task,
            child,
            image,
            image_len,
            args_len
        );
        Ok(child.as_raw())
    }

    pub(crate) fn task_exit(&self, caller: Caller, code: i32) -> KernelResult {
        self.lock().exit_task(caller.task, code);
        self.wake_all();
        record_exit(caller.task, ExitScope::Task, code);
        Ok(0)
    }

    pub(crate) fn task_sleep(&self, caller: Caller, millis: u64) -> KernelResult {
        if millis == 0 {
            std::thread::yield_now();
            return Ok(0);
        }
        // An unrepresentable deadline sleeps until interrupted.
        let deadline = HostInstant::now().checked_add(HostDuration::from_millis(millis));
        self.block_until(caller, deadline, |_| match deadline {
            Some(deadline) if HostInstant::now() >= deadline => Some(Ok(0)),
            _ => None,
        })
    }

    pub(crate) fn thread_create(
        self: &Arc<Self>,
        caller: Caller,
        entry: u64,
        stack_size: usize,
        arg: u64,
    ) -> KernelResult {
        if entry == 0 || stack_size == 0 {
            return Err(ErrorCode::InvalidParameter);
        }
        let entry = usize::try_from(entry).map_err(|_| ErrorCode::InvalidParameter)?;

        let thread = {
            let mut guard = self.lock();
            let state = &mut *guard;
            live_task(&mut state.tasks, caller.task)?;
            state.create_thread(caller.task)
        };

        let kernel = Arc::clone(self);
        let task = caller.task;
        let spawned = std::thread::Builder::new()
            .name(format!("sim-{}-{}", task.as_raw(), thread.as_raw()))
            .stack_size(stack_size.max(MIN_HOST_STACK))
            .spawn(move || run_thread(kernel, task, thread, entry, arg));
        if let Err(error) = spawned {
            log::warn!("host refused a thread for {}: {}", task, error);
            self.lock().threads.remove(&thread);
            return Err(ErrorCode::OutOfMemory);
        }

        log::debug!("{} created {}", task, thread);
        Ok(thread.as_raw())
    }

    pub(crate) fn thread_exit(&self, caller: Caller, code: i32) -> KernelResult {
        self.lock().exit_thread(caller, code);
        self.wake_all();
        record_exit(caller.task, ExitScope::Thread, code);
        Ok(0)
    }

    /// Binds the current host thread to a thread created by `THREAD_CREATE`.
    fn adopt(&self, task: TaskId, thread: ThreadId) -> bool {
        let mut state = self.lock();
        let task_running = state.tasks.get(&task).is_some_and(|record| record.is_running());
        let thread_running = state
            .threads
            .get(&thread)
            .is_some_and(|record| record.exit_code.is_none());
        if task_running && thread_running {
            state
                .host_threads
                .insert((task, std::thread::current().id()), thread);
        }
        task_running && thread_running
    }
}

fn run_thread(kernel: Arc<Shared>, task: TaskId, thread: ThreadId, entry: usize, arg: u64) {
    if !kernel.adopt(task, thread) {
        return;
    }
    enter_sim_thread(SimGate::new(Arc::clone(&kernel), task));

    // The address came from a `ThreadEntry` in this process.
    let entry = unsafe { std::mem::transmute::<usize, ThreadEntry>(entry) };
    entry(arg);

    // Returning from the entry point is a thread exit with code 0.
    kernel.lock().exit_thread(Caller { task, thread }, 0);
    kernel.wake_all();
}
