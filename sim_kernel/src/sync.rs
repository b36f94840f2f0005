//! Kernel locks
//!
//! A lock belongs to the task that created it and is held by at most one of
//! that task's threads. Locks are not re-entrant.

use core_types::ThreadId;
use kernel_api::abi::ACQUIRE_NONBLOCKING;
use kernel_api::ErrorCode;

use crate::handle_table::{HandleTable, KernelObject};
use crate::state::{live_task, Caller, KernelResult, Shared};

#[derive(Debug, Default)]
pub(crate) struct LockState {
    pub owner: Option<ThreadId>,
}

fn as_lock(object: &mut KernelObject) -> KernelResult<&mut LockState> {
    match object {
        KernelObject::Lock(lock) => Ok(lock),
        _ => Err(ErrorCode::InvalidOperation),
    }
}

/// Drops every lock `thread` still holds. Returns how many were held.
pub(crate) fn release_locks_held_by(
    handles: &mut HandleTable<KernelObject>,
    thread: ThreadId,
) -> usize {
    let mut released = 0;
    for object in handles.values_mut() {
        if let KernelObject::Lock(lock) = object {
            if lock.owner == Some(thread) {
                lock.owner = None;
                released += 1;
            }
        }
    }
    released
}

impl Shared {
    pub(crate) fn lock_create(&self, caller: Caller) -> KernelResult {
        let mut state = self.lock();
        live_task(&mut state.tasks, caller.task)?
            .handles
            .insert(KernelObject::Lock(LockState::default()))
    }

    pub(crate) fn lock_acquire(&self, caller: Caller, handle: u64, flags: u64) -> KernelResult {
        let nonblocking = match flags {
            0 => false,
            ACQUIRE_NONBLOCKING => true,
            _ => return Err(ErrorCode::InvalidParameter),
        };

        self.block_until(caller, None, |state| {
            let task = match live_task(&mut state.tasks, caller.task) {
                Ok(task) => task,
                Err(error) => return Some(Err(error)),
            };
            let lock = match task.handles.get_mut(handle).and_then(as_lock) {
                Ok(lock) => lock,
                Err(error) => return Some(Err(error)),
            };
            match lock.owner {
                None => {
                    lock.owner = Some(caller.thread);
                    Some(Ok(0))
                }
                Some(owner) if owner == caller.thread => Some(Err(ErrorCode::InvalidOperation)),
                Some(_) if nonblocking => Some(Err(ErrorCode::ResourceBusy)),
                Some(_) => None,
            }
        })
    }

    pub(crate) fn lock_release(&self, caller: Caller, handle: u64) -> KernelResult {
        let mut state = self.lock();
        let lock = as_lock(
            live_task(&mut state.tasks, caller.task)?
                .handles
                .get_mut(handle)?,
        )?;
        if lock.owner != Some(caller.thread) {
            return Err(ErrorCode::InvalidOperation);
        }
        lock.owner = None;
        drop(state);
        self.wake_all();
        Ok(0)
    }
}
