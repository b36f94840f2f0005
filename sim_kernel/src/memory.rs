//! Private and shared memory
//!
//! Blocks come from the host allocator, zeroed. Every block counts against
//! `SimConfig::memory_limit` until it is freed. Shared objects are freed
//! once the last handle and the last mapping referring to them are gone.

use kernel_api::ErrorCode;
use std::alloc::{alloc_zeroed, dealloc, Layout};
use std::ptr::NonNull;

use crate::handle_table::KernelObject;
use crate::state::{live_task, Caller, KernelResult, KernelState, Shared};

const BLOCK_ALIGN: usize = 16;

/// A zeroed host allocation, freed on drop
#[derive(Debug)]
pub(crate) struct Block {
    ptr: NonNull<u8>,
    layout: Layout,
}

// The block is plain memory owned by the kernel state; only addresses cross
// threads.
unsafe impl Send for Block {}

impl Block {
    fn allocate(size: usize) -> KernelResult<Self> {
        let layout =
            Layout::from_size_align(size, BLOCK_ALIGN).map_err(|_| ErrorCode::OutOfMemory)?;
        let ptr = NonNull::new(unsafe { alloc_zeroed(layout) }).ok_or(ErrorCode::OutOfMemory)?;
        Ok(Self { ptr, layout })
    }

    pub fn address(&self) -> usize {
        self.ptr.as_ptr() as usize
    }

    pub fn len(&self) -> usize {
        self.layout.size()
    }
}

impl Drop for Block {
    fn drop(&mut self) {
        unsafe { dealloc(self.ptr.as_ptr(), self.layout) };
    }
}

#[derive(Debug)]
pub(crate) struct SharedObject {
    pub block: Block,
    /// Handles plus mappings
    pub refs: usize,
}

/// A window of a shared object mapped into a task
#[derive(Debug, Clone, Copy)]
pub(crate) struct Mapping {
    pub shared: u64,
    pub address: usize,
    pub len: usize,
}

impl KernelState {
    fn reserve(&mut self, size: usize, limit: usize) -> KernelResult<Block> {
        let total = self
            .memory_in_use
            .checked_add(size)
            .ok_or(ErrorCode::OutOfMemory)?;
        if total > limit {
            return Err(ErrorCode::OutOfMemory);
        }
        let block = Block::allocate(size)?;
        self.memory_in_use = total;
        Ok(block)
    }
}

impl Shared {
    pub(crate) fn memory_allocate(&self, caller: Caller, size: usize) -> KernelResult {
        if size == 0 {
            return Err(ErrorCode::InvalidParameter);
        }
        let mut guard = self.lock();
        let state = &mut *guard;
        live_task(&mut state.tasks, caller.task)?;
        let block = state.reserve(size, self.config.memory_limit)?;
        let address = block.address();
        live_task(&mut state.tasks, caller.task)?
            .allocations
            .insert(address, block);
        log::debug!("{} allocated {} bytes at {:#x}", caller.task, size, address);
        Ok(address as u64)
    }

    pub(crate) fn memory_release(&self, caller: Caller, address: u64, size: usize) -> KernelResult {
        let address = usize::try_from(address).map_err(|_| ErrorCode::InvalidAddress)?;
        let mut guard = self.lock();
        let state = &mut *guard;
        let task = live_task(&mut state.tasks, caller.task)?;
        let block = task
            .allocations
            .get(&address)
            .ok_or(ErrorCode::InvalidAddress)?;
        if block.len() != size {
            return Err(ErrorCode::InvalidParameter);
        }
        if let Some(block) = task.allocations.remove(&address) {
            state.memory_in_use -= block.len();
        }
        Ok(0)
    }

    pub(crate) fn shared_create(&self, caller: Caller, size: usize) -> KernelResult {
        if size == 0 {
            return Err(ErrorCode::InvalidParameter);
        }
        let mut guard = self.lock();
        let state = &mut *guard;
        let shared = state.next_shared_id();
        let task = live_task(&mut state.tasks, caller.task)?;
        let handle = task.handles.insert(KernelObject::SharedMemory(shared))?;
        match state.reserve(size, self.config.memory_limit) {
            Ok(block) => {
                state
                    .shared_memory
                    .insert(shared, SharedObject { block, refs: 1 });
                Ok(handle)
            }
            Err(error) => {
                if let Ok(task) = live_task(&mut state.tasks, caller.task) {
                    let _ = task.handles.remove(handle);
                }
                Err(error)
            }
        }
    }

    pub(crate) fn shared_map(
        &self,
        caller: Caller,
        handle: u64,
        offset: usize,
        size: usize,
    ) -> KernelResult {
        if size == 0 {
            return Err(ErrorCode::InvalidParameter);
        }
        let mut guard = self.lock();
        let state = &mut *guard;
        let task = live_task(&mut state.tasks, caller.task)?;
        let shared = match task.handles.get(handle)? {
            KernelObject::SharedMemory(shared) => *shared,
            _ => return Err(ErrorCode::InvalidOperation),
        };
        let object = state
            .shared_memory
            .get_mut(&shared)
            .ok_or(ErrorCode::InvalidHandle)?;
        let end = offset.checked_add(size).ok_or(ErrorCode::InvalidParameter)?;
        if end > object.block.len() {
            return Err(ErrorCode::InvalidParameter);
        }
        let address = object.block.address() + offset;
        object.refs += 1;
        task.mappings.push(Mapping {
            shared,
            address,
            len: size,
        });
        Ok(address as u64)
    }

    pub(crate) fn shared_unmap(&self, caller: Caller, address: u64, size: usize) -> KernelResult {
        let address = usize::try_from(address).map_err(|_| ErrorCode::InvalidAddress)?;
        let mut guard = self.lock();
        let state = &mut *guard;
        let task = live_task(&mut state.tasks, caller.task)?;
        if !task.mappings.iter().any(|mapping| mapping.address == address) {
            return Err(ErrorCode::InvalidAddress);
        }
        let position = task
            .mappings
            .iter()
            .position(|mapping| mapping.address == address && mapping.len == size)
            .ok_or(ErrorCode::InvalidParameter)?;
        let mapping = task.mappings.remove(position);
        state.unref_shared(mapping.shared);
        Ok(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_block_is_zeroed_and_aligned() {
        let block = Block::allocate(64).unwrap();
        assert_eq!(block.len(), 64);
        assert_eq!(block.address() % BLOCK_ALIGN, 0);
        let bytes = unsafe { std::slice::from_raw_parts(block.address() as *const u8, 64) };
        assert!(bytes.iter().all(|byte| *byte == 0));
    }
}
