//! Per-task handle tables
//!
//! Handle values start at 1 and only grow, so a released value is never
//! handed out again by the same table. 0 stays free as the null handle.

use kernel_api::ErrorCode;
use std::collections::BTreeMap;

use crate::resources::OpenResource;
use crate::state::KernelResult;
use crate::sync::LockState;

/// What a handle refers to
#[derive(Debug)]
pub(crate) enum KernelObject {
    Resource(OpenResource),
    Lock(LockState),
    /// Id of an entry in the kernel's shared memory table
    SharedMemory(u64),
}

impl KernelObject {
    pub fn kind(&self) -> &'static str {
        match self {
            KernelObject::Resource(_) => "resource",
            KernelObject::Lock(_) => "lock",
            KernelObject::SharedMemory(_) => "shared memory",
        }
    }
}

#[derive(Debug)]
pub(crate) struct HandleTable<T> {
    entries: BTreeMap<u64, T>,
    next: u64,
    limit: usize,
}

impl<T> HandleTable<T> {
    pub fn new(limit: usize) -> Self {
        Self {
            entries: BTreeMap::new(),
            next: 1,
            limit,
        }
    }

    pub fn insert(&mut self, object: T) -> KernelResult {
        if self.entries.len() >= self.limit {
            return Err(ErrorCode::HandleLimitExceeded);
        }
        let handle = self.next;
        self.next += 1;
        self.entries.insert(handle, object);
        Ok(handle)
    }

    pub fn get(&self, handle: u64) -> KernelResult<&T> {
        self.entries.get(&handle).ok_or(ErrorCode::InvalidHandle)
    }

    pub fn get_mut(&mut self, handle: u64) -> KernelResult<&mut T> {
        self.entries.get_mut(&handle).ok_or(ErrorCode::InvalidHandle)
    }

    pub fn remove(&mut self, handle: u64) -> KernelResult<T> {
        self.entries.remove(&handle).ok_or(ErrorCode::InvalidHandle)
    }

    pub fn values_mut(&mut self) -> impl Iterator<Item = &mut T> {
        self.entries.values_mut()
    }

    pub fn drain(&mut self) -> impl Iterator<Item = T> + '_ {
        std::mem::take(&mut self.entries).into_values()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }
}
