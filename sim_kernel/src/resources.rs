//! Named resources
//!
//! The simulated namespace is a flat map from identifier bytes to contents.
//! Identifiers are opaque: `/` has no meaning to the kernel. Every open
//! handle has its own cursor; reads and writes move it.

use core_types::ResourceMode;
use kernel_api::ErrorCode;
use std::collections::BTreeMap;

use crate::handle_table::KernelObject;
use crate::state::{live_task, Caller, KernelResult, Shared};
use crate::user_memory::{check_buffer, copy_to_user, user_bytes};

/// Requests understood by `RESOURCE_CONTROL` on simulated resources
pub mod control {
    /// Returns the resource's size in bytes
    pub const GET_SIZE: u64 = 1;
    /// Moves the cursor to `arg`; returns the new position
    pub const SEEK: u64 = 2;
    /// Returns the cursor position
    pub const GET_POSITION: u64 = 3;
}

const KNOWN_MODE_BITS: u32 = ResourceMode::READ
    .union(ResourceMode::WRITE)
    .union(ResourceMode::CREATE)
    .union(ResourceMode::EXCLUSIVE)
    .union(ResourceMode::TRUNCATE)
    .bits();

#[derive(Debug, Default)]
pub(crate) struct ResourceStore {
    entries: BTreeMap<Vec<u8>, Vec<u8>>,
}

impl ResourceStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: &[u8]) -> Option<&Vec<u8>> {
        self.entries.get(id)
    }

    pub fn insert(&mut self, id: Vec<u8>, contents: Vec<u8>) {
        self.entries.insert(id, contents);
    }

    pub fn remove(&mut self, id: &[u8]) -> Option<Vec<u8>> {
        self.entries.remove(id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Applies `mode`'s existence rules to `id`.
    fn open(&mut self, id: &[u8], mode: ResourceMode) -> KernelResult<()> {
        match self.entries.get_mut(id) {
            Some(_) if mode.requires_new() => Err(ErrorCode::ResourceBusy),
            Some(contents) => {
                if mode.contains(ResourceMode::TRUNCATE) {
                    contents.clear();
                }
                Ok(())
            }
            None if mode.contains(ResourceMode::CREATE) => {
                self.entries.insert(id.to_vec(), Vec::new());
                Ok(())
            }
            None => Err(ErrorCode::ResourceNotFound),
        }
    }
}

/// A handle's view of a resource
#[derive(Debug)]
pub(crate) struct OpenResource {
    pub id: Vec<u8>,
    pub mode: ResourceMode,
    pub position: usize,
}

impl OpenResource {
    fn require(&self, access: ResourceMode) -> KernelResult<()> {
        if self.mode.contains(access) {
            Ok(())
        } else {
            Err(ErrorCode::InvalidOperation)
        }
    }
}

fn as_resource(object: &mut KernelObject) -> KernelResult<&mut OpenResource> {
    match object {
        KernelObject::Resource(resource) => Ok(resource),
        _ => Err(ErrorCode::InvalidOperation),
    }
}

impl Shared {
    pub(crate) fn resource_acquire(
        &self,
        caller: Caller,
        id_address: u64,
        id_len: u64,
        mode_word: u64,
    ) -> KernelResult {
        if id_len == 0 {
            return Err(ErrorCode::InvalidParameter);
        }
        if id_len > self.config.max_resource_id_len as u64 {
            return Err(ErrorCode::NamingError);
        }
        let bits = u32::try_from(mode_word).map_err(|_| ErrorCode::InvalidParameter)?;
        if bits & !KNOWN_MODE_BITS != 0 {
            return Err(ErrorCode::InvalidParameter);
        }
        let mode = ResourceMode::from_bits_retain(bits);
        if mode.contains(ResourceMode::TRUNCATE) && !mode.contains(ResourceMode::WRITE) {
            return Err(ErrorCode::InvalidParameter);
        }

        let id = unsafe { user_bytes(id_address, id_len) }?.to_vec();
        if id.contains(&0) {
            return Err(ErrorCode::NamingError);
        }
        if mode.mutates() && self.config.is_read_only(&id) {
            return Err(ErrorCode::PermissionDenied);
        }

        let mut guard = self.lock();
        let state = &mut *guard;
        let task = live_task(&mut state.tasks, caller.task)?;
        // The handle is allocated before touching the store so a full table
        // cannot leave a half-created resource behind.
        let handle = task.handles.insert(KernelObject::Resource(OpenResource {
            id: id.clone(),
            mode,
            position: 0,
        }))?;
        if let Err(error) = state.resources.open(&id, mode) {
            let _ = task.handles.remove(handle);
            return Err(error);
        }
        log::debug!(
            "{} acquired {:?} as handle {} ({:?})",
            caller.task,
            String::from_utf8_lossy(&id),
            handle,
            mode
        );
        Ok(handle)
    }

    pub(crate) fn resource_read(
        &self,
        caller: Caller,
        handle: u64,
        address: u64,
        len: u64,
    ) -> KernelResult {
        let len = check_buffer(address, len)?;
        let mut guard = self.lock();
        let state = &mut *guard;
        let resource = as_resource(live_task(&mut state.tasks, caller.task)?.handles.get_mut(handle)?)?;
        resource.require(ResourceMode::READ)?;
        if len == 0 {
            return Ok(0);
        }
        let contents = state
            .resources
            .get(&resource.id)
            .ok_or(ErrorCode::ResourceNotFound)?;
        let start = resource.position.min(contents.len());
        let count = len.min(contents.len() - start);
        unsafe { copy_to_user(address, &contents[start..start + count]) }?;
        resource.position = start + count;
        Ok(count as u64)
    }

    pub(crate) fn resource_write(
        &self,
        caller: Caller,
        handle: u64,
        address: u64,
        len: u64,
    ) -> KernelResult {
        let data = unsafe { user_bytes(address, len) }?;
        let mut guard = self.lock();
        let state = &mut *guard;
        let resource = as_resource(live_task(&mut state.tasks, caller.task)?.handles.get_mut(handle)?)?;
        resource.require(ResourceMode::WRITE)?;
        if data.is_empty() {
            return Ok(0);
        }
        let contents = state
            .resources
            .entries
            .get_mut(&resource.id)
            .ok_or(ErrorCode::ResourceNotFound)?;
        let start = resource.position;
        let end = start + data.len();
        if contents.len() < end {
            contents.resize(end, 0);
        }
        contents[start..end].copy_from_slice(data);
        resource.position = end;
        Ok(data.len() as u64)
    }

    pub(crate) fn resource_control(
        &self,
        caller: Caller,
        handle: u64,
        request: u64,
        arg: u64,
    ) -> KernelResult {
        let mut guard = self.lock();
        let state = &mut *guard;
        let resource = as_resource(live_task(&mut state.tasks, caller.task)?.handles.get_mut(handle)?)?;
        let size = state
            .resources
            .get(&resource.id)
            .map_or(0, Vec::len);
        match request {
            control::GET_SIZE => Ok(size as u64),
            control::GET_POSITION => Ok(resource.position as u64),
            control::SEEK => {
                let position = usize::try_from(arg).map_err(|_| ErrorCode::InvalidParameter)?;
                if position > size {
                    return Err(ErrorCode::InvalidParameter);
                }
                resource.position = position;
                Ok(arg)
            }
            _ => Err(ErrorCode::NotSupported),
        }
    }

    /// `RESOURCE_RELEASE` closes any kind of handle.
    pub(crate) fn handle_release(&self, caller: Caller, handle: u64) -> KernelResult {
        let mut guard = self.lock();
        let state = &mut *guard;
        let object = live_task(&mut state.tasks, caller.task)?
            .handles
            .remove(handle)?;
        log::debug!("{} released {} handle {}", caller.task, object.kind(), handle);
        state.release_object(object);
        // Threads parked on a released lock re-check and see the handle gone.
        self.wake_all();
        Ok(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_existence_rules() {
        let mut store = ResourceStore::new();
        assert_eq!(
            store.open(b"a", ResourceMode::READ),
            Err(ErrorCode::ResourceNotFound)
        );
        assert_eq!(store.open(b"a", ResourceMode::CREATE), Ok(()));
        assert_eq!(store.open(b"a", ResourceMode::CREATE), Ok(()));
        assert_eq!(
            store.open(b"a", ResourceMode::CREATE | ResourceMode::EXCLUSIVE),
            Err(ErrorCode::ResourceBusy)
        );
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_truncate_clears_contents() {
        let mut store = ResourceStore::new();
        store.insert(b"log".to_vec(), b"old".to_vec());
        store
            .open(b"log", ResourceMode::WRITE | ResourceMode::TRUNCATE)
            .unwrap();
        assert_eq!(store.get(b"log"), Some(&Vec::new()));
    }

    #[test]
    fn test_exclusive_without_create_is_plain_open() {
        let mut store = ResourceStore::new();
        store.insert(b"x".to_vec(), Vec::new());
        assert_eq!(
            store.open(b"x", ResourceMode::READ | ResourceMode::EXCLUSIVE),
            Ok(())
        );
    }
}
