//! Memory operations: private allocations and shared memory

use core::ptr::NonNull;

use crate::abi::Syscall;
use crate::client::SyscallClient;
use crate::error::{ErrorCode, SyscallResult};
use crate::gate::SyscallGate;
use crate::handle::SharedMemoryHandle;

/// A range of the calling task's address space handed out by the kernel
///
/// Private allocations belong to the task alone; shared mappings view a
/// backing store other tasks may map too. The region is released (or
/// unmapped) by value, so it cannot be released twice through this type.
#[must_use = "regions must be released or unmapped"]
#[derive(Debug, PartialEq, Eq)]
pub struct MappedRegion {
    base: NonNull<u8>,
    len: usize,
}

// The region names memory owned by the task, not by any one thread.
unsafe impl Send for MappedRegion {}

impl MappedRegion {
    /// Rebuilds a region from its parts.
    ///
    /// # Safety
    ///
    /// `base` and `len` must describe a region this task obtained from the
    /// kernel and still owns, and no other `MappedRegion` may describe it.
    pub unsafe fn from_raw_parts(base: *mut u8, len: usize) -> Option<Self> {
        NonNull::new(base).map(|base| Self { base, len })
    }

    fn from_kernel(address: u64, len: usize) -> SyscallResult<Self> {
        let base = NonNull::new(address as usize as *mut u8).ok_or_else(|| {
            log::error!("kernel mapped {} bytes at the null address", len);
            ErrorCode::InvalidAddress
        })?;
        Ok(Self { base, len })
    }

    pub fn as_ptr(&self) -> *mut u8 {
        self.base.as_ptr()
    }

    pub fn address(&self) -> u64 {
        self.base.as_ptr() as u64
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Gives up the region without releasing it.
    pub fn into_raw_parts(self) -> (*mut u8, usize) {
        (self.base.as_ptr(), self.len)
    }

    /// Views the region's bytes.
    ///
    /// # Safety
    ///
    /// For shared mappings, no other task or thread may write the range while
    /// the slice is alive.
    pub unsafe fn as_slice(&self) -> &[u8] {
        unsafe { core::slice::from_raw_parts(self.base.as_ptr(), self.len) }
    }

    /// Mutably views the region's bytes.
    ///
    /// # Safety
    ///
    /// For shared mappings, no other task or thread may access the range while
    /// the slice is alive.
    pub unsafe fn as_mut_slice(&mut self) -> &mut [u8] {
        unsafe { core::slice::from_raw_parts_mut(self.base.as_ptr(), self.len) }
    }
}

impl<G: SyscallGate> SyscallClient<G> {
    /// Allocates `size` bytes of private memory.
    ///
    /// Any rounding the kernel applies is its own business; the region covers
    /// at least `size` bytes and records exactly `size`.
    pub fn allocate_memory(&self, size: usize) -> SyscallResult<MappedRegion> {
        if size == 0 {
            return Err(ErrorCode::InvalidParameter);
        }
        let address = self.call_by_value(Syscall::MemoryAllocate, &[size as u64])?;
        MappedRegion::from_kernel(address, size)
    }

    /// Returns a private allocation to the kernel.
    ///
    /// The region is consumed whatever the outcome.
    pub fn release_memory(&self, region: MappedRegion) -> SyscallResult<()> {
        let (base, len) = region.into_raw_parts();
        unsafe { self.call(Syscall::MemoryRelease, &[base as u64, len as u64]) }.map(drop)
    }

    /// Creates a shared backing store of `size` bytes.
    pub fn create_shared_memory(&self, size: usize) -> SyscallResult<SharedMemoryHandle> {
        if size == 0 {
            return Err(ErrorCode::InvalidParameter);
        }
        let value = self.call_by_value(Syscall::SharedMemCreate, &[size as u64])?;
        SharedMemoryHandle::from_kernel(value)
    }

    /// Maps `size` bytes of a backing store, starting at `offset`, into this
    /// task's address space.
    pub fn map_shared_memory(
        &self,
        handle: &SharedMemoryHandle,
        offset: usize,
        size: usize,
    ) -> SyscallResult<MappedRegion> {
        if size == 0 || offset.checked_add(size).is_none() {
            return Err(ErrorCode::InvalidParameter);
        }
        let address = self.call_by_value(
            Syscall::SharedMemMap,
            &[handle.word(), offset as u64, size as u64],
        )?;
        MappedRegion::from_kernel(address, size)
    }

    /// Removes a shared mapping. The backing store survives until its handle
    /// is destroyed.
    pub fn unmap_shared_memory(&self, region: MappedRegion) -> SyscallResult<()> {
        let (base, len) = region.into_raw_parts();
        unsafe { self.call(Syscall::SharedMemUnmap, &[base as u64, len as u64]) }.map(drop)
    }

    /// Releases the backing store handle. Existing mappings stay valid until
    /// unmapped.
    pub fn destroy_shared_memory(&self, handle: SharedMemoryHandle) -> SyscallResult<()> {
        let raw = handle.into_raw();
        self.call_by_value(Syscall::ResourceRelease, &[raw.as_raw()]).map(drop)
    }
}
