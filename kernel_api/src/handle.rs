//! Owned capability handles
//!
//! Every handle the kernel gives out must be paired with exactly one release.
//! The wrappers here are move-only: acquire calls return them by value, the
//! matching release call takes them by value, and every other operation
//! borrows. Use-after-release and double-release therefore do not compile.
//!
//! Dropping a handle without releasing it is not an error the kernel can see;
//! it is logged, and the kernel reclaims the slot when the task exits.

use core::mem::ManuallyDrop;
use core_types::RawHandle;

use crate::error::{ErrorCode, SyscallResult};

/// A handle owned by the calling task
#[must_use = "handles must be released exactly once"]
#[derive(Debug, PartialEq, Eq, Hash)]
pub struct OwnedHandle(RawHandle);

impl OwnedHandle {
    /// Takes ownership of a raw handle value.
    ///
    /// # Safety
    ///
    /// `raw` must be a handle currently held by this task that no other
    /// `OwnedHandle` owns, so it is released at most once.
    pub unsafe fn from_raw(raw: RawHandle) -> Self {
        Self(raw)
    }

    /// Wraps the success payload of an acquire-style call.
    pub(crate) fn from_kernel(value: u64) -> SyscallResult<Self> {
        let raw = RawHandle::from_raw(value);
        if raw.is_null() {
            log::error!("kernel returned the null handle from an acquire call");
            return Err(ErrorCode::InvalidHandle);
        }
        Ok(Self(raw))
    }

    pub fn as_raw(&self) -> RawHandle {
        self.0
    }

    /// Gives up ownership without releasing.
    pub fn into_raw(self) -> RawHandle {
        ManuallyDrop::new(self).0
    }
}

impl Drop for OwnedHandle {
    fn drop(&mut self) {
        log::warn!(
            "{} dropped without release; it stays open until the task exits",
            self.0
        );
    }
}

macro_rules! typed_handle {
    ($(#[$attr:meta])* $name:ident) => {
        $(#[$attr])*
        #[must_use = "handles must be released exactly once"]
        #[derive(Debug, PartialEq, Eq, Hash)]
        pub struct $name(OwnedHandle);

        impl $name {
            /// Takes ownership of a raw handle value.
            ///
            /// # Safety
            ///
            /// Same contract as [`OwnedHandle::from_raw`], and the handle must
            /// name a kernel object of this kind.
            pub unsafe fn from_raw(raw: RawHandle) -> Self {
                Self(unsafe { OwnedHandle::from_raw(raw) })
            }

            pub(crate) fn from_kernel(value: u64) -> SyscallResult<Self> {
                OwnedHandle::from_kernel(value).map(Self)
            }

            pub fn as_raw(&self) -> RawHandle {
                self.0.as_raw()
            }

            /// Gives up ownership without releasing.
            pub fn into_raw(self) -> RawHandle {
                self.0.into_raw()
            }

            pub(crate) fn word(&self) -> u64 {
                self.0.as_raw().as_raw()
            }
        }

        impl From<$name> for OwnedHandle {
            fn from(handle: $name) -> OwnedHandle {
                handle.0
            }
        }
    };
}

typed_handle!(
    /// Handle to a named resource (file, device, IPC endpoint)
    ResourceHandle
);

typed_handle!(
    /// Handle to a kernel lock
    LockHandle
);

typed_handle!(
    /// Handle to a shared-memory backing store
    SharedMemoryHandle
);
