//! # Kernel API
//!
//! User-space side of the Sahne microkernel system call interface.
//!
//! ## Philosophy
//!
//! The kernel provides **mechanisms**, not policies:
//! - Memory regions (private and shared, explicitly mapped)
//! - Tasks and threads (explicitly spawned, never forked)
//! - Named resources behind handles (no ambient file paths)
//! - Locks and message passing between tasks
//!
//! ## Design Goals
//!
//! 1. **Testability**: every call goes through a [`SyscallGate`], so the whole
//!    surface can run against a simulated kernel
//! 2. **Explicitness**: results are [`SyscallResult`]s, never sentinel values
//! 3. **Type safety**: handles are linear and typed by what they name
//! 4. **Simplicity**: one trap primitive, six register words
//!
//! ## Layers
//!
//! - [`abi`]: syscall numbers and argument packing
//! - [`error`]: decoding of the kernel's signed result word
//! - [`gate`]: the trap primitive and the bare-metal implementation
//! - [`SyscallClient`]: typed wrappers grouped by subsystem
//! - [`ffi`]: status codes and `extern "C"` exports for other languages

#![cfg_attr(not(test), no_std)]

pub mod abi;
pub mod client;
pub mod error;
pub mod ffi;
pub mod gate;
pub mod handle;
pub mod kernel;
pub mod memory;
pub mod messaging;
pub mod resource;
pub mod sync;
pub mod task;
pub mod time;

pub use abi::{Syscall, SyscallArgs};
pub use client::{restart_on_interrupt, SyscallClient};
pub use error::{decode, encode, representable, ErrorCode, SyscallResult};
pub use ffi::Status;
pub use gate::SyscallGate;
pub use handle::{LockHandle, OwnedHandle, ResourceHandle, SharedMemoryHandle};
pub use memory::MappedRegion;
pub use task::ThreadEntry;
pub use time::{Duration, Instant};

pub use core_types::{Architecture, KernelInfo, RawHandle, ResourceMode, TaskId, ThreadId};
