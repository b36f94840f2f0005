//! The typed syscall client
//!
//! [`SyscallClient`] is the facade user code talks to. Each capability area
//! (memory, task, resource, sync, messaging, kernel info) adds its operations
//! in its own module as an `impl` block on this type. All of them share the
//! same shape: reject obviously invalid input locally with
//! `InvalidParameter`, otherwise marshal the arguments, cross the gate once,
//! and decode the signed result into a `Result`.

use crate::abi::{self, Syscall};
use crate::error::{decode, ErrorCode, SyscallResult};
use crate::gate::SyscallGate;

/// Typed access to the kernel through a gate
pub struct SyscallClient<G: SyscallGate> {
    gate: G,
}

impl<G: SyscallGate> SyscallClient<G> {
    pub const fn new(gate: G) -> Self {
        Self { gate }
    }

    pub fn gate(&self) -> &G {
        &self.gate
    }

    pub fn into_gate(self) -> G {
        self.gate
    }

    /// Crosses the gate once and decodes the result.
    ///
    /// # Safety
    ///
    /// Words the kernel treats as addresses must satisfy
    /// [`SyscallGate::invoke`]'s contract.
    pub(crate) unsafe fn call(&self, call: Syscall, words: &[u64]) -> SyscallResult<u64> {
        let raw = unsafe { self.gate.invoke(call.number(), abi::args(words)) };
        log::trace!("syscall {} -> {}", call.name(), raw);
        decode(raw).inspect_err(|error| log::debug!("syscall {} failed: {}", call.name(), error))
    }

    /// Issues a call whose words carry no addresses.
    pub(crate) fn call_by_value(&self, call: Syscall, words: &[u64]) -> SyscallResult<u64> {
        unsafe { self.call(call, words) }
    }

    /// Issues a terminal call and never comes back.
    pub(crate) fn call_terminal(&self, call: Syscall, words: &[u64]) -> ! {
        debug_assert!(call.is_terminal());
        let result = self.call_by_value(call, words);
        log::error!("terminal syscall {} returned {:?}", call.name(), result);
        self.gate.halt()
    }
}

/// Re-issues a blocking operation for as long as it is interrupted.
///
/// Any other outcome, success or failure, is returned as is.
pub fn restart_on_interrupt<T, F>(mut operation: F) -> SyscallResult<T>
where
    F: FnMut() -> SyscallResult<T>,
{
    loop {
        match operation() {
            Err(ErrorCode::Interrupted) => {
                log::debug!("blocking call interrupted, restarting");
                continue;
            }
            other => return other,
        }
    }
}

/// Address word for a buffer; empty buffers are passed as null.
pub(crate) fn buffer_word(buffer: &[u8]) -> u64 {
    if buffer.is_empty() {
        0
    } else {
        buffer.as_ptr() as u64
    }
}

/// Converts a kernel-reported byte count, rejecting counts beyond the buffer.
pub(crate) fn byte_count(value: u64, limit: usize) -> SyscallResult<usize> {
    match usize::try_from(value) {
        Ok(count) if count <= limit => Ok(count),
        _ => {
            log::error!("kernel reported {} bytes for a {} byte buffer", value, limit);
            Err(ErrorCode::CommunicationError)
        }
    }
}
