//! The raw syscall gate
//!
//! A gate is the only thing in this crate that reaches the kernel. It moves a
//! syscall number and five argument words across the boundary and hands back
//! the kernel's signed result without interpreting it.

use crate::abi::SyscallArgs;

cfg_if::cfg_if! {
    if #[cfg(target_os = "none")] {
        mod trap;
        pub use trap::TrapGate;
    }
}

/// Transport for raw system calls
///
/// Implemented by [`TrapGate`] on bare-metal targets and by the simulated
/// kernel in tests. Failure of the trap mechanism itself is not representable
/// here; implementations treat it as fatal.
pub trait SyscallGate {
    /// Performs one system call.
    ///
    /// # Safety
    ///
    /// Argument words that the kernel interprets as addresses must point to
    /// memory owned by the calling task, valid (and writable where the call
    /// writes) for the stated lengths until this function returns.
    unsafe fn invoke(&self, number: u64, args: SyscallArgs) -> i64;

    /// Called after a terminal syscall (task or thread exit) came back.
    ///
    /// A real kernel never returns from those calls, so the default spins.
    fn halt(&self) -> ! {
        loop {
            core::hint::spin_loop();
        }
    }
}

impl<G: SyscallGate + ?Sized> SyscallGate for &G {
    unsafe fn invoke(&self, number: u64, args: SyscallArgs) -> i64 {
        unsafe { (**self).invoke(number, args) }
    }

    fn halt(&self) -> ! {
        (**self).halt()
    }
}
