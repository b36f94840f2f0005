//! Architecture trap into the kernel.
//!
//! Register assignment follows each architecture's usual syscall convention:
//! the number goes in the dedicated syscall register, the five argument words
//! in the first argument registers, and the signed result comes back in the
//! first return register.

use super::SyscallGate;
use crate::abi::SyscallArgs;
use core::arch::asm;

/// Gate that executes the hardware syscall instruction
#[derive(Debug, Default, Clone, Copy)]
pub struct TrapGate;

impl SyscallGate for TrapGate {
    unsafe fn invoke(&self, number: u64, args: SyscallArgs) -> i64 {
        unsafe { trap(number, args) }
    }
}

#[cfg(target_arch = "x86_64")]
unsafe fn trap(number: u64, args: SyscallArgs) -> i64 {
    let result: i64;
    unsafe {
        asm!(
            "syscall",
            inlateout("rax") number as i64 => result,
            in("rdi") args[0],
            in("rsi") args[1],
            in("rdx") args[2],
            in("r10") args[3],
            in("r8") args[4],
            out("rcx") _,
            out("r11") _,
            options(nostack),
        );
    }
    result
}

#[cfg(target_arch = "riscv64")]
unsafe fn trap(number: u64, args: SyscallArgs) -> i64 {
    let result: i64;
    unsafe {
        asm!(
            "ecall",
            in("a7") number,
            inlateout("a0") args[0] as i64 => result,
            in("a1") args[1],
            in("a2") args[2],
            in("a3") args[3],
            in("a4") args[4],
            options(nostack),
        );
    }
    result
}

#[cfg(target_arch = "aarch64")]
unsafe fn trap(number: u64, args: SyscallArgs) -> i64 {
    let result: i64;
    unsafe {
        asm!(
            "svc #0",
            in("x8") number,
            inlateout("x0") args[0] as i64 => result,
            in("x1") args[1],
            in("x2") args[2],
            in("x3") args[3],
            in("x4") args[4],
            options(nostack),
        );
    }
    result
}

#[cfg(not(any(target_arch = "x86_64", target_arch = "riscv64", target_arch = "aarch64")))]
compile_error!("Sahne does not support this target architecture!");
