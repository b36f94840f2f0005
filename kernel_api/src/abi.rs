//! Binary calling convention shared with the kernel.
//!
//! Every number in this module is a stable ABI constant. Changing one is a
//! breaking protocol change; `contract_tests` pins them.

use serde::{Deserialize, Serialize};

/// Number of argument words a syscall can carry.
pub const MAX_SYSCALL_ARGS: usize = 5;

/// Argument words for a single trap. Unused words are zero.
pub type SyscallArgs = [u64; MAX_SYSCALL_ARGS];

/// `LOCK_ACQUIRE` flag word (argument 2): fail with `ResourceBusy` instead of
/// blocking when the lock is held.
pub const ACQUIRE_NONBLOCKING: u64 = 1;

/// `MESSAGE_RECEIVE` flag word (argument 3): fail with `NoMessage` instead of
/// blocking when the inbox is empty.
pub const RECEIVE_NONBLOCKING: u64 = 1;

/// The kernel's system call table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u64)]
pub enum Syscall {
    MemoryAllocate = 1,
    MemoryRelease = 2,
    TaskSpawn = 3,
    TaskExit = 4,
    ResourceAcquire = 5,
    ResourceRead = 6,
    ResourceWrite = 7,
    ResourceRelease = 8,
    GetTaskId = 9,
    TaskSleep = 10,
    LockCreate = 11,
    LockAcquire = 12,
    LockRelease = 13,
    ThreadCreate = 14,
    ThreadExit = 15,
    GetSystemTime = 16,
    SharedMemCreate = 17,
    SharedMemMap = 18,
    SharedMemUnmap = 19,
    MessageSend = 20,
    MessageReceive = 21,
    GetKernelInfo = 100,
    TaskYield = 101,
    ResourceControl = 102,
}

impl Syscall {
    pub const ALL: [Syscall; 24] = [
        Syscall::MemoryAllocate,
        Syscall::MemoryRelease,
        Syscall::TaskSpawn,
        Syscall::TaskExit,
        Syscall::ResourceAcquire,
        Syscall::ResourceRead,
        Syscall::ResourceWrite,
        Syscall::ResourceRelease,
        Syscall::GetTaskId,
        Syscall::TaskSleep,
        Syscall::LockCreate,
        Syscall::LockAcquire,
        Syscall::LockRelease,
        Syscall::ThreadCreate,
        Syscall::ThreadExit,
        Syscall::GetSystemTime,
        Syscall::SharedMemCreate,
        Syscall::SharedMemMap,
        Syscall::SharedMemUnmap,
        Syscall::MessageSend,
        Syscall::MessageReceive,
        Syscall::GetKernelInfo,
        Syscall::TaskYield,
        Syscall::ResourceControl,
    ];

    /// The number placed in the syscall register
    pub const fn number(self) -> u64 {
        self as u64
    }

    /// Looks up a syscall by number. Kernels answer unknown numbers with
    /// `UnknownSyscall`.
    pub fn from_number(number: u64) -> Option<Self> {
        Self::ALL.into_iter().find(|call| call.number() == number)
    }

    /// Whether the kernel may suspend the calling thread indefinitely
    pub const fn may_block(self) -> bool {
        matches!(
            self,
            Syscall::LockAcquire | Syscall::MessageReceive | Syscall::TaskSleep
        )
    }

    /// Whether the call never returns to its caller
    pub const fn is_terminal(self) -> bool {
        matches!(self, Syscall::TaskExit | Syscall::ThreadExit)
    }

    pub const fn name(self) -> &'static str {
        match self {
            Syscall::MemoryAllocate => "MemoryAllocate",
            Syscall::MemoryRelease => "MemoryRelease",
            Syscall::TaskSpawn => "TaskSpawn",
            Syscall::TaskExit => "TaskExit",
            Syscall::ResourceAcquire => "ResourceAcquire",
            Syscall::ResourceRead => "ResourceRead",
            Syscall::ResourceWrite => "ResourceWrite",
            Syscall::ResourceRelease => "ResourceRelease",
            Syscall::GetTaskId => "GetTaskId",
            Syscall::TaskSleep => "TaskSleep",
            Syscall::LockCreate => "LockCreate",
            Syscall::LockAcquire => "LockAcquire",
            Syscall::LockRelease => "LockRelease",
            Syscall::ThreadCreate => "ThreadCreate",
            Syscall::ThreadExit => "ThreadExit",
            Syscall::GetSystemTime => "GetSystemTime",
            Syscall::SharedMemCreate => "SharedMemCreate",
            Syscall::SharedMemMap => "SharedMemMap",
            Syscall::SharedMemUnmap => "SharedMemUnmap",
            Syscall::MessageSend => "MessageSend",
            Syscall::MessageReceive => "MessageReceive",
            Syscall::GetKernelInfo => "GetKernelInfo",
            Syscall::TaskYield => "TaskYield",
            Syscall::ResourceControl => "ResourceControl",
        }
    }
}

/// Packs up to five words into a full argument array.
pub fn args(words: &[u64]) -> SyscallArgs {
    debug_assert!(words.len() <= MAX_SYSCALL_ARGS, "too many syscall arguments");
    let mut packed = [0u64; MAX_SYSCALL_ARGS];
    for (slot, word) in packed.iter_mut().zip(words) {
        *slot = *word;
    }
    packed
}

/// Sign-extends an exit code into an argument word.
pub const fn exit_code_word(code: i32) -> u64 {
    code as i64 as u64
}

/// Recovers an exit code from an argument word.
pub const fn exit_code_from_word(word: u64) -> i32 {
    word as i64 as i32
}
