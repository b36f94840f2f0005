//! Kernel information selectors

use serde::{Deserialize, Serialize};

/// What `get_kernel_info` reports
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u32)]
pub enum KernelInfo {
    VersionMajor = 1,
    VersionMinor = 2,
    BuildId = 3,
    /// Seconds since the kernel started
    UptimeSeconds = 4,
    /// One of the [`Architecture`] codes
    Architecture = 5,
}

impl KernelInfo {
    pub const ALL: [KernelInfo; 5] = [
        KernelInfo::VersionMajor,
        KernelInfo::VersionMinor,
        KernelInfo::BuildId,
        KernelInfo::UptimeSeconds,
        KernelInfo::Architecture,
    ];

    pub const fn code(self) -> u32 {
        self as u32
    }

    pub fn from_code(code: u32) -> Option<Self> {
        Self::ALL.into_iter().find(|info| info.code() == code)
    }
}

/// CPU architecture reported by [`KernelInfo::Architecture`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u64)]
pub enum Architecture {
    Other = 0,
    X86_64 = 1,
    Aarch64 = 2,
    Riscv64 = 3,
}

impl Architecture {
    /// The architecture this crate was compiled for
    pub const fn current() -> Self {
        if cfg!(target_arch = "x86_64") {
            Architecture::X86_64
        } else if cfg!(target_arch = "aarch64") {
            Architecture::Aarch64
        } else if cfg!(target_arch = "riscv64") {
            Architecture::Riscv64
        } else {
            Architecture::Other
        }
    }

    pub const fn code(self) -> u64 {
        self as u64
    }

    pub fn from_code(code: u64) -> Self {
        match code {
            1 => Architecture::X86_64,
            2 => Architecture::Aarch64,
            3 => Architecture::Riscv64,
            _ => Architecture::Other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_info_code_round_trip() {
        for info in KernelInfo::ALL {
            assert_eq!(KernelInfo::from_code(info.code()), Some(info));
        }
        assert_eq!(KernelInfo::from_code(0), None);
        assert_eq!(KernelInfo::from_code(6), None);
    }

    #[test]
    fn test_architecture_codes() {
        assert_eq!(Architecture::from_code(Architecture::current().code()), Architecture::current());
        assert_eq!(Architecture::from_code(99), Architecture::Other);
    }
}
