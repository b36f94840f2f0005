//! Kernel information and time queries

use core_types::{Architecture, KernelInfo};

use crate::abi::Syscall;
use crate::client::SyscallClient;
use crate::error::SyscallResult;
use crate::gate::SyscallGate;
use crate::time::Instant;

impl<G: SyscallGate> SyscallClient<G> {
    pub fn kernel_info(&self, info: KernelInfo) -> SyscallResult<u64> {
        self.kernel_info_raw(info.code())
    }

    /// Queries an info type by code, including ones [`KernelInfo`] does not
    /// list. Unknown codes fail with `NotSupported`.
    pub fn kernel_info_raw(&self, info_type: u32) -> SyscallResult<u64> {
        self.call_by_value(Syscall::GetKernelInfo, &[u64::from(info_type)])
    }

    pub fn kernel_architecture(&self) -> SyscallResult<Architecture> {
        self.kernel_info(KernelInfo::Architecture)
            .map(Architecture::from_code)
    }

    /// Reads the kernel clock.
    pub fn system_time(&self) -> SyscallResult<Instant> {
        self.call_by_value(Syscall::GetSystemTime, &[])
            .map(Instant::from_nanos)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::tests::ScriptedGate;
    use crate::error::ErrorCode;

    #[test]
    fn test_info_marshals_code() {
        let client = SyscallClient::new(ScriptedGate::returning(&[3]));
        assert_eq!(client.kernel_info(KernelInfo::BuildId), Ok(3));
        assert_eq!(client.gate().last_call(), (100, [3, 0, 0, 0, 0]));
    }

    #[test]
    fn test_unknown_info_type() {
        let client = SyscallClient::new(ScriptedGate::returning(&[-10]));
        assert_eq!(client.kernel_info_raw(77), Err(ErrorCode::NotSupported));
    }

    #[test]
    fn test_architecture_decoding() {
        let client = SyscallClient::new(ScriptedGate::returning(&[3]));
        assert_eq!(client.kernel_architecture(), Ok(Architecture::Riscv64));
    }

    #[test]
    fn test_system_time() {
        let client = SyscallClient::new(ScriptedGate::returning(&[1_500]));
        assert_eq!(client.system_time(), Ok(Instant::from_nanos(1_500)));
        assert_eq!(client.gate().last_call().0, 16);
    }
}
