//! Kernel information

use core_types::{Architecture, KernelInfo};
use kernel_api::ErrorCode;

use crate::state::{KernelResult, Shared};

impl Shared {
    pub(crate) fn kernel_info(&self, info_type: u64) -> KernelResult {
        let info = u32::try_from(info_type)
            .ok()
            .and_then(KernelInfo::from_code)
            .ok_or(ErrorCode::NotSupported)?;
        Ok(match info {
            KernelInfo::VersionMajor => self.config.kernel_version.major,
            KernelInfo::VersionMinor => self.config.kernel_version.minor,
            KernelInfo::BuildId => self.config.build_id,
            KernelInfo::UptimeSeconds => self.boot.elapsed().as_secs(),
            KernelInfo::Architecture => Architecture::current().code(),
        })
    }
}
