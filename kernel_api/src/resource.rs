//! Named resources: acquire, read, write, control, release
//!
//! A resource is any kernel object addressed by an opaque byte identifier,
//! usually a hierarchical name. Reads and writes may transfer fewer bytes
//! than asked; that is success, not an error.

use core_types::ResourceMode;

use crate::abi::Syscall;
use crate::client::{buffer_word, byte_count, SyscallClient};
use crate::error::{ErrorCode, SyscallResult};
use crate::gate::SyscallGate;
use crate::handle::ResourceHandle;

impl<G: SyscallGate> SyscallClient<G> {
    /// Opens (or creates, per `mode`) the resource named `id`.
    ///
    /// `id` is passed as bytes and need not be UTF-8. `mode` reaches the
    /// kernel exactly as given.
    pub fn acquire_resource(
        &self,
        id: impl AsRef<[u8]>,
        mode: ResourceMode,
    ) -> SyscallResult<ResourceHandle> {
        let id = id.as_ref();
        if id.is_empty() {
            return Err(ErrorCode::InvalidParameter);
        }
        let value = unsafe {
            self.call(
                Syscall::ResourceAcquire,
                &[id.as_ptr() as u64, id.len() as u64, u64::from(mode.bits())],
            )
        }?;
        ResourceHandle::from_kernel(value)
    }

    /// Reads up to `buffer.len()` bytes. A short count means end of data or
    /// a partial transfer.
    pub fn read_resource(
        &self,
        handle: &ResourceHandle,
        buffer: &mut [u8],
    ) -> SyscallResult<usize> {
        let len = buffer.len();
        let value = unsafe {
            self.call(
                Syscall::ResourceRead,
                &[handle.word(), buffer_word(buffer), len as u64],
            )
        }?;
        byte_count(value, len)
    }

    /// Writes up to `data.len()` bytes and reports how many were taken.
    pub fn write_resource(&self, handle: &ResourceHandle, data: &[u8]) -> SyscallResult<usize> {
        let value = unsafe {
            self.call(
                Syscall::ResourceWrite,
                &[handle.word(), buffer_word(data), data.len() as u64],
            )
        }?;
        byte_count(value, data.len())
    }

    /// Writes until every byte of `data` is delivered.
    ///
    /// A write that makes no progress fails with `CommunicationError`.
    pub fn write_all_resource(&self, handle: &ResourceHandle, mut data: &[u8]) -> SyscallResult<()> {
        while !data.is_empty() {
            match self.write_resource(handle, data)? {
                0 => return Err(ErrorCode::CommunicationError),
                written => data = &data[written..],
            }
        }
        Ok(())
    }

    /// Sends a resource-specific command. `request`, `arg` and the result mean
    /// whatever the resource defines.
    pub fn control_resource(
        &self,
        handle: &ResourceHandle,
        request: u64,
        arg: u64,
    ) -> SyscallResult<u64> {
        self.call_by_value(Syscall::ResourceControl, &[handle.word(), request, arg])
    }

    /// Releases the handle. It is consumed even when the kernel reports an
    /// error.
    pub fn release_resource(&self, handle: ResourceHandle) -> SyscallResult<()> {
        let raw = handle.into_raw();
        self.call_by_value(Syscall::ResourceRelease, &[raw.as_raw()])
            .map(drop)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::tests::ScriptedGate;

    #[test]
    fn test_empty_id_rejected_locally() {
        let client = SyscallClient::new(ScriptedGate::default());
        assert_eq!(
            client.acquire_resource("", ResourceMode::READ).unwrap_err(),
            ErrorCode::InvalidParameter
        );
        assert_eq!(client.gate().call_count(), 0);
    }

    #[test]
    fn test_acquire_forwards_mode_bits() {
        let client = SyscallClient::new(ScriptedGate::returning(&[6]));
        let mode = ResourceMode::from_bits_retain(0x104);
        let id = b"dev/\xffraw";
        let handle = client.acquire_resource(id, mode).unwrap();
        assert_eq!(handle.word(), 6);
        let (number, words) = client.gate().last_call();
        assert_eq!(number, 5);
        assert_eq!(words[0], id.as_ptr() as u64);
        assert_eq!(words[1], 8);
        assert_eq!(words[2], 0x104);
        let _ = handle.into_raw();
    }

    #[test]
    fn test_read_zero_length_passes_null() {
        let client = SyscallClient::new(ScriptedGate::returning(&[1, 0]));
        let handle = client.acquire_resource("a", ResourceMode::READ).unwrap();
        assert_eq!(client.read_resource(&handle, &mut []), Ok(0));
        assert_eq!(client.gate().last_call(), (6, [1, 0, 0, 0, 0]));
        let _ = handle.into_raw();
    }

    #[test]
    fn test_read_rejects_overlong_count() {
        let client = SyscallClient::new(ScriptedGate::returning(&[1, 9]));
        let handle = client.acquire_resource("a", ResourceMode::READ).unwrap();
        let mut buffer = [0u8; 4];
        assert_eq!(
            client.read_resource(&handle, &mut buffer).unwrap_err(),
            ErrorCode::CommunicationError
        );
        let _ = handle.into_raw();
    }

    #[test]
    fn test_write_all_loops_on_partial_writes() {
        let client = SyscallClient::new(ScriptedGate::returning(&[1, 2, 2, 1]));
        let handle = client.acquire_resource("a", ResourceMode::WRITE).unwrap();
        client.write_all_resource(&handle, b"hello").unwrap();
        assert_eq!(client.gate().call_count(), 4);
        let (_, words) = client.gate().last_call();
        assert_eq!(words[2], 1);
        let _ = handle.into_raw();
    }

    #[test]
    fn test_write_all_stalls() {
        let client = SyscallClient::new(ScriptedGate::returning(&[1, 0]));
        let handle = client.acquire_resource("a", ResourceMode::WRITE).unwrap();
        assert_eq!(
            client.write_all_resource(&handle, b"x").unwrap_err(),
            ErrorCode::CommunicationError
        );
        let _ = handle.into_raw();
    }

    #[test]
    fn test_release_consumes_on_error() {
        let client = SyscallClient::new(ScriptedGate::returning(&[1, -13]));
        let handle = client.acquire_resource("a", ResourceMode::READ).unwrap();
        assert_eq!(
            client.release_resource(handle).unwrap_err(),
            ErrorCode::InvalidHandle
        );
    }
}
