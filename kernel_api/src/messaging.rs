//! Message passing between tasks
//!
//! Sends are asynchronous and ordered per sender/target pair. A receive takes
//! the oldest pending message; if it does not fit, the kernel truncates it to
//! the buffer and reports the number of bytes copied.

use core_types::TaskId;

use crate::abi::{Syscall, RECEIVE_NONBLOCKING};
use crate::client::{buffer_word, byte_count, SyscallClient};
use crate::error::{ErrorCode, SyscallResult};
use crate::gate::SyscallGate;

impl<G: SyscallGate> SyscallClient<G> {
    /// Queues `message` for `target` without waiting for delivery.
    pub fn send_message(&self, target: TaskId, message: &[u8]) -> SyscallResult<()> {
        if !target.is_valid() {
            return Err(ErrorCode::InvalidParameter);
        }
        unsafe {
            self.call(
                Syscall::MessageSend,
                &[target.as_raw(), buffer_word(message), message.len() as u64],
            )
        }
        .map(drop)
    }

    /// Blocks until a message arrives and copies it into `buffer`.
    ///
    /// Interruptible.
    pub fn receive_message(&self, buffer: &mut [u8]) -> SyscallResult<usize> {
        self.receive_with_flags(buffer, 0)
    }

    /// Takes a pending message, failing with `NoMessage` if there is none.
    pub fn try_receive_message(&self, buffer: &mut [u8]) -> SyscallResult<usize> {
        self.receive_with_flags(buffer, RECEIVE_NONBLOCKING)
    }

    fn receive_with_flags(&self, buffer: &mut [u8], flags: u64) -> SyscallResult<usize> {
        let len = buffer.len();
        let value = unsafe {
            self.call(
                Syscall::MessageReceive,
                &[buffer_word(buffer), len as u64, flags],
            )
        }?;
        byte_count(value, len)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::tests::ScriptedGate;

    #[test]
    fn test_send_rejects_invalid_target() {
        let client = SyscallClient::new(ScriptedGate::default());
        assert_eq!(
            client.send_message(TaskId::INVALID, b"x").unwrap_err(),
            ErrorCode::InvalidParameter
        );
        assert_eq!(client.gate().call_count(), 0);
    }

    #[test]
    fn test_send_marshals_message() {
        let client = SyscallClient::new(ScriptedGate::default());
        let message = b"ping";
        client.send_message(TaskId::from_raw(5), message).unwrap();
        let (number, words) = client.gate().last_call();
        assert_eq!(number, 20);
        assert_eq!(words[0], 5);
        assert_eq!(words[1], message.as_ptr() as u64);
        assert_eq!(words[2], 4);
    }

    #[test]
    fn test_try_receive_sets_flag() {
        let client = SyscallClient::new(ScriptedGate::returning(&[-8]));
        let mut buffer = [0u8; 16];
        assert_eq!(
            client.try_receive_message(&mut buffer).unwrap_err(),
            ErrorCode::NoMessage
        );
        let (number, words) = client.gate().last_call();
        assert_eq!(number, 21);
        assert_eq!(words[1], 16);
        assert_eq!(words[2], RECEIVE_NONBLOCKING);
    }

    #[test]
    fn test_receive_blocks_by_default() {
        let client = SyscallClient::new(ScriptedGate::returning(&[3]));
        let mut buffer = [0u8; 8];
        assert_eq!(client.receive_message(&mut buffer), Ok(3));
        assert_eq!(client.gate().last_call().1[2], 0);
    }
}
