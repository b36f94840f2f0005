//! Message passing between tasks
//!
//! Sending copies the payload into the target's inbox and never blocks. A
//! receive delivers the oldest message; whatever does not fit the buffer is
//! discarded with it.

use core_types::TaskId;
use kernel_api::abi::RECEIVE_NONBLOCKING;
use kernel_api::ErrorCode;

use crate::message_queue::{Message, QueueError};
use crate::state::{live_task, Caller, KernelResult, Shared};
use crate::user_memory::{check_buffer, copy_to_user, user_bytes};

impl Shared {
    pub(crate) fn message_send(
        &self,
        caller: Caller,
        target: u64,
        address: u64,
        len: u64,
    ) -> KernelResult {
        let target = TaskId::from_raw(target);
        if !target.is_valid() {
            return Err(ErrorCode::InvalidParameter);
        }
        if len > self.config.max_message_len as u64 {
            return Err(ErrorCode::InvalidParameter);
        }
        let payload = unsafe { user_bytes(address, len) }?.to_vec();

        let mut guard = self.lock();
        let state = &mut *guard;
        live_task(&mut state.tasks, caller.task)?;
        let inbox = match state.tasks.get_mut(&target) {
            Some(record) if record.is_running() => &mut record.inbox,
            _ => return Err(ErrorCode::CommunicationError),
        };
        if state.faults.should_drop_message(target) {
            log::debug!("fault plan dropped a message from {} to {}", caller.task, target);
            return Ok(0);
        }
        let bytes = payload.len();
        inbox
            .push(Message {
                sender: caller.task,
                payload,
            })
            .map_err(|QueueError::Full| ErrorCode::ResourceBusy)?;
        drop(guard);
        self.wake_all();
        log::debug!("{} sent {} bytes to {}", caller.task, bytes, target);
        Ok(0)
    }

    pub(crate) fn message_receive(
        &self,
        caller: Caller,
        address: u64,
        len: u64,
        flags: u64,
    ) -> KernelResult {
        let nonblocking = match flags {
            0 => false,
            RECEIVE_NONBLOCKING => true,
            _ => return Err(ErrorCode::InvalidParameter),
        };
        let capacity = check_buffer(address, len)?;

        self.block_until(caller, None, |state| {
            let task = match live_task(&mut state.tasks, caller.task) {
                Ok(task) => task,
                Err(error) => return Some(Err(error)),
            };
            match task.inbox.pop() {
                Some(message) => {
                    let count = capacity.min(message.payload.len());
                    if count < message.payload.len() {
                        log::debug!(
                            "message from {} truncated from {} to {} bytes",
                            message.sender,
                            message.payload.len(),
                            count
                        );
                    }
                    Some(
                        unsafe { copy_to_user(address, &message.payload[..count]) }
                            .map(|()| count as u64),
                    )
                }
                None if nonblocking => Some(Err(ErrorCode::NoMessage)),
                None => None,
            }
        })
    }
}
