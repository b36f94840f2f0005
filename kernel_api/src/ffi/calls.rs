//! Bodies of the C entry points, generic over the gate.
//!
//! Each function takes its arguments exactly as the matching `sahne_*`
//! export receives them, so the same code runs against the hardware trap on
//! bare metal and against any other [`SyscallGate`] on a host.
//!
//! Handles cross this boundary as bare `u64` values, so ownership is the C
//! caller's responsibility: functions that only use a handle borrow it, and
//! the release functions consume it.
//!
//! # Safety
//!
//! Every pointer argument must be null or valid for the stated length (for
//! out-pointers, writable for one value) until the call returns.

#![allow(clippy::missing_safety_doc)]

use core::mem::ManuallyDrop;
use core_types::{RawHandle, ResourceMode, TaskId};

use super::Status;
use crate::client::SyscallClient;
use crate::error::{ErrorCode, SyscallResult};
use crate::gate::SyscallGate;
use crate::handle::{LockHandle, ResourceHandle, SharedMemoryHandle};
use crate::memory::MappedRegion;
use crate::task::ThreadEntry;
use crate::time::Duration;

unsafe fn write_out<T>(out: *mut T, result: SyscallResult<T>) -> Status {
    match result {
        Ok(value) => {
            unsafe { out.write(value) };
            Status::SUCCESS
        }
        Err(error) => Status::from(error),
    }
}

/// A null pointer is only a valid buffer when it is empty.
unsafe fn input_bytes<'a>(data: *const u8, len: usize) -> Option<&'a [u8]> {
    if data.is_null() {
        (len == 0).then_some(&[][..])
    } else {
        Some(unsafe { core::slice::from_raw_parts(data, len) })
    }
}

unsafe fn output_bytes<'a>(data: *mut u8, len: usize) -> Option<&'a mut [u8]> {
    if data.is_null() {
        (len == 0).then_some(&mut [][..])
    } else {
        Some(unsafe { core::slice::from_raw_parts_mut(data, len) })
    }
}

macro_rules! borrow_handle {
    ($kind:ident, $raw:expr) => {{
        if $raw == 0 {
            return Status::from(ErrorCode::InvalidHandle);
        }
        ManuallyDrop::new(unsafe { $kind::from_raw(RawHandle::from_raw($raw)) })
    }};
}

macro_rules! take_handle {
    ($kind:ident, $raw:expr) => {{
        if $raw == 0 {
            return Status::from(ErrorCode::InvalidHandle);
        }
        unsafe { $kind::from_raw(RawHandle::from_raw($raw)) }
    }};
}

macro_rules! require_out {
    ($out:expr) => {
        if $out.is_null() {
            return Status::from(ErrorCode::InvalidParameter);
        }
    };
}

pub unsafe fn mem_allocate<G: SyscallGate>(
    client: &SyscallClient<G>,
    size: usize,
    out_ptr: *mut *mut u8,
) -> Status {
    require_out!(out_ptr);
    let result = client
        .allocate_memory(size)
        .map(|region| region.into_raw_parts().0);
    unsafe { write_out(out_ptr, result) }
}

pub unsafe fn mem_release<G: SyscallGate>(
    client: &SyscallClient<G>,
    address: *mut u8,
    size: usize,
) -> Status {
    match unsafe { MappedRegion::from_raw_parts(address, size) } {
        Some(region) => Status::of(&client.release_memory(region)),
        None => Status::from(ErrorCode::InvalidAddress),
    }
}

pub unsafe fn mem_create_shared<G: SyscallGate>(
    client: &SyscallClient<G>,
    size: usize,
    out_handle: *mut u64,
) -> Status {
    require_out!(out_handle);
    let result = client
        .create_shared_memory(size)
        .map(|handle| handle.into_raw().as_raw());
    unsafe { write_out(out_handle, result) }
}

pub unsafe fn mem_map_shared<G: SyscallGate>(
    client: &SyscallClient<G>,
    handle: u64,
    offset: usize,
    size: usize,
    out_ptr: *mut *mut u8,
) -> Status {
    require_out!(out_ptr);
    let handle = borrow_handle!(SharedMemoryHandle, handle);
    let result = client
        .map_shared_memory(&handle, offset, size)
        .map(|region| region.into_raw_parts().0);
    unsafe { write_out(out_ptr, result) }
}

pub unsafe fn mem_unmap_shared<G: SyscallGate>(
    client: &SyscallClient<G>,
    address: *mut u8,
    size: usize,
) -> Status {
    match unsafe { MappedRegion::from_raw_parts(address, size) } {
        Some(region) => Status::of(&client.unmap_shared_memory(region)),
        None => Status::from(ErrorCode::InvalidAddress),
    }
}

pub unsafe fn task_spawn<G: SyscallGate>(
    client: &SyscallClient<G>,
    code_handle: u64,
    args: *const u8,
    args_len: usize,
    out_task_id: *mut u64,
) -> Status {
    require_out!(out_task_id);
    let Some(args) = (unsafe { input_bytes(args, args_len) }) else {
        return Status::from(ErrorCode::InvalidParameter);
    };
    let code = borrow_handle!(ResourceHandle, code_handle);
    let result = client.spawn_task(&code, args).map(|task| task.as_raw());
    unsafe { write_out(out_task_id, result) }
}

pub unsafe fn task_current_id<G: SyscallGate>(
    client: &SyscallClient<G>,
    out_task_id: *mut u64,
) -> Status {
    require_out!(out_task_id);
    let result = client.current_task_id().map(|task| task.as_raw());
    unsafe { write_out(out_task_id, result) }
}

/// Sleeps that do not fit the kernel clock are refused rather than shortened.
pub fn task_sleep<G: SyscallGate>(client: &SyscallClient<G>, milliseconds: u64) -> Status {
    match Duration::checked_from_millis(milliseconds) {
        Some(duration) => Status::of(&client.sleep(duration)),
        None => Status::from(ErrorCode::InvalidParameter),
    }
}

pub fn task_yield<G: SyscallGate>(client: &SyscallClient<G>) -> Status {
    Status::of(&client.yield_now())
}

/// `entry_point` must be the address of a function with the
/// [`ThreadEntry`] signature.
pub unsafe fn thread_create<G: SyscallGate>(
    client: &SyscallClient<G>,
    entry_point: u64,
    stack_size: usize,
    arg: u64,
    out_thread_id: *mut u64,
) -> Status {
    require_out!(out_thread_id);
    if entry_point == 0 {
        return Status::from(ErrorCode::InvalidParameter);
    }
    let entry: ThreadEntry =
        unsafe { core::mem::transmute(entry_point as usize as *const ()) };
    let result = client
        .create_thread(entry, stack_size, arg)
        .map(|thread| thread.as_raw());
    unsafe { write_out(out_thread_id, result) }
}

pub unsafe fn resource_acquire<G: SyscallGate>(
    client: &SyscallClient<G>,
    id: *const u8,
    id_len: usize,
    mode: u32,
    out_handle: *mut u64,
) -> Status {
    require_out!(out_handle);
    let Some(id) = (unsafe { input_bytes(id, id_len) }) else {
        return Status::from(ErrorCode::InvalidParameter);
    };
    let result = client
        .acquire_resource(id, ResourceMode::from_bits_retain(mode))
        .map(|handle| handle.into_raw().as_raw());
    unsafe { write_out(out_handle, result) }
}

pub unsafe fn resource_read<G: SyscallGate>(
    client: &SyscallClient<G>,
    handle: u64,
    buffer: *mut u8,
    buffer_len: usize,
    out_bytes_read: *mut usize,
) -> Status {
    require_out!(out_bytes_read);
    let Some(buffer) = (unsafe { output_bytes(buffer, buffer_len) }) else {
        return Status::from(ErrorCode::InvalidParameter);
    };
    let handle = borrow_handle!(ResourceHandle, handle);
    unsafe { write_out(out_bytes_read, client.read_resource(&handle, buffer)) }
}

/// `out_bytes_written` may be null for writers that ignore partial writes.
pub unsafe fn resource_write<G: SyscallGate>(
    client: &SyscallClient<G>,
    handle: u64,
    data: *const u8,
    data_len: usize,
    out_bytes_written: *mut usize,
) -> Status {
    let Some(data) = (unsafe { input_bytes(data, data_len) }) else {
        return Status::from(ErrorCode::InvalidParameter);
    };
    let handle = borrow_handle!(ResourceHandle, handle);
    let result = client.write_resource(&handle, data);
    if out_bytes_written.is_null() {
        return Status::of(&result);
    }
    unsafe { write_out(out_bytes_written, result) }
}

pub fn resource_release<G: SyscallGate>(client: &SyscallClient<G>, handle: u64) -> Status {
    let handle = take_handle!(ResourceHandle, handle);
    Status::of(&client.release_resource(handle))
}

pub unsafe fn resource_control<G: SyscallGate>(
    client: &SyscallClient<G>,
    handle: u64,
    request: u64,
    arg: u64,
    out_result: *mut i64,
) -> Status {
    require_out!(out_result);
    let handle = borrow_handle!(ResourceHandle, handle);
    let result = client
        .control_resource(&handle, request, arg)
        .map(|value| value as i64);
    unsafe { write_out(out_result, result) }
}

pub unsafe fn kernel_get_info<G: SyscallGate>(
    client: &SyscallClient<G>,
    info_type: u32,
    out_value: *mut u64,
) -> Status {
    require_out!(out_value);
    unsafe { write_out(out_value, client.kernel_info_raw(info_type)) }
}

pub unsafe fn kernel_get_time<G: SyscallGate>(
    client: &SyscallClient<G>,
    out_time: *mut u64,
) -> Status {
    require_out!(out_time);
    let result = client.system_time().map(|now| now.as_nanos());
    unsafe { write_out(out_time, result) }
}

pub unsafe fn sync_lock_create<G: SyscallGate>(
    client: &SyscallClient<G>,
    out_handle: *mut u64,
) -> Status {
    require_out!(out_handle);
    let result = client
        .create_lock()
        .map(|handle| handle.into_raw().as_raw());
    unsafe { write_out(out_handle, result) }
}

pub fn sync_lock_acquire<G: SyscallGate>(client: &SyscallClient<G>, handle: u64) -> Status {
    let lock = borrow_handle!(LockHandle, handle);
    Status::of(&client.acquire_lock(&lock))
}

pub fn sync_lock_release<G: SyscallGate>(client: &SyscallClient<G>, handle: u64) -> Status {
    let lock = borrow_handle!(LockHandle, handle);
    Status::of(&client.release_lock(&lock))
}

pub unsafe fn msg_send<G: SyscallGate>(
    client: &SyscallClient<G>,
    target_task: u64,
    message: *const u8,
    message_len: usize,
) -> Status {
    let Some(message) = (unsafe { input_bytes(message, message_len) }) else {
        return Status::from(ErrorCode::InvalidParameter);
    };
    Status::of(&client.send_message(TaskId::from_raw(target_task), message))
}

pub unsafe fn msg_receive<G: SyscallGate>(
    client: &SyscallClient<G>,
    buffer: *mut u8,
    buffer_len: usize,
    out_bytes_received: *mut usize,
) -> Status {
    require_out!(out_bytes_received);
    let Some(buffer) = (unsafe { output_bytes(buffer, buffer_len) }) else {
        return Status::from(ErrorCode::InvalidParameter);
    };
    unsafe { write_out(out_bytes_received, client.receive_message(buffer)) }
}
