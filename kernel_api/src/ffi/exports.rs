//! `extern "C"` entry points for programs written in other languages.
//!
//! Each export forwards to its body in [`super::calls`] over the hardware
//! trap gate.

use super::calls;
use super::Status;
use crate::client::SyscallClient;
use crate::gate::TrapGate;

static CLIENT: SyscallClient<TrapGate> = SyscallClient::new(TrapGate);

#[no_mangle]
pub unsafe extern "C" fn sahne_mem_allocate(size: usize, out_ptr: *mut *mut u8) -> Status {
    unsafe { calls::mem_allocate(&CLIENT, size, out_ptr) }
}

#[no_mangle]
pub unsafe extern "C" fn sahne_mem_release(address: *mut u8, size: usize) -> Status {
    unsafe { calls::mem_release(&CLIENT, address, size) }
}

#[no_mangle]
pub unsafe extern "C" fn sahne_mem_create_shared(size: usize, out_handle: *mut u64) -> Status {
    unsafe { calls::mem_create_shared(&CLIENT, size, out_handle) }
}

#[no_mangle]
pub unsafe extern "C" fn sahne_mem_map_shared(
    handle: u64,
    offset: usize,
    size: usize,
    out_ptr: *mut *mut u8,
) -> Status {
    unsafe { calls::mem_map_shared(&CLIENT, handle, offset, size, out_ptr) }
}

#[no_mangle]
pub unsafe extern "C" fn sahne_mem_unmap_shared(address: *mut u8, size: usize) -> Status {
    unsafe { calls::mem_unmap_shared(&CLIENT, address, size) }
}

#[no_mangle]
pub unsafe extern "C" fn sahne_task_spawn(
    code_handle: u64,
    args: *const u8,
    args_len: usize,
    out_task_id: *mut u64,
) -> Status {
    unsafe { calls::task_spawn(&CLIENT, code_handle, args, args_len, out_task_id) }
}

#[no_mangle]
pub extern "C" fn sahne_task_exit(code: i32) -> ! {
    CLIENT.exit_task(code)
}

#[no_mangle]
pub unsafe extern "C" fn sahne_task_current_id(out_task_id: *mut u64) -> Status {
    unsafe { calls::task_current_id(&CLIENT, out_task_id) }
}

#[no_mangle]
pub extern "C" fn sahne_task_sleep(milliseconds: u64) -> Status {
    calls::task_sleep(&CLIENT, milliseconds)
}

#[no_mangle]
pub extern "C" fn sahne_task_yield() -> Status {
    calls::task_yield(&CLIENT)
}

#[no_mangle]
pub unsafe extern "C" fn sahne_thread_create(
    entry_point: u64,
    stack_size: usize,
    arg: u64,
    out_thread_id: *mut u64,
) -> Status {
    unsafe { calls::thread_create(&CLIENT, entry_point, stack_size, arg, out_thread_id) }
}

#[no_mangle]
pub extern "C" fn sahne_thread_exit(code: i32) -> ! {
    CLIENT.exit_thread(code)
}

#[no_mangle]
pub unsafe extern "C" fn sahne_resource_acquire(
    id: *const u8,
    id_len: usize,
    mode: u32,
    out_handle: *mut u64,
) -> Status {
    unsafe { calls::resource_acquire(&CLIENT, id, id_len, mode, out_handle) }
}

#[no_mangle]
pub unsafe extern "C" fn sahne_resource_read(
    handle: u64,
    buffer: *mut u8,
    buffer_len: usize,
    out_bytes_read: *mut usize,
) -> Status {
    unsafe { calls::resource_read(&CLIENT, handle, buffer, buffer_len, out_bytes_read) }
}

#[no_mangle]
pub unsafe extern "C" fn sahne_resource_write(
    handle: u64,
    data: *const u8,
    data_len: usize,
    out_bytes_written: *mut usize,
) -> Status {
    unsafe { calls::resource_write(&CLIENT, handle, data, data_len, out_bytes_written) }
}

#[no_mangle]
pub extern "C" fn sahne_resource_release(handle: u64) -> Status {
    calls::resource_release(&CLIENT, handle)
}

#[no_mangle]
pub unsafe extern "C" fn sahne_resource_control(
    handle: u64,
    request: u64,
    arg: u64,
    out_result: *mut i64,
) -> Status {
    unsafe { calls::resource_control(&CLIENT, handle, request, arg, out_result) }
}

#[no_mangle]
pub unsafe extern "C" fn sahne_kernel_get_info(info_type: u32, out_value: *mut u64) -> Status {
    unsafe { calls::kernel_get_info(&CLIENT, info_type, out_value) }
}

#[no_mangle]
pub unsafe extern "C" fn sahne_kernel_get_time(out_time: *mut u64) -> Status {
    unsafe { calls::kernel_get_time(&CLIENT, out_time) }
}

#[no_mangle]
pub unsafe extern "C" fn sahne_sync_lock_create(out_handle: *mut u64) -> Status {
    unsafe { calls::sync_lock_create(&CLIENT, out_handle) }
}

#[no_mangle]
pub extern "C" fn sahne_sync_lock_acquire(handle: u64) -> Status {
    calls::sync_lock_acquire(&CLIENT, handle)
}

#[no_mangle]
pub extern "C" fn sahne_sync_lock_release(handle: u64) -> Status {
    calls::sync_lock_release(&CLIENT, handle)
}

#[no_mangle]
pub unsafe extern "C" fn sahne_msg_send(
    target_task: u64,
    message: *const u8,
    message_len: usize,
) -> Status {
    unsafe { calls::msg_send(&CLIENT, target_task, message, message_len) }
}

#[no_mangle]
pub unsafe extern "C" fn sahne_msg_receive(
    buffer: *mut u8,
    buffer_len: usize,
    out_bytes_received: *mut usize,
) -> Status {
    unsafe { calls::msg_receive(&CLIENT, buffer, buffer_len, out_bytes_received) }
}

#[no_mangle]
pub extern "C" fn sahne_raw_result_status(raw: i64) -> Status {
    Status::from_raw_result(raw)
}
