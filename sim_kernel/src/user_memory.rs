//! Access to buffers passed by address.
//!
//! The simulated kernel shares one address space with its tasks, so a
//! pointer word is used directly. Callers of the raw gate promise the
//! memory is valid; these helpers only reject null and overflowing words.

use kernel_api::ErrorCode;

use crate::state::KernelResult;

pub(crate) fn size_word(word: u64) -> KernelResult<usize> {
    usize::try_from(word).map_err(|_| ErrorCode::InvalidParameter)
}

/// Checks an `(address, len)` pair without touching memory.
pub(crate) fn check_buffer(address: u64, len: u64) -> KernelResult<usize> {
    let len = size_word(len)?;
    if len > 0 && address == 0 {
        return Err(ErrorCode::InvalidAddress);
    }
    let start = usize::try_from(address).map_err(|_| ErrorCode::InvalidAddress)?;
    start
        .checked_add(len)
        .ok_or(ErrorCode::InvalidAddress)?;
    Ok(len)
}

/// # Safety
///
/// `address` must be valid for reads of `len` bytes for `'a`.
pub(crate) unsafe fn user_bytes<'a>(address: u64, len: u64) -> KernelResult<&'a [u8]> {
    let len = check_buffer(address, len)?;
    if len == 0 {
        return Ok(&[]);
    }
    Ok(unsafe { std::slice::from_raw_parts(address as usize as *const u8, len) })
}

/// # Safety
///
/// `address` must be valid for writes of `data.len()` bytes.
pub(crate) unsafe fn copy_to_user(address: u64, data: &[u8]) -> KernelResult<()> {
    check_buffer(address, data.len() as u64)?;
    if !data.is_empty() {
        unsafe {
            std::ptr::copy_nonoverlapping(data.as_ptr(), address as usize as *mut u8, data.len())
        };
    }
    Ok(())
}
