//! C boundary
//!
//! Other languages see every operation as a function returning a 32-bit
//! status and writing results through out-pointers. Success is 0, each named
//! [`ErrorCode`] keeps its kernel index (1..=16), and anything the kernel
//! reported outside that table is [`Status::OTHER`].
//!
//! The bodies of the exports live in [`calls`], generic over the gate. The
//! `extern "C"` symbols themselves only exist on bare-metal targets, where
//! they go through [`crate::gate::TrapGate`].

use serde::{Deserialize, Serialize};

use crate::error::{decode, ErrorCode, SyscallResult};

pub mod calls;

cfg_if::cfg_if! {
    if #[cfg(target_os = "none")] {
        mod exports;
        pub use exports::*;
    }
}

/// Status code returned across the C boundary (`sahne_error_t`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
#[repr(transparent)]
pub struct Status(i32);

impl Status {
    pub const SUCCESS: Status = Status(0);
    /// An error the kernel reported with an index outside the known table
    pub const OTHER: Status = Status(255);

    pub const fn code(self) -> i32 {
        self.0
    }

    pub const fn is_success(self) -> bool {
        self.0 == Self::SUCCESS.0
    }

    /// The error a non-success status stands for.
    ///
    /// A status has no raw kernel result behind it, so `OTHER` and every code
    /// outside the table (negative ones included) map to
    /// `Unknown(ErrorCode::UNKNOWN_RAW)`.
    pub fn error(self) -> Option<ErrorCode> {
        if self.is_success() {
            return None;
        }
        let named = u64::try_from(self.0).ok().and_then(ErrorCode::from_index);
        Some(named.unwrap_or(ErrorCode::Unknown(ErrorCode::UNKNOWN_RAW)))
    }

    pub fn of<T>(result: &SyscallResult<T>) -> Status {
        match result {
            Ok(_) => Status::SUCCESS,
            Err(error) => Status::from(*error),
        }
    }

    /// Status of a raw gate result, without going through a typed call.
    pub fn from_raw_result(raw: i64) -> Status {
        Status::of(&decode(raw))
    }
}

impl From<ErrorCode> for Status {
    fn from(error: ErrorCode) -> Self {
        match error.index() {
            Some(index) => Status(index as i32),
            None => Status::OTHER,
        }
    }
}
