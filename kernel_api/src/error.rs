//! Kernel error types and the result decoder

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors reported by the kernel, or detected locally before trapping
///
/// The named kinds form a closed set; each has a fixed index (1..=16) that the
/// kernel returns negated. A negative result outside that range becomes
/// [`ErrorCode::Unknown`], never one of the named kinds. An `Unknown` whose
/// payload would read back as success or as a named kind is encoded as
/// [`ErrorCode::UNKNOWN_RAW`] instead, and is refused when deserialized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Error, Serialize, Deserialize)]
pub enum ErrorCode {
    #[error("Out of memory")]
    OutOfMemory,

    #[error("Invalid address")]
    InvalidAddress,

    #[error("Invalid parameter")]
    InvalidParameter,

    #[error("Resource not found")]
    ResourceNotFound,

    #[error("Permission denied")]
    PermissionDenied,

    #[error("Resource busy")]
    ResourceBusy,

    /// A blocking call was cut short. Safe to retry.
    #[error("Interrupted")]
    Interrupted,

    /// Non-blocking receive found an empty inbox
    #[error("No message available")]
    NoMessage,

    #[error("Invalid operation")]
    InvalidOperation,

    #[error("Not supported")]
    NotSupported,

    #[error("Unknown system call")]
    UnknownSyscall,

    #[error("Task creation failed")]
    TaskCreationFailed,

    /// The handle was never acquired or has been released
    #[error("Invalid handle")]
    InvalidHandle,

    #[error("Handle limit exceeded")]
    HandleLimitExceeded,

    #[error("Naming error")]
    NamingError,

    #[error("Communication error")]
    CommunicationError,

    /// The kernel returned an error index this interface does not know
    #[error("Unknown kernel error (raw result {0})")]
    Unknown(#[serde(deserialize_with = "unrecognized_raw")] i64),
}

fn unrecognized_raw<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let raw = i64::deserialize(deserializer)?;
    if ErrorCode::is_unrecognized(raw) {
        Ok(raw)
    } else {
        Err(serde::de::Error::custom(
            "unknown error payload must be a negative raw result outside the known table",
        ))
    }
}

impl ErrorCode {
    /// The named kinds, ordered by kernel index starting at 1
    pub const KNOWN: [ErrorCode; 16] = [
        ErrorCode::OutOfMemory,
        ErrorCode::InvalidAddress,
        ErrorCode::InvalidParameter,
        ErrorCode::ResourceNotFound,
        ErrorCode::PermissionDenied,
        ErrorCode::ResourceBusy,
        ErrorCode::Interrupted,
        ErrorCode::NoMessage,
        ErrorCode::InvalidOperation,
        ErrorCode::NotSupported,
        ErrorCode::UnknownSyscall,
        ErrorCode::TaskCreationFailed,
        ErrorCode::InvalidHandle,
        ErrorCode::HandleLimitExceeded,
        ErrorCode::NamingError,
        ErrorCode::CommunicationError,
    ];

    /// Kernel index of a named kind; `None` for [`ErrorCode::Unknown`].
    pub fn index(&self) -> Option<u64> {
        Self::KNOWN
            .iter()
            .position(|known| known == self)
            .map(|position| position as u64 + 1)
    }

    /// Looks up a named kind by kernel index.
    pub fn from_index(index: u64) -> Option<Self> {
        let position = usize::try_from(index.checked_sub(1)?).ok()?;
        Self::KNOWN.get(position).copied()
    }

    /// Raw result standing for an `Unknown` error with no usable payload
    pub const UNKNOWN_RAW: i64 = i64::MIN;

    /// Whether `raw` is an error result that names none of the known kinds.
    pub fn is_unrecognized(raw: i64) -> bool {
        raw < 0 && Self::from_index(raw.unsigned_abs()).is_none()
    }

    /// Interprets a negative raw syscall result.
    ///
    /// Non-negative input is not an error and yields
    /// `Unknown(UNKNOWN_RAW)` so that callers misusing this never observe a
    /// named kind.
    pub fn from_raw(raw: i64) -> Self {
        if raw >= 0 {
            return ErrorCode::Unknown(Self::UNKNOWN_RAW);
        }
        Self::from_index(raw.unsigned_abs()).unwrap_or(ErrorCode::Unknown(raw))
    }

    /// The raw result a kernel returns to report this error.
    ///
    /// Always negative, and never a named kind's result for `Unknown`.
    pub fn to_raw(&self) -> i64 {
        match self {
            ErrorCode::Unknown(raw) if Self::is_unrecognized(*raw) => *raw,
            ErrorCode::Unknown(_) => Self::UNKNOWN_RAW,
            known => -(known.index().unwrap_or(0) as i64),
        }
    }

    /// Whether this came from an index outside the known table
    pub fn is_unknown(&self) -> bool {
        matches!(self, ErrorCode::Unknown(_))
    }
}

/// Result of a typed syscall
pub type SyscallResult<T> = Result<T, ErrorCode>;

/// Replaces the kernel's sign convention with an explicit result.
///
/// Non-negative values are success payloads (handles, addresses, byte counts,
/// ids); negative values are errors.
pub fn decode(raw: i64) -> SyscallResult<u64> {
    if raw >= 0 {
        Ok(raw as u64)
    } else {
        Err(ErrorCode::from_raw(raw))
    }
}

/// Checks that a success payload survives the sign convention.
///
/// Values above `i64::MAX` would read back as errors, so a kernel reports
/// `InvalidParameter` for them instead.
pub fn representable(value: u64) -> SyscallResult<u64> {
    if i64::try_from(value).is_ok() {
        Ok(value)
    } else {
        Err(ErrorCode::InvalidParameter)
    }
}

/// Inverse of [`decode`], for kernel implementations.
pub fn encode(result: SyscallResult<u64>) -> i64 {
    match result.and_then(representable) {
        Ok(value) => value as i64,
        Err(error) => error.to_raw(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_success_payload() {
        assert_eq!(decode(0), Ok(0));
        assert_eq!(decode(4096), Ok(4096));
        assert_eq!(decode(i64::MAX), Ok(i64::MAX as u64));
    }

    #[test]
    fn test_decode_named_errors() {
        assert_eq!(decode(-1), Err(ErrorCode::OutOfMemory));
        assert_eq!(decode(-10), Err(ErrorCode::NotSupported));
        assert_eq!(decode(-13), Err(ErrorCode::InvalidHandle));
        assert_eq!(decode(-16), Err(ErrorCode::CommunicationError));
    }

    #[test]
    fn test_out_of_range_is_distinct() {
        for raw in [-17, -100, -4096, i64::MIN] {
            let error = decode(raw).unwrap_err();
            assert_eq!(error, ErrorCode::Unknown(raw));
            assert!(!ErrorCode::KNOWN.contains(&error));
            assert_ne!(error, ErrorCode::NotSupported);
            assert_ne!(error, ErrorCode::UnknownSyscall);
        }
    }

    #[test]
    fn test_raw_round_trip_for_named_kinds() {
        for (position, code) in ErrorCode::KNOWN.iter().enumerate() {
            assert_eq!(code.index(), Some(position as u64 + 1));
            assert_eq!(ErrorCode::from_raw(code.to_raw()), *code);
        }
    }

    #[test]
    fn test_unknown_keeps_raw_value() {
        let error = ErrorCode::from_raw(-77);
        assert!(error.is_unknown());
        assert_eq!(error.index(), None);
        assert_eq!(error.to_raw(), -77);
    }

    #[test]
    fn test_from_index_bounds() {
        assert_eq!(ErrorCode::from_index(0), None);
        assert_eq!(ErrorCode::from_index(1), Some(ErrorCode::OutOfMemory));
        assert_eq!(ErrorCode::from_index(17), None);
        assert_eq!(ErrorCode::from_index(u64::MAX), None);
    }

    #[test]
    fn test_encode() {
        assert_eq!(encode(Ok(12)), 12);
        assert_eq!(encode(Err(ErrorCode::ResourceBusy)), -6);
        assert_eq!(encode(Err(ErrorCode::Unknown(-99))), -99);
    }

    #[test]
    fn test_unknown_never_encodes_as_named_kind() {
        for raw in [-1, -3, -13, -16, 0, 5, i64::MAX] {
            let encoded = encode(Err(ErrorCode::Unknown(raw)));
            assert_eq!(encoded, ErrorCode::UNKNOWN_RAW);
            assert_eq!(
                decode(encoded),
                Err(ErrorCode::Unknown(ErrorCode::UNKNOWN_RAW))
            );
        }
        for raw in [-17, -500, i64::MIN] {
            assert_eq!(decode(encode(Err(ErrorCode::Unknown(raw)))), Err(ErrorCode::Unknown(raw)));
        }
    }

    #[test]
    fn test_from_raw_of_success_is_unknown() {
        assert_eq!(ErrorCode::from_raw(0), ErrorCode::Unknown(ErrorCode::UNKNOWN_RAW));
        assert_eq!(ErrorCode::from_raw(3), ErrorCode::Unknown(ErrorCode::UNKNOWN_RAW));
    }

    #[test]
    fn test_unknown_json_rejects_named_payload() {
        assert!(serde_json::from_str::<ErrorCode>(r#"{"Unknown":-13}"#).is_err());
        assert!(serde_json::from_str::<ErrorCode>(r#"{"Unknown":4}"#).is_err());
        let error: ErrorCode = serde_json::from_str(r#"{"Unknown":-40}"#).unwrap();
        assert_eq!(error, ErrorCode::Unknown(-40));
        let named: ErrorCode = serde_json::from_str(r#""InvalidHandle""#).unwrap();
        assert_eq!(named, ErrorCode::InvalidHandle);
    }

    #[test]
    fn test_encode_rejects_unrepresentable_payload() {
        assert_eq!(encode(Ok(i64::MAX as u64)), i64::MAX);
        assert_eq!(encode(Ok(i64::MAX as u64 + 1)), -3);
        assert_eq!(encode(Ok(u64::MAX)), ErrorCode::InvalidParameter.to_raw());
        assert_eq!(representable(u64::MAX), Err(ErrorCode::InvalidParameter));
    }

    #[test]
    fn test_error_display() {
        assert_eq!(ErrorCode::InvalidHandle.to_string(), "Invalid handle");
        assert_eq!(
            ErrorCode::Unknown(-40).to_string(),
            "Unknown kernel error (raw result -40)"
        );
    }
}
