//! Error code contract tests
//!
//! The kernel reports errors as negated indices; other languages see the
//! same indices as positive status codes.

#[cfg(test)]
mod tests {
    use crate::test_helpers::*;
    use kernel_api::{decode, encode, ErrorCode, Status};

    const GOLDEN: [(ErrorCode, i64); 16] = [
        (ErrorCode::OutOfMemory, 1),
        (ErrorCode::InvalidAddress, 2),
        (ErrorCode::InvalidParameter, 3),
        (ErrorCode::ResourceNotFound, 4),
        (ErrorCode::PermissionDenied, 5),
        (ErrorCode::ResourceBusy, 6),
        (ErrorCode::Interrupted, 7),
        (ErrorCode::NoMessage, 8),
        (ErrorCode::InvalidOperation, 9),
        (ErrorCode::NotSupported, 10),
        (ErrorCode::UnknownSyscall, 11),
        (ErrorCode::TaskCreationFailed, 12),
        (ErrorCode::InvalidHandle, 13),
        (ErrorCode::HandleLimitExceeded, 14),
        (ErrorCode::NamingError, 15),
        (ErrorCode::CommunicationError, 16),
    ];

    #[test]
    fn test_kernel_error_indices() {
        for (error, index) in GOLDEN {
            verify_stable("decoded error", decode(-index), Err(error));
            verify_stable("raw error", error.to_raw(), -index);
        }
    }

    #[test]
    fn test_c_status_codes() {
        verify_stable("SAHNE_SUCCESS", Status::SUCCESS.code(), 0);
        verify_stable("SAHNE_ERROR_OTHER", Status::OTHER.code(), 255);
        for (error, index) in GOLDEN {
            verify_stable("status code", i64::from(Status::from(error).code()), index);
        }
    }

    #[test]
    fn test_unknown_indices_stay_unknown() {
        for raw in [-17, -255, -4096, i64::MIN] {
            let error = decode(raw).unwrap_err();
            verify_stable("unknown error", error, ErrorCode::Unknown(raw));
            verify_stable("unknown status", Status::from(error), Status::OTHER);
        }
    }

    #[test]
    fn test_aliasing_unknown_uses_sentinel() {
        verify_stable("unknown sentinel", ErrorCode::UNKNOWN_RAW, i64::MIN);
        for raw in [-3, -13, 0, 42] {
            verify_stable(
                "aliasing unknown",
                encode(Err(ErrorCode::Unknown(raw))),
                ErrorCode::UNKNOWN_RAW,
            );
        }
    }

    #[test]
    fn test_success_never_collides_with_errors() {
        verify_stable("zero result", decode(0), Ok(0));
        for (error, _) in GOLDEN {
            assert_ne!(Status::from(error), Status::SUCCESS);
        }
    }
}
