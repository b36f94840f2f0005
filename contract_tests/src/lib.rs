//! # ABI Contract Tests
//!
//! This crate provides "golden" tests for the kernel boundary to ensure it
//! doesn't drift accidentally over time.
//!
//! ## Philosophy
//!
//! - **Explicit over implicit**: every ABI number is written out here again
//! - **Testability first**: contract tests fail when the boundary changes
//! - **Mechanism not policy**: pin what crosses the boundary, not how it is used
//!
//! ## Structure
//!
//! - [`syscall_table`]: syscall numbers and the argument word layout
//! - [`error_codes`]: kernel error indices and C status codes
//! - [`wire_values`]: mode bits, info selectors and serialized identifiers

pub mod error_codes;
pub mod syscall_table;
pub mod wire_values;

/// Common test helpers for contract validation
pub mod test_helpers {
    use kernel_api::abi::SyscallArgs;
    use kernel_api::SyscallGate;
    use std::cell::RefCell;
    use std::fmt::Debug;

    /// Gate that records every trap and answers with a fixed result
    pub struct RecordingGate {
        result: i64,
        calls: RefCell<Vec<(u64, SyscallArgs)>>,
    }

    impl RecordingGate {
        pub fn answering(result: i64) -> Self {
            Self {
                result,
                calls: RefCell::new(Vec::new()),
            }
        }

        /// The only trap recorded so far
        pub fn single_call(&self) -> (u64, SyscallArgs) {
            let calls = self.calls.borrow();
            assert_eq!(calls.len(), 1, "expected exactly one trap, got {:?}", calls);
            calls[0]
        }
    }

    impl SyscallGate for RecordingGate {
        unsafe fn invoke(&self, number: u64, args: SyscallArgs) -> i64 {
            self.calls.borrow_mut().push((number, args));
            self.result
        }

        fn halt(&self) -> ! {
            panic!("halted after terminal syscall");
        }
    }

    /// Fails with a contract message when a pinned value changed
    pub fn verify_stable<T: Debug + PartialEq>(what: &str, actual: T, expected: T) {
        assert_eq!(
            actual, expected,
            "{} changed (breaking ABI change): expected {:?}, got {:?}",
            what, expected, actual
        );
    }
}
