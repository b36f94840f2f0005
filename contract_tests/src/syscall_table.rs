//! Syscall table contract tests
//!
//! Numbers and argument positions are shared with kernels built separately;
//! renumbering anything here breaks every deployed binary.
