//! Deterministic fault injection for testing
//!
//! Tests use a [`FaultPlan`] to make the simulated kernel misbehave in
//! controlled ways: force a syscall to return a chosen raw result, or
//! silently lose messages after a successful send.
//!
//! ## Design Philosophy
//!
//! - **Deterministic**: faults fire on exact call counts, never randomly
//! - **Composable**: several faults can be combined in one plan
//! - **Test-focused**: not intended for production use
//!
//! ## Example
//!
//! ```
//! use sim_kernel::fault_injection::{FaultPlan, MessageFault, SyscallFault};
//! use kernel_api::Syscall;
//!
//! let plan = FaultPlan::new()
//!     .with_syscall_fault(SyscallFault::new(Syscall::MemoryAllocate, -1, 2))
//!     .with_message_fault(MessageFault::DropNext { count: 1 });
//! ```

use core_types::TaskId;
use kernel_api::Syscall;
use std::collections::HashMap;

/// Forces the next `count` invocations of `syscall` to return `raw_result`
/// without reaching the handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyscallFault {
    pub syscall: Syscall,
    pub raw_result: i64,
    pub count: usize,
}

impl SyscallFault {
    pub fn new(syscall: Syscall, raw_result: i64, count: usize) -> Self {
        Self {
            syscall,
            raw_result,
            count,
        }
    }
}

/// A fault applied to accepted messages
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageFault {
    /// Drop the next N messages to any task
    DropNext { count: usize },

    /// Drop the next N messages addressed to one task
    DropNextTo { target: TaskId, count: usize },
}

/// A plan describing all faults to inject
#[derive(Debug, Clone, Default)]
pub struct FaultPlan {
    syscall_faults: Vec<SyscallFault>,
    message_faults: Vec<MessageFault>,
}

impl FaultPlan {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_syscall_fault(mut self, fault: SyscallFault) -> Self {
        self.syscall_faults.push(fault);
        self
    }

    pub fn with_message_fault(mut self, fault: MessageFault) -> Self {
        self.message_faults.push(fault);
        self
    }

    pub fn syscall_faults(&self) -> &[SyscallFault] {
        &self.syscall_faults
    }

    pub fn message_faults(&self) -> &[MessageFault] {
        &self.message_faults
    }

    pub fn is_empty(&self) -> bool {
        self.syscall_faults.is_empty() && self.message_faults.is_empty()
    }
}

/// Tracks how much of a [`FaultPlan`] is left to fire.
#[derive(Debug, Default)]
pub struct FaultInjector {
    // Faults for one syscall fire in plan order.
    syscall_faults: HashMap<Syscall, Vec<(i64, usize)>>,
    drop_next_count: usize,
    drop_next_to: HashMap<TaskId, usize>,
}

impl FaultInjector {
    pub fn new(plan: FaultPlan) -> Self {
        let mut injector = Self::default();

        for fault in plan.syscall_faults() {
            if fault.count > 0 {
                injector
                    .syscall_faults
                    .entry(fault.syscall)
                    .or_default()
                    .push((fault.raw_result, fault.count));
            }
        }

        for fault in plan.message_faults() {
            match *fault {
                MessageFault::DropNext { count } => {
                    injector.drop_next_count += count;
                }
                MessageFault::DropNextTo { target, count } => {
                    *injector.drop_next_to.entry(target).or_default() += count;
                }
            }
        }

        injector
    }

    /// Returns the forced raw result for this invocation, if any.
    pub fn syscall_override(&mut self, syscall: Syscall) -> Option<i64> {
        let pending = self.syscall_faults.get_mut(&syscall)?;
        let (raw_result, remaining) = pending.first_mut()?;
        let raw_result = *raw_result;
        *remaining -= 1;
        if *remaining == 0 {
            pending.remove(0);
        }
        Some(raw_result)
    }

    /// Checks if an accepted message should be lost instead of queued.
    pub fn should_drop_message(&mut self, target: TaskId) -> bool {
        if self.drop_next_count > 0 {
            self.drop_next_count -= 1;
            return true;
        }

        if let Some(count) = self.drop_next_to.get_mut(&target) {
            if *count > 0 {
                *count -= 1;
                return true;
            }
        }

        false
    }

    /// Whether any fault is still waiting to fire.
    pub fn is_exhausted(&self) -> bool {
        self.drop_next_count == 0
            && self.drop_next_to.values().all(|count| *count == 0)
            && self.syscall_faults.values().all(Vec::is_empty)
    }
}
