//! # Core Types
//!
//! This crate defines the values that cross the Sahne kernel boundary.
//!
//! ## Philosophy
//!
//! Every type here is plain data with a fixed 64-bit (or 32-bit) wire
//! representation:
//! - **Opaque**: identifiers carry no client-side state
//! - **Kernel-assigned**: nothing in user space invents a task, thread or handle
//! - **Forwarded unmodified**: flag words keep unknown bits
//!
//! ## Key Types
//!
//! - [`TaskId`]: Identifier for a schedulable task
//! - [`ThreadId`]: Identifier for a thread within a task
//! - [`RawHandle`]: The bare 64-bit value behind every capability handle
//! - [`ResourceMode`]: Access flags for resource acquisition
//! - [`KernelInfo`]: Selector for kernel information queries

#![cfg_attr(not(test), no_std)]

pub mod ids;
pub mod kernel_info;
pub mod resource_mode;

pub use ids::{RawHandle, TaskId, ThreadId};
pub use kernel_info::{Architecture, KernelInfo};
pub use resource_mode::ResourceMode;
