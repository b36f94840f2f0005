//! Simulated kernel configuration
//!
//! Limits and identity the simulated kernel reports. Defaults match a small
//! development machine; tests tighten individual limits to reach error paths.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors loading a [`SimConfig`]
#[derive(Debug, Error)]
pub enum SimConfigError {
    #[error("Malformed configuration: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Version reported through `GET_KERNEL_INFO`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct KernelVersion {
    pub major: u64,
    pub minor: u64,
}

/// Tunable limits for a [`crate::SimulatedKernel`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    /// Live handles a single task may hold
    pub max_handles_per_task: usize,
    /// Undelivered messages per task inbox
    pub inbox_capacity: usize,
    /// Largest message payload in bytes
    pub max_message_len: usize,
    /// Bytes of private and shared memory across all tasks
    pub memory_limit: usize,
    /// Longest resource identifier in bytes
    pub max_resource_id_len: usize,
    /// Identifier prefixes that refuse Write, Create and Truncate
    pub read_only_prefixes: Vec<String>,
    pub kernel_version: KernelVersion,
    pub build_id: u64,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            max_handles_per_task: 64,
            inbox_capacity: 64,
            max_message_len: 4096,
            memory_limit: 64 * 1024 * 1024,
            max_resource_id_len: 255,
            read_only_prefixes: Vec::new(),
            kernel_version: KernelVersion { major: 0, minor: 1 },
            build_id: 1,
        }
    }
}

impl SimConfig {
    /// Parses a configuration from JSON. Missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self, SimConfigError> {
        let config: SimConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), SimConfigError> {
        if self.max_handles_per_task == 0 {
            return Err(SimConfigError::Invalid(
                "max_handles_per_task must be at least 1".to_string(),
            ));
        }
        if self.inbox_capacity == 0 {
            return Err(SimConfigError::Invalid(
                "inbox_capacity must be at least 1".to_string(),
            ));
        }
        if self.max_resource_id_len == 0 {
            return Err(SimConfigError::Invalid(
                "max_resource_id_len must be at least 1".to_string(),
            ));
        }
        // Reported values share the syscall result word with error codes.
        let reported = [
            ("kernel_version.major", self.kernel_version.major),
            ("kernel_version.minor", self.kernel_version.minor),
            ("build_id", self.build_id),
        ];
        for (field, value) in reported {
            if i64::try_from(value).is_err() {
                return Err(SimConfigError::Invalid(format!(
                    "{} must not exceed {}",
                    field,
                    i64::MAX
                )));
            }
        }
        Ok(())
    }

    pub fn with_max_handles_per_task(mut self, max: usize) -> Self {
        self.max_handles_per_task = max;
        self
    }

    pub fn with_inbox_capacity(mut self, capacity: usize) -> Self {
        self.inbox_capacity = capacity;
        self
    }

    pub fn with_max_message_len(mut self, len: usize) -> Self {
        self.max_message_len = len;
        self
    }

    pub fn with_memory_limit(mut self, bytes: usize) -> Self {
        self.memory_limit = bytes;
        self
    }

    pub fn with_read_only_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.read_only_prefixes.push(prefix.into());
        self
    }

    pub(crate) fn is_read_only(&self, id: &[u8]) -> bool {
        self.read_only_prefixes
            .iter()
            .any(|prefix| id.starts_with(prefix.as_bytes()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = SimConfig::default();
        assert_eq!(config.max_handles_per_task, 64);
        assert_eq!(config.inbox_capacity, 64);
        assert_eq!(config.max_message_len, 4096);
        assert_eq!(config.memory_limit, 64 * 1024 * 1024);
        assert_eq!(config.max_resource_id_len, 255);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_from_json_partial() {
        let config = SimConfig::from_json(
            r#"{ "inbox_capacity": 2, "read_only_prefixes": ["sys/"], "build_id": 42 }"#,
        )
        .unwrap();
        assert_eq!(config.inbox_capacity, 2);
        assert_eq!(config.build_id, 42);
        assert_eq!(config.max_message_len, 4096);
        assert!(config.is_read_only(b"sys/clock"));
        assert!(!config.is_read_only(b"home/sys/"));
    }

    #[test]
    fn test_from_json_rejects_garbage() {
        assert!(matches!(
            SimConfig::from_json("{ not json"),
            Err(SimConfigError::Malformed(_))
        ));
    }

    #[test]
    fn test_from_json_rejects_zero_limits() {
        assert!(matches!(
            SimConfig::from_json(r#"{ "max_handles_per_task": 0 }"#),
            Err(SimConfigError::Invalid(_))
        ));
    }

    #[test]
    fn test_from_json_rejects_unreportable_values() {
        assert!(SimConfig::from_json(&format!(r#"{{ "build_id": {} }}"#, i64::MAX)).is_ok());
        assert!(matches!(
            SimConfig::from_json(&format!(r#"{{ "build_id": {} }}"#, u64::MAX)),
            Err(SimConfigError::Invalid(_))
        ));
        assert!(matches!(
            SimConfig::from_json(&format!(
                r#"{{ "kernel_version": {{ "major": {}, "minor": 0 }} }}"#,
                i64::MAX as u64 + 1
            )),
            Err(SimConfigError::Invalid(_))
        ));
    }

    #[test]
    fn test_builder() {
        let config = SimConfig::default()
            .with_max_handles_per_task(2)
            .with_memory_limit(4096)
            .with_read_only_prefix("rom/");
        assert_eq!(config.max_handles_per_task, 2);
        assert_eq!(config.memory_limit, 4096);
        assert!(config.is_read_only(b"rom/boot"));
    }
}
