//! Resource access modes
//!
//! Modes are combined by the caller and passed to the kernel untouched. Bits
//! this crate does not name are retained, so newer kernels can define more.

use bitflags::bitflags;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

bitflags! {
    /// Access flags for `resource_acquire`
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ResourceMode: u32 {
        /// Request the ability to read
        const READ = 1 << 0;
        /// Request the ability to write
        const WRITE = 1 << 1;
        /// Create the resource if it does not exist
        const CREATE = 1 << 2;
        /// With `CREATE`: fail if the resource already exists
        const EXCLUSIVE = 1 << 3;
        /// Discard existing contents on acquire
        const TRUNCATE = 1 << 4;

        const _ = !0;
    }
}

impl ResourceMode {
    /// Read and write access
    pub const READ_WRITE: ResourceMode = ResourceMode::READ.union(ResourceMode::WRITE);

    /// Returns whether acquisition must create a fresh resource
    pub fn requires_new(&self) -> bool {
        self.contains(ResourceMode::CREATE | ResourceMode::EXCLUSIVE)
    }

    /// Returns whether this mode can change the resource's contents
    pub fn mutates(&self) -> bool {
        self.intersects(ResourceMode::WRITE | ResourceMode::CREATE | ResourceMode::TRUNCATE)
    }
}

// On the wire a mode is its bit word, never a list of flag names.
impl Serialize for ResourceMode {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.bits().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for ResourceMode {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        u32::deserialize(deserializer).map(ResourceMode::from_bits_retain)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mode_bits() {
        assert_eq!(ResourceMode::READ.bits(), 0b1);
        assert_eq!(ResourceMode::TRUNCATE.bits(), 0b1_0000);
        assert_eq!(ResourceMode::READ_WRITE.bits(), 0b11);
    }

    #[test]
    fn test_unknown_bits_retained() {
        let mode = ResourceMode::from_bits_retain(0x8000_0001);
        assert!(mode.contains(ResourceMode::READ));
        assert_eq!(mode.bits(), 0x8000_0001);
    }

    #[test]
    fn test_mode_serializes_as_bits() {
        let mode = ResourceMode::READ | ResourceMode::CREATE;
        assert_eq!(serde_json::to_string(&mode).unwrap(), "5");
        let back: ResourceMode = serde_json::from_str("5").unwrap();
        assert_eq!(back, mode);
    }

    #[test]
    fn test_requires_new() {
        assert!((ResourceMode::CREATE | ResourceMode::EXCLUSIVE).requires_new());
        assert!(!ResourceMode::CREATE.requires_new());
        assert!(!ResourceMode::EXCLUSIVE.requires_new());
    }

    #[test]
    fn test_mutates() {
        assert!(!ResourceMode::READ.mutates());
        assert!(ResourceMode::TRUNCATE.mutates());
        assert!((ResourceMode::READ | ResourceMode::CREATE).mutates());
    }
}
