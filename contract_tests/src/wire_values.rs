//! Wire value contract tests
//!
//! Flag bits, info selectors and the serialized form of identifiers.
