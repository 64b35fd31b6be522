//! External integrations
//!
//! Adapters wrap outside systems behind traits the core depends on.

pub mod redcap;
