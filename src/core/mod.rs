//! Core business logic
//!
//! The transfer pipeline lives here; everything it talks to (REDCap,
//! configuration, logging) is an adapter or an ambient concern.

pub mod transfer;
