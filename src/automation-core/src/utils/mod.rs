//! Shared utilities for the engine.

pub mod bytes;
pub mod crypto;
