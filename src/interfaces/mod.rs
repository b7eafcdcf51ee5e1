//! Adapters between the engine and its callers.

pub mod command;
pub mod csv;
pub mod identity;
