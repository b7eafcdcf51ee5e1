//! Entities, value objects and the ports the engine needs from the outside.

pub mod account;
pub mod loan;
pub mod ports;
pub mod transaction;
