//! Concurrency primitives for the data engine
//!
//! This crate provides:
//! - ConcurrencyGuard: one process-wide read/write lock with scoped access
//! - SingleFlight: at most one concurrent computation per key, result shared
//! - InitGate: one-time initialization shared by every early caller

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod guard;
pub mod init_gate;
pub mod single_flight;

pub use guard::{ConcurrencyGuard, GuardStats};
pub use init_gate::InitGate;
pub use single_flight::SingleFlight;
