//! Measurement statistics
//!
//! In-memory history and running per-channel statistics ([`store`]).

pub mod store;
