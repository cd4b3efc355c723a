//! Driving adapters.

pub mod inbound;
