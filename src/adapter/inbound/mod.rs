//! Inbound adapters: entry points that drive the connectivity core.

pub mod cli;
