//! Infrastructure layer.
//!
//! Provides the technical machinery behind the gateway's cloud link:
//! configuration, per-identity connections, and link-health tracking.
//!
//! # Submodules
//!
//! - [`cloud`] - Identity connections, token refresh, and connectivity probing
//! - [`config`] - Configuration loading and validation
//! - [`monitoring`] - In-memory offline metrics

pub mod cloud;
pub mod config;
pub mod monitoring;
