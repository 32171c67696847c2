//! CLI command implementations.
//!
//! - [`init`] - Configuration initialization
//! - [`simulate`] - Scripted viewer run against the simulated engine

pub mod init;
pub mod simulate;
