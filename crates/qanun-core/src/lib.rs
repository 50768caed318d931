//! QANUN core primitives and shared types.

#![deny(unsafe_code)]

/// Version of the QANUN core library.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod canon;
pub mod facts;
pub mod ids;
pub mod report;
pub mod types;
