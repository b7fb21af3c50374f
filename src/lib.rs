// ABOUTME: Library root for bluegreen - exposes public types for testing.
// ABOUTME: The main binary is in main.rs.

pub mod config;
pub mod context;
pub mod deploy;
pub mod diagnostics;
pub mod error;
pub mod hooks;
pub mod notify;
pub mod output;
pub mod platform;
pub mod types;
