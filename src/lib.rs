//! DrishtiLink - vision coprocessor link for a competition robot
//!
//! The coprocessor scores camera frames for the field target and serves the
//! latest observation to the robot controller:
//!
//! - **UDP (port 5800)**: broadcast discovery, periodic announce plus a
//!   request/reply handshake identifying peer roles
//! - **TCP (port 5801)**: goal-report request/reply, one connection per
//!   client

pub mod config;
pub mod error;
pub mod net;
pub mod protocol;
pub mod server;
pub mod service;
pub mod vision;

// Re-export commonly used types
pub use config::AppConfig;
pub use error::{Error, Result};
