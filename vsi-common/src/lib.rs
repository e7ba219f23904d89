//! # VSI Common Library
//!
//! Shared code for the vehicle safety intelligence services:
//! - Error types
//! - Configuration loading (TOML + environment overrides)
//! - Clock abstraction for expiry and year-bound checks

pub mod config;
pub mod error;
pub mod time;

pub use error::{Error, Result};
pub use time::{Clock, ManualClock, SystemClock};
