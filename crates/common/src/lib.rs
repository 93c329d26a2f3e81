//! Common utilities for usbcan-rs
//!
//! This crate provides what the device layer and the command-line tool share:
//! the error type returned by fallible device operations and the tracing
//! subscriber setup used by binaries.

pub mod error;
pub mod logging;

pub use error::{Error, Result};
pub use logging::setup_logging;
