//! # vortex-proto
//!
//! Shared types, error definitions, and traits for the VORTEX harness.
//!
//! This crate provides the foundational abstractions used across all harness
//! crates, including:
//! - The [`UiDriver`] capability trait (the contract with whatever
//!   accessibility backend actually manipulates the application)
//! - The control handle and query model
//! - The driver error taxonomy

mod driver;
mod error;

pub use driver::{
    ControlHandle, ControlKind, ControlQuery, Key, TitleMatch, ToggleState, UiDriver, WaitState,
};
pub use error::{DriverError, Result};
