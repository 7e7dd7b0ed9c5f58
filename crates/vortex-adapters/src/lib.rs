//! # vortex-adapters
//!
//! [`UiDriver`](vortex_proto::UiDriver) implementations.
//!
//! The only adapter shipped in-tree is [`MockUiDriver`], a scripted
//! in-memory UI tree used by the test suites and by `--driver mock` dry
//! runs. A real accessibility backend (UIA, AT-SPI, ...) implements the same
//! trait in its own crate and plugs into the harness unchanged.

mod mock;

pub use mock::MockUiDriver;
