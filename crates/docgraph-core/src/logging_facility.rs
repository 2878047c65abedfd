//! Structured logging facility for docgraph
//!
//! - Single initialization point via `init(profile)`
//! - Operation macros (`log_op_start!`, `log_op_end!`, `log_op_error!`) that
//!   the repository wraps around every call
//! - Test capture mode for deterministic assertions
//!
//! # Usage
//!
//! ```rust
//! use docgraph_core::logging_facility::{init, Profile};
//!
//! init(Profile::Development);
//! ```

pub mod init;
pub mod macros;
pub mod test_capture;

pub use init::{init, Profile};
pub use test_capture::{init_test_capture, CapturedEvent, TestCapture};
