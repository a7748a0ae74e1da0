//! SALD Common Library
#![deny(clippy::unwrap_used, clippy::expect_used)]
//!
//! Shared error handling and logging initialization for the SALD workspace.
//!
//! # Overview
//!
//! This crate provides functionality used across all SALD workspace members:
//!
//! - **Error Handling**: Custom error and result types
//! - **Logging**: Centralized tracing subscriber setup

pub mod error;
pub mod logging;

// Re-export commonly used types
pub use error::{Result, SaldError};
