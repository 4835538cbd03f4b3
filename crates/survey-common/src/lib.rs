//! Survey Common Library
//!
//! Shared types, error handling, and logging setup for the survey workspace.
//!
//! # Overview
//!
//! This crate provides functionality used by all workspace members:
//!
//! - **Error Handling**: The [`SurveyError`] type and [`Result`] alias
//! - **Logging**: Centralized `tracing` subscriber initialization
//! - **Types**: The [`Record`](types::Record) type representing one
//!   normalized survey submission

pub mod error;
pub mod logging;
pub mod types;

// Re-export commonly used types
pub use error::{Result, SurveyError};
