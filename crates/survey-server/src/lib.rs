//! Survey Server Library
//!
//! HTTP service that collects survey submissions and exports them as CSV.
//!
//! # Overview
//!
//! - **Ingestion**: `POST /submit` accepts URL-encoded form data, normalizes
//!   it into a flat record (first-value-wins for duplicate fields), derives
//!   the submitter's origin address, and persists the record before
//!   acknowledging the client.
//! - **Record Store**: one immutable JSON document per submission, named by
//!   a lexically sortable capture timestamp. No shared mutable index; crash
//!   safety comes from the one-file-per-record layout.
//! - **Export**: a configurable `GET` path reconstitutes every stored record
//!   into a single CSV table using a discovered schema (the union of all
//!   field names plus a synthetic capture-time column).
//! - **Notification**: committed records are handed to a bounded best-effort
//!   mail queue; delivery failures never reach the request path.
//!
//! # Architecture
//!
//! Features live under [`features`] as vertical slices with their own
//! commands, queries, and routes. Write operations (submitting a response)
//! are commands; read operations (the CSV export) are queries.

pub mod config;
pub mod error;
pub mod features;
pub mod notify;
pub mod store;

// Re-export commonly used types
pub use error::{AppError, ServerResult};
