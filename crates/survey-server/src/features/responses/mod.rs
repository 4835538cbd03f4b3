//! Survey response feature slice
//!
//! Commands cover ingestion (normalize and persist a submission); queries
//! cover the CSV export reconciler.

pub mod commands;
pub mod queries;
pub mod routes;

pub use routes::responses_routes;
