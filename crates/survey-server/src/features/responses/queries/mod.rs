//! Read operations for survey responses

pub mod export_csv;

pub use export_csv::ExportCsvError;
