//! Write operations for survey responses

pub mod submit;

pub use submit::{FormParseError, SubmitResponseCommand, SubmitResponseError};
