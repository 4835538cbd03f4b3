//! Submit response command
//!
//! Normalizes a parsed form submission into a [`Record`], derives the origin
//! address, and commits it to the store. The command is pure data; the
//! handler function owns the persistence and notification side effects.

use std::net::SocketAddr;

use axum::http::HeaderMap;
use tracing::debug;

use survey_common::types::{Record, IP_ADDRESS_FIELD};

use crate::notify::NotifierHandle;
use crate::store::{RecordId, ResponseStore, StoreError};

/// Trusted-proxy header carrying the original client address.
pub const FORWARDED_FOR_HEADER: &str = "x-forwarded-for";

/// Command to ingest one survey submission
#[derive(Debug, Clone)]
pub struct SubmitResponseCommand {
    /// Decoded form fields in submission order (duplicates still present)
    pub fields: Vec<(String, String)>,
    /// Derived origin address of the submitter
    pub origin: String,
}

/// Errors that can occur when submitting a response
#[derive(Debug, thiserror::Error)]
pub enum SubmitResponseError {
    #[error("unable to persist response: {0}")]
    Store(#[from] StoreError),
}

/// Errors produced while decoding the submission body
#[derive(Debug, thiserror::Error)]
pub enum FormParseError {
    #[error("invalid percent-encoding at byte {0}")]
    InvalidEscape(usize),

    #[error("{0}")]
    Decode(#[from] serde_urlencoded::de::Error),
}

/// Decode a URL-encoded form body into ordered field pairs.
///
/// The urlencoded decoder passes broken escapes through verbatim, so bad
/// escapes are rejected up front: a submission with a mangled body should
/// fail loudly rather than store garbled values.
pub fn parse_form(body: &[u8]) -> Result<Vec<(String, String)>, FormParseError> {
    let mut i = 0;
    while i < body.len() {
        if body[i] == b'%' {
            let valid = body.get(i + 1).is_some_and(u8::is_ascii_hexdigit)
                && body.get(i + 2).is_some_and(u8::is_ascii_hexdigit);
            if !valid {
                return Err(FormParseError::InvalidEscape(i));
            }
            i += 3;
        } else {
            i += 1;
        }
    }

    Ok(serde_urlencoded::from_bytes(body)?)
}

impl SubmitResponseCommand {
    /// Fold the ordered form fields into a normalized record.
    ///
    /// Duplicate field names keep their first value. The derived origin is
    /// written last under [`IP_ADDRESS_FIELD`], unconditionally overwriting
    /// any client-supplied field of that name.
    pub fn normalize(&self) -> Record {
        let mut record: Record = self.fields.iter().cloned().collect();
        record.set(IP_ADDRESS_FIELD, self.origin.clone());
        record
    }
}

/// Derive the submitter's origin address.
///
/// Prefers the first comma-separated entry of the forwarded-address header,
/// trimmed; falls back to the transport-level peer address.
pub fn origin_address(headers: &HeaderMap, peer: Option<SocketAddr>) -> String {
    if let Some(forwarded) = headers
        .get(FORWARDED_FOR_HEADER)
        .and_then(|value| value.to_str().ok())
    {
        if let Some(first) = forwarded.split(',').next() {
            let first = first.trim();
            if !first.is_empty() {
                return first.to_string();
            }
        }
    }

    peer.map(|addr| addr.ip().to_string()).unwrap_or_default()
}

/// Handler function for submitting a response.
///
/// Persists first; the notifier only sees records the store accepted, so a
/// failed write produces neither an acknowledgment nor a notification.
pub async fn handle(
    store: &ResponseStore,
    notifier: &NotifierHandle,
    command: SubmitResponseCommand,
) -> Result<RecordId, SubmitResponseError> {
    let record = command.normalize();
    debug!(fields = record.len(), origin = %command.origin, "normalized submission");

    let id = store.put(&record).await?;
    notifier.notify(record);

    Ok(id)
}
