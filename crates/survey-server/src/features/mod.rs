//! Feature modules implementing the survey API
//!
//! Each feature is a vertical slice with its own commands (write
//! operations), queries (read operations), and routes:
//!
//! - **responses**: survey submission ingestion and CSV export

pub mod responses;

use axum::Router;

use crate::config::Config;
use crate::notify::NotifierHandle;
use crate::store::ResponseStore;

/// Shared state for all feature routes
#[derive(Clone)]
pub struct FeatureState {
    /// Handle over the response store directory
    pub store: ResponseStore,
    /// Producer side of the notification queue
    pub notifier: NotifierHandle,
    /// Body of the 200 response after a successful submission
    pub ack_message: String,
}

/// Creates the API router with all feature routes mounted.
///
/// The export route path comes from configuration rather than being a
/// process-wide constant, so each deployment chooses where the CSV lives.
pub fn router(state: FeatureState, config: &Config) -> Router<()> {
    responses::responses_routes(&config.export.path).with_state(state)
}
