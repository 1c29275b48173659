//! services/api/src/web/state.rs
//!
//! Defines the application's shared and connection-specific states.

use std::sync::Arc;

use academy_core::domain::Principal;
use academy_core::ports::{CertificateLedger, DatabaseService, MetadataStore};
use tokio_util::sync::CancellationToken;

use crate::config::Config;

//=========================================================================================
// AppState (Shared Across All Connections)
//=========================================================================================

/// The shared application state, created once at startup and passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<dyn DatabaseService>,
    pub ledger: Arc<dyn CertificateLedger>,
    pub metadata_store: Arc<dyn MetadataStore>,
    pub config: Arc<Config>,
}

//=========================================================================================
// MintSessionState (Specific to One WebSocket Connection)
//=========================================================================================

/// The state for a single, active mint-workflow WebSocket connection.
///
/// The workflow itself is one-shot and not resumable; if the connection
/// drops mid-sequence the client restarts from the first step, which is safe
/// because the on-chain mutations are idempotent-guarded.
pub struct MintSessionState {
    /// The authenticated student driving this workflow.
    pub principal: Principal,
    /// Set once a workflow has been started on this connection.
    pub workflow_running: bool,
    /// A token to cancel the in-flight workflow between steps.
    pub cancellation_token: CancellationToken,
}

impl MintSessionState {
    pub fn new(principal: Principal) -> Self {
        Self {
            principal,
            workflow_running: false,
            cancellation_token: CancellationToken::new(),
        }
    }
}
