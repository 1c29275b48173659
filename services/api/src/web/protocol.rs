//! services/api/src/web/protocol.rs
//!
//! Defines the WebSocket message protocol between the browser client and the API server
//! for the certificate-mint workflow.

use serde::{Deserialize, Serialize};

//=========================================================================================
// Messages Sent FROM the Client (Browser) TO the Server
//=========================================================================================

/// Represents the structured text messages a client can send to the server.
#[derive(Deserialize, Debug)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Starts the complete-tutorial-and-mint workflow. This must be the
    /// first message sent on the connection, and only one workflow may run
    /// per connection.
    StartMint {
        course_id: u64,
        module_id: u64,
        time_spent_minutes: u32,
        score: u32,
    },

    /// Aborts the in-flight workflow (the user declined the wallet prompt).
    CancelMint,
}

//=========================================================================================
// Messages Sent FROM the Server TO the Client (Browser)
//=========================================================================================

/// The ordered steps of the mint workflow, surfaced to the UI as progress.
#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowStep {
    GeneratingMetadata,
    UploadingMetadata,
    UpdatingProgress,
    ConfirmingProgress,
    MintingCertificate,
    ConfirmingMint,
}

impl WorkflowStep {
    /// A coarse completion percentage for a progress bar.
    pub fn percent(&self) -> u8 {
        match self {
            WorkflowStep::GeneratingMetadata => 10,
            WorkflowStep::UploadingMetadata => 25,
            WorkflowStep::UpdatingProgress => 40,
            WorkflowStep::ConfirmingProgress => 60,
            WorkflowStep::MintingCertificate => 75,
            WorkflowStep::ConfirmingMint => 90,
        }
    }
}

/// Represents the structured text messages the server can send to the client.
#[derive(Serialize, Debug, Clone)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// The workflow has entered the given step.
    MintStep { step: WorkflowStep, percent: u8 },

    /// The progress-update transaction confirmed; carries the points the
    /// completion earned (zero when the module was already completed in an
    /// earlier run).
    ProgressRecorded {
        points_earned: u64,
        total_points: u64,
        streak: u32,
    },

    /// The whole workflow finished; the certificate exists on the ledger.
    MintCompleted { tx_id: String, token_id: u64 },

    /// The workflow was cancelled by the client before completing.
    MintCancelled,

    /// Reports a fatal error; the workflow has stopped at the failing step.
    Error { message: String },
}
