//! services/api/src/web/mint_task.rs
//!
//! This module contains the asynchronous "worker" function that drives the
//! complete-tutorial-and-mint workflow: generate metadata, store it in the
//! content-addressed store, record the module completion on the ledger, then
//! mint the certificate, polling each transaction to confirmation.
//!
//! The sequence is strictly ordered with no retries. Re-running it after a
//! partial failure is safe because both on-chain mutations are
//! idempotent-guarded; only the metadata upload may be duplicated, and the
//! store is content-addressed so even that is harmless.

use std::sync::Arc;

use academy_core::domain::{Course, MintReceipt, Principal, SkillLevel, TxId, TxStatus};
use academy_core::ports::{PortError, PortResult};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::web::protocol::{ServerMessage, WorkflowStep};
use crate::web::state::AppState;

//=========================================================================================
// Workflow Input and Outcome
//=========================================================================================

/// The parameters of one workflow run, taken from the client's start message.
#[derive(Debug, Clone, Copy)]
pub struct MintRequest {
    pub course_id: u64,
    pub module_id: u64,
    pub time_spent_minutes: u32,
    pub score: u32,
}

/// Represents the outcome of the `mint_process` task.
#[derive(Debug, PartialEq, Eq)]
pub enum MintOutcome {
    /// The certificate was minted and confirmed.
    Completed { tx_id: TxId, token_id: u64 },
    /// The client cancelled the workflow before it finished.
    Cancelled,
}

//=========================================================================================
// Certificate Metadata (the fixed attribute schema stored off-chain)
//=========================================================================================

#[derive(Serialize, Debug)]
pub struct MetadataAttribute {
    pub trait_type: &'static str,
    pub value: String,
}

/// The off-chain metadata record the certificate's hash points at.
#[derive(Serialize, Debug)]
pub struct CertificateMetadata {
    pub name: String,
    pub description: String,
    pub attributes: Vec<MetadataAttribute>,
    pub course_id: u64,
    pub completion_date: DateTime<Utc>,
    pub skill_level: u32,
}

/// Builds the metadata record for a completed course.
pub fn generate_certificate_metadata(
    course: &Course,
    skill_level: SkillLevel,
    completion_date: DateTime<Utc>,
) -> CertificateMetadata {
    CertificateMetadata {
        name: format!("{} Certificate", course.name),
        description: format!(
            "Certificate of completion for the {} course from Bitcoin Developer Academy. \
             This token serves as verifiable proof of blockchain development skills.",
            course.name
        ),
        attributes: vec![
            MetadataAttribute {
                trait_type: "Course",
                value: course.name.clone(),
            },
            MetadataAttribute {
                trait_type: "Skill Level",
                value: skill_level.to_string(),
            },
            MetadataAttribute {
                trait_type: "Completion Date",
                value: completion_date.format("%Y-%m-%d").to_string(),
            },
            MetadataAttribute {
                trait_type: "Academy",
                value: "Bitcoin Developer Academy".to_string(),
            },
        ],
        course_id: course.id,
        completion_date,
        skill_level: skill_level.as_u32(),
    }
}

//=========================================================================================
// The Workflow Task
//=========================================================================================

/// The main asynchronous task for one mint workflow.
///
/// Progress is reported over `progress`; the WebSocket handler forwards the
/// messages to the client. Every step checks the cancellation token first,
/// so a cancel lands between steps, never mid-transaction.
pub async fn mint_process(
    app_state: Arc<AppState>,
    principal: Principal,
    request: MintRequest,
    progress: mpsc::Sender<ServerMessage>,
    cancellation_token: CancellationToken,
) -> PortResult<MintOutcome> {
    info!(
        "Mint workflow started for {} (course {}, module {})",
        principal, request.course_id, request.module_id
    );

    // --- 1. Resolve the course and generate metadata ---
    if cancellation_token.is_cancelled() {
        return cancelled(&progress).await;
    }
    send_step(&progress, WorkflowStep::GeneratingMetadata).await?;

    let course = app_state
        .ledger
        .get_course(request.course_id)
        .await?
        .ok_or_else(|| PortError::NotFound(format!("Unknown course: {}", request.course_id)))?;
    let skill_level = SkillLevel::from_u32(course.difficulty).unwrap_or(SkillLevel::Beginner);
    let metadata = generate_certificate_metadata(&course, skill_level, Utc::now());
    let metadata_bytes = serde_json::to_vec(&metadata)
        .map_err(|e| PortError::Unexpected(format!("Failed to serialize metadata: {}", e)))?;

    // --- 2. Store the metadata, obtaining its content address ---
    if cancellation_token.is_cancelled() {
        return cancelled(&progress).await;
    }
    send_step(&progress, WorkflowStep::UploadingMetadata).await?;
    let metadata_hash = app_state.metadata_store.store(&metadata_bytes).await?;
    info!("Certificate metadata stored at {}", metadata_hash);

    // --- 3. Record the module completion as the student ---
    if cancellation_token.is_cancelled() {
        return cancelled(&progress).await;
    }
    send_step(&progress, WorkflowStep::UpdatingProgress).await?;

    let completion_tx = match app_state
        .ledger
        .complete_module(
            &principal,
            request.module_id,
            request.time_spent_minutes,
            request.score,
        )
        .await
    {
        Ok(tx) => {
            send(
                &progress,
                ServerMessage::ProgressRecorded {
                    points_earned: tx.result.points_earned,
                    total_points: tx.result.new_total_points,
                    streak: tx.result.streak,
                },
            )
            .await?;
            Some(tx.tx_id)
        }
        // A previous (possibly interrupted) run already recorded this
        // completion; continue to the mint step.
        Err(PortError::Contract(academy_core::domain::ContractError::AlreadyCompleted)) => {
            info!(
                "Module {} already completed by {}; continuing to mint",
                request.module_id, principal
            );
            let current = app_state.ledger.get_user_progress(&principal).await?;
            send(
                &progress,
                ServerMessage::ProgressRecorded {
                    points_earned: 0,
                    total_points: current.total_points,
                    streak: current.current_streak,
                },
            )
            .await?;
            None
        }
        Err(e) => return Err(e),
    };

    // --- 4. Poll the progress transaction to confirmation ---
    if let Some(tx_id) = completion_tx {
        send_step(&progress, WorkflowStep::ConfirmingProgress).await?;
        poll_to_confirmation(&app_state, &tx_id).await?;
    }

    // --- 5. Mint the certificate as the administrative principal ---
    if cancellation_token.is_cancelled() {
        return cancelled(&progress).await;
    }
    send_step(&progress, WorkflowStep::MintingCertificate).await?;
    let mint_tx = app_state
        .ledger
        .mint_certificate(
            &app_state.config.admin_principal,
            &principal,
            request.course_id,
            skill_level,
            &metadata_hash,
        )
        .await?;
    let token_id = mint_tx.result;

    // --- 6. Poll the mint transaction to confirmation ---
    send_step(&progress, WorkflowStep::ConfirmingMint).await?;
    poll_to_confirmation(&app_state, &mint_tx.tx_id).await?;

    // The on-chain mint is final at this point; a failed audit write is
    // logged rather than surfaced as a workflow failure.
    let receipt = MintReceipt {
        id: Uuid::new_v4(),
        address: principal.clone(),
        course_id: request.course_id,
        token_id,
        tx_id: mint_tx.tx_id.clone(),
        metadata_hash,
        created_at: Utc::now(),
    };
    if let Err(e) = app_state.db.record_mint_receipt(receipt).await {
        warn!("Failed to record mint receipt for {}: {}", principal, e);
    }

    send(
        &progress,
        ServerMessage::MintCompleted {
            tx_id: mint_tx.tx_id.0.clone(),
            token_id,
        },
    )
    .await?;
    info!(
        "Mint workflow finished for {}: token {} via {}",
        principal, token_id, mint_tx.tx_id
    );

    Ok(MintOutcome::Completed {
        tx_id: mint_tx.tx_id,
        token_id,
    })
}

//=========================================================================================
// Helpers
//=========================================================================================

/// Polls the ledger until the transaction confirms, fails, or the configured
/// timeout elapses.
async fn poll_to_confirmation(app_state: &Arc<AppState>, tx_id: &TxId) -> PortResult<()> {
    let interval = app_state.config.confirmation_poll_interval;
    let deadline = tokio::time::Instant::now() + app_state.config.confirmation_timeout;

    loop {
        match app_state.ledger.transaction_status(tx_id).await? {
            TxStatus::Confirmed => return Ok(()),
            TxStatus::Failed => {
                error!("Transaction {} failed on the ledger", tx_id);
                return Err(PortError::Unexpected(format!(
                    "Transaction {} failed",
                    tx_id
                )));
            }
            TxStatus::Pending => {}
        }
        if tokio::time::Instant::now() >= deadline {
            return Err(PortError::Unexpected(format!(
                "Timed out waiting for transaction {} to confirm",
                tx_id
            )));
        }
        tokio::time::sleep(interval).await;
    }
}

async fn send(progress: &mpsc::Sender<ServerMessage>, message: ServerMessage) -> PortResult<()> {
    progress
        .send(message)
        .await
        .map_err(|_| PortError::Unexpected("Mint progress channel closed.".to_string()))
}

async fn send_step(progress: &mpsc::Sender<ServerMessage>, step: WorkflowStep) -> PortResult<()> {
    send(
        progress,
        ServerMessage::MintStep {
            step,
            percent: step.percent(),
        },
    )
    .await
}

async fn cancelled(progress: &mpsc::Sender<ServerMessage>) -> PortResult<MintOutcome> {
    info!("Mint workflow cancelled by the client.");
    // Best effort; the client may already be gone.
    let _ = progress.send(ServerMessage::MintCancelled).await;
    Ok(MintOutcome::Cancelled)
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::time::Duration;

    use academy_core::domain::{ContractError, MintReceipt, User};
    use academy_core::ports::{CertificateLedger, DatabaseService};
    use async_trait::async_trait;
    use tokio::sync::Mutex;
    use tracing::Level;

    use super::*;
    use crate::adapters::{InMemoryMetadataStore, InProcessLedger};
    use crate::config::Config;

    /// A database stub so workflow tests need no Postgres.
    #[derive(Default)]
    struct MemoryDb {
        receipts: Mutex<Vec<MintReceipt>>,
        sessions: Mutex<HashMap<String, Principal>>,
    }

    #[async_trait]
    impl DatabaseService for MemoryDb {
        async fn get_or_create_user(
            &self,
            address: &Principal,
            bns_name: Option<&str>,
        ) -> PortResult<User> {
            Ok(User {
                address: address.clone(),
                bns_name: bns_name.map(String::from),
            })
        }

        async fn create_auth_session(
            &self,
            session_id: &str,
            address: &Principal,
            _expires_at: DateTime<Utc>,
        ) -> PortResult<()> {
            self.sessions
                .lock()
                .await
                .insert(session_id.to_string(), address.clone());
            Ok(())
        }

        async fn validate_auth_session(&self, session_id: &str) -> PortResult<Principal> {
            self.sessions
                .lock()
                .await
                .get(session_id)
                .cloned()
                .ok_or(PortError::Unauthorized)
        }

        async fn delete_auth_session(&self, session_id: &str) -> PortResult<()> {
            self.sessions.lock().await.remove(session_id);
            Ok(())
        }

        async fn record_mint_receipt(&self, receipt: MintReceipt) -> PortResult<()> {
            self.receipts.lock().await.push(receipt);
            Ok(())
        }

        async fn get_mint_receipts_for_user(
            &self,
            address: &Principal,
        ) -> PortResult<Vec<MintReceipt>> {
            Ok(self
                .receipts
                .lock()
                .await
                .iter()
                .filter(|r| &r.address == address)
                .cloned()
                .collect())
        }
    }

    fn admin() -> Principal {
        "ST1PQHQKV0RJXZFY1DGX8MNSNYVE3VGZJSRTPGZGM".parse().unwrap()
    }

    fn student() -> Principal {
        "ST1SJ3DTE5DN7X54YDH5D64R3BCB6A2AG2ZQ8YPD5".parse().unwrap()
    }

    fn test_config() -> Config {
        Config {
            bind_address: "127.0.0.1:0".parse().unwrap(),
            database_url: "postgres://unused".to_string(),
            log_level: Level::INFO,
            admin_principal: admin(),
            network: academy_core::domain::Network::Testnet,
            confirmation_poll_interval: Duration::from_millis(1),
            confirmation_timeout: Duration::from_millis(500),
            confirmation_delay: Duration::ZERO,
        }
    }

    /// An AppState wired entirely to in-memory adapters, with a course and
    /// one module already seeded.
    async fn seeded_state() -> Arc<AppState> {
        let config = Arc::new(test_config());
        let ledger = Arc::new(InProcessLedger::new(admin(), config.confirmation_delay));
        ledger
            .create_course(&admin(), 1, "Hello Clarity", "Learn the basics", 1)
            .await
            .unwrap();
        ledger
            .create_module(&admin(), 10, 1, "Module 1", "First module", 10, 1, 60)
            .await
            .unwrap();

        Arc::new(AppState {
            db: Arc::new(MemoryDb::default()),
            ledger,
            metadata_store: Arc::new(InMemoryMetadataStore::new()),
            config,
        })
    }

    fn request() -> MintRequest {
        MintRequest {
            course_id: 1,
            module_id: 10,
            time_spent_minutes: 45,
            score: 95,
        }
    }

    async fn drain(rx: &mut mpsc::Receiver<ServerMessage>) -> Vec<ServerMessage> {
        let mut messages = Vec::new();
        while let Ok(msg) = rx.try_recv() {
            messages.push(msg);
        }
        messages
    }

    #[tokio::test]
    async fn happy_path_walks_every_step_and_mints() {
        let state = seeded_state().await;
        let (tx, mut rx) = mpsc::channel(32);

        let outcome = mint_process(
            state.clone(),
            student(),
            request(),
            tx,
            CancellationToken::new(),
        )
        .await
        .unwrap();

        let token_id = match outcome {
            MintOutcome::Completed { token_id, .. } => token_id,
            other => panic!("expected completion, got {:?}", other),
        };
        assert_eq!(token_id, 1);

        // The certificate is owned by the student on the ledger.
        assert_eq!(
            state.ledger.get_owner(token_id).await.unwrap(),
            Some(student())
        );
        assert!(state
            .ledger
            .has_completed_course(1, &student())
            .await
            .unwrap());

        // Steps arrive in order, ending with completion.
        let messages = drain(&mut rx).await;
        let steps: Vec<WorkflowStep> = messages
            .iter()
            .filter_map(|m| match m {
                ServerMessage::MintStep { step, .. } => Some(*step),
                _ => None,
            })
            .collect();
        assert_eq!(
            steps,
            vec![
                WorkflowStep::GeneratingMetadata,
                WorkflowStep::UploadingMetadata,
                WorkflowStep::UpdatingProgress,
                WorkflowStep::ConfirmingProgress,
                WorkflowStep::MintingCertificate,
                WorkflowStep::ConfirmingMint,
            ]
        );
        assert!(matches!(
            messages.last(),
            Some(ServerMessage::MintCompleted { token_id: 1, .. })
        ));

        // Points were awarded exactly once.
        let awarded = messages.iter().find_map(|m| match m {
            ServerMessage::ProgressRecorded { points_earned, .. } => Some(*points_earned),
            _ => None,
        });
        assert_eq!(awarded, Some(10));

        // The audit receipt landed in the database.
        let receipts = state.db.get_mint_receipts_for_user(&student()).await.unwrap();
        assert_eq!(receipts.len(), 1);
        assert_eq!(receipts[0].token_id, 1);

        // The stored metadata is retrievable by the recorded hash.
        let cert = state
            .ledger
            .get_certificate_data(token_id)
            .await
            .unwrap()
            .unwrap();
        let blob = state
            .metadata_store
            .retrieve(&cert.metadata_hash)
            .await
            .unwrap();
        let parsed: serde_json::Value = serde_json::from_slice(&blob).unwrap();
        assert_eq!(parsed["name"], "Hello Clarity Certificate");
        assert_eq!(parsed["course_id"], 1);
    }

    #[tokio::test]
    async fn unknown_course_stops_the_workflow() {
        let state = seeded_state().await;
        let (tx, mut rx) = mpsc::channel(32);

        let err = mint_process(
            state,
            student(),
            MintRequest {
                course_id: 99,
                ..request()
            },
            tx,
            CancellationToken::new(),
        )
        .await
        .unwrap_err();

        assert!(matches!(err, PortError::NotFound(_)));
        // Only the first step was announced; nothing was submitted.
        let messages = drain(&mut rx).await;
        assert_eq!(messages.len(), 1);
    }

    #[tokio::test]
    async fn rerun_after_partial_failure_skips_the_completed_module() {
        let state = seeded_state().await;

        // Simulate an earlier run that recorded progress but died before
        // minting.
        state
            .ledger
            .complete_module(&student(), 10, 45, 95)
            .await
            .unwrap();

        let (tx, mut rx) = mpsc::channel(32);
        let outcome = mint_process(
            state.clone(),
            student(),
            request(),
            tx,
            CancellationToken::new(),
        )
        .await
        .unwrap();
        assert!(matches!(outcome, MintOutcome::Completed { token_id: 1, .. }));

        // The completion was not double-counted.
        let progress = state.ledger.get_user_progress(&student()).await.unwrap();
        assert_eq!(progress.total_points, 10);

        let messages = drain(&mut rx).await;
        let awarded = messages.iter().find_map(|m| match m {
            ServerMessage::ProgressRecorded { points_earned, .. } => Some(*points_earned),
            _ => None,
        });
        assert_eq!(awarded, Some(0));
    }

    #[tokio::test]
    async fn second_full_run_fails_with_already_certified() {
        let state = seeded_state().await;

        let (tx, _rx) = mpsc::channel(32);
        mint_process(
            state.clone(),
            student(),
            request(),
            tx,
            CancellationToken::new(),
        )
        .await
        .unwrap();

        let (tx, _rx) = mpsc::channel(32);
        let err = mint_process(
            state,
            student(),
            request(),
            tx,
            CancellationToken::new(),
        )
        .await
        .unwrap_err();
        assert!(matches!(
            err,
            PortError::Contract(ContractError::AlreadyCertified)
        ));
    }

    #[tokio::test]
    async fn cancellation_stops_before_any_mutation() {
        let state = seeded_state().await;
        let (tx, mut rx) = mpsc::channel(32);
        let token = CancellationToken::new();
        token.cancel();

        let outcome = mint_process(state.clone(), student(), request(), tx, token)
            .await
            .unwrap();
        assert_eq!(outcome, MintOutcome::Cancelled);

        let messages = drain(&mut rx).await;
        assert!(matches!(
            messages.as_slice(),
            [ServerMessage::MintCancelled]
        ));
        assert!(!state
            .ledger
            .has_completed_module(10, &student())
            .await
            .unwrap());
    }

    #[test]
    fn metadata_carries_the_fixed_attribute_schema() {
        let course = Course {
            id: 1,
            name: "Hello Clarity".to_string(),
            description: "Learn the basics".to_string(),
            difficulty: 1,
        };
        let metadata =
            generate_certificate_metadata(&course, SkillLevel::Beginner, Utc::now());
        let traits: Vec<&str> = metadata
            .attributes
            .iter()
            .map(|a| a.trait_type)
            .collect();
        assert_eq!(
            traits,
            vec!["Course", "Skill Level", "Completion Date", "Academy"]
        );
        assert_eq!(metadata.skill_level, 1);
    }
}
