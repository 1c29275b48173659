//! crates/academy_core/src/ports.rs
//!
//! Defines the service contracts (traits) for the application's core logic.
//! These traits form the boundary of the hexagonal architecture, allowing the core
//! to be independent of specific external implementations like databases or
//! the ledger client.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::{
    Certificate, CompletionReceipt, ContractError, Course, CourseModule, CourseProgress,
    MintReceipt, ModuleCompletion, Principal, SkillLevel, TotalStats, TxId, TxStatus, User,
    UserProgress,
};

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// A generic error type for all port operations.
/// This abstracts away the specific errors from external services (e.g., database, network),
/// while contract guard failures keep their structured codes.
#[derive(Debug, thiserror::Error)]
pub enum PortError {
    #[error("Item not found: {0}")]
    NotFound(String),
    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
    #[error("Unauthorized")]
    Unauthorized,
    /// A contract guard rejected the call; no state changed on the ledger.
    #[error("Contract rejected the call: {0}")]
    Contract(#[from] ContractError),
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

/// A state-changing ledger call that was accepted for inclusion, paired
/// with the operation's result. Callers that need finality must still poll
/// `transaction_status` on the returned id.
#[derive(Debug, Clone)]
pub struct SubmittedTx<T> {
    pub tx_id: TxId,
    pub result: T,
}

//=========================================================================================
// Service Ports (Traits)
//=========================================================================================

#[async_trait]
pub trait DatabaseService: Send + Sync {
    // --- User Management ---
    async fn get_or_create_user(
        &self,
        address: &Principal,
        bns_name: Option<&str>,
    ) -> PortResult<User>;

    // --- Auth Sessions ---
    async fn create_auth_session(
        &self,
        session_id: &str,
        address: &Principal,
        expires_at: DateTime<Utc>,
    ) -> PortResult<()>;

    async fn validate_auth_session(&self, session_id: &str) -> PortResult<Principal>;

    async fn delete_auth_session(&self, session_id: &str) -> PortResult<()>;

    // --- Mint Receipts (audit trail) ---
    async fn record_mint_receipt(&self, receipt: MintReceipt) -> PortResult<()>;

    async fn get_mint_receipts_for_user(&self, address: &Principal)
        -> PortResult<Vec<MintReceipt>>;
}

/// The contract-call boundary: the two deployed contracts (progress tracker
/// and certificate registry) behind one client trait. State-changing calls
/// return a transaction handle; read-only calls need no signature.
#[async_trait]
pub trait CertificateLedger: Send + Sync {
    // --- State-changing Calls (progress tracker) ---
    #[allow(clippy::too_many_arguments)]
    async fn create_module(
        &self,
        caller: &Principal,
        module_id: u64,
        course_id: u64,
        name: &str,
        description: &str,
        points_reward: u64,
        difficulty: u32,
        estimated_minutes: u32,
    ) -> PortResult<SubmittedTx<u64>>;

    async fn complete_module(
        &self,
        caller: &Principal,
        module_id: u64,
        time_spent_minutes: u32,
        score: u32,
    ) -> PortResult<SubmittedTx<CompletionReceipt>>;

    // --- State-changing Calls (certificate registry) ---
    async fn create_course(
        &self,
        caller: &Principal,
        course_id: u64,
        name: &str,
        description: &str,
        difficulty: u32,
    ) -> PortResult<SubmittedTx<u64>>;

    async fn mint_certificate(
        &self,
        caller: &Principal,
        recipient: &Principal,
        course_id: u64,
        skill_level: SkillLevel,
        metadata_hash: &str,
    ) -> PortResult<SubmittedTx<u64>>;

    async fn transfer(
        &self,
        caller: &Principal,
        token_id: u64,
        sender: &Principal,
        recipient: &Principal,
    ) -> PortResult<SubmittedTx<()>>;

    // --- Read-only Calls ---
    async fn get_course(&self, course_id: u64) -> PortResult<Option<Course>>;

    async fn get_module(&self, module_id: u64) -> PortResult<Option<CourseModule>>;

    async fn get_user_progress(&self, student: &Principal) -> PortResult<UserProgress>;

    async fn get_course_progress(
        &self,
        course_id: u64,
        student: &Principal,
    ) -> PortResult<CourseProgress>;

    async fn has_completed_module(&self, module_id: u64, student: &Principal)
        -> PortResult<bool>;

    async fn get_module_completion(
        &self,
        module_id: u64,
        student: &Principal,
    ) -> PortResult<Option<ModuleCompletion>>;

    async fn get_total_stats(&self) -> PortResult<TotalStats>;

    async fn get_owner(&self, token_id: u64) -> PortResult<Option<Principal>>;

    async fn get_certificate_data(&self, token_id: u64) -> PortResult<Option<Certificate>>;

    async fn get_student_certificates(&self, student: &Principal) -> PortResult<Vec<u64>>;

    async fn has_completed_course(&self, course_id: u64, student: &Principal)
        -> PortResult<bool>;

    /// The observed status of a previously submitted transaction.
    async fn transaction_status(&self, tx_id: &TxId) -> PortResult<TxStatus>;
}

/// A storage system where data is retrieved by a hash of its content.
#[async_trait]
pub trait MetadataStore: Send + Sync {
    /// Stores a blob and returns its content address.
    async fn store(&self, content: &[u8]) -> PortResult<String>;

    /// Fetches a blob by its content address.
    async fn retrieve(&self, hash: &str) -> PortResult<Vec<u8>>;
}
