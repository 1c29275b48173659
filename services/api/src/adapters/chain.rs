//! services/api/src/adapters/chain.rs
//!
//! The in-process implementation of the `CertificateLedger` port. It executes
//! the two contract state machines directly and journals every accepted
//! transaction so callers can poll for confirmation, the same way they would
//! against a real chain RPC endpoint.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use academy_core::certificates::CertificateRegistry;
use academy_core::domain::{
    Certificate, CompletionReceipt, Course, CourseModule, CourseProgress, ModuleCompletion,
    Principal, SkillLevel, TotalStats, TxId, TxStatus, UserProgress,
};
use academy_core::ports::{CertificateLedger, PortError, PortResult, SubmittedTx};
use academy_core::progress::ProgressTracker;
use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::info;
use uuid::Uuid;

/// A journal entry for one accepted transaction.
struct TxRecord {
    accepted_at: Instant,
}

/// The development/test deployment of the contract boundary.
///
/// Guard failures surface immediately as `PortError::Contract` and are never
/// journaled; accepted transactions report `Pending` until the configured
/// inclusion delay has elapsed, then `Confirmed`.
pub struct InProcessLedger {
    tracker: Mutex<ProgressTracker>,
    registry: Mutex<CertificateRegistry>,
    journal: Mutex<HashMap<TxId, TxRecord>>,
    confirmation_delay: Duration,
}

impl InProcessLedger {
    /// Creates a fresh ledger with both contracts owned by `admin`.
    pub fn new(admin: Principal, confirmation_delay: Duration) -> Self {
        Self {
            tracker: Mutex::new(ProgressTracker::new(admin.clone())),
            registry: Mutex::new(CertificateRegistry::new(admin)),
            journal: Mutex::new(HashMap::new()),
            confirmation_delay,
        }
    }

    async fn journal_tx(&self) -> TxId {
        let tx_id = TxId(format!("0x{}", Uuid::new_v4().simple()));
        self.journal.lock().await.insert(
            tx_id.clone(),
            TxRecord {
                accepted_at: Instant::now(),
            },
        );
        tx_id
    }
}

#[async_trait]
impl CertificateLedger for InProcessLedger {
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
    ) -> PortResult<SubmittedTx<u64>> {
        let result = self.tracker.lock().await.create_module(
            caller,
            module_id,
            course_id,
            name,
            description,
            points_reward,
            difficulty,
            estimated_minutes,
        )?;
        let tx_id = self.journal_tx().await;
        info!("create-module {} accepted as {}", module_id, tx_id);
        Ok(SubmittedTx { tx_id, result })
    }

    async fn complete_module(
        &self,
        caller: &Principal,
        module_id: u64,
        time_spent_minutes: u32,
        score: u32,
    ) -> PortResult<SubmittedTx<CompletionReceipt>> {
        let result = self.tracker.lock().await.complete_module(
            caller,
            module_id,
            time_spent_minutes,
            score,
        )?;
        let tx_id = self.journal_tx().await;
        info!(
            "complete-module {} by {} accepted as {}",
            module_id, caller, tx_id
        );
        Ok(SubmittedTx { tx_id, result })
    }

    async fn create_course(
        &self,
        caller: &Principal,
        course_id: u64,
        name: &str,
        description: &str,
        difficulty: u32,
    ) -> PortResult<SubmittedTx<u64>> {
        let result = self.registry.lock().await.create_course(
            caller,
            course_id,
            name,
            description,
            difficulty,
        )?;
        let tx_id = self.journal_tx().await;
        info!("create-course {} accepted as {}", course_id, tx_id);
        Ok(SubmittedTx { tx_id, result })
    }

    async fn mint_certificate(
        &self,
        caller: &Principal,
        recipient: &Principal,
        course_id: u64,
        skill_level: SkillLevel,
        metadata_hash: &str,
    ) -> PortResult<SubmittedTx<u64>> {
        let result = self.registry.lock().await.mint_certificate(
            caller,
            recipient,
            course_id,
            skill_level,
            metadata_hash,
        )?;
        let tx_id = self.journal_tx().await;
        info!(
            "mint-certificate for {} (course {}) accepted as {}, token {}",
            recipient, course_id, tx_id, result
        );
        Ok(SubmittedTx { tx_id, result })
    }

    async fn transfer(
        &self,
        caller: &Principal,
        token_id: u64,
        sender: &Principal,
        recipient: &Principal,
    ) -> PortResult<SubmittedTx<()>> {
        self.registry
            .lock()
            .await
            .transfer(caller, token_id, sender, recipient)?;
        let tx_id = self.journal_tx().await;
        info!(
            "transfer of token {} to {} accepted as {}",
            token_id, recipient, tx_id
        );
        Ok(SubmittedTx { tx_id, result: () })
    }

    async fn get_course(&self, course_id: u64) -> PortResult<Option<Course>> {
        Ok(self.registry.lock().await.get_course(course_id).cloned())
    }

    async fn get_module(&self, module_id: u64) -> PortResult<Option<CourseModule>> {
        Ok(self.tracker.lock().await.get_module(module_id).cloned())
    }

    async fn get_user_progress(&self, student: &Principal) -> PortResult<UserProgress> {
        Ok(self.tracker.lock().await.get_user_progress(student))
    }

    async fn get_course_progress(
        &self,
        course_id: u64,
        student: &Principal,
    ) -> PortResult<CourseProgress> {
        Ok(self
            .tracker
            .lock()
            .await
            .get_course_progress(course_id, student))
    }

    async fn has_completed_module(
        &self,
        module_id: u64,
        student: &Principal,
    ) -> PortResult<bool> {
        Ok(self
            .tracker
            .lock()
            .await
            .has_completed_module(module_id, student))
    }

    async fn get_module_completion(
        &self,
        module_id: u64,
        student: &Principal,
    ) -> PortResult<Option<ModuleCompletion>> {
        Ok(self
            .tracker
            .lock()
            .await
            .get_module_completion(module_id, student)
            .cloned())
    }

    async fn get_total_stats(&self) -> PortResult<TotalStats> {
        Ok(self.tracker.lock().await.get_total_stats())
    }

    async fn get_owner(&self, token_id: u64) -> PortResult<Option<Principal>> {
        Ok(self.registry.lock().await.get_owner(token_id).cloned())
    }

    async fn get_certificate_data(&self, token_id: u64) -> PortResult<Option<Certificate>> {
        Ok(self
            .registry
            .lock()
            .await
            .get_certificate_data(token_id)
            .cloned())
    }

    async fn get_student_certificates(&self, student: &Principal) -> PortResult<Vec<u64>> {
        Ok(self
            .registry
            .lock()
            .await
            .get_student_certificates(student))
    }

    async fn has_completed_course(
        &self,
        course_id: u64,
        student: &Principal,
    ) -> PortResult<bool> {
        Ok(self
            .registry
            .lock()
            .await
            .has_completed_course(course_id, student))
    }

    async fn transaction_status(&self, tx_id: &TxId) -> PortResult<TxStatus> {
        let journal = self.journal.lock().await;
        let record = journal
            .get(tx_id)
            .ok_or_else(|| PortError::NotFound(format!("Transaction {} not found", tx_id)))?;
        if record.accepted_at.elapsed() >= self.confirmation_delay {
            Ok(TxStatus::Confirmed)
        } else {
            Ok(TxStatus::Pending)
        }
    }
}
