//! services/api/src/adapters/db.rs
//!
//! This module contains the database adapter, which is the concrete implementation
//! of the `DatabaseService` port from the `core` crate. It handles all interactions
//! with the PostgreSQL database using `sqlx`.

use academy_core::domain::{MintReceipt, Principal, TxId, User};
use academy_core::ports::{DatabaseService, PortError, PortResult};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// A database adapter that implements the `DatabaseService` port.
#[derive(Clone)]
pub struct DbAdapter {
    pool: PgPool,
}

impl DbAdapter {
    /// Creates a new `DbAdapter`.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// A helper function to run database migrations at startup.
    pub async fn run_migrations(&self) -> Result<(), sqlx::Error> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }
}

//=========================================================================================
// "Impure" Database Record Structs
//=========================================================================================

#[derive(FromRow)]
struct UserRecord {
    address: String,
    bns_name: Option<String>,
}
impl UserRecord {
    fn to_domain(self) -> PortResult<User> {
        let address = self
            .address
            .parse::<Principal>()
            .map_err(|e| PortError::Unexpected(e.to_string()))?;
        Ok(User {
            address,
            bns_name: self.bns_name,
        })
    }
}

#[derive(FromRow)]
struct AuthSessionRecord {
    address: String,
}

#[derive(FromRow)]
struct MintReceiptRecord {
    id: Uuid,
    address: String,
    course_id: i64,
    token_id: i64,
    tx_id: String,
    metadata_hash: String,
    created_at: DateTime<Utc>,
}
impl MintReceiptRecord {
    fn to_domain(self) -> PortResult<MintReceipt> {
        let address = self
            .address
            .parse::<Principal>()
            .map_err(|e| PortError::Unexpected(e.to_string()))?;
        Ok(MintReceipt {
            id: self.id,
            address,
            course_id: self.course_id as u64,
            token_id: self.token_id as u64,
            tx_id: TxId(self.tx_id),
            metadata_hash: self.metadata_hash,
            created_at: self.created_at,
        })
    }
}

//=========================================================================================
// `DatabaseService` Trait Implementation
//=========================================================================================

#[async_trait]
impl DatabaseService for DbAdapter {
    async fn get_or_create_user(
        &self,
        address: &Principal,
        bns_name: Option<&str>,
    ) -> PortResult<User> {
        sqlx::query(
            "INSERT INTO users (address, bns_name) VALUES ($1, $2)
             ON CONFLICT (address) DO UPDATE SET bns_name = COALESCE($2, users.bns_name)",
        )
        .bind(address.as_str())
        .bind(bns_name)
        .execute(&self.pool)
        .await
        .map_err(|e| PortError::Unexpected(e.to_string()))?;

        let record = sqlx::query_as::<_, UserRecord>(
            "SELECT address, bns_name FROM users WHERE address = $1",
        )
        .bind(address.as_str())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::RowNotFound => PortError::NotFound(format!("User {} not found", address)),
            _ => PortError::Unexpected(e.to_string()),
        })?;

        record.to_domain()
    }

    async fn create_auth_session(
        &self,
        session_id: &str,
        address: &Principal,
        expires_at: DateTime<Utc>,
    ) -> PortResult<()> {
        sqlx::query(
            "INSERT INTO auth_sessions (id, address, expires_at) VALUES ($1, $2, $3)",
        )
        .bind(session_id)
        .bind(address.as_str())
        .bind(expires_at)
        .execute(&self.pool)
        .await
        .map_err(|e| PortError::Unexpected(e.to_string()))?;
        Ok(())
    }

    async fn validate_auth_session(&self, session_id: &str) -> PortResult<Principal> {
        let record = sqlx::query_as::<_, AuthSessionRecord>(
            "SELECT address FROM auth_sessions WHERE id = $1 AND expires_at > NOW()",
        )
        .bind(session_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::RowNotFound => PortError::Unauthorized,
            _ => PortError::Unexpected(e.to_string()),
        })?;

        record
            .address
            .parse::<Principal>()
            .map_err(|e| PortError::Unexpected(e.to_string()))
    }

    async fn delete_auth_session(&self, session_id: &str) -> PortResult<()> {
        sqlx::query("DELETE FROM auth_sessions WHERE id = $1")
            .bind(session_id)
            .execute(&self.pool)
            .await
            .map_err(|e| PortError::Unexpected(e.to_string()))?;
        Ok(())
    }

    async fn record_mint_receipt(&self, receipt: MintReceipt) -> PortResult<()> {
        sqlx::query(
            "INSERT INTO mint_receipts (id, address, course_id, token_id, tx_id, metadata_hash, created_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7)",
        )
        .bind(receipt.id)
        .bind(receipt.address.as_str())
        .bind(receipt.course_id as i64)
        .bind(receipt.token_id as i64)
        .bind(receipt.tx_id.0)
        .bind(receipt.metadata_hash)
        .bind(receipt.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| PortError::Unexpected(e.to_string()))?;
        Ok(())
    }

    async fn get_mint_receipts_for_user(
        &self,
        address: &Principal,
    ) -> PortResult<Vec<MintReceipt>> {
        let records = sqlx::query_as::<_, MintReceiptRecord>(
            "SELECT id, address, course_id, token_id, tx_id, metadata_hash, created_at
             FROM mint_receipts WHERE address = $1 ORDER BY created_at",
        )
        .bind(address.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| PortError::Unexpected(e.to_string()))?;

        records.into_iter().map(|r| r.to_domain()).collect()
    }
}
