//! crates/academy_core/src/domain.rs
//!
//! Defines the pure, core data structures for the academy platform.
//! These structs are independent of any database or serialization format.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};

//=========================================================================================
// Principals
//=========================================================================================

/// An account identity on the underlying ledger, used as the unit of
/// ownership and authorization. Addresses are c32-encoded and start with
/// `SP` (mainnet) or `ST` (testnet).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Principal(String);

/// Error returned when an address string is not a plausible principal.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Invalid principal address: {0}")]
pub struct InvalidPrincipal(pub String);

impl Principal {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Principal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for Principal {
    type Err = InvalidPrincipal;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let valid_prefix = s.starts_with("SP") || s.starts_with("ST");
        let valid_len = (28..=41).contains(&s.len());
        let valid_chars = s.chars().all(|c| c.is_ascii_alphanumeric());
        if valid_prefix && valid_len && valid_chars {
            Ok(Principal(s.to_string()))
        } else {
            Err(InvalidPrincipal(s.to_string()))
        }
    }
}

//=========================================================================================
// Contract Error Taxonomy
//=========================================================================================

/// Structured, numeric error codes returned by the contract layer.
/// Every guard failure maps to exactly one of these; no partial state
/// change ever accompanies an error.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ContractError {
    /// An administrative operation was invoked by a non-administrative principal.
    #[error("err u100: owner-only operation")]
    OwnerOnly,
    /// A referenced module, course, or token does not exist.
    #[error("err u101: not found")]
    NotFound,
    /// The calling principal has already completed this module.
    #[error("err u102: module already completed")]
    AlreadyCompleted,
    /// A certificate already exists for this (student, course) pair.
    #[error("err u103: already certified")]
    AlreadyCertified,
    /// A transfer was attempted by a principal that does not own the token.
    #[error("err u104: not token owner")]
    NotTokenOwner,
    /// A course or module with this id already exists.
    #[error("err u105: id already exists")]
    AlreadyExists,
}

impl ContractError {
    /// The numeric code carried on the wire, matching the deployed contracts.
    pub fn code(&self) -> u32 {
        match self {
            ContractError::OwnerOnly => 100,
            ContractError::NotFound => 101,
            ContractError::AlreadyCompleted => 102,
            ContractError::AlreadyCertified => 103,
            ContractError::NotTokenOwner => 104,
            ContractError::AlreadyExists => 105,
        }
    }
}

//=========================================================================================
// Catalog Entities (administrative, immutable once created)
//=========================================================================================

/// A course offered by the academy. Created once by the administrative
/// principal; immutable thereafter.
#[derive(Debug, Clone)]
pub struct Course {
    pub id: u64,
    pub name: String,
    pub description: String,
    pub difficulty: u32,
}

/// A single learning module belonging to a course.
#[derive(Debug, Clone)]
pub struct CourseModule {
    pub id: u64,
    pub course_id: u64,
    pub name: String,
    pub description: String,
    pub points_reward: u64,
    pub difficulty: u32,
    pub estimated_minutes: u32,
}

//=========================================================================================
// Student-facing State
//=========================================================================================

/// A coarse tier derived from accumulated points. Monotonic in points.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum SkillLevel {
    Beginner,
    Intermediate,
    Advanced,
    Expert,
}

impl SkillLevel {
    /// The step function mapping accumulated points to a tier.
    pub fn from_points(points: u64) -> Self {
        match points {
            0..=99 => SkillLevel::Beginner,
            100..=249 => SkillLevel::Intermediate,
            250..=499 => SkillLevel::Advanced,
            _ => SkillLevel::Expert,
        }
    }

    pub fn as_u32(&self) -> u32 {
        match self {
            SkillLevel::Beginner => 1,
            SkillLevel::Intermediate => 2,
            SkillLevel::Advanced => 3,
            SkillLevel::Expert => 4,
        }
    }

    /// Reverse of `as_u32`, for values coming off the wire.
    pub fn from_u32(value: u32) -> Option<Self> {
        match value {
            1 => Some(SkillLevel::Beginner),
            2 => Some(SkillLevel::Intermediate),
            3 => Some(SkillLevel::Advanced),
            4 => Some(SkillLevel::Expert),
            _ => None,
        }
    }
}

impl fmt::Display for SkillLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SkillLevel::Beginner => "Beginner",
            SkillLevel::Intermediate => "Intermediate",
            SkillLevel::Advanced => "Advanced",
            SkillLevel::Expert => "Expert",
        };
        f.write_str(name)
    }
}

/// A record of one student completing one module. Keyed by
/// (student, module); created at most once and never deleted.
#[derive(Debug, Clone)]
pub struct ModuleCompletion {
    pub time_spent_minutes: u32,
    pub score: u32,
    pub attempts: u32,
    pub completed_at_height: u64,
}

/// Per-student aggregate, mutated only as a side effect of a successful
/// module completion.
#[derive(Debug, Clone)]
pub struct UserProgress {
    pub total_points: u64,
    pub current_streak: u32,
    pub skill_level: SkillLevel,
    pub completed_modules: Vec<u64>,
}

impl Default for UserProgress {
    fn default() -> Self {
        Self {
            total_points: 0,
            current_streak: 0,
            skill_level: SkillLevel::Beginner,
            completed_modules: Vec::new(),
        }
    }
}

/// The result returned to a student from a successful module completion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletionReceipt {
    pub points_earned: u64,
    pub new_total_points: u64,
    pub streak: u32,
}

/// A student's progress within one course.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CourseProgress {
    pub total_modules: u64,
    pub completed_modules: u64,
    /// floor(completed / total * 100); 0 when the course has no modules.
    pub completion_percentage: u64,
}

/// Global counters across all students.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TotalStats {
    pub total_students: u64,
    pub total_completions: u64,
}

//=========================================================================================
// Certificates
//=========================================================================================

/// A minted certificate token. At most one exists per (student, course).
#[derive(Debug, Clone)]
pub struct Certificate {
    pub token_id: u64,
    pub course_id: u64,
    pub student: Principal,
    pub skill_level: SkillLevel,
    /// Content address of the off-chain metadata record.
    pub metadata_hash: String,
    pub issued_at_height: u64,
}

//=========================================================================================
// Ledger Transactions
//=========================================================================================

/// An opaque identifier for a submitted ledger transaction.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TxId(pub String);

impl fmt::Display for TxId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The observed state of a submitted transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxStatus {
    Pending,
    Confirmed,
    Failed,
}

/// Which ledger network the service targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Network {
    Testnet,
    Mainnet,
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Network::Testnet => f.write_str("testnet"),
            Network::Mainnet => f.write_str("mainnet"),
        }
    }
}

impl FromStr for Network {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "testnet" => Ok(Network::Testnet),
            "mainnet" => Ok(Network::Mainnet),
            other => Err(format!("'{}' is not a valid network", other)),
        }
    }
}

//=========================================================================================
// Users and Auth Sessions (service-side, not contract state)
//=========================================================================================

/// Represents a wallet identity that has connected to the service.
#[derive(Debug, Clone)]
pub struct User {
    pub address: Principal,
    pub bns_name: Option<String>,
}

// Represents a browser login session (auth cookie)
#[derive(Debug, Clone)]
pub struct AuthSession {
    pub id: String,
    pub address: Principal,
    pub expires_at: DateTime<Utc>,
}

/// An audit record written after a certificate mint confirms.
#[derive(Debug, Clone)]
pub struct MintReceipt {
    pub id: uuid::Uuid,
    pub address: Principal,
    pub course_id: u64,
    pub token_id: u64,
    pub tx_id: TxId,
    pub metadata_hash: String,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn principal_accepts_wellformed_addresses() {
        let p = "ST1PQHQKV0RJXZFY1DGX8MNSNYVE3VGZJSRTPGZGM"
            .parse::<Principal>()
            .unwrap();
        assert_eq!(p.as_str(), "ST1PQHQKV0RJXZFY1DGX8MNSNYVE3VGZJSRTPGZGM");
        assert!("SP2J6ZY48GV1EZ5V2V5RB9MP66SW86PYKKNRV9EJ7"
            .parse::<Principal>()
            .is_ok());
    }

    #[test]
    fn principal_rejects_garbage() {
        assert!("".parse::<Principal>().is_err());
        assert!("hello".parse::<Principal>().is_err());
        assert!("XX1PQHQKV0RJXZFY1DGX8MNSNYVE3VGZJSRTPGZGM"
            .parse::<Principal>()
            .is_err());
        // Embedded punctuation is not c32.
        assert!("ST1PQHQKV0RJXZFY1DGX8MNSNYVE3VGZJSRT.GZG"
            .parse::<Principal>()
            .is_err());
    }

    #[test]
    fn skill_level_is_a_monotonic_step_function() {
        assert_eq!(SkillLevel::from_points(0), SkillLevel::Beginner);
        assert_eq!(SkillLevel::from_points(99), SkillLevel::Beginner);
        assert_eq!(SkillLevel::from_points(100), SkillLevel::Intermediate);
        assert_eq!(SkillLevel::from_points(249), SkillLevel::Intermediate);
        assert_eq!(SkillLevel::from_points(250), SkillLevel::Advanced);
        assert_eq!(SkillLevel::from_points(500), SkillLevel::Expert);

        let mut last = SkillLevel::Beginner;
        for points in 0..1000 {
            let level = SkillLevel::from_points(points);
            assert!(level >= last);
            last = level;
        }
    }

    #[test]
    fn contract_error_codes_match_the_deployed_contracts() {
        assert_eq!(ContractError::OwnerOnly.code(), 100);
        assert_eq!(ContractError::NotFound.code(), 101);
        assert_eq!(ContractError::AlreadyCompleted.code(), 102);
        assert_eq!(ContractError::AlreadyCertified.code(), 103);
        assert_eq!(ContractError::NotTokenOwner.code(), 104);
        assert_eq!(ContractError::AlreadyExists.code(), 105);
    }
}
