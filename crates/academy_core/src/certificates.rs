//! crates/academy_core/src/certificates.rs
//!
//! The certificate-registry contract: non-fungible certificate tokens with
//! sequential ids, one per (student, course), mintable only by the
//! administrative principal and transferable by their current owner.

use std::collections::BTreeMap;

use crate::domain::{Certificate, ContractError, Course, Principal, SkillLevel};

/// The certificate-registry state machine.
///
/// Same discipline as the progress tracker: all guards run before any
/// mutation, errors are typed and numeric, token ids are assigned
/// sequentially starting at 1.
#[derive(Debug, Clone)]
pub struct CertificateRegistry {
    owner: Principal,
    block_height: u64,
    next_token_id: u64,
    courses: BTreeMap<u64, Course>,
    certificates: BTreeMap<u64, Certificate>,
    owners: BTreeMap<u64, Principal>,
}

impl CertificateRegistry {
    /// Creates an empty registry owned by the given administrative principal.
    pub fn new(owner: Principal) -> Self {
        Self {
            owner,
            block_height: 1,
            next_token_id: 1,
            courses: BTreeMap::new(),
            certificates: BTreeMap::new(),
            owners: BTreeMap::new(),
        }
    }

    pub fn owner(&self) -> &Principal {
        &self.owner
    }

    //=====================================================================================
    // Write Operations
    //=====================================================================================

    /// Registers a new course. Administrative-only; duplicate ids rejected.
    pub fn create_course(
        &mut self,
        caller: &Principal,
        course_id: u64,
        name: &str,
        description: &str,
        difficulty: u32,
    ) -> Result<u64, ContractError> {
        if caller != &self.owner {
            return Err(ContractError::OwnerOnly);
        }
        if self.courses.contains_key(&course_id) {
            return Err(ContractError::AlreadyExists);
        }

        self.courses.insert(
            course_id,
            Course {
                id: course_id,
                name: name.to_string(),
                description: description.to_string(),
                difficulty,
            },
        );
        self.block_height += 1;
        Ok(course_id)
    }

    /// Mints a certificate for `recipient`. Administrative-only; at most
    /// one certificate per (recipient, course) pair.
    pub fn mint_certificate(
        &mut self,
        caller: &Principal,
        recipient: &Principal,
        course_id: u64,
        skill_level: SkillLevel,
        metadata_hash: &str,
    ) -> Result<u64, ContractError> {
        if caller != &self.owner {
            return Err(ContractError::OwnerOnly);
        }
        if !self.courses.contains_key(&course_id) {
            return Err(ContractError::NotFound);
        }
        if self.has_completed_course(course_id, recipient) {
            return Err(ContractError::AlreadyCertified);
        }

        let token_id = self.next_token_id;
        self.certificates.insert(
            token_id,
            Certificate {
                token_id,
                course_id,
                student: recipient.clone(),
                skill_level,
                metadata_hash: metadata_hash.to_string(),
                issued_at_height: self.block_height,
            },
        );
        self.owners.insert(token_id, recipient.clone());
        self.next_token_id += 1;
        self.block_height += 1;
        Ok(token_id)
    }

    /// Standard NFT transfer: the caller must be `sender`, and `sender`
    /// must currently own the token.
    pub fn transfer(
        &mut self,
        caller: &Principal,
        token_id: u64,
        sender: &Principal,
        recipient: &Principal,
    ) -> Result<(), ContractError> {
        let current_owner = self.owners.get(&token_id).ok_or(ContractError::NotFound)?;
        if caller != sender || current_owner != sender {
            return Err(ContractError::NotTokenOwner);
        }

        self.owners.insert(token_id, recipient.clone());
        self.block_height += 1;
        Ok(())
    }

    //=====================================================================================
    // Read-only Operations
    //=====================================================================================

    pub fn get_course(&self, course_id: u64) -> Option<&Course> {
        self.courses.get(&course_id)
    }

    pub fn get_owner(&self, token_id: u64) -> Option<&Principal> {
        self.owners.get(&token_id)
    }

    pub fn get_certificate_data(&self, token_id: u64) -> Option<&Certificate> {
        self.certificates.get(&token_id)
    }

    /// All token ids currently owned by `student`, by a full scan.
    pub fn get_student_certificates(&self, student: &Principal) -> Vec<u64> {
        self.owners
            .iter()
            .filter(|(_, owner)| *owner == student)
            .map(|(token_id, _)| *token_id)
            .collect()
    }

    /// True iff any certificate was minted for this (student, course) pair.
    /// Keyed on the original recipient, not the current owner, so a
    /// transferred certificate still blocks a duplicate mint.
    pub fn has_completed_course(&self, course_id: u64, student: &Principal) -> bool {
        self.certificates
            .values()
            .any(|c| c.course_id == course_id && &c.student == student)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn deployer() -> Principal {
        "ST1PQHQKV0RJXZFY1DGX8MNSNYVE3VGZJSRTPGZGM".parse().unwrap()
    }

    fn wallet_1() -> Principal {
        "ST1SJ3DTE5DN7X54YDH5D64R3BCB6A2AG2ZQ8YPD5".parse().unwrap()
    }

    fn wallet_2() -> Principal {
        "ST2CY5V39NHDPWSXMW9QDT3HC3GD6Q6XX4CFRK9AG".parse().unwrap()
    }

    fn registry_with_course() -> CertificateRegistry {
        let mut registry = CertificateRegistry::new(deployer());
        registry
            .create_course(
                &deployer(),
                1,
                "Hello Clarity",
                "Learn the basics of Clarity smart contract language",
                1,
            )
            .unwrap();
        registry
    }

    #[test]
    fn can_create_a_new_course() {
        let registry = registry_with_course();
        assert_eq!(registry.get_course(1).unwrap().name, "Hello Clarity");
    }

    #[test]
    fn only_owner_can_create_courses() {
        let mut registry = CertificateRegistry::new(deployer());
        let err = registry
            .create_course(&wallet_1(), 1, "Hello Clarity", "desc", 1)
            .unwrap_err();
        assert_eq!(err, ContractError::OwnerOnly);
        assert!(registry.get_course(1).is_none());
    }

    #[test]
    fn duplicate_course_ids_are_rejected() {
        let mut registry = registry_with_course();
        let err = registry
            .create_course(&deployer(), 1, "Other", "desc", 2)
            .unwrap_err();
        assert_eq!(err, ContractError::AlreadyExists);
        assert_eq!(registry.get_course(1).unwrap().name, "Hello Clarity");
    }

    #[test]
    fn can_mint_certificate_for_completed_course() {
        let mut registry = registry_with_course();
        let token_id = registry
            .mint_certificate(
                &deployer(),
                &wallet_1(),
                1,
                SkillLevel::Beginner,
                "QmHash123456789",
            )
            .unwrap();
        assert_eq!(token_id, 1);

        let cert = registry.get_certificate_data(1).unwrap();
        assert_eq!(cert.course_id, 1);
        assert_eq!(cert.student, wallet_1());
        assert_eq!(cert.skill_level, SkillLevel::Beginner);
        assert_eq!(cert.metadata_hash, "QmHash123456789");
        assert_eq!(registry.get_owner(1), Some(&wallet_1()));
    }

    #[test]
    fn token_ids_are_sequential() {
        let mut registry = registry_with_course();
        registry
            .create_course(&deployer(), 2, "Your First DApp", "desc", 2)
            .unwrap();

        let first = registry
            .mint_certificate(&deployer(), &wallet_1(), 1, SkillLevel::Beginner, "a")
            .unwrap();
        let second = registry
            .mint_certificate(&deployer(), &wallet_2(), 1, SkillLevel::Beginner, "b")
            .unwrap();
        let third = registry
            .mint_certificate(&deployer(), &wallet_1(), 2, SkillLevel::Intermediate, "c")
            .unwrap();
        assert_eq!((first, second, third), (1, 2, 3));
    }

    #[test]
    fn cannot_mint_duplicate_certificate_for_same_course() {
        let mut registry = registry_with_course();
        registry
            .mint_certificate(
                &deployer(),
                &wallet_1(),
                1,
                SkillLevel::Beginner,
                "QmHash123456789",
            )
            .unwrap();

        let err = registry
            .mint_certificate(
                &deployer(),
                &wallet_1(),
                1,
                SkillLevel::Beginner,
                "QmHash987654321",
            )
            .unwrap_err();
        assert_eq!(err, ContractError::AlreadyCertified);
        assert_eq!(err.code(), 103);

        // A single certificate exists for the pair.
        assert_eq!(registry.get_student_certificates(&wallet_1()), vec![1]);
    }

    #[test]
    fn only_owner_can_mint_certificates() {
        let mut registry = registry_with_course();
        let err = registry
            .mint_certificate(&wallet_2(), &wallet_1(), 1, SkillLevel::Beginner, "h")
            .unwrap_err();
        assert_eq!(err, ContractError::OwnerOnly);
        assert!(registry.get_certificate_data(1).is_none());
    }

    #[test]
    fn minting_for_unknown_course_fails() {
        let mut registry = CertificateRegistry::new(deployer());
        let err = registry
            .mint_certificate(&deployer(), &wallet_1(), 9, SkillLevel::Beginner, "h")
            .unwrap_err();
        assert_eq!(err, ContractError::NotFound);
    }

    #[test]
    fn transfer_succeeds_only_for_the_current_owner() {
        let mut registry = registry_with_course();
        registry
            .mint_certificate(&deployer(), &wallet_1(), 1, SkillLevel::Beginner, "h")
            .unwrap();

        // A third party cannot move the token, even naming the true owner.
        let err = registry
            .transfer(&wallet_2(), 1, &wallet_1(), &wallet_2())
            .unwrap_err();
        assert_eq!(err, ContractError::NotTokenOwner);
        assert_eq!(registry.get_owner(1), Some(&wallet_1()));

        // The owner can.
        registry
            .transfer(&wallet_1(), 1, &wallet_1(), &wallet_2())
            .unwrap();
        assert_eq!(registry.get_owner(1), Some(&wallet_2()));

        // The old owner can no longer transfer that token.
        let err = registry
            .transfer(&wallet_1(), 1, &wallet_1(), &wallet_1())
            .unwrap_err();
        assert_eq!(err, ContractError::NotTokenOwner);
    }

    #[test]
    fn transfer_of_unknown_token_fails() {
        let mut registry = registry_with_course();
        let err = registry
            .transfer(&wallet_1(), 5, &wallet_1(), &wallet_2())
            .unwrap_err();
        assert_eq!(err, ContractError::NotFound);
    }

    #[test]
    fn has_completed_course_tracks_the_original_recipient() {
        let mut registry = registry_with_course();
        assert!(!registry.has_completed_course(1, &wallet_1()));

        registry
            .mint_certificate(&deployer(), &wallet_1(), 1, SkillLevel::Beginner, "h")
            .unwrap();
        assert!(registry.has_completed_course(1, &wallet_1()));
        assert!(!registry.has_completed_course(1, &wallet_2()));

        // Transferring the token away does not reopen the duplicate guard.
        registry
            .transfer(&wallet_1(), 1, &wallet_1(), &wallet_2())
            .unwrap();
        assert!(registry.has_completed_course(1, &wallet_1()));
        let err = registry
            .mint_certificate(&deployer(), &wallet_1(), 1, SkillLevel::Beginner, "h2")
            .unwrap_err();
        assert_eq!(err, ContractError::AlreadyCertified);
    }

    #[test]
    fn student_certificates_follow_ownership() {
        let mut registry = registry_with_course();
        registry
            .create_course(&deployer(), 2, "Your First DApp", "desc", 2)
            .unwrap();
        registry
            .mint_certificate(&deployer(), &wallet_1(), 1, SkillLevel::Beginner, "a")
            .unwrap();
        registry
            .mint_certificate(&deployer(), &wallet_1(), 2, SkillLevel::Intermediate, "b")
            .unwrap();

        assert_eq!(registry.get_student_certificates(&wallet_1()), vec![1, 2]);

        registry
            .transfer(&wallet_1(), 1, &wallet_1(), &wallet_2())
            .unwrap();
        assert_eq!(registry.get_student_certificates(&wallet_1()), vec![2]);
        assert_eq!(registry.get_student_certificates(&wallet_2()), vec![1]);
    }
}
