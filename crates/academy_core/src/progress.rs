//! crates/academy_core/src/progress.rs
//!
//! The progress-tracker contract: a keyed-map state machine recording
//! one-time module completions, awarding points, and maintaining per-student
//! streaks and skill levels. Mirrors the semantics of the deployed
//! `progress-tracker` contract, including its numeric error codes.

use std::collections::BTreeMap;

use crate::domain::{
    CompletionReceipt, ContractError, CourseModule, CourseProgress, ModuleCompletion, Principal,
    SkillLevel, TotalStats, UserProgress,
};

/// The progress-tracker state machine.
///
/// All write operations perform their guard checks before touching any map,
/// so a returned error implies no state change. The machine keeps its own
/// monotonically increasing block height, advanced on each successful write.
#[derive(Debug, Clone)]
pub struct ProgressTracker {
    owner: Principal,
    block_height: u64,
    modules: BTreeMap<u64, CourseModule>,
    completions: BTreeMap<(Principal, u64), ModuleCompletion>,
    progress: BTreeMap<Principal, UserProgress>,
    stats: TotalStats,
}

impl ProgressTracker {
    /// Creates an empty tracker owned by the given administrative principal.
    pub fn new(owner: Principal) -> Self {
        Self {
            owner,
            block_height: 1,
            modules: BTreeMap::new(),
            completions: BTreeMap::new(),
            progress: BTreeMap::new(),
            stats: TotalStats::default(),
        }
    }

    pub fn owner(&self) -> &Principal {
        &self.owner
    }

    pub fn block_height(&self) -> u64 {
        self.block_height
    }

    //=====================================================================================
    // Write Operations
    //=====================================================================================

    /// Registers a new module. Administrative-only; duplicate ids rejected.
    #[allow(clippy::too_many_arguments)]
    pub fn create_module(
        &mut self,
        caller: &Principal,
        module_id: u64,
        course_id: u64,
        name: &str,
        description: &str,
        points_reward: u64,
        difficulty: u32,
        estimated_minutes: u32,
    ) -> Result<u64, ContractError> {
        if caller != &self.owner {
            return Err(ContractError::OwnerOnly);
        }
        if self.modules.contains_key(&module_id) {
            return Err(ContractError::AlreadyExists);
        }

        self.modules.insert(
            module_id,
            CourseModule {
                id: module_id,
                course_id,
                name: name.to_string(),
                description: description.to_string(),
                points_reward,
                difficulty,
                estimated_minutes,
            },
        );
        self.block_height += 1;
        Ok(module_id)
    }

    /// Records a one-time completion of `module_id` by `caller`.
    ///
    /// Awards the module's points, increments the streak, recomputes the
    /// skill level, and appends the module to the caller's completed set.
    pub fn complete_module(
        &mut self,
        caller: &Principal,
        module_id: u64,
        time_spent_minutes: u32,
        score: u32,
    ) -> Result<CompletionReceipt, ContractError> {
        let points_reward = self
            .modules
            .get(&module_id)
            .map(|m| m.points_reward)
            .ok_or(ContractError::NotFound)?;

        let key = (caller.clone(), module_id);
        if self.completions.contains_key(&key) {
            return Err(ContractError::AlreadyCompleted);
        }

        // Guards passed; every mutation below must succeed together.
        let is_new_student = !self.progress.contains_key(caller);

        self.completions.insert(
            key,
            ModuleCompletion {
                time_spent_minutes,
                score,
                attempts: 1,
                completed_at_height: self.block_height,
            },
        );

        let entry = self.progress.entry(caller.clone()).or_default();
        entry.total_points += points_reward;
        entry.current_streak += 1;
        entry.skill_level = SkillLevel::from_points(entry.total_points);
        entry.completed_modules.push(module_id);

        let receipt = CompletionReceipt {
            points_earned: points_reward,
            new_total_points: entry.total_points,
            streak: entry.current_streak,
        };

        if is_new_student {
            self.stats.total_students += 1;
        }
        self.stats.total_completions += 1;
        self.block_height += 1;

        Ok(receipt)
    }

    //=====================================================================================
    // Read-only Operations
    //=====================================================================================

    pub fn get_module(&self, module_id: u64) -> Option<&CourseModule> {
        self.modules.get(&module_id)
    }

    /// Returns the student's aggregate, or the empty default if the student
    /// has never completed anything.
    pub fn get_user_progress(&self, student: &Principal) -> UserProgress {
        self.progress.get(student).cloned().unwrap_or_default()
    }

    /// Counts the course's modules and how many of them the student has
    /// completed. The percentage is floor(completed / total * 100).
    pub fn get_course_progress(&self, course_id: u64, student: &Principal) -> CourseProgress {
        let total = self
            .modules
            .values()
            .filter(|m| m.course_id == course_id)
            .count() as u64;
        let completed = self
            .modules
            .values()
            .filter(|m| m.course_id == course_id)
            .filter(|m| {
                self.completions
                    .contains_key(&(student.clone(), m.id))
            })
            .count() as u64;
        let percentage = if total == 0 { 0 } else { completed * 100 / total };

        CourseProgress {
            total_modules: total,
            completed_modules: completed,
            completion_percentage: percentage,
        }
    }

    pub fn has_completed_module(&self, module_id: u64, student: &Principal) -> bool {
        self.completions
            .contains_key(&(student.clone(), module_id))
    }

    pub fn get_module_completion(
        &self,
        module_id: u64,
        student: &Principal,
    ) -> Option<&ModuleCompletion> {
        self.completions.get(&(student.clone(), module_id))
    }

    pub fn get_total_stats(&self) -> TotalStats {
        self.stats
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

    fn tracker_with_module(points: u64) -> ProgressTracker {
        let mut tracker = ProgressTracker::new(deployer());
        tracker
            .create_module(
                &deployer(),
                1,
                1,
                "Introduction to Clarity",
                "Learn the basics of Clarity syntax",
                points,
                1,
                60,
            )
            .unwrap();
        tracker
    }

    #[test]
    fn can_create_a_new_module() {
        let mut tracker = ProgressTracker::new(deployer());
        let id = tracker
            .create_module(&deployer(), 1, 1, "Module 1", "First module", 10, 1, 60)
            .unwrap();
        assert_eq!(id, 1);
        assert_eq!(tracker.get_module(1).unwrap().points_reward, 10);
    }

    #[test]
    fn only_owner_can_create_modules() {
        let mut tracker = ProgressTracker::new(deployer());
        let err = tracker
            .create_module(&wallet_1(), 1, 1, "Module 1", "First module", 10, 1, 60)
            .unwrap_err();
        assert_eq!(err, ContractError::OwnerOnly);
        assert_eq!(err.code(), 100);
        // Guard failure leaves no state behind.
        assert!(tracker.get_module(1).is_none());
    }

    #[test]
    fn duplicate_module_ids_are_rejected() {
        let mut tracker = tracker_with_module(10);
        let err = tracker
            .create_module(&deployer(), 1, 2, "Other", "Other", 99, 1, 30)
            .unwrap_err();
        assert_eq!(err, ContractError::AlreadyExists);
        // The original module is untouched.
        assert_eq!(tracker.get_module(1).unwrap().points_reward, 10);
    }

    #[test]
    fn can_complete_a_module_and_track_progress() {
        let mut tracker = tracker_with_module(10);
        let receipt = tracker.complete_module(&wallet_1(), 1, 45, 95).unwrap();
        assert_eq!(
            receipt,
            CompletionReceipt {
                points_earned: 10,
                new_total_points: 10,
                streak: 1,
            }
        );
    }

    #[test]
    fn cannot_complete_the_same_module_twice() {
        let mut tracker = tracker_with_module(10);
        tracker.complete_module(&wallet_1(), 1, 45, 95).unwrap();

        // The second attempt fails regardless of its argument values.
        let err = tracker.complete_module(&wallet_1(), 1, 30, 100).unwrap_err();
        assert_eq!(err, ContractError::AlreadyCompleted);
        assert_eq!(err.code(), 102);

        // The first completion record is preserved unchanged.
        let completion = tracker.get_module_completion(1, &wallet_1()).unwrap();
        assert_eq!(completion.time_spent_minutes, 45);
        assert_eq!(completion.score, 95);
        assert_eq!(completion.attempts, 1);

        // And the aggregate was not double-counted.
        let progress = tracker.get_user_progress(&wallet_1());
        assert_eq!(progress.total_points, 10);
    }

    #[test]
    fn completing_an_unknown_module_fails() {
        let mut tracker = ProgressTracker::new(deployer());
        let err = tracker.complete_module(&wallet_1(), 42, 10, 80).unwrap_err();
        assert_eq!(err, ContractError::NotFound);
    }

    #[test]
    fn points_accumulate_as_the_sum_of_rewards_order_independent() {
        let rewards = [(1u64, 10u64), (2, 15), (3, 25)];

        // Complete in two different orders; totals must agree.
        for order in [[0usize, 1, 2], [2, 0, 1]] {
            let mut tracker = ProgressTracker::new(deployer());
            for (id, reward) in rewards {
                tracker
                    .create_module(&deployer(), id, 1, "m", "m", reward, 1, 60)
                    .unwrap();
            }
            for i in order {
                let (id, _) = rewards[i];
                tracker.complete_module(&wallet_1(), id, 45, 95).unwrap();
            }
            let progress = tracker.get_user_progress(&wallet_1());
            assert_eq!(progress.total_points, 50);
            assert_eq!(progress.completed_modules.len(), 3);
        }
    }

    #[test]
    fn streak_increments_per_completion() {
        let mut tracker = ProgressTracker::new(deployer());
        for id in 1..=3 {
            tracker
                .create_module(&deployer(), id, 1, "m", "m", 10, 1, 60)
                .unwrap();
        }
        for (i, id) in (1..=3).enumerate() {
            let receipt = tracker.complete_module(&wallet_1(), id, 45, 95).unwrap();
            assert_eq!(receipt.streak, i as u32 + 1);
        }
    }

    #[test]
    fn skill_level_rises_with_points() {
        let mut tracker = ProgressTracker::new(deployer());
        tracker
            .create_module(&deployer(), 1, 1, "m", "m", 25, 1, 60)
            .unwrap();
        tracker
            .create_module(&deployer(), 2, 1, "m", "m", 90, 2, 60)
            .unwrap();

        tracker.complete_module(&wallet_1(), 1, 45, 95).unwrap();
        // Still beginner with 25 points.
        assert_eq!(
            tracker.get_user_progress(&wallet_1()).skill_level,
            SkillLevel::Beginner
        );

        tracker.complete_module(&wallet_1(), 2, 45, 95).unwrap();
        assert_eq!(
            tracker.get_user_progress(&wallet_1()).skill_level,
            SkillLevel::Intermediate
        );
    }

    #[test]
    fn course_progress_uses_floor_percentage() {
        let mut tracker = ProgressTracker::new(deployer());
        for id in 1..=3 {
            tracker
                .create_module(&deployer(), id, 1, "m", "m", 10, 1, 60)
                .unwrap();
        }
        tracker.complete_module(&wallet_1(), 1, 45, 95).unwrap();

        let progress = tracker.get_course_progress(1, &wallet_1());
        assert_eq!(progress.total_modules, 3);
        assert_eq!(progress.completed_modules, 1);
        // 1/3 * 100 = 33, not 34.
        assert_eq!(progress.completion_percentage, 33);
    }

    #[test]
    fn course_progress_for_empty_course_is_zero() {
        let tracker = ProgressTracker::new(deployer());
        let progress = tracker.get_course_progress(7, &wallet_1());
        assert_eq!(
            progress,
            CourseProgress {
                total_modules: 0,
                completed_modules: 0,
                completion_percentage: 0,
            }
        );
    }

    #[test]
    fn modules_of_other_courses_do_not_count() {
        let mut tracker = ProgressTracker::new(deployer());
        tracker
            .create_module(&deployer(), 1, 1, "m", "m", 10, 1, 60)
            .unwrap();
        tracker
            .create_module(&deployer(), 2, 2, "m", "m", 10, 1, 60)
            .unwrap();
        tracker.complete_module(&wallet_1(), 2, 45, 95).unwrap();

        let progress = tracker.get_course_progress(1, &wallet_1());
        assert_eq!(progress.total_modules, 1);
        assert_eq!(progress.completed_modules, 0);
        assert_eq!(progress.completion_percentage, 0);
    }

    #[test]
    fn unknown_student_gets_the_empty_default() {
        let tracker = ProgressTracker::new(deployer());
        let progress = tracker.get_user_progress(&wallet_1());
        assert_eq!(progress.total_points, 0);
        assert_eq!(progress.current_streak, 0);
        assert_eq!(progress.skill_level, SkillLevel::Beginner);
        assert!(progress.completed_modules.is_empty());
    }

    #[test]
    fn can_check_module_completion_status() {
        let mut tracker = tracker_with_module(10);
        assert!(!tracker.has_completed_module(1, &wallet_1()));
        tracker.complete_module(&wallet_1(), 1, 45, 95).unwrap();
        assert!(tracker.has_completed_module(1, &wallet_1()));
        // Completion is per principal.
        assert!(!tracker.has_completed_module(1, &wallet_2()));
    }

    #[test]
    fn total_stats_count_distinct_students_and_all_completions() {
        let mut tracker = tracker_with_module(10);
        tracker
            .create_module(&deployer(), 2, 1, "m", "m", 15, 2, 90)
            .unwrap();

        tracker.complete_module(&wallet_1(), 1, 45, 95).unwrap();
        tracker.complete_module(&wallet_1(), 2, 75, 88).unwrap();
        tracker.complete_module(&wallet_2(), 1, 50, 88).unwrap();

        let stats = tracker.get_total_stats();
        assert_eq!(stats.total_students, 2);
        assert_eq!(stats.total_completions, 3);
    }
}
