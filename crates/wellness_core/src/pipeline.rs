//! crates/wellness_core/src/pipeline.rs
//!
//! The plan generation/regeneration pipeline, composed over the ports:
//!
//!   quota check -> profile assembly -> generation -> validation -> commit
//!
//! Quota is charged exclusively by a successful commit (the store performs a
//! single conditional increment inside the commit transaction), so failed
//! generations and invalid drafts never burn a regeneration slot, and an
//! abandoned request cannot be charged for work that never committed.

use chrono::NaiveDate;
use uuid::Uuid;

use crate::domain::{
    DietAnswers, DietCommit, DraftProgram, PlanKind, ProgramCommit, QuotaStatus, TodayDietView,
    WorkoutAnswers,
};
use crate::ports::{PlanGenerationService, PlanStore, PortError, PortResult};
use crate::profile::assemble_profile;
use crate::projection::project_diet_today;
use crate::validate::{validate_diet, validate_program};

/// Outcome of a generation that stopped at the draft stage (nothing
/// persisted, quota untouched).
#[derive(Debug, Clone)]
pub struct ProgramDraftOutcome {
    pub draft: DraftProgram,
    pub quota: QuotaStatus,
    pub warnings: Vec<String>,
}

/// Outcome of a committed training plan.
#[derive(Debug, Clone)]
pub struct ProgramOutcome {
    pub commit: ProgramCommit,
    pub quota: QuotaStatus,
    pub warnings: Vec<String>,
}

/// Outcome of a committed diet plan. Carries the plan as persisted so the
/// caller can show it without a follow-up read.
#[derive(Debug, Clone)]
pub struct DietOutcome {
    pub commit: DietCommit,
    pub plan: TodayDietView,
    pub quota: QuotaStatus,
    pub warnings: Vec<String>,
}

fn check_quota(quota: QuotaStatus) -> PortResult<QuotaStatus> {
    if quota.exhausted() {
        Err(PortError::QuotaExceeded {
            used: quota.used,
            max: quota.max,
        })
    } else {
        Ok(quota)
    }
}

/// Generates a training draft without committing it.
///
/// The quota is pre-checked so a user with no slots left is refused before
/// the expensive model call, but nothing is reserved: the charge happens
/// only when the draft is committed.
pub async fn draft_program(
    store: &dyn PlanStore,
    generator: &dyn PlanGenerationService,
    user_id: Uuid,
    answers: &WorkoutAnswers,
    today: NaiveDate,
) -> PortResult<ProgramDraftOutcome> {
    let quota = check_quota(store.quota_status(user_id, today).await?)?;

    let profile = store.get_profile(user_id).await?;
    let assembled = assemble_profile(profile, today, PlanKind::Training);
    let warnings = assembled.warnings.clone();

    let draft = generator.generate_program(&assembled, answers).await?;

    Ok(ProgramDraftOutcome {
        draft,
        quota,
        warnings,
    })
}

/// Validates and commits a training draft, charging one regeneration slot.
///
/// The store's commit is transactional: either the full program, workouts,
/// exercises, assignment flip, and quota increment land together, or none do.
pub async fn commit_program_draft(
    store: &dyn PlanStore,
    user_id: Uuid,
    draft: DraftProgram,
    today: NaiveDate,
) -> PortResult<ProgramOutcome> {
    let validated = validate_program(draft)?;
    let commit = store.commit_program(user_id, &validated, today).await?;
    let quota = store.quota_status(user_id, today).await?;

    Ok(ProgramOutcome {
        commit,
        quota,
        warnings: Vec::new(),
    })
}

/// The full training pipeline: draft then commit in one request.
pub async fn regenerate_program(
    store: &dyn PlanStore,
    generator: &dyn PlanGenerationService,
    user_id: Uuid,
    answers: &WorkoutAnswers,
    today: NaiveDate,
) -> PortResult<ProgramOutcome> {
    let drafted = draft_program(store, generator, user_id, answers, today).await?;
    let mut outcome = commit_program_draft(store, user_id, drafted.draft, today).await?;
    outcome.warnings = drafted.warnings;
    Ok(outcome)
}

/// The full diet pipeline: generate, validate, upsert-commit, read back.
///
/// The outcome includes the committed plan's slot-keyed view so one request
/// both spends the slot and returns what it bought.
pub async fn regenerate_diet(
    store: &dyn PlanStore,
    generator: &dyn PlanGenerationService,
    user_id: Uuid,
    answers: &DietAnswers,
    today: NaiveDate,
) -> PortResult<DietOutcome> {
    check_quota(store.quota_status(user_id, today).await?)?;

    let profile = store.get_profile(user_id).await?;
    let assembled = assemble_profile(profile, today, PlanKind::Diet);
    let warnings = assembled.warnings.clone();

    let draft = generator.generate_diet(&assembled, answers).await?;
    let validated = validate_diet(draft)?;

    let commit = store.commit_diet(user_id, &validated, today).await?;
    let (plan, meals) = store.get_diet_plan(user_id).await?;
    let quota = store.quota_status(user_id, today).await?;

    Ok(DietOutcome {
        commit,
        plan: project_diet_today(&plan, &meals),
        quota,
        warnings,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{
        DietPlan, DraftDietPlan, DraftExercise, DraftIngredient, DraftMeal, DraftWorkout,
        Exercise, Ingredient, Intensity, MacrosTarget, Meal, MealSlot, ProgramAssignment,
        TrainingProgram, User, UserCredentials, UserProfile, Workout,
    };
    use crate::ports::PlanGenerationService;
    use crate::validate::{ValidatedDietPlan, ValidatedProgram};
    use async_trait::async_trait;
    use chrono::{DateTime, Utc};
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};

    const MAX_REGENS: i32 = 3;

    //-------------------------------------------------------------------------------------
    // Fake store: models the database's conditional quota increment under a
    // single lock, the way the SQL adapter models it with one UPDATE.
    //-------------------------------------------------------------------------------------

    #[derive(Default)]
    struct FakeState {
        quotas: HashMap<(Uuid, NaiveDate), i32>,
        committed_programs: Vec<(Uuid, usize, usize)>,
        diet_plans: HashMap<Uuid, (DietPlan, Vec<(Meal, Vec<Ingredient>)>)>,
    }

    #[derive(Default)]
    struct FakeStore {
        state: Mutex<FakeState>,
    }

    impl FakeStore {
        fn with_used(user_id: Uuid, day: NaiveDate, used: i32) -> Self {
            let store = Self::default();
            store.state.lock().unwrap().quotas.insert((user_id, day), used);
            store
        }

        fn used(&self, user_id: Uuid, day: NaiveDate) -> i32 {
            *self
                .state
                .lock()
                .unwrap()
                .quotas
                .get(&(user_id, day))
                .unwrap_or(&0)
        }
    }

    #[async_trait]
    impl PlanStore for FakeStore {
        async fn create_user_with_email(&self, _: &str, _: &str) -> PortResult<User> {
            Err(PortError::Unexpected("not used by pipeline tests".into()))
        }
        async fn get_user_by_email(&self, _: &str) -> PortResult<UserCredentials> {
            Err(PortError::Unexpected("not used by pipeline tests".into()))
        }
        async fn create_auth_session(
            &self,
            _: &str,
            _: Uuid,
            _: DateTime<Utc>,
        ) -> PortResult<()> {
            Err(PortError::Unexpected("not used by pipeline tests".into()))
        }
        async fn validate_auth_session(&self, _: &str) -> PortResult<Uuid> {
            Err(PortError::Unexpected("not used by pipeline tests".into()))
        }
        async fn delete_auth_session(&self, _: &str) -> PortResult<()> {
            Err(PortError::Unexpected("not used by pipeline tests".into()))
        }

        async fn get_profile(&self, user_id: Uuid) -> PortResult<UserProfile> {
            Ok(UserProfile {
                user_id,
                sex: None,
                height_cm: Some(180.0),
                weight_kg: Some(75.0),
                activity_level: None,
                primary_goal: None,
                dietary_preferences: vec![],
                allergies: vec![],
                birthdate: NaiveDate::from_ymd_opt(1990, 1, 1),
            })
        }

        async fn quota_status(&self, user_id: Uuid, day: NaiveDate) -> PortResult<QuotaStatus> {
            let mut state = self.state.lock().unwrap();
            let used = *state.quotas.entry((user_id, day)).or_insert(0);
            Ok(QuotaStatus {
                used,
                max: MAX_REGENS,
            })
        }

        async fn commit_program(
            &self,
            user_id: Uuid,
            plan: &ValidatedProgram,
            day: NaiveDate,
        ) -> PortResult<ProgramCommit> {
            let mut state = self.state.lock().unwrap();
            let used = state.quotas.entry((user_id, day)).or_insert(0);
            if *used >= MAX_REGENS {
                return Err(PortError::QuotaExceeded {
                    used: *used,
                    max: MAX_REGENS,
                });
            }
            *used += 1;

            let program_id = Uuid::new_v4();
            let commit = ProgramCommit {
                program_id,
                workouts_created: plan.workout_count(),
                exercises_created: plan.exercise_count(),
            };
            state
                .committed_programs
                .push((program_id, commit.workouts_created, commit.exercises_created));
            Ok(commit)
        }

        async fn commit_diet(
            &self,
            user_id: Uuid,
            plan: &ValidatedDietPlan,
            day: NaiveDate,
        ) -> PortResult<DietCommit> {
            let mut state = self.state.lock().unwrap();
            let used = state.quotas.entry((user_id, day)).or_insert(0);
            if *used >= MAX_REGENS {
                return Err(PortError::QuotaExceeded {
                    used: *used,
                    max: MAX_REGENS,
                });
            }
            *used += 1;

            let commit = DietCommit {
                diet_plan_id: Uuid::new_v4(),
                meals_created: plan.meal_count(),
                ingredients_created: plan.ingredient_count(),
            };

            // Upsert semantics: one plan per user, last writer wins. Stored
            // as the domain rows the reads hand back, like the SQL adapter.
            let draft = plan.draft();
            let stored_plan = DietPlan {
                id: commit.diet_plan_id,
                user_id,
                total_kcal: draft.total_kcal,
                macros_target: draft.macros_target,
                updated_at: Utc::now(),
            };
            let stored_meals = draft
                .meals
                .iter()
                .map(|m| {
                    let meal = Meal {
                        id: Uuid::new_v4(),
                        plan_id: commit.diet_plan_id,
                        slot: MealSlot::parse(&m.id).unwrap(),
                        title: m.title.clone(),
                        time_hint: m.time.clone(),
                        kcal: m.kcal,
                    };
                    let ingredients = m
                        .ingredients
                        .iter()
                        .map(|i| Ingredient {
                            id: Uuid::new_v4(),
                            meal_id: meal.id,
                            name: i.name.clone(),
                            amount: i.amount,
                            unit: i.unit.clone(),
                        })
                        .collect();
                    (meal, ingredients)
                })
                .collect();
            state.diet_plans.insert(user_id, (stored_plan, stored_meals));
            Ok(commit)
        }

        async fn get_active_program(
            &self,
            user_id: Uuid,
        ) -> PortResult<(TrainingProgram, ProgramAssignment)> {
            Err(PortError::NotFound(format!("no program for {user_id}")))
        }

        async fn get_program_workouts(
            &self,
            program_id: Uuid,
        ) -> PortResult<Vec<(Workout, Vec<Exercise>)>> {
            Err(PortError::NotFound(format!("no workouts for {program_id}")))
        }

        async fn get_diet_plan(
            &self,
            user_id: Uuid,
        ) -> PortResult<(DietPlan, Vec<(Meal, Vec<Ingredient>)>)> {
            self.state
                .lock()
                .unwrap()
                .diet_plans
                .get(&user_id)
                .cloned()
                .ok_or_else(|| PortError::NotFound(format!("no diet plan for {user_id}")))
        }
    }

    //-------------------------------------------------------------------------------------
    // Fake generator with programmable behavior
    //-------------------------------------------------------------------------------------

    #[derive(Clone)]
    enum Behavior {
        ReturnProgram(DraftProgram),
        ReturnDiet(DraftDietPlan),
        Fail,
    }

    struct FakeGenerator {
        behavior: Behavior,
    }

    #[async_trait]
    impl PlanGenerationService for FakeGenerator {
        async fn generate_program(
            &self,
            _: &crate::domain::AssembledProfile,
            _: &WorkoutAnswers,
        ) -> PortResult<DraftProgram> {
            match &self.behavior {
                Behavior::ReturnProgram(draft) => Ok(draft.clone()),
                _ => Err(PortError::GenerationFailed("provider unavailable".into())),
            }
        }

        async fn generate_diet(
            &self,
            _: &crate::domain::AssembledProfile,
            _: &DietAnswers,
        ) -> PortResult<DraftDietPlan> {
            match &self.behavior {
                Behavior::ReturnDiet(draft) => Ok(draft.clone()),
                _ => Err(PortError::GenerationFailed("provider unavailable".into())),
            }
        }
    }

    //-------------------------------------------------------------------------------------
    // Draft builders
    //-------------------------------------------------------------------------------------

    fn exercise(name: &str) -> DraftExercise {
        DraftExercise {
            name: name.to_string(),
            sets: 3,
            reps: "10".to_string(),
            rest_sec: 60,
            weight_hint: None,
            notes: None,
        }
    }

    fn program_draft(exercises_per_day: &[usize]) -> DraftProgram {
        DraftProgram {
            program_title: "Test Block".to_string(),
            goal: "general_fitness".to_string(),
            level: "beginner".to_string(),
            duration_weeks: 4,
            workouts: exercises_per_day
                .iter()
                .enumerate()
                .map(|(i, &count)| DraftWorkout {
                    day_number: i as i32 + 1,
                    title: format!("Day {}", i + 1),
                    exercises: (0..count).map(|e| exercise(&format!("Exercise {e}"))).collect(),
                })
                .collect(),
            final_note: None,
        }
    }

    fn diet_draft(kcal: i32) -> DraftDietPlan {
        DraftDietPlan {
            total_kcal: kcal,
            macros_target: MacrosTarget {
                protein_g: 150,
                carbs_g: 200,
                fat_g: 60,
            },
            meals: vec![DraftMeal {
                id: "breakfast".to_string(),
                title: "Oatmeal".to_string(),
                time: None,
                kcal,
                ingredients: vec![DraftIngredient {
                    name: "oats".to_string(),
                    amount: 80.0,
                    unit: "g".to_string(),
                }],
            }],
        }
    }

    fn answers() -> WorkoutAnswers {
        WorkoutAnswers {
            days_per_week: 3,
            minutes_per_session: 60,
            intensity: Intensity::Moderate,
            equipment: vec!["dumbbells".to_string()],
            extra_activities: vec![],
        }
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 5, 20).unwrap()
    }

    //-------------------------------------------------------------------------------------
    // Tests
    //-------------------------------------------------------------------------------------

    #[tokio::test]
    async fn scenario_full_pipeline_charges_exactly_one_slot() {
        let user = Uuid::new_v4();
        let store = FakeStore::with_used(user, today(), 2);
        let generator = FakeGenerator {
            behavior: Behavior::ReturnProgram(program_draft(&[2, 2])),
        };

        let outcome = regenerate_program(&store, &generator, user, &answers(), today())
            .await
            .unwrap();
        assert_eq!(outcome.quota.used, 3);
        assert_eq!(outcome.quota.remaining(), 0);

        // The next same-day attempt is refused before the model call.
        let err = regenerate_program(&store, &generator, user, &answers(), today())
            .await
            .unwrap_err();
        match err {
            PortError::QuotaExceeded { used, max } => {
                assert_eq!(used, 3);
                assert_eq!(max, 3);
            }
            other => panic!("expected QuotaExceeded, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn generation_failure_does_not_consume_quota() {
        let user = Uuid::new_v4();
        let store = FakeStore::with_used(user, today(), 1);
        let generator = FakeGenerator {
            behavior: Behavior::Fail,
        };

        let err = regenerate_program(&store, &generator, user, &answers(), today())
            .await
            .unwrap_err();
        assert!(matches!(err, PortError::GenerationFailed(_)));
        assert_eq!(store.used(user, today()), 1);
    }

    #[tokio::test]
    async fn invalid_draft_does_not_consume_quota_or_write_rows() {
        let user = Uuid::new_v4();
        let store = FakeStore::with_used(user, today(), 1);
        // Model returned a program with an empty workout list.
        let generator = FakeGenerator {
            behavior: Behavior::ReturnProgram(program_draft(&[])),
        };

        let err = regenerate_program(&store, &generator, user, &answers(), today())
            .await
            .unwrap_err();
        assert!(matches!(err, PortError::SchemaInvalid(_)));
        assert_eq!(store.used(user, today()), 1);
        assert!(store.state.lock().unwrap().committed_programs.is_empty());
    }

    #[tokio::test]
    async fn commit_counts_match_draft_shape() {
        let user = Uuid::new_v4();
        let store = FakeStore::default();
        let generator = FakeGenerator {
            behavior: Behavior::ReturnProgram(program_draft(&[2, 3, 1])),
        };

        let outcome = regenerate_program(&store, &generator, user, &answers(), today())
            .await
            .unwrap();
        assert_eq!(outcome.commit.workouts_created, 3);
        assert_eq!(outcome.commit.exercises_created, 6);
    }

    #[tokio::test]
    async fn last_slot_race_admits_exactly_one_commit() {
        let user = Uuid::new_v4();
        let store = Arc::new(FakeStore::with_used(user, today(), 2));
        let generator = FakeGenerator {
            behavior: Behavior::ReturnProgram(program_draft(&[1])),
        };

        let ans = answers();
        let (a, b) = tokio::join!(
            regenerate_program(store.as_ref(), &generator, user, &ans, today()),
            regenerate_program(store.as_ref(), &generator, user, &ans, today()),
        );

        let successes = [&a, &b].iter().filter(|r| r.is_ok()).count();
        assert_eq!(successes, 1, "exactly one of the racing requests may win");
        assert_eq!(store.used(user, today()), 3);

        let loser = if a.is_err() { a } else { b };
        assert!(matches!(
            loser.unwrap_err(),
            PortError::QuotaExceeded { .. }
        ));
    }

    #[tokio::test]
    async fn diet_commit_is_an_upsert() {
        let user = Uuid::new_v4();
        let store = FakeStore::default();

        let first = FakeGenerator {
            behavior: Behavior::ReturnDiet(diet_draft(1800)),
        };
        regenerate_diet(&store, &first, user, &DietAnswers::default(), today())
            .await
            .unwrap();

        let second = FakeGenerator {
            behavior: Behavior::ReturnDiet(diet_draft(2200)),
        };
        regenerate_diet(&store, &second, user, &DietAnswers::default(), today())
            .await
            .unwrap();

        let state = store.state.lock().unwrap();
        assert_eq!(state.diet_plans.len(), 1);
        assert_eq!(state.diet_plans.get(&user).unwrap().0.total_kcal, 2200);
    }

    #[tokio::test]
    async fn diet_refresh_returns_the_committed_plan() {
        let user = Uuid::new_v4();
        let store = FakeStore::default();
        let generator = FakeGenerator {
            behavior: Behavior::ReturnDiet(diet_draft(1800)),
        };

        let outcome = regenerate_diet(&store, &generator, user, &DietAnswers::default(), today())
            .await
            .unwrap();

        // The response body must carry the plan that was just persisted, not
        // just counts; a follow-up GET is not required.
        assert_eq!(outcome.plan.total_kcal, 1800);
        let breakfast = outcome.plan.breakfast.as_ref().unwrap();
        assert_eq!(breakfast.title, "Oatmeal");
        assert_eq!(breakfast.ingredients.len(), 1);
        assert!(outcome.plan.lunch.is_none());
    }

    #[tokio::test]
    async fn draft_stage_reports_warnings_without_charging() {
        let user = Uuid::new_v4();
        let store = FakeStore::default();
        let generator = FakeGenerator {
            behavior: Behavior::ReturnProgram(program_draft(&[1])),
        };

        let outcome = draft_program(&store, &generator, user, &answers(), today())
            .await
            .unwrap();
        // Fake profile has no activity level or goal on file.
        assert!(!outcome.warnings.is_empty());
        assert_eq!(store.used(user, today()), 0);
        assert_eq!(outcome.draft.workouts.len(), 1);
    }
}
