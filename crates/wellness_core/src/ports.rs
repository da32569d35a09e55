//! crates/wellness_core/src/ports.rs
//!
//! Defines the service contracts (traits) for the application's core logic.
//! These traits form the boundary of the hexagonal architecture, allowing the core
//! to be independent of specific external implementations like databases or
//! generative-model providers.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use uuid::Uuid;

use crate::domain::{
    AssembledProfile, DietAnswers, DietCommit, DietPlan, DraftDietPlan, DraftProgram, Exercise,
    Ingredient, Meal, ProgramAssignment, ProgramCommit, QuotaStatus, TrainingProgram, User,
    UserCredentials, UserProfile, Workout, WorkoutAnswers,
};
use crate::validate::{ValidatedDietPlan, ValidatedProgram};

//=========================================================================================
// Port Error and Result Types
//=========================================================================================

/// The error taxonomy shared by all port operations.
///
/// Adapters map their library-specific failures into these variants; the web
/// layer maps them onto HTTP status codes. The plan-pipeline variants carry
/// enough context for the caller to build a useful response (e.g. the quota
/// body on `QuotaExceeded`).
#[derive(Debug, thiserror::Error)]
pub enum PortError {
    #[error("Item not found: {0}")]
    NotFound(String),
    #[error("Unauthorized")]
    Unauthorized,
    /// The daily regeneration ceiling is reached. Not retryable until the
    /// date rolls over.
    #[error("Daily regeneration quota exhausted ({used}/{max})")]
    QuotaExceeded { used: i32, max: i32 },
    /// The generative provider errored, timed out, or returned unparseable
    /// output. Retryable; never consumes quota.
    #[error("Plan generation failed: {0}")]
    GenerationFailed(String),
    /// The generative output parsed but failed structural validation.
    /// Retryable; never consumes quota.
    #[error("Draft failed schema validation: {}", .0.join("; "))]
    SchemaInvalid(Vec<String>),
    /// A multi-row commit did not complete. The transaction is rolled back;
    /// the whole pipeline must be retried, never resumed.
    #[error("Plan commit did not complete: {0}")]
    PartialWrite(String),
    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

//=========================================================================================
// Service Ports (Traits)
//=========================================================================================

#[async_trait]
pub trait PlanStore: Send + Sync {
    // --- Auth Methods ---
    async fn create_user_with_email(
        &self,
        email: &str,
        hashed_password: &str,
    ) -> PortResult<User>;

    async fn get_user_by_email(&self, email: &str) -> PortResult<UserCredentials>;

    async fn create_auth_session(
        &self,
        session_id: &str,
        user_id: Uuid,
        expires_at: DateTime<Utc>,
    ) -> PortResult<()>;

    async fn validate_auth_session(&self, session_id: &str) -> PortResult<Uuid>;

    async fn delete_auth_session(&self, session_id: &str) -> PortResult<()>;

    // --- Profile ---
    async fn get_profile(&self, user_id: Uuid) -> PortResult<UserProfile>;

    // --- Regeneration Quota ---
    /// Reads the quota row for `(user_id, day)`, lazily creating it with
    /// zero usage. Read-only with respect to the counter: the increment
    /// happens exclusively inside the commit operations below.
    async fn quota_status(&self, user_id: Uuid, day: NaiveDate) -> PortResult<QuotaStatus>;

    // --- Plan Commits ---
    /// Atomically materializes a validated training program: program row,
    /// workouts, exercises, assignment flip, and the conditional quota
    /// increment, all in one transaction. Fails with `QuotaExceeded` when no
    /// slot remains and `PartialWrite` when persisted counts diverge from
    /// the draft; either way nothing is left behind and the user's prior
    /// active assignment is preserved.
    async fn commit_program(
        &self,
        user_id: Uuid,
        plan: &ValidatedProgram,
        day: NaiveDate,
    ) -> PortResult<ProgramCommit>;

    /// Upserts the user's single diet plan (last writer wins on `user_id`)
    /// and performs the same conditional quota increment.
    async fn commit_diet(
        &self,
        user_id: Uuid,
        plan: &ValidatedDietPlan,
        day: NaiveDate,
    ) -> PortResult<DietCommit>;

    // --- Plan Reads ---
    async fn get_active_program(
        &self,
        user_id: Uuid,
    ) -> PortResult<(TrainingProgram, ProgramAssignment)>;

    /// Returns the program's workouts ordered by `day_number`, each with its
    /// exercises ordered by `sequence_order`.
    async fn get_program_workouts(
        &self,
        program_id: Uuid,
    ) -> PortResult<Vec<(Workout, Vec<Exercise>)>>;

    async fn get_diet_plan(
        &self,
        user_id: Uuid,
    ) -> PortResult<(DietPlan, Vec<(Meal, Vec<Ingredient>)>)>;
}

#[async_trait]
pub trait PlanGenerationService: Send + Sync {
    /// Synthesizes a training-plan draft from the assembled profile and
    /// questionnaire answers. The result is untrusted model output.
    async fn generate_program(
        &self,
        profile: &AssembledProfile,
        answers: &WorkoutAnswers,
    ) -> PortResult<DraftProgram>;

    /// Synthesizes a diet-plan draft.
    async fn generate_diet(
        &self,
        profile: &AssembledProfile,
        answers: &DietAnswers,
    ) -> PortResult<DraftDietPlan>;
}
