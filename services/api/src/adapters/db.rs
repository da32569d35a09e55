//! services/api/src/adapters/db.rs
//!
//! This module contains the database adapter, which is the concrete implementation
//! of the `PlanStore` port from the `core` crate. It handles all interactions
//! with the PostgreSQL database using `sqlx`.
//!
//! The plan commits are the sensitive part: each one runs inside a single
//! transaction that also performs the conditional quota increment, so a
//! partially-written program can never become visible and two requests racing
//! on the last quota slot cannot both succeed.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{FromRow, PgPool, Postgres, Transaction};
use uuid::Uuid;
use wellness_core::domain::{
    ActivityLevel, AssignmentStatus, DietCommit, DietPlan, Exercise, Ingredient, MacrosTarget,
    Meal, MealSlot, PrimaryGoal, ProgramAssignment, ProgramCommit, QuotaStatus, Sex,
    TrainingProgram, User, UserCredentials, UserProfile, Workout,
};
use wellness_core::ports::{PlanStore, PortError, PortResult};
use wellness_core::validate::{ValidatedDietPlan, ValidatedProgram};

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// A database adapter that implements the `PlanStore` port.
#[derive(Clone)]
pub struct DbAdapter {
    pool: PgPool,
    max_regenerations: i32,
}

impl DbAdapter {
    /// Creates a new `DbAdapter`. `max_regenerations` is the policy ceiling
    /// written into lazily-created quota rows.
    pub fn new(pool: PgPool, max_regenerations: i32) -> Self {
        Self {
            pool,
            max_regenerations,
        }
    }

    /// A helper function to run database migrations at startup.
    pub async fn run_migrations(&self) -> Result<(), sqlx::Error> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }

    /// Lazily creates the quota row for `(user, day)` and applies the single
    /// conditional increment. Zero rows affected means the ceiling is
    /// reached; the caller owns the transaction and must roll it back.
    async fn charge_quota(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        user_id: Uuid,
        day: NaiveDate,
    ) -> PortResult<Option<QuotaStatus>> {
        sqlx::query(
            "INSERT INTO generation_quotas (user_id, quota_date, regenerations_used, max_regenerations)
             VALUES ($1, $2, 0, $3)
             ON CONFLICT (user_id, quota_date) DO NOTHING",
        )
        .bind(user_id)
        .bind(day)
        .bind(self.max_regenerations)
        .execute(&mut **tx)
        .await
        .map_err(unexpected)?;

        let updated = sqlx::query(
            "UPDATE generation_quotas
             SET regenerations_used = regenerations_used + 1
             WHERE user_id = $1 AND quota_date = $2
               AND regenerations_used < max_regenerations",
        )
        .bind(user_id)
        .bind(day)
        .execute(&mut **tx)
        .await
        .map_err(unexpected)?;

        if updated.rows_affected() == 0 {
            let record = sqlx::query_as::<_, QuotaRecord>(
                "SELECT regenerations_used, max_regenerations
                 FROM generation_quotas WHERE user_id = $1 AND quota_date = $2",
            )
            .bind(user_id)
            .bind(day)
            .fetch_one(&mut **tx)
            .await
            .map_err(unexpected)?;
            return Ok(Some(record.to_domain()));
        }

        Ok(None)
    }
}

fn unexpected(e: sqlx::Error) -> PortError {
    PortError::Unexpected(e.to_string())
}

//=========================================================================================
// "Impure" Database Record Structs
//=========================================================================================

#[derive(FromRow)]
struct UserRecord {
    user_id: Uuid,
    email: Option<String>,
}
impl UserRecord {
    fn to_domain(self) -> User {
        User {
            user_id: self.user_id,
            email: self.email,
        }
    }
}

#[derive(FromRow)]
struct CredentialsRecord {
    user_id: Uuid,
    email: String,
    hashed_password: String,
}
impl CredentialsRecord {
    fn to_domain(self) -> UserCredentials {
        UserCredentials {
            user_id: self.user_id,
            email: self.email,
            hashed_password: self.hashed_password,
        }
    }
}

#[derive(FromRow)]
struct ProfileRecord {
    user_id: Uuid,
    sex: Option<String>,
    height_cm: Option<f64>,
    weight_kg: Option<f64>,
    activity_level: Option<String>,
    primary_goal: Option<String>,
    dietary_preferences: Vec<String>,
    allergies: Vec<String>,
    birthdate: Option<NaiveDate>,
}
impl ProfileRecord {
    fn to_domain(self) -> UserProfile {
        UserProfile {
            user_id: self.user_id,
            sex: self.sex.as_deref().and_then(Sex::parse),
            height_cm: self.height_cm,
            weight_kg: self.weight_kg,
            activity_level: self.activity_level.as_deref().and_then(ActivityLevel::parse),
            primary_goal: self.primary_goal.as_deref().and_then(PrimaryGoal::parse),
            dietary_preferences: self.dietary_preferences,
            allergies: self.allergies,
            birthdate: self.birthdate,
        }
    }
}

#[derive(FromRow)]
struct QuotaRecord {
    regenerations_used: i32,
    max_regenerations: i32,
}
impl QuotaRecord {
    fn to_domain(self) -> QuotaStatus {
        QuotaStatus {
            used: self.regenerations_used,
            max: self.max_regenerations,
        }
    }
}

#[derive(FromRow)]
struct ProgramRecord {
    id: Uuid,
    owner_id: Uuid,
    title: String,
    goal: String,
    level: String,
    duration_weeks: i32,
    final_note: Option<String>,
    created_at: DateTime<Utc>,
}
impl ProgramRecord {
    fn to_domain(self) -> TrainingProgram {
        TrainingProgram {
            id: self.id,
            owner_id: self.owner_id,
            title: self.title,
            goal: self.goal,
            level: self.level,
            duration_weeks: self.duration_weeks,
            final_note: self.final_note,
            created_at: self.created_at,
        }
    }
}

#[derive(FromRow)]
struct AssignmentRecord {
    id: Uuid,
    user_id: Uuid,
    program_id: Uuid,
    status: String,
    start_date: NaiveDate,
}
impl AssignmentRecord {
    fn to_domain(self) -> PortResult<ProgramAssignment> {
        let status = AssignmentStatus::parse(&self.status).ok_or_else(|| {
            PortError::Unexpected(format!("Unknown assignment status '{}'", self.status))
        })?;
        Ok(ProgramAssignment {
            id: self.id,
            user_id: self.user_id,
            program_id: self.program_id,
            status,
            start_date: self.start_date,
        })
    }
}

#[derive(FromRow)]
struct WorkoutRecord {
    id: Uuid,
    program_id: Uuid,
    day_number: i32,
    title: String,
}
impl WorkoutRecord {
    fn to_domain(self) -> Workout {
        Workout {
            id: self.id,
            program_id: self.program_id,
            day_number: self.day_number,
            title: self.title,
        }
    }
}

#[derive(FromRow)]
struct ExerciseRecord {
    id: Uuid,
    workout_id: Uuid,
    sequence_order: i32,
    name: String,
    sets: i32,
    reps: String,
    rest_sec: i32,
    weight_hint: Option<String>,
    notes: Option<String>,
}
impl ExerciseRecord {
    fn to_domain(self) -> Exercise {
        Exercise {
            id: self.id,
            workout_id: self.workout_id,
            sequence_order: self.sequence_order,
            name: self.name,
            sets: self.sets,
            reps: self.reps,
            rest_sec: self.rest_sec,
            weight_hint: self.weight_hint,
            notes: self.notes,
        }
    }
}

#[derive(FromRow)]
struct DietPlanRecord {
    id: Uuid,
    user_id: Uuid,
    total_kcal: i32,
    protein_g: i32,
    carbs_g: i32,
    fat_g: i32,
    updated_at: DateTime<Utc>,
}
impl DietPlanRecord {
    fn to_domain(self) -> DietPlan {
        DietPlan {
            id: self.id,
            user_id: self.user_id,
            total_kcal: self.total_kcal,
            macros_target: MacrosTarget {
                protein_g: self.protein_g,
                carbs_g: self.carbs_g,
                fat_g: self.fat_g,
            },
            updated_at: self.updated_at,
        }
    }
}

#[derive(FromRow)]
struct MealRecord {
    id: Uuid,
    plan_id: Uuid,
    slot: String,
    title: String,
    time_hint: Option<String>,
    kcal: i32,
}
impl MealRecord {
    fn to_domain(self) -> PortResult<Meal> {
        let slot = MealSlot::parse(&self.slot).ok_or_else(|| {
            PortError::Unexpected(format!("Unknown meal slot '{}' in storage", self.slot))
        })?;
        Ok(Meal {
            id: self.id,
            plan_id: self.plan_id,
            slot,
            title: self.title,
            time_hint: self.time_hint,
            kcal: self.kcal,
        })
    }
}

#[derive(FromRow)]
struct IngredientRecord {
    id: Uuid,
    meal_id: Uuid,
    name: String,
    amount: f64,
    unit: String,
}
impl IngredientRecord {
    fn to_domain(self) -> Ingredient {
        Ingredient {
            id: self.id,
            meal_id: self.meal_id,
            name: self.name,
            amount: self.amount,
            unit: self.unit,
        }
    }
}

//=========================================================================================
// `PlanStore` Trait Implementation
//=========================================================================================

#[async_trait]
impl PlanStore for DbAdapter {
    async fn create_user_with_email(
        &self,
        email: &str,
        hashed_password: &str,
    ) -> PortResult<User> {
        let record = sqlx::query_as::<_, UserRecord>(
            "INSERT INTO users (user_id, email, hashed_password)
             VALUES ($1, $2, $3)
             RETURNING user_id, email",
        )
        .bind(Uuid::new_v4())
        .bind(email)
        .bind(hashed_password)
        .fetch_one(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(record.to_domain())
    }

    async fn get_user_by_email(&self, email: &str) -> PortResult<UserCredentials> {
        let record = sqlx::query_as::<_, CredentialsRecord>(
            "SELECT user_id, email, hashed_password FROM users WHERE email = $1",
        )
        .bind(email)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::RowNotFound => PortError::NotFound(format!("User {} not found", email)),
            _ => unexpected(e),
        })?;
        Ok(record.to_domain())
    }

    async fn create_auth_session(
        &self,
        session_id: &str,
        user_id: Uuid,
        expires_at: DateTime<Utc>,
    ) -> PortResult<()> {
        sqlx::query("INSERT INTO auth_sessions (id, user_id, expires_at) VALUES ($1, $2, $3)")
            .bind(session_id)
            .bind(user_id)
            .bind(expires_at)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(())
    }

    async fn validate_auth_session(&self, session_id: &str) -> PortResult<Uuid> {
        let row: (Uuid,) = sqlx::query_as(
            "SELECT user_id FROM auth_sessions WHERE id = $1 AND expires_at > now()",
        )
        .bind(session_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::RowNotFound => PortError::Unauthorized,
            _ => unexpected(e),
        })?;
        Ok(row.0)
    }

    async fn delete_auth_session(&self, session_id: &str) -> PortResult<()> {
        sqlx::query("DELETE FROM auth_sessions WHERE id = $1")
            .bind(session_id)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(())
    }

    async fn get_profile(&self, user_id: Uuid) -> PortResult<UserProfile> {
        let record = sqlx::query_as::<_, ProfileRecord>(
            "SELECT user_id, sex, height_cm, weight_kg, activity_level, primary_goal,
                    dietary_preferences, allergies, birthdate
             FROM user_profiles WHERE user_id = $1",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(unexpected)?;

        // A user without a saved profile generates with defaults; the
        // assembler turns the missing fields into soft warnings.
        Ok(match record {
            Some(record) => record.to_domain(),
            None => UserProfile {
                user_id,
                sex: None,
                height_cm: None,
                weight_kg: None,
                activity_level: None,
                primary_goal: None,
                dietary_preferences: Vec::new(),
                allergies: Vec::new(),
                birthdate: None,
            },
        })
    }

    async fn quota_status(&self, user_id: Uuid, day: NaiveDate) -> PortResult<QuotaStatus> {
        sqlx::query(
            "INSERT INTO generation_quotas (user_id, quota_date, regenerations_used, max_regenerations)
             VALUES ($1, $2, 0, $3)
             ON CONFLICT (user_id, quota_date) DO NOTHING",
        )
        .bind(user_id)
        .bind(day)
        .bind(self.max_regenerations)
        .execute(&self.pool)
        .await
        .map_err(unexpected)?;

        let record = sqlx::query_as::<_, QuotaRecord>(
            "SELECT regenerations_used, max_regenerations
             FROM generation_quotas WHERE user_id = $1 AND quota_date = $2",
        )
        .bind(user_id)
        .bind(day)
        .fetch_one(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(record.to_domain())
    }

    async fn commit_program(
        &self,
        user_id: Uuid,
        plan: &ValidatedProgram,
        day: NaiveDate,
    ) -> PortResult<ProgramCommit> {
        let draft = plan.draft();
        let mut tx = self.pool.begin().await.map_err(unexpected)?;

        let program_id = Uuid::new_v4();
        sqlx::query(
            "INSERT INTO training_programs (id, owner_id, title, goal, level, duration_weeks, final_note)
             VALUES ($1, $2, $3, $4, $5, $6, $7)",
        )
        .bind(program_id)
        .bind(user_id)
        .bind(&draft.program_title)
        .bind(&draft.goal)
        .bind(&draft.level)
        .bind(draft.duration_weeks)
        .bind(&draft.final_note)
        .execute(&mut *tx)
        .await
        .map_err(unexpected)?;

        let mut workouts_created = 0usize;
        let mut exercises_created = 0usize;
        for workout in &draft.workouts {
            let workout_id = Uuid::new_v4();
            let inserted = sqlx::query(
                "INSERT INTO workouts (id, program_id, day_number, title) VALUES ($1, $2, $3, $4)",
            )
            .bind(workout_id)
            .bind(program_id)
            .bind(workout.day_number)
            .bind(&workout.title)
            .execute(&mut *tx)
            .await
            .map_err(unexpected)?;
            workouts_created += inserted.rows_affected() as usize;

            for (index, exercise) in workout.exercises.iter().enumerate() {
                let inserted = sqlx::query(
                    "INSERT INTO exercises
                        (id, workout_id, sequence_order, name, sets, reps, rest_sec, weight_hint, notes)
                     VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)",
                )
                .bind(Uuid::new_v4())
                .bind(workout_id)
                .bind(index as i32 + 1)
                .bind(&exercise.name)
                .bind(exercise.sets)
                .bind(&exercise.reps)
                .bind(exercise.rest_sec)
                .bind(&exercise.weight_hint)
                .bind(&exercise.notes)
                .execute(&mut *tx)
                .await
                .map_err(unexpected)?;
                exercises_created += inserted.rows_affected() as usize;
            }
        }

        // Verify the persisted counts against the validated draft before the
        // assignment pointer moves. A mismatch rolls everything back.
        if workouts_created != plan.workout_count() || exercises_created != plan.exercise_count() {
            return Err(PortError::PartialWrite(format!(
                "expected {}/{} workout/exercise rows, wrote {}/{}",
                plan.workout_count(),
                plan.exercise_count(),
                workouts_created,
                exercises_created
            )));
        }

        // The assignment flip is last: the prior active program stays in
        // place until the new one is fully materialized.
        sqlx::query(
            "UPDATE program_assignments SET status = 'ended'
             WHERE user_id = $1 AND status = 'active'",
        )
        .bind(user_id)
        .execute(&mut *tx)
        .await
        .map_err(unexpected)?;

        sqlx::query(
            "INSERT INTO program_assignments (id, user_id, program_id, status, start_date)
             VALUES ($1, $2, $3, 'active', $4)",
        )
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(program_id)
        .bind(day)
        .execute(&mut *tx)
        .await
        .map_err(unexpected)?;

        if let Some(exhausted) = self.charge_quota(&mut tx, user_id, day).await? {
            tx.rollback().await.map_err(unexpected)?;
            return Err(PortError::QuotaExceeded {
                used: exhausted.used,
                max: exhausted.max,
            });
        }

        tx.commit().await.map_err(unexpected)?;

        Ok(ProgramCommit {
            program_id,
            workouts_created,
            exercises_created,
        })
    }

    async fn commit_diet(
        &self,
        user_id: Uuid,
        plan: &ValidatedDietPlan,
        day: NaiveDate,
    ) -> PortResult<DietCommit> {
        let draft = plan.draft();
        let mut tx = self.pool.begin().await.map_err(unexpected)?;

        // Upsert keyed by user_id: last writer wins, one plan per user.
        let row: (Uuid,) = sqlx::query_as(
            "INSERT INTO diet_plans (id, user_id, total_kcal, protein_g, carbs_g, fat_g, updated_at)
             VALUES ($1, $2, $3, $4, $5, $6, now())
             ON CONFLICT (user_id) DO UPDATE SET
                total_kcal = EXCLUDED.total_kcal,
                protein_g = EXCLUDED.protein_g,
                carbs_g = EXCLUDED.carbs_g,
                fat_g = EXCLUDED.fat_g,
                updated_at = now()
             RETURNING id",
        )
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(draft.total_kcal)
        .bind(draft.macros_target.protein_g)
        .bind(draft.macros_target.carbs_g)
        .bind(draft.macros_target.fat_g)
        .fetch_one(&mut *tx)
        .await
        .map_err(unexpected)?;
        let plan_id = row.0;

        // Replace the children wholesale; ingredients cascade with meals.
        sqlx::query("DELETE FROM meals WHERE plan_id = $1")
            .bind(plan_id)
            .execute(&mut *tx)
            .await
            .map_err(unexpected)?;

        let mut meals_created = 0usize;
        let mut ingredients_created = 0usize;
        for meal in &draft.meals {
            let slot = MealSlot::parse(&meal.id).ok_or_else(|| {
                PortError::Unexpected(format!("Validated meal carries unknown slot '{}'", meal.id))
            })?;
            let meal_id = Uuid::new_v4();
            let inserted = sqlx::query(
                "INSERT INTO meals (id, plan_id, slot, title, time_hint, kcal)
                 VALUES ($1, $2, $3, $4, $5, $6)",
            )
            .bind(meal_id)
            .bind(plan_id)
            .bind(slot.as_str())
            .bind(&meal.title)
            .bind(&meal.time)
            .bind(meal.kcal)
            .execute(&mut *tx)
            .await
            .map_err(unexpected)?;
            meals_created += inserted.rows_affected() as usize;

            for ingredient in &meal.ingredients {
                let inserted = sqlx::query(
                    "INSERT INTO ingredients (id, meal_id, name, amount, unit)
                     VALUES ($1, $2, $3, $4, $5)",
                )
                .bind(Uuid::new_v4())
                .bind(meal_id)
                .bind(&ingredient.name)
                .bind(ingredient.amount)
                .bind(&ingredient.unit)
                .execute(&mut *tx)
                .await
                .map_err(unexpected)?;
                ingredients_created += inserted.rows_affected() as usize;
            }
        }

        if meals_created != plan.meal_count() || ingredients_created != plan.ingredient_count() {
            return Err(PortError::PartialWrite(format!(
                "expected {}/{} meal/ingredient rows, wrote {}/{}",
                plan.meal_count(),
                plan.ingredient_count(),
                meals_created,
                ingredients_created
            )));
        }

        if let Some(exhausted) = self.charge_quota(&mut tx, user_id, day).await? {
            tx.rollback().await.map_err(unexpected)?;
            return Err(PortError::QuotaExceeded {
                used: exhausted.used,
                max: exhausted.max,
            });
        }

        tx.commit().await.map_err(unexpected)?;

        Ok(DietCommit {
            diet_plan_id: plan_id,
            meals_created,
            ingredients_created,
        })
    }

    async fn get_active_program(
        &self,
        user_id: Uuid,
    ) -> PortResult<(TrainingProgram, ProgramAssignment)> {
        let assignment = sqlx::query_as::<_, AssignmentRecord>(
            "SELECT id, user_id, program_id, status, start_date
             FROM program_assignments WHERE user_id = $1 AND status = 'active'",
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::RowNotFound => {
                PortError::NotFound(format!("No active program for user {}", user_id))
            }
            _ => unexpected(e),
        })?
        .to_domain()?;

        let program = sqlx::query_as::<_, ProgramRecord>(
            "SELECT id, owner_id, title, goal, level, duration_weeks, final_note, created_at
             FROM training_programs WHERE id = $1",
        )
        .bind(assignment.program_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::RowNotFound => PortError::NotFound(format!(
                "Program {} not found",
                assignment.program_id
            )),
            _ => unexpected(e),
        })?
        .to_domain();

        Ok((program, assignment))
    }

    async fn get_program_workouts(
        &self,
        program_id: Uuid,
    ) -> PortResult<Vec<(Workout, Vec<Exercise>)>> {
        let workouts = sqlx::query_as::<_, WorkoutRecord>(
            "SELECT id, program_id, day_number, title
             FROM workouts WHERE program_id = $1 ORDER BY day_number ASC",
        )
        .bind(program_id)
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;

        let mut result = Vec::with_capacity(workouts.len());
        for record in workouts {
            let workout = record.to_domain();
            let exercises = sqlx::query_as::<_, ExerciseRecord>(
                "SELECT id, workout_id, sequence_order, name, sets, reps, rest_sec, weight_hint, notes
                 FROM exercises WHERE workout_id = $1 ORDER BY sequence_order ASC",
            )
            .bind(workout.id)
            .fetch_all(&self.pool)
            .await
            .map_err(unexpected)?
            .into_iter()
            .map(|r| r.to_domain())
            .collect();
            result.push((workout, exercises));
        }
        Ok(result)
    }

    async fn get_diet_plan(
        &self,
        user_id: Uuid,
    ) -> PortResult<(DietPlan, Vec<(Meal, Vec<Ingredient>)>)> {
        let plan = sqlx::query_as::<_, DietPlanRecord>(
            "SELECT id, user_id, total_kcal, protein_g, carbs_g, fat_g, updated_at
             FROM diet_plans WHERE user_id = $1",
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::RowNotFound => {
                PortError::NotFound(format!("No diet plan for user {}", user_id))
            }
            _ => unexpected(e),
        })?
        .to_domain();

        let meals = sqlx::query_as::<_, MealRecord>(
            "SELECT id, plan_id, slot, title, time_hint, kcal
             FROM meals WHERE plan_id = $1
             ORDER BY array_position(ARRAY['breakfast','lunch','snack','dinner'], slot)",
        )
        .bind(plan.id)
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;

        let mut result = Vec::with_capacity(meals.len());
        for record in meals {
            let meal = record.to_domain()?;
            let ingredients = sqlx::query_as::<_, IngredientRecord>(
                "SELECT id, meal_id, name, amount, unit
                 FROM ingredients WHERE meal_id = $1 ORDER BY name ASC",
            )
            .bind(meal.id)
            .fetch_all(&self.pool)
            .await
            .map_err(unexpected)?
            .into_iter()
            .map(|r| r.to_domain())
            .collect();
            result.push((meal, ingredients));
        }
        Ok((plan, result))
    }
}
