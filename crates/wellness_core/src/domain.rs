//! crates/wellness_core/src/domain.rs
//!
//! Defines the pure, core data structures for the application.
//! These structs are independent of any database or serialization backend;
//! serde derives exist because drafts cross the generative-model boundary
//! as JSON and views cross the HTTP boundary as JSON.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

//=========================================================================================
// Users and Auth
//=========================================================================================

// Represents a user - used throughout app
#[derive(Debug, Clone)]
pub struct User {
    pub user_id: Uuid,
    pub email: Option<String>,
}

// Only used internally for login/signup - contains sensitive data
#[derive(Debug, Clone)]
pub struct UserCredentials {
    pub user_id: Uuid,
    pub email: String,
    pub hashed_password: String,
}

//=========================================================================================
// Profile and Questionnaire Inputs
//=========================================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Sex {
    Male,
    Female,
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityLevel {
    Sedentary,
    Light,
    Moderate,
    Active,
    VeryActive,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PrimaryGoal {
    LoseWeight,
    GainMuscle,
    Maintain,
    Endurance,
    GeneralFitness,
}

impl Sex {
    pub fn as_str(&self) -> &'static str {
        match self {
            Sex::Male => "male",
            Sex::Female => "female",
            Sex::Other => "other",
        }
    }

    pub fn parse(label: &str) -> Option<Self> {
        match label {
            "male" => Some(Sex::Male),
            "female" => Some(Sex::Female),
            "other" => Some(Sex::Other),
            _ => None,
        }
    }
}

impl ActivityLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActivityLevel::Sedentary => "sedentary",
            ActivityLevel::Light => "light",
            ActivityLevel::Moderate => "moderate",
            ActivityLevel::Active => "active",
            ActivityLevel::VeryActive => "very_active",
        }
    }

    pub fn parse(label: &str) -> Option<Self> {
        match label {
            "sedentary" => Some(ActivityLevel::Sedentary),
            "light" => Some(ActivityLevel::Light),
            "moderate" => Some(ActivityLevel::Moderate),
            "active" => Some(ActivityLevel::Active),
            "very_active" => Some(ActivityLevel::VeryActive),
            _ => None,
        }
    }
}

impl PrimaryGoal {
    pub fn as_str(&self) -> &'static str {
        match self {
            PrimaryGoal::LoseWeight => "lose_weight",
            PrimaryGoal::GainMuscle => "gain_muscle",
            PrimaryGoal::Maintain => "maintain",
            PrimaryGoal::Endurance => "endurance",
            PrimaryGoal::GeneralFitness => "general_fitness",
        }
    }

    pub fn parse(label: &str) -> Option<Self> {
        match label {
            "lose_weight" => Some(PrimaryGoal::LoseWeight),
            "gain_muscle" => Some(PrimaryGoal::GainMuscle),
            "maintain" => Some(PrimaryGoal::Maintain),
            "endurance" => Some(PrimaryGoal::Endurance),
            "general_fitness" => Some(PrimaryGoal::GeneralFitness),
            _ => None,
        }
    }
}

/// The durable biometric and preference snapshot for one user.
///
/// Read-only input to plan generation. All personalization fields are
/// optional; missing ones degrade personalization but never block a
/// generation (see `profile::assemble_profile`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserProfile {
    pub user_id: Uuid,
    pub sex: Option<Sex>,
    pub height_cm: Option<f64>,
    pub weight_kg: Option<f64>,
    pub activity_level: Option<ActivityLevel>,
    pub primary_goal: Option<PrimaryGoal>,
    pub dietary_preferences: Vec<String>,
    pub allergies: Vec<String>,
    pub birthdate: Option<NaiveDate>,
}

/// A profile enriched with derived fields for one generation request.
#[derive(Debug, Clone, Serialize)]
pub struct AssembledProfile {
    pub profile: UserProfile,
    /// Age in whole years as of the injected "today", when a birthdate exists.
    pub age: Option<u32>,
    /// Soft warnings about missing personalization inputs. Never fatal.
    #[serde(skip)]
    pub warnings: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Intensity {
    Low,
    Moderate,
    High,
}

/// Per-request questionnaire answers for a training-plan generation.
/// Ephemeral; lives only for the duration of one generation call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkoutAnswers {
    pub days_per_week: u8,
    pub minutes_per_session: u32,
    pub intensity: Intensity,
    pub equipment: Vec<String>,
    pub extra_activities: Vec<String>,
}

/// Per-request questionnaire answers for a diet-plan generation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DietAnswers {
    pub meals_per_day: Option<u8>,
    pub kcal_target: Option<i32>,
    pub exclusions: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlanKind {
    Training,
    Diet,
}

//=========================================================================================
// Draft Plans (untrusted generative output)
//=========================================================================================

/// The unvalidated training plan produced by the generative model.
///
/// Nothing here is safe to persist: it is parsed from model output and must
/// pass `validate::validate_program` before it can reach the store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DraftProgram {
    pub program_title: String,
    pub goal: String,
    pub level: String,
    pub duration_weeks: i32,
    pub workouts: Vec<DraftWorkout>,
    #[serde(default, alias = "finalNote")]
    pub final_note: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DraftWorkout {
    pub day_number: i32,
    pub title: String,
    pub exercises: Vec<DraftExercise>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DraftExercise {
    pub name: String,
    pub sets: i32,
    pub reps: String,
    pub rest_sec: i32,
    #[serde(default)]
    pub weight_hint: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

/// The unvalidated diet plan produced by the generative model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DraftDietPlan {
    pub total_kcal: i32,
    pub macros_target: MacrosTarget,
    pub meals: Vec<DraftMeal>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct MacrosTarget {
    pub protein_g: i32,
    pub carbs_g: i32,
    pub fat_g: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DraftMeal {
    /// Meal slot label ("breakfast", "lunch", "snack", "dinner"). The slot is
    /// carried explicitly so projections never have to guess from position.
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub time: Option<String>,
    pub kcal: i32,
    pub ingredients: Vec<DraftIngredient>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DraftIngredient {
    pub name: String,
    pub amount: f64,
    pub unit: String,
}

//=========================================================================================
// Durable Plan Entities
//=========================================================================================

#[derive(Debug, Clone, Serialize)]
pub struct TrainingProgram {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub title: String,
    pub goal: String,
    pub level: String,
    pub duration_weeks: i32,
    pub final_note: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Workout {
    pub id: Uuid,
    pub program_id: Uuid,
    pub day_number: i32,
    pub title: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct Exercise {
    pub id: Uuid,
    pub workout_id: Uuid,
    pub sequence_order: i32,
    pub name: String,
    pub sets: i32,
    pub reps: String,
    pub rest_sec: i32,
    pub weight_hint: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssignmentStatus {
    Active,
    Paused,
    Ended,
}

impl AssignmentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AssignmentStatus::Active => "active",
            AssignmentStatus::Paused => "paused",
            AssignmentStatus::Ended => "ended",
        }
    }

    pub fn parse(label: &str) -> Option<Self> {
        match label {
            "active" => Some(AssignmentStatus::Active),
            "paused" => Some(AssignmentStatus::Paused),
            "ended" => Some(AssignmentStatus::Ended),
            _ => None,
        }
    }
}

/// Links a user to their currently active training program.
/// At most one `active` assignment exists per user at a time.
#[derive(Debug, Clone, Serialize)]
pub struct ProgramAssignment {
    pub id: Uuid,
    pub user_id: Uuid,
    pub program_id: Uuid,
    pub status: AssignmentStatus,
    pub start_date: NaiveDate,
}

#[derive(Debug, Clone, Serialize)]
pub struct DietPlan {
    pub id: Uuid,
    pub user_id: Uuid,
    pub total_kcal: i32,
    pub macros_target: MacrosTarget,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MealSlot {
    Breakfast,
    Lunch,
    Snack,
    Dinner,
}

impl MealSlot {
    pub fn as_str(&self) -> &'static str {
        match self {
            MealSlot::Breakfast => "breakfast",
            MealSlot::Lunch => "lunch",
            MealSlot::Snack => "snack",
            MealSlot::Dinner => "dinner",
        }
    }

    pub fn parse(label: &str) -> Option<Self> {
        match label.trim().to_ascii_lowercase().as_str() {
            "breakfast" => Some(MealSlot::Breakfast),
            "lunch" => Some(MealSlot::Lunch),
            "snack" => Some(MealSlot::Snack),
            "dinner" => Some(MealSlot::Dinner),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Meal {
    pub id: Uuid,
    pub plan_id: Uuid,
    pub slot: MealSlot,
    pub title: String,
    pub time_hint: Option<String>,
    pub kcal: i32,
}

#[derive(Debug, Clone, Serialize)]
pub struct Ingredient {
    pub id: Uuid,
    pub meal_id: Uuid,
    pub name: String,
    pub amount: f64,
    pub unit: String,
}

//=========================================================================================
// Quota and Commit Receipts
//=========================================================================================

/// The regeneration quota state for one `(user, date)` pair.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct QuotaStatus {
    pub used: i32,
    pub max: i32,
}

impl QuotaStatus {
    pub fn remaining(&self) -> i32 {
        (self.max - self.used).max(0)
    }

    pub fn exhausted(&self) -> bool {
        self.used >= self.max
    }
}

/// Receipt for a committed training program. Counts are taken from the rows
/// actually written, not from the draft.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct ProgramCommit {
    pub program_id: Uuid,
    pub workouts_created: usize,
    pub exercises_created: usize,
}

/// Receipt for a committed (upserted) diet plan.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct DietCommit {
    pub diet_plan_id: Uuid,
    pub meals_created: usize,
    pub ingredients_created: usize,
}

//=========================================================================================
// Projection Views
//=========================================================================================

#[derive(Debug, Clone, Serialize)]
pub struct TodayWorkoutView {
    pub program_id: Uuid,
    pub program_title: String,
    pub day_number: i32,
    pub workout_title: String,
    pub exercises: Vec<Exercise>,
}

#[derive(Debug, Clone, Serialize)]
pub struct WeekDayView {
    pub day_number: i32,
    pub title: String,
    pub exercise_count: usize,
    pub is_today: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct WeekWorkoutView {
    pub program_id: Uuid,
    pub program_title: String,
    pub days: Vec<WeekDayView>,
}

#[derive(Debug, Clone, Serialize)]
pub struct MealView {
    pub title: String,
    pub time_hint: Option<String>,
    pub kcal: i32,
    pub ingredients: Vec<Ingredient>,
}

/// Meals keyed by slot. Slots without a stored meal stay `None`; the mapping
/// is derived from the stored slot label, never from list position.
#[derive(Debug, Clone, Default, Serialize)]
pub struct TodayDietView {
    pub total_kcal: i32,
    pub macros_target: Option<MacrosTarget>,
    pub breakfast: Option<MealView>,
    pub lunch: Option<MealView>,
    pub snack: Option<MealView>,
    pub dinner: Option<MealView>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ShoppingItem {
    pub name: String,
    pub unit: String,
    pub amount: f64,
}

/// The "week" projection of a diet plan: ingredients aggregated across meals.
#[derive(Debug, Clone, Serialize)]
pub struct ShoppingList {
    pub items: Vec<ShoppingItem>,
}
