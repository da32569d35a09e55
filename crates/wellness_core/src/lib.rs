pub mod domain;
pub mod pipeline;
pub mod ports;
pub mod profile;
pub mod projection;
pub mod validate;

pub use domain::{
    AssembledProfile, DietAnswers, DietCommit, DietPlan, DraftDietPlan, DraftProgram, Exercise,
    Ingredient, Meal, MealSlot, PlanKind, ProgramAssignment, ProgramCommit, QuotaStatus,
    TrainingProgram, User, UserCredentials, UserProfile, Workout, WorkoutAnswers,
};
pub use ports::{PlanGenerationService, PlanStore, PortError, PortResult};
pub use validate::{validate_diet, validate_program, ValidatedDietPlan, ValidatedProgram};
