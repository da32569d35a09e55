//! crates/wellness_core/src/validate.rs
//!
//! The draft schema validator: the boundary between "text that looked like
//! JSON" and data that is safe to write into relational tables.
//!
//! Validation follows parse-don't-validate: the only way to obtain a
//! `ValidatedProgram` or `ValidatedDietPlan` is through the functions here,
//! so the commit path can rely on every structural invariant having been
//! checked. Validation failures abort the pipeline before any persistence
//! write and never consume regeneration quota.

use std::collections::HashSet;

use crate::domain::{DraftDietPlan, DraftProgram, MealSlot};
use crate::ports::PortError;

/// A training draft that passed structural validation.
#[derive(Debug, Clone)]
pub struct ValidatedProgram {
    draft: DraftProgram,
}

impl ValidatedProgram {
    pub fn draft(&self) -> &DraftProgram {
        &self.draft
    }

    pub fn workout_count(&self) -> usize {
        self.draft.workouts.len()
    }

    pub fn exercise_count(&self) -> usize {
        self.draft.workouts.iter().map(|w| w.exercises.len()).sum()
    }
}

/// A diet draft that passed structural validation.
#[derive(Debug, Clone)]
pub struct ValidatedDietPlan {
    draft: DraftDietPlan,
}

impl ValidatedDietPlan {
    pub fn draft(&self) -> &DraftDietPlan {
        &self.draft
    }

    pub fn meal_count(&self) -> usize {
        self.draft.meals.len()
    }

    pub fn ingredient_count(&self) -> usize {
        self.draft.meals.iter().map(|m| m.ingredients.len()).sum()
    }

    /// The parsed slot for each meal, in draft order. Infallible after
    /// validation.
    pub fn slots(&self) -> Vec<MealSlot> {
        self.draft
            .meals
            .iter()
            .filter_map(|m| MealSlot::parse(&m.id))
            .collect()
    }
}

/// Validates a training draft, collecting every violation rather than
/// stopping at the first so the full list can be logged for prompt tuning.
pub fn validate_program(draft: DraftProgram) -> Result<ValidatedProgram, PortError> {
    let mut violations = Vec::new();

    if draft.program_title.trim().is_empty() {
        violations.push("program_title must not be empty".to_string());
    }
    if draft.duration_weeks < 1 {
        violations.push(format!(
            "duration_weeks must be >= 1, got {}",
            draft.duration_weeks
        ));
    }
    if draft.workouts.is_empty() {
        violations.push("workouts must be a non-empty list".to_string());
    }

    let mut seen_days = HashSet::new();
    for (wi, workout) in draft.workouts.iter().enumerate() {
        if workout.day_number < 1 {
            violations.push(format!(
                "workouts[{wi}].day_number must be a positive integer, got {}",
                workout.day_number
            ));
        } else if !seen_days.insert(workout.day_number) {
            violations.push(format!(
                "workouts[{wi}].day_number {} duplicates another workout",
                workout.day_number
            ));
        }
        if workout.title.trim().is_empty() {
            violations.push(format!("workouts[{wi}].title must not be empty"));
        }
        if workout.exercises.is_empty() {
            violations.push(format!("workouts[{wi}].exercises must not be empty"));
        }
        for (ei, exercise) in workout.exercises.iter().enumerate() {
            if exercise.name.trim().is_empty() {
                violations.push(format!("workouts[{wi}].exercises[{ei}].name must not be empty"));
            }
            if exercise.sets < 1 {
                violations.push(format!(
                    "workouts[{wi}].exercises[{ei}].sets must be >= 1, got {}",
                    exercise.sets
                ));
            }
            if exercise.reps.trim().is_empty() {
                violations.push(format!("workouts[{wi}].exercises[{ei}].reps must not be empty"));
            }
            if exercise.rest_sec < 0 {
                violations.push(format!(
                    "workouts[{wi}].exercises[{ei}].rest_sec must be >= 0, got {}",
                    exercise.rest_sec
                ));
            }
        }
    }

    if violations.is_empty() {
        Ok(ValidatedProgram { draft })
    } else {
        Err(PortError::SchemaInvalid(violations))
    }
}

/// Validates a diet draft. Every meal must carry a known slot label, unique
/// within the draft, so the slot-keyed projection stays unambiguous even
/// with fewer than four meals.
pub fn validate_diet(draft: DraftDietPlan) -> Result<ValidatedDietPlan, PortError> {
    let mut violations = Vec::new();

    if draft.total_kcal < 0 {
        violations.push(format!("total_kcal must be >= 0, got {}", draft.total_kcal));
    }
    if draft.macros_target.protein_g < 0
        || draft.macros_target.carbs_g < 0
        || draft.macros_target.fat_g < 0
    {
        violations.push("macros_target values must be >= 0".to_string());
    }
    if draft.meals.is_empty() {
        violations.push("meals must be a non-empty list".to_string());
    }

    let mut seen_slots = HashSet::new();
    for (mi, meal) in draft.meals.iter().enumerate() {
        match MealSlot::parse(&meal.id) {
            Some(slot) => {
                if !seen_slots.insert(slot) {
                    violations.push(format!(
                        "meals[{mi}].id '{}' duplicates another meal's slot",
                        meal.id
                    ));
                }
            }
            None => violations.push(format!(
                "meals[{mi}].id '{}' is not a known meal slot",
                meal.id
            )),
        }
        if meal.title.trim().is_empty() {
            violations.push(format!("meals[{mi}].title must not be empty"));
        }
        if meal.kcal < 0 {
            violations.push(format!("meals[{mi}].kcal must be >= 0, got {}", meal.kcal));
        }
        for (ii, ingredient) in meal.ingredients.iter().enumerate() {
            if ingredient.name.trim().is_empty() {
                violations.push(format!("meals[{mi}].ingredients[{ii}].name must not be empty"));
            }
            if !(ingredient.amount > 0.0) {
                violations.push(format!(
                    "meals[{mi}].ingredients[{ii}].amount must be > 0, got {}",
                    ingredient.amount
                ));
            }
        }
    }

    if violations.is_empty() {
        Ok(ValidatedDietPlan { draft })
    } else {
        Err(PortError::SchemaInvalid(violations))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{DraftExercise, DraftIngredient, DraftMeal, DraftWorkout, MacrosTarget};

    fn exercise(name: &str) -> DraftExercise {
        DraftExercise {
            name: name.to_string(),
            sets: 3,
            reps: "8-12".to_string(),
            rest_sec: 90,
            weight_hint: None,
            notes: None,
        }
    }

    fn workout(day: i32, exercises: Vec<DraftExercise>) -> DraftWorkout {
        DraftWorkout {
            day_number: day,
            title: format!("Day {day}"),
            exercises,
        }
    }

    fn program(workouts: Vec<DraftWorkout>) -> DraftProgram {
        DraftProgram {
            program_title: "Hypertrophy Block".to_string(),
            goal: "gain_muscle".to_string(),
            level: "intermediate".to_string(),
            duration_weeks: 8,
            workouts,
            final_note: None,
        }
    }

    fn meal(id: &str, kcal: i32) -> DraftMeal {
        DraftMeal {
            id: id.to_string(),
            title: format!("{id} meal"),
            time: None,
            kcal,
            ingredients: vec![DraftIngredient {
                name: "oats".to_string(),
                amount: 80.0,
                unit: "g".to_string(),
            }],
        }
    }

    fn diet(meals: Vec<DraftMeal>) -> DraftDietPlan {
        DraftDietPlan {
            total_kcal: 2200,
            macros_target: MacrosTarget {
                protein_g: 160,
                carbs_g: 220,
                fat_g: 70,
            },
            meals,
        }
    }

    #[test]
    fn well_formed_program_passes() {
        let validated = validate_program(program(vec![
            workout(1, vec![exercise("Squat"), exercise("Leg Press")]),
            workout(2, vec![exercise("Bench Press")]),
        ]))
        .unwrap();
        assert_eq!(validated.workout_count(), 2);
        assert_eq!(validated.exercise_count(), 3);
    }

    #[test]
    fn empty_workout_list_is_rejected() {
        let err = validate_program(program(vec![])).unwrap_err();
        match err {
            PortError::SchemaInvalid(violations) => {
                assert!(violations.iter().any(|v| v.contains("non-empty")));
            }
            other => panic!("expected SchemaInvalid, got {other:?}"),
        }
    }

    #[test]
    fn duplicate_day_numbers_are_rejected() {
        let err = validate_program(program(vec![
            workout(1, vec![exercise("Squat")]),
            workout(1, vec![exercise("Deadlift")]),
        ]))
        .unwrap_err();
        match err {
            PortError::SchemaInvalid(violations) => {
                assert!(violations.iter().any(|v| v.contains("duplicates")));
            }
            other => panic!("expected SchemaInvalid, got {other:?}"),
        }
    }

    #[test]
    fn zero_sets_and_negative_rest_are_both_reported() {
        let mut bad = exercise("Curl");
        bad.sets = 0;
        bad.rest_sec = -5;
        let err = validate_program(program(vec![workout(1, vec![bad])])).unwrap_err();
        match err {
            PortError::SchemaInvalid(violations) => {
                assert_eq!(violations.len(), 2);
            }
            other => panic!("expected SchemaInvalid, got {other:?}"),
        }
    }

    #[test]
    fn well_formed_diet_passes() {
        let validated = validate_diet(diet(vec![
            meal("breakfast", 500),
            meal("lunch", 700),
            meal("dinner", 800),
        ]))
        .unwrap();
        assert_eq!(validated.meal_count(), 3);
        assert_eq!(validated.slots().len(), 3);
    }

    #[test]
    fn unknown_and_duplicate_slots_are_rejected() {
        let err = validate_diet(diet(vec![
            meal("brunch", 500),
            meal("lunch", 700),
            meal("lunch", 650),
        ]))
        .unwrap_err();
        match err {
            PortError::SchemaInvalid(violations) => {
                assert!(violations.iter().any(|v| v.contains("not a known meal slot")));
                assert!(violations.iter().any(|v| v.contains("duplicates")));
            }
            other => panic!("expected SchemaInvalid, got {other:?}"),
        }
    }

    #[test]
    fn non_positive_ingredient_amount_is_rejected() {
        let mut bad = meal("breakfast", 500);
        bad.ingredients[0].amount = 0.0;
        let err = validate_diet(diet(vec![bad])).unwrap_err();
        assert!(matches!(err, PortError::SchemaInvalid(_)));
    }
}
