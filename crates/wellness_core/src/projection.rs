//! crates/wellness_core/src/projection.rs
//!
//! The plan projection reader: read-only reshaping of committed plan data
//! into "today" and "week" views. All functions are pure; the current date
//! is an explicit parameter.

use chrono::NaiveDate;

use crate::domain::{
    DietPlan, Exercise, Ingredient, Meal, MealView, ProgramAssignment, ShoppingItem, ShoppingList,
    TodayDietView, TodayWorkoutView, TrainingProgram, WeekDayView, WeekWorkoutView, Workout,
};
use crate::ports::{PortError, PortResult};

/// Index into the day-ordered workout list for `today`.
///
/// Day rotation rule: with `n` workouts and `elapsed` whole days since the
/// assignment's start date, today's workout is the `elapsed mod n`-th one
/// when ordered by `day_number`. A start date in the future clamps to the
/// first day rather than rotating backwards.
pub fn rotation_index(start_date: NaiveDate, today: NaiveDate, workout_count: usize) -> usize {
    if workout_count == 0 {
        return 0;
    }
    let elapsed = (today - start_date).num_days().max(0);
    (elapsed % workout_count as i64) as usize
}

/// Projects the active program onto today's workout.
pub fn project_today(
    program: &TrainingProgram,
    assignment: &ProgramAssignment,
    workouts: &[(Workout, Vec<Exercise>)],
    today: NaiveDate,
) -> PortResult<TodayWorkoutView> {
    // Committed programs always have at least one workout; an empty set here
    // means the stored data is corrupt.
    let index = rotation_index(assignment.start_date, today, workouts.len());
    let (workout, exercises) = workouts.get(index).ok_or_else(|| {
        PortError::NotFound(format!("Program {} has no workouts", program.id))
    })?;

    Ok(TodayWorkoutView {
        program_id: program.id,
        program_title: program.title.clone(),
        day_number: workout.day_number,
        workout_title: workout.title.clone(),
        exercises: exercises.clone(),
    })
}

/// Projects the active program onto the full week, marking today's slot.
pub fn project_week(
    program: &TrainingProgram,
    assignment: &ProgramAssignment,
    workouts: &[(Workout, Vec<Exercise>)],
    today: NaiveDate,
) -> WeekWorkoutView {
    let today_index = rotation_index(assignment.start_date, today, workouts.len());
    let days = workouts
        .iter()
        .enumerate()
        .map(|(i, (workout, exercises))| WeekDayView {
            day_number: workout.day_number,
            title: workout.title.clone(),
            exercise_count: exercises.len(),
            is_today: i == today_index,
        })
        .collect();

    WeekWorkoutView {
        program_id: program.id,
        program_title: program.title.clone(),
        days,
    }
}

/// Projects the diet plan onto the slot-keyed "today" view.
///
/// The slot comes from each meal's stored label, so the mapping stays
/// correct when fewer than four meals exist.
pub fn project_diet_today(plan: &DietPlan, meals: &[(Meal, Vec<Ingredient>)]) -> TodayDietView {
    let mut view = TodayDietView {
        total_kcal: plan.total_kcal,
        macros_target: Some(plan.macros_target),
        ..Default::default()
    };

    for (meal, ingredients) in meals {
        let meal_view = MealView {
            title: meal.title.clone(),
            time_hint: meal.time_hint.clone(),
            kcal: meal.kcal,
            ingredients: ingredients.clone(),
        };
        match meal.slot {
            crate::domain::MealSlot::Breakfast => view.breakfast = Some(meal_view),
            crate::domain::MealSlot::Lunch => view.lunch = Some(meal_view),
            crate::domain::MealSlot::Snack => view.snack = Some(meal_view),
            crate::domain::MealSlot::Dinner => view.dinner = Some(meal_view),
        }
    }

    view
}

/// Projects the diet plan onto the "week" view: a shopping list aggregating
/// ingredients across all meals by case-insensitive `(name, unit)`.
pub fn project_shopping_list(meals: &[(Meal, Vec<Ingredient>)]) -> ShoppingList {
    let mut items: Vec<ShoppingItem> = Vec::new();

    for (_, ingredients) in meals {
        for ingredient in ingredients {
            let key_name = ingredient.name.trim().to_lowercase();
            let key_unit = ingredient.unit.trim().to_lowercase();
            match items
                .iter_mut()
                .find(|i| i.name.to_lowercase() == key_name && i.unit.to_lowercase() == key_unit)
            {
                Some(existing) => existing.amount += ingredient.amount,
                None => items.push(ShoppingItem {
                    name: ingredient.name.trim().to_string(),
                    unit: ingredient.unit.trim().to_string(),
                    amount: ingredient.amount,
                }),
            }
        }
    }

    items.sort_by(|a, b| a.name.to_lowercase().cmp(&b.name.to_lowercase()));
    ShoppingList { items }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{AssignmentStatus, MacrosTarget, MealSlot};
    use chrono::Utc;
    use uuid::Uuid;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn program() -> TrainingProgram {
        TrainingProgram {
            id: Uuid::new_v4(),
            owner_id: Uuid::new_v4(),
            title: "Push Pull Legs".to_string(),
            goal: "gain_muscle".to_string(),
            level: "intermediate".to_string(),
            duration_weeks: 8,
            final_note: None,
            created_at: Utc::now(),
        }
    }

    fn assignment(program_id: Uuid, start: NaiveDate) -> ProgramAssignment {
        ProgramAssignment {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            program_id,
            status: AssignmentStatus::Active,
            start_date: start,
        }
    }

    fn workouts(program_id: Uuid, days: &[i32]) -> Vec<(Workout, Vec<Exercise>)> {
        days.iter()
            .map(|&d| {
                (
                    Workout {
                        id: Uuid::new_v4(),
                        program_id,
                        day_number: d,
                        title: format!("Day {d}"),
                    },
                    vec![],
                )
            })
            .collect()
    }

    #[test]
    fn rotation_cycles_through_program_length() {
        let start = date(2024, 3, 4);
        assert_eq!(rotation_index(start, date(2024, 3, 4), 3), 0);
        assert_eq!(rotation_index(start, date(2024, 3, 5), 3), 1);
        assert_eq!(rotation_index(start, date(2024, 3, 6), 3), 2);
        assert_eq!(rotation_index(start, date(2024, 3, 7), 3), 0);
    }

    #[test]
    fn future_start_date_clamps_to_first_day() {
        assert_eq!(rotation_index(date(2024, 3, 10), date(2024, 3, 4), 3), 0);
    }

    #[test]
    fn today_view_follows_rotation() {
        let program = program();
        let assignment = assignment(program.id, date(2024, 3, 4));
        let workouts = workouts(program.id, &[1, 2, 3]);

        let view = project_today(&program, &assignment, &workouts, date(2024, 3, 5)).unwrap();
        assert_eq!(view.day_number, 2);

        let view = project_today(&program, &assignment, &workouts, date(2024, 3, 7)).unwrap();
        assert_eq!(view.day_number, 1);
    }

    #[test]
    fn week_view_marks_exactly_one_today() {
        let program = program();
        let assignment = assignment(program.id, date(2024, 3, 4));
        let workouts = workouts(program.id, &[1, 2, 3, 4]);

        let view = project_week(&program, &assignment, &workouts, date(2024, 3, 6));
        assert_eq!(view.days.len(), 4);
        assert_eq!(view.days.iter().filter(|d| d.is_today).count(), 1);
        assert!(view.days[2].is_today);
    }

    fn diet_plan() -> DietPlan {
        DietPlan {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            total_kcal: 2000,
            macros_target: MacrosTarget {
                protein_g: 150,
                carbs_g: 200,
                fat_g: 60,
            },
            updated_at: Utc::now(),
        }
    }

    fn meal(plan_id: Uuid, slot: MealSlot, ingredients: Vec<(&str, f64, &str)>) -> (Meal, Vec<Ingredient>) {
        let meal = Meal {
            id: Uuid::new_v4(),
            plan_id,
            slot,
            title: format!("{} meal", slot.as_str()),
            time_hint: None,
            kcal: 500,
        };
        let ingredients = ingredients
            .into_iter()
            .map(|(name, amount, unit)| Ingredient {
                id: Uuid::new_v4(),
                meal_id: meal.id,
                name: name.to_string(),
                amount,
                unit: unit.to_string(),
            })
            .collect();
        (meal, ingredients)
    }

    #[test]
    fn diet_today_maps_by_slot_not_position() {
        let plan = diet_plan();
        // Dinner listed first; breakfast second; no lunch or snack stored.
        let meals = vec![
            meal(plan.id, MealSlot::Dinner, vec![]),
            meal(plan.id, MealSlot::Breakfast, vec![]),
        ];

        let view = project_diet_today(&plan, &meals);
        assert!(view.breakfast.is_some());
        assert!(view.dinner.is_some());
        assert!(view.lunch.is_none());
        assert!(view.snack.is_none());
    }

    #[test]
    fn shopping_list_aggregates_case_insensitively() {
        let plan = diet_plan();
        let meals = vec![
            meal(plan.id, MealSlot::Breakfast, vec![("Oats", 80.0, "g"), ("milk", 200.0, "ml")]),
            meal(plan.id, MealSlot::Dinner, vec![("oats", 40.0, "g"), ("Chicken", 150.0, "g")]),
        ];

        let list = project_shopping_list(&meals);
        assert_eq!(list.items.len(), 3);
        let oats = list.items.iter().find(|i| i.name.eq_ignore_ascii_case("oats")).unwrap();
        assert!((oats.amount - 120.0).abs() < f64::EPSILON);
    }
}
