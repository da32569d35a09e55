//! crates/wellness_core/src/profile.rs
//!
//! The profile assembler: turns a stored `UserProfile` into the enriched
//! input the generative client needs, with derived age and soft warnings for
//! missing personalization fields. "Today" is always injected by the caller
//! so the derivation stays deterministic.

use chrono::{Datelike, NaiveDate};

use crate::domain::{AssembledProfile, PlanKind, UserProfile};

/// Whole years between `birthdate` and `today`, decremented when the
/// birthday has not yet occurred this year.
pub fn derive_age(birthdate: NaiveDate, today: NaiveDate) -> u32 {
    let mut age = today.year() - birthdate.year();
    if (today.month(), today.day()) < (birthdate.month(), birthdate.day()) {
        age -= 1;
    }
    age.max(0) as u32
}

/// Assembles the generation input for one request.
///
/// Missing fields produce warnings, never errors: generation proceeds with
/// reduced personalization and the caller surfaces the warnings to the user.
pub fn assemble_profile(profile: UserProfile, today: NaiveDate, kind: PlanKind) -> AssembledProfile {
    let mut warnings = Vec::new();

    let age = profile.birthdate.map(|b| derive_age(b, today));
    if age.is_none() {
        warnings.push("no birthdate on file; plan is not age-adjusted".to_string());
    }
    if profile.weight_kg.is_none() {
        warnings.push("no body weight on file; targets use population defaults".to_string());
    }
    if profile.primary_goal.is_none() {
        warnings.push("no primary goal on file; assuming general fitness".to_string());
    }

    match kind {
        PlanKind::Training => {
            if profile.activity_level.is_none() {
                warnings.push("no activity level on file; assuming moderate".to_string());
            }
        }
        PlanKind::Diet => {
            if profile.height_cm.is_none() {
                warnings.push("no height on file; calorie target is approximate".to_string());
            }
        }
    }

    AssembledProfile {
        profile,
        age,
        warnings,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn bare_profile() -> UserProfile {
        UserProfile {
            user_id: Uuid::new_v4(),
            sex: None,
            height_cm: None,
            weight_kg: None,
            activity_level: None,
            primary_goal: None,
            dietary_preferences: vec![],
            allergies: vec![],
            birthdate: None,
        }
    }

    #[test]
    fn age_counts_completed_years_only() {
        let birth = date(1990, 6, 15);
        assert_eq!(derive_age(birth, date(2024, 6, 14)), 33);
        assert_eq!(derive_age(birth, date(2024, 6, 15)), 34);
        assert_eq!(derive_age(birth, date(2024, 6, 16)), 34);
    }

    #[test]
    fn age_handles_year_boundary() {
        let birth = date(2000, 12, 31);
        assert_eq!(derive_age(birth, date(2024, 1, 1)), 23);
        assert_eq!(derive_age(birth, date(2024, 12, 31)), 24);
    }

    #[test]
    fn missing_fields_warn_but_do_not_fail() {
        let assembled = assemble_profile(bare_profile(), date(2024, 1, 1), PlanKind::Diet);
        assert!(assembled.age.is_none());
        assert!(!assembled.warnings.is_empty());
        assert!(assembled
            .warnings
            .iter()
            .any(|w| w.contains("body weight")));
    }

    #[test]
    fn complete_profile_produces_no_warnings() {
        let mut profile = bare_profile();
        profile.birthdate = Some(date(1992, 3, 2));
        profile.weight_kg = Some(74.0);
        profile.height_cm = Some(181.0);
        profile.activity_level = Some(crate::domain::ActivityLevel::Moderate);
        profile.primary_goal = Some(crate::domain::PrimaryGoal::GainMuscle);

        let assembled = assemble_profile(profile, date(2024, 3, 1), PlanKind::Training);
        assert_eq!(assembled.age, Some(31));
        assert!(assembled.warnings.is_empty());
    }
}
