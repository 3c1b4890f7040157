//! Built-in exercise catalog.
//!
//! Read-only lookup from exercise name to display metadata. Names the catalog
//! doesn't know resolve to a placeholder entry instead of failing.

use crate::routine;
use crate::types::*;
use once_cell::sync::Lazy;
use std::borrow::Cow;
use std::collections::HashMap;

/// Cached default catalog, built once per process
static DEFAULT_CATALOG: Lazy<Catalog> = Lazy::new(build_default_catalog);

/// Get a reference to the cached default catalog
pub fn get_default_catalog() -> &'static Catalog {
    &DEFAULT_CATALOG
}

/// (name, target muscles, form tip, demo search terms)
const ENTRIES: &[(&str, &str, &str, &str)] = &[
    // Base routine
    (
        "Goblet Squats",
        "Quads, glutes, core",
        "Hold weight at chest. Sit back deep. Knees out.",
        "goblet+squat+form",
    ),
    (
        "Dumbbell Rows",
        "Lats, rhomboids, rear delts",
        "Flat back. Pull weights to hip pockets. Squeeze back.",
        "dumbbell+row+form",
    ),
    (
        "Push-ups",
        "Chest, triceps, front delts",
        "Straight line from head to heels. Chest to floor.",
        "push+up+form",
    ),
    (
        "Overhead Press",
        "Shoulders, triceps, upper back",
        "Core tight. Press straight up. Don't arch back.",
        "dumbbell+overhead+press+form",
    ),
    (
        "Reverse Lunges",
        "Quads, glutes, hamstrings",
        "Step back far. Lower back knee to ground. Torso upright.",
        "reverse+lunge+form",
    ),
    (
        "Plank",
        "Abs, obliques, lower back",
        "Elbows under shoulders. Squeeze glutes and abs hard.",
        "forearm+plank+form",
    ),
    // Swim prep
    (
        "Arm Circles",
        "Shoulders, rotator cuff",
        "Arms straight. Start small, grow the circles. Reverse halfway.",
        "arm+circles+warm+up",
    ),
    (
        "Flutter Kicks",
        "Hip flexors, lower abs",
        "Lower back pressed down. Small fast kicks from the hip.",
        "flutter+kicks+form",
    ),
    (
        "Superman Hold",
        "Lower back, glutes, upper back",
        "Lift arms and legs together. Look at the floor. Hold still.",
        "superman+hold+form",
    ),
    (
        "Streamline Squats",
        "Legs, shoulders, core",
        "Arms locked overhead, biceps by ears. Squat without dropping the arms.",
        "streamline+squat+swimming",
    ),
    // Calisthenics
    (
        "Pull-ups",
        "Lats, biceps, grip",
        "Dead hang start. Chest to bar. Control the descent.",
        "pull+up+form",
    ),
    (
        "Dips",
        "Triceps, chest, front delts",
        "Shoulders down. Lower to 90 degrees at the elbow. Lock out on top.",
        "parallel+bar+dips+form",
    ),
    (
        "Pike Push-ups",
        "Shoulders, triceps",
        "Hips high. Head travels forward of the hands. Elbows at 45 degrees.",
        "pike+push+up+form",
    ),
    (
        "Bodyweight Squats",
        "Quads, glutes",
        "Feet shoulder width. Hips below knees. Heels stay down.",
        "bodyweight+squat+form",
    ),
    // Abs
    (
        "Crunches",
        "Upper abs",
        "Hands light behind head. Curl ribs to hips. Don't pull the neck.",
        "crunch+form",
    ),
    (
        "Leg Raises",
        "Lower abs, hip flexors",
        "Lower back flat. Lower slowly. Stop before the heels touch.",
        "lying+leg+raise+form",
    ),
    (
        "Russian Twists",
        "Obliques",
        "Lean back, chest up. Rotate from the ribs, not the arms.",
        "russian+twist+form",
    ),
    (
        "Mountain Climbers",
        "Core, shoulders, hip flexors",
        "Hands under shoulders. Drive knees fast. Hips level.",
        "mountain+climbers+form",
    ),
];

/// Builds the default catalog
///
/// Prefer `get_default_catalog()` outside of tests.
pub fn build_default_catalog() -> Catalog {
    let exercises = ENTRIES
        .iter()
        .map(|(name, muscles, tip, search)| {
            (
                name.to_string(),
                Exercise {
                    name: name.to_string(),
                    demo_url: Some(format!(
                        "https://www.youtube.com/results?search_query={}",
                        search
                    )),
                    target_muscles: muscles.to_string(),
                    form_tip: tip.to_string(),
                },
            )
        })
        .collect::<HashMap<_, _>>();

    Catalog { exercises }
}

impl Catalog {
    /// Look up an exercise, substituting a placeholder for unknown names
    pub fn lookup(&self, name: &str) -> Cow<'_, Exercise> {
        match self.exercises.get(name) {
            Some(exercise) => Cow::Borrowed(exercise),
            None => {
                tracing::warn!("No catalog entry for '{}', using placeholder", name);
                Cow::Owned(Exercise::placeholder(name))
            }
        }
    }

    /// Validate the catalog against the routine definitions
    ///
    /// Returns a list of validation errors, or empty Vec if valid.
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        for (key, exercise) in &self.exercises {
            if key.is_empty() || exercise.name.is_empty() {
                errors.push("Exercise has empty name".to_string());
            }
            if key != &exercise.name {
                errors.push(format!(
                    "Exercise key '{}' doesn't match exercise.name '{}'",
                    key, exercise.name
                ));
            }
            if exercise.form_tip.is_empty() {
                errors.push(format!("Exercise '{}' has no form tip", key));
            }
        }

        for selection in RoutineSelection::all() {
            for (name, _) in routine::definition(selection) {
                if !self.exercises.contains_key(*name) {
                    errors.push(format!(
                        "Routine '{}' references unknown exercise '{}'",
                        selection, name
                    ));
                }
            }
        }

        errors
    }
}
