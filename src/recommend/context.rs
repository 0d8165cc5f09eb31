use std::time::Duration;

use time::OffsetDateTime;
use tracing::warn;
use uuid::Uuid;

use crate::conversation::Conversation;
use crate::meals::repo::MealLog;
use crate::state::AppState;

use super::prompt::{PromptContext, TranscriptLine};
use super::repo::{Goal, Preferences, Profile};
use super::targets::{daily_targets, GoalType, Targets};

/// Short-term memory window: the last 10 exchange pairs.
const SHORT_TERM_MESSAGES: i64 = 20;

/// How many long-term snippets to pull into the prompt.
const LONG_TERM_K: usize = 5;

/// A slow or failing memory read degrades to "no long-term context".
const MEMORY_TIMEOUT: Duration = Duration::from_secs(2);

#[derive(Debug, thiserror::Error)]
pub enum ContextError {
    /// Onboarding data the recommendation cannot work without.
    #[error("{0} not found; complete onboarding first")]
    MissingData(&'static str),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Gather every context slice for one recommendation request.
///
/// The relational reads are independent and run concurrently. Semantic
/// memory is optional: a timeout or error leaves the long-term section
/// empty. Missing profile, goal, or preferences is a hard error.
pub async fn assemble(
    state: &AppState,
    user_id: Uuid,
    message: &str,
) -> Result<PromptContext, ContextError> {
    let now = OffsetDateTime::now_utc();

    let (profile, goal, preferences, meals, recent) = tokio::try_join!(
        Profile::find(&state.db, user_id),
        Goal::find_active(&state.db, user_id),
        Preferences::find(&state.db, user_id),
        MealLog::logged_today(&state.db, user_id, now),
        Conversation::recent_messages(&state.db, user_id, SHORT_TERM_MESSAGES),
    )?;

    let profile = profile.ok_or(ContextError::MissingData("profile"))?;
    let goal = goal.ok_or(ContextError::MissingData("active goal"))?;
    let preferences = preferences.ok_or(ContextError::MissingData("preferences"))?;

    let long_term = match tokio::time::timeout(
        MEMORY_TIMEOUT,
        state.memory.recall(user_id, message, LONG_TERM_K),
    )
    .await
    {
        Ok(snippets) => snippets,
        Err(_) => {
            warn!(%user_id, "semantic memory timed out, continuing without it");
            Vec::new()
        }
    };

    let targets = daily_targets(&profile, GoalType::parse(&goal.goal_type));

    // Fetched newest-first; the prompt wants chronological order.
    let mut recent = recent;
    recent.reverse();
    let short_term = recent
        .into_iter()
        .map(|m| TranscriptLine {
            role: m.role,
            content: m.content,
        })
        .collect();

    let context = PromptContext::new(
        profile_summary(&profile, &preferences),
        targets_summary(&goal, &targets),
        meals_today_summary(&meals),
        short_term,
        long_term,
        message.to_string(),
    )?;
    Ok(context)
}

fn profile_summary(profile: &Profile, preferences: &Preferences) -> String {
    let mut summary = format!(
        "{}-year-old {}, {} kg, {} cm, activity level: {}.",
        profile.age,
        profile.gender.as_deref().unwrap_or("person"),
        profile.weight_kg,
        profile.height_cm,
        profile.activity_level,
    );
    if let Some(restrictions) = preferences
        .dietary_restrictions
        .as_deref()
        .filter(|s| !s.trim().is_empty())
    {
        summary.push_str(&format!(" Dietary restrictions: {}.", restrictions));
    }
    if let Some(allergies) = preferences
        .allergies
        .as_deref()
        .filter(|s| !s.trim().is_empty())
    {
        summary.push_str(&format!(" Allergies: {}.", allergies));
    }
    summary
}

fn targets_summary(goal: &Goal, targets: &Targets) -> String {
    format!(
        "Goal: {}. BMR {} kcal, TDEE {} kcal, daily calorie target {} kcal, protein target {} g.",
        goal.goal_type,
        targets.bmr.round() as i64,
        targets.tdee,
        targets.calories,
        targets.protein_g,
    )
}

/// One line per meal-type group with serving-multiplied macro totals.
/// Prompt templates never receive a blank section, so an empty day renders
/// an explicit sentence instead of an empty string.
fn meals_today_summary(meals: &[MealLog]) -> String {
    if meals.is_empty() {
        return "No meals logged today.".to_string();
    }

    let mut order: Vec<String> = Vec::new();
    let mut groups: std::collections::HashMap<String, (usize, f64, f64, f64, f64)> =
        std::collections::HashMap::new();

    for meal in meals {
        let key = meal.meal_type.to_lowercase();
        if !groups.contains_key(&key) {
            order.push(key.clone());
        }
        let entry = groups.entry(key).or_insert((0, 0.0, 0.0, 0.0, 0.0));
        entry.0 += 1;
        entry.1 += meal.calories.unwrap_or(0.0) * meal.servings;
        entry.2 += meal.protein.unwrap_or(0.0) * meal.servings;
        entry.3 += meal.carbs.unwrap_or(0.0) * meal.servings;
        entry.4 += meal.fats.unwrap_or(0.0) * meal.servings;
    }

    order
        .into_iter()
        .map(|key| {
            let (count, calories, protein, carbs, fats) = groups[&key];
            format!(
                "- {}: {} item{}, {} kcal, {}g protein, {}g carbs, {}g fat",
                key,
                count,
                if count == 1 { "" } else { "s" },
                calories.round() as i64,
                protein.round() as i64,
                carbs.round() as i64,
                fats.round() as i64,
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    fn log(meal_type: &str, calories: f64, protein: f64, servings: f64) -> MealLog {
        MealLog {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            meal_type: meal_type.into(),
            custom_name: None,
            calories: Some(calories),
            protein: Some(protein),
            carbs: Some(10.0),
            fats: Some(5.0),
            servings,
            logged_at: datetime!(2026-03-14 08:00:00 UTC),
        }
    }

    #[test]
    fn empty_day_renders_explicit_sentence() {
        assert_eq!(meals_today_summary(&[]), "No meals logged today.");
    }

    #[test]
    fn groups_by_meal_type_with_serving_multiplied_totals() {
        let meals = vec![
            log("breakfast", 300.0, 20.0, 1.0),
            log("breakfast", 100.0, 5.0, 2.0),
            log("lunch", 600.0, 40.0, 1.0),
        ];
        let summary = meals_today_summary(&meals);
        let lines: Vec<&str> = summary.lines().collect();
        assert_eq!(lines.len(), 2);
        // 300·1 + 100·2 = 500 kcal, 20·1 + 5·2 = 30 g protein
        assert!(lines[0].contains("breakfast: 2 items, 500 kcal, 30g protein"));
        assert!(lines[1].contains("lunch: 1 item, 600 kcal, 40g protein"));
    }

    #[test]
    fn profile_summary_includes_preferences_when_present() {
        let profile = Profile {
            user_id: Uuid::new_v4(),
            age: 30,
            weight_kg: 70.0,
            height_cm: 170.0,
            gender: Some("male".into()),
            activity_level: "moderately_active".into(),
        };
        let preferences = Preferences {
            user_id: profile.user_id,
            dietary_restrictions: Some("vegetarian".into()),
            allergies: None,
        };
        let summary = profile_summary(&profile, &preferences);
        assert!(summary.contains("30-year-old male"));
        assert!(summary.contains("Dietary restrictions: vegetarian."));
        assert!(!summary.contains("Allergies"));
    }

    #[test]
    fn targets_summary_quotes_goal_and_numbers() {
        let goal = Goal {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            goal_type: "FAT_LOSS".into(),
            active: true,
        };
        let targets = Targets {
            bmr: 1617.5,
            tdee: 2507,
            calories: 2107,
            protein_g: 140,
        };
        let summary = targets_summary(&goal, &targets);
        assert!(summary.contains("FAT_LOSS"));
        assert!(summary.contains("2107"));
        assert!(summary.contains("140 g"));
    }
}
