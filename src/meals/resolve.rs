use serde::Serialize;

use super::types::{MealKind, ParsedMeal};

/// Calories outside this range are implausible for a single human meal.
const CALORIE_RANGE: (f64, f64) = (10.0, 2000.0);

/// Confidence below this asks for clarification.
const LOW_CONFIDENCE: f32 = 0.5;

/// Servings outside this range are implausible.
const MAX_SERVINGS: f64 = 10.0;

/// A named defect in a `ParsedMeal` that needs clarifying before persisting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ValidationIssue {
    #[serde(rename = "calories_unrealistic")]
    CaloriesUnrealistic,
    #[serde(rename = "mealType_invalid")]
    MealTypeInvalid,
    #[serde(rename = "mealType_low_confidence")]
    MealTypeLowConfidence,
    #[serde(rename = "calories_low_confidence")]
    CaloriesLowConfidence,
    #[serde(rename = "servings_unrealistic")]
    ServingsUnrealistic,
}

/// Collect every issue present. Rules are independent; an empty result
/// means the meal is ready to persist as-is.
pub fn validate(meal: &ParsedMeal) -> Vec<ValidationIssue> {
    let mut issues = Vec::new();

    if let Some(calories) = meal.calories {
        if calories < CALORIE_RANGE.0 || calories > CALORIE_RANGE.1 {
            issues.push(ValidationIssue::CaloriesUnrealistic);
        }
    }

    if let Some(MealKind::Other(_)) = meal.meal_type {
        issues.push(ValidationIssue::MealTypeInvalid);
    }

    if let Some(c) = meal.confidence.meal_type {
        if c < LOW_CONFIDENCE {
            issues.push(ValidationIssue::MealTypeLowConfidence);
        }
    }

    if let Some(c) = meal.confidence.calories {
        if c < LOW_CONFIDENCE {
            issues.push(ValidationIssue::CaloriesLowConfidence);
        }
    }

    if meal.servings < 0.0 || meal.servings > MAX_SERVINGS {
        issues.push(ValidationIssue::ServingsUnrealistic);
    }

    issues
}

/// Pick exactly one follow-up question for the highest-priority issue, so
/// the user is asked one thing at a time.
pub fn clarification_question(meal: &ParsedMeal, issues: &[ValidationIssue]) -> String {
    let name = meal.display_name();

    if issues.contains(&ValidationIssue::MealTypeInvalid)
        || issues.contains(&ValidationIssue::MealTypeLowConfidence)
    {
        return format!(
            "Was \"{}\" breakfast, lunch, dinner, or a snack?",
            name
        );
    }

    if issues.contains(&ValidationIssue::CaloriesUnrealistic) {
        let calories = meal.calories.unwrap_or_default();
        return format!(
            "I estimated {} calories for \"{}\", which looks off for a single meal. \
             Roughly how large was the portion?",
            calories, name
        );
    }

    if issues.contains(&ValidationIssue::CaloriesLowConfidence) {
        return format!(
            "I'm not confident about the calories in \"{}\". \
             Can you describe the portion size or main ingredients?",
            name
        );
    }

    if issues.contains(&ValidationIssue::ServingsUnrealistic) {
        return format!(
            "How many servings of \"{}\" did you actually have?",
            name
        );
    }

    format!(
        "Can you tell me a bit more about \"{}\"? Portion size, main ingredients, \
         or how it was prepared all help.",
        name
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::meals::types::{MealType, ParsedMeal};

    fn meal() -> ParsedMeal {
        let mut m = ParsedMeal::unknown("grilled chicken breast");
        m.meal_type = Some(MealKind::Known(MealType::Lunch));
        m.calories = Some(330.0);
        m.protein = Some(62.0);
        m.carbs = Some(0.0);
        m.fats = Some(7.0);
        m.confidence.meal_type = Some(0.9);
        m.confidence.calories = Some(0.8);
        m
    }

    #[test]
    fn clean_meal_has_no_issues() {
        assert!(validate(&meal()).is_empty());
    }

    #[test]
    fn flags_calories_outside_plausible_range() {
        let mut m = meal();
        m.calories = Some(9000.0);
        assert!(validate(&m).contains(&ValidationIssue::CaloriesUnrealistic));

        m.calories = Some(5.0);
        assert!(validate(&m).contains(&ValidationIssue::CaloriesUnrealistic));

        m.calories = Some(2000.0);
        assert!(!validate(&m).contains(&ValidationIssue::CaloriesUnrealistic));
    }

    #[test]
    fn unknown_calories_are_not_flagged_as_unrealistic() {
        let mut m = meal();
        m.calories = None;
        m.confidence.calories = None;
        assert!(validate(&m).is_empty());
    }

    #[test]
    fn flags_unrecognized_meal_type() {
        let mut m = meal();
        m.meal_type = Some(MealKind::Other("brunch".into()));
        assert!(validate(&m).contains(&ValidationIssue::MealTypeInvalid));
    }

    #[test]
    fn flags_low_confidence_fields() {
        let mut m = meal();
        m.confidence.meal_type = Some(0.3);
        m.confidence.calories = Some(0.2);
        let issues = validate(&m);
        assert!(issues.contains(&ValidationIssue::MealTypeLowConfidence));
        assert!(issues.contains(&ValidationIssue::CaloriesLowConfidence));
    }

    #[test]
    fn flags_unrealistic_servings() {
        let mut m = meal();
        m.servings = 14.0;
        assert!(validate(&m).contains(&ValidationIssue::ServingsUnrealistic));
    }

    #[test]
    fn issues_accumulate_independently() {
        let mut m = meal();
        m.calories = Some(4000.0);
        m.meal_type = Some(MealKind::Other("feast".into()));
        m.servings = 12.0;
        let issues = validate(&m);
        assert_eq!(issues.len(), 3);
    }

    #[test]
    fn meal_type_question_wins_over_calorie_question() {
        let mut m = meal();
        m.calories = Some(4000.0);
        m.confidence.meal_type = Some(0.2);
        let issues = validate(&m);
        let q = clarification_question(&m, &issues);
        assert!(q.contains("breakfast, lunch, dinner, or a snack"));
    }

    #[test]
    fn calorie_question_quotes_exact_figure() {
        let mut m = meal();
        m.calories = Some(4000.0);
        let issues = validate(&m);
        let q = clarification_question(&m, &issues);
        assert!(q.contains("4000"));
        assert!(q.contains("grilled chicken breast"));
    }

    #[test]
    fn generic_question_asks_for_detail() {
        let m = meal();
        let q = clarification_question(&m, &[]);
        assert!(q.contains("portion size"));
    }

    #[test]
    fn question_uses_placeholder_when_name_unknown() {
        let mut m = ParsedMeal::unknown("");
        m.confidence.meal_type = Some(0.1);
        let issues = validate(&m);
        let q = clarification_question(&m, &issues);
        assert!(q.contains("this meal"));
    }

    #[test]
    fn issue_codes_serialize_to_wire_names() {
        let json = serde_json::to_string(&vec![
            ValidationIssue::CaloriesUnrealistic,
            ValidationIssue::MealTypeInvalid,
            ValidationIssue::MealTypeLowConfidence,
            ValidationIssue::CaloriesLowConfidence,
            ValidationIssue::ServingsUnrealistic,
        ])
        .unwrap();
        assert_eq!(
            json,
            r#"["calories_unrealistic","mealType_invalid","mealType_low_confidence","calories_low_confidence","servings_unrealistic"]"#
        );
    }
}
