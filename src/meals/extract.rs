use serde::Deserialize;
use serde_json::Value;
use time::OffsetDateTime;
use tracing::warn;

use super::types::{ConfidenceMap, MealKind, ParsedMeal};
use crate::llm::{self, CompletionClient};

/// Extract a structured meal from free text.
///
/// Transport failures of the completion call are errors; a completion that
/// cannot be parsed is not. Malformed output degrades to an all-unknown
/// meal carrying the raw input as its name, so the clarification loop can
/// still ask a useful question.
pub async fn extract_meal(llm: &CompletionClient, text: &str) -> llm::Result<ParsedMeal> {
    let completion = llm.complete(&extraction_prompt(text)).await?;
    Ok(parse_completion(&completion, text))
}

fn extraction_prompt(text: &str) -> String {
    format!(
        r#"Parse this meal description into nutrition data.

Meal description: "{}"

Return strict JSON with exactly these keys:
{{
    "meal_type": "breakfast" | "lunch" | "dinner" | "snack" | null,
    "custom_name": "short dish name" | null,
    "calories": number | null,
    "protein": number | null,
    "carbs": number | null,
    "fats": number | null,
    "servings": number,
    "confidence": {{
        "meal_type": number, "custom_name": number, "calories": number,
        "protein": number, "carbs": number, "fats": number
    }}
}}

Rules:
- Estimate calories and macros (grams) using standard portion-size references.
- Confidence values are per field, between 0 and 1.
- If the description is too vague to support a field, use null. Never guess.
- servings defaults to 1 when the text gives no quantity.
- Output only the JSON object, no commentary."#,
        text.trim()
    )
}

#[derive(Debug, Deserialize)]
struct RawConfidence {
    meal_type: Option<f32>,
    custom_name: Option<f32>,
    calories: Option<f32>,
    protein: Option<f32>,
    carbs: Option<f32>,
    fats: Option<f32>,
}

#[derive(Debug, Deserialize)]
struct RawExtraction {
    meal_type: Option<String>,
    custom_name: Option<String>,
    calories: Option<f64>,
    protein: Option<f64>,
    carbs: Option<f64>,
    fats: Option<f64>,
    servings: Option<f64>,
    confidence: Option<RawConfidence>,
}

/// Turn a raw completion into a `ParsedMeal`, degrading on any parse failure.
pub fn parse_completion(completion: &str, raw_input: &str) -> ParsedMeal {
    let Some(json) = extract_json(completion) else {
        warn!("completion contained no parseable JSON, degrading to unknown meal");
        return ParsedMeal::unknown(raw_input);
    };

    let raw: RawExtraction = match serde_json::from_value(json) {
        Ok(raw) => raw,
        Err(e) => {
            warn!(error = %e, "completion JSON failed schema validation, degrading");
            return ParsedMeal::unknown(raw_input);
        }
    };

    sanitize(raw, raw_input)
}

/// Apply the extraction invariants: no negative numbers, positive servings,
/// confidences clamped into [0, 1].
fn sanitize(raw: RawExtraction, raw_input: &str) -> ParsedMeal {
    let confidence = raw
        .confidence
        .map(|c| ConfidenceMap {
            meal_type: c.meal_type.map(clamp_unit),
            custom_name: c.custom_name.map(clamp_unit),
            calories: c.calories.map(clamp_unit),
            protein: c.protein.map(clamp_unit),
            carbs: c.carbs.map(clamp_unit),
            fats: c.fats.map(clamp_unit),
        })
        .unwrap_or_default();

    let custom_name = raw
        .custom_name
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty() && !s.eq_ignore_ascii_case("unknown"))
        .or_else(|| {
            let trimmed = raw_input.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_string())
        });

    ParsedMeal {
        meal_type: raw.meal_type.as_deref().and_then(MealKind::from_raw),
        custom_name,
        calories: raw.calories.filter(|v| *v >= 0.0),
        protein: raw.protein.filter(|v| *v >= 0.0),
        carbs: raw.carbs.filter(|v| *v >= 0.0),
        fats: raw.fats.filter(|v| *v >= 0.0),
        servings: raw.servings.filter(|s| *s > 0.0).unwrap_or(1.0),
        meal_date: OffsetDateTime::now_utc(),
        confidence,
    }
}

fn clamp_unit(v: f32) -> f32 {
    v.clamp(0.0, 1.0)
}

/// Pull a JSON object out of a completion, tolerating code fences and
/// surrounding prose.
fn extract_json(text: &str) -> Option<Value> {
    // ```json fenced block
    if let Some(start) = text.find("```json") {
        let start = start + 7;
        if let Some(end) = text[start..].find("```") {
            if let Ok(json) = serde_json::from_str(&text[start..start + end]) {
                return Some(json);
            }
        }
    }

    // generic fenced block
    if let Some(start) = text.find("```") {
        let start = start + 3;
        let start = text[start..]
            .find('\n')
            .map(|i| start + i + 1)
            .unwrap_or(start);
        if let Some(end) = text[start..].find("```") {
            if let Ok(json) = serde_json::from_str(&text[start..start + end]) {
                return Some(json);
            }
        }
    }

    // first balanced object in raw text
    if let Some(start) = text.find('{') {
        let mut depth = 0;
        let mut end = start;
        for (i, c) in text[start..].char_indices() {
            match c {
                '{' => depth += 1,
                '}' => {
                    depth -= 1;
                    if depth == 0 {
                        end = start + i + 1;
                        break;
                    }
                }
                _ => {}
            }
        }
        if end > start {
            if let Ok(json) = serde_json::from_str(&text[start..end]) {
                return Some(json);
            }
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::meals::types::MealType;

    #[test]
    fn parses_fenced_json_completion() {
        let completion = r#"Here you go:
```json
{"meal_type": "lunch", "custom_name": "grilled chicken breast", "calories": 330,
 "protein": 62, "carbs": 0, "fats": 7, "servings": 1,
 "confidence": {"meal_type": 0.9, "custom_name": 0.95, "calories": 0.8,
                "protein": 0.8, "carbs": 0.7, "fats": 0.7}}
```"#;
        let meal = parse_completion(completion, "grilled chicken breast, 200g");
        assert_eq!(meal.meal_type, Some(MealKind::Known(MealType::Lunch)));
        assert_eq!(meal.custom_name.as_deref(), Some("grilled chicken breast"));
        assert_eq!(meal.calories, Some(330.0));
        assert_eq!(meal.servings, 1.0);
        assert_eq!(meal.confidence.calories, Some(0.8));
    }

    #[test]
    fn garbage_completion_degrades_to_unknown_meal() {
        let meal = parse_completion("I couldn't quite figure that out, sorry!", "food");
        assert_eq!(meal.meal_type, None);
        assert_eq!(meal.custom_name.as_deref(), Some("food"));
        assert_eq!(meal.calories, None);
        assert_eq!(meal.confidence.calories, Some(0.0));
    }

    #[test]
    fn negative_numbers_are_discarded_not_kept() {
        let completion = r#"{"meal_type": "snack", "custom_name": "mystery bar",
            "calories": -120, "protein": 5, "carbs": null, "fats": -1,
            "servings": 1, "confidence": {"meal_type": 0.6, "custom_name": 0.6,
            "calories": 0.6, "protein": 0.6, "carbs": 0.0, "fats": 0.6}}"#;
        let meal = parse_completion(completion, "a bar");
        assert_eq!(meal.calories, None);
        assert_eq!(meal.fats, None);
        assert_eq!(meal.protein, Some(5.0));
    }

    #[test]
    fn non_positive_servings_fall_back_to_one() {
        let completion =
            r#"{"meal_type": null, "custom_name": "toast", "calories": 150, "protein": 4,
                "carbs": 25, "fats": 3, "servings": 0, "confidence": null}"#;
        let meal = parse_completion(completion, "toast");
        assert_eq!(meal.servings, 1.0);
    }

    #[test]
    fn unrecognized_category_is_preserved_for_validation() {
        let completion = r#"{"meal_type": "brunch", "custom_name": "eggs benedict",
            "calories": 600, "protein": 25, "carbs": 35, "fats": 40, "servings": 1,
            "confidence": null}"#;
        let meal = parse_completion(completion, "eggs benedict");
        assert_eq!(meal.meal_type, Some(MealKind::Other("brunch".into())));
    }

    #[test]
    fn out_of_range_confidences_are_clamped() {
        let completion = r#"{"meal_type": "dinner", "custom_name": "stew", "calories": 450,
            "protein": 30, "carbs": 20, "fats": 25, "servings": 1,
            "confidence": {"meal_type": 1.4, "custom_name": 0.9, "calories": -0.2,
                           "protein": 0.9, "carbs": 0.9, "fats": 0.9}}"#;
        let meal = parse_completion(completion, "stew");
        assert_eq!(meal.confidence.meal_type, Some(1.0));
        assert_eq!(meal.confidence.calories, Some(0.0));
    }
}
