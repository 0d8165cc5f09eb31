use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

/// Recognized meal categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MealType {
    Breakfast,
    Lunch,
    Dinner,
    Snack,
}

impl MealType {
    /// Parse a category name case-insensitively. Unrecognized names are `None`.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "breakfast" => Some(Self::Breakfast),
            "lunch" => Some(Self::Lunch),
            "dinner" => Some(Self::Dinner),
            "snack" => Some(Self::Snack),
            _ => None,
        }
    }
}

/// A meal category as extracted: either a recognized enum value or the
/// verbatim string the model produced (flagged later by validation).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MealKind {
    Known(MealType),
    Other(String),
}

impl MealKind {
    pub fn from_raw(s: &str) -> Option<Self> {
        let trimmed = s.trim();
        if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("unknown") {
            return None;
        }
        Some(match MealType::parse(trimmed) {
            Some(known) => Self::Known(known),
            None => Self::Other(trimmed.to_string()),
        })
    }
}

/// Per-field extraction confidence in [0, 1]. Independent scores, not an
/// aggregate; `None` means the model reported nothing for the field.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConfidenceMap {
    pub meal_type: Option<f32>,
    pub custom_name: Option<f32>,
    pub calories: Option<f32>,
    pub protein: Option<f32>,
    pub carbs: Option<f32>,
    pub fats: Option<f32>,
}

/// Structured nutrition estimate extracted from free text.
///
/// Any field may be unknown (`None`); unknown is always preferred over a
/// fabricated value when the source text is too vague.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParsedMeal {
    pub meal_type: Option<MealKind>,
    pub custom_name: Option<String>,
    pub calories: Option<f64>,
    pub protein: Option<f64>,
    pub carbs: Option<f64>,
    pub fats: Option<f64>,
    pub servings: f64,
    #[serde(with = "time::serde::rfc3339")]
    pub meal_date: OffsetDateTime,
    pub confidence: ConfidenceMap,
}

impl ParsedMeal {
    /// A meal with nothing known beyond the raw text the user typed.
    ///
    /// Confidence is reported as zero rather than absent so validation
    /// still asks a follow-up question instead of accepting the blank.
    pub fn unknown(raw_input: &str) -> Self {
        Self {
            meal_type: None,
            custom_name: Some(raw_input.trim().to_string()).filter(|s| !s.is_empty()),
            calories: None,
            protein: None,
            carbs: None,
            fats: None,
            servings: 1.0,
            meal_date: OffsetDateTime::now_utc(),
            confidence: ConfidenceMap {
                meal_type: Some(0.0),
                custom_name: Some(0.0),
                calories: Some(0.0),
                protein: Some(0.0),
                carbs: Some(0.0),
                fats: Some(0.0),
            },
        }
    }

    /// Name used when talking to the user about this meal.
    pub fn display_name(&self) -> &str {
        self.custom_name.as_deref().unwrap_or("this meal")
    }
}
