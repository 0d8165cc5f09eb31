use super::repo::Profile;

/// Protein target in grams per kg of body weight, regardless of goal.
const PROTEIN_PER_KG: f64 = 2.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GoalType {
    MuscleGain,
    FatLoss,
    Recomposition,
    Maintenance,
}

impl GoalType {
    /// Parse a stored goal name; anything unrecognized reads as maintenance
    /// (no calorie adjustment).
    pub fn parse(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "muscle_gain" | "muscle gain" => Self::MuscleGain,
            "fat_loss" | "fat loss" | "weight_loss" => Self::FatLoss,
            "recomposition" | "recomp" => Self::Recomposition,
            _ => Self::Maintenance,
        }
    }

    fn calorie_adjustment(self) -> i64 {
        match self {
            Self::MuscleGain => 350,
            Self::FatLoss => -400,
            Self::Recomposition | Self::Maintenance => 0,
        }
    }
}

/// Derived daily numeric targets.
#[derive(Debug, Clone, Copy)]
pub struct Targets {
    pub bmr: f64,
    pub tdee: i64,
    pub calories: i64,
    pub protein_g: i64,
}

/// Compute BMR (Mifflin-St Jeor), TDEE, and goal-adjusted targets.
pub fn daily_targets(profile: &Profile, goal: GoalType) -> Targets {
    let bmr = mifflin_st_jeor(
        profile.weight_kg,
        profile.height_cm,
        profile.age,
        profile.gender.as_deref(),
    );
    let tdee = (bmr * activity_multiplier(&profile.activity_level)).round() as i64;
    Targets {
        bmr,
        tdee,
        calories: tdee + goal.calorie_adjustment(),
        protein_g: (profile.weight_kg * PROTEIN_PER_KG).round() as i64,
    }
}

/// 10·weight + 6.25·height − 5·age, −161 for female and +5 otherwise.
fn mifflin_st_jeor(weight_kg: f64, height_cm: f64, age: i32, gender: Option<&str>) -> f64 {
    let offset = match gender {
        Some(g) if g.eq_ignore_ascii_case("female") => -161.0,
        _ => 5.0,
    };
    10.0 * weight_kg + 6.25 * height_cm - 5.0 * f64::from(age) + offset
}

/// Map free-ish activity-level text onto a multiplier tier. The very/extra
/// tiers are matched before the bare "active" tier.
fn activity_multiplier(activity_level: &str) -> f64 {
    let level = activity_level.to_lowercase();
    if level.contains("sedentary") {
        1.2
    } else if level.contains("light") {
        1.375
    } else if level.contains("moderate") {
        1.55
    } else if level.contains("very") || level.contains("extra") {
        1.9
    } else if level.contains("active") {
        1.725
    } else {
        1.2
    }
}
