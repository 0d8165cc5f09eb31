use std::collections::HashMap;
use std::time::{Duration, Instant};

use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

use super::types::ParsedMeal;

/// Transient store of partial meals across clarification turns.
///
/// A clarification response hands the client an attempt id; resubmitting
/// with that id merges the new extraction over the stored partial instead
/// of starting from scratch. Entries expire after the configured TTL.
pub struct PartialMealStore {
    ttl: Duration,
    entries: RwLock<HashMap<Uuid, (ParsedMeal, Instant)>>,
}

impl PartialMealStore {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Store a partial under a fresh attempt id.
    pub async fn store(&self, meal: ParsedMeal) -> Uuid {
        let attempt_id = Uuid::new_v4();
        let mut entries = self.entries.write().await;
        entries.retain(|_, (_, stored_at)| stored_at.elapsed() < self.ttl);
        entries.insert(attempt_id, (meal, Instant::now()));
        debug!(%attempt_id, "stored partial meal");
        attempt_id
    }

    /// Remove and return the partial for an attempt, if it hasn't expired.
    pub async fn take(&self, attempt_id: Uuid) -> Option<ParsedMeal> {
        let mut entries = self.entries.write().await;
        let (meal, stored_at) = entries.remove(&attempt_id)?;
        if stored_at.elapsed() >= self.ttl {
            return None;
        }
        Some(meal)
    }
}

/// Merge a fresh extraction over a prior partial attempt.
///
/// Fields the fresh extraction knows win; unknown fields inherit the prior
/// value together with its confidence. `servings` keeps the prior count
/// when the fresh text gave no quantity (the 1.0 default). The name keeps
/// whichever side was extracted with more confidence, so a bare
/// clarification answer ("it was lunch") does not clobber a good dish name.
pub fn merge(prior: ParsedMeal, mut fresh: ParsedMeal) -> ParsedMeal {
    if fresh.meal_type.is_none() {
        fresh.meal_type = prior.meal_type;
        fresh.confidence.meal_type = prior.confidence.meal_type;
    }
    if fresh.calories.is_none() {
        fresh.calories = prior.calories;
        fresh.confidence.calories = prior.confidence.calories;
    }
    if fresh.protein.is_none() {
        fresh.protein = prior.protein;
        fresh.confidence.protein = prior.confidence.protein;
    }
    if fresh.carbs.is_none() {
        fresh.carbs = prior.carbs;
        fresh.confidence.carbs = prior.confidence.carbs;
    }
    if fresh.fats.is_none() {
        fresh.fats = prior.fats;
        fresh.confidence.fats = prior.confidence.fats;
    }

    if fresh.servings == 1.0 && prior.servings != 1.0 {
        fresh.servings = prior.servings;
    }

    let fresh_name_conf = fresh.confidence.custom_name.unwrap_or(0.0);
    let prior_name_conf = prior.confidence.custom_name.unwrap_or(0.0);
    if prior.custom_name.is_some() && (fresh.custom_name.is_none() || fresh_name_conf < prior_name_conf)
    {
        fresh.custom_name = prior.custom_name;
        fresh.confidence.custom_name = prior.confidence.custom_name;
    }

    fresh
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::meals::types::{MealKind, MealType};

    fn prior() -> ParsedMeal {
        let mut m = ParsedMeal::unknown("eggs benedict");
        m.calories = Some(600.0);
        m.confidence.calories = Some(0.7);
        m.confidence.custom_name = Some(0.8);
        m.servings = 2.0;
        m
    }

    #[test]
    fn fresh_known_fields_override_prior() {
        let mut fresh = ParsedMeal::unknown("it was lunch");
        fresh.meal_type = Some(MealKind::Known(MealType::Lunch));
        fresh.confidence.meal_type = Some(0.95);

        let merged = merge(prior(), fresh);
        assert_eq!(merged.meal_type, Some(MealKind::Known(MealType::Lunch)));
        assert_eq!(merged.confidence.meal_type, Some(0.95));
    }

    #[test]
    fn unknown_fresh_fields_inherit_prior_values() {
        let fresh = ParsedMeal::unknown("it was lunch");
        let merged = merge(prior(), fresh);
        assert_eq!(merged.calories, Some(600.0));
        assert_eq!(merged.confidence.calories, Some(0.7));
        assert_eq!(merged.servings, 2.0);
    }

    #[test]
    fn low_confidence_name_does_not_clobber_prior_name() {
        let fresh = ParsedMeal::unknown("it was lunch");
        let merged = merge(prior(), fresh);
        assert_eq!(merged.custom_name.as_deref(), Some("eggs benedict"));
    }

    #[test]
    fn confident_fresh_name_replaces_prior() {
        let mut fresh = ParsedMeal::unknown("eggs royale");
        fresh.confidence.custom_name = Some(0.9);
        let merged = merge(prior(), fresh);
        assert_eq!(merged.custom_name.as_deref(), Some("eggs royale"));
    }

    #[tokio::test]
    async fn store_and_take_round_trip() {
        let store = PartialMealStore::new(Duration::from_secs(60));
        let id = store.store(prior()).await;
        let taken = store.take(id).await.expect("partial present");
        assert_eq!(taken.calories, Some(600.0));
        // take removes the entry
        assert!(store.take(id).await.is_none());
    }

    #[tokio::test]
    async fn expired_partial_is_gone() {
        let store = PartialMealStore::new(Duration::ZERO);
        let id = store.store(prior()).await;
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(store.take(id).await.is_none());
    }
}
