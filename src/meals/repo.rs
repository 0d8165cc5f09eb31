use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use time::OffsetDateTime;
use uuid::Uuid;

/// One persisted meal log row.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct MealLog {
    pub id: Uuid,
    pub user_id: Uuid,
    pub meal_type: String,
    pub custom_name: Option<String>,
    pub calories: Option<f64>,
    pub protein: Option<f64>,
    pub carbs: Option<f64>,
    pub fats: Option<f64>,
    pub servings: f64,
    pub logged_at: OffsetDateTime,
}

impl MealLog {
    /// All of a user's logs for the server day containing `now`.
    pub async fn logged_today(
        db: &PgPool,
        user_id: Uuid,
        now: OffsetDateTime,
    ) -> anyhow::Result<Vec<MealLog>> {
        let (day_start, day_end) = day_bounds(now);
        let rows = sqlx::query_as::<_, MealLog>(
            r#"
            SELECT id, user_id, meal_type, custom_name, calories, protein, carbs, fats,
                   servings, logged_at
            FROM meal_logs
            WHERE user_id = $1 AND logged_at >= $2 AND logged_at < $3
            ORDER BY logged_at ASC
            "#,
        )
        .bind(user_id)
        .bind(day_start)
        .bind(day_end)
        .fetch_all(db)
        .await?;
        Ok(rows)
    }
}

/// Half-open [midnight, next midnight) range for the day containing `now`.
pub fn day_bounds(now: OffsetDateTime) -> (OffsetDateTime, OffsetDateTime) {
    let start = now.replace_time(time::Time::MIDNIGHT);
    (start, start + time::Duration::days(1))
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    #[test]
    fn day_bounds_cover_the_whole_day() {
        let now = datetime!(2026-03-14 13:45:00 UTC);
        let (start, end) = day_bounds(now);
        assert_eq!(start, datetime!(2026-03-14 00:00:00 UTC));
        assert_eq!(end, datetime!(2026-03-15 00:00:00 UTC));
        assert!(start <= now && now < end);
    }

    #[test]
    fn midnight_belongs_to_its_own_day() {
        let now = datetime!(2026-03-14 00:00:00 UTC);
        let (start, end) = day_bounds(now);
        assert_eq!(start, now);
        assert!(now < end);
    }
}
