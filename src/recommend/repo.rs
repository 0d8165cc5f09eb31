use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

/// Onboarding profile data required for recommendations.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Profile {
    pub user_id: Uuid,
    pub age: i32,
    pub weight_kg: f64,
    pub height_cm: f64,
    pub gender: Option<String>,
    pub activity_level: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Goal {
    pub id: Uuid,
    pub user_id: Uuid,
    pub goal_type: String,
    pub active: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Preferences {
    pub user_id: Uuid,
    pub dietary_restrictions: Option<String>,
    pub allergies: Option<String>,
}

impl Profile {
    pub async fn find(db: &PgPool, user_id: Uuid) -> anyhow::Result<Option<Profile>> {
        let row = sqlx::query_as::<_, Profile>(
            r#"
            SELECT user_id, age, weight_kg, height_cm, gender, activity_level
            FROM profiles
            WHERE user_id = $1
            "#,
        )
        .bind(user_id)
        .fetch_optional(db)
        .await?;
        Ok(row)
    }
}

impl Goal {
    /// The user's single active goal.
    pub async fn find_active(db: &PgPool, user_id: Uuid) -> anyhow::Result<Option<Goal>> {
        let row = sqlx::query_as::<_, Goal>(
            r#"
            SELECT id, user_id, goal_type, active
            FROM goals
            WHERE user_id = $1 AND active = true
            ORDER BY created_at DESC
            LIMIT 1
            "#,
        )
        .bind(user_id)
        .fetch_optional(db)
        .await?;
        Ok(row)
    }
}

impl Preferences {
    pub async fn find(db: &PgPool, user_id: Uuid) -> anyhow::Result<Option<Preferences>> {
        let row = sqlx::query_as::<_, Preferences>(
            r#"
            SELECT user_id, dietary_restrictions, allergies
            FROM preferences
            WHERE user_id = $1
            "#,
        )
        .bind(user_id)
        .fetch_optional(db)
        .await?;
        Ok(row)
    }
}
