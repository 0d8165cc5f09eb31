use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use time::OffsetDateTime;
use uuid::Uuid;

/// A user's single conversation thread. Uniqueness on `user_id` is enforced
/// by the schema; concurrent first requests race on the constraint, not on
/// application logic.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Conversation {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Message {
    pub id: Uuid,
    pub conversation_id: Uuid,
    pub role: String,
    pub content: String,
    pub model: Option<String>,
    pub cached: bool,
    pub created_at: OffsetDateTime,
}

/// Metadata recorded on an appended exchange.
#[derive(Debug, Clone, Default)]
pub struct ExchangeMeta {
    pub model: Option<String>,
    pub cached: bool,
}

impl Conversation {
    /// Fetch the user's conversation, creating it if absent.
    ///
    /// `ON CONFLICT DO NOTHING` plus the unique index makes this idempotent
    /// under concurrent first requests.
    pub async fn get_or_create(db: &PgPool, user_id: Uuid) -> anyhow::Result<Conversation> {
        sqlx::query(
            r#"
            INSERT INTO conversations (user_id, title)
            VALUES ($1, 'Nutrition chat')
            ON CONFLICT (user_id) DO NOTHING
            "#,
        )
        .bind(user_id)
        .execute(db)
        .await?;

        let conversation = sqlx::query_as::<_, Conversation>(
            r#"
            SELECT id, user_id, title, created_at, updated_at
            FROM conversations
            WHERE user_id = $1
            "#,
        )
        .bind(user_id)
        .fetch_one(db)
        .await?;
        Ok(conversation)
    }

    /// Append a user/AI message pair and bump `updated_at`.
    pub async fn append_exchange(
        db: &PgPool,
        conversation_id: Uuid,
        user_text: &str,
        ai_text: &str,
        meta: ExchangeMeta,
    ) -> anyhow::Result<(Message, Message)> {
        let mut tx = db.begin().await?;

        let user_message = sqlx::query_as::<_, Message>(
            r#"
            INSERT INTO messages (conversation_id, role, content, cached)
            VALUES ($1, 'user', $2, false)
            RETURNING id, conversation_id, role, content, model, cached, created_at
            "#,
        )
        .bind(conversation_id)
        .bind(user_text)
        .fetch_one(&mut *tx)
        .await?;

        let ai_message = sqlx::query_as::<_, Message>(
            r#"
            INSERT INTO messages (conversation_id, role, content, model, cached)
            VALUES ($1, 'assistant', $2, $3, $4)
            RETURNING id, conversation_id, role, content, model, cached, created_at
            "#,
        )
        .bind(conversation_id)
        .bind(ai_text)
        .bind(meta.model)
        .bind(meta.cached)
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query(r#"UPDATE conversations SET updated_at = now() WHERE id = $1"#)
            .bind(conversation_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok((user_message, ai_message))
    }

    /// The user's most recent messages, newest first.
    pub async fn recent_messages(
        db: &PgPool,
        user_id: Uuid,
        limit: i64,
    ) -> anyhow::Result<Vec<Message>> {
        let rows = sqlx::query_as::<_, Message>(
            r#"
            SELECT m.id, m.conversation_id, m.role, m.content, m.model, m.cached, m.created_at
            FROM messages m
            JOIN conversations c ON c.id = m.conversation_id
            WHERE c.user_id = $1
            ORDER BY m.created_at DESC
            LIMIT $2
            "#,
        )
        .bind(user_id)
        .bind(limit)
        .fetch_all(db)
        .await?;
        Ok(rows)
    }

    /// The full history, oldest first.
    pub async fn list_messages(db: &PgPool, user_id: Uuid) -> anyhow::Result<Vec<Message>> {
        let rows = sqlx::query_as::<_, Message>(
            r#"
            SELECT m.id, m.conversation_id, m.role, m.content, m.model, m.cached, m.created_at
            FROM messages m
            JOIN conversations c ON c.id = m.conversation_id
            WHERE c.user_id = $1
            ORDER BY m.created_at ASC
            "#,
        )
        .bind(user_id)
        .fetch_all(db)
        .await?;
        Ok(rows)
    }

    /// Delete all messages but keep the conversation row, so a later fetch
    /// returns the same conversation identity.
    pub async fn clear(db: &PgPool, user_id: Uuid) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            DELETE FROM messages
            WHERE conversation_id IN (SELECT id FROM conversations WHERE user_id = $1)
            "#,
        )
        .bind(user_id)
        .execute(db)
        .await?;
        Ok(())
    }
}
