//! PostgreSQL Storage Gateway
//!
//! Runtime-checked queries over the schema in `migrations/`. Message ids are
//! snowflakes generated in-process.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::domain::{
    Message, MessageKind, NewMessage, OnlineParticipant, Presence, Reaction, ReactionKind,
    ReactionOutcome, Room, RoomKind, StorageGateway, UnreadMessage, UserSummary,
    DELETED_PLACEHOLDER,
};
use crate::shared::error::AppError;
use crate::shared::snowflake::SnowflakeGenerator;

const MESSAGE_COLUMNS: &str = "m.id, m.room_id, m.sender_id, m.content, m.message_kind, \
     m.attachment, m.reply_to_id, m.forwarded_from_id, m.is_read, m.read_at, \
     m.is_deleted, m.pinned, m.edited_at, m.created_at";

/// PostgreSQL implementation of [`StorageGateway`].
pub struct PgStorage {
    pool: PgPool,
    snowflake: Arc<SnowflakeGenerator>,
}

impl PgStorage {
    pub fn new(pool: PgPool, snowflake: Arc<SnowflakeGenerator>) -> Self {
        Self { pool, snowflake }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

/// Internal row type for message queries.
#[derive(Debug, sqlx::FromRow)]
struct MessageRow {
    id: i64,
    room_id: i64,
    sender_id: i64,
    content: String,
    message_kind: String,
    attachment: Option<String>,
    reply_to_id: Option<i64>,
    forwarded_from_id: Option<i64>,
    is_read: bool,
    read_at: Option<DateTime<Utc>>,
    is_deleted: bool,
    pinned: bool,
    edited_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
}

impl MessageRow {
    fn into_message(self) -> Message {
        Message {
            id: self.id,
            room_id: self.room_id,
            sender_id: self.sender_id,
            content: self.content,
            kind: MessageKind::from_str(&self.message_kind),
            attachment: self.attachment,
            reply_to_id: self.reply_to_id,
            forwarded_from_id: self.forwarded_from_id,
            is_read: self.is_read,
            read_at: self.read_at,
            is_deleted: self.is_deleted,
            pinned: self.pinned,
            edited_at: self.edited_at,
            created_at: self.created_at,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct RoomRow {
    id: i64,
    name: Option<String>,
    room_kind: String,
    admin_id: Option<i64>,
    is_active: bool,
}

impl RoomRow {
    fn into_room(self) -> Room {
        Room {
            id: self.id,
            name: self.name,
            kind: RoomKind::from_str(&self.room_kind),
            admin_id: self.admin_id,
            is_active: self.is_active,
        }
    }
}

/// Unread message joined with its room and sender name.
#[derive(Debug, sqlx::FromRow)]
struct UnreadRow {
    #[sqlx(flatten)]
    message: MessageRow,
    room_name: Option<String>,
    room_kind: String,
    admin_id: Option<i64>,
    sender_name: String,
}

#[derive(Debug, sqlx::FromRow)]
struct PresenceRow {
    online: bool,
    last_seen: Option<DateTime<Utc>>,
    last_online: Option<DateTime<Utc>>,
}

#[async_trait]
impl StorageGateway for PgStorage {
    async fn get_user(&self, user_id: i64) -> Result<Option<UserSummary>, AppError> {
        let row: Option<(i64, String)> =
            sqlx::query_as("SELECT id, username FROM users WHERE id = $1 AND is_active = TRUE")
                .bind(user_id)
                .fetch_optional(&self.pool)
                .await?;

        Ok(row.map(|(id, username)| UserSummary::new(id, username)))
    }

    async fn get_room(&self, room_id: i64) -> Result<Room, AppError> {
        sqlx::query_as::<_, RoomRow>(
            r#"
            SELECT id, name, room_kind, admin_id, is_active
            FROM rooms
            WHERE id = $1 AND is_active = TRUE
            "#,
        )
        .bind(room_id)
        .fetch_optional(&self.pool)
        .await?
        .map(RoomRow::into_room)
        .ok_or_else(|| AppError::NotFound(format!("Room {} not found", room_id)))
    }

    async fn is_participant(&self, room_id: i64, user_id: i64) -> Result<bool, AppError> {
        let exists: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS(
                SELECT 1 FROM room_participants
                WHERE room_id = $1 AND user_id = $2
            )
            "#,
        )
        .bind(room_id)
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(exists)
    }

    async fn list_participants(&self, room_id: i64) -> Result<Vec<i64>, AppError> {
        let ids = sqlx::query_scalar(
            "SELECT user_id FROM room_participants WHERE room_id = $1 ORDER BY user_id",
        )
        .bind(room_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(ids)
    }

    async fn rooms_for_user(&self, user_id: i64) -> Result<Vec<i64>, AppError> {
        let ids = sqlx::query_scalar(
            r#"
            SELECT r.id
            FROM rooms r
            INNER JOIN room_participants p ON p.room_id = r.id
            WHERE p.user_id = $1 AND r.is_active = TRUE
            ORDER BY r.id
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(ids)
    }

    async fn create_message(&self, new: NewMessage) -> Result<Message, AppError> {
        let id = self.snowflake.generate();

        let row = sqlx::query_as::<_, MessageRow>(&format!(
            r#"
            INSERT INTO messages AS m (id, room_id, sender_id, content, message_kind,
                                       attachment, reply_to_id, forwarded_from_id)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING {MESSAGE_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(new.room_id)
        .bind(new.sender_id)
        .bind(&new.content)
        .bind(new.kind.as_str())
        .bind(&new.attachment)
        .bind(new.reply_to_id)
        .bind(new.forwarded_from_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(row.into_message())
    }

    async fn get_message(
        &self,
        message_id: i64,
        room_id: Option<i64>,
    ) -> Result<Message, AppError> {
        sqlx::query_as::<_, MessageRow>(&format!(
            r#"
            SELECT {MESSAGE_COLUMNS}
            FROM messages m
            WHERE m.id = $1 AND ($2::BIGINT IS NULL OR m.room_id = $2)
            "#
        ))
        .bind(message_id)
        .bind(room_id)
        .fetch_optional(&self.pool)
        .await?
        .map(MessageRow::into_message)
        .ok_or_else(|| AppError::NotFound(format!("Message {} not found", message_id)))
    }

    async fn mark_read(&self, message_id: i64) -> Result<bool, AppError> {
        let result = sqlx::query(
            "UPDATE messages SET is_read = TRUE, read_at = NOW() WHERE id = $1 AND is_read = FALSE",
        )
        .bind(message_id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn soft_delete(&self, message_id: i64) -> Result<bool, AppError> {
        let result = sqlx::query(
            r#"
            UPDATE messages
            SET is_deleted = TRUE, content = $2, attachment = NULL
            WHERE id = $1 AND is_deleted = FALSE
            "#,
        )
        .bind(message_id)
        .bind(DELETED_PLACEHOLDER)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn toggle_pinned(&self, message_id: i64) -> Result<bool, AppError> {
        let pinned: Option<bool> = sqlx::query_scalar(
            "UPDATE messages SET pinned = NOT pinned WHERE id = $1 AND is_deleted = FALSE RETURNING pinned",
        )
        .bind(message_id)
        .fetch_optional(&self.pool)
        .await?;

        pinned.ok_or_else(|| {
            AppError::NotFound(format!("Message {} not found or deleted", message_id))
        })
    }

    async fn edit_content(&self, message_id: i64, content: &str) -> Result<(), AppError> {
        let result = sqlx::query(
            "UPDATE messages SET content = $2, edited_at = NOW() WHERE id = $1 AND is_deleted = FALSE",
        )
        .bind(message_id)
        .bind(content)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::PermissionDenied(
                "Deleted messages cannot be edited".into(),
            ));
        }
        Ok(())
    }

    /// Runs in one transaction that locks the message row, so concurrent
    /// toggles by one user on one message are serialized.
    async fn upsert_reaction(
        &self,
        message_id: i64,
        user_id: i64,
        kind: ReactionKind,
    ) -> Result<ReactionOutcome, AppError> {
        let mut tx = self.pool.begin().await?;

        let locked: Option<i64> = sqlx::query_scalar("SELECT id FROM messages WHERE id = $1 FOR UPDATE")
            .bind(message_id)
            .fetch_optional(&mut *tx)
            .await?;
        if locked.is_none() {
            return Err(AppError::NotFound(format!("Message {} not found", message_id)));
        }

        let existing: Option<String> = sqlx::query_scalar(
            "SELECT reaction FROM message_reactions WHERE message_id = $1 AND user_id = $2",
        )
        .bind(message_id)
        .bind(user_id)
        .fetch_optional(&mut *tx)
        .await?;

        let existing = existing.and_then(|value| ReactionKind::parse(&value).ok());
        let outcome = ReactionOutcome::resolve(message_id, user_id, existing, kind);

        match &outcome {
            ReactionOutcome::Removed { .. } => {
                sqlx::query("DELETE FROM message_reactions WHERE message_id = $1 AND user_id = $2")
                    .bind(message_id)
                    .bind(user_id)
                    .execute(&mut *tx)
                    .await?;
            }
            ReactionOutcome::Added(reaction) | ReactionOutcome::Changed { reaction, .. } => {
                upsert_reaction_row(&mut tx, reaction).await?;
            }
        }

        tx.commit().await?;
        Ok(outcome)
    }

    async fn set_presence(&self, user_id: i64, online: bool) -> Result<(), AppError> {
        let query = if online {
            r#"
            INSERT INTO user_profiles (user_id, online, last_online)
            VALUES ($1, TRUE, NOW())
            ON CONFLICT (user_id) DO UPDATE SET online = TRUE, last_online = NOW()
            "#
        } else {
            r#"
            INSERT INTO user_profiles (user_id, online, last_seen)
            VALUES ($1, FALSE, NOW())
            ON CONFLICT (user_id) DO UPDATE SET online = FALSE, last_seen = NOW()
            "#
        };

        sqlx::query(query).bind(user_id).execute(&self.pool).await?;
        Ok(())
    }

    async fn get_presence(&self, user_id: i64) -> Result<Presence, AppError> {
        let row = sqlx::query_as::<_, PresenceRow>(
            "SELECT online, last_seen, last_online FROM user_profiles WHERE user_id = $1",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row
            .map(|row| Presence {
                user_id,
                online: row.online,
                last_seen: row.last_seen,
                last_online: row.last_online,
            })
            .unwrap_or(Presence {
                user_id,
                ..Default::default()
            }))
    }

    async fn get_online_participants(
        &self,
        room_id: i64,
    ) -> Result<Vec<OnlineParticipant>, AppError> {
        let rows: Vec<(i64, String)> = sqlx::query_as(
            r#"
            SELECT u.id, u.username
            FROM room_participants p
            INNER JOIN users u ON u.id = p.user_id
            INNER JOIN user_profiles up ON up.user_id = u.id
            WHERE p.room_id = $1 AND up.online = TRUE
            ORDER BY u.username
            "#,
        )
        .bind(room_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|(user_id, display_name)| OnlineParticipant {
                user_id,
                display_name,
            })
            .collect())
    }

    async fn unread_messages_for(
        &self,
        user_id: i64,
        since: DateTime<Utc>,
        limit: i64,
    ) -> Result<Vec<UnreadMessage>, AppError> {
        let rows = sqlx::query_as::<_, UnreadRow>(&format!(
            r#"
            SELECT {MESSAGE_COLUMNS},
                   r.name AS room_name, r.room_kind, r.admin_id,
                   u.username AS sender_name
            FROM messages m
            INNER JOIN rooms r ON r.id = m.room_id
            INNER JOIN room_participants p ON p.room_id = m.room_id AND p.user_id = $1
            INNER JOIN users u ON u.id = m.sender_id
            WHERE m.is_read = FALSE
              AND m.is_deleted = FALSE
              AND m.sender_id <> $1
              AND m.created_at >= $2
              AND r.is_active = TRUE
            ORDER BY m.created_at DESC
            LIMIT $3
            "#
        ))
        .bind(user_id)
        .bind(since)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| {
                let room = Room {
                    id: row.message.room_id,
                    name: row.room_name,
                    kind: RoomKind::from_str(&row.room_kind),
                    admin_id: row.admin_id,
                    is_active: true,
                };
                UnreadMessage {
                    message: row.message.into_message(),
                    room,
                    sender_name: row.sender_name,
                }
            })
            .collect())
    }

    async fn search_messages(
        &self,
        room_id: i64,
        query: &str,
        limit: i64,
    ) -> Result<Vec<Message>, AppError> {
        let pattern = format!("%{}%", escape_like(query));
        let rows = sqlx::query_as::<_, MessageRow>(&format!(
            r#"
            SELECT {MESSAGE_COLUMNS}
            FROM messages m
            WHERE m.room_id = $1 AND m.is_deleted = FALSE AND m.content ILIKE $2
            ORDER BY m.created_at DESC
            LIMIT $3
            "#
        ))
        .bind(room_id)
        .bind(pattern)
        .bind(limit.clamp(1, 100))
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(MessageRow::into_message).collect())
    }

    async fn unread_count(&self, room_id: i64, user_id: i64) -> Result<i64, AppError> {
        let count: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*)
            FROM messages
            WHERE room_id = $1 AND sender_id <> $2 AND is_read = FALSE AND is_deleted = FALSE
            "#,
        )
        .bind(room_id)
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(count)
    }
}

async fn upsert_reaction_row(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    reaction: &Reaction,
) -> Result<(), AppError> {
    sqlx::query(
        r#"
        INSERT INTO message_reactions (message_id, user_id, reaction, created_at)
        VALUES ($1, $2, $3, $4)
        ON CONFLICT (message_id, user_id)
        DO UPDATE SET reaction = EXCLUDED.reaction, created_at = EXCLUDED.created_at
        "#,
    )
    .bind(reaction.message_id)
    .bind(reaction.user_id)
    .bind(reaction.kind.as_str())
    .bind(reaction.created_at)
    .execute(&mut **tx)
    .await?;

    Ok(())
}

/// Escape LIKE wildcards so user input matches literally.
fn escape_like(input: &str) -> String {
    input
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}
