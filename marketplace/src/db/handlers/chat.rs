use crate::{
    db::{
        errors::Result,
        models::chat::{ChatMessageCreateDBRequest, ChatMessageDBResponse, ChatSessionDBResponse},
    },
    types::UserId,
};
use sqlx::PgConnection;
use tracing::instrument;

const SESSION_COLUMNS: &str = "session_id, user_id, created_at, updated_at";
const MESSAGE_COLUMNS: &str = "id, session_id, role, content, metadata, created_at";

pub struct Chats<'c> {
    db: &'c mut PgConnection,
}

impl<'c> Chats<'c> {
    pub fn new(db: &'c mut PgConnection) -> Self {
        Self { db }
    }

    #[instrument(skip(self), err)]
    pub async fn get_session(&mut self, session_id: &str) -> Result<Option<ChatSessionDBResponse>> {
        let session = sqlx::query_as::<_, ChatSessionDBResponse>(&format!(
            "SELECT {SESSION_COLUMNS} FROM chat_sessions WHERE session_id = $1"
        ))
        .bind(session_id)
        .fetch_optional(&mut *self.db)
        .await?;

        Ok(session)
    }

    /// Create the session, or return the existing one if the id is taken.
    /// The flag tells whether this call created it.
    #[instrument(skip(self), err)]
    pub async fn get_or_create_session(
        &mut self,
        session_id: &str,
        user_id: Option<UserId>,
    ) -> Result<(ChatSessionDBResponse, bool)> {
        let created = sqlx::query_as::<_, ChatSessionDBResponse>(&format!(
            r#"
            INSERT INTO chat_sessions (session_id, user_id)
            VALUES ($1, $2)
            ON CONFLICT (session_id) DO NOTHING
            RETURNING {SESSION_COLUMNS}
            "#
        ))
        .bind(session_id)
        .bind(user_id)
        .fetch_optional(&mut *self.db)
        .await?;

        if let Some(session) = created {
            return Ok((session, true));
        }

        let existing = sqlx::query_as::<_, ChatSessionDBResponse>(&format!(
            "SELECT {SESSION_COLUMNS} FROM chat_sessions WHERE session_id = $1"
        ))
        .bind(session_id)
        .fetch_one(&mut *self.db)
        .await?;

        Ok((existing, false))
    }

    #[instrument(skip(self), err)]
    pub async fn touch_session(&mut self, session_id: &str) -> Result<()> {
        sqlx::query("UPDATE chat_sessions SET updated_at = NOW() WHERE session_id = $1")
            .bind(session_id)
            .execute(&mut *self.db)
            .await?;

        Ok(())
    }

    /// Deletes the session and, by cascade, its messages
    #[instrument(skip(self), err)]
    pub async fn delete_session(&mut self, session_id: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM chat_sessions WHERE session_id = $1")
            .bind(session_id)
            .execute(&mut *self.db)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Most recently active first
    #[instrument(skip(self), err)]
    pub async fn list_sessions(&mut self, user_id: UserId, limit: i64) -> Result<Vec<ChatSessionDBResponse>> {
        let sessions = sqlx::query_as::<_, ChatSessionDBResponse>(&format!(
            r#"
            SELECT {SESSION_COLUMNS}
            FROM chat_sessions
            WHERE user_id = $1
            ORDER BY updated_at DESC, session_id
            LIMIT $2
            "#
        ))
        .bind(user_id)
        .bind(limit)
        .fetch_all(&mut *self.db)
        .await?;

        Ok(sessions)
    }

    #[instrument(skip(self, request), fields(session_id = %request.session_id), err)]
    pub async fn add_message(&mut self, request: &ChatMessageCreateDBRequest) -> Result<ChatMessageDBResponse> {
        let message = sqlx::query_as::<_, ChatMessageDBResponse>(&format!(
            r#"
            INSERT INTO chat_messages (session_id, role, content, metadata)
            VALUES ($1, $2, $3, $4)
            RETURNING {MESSAGE_COLUMNS}
            "#
        ))
        .bind(&request.session_id)
        .bind(request.role)
        .bind(&request.content)
        .bind(&request.metadata)
        .fetch_one(&mut *self.db)
        .await?;

        Ok(message)
    }

    /// The oldest `limit` messages of a session, in order
    #[instrument(skip(self), err)]
    pub async fn list_messages(&mut self, session_id: &str, limit: i64) -> Result<Vec<ChatMessageDBResponse>> {
        let messages = sqlx::query_as::<_, ChatMessageDBResponse>(&format!(
            r#"
            SELECT {MESSAGE_COLUMNS}
            FROM chat_messages
            WHERE session_id = $1
            ORDER BY seq
            LIMIT $2
            "#
        ))
        .bind(session_id)
        .bind(limit)
        .fetch_all(&mut *self.db)
        .await?;

        Ok(messages)
    }

    /// The newest `limit` messages of a session, oldest first
    #[instrument(skip(self), err)]
    pub async fn recent_messages(&mut self, session_id: &str, limit: i64) -> Result<Vec<ChatMessageDBResponse>> {
        let messages = sqlx::query_as::<_, ChatMessageDBResponse>(&format!(
            r#"
            SELECT {MESSAGE_COLUMNS}
            FROM (
                SELECT {MESSAGE_COLUMNS}, seq
                FROM chat_messages
                WHERE session_id = $1
                ORDER BY seq DESC
                LIMIT $2
            ) recent
            ORDER BY seq
            "#
        ))
        .bind(session_id)
        .bind(limit)
        .fetch_all(&mut *self.db)
        .await?;

        Ok(messages)
    }
}
