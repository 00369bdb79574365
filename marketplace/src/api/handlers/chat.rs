use crate::{
    api::models::{
        admin::MessageResponse,
        chat::{ChatHistoryResponse, ChatMessageResponse, ChatRequest, ChatResponse, ChatSessionResponse, ChatSessionsResponse},
        users::CurrentUser,
    },
    chat::{ChatTurn, APOLOGY_MESSAGE, CONTEXT_MESSAGES, SYSTEM_PROMPT},
    db::{
        handlers::Chats,
        models::chat::{ChatMessageCreateDBRequest, ChatRole, ChatSessionDBResponse},
    },
    errors::{Error, Result},
    AppState,
};
use axum::{
    extract::{Path, State},
    response::Json,
};
use serde_json::json;
use sqlx::PgConnection;
use tracing::{info, warn};
use uuid::Uuid;

const HISTORY_LIMIT: i64 = 100;
const SESSIONS_LIMIT: i64 = 50;

/// Load a session the caller may see. Sessions without an owner are open.
async fn accessible_session(
    conn: &mut PgConnection,
    session_id: &str,
    caller: Option<&CurrentUser>,
) -> Result<ChatSessionDBResponse> {
    let session = Chats::new(conn).get_session(session_id).await?.ok_or_else(|| Error::NotFound {
        resource: "Chat session".to_string(),
        id: session_id.to_string(),
    })?;

    if !session.is_accessible_by(caller.map(|user| user.id)) {
        return Err(Error::Forbidden {
            message: "Access denied".to_string(),
        });
    }
    Ok(session)
}

#[utoipa::path(
    post,
    path = "/chat/send",
    tag = "chat",
    summary = "Ask the site assistant",
    description = "Without a known `session_id` a new session is started, owned by the caller when logged in. \
                   The model sees the most recent messages of the session as context.",
    request_body = ChatRequest,
    responses(
        (status = 200, description = "Assistant reply", body = ChatResponse),
        (status = 403, description = "Session belongs to another user"),
        (status = 500, description = "AI service not configured"),
    ),
    security((), ("bearer_auth" = []))
)]
pub async fn send_message(
    State(state): State<AppState>,
    current_user: Option<CurrentUser>,
    Json(request): Json<ChatRequest>,
) -> Result<Json<ChatResponse>> {
    let model = state.chat.clone().ok_or_else(|| Error::Upstream {
        message: "AI service not configured".to_string(),
    })?;
    let caller = current_user.as_ref().map(|user| user.id);
    let session_id = request.session_id.unwrap_or_else(|| Uuid::new_v4().to_string());

    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut chats = Chats::new(&mut conn);

    let (session, is_new_session) = chats.get_or_create_session(&session_id, caller).await?;
    if !session.is_accessible_by(caller) {
        return Err(Error::Forbidden {
            message: "Access denied".to_string(),
        });
    }

    chats
        .add_message(&ChatMessageCreateDBRequest {
            session_id: session_id.clone(),
            role: ChatRole::User,
            content: request.message,
            metadata: json!({}),
        })
        .await?;

    let history: Vec<ChatTurn> = chats
        .recent_messages(&session_id, CONTEXT_MESSAGES)
        .await?
        .into_iter()
        .map(|message| ChatTurn {
            role: message.role,
            content: message.content,
        })
        .collect();

    let (reply, metadata) = match model.reply(SYSTEM_PROMPT, &history).await {
        Ok(reply) => (reply, json!({ "model": model.model_name() })),
        Err(e) => {
            warn!(error = %e, session_id, "chat model call failed");
            (
                APOLOGY_MESSAGE.to_string(),
                json!({ "model": model.model_name(), "error": e.to_string() }),
            )
        }
    };

    chats
        .add_message(&ChatMessageCreateDBRequest {
            session_id: session_id.clone(),
            role: ChatRole::Assistant,
            content: reply.clone(),
            metadata,
        })
        .await?;
    chats.touch_session(&session_id).await?;

    if is_new_session {
        info!(session_id, user_id = ?caller, "chat session started");
    }

    Ok(Json(ChatResponse {
        message: reply,
        session_id,
        is_new_session,
    }))
}

#[utoipa::path(
    get,
    path = "/chat/history/{session_id}",
    tag = "chat",
    summary = "Messages of a session",
    params(("session_id" = String, Path, description = "Chat session ID")),
    responses(
        (status = 200, description = "Messages, oldest first", body = ChatHistoryResponse),
        (status = 403, description = "Session belongs to another user"),
        (status = 404, description = "Chat session not found"),
    ),
    security((), ("bearer_auth" = []))
)]
pub async fn get_history(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
    current_user: Option<CurrentUser>,
) -> Result<Json<ChatHistoryResponse>> {
    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let session = accessible_session(&mut conn, &session_id, current_user.as_ref()).await?;
    let messages = Chats::new(&mut conn).list_messages(&session_id, HISTORY_LIMIT).await?;

    Ok(Json(ChatHistoryResponse {
        session_id: session.session_id,
        messages: messages.into_iter().map(ChatMessageResponse::from).collect(),
        created_at: session.created_at,
        updated_at: session.updated_at,
    }))
}

#[utoipa::path(
    delete,
    path = "/chat/session/{session_id}",
    tag = "chat",
    summary = "Delete a session and its messages",
    params(("session_id" = String, Path, description = "Chat session ID")),
    responses(
        (status = 200, description = "Session deleted", body = MessageResponse),
        (status = 403, description = "Session belongs to another user"),
        (status = 404, description = "Chat session not found"),
    ),
    security((), ("bearer_auth" = []))
)]
pub async fn delete_session(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
    current_user: Option<CurrentUser>,
) -> Result<Json<MessageResponse>> {
    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    accessible_session(&mut conn, &session_id, current_user.as_ref()).await?;
    Chats::new(&mut conn).delete_session(&session_id).await?;

    Ok(Json(MessageResponse::new("Chat session deleted successfully")))
}

#[utoipa::path(
    get,
    path = "/chat/sessions",
    tag = "chat",
    summary = "Own chat sessions",
    responses(
        (status = 200, description = "Sessions, most recently active first", body = ChatSessionsResponse),
        (status = 401, description = "Authentication required"),
    ),
    security(("bearer_auth" = []))
)]
pub async fn list_sessions(
    State(state): State<AppState>,
    current_user: Option<CurrentUser>,
) -> Result<Json<ChatSessionsResponse>> {
    let Some(user) = current_user else {
        return Err(Error::Unauthenticated {
            message: "Authentication required".to_string(),
        });
    };

    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let sessions = Chats::new(&mut conn).list_sessions(user.id, SESSIONS_LIMIT).await?;

    Ok(Json(ChatSessionsResponse {
        sessions: sessions.into_iter().map(ChatSessionResponse::from).collect(),
    }))
}
