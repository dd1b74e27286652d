//! Handlers for the `/chat` resource: a student's bounded set of threads with
//! the remote chat model.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use easel_core::chat::{self, Sender};
use easel_core::error::CoreError;
use easel_core::types::DbId;
use easel_db::models::chat::{ChatMessage, ChatThread, CreateChatMessage, ThreadSummary};
use easel_db::repositories::{ChatRepo, ThreadInsert};
use easel_genai::ChatTurn;
use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};
use crate::middleware::rbac::{RequireStudent, StudentCaller};
use crate::response::DataResponse;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Request / response types
// ---------------------------------------------------------------------------

/// Request body for `POST /chat/threads`.
#[derive(Debug, Default, Deserialize)]
pub struct CreateThreadRequest {
    #[serde(default)]
    pub title: Option<String>,
}

/// Request body for `POST /chat/threads/{id}/messages`.
#[derive(Debug, Deserialize)]
pub struct PostMessageRequest {
    pub content: String,
}

/// Thread listing entry.
#[derive(Debug, Serialize)]
pub struct ThreadView {
    #[serde(flatten)]
    pub summary: ThreadSummary,
    /// The newest message is an unanswered student message.
    pub needs_reply: bool,
}

impl ThreadView {
    pub fn from_summary(summary: ThreadSummary) -> AppResult<Self> {
        let last_sender = summary
            .last_sender
            .as_deref()
            .map(Sender::parse)
            .transpose()?;
        Ok(Self {
            needs_reply: chat::needs_reply(last_sender),
            summary,
        })
    }
}

/// Response for posting a message: the stored student message and the reply.
#[derive(Debug, Serialize)]
pub struct Exchange {
    pub message: ChatMessage,
    pub reply: ChatMessage,
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// GET /api/v1/chat/threads
pub async fn list_threads(
    RequireStudent(student): RequireStudent,
    State(state): State<AppState>,
) -> AppResult<Json<DataResponse<Vec<ThreadView>>>> {
    let summaries =
        ChatRepo::list_for_student(&state.pool, student.session_id, student.student_id).await?;
    let data = summaries
        .into_iter()
        .map(ThreadView::from_summary)
        .collect::<AppResult<Vec<_>>>()?;
    Ok(Json(DataResponse { data }))
}

/// POST /api/v1/chat/threads
pub async fn create_thread(
    RequireStudent(student): RequireStudent,
    State(state): State<AppState>,
    Json(input): Json<CreateThreadRequest>,
) -> AppResult<(StatusCode, Json<DataResponse<ChatThread>>)> {
    let title = chat::validate_thread_title(input.title.as_deref())?;

    match ChatRepo::create_thread(&state.pool, student.session_id, student.student_id, title)
        .await?
    {
        ThreadInsert::Created(thread) => {
            tracing::info!(
                thread_id = thread.id,
                student_id = student.student_id,
                "Chat thread created"
            );
            Ok((StatusCode::CREATED, Json(DataResponse { data: thread })))
        }
        ThreadInsert::Rejected(err) => Err(err.into()),
    }
}

/// GET /api/v1/chat/threads/{id}/messages
pub async fn list_messages(
    RequireStudent(student): RequireStudent,
    State(state): State<AppState>,
    Path(thread_id): Path<DbId>,
) -> AppResult<Json<DataResponse<Vec<ChatMessage>>>> {
    let thread = owned_thread(&state, &student, thread_id).await?;
    let messages = ChatRepo::list_messages(&state.pool, thread.id).await?;
    Ok(Json(DataResponse { data: messages }))
}

/// POST /api/v1/chat/threads/{id}/messages
///
/// Store the student's message, send the recent window to the model and
/// store its reply. If the model fails the student's message is kept and can
/// be answered later through the retry endpoint.
pub async fn post_message(
    RequireStudent(student): RequireStudent,
    State(state): State<AppState>,
    Path(thread_id): Path<DbId>,
    Json(input): Json<PostMessageRequest>,
) -> AppResult<(StatusCode, Json<DataResponse<Exchange>>)> {
    let thread = owned_thread(&state, &student, thread_id).await?;
    let content = chat::validate_message(&input.content)?;

    let message = ChatRepo::insert_message(
        &state.pool,
        &CreateChatMessage {
            thread_id: thread.id,
            student_id: Some(student.student_id),
            sender: Sender::Student.as_str().to_string(),
            content: content.to_string(),
        },
    )
    .await?;

    let reply = reply_to(&state, thread.id).await?;

    Ok((
        StatusCode::CREATED,
        Json(DataResponse {
            data: Exchange { message, reply },
        }),
    ))
}

/// POST /api/v1/chat/threads/{id}/retry
///
/// Ask the model again for a thread whose newest message went unanswered.
pub async fn retry_reply(
    RequireStudent(student): RequireStudent,
    State(state): State<AppState>,
    Path(thread_id): Path<DbId>,
) -> AppResult<Json<DataResponse<ChatMessage>>> {
    let thread = owned_thread(&state, &student, thread_id).await?;

    let last_sender = ChatRepo::last_message(&state.pool, thread.id)
        .await?
        .map(|m| Sender::parse(&m.sender))
        .transpose()?;
    if !chat::needs_reply(last_sender) {
        return Err(AppError::Core(CoreError::Validation(
            "This chat has no unanswered message".into(),
        )));
    }

    let reply = reply_to(&state, thread.id).await?;
    Ok(Json(DataResponse { data: reply }))
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Load a thread and check it belongs to the calling student.
async fn owned_thread(
    state: &AppState,
    student: &StudentCaller,
    thread_id: DbId,
) -> AppResult<ChatThread> {
    let thread = ChatRepo::find_thread(&state.pool, thread_id)
        .await?
        .filter(|t| t.session_id == student.session_id)
        .ok_or(CoreError::NotFound {
            entity: "ChatThread",
            id: thread_id,
        })?;

    if thread.student_id != student.student_id {
        return Err(AppError::Core(CoreError::Forbidden(
            "This chat belongs to another student".into(),
        )));
    }
    Ok(thread)
}

/// Send the thread's recent history to the model and persist the reply.
async fn reply_to(state: &AppState, thread_id: DbId) -> AppResult<ChatMessage> {
    let window = ChatRepo::recent_messages(&state.pool, thread_id, chat::HISTORY_WINDOW).await?;
    let history = window
        .iter()
        .map(|m| {
            Sender::parse(&m.sender).map(|sender| match sender {
                Sender::Student => ChatTurn::user(m.content.clone()),
                Sender::Ai => ChatTurn::assistant(m.content.clone()),
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    let text = state.generator.chat_complete(&history).await.map_err(|err| {
        tracing::warn!(thread_id, error = %err, "Chat reply failed; student message kept");
        AppError::Generation(err)
    })?;

    let reply = ChatRepo::insert_message(
        &state.pool,
        &CreateChatMessage {
            thread_id,
            student_id: None,
            sender: Sender::Ai.as_str().to_string(),
            content: text,
        },
    )
    .await?;
    ChatRepo::touch_thread(&state.pool, thread_id).await?;

    tracing::info!(thread_id, message_id = reply.id, "Chat reply stored");
    Ok(reply)
}
