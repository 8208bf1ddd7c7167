//! REST API endpoint handlers for the questions service.
//!
//! Every handler goes through the [`QuestionsDao`](lexicon_db::QuestionsDao)
//! held in the shared [`AppState`] and awaits the deferred result it hands
//! back.
//!
//! # Endpoints
//!
//! | Method | Path | Success | Absent |
//! |--------|------|---------|--------|
//! | `GET` | `/` | 200 service name and version | |
//! | `GET` | `/questions` | 200 JSON array | |
//! | `POST` | `/questions` | 201 created question + `Location` | |
//! | `GET` | `/questions/{id}` | 200 JSON object | 404 |
//! | `PUT` | `/questions/{id}` | 204 | 404 |
//! | `DELETE` | `/questions/{id}` | 204 | 404 |
//!
//! Store failures answer 500 and a non-integer `{id}` answers 400.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::{StatusCode, header};
use axum::response::IntoResponse;
use lexicon_db::QuestionStore;
use lexicon_types::{Labels, Question, QuestionId};

use crate::error::ApiError;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Request and response bodies
// ---------------------------------------------------------------------------

/// JSON body accepted by `POST /questions` and `PUT /questions/{id}`.
///
/// Any `id` in the body is ignored; the path decides which question is
/// written.
#[derive(Debug, Clone, serde::Deserialize)]
pub struct QuestionBody {
    /// Question name.
    pub name: String,
    /// Language code to text.
    #[serde(default)]
    pub labels: Labels,
}

impl QuestionBody {
    fn into_question(self) -> Question {
        Question::new(self.name, self.labels)
    }
}

/// Response body of `GET /`.
#[derive(Debug, Clone, serde::Serialize)]
pub struct ServiceInfo {
    /// Service name.
    pub name: &'static str,
    /// Crate version.
    pub version: &'static str,
}

fn parse_id(raw: &str) -> Result<QuestionId, ApiError> {
    raw.parse::<QuestionId>().map_err(ApiError::from)
}

// ---------------------------------------------------------------------------
// GET /
// ---------------------------------------------------------------------------

/// Report the service name and version.
pub async fn index() -> Json<ServiceInfo> {
    Json(ServiceInfo {
        name: "lexicon",
        version: env!("CARGO_PKG_VERSION"),
    })
}

// ---------------------------------------------------------------------------
// /questions
// ---------------------------------------------------------------------------

/// List every question with its labels, ordered by id.
pub async fn list_questions<S: QuestionStore>(
    State(state): State<Arc<AppState<S>>>,
) -> Result<Json<Vec<Question>>, ApiError> {
    let questions = state.questions.all().await?;
    Ok(Json(questions))
}

/// Create a question from the request body.
///
/// Responds 201 with the stored question and a `Location` header naming
/// its URL.
pub async fn create_question<S: QuestionStore>(
    State(state): State<Arc<AppState<S>>>,
    Json(body): Json<QuestionBody>,
) -> Result<impl IntoResponse, ApiError> {
    let created = state.questions.create(body.into_question()).await?;
    let Some(id) = created.id else {
        return Err(ApiError::Internal(String::from(
            "store returned a question without an id",
        )));
    };

    tracing::info!(question_id = %id, name = %created.name, "Question created");
    Ok((
        StatusCode::CREATED,
        [(header::LOCATION, format!("/questions/{id}"))],
        Json(created),
    ))
}

// ---------------------------------------------------------------------------
// /questions/{id}
// ---------------------------------------------------------------------------

/// Fetch one question by id.
pub async fn get_question<S: QuestionStore>(
    State(state): State<Arc<AppState<S>>>,
    Path(raw_id): Path<String>,
) -> Result<Json<Question>, ApiError> {
    let id = parse_id(&raw_id)?;
    state
        .questions
        .read(id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("question {id}")))
}

/// Rename a question and replace its labels with the request body's.
pub async fn update_question<S: QuestionStore>(
    State(state): State<Arc<AppState<S>>>,
    Path(raw_id): Path<String>,
    Json(body): Json<QuestionBody>,
) -> Result<StatusCode, ApiError> {
    let id = parse_id(&raw_id)?;
    state
        .questions
        .update(body.into_question().with_id(id))
        .await?;

    tracing::info!(question_id = %id, "Question updated");
    Ok(StatusCode::NO_CONTENT)
}

/// Delete a question and its labels.
pub async fn delete_question<S: QuestionStore>(
    State(state): State<Arc<AppState<S>>>,
    Path(raw_id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let id = parse_id(&raw_id)?;
    let removed = state.questions.remove(id).await?;
    if removed == 0 {
        return Err(ApiError::NotFound(format!("question {id}")));
    }

    tracing::info!(question_id = %id, "Question deleted");
    Ok(StatusCode::NO_CONTENT)
}
