//! Axum router construction for the questions API.
//!
//! Assembles all routes into a single [`Router`] with CORS middleware
//! enabled for cross-origin clients.

use std::sync::Arc;

use axum::Router;
use axum::routing::get;
use lexicon_db::QuestionStore;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::state::AppState;

/// Build the complete Axum router for the questions service.
///
/// The router includes:
/// - `GET /` -- service name and version
/// - `GET /questions` -- list questions
/// - `POST /questions` -- create a question
/// - `GET /questions/{id}` -- single question
/// - `PUT /questions/{id}` -- rename and replace labels
/// - `DELETE /questions/{id}` -- delete a question
///
/// CORS is configured to allow any origin.
pub fn build_router<S: QuestionStore>(state: Arc<AppState<S>>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(handlers::index))
        .route(
            "/questions",
            get(handlers::list_questions::<S>).post(handlers::create_question::<S>),
        )
        .route(
            "/questions/{id}",
            get(handlers::get_question::<S>)
                .put(handlers::update_question::<S>)
                .delete(handlers::delete_question::<S>),
        )
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
