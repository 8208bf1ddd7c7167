//! Shared application state for the questions API.

use lexicon_db::{QuestionStore, QuestionsDao};

/// State shared by every request handler.
///
/// Handlers receive it as `State<Arc<AppState<S>>>`; the store inside the
/// orchestrator is itself a cheap, cloneable handle.
#[derive(Debug)]
pub struct AppState<S> {
    /// Question persistence.
    pub questions: QuestionsDao<S>,
}

impl<S: QuestionStore> AppState<S> {
    /// Create application state over `store`.
    pub const fn new(store: S) -> Self {
        Self {
            questions: QuestionsDao::new(store),
        }
    }
}
