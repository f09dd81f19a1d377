//! Admin endpoints: pipeline triggers and the run log.

use axum::{
    extract::State,
    response::{Html, Redirect},
    Form,
};

use super::PageResult;
use crate::errors::AppError;
use crate::pages::{AdminPage, RunForm};
use crate::AppState;

/// GET /admin - Pipeline control and run log.
pub async fn admin_page(State(state): State<AppState>) -> PageResult {
    Ok(Html(state.pages.admin.read().await.render()))
}

/// POST /admin/run - Trigger a pipeline job and wait for its answer.
pub async fn run_pipeline(
    State(state): State<AppState>,
    Form(form): Form<RunForm>,
) -> Result<Redirect, AppError> {
    AdminPage::run(state.pages.admin.clone(), state.client.clone(), form.job).await?;
    Ok(Redirect::to("/admin"))
}

/// POST /admin/clear - Drop all run log entries.
pub async fn clear_logs(State(state): State<AppState>) -> Redirect {
    state.pages.admin.write().await.clear();
    Redirect::to("/admin")
}
