//! Topic selector and per-topic dashboard endpoints.

use axum::{
    extract::{Path, Query, State},
    response::{Html, Redirect},
    Form,
};

use super::PageResult;
use crate::client::validate_topic_id;
use crate::errors::AppError;
use crate::export::{Download, ExportQuery};
use crate::pages::{today, RangeForm, ToggleForm, TopicDashboardPage, TopicParams, TopicSelectorPage};
use crate::AppState;

/// GET / - Topic selector.
pub async fn topic_selector(State(state): State<AppState>) -> PageResult {
    let page = &state.pages.topics;
    if page.read().await.needs_load() {
        TopicSelectorPage::load(page.clone(), state.client.clone()).await;
    }
    Ok(Html(page.read().await.render()))
}

/// POST /refresh - Re-fetch the topic list.
pub async fn refresh_topics(State(state): State<AppState>) -> Redirect {
    TopicSelectorPage::load(state.pages.topics.clone(), state.client.clone()).await;
    Redirect::to("/")
}

fn dashboard_path(id: &str) -> String {
    format!("/topic/{}", id)
}

/// GET /topic/{id} - Topic dashboard.
pub async fn topic_dashboard(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(params): Query<TopicParams>,
) -> PageResult {
    validate_topic_id(&id)?;
    let page = state.pages.dashboard(&id).await;
    page.write().await.apply(&params)?;
    if page.read().await.needs_load() {
        TopicDashboardPage::load(page.clone(), state.client.clone()).await;
    }
    let html = page.read().await.render();
    Ok(Html(html))
}

/// POST /topic/{id}/range - Apply a date range; every series is re-fetched
/// when the range changes.
pub async fn select_range(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Form(form): Form<RangeForm>,
) -> Result<Redirect, AppError> {
    validate_topic_id(&id)?;
    let page = state.pages.dashboard(&id).await;
    let changed = page.write().await.select_range(&form, today())?;
    if changed {
        tracing::info!(topic = %id, preset = %form.preset, "Date range changed");
        TopicDashboardPage::load(page.clone(), state.client.clone()).await;
    }
    Ok(Redirect::to(&dashboard_path(&id)))
}

/// POST /topic/{id}/toggle - Expand or collapse a group, title, span or list.
pub async fn toggle_topic_item(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Form(form): Form<ToggleForm>,
) -> Result<Redirect, AppError> {
    validate_topic_id(&id)?;
    let page = state.pages.dashboard(&id).await;
    page.write().await.toggle(&form)?;
    Ok(Redirect::to(&dashboard_path(&id)))
}

/// POST /topic/{id}/refresh
pub async fn refresh_topic(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Redirect, AppError> {
    validate_topic_id(&id)?;
    let page = state.pages.dashboard(&id).await;
    TopicDashboardPage::load(page.clone(), state.client.clone()).await;
    Ok(Redirect::to(&dashboard_path(&id)))
}

/// GET /topic/{id}/export - Filtered title groups as CSV or JSON.
pub async fn export_topic_groups(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(export): Query<ExportQuery>,
    Query(params): Query<TopicParams>,
) -> Result<Download, AppError> {
    validate_topic_id(&id)?;
    let page = state.pages.dashboard(&id).await;
    page.write().await.apply(&params)?;
    if page.read().await.needs_load() {
        TopicDashboardPage::load(page.clone(), state.client.clone()).await;
    }
    let rows = page.read().await.export_rows();
    Download::build(&rows, &format!("{}_title_groups", id), export.format)
}
