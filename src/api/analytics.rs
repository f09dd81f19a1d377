//! Global analytics pages: daily domains, grouped titles, keywords, sources, trends.

use axum::{
    extract::{Query, State},
    response::{Html, Redirect},
    Form,
};

use super::{KeyForm, PageResult};
use crate::errors::AppError;
use crate::export::{Download, ExportQuery};
use crate::pages::{
    DailyDomainsPage, DomainParams, GroupedTitlesPage, KeywordParams, KeywordTrendsPage,
    SourceParams, SourceSummaryPage, TimeTrendsPage, TitlesParams, TrendParams,
};
use crate::AppState;

// Daily domains

async fn prepare_domains(state: &AppState, params: &DomainParams) -> Result<(), AppError> {
    let page = &state.pages.domains;
    if page.read().await.needs_load() {
        DailyDomainsPage::load(page.clone(), state.client.clone()).await;
    }
    page.write().await.apply(params)
}

/// GET /domains - Domains crawled per day.
pub async fn daily_domains(
    State(state): State<AppState>,
    Query(params): Query<DomainParams>,
) -> PageResult {
    prepare_domains(&state, &params).await?;
    Ok(Html(state.pages.domains.read().await.render()))
}

/// POST /domains/toggle
pub async fn toggle_domain(State(state): State<AppState>, Form(form): Form<KeyForm>) -> Redirect {
    state.pages.domains.write().await.toggle(&form.key);
    Redirect::to("/domains")
}

/// POST /domains/refresh
pub async fn refresh_domains(State(state): State<AppState>) -> Redirect {
    DailyDomainsPage::load(state.pages.domains.clone(), state.client.clone()).await;
    Redirect::to("/domains")
}

/// GET /domains/export - Page details of the selected day's visible domains.
pub async fn export_domains(
    State(state): State<AppState>,
    Query(export): Query<ExportQuery>,
    Query(params): Query<DomainParams>,
) -> Result<Download, AppError> {
    prepare_domains(&state, &params).await?;
    let page = state.pages.domains.read().await;
    let basename = format!("domains_{}", page.selected_date().unwrap_or("none"));
    Download::build(&page.export_rows(), &basename, export.format)
}

// Grouped titles

async fn prepare_titles(state: &AppState, params: &TitlesParams) -> Result<(), AppError> {
    let page = &state.pages.titles;
    page.write().await.apply(params)?;
    if page.read().await.needs_load() {
        GroupedTitlesPage::load(page.clone(), state.client.clone()).await;
    }
    Ok(())
}

/// GET /titles - Titles repeated across days.
pub async fn grouped_titles(
    State(state): State<AppState>,
    Query(params): Query<TitlesParams>,
) -> PageResult {
    prepare_titles(&state, &params).await?;
    Ok(Html(state.pages.titles.read().await.render()))
}

/// POST /titles/toggle
pub async fn toggle_title(State(state): State<AppState>, Form(form): Form<KeyForm>) -> Redirect {
    state.pages.titles.write().await.toggle(&form.key);
    Redirect::to("/titles")
}

/// POST /titles/refresh
pub async fn refresh_titles(State(state): State<AppState>) -> Redirect {
    GroupedTitlesPage::load(state.pages.titles.clone(), state.client.clone()).await;
    Redirect::to("/titles")
}

/// GET /titles/export
pub async fn export_titles(
    State(state): State<AppState>,
    Query(export): Query<ExportQuery>,
    Query(params): Query<TitlesParams>,
) -> Result<Download, AppError> {
    prepare_titles(&state, &params).await?;
    let rows = state.pages.titles.read().await.export_rows();
    Download::build(&rows, "repeated_titles", export.format)
}

// Keyword trends

async fn prepare_keywords(state: &AppState, params: &KeywordParams) -> Result<(), AppError> {
    let page = &state.pages.keywords;
    let limit_changed = page.write().await.apply(params)?;
    if limit_changed || page.read().await.needs_load() {
        KeywordTrendsPage::load(page.clone(), state.client.clone()).await;
    }
    Ok(())
}

/// GET /keywords - Most frequent keywords.
pub async fn keyword_trends(
    State(state): State<AppState>,
    Query(params): Query<KeywordParams>,
) -> PageResult {
    prepare_keywords(&state, &params).await?;
    Ok(Html(state.pages.keywords.read().await.render()))
}

/// POST /keywords/refresh
pub async fn refresh_keywords(State(state): State<AppState>) -> Redirect {
    KeywordTrendsPage::load(state.pages.keywords.clone(), state.client.clone()).await;
    Redirect::to("/keywords")
}

/// GET /keywords/export
pub async fn export_keywords(
    State(state): State<AppState>,
    Query(export): Query<ExportQuery>,
    Query(params): Query<KeywordParams>,
) -> Result<Download, AppError> {
    prepare_keywords(&state, &params).await?;
    let rows = state.pages.keywords.read().await.export_rows();
    Download::build(&rows, "keywords", export.format)
}

// Source summary

async fn prepare_sources(state: &AppState, params: &SourceParams) -> Result<(), AppError> {
    let page = &state.pages.sources;
    page.write().await.apply(params)?;
    if page.read().await.needs_load() {
        SourceSummaryPage::load(page.clone(), state.client.clone()).await;
    }
    Ok(())
}

/// GET /sources - Entries per source.
pub async fn source_summary(
    State(state): State<AppState>,
    Query(params): Query<SourceParams>,
) -> PageResult {
    prepare_sources(&state, &params).await?;
    Ok(Html(state.pages.sources.read().await.render()))
}

/// POST /sources/refresh
pub async fn refresh_sources(State(state): State<AppState>) -> Redirect {
    SourceSummaryPage::load(state.pages.sources.clone(), state.client.clone()).await;
    Redirect::to("/sources")
}

/// GET /sources/export
pub async fn export_sources(
    State(state): State<AppState>,
    Query(export): Query<ExportQuery>,
    Query(params): Query<SourceParams>,
) -> Result<Download, AppError> {
    prepare_sources(&state, &params).await?;
    let rows = state.pages.sources.read().await.export_rows();
    Download::build(&rows, "sources", export.format)
}

// Time trends

async fn prepare_trends(state: &AppState, params: &TrendParams) -> Result<(), AppError> {
    let page = &state.pages.trends;
    let window_changed = page.write().await.apply(params)?;
    if page.read().await.needs_load() {
        TimeTrendsPage::load(page.clone(), state.client.clone()).await;
    } else if window_changed {
        TimeTrendsPage::load_trends(page.clone(), state.client.clone()).await;
    }
    Ok(())
}

/// GET /trends - Daily activity over a trailing window.
pub async fn time_trends(
    State(state): State<AppState>,
    Query(params): Query<TrendParams>,
) -> PageResult {
    prepare_trends(&state, &params).await?;
    Ok(Html(state.pages.trends.read().await.render()))
}

/// POST /trends/refresh
pub async fn refresh_trends(State(state): State<AppState>) -> Redirect {
    TimeTrendsPage::load(state.pages.trends.clone(), state.client.clone()).await;
    Redirect::to("/trends")
}

/// GET /trends/export
pub async fn export_trends(
    State(state): State<AppState>,
    Query(export): Query<ExportQuery>,
    Query(params): Query<TrendParams>,
) -> Result<Download, AppError> {
    prepare_trends(&state, &params).await?;
    let page = state.pages.trends.read().await;
    let basename = format!("time_trends_{}d", page.days());
    Download::build(&page.export_rows(), &basename, export.format)
}
