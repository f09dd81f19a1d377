//! Keyword trends: most frequent keywords across all sources.

use std::sync::Arc;

use serde::Deserialize;

use super::{detached, refresh, Page, Shared};
use crate::client::ApiClient;
use crate::errors::AppError;
use crate::models::KeywordData;
use crate::render;
use crate::resource::{ErrorPolicy, Resource};
use crate::view::{ListView, SortValue, Tabular};

pub const DEFAULT_KEYWORD_LIMIT: u32 = 20;
pub const KEYWORD_LIMITS: [u32; 4] = [10, 20, 50, 100];

const TOP_CARDS: usize = 9;

impl Tabular for KeywordData {
    type SortKey = ();

    fn search_text(&self) -> &str {
        &self.keyword
    }

    fn sort_value(&self, _key: ()) -> SortValue<'_> {
        SortValue::Number(self.count as f64)
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct KeywordParams {
    pub q: Option<String>,
    pub limit: Option<u32>,
}

pub struct KeywordTrendsPage {
    keywords: Resource<Vec<KeywordData>>,
    view: ListView<KeywordData>,
    limit: u32,
}

impl Default for KeywordTrendsPage {
    fn default() -> Self {
        Self {
            keywords: Resource::new(ErrorPolicy::Clear),
            // Backend order is already by count.
            view: ListView::new(None),
            limit: DEFAULT_KEYWORD_LIMIT,
        }
    }
}

impl Page for KeywordTrendsPage {
    fn sync_views(&mut self) {
        self.view.set_items(self.keywords.data_or_default());
    }
}

impl KeywordTrendsPage {
    pub fn needs_load(&self) -> bool {
        self.keywords.is_idle()
    }

    pub fn limit(&self) -> u32 {
        self.limit
    }

    pub async fn load(page: Shared<Self>, client: Arc<ApiClient>) {
        detached(async move {
            refresh(
                &*page,
                "keywords",
                |p: &mut Self| &mut p.keywords,
                |p| p.limit,
                |limit| client.keywords(limit),
            )
            .await
        })
        .await;
    }

    /// Apply view parameters. Returns `true` when the limit changed and the
    /// keywords must be fetched again.
    pub fn apply(&mut self, params: &KeywordParams) -> Result<bool, AppError> {
        let mut reload = false;
        if let Some(limit) = params.limit {
            if !KEYWORD_LIMITS.contains(&limit) {
                return Err(AppError::Validation(format!(
                    "Unsupported keyword limit: {}",
                    limit
                )));
            }
            if limit != self.limit {
                self.limit = limit;
                reload = true;
            }
        }
        if let Some(q) = &params.q {
            self.view.set_query(q);
        }
        Ok(reload)
    }

    pub fn export_rows(&self) -> Vec<KeywordData> {
        self.view.snapshot()
    }

    pub fn render(&self) -> String {
        let query = self.view.query().to_string();
        let limit_options: Vec<(String, String)> = KEYWORD_LIMITS
            .iter()
            .map(|n| (n.to_string(), format!("Top {}", n)))
            .collect();
        let controls = [
            render::select_form(
                "/keywords",
                "limit",
                &limit_options,
                &self.limit.to_string(),
                &[("q", query.clone())],
            ),
            render::export_links(
                "/keywords/export",
                &[("q", query.clone()), ("limit", self.limit.to_string())],
            ),
            render::refresh_button("/keywords/refresh"),
        ]
        .concat();

        let mut content = String::new();
        if let Some(err) = self.keywords.error() {
            content.push_str(&render::error_banner(&format!(
                "Failed to load keywords: {}",
                err
            )));
        }
        content.push_str(&render::search_form(
            "/keywords",
            &query,
            "Search keywords...",
            &[("limit", self.limit.to_string())],
        ));

        if self.view.is_empty() {
            let empty = if self.keywords.is_loading() {
                render::loading_indicator()
            } else {
                render::empty_state("No keywords found")
            };
            content.push_str(&render::card(None, &empty));
        } else {
            let rows = self.view.rows();
            let chart: Vec<(String, f64)> = rows
                .iter()
                .map(|k| (k.keyword.clone(), k.count as f64))
                .collect();
            content.push_str(&render::card(
                Some("Keyword Frequency"),
                &render::bar_chart(&chart),
            ));
            let cards: Vec<String> = rows.iter().take(TOP_CARDS).map(|k| keyword_card(k)).collect();
            content.push_str(&format!(r#"<div class="grid keywords">{}</div>"#, cards.concat()));
        }

        render::layout("Keyword Trends", "/keywords", &controls, &content)
    }
}

fn keyword_card(k: &KeywordData) -> String {
    let badge = k
        .category
        .as_deref()
        .map(|c| format!(r#"<span class="muted badge">{}</span>"#, render::html_escape(c)))
        .unwrap_or_default();
    format!(
        r#"<div class="card"><h4>{}</h4><p class="value count">{}</p>{}</div>"#,
        render::html_escape(&k.keyword),
        k.count,
        badge
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kw(keyword: &str, count: u64, category: Option<&str>) -> KeywordData {
        KeywordData {
            keyword: keyword.to_string(),
            count,
            category: category.map(str::to_string),
        }
    }

    fn loaded() -> KeywordTrendsPage {
        let mut page = KeywordTrendsPage::default();
        let ticket = page.keywords.begin();
        page.keywords.resolve(
            ticket,
            Ok(vec![
                kw("fraud", 42, None),
                kw("bitcoin", 30, Some("finance")),
                kw("Fraudulent", 7, Some("fraud")),
            ]),
        );
        page.sync_views();
        page
    }

    #[test]
    fn test_search_keeps_counts_verbatim() {
        let mut page = loaded();
        page.apply(&KeywordParams { q: Some("fra".to_string()), limit: None }).unwrap();
        let rows = page.export_rows();
        assert_eq!(rows.len(), 2);
        assert!(rows.iter().all(|k| k.keyword.to_lowercase().contains("fra")));

        let html = page.render();
        assert!(html.contains(r#"<p class="value count">42</p>"#));
        assert!(!html.contains("bitcoin"));
    }

    #[test]
    fn test_limit_change_requests_reload() {
        let mut page = loaded();
        assert!(!page.apply(&KeywordParams { q: None, limit: Some(20) }).unwrap());
        assert!(page.apply(&KeywordParams { q: None, limit: Some(50) }).unwrap());
        assert_eq!(page.limit(), 50);
        assert!(page.apply(&KeywordParams { q: None, limit: Some(7) }).is_err());
    }

    #[test]
    fn test_failure_clears_list() {
        let mut page = loaded();
        let ticket = page.keywords.begin();
        page.keywords.resolve(
            ticket,
            Err(AppError::UpstreamStatus { status: 500, endpoint: "/analytics/keywords".to_string() }),
        );
        page.sync_views();
        assert!(page.export_rows().is_empty());
        let html = page.render();
        assert!(html.contains("No keywords found"));
        assert!(html.contains("returned HTTP 500"));
    }
}
