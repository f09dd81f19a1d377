//! Source summary: entries and unique titles per scraped source.

use std::sync::Arc;

use serde::Deserialize;

use super::{detached, refresh, Page, Shared};
use crate::client::ApiClient;
use crate::errors::AppError;
use crate::models::SourceData;
use crate::render;
use crate::resource::{ErrorPolicy, Resource};
use crate::view::{ListView, SortDir, SortSpec, SortValue, Tabular};

const CHART_ROWS: usize = 15;
const TOP_CARDS: usize = 6;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SourceSort {
    #[default]
    Entries,
    Titles,
}

impl SourceSort {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "entries" | "total_entries" => Some(SourceSort::Entries),
            "titles" | "unique_titles" => Some(SourceSort::Titles),
            _ => None,
        }
    }

    pub fn as_param(&self) -> &'static str {
        match self {
            SourceSort::Entries => "entries",
            SourceSort::Titles => "titles",
        }
    }
}

impl Tabular for SourceData {
    type SortKey = SourceSort;

    fn search_text(&self) -> &str {
        &self.source
    }

    fn sort_value(&self, key: SourceSort) -> SortValue<'_> {
        match key {
            SourceSort::Entries => SortValue::Number(self.total_entries as f64),
            SourceSort::Titles => SortValue::Number(self.unique_titles as f64),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct SourceParams {
    pub q: Option<String>,
    pub sort: Option<String>,
    pub dir: Option<String>,
}

pub struct SourceSummaryPage {
    sources: Resource<Vec<SourceData>>,
    view: ListView<SourceData>,
}

impl Default for SourceSummaryPage {
    fn default() -> Self {
        Self {
            sources: Resource::new(ErrorPolicy::Retain),
            view: ListView::new(Some(SortSpec {
                key: SourceSort::Entries,
                dir: SortDir::Desc,
            })),
        }
    }
}

impl Page for SourceSummaryPage {
    fn sync_views(&mut self) {
        self.view.set_items(self.sources.data_or_default());
    }
}

impl SourceSummaryPage {
    pub fn needs_load(&self) -> bool {
        self.sources.is_idle()
    }

    pub async fn load(page: Shared<Self>, client: Arc<ApiClient>) {
        detached(async move {
            refresh(
                &*page,
                "source_summary",
                |p: &mut Self| &mut p.sources,
                |_| (),
                |_| client.source_summary(),
            )
            .await
        })
        .await;
    }

    pub fn apply(&mut self, params: &SourceParams) -> Result<(), AppError> {
        let mut spec = self.sort_spec();
        if let Some(raw) = params.sort.as_deref().filter(|s| !s.is_empty()) {
            spec.key = SourceSort::parse(raw)
                .ok_or_else(|| AppError::Validation(format!("Unknown sort option: {}", raw)))?;
        }
        if let Some(raw) = params.dir.as_deref().filter(|s| !s.is_empty()) {
            spec.dir = SortDir::parse(raw)
                .ok_or_else(|| AppError::Validation(format!("Unknown sort direction: {}", raw)))?;
        }
        self.view.set_sort(Some(spec));
        if let Some(q) = &params.q {
            self.view.set_query(q);
        }
        Ok(())
    }

    fn sort_spec(&self) -> SortSpec<SourceSort> {
        self.view.sort().unwrap_or(SortSpec {
            key: SourceSort::Entries,
            dir: SortDir::Desc,
        })
    }

    pub fn export_rows(&self) -> Vec<SourceData> {
        self.view.snapshot()
    }

    pub fn render(&self) -> String {
        let spec = self.sort_spec();
        let query = self.view.query().to_string();
        let view_params = |sort: SourceSort, dir: SortDir| {
            vec![
                ("q", query.clone()),
                ("sort", sort.as_param().to_string()),
                ("dir", dir.as_str().to_string()),
            ]
        };

        let sort_options = vec![
            ("entries".to_string(), "Sort by Entries".to_string()),
            ("titles".to_string(), "Sort by Titles".to_string()),
        ];
        let flip_label = match spec.dir {
            SortDir::Desc => "↓ Desc",
            SortDir::Asc => "↑ Asc",
        };
        let flip_href = view_params(spec.key, spec.dir.flipped())
            .iter()
            .map(|(k, v)| format!("{}={}", k, render::url_component(v)))
            .collect::<Vec<_>>()
            .join("&amp;");
        let controls = [
            render::select_form(
                "/sources",
                "sort",
                &sort_options,
                spec.key.as_param(),
                &[("q", query.clone()), ("dir", spec.dir.as_str().to_string())],
            ),
            format!(r#"<a class="button" href="/sources?{}">{}</a>"#, flip_href, flip_label),
            render::export_links("/sources/export", &view_params(spec.key, spec.dir)),
            render::refresh_button("/sources/refresh"),
        ]
        .concat();

        let mut content = String::new();
        if let Some(err) = self.sources.error() {
            content.push_str(&render::error_banner(&format!(
                "Failed to load sources: {}",
                err
            )));
        }
        content.push_str(&render::search_form(
            "/sources",
            &query,
            "Search sources...",
            &[
                ("sort", spec.key.as_param().to_string()),
                ("dir", spec.dir.as_str().to_string()),
            ],
        ));

        let rows = self.view.rows();
        if rows.is_empty() {
            let empty = if self.sources.is_loading() {
                render::loading_indicator()
            } else {
                render::empty_state("No source data available")
            };
            content.push_str(&render::card(None, &empty));
            return render::layout("Source Summary", "/sources", &controls, &content);
        }

        let total: u64 = self.view.all().iter().map(|s| s.total_entries).sum();

        let chart: Vec<(String, f64)> = rows
            .iter()
            .take(CHART_ROWS)
            .map(|s| (s.source.clone(), s.total_entries as f64))
            .collect();
        content.push_str(&render::card(
            Some("Entries by Source"),
            &render::bar_chart(&chart),
        ));

        let cards: Vec<String> = rows
            .iter()
            .take(TOP_CARDS)
            .map(|s| {
                let subtitle = format!(
                    "{} unique titles • {} of all entries",
                    render::format_count(s.unique_titles),
                    render::format_share(s.total_entries, total)
                );
                render::metric_card(
                    &s.source,
                    &render::format_count(s.total_entries),
                    Some(&subtitle),
                )
            })
            .collect();
        content.push_str(&render::metric_grid(&cards));

        let table_rows: Vec<Vec<String>> = rows
            .iter()
            .map(|s| {
                vec![
                    s.source.clone(),
                    render::format_count(s.total_entries),
                    render::format_count(s.unique_titles),
                    render::format_share(s.total_entries, total),
                    s.trend.clone(),
                ]
            })
            .collect();
        content.push_str(&render::card(
            Some("All Sources"),
            &render::table(
                &["Source", "Entries", "Unique Titles", "Share", "Trend"],
                &table_rows,
            ),
        ));

        render::layout("Source Summary", "/sources", &controls, &content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn source(name: &str, entries: u64, titles: u64) -> SourceData {
        SourceData {
            source: name.to_string(),
            total_entries: entries,
            unique_titles: titles,
            trend: "stable".to_string(),
        }
    }

    fn loaded() -> SourceSummaryPage {
        let mut page = SourceSummaryPage::default();
        let ticket = page.sources.begin();
        page.sources.resolve(
            ticket,
            Ok(vec![
                source("ahmia", 10, 9),
                source("torch", 30, 2),
                source("haystak", 20, 5),
            ]),
        );
        page.sync_views();
        page
    }

    fn names(page: &SourceSummaryPage) -> Vec<String> {
        page.export_rows().into_iter().map(|s| s.source).collect()
    }

    #[test]
    fn test_default_entries_desc() {
        assert_eq!(names(&loaded()), vec!["torch", "haystak", "ahmia"]);
    }

    #[test]
    fn test_sort_by_titles_and_flip() {
        let mut page = loaded();
        page.apply(&SourceParams { q: None, sort: Some("titles".to_string()), dir: None }).unwrap();
        assert_eq!(names(&page), vec!["ahmia", "haystak", "torch"]);
        page.apply(&SourceParams { q: None, sort: None, dir: Some("asc".to_string()) }).unwrap();
        assert_eq!(names(&page), vec!["torch", "haystak", "ahmia"]);
    }

    #[test]
    fn test_share_uses_unfiltered_total() {
        let mut page = loaded();
        page.apply(&SourceParams { q: Some("tor".to_string()), sort: None, dir: None }).unwrap();
        let html = page.render();
        assert!(html.contains("50.0%"));
        assert!(!html.contains("ahmia"));
    }

    #[test]
    fn test_failure_keeps_previous_rows() {
        let mut page = loaded();
        let ticket = page.sources.begin();
        page.sources.resolve(ticket, Err(AppError::Transport("connection refused".to_string())));
        page.sync_views();
        assert_eq!(page.export_rows().len(), 3);
        assert!(page.render().contains("connection refused"));
    }
}
