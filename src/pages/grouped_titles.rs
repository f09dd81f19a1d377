//! Grouped titles: titles seen on more than one day.

use std::sync::Arc;

use serde::Deserialize;

use super::{detached, refresh, Page, Shared};
use crate::client::ApiClient;
use crate::errors::AppError;
use crate::models::TitleData;
use crate::render;
use crate::resource::{ErrorPolicy, Resource};
use crate::view::{ExpandableSet, ListView, SortDir, SortSpec, SortValue, Tabular};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TitleSort {
    #[default]
    UniqueDays,
    TotalAppearances,
    AvgSentiment,
    FirstSeen,
    LastSeen,
    Title,
}

impl TitleSort {
    pub const ALL: [TitleSort; 6] = [
        TitleSort::UniqueDays,
        TitleSort::TotalAppearances,
        TitleSort::AvgSentiment,
        TitleSort::FirstSeen,
        TitleSort::LastSeen,
        TitleSort::Title,
    ];

    pub fn parse(raw: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.as_param() == raw)
    }

    pub fn as_param(&self) -> &'static str {
        match self {
            TitleSort::UniqueDays => "unique_days",
            TitleSort::TotalAppearances => "total_appearances",
            TitleSort::AvgSentiment => "avg_sentiment",
            TitleSort::FirstSeen => "first_seen",
            TitleSort::LastSeen => "last_seen",
            TitleSort::Title => "title",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            TitleSort::UniqueDays => "Unique Days",
            TitleSort::TotalAppearances => "Total Appearances",
            TitleSort::AvgSentiment => "Average Sentiment",
            TitleSort::FirstSeen => "First Seen",
            TitleSort::LastSeen => "Last Seen",
            TitleSort::Title => "Title (A–Z)",
        }
    }

    /// Titles read A–Z; every other option shows the largest or newest first.
    pub fn spec(self) -> SortSpec<TitleSort> {
        let dir = match self {
            TitleSort::Title => SortDir::Asc,
            _ => SortDir::Desc,
        };
        SortSpec { key: self, dir }
    }
}

impl Tabular for TitleData {
    type SortKey = TitleSort;

    fn search_text(&self) -> &str {
        &self.title
    }

    fn sort_value(&self, key: TitleSort) -> SortValue<'_> {
        match key {
            TitleSort::UniqueDays => SortValue::Number(self.unique_days as f64),
            TitleSort::TotalAppearances => SortValue::Number(self.total_appearances as f64),
            TitleSort::AvgSentiment => {
                SortValue::Number(self.avg_sentiment.unwrap_or(f64::NEG_INFINITY))
            }
            TitleSort::FirstSeen => SortValue::date(&self.first_seen),
            TitleSort::LastSeen => SortValue::date(&self.last_seen),
            TitleSort::Title => SortValue::Text(&self.title),
        }
    }
}

/// View parameters accepted on `GET /titles`.
#[derive(Debug, Default, Deserialize)]
pub struct TitlesParams {
    pub q: Option<String>,
    pub sort: Option<String>,
}

pub struct GroupedTitlesPage {
    titles: Resource<Vec<TitleData>>,
    view: ListView<TitleData>,
    expanded: ExpandableSet,
}

impl Default for GroupedTitlesPage {
    fn default() -> Self {
        Self {
            titles: Resource::new(ErrorPolicy::Clear),
            view: ListView::new(Some(TitleSort::default().spec())),
            expanded: ExpandableSet::single(),
        }
    }
}

impl Page for GroupedTitlesPage {
    fn sync_views(&mut self) {
        self.view.set_items(self.titles.data_or_default());
    }
}

impl GroupedTitlesPage {
    pub fn needs_load(&self) -> bool {
        self.titles.is_idle()
    }

    pub async fn load(page: Shared<Self>, client: Arc<ApiClient>) {
        detached(async move {
            refresh(
                &*page,
                "repeated_titles",
                |p: &mut Self| &mut p.titles,
                |_| (),
                |_| client.repeated_titles(),
            )
            .await
        })
        .await;
    }

    pub fn apply(&mut self, params: &TitlesParams) -> Result<(), AppError> {
        if let Some(raw) = params.sort.as_deref().filter(|s| !s.is_empty()) {
            let sort = TitleSort::parse(raw)
                .ok_or_else(|| AppError::Validation(format!("Unknown sort option: {}", raw)))?;
            self.view.set_sort(Some(sort.spec()));
        }
        if let Some(q) = &params.q {
            self.view.set_query(q);
        }
        Ok(())
    }

    pub fn toggle(&mut self, title: &str) {
        self.expanded.toggle(title);
    }

    pub fn export_rows(&self) -> Vec<TitleData> {
        self.view.snapshot()
    }

    fn current_sort(&self) -> TitleSort {
        self.view.sort().map(|s| s.key).unwrap_or_default()
    }

    pub fn render(&self) -> String {
        let sort = self.current_sort();
        let query = self.view.query().to_string();

        let sort_options: Vec<(String, String)> = TitleSort::ALL
            .iter()
            .map(|s| (s.as_param().to_string(), s.label().to_string()))
            .collect();
        let controls = [
            render::select_form(
                "/titles",
                "sort",
                &sort_options,
                sort.as_param(),
                &[("q", query.clone())],
            ),
            render::export_links(
                "/titles/export",
                &[("q", query.clone()), ("sort", sort.as_param().to_string())],
            ),
            render::refresh_button("/titles/refresh"),
        ]
        .concat();

        let mut body = String::new();
        if let Some(err) = self.titles.error() {
            body.push_str(&render::error_banner(&format!(
                "Failed to load repeated titles: {}",
                err
            )));
        }
        body.push_str(r#"<p class="muted">Titles appearing across multiple days</p>"#);
        body.push_str(&render::search_form(
            "/titles",
            &query,
            "Search titles...",
            &[("sort", sort.as_param().to_string())],
        ));

        if self.view.is_empty() {
            if self.titles.is_loading() {
                body.push_str(&render::loading_indicator());
            } else {
                body.push_str(&render::empty_state("No repeated titles found"));
            }
        } else {
            let rows: String = self
                .view
                .rows()
                .into_iter()
                .map(|t| self.title_row(t))
                .collect();
            body.push_str(&format!(r#"<div class="title-list">{}</div>"#, rows));
        }

        render::layout(
            "Repeated Titles",
            "/titles",
            &controls,
            &render::card(None, &body),
        )
    }

    fn title_row(&self, t: &TitleData) -> String {
        let expanded = self.expanded.is_expanded(&t.title);
        let summary = format!(
            "{} unique days • First seen: {} • Last seen: {}",
            t.unique_days,
            render::short_date(&t.first_seen),
            render::short_date(&t.last_seen)
        );
        let toggle = render::post_button(
            "/titles/toggle",
            if expanded { "▲" } else { "▼" },
            &[("key", t.title.clone())],
            false,
        );
        let detail = if expanded {
            let sentiment = t
                .avg_sentiment
                .map(|s| {
                    format!(
                        r#"<p class="muted">Avg sentiment: {}</p>"#,
                        render::format_decimal(s, 2)
                    )
                })
                .unwrap_or_default();
            format!(
                r#"<div class="detail"><p>Total appearances: {}</p>{}</div>"#,
                t.total_appearances, sentiment
            )
        } else {
            String::new()
        };
        format!(
            r#"<div class="card row"><h4>{}</h4><p class="muted">{}</p>{}{}</div>"#,
            render::html_escape(&t.title),
            render::html_escape(&summary),
            toggle,
            detail
        )
    }
}
