//! Daily domains: which domains were crawled on a given day, with page details.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::{detached, refresh, Page, Shared};
use crate::client::ApiClient;
use crate::errors::AppError;
use crate::models::{DailyDomains, DomainDetail};
use crate::render;
use crate::resource::{ErrorPolicy, Resource};
use crate::view::{ExpandableSet, ListView, SortValue, Tabular};

/// One domain on the selected day.
#[derive(Debug, Clone, PartialEq)]
pub struct DomainRow {
    pub domain: String,
    pub details: Vec<DomainDetail>,
}

impl Tabular for DomainRow {
    type SortKey = ();

    fn search_text(&self) -> &str {
        &self.domain
    }

    fn sort_value(&self, _key: ()) -> SortValue<'_> {
        SortValue::Text(&self.domain)
    }
}

/// Flattened export line: one per page detail.
#[derive(Debug, Clone, Serialize)]
pub struct DomainExportRow {
    pub date: String,
    pub domain: String,
    #[serde(flatten)]
    pub detail: DomainDetail,
}

#[derive(Debug, Default, Deserialize)]
pub struct DomainParams {
    pub date: Option<String>,
    pub q: Option<String>,
}

pub struct DailyDomainsPage {
    domains: Resource<DailyDomains>,
    selected: Option<String>,
    view: ListView<DomainRow>,
    expanded: ExpandableSet,
}

impl Default for DailyDomainsPage {
    fn default() -> Self {
        Self {
            domains: Resource::new(ErrorPolicy::Retain),
            selected: None,
            view: ListView::new(None),
            expanded: ExpandableSet::multiple(),
        }
    }
}

impl Page for DailyDomainsPage {
    fn sync_views(&mut self) {
        let still_present = self
            .selected
            .as_ref()
            .is_some_and(|d| self.domains.data().is_some_and(|m| m.contains_key(d)));
        if !still_present {
            let newest = self.dates().first().map(|d| d.to_string());
            self.selected = newest;
            self.expanded.clear();
        }
        self.view.set_items(self.rows_for_selected());
    }
}

impl DailyDomainsPage {
    pub fn needs_load(&self) -> bool {
        self.domains.is_idle()
    }

    pub async fn load(page: Shared<Self>, client: Arc<ApiClient>) {
        detached(async move {
            refresh(
                &*page,
                "daily_domains",
                |p: &mut Self| &mut p.domains,
                |_| (),
                |_| client.daily_domains(),
            )
            .await
        })
        .await;
    }

    /// Available dates, newest first.
    pub fn dates(&self) -> Vec<&str> {
        self.domains
            .data()
            .map(|m| m.keys().rev().map(String::as_str).collect())
            .unwrap_or_default()
    }

    pub fn selected_date(&self) -> Option<&str> {
        self.selected.as_deref()
    }

    fn rows_for_selected(&self) -> Vec<DomainRow> {
        let (Some(date), Some(data)) = (&self.selected, self.domains.data()) else {
            return Vec::new();
        };
        data.get(date)
            .map(|day| {
                day.iter()
                    .map(|(domain, details)| DomainRow {
                        domain: domain.clone(),
                        details: details.clone(),
                    })
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn apply(&mut self, params: &DomainParams) -> Result<(), AppError> {
        if let Some(date) = params.date.as_deref().filter(|d| !d.is_empty()) {
            let known = self.domains.data().map(|m| m.contains_key(date));
            match known {
                // Nothing loaded: render the banner or empty state instead
                None => {}
                Some(false) => {
                    return Err(AppError::NotFound(format!("No domain data for {}", date)));
                }
                Some(true) if self.selected.as_deref() != Some(date) => {
                    self.selected = Some(date.to_string());
                    self.expanded.clear();
                    self.view.set_items(self.rows_for_selected());
                }
                Some(true) => {}
            }
        }
        if let Some(q) = &params.q {
            self.view.set_query(q);
        }
        Ok(())
    }

    pub fn toggle(&mut self, domain: &str) {
        self.expanded.toggle(domain);
    }

    pub fn export_rows(&self) -> Vec<DomainExportRow> {
        let date = self.selected.clone().unwrap_or_default();
        self.view
            .rows()
            .into_iter()
            .flat_map(|row| {
                let details = if row.details.is_empty() {
                    vec![DomainDetail::default()]
                } else {
                    row.details.clone()
                };
                let date = date.clone();
                details.into_iter().map(move |detail| DomainExportRow {
                    date: date.clone(),
                    domain: row.domain.clone(),
                    detail,
                })
            })
            .collect()
    }

    pub fn render(&self) -> String {
        let query = self.view.query().to_string();
        let selected = self.selected.clone().unwrap_or_default();
        let dates: Vec<(String, String)> = self
            .dates()
            .into_iter()
            .map(|d| (d.to_string(), d.to_string()))
            .collect();

        let mut controls = String::new();
        if !dates.is_empty() {
            controls.push_str(&render::select_form(
                "/domains",
                "date",
                &dates,
                &selected,
                &[("q", query.clone())],
            ));
        }
        controls.push_str(&render::export_links(
            "/domains/export",
            &[("date", selected.clone()), ("q", query.clone())],
        ));
        controls.push_str(&render::refresh_button("/domains/refresh"));

        let mut content = String::new();
        if let Some(err) = self.domains.error() {
            content.push_str(&render::error_banner(&format!(
                "Failed to load daily domains: {}",
                err
            )));
        }

        if self.domains.data().is_none() {
            let body = if self.domains.is_loading() {
                render::loading_indicator()
            } else {
                render::empty_state("No domain data available")
            };
            content.push_str(&render::card(None, &body));
            return render::layout("Daily Domains", "/domains", &controls, &content);
        }

        let all = self.view.all();
        let pages: usize = all.iter().map(|r| r.details.len()).sum();
        content.push_str(&render::metric_grid(&[
            render::metric_card("Domains", &render::format_count(all.len() as u64), Some(&selected)),
            render::metric_card("Pages", &render::format_count(pages as u64), Some(&selected)),
        ]));
        content.push_str(&render::search_form(
            "/domains",
            &query,
            "Search domains...",
            &[("date", selected.clone())],
        ));

        if self.view.is_empty() {
            content.push_str(&render::card(None, &render::empty_state("No domains match")));
        } else {
            let rows: String = self
                .view
                .rows()
                .into_iter()
                .map(|row| self.domain_row(row))
                .collect();
            content.push_str(&render::card(None, &rows));
        }

        render::layout("Daily Domains", "/domains", &controls, &content)
    }

    fn domain_row(&self, row: &DomainRow) -> String {
        let expanded = self.expanded.is_expanded(&row.domain);
        let toggle = render::post_button(
            "/domains/toggle",
            if expanded { "Hide" } else { "Details" },
            &[("key", row.domain.clone())],
            false,
        );
        let detail = if expanded {
            let rows: Vec<Vec<String>> = row.details.iter().map(detail_cells).collect();
            render::table(
                &["Title", "Language", "Category", "Status", "Sentiment", "Load (s)", "Size (KB)", "Keywords"],
                &rows,
            )
        } else {
            String::new()
        };
        format!(
            r#"<div class="row"><strong>{}</strong> <span class="muted">{} pages</span> {}{}</div>"#,
            render::html_escape(&row.domain),
            row.details.len(),
            toggle,
            detail
        )
    }
}

fn detail_cells(d: &DomainDetail) -> Vec<String> {
    let num = |v: Option<f64>, places| v.map(|v| render::format_decimal(v, places)).unwrap_or_default();
    vec![
        d.title.clone().unwrap_or_default(),
        d.language.clone().unwrap_or_default(),
        d.category.clone().unwrap_or_default(),
        d.status_code.map(|s| s.to_string()).unwrap_or_default(),
        num(d.sentiment_score, 2),
        num(d.load_time_s, 2),
        num(d.page_size_kb, 1),
        d.keywords.as_ref().map(|k| k.join(", ")).unwrap_or_default(),
    ]
}
