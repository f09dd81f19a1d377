//! Time trends: daily activity counts over a trailing window, plus site evolution.

use std::sync::Arc;

use serde::Deserialize;
use tokio::sync::RwLock;

use super::{detached, refresh, Page, Shared};
use crate::client::ApiClient;
use crate::errors::AppError;
use crate::models::{SiteEvolution, TrendPoint};
use crate::render;
use crate::resource::{ErrorPolicy, Resource};

pub const DEFAULT_TREND_DAYS: u32 = 14;
pub const TREND_WINDOWS: [u32; 5] = [7, 14, 30, 60, 90];

const SITE_EVOLUTION_ROWS: usize = 10;

#[derive(Debug, Default, Deserialize)]
pub struct TrendParams {
    pub days: Option<u32>,
}

/// URL statistics over the loaded window.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UrlStats {
    pub total: u64,
    pub avg: f64,
    pub max: u64,
    pub min: u64,
}

impl UrlStats {
    pub fn from_points(points: &[TrendPoint]) -> Option<Self> {
        let max = points.iter().map(|p| p.urls).max()?;
        let min = points.iter().map(|p| p.urls).min()?;
        let total: u64 = points.iter().map(|p| p.urls).sum();
        Some(Self {
            total,
            avg: total as f64 / points.len() as f64,
            max,
            min,
        })
    }
}

pub struct TimeTrendsPage {
    trends: Resource<Vec<TrendPoint>>,
    sites: Resource<Vec<SiteEvolution>>,
    days: u32,
}

impl Default for TimeTrendsPage {
    fn default() -> Self {
        Self {
            trends: Resource::new(ErrorPolicy::Retain),
            sites: Resource::new(ErrorPolicy::Retain),
            days: DEFAULT_TREND_DAYS,
        }
    }
}

impl Page for TimeTrendsPage {}

impl TimeTrendsPage {
    pub fn needs_load(&self) -> bool {
        self.trends.is_idle() || self.sites.is_idle()
    }

    pub fn days(&self) -> u32 {
        self.days
    }

    /// Fetch the trend window and the site evolutions side by side.
    pub async fn load(page: Shared<Self>, client: Arc<ApiClient>) {
        detached(async move {
            tokio::join!(
                Self::fetch_trends(&page, &client),
                refresh(
                    &*page,
                    "site_evolution",
                    |p: &mut Self| &mut p.sites,
                    |_| (),
                    |_| client.site_evolution(),
                ),
            );
        })
        .await;
    }

    /// Only the trend series depends on the window.
    pub async fn load_trends(page: Shared<Self>, client: Arc<ApiClient>) {
        detached(async move { Self::fetch_trends(&page, &client).await }).await;
    }

    async fn fetch_trends(page: &RwLock<Self>, client: &ApiClient) -> bool {
        refresh(
            page,
            "time_trends",
            |p: &mut Self| &mut p.trends,
            |p| p.days,
            |days| client.time_trends(days),
        )
        .await
    }

    /// Returns `true` when the window changed.
    pub fn apply(&mut self, params: &TrendParams) -> Result<bool, AppError> {
        match params.days {
            Some(days) if !TREND_WINDOWS.contains(&days) => Err(AppError::Validation(format!(
                "Unsupported trend window: {} days",
                days
            ))),
            Some(days) if days != self.days => {
                self.days = days;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    pub fn export_rows(&self) -> Vec<TrendPoint> {
        self.trends.data_or_default()
    }

    pub fn render(&self) -> String {
        let window_options: Vec<(String, String)> = TREND_WINDOWS
            .iter()
            .map(|d| (d.to_string(), format!("Last {} days", d)))
            .collect();
        let controls = [
            render::select_form("/trends", "days", &window_options, &self.days.to_string(), &[]),
            render::export_links("/trends/export", &[("days", self.days.to_string())]),
            render::refresh_button("/trends/refresh"),
        ]
        .concat();

        let mut content = String::new();
        for (series, err) in [("trends", self.trends.error()), ("site evolution", self.sites.error())] {
            if let Some(err) = err {
                content.push_str(&render::error_banner(&format!(
                    "Failed to load {}: {}",
                    series, err
                )));
            }
        }

        let points = self.trends.data().map(Vec::as_slice).unwrap_or_default();
        match UrlStats::from_points(points) {
            Some(stats) => {
                content.push_str(&render::metric_grid(&[
                    render::metric_card("Total URLs", &render::format_count(stats.total), None),
                    render::metric_card("Daily Average", &render::format_decimal(stats.avg, 1), None),
                    render::metric_card("Peak Day", &render::format_count(stats.max), None),
                    render::metric_card("Lowest Day", &render::format_count(stats.min), None),
                ]));
                let chart: Vec<(String, f64)> = points
                    .iter()
                    .map(|p| (p.date.clone(), p.urls as f64))
                    .collect();
                content.push_str(&render::card(Some("URLs per Day"), &render::bar_chart(&chart)));
                let rows: Vec<Vec<String>> = points
                    .iter()
                    .map(|p| {
                        vec![
                            p.date.clone(),
                            render::format_count(p.urls),
                            render::format_count(p.keywords),
                            render::format_count(p.sources),
                            render::format_count(p.titles),
                        ]
                    })
                    .collect();
                content.push_str(&render::card(
                    Some("Daily Activity"),
                    &render::table(&["Date", "URLs", "Keywords", "Sources", "Titles"], &rows),
                ));
            }
            None if self.trends.is_loading() => content.push_str(&render::loading_indicator()),
            None => content.push_str(&render::card(
                None,
                &render::empty_state("No trend data for this window"),
            )),
        }

        let sites = self.sites.data().map(Vec::as_slice).unwrap_or_default();
        let body = if sites.is_empty() {
            render::empty_state("No site evolution data")
        } else {
            let rows: Vec<Vec<String>> = sites
                .iter()
                .take(SITE_EVOLUTION_ROWS)
                .map(|s| {
                    let domains: Vec<&str> = s.domains.iter().map(|d| d.domain.as_str()).collect();
                    vec![
                        s.title.clone(),
                        s.total_domains.to_string(),
                        s.active_days.to_string(),
                        domains.join(", "),
                    ]
                })
                .collect();
            render::table(&["Title", "Domains", "Active Days", "Hosted On"], &rows)
        };
        content.push_str(&render::card(Some("Site Evolution"), &body));

        render::layout("Time Trends", "/trends", &controls, &content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn point(date: &str, urls: u64) -> TrendPoint {
        TrendPoint {
            date: date.to_string(),
            urls,
            keywords: 0,
            sources: 0,
            titles: 0,
        }
    }

    #[test]
    fn test_url_stats() {
        let stats = UrlStats::from_points(&[
            point("2025-02-24", 10),
            point("2025-02-25", 25),
            point("2025-02-26", 4),
        ])
        .unwrap();
        assert_eq!(stats.total, 39);
        assert_eq!(stats.max, 25);
        assert_eq!(stats.min, 4);
        assert!((stats.avg - 13.0).abs() < f64::EPSILON);
        assert!(UrlStats::from_points(&[]).is_none());
    }

    #[test]
    fn test_window_change() {
        let mut page = TimeTrendsPage::default();
        assert_eq!(page.days(), 14);
        assert!(!page.apply(&TrendParams { days: Some(14) }).unwrap());
        assert!(page.apply(&TrendParams { days: Some(30) }).unwrap());
        assert!(page.apply(&TrendParams { days: Some(13) }).is_err());
        assert_eq!(page.days(), 30);
    }

    #[test]
    fn test_site_evolution_capped() {
        let mut page = TimeTrendsPage::default();
        let ticket = page.sites.begin();
        let sites = (0..12)
            .map(|i| SiteEvolution {
                title: format!("site-{:02}", i),
                domains: Vec::new(),
                total_domains: 1,
                active_days: 1,
            })
            .collect();
        page.sites.resolve(ticket, Ok(sites));
        let html = page.render();
        assert!(html.contains("site-09"));
        assert!(!html.contains("site-10"));
    }
}
