//! Dashboard pages.
//!
//! Each page owns its fetched resources and view state. Pages live in the
//! [`PageStore`] behind `RwLock`s; no lock is held across a network call.
//! Fetches run on their own task, so a client that disconnects mid-request
//! never leaves a page stuck in `Loading`.

mod admin;
mod daily_domains;
mod grouped_titles;
mod keyword_trends;
mod source_summary;
mod time_trends;
mod topic_dashboard;
mod topic_selector;

pub use admin::*;
pub use daily_domains::*;
pub use grouped_titles::*;
pub use keyword_trends::*;
pub use source_summary::*;
pub use time_trends::*;
pub use topic_dashboard::*;
pub use topic_selector::*;

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use tokio::sync::RwLock;

use crate::errors::AppError;
use crate::resource::{Resource, Ticket};

/// Hook run after a page's resource resolves, to rebuild derived views.
pub trait Page {
    fn sync_views(&mut self) {}
}

/// Page state shared between handlers and background fetches.
pub type Shared<P> = Arc<RwLock<P>>;

fn shared<P>(page: P) -> Shared<P> {
    Arc::new(RwLock::new(page))
}

/// All page state for the running dashboard.
pub struct PageStore {
    pub topics: Shared<TopicSelectorPage>,
    pub dashboards: RwLock<HashMap<String, Shared<TopicDashboardPage>>>,
    pub domains: Shared<DailyDomainsPage>,
    pub titles: Shared<GroupedTitlesPage>,
    pub keywords: Shared<KeywordTrendsPage>,
    pub sources: Shared<SourceSummaryPage>,
    pub trends: Shared<TimeTrendsPage>,
    pub admin: Shared<AdminPage>,
}

impl PageStore {
    pub fn new() -> Self {
        Self {
            topics: shared(TopicSelectorPage::default()),
            dashboards: RwLock::new(HashMap::new()),
            domains: shared(DailyDomainsPage::default()),
            titles: shared(GroupedTitlesPage::default()),
            keywords: shared(KeywordTrendsPage::default()),
            sources: shared(SourceSummaryPage::default()),
            trends: shared(TimeTrendsPage::default()),
            admin: shared(AdminPage::default()),
        }
    }

    /// Dashboard state for a topic, created on first visit.
    pub async fn dashboard(&self, topic_id: &str) -> Shared<TopicDashboardPage> {
        if let Some(page) = self.dashboards.read().await.get(topic_id) {
            return page.clone();
        }
        let mut dashboards = self.dashboards.write().await;
        dashboards
            .entry(topic_id.to_string())
            .or_insert_with(|| shared(TopicDashboardPage::new(topic_id)))
            .clone()
    }
}

impl Default for PageStore {
    fn default() -> Self {
        Self::new()
    }
}

/// Current UTC calendar date, used for range presets.
pub fn today() -> NaiveDate {
    Utc::now().date_naive()
}

/// Run `task` on its own tokio task and wait for it.
///
/// The task keeps running when the caller is dropped, so a ticketed result
/// still lands in its page. Returns `None` if the task panicked.
pub async fn detached<F, T>(task: F) -> Option<T>
where
    F: Future<Output = T> + Send + 'static,
    T: Send + 'static,
{
    match tokio::spawn(task).await {
        Ok(output) => Some(output),
        Err(err) => {
            tracing::error!(error = %err, "Background task failed");
            None
        }
    }
}

/// Run one fetch cycle for a page resource.
///
/// `args` is read under the same lock that issues the ticket, so the request
/// parameters always belong to the generation the result is checked against.
/// Returns whether the result was applied.
pub async fn refresh<P, T, A, S, G, F, Fut>(
    page: &RwLock<P>,
    series: &'static str,
    slot: S,
    args: G,
    fetch: F,
) -> bool
where
    P: Page,
    S: Fn(&mut P) -> &mut Resource<T>,
    G: FnOnce(&P) -> A,
    F: FnOnce(A) -> Fut,
    Fut: Future<Output = Result<T, AppError>>,
{
    let (ticket, args) = {
        let mut guard = page.write().await;
        let args = args(&*guard);
        (slot(&mut *guard).begin(), args)
    };

    let result = fetch(args).await;

    let mut guard = page.write().await;
    let applied = settle(slot(&mut *guard), ticket, series, result);
    if applied {
        guard.sync_views();
    }
    applied
}

/// Log a failed fetch and hand the result to its resource.
pub fn settle<T>(
    resource: &mut Resource<T>,
    ticket: Ticket,
    series: &'static str,
    result: Result<T, AppError>,
) -> bool {
    if let Err(err) = &result {
        tracing::warn!(series, error = %err, "Fetch failed");
    }
    resource.resolve(ticket, result)
}
