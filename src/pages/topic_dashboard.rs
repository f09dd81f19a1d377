//! Per-topic dashboard: overview, grouped titles, mirrors, actor intel and
//! URL evolution, all scoped to one date range.
//!
//! The eight series are fetched together whenever the topic page is first
//! opened or the range changes. Each keeps its own [`Resource`], so one failed
//! endpoint leaves the other tabs intact.

use std::sync::Arc;

use chrono::NaiveDate;
use serde::Deserialize;
use tokio::sync::RwLock;

use super::{detached, settle, Page, Shared};
use crate::client::ApiClient;
use crate::daterange::{parse_date, RangePreset, RangeSelector};
use crate::errors::AppError;
use crate::models::{
    ActorReport, DateSpan, EvolutionReport, KeywordCount, MirrorCluster, MirrorReport,
    OverviewSummary, SentimentReport, TitleEvolution, TitleGroup, TitleGroupsReport, TrendPoint,
};
use crate::render;
use crate::resource::{ErrorPolicy, Resource};
use crate::view::{ExpandableSet, ListView, SortValue, Tabular};

const KEYWORD_LIMIT: u32 = 25;
const KEYWORD_CHART_ROWS: usize = 20;
const ACTOR_TABLE_ROWS: usize = 20;
const PGP_KEY_ROWS: usize = 10;
/// Domains or links shown before "Show All".
const COLLAPSED_ITEMS: usize = 5;

const RANGE_PRESETS: [RangePreset; 5] = [
    RangePreset::AllTime,
    RangePreset::LastDays(7),
    RangePreset::LastDays(30),
    RangePreset::LastDays(90),
    RangePreset::Custom,
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Tab {
    #[default]
    Overview,
    Groups,
    Mirrors,
    Actors,
    Evolution,
}

impl Tab {
    pub const ALL: [Tab; 5] = [Tab::Overview, Tab::Groups, Tab::Mirrors, Tab::Actors, Tab::Evolution];

    pub fn parse(raw: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.as_param() == raw)
    }

    pub fn as_param(&self) -> &'static str {
        match self {
            Tab::Overview => "overview",
            Tab::Groups => "groups",
            Tab::Mirrors => "mirrors",
            Tab::Actors => "actors",
            Tab::Evolution => "evolution",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Tab::Overview => "Overview",
            Tab::Groups => "Grouped Titles",
            Tab::Mirrors => "Mirrors",
            Tab::Actors => "Actor Intel",
            Tab::Evolution => "Evolution",
        }
    }
}

/// Display name and accent colour for a topic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopicMeta {
    pub label: String,
    pub color: &'static str,
}

pub fn topic_meta(topic_id: &str) -> TopicMeta {
    let (label, color) = match topic_id {
        "drugs" => ("Drugs & Forums", "#8B5CF6"),
        "credit_card" => ("Credit Card", "#F59E0B"),
        "weapons" => ("Weapons", "#EF4444"),
        other => (other, "#3B82F6"),
    };
    TopicMeta {
        label: label.to_string(),
        color,
    }
}

/// Which expandable element a toggle form addresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToggleTarget {
    Group,
    Evolution,
    Span,
    SpanLinks,
    Mirror,
}

impl ToggleTarget {
    pub fn parse(raw: &str) -> Result<Self, AppError> {
        match raw {
            "group" => Ok(ToggleTarget::Group),
            "evolution" => Ok(ToggleTarget::Evolution),
            "span" => Ok(ToggleTarget::Span),
            "links" => Ok(ToggleTarget::SpanLinks),
            "mirror" => Ok(ToggleTarget::Mirror),
            other => Err(AppError::Validation(format!("Unknown toggle target: {}", other))),
        }
    }

    fn as_param(&self) -> &'static str {
        match self {
            ToggleTarget::Group => "group",
            ToggleTarget::Evolution => "evolution",
            ToggleTarget::Span => "span",
            ToggleTarget::SpanLinks => "links",
            ToggleTarget::Mirror => "mirror",
        }
    }
}

impl Tabular for TitleGroup {
    type SortKey = ();

    fn search_text(&self) -> &str {
        &self.title
    }

    fn sort_value(&self, _key: ()) -> SortValue<'_> {
        SortValue::Number(self.url_count as f64)
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct TopicParams {
    pub tab: Option<String>,
    pub q: Option<String>,
}

/// Range picker form.
#[derive(Debug, Default, Deserialize)]
pub struct RangeForm {
    pub preset: String,
    pub start: Option<String>,
    pub end: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ToggleForm {
    pub target: String,
    pub key: String,
}

fn span_key(title: &str, span: &DateSpan) -> String {
    format!("{}__{}", title, span.label)
}

pub struct TopicDashboardPage {
    topic_id: String,
    meta: TopicMeta,
    tab: Tab,
    range: RangeSelector,
    range_notice: Option<String>,

    overview: Resource<OverviewSummary>,
    keywords: Resource<Vec<KeywordCount>>,
    sentiment: Resource<SentimentReport>,
    trends: Resource<Vec<TrendPoint>>,
    groups: Resource<TitleGroupsReport>,
    mirrors: Resource<MirrorReport>,
    actors: Resource<ActorReport>,
    evolution: Resource<EvolutionReport>,

    group_view: ListView<TitleGroup>,
    open_group: ExpandableSet,
    open_evolution: ExpandableSet,
    open_spans: ExpandableSet,
    all_links: ExpandableSet,
    all_mirror_domains: ExpandableSet,
}

impl Page for TopicDashboardPage {
    fn sync_views(&mut self) {
        let groups = self
            .groups
            .data()
            .map(|r| r.groups.clone())
            .unwrap_or_default();
        self.group_view.set_items(groups);
    }
}

impl TopicDashboardPage {
    pub fn new(topic_id: &str) -> Self {
        Self {
            topic_id: topic_id.to_string(),
            meta: topic_meta(topic_id),
            tab: Tab::default(),
            range: RangeSelector::default(),
            range_notice: None,
            overview: Resource::new(ErrorPolicy::Retain),
            keywords: Resource::new(ErrorPolicy::Retain),
            sentiment: Resource::new(ErrorPolicy::Retain),
            trends: Resource::new(ErrorPolicy::Retain),
            groups: Resource::new(ErrorPolicy::Retain),
            mirrors: Resource::new(ErrorPolicy::Retain),
            actors: Resource::new(ErrorPolicy::Retain),
            evolution: Resource::new(ErrorPolicy::Retain),
            group_view: ListView::new(None),
            open_group: ExpandableSet::single(),
            open_evolution: ExpandableSet::single(),
            open_spans: ExpandableSet::multiple(),
            all_links: ExpandableSet::multiple(),
            all_mirror_domains: ExpandableSet::multiple(),
        }
    }

    pub fn needs_load(&self) -> bool {
        self.overview.is_idle()
    }

    /// Fetch all eight series for the applied range concurrently.
    pub async fn load(page: Shared<Self>, client: Arc<ApiClient>) {
        detached(async move { Self::fetch_all(&page, &client).await }).await;
    }

    async fn fetch_all(page: &RwLock<Self>, client: &ApiClient) {
        let (topic, range, tickets) = {
            let mut p = page.write().await;
            let tickets = (
                p.overview.begin(),
                p.keywords.begin(),
                p.sentiment.begin(),
                p.trends.begin(),
                p.groups.begin(),
                p.mirrors.begin(),
                p.actors.begin(),
                p.evolution.begin(),
            );
            (p.topic_id.clone(), p.range.applied(), tickets)
        };
        tracing::debug!(topic = %topic, range = %range.describe(), "Loading topic dashboard");

        let (overview, keywords, sentiment, trends, groups, mirrors, actors, evolution) = tokio::join!(
            client.topic_overview(&topic, range),
            client.topic_keywords(&topic, range, KEYWORD_LIMIT),
            client.topic_sentiment(&topic, range),
            client.topic_trends(&topic, range),
            client.topic_groups(&topic, range),
            client.topic_mirrors(&topic, range),
            client.topic_actors(&topic, range),
            client.topic_evolution(&topic, range),
        );

        let mut p = page.write().await;
        settle(&mut p.overview, tickets.0, "topic_overview", overview);
        settle(&mut p.keywords, tickets.1, "topic_keywords", keywords);
        settle(&mut p.sentiment, tickets.2, "topic_sentiment", sentiment);
        settle(&mut p.trends, tickets.3, "topic_trends", trends);
        let groups_applied = settle(&mut p.groups, tickets.4, "topic_groups", groups);
        settle(&mut p.mirrors, tickets.5, "topic_mirrors", mirrors);
        settle(&mut p.actors, tickets.6, "topic_actors", actors);
        settle(&mut p.evolution, tickets.7, "topic_evolution", evolution);
        if groups_applied {
            p.sync_views();
        }
    }

    pub fn apply(&mut self, params: &TopicParams) -> Result<(), AppError> {
        if let Some(raw) = params.tab.as_deref().filter(|t| !t.is_empty()) {
            self.tab = Tab::parse(raw)
                .ok_or_else(|| AppError::Validation(format!("Unknown tab: {}", raw)))?;
        }
        if let Some(q) = &params.q {
            self.group_view.set_query(q);
        }
        Ok(())
    }

    /// Apply a range form. Returns `true` when the applied range changed and
    /// every series must be fetched again.
    ///
    /// An incomplete or inverted custom range keeps the previous range and
    /// leaves a notice for the next render.
    pub fn select_range(&mut self, form: &RangeForm, today: NaiveDate) -> Result<bool, AppError> {
        let preset = RangePreset::parse(&form.preset)?;
        let before = self.range.applied();

        if preset != RangePreset::Custom {
            self.range_notice = None;
            self.range.select(preset, today);
            return Ok(self.range.applied() != before);
        }

        let outcome = parse_date(form.start.as_deref())
            .and_then(|start| Ok((start, parse_date(form.end.as_deref())?)))
            .and_then(|(start, end)| self.range.apply_custom(start, end));
        match outcome {
            Ok(Some(range)) => {
                self.range_notice = None;
                Ok(range != before)
            }
            Ok(None) => {
                if form.start.is_some() || form.end.is_some() {
                    self.range_notice = Some("Choose both a start and an end date".to_string());
                }
                Ok(false)
            }
            Err(err) => {
                tracing::debug!(error = %err, "Rejected custom range");
                self.range_notice = Some(err.message());
                Ok(false)
            }
        }
    }

    pub fn toggle(&mut self, form: &ToggleForm) -> Result<(), AppError> {
        let set = match ToggleTarget::parse(&form.target)? {
            ToggleTarget::Group => &mut self.open_group,
            ToggleTarget::Evolution => &mut self.open_evolution,
            ToggleTarget::Span => &mut self.open_spans,
            ToggleTarget::SpanLinks => &mut self.all_links,
            ToggleTarget::Mirror => &mut self.all_mirror_domains,
        };
        set.toggle(&form.key);
        Ok(())
    }

    pub fn export_rows(&self) -> Vec<TitleGroup> {
        self.group_view.snapshot()
    }

    fn base(&self) -> String {
        format!("/topic/{}", render::url_component(&self.topic_id))
    }

    pub fn render(&self) -> String {
        let base = self.base();
        let query = self.group_view.query().to_string();
        let controls = [
            render::date_range_picker(&format!("{}/range", base), &self.range, &RANGE_PRESETS),
            render::export_links(&format!("{}/export", base), &[("q", query)]),
            render::refresh_button(&format!("{}/refresh", base)),
        ]
        .concat();

        let mut content = String::new();
        let overview = self.overview.data();
        let subtitle = match overview {
            Some(OverviewSummary {
                data_start: Some(start),
                data_end: Some(end),
                total_days,
                ..
            }) => format!("Data from {} to {} · {} days", start, end, total_days),
            _ => "Comprehensive threat analysis".to_string(),
        };
        content.push_str(&format!(
            r#"<p class="muted"><a href="/">← All topics</a> · <span style="color: {}">●</span> {}</p>"#,
            self.meta.color,
            render::html_escape(&subtitle)
        ));

        if let Some(notice) = &self.range_notice {
            content.push_str(&render::error_banner(notice));
        }
        let failures = [
            ("overview", self.overview.error()),
            ("keywords", self.keywords.error()),
            ("sentiment", self.sentiment.error()),
            ("trends", self.trends.error()),
            ("grouped titles", self.groups.error()),
            ("mirrors", self.mirrors.error()),
            ("actor intel", self.actors.error()),
            ("evolution", self.evolution.error()),
        ];
        for (series, err) in failures {
            if let Some(err) = err {
                content.push_str(&render::error_banner(&format!(
                    "Failed to load {}: {}",
                    series, err
                )));
            }
        }

        let tabs: String = Tab::ALL
            .iter()
            .map(|t| {
                let class = if *t == self.tab { r#" class="active""# } else { "" };
                format!(r#"<a href="{}?tab={}"{}>{}</a>"#, base, t.as_param(), class, t.label())
            })
            .collect();
        content.push_str(&format!(r#"<nav class="tabs">{}</nav>"#, tabs));

        if self.overview.is_loading() && overview.is_none() {
            content.push_str(&render::loading_indicator());
        } else {
            let body = match self.tab {
                Tab::Overview => self.render_overview(),
                Tab::Groups => self.render_groups(),
                Tab::Mirrors => self.render_mirrors(),
                Tab::Actors => self.render_actors(),
                Tab::Evolution => self.render_evolution(),
            };
            content.push_str(&body);
        }

        let title = format!("{} Analysis", self.meta.label);
        render::layout(&title, "/", &controls, &content)
    }

    fn toggle_button(&self, target: ToggleTarget, key: &str, label: &str) -> String {
        render::post_button(
            &format!("{}/toggle", self.base()),
            label,
            &[("target", target.as_param().to_string()), ("key", key.to_string())],
            false,
        )
    }

    fn render_overview(&self) -> String {
        let summary = self.overview.data().cloned().unwrap_or_default();
        let mut out = render::metric_grid(&[
            render::metric_card("Total Records", &render::format_count(summary.total_records), None),
            render::metric_card("Unique Domains", &render::format_count(summary.unique_domains), None),
            render::metric_card("Title Groups", &render::format_count(summary.total_groups), None),
            render::metric_card("Mirror Clusters", &render::format_count(summary.mirror_clusters), None),
            render::metric_card("Avg Sentiment", &render::format_decimal(summary.avg_sentiment, 3), None),
        ]);

        let keywords = self.keywords.data().map(Vec::as_slice).unwrap_or_default();
        let chart = if keywords.is_empty() {
            render::empty_state("No keyword data available")
        } else {
            let items: Vec<(String, f64)> = keywords
                .iter()
                .take(KEYWORD_CHART_ROWS)
                .map(|k| (k.keyword.clone(), k.count as f64))
                .collect();
            render::bar_chart(&items)
        };
        out.push_str(&render::card(Some("Top Keywords"), &chart));

        let sentiment = self.sentiment.data().cloned().unwrap_or_default();
        let dist = &sentiment.distribution;
        let distribution = if dist.positive + dist.neutral + dist.negative == 0 {
            render::empty_state("No sentiment data")
        } else {
            render::bar_chart(&[
                ("Positive".to_string(), dist.positive as f64),
                ("Neutral".to_string(), dist.neutral as f64),
                ("Negative".to_string(), dist.negative as f64),
            ])
        };
        out.push_str(&render::card(Some("Sentiment Distribution"), &distribution));

        let timeline = if sentiment.timeline.is_empty() {
            render::empty_state("No timeline data")
        } else {
            let rows: Vec<Vec<String>> = sentiment
                .timeline
                .iter()
                .map(|p| {
                    vec![
                        p.date.clone(),
                        render::format_decimal(p.avg_sentiment, 3),
                        render::format_count(p.count),
                    ]
                })
                .collect();
            render::table(&["Date", "Avg Sentiment", "Records"], &rows)
        };
        out.push_str(&render::card(Some("Sentiment Over Time"), &timeline));

        let trends = self.trends.data().map(Vec::as_slice).unwrap_or_default();
        let activity = if trends.is_empty() {
            render::empty_state("No trend data available")
        } else {
            let rows: Vec<Vec<String>> = trends
                .iter()
                .map(|t| {
                    vec![
                        t.date.clone(),
                        render::format_count(t.urls),
                        render::format_count(t.keywords),
                        render::format_count(t.sources),
                        render::format_count(t.titles),
                    ]
                })
                .collect();
            render::table(&["Date", "URLs", "Keywords", "Sources", "Titles"], &rows)
        };
        out.push_str(&render::card(Some("Activity Trends"), &activity));
        out
    }

    fn render_groups(&self) -> String {
        let total = self.groups.data().map(|r| r.total).unwrap_or_default();
        let mut body = String::from(
            r#"<p class="muted">Sites sharing the same title across multiple .onion domains</p>"#,
        );
        body.push_str(&render::search_form(
            &self.base(),
            self.group_view.query(),
            "Search titles...",
            &[("tab", Tab::Groups.as_param().to_string())],
        ));

        if self.group_view.is_empty() {
            body.push_str(&render::empty_state("No grouped titles found"));
        } else {
            for group in self.group_view.rows() {
                body.push_str(&self.group_row(group));
            }
        }
        render::card(Some(&format!("Grouped Titles ({})", total)), &body)
    }

    fn group_row(&self, g: &TitleGroup) -> String {
        let open = self.open_group.is_expanded(&g.title);
        let header = format!(
            r#"<div class="row"><strong>{}</strong> <span class="muted">{} URLs · {} domains</span> {}</div>"#,
            render::html_escape(&g.title),
            g.url_count,
            g.domain_count,
            self.toggle_button(ToggleTarget::Group, &g.title, if open { "▼" } else { "▶" })
        );
        if !open {
            return header;
        }

        let mut detail = String::new();
        if let Some(summary) = &g.summary {
            if !summary.top_keywords.is_empty() {
                let kws: Vec<String> = summary.top_keywords.iter().map(|k| render::html_escape(k)).collect();
                detail.push_str(&format!(r#"<p class="muted">Keywords: {}</p>"#, kws.join(", ")));
            }
            if !summary.languages.is_empty() {
                let langs: Vec<String> = summary
                    .languages
                    .iter()
                    .map(|l| format!("{} ({})", render::html_escape(&l.lang), l.count))
                    .collect();
                detail.push_str(&format!(r#"<p class="muted">Languages: {}</p>"#, langs.join(", ")));
            }
        }
        let urls: String = g
            .urls
            .iter()
            .map(|u| format!("<li><code>{}</code></li>", render::html_escape(u)))
            .collect();
        detail.push_str(&format!("<ul>{}</ul>", urls));
        format!(r#"{}<div class="detail">{}</div>"#, header, detail)
    }

    fn render_mirrors(&self) -> String {
        let report = self.mirrors.data().cloned().unwrap_or_default();
        let mut out = String::new();
        if !report.summary.is_empty() {
            let s = &report.summary;
            out.push_str(&render::metric_grid(&[
                render::metric_card("Total Clusters", &render::format_count(s.total_mirror_clusters), None),
                render::metric_card("Mirrored Domains", &render::format_count(s.total_mirrored_domains), None),
                render::metric_card("Exact Matches", &render::format_count(s.exact_matches), None),
                render::metric_card("Near Matches", &render::format_count(s.near_matches), None),
            ]));
        }

        if report.clusters.is_empty() {
            out.push_str(&render::card(None, &render::empty_state("No mirror clusters detected")));
            return out;
        }
        let clusters: String = report
            .clusters
            .iter()
            .enumerate()
            .map(|(i, c)| self.mirror_card(i, c))
            .collect();
        out.push_str(&format!(r#"<div class="grid">{}</div>"#, clusters));
        out
    }

    fn mirror_card(&self, index: usize, c: &MirrorCluster) -> String {
        let key = index.to_string();
        let show_all = self.all_mirror_domains.is_expanded(&key);
        let shown = if show_all { c.domains.len() } else { COLLAPSED_ITEMS };
        let domains: String = c
            .domains
            .iter()
            .take(shown)
            .map(|d| format!("<li><code>{}</code></li>", render::html_escape(d)))
            .collect();
        let more = if c.domains.len() > COLLAPSED_ITEMS {
            let label = if show_all {
                "Show Less".to_string()
            } else {
                format!("Show All {} Domains", c.domains.len())
            };
            self.toggle_button(ToggleTarget::Mirror, &key, &label)
        } else {
            String::new()
        };
        let shared = if c.shared_metadata.is_empty() {
            String::new()
        } else {
            format!(
                r#"<p class="muted">Shared: {}</p>"#,
                render::html_escape(&c.shared_metadata.join(", "))
            )
        };
        format!(
            r#"<div class="card"><h4>{}</h4><p class="muted">{} · {:.0}% confidence · {} mirrors</p>{}<ul>{}</ul>{}</div>"#,
            render::html_escape(&render::truncate(&c.title, 80)),
            render::html_escape(&c.mirror_type),
            c.confidence * 100.0,
            c.num_mirrors,
            shared,
            domains,
            more
        )
    }

    fn render_actors(&self) -> String {
        let report = self.actors.data().cloned().unwrap_or_default();
        let mut out = render::metric_grid(&[
            render::metric_card("BTC Wallets", &render::format_count(report.totals.btc_wallets), None),
            render::metric_card("PGP Keys", &render::format_count(report.totals.pgp_keys), None),
            render::metric_card("Emails", &render::format_count(report.totals.emails), None),
        ]);
        if report.is_empty() {
            out.push_str(&render::card(
                None,
                &render::empty_state("No actor intelligence found for this range"),
            ));
            return out;
        }

        if !report.btc_wallets.is_empty() {
            let rows: Vec<Vec<String>> = report
                .btc_wallets
                .iter()
                .take(ACTOR_TABLE_ROWS)
                .map(|w| vec![w.address.clone(), w.count.to_string()])
                .collect();
            out.push_str(&render::card(
                Some("Bitcoin Wallets"),
                &render::table(&["Address", "Occurrences"], &rows),
            ));
        }
        if !report.emails.is_empty() {
            let rows: Vec<Vec<String>> = report
                .emails
                .iter()
                .take(ACTOR_TABLE_ROWS)
                .map(|e| vec![e.email.clone(), e.count.to_string()])
                .collect();
            out.push_str(&render::card(
                Some("Email Addresses"),
                &render::table(&["Email", "Occurrences"], &rows),
            ));
        }
        if !report.pgp_keys.is_empty() {
            let keys: String = report
                .pgp_keys
                .iter()
                .take(PGP_KEY_ROWS)
                .map(|k| format!("<pre>{}...</pre>", render::html_escape(&k.key_preview)))
                .collect();
            out.push_str(&render::card(
                Some(&format!("PGP Keys ({})", report.pgp_keys.len())),
                &keys,
            ));
        }
        out
    }

    fn render_evolution(&self) -> String {
        let report = self.evolution.data().cloned().unwrap_or_default();
        let span = report
            .date_bounds()
            .map(|(first, last)| format!("{} → {}", first, last))
            .unwrap_or_else(|| "N/A".to_string());
        let mut out = render::metric_grid(&[
            render::metric_card("Titles Tracked", &render::format_count(report.total_titles), None),
            render::metric_card("Total URLs", &render::format_count(report.total_urls), None),
            render::metric_card("Date Range", &span, None),
        ]);

        let body = if report.title_groups.is_empty() {
            render::empty_state("No evolution data for this range")
        } else {
            report
                .title_groups
                .iter()
                .map(|t| self.evolution_row(t))
                .collect()
        };
        out.push_str(&render::card(Some("URL Evolution by Title"), &body));
        out
    }

    fn evolution_row(&self, t: &TitleEvolution) -> String {
        let open = self.open_evolution.is_expanded(&t.title);
        let plural = if t.total_spans == 1 { "" } else { "s" };
        let header = format!(
            r#"<div class="row"><strong>{}</strong> <span class="muted">{} date span{} · {} URLs</span> {}</div>"#,
            render::html_escape(&t.title),
            t.total_spans,
            plural,
            t.total_urls,
            self.toggle_button(ToggleTarget::Evolution, &t.title, if open { "▼" } else { "▶" })
        );
        if !open {
            return header;
        }
        let spans: String = t.date_spans.iter().map(|s| self.span_block(&t.title, s)).collect();
        format!(r#"{}<div class="detail">{}</div>"#, header, spans)
    }

    fn span_block(&self, title: &str, span: &DateSpan) -> String {
        let key = span_key(title, span);
        let open = self.open_spans.is_expanded(&key);
        let header = format!(
            r#"<div class="row">{} <span class="muted">{} URLs · {}</span> {}</div>"#,
            render::html_escape(&span.label),
            span.count,
            span.span_type.label(),
            self.toggle_button(ToggleTarget::Span, &key, if open { "▼" } else { "▶" })
        );
        if !open {
            return header;
        }

        let show_all = self.all_links.is_expanded(&key);
        let shown = if show_all { span.links.len() } else { COLLAPSED_ITEMS };
        let links: String = span
            .links
            .iter()
            .take(shown)
            .map(|l| {
                let keywords = if l.keywords.is_empty() {
                    String::new()
                } else {
                    format!(" <span class=\"muted\">{}</span>", render::html_escape(&l.keywords.join(", ")))
                };
                format!(
                    r#"<li><code>{}</code> <span class="muted">{}</span>{}</li>"#,
                    render::html_escape(&l.url),
                    render::html_escape(&l.domain),
                    keywords
                )
            })
            .collect();
        let more = if span.links.len() > COLLAPSED_ITEMS {
            let label = if show_all {
                "Show Less".to_string()
            } else {
                format!("Show All {} Links", span.links.len())
            };
            self.toggle_button(ToggleTarget::SpanLinks, &key, &label)
        } else {
            String::new()
        };
        format!(r#"{}<ul>{}</ul>{}"#, header, links, more)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::daterange::DateRange;
    use crate::models::{SpanLink, SpanType};

    fn day(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn range_form(preset: &str, start: Option<&str>, end: Option<&str>) -> RangeForm {
        RangeForm {
            preset: preset.to_string(),
            start: start.map(str::to_string),
            end: end.map(str::to_string),
        }
    }

    fn group(title: &str) -> TitleGroup {
        TitleGroup {
            title: title.to_string(),
            urls: vec![format!("http://{}.onion", title.to_lowercase())],
            url_count: 1,
            domain_count: 1,
            domains: Vec::new(),
            summary: None,
        }
    }

    #[test]
    fn test_topic_meta_fallback() {
        assert_eq!(topic_meta("credit_card").label, "Credit Card");
        let meta = topic_meta("ransomware");
        assert_eq!(meta.label, "ransomware");
        assert_eq!(meta.color, "#3B82F6");
    }

    #[test]
    fn test_preset_changes_range() {
        let mut page = TopicDashboardPage::new("drugs");
        let today = day("2025-02-26");
        assert!(page.select_range(&range_form("7", None, None), today).unwrap());
        assert_eq!(
            page.range.applied(),
            DateRange { start: Some(day("2025-02-19")), end: Some(today) }
        );
        assert!(!page.select_range(&range_form("7", None, None), today).unwrap());
        assert!(page.select_range(&range_form("all", None, None), today).unwrap());
        assert!(page.range.applied().is_all_time());
    }

    #[test]
    fn test_custom_range_needs_both_ordered_dates() {
        let mut page = TopicDashboardPage::new("drugs");
        let today = day("2025-02-26");
        page.select_range(&range_form("30", None, None), today).unwrap();
        let before = page.range.applied();

        assert!(!page.select_range(&range_form("custom", Some("2025-02-01"), None), today).unwrap());
        assert_eq!(page.range.applied(), before);

        assert!(!page
            .select_range(&range_form("custom", Some("2025-02-20"), Some("2025-02-10")), today)
            .unwrap());
        assert_eq!(page.range.applied(), before);
        assert!(page.range_notice.is_some());

        assert!(page
            .select_range(&range_form("custom", Some("2025-02-10"), Some("2025-02-20")), today)
            .unwrap());
        assert!(page.range_notice.is_none());
        assert_eq!(page.range.applied().start, Some(day("2025-02-10")));
    }

    #[test]
    fn test_group_search_and_single_expand() {
        let mut page = TopicDashboardPage::new("weapons");
        let ticket = page.groups.begin();
        page.groups.resolve(
            ticket,
            Ok(TitleGroupsReport {
                groups: vec![group("Gun Shop"), group("Ammo Depot"), group("Gunsmith Forum")],
                total: 3,
                date: None,
            }),
        );
        page.sync_views();
        page.apply(&TopicParams { tab: Some("groups".to_string()), q: Some("gun".to_string()) })
            .unwrap();
        assert_eq!(page.export_rows().len(), 2);

        let toggle = |key: &str| ToggleForm { target: "group".to_string(), key: key.to_string() };
        page.toggle(&toggle("Gun Shop")).unwrap();
        page.toggle(&toggle("Gunsmith Forum")).unwrap();
        let html = page.render();
        assert!(html.contains("http://gunsmith forum.onion"));
        assert!(!html.contains("http://gun shop.onion"));
        assert!(page.toggle(&ToggleForm { target: "bogus".to_string(), key: String::new() }).is_err());
    }

    #[test]
    fn test_span_links_show_all() {
        let mut page = TopicDashboardPage::new("drugs");
        let links = (0..7)
            .map(|i| SpanLink {
                url: format!("http://site{}.onion", i),
                domain: format!("site{}.onion", i),
                keywords: Vec::new(),
                sentiment_score: 0.0,
                category: String::new(),
                status_code: None,
            })
            .collect();
        let ticket = page.evolution.begin();
        page.evolution.resolve(
            ticket,
            Ok(EvolutionReport {
                title_groups: vec![TitleEvolution {
                    title: "Pharma".to_string(),
                    total_urls: 7,
                    total_spans: 1,
                    date_spans: vec![DateSpan {
                        label: "Feb 20 - Feb 26".to_string(),
                        dates: Vec::new(),
                        span_type: SpanType::FullRange,
                        num_days: 7,
                        count: 7,
                        links,
                    }],
                }],
                available_dates: vec!["2025-02-20".to_string(), "2025-02-26".to_string()],
                total_titles: 1,
                total_urls: 7,
            }),
        );
        page.apply(&TopicParams { tab: Some("evolution".to_string()), q: None }).unwrap();
        let toggle = |target: &str, key: &str| ToggleForm {
            target: target.to_string(),
            key: key.to_string(),
        };
        page.toggle(&toggle("evolution", "Pharma")).unwrap();
        page.toggle(&toggle("span", "Pharma__Feb 20 - Feb 26")).unwrap();

        let html = page.render();
        assert!(html.contains("2025-02-20 → 2025-02-26"));
        assert!(html.contains("http://site4.onion"));
        assert!(!html.contains("http://site5.onion"));
        assert!(html.contains("Show All 7 Links"));

        page.toggle(&toggle("links", "Pharma__Feb 20 - Feb 26")).unwrap();
        let html = page.render();
        assert!(html.contains("http://site6.onion"));
        assert!(html.contains("Show Less"));
    }

    #[test]
    fn test_failed_series_leaves_others() {
        let mut page = TopicDashboardPage::new("drugs");
        let t1 = page.overview.begin();
        let t2 = page.actors.begin();
        page.overview.resolve(
            t1,
            Ok(OverviewSummary { total_records: 15230, ..OverviewSummary::default() }),
        );
        page.actors.resolve(
            t2,
            Err(AppError::UpstreamStatus {
                status: 500,
                endpoint: "/dashboard/topic/drugs/actors".to_string(),
            }),
        );
        let html = page.render();
        assert!(html.contains("15,230"));
        assert!(html.contains("Failed to load actor intel"));
    }
}
