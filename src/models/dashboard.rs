//! Response schemas for the per-topic `/dashboard` endpoints.

use serde::{Deserialize, Serialize};

/// A threat category offered on the topic selector.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TopicInfo {
    pub id: String,
    pub label: String,
    #[serde(default)]
    pub icon: String,
    #[serde(default)]
    pub color: String,
    #[serde(default)]
    pub total_records: u64,
    #[serde(default)]
    pub total_pipeline_runs: u64,
    #[serde(default)]
    pub first_date: Option<String>,
    #[serde(default)]
    pub last_date: Option<String>,
}

/// `GET /dashboard/topics`
#[derive(Debug, Clone, Deserialize)]
pub struct TopicsEnvelope {
    pub topics: Vec<TopicInfo>,
}

/// Headline numbers for a topic and date range.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct OverviewSummary {
    pub total_records: u64,
    pub unique_domains: u64,
    pub total_groups: u64,
    pub mirror_clusters: u64,
    pub avg_sentiment: f64,
    pub data_start: Option<String>,
    pub data_end: Option<String>,
    pub total_days: u64,
}

/// `GET /dashboard/topic/{id}/overview`
#[derive(Debug, Clone, Deserialize)]
pub struct OverviewEnvelope {
    pub summary: OverviewSummary,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct KeywordCount {
    pub keyword: String,
    pub count: u64,
}

/// `GET /dashboard/topic/{id}/keywords`
#[derive(Debug, Clone, Deserialize)]
pub struct TopicKeywordsEnvelope {
    pub keywords: Vec<KeywordCount>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SentimentDistribution {
    pub positive: u64,
    pub neutral: u64,
    pub negative: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SentimentPoint {
    pub date: String,
    #[serde(default)]
    pub avg_sentiment: f64,
    #[serde(default)]
    pub count: u64,
}

/// `GET /dashboard/topic/{id}/sentiment`
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct SentimentReport {
    pub distribution: SentimentDistribution,
    #[serde(default)]
    pub timeline: Vec<SentimentPoint>,
    #[serde(default)]
    pub total: u64,
}

/// Per-day activity counts. Shared by the topic trends and the global time trends.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TrendPoint {
    pub date: String,
    #[serde(default)]
    pub urls: u64,
    #[serde(default)]
    pub keywords: u64,
    #[serde(default)]
    pub sources: u64,
    #[serde(default)]
    pub titles: u64,
}

/// `GET /dashboard/topic/{id}/trends` and `GET /analytics/time-trends`
#[derive(Debug, Clone, Deserialize)]
pub struct TrendsEnvelope {
    pub trends: Vec<TrendPoint>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct GroupSentiment {
    pub positive: u64,
    pub neutral: u64,
    pub negative: u64,
    pub avg: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LanguageCount {
    pub lang: String,
    #[serde(default)]
    pub count: u64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct GroupSummary {
    pub top_keywords: Vec<String>,
    pub sentiment: Option<GroupSentiment>,
    pub languages: Vec<LanguageCount>,
}

/// Pages sharing one title, collapsed into a group by the backend.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TitleGroup {
    pub title: String,
    #[serde(default)]
    pub urls: Vec<String>,
    #[serde(default)]
    pub url_count: u64,
    #[serde(default)]
    pub domain_count: u64,
    #[serde(default)]
    pub domains: Vec<String>,
    #[serde(default)]
    pub summary: Option<GroupSummary>,
}

/// `GET /dashboard/topic/{id}/groups`
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct TitleGroupsReport {
    pub groups: Vec<TitleGroup>,
    #[serde(default)]
    pub total: u64,
    #[serde(default)]
    pub date: Option<String>,
}

/// A set of domains serving duplicate or near-duplicate content.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MirrorCluster {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub mirror_type: String,
    #[serde(default)]
    pub confidence: f64,
    #[serde(default)]
    pub num_mirrors: u64,
    #[serde(default)]
    pub domains: Vec<String>,
    #[serde(default)]
    pub shared_metadata: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct MirrorSummary {
    pub total_mirror_clusters: u64,
    pub total_mirrored_domains: u64,
    pub exact_matches: u64,
    pub near_matches: u64,
    pub operator_linked: u64,
}

impl MirrorSummary {
    pub fn is_empty(&self) -> bool {
        *self == MirrorSummary::default()
    }
}

/// `GET /dashboard/topic/{id}/mirrors`
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct MirrorReport {
    pub clusters: Vec<MirrorCluster>,
    #[serde(default)]
    pub summary: MirrorSummary,
    #[serde(default)]
    pub date: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ActorTotals {
    pub btc_wallets: u64,
    pub pgp_keys: u64,
    pub emails: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WalletCount {
    pub address: String,
    #[serde(default)]
    pub count: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EmailCount {
    pub email: String,
    #[serde(default)]
    pub count: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PgpKey {
    pub key_preview: String,
    #[serde(default)]
    pub full_key: String,
}

/// `GET /dashboard/topic/{id}/actors`
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ActorReport {
    pub totals: ActorTotals,
    #[serde(default)]
    pub btc_wallets: Vec<WalletCount>,
    #[serde(default)]
    pub emails: Vec<EmailCount>,
    #[serde(default)]
    pub pgp_keys: Vec<PgpKey>,
}

impl ActorReport {
    pub fn is_empty(&self) -> bool {
        self.btc_wallets.is_empty() && self.emails.is_empty() && self.pgp_keys.is_empty()
    }
}

/// How a group of links spreads over the dates in range.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SpanType {
    FullRange,
    Partial,
    SingleDay,
    #[serde(other)]
    Unknown,
}

impl SpanType {
    pub fn label(&self) -> &'static str {
        match self {
            SpanType::FullRange => "All Days",
            SpanType::Partial => "Partial",
            SpanType::SingleDay => "Single Day",
            SpanType::Unknown => "Other",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SpanLink {
    pub url: String,
    #[serde(default)]
    pub domain: String,
    #[serde(default)]
    pub keywords: Vec<String>,
    #[serde(default)]
    pub sentiment_score: f64,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub status_code: Option<u16>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DateSpan {
    pub label: String,
    #[serde(default)]
    pub dates: Vec<String>,
    pub span_type: SpanType,
    #[serde(default)]
    pub num_days: u64,
    #[serde(default)]
    pub count: u64,
    #[serde(default)]
    pub links: Vec<SpanLink>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TitleEvolution {
    pub title: String,
    #[serde(default)]
    pub total_urls: u64,
    #[serde(default)]
    pub total_spans: u64,
    #[serde(default)]
    pub date_spans: Vec<DateSpan>,
}

/// `GET /dashboard/topic/{id}/evolution`
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct EvolutionReport {
    pub title_groups: Vec<TitleEvolution>,
    #[serde(default)]
    pub available_dates: Vec<String>,
    #[serde(default)]
    pub total_titles: u64,
    #[serde(default)]
    pub total_urls: u64,
}

impl EvolutionReport {
    /// First and last date in range, if any.
    pub fn date_bounds(&self) -> Option<(&str, &str)> {
        match (self.available_dates.first(), self.available_dates.last()) {
            (Some(first), Some(last)) => Some((first.as_str(), last.as_str())),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_mirror_summary_defaults() {
        let report: MirrorReport =
            serde_json::from_str(r#"{"clusters": [], "summary": {}}"#).unwrap();
        assert!(report.summary.is_empty());
        assert!(report.clusters.is_empty());
    }

    #[test]
    fn test_missing_envelope_key_is_rejected() {
        let result: Result<TitleGroupsReport, _> = serde_json::from_str(r#"{"total": 3}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_span_type_unknown_variant() {
        let span: DateSpan = serde_json::from_str(
            r#"{"label": "Feb 24", "span_type": "weekly", "links": []}"#,
        )
        .unwrap();
        assert_eq!(span.span_type, SpanType::Unknown);

        let span: DateSpan =
            serde_json::from_str(r#"{"label": "all", "span_type": "full_range"}"#).unwrap();
        assert_eq!(span.span_type.label(), "All Days");
    }

    #[test]
    fn test_topic_info_optional_fields() {
        let topic: TopicInfo =
            serde_json::from_str(r#"{"id": "drugs", "label": "Drugs", "total_records": 120}"#)
                .unwrap();
        assert_eq!(topic.total_records, 120);
        assert_eq!(topic.total_pipeline_runs, 0);
        assert!(topic.last_date.is_none());
    }
}
