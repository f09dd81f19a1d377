//! Response schemas for the global `/analytics` endpoints.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Page fingerprint attached to a domain on a given day.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DomainDetail {
    pub title: Option<String>,
    pub language: Option<String>,
    pub sentiment_score: Option<f64>,
    pub category: Option<String>,
    pub keywords: Option<Vec<String>>,
    pub status_code: Option<u16>,
    pub load_time_s: Option<f64>,
    pub page_size_kb: Option<f64>,
    pub onion_links_outbound: Option<serde_json::Value>,
    pub classification: Option<serde_json::Value>,
    pub first_seen: Option<String>,
    pub last_seen: Option<String>,
}

/// date -> domain -> details
pub type DailyDomains = BTreeMap<String, BTreeMap<String, Vec<DomainDetail>>>;

/// `GET /analytics/daily-domains`
#[derive(Debug, Clone, Deserialize)]
pub struct DailyDomainsEnvelope {
    pub daily_domains: DailyDomains,
}

/// A title that showed up on more than one day.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TitleData {
    pub title: String,
    #[serde(default)]
    pub total_appearances: u64,
    #[serde(default)]
    pub unique_days: u64,
    #[serde(default)]
    pub first_seen: String,
    #[serde(default)]
    pub last_seen: String,
    #[serde(default)]
    pub avg_sentiment: Option<f64>,
}

/// `GET /analytics/repeated-domains` answers either a bare array or `{"data": [...]}`.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum RepeatedTitlesEnvelope {
    Bare(Vec<TitleData>),
    Wrapped { data: Vec<TitleData> },
}

impl RepeatedTitlesEnvelope {
    pub fn into_titles(self) -> Vec<TitleData> {
        match self {
            RepeatedTitlesEnvelope::Bare(titles) => titles,
            RepeatedTitlesEnvelope::Wrapped { data } => data,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct KeywordData {
    pub keyword: String,
    pub count: u64,
    #[serde(default)]
    pub category: Option<String>,
}

/// `GET /analytics/keywords`
#[derive(Debug, Clone, Deserialize)]
pub struct KeywordsEnvelope {
    pub keywords: Vec<KeywordData>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SourceData {
    pub source: String,
    #[serde(default)]
    pub total_entries: u64,
    #[serde(default)]
    pub unique_titles: u64,
    #[serde(default)]
    pub trend: String,
}

/// `GET /analytics/source-summary`
#[derive(Debug, Clone, Deserialize)]
pub struct SourcesEnvelope {
    pub sources: Vec<SourceData>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SiteDomain {
    pub domain: String,
    #[serde(default)]
    pub first_seen: String,
    #[serde(default)]
    pub last_seen: String,
}

/// Which domains hosted a title over time.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SiteEvolution {
    pub title: String,
    #[serde(default)]
    pub domains: Vec<SiteDomain>,
    #[serde(default)]
    pub total_domains: u64,
    #[serde(default)]
    pub active_days: u64,
}

/// `GET /analytics/site-evolution`
#[derive(Debug, Clone, Deserialize)]
pub struct SiteEvolutionEnvelope {
    pub site_evolutions: Vec<SiteEvolution>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_repeated_titles_both_shapes() {
        let bare: RepeatedTitlesEnvelope = serde_json::from_str(
            r#"[{"title": "Shop", "total_appearances": 4, "unique_days": 2,
                 "first_seen": "2025-01-01", "last_seen": "2025-01-03"}]"#,
        )
        .unwrap();
        assert_eq!(bare.into_titles().len(), 1);

        let wrapped: RepeatedTitlesEnvelope =
            serde_json::from_str(r#"{"data": [{"title": "Shop"}, {"title": "Forum"}]}"#).unwrap();
        let titles = wrapped.into_titles();
        assert_eq!(titles.len(), 2);
        assert_eq!(titles[1].title, "Forum");
        assert!(titles[1].avg_sentiment.is_none());
    }

    #[test]
    fn test_keyword_category_null() {
        let env: KeywordsEnvelope = serde_json::from_str(
            r#"{"keywords": [{"keyword": "fraud", "count": 42, "category": null}]}"#,
        )
        .unwrap();
        assert_eq!(env.keywords[0].count, 42);
        assert!(env.keywords[0].category.is_none());
    }

    #[test]
    fn test_daily_domains_nested_map() {
        let env: DailyDomainsEnvelope = serde_json::from_str(
            r#"{"daily_domains": {"2025-02-24": {"abc.onion": [{"title": "Market", "status_code": 200}]}}}"#,
        )
        .unwrap();
        let day = &env.daily_domains["2025-02-24"];
        assert_eq!(day["abc.onion"][0].status_code, Some(200));
        assert!(day["abc.onion"][0].keywords.is_none());
    }
}
