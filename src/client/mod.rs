//! HTTP client for the upstream analytics API.
//!
//! One method per endpoint. Each call issues a single request (no retry, no
//! caching), checks the status, and unwraps the named envelope field into a
//! typed payload.

use reqwest::Client;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::config::Config;
use crate::daterange::DateRange;
use crate::errors::AppError;
use crate::models::{
    ActorReport, DailyDomains, DailyDomainsEnvelope, EvolutionReport, KeywordCount, KeywordData,
    KeywordsEnvelope, MirrorReport, OverviewEnvelope, OverviewSummary, PipelineJob,
    RepeatedTitlesEnvelope, SentimentReport, SiteEvolution, SiteEvolutionEnvelope, SourceData,
    SourcesEnvelope, TitleData, TitleGroupsReport, TopicInfo, TopicKeywordsEnvelope,
    TopicsEnvelope, TrendPoint, TrendsEnvelope,
};

type Query = Vec<(&'static str, String)>;

/// Client for the analytics backend.
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: Client,
    base_url: String,
}

impl ApiClient {
    pub fn new(config: &Config) -> Result<Self, AppError> {
        let mut builder = Client::builder();
        if let Some(timeout) = config.request_timeout {
            builder = builder.timeout(timeout);
        }
        let http = builder
            .build()
            .map_err(|e| AppError::Config(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self {
            http,
            base_url: config.api_base_url.clone(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// GET `path` and decode the body as envelope `E`.
    async fn get_envelope<E: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&'static str, String)],
    ) -> Result<E, AppError> {
        tracing::debug!(path, ?query, "Fetching");
        let resp = self.http.get(self.url(path)).query(query).send().await?;
        let status = resp.status();
        if !status.is_success() {
            tracing::warn!(path, status = status.as_u16(), "Upstream returned error status");
            return Err(AppError::UpstreamStatus {
                status: status.as_u16(),
                endpoint: path.to_string(),
            });
        }
        let body: Value = resp.json().await?;
        decode_envelope(path, body)
    }

    // Topics

    pub async fn topics(&self) -> Result<Vec<TopicInfo>, AppError> {
        let env: TopicsEnvelope = self.get_envelope("/dashboard/topics", &[]).await?;
        Ok(env.topics)
    }

    pub async fn topic_overview(
        &self,
        topic: &str,
        range: DateRange,
    ) -> Result<OverviewSummary, AppError> {
        let env: OverviewEnvelope = self
            .get_envelope(&topic_path(topic, "overview")?, &range.query_pairs())
            .await?;
        Ok(env.summary)
    }

    pub async fn topic_keywords(
        &self,
        topic: &str,
        range: DateRange,
        limit: u32,
    ) -> Result<Vec<KeywordCount>, AppError> {
        let mut query: Query = range.query_pairs();
        query.push(("limit", limit.to_string()));
        let env: TopicKeywordsEnvelope = self
            .get_envelope(&topic_path(topic, "keywords")?, &query)
            .await?;
        Ok(env.keywords)
    }

    pub async fn topic_sentiment(
        &self,
        topic: &str,
        range: DateRange,
    ) -> Result<SentimentReport, AppError> {
        self.get_envelope(&topic_path(topic, "sentiment")?, &range.query_pairs())
            .await
    }

    pub async fn topic_trends(
        &self,
        topic: &str,
        range: DateRange,
    ) -> Result<Vec<TrendPoint>, AppError> {
        let env: TrendsEnvelope = self
            .get_envelope(&topic_path(topic, "trends")?, &range.query_pairs())
            .await?;
        Ok(env.trends)
    }

    pub async fn topic_groups(
        &self,
        topic: &str,
        range: DateRange,
    ) -> Result<TitleGroupsReport, AppError> {
        self.get_envelope(&topic_path(topic, "groups")?, &range.query_pairs())
            .await
    }

    pub async fn topic_mirrors(
        &self,
        topic: &str,
        range: DateRange,
    ) -> Result<MirrorReport, AppError> {
        self.get_envelope(&topic_path(topic, "mirrors")?, &range.query_pairs())
            .await
    }

    pub async fn topic_actors(
        &self,
        topic: &str,
        range: DateRange,
    ) -> Result<ActorReport, AppError> {
        self.get_envelope(&topic_path(topic, "actors")?, &range.query_pairs())
            .await
    }

    pub async fn topic_evolution(
        &self,
        topic: &str,
        range: DateRange,
    ) -> Result<EvolutionReport, AppError> {
        self.get_envelope(&topic_path(topic, "evolution")?, &range.query_pairs())
            .await
    }

    // Global analytics

    pub async fn daily_domains(&self) -> Result<DailyDomains, AppError> {
        let env: DailyDomainsEnvelope = self
            .get_envelope("/analytics/daily-domains", &[])
            .await?;
        Ok(env.daily_domains)
    }

    pub async fn repeated_titles(&self) -> Result<Vec<TitleData>, AppError> {
        let env: RepeatedTitlesEnvelope = self
            .get_envelope("/analytics/repeated-domains", &[])
            .await?;
        Ok(env.into_titles())
    }

    pub async fn keywords(&self, limit: u32) -> Result<Vec<KeywordData>, AppError> {
        let env: KeywordsEnvelope = self
            .get_envelope("/analytics/keywords", &[("limit", limit.to_string())])
            .await?;
        Ok(env.keywords)
    }

    pub async fn source_summary(&self) -> Result<Vec<SourceData>, AppError> {
        let env: SourcesEnvelope = self
            .get_envelope("/analytics/source-summary", &[])
            .await?;
        Ok(env.sources)
    }

    pub async fn time_trends(&self, days: u32) -> Result<Vec<TrendPoint>, AppError> {
        let env: TrendsEnvelope = self
            .get_envelope("/analytics/time-trends", &[("days", days.to_string())])
            .await?;
        Ok(env.trends)
    }

    pub async fn site_evolution(&self) -> Result<Vec<SiteEvolution>, AppError> {
        let env: SiteEvolutionEnvelope = self
            .get_envelope("/analytics/site-evolution", &[])
            .await?;
        Ok(env.site_evolutions)
    }

    // Pipeline

    /// POST a pipeline trigger. The backend answers with a free-form status payload.
    pub async fn run_pipeline(&self, job: PipelineJob) -> Result<Value, AppError> {
        let path = job.path();
        tracing::info!(path, "Triggering pipeline job");
        let resp = self.http.post(self.url(path)).send().await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(AppError::UpstreamStatus {
                status: status.as_u16(),
                endpoint: path.to_string(),
            });
        }
        Ok(resp.json().await?)
    }
}

/// Decode an envelope, preferring the backend's own `{"error": ...}` message
/// when the expected shape is missing.
fn decode_envelope<E: DeserializeOwned>(path: &str, body: Value) -> Result<E, AppError> {
    let upstream_error = body
        .get("error")
        .and_then(Value::as_str)
        .map(str::to_string);
    serde_json::from_value(body).map_err(|e| {
        let message = match upstream_error {
            Some(msg) => format!("{} failed: {}", path, msg),
            None => format!("Unexpected response from {}: {}", path, e),
        };
        tracing::warn!(path, %message, "Malformed upstream payload");
        AppError::Malformed(message)
    })
}

/// Topic ids are plain slugs such as `drugs` or `credit_card`.
pub fn validate_topic_id(topic: &str) -> Result<(), AppError> {
    let valid = !topic.is_empty()
        && topic
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
    if valid {
        Ok(())
    } else {
        Err(AppError::Validation(format!("Invalid topic id: {}", topic)))
    }
}

fn topic_path(topic: &str, series: &str) -> Result<String, AppError> {
    validate_topic_id(topic)?;
    Ok(format!("/dashboard/topic/{}/{}", topic, series))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_topic_path() {
        assert_eq!(
            topic_path("credit_card", "mirrors").unwrap(),
            "/dashboard/topic/credit_card/mirrors"
        );
        assert!(topic_path("../admin", "overview").is_err());
        assert!(topic_path("", "overview").is_err());
    }

    #[test]
    fn test_decode_envelope_prefers_upstream_error() {
        let err = decode_envelope::<KeywordsEnvelope>(
            "/analytics/keywords",
            json!({"error": "mongo unavailable"}),
        )
        .unwrap_err();
        assert_eq!(
            err.message(),
            "/analytics/keywords failed: mongo unavailable"
        );
    }

    #[test]
    fn test_decode_envelope_missing_key() {
        let err = decode_envelope::<SourcesEnvelope>("/analytics/source-summary", json!({}))
            .unwrap_err();
        assert!(matches!(err, AppError::Malformed(_)));
    }

    #[test]
    fn test_decode_envelope_ok() {
        let env: TopicsEnvelope = decode_envelope(
            "/dashboard/topics",
            json!({"topics": [{"id": "drugs", "label": "Drugs", "total_records": 120}]}),
        )
        .unwrap();
        assert_eq!(env.topics.len(), 1);
    }
}
