//! Integration tests for the dashboard against a mock analytics API.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::{
    extract::State,
    http::{StatusCode, Uri},
    response::{IntoResponse, Response},
    Json, Router,
};
use chrono::{Days, Utc};
use reqwest::Client;
use serde_json::{json, Value};

use crate::client::ApiClient;
use crate::config::Config;
use crate::pages::PageStore;
use crate::{create_router, AppState};

/// Canned upstream that records every request it serves.
#[derive(Default)]
struct MockUpstream {
    requests: Mutex<Vec<String>>,
    failing: Mutex<HashSet<String>>,
    slow: Mutex<HashMap<String, Duration>>,
}

impl MockUpstream {
    fn fail(&self, path: &str) {
        self.failing.lock().unwrap().insert(path.to_string());
    }

    fn delay(&self, path: &str, by: Duration) {
        self.slow.lock().unwrap().insert(path.to_string(), by);
    }

    fn hits(&self, path: &str) -> usize {
        self.requests().iter().filter(|r| r.starts_with(path)).count()
    }

    fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }

    fn requested(&self, target: &str) -> bool {
        self.requests().iter().any(|r| r == target)
    }
}

fn canned(path: &str) -> Option<Value> {
    let body = match path {
        "/dashboard/topics" => json!({"topics": [{
            "id": "drugs", "label": "Drugs", "icon": "pill", "color": "#8B5CF6",
            "total_records": 120, "total_pipeline_runs": 3,
            "first_date": "2025-02-20", "last_date": "2025-02-26"
        }]}),
        "/dashboard/topic/drugs/overview" => json!({"summary": {
            "total_records": 15230, "unique_domains": 48, "total_groups": 2,
            "mirror_clusters": 0, "avg_sentiment": -0.125,
            "data_start": "2025-02-20", "data_end": "2025-02-26", "total_days": 7
        }}),
        "/dashboard/topic/drugs/keywords" => json!({"keywords": [{"keyword": "mdma", "count": 12}]}),
        "/dashboard/topic/drugs/sentiment" => json!({
            "distribution": {"positive": 1, "neutral": 2, "negative": 3},
            "timeline": [], "total": 6
        }),
        "/dashboard/topic/drugs/trends" => json!({"trends": [
            {"date": "2025-02-26", "urls": 5, "keywords": 9, "sources": 2, "titles": 4}
        ]}),
        "/dashboard/topic/drugs/groups" => json!({"groups": [
            {"title": "Pharma Shop", "urls": ["http://pharma.onion/a"], "url_count": 1,
             "domain_count": 1, "domains": ["pharma.onion"]},
            {"title": "Dread Forum", "urls": ["http://dread.onion/"], "url_count": 1,
             "domain_count": 1, "domains": ["dread.onion"]}
        ], "total": 2}),
        "/dashboard/topic/drugs/mirrors" => json!({"clusters": [], "summary": {}}),
        "/dashboard/topic/drugs/actors" => json!({
            "totals": {}, "btc_wallets": [], "emails": [], "pgp_keys": []
        }),
        "/dashboard/topic/drugs/evolution" => json!({
            "title_groups": [], "available_dates": [], "total_urls": 0
        }),
        "/analytics/keywords" => json!({"keywords": [
            {"keyword": "fraud", "count": 42, "category": null},
            {"keyword": "bitcoin", "count": 30, "category": "finance"},
            {"keyword": "Fraud kit", "count": 5, "category": "fraud"}
        ]}),
        "/analytics/repeated-domains" => json!([
            {"title": "Alpha Market", "total_appearances": 4, "unique_days": 2,
             "first_seen": "2025-02-01", "last_seen": "2025-02-03", "avg_sentiment": 0.2}
        ]),
        "/analytics/daily-domains" => json!({"daily_domains": {
            "2025-02-25": {"old.onion": [{"title": "Old"}]},
            "2025-02-26": {"market.onion": [{"title": "Market", "status_code": 200}]}
        }}),
        "/analytics/source-summary" => json!({"sources": [
            {"source": "ahmia", "total_entries": 10, "unique_titles": 9, "trend": "up"},
            {"source": "torch", "total_entries": 30, "unique_titles": 2, "trend": "down"}
        ]}),
        "/analytics/time-trends" => json!({"trends": [
            {"date": "2025-02-25", "urls": 10}, {"date": "2025-02-26", "urls": 20}
        ]}),
        "/analytics/site-evolution" => json!({"site_evolutions": []}),
        "/pipeline/run-scripts" => json!({"status": "ok", "message": "scripts finished"}),
        "/pipeline/run-analytics" => json!({"status": "ok"}),
        _ => return None,
    };
    Some(body)
}

async fn mock_handler(State(mock): State<Arc<MockUpstream>>, uri: Uri) -> Response {
    let path = uri.path().to_string();
    let target = uri
        .path_and_query()
        .map(|pq| pq.to_string())
        .unwrap_or_else(|| path.clone());
    mock.requests.lock().unwrap().push(target);

    let delay = mock.slow.lock().unwrap().get(&path).copied();
    if let Some(delay) = delay {
        tokio::time::sleep(delay).await;
    }

    if mock.failing.lock().unwrap().contains(&path) {
        return (StatusCode::INTERNAL_SERVER_ERROR, "upstream exploded").into_response();
    }
    match canned(&path) {
        Some(body) => Json(body).into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

async fn serve(app: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind");
    let addr = listener.local_addr().expect("Failed to get addr");
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}", addr)
}

/// Test fixture: mock upstream plus a dashboard pointed at it.
struct TestFixture {
    client: Client,
    base_url: String,
    upstream: Arc<MockUpstream>,
}

impl TestFixture {
    async fn new() -> Self {
        Self::with_psk(None).await
    }

    async fn with_psk(psk: Option<String>) -> Self {
        let upstream = Arc::new(MockUpstream::default());
        let upstream_url = serve(
            Router::new()
                .fallback(mock_handler)
                .with_state(upstream.clone()),
        )
        .await;

        let config = Config {
            api_base_url: upstream_url,
            bind_addr: "127.0.0.1:0".parse().unwrap(),
            log_level: "warn".to_string(),
            admin_psk: psk.clone(),
            request_timeout: None,
        };
        let state = AppState {
            client: Arc::new(ApiClient::new(&config).unwrap()),
            pages: Arc::new(PageStore::new()),
            config: Arc::new(config),
        };
        let base_url = serve(create_router(state)).await;

        // Wait for both servers to start
        tokio::time::sleep(tokio::time::Duration::from_millis(100)).await;

        let mut client_builder = Client::builder();
        if let Some(key) = psk {
            let mut headers = reqwest::header::HeaderMap::new();
            headers.insert("x-api-key", key.parse().unwrap());
            client_builder = client_builder.default_headers(headers);
        }

        TestFixture {
            client: client_builder.build().unwrap(),
            base_url,
            upstream,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn page(&self, path: &str) -> String {
        let resp = self.client.get(self.url(path)).send().await.unwrap();
        assert_eq!(resp.status(), 200, "GET {}", path);
        resp.text().await.unwrap()
    }

    /// Client that gives up on the dashboard after `timeout`.
    fn impatient_client(&self, timeout: Duration) -> Client {
        Client::builder().timeout(timeout).build().unwrap()
    }

    async fn post_form(&self, path: &str, form: &[(&str, &str)]) -> reqwest::Response {
        self.client
            .post(self.url(path))
            .form(form)
            .send()
            .await
            .unwrap()
    }
}

#[tokio::test]
async fn test_health_check() {
    let fixture = TestFixture::new().await;

    let resp = fixture
        .client
        .get(fixture.url("/health"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    assert_eq!(resp.text().await.unwrap(), "OK");
}

#[tokio::test]
async fn test_topic_selector_renders_one_card() {
    let fixture = TestFixture::new().await;

    let html = fixture.page("/").await;
    assert_eq!(html.matches(r#"class="card topic-card""#).count(), 1);
    assert!(html.contains(r#"<strong class="records">120</strong>"#));
    assert!(html.contains(r#"href="/topic/drugs""#));

    // A second visit renders from memory
    fixture.page("/").await;
    let fetches = fixture
        .upstream
        .requests()
        .iter()
        .filter(|r| r.as_str() == "/dashboard/topics")
        .count();
    assert_eq!(fetches, 1);
}

#[tokio::test]
async fn test_keyword_search_and_limit() {
    let fixture = TestFixture::new().await;

    let html = fixture.page("/keywords?q=fra").await;
    assert!(fixture.upstream.requested("/analytics/keywords?limit=20"));
    assert!(html.contains(r#"<p class="value count">42</p>"#));
    assert!(html.contains("Fraud kit"));
    assert!(!html.contains("bitcoin"));

    fixture.page("/keywords?limit=50").await;
    assert!(fixture.upstream.requested("/analytics/keywords?limit=50"));

    let resp = fixture
        .client
        .get(fixture.url("/keywords?limit=7"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn test_keyword_export_csv() {
    let fixture = TestFixture::new().await;

    let resp = fixture
        .client
        .get(fixture.url("/keywords/export?format=csv&q=fra"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    assert_eq!(
        resp.headers()["content-disposition"],
        r#"attachment; filename="keywords.csv""#
    );
    assert!(resp.headers()["content-type"]
        .to_str()
        .unwrap()
        .starts_with("text/csv"));

    let body = resp.text().await.unwrap();
    let lines: Vec<&str> = body.lines().collect();
    assert_eq!(lines[0], "keyword,count,category");
    assert_eq!(lines[1], r#""fraud","42","""#);
    assert_eq!(lines[2], r#""Fraud kit","5","fraud""#);
    assert_eq!(lines.len(), 3);
}

#[tokio::test]
async fn test_grouped_titles_error_clears_list() {
    let fixture = TestFixture::new().await;

    let html = fixture.page("/titles").await;
    assert!(html.contains("Alpha Market"));

    fixture.upstream.fail("/analytics/repeated-domains");
    let resp = fixture.post_form("/titles/refresh", &[]).await;
    assert_eq!(resp.status(), 200);
    let html = resp.text().await.unwrap();
    assert!(html.contains("/analytics/repeated-domains returned HTTP 500"));
    assert!(html.contains("No repeated titles found"));
    assert!(!html.contains("Alpha Market"));
}

#[tokio::test]
async fn test_topic_dashboard_all_time_omits_dates() {
    let fixture = TestFixture::new().await;

    let html = fixture.page("/topic/drugs").await;
    assert!(html.contains("Drugs &amp; Forums Analysis"));
    assert!(html.contains("15,230"));

    for series in ["overview", "sentiment", "trends", "groups", "mirrors", "actors", "evolution"] {
        let target = format!("/dashboard/topic/drugs/{}", series);
        assert!(fixture.upstream.requested(&target), "missing {}", target);
    }
    assert!(fixture
        .upstream
        .requested("/dashboard/topic/drugs/keywords?limit=25"));
    assert!(!fixture
        .upstream
        .requests()
        .iter()
        .any(|r| r.contains("start=") || r.contains("end=")));
}

#[tokio::test]
async fn test_topic_dashboard_preset_refetches_with_range() {
    let fixture = TestFixture::new().await;
    fixture.page("/topic/drugs").await;

    let resp = fixture.post_form("/topic/drugs/range", &[("preset", "7")]).await;
    assert_eq!(resp.status(), 200);

    let today = Utc::now().date_naive();
    let start = today.checked_sub_days(Days::new(7)).unwrap();
    let expected = format!(
        "/dashboard/topic/drugs/trends?start={}&end={}",
        start.format("%Y-%m-%d"),
        today.format("%Y-%m-%d")
    );
    assert!(fixture.upstream.requested(&expected), "missing {}", expected);

    // Back to all time: the newest requests carry no dates
    let before = fixture.upstream.requests().len();
    fixture.post_form("/topic/drugs/range", &[("preset", "all")]).await;
    let requests = fixture.upstream.requests();
    assert_eq!(requests.len() - before, 8);
    assert!(requests[before..].iter().all(|r| !r.contains("start=")));
}

#[tokio::test]
async fn test_topic_dashboard_inverted_custom_range_kept() {
    let fixture = TestFixture::new().await;
    fixture.page("/topic/drugs").await;
    let before = fixture.upstream.requests().len();

    let resp = fixture
        .post_form(
            "/topic/drugs/range",
            &[("preset", "custom"), ("start", "2025-02-20"), ("end", "2025-02-10")],
        )
        .await;
    assert_eq!(resp.status(), 200);
    let html = resp.text().await.unwrap();
    assert!(html.contains("Start date 2025-02-20 is after end date 2025-02-10"));
    assert_eq!(fixture.upstream.requests().len(), before);
}

#[tokio::test]
async fn test_topic_groups_search_and_export() {
    let fixture = TestFixture::new().await;

    let html = fixture.page("/topic/drugs?tab=groups&q=pharma").await;
    assert!(html.contains("Pharma Shop"));
    assert!(!html.contains("Dread Forum"));

    let resp = fixture
        .post_form("/topic/drugs/toggle", &[("target", "group"), ("key", "Pharma Shop")])
        .await;
    let html = resp.text().await.unwrap();
    assert!(html.contains("http://pharma.onion/a"));

    let resp = fixture
        .client
        .get(fixture.url("/topic/drugs/export?format=json&q=pharma"))
        .send()
        .await
        .unwrap();
    assert_eq!(
        resp.headers()["content-disposition"],
        r#"attachment; filename="drugs_title_groups.json""#
    );
    let rows: Value = resp.json().await.unwrap();
    assert_eq!(rows.as_array().unwrap().len(), 1);
    assert_eq!(rows[0]["title"], "Pharma Shop");
}

#[tokio::test]
async fn test_invalid_topic_id_rejected() {
    let fixture = TestFixture::new().await;

    let resp = fixture
        .client
        .get(fixture.url("/topic/bad$id"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["success"], false);
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn test_daily_domains_latest_date_first() {
    let fixture = TestFixture::new().await;

    let html = fixture.page("/domains").await;
    assert!(html.contains("market.onion"));
    assert!(!html.contains("old.onion"));

    let html = fixture.page("/domains?date=2025-02-25").await;
    assert!(html.contains("old.onion"));
}

#[tokio::test]
async fn test_sources_and_trends_render() {
    let fixture = TestFixture::new().await;

    let html = fixture.page("/sources?sort=titles&dir=desc").await;
    let ahmia = html.find("<td>ahmia</td>").unwrap();
    let torch = html.find("<td>torch</td>").unwrap();
    assert!(ahmia < torch);

    fixture.page("/trends").await;
    assert!(fixture.upstream.requested("/analytics/time-trends?days=14"));
    assert!(fixture.upstream.requested("/analytics/site-evolution"));
    let html = fixture.page("/trends?days=30").await;
    assert!(fixture.upstream.requested("/analytics/time-trends?days=30"));
    assert!(html.contains("Total URLs"));
}

#[tokio::test]
async fn test_admin_requires_psk() {
    let fixture = TestFixture::with_psk(Some("admin-key".to_string())).await;

    // Reading the log is open
    fixture.page("/admin").await;

    let anonymous = Client::new();
    let resp = anonymous
        .post(fixture.url("/admin/run"))
        .form(&[("job", "scripts")])
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 401);
    assert!(resp.headers().contains_key("www-authenticate"));
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"]["code"], "UNAUTHORIZED");
    assert!(!fixture.upstream.requested("/pipeline/run-scripts"));

    let resp = anonymous
        .post(fixture.url("/admin/run"))
        .header("x-api-key", "wrong-key")
        .form(&[("job", "scripts")])
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 401);
}

#[tokio::test]
async fn test_admin_run_pipeline() {
    let fixture = TestFixture::with_psk(Some("admin-key".to_string())).await;

    let resp = fixture.post_form("/admin/run", &[("job", "scripts")]).await;
    assert_eq!(resp.status(), 200);
    let html = resp.text().await.unwrap();
    assert!(fixture.upstream.requested("/pipeline/run-scripts"));
    assert!(html.contains("Pipeline completed successfully: scripts finished"));
    assert!(html.contains("Starting pipeline scripts..."));

    fixture.upstream.fail("/pipeline/run-analytics");
    let html = fixture
        .post_form("/admin/run", &[("job", "analytics")])
        .await
        .text()
        .await
        .unwrap();
    assert!(html.contains("Pipeline failed: /pipeline/run-analytics returned HTTP 500"));

    let html = fixture.post_form("/admin/clear", &[]).await.text().await.unwrap();
    assert!(html.contains("No logs yet"));
}

#[tokio::test]
async fn test_abandoned_page_fetch_still_lands() {
    let fixture = TestFixture::new().await;
    fixture
        .upstream
        .delay("/analytics/repeated-domains", Duration::from_millis(600));

    let abandoned = fixture
        .impatient_client(Duration::from_millis(150))
        .get(fixture.url("/titles"))
        .send()
        .await;
    assert!(abandoned.is_err());

    tokio::time::sleep(Duration::from_millis(900)).await;
    let html = fixture.page("/titles").await;
    assert!(html.contains("Alpha Market"));
    assert!(!html.contains("Loading"));
    assert_eq!(fixture.upstream.hits("/analytics/repeated-domains"), 1);
}

#[tokio::test]
async fn test_abandoned_pipeline_run_releases_slot() {
    let fixture = TestFixture::new().await;
    fixture
        .upstream
        .delay("/pipeline/run-scripts", Duration::from_millis(600));

    let abandoned = fixture
        .impatient_client(Duration::from_millis(150))
        .post(fixture.url("/admin/run"))
        .form(&[("job", "scripts")])
        .send()
        .await;
    assert!(abandoned.is_err());

    tokio::time::sleep(Duration::from_millis(900)).await;
    let html = fixture.page("/admin").await;
    assert!(html.contains("Pipeline completed successfully: scripts finished"));
    assert!(!html.contains("Running"));

    let resp = fixture.post_form("/admin/run", &[("job", "scripts")]).await;
    assert_eq!(resp.status(), 200);
    let html = resp.text().await.unwrap();
    assert_eq!(
        html.matches("Pipeline completed successfully: scripts finished").count(),
        2
    );
    assert_eq!(fixture.upstream.hits("/pipeline/run-scripts"), 2);
}

#[tokio::test]
async fn test_domains_date_after_failed_load_shows_banner() {
    let fixture = TestFixture::new().await;
    fixture.upstream.fail("/analytics/daily-domains");

    let html = fixture.page("/domains?date=2025-02-25").await;
    assert!(html.contains("/analytics/daily-domains returned HTTP 500"));
    assert!(html.contains("No domain data available"));
}
