//! Topic selector: one card per threat category.


use std::sync::Arc;

use super::{detached, refresh, Page, Shared};
use crate::client::ApiClient;
use crate::models::TopicInfo;
use crate::render;
use crate::resource::{ErrorPolicy, Resource};

pub struct TopicSelectorPage {
    topics: Resource<Vec<TopicInfo>>,
}

impl Default for TopicSelectorPage {
    fn default() -> Self {
        Self {
            topics: Resource::new(ErrorPolicy::Retain),
        }
    }
}

impl Page for TopicSelectorPage {}

impl TopicSelectorPage {
    pub fn needs_load(&self) -> bool {
        self.topics.is_idle()
    }

    pub async fn load(page: Shared<Self>, client: Arc<ApiClient>) {
        detached(async move {
            refresh(
                &*page,
                "topics",
                |p: &mut Self| &mut p.topics,
                |_| (),
                |_| client.topics(),
            )
            .await
        })
        .await;
    }

    pub fn render(&self) -> String {
        let mut content = String::new();
        if let Some(err) = self.topics.error() {
            content.push_str(&render::error_banner(&format!(
                "Failed to load topics: {}",
                err
            )));
        }

        let topics = self.topics.data().map(Vec::as_slice).unwrap_or_default();
        if topics.is_empty() {
            if self.topics.is_loading() {
                content.push_str(&render::loading_indicator());
            } else {
                content.push_str(&render::empty_state("No topics available"));
            }
        } else {
            let cards: Vec<String> = topics.iter().map(topic_card).collect();
            content.push_str(&format!(r#"<div class="grid topics">{}</div>"#, cards.concat()));
        }

        let intro = r#"<p class="muted">Select a threat category to view analysis, visualizations, and intelligence reports</p>"#;
        render::layout(
            "Dark Web Intelligence",
            "/",
            &render::refresh_button("/refresh"),
            &format!("{}{}", intro, content),
        )
    }
}

fn topic_card(topic: &TopicInfo) -> String {
    let color = if is_hex_color(&topic.color) {
        topic.color.as_str()
    } else {
        "#3B82F6"
    };
    let latest = topic
        .last_date
        .as_deref()
        .map(|d| {
            format!(
                r#"<p class="stat">Latest Data: <strong>{}</strong></p>"#,
                render::html_escape(d)
            )
        })
        .unwrap_or_default();
    format!(
        r#"<a class="card topic-card" href="/topic/{id}" style="border-top: 4px solid {color}; display:block; color:inherit; text-decoration:none">
<h3>{label}</h3>
<p class="stat">Records: <strong class="records">{records}</strong></p>
<p class="stat">Pipeline Runs: <strong>{runs}</strong></p>
{latest}
<p style="color: {color}">View Analysis →</p>
</a>"#,
        id = render::url_component(&topic.id),
        color = color,
        label = render::html_escape(&topic.label),
        records = render::format_count(topic.total_records),
        runs = topic.total_pipeline_runs,
        latest = latest,
    )
}

fn is_hex_color(s: &str) -> bool {
    s.len() == 7 && s.starts_with('#') && s[1..].chars().all(|c| c.is_ascii_hexdigit())
}
