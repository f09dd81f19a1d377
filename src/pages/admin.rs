//! Admin page: trigger backend pipeline jobs and keep a run log.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::Value;
use uuid::Uuid;

use super::{detached, Shared};
use crate::client::ApiClient;
use crate::errors::AppError;
use crate::models::{PipelineJob, RunStatus, ScriptLog};
use crate::render;

#[derive(Debug, Default, Deserialize)]
pub struct RunForm {
    #[serde(default)]
    pub job: PipelineJob,
}

#[derive(Debug, Default)]
pub struct AdminPage {
    logs: Vec<ScriptLog>,
    in_flight: Option<Uuid>,
    last_run: Option<DateTime<Utc>>,
}

impl AdminPage {
    pub fn logs(&self) -> &[ScriptLog] {
        &self.logs
    }

    pub fn is_running(&self) -> bool {
        self.in_flight.is_some()
    }

    fn push(&mut self, run_id: Uuid, job: PipelineJob, status: RunStatus, message: String) {
        self.logs.push(ScriptLog {
            run_id,
            job,
            timestamp: Utc::now(),
            status,
            message,
        });
    }

    /// Start a pipeline job and record its outcome. Only one job runs at a time.
    ///
    /// The upstream call and the log update run on their own task, so the run
    /// is recorded and the in-flight slot released even if the caller goes away.
    pub async fn run(
        page: Shared<Self>,
        client: Arc<ApiClient>,
        job: PipelineJob,
    ) -> Result<Uuid, AppError> {
        let run_id = {
            let mut p = page.write().await;
            if let Some(current) = p.in_flight {
                return Err(AppError::Validation(format!(
                    "Pipeline run {} is still in progress",
                    current
                )));
            }
            let run_id = Uuid::new_v4();
            p.in_flight = Some(run_id);
            p.push(run_id, job, RunStatus::Running, format!("Starting {}...", job.label()));
            run_id
        };
        tracing::info!(%run_id, job = job.label(), "Pipeline run started");

        let finished = detached(async move {
            let result = client.run_pipeline(job).await;
            page.write().await.finish(run_id, job, result);
        })
        .await;
        match finished {
            Some(()) => Ok(run_id),
            None => Err(AppError::Internal(format!("Pipeline run {} aborted", run_id))),
        }
    }

    fn finish(&mut self, run_id: Uuid, job: PipelineJob, result: Result<Value, AppError>) {
        self.in_flight = None;
        match result {
            Ok(payload) => {
                tracing::info!(%run_id, "Pipeline run finished");
                self.push(
                    run_id,
                    job,
                    RunStatus::Success,
                    format!("Pipeline completed successfully: {}", payload_message(&payload)),
                );
                self.last_run = Some(Utc::now());
            }
            Err(err) => {
                tracing::error!(%run_id, error = %err, "Pipeline run failed");
                self.push(
                    run_id,
                    job,
                    RunStatus::Error,
                    format!("Pipeline failed: {}", err.message()),
                );
            }
        }
    }

    pub fn clear(&mut self) {
        self.logs.clear();
    }

    pub fn render(&self) -> String {
        let status = if self.is_running() { "Running" } else { "Idle" };
        let last_run = self
            .last_run
            .map(|t| t.format("%Y-%m-%d %H:%M:%S UTC").to_string())
            .unwrap_or_else(|| "Never".to_string());

        let mut content = String::from(
            r#"<p class="muted">Manage data scraping and system operations</p>"#,
        );
        content.push_str(&render::metric_grid(&[
            render::metric_card("System Status", status, None),
            render::metric_card("Last Run", &last_run, None),
            render::metric_card("Total Logs", &self.logs.len().to_string(), None),
        ]));

        let actions = [
            render::post_button("/admin/run", "Run Pipeline Scripts", &[("job", "scripts".to_string())], true),
            render::post_button("/admin/run", "Run Analytics", &[("job", "analytics".to_string())], false),
            render::post_button("/admin/clear", "Clear Logs", &[], false),
        ]
        .concat();
        content.push_str(&render::card(Some("Pipeline Control"), &actions));

        let log_body = if self.logs.is_empty() {
            render::empty_state("No logs yet. Run a pipeline to see output.")
        } else {
            let rows: Vec<Vec<String>> = self
                .logs
                .iter()
                .rev()
                .map(|log| {
                    vec![
                        log.timestamp.format("%Y-%m-%d %H:%M:%S").to_string(),
                        log.status.as_str().to_string(),
                        log.job.label().to_string(),
                        log.message.clone(),
                        log.run_id.to_string(),
                    ]
                })
                .collect();
            render::table(&["Time", "Status", "Job", "Message", "Run"], &rows)
        };
        content.push_str(&render::card(Some("Execution Logs"), &log_body));

        render::layout("Admin Panel", "/admin", "", &content)
    }
}

/// Text for the success log line: the payload's `message` when present,
/// otherwise the compact JSON.
fn payload_message(payload: &Value) -> String {
    match payload.get("message").and_then(Value::as_str) {
        Some(msg) => msg.to_string(),
        None => payload.to_string(),
    }
}
