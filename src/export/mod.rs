//! CSV and JSON export of the currently visible rows.

use axum::{
    http::header,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::errors::AppError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    #[default]
    Csv,
    Json,
}

/// Query parameters accepted by every `/export` route.
#[derive(Debug, Deserialize)]
pub struct ExportQuery {
    #[serde(default)]
    pub format: ExportFormat,
}

/// Serialize rows as CSV: a header row of field names, then one quoted line per row.
///
/// Columns come from the first row's fields. Null or missing values are empty,
/// nested objects and arrays are inlined as JSON.
pub fn to_csv<T: Serialize>(rows: &[T]) -> Result<String, AppError> {
    let records = rows
        .iter()
        .map(serde_json::to_value)
        .collect::<Result<Vec<Value>, _>>()?;

    let Some(first) = records.first() else {
        return Ok(String::new());
    };
    let headers: Vec<String> = match first {
        Value::Object(map) => map.keys().cloned().collect(),
        _ => {
            return Err(AppError::Internal(
                "CSV export needs object rows".to_string(),
            ))
        }
    };

    let mut lines = Vec::with_capacity(records.len() + 1);
    lines.push(headers.join(","));
    for record in &records {
        let cells: Vec<String> = headers
            .iter()
            .map(|h| quote(&cell_text(record.get(h))))
            .collect();
        lines.push(cells.join(","));
    }
    Ok(lines.join("\n"))
}

fn cell_text(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(Value::Bool(b)) => b.to_string(),
        Some(Value::Number(n)) => n.to_string(),
        Some(nested) => nested.to_string(),
    }
}

fn quote(cell: &str) -> String {
    format!("\"{}\"", cell.replace('"', "\"\""))
}

/// Pretty-printed JSON array.
pub fn to_json<T: Serialize>(rows: &[T]) -> Result<String, AppError> {
    Ok(serde_json::to_string_pretty(rows)?)
}

/// A file download built in memory.
#[derive(Debug)]
pub struct Download {
    pub filename: String,
    pub content_type: &'static str,
    pub body: String,
}

impl Download {
    pub fn build<T: Serialize>(
        rows: &[T],
        basename: &str,
        format: ExportFormat,
    ) -> Result<Self, AppError> {
        tracing::info!(rows = rows.len(), basename, ?format, "Exporting view");
        match format {
            ExportFormat::Csv => Ok(Self {
                filename: format!("{}.csv", basename),
                content_type: "text/csv;charset=utf-8",
                body: to_csv(rows)?,
            }),
            ExportFormat::Json => Ok(Self {
                filename: format!("{}.json", basename),
                content_type: "application/json;charset=utf-8",
                body: to_json(rows)?,
            }),
        }
    }
}

impl IntoResponse for Download {
    fn into_response(self) -> Response {
        let disposition = format!("attachment; filename=\"{}\"", self.filename);
        (
            [
                (header::CONTENT_TYPE, self.content_type.to_string()),
                (header::CONTENT_DISPOSITION, disposition),
            ],
            self.body,
        )
            .into_response()
    }
}
