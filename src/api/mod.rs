//! HTTP handlers.
//!
//! GET handlers apply view parameters, fetch when the page has never loaded
//! (or a fetch dependency changed) and render. POST handlers change state and
//! answer `303 See Other` back to the page.

mod admin;
mod analytics;
mod topics;

pub use admin::*;
pub use analytics::*;
pub use topics::*;

use axum::response::Html;
use serde::Deserialize;

use crate::errors::AppError;

/// Result of a page render.
pub type PageResult = Result<Html<String>, AppError>;

/// Form body of the single-key toggle routes.
#[derive(Debug, Deserialize)]
pub struct KeyForm {
    pub key: String,
}
