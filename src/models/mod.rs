//! Data models for the threat dashboard.
//!
//! These mirror the upstream JSON envelopes. Optional fields default at the
//! deserialization boundary; a missing envelope key fails the parse.

mod analytics;
mod dashboard;
mod pipeline;

pub use analytics::*;
pub use dashboard::*;
pub use pipeline::*;
