//! Date-range selection for date-scoped dashboard series.
//!
//! A `RangeSelector` turns a preset or a pair of calendar dates into the
//! `DateRange` that dependent fetches send as `start`/`end` query parameters.

use chrono::{Days, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::errors::AppError;

/// Date format used on the wire and in form inputs.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Inclusive date bounds. Both `None` means all time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
}

impl DateRange {
    pub fn all_time() -> Self {
        Self::default()
    }

    /// Bounded range; rejects `start > end`.
    pub fn between(start: NaiveDate, end: NaiveDate) -> Result<Self, AppError> {
        if start > end {
            return Err(AppError::Validation(format!(
                "Start date {} is after end date {}",
                start.format(DATE_FORMAT),
                end.format(DATE_FORMAT)
            )));
        }
        Ok(Self {
            start: Some(start),
            end: Some(end),
        })
    }

    /// The last `days` days up to and including `today`.
    pub fn last_days(days: u32, today: NaiveDate) -> Self {
        let start = today
            .checked_sub_days(Days::new(u64::from(days)))
            .unwrap_or(NaiveDate::MIN);
        Self {
            start: Some(start),
            end: Some(today),
        }
    }

    pub fn is_all_time(&self) -> bool {
        self.start.is_none() && self.end.is_none()
    }

    /// Query parameters for this range. All time yields none at all.
    pub fn query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::new();
        if let Some(start) = self.start {
            pairs.push(("start", start.format(DATE_FORMAT).to_string()));
        }
        if let Some(end) = self.end {
            pairs.push(("end", end.format(DATE_FORMAT).to_string()));
        }
        pairs
    }

    pub fn describe(&self) -> String {
        match (self.start, self.end) {
            (None, None) => "All time".to_string(),
            (Some(s), Some(e)) => format!("{} → {}", s.format(DATE_FORMAT), e.format(DATE_FORMAT)),
            (Some(s), None) => format!("Since {}", s.format(DATE_FORMAT)),
            (None, Some(e)) => format!("Until {}", e.format(DATE_FORMAT)),
        }
    }
}

/// Named choices offered by the range picker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RangePreset {
    AllTime,
    Today,
    LastDays(u32),
    Custom,
}

impl RangePreset {
    /// Parse the picker's form value: `all`, `today`, `custom` or a day count.
    pub fn parse(raw: &str) -> Result<Self, AppError> {
        match raw.trim() {
            "all" | "" => Ok(RangePreset::AllTime),
            "today" => Ok(RangePreset::Today),
            "custom" => Ok(RangePreset::Custom),
            other => other
                .trim_end_matches('d')
                .parse::<u32>()
                .map(RangePreset::LastDays)
                .map_err(|_| AppError::Validation(format!("Unknown range preset: {}", other))),
        }
    }

    pub fn as_param(&self) -> String {
        match self {
            RangePreset::AllTime => "all".to_string(),
            RangePreset::Today => "today".to_string(),
            RangePreset::Custom => "custom".to_string(),
            RangePreset::LastDays(n) => n.to_string(),
        }
    }

    pub fn label(&self) -> String {
        match self {
            RangePreset::AllTime => "All Time".to_string(),
            RangePreset::Today => "Today".to_string(),
            RangePreset::Custom => "Custom".to_string(),
            RangePreset::LastDays(n) => format!("{}d", n),
        }
    }
}

/// Picker state: the highlighted preset, pending custom dates, and the applied range.
#[derive(Debug, Clone)]
pub struct RangeSelector {
    preset: RangePreset,
    custom_start: Option<NaiveDate>,
    custom_end: Option<NaiveDate>,
    applied: DateRange,
}

impl Default for RangeSelector {
    fn default() -> Self {
        Self {
            preset: RangePreset::AllTime,
            custom_start: None,
            custom_end: None,
            applied: DateRange::all_time(),
        }
    }
}

impl RangeSelector {
    pub fn preset(&self) -> RangePreset {
        self.preset
    }

    pub fn applied(&self) -> DateRange {
        self.applied
    }

    pub fn custom_dates(&self) -> (Option<NaiveDate>, Option<NaiveDate>) {
        (self.custom_start, self.custom_end)
    }

    /// Highlight a preset. Returns the new range when it takes effect.
    ///
    /// `Custom` only reveals the date inputs; the applied range is left unchanged
    /// until both dates are applied.
    pub fn select(&mut self, preset: RangePreset, today: NaiveDate) -> Option<DateRange> {
        self.preset = preset;
        let next = match preset {
            RangePreset::AllTime => DateRange::all_time(),
            RangePreset::Today => DateRange::last_days(0, today),
            RangePreset::LastDays(n) => DateRange::last_days(n, today),
            RangePreset::Custom => return None,
        };
        self.applied = next;
        Some(next)
    }

    /// Apply custom dates. Both must be present and ordered, otherwise the
    /// previously applied range is kept.
    pub fn apply_custom(
        &mut self,
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
    ) -> Result<Option<DateRange>, AppError> {
        self.preset = RangePreset::Custom;
        self.custom_start = start;
        self.custom_end = end;
        let (Some(start), Some(end)) = (start, end) else {
            return Ok(None);
        };
        let next = DateRange::between(start, end)?;
        self.applied = next;
        Ok(Some(next))
    }
}

/// Parse an optional `YYYY-MM-DD` form field; blank means absent.
pub fn parse_date(raw: Option<&str>) -> Result<Option<NaiveDate>, AppError> {
    match raw.map(str::trim) {
        None | Some("") => Ok(None),
        Some(s) => NaiveDate::parse_from_str(s, DATE_FORMAT)
            .map(Some)
            .map_err(|_| AppError::Validation(format!("Invalid date: {}", s))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, DATE_FORMAT).unwrap()
    }

    #[test]
    fn test_seven_day_preset() {
        let mut selector = RangeSelector::default();
        let range = selector
            .select(RangePreset::parse("7").unwrap(), day("2025-03-10"))
            .unwrap();
        assert_eq!(
            range.query_pairs(),
            vec![
                ("start", "2025-03-03".to_string()),
                ("end", "2025-03-10".to_string())
            ]
        );
    }

    #[test]
    fn test_preset_crosses_month_boundary() {
        let range = DateRange::last_days(30, day("2025-03-01"));
        assert_eq!(range.start, Some(day("2025-01-30")));
    }

    #[test]
    fn test_all_time_omits_params() {
        let mut selector = RangeSelector::default();
        selector.select(RangePreset::LastDays(7), day("2025-03-10"));
        let range = selector
            .select(RangePreset::AllTime, day("2025-03-10"))
            .unwrap();
        assert!(range.is_all_time());
        assert!(range.query_pairs().is_empty());
    }

    #[test]
    fn test_custom_without_both_dates_keeps_previous() {
        let mut selector = RangeSelector::default();
        selector.select(RangePreset::LastDays(30), day("2025-03-10"));
        let before = selector.applied();

        assert!(selector.select(RangePreset::Custom, day("2025-03-10")).is_none());
        assert_eq!(selector.applied(), before);

        let applied = selector.apply_custom(Some(day("2025-02-01")), None).unwrap();
        assert!(applied.is_none());
        assert_eq!(selector.applied(), before);
        assert_eq!(selector.preset(), RangePreset::Custom);
    }

    #[test]
    fn test_custom_applies_when_complete() {
        let mut selector = RangeSelector::default();
        let range = selector
            .apply_custom(Some(day("2025-02-01")), Some(day("2025-02-14")))
            .unwrap()
            .unwrap();
        assert_eq!(range.describe(), "2025-02-01 → 2025-02-14");
    }

    #[test]
    fn test_custom_rejects_inverted_range() {
        let mut selector = RangeSelector::default();
        let result = selector.apply_custom(Some(day("2025-02-14")), Some(day("2025-02-01")));
        assert!(result.is_err());
        assert!(selector.applied().is_all_time());
    }

    #[test]
    fn test_preset_parsing() {
        assert_eq!(RangePreset::parse("all").unwrap(), RangePreset::AllTime);
        assert_eq!(RangePreset::parse("30d").unwrap(), RangePreset::LastDays(30));
        assert_eq!(RangePreset::parse("today").unwrap(), RangePreset::Today);
        assert!(RangePreset::parse("fortnight").is_err());
    }

    #[test]
    fn test_parse_date_blank_is_none() {
        assert_eq!(parse_date(Some("  ")).unwrap(), None);
        assert_eq!(parse_date(None).unwrap(), None);
        assert_eq!(parse_date(Some("2025-02-01")).unwrap(), Some(day("2025-02-01")));
        assert!(parse_date(Some("02/01/2025")).is_err());
    }
}
