//! In-memory list transforms: substring filter, keyed sort, expand/collapse.
//!
//! `ListView` keeps the full fetched array and recomputes the visible row order
//! from `(all, query, sort)` whenever any of them changes.

use std::cmp::Ordering;
use std::collections::BTreeSet;

use chrono::{DateTime, NaiveDate, NaiveDateTime};

/// A comparable cell value.
#[derive(Debug, Clone, PartialEq)]
pub enum SortValue<'a> {
    Number(f64),
    Date(Option<NaiveDateTime>),
    Text(&'a str),
}

impl<'a> SortValue<'a> {
    /// Date value parsed from an ISO date or timestamp string.
    pub fn date(raw: &str) -> Self {
        SortValue::Date(parse_timestamp(raw))
    }

    fn compare(&self, other: &SortValue<'_>) -> Ordering {
        match (self, other) {
            (SortValue::Number(a), SortValue::Number(b)) => a.total_cmp(b),
            // Unparseable dates sort before every real date.
            (SortValue::Date(a), SortValue::Date(b)) => a.cmp(b),
            (SortValue::Text(a), SortValue::Text(b)) => a.cmp(b),
            _ => Ordering::Equal,
        }
    }
}

fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.naive_utc());
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f") {
        return Some(dt);
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S") {
        return Some(dt);
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortDir {
    Asc,
    #[default]
    Desc,
}

impl SortDir {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "asc" => Some(SortDir::Asc),
            "desc" => Some(SortDir::Desc),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SortDir::Asc => "asc",
            SortDir::Desc => "desc",
        }
    }

    pub fn flipped(&self) -> Self {
        match self {
            SortDir::Asc => SortDir::Desc,
            SortDir::Desc => SortDir::Asc,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SortSpec<K> {
    pub key: K,
    pub dir: SortDir,
}

/// A record that can be searched on one text field and sorted by keys.
pub trait Tabular {
    type SortKey: Copy + PartialEq + std::fmt::Debug;

    /// The field the search box matches against.
    fn search_text(&self) -> &str;

    fn sort_value(&self, key: Self::SortKey) -> SortValue<'_>;
}

/// Case-insensitive substring filter. An empty query keeps every row in order.
pub fn filter_indices<T: Tabular>(rows: &[T], query: &str) -> Vec<usize> {
    let needle = query.trim().to_lowercase();
    rows.iter()
        .enumerate()
        .filter(|(_, row)| needle.is_empty() || row.search_text().to_lowercase().contains(&needle))
        .map(|(i, _)| i)
        .collect()
}

/// Stable sort of row indices by one key.
pub fn sort_indices<T: Tabular>(rows: &[T], indices: &mut [usize], spec: SortSpec<T::SortKey>) {
    indices.sort_by(|&a, &b| {
        let ord = rows[a]
            .sort_value(spec.key)
            .compare(&rows[b].sort_value(spec.key));
        match spec.dir {
            SortDir::Asc => ord,
            SortDir::Desc => ord.reverse(),
        }
    });
}

/// Full dataset plus the derived visible ordering.
#[derive(Debug, Clone)]
pub struct ListView<T: Tabular> {
    all: Vec<T>,
    visible: Vec<usize>,
    query: String,
    sort: Option<SortSpec<T::SortKey>>,
}

impl<T: Tabular> Default for ListView<T> {
    fn default() -> Self {
        Self {
            all: Vec::new(),
            visible: Vec::new(),
            query: String::new(),
            sort: None,
        }
    }
}

impl<T: Tabular> ListView<T> {
    pub fn new(sort: Option<SortSpec<T::SortKey>>) -> Self {
        Self {
            sort,
            ..Self::default()
        }
    }

    pub fn set_items(&mut self, items: Vec<T>) {
        self.all = items;
        self.recompute();
    }

    /// Returns whether the query changed.
    pub fn set_query(&mut self, query: &str) -> bool {
        if self.query == query {
            return false;
        }
        self.query = query.to_string();
        self.recompute();
        true
    }

    pub fn set_sort(&mut self, sort: Option<SortSpec<T::SortKey>>) {
        if self.sort != sort {
            self.sort = sort;
            self.recompute();
        }
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn sort(&self) -> Option<SortSpec<T::SortKey>> {
        self.sort
    }

    pub fn all(&self) -> &[T] {
        &self.all
    }

    /// Rows after filtering and sorting, in render order.
    pub fn rows(&self) -> Vec<&T> {
        self.visible.iter().map(|&i| &self.all[i]).collect()
    }

    pub fn len(&self) -> usize {
        self.visible.len()
    }

    pub fn is_empty(&self) -> bool {
        self.visible.is_empty()
    }

    fn recompute(&mut self) {
        let mut visible = filter_indices(&self.all, &self.query);
        if let Some(spec) = self.sort {
            sort_indices(&self.all, &mut visible, spec);
        }
        self.visible = visible;
    }
}

impl<T: Tabular + Clone> ListView<T> {
    /// Owned copy of the visible rows, for export.
    pub fn snapshot(&self) -> Vec<T> {
        self.rows().into_iter().cloned().collect()
    }
}

/// Whether a page lets one row or many rows be open at once.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpandPolicy {
    Single,
    Multiple,
}

/// Keys of rows currently shown expanded.
#[derive(Debug, Clone)]
pub struct ExpandableSet {
    policy: ExpandPolicy,
    keys: BTreeSet<String>,
}

impl ExpandableSet {
    pub fn new(policy: ExpandPolicy) -> Self {
        Self {
            policy,
            keys: BTreeSet::new(),
        }
    }

    pub fn single() -> Self {
        Self::new(ExpandPolicy::Single)
    }

    pub fn multiple() -> Self {
        Self::new(ExpandPolicy::Multiple)
    }

    /// Open a collapsed key or close an open one. Under `Single`, opening a key
    /// closes whichever one was open.
    pub fn toggle(&mut self, key: &str) {
        if self.keys.remove(key) {
            return;
        }
        if self.policy == ExpandPolicy::Single {
            self.keys.clear();
        }
        self.keys.insert(key.to_string());
    }

    pub fn is_expanded(&self, key: &str) -> bool {
        self.keys.contains(key)
    }

    pub fn clear(&mut self) {
        self.keys.clear();
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}
