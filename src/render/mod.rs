//! HTML building blocks for the dashboard pages.
//!
//! Plain string templates: a layout with sidebar and top bar, cards, metric
//! cards, tables, bar charts and the small forms pages use for interaction.
//! Callers pass raw text; everything user- or upstream-supplied is escaped here.

use crate::daterange::{RangePreset, RangeSelector, DATE_FORMAT};

/// Sidebar entries: (path, label).
const NAV_ITEMS: &[(&str, &str)] = &[
    ("/", "Topics"),
    ("/domains", "Daily Domains"),
    ("/keywords", "Keyword Trends"),
    ("/titles", "Grouped Titles"),
    ("/sources", "Source Summary"),
    ("/trends", "Time Trends"),
    ("/admin", "Admin"),
];

const CSS: &str = r#"
body { margin: 0; font-family: system-ui, sans-serif; background: #030712; color: #f9fafb; }
.shell { display: flex; min-height: 100vh; }
.sidebar { width: 220px; background: #111827; border-right: 1px solid #1f2937; padding: 24px 12px; }
.sidebar h1 { font-size: 18px; margin: 0 0 24px 8px; }
.sidebar a { display: block; padding: 8px 12px; border-radius: 8px; color: #9ca3af; text-decoration: none; }
.sidebar a.active { background: #2563eb; color: #fff; }
main { flex: 1; padding: 24px 32px; }
.topbar { display: flex; justify-content: space-between; align-items: center; margin-bottom: 24px; gap: 16px; flex-wrap: wrap; }
.card { background: #1f2937; border: 1px solid #374151; border-radius: 16px; padding: 20px; margin-bottom: 16px; }
.grid { display: grid; grid-template-columns: repeat(auto-fill, minmax(220px, 1fr)); gap: 16px; }
.metric .value { font-size: 32px; font-weight: 700; }
.muted { color: #9ca3af; font-size: 14px; }
.error { background: #7f1d1d; color: #fecaca; border-radius: 12px; padding: 12px 16px; margin-bottom: 16px; }
.empty { color: #6b7280; text-align: center; padding: 48px 0; }
table { width: 100%; border-collapse: collapse; }
th, td { text-align: left; padding: 8px; border-bottom: 1px solid #374151; font-size: 14px; }
.bar-row { display: flex; align-items: center; gap: 8px; margin: 4px 0; font-size: 13px; }
.bar-label { width: 180px; overflow: hidden; text-overflow: ellipsis; white-space: nowrap; }
.bar { background: #3b82f6; height: 14px; border-radius: 4px; }
.tabs a { margin-right: 12px; color: #9ca3af; }
.tabs a.active { color: #fff; border-bottom: 2px solid #3b82f6; }
form.inline { display: inline-flex; gap: 8px; align-items: center; margin: 0; }
button, select, input { background: #1f2937; color: #f9fafb; border: 1px solid #374151; border-radius: 8px; padding: 6px 10px; }
button.primary { background: #2563eb; border-color: #2563eb; }
"#;

/// Escape text for HTML element and attribute content.
pub fn html_escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
    out
}

/// Whole number with `,` thousands separators.
pub fn format_count(n: u64) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

pub fn format_decimal(value: f64, places: usize) -> String {
    format!("{:.*}", places, value)
}

/// Percentage of `part` in `total`, one decimal. Zero total renders `0.0%`.
pub fn format_share(part: u64, total: u64) -> String {
    if total == 0 {
        return "0.0%".to_string();
    }
    format!("{:.1}%", part as f64 * 100.0 / total as f64)
}

/// Date part of an ISO timestamp; anything shorter is returned as is.
pub fn short_date(raw: &str) -> &str {
    match raw.get(..10) {
        Some(date) if raw.len() > 10 && raw.as_bytes()[10] == b'T' => date,
        Some(date) if raw.len() > 10 && raw.as_bytes()[10] == b' ' => date,
        _ => raw,
    }
}

/// Cut text to `max` characters, marking the cut with `…`.
pub fn truncate(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((idx, _)) => format!("{}…", &text[..idx]),
        None => text.to_string(),
    }
}

/// Full page: sidebar, top bar (title + controls), content.
pub fn layout(title: &str, active: &str, controls: &str, content: &str) -> String {
    let nav: String = NAV_ITEMS
        .iter()
        .map(|(path, label)| {
            let class = if *path == active { " class=\"active\"" } else { "" };
            format!(r#"<a href="{path}"{class}>{label}</a>"#)
        })
        .collect();
    let title = html_escape(title);
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="UTF-8">
<meta name="viewport" content="width=device-width, initial-scale=1.0">
<title>{title} - Dark Web Intelligence</title>
<style>{CSS}</style>
</head>
<body>
<div class="shell">
<nav class="sidebar"><h1>Dark Web Intelligence</h1>{nav}</nav>
<main>
<header class="topbar"><h2>{title}</h2><div>{controls}</div></header>
{content}
</main>
</div>
</body>
</html>"#
    )
}

/// Card with an optional heading; `body` is trusted HTML.
pub fn card(heading: Option<&str>, body: &str) -> String {
    match heading {
        Some(h) => format!(
            r#"<section class="card"><h3>{}</h3>{}</section>"#,
            html_escape(h),
            body
        ),
        None => format!(r#"<section class="card">{}</section>"#, body),
    }
}

pub fn metric_card(label: &str, value: &str, subtitle: Option<&str>) -> String {
    let subtitle = subtitle
        .map(|s| format!(r#"<p class="muted">{}</p>"#, html_escape(s)))
        .unwrap_or_default();
    format!(
        r#"<div class="card metric"><p class="muted">{}</p><p class="value">{}</p>{}</div>"#,
        html_escape(label),
        html_escape(value),
        subtitle
    )
}

pub fn metric_grid(cards: &[String]) -> String {
    format!(r#"<div class="grid">{}</div>"#, cards.concat())
}

pub fn empty_state(message: &str) -> String {
    format!(r#"<div class="empty">{}</div>"#, html_escape(message))
}

pub fn error_banner(message: &str) -> String {
    format!(r#"<div class="error" role="alert">{}</div>"#, html_escape(message))
}

pub fn loading_indicator() -> String {
    r#"<div class="empty">Loading…</div>"#.to_string()
}

/// Table of plain-text cells.
pub fn table(headers: &[&str], rows: &[Vec<String>]) -> String {
    let head: String = headers
        .iter()
        .map(|h| format!("<th>{}</th>", html_escape(h)))
        .collect();
    let body: String = rows
        .iter()
        .map(|row| {
            let cells: String = row
                .iter()
                .map(|c| format!("<td>{}</td>", html_escape(c)))
                .collect();
            format!("<tr>{}</tr>", cells)
        })
        .collect();
    format!(
        "<table><thead><tr>{}</tr></thead><tbody>{}</tbody></table>",
        head, body
    )
}

/// Horizontal bar chart scaled to the largest value.
pub fn bar_chart(items: &[(String, f64)]) -> String {
    let max = items.iter().map(|(_, v)| *v).fold(0.0_f64, f64::max);
    let rows: String = items
        .iter()
        .map(|(label, value)| {
            let width = if max > 0.0 { value / max * 100.0 } else { 0.0 };
            format!(
                r#"<div class="bar-row"><span class="bar-label">{}</span><div class="bar" style="width:{:.1}%"></div><span>{}</span></div>"#,
                html_escape(label),
                width,
                trim_number(*value)
            )
        })
        .collect();
    format!(r#"<div class="chart">{}</div>"#, rows)
}

fn trim_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format_decimal(value, 2)
    }
}

/// GET form with a search box. `hidden` carries the other view parameters.
pub fn search_form(action: &str, query: &str, placeholder: &str, hidden: &[(&str, String)]) -> String {
    format!(
        r#"<form class="inline" method="get" action="{}">{}<input type="text" name="q" value="{}" placeholder="{}"><button type="submit">Search</button></form>"#,
        html_escape(action),
        hidden_inputs(hidden),
        html_escape(query),
        html_escape(placeholder)
    )
}

/// GET form with a single select that submits on change.
pub fn select_form(
    action: &str,
    name: &str,
    options: &[(String, String)],
    selected: &str,
    hidden: &[(&str, String)],
) -> String {
    let opts: String = options
        .iter()
        .map(|(value, label)| {
            let sel = if value == selected { " selected" } else { "" };
            format!(
                r#"<option value="{}"{}>{}</option>"#,
                html_escape(value),
                sel,
                html_escape(label)
            )
        })
        .collect();
    format!(
        r#"<form class="inline" method="get" action="{}">{}<select name="{}" onchange="this.form.submit()">{}</select><noscript><button type="submit">Apply</button></noscript></form>"#,
        html_escape(action),
        hidden_inputs(hidden),
        html_escape(name),
        opts
    )
}

/// POST button carrying hidden fields.
pub fn post_button(action: &str, label: &str, fields: &[(&str, String)], primary: bool) -> String {
    let class = if primary { r#" class="primary""# } else { "" };
    format!(
        r#"<form class="inline" method="post" action="{}">{}<button type="submit"{}>{}</button></form>"#,
        html_escape(action),
        hidden_inputs(fields),
        class,
        html_escape(label)
    )
}

pub fn refresh_button(action: &str) -> String {
    post_button(action, "Refresh", &[], false)
}

/// CSV and JSON download links for an export route.
pub fn export_links(action: &str, params: &[(&str, String)]) -> String {
    let extra: String = params
        .iter()
        .map(|(k, v)| format!("&amp;{}={}", k, html_escape(&url_component(v))))
        .collect();
    let action = html_escape(action);
    format!(
        r#"<span class="exports"><a href="{action}?format=csv{extra}">Export CSV</a> · <a href="{action}?format=json{extra}">Export JSON</a></span>"#
    )
}

/// Range picker: preset buttons plus a custom date form.
pub fn date_range_picker(action: &str, selector: &RangeSelector, presets: &[RangePreset]) -> String {
    let current = selector.preset();
    let buttons: String = presets
        .iter()
        .map(|p| {
            post_button(
                action,
                &p.label(),
                &[("preset", p.as_param())],
                *p == current,
            )
        })
        .collect();
    let (start, end) = selector.custom_dates();
    let fmt = |d: Option<chrono::NaiveDate>| {
        d.map(|d| d.format(DATE_FORMAT).to_string())
            .unwrap_or_default()
    };
    let custom = format!(
        r#"<form class="inline" method="post" action="{}"><input type="hidden" name="preset" value="custom"><input type="date" name="start" value="{}"><span>→</span><input type="date" name="end" value="{}"><button type="submit"{}>Apply</button></form>"#,
        html_escape(action),
        fmt(start),
        fmt(end),
        if current == RangePreset::Custom { r#" class="primary""# } else { "" }
    );
    format!(
        r#"<div class="range-picker">{}{}<p class="muted">{}</p></div>"#,
        buttons,
        custom,
        html_escape(&selector.applied().describe())
    )
}

fn hidden_inputs(fields: &[(&str, String)]) -> String {
    fields
        .iter()
        .map(|(name, value)| {
            format!(
                r#"<input type="hidden" name="{}" value="{}">"#,
                html_escape(name),
                html_escape(value)
            )
        })
        .collect()
}

/// Percent-encode a query parameter value.
pub fn url_component(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for b in s.bytes() {
        match b {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                out.push(b as char)
            }
            _ => out.push_str(&format!("%{:02X}", b)),
        }
    }
    out
}
