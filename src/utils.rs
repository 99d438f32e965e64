use std::collections::HashMap;

use chrono::{DateTime, Local, Utc};

/// `Set-Cookie` attributes that are not cookies themselves.
const COOKIE_ATTRIBUTES: [&str; 8] = [
    "path", "expires", "max-age", "domain", "httponly", "secure", "samesite", "priority",
];

fn cookie_pairs(cookie: &str) -> Vec<(String, String)> {
    let mut pairs: Vec<(String, String)> = Vec::new();
    for fragment in cookie.split(';').map(str::trim).filter(|f| !f.is_empty()) {
        let Some((name, value)) = fragment.split_once('=') else {
            continue; // bare flags such as HttpOnly
        };
        let name = name.trim();
        if name.is_empty() || COOKIE_ATTRIBUTES.contains(&name.to_lowercase().as_str()) {
            continue;
        }
        match pairs.iter_mut().find(|(n, _)| n == name) {
            Some(existing) => existing.1 = value.trim().to_string(),
            None => pairs.push((name.to_string(), value.trim().to_string())),
        }
    }
    pairs
}

fn join_pairs(pairs: Vec<(String, String)>) -> String {
    pairs
        .into_iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect::<Vec<_>>()
        .join("; ")
}

/// Reduces raw `Set-Cookie` material to a plain `name=value; ...` cookie string.
pub fn process_cookie(raw: &str) -> String {
    join_pairs(cookie_pairs(raw))
}

/// Union by cookie name. Values from `fresh` win, names only in `old` are kept.
pub fn merge_cookie(old: &str, fresh: &str) -> String {
    let mut merged = cookie_pairs(old);
    for (name, value) in cookie_pairs(fresh) {
        match merged.iter_mut().find(|(n, _)| *n == name) {
            Some(existing) => existing.1 = value,
            None => merged.push((name, value)),
        }
    }
    join_pairs(merged)
}

pub fn cookie_to_map(cookie: &str) -> HashMap<String, String> {
    cookie_pairs(cookie).into_iter().collect()
}

pub fn is_number(input: &str) -> bool {
    !input.is_empty() && input.chars().all(|c| c.is_ascii_digit())
}

pub fn timestamp_ms() -> i64 {
    Utc::now().timestamp_millis()
}

/// Formats epoch milliseconds in local time, e.g. `2025-03-01 12:00:00`.
pub fn format_timestamp_ms(ms: i64) -> String {
    DateTime::from_timestamp_millis(ms)
        .map(|d| d.with_timezone(&Local).format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_default()
}
