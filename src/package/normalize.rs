//! Normalization of values reported by registries

use std::sync::LazyLock;

use chrono::{DateTime, NaiveDate};
use regex::Regex;

static SEMVER_PREFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d+\.\d+\.\d+").expect("valid semver prefix pattern"));

/// Normalize a registry version into `major.minor.patch` form.
///
/// A single leading `v` is stripped. Versions that already start with three
/// numeric components are returned unchanged (pre-release suffixes are kept);
/// anything else is padded with `0` components and cut to three.
///
/// Examples:
/// - "v1.2" -> "1.2.0"
/// - "3" -> "3.0.0"
/// - "2.0.0-beta" -> "2.0.0-beta"
pub fn normalize_version(version: &str) -> String {
    let version = version.trim();
    let version = version.strip_prefix('v').unwrap_or(version);

    if SEMVER_PREFIX.is_match(version) {
        return version.to_string();
    }

    let mut parts: Vec<&str> = version.split('.').collect();
    while parts.len() < 3 {
        parts.push("0");
    }
    parts[..3].join(".")
}

/// Format a registry timestamp as `YYYY-MM-DD`, falling back to `today`
/// when it is absent or not RFC 3339.
pub fn normalize_release_date(released_at: Option<&str>, today: NaiveDate) -> String {
    released_at
        .and_then(|raw| DateTime::parse_from_rfc3339(raw.trim()).ok())
        .map(|parsed| parsed.date_naive())
        .unwrap_or(today)
        .format("%Y-%m-%d")
        .to_string()
}

/// Title-case a config key for display ("next.js" -> "Next.Js")
pub fn display_name(key: &str) -> String {
    let mut result = String::with_capacity(key.len());
    let mut previous_is_letter = false;
    for c in key.chars() {
        if c.is_alphabetic() {
            if previous_is_letter {
                result.extend(c.to_lowercase());
            } else {
                result.extend(c.to_uppercase());
            }
            previous_is_letter = true;
        } else {
            result.push(c);
            previous_is_letter = false;
        }
    }
    result
}
