//! Plain-text rendering for the command line
//!
//! Every renderer writes to an `impl Write` so output can be captured in
//! tests.

pub mod prompt;

use std::collections::BTreeMap;
use std::io::{self, Write};

use chrono::{DateTime, Utc};
use indexmap::IndexMap;

use crate::package::types::{Category, HistoryEntry, Record};
use crate::refresh::RefreshReport;
use crate::store::TrendingSort;

/// Format `n` with comma thousands separators
pub fn group_thousands(n: u64) -> String {
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

pub fn render_update_summary(out: &mut impl Write, report: &RefreshReport) -> io::Result<()> {
    writeln!(out, "Update summary ({} refresh):", report.scope)?;
    writeln!(out, "  Updated: {}", report.updated.len())?;
    writeln!(out, "  Failed:  {}", report.failed.len())?;
    writeln!(out, "  Total:   {}", report.total())?;
    for (name, message) in &report.errors {
        writeln!(out, "  ! {}: {}", name, message)?;
    }
    Ok(())
}

/// Records grouped by category, each group sorted by display name
pub fn render_list(
    out: &mut impl Write,
    records: &IndexMap<String, Record>,
    category: Option<Category>,
) -> io::Result<()> {
    match category {
        Some(category) => writeln!(
            out,
            "Packages in '{}' category ({}):",
            category,
            records.len()
        )?,
        None => writeln!(out, "All packages ({}):", records.len())?,
    }
    if records.is_empty() {
        writeln!(out, "No packages found.")?;
        return Ok(());
    }

    let mut groups: BTreeMap<&str, Vec<&Record>> = BTreeMap::new();
    for record in records.values() {
        groups.entry(record.category.as_str()).or_default().push(record);
    }

    for (category, mut group) in groups {
        group.sort_by_key(|record| record.name.to_lowercase());
        writeln!(out)?;
        writeln!(out, "[{}]", category)?;
        for record in group {
            writeln!(
                out,
                "  {} {} ({})",
                record.name, record.latest_version, record.language
            )?;
        }
    }
    Ok(())
}

pub fn render_show(
    out: &mut impl Write,
    record: &Record,
    history: &[HistoryEntry],
) -> io::Result<()> {
    let checked = record
        .last_checked
        .map(|t| t.to_rfc3339())
        .unwrap_or_else(|| "never".to_string());

    writeln!(out, "{} {}", record.name, record.latest_version)?;
    writeln!(out, "  Category:   {}", record.category)?;
    writeln!(out, "  Language:   {}", record.language)?;
    writeln!(out, "  Released:   {}", record.release_date)?;
    writeln!(out, "  Docs:       {}", record.docs_url)?;
    if let Some(github_url) = &record.github_url {
        writeln!(out, "  Repository: {}", github_url)?;
    }
    writeln!(
        out,
        "  Downloads:  {} weekly, {} monthly",
        group_thousands(record.popularity.downloads_weekly),
        group_thousands(record.popularity.downloads_monthly)
    )?;
    writeln!(
        out,
        "  Stars:      {}",
        group_thousands(record.popularity.github_stars)
    )?;
    writeln!(
        out,
        "  Forks:      {}",
        group_thousands(record.popularity.github_forks)
    )?;
    writeln!(out, "  Checked:    {}", checked)?;

    let install = [
        &record.install.npm,
        &record.install.yarn,
        &record.install.bun,
        &record.install.pip,
    ];
    let commands: Vec<&str> = install.into_iter().flatten().map(String::as_str).collect();
    if !commands.is_empty() {
        writeln!(out, "  Install:    {}", commands.join(" | "))?;
    }

    if !history.is_empty() {
        writeln!(out, "  History:")?;
        for entry in history.iter().rev() {
            writeln!(
                out,
                "    {}  {}  {} stars  {} weekly downloads",
                entry.timestamp.format("%Y-%m-%d"),
                entry.version,
                group_thousands(entry.github_stars),
                group_thousands(entry.downloads_weekly)
            )?;
        }
    }
    Ok(())
}

pub fn render_search(
    out: &mut impl Write,
    query: &str,
    results: &IndexMap<String, Record>,
) -> io::Result<()> {
    if results.is_empty() {
        writeln!(out, "No packages found matching '{}'", query)?;
        return Ok(());
    }
    writeln!(
        out,
        "Found {} packages matching '{}':",
        results.len(),
        query
    )?;
    for (key, record) in results {
        writeln!(out, "  {} ({}) {}", record.name, key, record.latest_version)?;
    }
    Ok(())
}

pub fn render_trending(
    out: &mut impl Write,
    records: &[Record],
    sort: TrendingSort,
) -> io::Result<()> {
    if records.is_empty() {
        writeln!(out, "No package data available")?;
        return Ok(());
    }
    writeln!(out, "Top {} packages by {}:", records.len(), sort)?;
    for (i, record) in records.iter().enumerate() {
        let value = match sort {
            TrendingSort::Stars => group_thousands(record.popularity.github_stars),
            TrendingSort::Downloads => group_thousands(record.popularity.downloads_weekly),
            TrendingSort::Forks => group_thousands(record.popularity.github_forks),
            TrendingSort::Combined => format!("{:.1}", record.combined_score()),
        };
        writeln!(out, "  {:2}. {} - {} {}", i + 1, record.name, value, sort)?;
    }
    Ok(())
}

pub fn render_outdated(
    out: &mut impl Write,
    records: &IndexMap<String, Record>,
    days: i64,
    now: DateTime<Utc>,
) -> io::Result<()> {
    if records.is_empty() {
        writeln!(
            out,
            "All packages have been checked within the last {} days",
            days
        )?;
        return Ok(());
    }
    writeln!(
        out,
        "{} packages have not been checked in {}+ days:",
        records.len(),
        days
    )?;

    let mut names: Vec<(&String, &Record)> = records.iter().collect();
    names.sort_by(|a, b| a.0.cmp(b.0));
    for (key, record) in names {
        match record.last_checked {
            Some(checked) => writeln!(out, "  {} - {} days ago", key, (now - checked).num_days())?,
            None => writeln!(out, "  {} - never checked", key)?,
        }
    }
    Ok(())
}
