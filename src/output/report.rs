use std::collections::BTreeMap;
use std::fmt;

use crate::store::{LogEntry, Query};

/// Build a markdown report of learned queries and rejections.
///
/// Both slices are rendered in the order given; the facade hands them over
/// most recent first.
pub fn build_report(queries: &[Query], entries: &[LogEntry]) -> String {
    Report { queries, entries }.to_string()
}

struct Report<'a> {
    queries: &'a [Query],
    entries: &'a [LogEntry],
}

impl fmt::Display for Report<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "# shapeguard Firewall Report")?;
        writeln!(f)?;

        writeln!(f, "## Summary")?;
        writeln!(f)?;
        writeln!(f, "- Learned queries: {}", self.queries.len())?;
        writeln!(f, "- Rejected queries: {}", self.entries.len())?;

        let by_category = violation_counts(self.entries);
        if !by_category.is_empty() {
            writeln!(f)?;
            writeln!(f, "| Violation | Count |")?;
            writeln!(f, "|-----------|-------|")?;
            for (category, count) in &by_category {
                writeln!(f, "| {category} | {count} |")?;
            }
        }

        writeln!(f)?;
        writeln!(f, "## Learned Queries")?;
        writeln!(f)?;
        if self.queries.is_empty() {
            writeln!(f, "_No queries learned._")?;
        } else {
            writeln!(f, "| Database | User | Query |")?;
            writeln!(f, "|----------|------|-------|")?;
            for query in self.queries {
                writeln!(
                    f,
                    "| {} | {} | `{}` |",
                    cell(query.database()),
                    cell(query.database_user()),
                    cell(query.raw())
                )?;
            }
        }

        writeln!(f)?;
        writeln!(f, "## Rejections")?;
        writeln!(f)?;
        if self.entries.is_empty() {
            writeln!(f, "_No rejections._")?;
        } else {
            writeln!(f, "| Time (UTC) | Database | User | Query | Violation |")?;
            writeln!(f, "|------------|----------|------|-------|-----------|")?;
            for entry in self.entries {
                writeln!(
                    f,
                    "| {} | {} | {} | `{}` | {} |",
                    entry.timestamp().format("%Y-%m-%d %H:%M:%S"),
                    cell(entry.database()),
                    cell(entry.database_user()),
                    cell(entry.query()),
                    cell(entry.violation())
                )?;
            }
        }

        Ok(())
    }
}

/// Rejections per violation label (text before the first `:`).
fn violation_counts(entries: &[LogEntry]) -> BTreeMap<&str, usize> {
    let mut counts = BTreeMap::new();
    for entry in entries {
        let category = entry
            .violation()
            .split_once(':')
            .map_or(entry.violation(), |(label, _)| label);
        *counts.entry(category).or_insert(0) += 1;
    }
    counts
}

// Keep table rows on one line.
fn cell(text: &str) -> String {
    text.replace('|', "\\|").replace(['\n', '\r'], " ")
}
