//! Plain-text rendering of the client views for the terminal

use crate::aggregate::{legend, slices, ChartSet};
use crate::upload::{UploadPhase, UploadView};
use chrono::{DateTime, Utc};
use lca_common::{ChartBucket, Clause, Notification};
use std::fmt::Write as _;

const BAR_WIDTH: usize = 30;

/// Full upload screen: status, totals, charts, missing clauses, messages
pub fn render_upload_view(view: &UploadView) -> String {
    let mut out = String::new();

    if let Some(name) = &view.file_name {
        let _ = writeln!(out, "File: {}", name);
    }
    let status = match view.phase {
        UploadPhase::Idle => "idle",
        UploadPhase::Submitting => "analyzing...",
        UploadPhase::Succeeded => "done",
        UploadPhase::Failed => "failed",
    };
    let _ = writeln!(out, "Status: {}", status);

    if let Some(error) = &view.error {
        let _ = writeln!(out, "Error: {}", error);
    }
    if let Some(total) = &view.total_clauses {
        let _ = writeln!(out, "Total clauses: {}", total);
    }

    let charts = ChartSet::from_results(&view.results);
    if !charts.is_empty() {
        out.push('\n');
        out.push_str(&render_chart("Clause types", &charts.clause_types));
        out.push('\n');
        out.push_str(&render_chart("Risk levels", &charts.risk_levels));
    }

    if !view.results.is_empty() {
        let _ = writeln!(out, "\nClauses:");
        for (i, clause) in view.results.iter().enumerate() {
            let _ = writeln!(out, "  {}", render_clause(i, clause));
        }
    }

    if !view.missing_clauses.is_empty() {
        let _ = writeln!(out, "\nMissing clauses:");
        for (i, missing) in view.missing_clauses.iter().enumerate() {
            let _ = writeln!(out, "  - {}", missing.render(i));
        }
    }

    if let Some(message) = &view.amended_message {
        let _ = writeln!(out, "\n{}", message);
    }

    if !view.notifications.is_empty() {
        out.push('\n');
        out.push_str(&render_notifications(&view.notifications));
    }

    out
}

/// Horizontal bar chart followed by its legend
pub fn render_chart(title: &str, buckets: &[ChartBucket]) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{}:", title);

    let width = buckets
        .iter()
        .map(|b| b.name.chars().count())
        .max()
        .unwrap_or(0);
    for slice in slices(buckets) {
        let bar = "#".repeat(((slice.share * BAR_WIDTH as f64).round() as usize).max(1));
        let _ = writeln!(
            out,
            "  {:<width$}  {:<bar_width$} {:>3} ({:.0}%)",
            slice.bucket.name,
            bar,
            slice.bucket.value,
            slice.share * 100.0,
            width = width,
            bar_width = BAR_WIDTH,
        );
    }

    let entries: Vec<String> = legend(buckets)
        .iter()
        .map(|e| format!("{} {}", e.color, e.bucket.name))
        .collect();
    if !entries.is_empty() {
        let _ = writeln!(out, "  Legend: {}", entries.join(", "));
    }
    out
}

/// One line per clause: index, type, risk, and the start of its text
pub fn render_clause(index: usize, clause: &Clause) -> String {
    let text: String = clause.text().unwrap_or("").chars().take(60).collect();
    format!(
        "{:>3}. [{} / {}] {}",
        index + 1,
        clause.predicted_type().unwrap_or("-"),
        clause.risk_level().unwrap_or("-"),
        text
    )
}

/// Numbered notification list (indices are the ones `dismiss` takes)
pub fn render_notifications(list: &[Notification]) -> String {
    if list.is_empty() {
        return "No notifications.\n".to_string();
    }

    let mut out = String::from("Notifications:\n");
    for (i, notification) in list.iter().enumerate() {
        let when = notification
            .issued_at()
            .map(format_issued_at)
            .unwrap_or_default();
        let _ = writeln!(out, "  [{}] {} {}", i, notification.display_text(), when);
    }
    out
}

/// Notification time as shown in lists (UTC)
pub fn format_issued_at(at: DateTime<Utc>) -> String {
    at.format("%Y-%m-%d %H:%M:%S").to_string()
}
