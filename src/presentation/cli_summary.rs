use crate::application::status::StatusReport;
use crate::domain::change_event::{ChangeEvent, ChangeKind};
use chrono::{DateTime, Local, Utc};
use colored::*;
use tabled::settings::{object::Columns, Alignment, Modify, Style};
use tabled::{Table, Tabled};

#[derive(Tabled)]
struct SummaryRow {
    metric: String,
    value: String,
}

fn fmt_time(t: Option<DateTime<Utc>>, missing: &str) -> String {
    t.map(|t| {
        t.with_timezone(&Local)
            .format("%Y-%m-%d %H:%M:%S")
            .to_string()
    })
    .unwrap_or_else(|| missing.dimmed().to_string())
}

fn color_kind(kind: ChangeKind) -> String {
    let s = kind.to_string();
    match kind {
        ChangeKind::Inserted => s.green().to_string(),
        ChangeKind::Deleted => s.red().to_string(),
        ChangeKind::Modified => s.yellow().to_string(),
        ChangeKind::InitialScan => s.cyan().to_string(),
        ChangeKind::Unchanged => s.normal().to_string(),
    }
}

// ─── Status ───────────────────────────────────────────────────────────────────

pub fn print_status(report: &StatusReport) {
    println!();
    println!("{}", "TABLE MONITORING STATUS".bold().cyan());
    println!("Table: {}", report.table.bright_yellow());
    println!();

    let h = &report.history;
    let snap = report.snapshot.as_ref();

    let health = if h.last_attempt_at.is_none() {
        "never checked".dimmed().to_string()
    } else if h.is_failing() {
        format!("FAILING ({} in a row)", h.consecutive_failures)
            .bold()
            .red()
            .to_string()
    } else {
        "OK".bold().green().to_string()
    };

    let rows = vec![
        SummaryRow {
            metric: "Health".into(),
            value: health,
        },
        SummaryRow {
            metric: "Last attempted check".into(),
            value: fmt_time(h.last_attempt_at, "Never"),
        },
        SummaryRow {
            metric: "Last successful check".into(),
            value: fmt_time(h.last_success_at, "Never"),
        },
        SummaryRow {
            metric: "Next check".into(),
            value: fmt_time(report.next_check_at, "On next run"),
        },
        SummaryRow {
            metric: "Last event".into(),
            value: h
                .last_event
                .map(color_kind)
                .unwrap_or_else(|| "-".dimmed().to_string()),
        },
        SummaryRow {
            metric: "Record count".into(),
            value: snap
                .map(|s| s.record_count.to_string().bold().to_string())
                .unwrap_or_else(|| "Unknown".dimmed().to_string()),
        },
        SummaryRow {
            metric: "Max ID".into(),
            value: snap
                .and_then(|s| s.max_id)
                .map(|m| m.to_string())
                .unwrap_or_else(|| "Unknown".dimmed().to_string()),
        },
        SummaryRow {
            metric: "Snapshot taken".into(),
            value: fmt_time(snap.map(|s| s.captured_at), "No snapshot"),
        },
    ];

    let table = Table::new(rows)
        .with(Style::rounded())
        .with(Modify::new(Columns::new(1..=1)).with(Alignment::right()))
        .to_string();
    println!("{table}");

    if let Some(err) = &h.last_error {
        println!();
        println!(
            "  {} {} [{}] {}",
            "last error →".red(),
            fmt_time(Some(err.at), ""),
            err.kind.yellow(),
            err.message
        );
    }

    if !report.log_tail.is_empty() {
        println!();
        print_log_tail(&report.log_tail);
    }
    println!();
}

// ─── Event ────────────────────────────────────────────────────────────────────

/// Print the outcome of a single check to stdout.
pub fn print_event(event: &ChangeEvent) {
    println!("{} {}", color_kind(event.kind()).bold(), event.message());
    for (i, r) in event.listed_records().iter().enumerate() {
        println!(
            "   {}. ID: {}, Name: {}",
            i + 1,
            r.id.to_string().bold(),
            r.name.as_deref().unwrap_or("NULL")
        );
    }
}

// ─── Log tail ─────────────────────────────────────────────────────────────────

pub fn print_log_tail(lines: &[String]) {
    if lines.is_empty() {
        println!("{}", "No log entries yet.".italic());
        return;
    }

    println!("{}", format!("RECENT LOG ({} lines)", lines.len()).bold().cyan());
    for line in lines {
        let painted = if line.contains(" - ERROR - ") {
            line.red().to_string()
        } else if line.contains(" - WARNING - ") {
            line.yellow().to_string()
        } else {
            line.normal().to_string()
        };
        println!("  {painted}");
    }
}
