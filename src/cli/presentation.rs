//! CLI presentation: tables and summaries for run, check and status output.

use crate::batch::{BatchReport, ItemOutcome};
use crate::ledger::LedgerStats;
use crate::types::ContentKind;
use comfy_table::Table;
use owo_colors::OwoColorize;
use serde::Serialize;

fn heading(title: &str, color: bool) -> String {
    if color {
        format!("{}", title.bold().underline())
    } else {
        title.to_string()
    }
}

fn table() -> Table {
    let mut table = Table::new();
    table.load_preset(comfy_table::presets::UTF8_FULL);
    table
}

/// Per-item table, run totals and provider usage.
pub fn format_batch_report(report: &BatchReport, color: bool) -> String {
    let mut output = String::new();
    let title = if report.dry_run {
        "Run report (dry run)"
    } else {
        "Run report"
    };
    output.push_str(&heading(title, color));
    output.push_str("\n\n");

    if report.items.is_empty() {
        output.push_str("No topics to process.\n");
    } else {
        let mut items = table();
        items.set_header(vec!["#", "Kind", "Topic", "Locale", "Outcome", "Seq", "Artifact"]);
        for (index, item) in report.items.iter().enumerate() {
            let (sequence, artifact_ref, detail) = match &item.outcome {
                ItemOutcome::Generated {
                    sequence,
                    artifact_ref,
                    ..
                } => (
                    sequence.map(|s| s.to_string()).unwrap_or_else(|| "-".to_string()),
                    artifact_ref.clone().unwrap_or_else(|| "-".to_string()),
                    None,
                ),
                ItemOutcome::PublishFailed { reason } | ItemOutcome::RecordFailed { reason } => {
                    ("-".to_string(), "-".to_string(), Some(reason.clone()))
                }
                _ => ("-".to_string(), "-".to_string(), None),
            };
            let outcome = match detail {
                Some(reason) => format!("{}: {}", item.outcome.label(), reason),
                None => item.outcome.label(),
            };
            items.add_row(vec![
                (index + 1).to_string(),
                item.kind.to_string(),
                item.topic.clone(),
                item.locale.clone().unwrap_or_else(|| "-".to_string()),
                outcome,
                sequence,
                artifact_ref,
            ]);
        }
        output.push_str(&items.to_string());
        output.push('\n');
    }

    output.push('\n');
    output.push_str(&format!(
        "Generated: {} ({} by providers, {} procedural)\n",
        report.successes() + report.fallbacks(),
        report.successes(),
        report.fallbacks()
    ));
    output.push_str(&format!(
        "Skipped duplicates: {}  Deferred: {}  Failed: {}  Cancelled: {}\n",
        report.skipped(),
        report.deferred(),
        report.failed(),
        report.cancelled()
    ));
    output.push('\n');
    output.push_str(&report.usage.to_string());
    output
}

/// Result of `scribe check`.
#[derive(Debug, Clone, Serialize)]
pub struct CheckView {
    pub kind: ContentKind,
    pub topic: String,
    pub locale: Option<String>,
    pub fingerprint: String,
    pub recorded: bool,
    pub next_sequence: u64,
}

pub fn format_check_result(view: &CheckView) -> String {
    let subject = match &view.locale {
        Some(locale) => format!("{} \"{}\" ({})", view.kind, view.topic, locale),
        None => format!("{} \"{}\"", view.kind, view.topic),
    };
    let verdict = if view.recorded {
        "already recorded"
    } else {
        "not recorded"
    };
    format!(
        "{}: {}\nFingerprint: {}\nNext {} sequence: {}",
        subject, verdict, view.fingerprint, view.kind, view.next_sequence
    )
}

#[derive(Debug, Clone, Serialize)]
pub struct ProviderRow {
    pub id: String,
    pub provider_type: String,
    pub model: String,
    pub priority: u32,
    pub capabilities: Vec<ContentKind>,
    pub enabled: bool,
    pub credentials: bool,
}

/// Result of `scribe status`.
#[derive(Debug, Clone, Serialize)]
pub struct StatusView {
    pub ledger: String,
    pub stats: LedgerStats,
    pub providers: Vec<ProviderRow>,
}

pub fn format_status_text(view: &StatusView, color: bool) -> String {
    let mut output = String::new();
    output.push_str(&heading("Ledger", color));
    output.push('\n');
    output.push_str(&format!("Location: {}\n", view.ledger));
    output.push_str(&format!("Entries: {}\n", view.stats.total_entries));
    if let Some(updated) = view.stats.last_updated {
        output.push_str(&format!("Last updated: {}\n", updated.to_rfc3339()));
    }

    let mut kinds = table();
    kinds.set_header(vec!["Kind", "Entries", "Last sequence"]);
    for kind in ContentKind::ALL {
        let stats = view.stats.per_kind.get(kind.as_str()).cloned().unwrap_or_default();
        kinds.add_row(vec![
            kind.to_string(),
            stats.entries.to_string(),
            stats.last_sequence.to_string(),
        ]);
    }
    output.push_str(&kinds.to_string());
    output.push_str("\n\n");

    output.push_str(&heading("Providers", color));
    output.push('\n');
    if view.providers.is_empty() {
        output.push_str("No providers configured; every request will use the procedural fallback.");
        return output;
    }
    let mut providers = table();
    providers.set_header(vec![
        "Provider",
        "Type",
        "Model",
        "Priority",
        "Kinds",
        "Enabled",
        "Credentials",
    ]);
    for row in &view.providers {
        let kinds: Vec<&str> = row.capabilities.iter().map(|k| k.as_str()).collect();
        providers.add_row(vec![
            row.id.clone(),
            row.provider_type.clone(),
            row.model.clone(),
            row.priority.to_string(),
            kinds.join(", "),
            yes_no(row.enabled).to_string(),
            if row.credentials { "present" } else { "missing" }.to_string(),
        ]);
    }
    output.push_str(&providers.to_string());
    output
}

pub fn format_status_json(view: &StatusView) -> String {
    serde_json::to_string_pretty(view).unwrap_or_else(|e| format!("{{\"error\":\"{}\"}}", e))
}

fn yes_no(value: bool) -> &'static str {
    if value {
        "yes"
    } else {
        "no"
    }
}
