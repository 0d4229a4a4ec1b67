// Report generation from scan results

use crate::scan::{BrokenLinkRecord, ScanReport};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Write;
use std::path::Path;

const RULE: &str =
    "━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━\n";
const THIN_RULE: &str =
    "────────────────────────────────────────────────────────────────────────────────\n";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReportFormat {
    Text,
    Json,
    Csv,
    Markdown,
}

impl ReportFormat {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "text" | "txt" => Some(ReportFormat::Text),
            "json" => Some(ReportFormat::Json),
            "csv" => Some(ReportFormat::Csv),
            "markdown" | "md" => Some(ReportFormat::Markdown),
            _ => None,
        }
    }

    /// Guess the format from a file extension, e.g. for `--output report.json`.
    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|ext| ext.to_str())
            .and_then(Self::from_str)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfidenceTier {
    High,
    Medium,
    Low,
}

impl ConfidenceTier {
    pub fn label(&self) -> &'static str {
        match self {
            ConfidenceTier::High => "high",
            ConfidenceTier::Medium => "medium",
            ConfidenceTier::Low => "low",
        }
    }
}

/// High above 80%, medium above 50%, low otherwise.
pub fn confidence_tier(confidence: u8) -> ConfidenceTier {
    match confidence {
        81..=u8::MAX => ConfidenceTier::High,
        51..=80 => ConfidenceTier::Medium,
        _ => ConfidenceTier::Low,
    }
}

pub fn render(report: &ScanReport, format: ReportFormat) -> Result<String, serde_json::Error> {
    match format {
        ReportFormat::Text => Ok(generate_text_report(report)),
        ReportFormat::Json => generate_json_report(report),
        ReportFormat::Csv => Ok(generate_csv_report(report)),
        ReportFormat::Markdown => Ok(generate_markdown_report(report)),
    }
}

fn suggestion_text(record: &BrokenLinkRecord) -> String {
    match &record.suggested_url {
        Some(url) => format!(
            "{} ({}%, {})",
            url,
            record.confidence,
            confidence_tier(record.confidence).label()
        ),
        None => "none".to_string(),
    }
}

pub fn generate_text_report(report: &ScanReport) -> String {
    let mut out = String::new();

    // Header
    out.push_str(RULE);
    out.push_str("                      LINKMEND DOCUMENTATION LINK REPORT\n");
    out.push_str(RULE);
    out.push('\n');

    out.push_str(&format!("Session ID:   {}\n", report.session_id));
    out.push_str(&format!(
        "Scan Date:    {}\n",
        report.started_at.format("%Y-%m-%d %H:%M:%S UTC")
    ));
    out.push_str(&format!(
        "Duration:     {} seconds\n",
        report.duration().num_seconds()
    ));
    out.push_str(&format!("Site:         {}\n", report.site));
    out.push_str(&format!(
        "Repository:   {}@{}\n",
        report.repository, report.branch
    ));
    if let Some(path) = &report.path_filter {
        out.push_str(&format!("Path:         {}\n", path));
    }
    out.push('\n');

    // Summary
    out.push_str(RULE);
    out.push_str("SUMMARY\n");
    out.push_str(RULE);
    out.push('\n');

    out.push_str(&format!("Indexed Pages:     {}\n", report.index_size));
    out.push_str(&format!("Documents Scanned: {}\n", report.documents_scanned));
    out.push_str(&format!("Links Checked:     {}\n", report.links_checked));
    out.push_str(&format!(
        "Broken Links:      {} ({} confirmed)\n",
        report.broken_count(),
        report.confirmed_count()
    ));
    out.push_str(&format!("With Suggestion:   {}\n", report.suggested_count()));
    if report.index_size == 0 {
        out.push_str("\n  Sitemap unavailable: links were probed live and no suggestions were made.\n");
    }
    out.push('\n');

    if !report.records.is_empty() {
        out.push_str(RULE);
        out.push_str("BROKEN LINKS\n");
        out.push_str(RULE);
        out.push('\n');

        for (idx, record) in report.records.iter().enumerate() {
            out.push_str(&format!("[{}] {}\n", idx + 1, record.file_name));
            out.push_str(&format!("File:         {}\n", record.file_path));
            out.push_str(&format!("Broken URL:   {}\n", record.broken_url));
            out.push_str(&format!("Reason:       {}\n", record.reason));
            out.push_str(&format!("Suggestion:   {}\n", suggestion_text(record)));
            out.push('\n');
            out.push_str(THIN_RULE);
            out.push('\n');
        }
    }

    // Footer
    out.push_str(RULE);
    out.push_str("                          End of Report\n");
    out.push_str(RULE);
    out.push_str("\nGenerated by linkmend - documentation link checker\n\n");

    out
}

pub fn generate_json_report(report: &ScanReport) -> Result<String, serde_json::Error> {
    let json_report = serde_json::json!({
        "report": {
            "metadata": {
                "generator": "linkmend",
                "version": env!("CARGO_PKG_VERSION"),
                "generated_at": chrono::Utc::now().to_rfc3339(),
                "format": "json"
            },
            "session": {
                "id": report.session_id,
                "site": report.site,
                "repository": report.repository,
                "branch": report.branch,
                "path": report.path_filter,
                "start_time": report.started_at.to_rfc3339(),
                "end_time": report.finished_at.to_rfc3339(),
                "duration_seconds": report.duration().num_seconds()
            },
            "summary": {
                "indexed_pages": report.index_size,
                "documents_scanned": report.documents_scanned,
                "links_checked": report.links_checked,
                "broken_links": report.broken_count(),
                "confirmed_broken": report.confirmed_count(),
                "with_suggestion": report.suggested_count()
            },
            "records": report.records
        }
    });

    serde_json::to_string_pretty(&json_report)
}

fn csv_field(value: &str) -> String {
    if value.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

pub fn generate_csv_report(report: &ScanReport) -> String {
    let mut out =
        String::from("file_name,file_path,broken_url,reason,suggested_url,confidence,tier\n");

    for record in &report.records {
        let fields = [
            csv_field(&record.file_name),
            csv_field(&record.file_path),
            csv_field(&record.broken_url),
            csv_field(&record.reason.label()),
            csv_field(record.suggested_url.as_deref().unwrap_or("")),
            record.confidence.to_string(),
            confidence_tier(record.confidence).label().to_string(),
        ];
        out.push_str(&fields.join(","));
        out.push('\n');
    }

    out
}

fn markdown_cell(value: &str) -> String {
    value.replace('|', "\\|")
}

pub fn generate_markdown_report(report: &ScanReport) -> String {
    let mut out = String::from("# Documentation Link Report\n\n");

    out.push_str(&format!("- **Site:** {}\n", report.site));
    out.push_str(&format!(
        "- **Repository:** {}@{}\n",
        report.repository, report.branch
    ));
    if let Some(path) = &report.path_filter {
        out.push_str(&format!("- **Path:** `{}`\n", path));
    }
    out.push_str(&format!(
        "- **Scanned:** {}\n",
        report.started_at.format("%Y-%m-%d %H:%M:%S UTC")
    ));
    out.push_str(&format!(
        "- **Documents:** {}, **links checked:** {}, **broken:** {}\n\n",
        report.documents_scanned,
        report.links_checked,
        report.broken_count()
    ));

    if report.records.is_empty() {
        out.push_str("No broken links found.\n");
        return out;
    }

    out.push_str("| File | Broken URL | Reason | Suggestion | Confidence |\n");
    out.push_str("|------|------------|--------|------------|------------|\n");
    for record in &report.records {
        let suggestion = record
            .suggested_url
            .as_deref()
            .map(markdown_cell)
            .unwrap_or_else(|| "-".to_string());
        out.push_str(&format!(
            "| `{}` | {} | {} | {} | {}% ({}) |\n",
            markdown_cell(&record.file_path),
            markdown_cell(&record.broken_url),
            markdown_cell(&record.reason.label()),
            suggestion,
            record.confidence,
            confidence_tier(record.confidence).label()
        ));
    }

    out
}

pub fn save_report(content: &str, path: &Path) -> std::io::Result<()> {
    let mut file = File::create(path)?;
    file.write_all(content.as_bytes())?;
    Ok(())
}
