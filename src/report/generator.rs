//! Report generation.
//!
//! This module renders a [`RunReport`] as pretty JSON or as a Markdown
//! document, and writes it to disk.

use crate::analysis::sort_by_urgency;
use crate::config::ReportFormat;
use crate::models::{
    BossEvaluation, DecisionCheck, IssueGroups, IssueSummary, RiskLevel, RunReport, WorkerRecord,
    WorkerResult,
};
use anyhow::{Context, Result};
use chrono::{DateTime, Local};
use std::path::{Path, PathBuf};

/// Generate a complete Markdown report.
pub fn generate_markdown_report(report: &RunReport) -> String {
    let mut output = String::new();

    output.push_str("# Release Review Report\n\n");
    output.push_str(&generate_metadata_section(report));
    output.push_str(&generate_decision_section(
        &report.boss_evaluation,
        &report.decision_check,
    ));
    output.push_str(&generate_boss_section(&report.boss_evaluation));
    output.push_str(&generate_summary_section(
        &report.worker_summary,
        &report.worker_results,
    ));
    output.push_str(&generate_groups_section("Issues by Risk", &report.issues_by_risk));
    output.push_str(&generate_groups_section(
        "Issues by Priority",
        &report.issues_by_priority,
    ));
    output.push_str(&generate_worker_details_section(&report.worker_results));
    output.push_str(&generate_footer());

    output
}

fn generate_metadata_section(report: &RunReport) -> String {
    let mut section = String::new();

    section.push_str("## Metadata\n\n");
    section.push_str(&format!("- **Target:** {}\n", report.target.url));
    if let Some(ref source) = report.target.source_code_url {
        section.push_str(&format!("- **Source Code:** {}\n", source));
    }
    section.push_str(&format!("- **Description:** {}\n", report.target.description));
    section.push_str(&format!(
        "- **Evaluated At:** {}\n",
        report.timestamp.format("%Y-%m-%d %H:%M:%S UTC")
    ));
    section.push_str(&format!(
        "- **Boss:** {}\n",
        report.project_structure.boss_agent
    ));
    section.push_str(&format!(
        "- **Workers:** {}\n",
        report.project_structure.worker_agents.join(", ")
    ));
    section.push('\n');

    section
}

fn generate_decision_section(boss: &BossEvaluation, check: &DecisionCheck) -> String {
    let mut section = String::new();

    section.push_str("## Final Decision\n\n");
    section.push_str(&format!(
        "{} **{}**\n\n",
        boss.final_decision.emoji(),
        boss.final_decision
    ));

    if !check.consistent {
        section.push_str(&format!(
            "> ⚠️ The worker risk levels call for **{}** under the release rule \
             (no High or Unknown risk, at most two Medium).\n\n",
            check.computed
        ));
    }

    section
}

fn generate_boss_section(boss: &BossEvaluation) -> String {
    let mut section = String::new();

    section.push_str("## Integrated Evaluation\n\n");
    section.push_str(&format!("*{} ({})*\n\n", boss.agent_name, boss.role));
    section.push_str(&boss.overall_evaluation);
    section.push_str("\n\n");

    section.push_str("## Risk Analysis\n\n");
    section.push_str(&boss.risk_analysis);
    section.push_str("\n\n");

    section.push_str("## Improvement Roadmap\n\n");
    for (i, item) in boss.improvement_roadmap.iter().enumerate() {
        section.push_str(&format!("{}. {}\n", i + 1, item));
    }
    section.push('\n');

    section
}

fn generate_summary_section(summary: &IssueSummary, workers: &[WorkerRecord]) -> String {
    let mut section = String::new();

    section.push_str("## Worker Summary\n\n");

    section.push_str(&format!(
        "| {} High | {} Medium | {} Low | {} Unknown | **Workers** |\n",
        RiskLevel::High.emoji(),
        RiskLevel::Medium.emoji(),
        RiskLevel::Low.emoji(),
        RiskLevel::Unknown.emoji(),
    ));
    section.push_str("|:---:|:---:|:---:|:---:|:---:|\n");
    section.push_str(&format!(
        "| {} | {} | {} | {} | **{}** |\n\n",
        summary.high_risk_issues,
        summary.medium_risk_issues,
        summary.low_risk_issues,
        summary.unknown_risk_issues,
        summary.total_workers
    ));

    if !workers.is_empty() {
        section.push_str("| Worker | Role | Risk | Priority |\n");
        section.push_str("|:---|:---|:---:|:---:|\n");
        for worker in workers {
            section.push_str(&format!(
                "| {} | {} | {} {} | {} {} |\n",
                table_cell(&worker.name),
                table_cell(&worker.role),
                worker.risk_level.emoji(),
                worker.risk_level,
                worker.priority.emoji(),
                worker.priority
            ));
        }
        section.push('\n');
    }

    section
}

fn generate_groups_section(title: &str, groups: &IssueGroups) -> String {
    let mut section = String::new();

    section.push_str(&format!("## {}\n\n", title));

    let buckets = [
        ("High", &groups.high),
        ("Medium", &groups.medium),
        ("Low", &groups.low),
        ("Unknown", &groups.unknown),
    ];

    for (label, entries) in buckets {
        if entries.is_empty() {
            continue;
        }
        section.push_str(&format!("### {}\n\n", label));
        for entry in entries {
            section.push_str(&format!("- **{}**\n", entry.agent));
            for rec in &entry.recommendations {
                section.push_str(&format!("  - {}\n", rec));
            }
        }
        section.push('\n');
    }

    section
}

fn generate_worker_details_section(workers: &[WorkerRecord]) -> String {
    let mut section = String::new();

    section.push_str("## Worker Details\n\n");

    if workers.is_empty() {
        section.push_str("No worker results.\n\n");
        return section;
    }

    // Most urgent first.
    let results: Vec<WorkerResult> = workers.iter().map(WorkerResult::from).collect();
    for worker in sort_by_urgency(&results) {
        section.push_str(&format!("### {} ({})\n\n", worker.agent_name, worker.role));
        section.push_str(&format!(
            "*Risk: {} {} | Priority: {} {}*\n\n",
            worker.risk_level.emoji(),
            worker.risk_level,
            worker.priority.emoji(),
            worker.priority
        ));
        section.push_str(&worker.evaluation);
        section.push_str("\n\n");
        section.push_str("**Recommendations:**\n\n");
        for rec in &worker.recommendations {
            section.push_str(&format!("- {}\n", rec));
        }
        section.push_str("\n---\n\n");
    }

    section
}

fn generate_footer() -> String {
    "*Report generated by releasegate*\n".to_string()
}

/// Keep a value inside a single Markdown table cell.
fn table_cell(text: &str) -> String {
    text.replace('|', "\\|").replace('\n', " ")
}

/// Generate a JSON report.
pub fn generate_json_report(report: &RunReport) -> Result<String> {
    serde_json::to_string_pretty(report).map_err(Into::into)
}

/// Render a report in the requested format.
pub fn render_report(report: &RunReport, format: ReportFormat) -> Result<String> {
    match format {
        ReportFormat::Json => generate_json_report(report),
        ReportFormat::Markdown => Ok(generate_markdown_report(report)),
    }
}

/// Timestamped report path, e.g. `boss_worker_report_20250101_120000.json`.
pub fn default_report_path(format: ReportFormat, dir: &Path, now: &DateTime<Local>) -> PathBuf {
    dir.join(format!(
        "boss_worker_report_{}.{}",
        now.format("%Y%m%d_%H%M%S"),
        format.extension()
    ))
}

/// Render and write the report, creating the parent directory if needed.
pub fn save_report(report: &RunReport, format: ReportFormat, path: &Path) -> Result<()> {
    let content = render_report(report, format)?;

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            std::fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create report directory {}", parent.display())
            })?;
        }
    }

    std::fs::write(path, content)
        .with_context(|| format!("Failed to write report to {}", path.display()))?;

    Ok(())
}
