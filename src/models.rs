//! Data models for the review panel.
//!
//! This module contains the typed records produced by the worker and boss
//! evaluators, the classification enums, and the exported run report.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Language used for prompts and synthetic placeholder text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
pub enum Language {
    /// English prompts (default)
    #[default]
    #[serde(rename = "en")]
    #[value(name = "en")]
    English,
    /// Japanese prompts
    #[serde(rename = "ja")]
    #[value(name = "ja")]
    Japanese,
}

/// Risk level of a worker's findings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RiskLevel {
    High,
    Medium,
    Low,
    /// The specialty area could not be evaluated.
    Unknown,
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RiskLevel::High => write!(f, "High"),
            RiskLevel::Medium => write!(f, "Medium"),
            RiskLevel::Low => write!(f, "Low"),
            RiskLevel::Unknown => write!(f, "Unknown"),
        }
    }
}

impl RiskLevel {
    /// Parse a canonical label produced by the section parser.
    pub fn from_label(label: &str) -> Option<Self> {
        match label {
            "High" => Some(RiskLevel::High),
            "Medium" => Some(RiskLevel::Medium),
            "Low" => Some(RiskLevel::Low),
            "Unknown" => Some(RiskLevel::Unknown),
            _ => None,
        }
    }

    /// Label used when rendering the level back into a prompt.
    pub fn label(&self, language: Language) -> &'static str {
        match (language, self) {
            (Language::English, RiskLevel::High) => "High",
            (Language::English, RiskLevel::Medium) => "Medium",
            (Language::English, RiskLevel::Low) => "Low",
            (Language::English, RiskLevel::Unknown) => "Unknown",
            (Language::Japanese, RiskLevel::High) => "高",
            (Language::Japanese, RiskLevel::Medium) => "中",
            (Language::Japanese, RiskLevel::Low) => "低",
            (Language::Japanese, RiskLevel::Unknown) => "不明",
        }
    }

    pub fn emoji(&self) -> &'static str {
        match self {
            RiskLevel::High => "🔴",
            RiskLevel::Medium => "🟡",
            RiskLevel::Low => "🟢",
            RiskLevel::Unknown => "⚪",
        }
    }
}

/// Priority of a worker's recommendations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Priority {
    High,
    Medium,
    Low,
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Priority::High => write!(f, "High"),
            Priority::Medium => write!(f, "Medium"),
            Priority::Low => write!(f, "Low"),
        }
    }
}

impl Priority {
    /// Parse a canonical label produced by the section parser.
    pub fn from_label(label: &str) -> Option<Self> {
        match label {
            "High" => Some(Priority::High),
            "Medium" => Some(Priority::Medium),
            "Low" => Some(Priority::Low),
            _ => None,
        }
    }

    pub fn label(&self, language: Language) -> &'static str {
        match (language, self) {
            (Language::English, Priority::High) => "High",
            (Language::English, Priority::Medium) => "Medium",
            (Language::English, Priority::Low) => "Low",
            (Language::Japanese, Priority::High) => "高",
            (Language::Japanese, Priority::Medium) => "中",
            (Language::Japanese, Priority::Low) => "低",
        }
    }

    pub fn emoji(&self) -> &'static str {
        match self {
            Priority::High => "🔴",
            Priority::Medium => "🟡",
            Priority::Low => "🟢",
        }
    }
}

/// Release-readiness verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Decision {
    Go,
    #[serde(rename = "No-Go")]
    NoGo,
}

impl fmt::Display for Decision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Decision::Go => write!(f, "Go"),
            Decision::NoGo => write!(f, "No-Go"),
        }
    }
}

impl Decision {
    pub fn from_label(label: &str) -> Option<Self> {
        match label {
            "Go" => Some(Decision::Go),
            "No-Go" => Some(Decision::NoGo),
            _ => None,
        }
    }

    pub fn emoji(&self) -> &'static str {
        match self {
            Decision::Go => "✅",
            Decision::NoGo => "⛔",
        }
    }
}

/// The application under review, shared by every evaluator in a run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Target {
    /// Address of the running application.
    pub url: String,
    /// Source repository, when known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_code_url: Option<String>,
    /// Free-text description of the application.
    pub description: String,
}

/// Immutable persona of one evaluator, resolved from configuration at startup.
#[derive(Debug, Clone, PartialEq)]
pub struct EvaluatorIdentity {
    pub name: String,
    pub role: String,
    pub model: String,
    pub temperature: f32,
    pub system_prompt: String,
}

/// One worker's evaluation of the target.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkerResult {
    pub agent_name: String,
    pub role: String,
    pub evaluation: String,
    /// Never empty; a placeholder is substituted when the model gave none.
    pub recommendations: Vec<String>,
    pub risk_level: RiskLevel,
    pub priority: Priority,
}

/// Projection of a [`WorkerResult`] carried inside the boss record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkerSummary {
    pub role: String,
    pub evaluation: String,
    pub recommendations: Vec<String>,
    pub risk_level: RiskLevel,
    pub priority: Priority,
}

impl From<&WorkerResult> for WorkerSummary {
    fn from(result: &WorkerResult) -> Self {
        Self {
            role: result.role.clone(),
            evaluation: result.evaluation.clone(),
            recommendations: result.recommendations.clone(),
            risk_level: result.risk_level,
            priority: result.priority,
        }
    }
}

/// The boss's integrated evaluation and release decision.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BossResult {
    pub agent_name: String,
    pub role: String,
    pub overall_evaluation: String,
    pub final_decision: Decision,
    pub risk_analysis: String,
    /// Never empty; a placeholder is substituted when the model gave none.
    pub improvement_roadmap: Vec<String>,
    /// Keyed by worker name; one entry per worker result passed to the boss.
    pub worker_summary: BTreeMap<String, WorkerSummary>,
}

/// Issue counts partitioned by priority and by risk level.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IssueSummary {
    pub total_workers: usize,
    pub high_priority_issues: usize,
    pub medium_priority_issues: usize,
    pub low_priority_issues: usize,
    pub high_risk_issues: usize,
    pub medium_risk_issues: usize,
    pub low_risk_issues: usize,
    /// Workers whose evaluation failed and could not be classified.
    pub unknown_risk_issues: usize,
}

impl IssueSummary {
    /// Creates a summary from a set of worker results.
    pub fn from_results(results: &[WorkerResult]) -> Self {
        let mut summary = Self {
            total_workers: results.len(),
            ..Self::default()
        };

        for result in results {
            match result.priority {
                Priority::High => summary.high_priority_issues += 1,
                Priority::Medium => summary.medium_priority_issues += 1,
                Priority::Low => summary.low_priority_issues += 1,
            }

            match result.risk_level {
                RiskLevel::High => summary.high_risk_issues += 1,
                RiskLevel::Medium => summary.medium_risk_issues += 1,
                RiskLevel::Low => summary.low_risk_issues += 1,
                RiskLevel::Unknown => summary.unknown_risk_issues += 1,
            }
        }

        summary
    }
}

/// Recommendations of one worker, as listed in an issue group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentIssues {
    pub agent: String,
    pub recommendations: Vec<String>,
}

/// Worker recommendations grouped by classification bucket.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IssueGroups {
    pub high: Vec<AgentIssues>,
    pub medium: Vec<AgentIssues>,
    pub low: Vec<AgentIssues>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub unknown: Vec<AgentIssues>,
}

/// Snapshot of the configured roster.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectStructure {
    pub boss_agent: String,
    pub worker_agents: Vec<String>,
    pub total_agents: usize,
}

/// Boss fields exported in the report (the worker projection is exported separately).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BossEvaluation {
    pub agent_name: String,
    pub role: String,
    pub overall_evaluation: String,
    pub final_decision: Decision,
    pub risk_analysis: String,
    pub improvement_roadmap: Vec<String>,
}

impl From<&BossResult> for BossEvaluation {
    fn from(boss: &BossResult) -> Self {
        Self {
            agent_name: boss.agent_name.clone(),
            role: boss.role.clone(),
            overall_evaluation: boss.overall_evaluation.clone(),
            final_decision: boss.final_decision,
            risk_analysis: boss.risk_analysis.clone(),
            improvement_roadmap: boss.improvement_roadmap.clone(),
        }
    }
}

/// A worker result as exported in the report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkerRecord {
    pub name: String,
    pub role: String,
    pub evaluation: String,
    pub recommendations: Vec<String>,
    pub risk_level: RiskLevel,
    pub priority: Priority,
}

impl From<&WorkerResult> for WorkerRecord {
    fn from(result: &WorkerResult) -> Self {
        Self {
            name: result.agent_name.clone(),
            role: result.role.clone(),
            evaluation: result.evaluation.clone(),
            recommendations: result.recommendations.clone(),
            risk_level: result.risk_level,
            priority: result.priority,
        }
    }
}

impl From<&WorkerRecord> for WorkerResult {
    fn from(record: &WorkerRecord) -> Self {
        Self {
            agent_name: record.name.clone(),
            role: record.role.clone(),
            evaluation: record.evaluation.clone(),
            recommendations: record.recommendations.clone(),
            risk_level: record.risk_level,
            priority: record.priority,
        }
    }
}

/// Comparison of the boss's stated decision against the rule recomputed from worker risk levels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecisionCheck {
    pub stated: Decision,
    pub computed: Decision,
    pub consistent: bool,
}

/// The complete exported record of one evaluation run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub timestamp: DateTime<Utc>,
    pub target: Target,
    pub project_structure: ProjectStructure,
    pub boss_evaluation: BossEvaluation,
    pub worker_summary: IssueSummary,
    pub worker_results: Vec<WorkerRecord>,
    pub issues_by_priority: IssueGroups,
    pub issues_by_risk: IssueGroups,
    pub decision_check: DecisionCheck,
}
