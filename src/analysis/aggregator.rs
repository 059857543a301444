//! Worker result classification and statistics.
//!
//! This module groups worker results by risk level and priority, recomputes
//! the release rule from the classified results, and assembles the exported
//! run report.

use crate::models::{
    AgentIssues, BossEvaluation, BossResult, Decision, DecisionCheck, IssueGroups, IssueSummary,
    Priority, ProjectStructure, RiskLevel, RunReport, Target, WorkerRecord, WorkerResult,
};
use chrono::{DateTime, Utc};
use std::cmp::Reverse;

/// Most Medium-risk findings a Go decision tolerates.
pub const MAX_MEDIUM_RISK_FOR_GO: usize = 2;

fn agent_issues(result: &WorkerResult) -> AgentIssues {
    AgentIssues {
        agent: result.agent_name.clone(),
        recommendations: result.recommendations.clone(),
    }
}

/// Group worker recommendations by risk level.
pub fn group_by_risk(results: &[WorkerResult]) -> IssueGroups {
    let mut groups = IssueGroups::default();

    for result in results {
        let bucket = match result.risk_level {
            RiskLevel::High => &mut groups.high,
            RiskLevel::Medium => &mut groups.medium,
            RiskLevel::Low => &mut groups.low,
            RiskLevel::Unknown => &mut groups.unknown,
        };
        bucket.push(agent_issues(result));
    }

    groups
}

/// Group worker recommendations by priority.
pub fn group_by_priority(results: &[WorkerResult]) -> IssueGroups {
    let mut groups = IssueGroups::default();

    for result in results {
        let bucket = match result.priority {
            Priority::High => &mut groups.high,
            Priority::Medium => &mut groups.medium,
            Priority::Low => &mut groups.low,
        };
        bucket.push(agent_issues(result));
    }

    groups
}

/// The decision the release rule requires for the given counts.
///
/// Go needs zero High-risk findings and at most two Medium-risk findings.
/// Unknown risk means a specialty was never examined and blocks like High.
pub fn required_decision(summary: &IssueSummary) -> Decision {
    let blocking = summary.high_risk_issues + summary.unknown_risk_issues;
    if blocking == 0 && summary.medium_risk_issues <= MAX_MEDIUM_RISK_FOR_GO {
        Decision::Go
    } else {
        Decision::NoGo
    }
}

/// Compare the boss's stated decision with the rule applied to the worker results.
pub fn check_decision(stated: Decision, summary: &IssueSummary) -> DecisionCheck {
    let computed = required_decision(summary);
    DecisionCheck {
        stated,
        computed,
        consistent: stated == computed,
    }
}

fn urgency(result: &WorkerResult) -> (u8, u8) {
    let priority = match result.priority {
        Priority::High => 2,
        Priority::Medium => 1,
        Priority::Low => 0,
    };
    let risk = match result.risk_level {
        RiskLevel::Unknown => 3,
        RiskLevel::High => 2,
        RiskLevel::Medium => 1,
        RiskLevel::Low => 0,
    };
    (priority, risk)
}

/// Worker results ordered most urgent first (priority, then risk). Stable for ties.
pub fn sort_by_urgency(results: &[WorkerResult]) -> Vec<&WorkerResult> {
    let mut sorted: Vec<&WorkerResult> = results.iter().collect();
    sorted.sort_by_key(|r| Reverse(urgency(r)));
    sorted
}

/// Total number of recommendations across all workers.
pub fn recommendation_count(results: &[WorkerResult]) -> usize {
    results.iter().map(|r| r.recommendations.len()).sum()
}

/// Generate a text summary of the classification counts.
pub fn generate_summary_text(summary: &IssueSummary) -> String {
    let mut lines = Vec::new();

    lines.push(format!("Workers: {}", summary.total_workers));
    lines.push(format!(
        "Risk:     {} High: {} | {} Medium: {} | {} Low: {} | {} Unknown: {}",
        RiskLevel::High.emoji(),
        summary.high_risk_issues,
        RiskLevel::Medium.emoji(),
        summary.medium_risk_issues,
        RiskLevel::Low.emoji(),
        summary.low_risk_issues,
        RiskLevel::Unknown.emoji(),
        summary.unknown_risk_issues
    ));
    lines.push(format!(
        "Priority: {} High: {} | {} Medium: {} | {} Low: {}",
        Priority::High.emoji(),
        summary.high_priority_issues,
        Priority::Medium.emoji(),
        summary.medium_priority_issues,
        Priority::Low.emoji(),
        summary.low_priority_issues
    ));

    lines.join("\n")
}

/// Assemble the exported report for one completed run.
pub fn build_run_report(
    timestamp: DateTime<Utc>,
    target: &Target,
    boss_agent: &str,
    worker_agents: Vec<String>,
    workers: &[WorkerResult],
    boss: &BossResult,
) -> RunReport {
    let summary = IssueSummary::from_results(workers);
    let decision_check = check_decision(boss.final_decision, &summary);

    RunReport {
        timestamp,
        target: target.clone(),
        project_structure: ProjectStructure {
            boss_agent: boss_agent.to_string(),
            total_agents: worker_agents.len() + 1,
            worker_agents,
        },
        boss_evaluation: BossEvaluation::from(boss),
        worker_summary: summary,
        worker_results: workers.iter().map(WorkerRecord::from).collect(),
        issues_by_priority: group_by_priority(workers),
        issues_by_risk: group_by_risk(workers),
        decision_check,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn create_test_result(name: &str, risk_level: RiskLevel, priority: Priority) -> WorkerResult {
        WorkerResult {
            agent_name: name.to_string(),
            role: "Reviewer".to_string(),
            evaluation: "Evaluation".to_string(),
            recommendations: vec![format!("{} fix", name)],
            risk_level,
            priority,
        }
    }

    fn summary_for(risks: &[RiskLevel]) -> IssueSummary {
        let results: Vec<_> = risks
            .iter()
            .enumerate()
            .map(|(i, r)| create_test_result(&format!("w{}", i), *r, Priority::Medium))
            .collect();
        IssueSummary::from_results(&results)
    }

    #[test]
    fn test_group_by_risk() {
        let results = vec![
            create_test_result("a", RiskLevel::High, Priority::Low),
            create_test_result("b", RiskLevel::High, Priority::Low),
            create_test_result("c", RiskLevel::Unknown, Priority::High),
        ];

        let groups = group_by_risk(&results);

        assert_eq!(groups.high.len(), 2);
        assert!(groups.medium.is_empty());
        assert!(groups.low.is_empty());
        assert_eq!(groups.unknown.len(), 1);
        assert_eq!(groups.unknown[0].agent, "c");
        assert_eq!(groups.unknown[0].recommendations, vec!["c fix"]);
    }

    #[test]
    fn test_group_by_priority() {
        let results = vec![
            create_test_result("a", RiskLevel::Low, Priority::High),
            create_test_result("b", RiskLevel::Low, Priority::Medium),
            create_test_result("c", RiskLevel::Low, Priority::Low),
        ];

        let groups = group_by_priority(&results);

        assert_eq!(groups.high[0].agent, "a");
        assert_eq!(groups.medium[0].agent, "b");
        assert_eq!(groups.low[0].agent, "c");
        assert!(groups.unknown.is_empty());
    }

    #[test]
    fn test_required_decision() {
        assert_eq!(required_decision(&summary_for(&[])), Decision::Go);
        assert_eq!(
            required_decision(&summary_for(&[RiskLevel::Medium, RiskLevel::Medium, RiskLevel::Low])),
            Decision::Go
        );
        assert_eq!(
            required_decision(&summary_for(&[
                RiskLevel::Medium,
                RiskLevel::Medium,
                RiskLevel::Medium
            ])),
            Decision::NoGo
        );
        assert_eq!(
            required_decision(&summary_for(&[RiskLevel::High])),
            Decision::NoGo
        );
        assert_eq!(
            required_decision(&summary_for(&[RiskLevel::Unknown, RiskLevel::Low])),
            Decision::NoGo
        );
    }

    #[test]
    fn test_check_decision_flags_divergence() {
        let summary = summary_for(&[RiskLevel::High]);

        let check = check_decision(Decision::Go, &summary);
        assert_eq!(check.computed, Decision::NoGo);
        assert!(!check.consistent);

        let check = check_decision(Decision::NoGo, &summary);
        assert!(check.consistent);
    }

    #[test]
    fn test_sort_by_urgency() {
        let results = vec![
            create_test_result("low", RiskLevel::Low, Priority::Low),
            create_test_result("failed", RiskLevel::Unknown, Priority::High),
            create_test_result("high", RiskLevel::High, Priority::High),
            create_test_result("mid", RiskLevel::Medium, Priority::Medium),
        ];

        let names: Vec<_> = sort_by_urgency(&results)
            .iter()
            .map(|r| r.agent_name.as_str())
            .collect();
        assert_eq!(names, vec!["failed", "high", "mid", "low"]);
    }

    #[test]
    fn test_build_run_report() {
        let workers = vec![
            create_test_result("a", RiskLevel::Medium, Priority::High),
            create_test_result("b", RiskLevel::Low, Priority::Low),
        ];
        let boss = BossResult {
            agent_name: "Boss".to_string(),
            role: "Manager".to_string(),
            overall_evaluation: "Overall".to_string(),
            final_decision: Decision::Go,
            risk_analysis: "Fine".to_string(),
            improvement_roadmap: vec!["Ship".to_string()],
            worker_summary: BTreeMap::new(),
        };
        let target = Target {
            url: "https://shop.example".to_string(),
            source_code_url: None,
            description: "Shop".to_string(),
        };

        let report = build_run_report(
            Utc::now(),
            &target,
            "Boss",
            vec!["a".to_string(), "b".to_string()],
            &workers,
            &boss,
        );

        assert_eq!(report.project_structure.total_agents, 3);
        assert_eq!(report.worker_summary.total_workers, 2);
        assert_eq!(report.worker_results.len(), 2);
        assert_eq!(report.worker_results[0].name, "a");
        assert_eq!(report.issues_by_priority.high.len(), 1);
        assert_eq!(report.issues_by_risk.low.len(), 1);
        assert!(report.decision_check.consistent);
        assert_eq!(recommendation_count(&workers), 2);
    }

    #[test]
    fn test_generate_summary_text() {
        let text = generate_summary_text(&summary_for(&[RiskLevel::High, RiskLevel::Unknown]));
        assert!(text.contains("Workers: 2"));
        assert!(text.contains("High: 1"));
        assert!(text.contains("Unknown: 1"));
    }
}
