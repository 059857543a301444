//! Terminal rendering of a finished run and of the panel layout.

use crate::analysis::{generate_summary_text, recommendation_count, MAX_MEDIUM_RISK_FOR_GO};
use crate::config::Roster;
use crate::models::Language;
use crate::orchestrator::RunOutcome;
use std::fmt::Write;

/// Render the worker evaluations and the boss verdict for the terminal.
pub fn render_results(outcome: &RunOutcome, language: Language) -> String {
    let mut output = String::new();

    output.push_str("📋 Worker Evaluations:\n");
    for worker in &outcome.workers {
        let _ = writeln!(
            output,
            "\n   {} {} ({})",
            worker.risk_level.emoji(),
            worker.agent_name,
            worker.role
        );
        let _ = writeln!(
            output,
            "      Risk: {} | Priority: {} {}",
            worker.risk_level.label(language),
            worker.priority.emoji(),
            worker.priority.label(language)
        );
        for rec in &worker.recommendations {
            let _ = writeln!(output, "      - {}", rec);
        }
    }

    let boss = &outcome.boss;
    let _ = writeln!(
        output,
        "\n🎯 Final Decision: {} {}",
        boss.final_decision.emoji(),
        boss.final_decision
    );
    let _ = writeln!(output, "\n   {}", indent(&boss.overall_evaluation));

    let _ = writeln!(output, "\n⚠️  Risk Analysis:");
    let _ = writeln!(output, "   {}", indent(&boss.risk_analysis));

    output.push_str("\n🛣️  Improvement Roadmap:\n");
    for (i, item) in boss.improvement_roadmap.iter().enumerate() {
        let _ = writeln!(output, "   {}. {}", i + 1, item);
    }

    let report = &outcome.report;
    output.push_str("\n📊 Summary:\n");
    for line in generate_summary_text(&report.worker_summary).lines() {
        let _ = writeln!(output, "   {}", line);
    }
    let _ = writeln!(
        output,
        "   Recommendations: {}",
        recommendation_count(&outcome.workers)
    );

    if !report.decision_check.consistent {
        let _ = writeln!(
            output,
            "\n⚠️  The release rule calls for {} given the worker risk levels.",
            report.decision_check.computed
        );
    }

    output
}

/// Render the boss/worker layout and the order in which a run proceeds.
pub fn render_structure(roster: &Roster) -> String {
    let mut output = String::new();

    output.push_str("🏛️  Panel structure\n\n");
    let _ = writeln!(
        output,
        "👑 Boss: {} ({}, model {})",
        roster.boss.name, roster.boss.role, roster.boss.model
    );
    output.push_str("   ↑ integrates and decides\n");

    if roster.workers.is_empty() {
        output.push_str("🔧 Workers: none configured\n");
    } else {
        output.push_str("🔧 Workers:\n");
        for (kind, worker) in &roster.workers {
            let _ = writeln!(
                output,
                "   • {} [{}] ({}, model {})",
                worker.name, kind, worker.role, worker.model
            );
        }
    }

    output.push_str("\nProcessing flow:\n");
    let _ = writeln!(
        output,
        "   1. {} workers evaluate the target in parallel",
        roster.workers.len()
    );
    output.push_str("   2. The boss integrates their results and analyses risk\n");
    output.push_str("   3. The boss issues a Go/No-Go decision and an improvement roadmap\n");
    let _ = writeln!(
        output,
        "\nRelease rule: Go requires no High or Unknown risk and at most {} Medium.",
        MAX_MEDIUM_RISK_FOR_GO
    );

    output
}

fn indent(text: &str) -> String {
    text.replace('\n', "\n   ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::build_run_report;
    use crate::config::EvaluatorKind;
    use crate::models::{
        BossResult, Decision, EvaluatorIdentity, Priority, RiskLevel, Target, WorkerResult,
    };
    use chrono::Utc;
    use std::collections::BTreeMap;

    fn identity(name: &str, model: &str) -> EvaluatorIdentity {
        EvaluatorIdentity {
            name: name.to_string(),
            role: format!("{} role", name),
            model: model.to_string(),
            temperature: 0.5,
            system_prompt: "system".to_string(),
        }
    }

    fn create_test_outcome(decision: Decision) -> RunOutcome {
        let workers = vec![
            WorkerResult {
                agent_name: "Legal".to_string(),
                role: "Legal role".to_string(),
                evaluation: "Missing terms page.".to_string(),
                recommendations: vec!["Publish terms".to_string()],
                risk_level: RiskLevel::High,
                priority: Priority::High,
            },
            WorkerResult {
                agent_name: "Tech".to_string(),
                role: "Tech role".to_string(),
                evaluation: "Fast.".to_string(),
                recommendations: vec!["Add caching".to_string()],
                risk_level: RiskLevel::Low,
                priority: Priority::Low,
            },
        ];
        let boss = BossResult {
            agent_name: "BOSS_Agent".to_string(),
            role: "Lead".to_string(),
            overall_evaluation: "Mostly ready.\nOne legal gap.".to_string(),
            final_decision: decision,
            risk_analysis: "Terms of service are absent.\nFines are possible.".to_string(),
            improvement_roadmap: vec!["Publish terms".to_string()],
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
            "BOSS_Agent",
            vec!["Legal".to_string(), "Tech".to_string()],
            &workers,
            &boss,
        );

        RunOutcome {
            workers,
            boss,
            report,
        }
    }

    #[test]
    fn test_results_include_risk_analysis() {
        let text = render_results(&create_test_outcome(Decision::NoGo), Language::English);

        assert!(text.contains("Risk Analysis:"));
        assert!(text.contains("   Terms of service are absent.\n   Fines are possible."));
        assert!(text.contains("Final Decision: ⛔ No-Go"));
        assert!(text.contains("   1. Publish terms"));
        assert!(text.contains("Recommendations: 2"));
        assert!(!text.contains("release rule calls for"));
    }

    #[test]
    fn test_results_flag_divergent_decision() {
        let text = render_results(&create_test_outcome(Decision::Go), Language::English);
        assert!(text.contains("The release rule calls for No-Go"));
    }

    #[test]
    fn test_structure_lists_roster_and_flow() {
        let roster = Roster {
            boss: identity("BOSS_Agent", "llama3.2:latest"),
            workers: vec![
                (
                    EvaluatorKind::IstqbCompliance,
                    identity("ISTQB_Worker", "qwen2.5:7b"),
                ),
                (EvaluatorKind::General, identity("A11y_Worker", "mistral")),
            ],
        };

        let text = render_structure(&roster);

        assert!(text.contains("Boss: BOSS_Agent (BOSS_Agent role, model llama3.2:latest)"));
        assert!(text.contains("• ISTQB_Worker [istqb_compliance]"));
        assert!(text.contains("• A11y_Worker [general] (A11y_Worker role, model mistral)"));
        assert!(text.contains("1. 2 workers evaluate the target in parallel"));
        assert!(text.contains("at most 2 Medium"));
    }

    #[test]
    fn test_structure_with_empty_roster() {
        let roster = Roster {
            boss: identity("BOSS_Agent", "llama3.2:latest"),
            workers: Vec::new(),
        };
        assert!(render_structure(&roster).contains("Workers: none configured"));
    }
}
