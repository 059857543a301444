//! Boss aggregator: synthesises worker results into the release decision.

use crate::agent::ollama::{CompletionClient, CompletionRequest};
use crate::agent::prompts::{self, ENGLISH_HEADINGS, JAPANESE_HEADINGS};
use crate::analysis::parser::{Choice, Field, Schema, Section, SectionKind, TextDefault};
use crate::models::{
    BossResult, Decision, EvaluatorIdentity, Language, Target, WorkerResult, WorkerSummary,
};
use std::collections::BTreeMap;
use std::time::Instant;
use tracing::{info, warn};

/// Every `No-Go` spelling contains `Go`, so it must be checked first.
const DECISION_CHOICES: &[Choice] = &[
    Choice {
        label: "No-Go",
        keywords: &[
            "No-Go", "NO-GO", "no-go", "No Go", "NO GO", "no go", "NoGo", "NOGO",
        ],
    },
    Choice {
        label: "Go",
        keywords: &["Go", "GO"],
    },
];

const OVERALL_MARKERS: &[&str] = &[
    ENGLISH_HEADINGS.overall_evaluation,
    "Overall Evaluation",
    JAPANESE_HEADINGS.overall_evaluation,
];
const DECISION_MARKERS: &[&str] = &[
    ENGLISH_HEADINGS.final_decision,
    JAPANESE_HEADINGS.final_decision,
];
const RISK_ANALYSIS_MARKERS: &[&str] = &[
    ENGLISH_HEADINGS.risk_analysis,
    JAPANESE_HEADINGS.risk_analysis,
];
const ROADMAP_MARKERS: &[&str] = &[
    ENGLISH_HEADINGS.improvement_roadmap,
    JAPANESE_HEADINGS.improvement_roadmap,
];

/// Section table for boss responses.
pub fn boss_schema(language: Language) -> Schema {
    let messages = prompts::messages(language);

    Schema::new(vec![
        Section {
            markers: OVERALL_MARKERS,
            field: Field::OverallEvaluation,
            kind: SectionKind::Text {
                default: TextDefault::WholeResponse,
            },
        },
        Section {
            markers: DECISION_MARKERS,
            field: Field::FinalDecision,
            kind: SectionKind::Classify {
                choices: DECISION_CHOICES,
                default: "No-Go",
            },
        },
        Section {
            markers: RISK_ANALYSIS_MARKERS,
            field: Field::RiskAnalysis,
            kind: SectionKind::Text {
                default: TextDefault::Literal(messages.risk_analysis_default),
            },
        },
        Section {
            markers: ROADMAP_MARKERS,
            field: Field::ImprovementRoadmap,
            kind: SectionKind::Bullets {
                placeholder: messages.roadmap_placeholder,
            },
        },
    ])
}

/// Project the worker results into the boss record's summary map.
pub fn summarize_workers(workers: &[WorkerResult]) -> BTreeMap<String, WorkerSummary> {
    workers
        .iter()
        .map(|w| (w.agent_name.clone(), WorkerSummary::from(w)))
        .collect()
}

/// The single synthesis stage of a run.
#[derive(Debug, Clone)]
pub struct Aggregator {
    identity: EvaluatorIdentity,
    language: Language,
    max_tokens: Option<u32>,
    schema: Schema,
}

impl Aggregator {
    pub fn new(identity: EvaluatorIdentity, language: Language) -> Self {
        Self {
            identity,
            language,
            max_tokens: None,
            schema: boss_schema(language),
        }
    }

    pub fn with_max_tokens(mut self, max_tokens: Option<u32>) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn identity(&self) -> &EvaluatorIdentity {
        &self.identity
    }

    /// Aggregate all worker results with one completion call.
    ///
    /// A transport failure forces No-Go: the release gate was never evaluated.
    pub async fn aggregate(
        &self,
        client: &dyn CompletionClient,
        workers: &[WorkerResult],
        target: &Target,
    ) -> BossResult {
        let worker_summary = summarize_workers(workers);
        let request = CompletionRequest {
            model: self.identity.model.clone(),
            prompt: prompts::boss_prompt(workers, target, self.language),
            system_prompt: Some(self.identity.system_prompt.clone()),
            temperature: self.identity.temperature,
            max_tokens: self.max_tokens,
        };

        let start = Instant::now();
        match client.complete(&request).await {
            Ok(response) => {
                let result = self.parse_response(&response, worker_summary);
                info!(
                    boss = %self.identity.name,
                    decision = %result.final_decision,
                    elapsed_secs = start.elapsed().as_secs_f64(),
                    "Integrated evaluation received"
                );
                result
            }
            Err(e) => {
                warn!(boss = %self.identity.name, error = %e, "Integrated evaluation failed");
                self.failed_result(&e.to_string(), worker_summary)
            }
        }
    }

    /// Parse a model response into the boss record.
    pub fn parse_response(
        &self,
        response: &str,
        worker_summary: BTreeMap<String, WorkerSummary>,
    ) -> BossResult {
        let mut parsed = self.schema.parse(response);

        let final_decision = parsed
            .label(Field::FinalDecision)
            .and_then(Decision::from_label)
            .unwrap_or(Decision::NoGo);

        BossResult {
            agent_name: self.identity.name.clone(),
            role: self.identity.role.clone(),
            overall_evaluation: parsed.take_text(Field::OverallEvaluation),
            final_decision,
            risk_analysis: parsed.take_text(Field::RiskAnalysis),
            improvement_roadmap: parsed.take_list(Field::ImprovementRoadmap),
            worker_summary,
        }
    }

    pub fn failed_result(
        &self,
        error: &str,
        worker_summary: BTreeMap<String, WorkerSummary>,
    ) -> BossResult {
        let messages = prompts::messages(self.language);

        BossResult {
            agent_name: self.identity.name.clone(),
            role: self.identity.role.clone(),
            overall_evaluation: format!("{}: {}", messages.boss_evaluation_error, error),
            final_decision: Decision::NoGo,
            risk_analysis: messages.boss_risk_analysis_error.to_string(),
            improvement_roadmap: vec![messages.boss_roadmap_error.to_string()],
            worker_summary,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::worker::tests::{identity, target, CannedClient};
    use crate::models::{Priority, RiskLevel};

    fn workers() -> Vec<WorkerResult> {
        ["Legal", "Product", "Tech"]
            .iter()
            .map(|name| WorkerResult {
                agent_name: name.to_string(),
                role: format!("{} reviewer", name),
                evaluation: format!("{} evaluation", name),
                recommendations: vec![format!("{} fix", name)],
                risk_level: RiskLevel::Low,
                priority: Priority::Medium,
            })
            .collect()
    }

    fn aggregator() -> Aggregator {
        Aggregator::new(identity("Boss"), Language::English)
    }

    const RESPONSE: &str = "## Integrated Evaluation\n\
                            Quality is acceptable across all areas.\n\
                            ## Final Decision\n\
                            Go - no high risks reported\n\
                            ## Risk Analysis\n\
                            Low risk overall.\n\
                            Payment handling is delegated to Stripe.\n\
                            ## Improvement Roadmap\n\
                            - Short term: add receipts\n\
                            - Mid term: loyalty program\n\
                            - Long term: multi-currency\n";

    #[test]
    fn test_aggregate_success() {
        let client = CannedClient::ok(RESPONSE);
        let workers = workers();

        let result = tokio_test::block_on(aggregator().aggregate(&client, &workers, &target()));

        assert_eq!(result.agent_name, "Boss");
        assert_eq!(result.final_decision, Decision::Go);
        assert_eq!(result.overall_evaluation, "Quality is acceptable across all areas.");
        assert_eq!(
            result.risk_analysis,
            "Low risk overall.\nPayment handling is delegated to Stripe."
        );
        assert_eq!(result.improvement_roadmap.len(), 3);
        assert_eq!(result.improvement_roadmap[0], "Short term: add receipts");

        let keys: Vec<_> = result.worker_summary.keys().cloned().collect();
        assert_eq!(keys, vec!["Legal", "Product", "Tech"]);

        let requests = client.requests.lock().unwrap();
        assert_eq!(requests.len(), 1);
        for w in &workers {
            assert!(requests[0].prompt.contains(&w.evaluation));
        }
    }

    #[test]
    fn test_aggregate_failure_forces_no_go() {
        let client = CannedClient::failing("out of memory");
        let workers = workers();

        let result = tokio_test::block_on(aggregator().aggregate(&client, &workers, &target()));

        assert_eq!(result.final_decision, Decision::NoGo);
        assert!(result.overall_evaluation.contains("out of memory"));
        assert_eq!(
            result.risk_analysis,
            "Risk could not be analysed because of the error"
        );
        assert!(!result.improvement_roadmap.is_empty());
        assert_eq!(result.worker_summary.len(), workers.len());
    }

    #[test]
    fn test_no_go_substring() {
        let result = aggregator().parse_response(
            "## Final Decision\nNo-Go - insufficient compliance",
            BTreeMap::new(),
        );
        assert_eq!(result.final_decision, Decision::NoGo);
    }

    #[test]
    fn test_spaced_and_lowercase_no_go() {
        for response in [
            "## Final Decision\nNO GO",
            "## Final Decision\nNo Go - compliance gaps",
            "## Final Decision\nno-go until tax display is fixed",
        ] {
            let result = aggregator().parse_response(response, BTreeMap::new());
            assert_eq!(result.final_decision, Decision::NoGo, "{response}");
        }

        let result = aggregator().parse_response("## Final Decision\nGO", BTreeMap::new());
        assert_eq!(result.final_decision, Decision::Go);
    }

    #[test]
    fn test_missing_decision_defaults_to_no_go() {
        let result = aggregator().parse_response("The release looks promising.", BTreeMap::new());

        assert_eq!(result.final_decision, Decision::NoGo);
        assert_eq!(result.overall_evaluation, "The release looks promising.");
        assert_eq!(result.risk_analysis, "No risk analysis was provided");
        assert_eq!(
            result.improvement_roadmap,
            vec!["A detailed improvement plan is required"]
        );
    }

    #[test]
    fn test_japanese_boss_response() {
        let aggregator = Aggregator::new(identity("Boss"), Language::Japanese);
        let response = "## 統合評価結果\n全体的に良好です。\n\
                        ## 最終判定\nNo-Go - コンプライアンス不足\n\
                        ## リスク分析\n高リスク: 特定商取引法表記なし\n\
                        ## 改善ロードマップ\n- 短期: 表記の追加\n";

        let result = aggregator.parse_response(response, BTreeMap::new());

        assert_eq!(result.overall_evaluation, "全体的に良好です。");
        assert_eq!(result.final_decision, Decision::NoGo);
        assert_eq!(result.risk_analysis, "高リスク: 特定商取引法表記なし");
        assert_eq!(result.improvement_roadmap, vec!["短期: 表記の追加"]);
    }

    #[test]
    fn test_summarize_workers_keys() {
        let workers = workers();
        let summary = summarize_workers(&workers);
        assert_eq!(summary.len(), 3);
        assert_eq!(summary["Tech"].recommendations, vec!["Tech fix"]);
    }
}
