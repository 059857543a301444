//! Worker evaluator: one specialty reviewer.

use crate::agent::ollama::{CompletionClient, CompletionRequest};
use crate::agent::prompts::{self, ENGLISH_HEADINGS, JAPANESE_HEADINGS};
use crate::analysis::parser::{Choice, Field, Schema, Section, SectionKind, TextDefault};
use crate::config::EvaluatorKind;
use crate::models::{EvaluatorIdentity, Language, Priority, RiskLevel, Target, WorkerResult};
use std::time::Instant;
use tracing::{info, warn};

/// Classification keywords, checked High before Low before Medium.
pub(crate) const LEVEL_CHOICES: &[Choice] = &[
    Choice {
        label: "High",
        keywords: &["High", "HIGH", "high", "高"],
    },
    Choice {
        label: "Low",
        keywords: &["Low", "LOW", "low", "低"],
    },
    Choice {
        label: "Medium",
        keywords: &["Medium", "MEDIUM", "medium", "中"],
    },
];

const EVALUATION_MARKERS: &[&str] = &[ENGLISH_HEADINGS.evaluation, JAPANESE_HEADINGS.evaluation];
const RECOMMENDATION_MARKERS: &[&str] = &[
    ENGLISH_HEADINGS.recommendations,
    JAPANESE_HEADINGS.recommendations,
];
const RISK_LEVEL_MARKERS: &[&str] = &[ENGLISH_HEADINGS.risk_level, JAPANESE_HEADINGS.risk_level];
const PRIORITY_MARKERS: &[&str] = &[ENGLISH_HEADINGS.priority, JAPANESE_HEADINGS.priority];

/// Section table for worker responses.
pub fn worker_schema(language: Language) -> Schema {
    let messages = prompts::messages(language);

    Schema::new(vec![
        Section {
            markers: EVALUATION_MARKERS,
            field: Field::Evaluation,
            kind: SectionKind::Text {
                default: TextDefault::WholeResponse,
            },
        },
        Section {
            markers: RECOMMENDATION_MARKERS,
            field: Field::Recommendations,
            kind: SectionKind::Bullets {
                placeholder: messages.recommendation_placeholder,
            },
        },
        Section {
            markers: RISK_LEVEL_MARKERS,
            field: Field::RiskLevel,
            kind: SectionKind::Classify {
                choices: LEVEL_CHOICES,
                default: "Medium",
            },
        },
        Section {
            markers: PRIORITY_MARKERS,
            field: Field::Priority,
            kind: SectionKind::Classify {
                choices: LEVEL_CHOICES,
                default: "Medium",
            },
        },
    ])
}

/// One specialist on the panel.
#[derive(Debug, Clone)]
pub struct Evaluator {
    kind: EvaluatorKind,
    identity: EvaluatorIdentity,
    language: Language,
    max_tokens: Option<u32>,
    schema: Schema,
}

impl Evaluator {
    pub fn new(kind: EvaluatorKind, identity: EvaluatorIdentity, language: Language) -> Self {
        Self {
            kind,
            identity,
            language,
            max_tokens: None,
            schema: worker_schema(language),
        }
    }

    pub fn with_max_tokens(mut self, max_tokens: Option<u32>) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn kind(&self) -> EvaluatorKind {
        self.kind
    }

    pub fn identity(&self) -> &EvaluatorIdentity {
        &self.identity
    }

    /// Evaluate the target. Never fails: transport errors yield a degraded result.
    pub async fn evaluate(&self, client: &dyn CompletionClient, target: &Target) -> WorkerResult {
        let request = CompletionRequest {
            model: self.identity.model.clone(),
            prompt: prompts::worker_prompt(target, &self.identity.role, self.language),
            system_prompt: Some(self.identity.system_prompt.clone()),
            temperature: self.identity.temperature,
            max_tokens: self.max_tokens,
        };

        let start = Instant::now();
        match client.complete(&request).await {
            Ok(response) => {
                info!(
                    worker = %self.identity.name,
                    kind = %self.kind,
                    elapsed_secs = start.elapsed().as_secs_f64(),
                    "Worker evaluation received"
                );
                self.parse_response(&response)
            }
            Err(e) => {
                warn!(worker = %self.identity.name, error = %e, "Worker evaluation failed");
                self.failed_result(&e.to_string())
            }
        }
    }

    /// Parse a model response into this worker's result.
    pub fn parse_response(&self, response: &str) -> WorkerResult {
        let mut parsed = self.schema.parse(response);

        let risk_level = parsed
            .label(Field::RiskLevel)
            .and_then(RiskLevel::from_label)
            .unwrap_or(RiskLevel::Medium);
        let priority = parsed
            .label(Field::Priority)
            .and_then(Priority::from_label)
            .unwrap_or(Priority::Medium);

        WorkerResult {
            agent_name: self.identity.name.clone(),
            role: self.identity.role.clone(),
            evaluation: parsed.take_text(Field::Evaluation),
            recommendations: parsed.take_list(Field::Recommendations),
            risk_level,
            priority,
        }
    }

    /// Result standing in for an evaluation that could not be performed.
    ///
    /// An unexamined specialty is treated as urgent: risk Unknown, priority High.
    pub fn failed_result(&self, error: &str) -> WorkerResult {
        let messages = prompts::messages(self.language);

        WorkerResult {
            agent_name: self.identity.name.clone(),
            role: self.identity.role.clone(),
            evaluation: format!("{}: {}", messages.evaluation_error, error),
            recommendations: vec![
                messages.retry_request.to_string(),
                format!("{}: {}", messages.error_detail, error),
            ],
            risk_level: RiskLevel::Unknown,
            priority: Priority::High,
        }
    }
}
