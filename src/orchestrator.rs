//! Run coordination: worker fan-out, barrier, single boss aggregation.

use crate::agent::{Aggregator, CompletionClient, Evaluator};
use crate::analysis::build_run_report;
use crate::config::Roster;
use crate::models::{BossResult, Language, RunReport, Target, WorkerResult};
use chrono::Utc;
use futures::future::join_all;
use indicatif::ProgressBar;
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Structural failures of a run. Transport failures never surface here.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("No worker results were produced; configure at least one worker")]
    NoResults,
}

/// Everything one completed run produced.
#[derive(Debug, Clone)]
pub struct RunOutcome {
    /// One result per configured worker, in roster order.
    pub workers: Vec<WorkerResult>,
    pub boss: BossResult,
    pub report: RunReport,
}

pub struct Orchestrator {
    client: Arc<dyn CompletionClient>,
    workers: Vec<Arc<Evaluator>>,
    boss: Aggregator,
    progress: Option<ProgressBar>,
}

impl Orchestrator {
    pub fn new(client: Arc<dyn CompletionClient>, workers: Vec<Evaluator>, boss: Aggregator) -> Self {
        Self {
            client,
            workers: workers.into_iter().map(Arc::new).collect(),
            boss,
            progress: None,
        }
    }

    /// Build the panel described by a resolved roster.
    pub fn from_roster(
        client: Arc<dyn CompletionClient>,
        roster: &Roster,
        language: Language,
        max_tokens: Option<u32>,
    ) -> Self {
        let workers = roster
            .workers
            .iter()
            .map(|(kind, identity)| {
                Evaluator::new(*kind, identity.clone(), language).with_max_tokens(max_tokens)
            })
            .collect();
        let boss = Aggregator::new(roster.boss.clone(), language).with_max_tokens(max_tokens);

        Self::new(client, workers, boss)
    }

    /// Advance `progress` once per finished worker.
    pub fn with_progress(mut self, progress: ProgressBar) -> Self {
        self.progress = Some(progress);
        self
    }

    pub fn worker_count(&self) -> usize {
        self.workers.len()
    }

    fn worker_names(&self) -> Vec<String> {
        self.workers
            .iter()
            .map(|w| w.identity().name.clone())
            .collect()
    }

    /// Run one full evaluation cycle against `target`.
    pub async fn run(&self, target: &Target) -> Result<RunOutcome, RunError> {
        let start = Instant::now();

        let workers = self.dispatch_workers(target).await;
        if workers.is_empty() {
            return Err(RunError::NoResults);
        }
        info!(
            workers = workers.len(),
            elapsed_secs = start.elapsed().as_secs_f64(),
            "All worker evaluations collected"
        );

        if let Some(ref pb) = self.progress {
            pb.set_message(format!("{} integrating results", self.boss.identity().name));
        }
        let boss = self
            .boss
            .aggregate(self.client.as_ref(), &workers, target)
            .await;

        let report = build_run_report(
            Utc::now(),
            target,
            &self.boss.identity().name,
            self.worker_names(),
            &workers,
            &boss,
        );

        let check = &report.decision_check;
        if !check.consistent {
            warn!(
                stated = %check.stated,
                computed = %check.computed,
                "Boss decision diverges from the release rule"
            );
        }

        info!(
            decision = %boss.final_decision,
            elapsed_secs = start.elapsed().as_secs_f64(),
            "Run complete"
        );

        Ok(RunOutcome {
            workers,
            boss,
            report,
        })
    }

    /// Spawn one task per worker and wait for all of them.
    ///
    /// Results are returned in roster order. A task that panics or is
    /// cancelled is replaced by the worker's failed result.
    async fn dispatch_workers(&self, target: &Target) -> Vec<WorkerResult> {
        debug!(workers = self.workers.len(), "Dispatching worker evaluations");

        let handles: Vec<_> = self
            .workers
            .iter()
            .map(|evaluator| {
                let evaluator = Arc::clone(evaluator);
                let client = Arc::clone(&self.client);
                let target = target.clone();
                let progress = self.progress.clone();

                tokio::spawn(async move {
                    let result = evaluator.evaluate(client.as_ref(), &target).await;
                    if let Some(pb) = progress {
                        pb.inc(1);
                        pb.set_message(format!("{} done", result.agent_name));
                    }
                    result
                })
            })
            .collect();

        join_all(handles)
            .await
            .into_iter()
            .zip(&self.workers)
            .map(|(joined, evaluator)| match joined {
                Ok(result) => result,
                Err(e) => {
                    warn!(
                        worker = %evaluator.identity().name,
                        kind = %evaluator.kind(),
                        error = %e,
                        "Worker task aborted"
                    );
                    if let Some(ref pb) = self.progress {
                        pb.inc(1);
                    }
                    evaluator.failed_result(&e.to_string())
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::ollama::{CompletionError, CompletionRequest};
    use crate::config::EvaluatorKind;
    use crate::models::{Decision, EvaluatorIdentity, Priority, RiskLevel};
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::Mutex;
    use std::time::Duration;
    use tokio::sync::Barrier;

    enum Script {
        Reply(&'static str),
        Fail,
        Panic,
    }

    /// Mock client scripted per model name; records every call.
    struct ScriptedClient {
        scripts: HashMap<String, Script>,
        calls: Mutex<Vec<CompletionRequest>>,
        /// When set, worker calls block until this many are in flight at once.
        gate: Option<Barrier>,
    }

    impl ScriptedClient {
        fn new(scripts: Vec<(&str, Script)>) -> Self {
            Self {
                scripts: scripts
                    .into_iter()
                    .map(|(model, script)| (model.to_string(), script))
                    .collect(),
                calls: Mutex::new(Vec::new()),
                gate: None,
            }
        }

        fn with_gate(mut self, workers: usize) -> Self {
            self.gate = Some(Barrier::new(workers));
            self
        }

        fn calls_for(&self, model: &str) -> Vec<CompletionRequest> {
            self.calls
                .lock()
                .unwrap()
                .iter()
                .filter(|r| r.model == model)
                .cloned()
                .collect()
        }
    }

    #[async_trait]
    impl CompletionClient for ScriptedClient {
        async fn complete(&self, request: &CompletionRequest) -> Result<String, CompletionError> {
            if let Some(gate) = &self.gate {
                if request.model != "model-boss" {
                    gate.wait().await;
                }
            }
            self.calls.lock().unwrap().push(request.clone());
            match self.scripts.get(&request.model) {
                Some(Script::Reply(text)) => Ok(text.to_string()),
                Some(Script::Panic) => panic!("scripted panic for {}", request.model),
                Some(Script::Fail) | None => {
                    Err(CompletionError::Connect("http://localhost:11434".to_string()))
                }
            }
        }
    }

    const WORKER_REPLY: &str = "## Evaluation\nSolid work.\n\
                                ## Recommendations\n- Keep going\n\
                                ## Risk Level\nLow\n\
                                ## Priority\nLow\n";

    const BOSS_GO: &str = "## Integrated Evaluation\nShip it.\n\
                           ## Final Decision\nGo - clean\n\
                           ## Risk Analysis\nNothing notable.\n\
                           ## Improvement Roadmap\n- Monitor\n";

    fn identity(name: &str) -> EvaluatorIdentity {
        EvaluatorIdentity {
            name: name.to_string(),
            role: format!("{} role", name),
            model: format!("model-{}", name),
            temperature: 0.5,
            system_prompt: "system".to_string(),
        }
    }

    fn target() -> Target {
        Target {
            url: "https://shop.example".to_string(),
            source_code_url: None,
            description: "Shop".to_string(),
        }
    }

    fn orchestrator(client: Arc<ScriptedClient>, names: &[&str]) -> Orchestrator {
        let workers = names
            .iter()
            .map(|n| Evaluator::new(EvaluatorKind::General, identity(n), Language::English))
            .collect();
        let boss = Aggregator::new(identity("boss"), Language::English);
        Orchestrator::new(client, workers, boss)
    }

    #[tokio::test]
    async fn test_one_failing_worker_still_aggregates_all() {
        let client = Arc::new(ScriptedClient::new(vec![
            ("model-a", Script::Reply(WORKER_REPLY)),
            ("model-b", Script::Fail),
            ("model-c", Script::Reply(WORKER_REPLY)),
            ("model-boss", Script::Reply(BOSS_GO)),
        ]));

        let outcome = orchestrator(client.clone(), &["a", "b", "c"])
            .run(&target())
            .await
            .unwrap();

        let names: Vec<_> = outcome.workers.iter().map(|w| w.agent_name.as_str()).collect();
        assert_eq!(names, vec!["a", "b", "c"]);

        let failed = &outcome.workers[1];
        assert_eq!(failed.risk_level, RiskLevel::Unknown);
        assert_eq!(failed.priority, Priority::High);
        assert_eq!(outcome.workers[0].risk_level, RiskLevel::Low);

        let boss_calls = client.calls_for("model-boss");
        assert_eq!(boss_calls.len(), 1);
        for name in ["a", "b", "c"] {
            assert!(boss_calls[0].prompt.contains(&format!("## {} ({} role)", name, name)));
        }

        assert_eq!(outcome.boss.worker_summary.len(), 3);
        assert_eq!(outcome.report.worker_summary.total_workers, 3);
        assert_eq!(outcome.report.issues_by_risk.unknown.len(), 1);
        assert_eq!(outcome.report.project_structure.total_agents, 4);
    }

    #[tokio::test]
    async fn test_workers_run_concurrently() {
        // Each worker call waits for all three; a sequential fan-out never finishes.
        let client = Arc::new(
            ScriptedClient::new(vec![
                ("model-a", Script::Reply(WORKER_REPLY)),
                ("model-b", Script::Reply(WORKER_REPLY)),
                ("model-c", Script::Reply(WORKER_REPLY)),
                ("model-boss", Script::Reply(BOSS_GO)),
            ])
            .with_gate(3),
        );
        let orch = orchestrator(client.clone(), &["a", "b", "c"]);

        let outcome = tokio::time::timeout(Duration::from_secs(5), orch.run(&target()))
            .await
            .expect("workers were not dispatched concurrently")
            .unwrap();

        assert_eq!(outcome.workers.len(), 3);
        assert!(outcome.workers.iter().all(|w| w.risk_level == RiskLevel::Low));
        assert_eq!(outcome.boss.final_decision, Decision::Go);
        assert_eq!(client.calls_for("model-boss").len(), 1);
    }

    #[tokio::test]
    async fn test_panicking_worker_degrades_in_its_slot() {
        let client = Arc::new(ScriptedClient::new(vec![
            ("model-a", Script::Panic),
            ("model-b", Script::Reply(WORKER_REPLY)),
            ("model-boss", Script::Reply(BOSS_GO)),
        ]));

        let outcome = orchestrator(client.clone(), &["a", "b"])
            .run(&target())
            .await
            .unwrap();

        assert_eq!(outcome.workers.len(), 2);
        assert_eq!(outcome.workers[0].agent_name, "a");
        assert_eq!(outcome.workers[0].risk_level, RiskLevel::Unknown);
        assert_eq!(outcome.workers[0].priority, Priority::High);
        assert_eq!(outcome.workers[1].risk_level, RiskLevel::Low);
        assert_eq!(client.calls_for("model-boss").len(), 1);
    }

    #[tokio::test]
    async fn test_empty_roster_is_no_results() {
        let client = Arc::new(ScriptedClient::new(vec![(
            "model-boss",
            Script::Reply(BOSS_GO),
        )]));

        let result = orchestrator(client.clone(), &[]).run(&target()).await;

        assert!(matches!(result, Err(RunError::NoResults)));
        assert!(client.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_divergent_decision_is_recorded_not_overridden() {
        const HIGH_RISK: &str = "## Evaluation\nNo privacy policy.\n\
                                 ## Risk Level\nHigh\n## Priority\nHigh\n";
        let client = Arc::new(ScriptedClient::new(vec![
            ("model-a", Script::Reply(HIGH_RISK)),
            ("model-boss", Script::Reply(BOSS_GO)),
        ]));

        let outcome = orchestrator(client, &["a"]).run(&target()).await.unwrap();

        assert_eq!(outcome.boss.final_decision, Decision::Go);
        let check = outcome.report.decision_check;
        assert_eq!(check.stated, Decision::Go);
        assert_eq!(check.computed, Decision::NoGo);
        assert!(!check.consistent);
    }

    #[tokio::test]
    async fn test_failing_boss_forces_no_go() {
        let client = Arc::new(ScriptedClient::new(vec![
            ("model-a", Script::Reply(WORKER_REPLY)),
            ("model-boss", Script::Fail),
        ]));

        let outcome = orchestrator(client, &["a"]).run(&target()).await.unwrap();

        assert_eq!(outcome.boss.final_decision, Decision::NoGo);
        assert!(outcome.boss.overall_evaluation.contains("Cannot connect to Ollama"));
        assert_eq!(outcome.boss.worker_summary.len(), 1);
    }

    #[tokio::test]
    async fn test_progress_advances_per_worker() {
        let client = Arc::new(ScriptedClient::new(vec![
            ("model-a", Script::Reply(WORKER_REPLY)),
            ("model-b", Script::Fail),
            ("model-boss", Script::Reply(BOSS_GO)),
        ]));
        let progress = ProgressBar::hidden();
        progress.set_length(2);

        let orchestrator = orchestrator(client, &["a", "b"]).with_progress(progress.clone());
        assert_eq!(orchestrator.worker_count(), 2);
        orchestrator.run(&target()).await.unwrap();

        assert_eq!(progress.position(), 2);
    }
}
