//! Prompt text, section headings and default personas.
//!
//! Everything the panel says to the model, and every synthetic string it
//! substitutes for missing model output, lives here in both supported
//! languages.

use crate::config::EvaluatorKind;
use crate::models::{Language, Target, WorkerResult};

/// Section headings requested from (and recognised in) model responses.
#[derive(Debug, Clone, Copy)]
pub struct Headings {
    pub evaluation: &'static str,
    pub recommendations: &'static str,
    pub risk_level: &'static str,
    pub priority: &'static str,
    pub overall_evaluation: &'static str,
    pub final_decision: &'static str,
    pub risk_analysis: &'static str,
    pub improvement_roadmap: &'static str,
}

pub const ENGLISH_HEADINGS: Headings = Headings {
    evaluation: "Evaluation",
    recommendations: "Recommendations",
    risk_level: "Risk Level",
    priority: "Priority",
    overall_evaluation: "Integrated Evaluation",
    final_decision: "Final Decision",
    risk_analysis: "Risk Analysis",
    improvement_roadmap: "Improvement Roadmap",
};

pub const JAPANESE_HEADINGS: Headings = Headings {
    evaluation: "評価結果",
    recommendations: "推奨事項",
    risk_level: "リスクレベル",
    priority: "優先度",
    overall_evaluation: "統合評価結果",
    final_decision: "最終判定",
    risk_analysis: "リスク分析",
    improvement_roadmap: "改善ロードマップ",
};

/// Synthetic text substituted for missing or failed model output.
#[derive(Debug, Clone, Copy)]
pub struct Messages {
    pub recommendation_placeholder: &'static str,
    pub evaluation_error: &'static str,
    pub retry_request: &'static str,
    pub error_detail: &'static str,
    pub boss_evaluation_error: &'static str,
    pub boss_risk_analysis_error: &'static str,
    pub boss_roadmap_error: &'static str,
    pub risk_analysis_default: &'static str,
    pub roadmap_placeholder: &'static str,
}

const ENGLISH_MESSAGES: Messages = Messages {
    recommendation_placeholder: "Further detailed evaluation is required",
    evaluation_error: "An error occurred during evaluation",
    retry_request: "Re-run the evaluation after the system error is resolved",
    error_detail: "Error detail",
    boss_evaluation_error: "An error occurred during the integrated evaluation",
    boss_risk_analysis_error: "Risk could not be analysed because of the error",
    boss_roadmap_error: "Resolve the system error and re-run the evaluation",
    risk_analysis_default: "No risk analysis was provided",
    roadmap_placeholder: "A detailed improvement plan is required",
};

const JAPANESE_MESSAGES: Messages = Messages {
    recommendation_placeholder: "詳細な評価が必要です",
    evaluation_error: "評価中にエラーが発生しました",
    retry_request: "システムエラーのため評価を再実行してください",
    error_detail: "エラー詳細",
    boss_evaluation_error: "BOSS評価中にエラーが発生しました",
    boss_risk_analysis_error: "エラーにより評価できません",
    boss_roadmap_error: "システムエラーの解決が必要です",
    risk_analysis_default: "リスク分析は提示されませんでした",
    roadmap_placeholder: "詳細な改善計画が必要です",
};

pub fn headings(language: Language) -> &'static Headings {
    match language {
        Language::English => &ENGLISH_HEADINGS,
        Language::Japanese => &JAPANESE_HEADINGS,
    }
}

pub fn messages(language: Language) -> &'static Messages {
    match language {
        Language::English => &ENGLISH_MESSAGES,
        Language::Japanese => &JAPANESE_MESSAGES,
    }
}

fn target_header(target: &Target, language: Language) -> String {
    let (app, source, overview) = match language {
        Language::English => ("Target application", "Source code", "Overview"),
        Language::Japanese => ("対象アプリケーション", "ソースコード", "概要"),
    };

    let mut header = format!("{}: {}\n", app, target.url);
    if let Some(ref source_url) = target.source_code_url {
        header.push_str(&format!("{}: {}\n", source, source_url));
    }
    header.push_str(&format!("{}: {}\n", overview, target.description));
    header
}

/// Prompt asking one worker for its four-section evaluation.
pub fn worker_prompt(target: &Target, role: &str, language: Language) -> String {
    let h = headings(language);
    let mut prompt = target_header(target, language);

    match language {
        Language::English => {
            prompt.push_str(&format!("\nYour role: {}\n\n", role));
            prompt.push_str(
                "Evaluate the application above from your specialty and answer in exactly this format:\n\n",
            );
            prompt.push_str(&format!(
                "## {}\n[Assessment from your specialty]\n\n\
                 ## {}\n- [Improvement 1]\n- [Improvement 2]\n\n\
                 ## {}\n[High/Medium/Low] - [Reason]\n\n\
                 ## {}\n[High/Medium/Low] - [Reason]",
                h.evaluation, h.recommendations, h.risk_level, h.priority
            ));
        }
        Language::Japanese => {
            prompt.push_str(&format!("\nあなたの役割: {}\n\n", role));
            prompt.push_str("上記のアプリケーションについて評価し、以下の形式で回答してください：\n\n");
            prompt.push_str(&format!(
                "## {}\n[専門分野での評価]\n\n\
                 ## {}\n- [改善提案1]\n- [改善提案2]\n\n\
                 ## {}\n[高/中/低] - [理由]\n\n\
                 ## {}\n[高/中/低] - [理由]",
                h.evaluation, h.recommendations, h.risk_level, h.priority
            ));
        }
    }

    prompt
}

/// Render one worker result as it is shown to the boss.
pub fn render_worker_block(result: &WorkerResult, language: Language) -> String {
    let (evaluation, recommendations, risk_level, priority) = match language {
        Language::English => ("Evaluation", "Recommendations", "Risk level", "Priority"),
        Language::Japanese => ("評価", "推奨事項", "リスクレベル", "優先度"),
    };

    format!(
        "## {} ({})\n{}: {}\n{}: {}\n{}: {}\n{}: {}",
        result.agent_name,
        result.role,
        evaluation,
        result.evaluation,
        recommendations,
        result.recommendations.join(", "),
        risk_level,
        result.risk_level.label(language),
        priority,
        result.priority.label(language),
    )
}

/// Synthesis prompt carrying every worker result and the release rule.
pub fn boss_prompt(workers: &[WorkerResult], target: &Target, language: Language) -> String {
    let h = headings(language);
    let blocks = workers
        .iter()
        .map(|w| render_worker_block(w, language))
        .collect::<Vec<_>>()
        .join("\n\n");

    let mut prompt = target_header(target, language);

    match language {
        Language::English => {
            prompt.push_str("\n## Worker Evaluations\n\n");
            prompt.push_str(&blocks);
            prompt.push_str(
                "\n\nIntegrate the worker evaluations above and give the final assessment.\n\
                 Release rule: decide Go only if no worker reports High risk and at most two \
                 workers report Medium risk; otherwise decide No-Go.\n\
                 Answer in exactly this format:\n\n",
            );
            prompt.push_str(&format!(
                "## {}\n[Overall quality of the project]\n\n\
                 ## {}\n[Go/No-Go] - [Reason]\n\n\
                 ## {}\n[Detailed analysis of High/Medium/Low risks]\n\n\
                 ## {}\n- [Short-term item]\n- [Mid-term item]\n- [Long-term item]",
                h.overall_evaluation, h.final_decision, h.risk_analysis, h.improvement_roadmap
            ));
        }
        Language::Japanese => {
            prompt.push_str("\n## Workerエージェントの評価結果\n\n");
            prompt.push_str(&blocks);
            prompt.push_str(
                "\n\n上記のWorkerエージェントの評価結果を統合し、最終評価を行ってください。\n\
                 リリース判定基準: 高リスクが0件かつ中リスクが2件以下の場合のみGo、それ以外はNo-Goとしてください。\n\
                 以下の形式で回答してください：\n\n",
            );
            prompt.push_str(&format!(
                "## {}\n[プロジェクト全体の品質評価]\n\n\
                 ## {}\n[Go/No-Go] - [理由]\n\n\
                 ## {}\n[高/中/低リスクの詳細分析]\n\n\
                 ## {}\n- [短期改善項目]\n- [中期改善項目]\n- [長期改善項目]",
                h.overall_evaluation, h.final_decision, h.risk_analysis, h.improvement_roadmap
            ));
        }
    }

    prompt
}

/// Default persona for an evaluator; configuration may override any field.
#[derive(Debug, Clone, Copy)]
pub struct Persona {
    pub name: &'static str,
    pub role: &'static str,
    pub model: &'static str,
    pub system_prompt: &'static str,
}

const ELYZA_MODEL: &str = "pakachan/elyza-llama3-8b:latest";

pub fn boss_persona(language: Language) -> Persona {
    match language {
        Language::English => Persona {
            name: "BOSS_Agent",
            role: "Project lead and quality assurance manager",
            model: ELYZA_MODEL,
            system_prompt: "You are the BOSS agent who leads the whole project.\n\
                Integrate the evaluations of the worker agents and decide on quality assurance and release.\n\n\
                Responsibilities:\n\
                1. Analyse and integrate every worker evaluation\n\
                2. Judge the overall quality level of the project\n\
                3. Make the final release decision (Go/No-Go)\n\
                4. Draw up an improvement roadmap\n\
                5. Assess risks and assign priorities\n\n\
                Evaluation criteria:\n\
                - Legal compliance (high risk)\n\
                - Business value (medium risk)\n\
                - Technical quality (medium risk)\n\
                - User experience (low risk)",
        },
        Language::Japanese => Persona {
            name: "BOSS_Agent",
            role: "プロジェクト統括・品質保証マネージャー",
            model: ELYZA_MODEL,
            system_prompt: "あなたはプロジェクト全体を統括するBOSSエージェントです。\n\
                各Workerエージェントの評価結果を統合し、プロジェクトの品質保証とリリース判定を行います。\n\n\
                主要な役割:\n\
                1. 各Workerエージェントの評価結果を分析・統合\n\
                2. プロジェクト全体の品質レベルを判定\n\
                3. リリース判定（Go/No-Go）の最終決定\n\
                4. 改善ロードマップの策定\n\
                5. リスク評価と優先度付け\n\n\
                評価基準:\n\
                - 法的コンプライアンス（高リスク）\n\
                - ビジネス価値（中リスク）\n\
                - 技術的品質（中リスク）\n\
                - ユーザー体験（低リスク）",
        },
    }
}

pub fn worker_persona(kind: EvaluatorKind, language: Language) -> Persona {
    match (kind, language) {
        (EvaluatorKind::IstqbCompliance, Language::English) => Persona {
            name: "ISTQB_Compliance_Worker",
            role: "ISTQB conformance and regulatory compliance reviewer",
            model: ELYZA_MODEL,
            system_prompt: "You are an ISTQB-certified quality assurance specialist.\n\
                Evaluate the legal requirements and security standards of the e-commerce application.\n\n\
                Evaluation items:\n\
                1. PCI DSS compliance\n\
                2. Conformance with personal information protection law\n\
                3. Conformance with specified commercial transaction law\n\n\
                Describe the evaluation, recommendations, risk level and priority concisely.",
        },
        (EvaluatorKind::IstqbCompliance, Language::Japanese) => Persona {
            name: "ISTQB_Compliance_Worker",
            role: "ISTQB準拠・法規制コンプライアンス確認者",
            model: ELYZA_MODEL,
            system_prompt: "あなたはISTQB準拠の品質保証専門家です。\n\
                eコマースアプリケーションの法的要件とセキュリティ標準を評価してください。\n\n\
                評価項目:\n\
                1. PCI DSS準拠状況\n\
                2. 個人情報保護法への適合性\n\
                3. 特定商取引法への準拠\n\n\
                出力形式: 評価結果、推奨事項、リスクレベル、優先度を簡潔に記述してください。",
        },
        (EvaluatorKind::ManagementRequirements, Language::English) => Persona {
            name: "Management_Requirements_Worker",
            role: "Management and customer requirements reviewer",
            model: "gemma3:latest",
            system_prompt: "You are a project manager.\n\
                Evaluate the business requirements and customer value of the e-commerce application.\n\n\
                Evaluation items:\n\
                1. Revenue goals supported by the Stripe payment integration\n\
                2. Implementation of the Japan-only market strategy\n\
                3. Features that improve the user experience\n\n\
                Describe the evaluation, recommendations, risk level and priority concisely.",
        },
        (EvaluatorKind::ManagementRequirements, Language::Japanese) => Persona {
            name: "Management_Requirements_Worker",
            role: "マネジメント・顧客要件確認者",
            model: "gemma3:latest",
            system_prompt: "あなたはプロジェクトマネージャーです。\n\
                eコマースアプリケーションのビジネス要件と顧客価値を評価してください。\n\n\
                評価項目:\n\
                1. Stripe決済統合による売上向上目標\n\
                2. 日本市場限定戦略の実装\n\
                3. ユーザー体験向上に寄与する機能\n\n\
                出力形式: 評価結果、推奨事項、リスクレベル、優先度を簡潔に記述してください。",
        },
        (EvaluatorKind::TechnicalAnalyst, Language::English) => Persona {
            name: "Technical_Analyst_Worker",
            role: "Test analyst and technical reviewer",
            model: "llama3.2:latest",
            system_prompt: "You are a test analyst with deep technical expertise.\n\
                Evaluate the technical quality and maintainability of the e-commerce application.\n\n\
                Evaluation items:\n\
                1. Suitability of the frontend technology stack\n\
                2. Implementation quality of the Stripe API integration\n\
                3. Performance and security\n\n\
                Describe the evaluation, recommendations, risk level and priority concisely.",
        },
        (EvaluatorKind::TechnicalAnalyst, Language::Japanese) => Persona {
            name: "Technical_Analyst_Worker",
            role: "テストアナリスト・技術者視点評価者",
            model: "llama3.2:latest",
            system_prompt: "あなたは技術的専門知識を持つテストアナリストです。\n\
                eコマースアプリケーションの技術的品質と保守性を評価してください。\n\n\
                評価項目:\n\
                1. フロントエンド技術スタックの適切性\n\
                2. Stripe API統合の技術的実装品質\n\
                3. パフォーマンスとセキュリティ\n\n\
                出力形式: 評価結果、推奨事項、リスクレベル、優先度を簡潔に記述してください。",
        },
        (EvaluatorKind::General, Language::English) => Persona {
            name: "General_Reviewer_Worker",
            role: "General application reviewer",
            model: "llama3.2:latest",
            system_prompt: "You are an experienced software reviewer.\n\
                Evaluate the application from the perspective given in your role.\n\n\
                Describe the evaluation, recommendations, risk level and priority concisely.",
        },
        (EvaluatorKind::General, Language::Japanese) => Persona {
            name: "General_Reviewer_Worker",
            role: "総合レビュー担当者",
            model: "llama3.2:latest",
            system_prompt: "あなたは経験豊富なソフトウェアレビュアーです。\n\
                あなたの役割の観点からアプリケーションを評価してください。\n\n\
                出力形式: 評価結果、推奨事項、リスクレベル、優先度を簡潔に記述してください。",
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Priority, RiskLevel};

    fn target() -> Target {
        Target {
            url: "https://shop.example".to_string(),
            source_code_url: Some("https://github.com/example/shop".to_string()),
            description: "Stripe checkout in JPY".to_string(),
        }
    }

    fn worker() -> WorkerResult {
        WorkerResult {
            agent_name: "Compliance_Worker".to_string(),
            role: "Regulatory reviewer".to_string(),
            evaluation: "Card data never touches our servers.".to_string(),
            recommendations: vec![
                "Publish a privacy policy".to_string(),
                "Show the seller address".to_string(),
            ],
            risk_level: RiskLevel::High,
            priority: Priority::Low,
        }
    }

    #[test]
    fn test_worker_block_contains_each_field_once() {
        let result = worker();
        let block = render_worker_block(&result, Language::English);

        let joined = result.recommendations.join(", ");
        for field in [
            result.role.as_str(),
            result.evaluation.as_str(),
            joined.as_str(),
            "Risk level: High",
            "Priority: Low",
        ] {
            assert_eq!(block.matches(field).count(), 1, "{} in {}", field, block);
        }
    }

    #[test]
    fn test_worker_prompt_requests_four_sections() {
        let prompt = worker_prompt(&target(), "Regulatory reviewer", Language::English);

        assert!(prompt.contains("https://shop.example"));
        assert!(prompt.contains("https://github.com/example/shop"));
        assert!(prompt.contains("Stripe checkout in JPY"));
        assert!(prompt.contains("Your role: Regulatory reviewer"));
        for heading in ["## Evaluation", "## Recommendations", "## Risk Level", "## Priority"] {
            assert!(prompt.contains(heading), "missing {}", heading);
        }
    }

    #[test]
    fn test_japanese_worker_prompt() {
        let prompt = worker_prompt(&target(), "確認者", Language::Japanese);
        assert!(prompt.contains("あなたの役割: 確認者"));
        assert!(prompt.contains("## 評価結果"));
        assert!(prompt.contains("## 優先度"));
    }

    #[test]
    fn test_boss_prompt_carries_workers_and_rule() {
        let prompt = boss_prompt(&[worker()], &target(), Language::English);

        assert!(prompt.contains("## Compliance_Worker (Regulatory reviewer)"));
        assert!(prompt.contains("Publish a privacy policy, Show the seller address"));
        assert!(prompt.contains("at most two"));
        assert!(prompt.contains("## Final Decision"));
        assert!(prompt.contains("## Improvement Roadmap"));
    }

    #[test]
    fn test_japanese_labels_in_block() {
        let block = render_worker_block(&worker(), Language::Japanese);
        assert!(block.contains("リスクレベル: 高"));
        assert!(block.contains("優先度: 低"));
    }

    #[test]
    fn test_personas_have_distinct_names() {
        let kinds = [
            EvaluatorKind::IstqbCompliance,
            EvaluatorKind::ManagementRequirements,
            EvaluatorKind::TechnicalAnalyst,
            EvaluatorKind::General,
        ];
        let mut names: Vec<_> = kinds
            .iter()
            .map(|k| worker_persona(*k, Language::English).name)
            .collect();
        names.push(boss_persona(Language::English).name);
        names.sort();
        names.dedup();
        assert_eq!(names.len(), 5);
    }
}
