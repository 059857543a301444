//! Configuration file handling.
//!
//! This module handles loading and merging configuration from
//! `.releasegate.toml` files, and resolves the configured roster into
//! evaluator identities.

use crate::agent::prompts::{boss_persona, worker_persona, Persona};
use crate::models::{EvaluatorIdentity, Language, Target};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use thiserror::Error;

/// Default configuration file name.
pub const CONFIG_FILE: &str = ".releasegate.toml";

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Prompt language.
    #[serde(default)]
    pub language: Language,

    /// Ollama connection settings.
    #[serde(default)]
    pub ollama: OllamaConfig,

    /// Application under review.
    #[serde(default)]
    pub target: TargetConfig,

    /// Report settings.
    #[serde(default)]
    pub report: ReportConfig,

    /// The aggregating evaluator.
    #[serde(default)]
    pub boss: BossConfig,

    /// The specialist evaluators.
    #[serde(default = "default_workers")]
    pub workers: Vec<WorkerConfig>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            language: Language::default(),
            ollama: OllamaConfig::default(),
            target: TargetConfig::default(),
            report: ReportConfig::default(),
            boss: BossConfig::default(),
            workers: default_workers(),
        }
    }
}

/// Ollama connection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OllamaConfig {
    /// Ollama API URL.
    #[serde(default = "default_ollama_url")]
    pub base_url: String,

    /// Per-request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,

    /// Maximum tokens per response (unset: model default).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self {
            base_url: default_ollama_url(),
            timeout_seconds: default_timeout(),
            max_tokens: None,
        }
    }
}

fn default_ollama_url() -> String {
    "http://localhost:11434".to_string()
}

fn default_timeout() -> u64 {
    120
}

/// Application under review.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TargetConfig {
    #[serde(default = "default_target_url")]
    pub url: String,

    #[serde(default = "default_source_code_url", skip_serializing_if = "Option::is_none")]
    pub source_code_url: Option<String>,

    #[serde(default = "default_description")]
    pub description: String,
}

impl Default for TargetConfig {
    fn default() -> Self {
        Self {
            url: default_target_url(),
            source_code_url: default_source_code_url(),
            description: default_description(),
        }
    }
}

impl TargetConfig {
    pub fn to_target(&self) -> Target {
        Target {
            url: self.url.clone(),
            source_code_url: self.source_code_url.clone(),
            description: self.description.clone(),
        }
    }
}

fn default_target_url() -> String {
    "https://ecommerce-with-stripe-six.vercel.app/".to_string()
}

fn default_source_code_url() -> Option<String> {
    Some("https://github.com/kychan23/ecommerce-with-stripe".to_string())
}

fn default_description() -> String {
    "E-commerce site with Stripe payment integration (JPY currency, Japan-only transactions, responsive UI)"
        .to_string()
}

/// Report file format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ReportFormat {
    /// JSON format (default)
    #[default]
    Json,
    /// Markdown format
    Markdown,
}

impl ReportFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ReportFormat::Json => "json",
            ReportFormat::Markdown => "md",
        }
    }
}

/// Report generation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportConfig {
    /// Save the report after a run.
    #[serde(default = "default_true")]
    pub save: bool,

    /// Report file format.
    #[serde(default)]
    pub format: ReportFormat,

    /// Directory for auto-named report files.
    #[serde(default = "default_output_dir")]
    pub output_dir: String,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            save: true,
            format: ReportFormat::default(),
            output_dir: default_output_dir(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_output_dir() -> String {
    ".".to_string()
}

/// Closed set of worker specialties. Each kind supplies a default persona.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EvaluatorKind {
    IstqbCompliance,
    ManagementRequirements,
    TechnicalAnalyst,
    /// A reviewer defined entirely by its configured role and system prompt.
    General,
}

impl std::fmt::Display for EvaluatorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EvaluatorKind::IstqbCompliance => write!(f, "istqb_compliance"),
            EvaluatorKind::ManagementRequirements => write!(f, "management_requirements"),
            EvaluatorKind::TechnicalAnalyst => write!(f, "technical_analyst"),
            EvaluatorKind::General => write!(f, "general"),
        }
    }
}

/// One worker entry. Unset fields come from the kind's default persona.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerConfig {
    pub kind: EvaluatorKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_prompt: Option<String>,
}

impl WorkerConfig {
    pub fn of_kind(kind: EvaluatorKind) -> Self {
        Self {
            kind,
            name: None,
            role: None,
            model: None,
            temperature: None,
            system_prompt: None,
        }
    }
}

fn default_workers() -> Vec<WorkerConfig> {
    vec![
        WorkerConfig::of_kind(EvaluatorKind::IstqbCompliance),
        WorkerConfig::of_kind(EvaluatorKind::ManagementRequirements),
        WorkerConfig::of_kind(EvaluatorKind::TechnicalAnalyst),
    ]
}

/// Boss entry. Unset fields come from the default boss persona.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BossConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_prompt: Option<String>,
}

/// Temperature used when neither the entry nor the persona sets one.
pub const DEFAULT_TEMPERATURE: f32 = 0.7;

/// Roster validation errors.
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("Duplicate evaluator name: {0}")]
    DuplicateName(String),

    #[error("Evaluator {name} has temperature {temperature}; expected 0.0 to 2.0")]
    InvalidTemperature { name: String, temperature: f32 },

    #[error("Evaluator {0} has an empty name")]
    EmptyName(String),
}

/// Resolved roster: the boss identity and each worker's kind and identity.
#[derive(Debug, Clone)]
pub struct Roster {
    pub boss: EvaluatorIdentity,
    pub workers: Vec<(EvaluatorKind, EvaluatorIdentity)>,
}

fn resolve_identity(
    persona: Persona,
    name: &Option<String>,
    role: &Option<String>,
    model: &Option<String>,
    temperature: Option<f32>,
    system_prompt: &Option<String>,
) -> EvaluatorIdentity {
    EvaluatorIdentity {
        name: name.clone().unwrap_or_else(|| persona.name.to_string()),
        role: role.clone().unwrap_or_else(|| persona.role.to_string()),
        model: model.clone().unwrap_or_else(|| persona.model.to_string()),
        temperature: temperature.unwrap_or(DEFAULT_TEMPERATURE),
        system_prompt: system_prompt
            .clone()
            .unwrap_or_else(|| persona.system_prompt.to_string()),
    }
}

impl Config {
    /// Load configuration from a file path.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Try to load configuration from the default location.
    ///
    /// Returns `Ok(None)` if the file doesn't exist, `Err` if it exists but can't be parsed.
    pub fn load_default() -> Result<Option<Self>> {
        let default_path = Path::new(CONFIG_FILE);

        if default_path.exists() {
            Ok(Some(Self::load(default_path)?))
        } else {
            Ok(None)
        }
    }

    /// Merge this configuration with CLI arguments.
    ///
    /// CLI arguments take precedence over config file settings, but only
    /// when they were given explicitly.
    pub fn merge_with_args(&mut self, args: &crate::cli::Args) {
        if let Some(ref url) = args.url {
            self.target.url = url.clone();
        }
        if let Some(ref source) = args.source {
            self.target.source_code_url = Some(source.clone());
        }
        if let Some(ref description) = args.description {
            self.target.description = description.clone();
        }

        if let Some(ref ollama_url) = args.ollama_url {
            self.ollama.base_url = ollama_url.clone();
        }
        if let Some(timeout) = args.timeout {
            self.ollama.timeout_seconds = timeout;
        }
        if let Some(max_tokens) = args.max_tokens {
            self.ollama.max_tokens = Some(max_tokens);
        }

        if let Some(language) = args.language {
            self.language = language;
        }
        if let Some(format) = args.format {
            self.report.format = format;
        }
        if args.no_save {
            self.report.save = false;
        }
    }

    /// Resolve the configured boss and workers into evaluator identities.
    pub fn roster(&self) -> Result<Roster, ConfigError> {
        let b = &self.boss;
        let boss = resolve_identity(
            boss_persona(self.language),
            &b.name,
            &b.role,
            &b.model,
            b.temperature,
            &b.system_prompt,
        );

        let workers: Vec<(EvaluatorKind, EvaluatorIdentity)> = self
            .workers
            .iter()
            .map(|w| {
                let identity = resolve_identity(
                    worker_persona(w.kind, self.language),
                    &w.name,
                    &w.role,
                    &w.model,
                    w.temperature,
                    &w.system_prompt,
                );
                (w.kind, identity)
            })
            .collect();

        let mut seen = HashSet::new();
        for identity in std::iter::once(&boss).chain(workers.iter().map(|(_, id)| id)) {
            if identity.name.trim().is_empty() {
                return Err(ConfigError::EmptyName(identity.role.clone()));
            }
            if !seen.insert(identity.name.as_str()) {
                return Err(ConfigError::DuplicateName(identity.name.clone()));
            }
            if !(0.0..=2.0).contains(&identity.temperature) {
                return Err(ConfigError::InvalidTemperature {
                    name: identity.name.clone(),
                    temperature: identity.temperature,
                });
            }
        }

        Ok(Roster { boss, workers })
    }

    /// Generate a default configuration file content.
    pub fn default_toml() -> String {
        let config = Config::default();
        toml::to_string_pretty(&config).unwrap_or_else(|_| String::new())
    }
}
