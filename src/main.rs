//! releasegate - boss/worker LLM review panel
//!
//! A CLI tool that asks several specialist reviewers, each backed by an
//! Ollama model, to evaluate an application in parallel, then has a boss
//! reviewer integrate their findings into a Go/No-Go release decision.
//!
//! Exit codes:
//!   0 - Success
//!   1 - Runtime error (connection, config, no worker results, etc.)
//!   2 - Decision was No-Go and --fail-on-no-go was set

mod agent;
mod analysis;
mod cli;
mod config;
mod models;
mod orchestrator;
mod report;

use agent::OllamaClient;
use anyhow::{Context, Result};
use chrono::Local;
use cli::Args;
use config::{Config, Roster, CONFIG_FILE};
use indicatif::{ProgressBar, ProgressStyle};
use models::Decision;
use orchestrator::Orchestrator;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command-line arguments
    let args = Args::parse_args();

    // Validate arguments
    if let Err(e) = args.validate() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    // Handle --init-config early (no logging needed)
    if args.init_config {
        return handle_init_config();
    }

    init_logging(&args)?;

    info!("releasegate v{}", env!("CARGO_PKG_VERSION"));
    debug!("Arguments: {:?}", args);

    match run(args).await {
        Ok(exit_code) => {
            std::process::exit(exit_code);
        }
        Err(e) => {
            error!("Evaluation failed: {:#}", e);
            eprintln!("\n❌ Error: {:#}", e);
            std::process::exit(1);
        }
    }
}

/// Handle --init-config: generate a default .releasegate.toml.
fn handle_init_config() -> Result<()> {
    let path = Path::new(CONFIG_FILE);

    if path.exists() {
        eprintln!(
            "⚠️  {} already exists. Remove it first or edit it manually.",
            CONFIG_FILE
        );
        std::process::exit(1);
    }

    let content = Config::default_toml();
    std::fs::write(path, &content).with_context(|| format!("Failed to write {}", CONFIG_FILE))?;

    println!("✅ Created {} with default settings.", CONFIG_FILE);
    println!("   Edit it to customize the target, models, and worker roster.");
    Ok(())
}

/// Initialize logging based on verbosity settings.
fn init_logging(args: &Args) -> Result<()> {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(args.log_level())
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set tracing subscriber")
}

/// Run the complete evaluation workflow. Returns the exit code (0 or 2).
async fn run(args: Args) -> Result<i32> {
    let start_time = Instant::now();

    let mut config = load_config(&args)?;
    config.merge_with_args(&args);
    let roster = config.roster().context("Invalid evaluator roster")?;

    if args.show_config {
        print_config(&config, &roster);
        return Ok(0);
    }

    if args.show_structure {
        print!("{}", report::render_structure(&roster));
        return Ok(0);
    }

    let client = OllamaClient::new(&config.ollama)?;

    if args.check_connection {
        return handle_check_connection(&client, &roster).await;
    }

    let target = config.target.to_target();

    println!("🎯 Target: {}", target.url);
    if let Some(ref source) = target.source_code_url {
        println!("   Source: {}", source);
    }
    println!("   {}", target.description);

    // Fail fast when the server is down rather than degrading every worker.
    println!("\n🔌 Connecting to Ollama at {}...", client.base_url());
    let installed = client
        .list_models()
        .await
        .context("Ollama is not reachable; start it with `ollama serve`")?;
    warn_missing_models(&installed, &roster);

    println!("\n🤖 Panel:");
    println!("   Boss: {} ({})", roster.boss.name, roster.boss.model);
    for (_, worker) in &roster.workers {
        println!("   Worker: {} ({})", worker.name, worker.model);
    }
    println!("   Timeout: {}s per request", config.ollama.timeout_seconds);

    let progress = create_progress_bar(roster.workers.len(), args.quiet);
    let orchestrator = Orchestrator::from_roster(
        Arc::new(client),
        &roster,
        config.language,
        config.ollama.max_tokens,
    )
    .with_progress(progress.clone());

    println!(
        "\n🔬 Running {} worker evaluations...\n",
        orchestrator.worker_count()
    );
    let outcome = orchestrator.run(&target).await;
    progress.finish_and_clear();
    let outcome = outcome?;

    print!("{}", report::render_results(&outcome, config.language));

    if config.report.save {
        let format = config.report.format;
        let path = args.output.clone().unwrap_or_else(|| {
            report::default_report_path(format, Path::new(&config.report.output_dir), &Local::now())
        });
        report::save_report(&outcome.report, format, &path)?;
        println!("\n💾 Report saved to: {}", path.display());
    }

    println!(
        "\n✅ Evaluation complete in {:.1}s",
        start_time.elapsed().as_secs_f64()
    );

    if args.fail_on_no_go && outcome.boss.final_decision == Decision::NoGo {
        eprintln!("\n⛔ Final decision is No-Go. Failing (exit code 2).");
        return Ok(2);
    }

    Ok(0)
}

fn create_progress_bar(workers: usize, quiet: bool) -> ProgressBar {
    if quiet {
        return ProgressBar::hidden();
    }

    let pb = ProgressBar::new(workers as u64);
    pb.set_style(
        ProgressStyle::with_template(
            "{spinner:.green} [{elapsed_precise}] [{bar:30.cyan/blue}] {pos}/{len} {msg}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("#>-"),
    );
    pb.enable_steady_tick(Duration::from_millis(120));
    pb
}

/// Handle --check-connection: list installed models and flag missing roster models.
async fn handle_check_connection(client: &OllamaClient, roster: &Roster) -> Result<i32> {
    println!("🔌 Checking Ollama at {}...", client.base_url());

    let models = client
        .list_models()
        .await
        .context("Ollama is not reachable; start it with `ollama serve`")?;

    println!("✅ Connected. {} models installed:", models.len());
    for model in &models {
        let size = model
            .details
            .as_ref()
            .and_then(|d| d.parameter_size.as_deref())
            .unwrap_or("?");
        println!("   📦 {} ({})", model.name, size);
    }

    let missing = warn_missing_models(&models, roster);
    if missing > 0 {
        println!("\n⚠️  {} configured models are not installed.", missing);
        println!("   Install them with `ollama pull <model>`.");
    }

    Ok(0)
}

/// Warn about roster models the server does not have. Returns how many are missing.
fn warn_missing_models(installed: &[agent::ollama::ModelInfo], roster: &Roster) -> usize {
    let mut models: Vec<&str> = std::iter::once(roster.boss.model.as_str())
        .chain(roster.workers.iter().map(|(_, id)| id.model.as_str()))
        .collect();
    models.sort_unstable();
    models.dedup();

    let mut missing = 0;
    for model in models {
        if !installed.iter().any(|m| m.matches(model)) {
            warn!(model, "Configured model is not installed on the Ollama server");
            missing += 1;
        }
    }
    missing
}

/// Handle --show-config: print the effective settings and roster.
fn print_config(config: &Config, roster: &Roster) {
    println!("⚙️  Effective configuration\n");
    println!("   Language: {:?}", config.language);
    println!("   Ollama: {}", config.ollama.base_url);
    println!("   Timeout: {}s", config.ollama.timeout_seconds);
    match config.ollama.max_tokens {
        Some(max) => println!("   Max tokens: {}", max),
        None => println!("   Max tokens: model default"),
    }

    println!("\n   Target: {}", config.target.url);
    if let Some(ref source) = config.target.source_code_url {
        println!("   Source: {}", source);
    }
    println!("   Description: {}", config.target.description);

    println!(
        "\n   Report: {} ({:?}, dir {})",
        if config.report.save { "saved" } else { "not saved" },
        config.report.format,
        config.report.output_dir
    );

    println!("\n   Boss: {}", roster.boss.name);
    println!("     role: {}", roster.boss.role);
    println!(
        "     model: {} (temperature {})",
        roster.boss.model, roster.boss.temperature
    );
    for (kind, worker) in &roster.workers {
        println!("   Worker [{}]: {}", kind, worker.name);
        println!("     role: {}", worker.role);
        println!(
            "     model: {} (temperature {})",
            worker.model, worker.temperature
        );
    }
}

/// Load configuration from file or use defaults.
fn load_config(args: &Args) -> Result<Config> {
    // Try explicit config path
    if let Some(ref config_path) = args.config {
        info!("Loading config from: {}", config_path.display());
        return Config::load(config_path);
    }

    // Try default location
    match Config::load_default() {
        Ok(Some(config)) => {
            info!("Loaded default config from {}", CONFIG_FILE);
            Ok(config)
        }
        Ok(None) => {
            debug!("No config file found, using defaults");
            Ok(Config::default())
        }
        Err(e) => {
            warn!("Failed to load config: {:#}", e);
            Ok(Config::default())
        }
    }
}
