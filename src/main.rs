//! ADS CLI
//!
//! Usage:
//!   ads gate --input sample.json                      # Deterministic gate only
//!   ads evaluate --input sample.json --user u-1       # Full decision (calls the LLM)
//!   ads evaluate --input s.json --thresholds v.json --experiments exps.json
//!   ads route --user u-1 --experiments exps.json      # Sticky arm assignment
//!   ads analyze --outcomes batch.json --propose       # Learning-loop batch analysis
//!   ads verify-audit                                  # Check audit log integrity
//!
//! Input files are JSON; `-` reads stdin.

use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use serde::de::DeserializeOwned;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use ads::config::AdsConfig;
use ads::core::{
    gate_rejection, AuditRepository, AuditStore, DecisionContext, DecisionPipeline, Executor,
    ExperimentRegistry, HttpCompletionProvider, InMemoryMetricHistory, JsonlAuditStore,
    ProposalGenerator, ThresholdAnalyzer, ThresholdRouter, ThresholdStore,
};
use ads::types::{
    AdsInput, AdsThresholds, Arm, ExperimentConfig, OutcomeData, RiskProfile, RiskProfileId,
    COHORT_ALL,
};
use ads::VERSION;

#[derive(Parser, Debug)]
#[command(
    name = "ads",
    version = VERSION,
    about = "Authority Decision System - voice authority scoring with audit trail",
    long_about = "ADS turns voice metrics into a LOW / MEDIUM / HIGH authority verdict.\n\n\
                  Pipeline:\n  \
                  Gate      - deterministic minimum-data checks\n  \
                  Executor  - one LLM interpretation call\n  \
                  Critic    - hard caps on the executor verdict\n  \
                  Risk      - per-cohort gating and human review\n  \
                  Audit     - hashed, append-only decision record"
)]
struct Args {
    /// TOML config file (falls back to ADS_CONFIG)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Output as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Disable colors in output
    #[arg(long, global = true)]
    no_color: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the deterministic gate only
    Gate {
        #[arg(short, long)]
        input: PathBuf,
    },
    /// Run a full decision against the configured LLM
    Evaluate {
        #[arg(short, long)]
        input: PathBuf,
        #[arg(long, default_value = "cli-user")]
        user: String,
        #[arg(long, default_value = COHORT_ALL)]
        cohort: String,
        /// Risk profile (conservative, balanced, aggressive, enterprise-custom)
        #[arg(long)]
        profile: Option<String>,
        /// Threshold version to pin (enterprise-custom)
        #[arg(long)]
        lock: Option<String>,
        /// JSON array of threshold sets published on top of the baseline
        #[arg(long)]
        thresholds: Option<PathBuf>,
        /// JSON array of experiment configs
        #[arg(long)]
        experiments: Option<PathBuf>,
        /// Version to make live (defaults to the baseline)
        #[arg(long)]
        live: Option<String>,
    },
    /// Show which arm a user lands on
    Route {
        #[arg(long)]
        user: String,
        #[arg(long, default_value = COHORT_ALL)]
        cohort: String,
        /// JSON array of experiment configs
        #[arg(long)]
        experiments: PathBuf,
    },
    /// Analyze an outcome batch against baseline (or given) thresholds
    Analyze {
        /// JSON array of outcomes
        #[arg(long)]
        outcomes: PathBuf,
        /// JSON threshold set (defaults to baseline)
        #[arg(long)]
        thresholds: Option<PathBuf>,
        /// Also generate proposals
        #[arg(long)]
        propose: bool,
    },
    /// Recompute integrity hashes over the audit log
    VerifyAudit {
        /// Audit log (defaults to config audit.log_path)
        #[arg(long)]
        path: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "ads=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let args = Args::parse();
    let config = AdsConfig::load(args.config.as_deref()).context("loading configuration")?;

    match &args.command {
        Command::Gate { input } => run_gate(input, &args),
        Command::Evaluate { input, user, cohort, profile, lock, thresholds, experiments, live } => {
            let (store, registry) =
                load_threshold_state(thresholds.as_deref(), experiments.as_deref(), live.as_deref())?;
            let target = EvaluateTarget {
                user: user.as_str(),
                cohort: cohort.as_str(),
                profile: profile.as_deref(),
                lock: lock.as_deref(),
            };
            run_evaluate(input, target, store, registry, &config, &args).await
        }
        Command::Route { user, cohort, experiments } => run_route(user, cohort, experiments, &args),
        Command::Analyze { outcomes, thresholds, propose } => {
            run_analyze(outcomes, thresholds.as_deref(), *propose, &args)
        }
        Command::VerifyAudit { path } => run_verify(path.as_deref(), &config, &args),
    }
}

/// Read JSON from a file, or stdin for `-`
fn read_json<T: DeserializeOwned>(path: &Path) -> anyhow::Result<T> {
    let text = if path == Path::new("-") {
        let mut buf = String::new();
        std::io::stdin().read_to_string(&mut buf).context("reading stdin")?;
        buf
    } else {
        std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?
    };
    serde_json::from_str(&text).with_context(|| format!("parsing {}", path.display()))
}

/// Threshold versions and experiments for one CLI run
fn load_threshold_state(
    thresholds: Option<&Path>,
    experiments: Option<&Path>,
    live: Option<&str>,
) -> anyhow::Result<(ThresholdStore, ExperimentRegistry)> {
    let versions: Vec<AdsThresholds> = match thresholds {
        Some(path) => read_json(path)?,
        None => Vec::new(),
    };
    let store = ThresholdStore::with_published(versions).context("publishing threshold versions")?;
    if let Some(live) = live {
        store.set_live(live).with_context(|| format!("setting live version {}", live))?;
    }

    let configs: Vec<ExperimentConfig> = match experiments {
        Some(path) => read_json(path)?,
        None => Vec::new(),
    };
    let registry = ExperimentRegistry::from_configs(configs);
    registry
        .verify_versions(&store)
        .context("experiment references an unknown threshold version")?;
    Ok((store, registry))
}

/// Who `evaluate` decides for
struct EvaluateTarget<'a> {
    user: &'a str,
    cohort: &'a str,
    profile: Option<&'a str>,
    lock: Option<&'a str>,
}

fn run_gate(input: &Path, args: &Args) -> anyhow::Result<()> {
    let input: AdsInput = read_json(input)?;
    match gate_rejection(&input) {
        Some(rejected) => print_output(&rejected, args),
        None if args.json => println!("{}", serde_json::json!({ "decision_allowed": true })),
        None => println!("{}", paint("✓ gate passed", "\x1b[32m", args)),
    }
    Ok(())
}

async fn run_evaluate(
    input: &Path,
    target: EvaluateTarget<'_>,
    store: ThresholdStore,
    registry: ExperimentRegistry,
    config: &AdsConfig,
    args: &Args,
) -> anyhow::Result<()> {
    let input: AdsInput = read_json(input)?;
    let EvaluateTarget { user, cohort, profile, lock } = target;

    let profile_id = match profile {
        Some(p) => match RiskProfileId::parse_lenient(p) {
            Some(id) => id,
            None => bail!("unknown risk profile: {}", p),
        },
        None => config.default_risk_profile,
    };
    let mut risk_profile = RiskProfile::preset(profile_id);
    if let Some(lock) = lock {
        risk_profile.threshold_lock = Some(lock.to_string());
    }

    let provider = HttpCompletionProvider::new(
        config.llm.endpoint.clone(),
        config.llm.model.clone(),
        config.llm.api_key.clone(),
    );
    let executor = Executor::new(Arc::new(provider))
        .with_timeout(config.llm.timeout())
        .with_temperature(config.llm.temperature)
        .with_max_tokens(config.llm.max_tokens);
    let audit_store = JsonlAuditStore::open(&config.audit.log_path)
        .with_context(|| format!("opening audit log {}", config.audit.log_path.display()))?;

    let pipeline = DecisionPipeline::new(
        Arc::new(store),
        Arc::new(registry),
        executor,
        Arc::new(AuditRepository::new(Box::new(audit_store))),
    )
    .with_model_version(config.model_version.clone())
    .with_history(Arc::new(InMemoryMetricHistory::new(config.history_capacity)))
    .with_shadow(config.shadow_mode);

    info!(user, cohort, profile = %profile_id, "evaluating {}", input.audio_sample_id);
    let ctx = DecisionContext::new(user, cohort, risk_profile);
    let output = pipeline.execute(&ctx, &input).await.context("decision failed")?;
    print_output(&output, args);
    Ok(())
}

fn run_route(user: &str, cohort: &str, experiments: &Path, args: &Args) -> anyhow::Result<()> {
    let configs: Vec<ExperimentConfig> = read_json(experiments)?;
    let registry = ExperimentRegistry::from_configs(configs);
    let decision = ThresholdRouter::route(&registry, user, cohort);

    if args.json {
        println!("{}", serde_json::to_string_pretty(&decision)?);
    } else {
        let color = match decision.version {
            Arm::A => "\x1b[36m",
            Arm::B => "\x1b[35m",
        };
        let line = format!(
            "arm={} | experiment={} | config={}",
            decision.version,
            decision.experiment_id.as_deref().unwrap_or("-"),
            decision.config_id.as_deref().unwrap_or("-")
        );
        println!("{}", paint(&line, color, args));
    }
    Ok(())
}

fn run_analyze(
    outcomes: &Path,
    thresholds: Option<&Path>,
    propose: bool,
    args: &Args,
) -> anyhow::Result<()> {
    let outcomes: Vec<OutcomeData> = read_json(outcomes)?;
    let thresholds: AdsThresholds = match thresholds {
        Some(path) => read_json(path)?,
        None => AdsThresholds::baseline(),
    };

    let analysis = ThresholdAnalyzer::new().analyze_batch(&outcomes, &thresholds)?;
    let proposals = if propose {
        ProposalGenerator::new().generate(&analysis)
    } else {
        Vec::new()
    };

    if args.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&serde_json::json!({
                "analysis": analysis,
                "proposals": proposals,
            }))?
        );
        return Ok(());
    }

    println!(
        "version={} | samples={} | FN={} ({:.1}%) | FP={} ({:.1}%)",
        analysis.threshold_version,
        analysis.sample_count,
        analysis.false_negatives,
        analysis.fn_rate * 100.0,
        analysis.false_positives,
        analysis.fp_rate * 100.0
    );
    for stress in analysis.boundary_stress.iter().filter(|s| s.near_boundary_count > 0) {
        println!(
            "  stress {} {:?} @ {} : {} ({:.1}%)",
            stress.metric,
            stress.boundary,
            stress.current_value,
            stress.near_boundary_count,
            stress.ratio * 100.0
        );
    }
    for proposal in &proposals {
        let line = format!(
            "  proposal {} : {} {} → {} [{:?}]",
            proposal.proposal_id,
            proposal.metric,
            proposal.current_value,
            proposal.proposed_value,
            proposal.risk_assessment
        );
        println!("{}", paint(&line, "\x1b[33m", args));
    }
    Ok(())
}

fn run_verify(path: Option<&Path>, config: &AdsConfig, args: &Args) -> anyhow::Result<()> {
    let path = path.unwrap_or(config.audit.log_path.as_path());
    let store = JsonlAuditStore::open(path)?;
    let rows = store.all().with_context(|| format!("reading {}", path.display()))?;

    let mut tampered = Vec::new();
    for row in &rows {
        if !AuditRepository::verify_integrity(row)? {
            tampered.push(row.record.header.decision_id.clone());
        }
    }

    if args.json {
        println!(
            "{}",
            serde_json::json!({ "rows": rows.len(), "tampered": tampered })
        );
    } else if tampered.is_empty() {
        println!("{}", paint(&format!("✓ {} rows verified", rows.len()), "\x1b[32m", args));
    } else {
        for id in &tampered {
            println!("{}", paint(&format!("✗ integrity mismatch: {}", id), "\x1b[31m", args));
        }
    }

    if !tampered.is_empty() {
        bail!("{} of {} audit rows failed verification", tampered.len(), rows.len());
    }
    Ok(())
}

fn print_output(output: &ads::types::AdsOutput, args: &Args) {
    if args.json {
        match serde_json::to_string_pretty(output) {
            Ok(json) => println!("{}", json),
            Err(e) => eprintln!("serialization failed: {}", e),
        }
    } else if args.no_color {
        println!("{}", output.to_parseable_string());
    } else {
        println!("{}", output.to_terminal_string());
    }
}

fn paint(text: &str, color: &str, args: &Args) -> String {
    if args.no_color {
        text.to_string()
    } else {
        format!("{}{}\x1b[0m", color, text)
    }
}

// =============================================================================
// TESTS
// =============================================================================
