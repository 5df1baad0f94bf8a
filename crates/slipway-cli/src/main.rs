//! Slipway - continuous deployment pipeline CLI
//!
//! The `slipway` command drives the two-stage deployment pipeline against
//! a target AWS environment.
//!
//! ## Commands
//!
//! - `deploy`: bootstrap the environment, then apply the declared stack
//! - `bootstrap`: prepare the environment without applying the stack
//!
//! Configuration and credentials are resolved from the process
//! environment (`AWS_ACCESS_KEY_ID`, `AWS_SECRET_ACCESS_KEY`,
//! `AWS_ACCOUNT_ID`, `AWS_REGION`, `ECR_REPOSITORIES`); a missing or
//! invalid value aborts before any stage runs. The process exits zero iff
//! every stage succeeded.

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::Level;

use slipway_cdk::{CdkStackEngine, EcrImageRegistry};
use slipway_core::{
    ApprovalPolicy, Bootstrapper, DeployPipeline, PipelineConfig, RunReport, StackDefinition,
    StageResult,
};

#[derive(Parser)]
#[command(name = "slipway")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Two-stage continuous deployment: environment bootstrap, then stack update", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON-formatted output and log lines
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the full pipeline: bootstrap, then apply the declared stack
    Deploy {
        /// Name of the stack to apply
        #[arg(long, env = "STACK_NAME", default_value = "MicroservicesStack")]
        stack: String,

        /// App command that synthesizes the stack definition
        #[arg(long)]
        app: Option<String>,

        /// Context KEY=VALUE pairs forwarded to the stack engine
        #[arg(short = 'c', long = "context", value_name = "KEY=VALUE")]
        context: Vec<String>,

        /// Require confirmation for permission-broadening changes instead
        /// of auto-approving everything
        #[arg(long)]
        manual_approval: bool,

        /// Stack engine binary to invoke
        #[arg(long, default_value = CdkStackEngine::DEFAULT_BINARY)]
        toolkit: String,

        /// Per-operation wall-clock ceiling in seconds
        #[arg(long, default_value_t = CdkStackEngine::DEFAULT_TIMEOUT_SECS)]
        timeout: u64,
    },

    /// Prepare the target environment without applying the stack
    Bootstrap {
        /// Stack engine binary to invoke
        #[arg(long, default_value = CdkStackEngine::DEFAULT_BINARY)]
        toolkit: String,

        /// Per-operation wall-clock ceiling in seconds
        #[arg(long, default_value_t = CdkStackEngine::DEFAULT_TIMEOUT_SECS)]
        timeout: u64,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.json)?;

    match cli.command {
        Commands::Deploy {
            stack,
            app,
            context,
            manual_approval,
            toolkit,
            timeout,
        } => {
            let mut config = PipelineConfig::from_env(std::env::vars())?;
            if manual_approval {
                config.approval = ApprovalPolicy::Manual;
            }

            let mut definition = StackDefinition::new(stack);
            if let Some(app) = app {
                definition = definition.with_app(app);
            }
            for pair in &context {
                let (key, value) = parse_context_pair(pair)?;
                definition = definition.with_context(key, value);
            }

            let engine = CdkStackEngine::new()
                .with_binary_path(toolkit)
                .with_timeout(timeout);
            let registry = EcrImageRegistry::new(&config.target());

            let report = DeployPipeline::run(&engine, &registry, &config, &definition).await;
            print_report(&report, cli.json)?;

            if !report.success {
                std::process::exit(1);
            }
        }

        Commands::Bootstrap { toolkit, timeout } => {
            let config = PipelineConfig::from_env(std::env::vars())?;
            let engine = CdkStackEngine::new()
                .with_binary_path(toolkit)
                .with_timeout(timeout);

            let result = Bootstrapper::new(&engine).run(&config).await;
            print_stage(&result, cli.json)?;

            if !result.passed() {
                std::process::exit(1);
            }
        }
    }

    Ok(())
}

fn init_tracing(verbose: bool, json: bool) -> Result<()> {
    let level = if verbose { Level::DEBUG } else { Level::INFO };
    if json {
        let subscriber = tracing_subscriber::fmt()
            .json()
            .with_max_level(level)
            .with_target(false)
            .finish();
        tracing::subscriber::set_global_default(subscriber)?;
    } else {
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(level)
            .with_target(false)
            .finish();
        tracing::subscriber::set_global_default(subscriber)?;
    }
    Ok(())
}

fn parse_context_pair(raw: &str) -> Result<(String, String)> {
    match raw.split_once('=') {
        Some((key, value)) if !key.is_empty() => Ok((key.to_string(), value.to_string())),
        _ => anyhow::bail!("invalid context pair '{}', expected KEY=VALUE", raw),
    }
}

fn print_report(report: &RunReport, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(report)?);
        return Ok(());
    }

    for stage in &report.stages {
        print_stage_line(stage);
    }
    if report.success {
        println!(
            "run {} succeeded in {} ms (definition {})",
            report.run_id,
            report.duration_ms,
            &report.definition_digest[..12]
        );
    } else {
        println!("run {} failed after {} ms", report.run_id, report.duration_ms);
    }
    Ok(())
}

fn print_stage(result: &StageResult, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(result)?);
    } else {
        print_stage_line(result);
    }
    Ok(())
}

fn print_stage_line(result: &StageResult) {
    if result.passed() {
        println!("stage {}: ok ({} ms)", result.stage, result.duration_ms);
    } else {
        println!(
            "stage {}: failed [{}] {}",
            result.stage,
            result.error_kind.as_deref().unwrap_or("unknown"),
            result.error_detail.as_deref().unwrap_or("no detail"),
        );
    }
}
