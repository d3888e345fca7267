//! radpipe - Main Entry Point
//!
//! CLI layer over the orchestrator: assembles the standard diagnostic task
//! definition for an input, runs it against the builtin agents, and maps the
//! final pipeline status to an exit code.

use clap::{Parser, Subcommand};
use radpipe::assembler::{run_diagnostic_pipeline, PipelineInput};
use radpipe::config::OrchestratorConfig;
use radpipe::context::ResolutionMode;
use radpipe::observability::init_default_logging;
use radpipe::protocol::TaskState;
use std::path::PathBuf;
use std::process;
use tracing::{error, info};

/// Multi-agent diagnostic pipeline orchestrator
#[derive(Parser)]
#[command(name = "radpipe")]
#[command(about = "Multi-agent task-pipeline orchestrator for diagnostic imaging workflows")]
#[command(version)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the full diagnostic pipeline for one input
    Run {
        /// Local DICOM path or remote study URL
        input: String,

        /// Patient identifier to attach to the run
        #[arg(short, long)]
        patient_id: Option<String>,

        /// Fail the run on unresolved context references
        #[arg(long)]
        strict: bool,
    },
    /// Validate configuration
    Config {
        /// Show the effective configuration
        #[arg(long)]
        show: bool,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    init_default_logging();
    info!("Starting radpipe v{}", env!("CARGO_PKG_VERSION"));

    let config = match load_configuration(&cli.config) {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            process::exit(1);
        }
    };

    let result = match cli.command {
        Commands::Run {
            input,
            patient_id,
            strict,
        } => run_pipeline(config, &input, patient_id.as_deref(), strict).await,
        Commands::Config { show } => handle_config_command(&config, show),
    };

    match result {
        Ok(success) => {
            if !success {
                process::exit(1);
            }
        }
        Err(e) => {
            error!("Command failed: {}", e);
            process::exit(1);
        }
    }
}

fn load_configuration(
    config_path: &Option<PathBuf>,
) -> Result<OrchestratorConfig, Box<dyn std::error::Error>> {
    match config_path {
        Some(path) => {
            info!("Loading configuration from: {}", path.display());
            Ok(OrchestratorConfig::load_from_file(path)?)
        }
        None => {
            info!("No configuration file given, using defaults");
            Ok(OrchestratorConfig::default())
        }
    }
}

async fn run_pipeline(
    config: OrchestratorConfig,
    input: &str,
    patient_id: Option<&str>,
    strict: bool,
) -> Result<bool, Box<dyn std::error::Error>> {
    let input = if input.starts_with("http://") || input.starts_with("https://") {
        PipelineInput::RemoteUrl(input.to_string())
    } else {
        PipelineInput::LocalFile(PathBuf::from(input))
    };

    let mode = if strict {
        ResolutionMode::Strict
    } else {
        config.resolver.mode
    };
    let status = run_diagnostic_pipeline(&config, &input, patient_id, mode).await?;

    println!("{}", status.summary());
    for task in &status.task_statuses {
        let marker = match task.state {
            TaskState::Completed => "ok",
            TaskState::Failed => "FAILED",
            _ => "-",
        };
        println!("  [{marker}] {}", task.name);
    }
    if let Some(path) = &status.report_path {
        println!("report: {}", path.display());
    }
    if let Some(fatal) = &status.fatal_error {
        println!("error [{}]: {}", fatal.kind, fatal.message);
    }

    Ok(status.is_success())
}

fn handle_config_command(
    config: &OrchestratorConfig,
    show: bool,
) -> Result<bool, Box<dyn std::error::Error>> {
    config.validate()?;
    println!("Configuration is valid");
    if show {
        println!("{}", toml::to_string_pretty(config)?);
    }
    Ok(true)
}
