use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Parser, Subcommand};
use serde::Serialize;
use tokio::sync::mpsc::UnboundedReceiver;
use tracing::{info, warn};

use catalyst::config::Config;
use catalyst::orchestration::{
    EvaluationRequest, EvaluationStore, InterviewService, JsonlStore, NullStore, PhaseDirective,
    TurnReport,
};
use catalyst::provider::KeywordProvider;
use catalyst::{Error, Result, SessionId};

/// Catalyst - adaptive reasoning evaluation for mock interviews
#[derive(Parser, Debug)]
#[command(name = "catalyst")]
#[command(version, about, long_about = None)]
#[command(after_help = "ENVIRONMENT:\n    CATALYST_DEBUG=1     Enable debug logging (alternative to --debug)\n    CATALYST_LOG=<filter> Override the log filter (e.g. catalyst=trace)")]
pub struct Cli {
    /// Enable debug logging (writes to ~/.catalyst/catalyst.log)
    #[arg(short = 'd', long, global = true)]
    pub debug: bool,

    /// Configuration file (defaults to ~/.catalyst/catalyst.toml)
    #[arg(short = 'c', long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Command {
    /// Evaluate one response in a fresh session and print the report
    Evaluate {
        /// Response text (use --file to read it from a file)
        text: Option<String>,

        /// Read the response from a file
        #[arg(long, short = 'f', conflicts_with = "text")]
        file: Option<PathBuf>,

        /// Session id to use
        #[arg(long, short = 's', default_value = "cli")]
        session: String,

        /// Complexity hint (low, medium, high)
        #[arg(long)]
        complexity: Option<String>,

        /// Reasoning strategy hint (lean, chain_of_thought, step_back)
        #[arg(long)]
        strategy: Option<String>,
    },

    /// Feed a JSON-lines file of requests through the service
    Replay {
        /// File with one evaluation request per line
        file: PathBuf,

        /// Append computed evaluations to ~/.catalyst/evaluations.jsonl
        #[arg(long)]
        persist: bool,
    },

    /// Print the effective configuration as TOML
    Config {
        /// Also write it to the config file (--config, or ~/.catalyst/catalyst.toml)
        #[arg(long)]
        write: bool,
    },
}

/// One line of `replay` output.
#[derive(Debug, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
enum ReplayLine<'a> {
    Report { report: &'a TurnReport },
    Directive { directive: &'a PhaseDirective },
    Error { session_id: &'a str, error: String },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    catalyst::log::init_with_debug(cli.debug);

    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Command::Evaluate {
            text,
            file,
            session,
            complexity,
            strategy,
        } => {
            let response = match (text, file) {
                (Some(text), _) => text,
                (None, Some(path)) => std::fs::read_to_string(path)?,
                (None, None) => {
                    return Err(Error::Validation(
                        "provide the response text or --file".to_string(),
                    ))
                }
            };
            let mut request = EvaluationRequest::new(session, response);
            request.complexity = complexity;
            request.reasoning_strategy = strategy;
            run_evaluate(&config, request)
        }
        Command::Replay { file, persist } => run_replay(&config, &file, persist),
        Command::Config { write } => {
            print!("{}", toml::to_string_pretty(&config)?);
            if write {
                match cli.config.as_deref() {
                    Some(path) => config.save_to(path)?,
                    None => config.save()?,
                }
            }
            Ok(())
        }
    }
}

fn load_config(path: Option<&Path>) -> Result<Config> {
    match path {
        Some(path) => Config::load_from(path),
        None => Config::load(),
    }
}

fn run_evaluate(config: &Config, request: EvaluationRequest) -> Result<()> {
    let rt = tokio::runtime::Runtime::new()?;

    let (report, directives) = rt.block_on(async {
        let (service, mut rx) = InterviewService::new(
            config,
            Arc::new(KeywordProvider::new()),
            Arc::new(NullStore),
        );
        service.start_session(Some(request.session_id()))?;
        let report = service.handle_request(request).await?;
        Ok::<_, Error>((report, drain(&mut rx)))
    })?;

    let output = serde_json::json!({
        "report": report,
        "directives": directives,
    });
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

fn run_replay(config: &Config, file: &Path, persist: bool) -> Result<()> {
    let content = std::fs::read_to_string(file)?;
    let store: Arc<dyn EvaluationStore> = if persist {
        Arc::new(JsonlStore::new(Config::evaluations_path()?))
    } else {
        Arc::new(NullStore)
    };

    let rt = tokio::runtime::Runtime::new()?;
    let telemetry = rt.block_on(async {
        let (service, mut rx) =
            InterviewService::new(config, Arc::new(KeywordProvider::new()), store);

        for (line_no, line) in content.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            let request: EvaluationRequest = match serde_json::from_str(line) {
                Ok(request) => request,
                Err(e) => {
                    warn!(line = line_no + 1, error = %e, "skipping malformed request");
                    continue;
                }
            };
            let id = SessionId::from(request.session_id.as_str());
            if !service.contains(&id) {
                service.start_session(Some(id))?;
            }

            let session_id = request.session_id.clone();
            match service.handle_request(request).await {
                Ok(report) => emit(&ReplayLine::Report { report: &report })?,
                Err(e) => emit(&ReplayLine::Error {
                    session_id: &session_id,
                    error: e.to_string(),
                })?,
            }
            for directive in drain(&mut rx) {
                emit(&ReplayLine::Directive {
                    directive: &directive,
                })?;
            }
        }

        // The runtime goes away with this block; pending writes would be lost.
        service.flush().await;
        let telemetry = service.telemetry();
        info!(
            computed = telemetry.computed,
            cache_hits = telemetry.cache_hits,
            total_cost = telemetry.total_cost,
            "replay finished"
        );
        Ok::<_, Error>(telemetry)
    })?;

    println!("{}", serde_json::to_string_pretty(&telemetry)?);
    Ok(())
}

fn drain(rx: &mut UnboundedReceiver<PhaseDirective>) -> Vec<PhaseDirective> {
    let mut directives = Vec::new();
    while let Ok(directive) = rx.try_recv() {
        directives.push(directive);
    }
    directives
}

fn emit(line: &ReplayLine<'_>) -> Result<()> {
    println!("{}", serde_json::to_string(line)?);
    Ok(())
}
