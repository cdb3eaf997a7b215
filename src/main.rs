//! crew-bridge - command-line entry point for the calling application.
//!
//! Streams JSON log lines on stdout, then the sentinel and one result object.
//! Exit code 0 on success, 1 on any failure.

use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;

use crew_bridge::bridge::{self, emit_final_result, BridgeInvocation, ExecutionResult};
use crew_bridge::cli::{is_informational, BridgeCli};
use crew_bridge::config::{self, Config};
use crew_bridge::crew::{LlmOrchestrator, Orchestrator};
use crew_bridge::execution_log::{ExecutionLog, LogFormat};
use crew_bridge::util::init_tracing;

fn main() -> ExitCode {
    init_tracing();

    let cli = match BridgeCli::try_parse() {
        Ok(cli) => cli,
        Err(e) if is_informational(&e) => {
            let _ = e.print();
            return ExitCode::SUCCESS;
        }
        Err(e) => {
            // clap writes usage errors to stderr
            let _ = e.print();
            return emit_usage_failure();
        }
    };
    let invocation = cli.into_invocation();

    // One request per process; tasks run one after another.
    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            tracing::error!("Failed to start runtime: {}", e);
            let failed = ExecutionResult::failed(format!("Failed to start runtime: {}", e), Vec::new());
            let _ = emit_final_result(&mut std::io::stdout(), &failed);
            return ExitCode::from(bridge::EXIT_FAILURE);
        }
    };

    let result = runtime.block_on(run(invocation));
    if result.success {
        ExitCode::SUCCESS
    } else {
        ExitCode::from(bridge::EXIT_FAILURE)
    }
}

async fn run(invocation: BridgeInvocation) -> ExecutionResult {
    config::load_dotenv();
    let config = Config::from_env();
    if let Ok(config) = &config {
        tracing::info!("Loaded configuration: model={}", config.model);
    }

    let log = ExecutionLog::stdout(Some(invocation.execution_id.clone()), LogFormat::JsonLines);
    bridge::run_invocation(&invocation, config, log, |config| {
        Arc::new(LlmOrchestrator::from_config(config)) as Arc<dyn Orchestrator>
    })
    .await
}

fn emit_usage_failure() -> ExitCode {
    let failed = ExecutionResult::failed(bridge::USAGE, Vec::new());
    if let Err(e) = emit_final_result(&mut std::io::stdout(), &failed) {
        tracing::error!("Failed to write final result: {}", e);
    }
    ExitCode::from(bridge::EXIT_FAILURE)
}
