//! Bridge between the calling web application and the crew orchestrator.
//!
//! One invocation moves through
//! `Start → ConfigLoaded → AgentsBuilt → TasksBuilt → CrewConfigured → Executing`
//! and ends in `Completed` or `Failed`. Whatever the path, exactly one
//! [`ExecutionResult`] is emitted after the sentinel line.

mod builder;
mod request;
mod result;

pub use builder::{build_agents, build_tasks, AgentRefPolicy, BuiltAgent};
pub use request::{
    interpolate, parse_crew_config, parse_input_variables, AgentDescriptor, CrewConfig,
    DescriptorId, ExecutionRequest, InputVariables, TaskDescriptor,
};
pub use result::{emit_final_result, ExecutionResult, FINAL_RESULT_SENTINEL};

use std::sync::Arc;

use serde_json::json;
use thiserror::Error;

use crate::config::{Config, ConfigError};
use crate::cost::{estimate_cost, estimate_tokens};
use crate::crew::{Crew, CrewOutput, Orchestrator};
use crate::execution_log::ExecutionLog;

/// Exit code for any failed invocation.
pub const EXIT_FAILURE: u8 = 1;

pub const USAGE: &str = "Usage: crew-bridge <execution_id> <crew_config_json> [input_variables_json]";

#[derive(Debug, Error)]
pub enum BridgeError {
    /// No API key; nothing is attempted
    #[error("{0}")]
    MissingCredential(String),

    /// Malformed or schema-violating JSON input, or a bad environment value
    #[error("{0}")]
    Configuration(String),

    /// A descriptor could not be turned into a crew object
    #[error("Invalid crew definition: {0}")]
    Build(String),

    /// The orchestrator failed while running the crew
    #[error("{0}")]
    Orchestration(String),
}

impl From<ConfigError> for BridgeError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::MissingEnvVar(_) => BridgeError::MissingCredential(err.to_string()),
            ConfigError::InvalidValue(..) => BridgeError::Configuration(err.to_string()),
        }
    }
}

/// Where an invocation currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BridgeState {
    Start,
    ConfigLoaded,
    AgentsBuilt,
    TasksBuilt,
    CrewConfigured,
    Executing,
    Completed,
    Failed,
}

impl BridgeState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, BridgeState::Completed | BridgeState::Failed)
    }
}

/// Command-line inputs of one bridge invocation.
#[derive(Debug, Clone)]
pub struct BridgeInvocation {
    pub execution_id: String,
    pub crew_config_json: String,
    pub input_variables_json: Option<String>,
    pub strict_agent_refs: bool,
}

/// Runs one execution request against an orchestrator.
pub struct Bridge {
    execution_id: String,
    policy: AgentRefPolicy,
    orchestrator: Arc<dyn Orchestrator>,
    log: ExecutionLog,
    state: BridgeState,
}

impl Bridge {
    pub fn new(
        execution_id: impl Into<String>,
        config: &Config,
        orchestrator: Arc<dyn Orchestrator>,
        log: ExecutionLog,
    ) -> Self {
        Self {
            execution_id: execution_id.into(),
            policy: if config.strict_agent_refs {
                AgentRefPolicy::Reject
            } else {
                AgentRefPolicy::FallbackToFirst
            },
            orchestrator,
            log,
            state: BridgeState::Start,
        }
    }

    pub fn execution_id(&self) -> &str {
        &self.execution_id
    }

    pub fn state(&self) -> BridgeState {
        self.state
    }

    pub fn log(&self) -> &ExecutionLog {
        &self.log
    }

    pub fn into_log(self) -> ExecutionLog {
        self.log
    }

    /// Parse the crew configuration, logging the failure if it is malformed.
    pub fn load_crew_config(&mut self, json: &str) -> Result<CrewConfig, BridgeError> {
        match parse_crew_config(json) {
            Ok(config) => Ok(config),
            Err(e) => {
                let message = format!("Invalid JSON configuration: {}", e);
                self.log.error(message.clone());
                Err(BridgeError::Configuration(message))
            }
        }
    }

    /// Parse the optional input variables (`{}` when absent).
    pub fn load_input_variables(&mut self, json: Option<&str>) -> Result<InputVariables, BridgeError> {
        let Some(json) = json.filter(|j| !j.trim().is_empty()) else {
            return Ok(InputVariables::new());
        };
        parse_input_variables(json).map_err(|e| {
            let message = format!("Invalid input variables: {}", e);
            self.log.error(message.clone());
            BridgeError::Configuration(message)
        })
    }

    /// Full pipeline from raw JSON to result. Never panics on bad input.
    pub async fn run(&mut self, crew_config_json: &str, input_variables_json: Option<&str>) -> ExecutionResult {
        let loaded = self
            .load_crew_config(crew_config_json)
            .and_then(|config| Ok((config, self.load_input_variables(input_variables_json)?)));

        match loaded {
            Ok((config, inputs)) => {
                self.state = BridgeState::ConfigLoaded;
                let request = ExecutionRequest {
                    execution_id: self.execution_id.clone(),
                    crew: config,
                    inputs,
                };
                self.execute_crew(&request).await
            }
            Err(e) => {
                self.state = BridgeState::Failed;
                ExecutionResult::failed(e.to_string(), self.log.entries().to_vec())
            }
        }
    }

    /// Build and run the crew; failures become a failed result.
    pub async fn execute_crew(&mut self, request: &ExecutionRequest) -> ExecutionResult {
        self.log.info_with(
            "Starting crew execution",
            json!({
                "crew_id": request.crew.id,
                "process_type": request.crew.process_type,
            }),
        );

        match self.try_execute(request).await {
            Ok(output) => {
                self.state = BridgeState::Completed;
                let result_text = output.to_string();
                let tokens_used = estimate_tokens(&result_text);

                let mut data = json!({
                    "tokens_used": tokens_used,
                    "output_length": result_text.chars().count(),
                });
                if let Some(usage) = output.usage {
                    data["reported_tokens"] = json!(usage.total_tokens);
                }
                self.log.info_with("Execution completed", data);

                ExecutionResult::completed(
                    result_text,
                    tokens_used,
                    estimate_cost(tokens_used),
                    self.log.entries().to_vec(),
                )
            }
            Err(e) => {
                self.state = BridgeState::Failed;
                let message = e.to_string();
                self.log.error(format!("Execution failed: {}", message));
                ExecutionResult::failed(message, self.log.entries().to_vec())
            }
        }
    }

    async fn try_execute(&mut self, request: &ExecutionRequest) -> Result<CrewOutput, BridgeError> {
        let crew_config = &request.crew;

        let agents = build_agents(&crew_config.agents, &request.inputs, &mut self.log)?;
        self.state = BridgeState::AgentsBuilt;

        let tasks = build_tasks(
            &crew_config.tasks,
            &agents,
            &request.inputs,
            self.policy,
            &mut self.log,
        )?;
        self.state = BridgeState::TasksBuilt;

        let crew = Crew::new(
            agents.into_iter().map(|a| a.agent).collect(),
            tasks,
            crew_config.process_type,
        )
        .map_err(|e| BridgeError::Build(e.to_string()))?;
        self.state = BridgeState::CrewConfigured;
        self.log.info("Crew configured, executing tasks");

        self.state = BridgeState::Executing;
        self.orchestrator
            .kickoff(&crew)
            .await
            .map_err(|e| BridgeError::Orchestration(format!("{:#}", e)))
    }
}

/// Run one invocation end to end and emit its result on the log's channel.
///
/// `config` is the outcome of reading the environment; when it failed, no
/// crew object is built and the result carries the configuration error.
pub async fn run_invocation<F>(
    invocation: &BridgeInvocation,
    config: Result<Config, ConfigError>,
    mut log: ExecutionLog,
    make_orchestrator: F,
) -> ExecutionResult
where
    F: FnOnce(&Config) -> Arc<dyn Orchestrator>,
{
    let result = match config {
        Err(e) => {
            let err = BridgeError::from(e);
            tracing::error!("Bridge initialisation failed: {}", err);
            ExecutionResult::failed(err.to_string(), Vec::new())
        }
        Ok(mut config) => {
            config.strict_agent_refs |= invocation.strict_agent_refs;
            let orchestrator = make_orchestrator(&config);
            let mut bridge = Bridge::new(invocation.execution_id.clone(), &config, orchestrator, log);
            let result = bridge
                .run(
                    &invocation.crew_config_json,
                    invocation.input_variables_json.as_deref(),
                )
                .await;
            log = bridge.into_log();
            result
        }
    };

    if let Err(e) = emit_final_result(log.writer_mut(), &result) {
        tracing::error!("Failed to write final result: {}", e);
    }
    result
}
