//! # crew_bridge
//!
//! Runs multi-agent LLM crews on behalf of an external web application.
//!
//! A crew is a set of agents (role, goal, backstory) and an ordered list of
//! tasks, each assigned to one agent. The calling application hands over a
//! JSON description on the command line; we build the crew, run it against
//! an OpenAI-compatible chat API and print one JSON result.
//!
//! ## Output contract
//!
//! ```text
//! {"execution_id":"17","level":"info","message":"Starting crew execution",...}
//! {"execution_id":"17","level":"info","message":"Creating agent: Researcher",...}
//! ...
//!
//! __FINAL_RESULT__
//! { "success": true, "result": "...", "tokens_used": 412, "cost": 0.0002, "logs": [...] }
//! ```
//!
//! Diagnostics (`RUST_LOG`) go to stderr and never interleave with the above.
//!
//! ## Modules
//! - `bridge`: request schema, crew building, the bridge state machine
//! - `crew`: agents, tasks, crews and the `Orchestrator` that runs them
//! - `llm`: chat-completions client
//! - `execution_log`: caller-facing log lines
//! - `poc` / `smoke`: the proof-of-concept run and installation checks

pub mod bridge;
pub mod cli;
pub mod config;
pub mod cost;
pub mod crew;
pub mod execution_log;
pub mod llm;
pub mod poc;
pub mod smoke;
pub mod util;

pub use bridge::{Bridge, BridgeError, ExecutionResult};
pub use config::Config;
pub use crew::{Crew, LlmOrchestrator, Orchestrator};
