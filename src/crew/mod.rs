//! Crew model: agents, tasks and the process mode they run under.
//!
//! # Invariants
//! - A `Crew` always has at least one agent and one task
//! - Every task's agent is one of the crew's agents
//!
//! Execution is delegated to an [`Orchestrator`], so the bridge logic can be
//! exercised against a scripted engine in tests.

mod orchestrator;

pub use orchestrator::LlmOrchestrator;

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::llm::TokenUsage;

/// Execution ordering strategy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Process {
    /// Tasks run in listed order, each seeing the outputs before it
    #[default]
    Sequential,
    /// A manager assigns each task to the best-suited agent and writes the final answer
    Hierarchical,
}

impl Process {
    pub fn as_str(&self) -> &'static str {
        match self {
            Process::Sequential => "sequential",
            Process::Hierarchical => "hierarchical",
        }
    }
}

impl fmt::Display for Process {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors raised while assembling a crew.
#[derive(Debug, Clone, thiserror::Error)]
pub enum CrewError {
    #[error("Crew has no agents")]
    NoAgents,

    #[error("Crew has no tasks")]
    NoTasks,

    #[error("Task {0} is assigned to an agent outside the crew")]
    ForeignAgent(usize),
}

/// Per-agent model settings that override the crew defaults.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AgentLlm {
    pub model: Option<String>,
    pub temperature: Option<f64>,
}

/// A role-bound reasoning unit.
#[derive(Debug, Clone, PartialEq)]
pub struct Agent {
    pub role: String,
    pub goal: String,
    pub backstory: String,
    pub allow_delegation: bool,
    pub verbose: bool,
    pub llm: AgentLlm,
}

impl Agent {
    pub fn new(role: impl Into<String>) -> Self {
        Self {
            role: role.into(),
            goal: String::new(),
            backstory: String::new(),
            allow_delegation: false,
            verbose: false,
            llm: AgentLlm::default(),
        }
    }

    pub fn with_goal(mut self, goal: impl Into<String>) -> Self {
        self.goal = goal.into();
        self
    }

    pub fn with_backstory(mut self, backstory: impl Into<String>) -> Self {
        self.backstory = backstory.into();
        self
    }

    pub fn with_delegation(mut self, allow: bool) -> Self {
        self.allow_delegation = allow;
        self
    }

    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    pub fn with_llm(mut self, llm: AgentLlm) -> Self {
        self.llm = llm;
        self
    }

    /// System prompt that puts the model in this agent's role.
    pub fn system_prompt(&self) -> String {
        let mut prompt = format!("You are {}.", self.role.trim());
        if !self.backstory.trim().is_empty() {
            prompt.push(' ');
            prompt.push_str(self.backstory.trim());
        }
        if !self.goal.trim().is_empty() {
            prompt.push_str("\nYour personal goal is: ");
            prompt.push_str(self.goal.trim());
        }
        prompt
    }
}

/// A unit of work bound to an agent.
#[derive(Debug, Clone)]
pub struct Task {
    pub description: String,
    pub expected_output: String,
    pub agent: Arc<Agent>,
    /// Free-form context supplied by the caller (string, list or object)
    pub context: Option<serde_json::Value>,
}

impl Task {
    pub fn new(description: impl Into<String>, agent: Arc<Agent>) -> Self {
        Self {
            description: description.into(),
            expected_output: String::new(),
            agent,
            context: None,
        }
    }

    pub fn with_expected_output(mut self, expected_output: impl Into<String>) -> Self {
        self.expected_output = expected_output.into();
        self
    }

    pub fn with_context(mut self, context: serde_json::Value) -> Self {
        self.context = Some(context);
        self
    }

    /// Caller context rendered for a prompt, or `None` when it carries nothing.
    pub fn context_text(&self) -> Option<String> {
        use serde_json::Value;
        match self.context.as_ref()? {
            Value::Null => None,
            Value::String(s) if s.trim().is_empty() => None,
            Value::String(s) => Some(s.clone()),
            Value::Array(items) if items.is_empty() => None,
            Value::Object(map) if map.is_empty() => None,
            Value::Array(items) => Some(
                items
                    .iter()
                    .map(|item| match item {
                        Value::String(s) => format!("- {}", s),
                        other => format!("- {}", other),
                    })
                    .collect::<Vec<_>>()
                    .join("\n"),
            ),
            other => Some(serde_json::to_string_pretty(other).unwrap_or_else(|_| other.to_string())),
        }
    }
}

/// Agents and tasks executed together under one process mode.
#[derive(Debug, Clone)]
pub struct Crew {
    agents: Vec<Arc<Agent>>,
    tasks: Vec<Task>,
    process: Process,
}

impl Crew {
    /// Assemble a crew.
    ///
    /// # Errors
    /// Fails if either collection is empty or a task points at an agent that
    /// is not part of `agents`.
    pub fn new(
        agents: Vec<Arc<Agent>>,
        tasks: Vec<Task>,
        process: Process,
    ) -> Result<Self, CrewError> {
        if agents.is_empty() {
            return Err(CrewError::NoAgents);
        }
        if tasks.is_empty() {
            return Err(CrewError::NoTasks);
        }
        for (idx, task) in tasks.iter().enumerate() {
            if !agents.iter().any(|a| Arc::ptr_eq(a, &task.agent)) {
                return Err(CrewError::ForeignAgent(idx + 1));
            }
        }
        Ok(Self {
            agents,
            tasks,
            process,
        })
    }

    pub fn agents(&self) -> &[Arc<Agent>] {
        &self.agents
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn process(&self) -> Process {
        self.process
    }
}

/// Output of a single task.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskOutput {
    pub description: String,
    pub agent: String,
    pub raw: String,
}

/// Output of a whole crew run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrewOutput {
    /// Final answer of the crew
    pub raw: String,
    pub tasks_output: Vec<TaskOutput>,
    /// Usage reported by the provider, summed over every call (if reported)
    pub usage: Option<TokenUsage>,
}

impl fmt::Display for CrewOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

/// Executes an ordered agent/task plan under a process mode.
#[async_trait]
pub trait Orchestrator: Send + Sync {
    /// Run the crew to completion and return its final output.
    async fn kickoff(&self, crew: &Crew) -> anyhow::Result<CrewOutput>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn agent(role: &str) -> Arc<Agent> {
        Arc::new(Agent::new(role))
    }

    #[test]
    fn process_names_are_exact_lowercase() {
        let parse = |raw: &str| serde_json::from_value::<Process>(json!(raw));
        assert_eq!(parse("sequential").unwrap(), Process::Sequential);
        assert_eq!(parse("hierarchical").unwrap(), Process::Hierarchical);
        assert!(parse("Hierarchical").is_err());
        assert!(parse("parallel").is_err());
        assert_eq!(Process::Hierarchical.to_string(), "hierarchical");
        assert_eq!(json!(Process::Sequential), json!("sequential"));
    }

    #[test]
    fn system_prompt_skips_empty_fields() {
        let bare = Agent::new("Writer");
        assert_eq!(bare.system_prompt(), "You are Writer.");

        let full = Agent::new("Writer")
            .with_goal("Write well")
            .with_backstory("A seasoned editor.");
        assert_eq!(
            full.system_prompt(),
            "You are Writer. A seasoned editor.\nYour personal goal is: Write well"
        );
    }

    #[test]
    fn crew_rejects_empty_collections() {
        let a = agent("Writer");
        assert!(matches!(
            Crew::new(vec![], vec![Task::new("x", a.clone())], Process::Sequential),
            Err(CrewError::NoAgents)
        ));
        assert!(matches!(
            Crew::new(vec![a], vec![], Process::Sequential),
            Err(CrewError::NoTasks)
        ));
    }

    #[test]
    fn crew_rejects_foreign_agents() {
        let member = agent("Writer");
        let outsider = agent("Writer");
        let tasks = vec![Task::new("a", member.clone()), Task::new("b", outsider)];
        assert!(matches!(
            Crew::new(vec![member], tasks, Process::Sequential),
            Err(CrewError::ForeignAgent(2))
        ));
    }

    #[test]
    fn context_text_renders_by_shape() {
        let a = agent("Writer");
        let task = Task::new("t", a.clone());
        assert_eq!(task.context_text(), None);

        let empty = Task::new("t", a.clone()).with_context(json!([]));
        assert_eq!(empty.context_text(), None);

        let list = Task::new("t", a.clone()).with_context(json!(["tone: formal", 3]));
        assert_eq!(list.context_text().as_deref(), Some("- tone: formal\n- 3"));

        let text = Task::new("t", a).with_context(json!("Italian audience"));
        assert_eq!(text.context_text().as_deref(), Some("Italian audience"));
    }
}
