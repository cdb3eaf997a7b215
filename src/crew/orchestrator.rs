//! LLM-backed orchestrator.
//!
//! Sequential runs hand every task to its assigned agent in order, feeding
//! earlier outputs forward as context. Hierarchical runs add a manager turn
//! before each task (pick the coworker) and one after the last (final answer).

use std::sync::Arc;

use anyhow::Context;
use async_trait::async_trait;
use tracing::{debug, info, warn};

use super::{Agent, Crew, CrewOutput, Orchestrator, Process, Task, TaskOutput};
use crate::config::Config;
use crate::llm::{ChatMessage, ChatOptions, LlmClient, OpenAiClient, TokenUsage};

const MANAGER_SYSTEM_PROMPT: &str = "You are the Crew Manager. You coordinate a team of \
coworkers, assign each task to the coworker best suited for it, and assemble their work \
into a final answer of the highest quality.";

/// Orchestrator that drives each agent turn through an [`LlmClient`].
pub struct LlmOrchestrator {
    client: Arc<dyn LlmClient>,
    model: String,
    temperature: f64,
}

impl LlmOrchestrator {
    pub fn new(client: Arc<dyn LlmClient>, model: impl Into<String>, temperature: f64) -> Self {
        Self {
            client,
            model: model.into(),
            temperature,
        }
    }

    /// Orchestrator talking to the configured OpenAI-compatible endpoint.
    pub fn from_config(config: &Config) -> Self {
        let client = OpenAiClient::new(config.api_key.clone(), config.base_url.clone());
        Self::new(Arc::new(client), config.model.clone(), config.temperature)
    }

    async fn complete(
        &self,
        model: &str,
        temperature: f64,
        messages: Vec<ChatMessage>,
        usage: &mut Option<TokenUsage>,
    ) -> anyhow::Result<String> {
        let response = self
            .client
            .chat_completion(
                model,
                &messages,
                ChatOptions {
                    temperature: Some(temperature),
                    max_tokens: None,
                },
            )
            .await?;

        if let Some(reported) = response.usage {
            *usage = Some(usage.map_or(reported, |u| u.add(&reported)));
        }

        response
            .content
            .filter(|c| !c.trim().is_empty())
            .ok_or_else(|| anyhow::anyhow!("Model {} returned an empty response", model))
    }

    /// Run one task with one agent.
    async fn perform(
        &self,
        crew: &Crew,
        agent: &Agent,
        task: &Task,
        previous: &[TaskOutput],
        usage: &mut Option<TokenUsage>,
    ) -> anyhow::Result<String> {
        let model = agent.llm.model.as_deref().unwrap_or(&self.model);
        let temperature = agent.llm.temperature.unwrap_or(self.temperature);
        let messages = vec![
            ChatMessage::system(agent_system_prompt(crew, agent)),
            ChatMessage::user(task_prompt(task, previous)),
        ];
        if agent.verbose {
            info!(agent = %agent.role, model = %model, "Agent started task");
        }
        let output = self.complete(model, temperature, messages, usage).await?;
        if agent.verbose {
            info!(agent = %agent.role, chars = output.len(), "Agent finished task");
        }
        Ok(output)
    }

    /// Ask the manager which coworker should handle `task`.
    async fn choose_agent(
        &self,
        crew: &Crew,
        task: &Task,
        usage: &mut Option<TokenUsage>,
    ) -> anyhow::Result<Arc<Agent>> {
        let roster = roster(crew.agents().iter());
        let prompt = format!(
            "Coworkers:\n{}\n\nTask:\n{}\n\nReply with the exact role of the coworker who \
             should perform this task and nothing else.",
            roster, task.description
        );
        let answer = self
            .complete(
                &self.model,
                self.temperature,
                vec![
                    ChatMessage::system(MANAGER_SYSTEM_PROMPT),
                    ChatMessage::user(prompt),
                ],
                usage,
            )
            .await?;

        match match_role(crew.agents(), &answer) {
            Some(agent) => Ok(agent),
            None => {
                warn!(
                    answer = %answer.trim(),
                    fallback = %task.agent.role,
                    "Manager named no known coworker, keeping the assigned agent"
                );
                Ok(task.agent.clone())
            }
        }
    }

    async fn run_sequential(&self, crew: &Crew) -> anyhow::Result<CrewOutput> {
        let mut outputs: Vec<TaskOutput> = Vec::with_capacity(crew.tasks().len());
        let mut usage = None;

        for (idx, task) in crew.tasks().iter().enumerate() {
            debug!(task = idx + 1, agent = %task.agent.role, "Running task");
            let raw = self
                .perform(crew, &task.agent, task, &outputs, &mut usage)
                .await
                .with_context(|| format!("Task {} ({}) failed", idx + 1, task.agent.role))?;
            outputs.push(TaskOutput {
                description: task.description.clone(),
                agent: task.agent.role.clone(),
                raw,
            });
        }

        let raw = outputs
            .last()
            .map(|o| o.raw.clone())
            .unwrap_or_default();
        Ok(CrewOutput {
            raw,
            tasks_output: outputs,
            usage,
        })
    }

    async fn run_hierarchical(&self, crew: &Crew) -> anyhow::Result<CrewOutput> {
        let mut outputs: Vec<TaskOutput> = Vec::with_capacity(crew.tasks().len());
        let mut usage = None;

        for (idx, task) in crew.tasks().iter().enumerate() {
            let agent = self
                .choose_agent(crew, task, &mut usage)
                .await
                .with_context(|| format!("Manager failed to assign task {}", idx + 1))?;
            debug!(task = idx + 1, agent = %agent.role, "Manager assigned task");
            let raw = self
                .perform(crew, &agent, task, &outputs, &mut usage)
                .await
                .with_context(|| format!("Task {} ({}) failed", idx + 1, agent.role))?;
            outputs.push(TaskOutput {
                description: task.description.clone(),
                agent: agent.role.clone(),
                raw,
            });
        }

        let mut prompt = String::from(
            "Your coworkers completed the following tasks. Combine their work into the \
             final answer. Return the complete content, not a summary.\n",
        );
        for (idx, output) in outputs.iter().enumerate() {
            prompt.push_str(&format!(
                "\n## Task {} ({})\n{}\n\n### Result\n{}\n",
                idx + 1,
                output.agent,
                output.description,
                output.raw
            ));
        }
        let raw = self
            .complete(
                &self.model,
                self.temperature,
                vec![
                    ChatMessage::system(MANAGER_SYSTEM_PROMPT),
                    ChatMessage::user(prompt),
                ],
                &mut usage,
            )
            .await
            .context("Manager failed to write the final answer")?;

        Ok(CrewOutput {
            raw,
            tasks_output: outputs,
            usage,
        })
    }
}

#[async_trait]
impl Orchestrator for LlmOrchestrator {
    async fn kickoff(&self, crew: &Crew) -> anyhow::Result<CrewOutput> {
        info!(
            process = %crew.process(),
            agents = crew.agents().len(),
            tasks = crew.tasks().len(),
            model = %self.model,
            "Crew kickoff"
        );
        match crew.process() {
            Process::Sequential => self.run_sequential(crew).await,
            Process::Hierarchical => self.run_hierarchical(crew).await,
        }
    }
}

/// One line per agent: role, then goal when there is one.
fn roster<'a>(agents: impl Iterator<Item = &'a Arc<Agent>>) -> String {
    agents
        .map(|a| {
            if a.goal.trim().is_empty() {
                format!("- {}", a.role)
            } else {
                format!("- {}: {}", a.role, a.goal.trim())
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Agent persona, plus the coworker roster for agents allowed to delegate.
fn agent_system_prompt(crew: &Crew, agent: &Agent) -> String {
    let mut prompt = agent.system_prompt();
    if !agent.allow_delegation {
        return prompt;
    }
    let coworkers: Vec<_> = crew
        .agents()
        .iter()
        .filter(|a| !std::ptr::eq(Arc::as_ptr(a), agent))
        .collect();
    if !coworkers.is_empty() {
        prompt.push_str(
            "\n\nYou may delegate parts of the work to these coworkers. Fold what each \
             would contribute into your answer, in their voice where it helps:\n",
        );
        prompt.push_str(&roster(coworkers.into_iter()));
    }
    prompt
}

/// User prompt for a task, including caller context and earlier outputs.
fn task_prompt(task: &Task, previous: &[TaskOutput]) -> String {
    let mut prompt = task.description.trim().to_string();

    if !task.expected_output.trim().is_empty() {
        prompt.push_str("\n\nThis is the expected criteria for your final answer: ");
        prompt.push_str(task.expected_output.trim());
    }
    prompt.push_str(
        "\nYou MUST return the actual complete content as the final answer, not a summary.",
    );

    if let Some(context) = task.context_text() {
        prompt.push_str("\n\nAdditional context:\n");
        prompt.push_str(&context);
    }

    if !previous.is_empty() {
        prompt.push_str("\n\nThis is the context you're working with (results of previous tasks):");
        for output in previous {
            prompt.push_str(&format!("\n\n[{}]\n{}", output.agent, output.raw.trim()));
        }
    }

    prompt
}

/// Find the agent a manager answer refers to: exact role first, then the
/// longest role mentioned anywhere in the answer.
fn match_role(agents: &[Arc<Agent>], answer: &str) -> Option<Arc<Agent>> {
    let normalized = answer
        .trim()
        .trim_matches(|c: char| c == '"' || c == '\'' || c == '.' || c == '*')
        .to_lowercase();

    if let Some(agent) = agents
        .iter()
        .find(|a| a.role.trim().to_lowercase() == normalized)
    {
        return Some(agent.clone());
    }

    agents
        .iter()
        .filter(|a| !a.role.trim().is_empty() && normalized.contains(&a.role.trim().to_lowercase()))
        .max_by_key(|a| a.role.trim().len())
        .cloned()
}
