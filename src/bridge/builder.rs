//! Turns agent/task descriptors into crew objects.

use std::collections::HashMap;
use std::sync::Arc;

use super::request::{interpolate, AgentDescriptor, DescriptorId, InputVariables, TaskDescriptor};
use super::BridgeError;
use crate::crew::{Agent, Task};
use crate::execution_log::ExecutionLog;
use crate::util::truncate_chars;

/// What to do with a task whose `agent_id` matches no agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AgentRefPolicy {
    /// Reassign to the first agent and log a warning
    #[default]
    FallbackToFirst,
    /// Fail the build
    Reject,
}

/// An agent paired with the id the caller knows it by.
#[derive(Debug, Clone)]
pub struct BuiltAgent {
    pub id: DescriptorId,
    pub agent: Arc<Agent>,
}

/// Build agents in input order, logging one entry per agent.
pub fn build_agents(
    descriptors: &[AgentDescriptor],
    inputs: &InputVariables,
    log: &mut ExecutionLog,
) -> Result<Vec<BuiltAgent>, BridgeError> {
    let mut agents = Vec::with_capacity(descriptors.len());

    for descriptor in descriptors {
        if descriptor.role.trim().is_empty() {
            return Err(BridgeError::Build(format!(
                "agent {} has an empty role",
                descriptor.id
            )));
        }
        log.info(format!("Creating agent: {}", descriptor.display_name()));

        if let Some(max) = descriptor.max_iterations {
            tracing::debug!(agent = %descriptor.id, max_iterations = max, "Agents run one turn per task");
        }

        let agent = Agent::new(interpolate(&descriptor.role, inputs))
            .with_goal(interpolate(descriptor.goal.as_deref().unwrap_or(""), inputs))
            .with_backstory(interpolate(
                descriptor.backstory.as_deref().unwrap_or(""),
                inputs,
            ))
            .with_delegation(descriptor.allow_delegation)
            .with_verbose(descriptor.verbose)
            .with_llm(descriptor.llm_overrides());

        agents.push(BuiltAgent {
            id: descriptor.id.clone(),
            agent: Arc::new(agent),
        });
    }

    Ok(agents)
}

/// Build tasks in input order, resolving each `agent_id` against `agents`.
pub fn build_tasks(
    descriptors: &[TaskDescriptor],
    agents: &[BuiltAgent],
    inputs: &InputVariables,
    policy: AgentRefPolicy,
    log: &mut ExecutionLog,
) -> Result<Vec<Task>, BridgeError> {
    // later duplicates win, like a map built from the list
    let lookup: HashMap<&DescriptorId, &Arc<Agent>> =
        agents.iter().map(|a| (&a.id, &a.agent)).collect();

    let mut tasks = Vec::with_capacity(descriptors.len());

    for (idx, descriptor) in descriptors.iter().enumerate() {
        if descriptor.description.trim().is_empty() {
            return Err(BridgeError::Build(format!(
                "task {} has an empty description",
                idx + 1
            )));
        }
        let description = interpolate(&descriptor.description, inputs);
        log.info(format!(
            "Creating task: {}...",
            truncate_chars(&description, 50)
        ));

        let resolved = descriptor
            .agent_id
            .as_ref()
            .and_then(|id| lookup.get(id).copied());

        let agent = match resolved {
            Some(agent) => agent.clone(),
            None => {
                let first = agents.first().ok_or_else(|| {
                    BridgeError::Build("cannot assign tasks: the crew has no agents".to_string())
                })?;
                if policy == AgentRefPolicy::Reject {
                    return Err(BridgeError::Build(format!(
                        "task {} references unknown agent {}",
                        idx + 1,
                        descriptor
                            .agent_id
                            .as_ref()
                            .map(|id| id.to_string())
                            .unwrap_or_else(|| "(none)".to_string())
                    )));
                }
                log.warning("Agent not found for task, using first agent");
                first.agent.clone()
            }
        };

        let mut task = Task::new(description, agent)
            .with_expected_output(interpolate(
                descriptor.expected_output.as_deref().unwrap_or(""),
                inputs,
            ));
        if let Some(context) = descriptor.context.clone() {
            task = task.with_context(context);
        }
        tasks.push(task);
    }

    Ok(tasks)
}
