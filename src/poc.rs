//! Proof-of-concept crew: a researcher and a writer working one topic.
//!
//! Exercises the whole stack end to end without the bridge: two fixed
//! agents, two sequential tasks, a human-readable log and a results file.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::config::Config;
use crate::cost::{estimate_cost, estimate_tokens};
use crate::crew::{Agent, Crew, LlmOrchestrator, Orchestrator, Process, Task};
use crate::execution_log::{ExecutionLog, LogEntry, LogFormat};
use crate::util::{truncate_chars, write_rule};

pub const DEFAULT_TOPIC: &str = "AI trends 2025";
pub const RESULTS_FILE: &str = "poc_results.json";

/// Characters of the result shown in the summary.
const PREVIEW_CHARS: usize = 500;

/// Outcome of a POC run, as saved to the results file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PocResult {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tokens_used: Option<u64>,
    pub execution_log: Vec<LogEntry>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cost: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

pub struct CrewPoc {
    orchestrator: Arc<dyn Orchestrator>,
    log: ExecutionLog,
}

impl CrewPoc {
    pub fn new(orchestrator: Arc<dyn Orchestrator>, log: ExecutionLog) -> Self {
        Self { orchestrator, log }
    }

    /// POC wired to the configured model, logging to stdout.
    pub fn from_config(config: &Config) -> Self {
        Self::new(
            Arc::new(LlmOrchestrator::from_config(config)),
            ExecutionLog::stdout(None, LogFormat::Human),
        )
    }

    pub fn log(&self) -> &ExecutionLog {
        &self.log
    }

    /// Build the researcher and the writer.
    pub fn create_simple_crew(&mut self) -> (Arc<Agent>, Arc<Agent>) {
        self.log.info("Creating test crew with 2 agents");

        let researcher = Arc::new(
            Agent::new("Content Researcher")
                .with_goal("Find accurate and relevant information about AI trends")
                .with_backstory(
                    "You are an expert researcher specializing in artificial intelligence \
                     and technology trends. You excel at finding credible sources and \
                     synthesizing information into clear, actionable insights.",
                )
                .with_verbose(true),
        );

        let writer = Arc::new(
            Agent::new("Content Writer")
                .with_goal("Create engaging and informative content based on research")
                .with_backstory(
                    "You are a skilled technical writer with expertise in making complex \
                     AI topics accessible to a general audience. You write clear, engaging \
                     content that educates and informs.",
                )
                .with_verbose(true),
        );

        self.log.info_with(
            "Agents created successfully",
            json!({"researcher": researcher.role, "writer": writer.role}),
        );

        (researcher, writer)
    }

    /// Research task for `topic`, then a writing task over its findings.
    pub fn create_tasks(
        &mut self,
        researcher: &Arc<Agent>,
        writer: &Arc<Agent>,
        topic: &str,
    ) -> Vec<Task> {
        self.log.info(format!("Creating tasks for topic: {}", topic));

        let research = Task::new(
            format!(
                "Research the top 3 {}.\n\
                 Focus on practical applications and real-world impact.\n\
                 Provide sources and brief explanations for each trend.",
                topic
            ),
            researcher.clone(),
        )
        .with_expected_output("A list of 3 AI trends with descriptions and sources");

        let writing = Task::new(
            "Using the research findings, write a brief article (200 words) about these \
             AI trends. Make it engaging and accessible to a general audience.\n\
             Include a compelling introduction and conclusion.",
            writer.clone(),
        )
        .with_expected_output("A 200-word article about AI trends");

        self.log
            .info_with("Tasks created successfully", json!({"task_count": 2}));

        vec![research, writing]
    }

    /// Run the two-task crew sequentially. Failures become a failed result.
    pub async fn execute_crew(&mut self, topic: &str) -> PocResult {
        self.log
            .info_with("Starting crew execution", json!({"topic": topic}));

        let (researcher, writer) = self.create_simple_crew();
        let tasks = self.create_tasks(&researcher, &writer, topic);

        let outcome = match Crew::new(vec![researcher, writer], tasks, Process::Sequential) {
            Ok(crew) => {
                self.log.info("Crew configured, starting execution");
                self.orchestrator.kickoff(&crew).await
            }
            Err(e) => Err(e.into()),
        };

        match outcome {
            Ok(output) => {
                self.log.info("Crew execution completed successfully");
                let result = output.to_string();
                let tokens = estimate_tokens(&result);
                PocResult {
                    success: true,
                    result: Some(result),
                    tokens_used: Some(tokens),
                    execution_log: self.log.entries().to_vec(),
                    cost: Some(estimate_cost(tokens)),
                    error: None,
                }
            }
            Err(e) => {
                let message = format!("{:#}", e);
                self.log.error(format!("Crew execution failed: {}", message));
                PocResult {
                    success: false,
                    result: None,
                    tokens_used: None,
                    execution_log: self.log.entries().to_vec(),
                    cost: None,
                    error: Some(message),
                }
            }
        }
    }

    /// Write `results` as pretty JSON to `path`.
    pub fn save_results(&mut self, results: &PocResult, path: &Path) -> anyhow::Result<()> {
        {
            let file = File::create(path)
                .with_context(|| format!("Failed to create {}", path.display()))?;
            let mut writer = BufWriter::new(file);
            serde_json::to_writer_pretty(&mut writer, results)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            writer.flush()?;
        }
        self.log
            .info(format!("Results saved to {}", path.display()));
        Ok(())
    }
}

/// Print the end-of-run summary with a preview of the result.
pub fn print_summary(out: &mut dyn Write, results: &PocResult) -> io::Result<()> {
    writeln!(out)?;
    write_rule(out, '=')?;
    writeln!(out, "EXECUTION SUMMARY")?;
    write_rule(out, '=')?;
    writeln!(out, "Success: {}", results.success)?;

    if results.success {
        writeln!(out, "Tokens Used: {}", results.tokens_used.unwrap_or(0))?;
        writeln!(out, "Estimated Cost: ${}", results.cost.unwrap_or(0.0))?;
        writeln!(out, "\nResult Preview:")?;
        write_rule(out, '-')?;
        let text = results.result.as_deref().unwrap_or("");
        let preview = truncate_chars(text, PREVIEW_CHARS);
        if preview.len() < text.len() {
            writeln!(out, "{}...", preview)?;
        } else {
            writeln!(out, "{}", text)?;
        }
    } else {
        writeln!(
            out,
            "Error: {}",
            results.error.as_deref().unwrap_or("Unknown error")
        )?;
    }

    writeln!(out)?;
    write_rule(out, '=')
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crew::{CrewOutput, TaskOutput};
    use crate::execution_log::SharedBuffer;
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Echoes a canned answer and remembers which roles ran which task.
    #[derive(Default)]
    struct EchoOrchestrator {
        fail: bool,
        seen: Mutex<Vec<(String, String)>>,
    }

    #[async_trait]
    impl Orchestrator for EchoOrchestrator {
        async fn kickoff(&self, crew: &Crew) -> anyhow::Result<CrewOutput> {
            if self.fail {
                anyhow::bail!("Network error: connection refused");
            }
            let mut seen = self.seen.lock().unwrap();
            let mut outputs = Vec::new();
            for task in crew.tasks() {
                seen.push((task.agent.role.clone(), task.description.clone()));
                outputs.push(TaskOutput {
                    description: task.description.clone(),
                    agent: task.agent.role.clone(),
                    raw: "AI agents are everywhere now".to_string(),
                });
            }
            Ok(CrewOutput {
                raw: "AI agents are everywhere now".to_string(),
                tasks_output: outputs,
                usage: None,
            })
        }
    }

    fn poc(orchestrator: Arc<EchoOrchestrator>) -> (CrewPoc, SharedBuffer) {
        let buffer = SharedBuffer::default();
        let log = ExecutionLog::new(None, LogFormat::Human, Box::new(buffer.clone()));
        (CrewPoc::new(orchestrator, log), buffer)
    }

    #[tokio::test]
    async fn researcher_then_writer_on_topic() {
        let orchestrator = Arc::new(EchoOrchestrator::default());
        let (mut poc, buffer) = poc(orchestrator.clone());

        let results = poc.execute_crew("quantum startups").await;
        assert!(results.success);
        assert_eq!(results.result.as_deref(), Some("AI agents are everywhere now"));
        assert_eq!(results.tokens_used, Some(6));
        assert_eq!(results.cost, Some(0.0));

        let seen = orchestrator.seen.lock().unwrap();
        assert_eq!(seen.len(), 2);
        assert_eq!(seen[0].0, "Content Researcher");
        assert!(seen[0].1.starts_with("Research the top 3 quantum startups."));
        assert_eq!(seen[1].0, "Content Writer");

        let messages: Vec<_> = results
            .execution_log
            .iter()
            .map(|e| e.message.as_str())
            .collect();
        assert_eq!(
            messages,
            [
                "Starting crew execution",
                "Creating test crew with 2 agents",
                "Agents created successfully",
                "Creating tasks for topic: quantum startups",
                "Tasks created successfully",
                "Crew configured, starting execution",
                "Crew execution completed successfully",
            ]
        );
        assert!(buffer.contents().contains("[INFO] Starting crew execution\n  Data: {"));
    }

    #[tokio::test]
    async fn failure_is_captured_in_result() {
        let orchestrator = Arc::new(EchoOrchestrator {
            fail: true,
            ..Default::default()
        });
        let (mut poc, buffer) = poc(orchestrator);

        let results = poc.execute_crew(DEFAULT_TOPIC).await;
        assert!(!results.success);
        assert_eq!(results.error.as_deref(), Some("Network error: connection refused"));
        assert!(results.result.is_none());
        assert_eq!(
            results.execution_log.last().unwrap().message,
            "Crew execution failed: Network error: connection refused"
        );
        assert!(buffer.contents().contains("[ERROR] Crew execution failed"));
    }

    #[tokio::test]
    async fn save_results_writes_pretty_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(RESULTS_FILE);
        let (mut poc, _buffer) = poc(Arc::new(EchoOrchestrator::default()));

        let results = poc.execute_crew(DEFAULT_TOPIC).await;
        poc.save_results(&results, &path).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.starts_with("{\n  \"success\": true"));
        let saved: PocResult = serde_json::from_str(&text).unwrap();
        assert_eq!(saved.result, results.result);
        assert_eq!(saved.execution_log.len(), results.execution_log.len());
        assert_eq!(
            poc.log().entries().last().unwrap().message,
            format!("Results saved to {}", path.display())
        );
    }

    #[test]
    fn save_results_reports_unwritable_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join(RESULTS_FILE);
        let (mut poc, _buffer) = poc(Arc::new(EchoOrchestrator::default()));
        let results = PocResult {
            success: false,
            result: None,
            tokens_used: None,
            execution_log: vec![],
            cost: None,
            error: Some("boom".to_string()),
        };
        let err = poc.save_results(&results, &path).unwrap_err();
        assert!(err.to_string().starts_with("Failed to create"));
    }

    #[test]
    fn summary_truncates_long_results() {
        let long = "word ".repeat(200);
        let results = PocResult {
            success: true,
            result: Some(long.clone()),
            tokens_used: Some(260),
            execution_log: vec![],
            cost: Some(0.0001),
            error: None,
        };
        let mut out = Vec::new();
        print_summary(&mut out, &results).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("Success: true"));
        assert!(text.contains("Tokens Used: 260"));
        assert!(text.contains("Estimated Cost: $0.0001"));
        assert!(text.contains(&format!("{}...", &long[..500])));
        assert!(!text.contains(&long));
    }

    #[test]
    fn summary_shows_error_on_failure() {
        let results = PocResult {
            success: false,
            result: None,
            tokens_used: None,
            execution_log: vec![],
            cost: None,
            error: None,
        };
        let mut out = Vec::new();
        print_summary(&mut out, &results).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("Success: false"));
        assert!(text.contains("Error: Unknown error"));
    }
}
