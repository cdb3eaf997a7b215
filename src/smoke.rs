//! Installation smoke checks.
//!
//! Confirms the runtime pieces a crew needs can be constructed without
//! calling any model: the HTTP client, the embedded SQLite driver, and the
//! agent/task/crew types.

use std::io::{self, Write};
use std::sync::Arc;

use crate::crew::{Agent, Crew, Process, Task};
use crate::util::{write_banner, write_rule};

/// A named check; output goes to `out`, the return value is pass/fail.
pub type CheckFn = fn(&mut dyn Write) -> bool;

pub const CHECKS: [(&str, CheckFn); 3] = [
    ("Installation", check_installation),
    ("Agent Creation", check_agent_creation),
    ("Task Creation", check_task_creation),
];

#[derive(Debug, Clone)]
pub struct SmokeReport {
    pub results: Vec<(&'static str, bool)>,
}

impl SmokeReport {
    pub fn passed(&self) -> usize {
        self.results.iter().filter(|(_, ok)| *ok).count()
    }

    pub fn total(&self) -> usize {
        self.results.len()
    }

    pub fn all_passed(&self) -> bool {
        self.passed() == self.total()
    }
}

pub fn check_installation(out: &mut dyn Write) -> bool {
    let _ = writeln!(out, "Testing crew runtime installation...\n");
    match installation(out) {
        Ok(()) => {
            let _ = writeln!(out, "\n[OK] All components available!");
            true
        }
        Err(e) => {
            let _ = writeln!(out, "\n[ERROR] Installation error: {:#}", e);
            false
        }
    }
}

fn installation(out: &mut dyn Write) -> anyhow::Result<()> {
    writeln!(out, "[OK] {} version: {}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"))?;

    reqwest::Client::builder().build()?;
    writeln!(out, "[OK] HTTP client available")?;

    let conn = rusqlite::Connection::open_in_memory()?;
    let version: String = conn.query_row("SELECT sqlite_version()", [], |row| row.get(0))?;
    writeln!(out, "[OK] SQLite {} available", version)?;
    Ok(())
}

pub fn check_agent_creation(out: &mut dyn Write) -> bool {
    let _ = writeln!(out, "\nTesting agent creation...\n");

    let agent = Agent::new("Test Agent")
        .with_goal("Verify crew functionality")
        .with_backstory("A simple test agent");

    if agent.role.is_empty() || !agent.system_prompt().contains(&agent.goal) {
        let _ = writeln!(out, "[ERROR] Agent creation failed: incomplete agent");
        return false;
    }
    let _ = writeln!(out, "[OK] Agent created: {}", agent.role);
    true
}

pub fn check_task_creation(out: &mut dyn Write) -> bool {
    let _ = writeln!(out, "\nTesting task creation...\n");

    let agent = Arc::new(
        Agent::new("Assistant")
            .with_goal("Help with tasks")
            .with_backstory("A helpful assistant"),
    );
    let task = Task::new("Say hello", agent.clone()).with_expected_output("A greeting message");
    let description = task.description.clone();

    match Crew::new(vec![agent], vec![task], Process::Sequential) {
        Ok(_) => {
            let _ = writeln!(out, "[OK] Task created: {}", description);
            true
        }
        Err(e) => {
            let _ = writeln!(out, "[ERROR] Task creation failed: {}", e);
            false
        }
    }
}

/// Run every check in order and print the summary.
pub fn run_all(out: &mut dyn Write) -> io::Result<SmokeReport> {
    write_banner(out, "CREW BASIC TESTS")?;

    let results: Vec<_> = CHECKS
        .iter()
        .map(|(name, check)| (*name, check(&mut *out)))
        .collect();
    let report = SmokeReport { results };

    writeln!(out)?;
    write_banner(out, "TEST SUMMARY")?;
    for (name, ok) in &report.results {
        let status = if *ok { "[PASS]" } else { "[FAIL]" };
        writeln!(out, "{}: {}", status, name)?;
    }
    writeln!(out, "\nTotal: {}/{} tests passed", report.passed(), report.total())?;
    write_rule(out, '=')?;

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn installation_reports_sqlite_version() {
        let mut out = Vec::new();
        assert!(check_installation(&mut out));
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("[OK] crew_bridge version:"));
        assert!(text.contains("[OK] SQLite 3."));
    }

    #[test]
    fn agent_and_task_checks_pass() {
        let mut out = Vec::new();
        assert!(check_agent_creation(&mut out));
        assert!(check_task_creation(&mut out));
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("[OK] Agent created: Test Agent"));
        assert!(text.contains("[OK] Task created: Say hello"));
    }

    #[test]
    fn summary_lists_every_check() {
        let mut out = Vec::new();
        let report = run_all(&mut out).unwrap();
        assert_eq!(report.total(), 3);
        assert!(report.all_passed());

        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("[PASS]: Installation"));
        assert!(text.contains("[PASS]: Agent Creation"));
        assert!(text.contains("[PASS]: Task Creation"));
        assert!(text.contains("Total: 3/3 tests passed"));
    }

    #[test]
    fn report_counts_failures() {
        let report = SmokeReport {
            results: vec![("Installation", false), ("Agent Creation", true)],
        };
        assert_eq!(report.passed(), 1);
        assert!(!report.all_passed());
    }
}
