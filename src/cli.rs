//! Command-line arguments for the three binaries.

use std::ffi::OsString;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::error::ErrorKind;
use clap::Parser;

use crate::bridge::BridgeInvocation;
use crate::poc::{DEFAULT_TOPIC, RESULTS_FILE};

/// Run one crew described as JSON and print the result after `__FINAL_RESULT__`.
#[derive(Parser, Debug)]
#[command(name = "crew-bridge")]
#[command(author, version, about, long_about = None)]
pub struct BridgeCli {
    /// Execution id, echoed in every log line
    pub execution_id: String,

    /// Crew configuration (JSON object with agents and tasks)
    pub crew_config_json: String,

    /// Input variables substituted into `{name}` placeholders (JSON object)
    pub input_variables_json: Option<String>,

    /// Fail when a task references an unknown agent instead of using the first one
    #[arg(long)]
    pub strict_agent_refs: bool,
}

impl BridgeCli {
    pub fn into_invocation(self) -> BridgeInvocation {
        BridgeInvocation {
            execution_id: self.execution_id,
            crew_config_json: self.crew_config_json,
            input_variables_json: self.input_variables_json,
            strict_agent_refs: self.strict_agent_refs,
        }
    }
}

/// Run the researcher/writer proof of concept on a topic.
#[derive(Parser, Debug)]
#[command(name = "crew-poc")]
#[command(author, version, about, long_about = None)]
pub struct PocCli {
    /// Topic to research and write about
    #[arg(default_value = DEFAULT_TOPIC)]
    pub topic: String,

    /// Where to save the results
    #[arg(short, long, default_value = RESULTS_FILE)]
    pub output: PathBuf,
}

/// Check that the crew runtime is installed and usable.
#[derive(Parser, Debug)]
#[command(name = "crew-smoke")]
#[command(author, version, about, long_about = None)]
pub struct SmokeCli {}

/// `--help` and `--version` stop the program without it having failed.
pub fn is_informational(err: &clap::Error) -> bool {
    matches!(err.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion)
}

/// Parse `args`, printing clap's message on error. The error carries the
/// exit code: success for help/version, failure for anything else.
pub fn parse_from<T, I, A>(args: I) -> Result<T, ExitCode>
where
    T: Parser,
    I: IntoIterator<Item = A>,
    A: Into<OsString> + Clone,
{
    T::try_parse_from(args).map_err(|e| {
        let _ = e.print();
        if is_informational(&e) {
            ExitCode::SUCCESS
        } else {
            ExitCode::FAILURE
        }
    })
}
