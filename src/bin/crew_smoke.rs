//! crew-smoke - verify the crew runtime is usable on this machine.

use std::process::ExitCode;

use crew_bridge::cli::{self, SmokeCli};
use crew_bridge::config;
use crew_bridge::smoke;
use crew_bridge::util::init_tracing;

fn main() -> ExitCode {
    init_tracing();
    if let Err(code) = cli::parse_from::<SmokeCli, _, _>(std::env::args_os()) {
        return code;
    }
    config::load_dotenv();

    match smoke::run_all(&mut std::io::stdout()) {
        Ok(report) if report.all_passed() => ExitCode::SUCCESS,
        Ok(_) => ExitCode::FAILURE,
        Err(e) => {
            tracing::error!("Failed to write report: {}", e);
            ExitCode::FAILURE
        }
    }
}
