//! crew-poc - run the researcher/writer crew on one topic.

use std::process::ExitCode;

use crew_bridge::cli::{self, PocCli};
use crew_bridge::config::{self, Config};
use crew_bridge::poc::{print_summary, CrewPoc};
use crew_bridge::util::{init_tracing, write_banner};

fn main() -> ExitCode {
    init_tracing();
    let cli: PocCli = match cli::parse_from(std::env::args_os()) {
        Ok(cli) => cli,
        Err(code) => return code,
    };

    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            println!("\n[CRITICAL ERROR] {}", e);
            return ExitCode::FAILURE;
        }
    };

    match runtime.block_on(run(cli)) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            println!("\n[CRITICAL ERROR] {:#}", e);
            tracing::error!("{:?}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: PocCli) -> anyhow::Result<bool> {
    let mut stdout = std::io::stdout();
    write_banner(&mut stdout, "CREW PROOF OF CONCEPT")?;
    println!();

    config::load_dotenv();
    let config = Config::from_env()?;
    tracing::info!("Loaded configuration: model={}", config.model);

    let mut poc = CrewPoc::from_config(&config);
    let results = poc.execute_crew(&cli.topic).await;
    poc.save_results(&results, &cli.output)?;

    print_summary(&mut stdout, &results)?;
    Ok(results.success)
}
