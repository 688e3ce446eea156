use std::process::ExitCode;

use clap::Parser;
use colored::*;

use distlaunch::{Config, LaunchEnvironment, LaunchError, SshProber, PROBE_TIMEOUT};

async fn start(cli: Config) -> Result<(), LaunchError> {
    let environment = LaunchEnvironment::current()?;
    let prober = SshProber::new(PROBE_TIMEOUT);
    distlaunch::run(cli, &prober, &environment).await
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Config::parse();

    match start(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!(
                "{}",
                format!("[distlaunch] {} failed: {}", e.stage(), e).red()
            );
            ExitCode::FAILURE
        }
    }
}
