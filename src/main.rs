mod address;
mod args;
mod config;
mod hardware;
mod lifecycle;
mod report;
mod scan;
mod speed;
mod transport;

use std::process::ExitCode;
use tracing::{info, Level};

fn main() -> Result<ExitCode, String> {
    let args: args::TopLevel = argh::from_env();
    init_logging(args.verbose);

    let config = config::Config::from_args(&args).map_err(|e| format!("{}", e))?;

    let mut lifecycle = lifecycle::Lifecycle::new(hardware::RaspberryPi);
    // a failed install already requested termination, nothing more to do here
    let _ = lifecycle.initialize();

    let stdout = std::io::stdout();
    let summary = lifecycle.run(&config, &mut stdout.lock());
    if lifecycle.termination_requested() {
        info!("Termination requested, shutting down");
    }
    lifecycle.shutdown();

    Ok(ExitCode::from(config.exit_policy.exit_code(&summary)))
}

fn init_logging(verbose: bool) {
    let level = if verbose { Level::DEBUG } else { Level::INFO };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();
}
