use clap::Parser;
use std::process;

use slk::{cli, services, settings};

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let args = cli::Args::parse();

    env_logger::Builder::from_default_env()
        .filter_level(args.log_level.into())
        .format_timestamp_secs()
        .init();

    let result = match settings::merge_settings_with_args(&args) {
        Ok(args) => services::run(args).await,
        Err(e) => Err(e),
    };

    if let Err(e) = result {
        eprintln!("Error: {:#}", e);
        process::exit(1);
    }
}
