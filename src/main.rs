use anyhow::Result;
use clap::Parser;

use phishsim::cli::Cli;
use phishsim::config::{get_config, init_config, init_config_from};
use phishsim::runtime::modes::{self, Mode};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    match cli.config.as_deref() {
        Some(path) => init_config_from(path),
        None => init_config(),
    }

    // guard 需要存活到进程结束，保证缓冲日志被写出
    let _log_guard = phishsim::system::init_logging(&get_config().logging)?;

    match modes::detect_mode(cli.command.as_ref()) {
        #[cfg(feature = "server")]
        Mode::Server => modes::run_server().await,
        #[cfg(feature = "cli")]
        Mode::Cli => {
            let Some(command) = cli.command else {
                return Ok(());
            };
            if let Err(e) = modes::run_cli(command).await {
                eprintln!("{}", e.format_colored());
                std::process::exit(1);
            }
            Ok(())
        }
        Mode::Unknown => {
            eprintln!("No execution mode available: build with the `server` feature");
            std::process::exit(1);
        }
    }
}
