use anyhow::Context;
use clap::Parser;
use flash_cli::{Cli, init_logger, run};
use flash_kernel::config::{FlashConfig, load_config};

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let cfg: FlashConfig =
        load_config(cli.config.as_deref()).context("Critical: Configuration is malformed")?;

    let _log = init_logger(&cfg.log, cli.verbose)?;

    let mut stdout = std::io::stdout().lock();
    run(cli.command, &cfg, &mut stdout).await
}
