// Entrypoint for the shell.
// - Keeps `main` small: read config, build the collaborators, hand the
//   navigator to the input loop.
// - Returns `anyhow::Result` so startup failures (missing AUTH_TOKEN,
//   unreachable service) end the process with a message.

use anyhow::Context;
use tracing_subscriber::EnvFilter;
use workdocs_shell::{
    api::WorkDocsClient, config::Config, navigator::Navigator, shell, transport::HttpTransport,
};

fn main() -> anyhow::Result<()> {
    // Logs go to stderr and stay quiet unless RUST_LOG asks for more.
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("warn"))
        .context("failed to init logging filter")?;
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();

    let config = Config::from_env()?;
    tracing::debug!(?config, "configuration loaded");

    let backend = WorkDocsClient::from_config(&config)?;
    let transport = HttpTransport::new(config.show_progress)?;
    let navigator =
        Navigator::start(backend, transport).context("failed to look up the root folder")?;

    shell::run(shell::Shell::new(navigator).with_spinners(config.show_progress))?;
    Ok(())
}
