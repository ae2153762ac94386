use std::process::ExitCode;

use catfacts::config::{AppConfig, Env};
use catfacts::{Server, app};
use tracing::{debug, error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "catfacts exited with an error");
            ExitCode::FAILURE
        }
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let mut env = Env::from_process().with_dotenv(".env")?;
    let config = AppConfig::from_env(&mut env)?;
    debug!(keys = ?env.keys(), "configuration read from environment");
    info!(
        upstream = %config.api.base_url,
        use_cache = config.api.use_cache,
        "configuration loaded"
    );

    let router = app::build_router(&config.api)?;
    let server = Server::bind(&config.server.bind_addr).await?;
    server.serve_until(router, shutdown_signal()).await?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        // Without a signal handler the server simply runs until killed.
        error!(error = %e, "failed to listen for Ctrl-C");
        std::future::pending::<()>().await;
    }
}
