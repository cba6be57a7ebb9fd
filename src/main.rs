use dynatool::console::{run_repl, StdConsole};
use dynatool::server::BuiltinServer;
use dynatool::{Config, Session};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Logs go to stderr so they never interleave with console output
    let json_logs = std::env::var("LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "dynatool=info".into()),
        )
        .with(json_logs.then(|| {
            tracing_subscriber::fmt::layer()
                .json()
                .with_writer(std::io::stderr)
        }))
        .with((!json_logs).then(|| tracing_subscriber::fmt::layer().with_writer(std::io::stderr)))
        .init();

    tracing::info!("Starting dynatool");

    let config = Config::from_env()?;

    // Build the session (encoder, registry snapshot, fresh index)
    let start = std::time::Instant::now();
    let encoder = config.build_encoder()?;
    let session = Session::start(config, Arc::new(BuiltinServer::new()), encoder).await?;
    tracing::info!(
        elapsed_ms = start.elapsed().as_millis() as u64,
        tools = session.registry().len(),
        "Session initialized",
    );

    run_repl(&session, &mut StdConsole).await?;

    tracing::info!("Session closed");
    Ok(())
}
