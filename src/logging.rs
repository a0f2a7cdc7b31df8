use anyhow::Result;
use std::env;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Install the stderr subscriber. `OUTBOX_LOG` takes an `EnvFilter`
/// directive; `OUTBOX_LOG_FORMAT=json` switches to JSON lines.
pub fn init(verbose: bool) -> Result<()> {
    let default_level = if verbose { "info" } else { "warn" };
    let filter = EnvFilter::try_from_env("OUTBOX_LOG")
        .unwrap_or_else(|_| EnvFilter::new(default_level));
    let json = env::var("OUTBOX_LOG_FORMAT").is_ok_and(|v| v.trim().eq_ignore_ascii_case("json"));

    if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .try_init()
            .map_err(|e| anyhow::anyhow!("failed to initialize tracing: {e}"))?;
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_target(false),
            )
            .try_init()
            .map_err(|e| anyhow::anyhow!("failed to initialize tracing: {e}"))?;
    }
    Ok(())
}
