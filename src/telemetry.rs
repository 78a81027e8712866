use anyhow::{Context, Result};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use uuid::Uuid;

/// Install the global subscriber.
///
/// `RUST_LOG` wins over `default_level` when set. Logs go to stderr so the
/// JSON report on stdout stays machine readable.
pub fn init_telemetry(json: bool, default_level: &str) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_level))
        .with_context(|| format!("invalid log level directive: {default_level}"))?;

    let registry = tracing_subscriber::registry().with(filter);

    if json {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_current_span(true)
                    .with_span_list(true)
                    .with_writer(std::io::stderr),
            )
            .try_init()
            .context("tracing subscriber already installed")?;
    } else {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .compact()
                    .with_target(false)
                    .with_writer(std::io::stderr),
            )
            .try_init()
            .context("tracing subscriber already installed")?;
    }

    Ok(())
}

/// Generate a correlation ID for linking the logs of one run
pub fn generate_correlation_id() -> String {
    Uuid::new_v4().to_string()
}

/// Span covering a whole batch run
pub fn batch_span(run_id: &str, source: &str, targets: usize, dry_run: bool) -> tracing::Span {
    tracing::info_span!(
        "batch_merge",
        run.id = run_id,
        source = source,
        targets = targets,
        dry_run = dry_run
    )
}

/// Span covering one target branch
pub fn branch_span(branch: &str, index: usize) -> tracing::Span {
    tracing::info_span!("branch_merge", branch = branch, index = index)
}
