//! Movie recommendation chatbot: binary entrypoint.
//! Boots the Axum HTTP server with the loaded corpus, session store, and
//! Prometheus metrics.

use anyhow::Context;
use shuttle_axum::ShuttleAxum;
use tracing::warn;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use moviebot::ai::build_client_from_config;
use moviebot::config::{AiConfig, BotConfig};
use moviebot::metrics::Metrics;
use moviebot::{build_state, create_router};

/// Enable compact tracing logs in development only.
/// Activation requires BOTH:
///   - dev environment (debug build OR SHUTTLE_ENV in {local, development, dev})
///   - MOVIEBOT_DEV_LOG=1
fn enable_dev_tracing() {
    let dev_flag = std::env::var("MOVIEBOT_DEV_LOG")
        .ok()
        .is_some_and(|v| v == "1");

    let is_dev_env = cfg!(debug_assertions)
        || matches!(
            std::env::var("SHUTTLE_ENV")
                .unwrap_or_default()
                .to_ascii_lowercase()
                .as_str(),
            "local" | "development" | "dev"
        );

    if !(dev_flag && is_dev_env) {
        return;
    }

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("moviebot=info,warn"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().compact())
        .init();
}

#[shuttle_runtime::main]
async fn axum() -> ShuttleAxum {
    // Load .env in local/dev; no-op in prod environments.
    let _ = dotenvy::dotenv();

    enable_dev_tracing();

    let cfg = BotConfig::load_default().context("loading bot config")?;
    let ai_cfg = AiConfig::load_or_disabled(&cfg.ai.config_path).unwrap_or_else(|e| {
        warn!(error = %e, "invalid AI config, language model disabled");
        AiConfig::default()
    });
    let ai = build_client_from_config(&ai_cfg);

    let state = build_state(&cfg, ai)?;
    let mut router = create_router(state);

    match Metrics::init() {
        Ok(metrics) => router = router.merge(metrics.router()),
        Err(e) => warn!(error = %e, "metrics disabled"),
    }

    Ok(router.into())
}
