// src/lib.rs
// Public library surface for the binary and integration tests.

pub mod ai;
pub mod api;
pub mod catalog;
pub mod config;
pub mod engine;
pub mod error;
pub mod lexicon;
pub mod metrics;
pub mod ratings;
pub mod recommend;
pub mod resolver;
pub mod sentiment;
pub mod session;
pub mod stemmer;
pub mod titles;

pub use crate::api::{create_router, AppState};
pub use crate::engine::{MovieBot, TurnOutcome, TurnReport};

use tracing::info;

use crate::ai::DynAiClient;
use crate::config::BotConfig;
use crate::engine::{BotSettings, Resources};
use crate::session::SessionStore;

/// Load the corpus named in `cfg` and wire it into shared HTTP state.
pub fn build_state(cfg: &BotConfig, ai: DynAiClient) -> anyhow::Result<AppState> {
    let resources = Resources::load(cfg)?;
    let settings = BotSettings::from(cfg);
    info!(
        k = settings.k,
        llm_programming = settings.llm_programming,
        ai = ai.provider_name(),
        max_sessions = cfg.server.max_sessions,
        session_idle_secs = cfg.server.session_idle_secs,
        "moviebot ready"
    );
    Ok(AppState::new(
        MovieBot::new(resources, settings, ai),
        SessionStore::with_idle_ttl(cfg.server.max_sessions, cfg.server.idle_ttl()),
    ))
}
