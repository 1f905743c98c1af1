//! Bot configuration (`config/moviebot.toml`).
//!
//! ```toml
//! [data]
//! movies = "data/movies.txt"
//! ratings = "data/ratings.txt"
//! sentiment = "data/sentiment.txt"
//!
//! [lexicon]
//! delimiter = ","
//! header = false
//!
//! [recommend]
//! k = 10
//! threshold = 2.5
//!
//! [server]
//! max_sessions = 10000
//! session_idle_secs = 1800
//!
//! [ai]
//! llm_programming = false
//! config_path = "config/ai.json"
//! ```
//!
//! Every section and key is optional. Lookup order: `$MOVIEBOT_CONFIG_PATH`,
//! then `config/moviebot.toml`, then built-in defaults.

use anyhow::{anyhow, Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::ratings::DEFAULT_THRESHOLD;
use crate::recommend::DEFAULT_K;
use crate::session::DEFAULT_IDLE_TTL;

pub const DEFAULT_BOT_CONFIG_PATH: &str = "config/moviebot.toml";
pub const ENV_BOT_CONFIG_PATH: &str = "MOVIEBOT_CONFIG_PATH";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct BotConfig {
    pub data: DataPaths,
    pub lexicon: LexiconFormat,
    pub recommend: RecommendConfig,
    pub server: ServerConfig,
    pub ai: AiFeatures,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DataPaths {
    pub movies: PathBuf,
    pub ratings: PathBuf,
    pub sentiment: PathBuf,
}

impl Default for DataPaths {
    fn default() -> Self {
        Self {
            movies: PathBuf::from("data/movies.txt"),
            ratings: PathBuf::from("data/ratings.txt"),
            sentiment: PathBuf::from("data/sentiment.txt"),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LexiconFormat {
    pub delimiter: char,
    pub header: bool,
}

impl Default for LexiconFormat {
    fn default() -> Self {
        Self {
            delimiter: ',',
            header: false,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RecommendConfig {
    pub k: usize,
    pub threshold: f32,
}

impl Default for RecommendConfig {
    fn default() -> Self {
        Self {
            k: DEFAULT_K,
            threshold: DEFAULT_THRESHOLD,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub max_sessions: usize,
    /// A full store may evict sessions idle at least this long.
    pub session_idle_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            max_sessions: 10_000,
            session_idle_secs: DEFAULT_IDLE_TTL.as_secs(),
        }
    }
}

impl ServerConfig {
    pub fn idle_ttl(&self) -> Duration {
        Duration::from_secs(self.session_idle_secs)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AiFeatures {
    /// Emotion detection and off-topic filtering on every turn.
    pub llm_programming: bool,
    pub config_path: PathBuf,
}

impl Default for AiFeatures {
    fn default() -> Self {
        Self {
            llm_programming: false,
            config_path: PathBuf::from(crate::config::ai::DEFAULT_AI_CONFIG_PATH),
        }
    }
}

impl BotConfig {
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("reading bot config from {}", path.display()))?;
        let mut cfg: BotConfig = toml::from_str(&content)
            .with_context(|| format!("parsing bot config {}", path.display()))?;
        cfg.sanitize();
        Ok(cfg)
    }

    pub fn load_default() -> Result<Self> {
        if let Ok(p) = std::env::var(ENV_BOT_CONFIG_PATH) {
            let pb = PathBuf::from(p);
            if !pb.exists() {
                return Err(anyhow!("{ENV_BOT_CONFIG_PATH} points to non-existent path"));
            }
            return Self::load_from(&pb);
        }
        let default = PathBuf::from(DEFAULT_BOT_CONFIG_PATH);
        if default.exists() {
            return Self::load_from(&default);
        }
        Ok(Self::default())
    }

    fn sanitize(&mut self) {
        if self.recommend.k == 0 {
            self.recommend.k = DEFAULT_K;
        }
        if !(0.0..=5.0).contains(&self.recommend.threshold) {
            self.recommend.threshold = DEFAULT_THRESHOLD;
        }
        if self.server.max_sessions == 0 {
            self.server.max_sessions = ServerConfig::default().max_sessions;
        }
        if self.server.session_idle_secs == 0 {
            self.server.session_idle_secs = DEFAULT_IDLE_TTL.as_secs();
        }
    }
}
