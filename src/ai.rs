//! Language-model collaborator: provider abstraction + response cache + daily limit.
//!
//! The core only needs a handful of narrow answers from a language model
//! (is this title foreign? what is it in English? is this line off-topic?
//! which emotions does it carry?). Each answer is an `Option`: `None` means
//! the collaborator was unavailable or replied with something unusable, and
//! callers degrade instead of failing the turn.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::ai::AiConfig;

// ------------------------------------------------------------
// Public surface
// ------------------------------------------------------------

/// Ekman's six basic emotions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Emotion {
    Anger,
    Disgust,
    Fear,
    Happiness,
    Sadness,
    Surprise,
}

impl Emotion {
    pub fn parse(label: &str) -> Option<Self> {
        match label.trim().to_ascii_lowercase().as_str() {
            "anger" => Some(Emotion::Anger),
            "disgust" => Some(Emotion::Disgust),
            "fear" => Some(Emotion::Fear),
            "happiness" => Some(Emotion::Happiness),
            "sadness" => Some(Emotion::Sadness),
            "surprise" => Some(Emotion::Surprise),
            _ => None,
        }
    }
}

/// Trait object used by the resolver and the session engine.
#[async_trait]
pub trait AiClient: Send + Sync {
    /// `Some(true)` when the text is not English.
    async fn is_foreign(&self, text: &str) -> Option<bool>;
    /// English rendering of a (foreign) movie title.
    async fn translate_title(&self, title: &str) -> Option<String>;
    /// `Some(true)` when the line has nothing to do with movies.
    async fn is_off_topic(&self, text: &str) -> Option<bool>;
    async fn detect_emotions(&self, text: &str) -> Option<Vec<Emotion>>;
    /// Provider name for diagnostics.
    fn provider_name(&self) -> &'static str;
}

pub type DynAiClient = Arc<dyn AiClient>;

/// Build a client according to config.
///
/// * `enabled == false` or an unknown provider -> `DisabledClient`.
/// * `"openai"` -> OpenAI wrapped with caching + daily limit.
pub fn build_client_from_config(config: &AiConfig) -> DynAiClient {
    if !config.enabled {
        return Arc::new(DisabledClient);
    }
    match config.provider.as_str() {
        "openai" => {
            let provider = OpenAiProvider::new(config.api_key.clone(), config.model.as_deref());
            Arc::new(LlmClient::new(provider, config.daily_limit))
        }
        other => {
            warn!(provider = other, "unsupported AI provider, language model disabled");
            Arc::new(DisabledClient)
        }
    }
}

// ------------------------------------------------------------
// Provider abstraction + concrete providers
// ------------------------------------------------------------

/// What the model is being asked; selects the system prompt and cache bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Task {
    DetectLanguage,
    TranslateTitle,
    OffTopic,
    Emotions,
}

impl Task {
    fn system_prompt(self) -> &'static str {
        match self {
            Task::DetectLanguage => {
                "Reply 0 if the user text is English and 1 if it is in another language. Reply with the digit only."
            }
            Task::TranslateTitle => {
                "Translate the given movie title from German, Spanish, French, Danish or Italian into its English release title. Keep a trailing (YYYY) year if present. Reply with the title only."
            }
            Task::OffTopic => {
                "You classify messages sent to a movie recommendation bot. Reply 0 if the message is about movies or is a plain yes/no answer, and 1 if it is unrelated to movies. Reply with the digit only."
            }
            Task::Emotions => {
                "Label the user text with the emotions it clearly expresses, chosen only from: anger, disgust, fear, happiness, sadness, surprise. Reply with JSON of the form {\"emotions\": [...]}; use an empty array when none apply."
            }
        }
    }

    fn wants_json(self) -> bool {
        matches!(self, Task::Emotions)
    }
}

/// Low-level provider: does the *real* remote call. Separated so the same
/// caching wrapper serves production and tests.
#[async_trait]
pub trait Provider: Send + Sync + 'static {
    async fn complete(&self, task: Task, input: &str) -> Option<String>;
    fn name(&self) -> &'static str;
}

/// OpenAI provider (Chat Completions API).
pub struct OpenAiProvider {
    http: reqwest::Client,
    api_key: String,
    model: String,
}

impl OpenAiProvider {
    /// `model_override`: defaults to gpt-4o-mini.
    pub fn new(api_key: String, model_override: Option<&str>) -> Self {
        let http = reqwest::Client::builder()
            .user_agent("moviebot/0.1")
            .connect_timeout(Duration::from_secs(4))
            .timeout(Duration::from_secs(10))
            .build()
            .unwrap_or_else(|e| {
                warn!(error = %e, "reqwest builder failed, using default client");
                reqwest::Client::new()
            });
        Self {
            http,
            api_key,
            model: model_override.unwrap_or("gpt-4o-mini").to_string(),
        }
    }
}

#[async_trait]
impl Provider for OpenAiProvider {
    async fn complete(&self, task: Task, input: &str) -> Option<String> {
        if self.api_key.is_empty() {
            return None;
        }

        #[derive(Serialize)]
        struct Msg<'a> {
            role: &'a str,
            content: &'a str,
        }
        #[derive(Serialize)]
        struct ResponseFormat {
            r#type: &'static str,
        }
        #[derive(Serialize)]
        struct Req<'a> {
            model: &'a str,
            messages: Vec<Msg<'a>>,
            temperature: f32,
            max_tokens: u32,
            #[serde(skip_serializing_if = "Option::is_none")]
            response_format: Option<ResponseFormat>,
        }
        #[derive(Deserialize)]
        struct Resp {
            choices: Vec<Choice>,
        }
        #[derive(Deserialize)]
        struct Choice {
            message: ChoiceMsg,
        }
        #[derive(Deserialize)]
        struct ChoiceMsg {
            content: String,
        }

        let req = Req {
            model: &self.model,
            messages: vec![
                Msg {
                    role: "system",
                    content: task.system_prompt(),
                },
                Msg {
                    role: "user",
                    content: input,
                },
            ],
            temperature: 0.0,
            max_tokens: 60,
            response_format: task.wants_json().then_some(ResponseFormat {
                r#type: "json_object",
            }),
        };

        let resp = self
            .http
            .post("https://api.openai.com/v1/chat/completions")
            .bearer_auth(&self.api_key)
            .json(&req)
            .send()
            .await
            .map_err(|e| warn!(error = %e, ?task, "openai request failed"))
            .ok()?;

        if !resp.status().is_success() {
            warn!(status = %resp.status(), ?task, "openai returned an error status");
            return None;
        }
        let body: Resp = resp.json().await.ok()?;
        body.choices
            .into_iter()
            .next()
            .map(|c| c.message.content.trim().to_string())
            .filter(|s| !s.is_empty())
    }

    fn name(&self) -> &'static str {
        "openai"
    }
}

/// Returns `None` always; used when the language model is disabled.
pub struct DisabledClient;

#[async_trait]
impl AiClient for DisabledClient {
    async fn is_foreign(&self, _text: &str) -> Option<bool> {
        None
    }
    async fn translate_title(&self, _title: &str) -> Option<String> {
        None
    }
    async fn is_off_topic(&self, _text: &str) -> Option<bool> {
        None
    }
    async fn detect_emotions(&self, _text: &str) -> Option<Vec<Emotion>> {
        None
    }
    fn provider_name(&self) -> &'static str {
        "disabled"
    }
}

/// Canned replies per task, for tests and offline runs. Counts real calls.
#[derive(Default)]
pub struct MockProvider {
    pub replies: HashMap<Task, String>,
    pub calls: AtomicUsize,
}

impl MockProvider {
    pub fn with(mut self, task: Task, reply: impl Into<String>) -> Self {
        self.replies.insert(task, reply.into());
        self
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Provider for MockProvider {
    async fn complete(&self, task: Task, _input: &str) -> Option<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.replies.get(&task).cloned()
    }
    fn name(&self) -> &'static str {
        "mock"
    }
}

// ------------------------------------------------------------
// Caching client (response cache + daily limit)
// ------------------------------------------------------------

/// Cached replies kept before the cache is flushed.
pub const MAX_CACHE_ENTRIES: usize = 4096;

/// Wraps a provider with an in-memory cache keyed by (task, input) and a
/// per-day cap on real calls. Cache hits do not count toward the cap.
///
/// The cache holds at most `cache_capacity` replies and is flushed when a
/// new one would not fit, or when the day rolls over.
pub struct LlmClient<P: Provider> {
    inner: P,
    daily_limit_max: u32,
    cache_capacity: usize,
    cache: Mutex<HashMap<(Task, String), String>>,
    counter: Mutex<DailyCounter>,
}

impl<P: Provider> LlmClient<P> {
    pub fn new(inner: P, daily_limit_max: u32) -> Self {
        Self::with_cache_capacity(inner, daily_limit_max, MAX_CACHE_ENTRIES)
    }

    pub fn with_cache_capacity(inner: P, daily_limit_max: u32, cache_capacity: usize) -> Self {
        Self {
            inner,
            daily_limit_max,
            cache_capacity: cache_capacity.max(1),
            cache: Mutex::new(HashMap::new()),
            counter: Mutex::new(DailyCounter::default()),
        }
    }

    pub fn provider(&self) -> &P {
        &self.inner
    }

    async fn ask(&self, task: Task, input: &str) -> Option<String> {
        let key = (task, input.to_string());
        let cached = self.cache.lock().ok().and_then(|c| c.get(&key).cloned());
        if cached.is_some() {
            return cached;
        }

        {
            let mut g = self.counter.lock().ok()?;
            if g.is_expired() {
                g.reset_to_today();
                if let Ok(mut cache) = self.cache.lock() {
                    cache.clear();
                }
            }
            if g.count >= self.daily_limit_max {
                warn!(?task, limit = self.daily_limit_max, "daily language-model limit reached");
                return None;
            }
        }

        let fresh = self.inner.complete(task, input).await?;
        if let Ok(mut g) = self.counter.lock() {
            g.count = g.count.saturating_add(1);
        }
        if let Ok(mut cache) = self.cache.lock() {
            if cache.len() >= self.cache_capacity {
                debug!(entries = cache.len(), "language-model cache full, flushing");
                cache.clear();
            }
            cache.insert(key, fresh.clone());
        }
        Some(fresh)
    }
}

#[async_trait]
impl<P: Provider> AiClient for LlmClient<P> {
    async fn is_foreign(&self, text: &str) -> Option<bool> {
        parse_flag(&self.ask(Task::DetectLanguage, text).await?)
    }

    async fn translate_title(&self, title: &str) -> Option<String> {
        let reply = self.ask(Task::TranslateTitle, title).await?;
        let line = first_line(&reply).trim_matches('"').trim();
        (!line.is_empty()).then(|| line.to_string())
    }

    async fn is_off_topic(&self, text: &str) -> Option<bool> {
        parse_flag(&self.ask(Task::OffTopic, text).await?)
    }

    async fn detect_emotions(&self, text: &str) -> Option<Vec<Emotion>> {
        parse_emotions(&self.ask(Task::Emotions, text).await?)
    }

    fn provider_name(&self) -> &'static str {
        self.inner.name()
    }
}

#[derive(Debug, Clone)]
struct DailyCounter {
    day: u64,
    count: u32,
}

impl Default for DailyCounter {
    fn default() -> Self {
        Self {
            day: today(),
            count: 0,
        }
    }
}

impl DailyCounter {
    fn is_expired(&self) -> bool {
        self.day != today()
    }
    fn reset_to_today(&mut self) {
        self.day = today();
        self.count = 0;
    }
}

/// Days since UNIX epoch.
fn today() -> u64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
        / 86_400
}

// ------------------------------------------------------------
// Reply parsing
// ------------------------------------------------------------

fn first_line(s: &str) -> &str {
    s.lines().map(str::trim).find(|l| !l.is_empty()).unwrap_or("")
}

/// "0" / "1" replies; anything else is unusable.
fn parse_flag(reply: &str) -> Option<bool> {
    match first_line(reply) {
        "0" => Some(false),
        "1" => Some(true),
        _ => None,
    }
}

/// `{"emotions": [...]}`; unknown labels are dropped, duplicates collapsed.
pub fn parse_emotions(reply: &str) -> Option<Vec<Emotion>> {
    #[derive(Deserialize)]
    struct Payload {
        #[serde(default)]
        emotions: Vec<String>,
    }
    let payload: Payload = serde_json::from_str(reply.trim()).ok()?;
    let mut out: Vec<Emotion> = Vec::new();
    for e in payload.emotions.iter().filter_map(|l| Emotion::parse(l)) {
        if !out.contains(&e) {
            out.push(e);
        }
    }
    Some(out)
}
