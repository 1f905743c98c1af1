//! # Session Controller
//! Turns one line of user text into a typed outcome and the matching session
//! update. Never produces phrasing: callers map `TurnOutcome::tag()` plus the
//! payload onto whatever response layer they use.
//!
//! Two modes. While collecting, each single resolvable title with non-neutral
//! sentiment writes ±1 into the session. Once five movies are rated, every
//! further rating recomputes the ranked list from scratch and surfaces its
//! head. While recommending, title-less turns are read as yes/no answers; a
//! "no" declines the current offer without leaving recommending mode.

use std::sync::Arc;

use anyhow::Context;
use metrics::counter;
use serde::Serialize;
use sha2::{Digest, Sha256};
use tracing::{debug, info};

use crate::ai::{DynAiClient, Emotion};
use crate::catalog::Catalog;
use crate::config::BotConfig;
use crate::error::DataError;
use crate::lexicon::SentimentLexicon;
use crate::ratings::{binarize, RatingsMatrix};
use crate::recommend::{recommend, DEFAULT_K};
use crate::resolver::TitleResolver;
use crate::sentiment::{Polarity, SentimentExtractor};
use crate::session::{Mode, Session};
use crate::titles::{preprocess, scan_titles};

const YES_WORDS: &[&str] = &["yes", "sure", "ok", "yep", "ya", "yeah"];
const NO_WORDS: &[&str] = &["no", "nah", "nope"];

/// Read-only corpus shared by every session.
#[derive(Debug, Clone)]
pub struct Resources {
    pub catalog: Arc<Catalog>,
    pub lexicon: Arc<SentimentLexicon>,
    /// Binarized movie x user matrix.
    pub ratings: Arc<RatingsMatrix>,
}

impl Resources {
    /// Binarizes `raw` and checks it has one row per catalog movie.
    pub fn from_raw(
        catalog: Catalog,
        lexicon: SentimentLexicon,
        raw: &RatingsMatrix,
        threshold: f32,
    ) -> Result<Self, DataError> {
        if raw.rows() != catalog.len() {
            return Err(DataError::ShapeMismatch {
                expected: catalog.len(),
                found: raw.rows(),
            });
        }
        Ok(Self {
            catalog: Arc::new(catalog),
            lexicon: Arc::new(lexicon),
            ratings: Arc::new(binarize(raw, threshold)),
        })
    }

    pub fn load(cfg: &BotConfig) -> anyhow::Result<Self> {
        let catalog = Catalog::load(&cfg.data.movies).context("loading movie catalog")?;
        let lexicon = SentimentLexicon::load(
            &cfg.data.sentiment,
            cfg.lexicon.delimiter,
            cfg.lexicon.header,
        )
        .context("loading sentiment lexicon")?;
        let raw = RatingsMatrix::load(&cfg.data.ratings, catalog.len())
            .context("loading ratings matrix")?;

        info!(
            movies = catalog.len(),
            users = raw.cols(),
            lexicon = lexicon.len(),
            "corpus loaded"
        );
        Ok(Self::from_raw(catalog, lexicon, &raw, cfg.recommend.threshold)?)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct BotSettings {
    pub k: usize,
    /// Emotion detection and off-topic filtering through the language model.
    pub llm_programming: bool,
}

impl Default for BotSettings {
    fn default() -> Self {
        Self {
            k: DEFAULT_K,
            llm_programming: false,
        }
    }
}

impl From<&BotConfig> for BotSettings {
    fn from(cfg: &BotConfig) -> Self {
        Self {
            k: cfg.recommend.k,
            llm_programming: cfg.ai.llm_programming,
        }
    }
}

/// What happens after a successful rating.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FollowUp {
    KeepRating { remaining: usize },
    Recommend { index: usize, title: String },
    Exhausted,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TurnOutcome {
    OffTopic,
    UnmatchedQuote,
    NoTitle,
    MultipleTitles { titles: Vec<String> },
    NoMatch { title: String },
    MultiMatch { title: String, indices: Vec<usize> },
    Neutral { title: String, index: usize },
    Rated {
        title: String,
        index: usize,
        polarity: Polarity,
        follow_up: FollowUp,
    },
    Recommend { index: usize, title: String },
    Exhausted,
    Declined,
    Unrecognized,
}

impl TurnOutcome {
    /// Stable variant name, used as a metrics label.
    pub fn kind(&self) -> &'static str {
        match self {
            TurnOutcome::OffTopic => "off_topic",
            TurnOutcome::UnmatchedQuote => "unmatched_quote",
            TurnOutcome::NoTitle => "no_title",
            TurnOutcome::MultipleTitles { .. } => "multiple_titles",
            TurnOutcome::NoMatch { .. } => "no_match",
            TurnOutcome::MultiMatch { .. } => "multi_match",
            TurnOutcome::Neutral { .. } => "neutral",
            TurnOutcome::Rated { .. } => "rated",
            TurnOutcome::Recommend { .. } => "recommend",
            TurnOutcome::Exhausted => "exhausted",
            TurnOutcome::Declined => "declined",
            TurnOutcome::Unrecognized => "unrecognized",
        }
    }

    /// Classification tag for the response layer.
    pub fn tag(&self) -> String {
        match self {
            TurnOutcome::OffTopic => "off-topic".into(),
            TurnOutcome::UnmatchedQuote => "unmatched-quote".into(),
            TurnOutcome::NoTitle => "no-title".into(),
            TurnOutcome::MultipleTitles { .. } => "multiple-titles".into(),
            TurnOutcome::NoMatch { .. } => "no-match".into(),
            TurnOutcome::MultiMatch { .. } => "multi-match".into(),
            TurnOutcome::Neutral { .. } => "neutral".into(),
            TurnOutcome::Rated { polarity, .. } => match polarity {
                Polarity::Positive => "positive".into(),
                Polarity::Negative => "negative".into(),
                Polarity::Neutral => "neutral".into(),
            },
            TurnOutcome::Recommend { index, .. } => format!("recommend:{index}"),
            TurnOutcome::Exhausted => "exhausted".into(),
            TurnOutcome::Declined => "declined".into(),
            TurnOutcome::Unrecognized => "unrecognized".into(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct TurnReport {
    pub tag: String,
    pub outcome: TurnOutcome,
    pub emotions: Vec<Emotion>,
    pub mode: Mode,
    pub num_rated: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct RatedMovie {
    pub index: usize,
    pub title: String,
    pub rating: i8,
}

#[derive(Debug, Clone, Serialize)]
pub struct ListedMovie {
    pub index: usize,
    pub title: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct SessionSnapshot {
    pub mode: Mode,
    pub num_rated: usize,
    pub rated: Vec<RatedMovie>,
    pub pending: Vec<ListedMovie>,
    pub cursor: usize,
}

pub struct MovieBot {
    resources: Resources,
    extractor: SentimentExtractor,
    settings: BotSettings,
    ai: DynAiClient,
}

impl MovieBot {
    pub fn new(resources: Resources, settings: BotSettings, ai: DynAiClient) -> Self {
        let extractor = SentimentExtractor::new(resources.lexicon.clone());
        Self {
            resources,
            extractor,
            settings,
            ai,
        }
    }

    pub fn catalog(&self) -> &Catalog {
        &self.resources.catalog
    }

    pub fn settings(&self) -> BotSettings {
        self.settings
    }

    pub fn new_session(&self) -> Session {
        Session::new(self.resources.catalog.len())
    }

    /// Handle one user turn. Anomalies are outcomes, never errors.
    pub async fn process(&self, session: &mut Session, line: &str) -> TurnReport {
        let text = preprocess(line);
        let id = anon_hash(&text);

        let mut emotions = Vec::new();
        let outcome = 'turn: {
            if self.settings.llm_programming {
                if let Some(found) = self.ai.detect_emotions(&text).await {
                    emotions = found;
                }
                if self.ai.is_off_topic(&text).await == Some(true) {
                    break 'turn TurnOutcome::OffTopic;
                }
            }
            self.classify(session, &text).await
        };

        counter!("moviebot_turns_total", "outcome" => outcome.kind()).increment(1);
        // Never log raw text. Only the hashed id and the classification.
        debug!(%id, tag = %outcome.tag(), mode = ?session.mode(), num_rated = session.num_rated(), "turn");

        TurnReport {
            tag: outcome.tag(),
            outcome,
            emotions,
            mode: session.mode(),
            num_rated: session.num_rated(),
        }
    }

    async fn classify(&self, session: &mut Session, text: &str) -> TurnOutcome {
        let scan = scan_titles(text);
        if scan.unmatched_quote {
            return TurnOutcome::UnmatchedQuote;
        }

        let title = match scan.titles.as_slice() {
            [] => return self.answer_without_title(session, text),
            [one] => one.clone(),
            _ => {
                return TurnOutcome::MultipleTitles {
                    titles: scan.titles,
                }
            }
        };

        let indices =
            TitleResolver::find_movies_by_title(&self.resources.catalog, self.ai.as_ref(), &title)
                .await;
        let index = match indices.as_slice() {
            [] => return TurnOutcome::NoMatch { title },
            [one] => *one,
            _ => return TurnOutcome::MultiMatch { title, indices },
        };

        let polarity = self.extractor.extract(text);
        if !session.rate(index, polarity) {
            return TurnOutcome::Neutral { title, index };
        }
        counter!("moviebot_ratings_total", "polarity" => polarity_label(polarity)).increment(1);

        let follow_up = if session.threshold_met() {
            self.refresh_recommendations(session)
        } else {
            FollowUp::KeepRating {
                remaining: session.remaining(),
            }
        };

        TurnOutcome::Rated {
            title,
            index,
            polarity,
            follow_up,
        }
    }

    fn refresh_recommendations(&self, session: &mut Session) -> FollowUp {
        let was = session.mode();
        let ranked = recommend(session.user_ratings(), &self.resources.ratings, self.settings.k);
        let count = ranked.len();
        let first = session.start_recommending(ranked);

        if was == Mode::Collecting {
            info!(num_rated = session.num_rated(), recommendations = count, "entering recommending mode");
        }
        match first {
            Some(index) => FollowUp::Recommend {
                index,
                title: self.title_of(index),
            },
            None => FollowUp::Exhausted,
        }
    }

    fn answer_without_title(&self, session: &mut Session, text: &str) -> TurnOutcome {
        if session.mode() != Mode::Recommending {
            return TurnOutcome::NoTitle;
        }
        match classify_reply(text) {
            Reply::Yes => match session.next_recommendation() {
                Some(index) => TurnOutcome::Recommend {
                    index,
                    title: self.title_of(index),
                },
                None => TurnOutcome::Exhausted,
            },
            // Declining ends this offer only; the list and cursor stay put.
            Reply::No => TurnOutcome::Declined,
            Reply::Other => TurnOutcome::Unrecognized,
        }
    }

    pub fn snapshot(&self, session: &Session) -> SessionSnapshot {
        let rated = session
            .user_ratings()
            .iter()
            .enumerate()
            .filter(|(_, r)| **r != 0)
            .map(|(index, r)| RatedMovie {
                index,
                title: self.title_of(index),
                rating: *r,
            })
            .collect();
        let pending = session
            .pending()
            .iter()
            .map(|&index| ListedMovie {
                index,
                title: self.title_of(index),
            })
            .collect();
        SessionSnapshot {
            mode: session.mode(),
            num_rated: session.num_rated(),
            rated,
            pending,
            cursor: session.cursor(),
        }
    }

    fn title_of(&self, index: usize) -> String {
        self.resources
            .catalog
            .title(index)
            .unwrap_or_default()
            .to_string()
    }
}

#[derive(Debug, PartialEq, Eq)]
enum Reply {
    Yes,
    No,
    Other,
}

/// Whole-word, case-insensitive keyword match; "yes" words win over "no" words.
/// Deliberately not a substring test: "okay" and "know" are not answers.
fn classify_reply(text: &str) -> Reply {
    let lower = text.to_lowercase();
    let words: Vec<&str> = lower
        .split(|c: char| !(c.is_alphanumeric() || c == '\''))
        .filter(|w| !w.is_empty())
        .collect();
    if words.iter().any(|w| YES_WORDS.contains(w)) {
        Reply::Yes
    } else if words.iter().any(|w| NO_WORDS.contains(w)) {
        Reply::No
    } else {
        Reply::Other
    }
}

fn polarity_label(p: Polarity) -> &'static str {
    match p {
        Polarity::Positive => "positive",
        Polarity::Negative => "negative",
        Polarity::Neutral => "neutral",
    }
}

/// Short stable id for log correlation; raw user text is never logged.
pub(crate) fn anon_hash(text: &str) -> String {
    let digest = Sha256::digest(text.as_bytes());
    let mut out = String::with_capacity(12);
    for b in digest.iter().take(6) {
        use std::fmt::Write as _;
        let _ = write!(&mut out, "{:02x}", b);
    }
    out
}
