//! Per-conversation state and the in-memory session registry.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

use metrics::{counter, gauge};
use serde::Serialize;
use tracing::info;

use crate::sentiment::Polarity;

/// Ratings required before the first recommendation is offered.
pub const MIN_RATINGS_BEFORE_REC: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    Collecting,
    Recommending,
}

/// One user's conversation. Never shared between concurrent turns.
#[derive(Debug, Clone)]
pub struct Session {
    user_ratings: Vec<i8>,
    num_rated: usize,
    mode: Mode,
    recommendations: Vec<usize>,
    // number of recommendations already surfaced
    rec_cursor: usize,
}

impl Session {
    pub fn new(num_movies: usize) -> Self {
        Self {
            user_ratings: vec![0; num_movies],
            num_rated: 0,
            mode: Mode::Collecting,
            recommendations: Vec::new(),
            rec_cursor: 0,
        }
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn num_rated(&self) -> usize {
        self.num_rated
    }

    pub fn user_ratings(&self) -> &[i8] {
        &self.user_ratings
    }

    pub fn recommendations(&self) -> &[usize] {
        &self.recommendations
    }

    pub fn cursor(&self) -> usize {
        self.rec_cursor
    }

    /// Recommendations not surfaced yet.
    pub fn pending(&self) -> &[usize] {
        &self.recommendations[self.rec_cursor..]
    }

    /// Writes ±1 for a non-neutral polarity. Returns whether anything was written.
    pub fn rate(&mut self, index: usize, polarity: Polarity) -> bool {
        if polarity == Polarity::Neutral {
            return false;
        }
        let Some(slot) = self.user_ratings.get_mut(index) else {
            return false;
        };
        *slot = polarity.as_rating();
        self.num_rated = self.user_ratings.iter().filter(|r| **r != 0).count();
        true
    }

    pub fn threshold_met(&self) -> bool {
        self.num_rated >= MIN_RATINGS_BEFORE_REC
    }

    /// Ratings still missing before recommendations start.
    pub fn remaining(&self) -> usize {
        MIN_RATINGS_BEFORE_REC.saturating_sub(self.num_rated)
    }

    /// Replace the ranked list, rewind the cursor and surface the first entry.
    pub fn start_recommending(&mut self, ranked: Vec<usize>) -> Option<usize> {
        self.mode = Mode::Recommending;
        self.recommendations = ranked;
        self.rec_cursor = 0;
        self.next_recommendation()
    }

    /// `None` once the list is exhausted; the cursor never passes the end.
    pub fn next_recommendation(&mut self) -> Option<usize> {
        let next = self.recommendations.get(self.rec_cursor).copied()?;
        self.rec_cursor += 1;
        Some(next)
    }
}

pub type SharedSession = Arc<tokio::sync::Mutex<Session>>;

/// Sessions untouched this long may be evicted when the store is full.
pub const DEFAULT_IDLE_TTL: Duration = Duration::from_secs(30 * 60);

struct Entry {
    session: SharedSession,
    last_seen: Instant,
}

/// Live sessions keyed by id. Each session sits behind its own async mutex so
/// turns of one conversation run one at a time.
///
/// Capacity is bounded. When full, sessions idle past the TTL are swept before
/// a new one is refused.
pub struct SessionStore {
    sessions: Mutex<HashMap<u64, Entry>>,
    next_id: AtomicU64,
    capacity: usize,
    idle_ttl: Duration,
}

impl SessionStore {
    pub fn new(capacity: usize) -> Self {
        Self::with_idle_ttl(capacity, DEFAULT_IDLE_TTL)
    }

    pub fn with_idle_ttl(capacity: usize, idle_ttl: Duration) -> Self {
        Self {
            sessions: Mutex::new(HashMap::new()),
            next_id: AtomicU64::new(1),
            capacity,
            idle_ttl,
        }
    }

    /// Registers a session; `None` when the store is full of active sessions.
    pub fn insert(&self, session: Session) -> Option<u64> {
        let mut g = self.sessions.lock().unwrap_or_else(PoisonError::into_inner);
        if g.len() >= self.capacity {
            let expired = sweep_idle(&mut g, self.idle_ttl);
            if expired > 0 {
                counter!("moviebot_sessions_expired_total").increment(expired as u64);
                info!(expired, "idle sessions evicted");
            }
            if g.len() >= self.capacity {
                return None;
            }
        }
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        g.insert(
            id,
            Entry {
                session: Arc::new(tokio::sync::Mutex::new(session)),
                last_seen: Instant::now(),
            },
        );
        gauge!("moviebot_active_sessions").set(g.len() as f64);
        Some(id)
    }

    /// Looks a session up and marks it as recently used.
    pub fn get(&self, id: u64) -> Option<SharedSession> {
        let mut g = self.sessions.lock().unwrap_or_else(PoisonError::into_inner);
        let entry = g.get_mut(&id)?;
        entry.last_seen = Instant::now();
        Some(entry.session.clone())
    }

    pub fn remove(&self, id: u64) -> bool {
        let mut g = self.sessions.lock().unwrap_or_else(PoisonError::into_inner);
        let removed = g.remove(&id).is_some();
        gauge!("moviebot_active_sessions").set(g.len() as f64);
        removed
    }

    pub fn len(&self) -> usize {
        self.sessions.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn idle_ttl(&self) -> Duration {
        self.idle_ttl
    }
}

fn sweep_idle(sessions: &mut HashMap<u64, Entry>, idle_ttl: Duration) -> usize {
    let before = sessions.len();
    // a session mid-turn holds its lock and is never evicted
    sessions.retain(|_, e| e.last_seen.elapsed() < idle_ttl || e.session.try_lock().is_err());
    before - sessions.len()
}
