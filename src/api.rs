use std::sync::Arc;

use shuttle_axum::axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use tower_http::cors::CorsLayer;
use tracing::info;

use crate::engine::{MovieBot, SessionSnapshot, TurnReport};
use crate::error::{AppError, AppResult};
use crate::session::{Mode, SessionStore};

/// Upper bound on a single turn's text, in bytes.
const MAX_TURN_BYTES: usize = 4096;

#[derive(Clone)]
pub struct AppState {
    pub bot: Arc<MovieBot>,
    pub sessions: Arc<SessionStore>,
}

impl AppState {
    pub fn new(bot: MovieBot, sessions: SessionStore) -> Self {
        Self {
            bot: Arc::new(bot),
            sessions: Arc::new(sessions),
        }
    }
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { "OK" }))
        .route("/sessions", post(create_session))
        .route("/sessions/{id}", get(get_session).delete(delete_session))
        .route("/sessions/{id}/turns", post(post_turn))
        .route("/movies/search", get(search_movies))
        .layer(CorsLayer::very_permissive())
        .with_state(state)
}

#[derive(serde::Serialize)]
struct CreatedResp {
    session_id: u64,
    mode: Mode,
}

async fn create_session(
    State(state): State<AppState>,
) -> AppResult<(StatusCode, Json<CreatedResp>)> {
    let session = state.bot.new_session();
    let mode = session.mode();
    let id = state.sessions.insert(session).ok_or_else(|| {
        AppError::Unavailable(format!(
            "session limit of {} reached",
            state.sessions.capacity()
        ))
    })?;
    info!(session_id = id, "session started");
    Ok((
        StatusCode::CREATED,
        Json(CreatedResp {
            session_id: id,
            mode,
        }),
    ))
}

async fn get_session(
    State(state): State<AppState>,
    Path(id): Path<u64>,
) -> AppResult<Json<SessionSnapshot>> {
    let shared = state
        .sessions
        .get(id)
        .ok_or_else(|| AppError::NotFound(format!("session {id}")))?;
    let session = shared.lock().await;
    Ok(Json(state.bot.snapshot(&session)))
}

#[derive(serde::Deserialize)]
struct TurnReq {
    text: String,
}

async fn post_turn(
    State(state): State<AppState>,
    Path(id): Path<u64>,
    Json(body): Json<TurnReq>,
) -> AppResult<Json<TurnReport>> {
    if body.text.len() > MAX_TURN_BYTES {
        return Err(AppError::InvalidInput(format!(
            "text longer than {MAX_TURN_BYTES} bytes"
        )));
    }
    let shared = state
        .sessions
        .get(id)
        .ok_or_else(|| AppError::NotFound(format!("session {id}")))?;
    // one turn at a time per session
    let mut session = shared.lock().await;
    Ok(Json(state.bot.process(&mut session, &body.text).await))
}

async fn delete_session(State(state): State<AppState>, Path(id): Path<u64>) -> AppResult<StatusCode> {
    if state.sessions.remove(id) {
        info!(session_id = id, "session ended");
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::NotFound(format!("session {id}")))
    }
}

#[derive(serde::Deserialize)]
struct SearchQuery {
    #[serde(default)]
    title: String,
}

#[derive(serde::Serialize)]
struct SearchHit {
    index: usize,
    title: String,
    genres: Vec<String>,
}

#[derive(serde::Serialize)]
struct SearchResp {
    title: String,
    matches: Vec<SearchHit>,
}

async fn search_movies(
    State(state): State<AppState>,
    Query(q): Query<SearchQuery>,
) -> AppResult<Json<SearchResp>> {
    let title = q.title.trim();
    if title.is_empty() {
        return Err(AppError::InvalidInput("missing title".into()));
    }
    let catalog = state.bot.catalog();
    let matches = catalog
        .search(title)
        .into_iter()
        .filter_map(|index| {
            catalog.get(index).map(|m| SearchHit {
                index,
                title: m.title.clone(),
                genres: m.genres.clone(),
            })
        })
        .collect();
    Ok(Json(SearchResp {
        title: title.to_string(),
        matches,
    }))
}
