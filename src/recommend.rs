//! # Recommender
//! Item-item collaborative filtering over a binarized ratings matrix.
//! Pure, no I/O.
//!
//! For every movie the user has not rated, the score is the sum over rated
//! movies `j` of `cos(row_i, row_j) * user_rating[j]`, plus a constant offset.
//! No mean-centering, no normalization. Ranking is by score descending, ties
//! broken by catalog index ascending.

use serde::Serialize;

use crate::ratings::RatingsMatrix;

pub const DEFAULT_K: usize = 10;

/// Added to every candidate score before ranking.
pub const SCORE_OFFSET: f64 = 1.0;

/// Cosine similarity; 0 when either vector has zero norm.
pub fn similarity(u: &[f32], v: &[f32]) -> f64 {
    let (mut dot, mut nu, mut nv) = (0.0f64, 0.0f64, 0.0f64);
    for (&a, &b) in u.iter().zip(v) {
        let (a, b) = (f64::from(a), f64::from(b));
        dot += a * b;
        nu += a * a;
        nv += b * b;
    }
    let denom = nu.sqrt() * nv.sqrt();
    if denom == 0.0 {
        0.0
    } else {
        dot / denom
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Scored {
    pub index: usize,
    pub score: f64,
}

/// Ranked unrated movies with their scores (offset included), at most `k`.
pub fn recommend_scored(user_ratings: &[i8], ratings: &RatingsMatrix, k: usize) -> Vec<Scored> {
    let num_movies = ratings.rows().min(user_ratings.len());

    let rated: Vec<(usize, f64)> = (0..num_movies)
        .filter(|&j| user_ratings[j] != 0)
        .map(|j| (j, f64::from(user_ratings[j])))
        .collect();

    let mut scored: Vec<Scored> = (0..num_movies)
        .filter(|&i| user_ratings[i] == 0)
        .map(|i| {
            let row_i = ratings.row(i);
            let score = rated
                .iter()
                .map(|&(j, r)| similarity(row_i, ratings.row(j)) * r)
                .sum::<f64>();
            Scored {
                index: i,
                score: score + SCORE_OFFSET,
            }
        })
        .collect();

    // stable: equal scores keep ascending index order
    scored.sort_by(|a, b| b.score.total_cmp(&a.score));
    scored.truncate(k);
    scored
}

/// Indices of the top `k` unrated movies.
pub fn recommend(user_ratings: &[i8], ratings: &RatingsMatrix, k: usize) -> Vec<usize> {
    recommend_scored(user_ratings, ratings, k)
        .into_iter()
        .map(|s| s.index)
        .collect()
}
