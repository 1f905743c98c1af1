//! Ratings matrix (movies x training users) and binarization.
//!
//! Raw cells are in [0, 5], 0 meaning "unrated". Binarized cells are in
//! {-1, 0, +1}. The shared matrix is never binarized in place: `binarize`
//! returns a fresh matrix marked as binarized, and binarizing that again
//! returns it unchanged.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use crate::error::DataError;

pub const DEFAULT_THRESHOLD: f32 = 2.5;
const MAX_RATING: f32 = 5.0;

/// Dense row-major matrix; row `i` is catalog movie `i`.
#[derive(Debug, Clone, PartialEq)]
pub struct RatingsMatrix {
    rows: usize,
    cols: usize,
    data: Vec<f32>,
    binarized: bool,
}

impl RatingsMatrix {
    pub fn zeros(rows: usize, cols: usize) -> Self {
        Self {
            rows,
            cols,
            data: vec![0.0; rows * cols],
            binarized: false,
        }
    }

    /// Build from per-movie rows. All rows must have the same length.
    pub fn from_rows(rows: Vec<Vec<f32>>) -> Option<Self> {
        let cols = rows.first().map_or(0, Vec::len);
        if rows.iter().any(|r| r.len() != cols) {
            return None;
        }
        let n = rows.len();
        Some(Self {
            rows: n,
            cols,
            data: rows.into_iter().flatten().collect(),
            binarized: false,
        })
    }

    /// Load `user%movie%rating` records. Distinct user ids become columns in
    /// ascending id order; `num_movies` fixes the row count to the catalog size.
    pub fn load<P: AsRef<Path>>(path: P, num_movies: usize) -> Result<Self, DataError> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path).map_err(|source| DataError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        let mut records = Vec::new();
        for (idx, line) in raw.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            let line_no = idx + 1;
            let mut fields = line.split('%').map(str::trim);
            let (Some(user), Some(movie), Some(rating)) = (fields.next(), fields.next(), fields.next())
            else {
                return Err(DataError::malformed(path, line_no, "expected user%movie%rating"));
            };
            let user: u64 = user
                .parse()
                .map_err(|_| DataError::malformed(path, line_no, format!("bad user id {user:?}")))?;
            let movie: usize = movie
                .parse()
                .map_err(|_| DataError::malformed(path, line_no, format!("bad movie id {movie:?}")))?;
            let rating: f32 = rating
                .parse()
                .map_err(|_| DataError::malformed(path, line_no, format!("bad rating {rating:?}")))?;
            if movie >= num_movies {
                return Err(DataError::malformed(
                    path,
                    line_no,
                    format!("movie id {movie} outside catalog of {num_movies}"),
                ));
            }
            if !(0.0..=MAX_RATING).contains(&rating) {
                return Err(DataError::malformed(
                    path,
                    line_no,
                    format!("rating {rating} outside [0, {MAX_RATING}]"),
                ));
            }
            records.push((user, movie, rating));
        }

        let columns: BTreeMap<u64, usize> = records
            .iter()
            .map(|(u, _, _)| *u)
            .collect::<std::collections::BTreeSet<_>>()
            .into_iter()
            .enumerate()
            .map(|(col, u)| (u, col))
            .collect();

        let mut m = Self::zeros(num_movies, columns.len());
        for (user, movie, rating) in records {
            m.set(movie, columns[&user], rating);
        }
        Ok(m)
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn row(&self, i: usize) -> &[f32] {
        &self.data[i * self.cols..(i + 1) * self.cols]
    }

    pub fn get(&self, i: usize, j: usize) -> f32 {
        self.data[i * self.cols + j]
    }

    pub fn set(&mut self, i: usize, j: usize, value: f32) {
        self.data[i * self.cols + j] = value;
    }

    /// Cells are already in {-1, 0, +1}.
    pub fn is_binarized(&self) -> bool {
        self.binarized
    }

    pub fn iter(&self) -> impl Iterator<Item = &f32> {
        self.data.iter()
    }
}

/// Cell rule: 0 stays 0, above `threshold` is +1, anything else rated is -1.
#[inline]
pub fn binarize_value(value: f32, threshold: f32) -> f32 {
    if value == 0.0 {
        0.0
    } else if value > threshold {
        1.0
    } else {
        -1.0
    }
}

/// Cell-wise binarization into a new matrix of the same shape.
pub fn binarize(ratings: &RatingsMatrix, threshold: f32) -> RatingsMatrix {
    if ratings.binarized {
        return ratings.clone();
    }
    RatingsMatrix {
        rows: ratings.rows,
        cols: ratings.cols,
        data: ratings
            .data
            .iter()
            .map(|&v| binarize_value(v, threshold))
            .collect(),
        binarized: true,
    }
}
