//! Movie catalog and title matching.
//!
//! Stored titles follow the MovieLens convention: a leading English article is
//! moved behind a comma ("Matrix, The (1999)") and the release year sits in a
//! trailing parenthetical, sometimes after an alternate title in parentheses.
//! `search` normalizes stored titles to reading order before comparing.

use std::fs;
use std::path::Path;

use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use serde::Serialize;

use crate::error::DataError;

static YEAR_IN_PARENS: Lazy<Regex> = Lazy::new(|| Regex::new(r"\(\d{4}\)").expect("year regex"));
static PARENTHETICAL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\(([^)]*)\)").expect("parenthetical regex"));
static YEAR_ONLY: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d{4}$").expect("year-only regex"));
static TRAILING_ARTICLE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?P<body>.+), (?P<article>The|A|An)(?P<rest>(?:\s*\([^)]*\))*)\s*$")
        .expect("article regex")
});

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Movie {
    pub title: String,
    pub genres: Vec<String>,
}

/// Index-addressed, immutable list of movies.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    movies: Vec<Movie>,
}

impl Catalog {
    pub fn new(movies: Vec<Movie>) -> Self {
        Self { movies }
    }

    /// Convenience for tests and fixtures: titles only, no genres.
    pub fn from_titles<I, S>(titles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(
            titles
                .into_iter()
                .map(|t| Movie {
                    title: t.into(),
                    genres: Vec::new(),
                })
                .collect(),
        )
    }

    /// Load `id%title%genres` records. Record order is the catalog index.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, DataError> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path).map_err(|source| DataError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        let mut movies = Vec::new();
        for (idx, line) in raw.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            movies.push(parse_record(line).ok_or_else(|| {
                DataError::malformed(path, idx + 1, "expected id%title%genres")
            })?);
        }
        Ok(Self { movies })
    }

    pub fn len(&self) -> usize {
        self.movies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.movies.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Movie> {
        self.movies.get(index)
    }

    pub fn title(&self, index: usize) -> Option<&str> {
        self.movies.get(index).map(|m| m.title.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = &Movie> {
        self.movies.iter()
    }

    /// Every catalog index whose normalized title equals `title`
    /// (case-insensitive). With a `(YYYY)` in the query the year must match too;
    /// without one, all parentheticals are ignored and several years may match.
    pub fn search(&self, title: &str) -> Vec<usize> {
        let wanted = collapse_spaces(title).to_lowercase();
        let with_year = has_year(title);

        self.movies
            .iter()
            .enumerate()
            .filter(|(_, m)| {
                let reading = reading_order(&m.title);
                let candidate = if with_year {
                    keep_year_parentheticals(&reading)
                } else {
                    drop_parentheticals(&reading)
                };
                candidate.to_lowercase() == wanted
            })
            .map(|(i, _)| i)
            .collect()
    }
}

fn parse_record(line: &str) -> Option<Movie> {
    let start = line.find('%')?;
    let end = start + 1 + line[start + 1..].find('%')?;
    let title = line[start + 1..end].trim();
    let title = title
        .strip_prefix('"')
        .and_then(|t| t.strip_suffix('"'))
        .unwrap_or(title);
    let genres = line[end + 1..]
        .trim()
        .split('|')
        .filter(|g| !g.is_empty())
        .map(str::to_string)
        .collect();
    Some(Movie {
        title: title.to_string(),
        genres,
    })
}

/// Query carries a `(YYYY)` group.
pub fn has_year(title: &str) -> bool {
    YEAR_IN_PARENS.is_match(title)
}

/// "Matrix, The (1999)" -> "The Matrix (1999)". Only The/A/An are moved.
pub fn reading_order(stored: &str) -> String {
    match TRAILING_ARTICLE.captures(stored) {
        Some(caps) => format!("{} {}{}", &caps["article"], &caps["body"], &caps["rest"]),
        None => stored.to_string(),
    }
}

/// Remove every parenthetical except ones that are exactly a 4-digit year.
pub fn keep_year_parentheticals(title: &str) -> String {
    let stripped = PARENTHETICAL.replace_all(title, |caps: &Captures| {
        if YEAR_ONLY.is_match(&caps[1]) {
            caps[0].to_string()
        } else {
            String::new()
        }
    });
    collapse_spaces(&stripped)
}

/// Remove every parenthetical group.
pub fn drop_parentheticals(title: &str) -> String {
    collapse_spaces(&PARENTHETICAL.replace_all(title, ""))
}

fn collapse_spaces(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn sample() -> Catalog {
        Catalog::from_titles([
            "Matrix, The (1999)",
            "Titanic (1953)",
            "Titanic (1997)",
            "City of Lost Children, The (Cité des enfants perdus, La) (1995)",
            "Seven (a.k.a. Se7en) (1995)",
            "Man Called Horse, A (1970)",
            "Awfully Big Adventure, An (1995)",
            "Misérables, Les (1995)",
        ])
    }

    #[test]
    fn article_moved_to_front() {
        assert_eq!(reading_order("Matrix, The (1999)"), "The Matrix (1999)");
        assert_eq!(reading_order("Matrix, The"), "The Matrix");
        assert_eq!(reading_order("Misérables, Les (1995)"), "Misérables, Les (1995)");
        assert_eq!(reading_order("Hello, Dolly! (1969)"), "Hello, Dolly! (1969)");
    }

    #[test]
    fn plain_title_matches_article_form() {
        let c = sample();
        assert_eq!(c.search("The Matrix"), vec![0]);
        assert_eq!(c.search("the matrix"), vec![0]);
        assert_eq!(c.search("A Man Called Horse"), vec![5]);
        assert_eq!(c.search("An Awfully Big Adventure"), vec![6]);
    }

    #[test]
    fn year_narrows_ambiguous_titles() {
        let c = sample();
        assert_eq!(c.search("Titanic"), vec![1, 2]);
        assert_eq!(c.search("Titanic (1997)"), vec![2]);
        assert_eq!(c.search("Titanic (2001)"), Vec::<usize>::new());
        assert_eq!(c.search("The Matrix (1999)"), vec![0]);
    }

    #[test]
    fn alternate_titles_are_ignored() {
        let c = sample();
        assert_eq!(c.search("Seven"), vec![4]);
        assert_eq!(c.search("Seven (1995)"), vec![4]);
        assert_eq!(c.search("The City of Lost Children"), vec![3]);
        assert_eq!(c.search("The City of Lost Children (1995)"), vec![3]);
    }

    #[test]
    fn unknown_title_is_empty() {
        assert!(sample().search("Casablanca").is_empty());
    }

    #[test]
    fn load_parses_records_and_strips_quotes() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            f,
            "0%Toy Story (1995)%Adventure|Animation|Children\n1%\"Matrix, The (1999)\"%Action|Sci-Fi"
        )
        .unwrap();

        let c = Catalog::load(f.path()).unwrap();
        assert_eq!(c.len(), 2);
        assert_eq!(c.title(1), Some("Matrix, The (1999)"));
        assert_eq!(c.get(0).unwrap().genres, vec!["Adventure", "Animation", "Children"]);
    }

    #[test]
    fn load_rejects_records_without_delimiters() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        writeln!(f, "0%Toy Story (1995)%Animation\nbroken line").unwrap();
        assert!(matches!(
            Catalog::load(f.path()),
            Err(DataError::Malformed { line: 2, .. })
        ));
    }
}
