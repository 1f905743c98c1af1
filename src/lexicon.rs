//! Sentiment lexicon: stemmed word -> polarity label.
//!
//! Source file is a delimited `(word, label)` list, label in {`pos`, `neg`}.
//! Words are lowercased and stemmed on load so lookups can use the stem of a
//! token directly. Built once, read-only afterwards.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use serde::Serialize;

use crate::error::DataError;
use crate::stemmer::PorterStemmer;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Label {
    Pos,
    Neg,
}

impl Label {
    fn parse(raw: &str) -> Option<Self> {
        match raw.trim() {
            "pos" => Some(Label::Pos),
            "neg" => Some(Label::Neg),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct SentimentLexicon {
    entries: HashMap<String, Label>,
}

impl SentimentLexicon {
    /// Load from a delimited file. `header = true` skips the first record.
    pub fn load<P: AsRef<Path>>(path: P, delimiter: char, header: bool) -> Result<Self, DataError> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path).map_err(|source| DataError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        let stemmer = PorterStemmer::new();
        let mut entries = HashMap::new();
        for (idx, line) in raw.lines().enumerate().skip(usize::from(header)) {
            let line_no = idx + 1;
            if line.trim().is_empty() {
                continue;
            }
            let (word, label) = line
                .split_once(delimiter)
                .ok_or_else(|| DataError::malformed(path, line_no, "missing delimiter"))?;
            let label = Label::parse(label).ok_or_else(|| {
                DataError::malformed(path, line_no, format!("unknown label {:?}", label.trim()))
            })?;
            let word = word.trim().trim_matches('"').to_lowercase();
            entries.insert(stemmer.stem(&word), label);
        }
        Ok(Self { entries })
    }

    /// In-memory construction; words are stemmed the same way as `load`.
    pub fn from_pairs<'a, I>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (&'a str, Label)>,
    {
        let stemmer = PorterStemmer::new();
        let entries = pairs
            .into_iter()
            .map(|(w, l)| (stemmer.stem(&w.to_lowercase()), l))
            .collect();
        Self { entries }
    }

    /// Lookup by an already-stemmed token.
    pub fn polarity(&self, stem: &str) -> Option<Label> {
        self.entries.get(stem).copied()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
