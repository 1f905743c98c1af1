use std::collections::HashSet;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::lexicon::{Label, SentimentLexicon};
use crate::stemmer::PorterStemmer;
use crate::titles::extract_titles;

/// Sign of a turn's sentiment score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Polarity {
    Negative,
    Neutral,
    Positive,
}

impl Polarity {
    pub fn from_score(score: i32) -> Self {
        match score.signum() {
            1 => Polarity::Positive,
            -1 => Polarity::Negative,
            _ => Polarity::Neutral,
        }
    }

    /// Binarized rating value: -1 / 0 / +1.
    pub fn as_rating(self) -> i8 {
        match self {
            Polarity::Negative => -1,
            Polarity::Neutral => 0,
            Polarity::Positive => 1,
        }
    }
}

const NEGATORS: &[&str] = &[
    "not", "never", "no", "n't", "didn't", "doesn't", "isn't", "wasn't", "shouldn't", "couldn't",
    "won't", "hadn't", "wouldn't", "don't", "can't",
];

#[derive(Debug, Clone)]
pub struct SentimentExtractor {
    lexicon: Arc<SentimentLexicon>,
    stemmer: PorterStemmer,
    negators: HashSet<String>,
}

impl SentimentExtractor {
    pub fn new(lexicon: Arc<SentimentLexicon>) -> Self {
        let stemmer = PorterStemmer::new();
        let negators = NEGATORS.iter().map(|w| stemmer.stem(w)).collect();
        Self {
            lexicon,
            stemmer,
            negators,
        }
    }

    /// Running lexicon score with one-hop negation.
    /// A negator flips the next sentiment-bearing token only; tokens that are
    /// neither negators nor in the lexicon leave the flag alone.
    pub fn score(&self, preprocessed: &str) -> i32 {
        let mut text = preprocessed.to_lowercase();
        // Titles never count toward sentiment.
        for title in extract_titles(&text) {
            text = text.replace(&title, "");
        }

        let mut score = 0;
        let mut negated = false;
        for token in text.split_whitespace() {
            let stem = self.stemmer.stem(token);
            if self.negators.contains(&stem) {
                negated = true;
                continue;
            }
            if let Some(label) = self.lexicon.polarity(&stem) {
                score += match (label, negated) {
                    (Label::Pos, false) | (Label::Neg, true) => 1,
                    (Label::Pos, true) | (Label::Neg, false) => -1,
                };
                negated = false;
            }
        }
        score
    }

    pub fn extract(&self, preprocessed: &str) -> Polarity {
        Polarity::from_score(self.score(preprocessed))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn extractor() -> SentimentExtractor {
        let lex = SentimentLexicon::from_pairs([
            ("like", Label::Pos),
            ("love", Label::Pos),
            ("great", Label::Pos),
            ("hate", Label::Neg),
            ("terrible", Label::Neg),
        ]);
        SentimentExtractor::new(Arc::new(lex))
    }

    #[test]
    fn polarity_of_simple_sentences() {
        let s = extractor();
        assert_eq!(s.extract(r#"I did not like "Titanic""#), Polarity::Negative);
        assert_eq!(s.extract(r#"I loved "Titanic""#), Polarity::Positive);
        assert_eq!(s.extract(r#""Titanic" was a movie"#), Polarity::Neutral);
    }

    #[test]
    fn title_words_are_ignored() {
        let s = extractor();
        assert_eq!(s.extract(r#"I saw "I Hate Mondays""#), Polarity::Neutral);
        assert_eq!(s.extract(r#"I saw "Love Actually" and it was terrible"#), Polarity::Negative);
    }

    #[test]
    fn negation_skips_filler_and_flips_once() {
        let s = extractor();
        // "not" survives "really", flips "like", then resets before "great"
        assert_eq!(s.score("i do not really like it but the cast is great"), 0);
        assert_eq!(s.score("never hated it"), 1);
        assert_eq!(s.score("i can't say i didn't love it"), -1);
    }

    #[test]
    fn ties_are_neutral() {
        let s = extractor();
        assert_eq!(s.extract("i love it and hate it"), Polarity::Neutral);
    }

    #[test]
    fn polarity_ratings() {
        assert_eq!(Polarity::from_score(3).as_rating(), 1);
        assert_eq!(Polarity::from_score(-2).as_rating(), -1);
        assert_eq!(Polarity::from_score(0).as_rating(), 0);
    }
}
