//! Title resolution with a one-shot translation fallback for foreign titles.

use tracing::{debug, warn};

use crate::ai::AiClient;
use crate::catalog::{drop_parentheticals, has_year, keep_year_parentheticals, Catalog};

pub struct TitleResolver;

impl TitleResolver {
    /// Catalog indices matching `title`. Zero or several hits are both valid.
    ///
    /// When the plain search finds nothing and the collaborator says the title
    /// is not English, the translated title is searched exactly once. Any
    /// collaborator failure ends in an empty result.
    pub async fn find_movies_by_title(
        catalog: &Catalog,
        ai: &dyn AiClient,
        title: &str,
    ) -> Vec<usize> {
        let hits = catalog.search(title);
        if !hits.is_empty() {
            return hits;
        }

        match ai.is_foreign(title).await {
            Some(true) => {}
            Some(false) => return hits,
            None => {
                debug!(provider = ai.provider_name(), "language detection unavailable");
                return hits;
            }
        }

        let Some(translated) = ai.translate_title(title).await else {
            warn!(provider = ai.provider_name(), "title translation unavailable");
            return Vec::new();
        };

        let candidate = clean_translation(&translated);
        if candidate.is_empty() {
            return Vec::new();
        }
        let hits = catalog.search(&candidate);
        debug!(matches = hits.len(), "translated title searched");
        hits
    }
}

fn clean_translation(translated: &str) -> String {
    let t = translated.trim();
    if has_year(t) {
        keep_year_parentheticals(t)
    } else {
        drop_parentheticals(t)
    }
    .trim()
    .to_string()
}
