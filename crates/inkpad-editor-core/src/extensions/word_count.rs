use std::sync::Arc;

use serde::Serialize;
use tokio::sync::watch;

use crate::extension::Extension;

/// Reading speed used for the reading time estimate.
const WORDS_PER_MINUTE: usize = 200;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct WordStats {
    pub words: usize,
    pub characters: usize,
    pub characters_no_spaces: usize,
    pub reading_minutes: usize,
}

impl WordStats {
    pub fn from_text(text: &str) -> Self {
        let words = text.split_whitespace().count();
        Self {
            words,
            characters: text.chars().count(),
            characters_no_spaces: text.chars().filter(|c| !c.is_whitespace()).count(),
            reading_minutes: words.div_ceil(WORDS_PER_MINUTE),
        }
    }
}

/// Publishes [`WordStats`] after every committed change.
#[derive(Debug, Clone)]
pub struct WordCount {
    tx: Arc<watch::Sender<WordStats>>,
}

impl Default for WordCount {
    fn default() -> Self {
        Self::new()
    }
}

impl WordCount {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(WordStats::default());
        Self { tx: Arc::new(tx) }
    }

    pub fn subscribe(&self) -> watch::Receiver<WordStats> {
        self.tx.subscribe()
    }

    pub fn latest(&self) -> WordStats {
        *self.tx.borrow()
    }

    /// Recount from a document, notifying receivers only on change.
    pub fn update(&self, text: &str) {
        let stats = WordStats::from_text(text);
        self.tx.send_if_modified(|current| {
            if *current == stats {
                return false;
            }
            *current = stats;
            true
        });
    }

    pub fn extension(&self) -> Extension {
        let counter = self.clone();
        Extension::new("word_count")
            .on_document_changed(move |change| counter.update(&change.doc.plain_text(change.schema)))
    }
}
