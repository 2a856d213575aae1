//! Board vocabulary: the built-in word list plus the player's custom words.

use crate::error::ValidationError;

/// The word fixed at the center of every board.
pub const CENTER_WORD: &str = "FREE";

/// Built-in vocabulary, in draw-pool order.
pub const BASE_WORDS: &[&str] = &[
    "Karaoke",
    "Confetti",
    "Balloon",
    "Selfie",
    "Dance-off",
    "Toast",
    "Cake",
    "Pizza",
    "Sparkler",
    "Playlist",
    "Costume",
    "Photo booth",
    "Group hug",
    "High five",
    "Piñata",
    "Punch bowl",
    "Birthday song",
    "Party hat",
    "Disco ball",
    "Slow dance",
    "Spilled drink",
    "Lost phone",
    "Inside joke",
    "Awkward silence",
    "Late arrival",
    "Speech",
    "Encore",
    "Fireworks",
    "Charades",
    "Limbo",
    "Conga line",
    "Air guitar",
    "Glow stick",
    "Cupcake",
    "Mocktail",
    "Nachos",
    "Board game",
    "Sing-along",
    "Wrong lyrics",
    "Dad joke",
];

/// The words boards are drawn from.
///
/// Custom words are kept in insertion order and are unique, case-insensitively,
/// against the base list, each other and [`CENTER_WORD`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WordPool {
    custom: Vec<String>,
}

impl WordPool {
    /// A pool with no custom words.
    pub fn new() -> Self {
        Self::default()
    }

    /// A pool with a previously persisted custom list.
    ///
    /// Entries go through [`add_custom`](Self::add_custom), so blanks and
    /// duplicates of the pool or of earlier entries are dropped.
    pub fn with_custom(custom: Vec<String>) -> Self {
        let mut pool = Self::new();
        for word in &custom {
            if !matches!(pool.add_custom(word), Ok(true)) {
                tracing::debug!(word = %word, "dropping stored custom word");
            }
        }
        pool
    }

    /// The custom words, in insertion order.
    pub fn custom(&self) -> &[String] {
        &self.custom
    }

    /// Base words followed by custom words.
    pub fn words(&self) -> Vec<String> {
        BASE_WORDS
            .iter()
            .map(|w| (*w).to_string())
            .chain(self.custom.iter().cloned())
            .collect()
    }

    /// Total number of drawable words.
    pub fn len(&self) -> usize {
        BASE_WORDS.len() + self.custom.len()
    }

    /// Always `false`: the base list is never empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Case-insensitive membership test, including the center word.
    pub fn contains(&self, word: &str) -> bool {
        let needle = word.trim().to_lowercase();
        std::iter::once(CENTER_WORD)
            .chain(BASE_WORDS.iter().copied())
            .chain(self.custom.iter().map(String::as_str))
            .any(|w| w.to_lowercase() == needle)
    }

    /// Add a custom word.
    ///
    /// Returns `Ok(false)` when the word already exists in the pool.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::EmptyWord`] for blank input.
    pub fn add_custom(&mut self, word: &str) -> Result<bool, ValidationError> {
        let word = word.trim();
        if word.is_empty() {
            return Err(ValidationError::EmptyWord);
        }
        if self.contains(word) {
            return Ok(false);
        }
        self.custom.push(word.to_string());
        Ok(true)
    }

    /// Remove a custom word, matched case-insensitively.
    ///
    /// Base words cannot be removed. Returns `true` if a word was removed.
    pub fn remove_custom(&mut self, word: &str) -> bool {
        let needle = word.trim().to_lowercase();
        let before = self.custom.len();
        self.custom.retain(|w| w.to_lowercase() != needle);
        self.custom.len() != before
    }
}
