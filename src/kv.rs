//! Device-local key-value persistence and the player profile kept in it.
//!
//! The game keeps three things on the device: a stable player identity
//! generated once, the last display name used, and the player's custom word
//! list encoded as a JSON array of strings. [`KeyValueStore`] is the seam to
//! whatever the host platform offers (browser local storage, a settings file);
//! [`LocalProfile`] layers the typed accessors on top.

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

use tracing::{debug, warn};

/// Key holding the generate-once player identifier.
pub const PLAYER_ID_KEY: &str = "bingo.playerId";
/// Key holding the last display name entered.
pub const PLAYER_NAME_KEY: &str = "bingo.playerName";
/// Key holding the custom word list as a JSON array.
pub const CUSTOM_WORDS_KEY: &str = "bingo.customWords";

/// Synchronous string key-value storage local to one device.
pub trait KeyValueStore: Send + Sync + 'static {
    /// Value stored under `key`, if any.
    fn get(&self, key: &str) -> Option<String>;

    /// Store `value` under `key`, replacing any previous value.
    fn set(&self, key: &str, value: String);
}

/// A [`KeyValueStore`] held in memory for the lifetime of the process.
#[derive(Debug, Default)]
pub struct MemoryKeyValueStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryKeyValueStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store pre-populated with `entries`.
    pub fn with_entries<I, K, V>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            entries: Mutex::new(
                entries
                    .into_iter()
                    .map(|(k, v)| (k.into(), v.into()))
                    .collect(),
            ),
        }
    }
}

impl KeyValueStore for MemoryKeyValueStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
    }

    fn set(&self, key: &str, value: String) {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.to_string(), value);
    }
}

/// Typed view over the persisted player profile.
#[derive(Debug)]
pub struct LocalProfile<K> {
    kv: K,
}

impl<K: KeyValueStore> LocalProfile<K> {
    /// Wrap a key-value store.
    pub fn new(kv: K) -> Self {
        Self { kv }
    }

    /// The stable player identifier, generated and stored on first use.
    pub fn player_id(&self) -> String {
        if let Some(id) = self.kv.get(PLAYER_ID_KEY).filter(|id| !id.is_empty()) {
            return id;
        }
        let id = uuid::Uuid::new_v4().to_string();
        debug!(player_id = %id, "generated new player identity");
        self.kv.set(PLAYER_ID_KEY, id.clone());
        id
    }

    /// The last display name entered, or an empty string.
    pub fn name(&self) -> String {
        self.kv.get(PLAYER_NAME_KEY).unwrap_or_default()
    }

    /// Remember `name` for the next session.
    pub fn set_name(&self, name: &str) {
        self.kv.set(PLAYER_NAME_KEY, name.to_string());
    }

    /// The persisted custom word list.
    ///
    /// A missing or malformed entry reads as an empty list.
    pub fn custom_words(&self) -> Vec<String> {
        let Some(raw) = self.kv.get(CUSTOM_WORDS_KEY) else {
            return Vec::new();
        };
        match serde_json::from_str::<Vec<String>>(&raw) {
            Ok(words) => words,
            Err(e) => {
                warn!("ignoring malformed custom word list: {e}");
                Vec::new()
            }
        }
    }

    /// Persist the custom word list.
    pub fn set_custom_words(&self, words: &[String]) {
        match serde_json::to_string(words) {
            Ok(json) => self.kv.set(CUSTOM_WORDS_KEY, json),
            Err(e) => warn!("failed to encode custom word list: {e}"),
        }
    }

    /// Borrow the underlying key-value store.
    pub fn store(&self) -> &K {
        &self.kv
    }
}
