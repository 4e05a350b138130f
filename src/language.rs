//! Session language preferences
//!
//! A small key → record store owned by the server state. Lives as long as
//! the process; nothing is persisted. The in-memory store holds at most
//! `capacity` sessions and evicts the least recently used one when full.

use chrono::{DateTime, Utc};
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::sync::RwLock;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    En,
    Hi,
    Pa,
}

impl Language {
    pub const ALL: [Language; 3] = [Language::En, Language::Hi, Language::Pa];

    pub fn code(&self) -> &'static str {
        match self {
            Language::En => "en",
            Language::Hi => "hi",
            Language::Pa => "pa",
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Language::En => "English",
            Language::Hi => "Hindi",
            Language::Pa => "Punjabi",
        }
    }

    pub fn native_name(&self) -> &'static str {
        match self {
            Language::En => "English",
            Language::Hi => "हिंदी",
            Language::Pa => "ਪੰਜਾਬੀ",
        }
    }
}

impl FromStr for Language {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "en" => Ok(Language::En),
            "hi" => Ok(Language::Hi),
            "pa" => Ok(Language::Pa),
            other => Err(format!("Unsupported language '{}': must be one of en, hi, pa", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LanguagePreference {
    pub language: Language,
    pub set_at: DateTime<Utc>,
    pub last_used: DateTime<Utc>,
}

/// Storage for per-session language choices
pub trait LanguageStore: Send + Sync {
    fn set(&self, session_id: &str, language: Language) -> LanguagePreference;

    /// Looks up and refreshes `last_used`
    fn get(&self, session_id: &str) -> Option<LanguagePreference>;

    /// Sessions per language, in `Language::ALL` order
    fn stats(&self) -> Vec<(Language, usize)>;
}

/// Sessions kept before the least recently used one is dropped
pub const DEFAULT_LANGUAGE_CAPACITY: usize = 10_000;

#[derive(Debug, Default)]
struct Sessions {
    prefs: FxHashMap<String, (LanguagePreference, u64)>,
    tick: u64,
}

impl Sessions {
    fn next_tick(&mut self) -> u64 {
        self.tick += 1;
        self.tick
    }

    fn evict_oldest(&mut self) {
        let oldest = self
            .prefs
            .iter()
            .min_by_key(|(_, (_, touched))| *touched)
            .map(|(id, _)| id.clone());
        if let Some(id) = oldest {
            self.prefs.remove(&id);
        }
    }
}

#[derive(Debug)]
pub struct InMemoryLanguageStore {
    sessions: RwLock<Sessions>,
    capacity: usize,
}

impl Default for InMemoryLanguageStore {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_LANGUAGE_CAPACITY)
    }
}

impl InMemoryLanguageStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            sessions: RwLock::new(Sessions::default()),
            capacity: capacity.max(1),
        }
    }

    pub fn len(&self) -> usize {
        self.sessions.read().unwrap_or_else(|e| e.into_inner()).prefs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl LanguageStore for InMemoryLanguageStore {
    fn set(&self, session_id: &str, language: Language) -> LanguagePreference {
        let now = Utc::now();
        let pref = LanguagePreference {
            language,
            set_at: now,
            last_used: now,
        };

        // Entries are plain values, so a poisoned lock is still safe to use
        let mut sessions = self.sessions.write().unwrap_or_else(|e| e.into_inner());
        if !sessions.prefs.contains_key(session_id) && sessions.prefs.len() >= self.capacity {
            sessions.evict_oldest();
        }
        let tick = sessions.next_tick();
        sessions.prefs.insert(session_id.to_string(), (pref.clone(), tick));
        pref
    }

    fn get(&self, session_id: &str) -> Option<LanguagePreference> {
        let mut sessions = self.sessions.write().unwrap_or_else(|e| e.into_inner());
        let tick = sessions.next_tick();
        let (pref, touched) = sessions.prefs.get_mut(session_id)?;
        pref.last_used = Utc::now();
        *touched = tick;
        Some(pref.clone())
    }

    fn stats(&self) -> Vec<(Language, usize)> {
        let sessions = self.sessions.read().unwrap_or_else(|e| e.into_inner());
        Language::ALL
            .iter()
            .map(|lang| {
                let count = sessions.prefs.values().filter(|(p, _)| p.language == *lang).count();
                (*lang, count)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_language() {
        assert_eq!("HI".parse::<Language>().unwrap(), Language::Hi);
        assert!("fr".parse::<Language>().is_err());
    }

    #[test]
    fn test_set_then_get() {
        let store = InMemoryLanguageStore::new();
        let set = store.set("session_abc", Language::Pa);

        let got = store.get("session_abc").unwrap();
        assert_eq!(got.language, Language::Pa);
        assert_eq!(got.set_at, set.set_at);
        assert!(got.last_used >= set.last_used);
    }

    #[test]
    fn test_get_unknown_session() {
        assert!(InMemoryLanguageStore::new().get("nobody").is_none());
    }

    #[test]
    fn test_overwrite_and_stats() {
        let store = InMemoryLanguageStore::new();
        store.set("a", Language::En);
        store.set("b", Language::Hi);
        store.set("a", Language::Hi);

        assert_eq!(
            store.stats(),
            vec![(Language::En, 0), (Language::Hi, 2), (Language::Pa, 0)]
        );
    }

    #[test]
    fn test_capacity_evicts_least_recently_used() {
        let store = InMemoryLanguageStore::with_capacity(2);
        store.set("a", Language::En);
        store.set("b", Language::Hi);
        assert!(store.get("a").is_some());

        store.set("c", Language::Pa);
        assert_eq!(store.len(), 2);
        assert!(store.get("b").is_none());
        assert!(store.get("a").is_some());
        assert!(store.get("c").is_some());

        // Overwriting an existing session never evicts
        store.set("a", Language::Hi);
        assert_eq!(store.len(), 2);
        assert!(store.get("c").is_some());
    }

    #[test]
    fn test_default_capacity_holds_many_sessions() {
        let store = InMemoryLanguageStore::new();
        for i in 0..DEFAULT_LANGUAGE_CAPACITY + 5 {
            store.set(&format!("s{i}"), Language::En);
        }
        assert_eq!(store.len(), DEFAULT_LANGUAGE_CAPACITY);
        assert!(store.get("s0").is_none());
        assert!(store.get(&format!("s{}", DEFAULT_LANGUAGE_CAPACITY + 4)).is_some());
    }
}
