//! Languages and the lang-file backed language registry.

use std::collections::HashMap;
use std::fmt;
use std::sync::{PoisonError, RwLock};

use serde::{Deserialize, Serialize};

use crate::host::{LanguageRegistry, Player, PlayerId};

/// A language code such as `en` or `de_de`, always stored lowercase.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct Language(String);

impl Language {
    pub fn new(code: &str) -> Self {
        Self(code.trim().to_ascii_lowercase())
    }

    pub fn code(&self) -> &str {
        &self.0
    }
}

impl From<String> for Language {
    fn from(code: String) -> Self {
        Self::new(&code)
    }
}

impl From<&str> for Language {
    fn from(code: &str) -> Self {
        Self::new(code)
    }
}

impl From<Language> for String {
    fn from(lang: Language) -> Self {
        lang.0
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Parses a `key: value` lang file.
/// Lines starting with `//` are comments. Keys keep their case; values are trimmed.
pub fn parse_lang_file(content: &str) -> HashMap<String, String> {
    let mut messages = HashMap::new();
    for line in content.lines() {
        let line = line.trim();
        if line.starts_with("//") || line.is_empty() {
            continue;
        }
        if let Some((key, val)) = line.split_once(':') {
            messages.insert(key.trim().to_string(), val.trim().to_string());
        }
    }
    messages
}

/// In-memory [`LanguageRegistry`]: a default language, per-player overrides
/// and one message table per language.
pub struct StaticLanguages {
    default: Language,
    overrides: RwLock<HashMap<PlayerId, Language>>,
    messages: HashMap<Language, HashMap<String, String>>,
}

impl StaticLanguages {
    pub fn new(default: Language) -> Self {
        Self {
            default,
            overrides: RwLock::new(HashMap::new()),
            messages: HashMap::new(),
        }
    }

    /// Register the messages of one lang file under `language`.
    pub fn with_lang_file(mut self, language: Language, content: &str) -> Self {
        self.messages
            .entry(language)
            .or_default()
            .extend(parse_lang_file(content));
        self
    }

    pub fn set_player_language(&self, player: PlayerId, language: Language) {
        self.overrides
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(player, language);
    }
}

impl LanguageRegistry for StaticLanguages {
    fn default_language(&self) -> Language {
        self.default.clone()
    }

    fn player_language(&self, player: &Player) -> Language {
        self.overrides
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&player.id)
            .cloned()
            .unwrap_or_else(|| self.default.clone())
    }

    fn localized(&self, language: &Language, key: &str) -> Option<String> {
        self.messages
            .get(language)
            .and_then(|m| m.get(key))
            .or_else(|| self.messages.get(&self.default).and_then(|m| m.get(key)))
            .cloned()
    }
}
