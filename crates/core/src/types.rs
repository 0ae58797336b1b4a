use serde::{Deserialize, Serialize};
use std::fmt;

/// The two languages `ej` translates between.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Eq, PartialEq)]
pub enum Language {
    Japanese,
    English,
}

impl Language {
    /// BCP-47 tag sent to and compared against providers.
    pub fn tag(self) -> &'static str {
        match self {
            Language::Japanese => "ja",
            Language::English => "en",
        }
    }

    /// Matches a provider-reported tag on its primary subtag, ignoring case.
    ///
    /// ```
    /// use ej_core::types::Language;
    ///
    /// assert!(Language::Japanese.matches("ja"));
    /// assert!(Language::Japanese.matches("JA-Latn"));
    /// assert!(!Language::English.matches("ja"));
    /// ```
    pub fn matches(self, tag: &str) -> bool {
        tag.split(['-', '_'])
            .next()
            .is_some_and(|primary| primary.eq_ignore_ascii_case(self.tag()))
    }

    /// Resolves a provider tag to one of the supported languages.
    pub fn from_tag(tag: &str) -> Option<Self> {
        [Language::Japanese, Language::English]
            .into_iter()
            .find(|lang| lang.matches(tag))
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// A persisted translation, keyed in the cache by the raw input string.
#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq)]
pub struct Translation {
    pub input: String,
    pub input_lang: String,
    pub translated: String,
    pub translated_lang: String,
}

impl Translation {
    pub fn input_is_english(&self) -> bool {
        Language::English.matches(&self.input_lang)
    }

    pub fn translated_is_english(&self) -> bool {
        Language::English.matches(&self.translated_lang)
    }

    /// The English side of the pair, input first, if either side is English.
    pub fn english_side(&self) -> Option<&str> {
        if self.input_is_english() {
            Some(&self.input)
        } else if self.translated_is_english() {
            Some(&self.translated)
        } else {
            None
        }
    }
}

/// Glosses for a single word as returned by the dictionary provider.
#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq)]
pub struct Definition {
    pub word: String,
    #[serde(default)]
    pub defs: Vec<String>,
}

/// Dictionary entry cached per lowercase word.
#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq)]
pub struct Dict {
    pub word: String,
    pub definition: Definition,
    pub synonyms: Vec<Definition>,
    pub antonyms: Vec<Definition>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq)]
pub struct TranslateAndDicts {
    pub translate: Translation,
    pub dicts: Vec<Dict>,
}

/// Result of a remote translation call.
#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq)]
pub struct TranslateResult {
    pub text: String,
    pub source_lang: String,
}

/// Caller-facing switches for a single translation request.
#[derive(Debug, Clone, Copy, Default, Eq, PartialEq)]
pub struct ResolveOptions {
    /// Skip the cache lookup and always hit the translator.
    pub force_fresh: bool,
    /// Translate into English without running language detection.
    pub force_reverse: bool,
}

pub const DEFAULT_API_KEY_ENV_VAR: &str = "EJ_GOOGLE_TRANS_API_KEY";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranslateConfig {
    pub provider: String,
    pub endpoint: Option<String>,
    pub api_key_env_var: String,
}

impl Default for TranslateConfig {
    fn default() -> Self {
        Self {
            provider: "google".to_string(),
            endpoint: None,
            api_key_env_var: DEFAULT_API_KEY_ENV_VAR.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DictionaryConfig {
    pub provider: String,
    pub endpoint: Option<String>,
    /// When false, dictionary data is only ever read from the cache.
    pub enabled: bool,
}

impl Default for DictionaryConfig {
    fn default() -> Self {
        Self {
            provider: "datamuse".to_string(),
            endpoint: None,
            enabled: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Location of the cache database, before `~`/`$VAR` expansion.
    pub path: String,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            path: "$HOME/.ej/ej.db".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    pub translate: TranslateConfig,
    pub dictionary: DictionaryConfig,
    pub cache: CacheConfig,
}
