//! Per-word dictionary enrichment for English sentences.

use crate::providers::{DictionaryProvider, ProviderError, Relation};
use crate::store::{CacheStore, Table};
use crate::types::{Definition, Dict};
use tracing::{debug, warn};

/// Result of resolving a single word.
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum Lookup {
    Found(Dict),
    /// The word contributes no entry; the reason is for logging only.
    Skip(String),
}

/// Splits a sentence into distinct lowercase lookup words.
///
/// Anything other than letters, digits, `'` and `-` separates words. Leading
/// and trailing `'`/`-` are trimmed, numbers are dropped, and only the first
/// occurrence of each word is kept.
///
/// ```
/// use ej_core::dictionary::tokenize;
///
/// assert_eq!(
///     tokenize("Don't panic, don't PANIC: 42 well-known 'words'."),
///     vec!["don't", "panic", "well-known", "words"]
/// );
/// ```
pub fn tokenize(sentence: &str) -> Vec<String> {
    let mut words: Vec<String> = Vec::new();
    for raw in sentence.split(|c: char| !(c.is_alphanumeric() || c == '\'' || c == '-')) {
        let word = raw.trim_matches(|c: char| c == '\'' || c == '-').to_lowercase();
        if word.is_empty() || word.chars().all(|c| c.is_numeric()) {
            continue;
        }
        if !words.contains(&word) {
            words.push(word);
        }
    }
    words
}

/// Looks up every word of `sentence`, cache first.
///
/// With `only_from_cache` the provider is never called, so uncached words are
/// simply absent from the result.
pub async fn enrich<D>(
    store: &CacheStore,
    provider: &D,
    sentence: &str,
    only_from_cache: bool,
) -> Vec<Dict>
where
    D: DictionaryProvider + ?Sized,
{
    let mut dicts = Vec::new();
    for word in tokenize(sentence) {
        match lookup_word(store, provider, &word, only_from_cache).await {
            Lookup::Found(dict) => dicts.push(dict),
            Lookup::Skip(reason) => debug!(word = %word, reason = %reason, "no dictionary entry"),
        }
    }
    dicts
}

/// Resolves one word from the cache, falling back to the provider when allowed.
pub async fn lookup_word<D>(
    store: &CacheStore,
    provider: &D,
    word: &str,
    only_from_cache: bool,
) -> Lookup
where
    D: DictionaryProvider + ?Sized,
{
    match store.get_json::<Dict>(Table::Dictionary, word) {
        Ok(Some(dict)) => return Lookup::Found(dict),
        Ok(None) => {}
        Err(err) => warn!(word, error = %err, "dictionary cache read failed"),
    }

    if only_from_cache {
        return Lookup::Skip("not cached".to_string());
    }

    let dict = match fetch_dict(provider, word).await {
        Ok(Some(dict)) => dict,
        Ok(None) => return Lookup::Skip("no definition".to_string()),
        Err(err) => {
            warn!(word, error = %err, "dictionary lookup failed");
            return Lookup::Skip(err.to_string());
        }
    };

    if let Err(err) = store.put_json(Table::Dictionary, word, &dict) {
        warn!(word, error = %err, "failed to cache dictionary entry");
    }
    Lookup::Found(dict)
}

/// Fetches definition, synonyms and antonyms; `None` when the word has no definition.
async fn fetch_dict<D>(provider: &D, word: &str) -> Result<Option<Dict>, ProviderError>
where
    D: DictionaryProvider + ?Sized,
{
    let candidates = provider.lookup(Relation::Spelling, word).await?;
    let Some(definition) = pick_definition(candidates, word) else {
        return Ok(None);
    };
    let synonyms = provider.lookup(Relation::Synonym, word).await?;
    let antonyms = provider.lookup(Relation::Antonym, word).await?;

    Ok(Some(Dict {
        word: word.to_string(),
        definition,
        synonyms,
        antonyms,
    }))
}

/// Spelling lookups return near-matches too; only an exact, glossed entry counts.
fn pick_definition(candidates: Vec<Definition>, word: &str) -> Option<Definition> {
    candidates
        .into_iter()
        .find(|d| d.word.eq_ignore_ascii_case(word) && !d.defs.is_empty())
}
