use crate::assembler::{assemble, list_cached};
use crate::direction::resolve_target;
use crate::providers::{DictionaryProvider, ProviderError, TranslatorProvider};
use crate::store::{CacheStore, StoreError, Table};
use crate::types::{
    Language, ResolveOptions, TranslateAndDicts, Translation, DEFAULT_API_KEY_ENV_VAR,
};
use html_escape::decode_html_entities;
use thiserror::Error;
use tracing::debug;

/// Errors that abort a translation request.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("need '{0}' env variable")]
    MissingCredential(String),
    #[error("provider failure: {0}")]
    Provider(#[from] ProviderError),
    #[error("cache failure: {0}")]
    Store(#[from] StoreError),
    #[error("input is already in the target language '{0}'")]
    SameLanguage(String),
}

/// Cache-backed translation pipeline.
///
/// The translator is optional because it needs a credential; without one, only
/// cached translations can be served and a miss fails with
/// [`EngineError::MissingCredential`].
pub struct Engine<T, D>
where
    T: TranslatorProvider,
    D: DictionaryProvider,
{
    translator: Option<T>,
    dictionary: D,
    credential_var: String,
    offline_dictionary: bool,
}

impl<T, D> Engine<T, D>
where
    T: TranslatorProvider,
    D: DictionaryProvider,
{
    pub fn new(translator: Option<T>, dictionary: D) -> Self {
        Self {
            translator,
            dictionary,
            credential_var: DEFAULT_API_KEY_ENV_VAR.to_string(),
            offline_dictionary: false,
        }
    }

    /// Names the environment variable reported when the credential is missing.
    pub fn with_credential_var(mut self, var: impl Into<String>) -> Self {
        self.credential_var = var.into();
        self
    }

    /// Restricts dictionary enrichment to cached entries.
    pub fn with_offline_dictionary(mut self, offline: bool) -> Self {
        self.offline_dictionary = offline;
        self
    }

    /// Returns the cached translation of `raw_input`, fetching and caching it on a miss.
    ///
    /// Blank input is a no-op and yields `Ok(None)` without touching the cache.
    ///
    /// # Examples
    ///
    /// ```
    /// use ej_core::engine::Engine;
    /// use ej_core::providers::{MockDictionary, MockTranslator};
    /// use ej_core::store::CacheStore;
    /// use ej_core::types::ResolveOptions;
    ///
    /// # #[tokio::main(flavor = "current_thread")]
    /// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
    /// let store = CacheStore::in_memory()?;
    /// let engine = Engine::new(Some(MockTranslator), MockDictionary);
    /// let tr = engine
    ///     .resolve(&store, "おはよう", ResolveOptions::default())
    ///     .await?
    ///     .expect("non-empty input");
    /// assert_eq!(tr.input_lang, "ja");
    /// assert_eq!(tr.translated_lang, "en");
    /// # Ok(())
    /// # }
    /// ```
    pub async fn resolve(
        &self,
        store: &CacheStore,
        raw_input: &str,
        opts: ResolveOptions,
    ) -> Result<Option<Translation>, EngineError> {
        Ok(self
            .resolve_with_origin(store, raw_input, opts)
            .await?
            .map(|(tr, _)| tr))
    }

    /// Resolves `raw_input` and attaches dictionary entries for its English side.
    ///
    /// Cached translations are enriched from the dictionary cache only.
    pub async fn translate(
        &self,
        store: &CacheStore,
        raw_input: &str,
        opts: ResolveOptions,
    ) -> Result<Option<TranslateAndDicts>, EngineError> {
        let Some((translation, origin)) = self.resolve_with_origin(store, raw_input, opts).await?
        else {
            return Ok(None);
        };
        let only_from_cache = origin == Origin::Cache || self.offline_dictionary;
        Ok(Some(
            assemble(store, &self.dictionary, translation, only_from_cache).await,
        ))
    }

    /// All cached translations with their cached dictionary entries.
    pub async fn list(&self, store: &CacheStore) -> Result<Vec<TranslateAndDicts>, EngineError> {
        Ok(list_cached(store, &self.dictionary).await?)
    }

    async fn resolve_with_origin(
        &self,
        store: &CacheStore,
        raw_input: &str,
        opts: ResolveOptions,
    ) -> Result<Option<(Translation, Origin)>, EngineError> {
        if raw_input.trim().is_empty() {
            return Ok(None);
        }

        if !opts.force_fresh {
            if let Some(cached) = store.get_json::<Translation>(Table::Translations, raw_input)? {
                debug!(input = raw_input, "translation cache hit");
                return Ok(Some((cached, Origin::Cache)));
            }
            debug!(input = raw_input, "translation cache miss");
        }

        let translator = self
            .translator
            .as_ref()
            .ok_or_else(|| EngineError::MissingCredential(self.credential_var.clone()))?;

        let target = resolve_target(translator, raw_input, opts.force_reverse).await;
        debug!(input = raw_input, %target, "translating");
        let result = translator.translate(raw_input, target).await?;

        let translation = normalize(raw_input, &result.source_lang, target, &result.text)?;
        store.put_json(Table::Translations, raw_input, &translation)?;
        Ok(Some((translation, Origin::Remote)))
    }
}

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
enum Origin {
    Cache,
    Remote,
}

/// Builds the stored record, unescaping HTML entities the provider may have introduced.
fn normalize(
    input: &str,
    source_lang: &str,
    target: Language,
    translated: &str,
) -> Result<Translation, EngineError> {
    if target.matches(source_lang) {
        return Err(EngineError::SameLanguage(target.tag().to_string()));
    }
    Ok(Translation {
        input: decode_html_entities(input).into_owned(),
        input_lang: source_lang.to_string(),
        translated: decode_html_entities(translated).into_owned(),
        translated_lang: target.tag().to_string(),
    })
}
