//! Joins translations with the dictionary entries for their English side.

use crate::dictionary::enrich;
use crate::providers::DictionaryProvider;
use crate::store::{decode_record, CacheStore, StoreError, Table};
use crate::types::{TranslateAndDicts, Translation};

/// Packages `translation` with dictionary entries for whichever side is English.
pub async fn assemble<D>(
    store: &CacheStore,
    dictionary: &D,
    translation: Translation,
    only_from_cache: bool,
) -> TranslateAndDicts
where
    D: DictionaryProvider + ?Sized,
{
    let dicts = match translation.english_side() {
        Some(english) => enrich(store, dictionary, english, only_from_cache).await,
        None => Vec::new(),
    };
    TranslateAndDicts {
        translate: translation,
        dicts,
    }
}

/// Every cached translation in store order, with cached dictionary data only.
pub async fn list_cached<D>(
    store: &CacheStore,
    dictionary: &D,
) -> Result<Vec<TranslateAndDicts>, StoreError>
where
    D: DictionaryProvider + ?Sized,
{
    let mut translations = Vec::new();
    store.for_each(Table::Translations, |key, raw| {
        if let Some(tr) = decode_record::<Translation>(Table::Translations, key, raw) {
            translations.push(tr);
        }
    })?;

    let mut out = Vec::with_capacity(translations.len());
    for tr in translations {
        out.push(assemble(store, dictionary, tr, true).await);
    }
    Ok(out)
}
