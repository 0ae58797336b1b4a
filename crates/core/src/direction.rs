//! Picks the translation target for an input.

use crate::providers::TranslatorProvider;
use crate::types::Language;
use tracing::{debug, warn};

/// Outcome of asking the provider which language an input is in.
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum Detection {
    /// Every candidate tag the provider returned.
    Detected(Vec<String>),
    /// Detection failed; the default direction applies.
    Unavailable(String),
}

/// Runs language detection, folding provider errors into [`Detection::Unavailable`].
pub async fn detect<P>(provider: &P, input: &str) -> Detection
where
    P: TranslatorProvider + ?Sized,
{
    match provider.detect_language(input).await {
        Ok(tags) => {
            debug!(?tags, "language detected");
            Detection::Detected(tags)
        }
        Err(err) => {
            warn!(error = %err, "language detection failed; defaulting to Japanese target");
            Detection::Unavailable(err.to_string())
        }
    }
}

/// Japanese input goes to English; everything else, including unknown, goes to Japanese.
///
/// ```
/// use ej_core::direction::{target_for, Detection};
/// use ej_core::types::Language;
///
/// let detected = Detection::Detected(vec!["en".into(), "ja".into()]);
/// assert_eq!(target_for(&detected), Language::English);
/// assert_eq!(
///     target_for(&Detection::Unavailable("offline".into())),
///     Language::Japanese
/// );
/// ```
pub fn target_for(detection: &Detection) -> Language {
    match detection {
        Detection::Detected(tags) if tags.iter().any(|t| Language::Japanese.matches(t)) => {
            Language::English
        }
        _ => Language::Japanese,
    }
}

/// Resolves the target language, skipping detection entirely when `force_reverse` is set.
pub async fn resolve_target<P>(provider: &P, input: &str, force_reverse: bool) -> Language
where
    P: TranslatorProvider + ?Sized,
{
    if force_reverse {
        return Language::English;
    }
    target_for(&detect(provider, input).await)
}
