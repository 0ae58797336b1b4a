use crate::types::{Definition, Language, TranslateResult};
use async_trait::async_trait;
#[cfg(any(feature = "provider-google", feature = "provider-datamuse"))]
use reqwest::{Client, RequestBuilder};
#[cfg(any(feature = "provider-google", feature = "provider-datamuse"))]
use serde::de::DeserializeOwned;
#[cfg(feature = "provider-google")]
use serde::Deserialize;
#[cfg(feature = "provider-google")]
use serde_json::json;
use thiserror::Error;
#[cfg(feature = "provider-datamuse")]
use url::Url;

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("provider request failed: {0}")]
    Request(String),
    #[error("provider response invalid: {0}")]
    InvalidResponse(String),
}

/// Remote translation service able to detect and translate text.
#[async_trait]
pub trait TranslatorProvider: Send + Sync {
    /// Returns every candidate language tag the provider detected for `input`.
    async fn detect_language(&self, input: &str) -> Result<Vec<String>, ProviderError>;

    async fn translate(
        &self,
        input: &str,
        target: Language,
    ) -> Result<TranslateResult, ProviderError>;
}

#[async_trait]
impl<T> TranslatorProvider for Box<T>
where
    T: TranslatorProvider + ?Sized,
{
    async fn detect_language(&self, input: &str) -> Result<Vec<String>, ProviderError> {
        (**self).detect_language(input).await
    }

    async fn translate(
        &self,
        input: &str,
        target: Language,
    ) -> Result<TranslateResult, ProviderError> {
        (**self).translate(input, target).await
    }
}

/// Which word list a dictionary lookup asks for.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum Relation {
    /// Words spelled like the query, with definitions.
    Spelling,
    Synonym,
    Antonym,
}

impl Relation {
    /// Datamuse query parameter for this relation.
    pub fn query_param(self) -> &'static str {
        match self {
            Relation::Spelling => "sp",
            Relation::Synonym => "rel_syn",
            Relation::Antonym => "rel_ant",
        }
    }
}

/// Remote dictionary returning glossed word lists.
#[async_trait]
pub trait DictionaryProvider: Send + Sync {
    async fn lookup(&self, relation: Relation, word: &str)
        -> Result<Vec<Definition>, ProviderError>;
}

#[async_trait]
impl<T> DictionaryProvider for Box<T>
where
    T: DictionaryProvider + ?Sized,
{
    async fn lookup(
        &self,
        relation: Relation,
        word: &str,
    ) -> Result<Vec<Definition>, ProviderError> {
        (**self).lookup(relation, word).await
    }
}

#[cfg(feature = "provider-google")]
pub const GOOGLE_TRANSLATE_ENDPOINT: &str =
    "https://translation.googleapis.com/language/translate/v2";

/// Google Cloud Translation v2 over REST, authenticated with an API key.
#[cfg(feature = "provider-google")]
#[derive(Debug, Clone)]
pub struct GoogleTranslateProvider {
    pub endpoint: String,
    api_key: String,
    client: Client,
}

#[cfg(feature = "provider-google")]
impl GoogleTranslateProvider {
    pub fn new(endpoint: String, api_key: String) -> Self {
        Self {
            endpoint: endpoint.trim_end_matches('/').to_string(),
            api_key,
            client: Client::new(),
        }
    }
}

#[cfg(feature = "provider-google")]
#[derive(Debug, Deserialize)]
struct GoogleEnvelope<T> {
    data: T,
}

#[cfg(feature = "provider-google")]
#[derive(Debug, Deserialize)]
struct GoogleTranslations {
    translations: Vec<GoogleTranslation>,
}

#[cfg(feature = "provider-google")]
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GoogleTranslation {
    translated_text: String,
    detected_source_language: Option<String>,
}

#[cfg(feature = "provider-google")]
#[derive(Debug, Deserialize)]
struct GoogleDetections {
    detections: Vec<Vec<GoogleDetection>>,
}

#[cfg(feature = "provider-google")]
#[derive(Debug, Deserialize)]
struct GoogleDetection {
    language: String,
}

#[cfg(feature = "provider-google")]
#[async_trait]
impl TranslatorProvider for GoogleTranslateProvider {
    async fn detect_language(&self, input: &str) -> Result<Vec<String>, ProviderError> {
        let request = self
            .client
            .post(format!("{}/detect", self.endpoint))
            .query(&[("key", self.api_key.as_str())])
            .json(&json!({ "q": [input] }));

        let envelope: GoogleEnvelope<GoogleDetections> = send_json(request).await?;
        Ok(envelope
            .data
            .detections
            .into_iter()
            .flatten()
            .map(|d| d.language)
            .collect())
    }

    async fn translate(
        &self,
        input: &str,
        target: Language,
    ) -> Result<TranslateResult, ProviderError> {
        let request = self
            .client
            .post(&self.endpoint)
            .query(&[("key", self.api_key.as_str())])
            .json(&json!({ "q": [input], "target": target.tag() }));

        let envelope: GoogleEnvelope<GoogleTranslations> = send_json(request).await?;
        let first = envelope
            .data
            .translations
            .into_iter()
            .next()
            .ok_or_else(|| {
                ProviderError::InvalidResponse("empty `data.translations` array".to_string())
            })?;
        let source_lang = first.detected_source_language.ok_or_else(|| {
            ProviderError::InvalidResponse(
                "missing `detectedSourceLanguage` in translation".to_string(),
            )
        })?;

        Ok(TranslateResult {
            text: first.translated_text,
            source_lang,
        })
    }
}

#[cfg(feature = "provider-datamuse")]
pub const DATAMUSE_ENDPOINT: &str = "https://api.datamuse.com/words";

/// Datamuse word-finding API; no credential required.
#[cfg(feature = "provider-datamuse")]
#[derive(Debug, Clone)]
pub struct DatamuseProvider {
    pub endpoint: String,
    client: Client,
}

#[cfg(feature = "provider-datamuse")]
impl DatamuseProvider {
    pub fn new(endpoint: String) -> Self {
        Self {
            endpoint,
            client: Client::new(),
        }
    }

    /// Builds `<endpoint>?<relation>=<word>&md=d`.
    pub fn lookup_url(&self, relation: Relation, word: &str) -> Result<Url, ProviderError> {
        Url::parse_with_params(
            &self.endpoint,
            &[(relation.query_param(), word), ("md", "d")],
        )
        .map_err(|e| ProviderError::Request(format!("invalid dictionary endpoint: {e}")))
    }
}

#[cfg(feature = "provider-datamuse")]
#[async_trait]
impl DictionaryProvider for DatamuseProvider {
    async fn lookup(
        &self,
        relation: Relation,
        word: &str,
    ) -> Result<Vec<Definition>, ProviderError> {
        let url = self.lookup_url(relation, word)?;
        send_json(self.client.get(url)).await
    }
}

/// Offline translator: tags anything containing kana or CJK ideographs as Japanese.
#[derive(Debug, Clone)]
pub struct MockTranslator;

/// Kana, CJK ideographs and half-width katakana.
pub fn contains_japanese_script(text: &str) -> bool {
    text.chars().any(|c| {
        matches!(c,
            '\u{3040}'..='\u{30ff}'
            | '\u{3400}'..='\u{4dbf}'
            | '\u{4e00}'..='\u{9fff}'
            | '\u{ff66}'..='\u{ff9f}')
    })
}

#[async_trait]
impl TranslatorProvider for MockTranslator {
    async fn detect_language(&self, input: &str) -> Result<Vec<String>, ProviderError> {
        let lang = if contains_japanese_script(input) {
            Language::Japanese
        } else {
            Language::English
        };
        Ok(vec![lang.tag().to_string()])
    }

    async fn translate(
        &self,
        input: &str,
        target: Language,
    ) -> Result<TranslateResult, ProviderError> {
        let source = if contains_japanese_script(input) {
            Language::Japanese
        } else {
            Language::English
        };
        Ok(TranslateResult {
            text: format!("[{target}] {input}"),
            source_lang: source.tag().to_string(),
        })
    }
}

/// Offline dictionary returning one canned gloss for every word.
#[derive(Debug, Clone)]
pub struct MockDictionary;

#[async_trait]
impl DictionaryProvider for MockDictionary {
    async fn lookup(
        &self,
        relation: Relation,
        word: &str,
    ) -> Result<Vec<Definition>, ProviderError> {
        let entry = match relation {
            Relation::Spelling => Definition {
                word: word.to_string(),
                defs: vec![format!("n\tmock definition of {word}")],
            },
            Relation::Synonym => Definition {
                word: format!("{word}-like"),
                defs: vec![],
            },
            Relation::Antonym => Definition {
                word: format!("un{word}"),
                defs: vec![],
            },
        };
        Ok(vec![entry])
    }
}

#[cfg(any(feature = "provider-google", feature = "provider-datamuse"))]
async fn send_json<T: DeserializeOwned>(request: RequestBuilder) -> Result<T, ProviderError> {
    let response = request
        .send()
        .await
        .map_err(|e| ProviderError::Request(e.to_string()))?;
    let status = response.status();
    if !status.is_success() {
        return Err(ProviderError::Request(format!(
            "http status {} from provider",
            status
        )));
    }
    response
        .json()
        .await
        .map_err(|e| ProviderError::InvalidResponse(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_japanese_script() {
        assert!(contains_japanese_script("おはよう"));
        assert!(contains_japanese_script("漢字 and kana"));
        assert!(contains_japanese_script("ｶﾀｶﾅ"));
        assert!(!contains_japanese_script("good morning"));
    }

    #[tokio::test]
    async fn mock_translator_reports_source_and_target() {
        let result = MockTranslator
            .translate("こんにちは", Language::English)
            .await
            .expect("mock translate");
        assert_eq!(result.source_lang, "ja");
        assert_eq!(result.text, "[en] こんにちは");
    }

    #[cfg(feature = "provider-datamuse")]
    #[test]
    fn datamuse_url_encodes_relation_and_word() {
        let provider = DatamuseProvider::new(DATAMUSE_ENDPOINT.to_string());
        let url = provider
            .lookup_url(Relation::Antonym, "hot & cold")
            .expect("url");
        assert_eq!(
            url.as_str(),
            "https://api.datamuse.com/words?rel_ant=hot+%26+cold&md=d"
        );
    }

    #[cfg(feature = "provider-google")]
    #[test]
    fn google_detections_flatten_candidates() {
        let raw = r#"{"data":{"detections":[[{"language":"en","isReliable":false,"confidence":0.4},{"language":"ja","confidence":0.3}]]}}"#;
        let envelope: GoogleEnvelope<GoogleDetections> =
            serde_json::from_str(raw).expect("decode");
        let langs: Vec<String> = envelope
            .data
            .detections
            .into_iter()
            .flatten()
            .map(|d| d.language)
            .collect();
        assert_eq!(langs, vec!["en", "ja"]);
    }

    #[cfg(feature = "provider-google")]
    #[test]
    fn google_translation_decodes_camel_case() {
        let raw = r#"{"data":{"translations":[{"translatedText":"Tom &amp; Jerry","detectedSourceLanguage":"ja"}]}}"#;
        let envelope: GoogleEnvelope<GoogleTranslations> =
            serde_json::from_str(raw).expect("decode");
        let first = &envelope.data.translations[0];
        assert_eq!(first.translated_text, "Tom &amp; Jerry");
        assert_eq!(first.detected_source_language.as_deref(), Some("ja"));
    }

    #[cfg(feature = "provider-google")]
    #[test]
    fn google_endpoint_trailing_slash_trimmed() {
        let provider =
            GoogleTranslateProvider::new(format!("{GOOGLE_TRANSLATE_ENDPOINT}/"), "k".into());
        assert_eq!(provider.endpoint, GOOGLE_TRANSLATE_ENDPOINT);
    }
}
