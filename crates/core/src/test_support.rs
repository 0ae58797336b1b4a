//! Counting provider stubs shared by unit tests.

use crate::providers::{DictionaryProvider, ProviderError, Relation, TranslatorProvider};
use crate::types::{Definition, Language, TranslateResult};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

pub struct StubTranslator {
    detection: Result<Vec<String>, String>,
    reply: Result<TranslateResult, String>,
    detect_calls: AtomicUsize,
    translate_calls: AtomicUsize,
    targets: Mutex<Vec<Language>>,
}

impl StubTranslator {
    pub fn new(detected: &[&str], text: &str, source_lang: &str) -> Self {
        Self {
            detection: Ok(detected.iter().map(ToString::to_string).collect()),
            reply: Ok(TranslateResult {
                text: text.to_string(),
                source_lang: source_lang.to_string(),
            }),
            detect_calls: AtomicUsize::new(0),
            translate_calls: AtomicUsize::new(0),
            targets: Mutex::new(Vec::new()),
        }
    }

    pub fn detecting(detected: &[&str]) -> Self {
        Self::new(detected, "translated", "en")
    }

    pub fn failing_detection() -> Self {
        let mut stub = Self::new(&[], "翻訳", "fr");
        stub.detection = Err("detect endpoint unreachable".to_string());
        stub
    }

    pub fn failing_translation(detected: &[&str]) -> Self {
        let mut stub = Self::detecting(detected);
        stub.reply = Err("quota exceeded".to_string());
        stub
    }

    pub fn detect_calls(&self) -> usize {
        self.detect_calls.load(Ordering::SeqCst)
    }

    pub fn translate_calls(&self) -> usize {
        self.translate_calls.load(Ordering::SeqCst)
    }

    pub fn targets(&self) -> Vec<Language> {
        self.targets.lock().expect("targets lock").clone()
    }
}

#[async_trait]
impl TranslatorProvider for StubTranslator {
    async fn detect_language(&self, _input: &str) -> Result<Vec<String>, ProviderError> {
        self.detect_calls.fetch_add(1, Ordering::SeqCst);
        self.detection.clone().map_err(ProviderError::Request)
    }

    async fn translate(
        &self,
        _input: &str,
        target: Language,
    ) -> Result<TranslateResult, ProviderError> {
        self.translate_calls.fetch_add(1, Ordering::SeqCst);
        self.targets.lock().expect("targets lock").push(target);
        self.reply.clone().map_err(ProviderError::Request)
    }
}

/// Dictionary stub answering from a fixed word table.
#[derive(Default)]
pub struct StubDictionary {
    known: HashMap<String, Vec<String>>,
    failing: HashSet<String>,
    calls: Mutex<Vec<(Relation, String)>>,
}

impl StubDictionary {
    pub fn with_words(words: &[(&str, &str)]) -> Self {
        Self {
            known: words
                .iter()
                .map(|(w, gloss)| (w.to_string(), vec![gloss.to_string()]))
                .collect(),
            ..Self::default()
        }
    }

    /// Makes synonym and antonym lookups of `word` fail.
    pub fn failing_relations_for(mut self, word: &str) -> Self {
        self.failing.insert(word.to_string());
        self
    }

    pub fn calls(&self) -> Vec<(Relation, String)> {
        self.calls.lock().expect("calls lock").clone()
    }
}

#[async_trait]
impl DictionaryProvider for StubDictionary {
    async fn lookup(
        &self,
        relation: Relation,
        word: &str,
    ) -> Result<Vec<Definition>, ProviderError> {
        self.calls
            .lock()
            .expect("calls lock")
            .push((relation, word.to_string()));

        if relation != Relation::Spelling && self.failing.contains(word) {
            return Err(ProviderError::Request("dictionary offline".to_string()));
        }

        let Some(glosses) = self.known.get(word) else {
            return Ok(Vec::new());
        };
        Ok(match relation {
            Relation::Spelling => vec![Definition {
                word: word.to_string(),
                defs: glosses.clone(),
            }],
            Relation::Synonym => vec![Definition {
                word: format!("{word}-syn"),
                defs: vec![],
            }],
            Relation::Antonym => vec![Definition {
                word: format!("{word}-ant"),
                defs: vec![],
            }],
        })
    }
}
