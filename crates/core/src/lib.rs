#![cfg_attr(docsrs, feature(doc_cfg))]
#![deny(rustdoc::broken_intra_doc_links)]

//! Core library for the `ej` Japanese/English translator.
//!
//! `ej_core` provides:
//! - the cache-backed translation pipeline via [`engine`]
//! - the redb cache adapter via [`store`]
//! - target-language selection via [`direction`]
//! - per-word dictionary enrichment via [`dictionary`]
//! - record assembly and cache listing via [`assembler`]
//! - translator and dictionary adapters via [`providers`]
//! - shared records and configuration types via [`types`]
//!
//! # Quick Start
//!
//! ```no_run
//! use ej_core::engine::Engine;
//! use ej_core::providers::{MockDictionary, MockTranslator};
//! use ej_core::store::CacheStore;
//! use ej_core::types::ResolveOptions;
//!
//! # async fn demo() -> Result<(), Box<dyn std::error::Error>> {
//! let store = CacheStore::open(std::path::Path::new("/tmp/ej.db"))?;
//! let engine = Engine::new(Some(MockTranslator), MockDictionary);
//! let result = engine
//!     .translate(&store, "good morning", ResolveOptions::default())
//!     .await?;
//! assert_eq!(result.map(|r| r.translate.translated_lang), Some("ja".to_string()));
//! # Ok(())
//! # }
//! ```

pub mod assembler;
pub mod dictionary;
pub mod direction;
pub mod engine;
pub mod providers;
pub mod store;
pub mod types;

#[cfg(test)]
mod test_support;
