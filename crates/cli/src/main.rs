#[cfg(feature = "provider-datamuse")]
use ej_core::providers::{DatamuseProvider, DATAMUSE_ENDPOINT};
#[cfg(feature = "provider-google")]
use ej_core::providers::{GoogleTranslateProvider, GOOGLE_TRANSLATE_ENDPOINT};
use ej_core::engine::{Engine, EngineError};
use ej_core::providers::{DictionaryProvider, MockDictionary, MockTranslator, TranslatorProvider};
use ej_core::store::CacheStore;
use ej_core::types::{AppConfig, Definition, Dict, ResolveOptions, TranslateAndDicts};
use anyhow::Context;
use clap::Parser;
use std::ffi::OsString;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use toml::Value;
use tracing_subscriber::EnvFilter;

type DynEngine = Engine<Box<dyn TranslatorProvider>, Box<dyn DictionaryProvider>>;

#[derive(Debug, Parser)]
#[command(
    name = "ej",
    version,
    about = "simple Japanese <-> English translator",
    long_about = "simple Japanese <-> English translator.\n\
                  Translated results are cached in a local database at \"$HOME/.ej\"."
)]
struct Cli {
    /// list all caches
    #[arg(short = 'l')]
    list: bool,
    /// force translate, do not use the cache
    #[arg(short = 'f')]
    force: bool,
    /// force reverse translation (some language to English);
    /// fails without caching if the input is already English
    #[arg(short = 'r')]
    reverse: bool,
    /// output in json format (`-json` is accepted too)
    #[arg(long)]
    json: bool,
    /// show dictionary entries in plain output
    #[arg(short = 'd', long = "dict")]
    dict: bool,
    /// cache database location
    #[arg(long, value_name = "PATH")]
    cache: Option<PathBuf>,
    #[arg(value_name = "TEXT")]
    text: Vec<String>,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    let cli = Cli::parse_from(normalize_args(std::env::args_os()));

    let input = cli.text.join(" ");
    if input.trim().is_empty() && !cli.list {
        return Ok(());
    }

    let mut cfg = load_config()?;
    if let Some(path) = &cli.cache {
        cfg.cache.path = path.to_string_lossy().to_string();
    }

    let store = open_store(&cfg)?;
    let engine = build_engine(&cfg, |k| std::env::var(k).ok())?;

    if cli.list {
        let records = engine.list(&store).await.map_err(render_engine_error)?;
        let rendered = if cli.json {
            format!("{}\n", serde_json::to_string(&records)?)
        } else {
            records.iter().map(|r| render_plain(r, cli.dict)).collect()
        };
        io::stdout().lock().write_all(rendered.as_bytes())?;
        return Ok(());
    }

    let opts = ResolveOptions {
        force_fresh: cli.force,
        force_reverse: cli.reverse,
    };
    let Some(record) = engine
        .translate(&store, &input, opts)
        .await
        .map_err(render_engine_error)?
    else {
        return Ok(());
    };

    let rendered = if cli.json {
        format!("{}\n", serde_json::to_string(&record)?)
    } else {
        render_plain(&record, cli.dict)
    };
    io::stdout().lock().write_all(rendered.as_bytes())?;
    Ok(())
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env("EJ_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}

/// Rewrites the single-dash `-json` flag into the `--json` form clap understands.
fn normalize_args<I>(args: I) -> Vec<OsString>
where
    I: IntoIterator<Item = OsString>,
{
    args.into_iter()
        .map(|arg| {
            if arg == "-json" {
                OsString::from("--json")
            } else {
                arg
            }
        })
        .collect()
}

fn open_store(cfg: &AppConfig) -> anyhow::Result<CacheStore> {
    let path = expand_cache_path(&cfg.cache.path)?;
    tracing::debug!(path = %path.display(), "opening cache");
    CacheStore::open(&path).with_context(|| format!("cannot open cache at {}", path.display()))
}

fn expand_cache_path(raw: &str) -> anyhow::Result<PathBuf> {
    let expanded = shellexpand::full(raw.trim())
        .with_context(|| format!("cannot expand cache path {raw}"))?;
    Ok(PathBuf::from(expanded.into_owned()))
}

fn build_engine<F>(cfg: &AppConfig, env_get: F) -> anyhow::Result<DynEngine>
where
    F: Fn(&str) -> Option<String>,
{
    let translator = build_translator(cfg, env_get)?;
    let dictionary = build_dictionary(cfg)?;
    let offline = dictionary.is_none() || !cfg.dictionary.enabled;
    // The placeholder is never queried: an offline engine reads the dictionary cache only.
    let dictionary: Box<dyn DictionaryProvider> =
        dictionary.unwrap_or_else(|| Box::new(MockDictionary));

    Ok(Engine::new(translator, dictionary)
        .with_credential_var(cfg.translate.api_key_env_var.clone())
        .with_offline_dictionary(offline))
}

/// `Ok(None)` means no usable translator; only cached translations can be served.
fn build_translator<F>(
    cfg: &AppConfig,
    env_get: F,
) -> anyhow::Result<Option<Box<dyn TranslatorProvider>>>
where
    F: Fn(&str) -> Option<String>,
{
    let provider = cfg.translate.provider.to_ascii_lowercase();
    match provider.as_str() {
        "mock" => Ok(Some(Box::new(MockTranslator))),
        #[cfg(feature = "provider-google")]
        "google" => {
            let Some(api_key) = env_get(&cfg.translate.api_key_env_var)
                .filter(|v| !v.trim().is_empty())
            else {
                return Ok(None);
            };
            let endpoint = non_empty(&cfg.translate.endpoint)
                .unwrap_or_else(|| GOOGLE_TRANSLATE_ENDPOINT.to_string());
            Ok(Some(Box::new(GoogleTranslateProvider::new(endpoint, api_key))))
        }
        #[cfg(not(feature = "provider-google"))]
        "google" => {
            let _ = env_get;
            tracing::warn!("built without the provider-google feature; serving cached translations only");
            Ok(None)
        }
        other => anyhow::bail!("unknown translation provider '{other}'; expected google or mock"),
    }
}

/// `Ok(None)` means dictionary data comes from the cache only.
fn build_dictionary(cfg: &AppConfig) -> anyhow::Result<Option<Box<dyn DictionaryProvider>>> {
    let provider = cfg.dictionary.provider.to_ascii_lowercase();
    match provider.as_str() {
        "mock" => Ok(Some(Box::new(MockDictionary))),
        #[cfg(feature = "provider-datamuse")]
        "datamuse" => Ok(Some(Box::new(DatamuseProvider::new(
            non_empty(&cfg.dictionary.endpoint).unwrap_or_else(|| DATAMUSE_ENDPOINT.to_string()),
        )))),
        #[cfg(not(feature = "provider-datamuse"))]
        "datamuse" => {
            tracing::warn!("built without the provider-datamuse feature; dictionary is cache-only");
            Ok(None)
        }
        other => anyhow::bail!("unknown dictionary provider '{other}'; expected datamuse or mock"),
    }
}

#[cfg(any(feature = "provider-google", feature = "provider-datamuse"))]
fn non_empty(value: &Option<String>) -> Option<String> {
    value.clone().filter(|v| !v.trim().is_empty())
}

fn render_plain(record: &TranslateAndDicts, show_dicts: bool) -> String {
    let mut out = format!(
        "{}\n{}\n",
        record.translate.input, record.translate.translated
    );
    if show_dicts {
        for dict in &record.dicts {
            out.push_str(&render_dict_line(dict));
            out.push('\n');
        }
    }
    out.push('\n');
    out
}

fn render_dict_line(dict: &Dict) -> String {
    let mut line = format!("  {}", dict.word);
    if let Some(gloss) = dict.definition.defs.first() {
        line.push_str(": ");
        line.push_str(&render_gloss(gloss));
    }
    if !dict.synonyms.is_empty() {
        line.push_str(&format!("; syn: {}", join_words(&dict.synonyms)));
    }
    if !dict.antonyms.is_empty() {
        line.push_str(&format!("; ant: {}", join_words(&dict.antonyms)));
    }
    line
}

/// Datamuse glosses look like `n\tmeaning`; show them as `(n) meaning`.
fn render_gloss(gloss: &str) -> String {
    match gloss.split_once('\t') {
        Some((pos, text)) => format!("({pos}) {text}"),
        None => gloss.to_string(),
    }
}

fn join_words(defs: &[Definition]) -> String {
    defs.iter()
        .take(5)
        .map(|d| d.word.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

fn load_config() -> anyhow::Result<AppConfig> {
    let local_path = PathBuf::from(".ej.toml");
    let home_path = std::env::var("HOME")
        .ok()
        .map(|home| PathBuf::from(home).join(".ej").join("config.toml"));

    let home = match &home_path {
        Some(path) => read_config_value(path)?,
        None => None,
    };
    let local = read_config_value(&local_path)?;

    resolve_config(home, local, |k| std::env::var(k).ok())
}

fn resolve_config<F>(
    home: Option<Value>,
    local: Option<Value>,
    env_get: F,
) -> anyhow::Result<AppConfig>
where
    F: Fn(&str) -> Option<String>,
{
    let mut merged = Value::try_from(AppConfig::default())?;
    if let Some(home_value) = home {
        merge_toml(&mut merged, home_value);
    }
    if let Some(local_value) = local {
        merge_toml(&mut merged, local_value);
    }

    let mut cfg: AppConfig = merged.try_into()?;
    apply_env_overrides(&mut cfg, env_get);
    Ok(cfg)
}

fn read_config_value(path: &Path) -> anyhow::Result<Option<Value>> {
    if !path.exists() {
        return Ok(None);
    }

    let raw = fs::read_to_string(path)?;
    let parsed = raw
        .parse::<Value>()
        .with_context(|| format!("invalid config file {}", path.display()))?;
    Ok(Some(parsed))
}

fn merge_toml(base: &mut Value, overlay: Value) {
    match (base, overlay) {
        (Value::Table(base_map), Value::Table(overlay_map)) => {
            for (key, value) in overlay_map {
                if let Some(base_value) = base_map.get_mut(&key) {
                    merge_toml(base_value, value);
                } else {
                    base_map.insert(key, value);
                }
            }
        }
        (base_value, overlay_value) => {
            *base_value = overlay_value;
        }
    }
}

fn apply_env_overrides<F>(cfg: &mut AppConfig, env_get: F)
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(v) = env_get("EJ_TRANSLATE_PROVIDER") {
        cfg.translate.provider = v;
    }
    if let Some(v) = env_get("EJ_TRANSLATE_ENDPOINT") {
        cfg.translate.endpoint = Some(v);
    }
    if let Some(v) = env_get("EJ_API_KEY_ENV_VAR") {
        cfg.translate.api_key_env_var = v;
    }

    if let Some(v) = env_get("EJ_DICTIONARY_PROVIDER") {
        cfg.dictionary.provider = v;
    }
    if let Some(v) = env_get("EJ_DICTIONARY_ENDPOINT") {
        cfg.dictionary.endpoint = Some(v);
    }
    if let Some(v) = env_get("EJ_DICTIONARY_ENABLED").and_then(|v| parse_bool(&v)) {
        cfg.dictionary.enabled = v;
    }

    if let Some(v) = env_get("EJ_CACHE_PATH") {
        cfg.cache.path = v;
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "y" | "on" => Some(true),
        "0" | "false" | "no" | "n" | "off" => Some(false),
        _ => None,
    }
}

fn render_engine_error(err: EngineError) -> anyhow::Error {
    match err {
        EngineError::MissingCredential(var) => {
            anyhow::anyhow!("need '{var}' env variable to translate uncached input")
        }
        other => anyhow::anyhow!(other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ej_core::types::Translation;
    use std::collections::HashMap;

    fn record() -> TranslateAndDicts {
        TranslateAndDicts {
            translate: Translation {
                input: "good morning".to_string(),
                input_lang: "en".to_string(),
                translated: "おはよう".to_string(),
                translated_lang: "ja".to_string(),
            },
            dicts: vec![Dict {
                word: "good".to_string(),
                definition: Definition {
                    word: "good".to_string(),
                    defs: vec!["adj\thaving desirable qualities".to_string()],
                },
                synonyms: vec![Definition {
                    word: "well".to_string(),
                    defs: vec![],
                }],
                antonyms: vec![Definition {
                    word: "bad".to_string(),
                    defs: vec![],
                }],
            }],
        }
    }

    #[test]
    fn config_precedence_env_local_home_defaults() {
        let home = Some(
            r#"
            [translate]
            provider = "home-provider"

            [cache]
            path = "/home/me/.ej/ej.db"
            "#
            .parse::<Value>()
            .expect("home parse"),
        );

        let local = Some(
            r#"
            [translate]
            provider = "local-provider"

            [dictionary]
            enabled = false
            "#
            .parse::<Value>()
            .expect("local parse"),
        );

        let env = HashMap::from([
            ("EJ_TRANSLATE_PROVIDER".to_string(), "mock".to_string()),
            ("EJ_API_KEY_ENV_VAR".to_string(), "OTHER_KEY".to_string()),
        ]);

        let cfg = resolve_config(home, local, |k| env.get(k).cloned()).expect("resolve config");

        assert_eq!(cfg.translate.provider, "mock");
        assert_eq!(cfg.translate.api_key_env_var, "OTHER_KEY");
        assert!(!cfg.dictionary.enabled);
        assert_eq!(cfg.dictionary.provider, "datamuse");
        assert_eq!(cfg.cache.path, "/home/me/.ej/ej.db");
    }

    #[test]
    fn defaults_point_at_home_cache() {
        let cfg = resolve_config(None, None, |_| None).expect("defaults");
        assert_eq!(cfg.cache.path, "$HOME/.ej/ej.db");
        assert_eq!(cfg.translate.api_key_env_var, "EJ_GOOGLE_TRANS_API_KEY");
        assert!(cfg.dictionary.enabled);
    }

    #[test]
    fn env_bool_override_ignores_garbage() {
        let mut cfg = AppConfig::default();
        apply_env_overrides(&mut cfg, |k| {
            (k == "EJ_DICTIONARY_ENABLED").then(|| "maybe".to_string())
        });
        assert!(cfg.dictionary.enabled);
        apply_env_overrides(&mut cfg, |k| (k == "EJ_DICTIONARY_ENABLED").then(|| "off".to_string()));
        assert!(!cfg.dictionary.enabled);
    }

    #[test]
    fn single_dash_json_is_accepted() {
        let args = normalize_args(["ej", "-json", "-r", "こんにちは"].map(OsString::from));
        let cli = Cli::try_parse_from(args).expect("cli parse");
        assert!(cli.json);
        assert!(cli.reverse);
        assert_eq!(cli.text, vec!["こんにちは"]);
    }

    #[test]
    fn positional_words_are_collected() {
        let cli = Cli::try_parse_from(["ej", "-f", "good", "morning"]).expect("cli parse");
        assert!(cli.force);
        assert!(!cli.list);
        assert_eq!(cli.text.join(" "), "good morning");
    }

    #[test]
    fn list_needs_no_text() {
        let cli = Cli::try_parse_from(["ej", "-l", "--cache", "/tmp/x.db"]).expect("cli parse");
        assert!(cli.list);
        assert!(cli.text.is_empty());
        assert_eq!(cli.cache, Some(PathBuf::from("/tmp/x.db")));
    }

    #[test]
    fn plain_output_is_input_translated_blank() {
        assert_eq!(render_plain(&record(), false), "good morning\nおはよう\n\n");
    }

    #[test]
    fn plain_output_with_dicts() {
        assert_eq!(
            render_plain(&record(), true),
            "good morning\nおはよう\n  good: (adj) having desirable qualities; syn: well; ant: bad\n\n"
        );
    }

    #[test]
    fn json_output_shape() {
        let value = serde_json::to_value(record()).expect("json");
        assert_eq!(value["translate"]["translated"], "おはよう");
        assert_eq!(value["dicts"][0]["definition"]["word"], "good");
    }

    #[cfg(feature = "provider-google")]
    #[test]
    fn google_needs_a_non_blank_key() {
        let cfg = AppConfig::default();
        assert!(build_translator(&cfg, |_| None).expect("google").is_none());
        assert!(build_translator(&cfg, |_| Some("  ".to_string()))
            .expect("google")
            .is_none());
        assert!(build_translator(&cfg, |_| Some("secret".to_string()))
            .expect("google")
            .is_some());
    }

    #[cfg(not(feature = "provider-google"))]
    #[test]
    fn google_without_feature_has_no_translator_even_with_key() {
        let cfg = AppConfig::default();
        assert!(build_translator(&cfg, |_| Some("secret".to_string()))
            .expect("google")
            .is_none());
    }

    #[cfg(not(feature = "provider-google"))]
    #[tokio::test]
    async fn google_without_feature_miss_is_missing_credential() {
        let mut cfg = AppConfig::default();
        cfg.dictionary.provider = "mock".to_string();
        let store = CacheStore::in_memory().expect("store");
        let engine = build_engine(&cfg, |_| Some("secret".to_string())).expect("engine");

        let err = engine
            .resolve(&store, "hello", ResolveOptions::default())
            .await
            .expect_err("no translator");
        assert!(matches!(err, EngineError::MissingCredential(_)));
        assert_eq!(
            store
                .get(ej_core::store::Table::Translations, "hello")
                .expect("get"),
            None
        );
    }

    #[test]
    fn mock_translator_needs_no_key() {
        let mut cfg = AppConfig::default();
        cfg.translate.provider = "Mock".to_string();
        assert!(build_translator(&cfg, |_| None).expect("mock").is_some());
    }

    #[test]
    fn unknown_translation_provider_is_rejected() {
        let mut cfg = AppConfig::default();
        cfg.translate.provider = "deepl".to_string();
        let err = build_translator(&cfg, |_| Some("secret".to_string()))
            .err()
            .expect("unknown provider");
        assert!(err.to_string().contains("'deepl'"));
        assert!(build_engine(&cfg, |_| Some("secret".to_string())).is_err());
    }

    #[test]
    fn unknown_dictionary_provider_is_rejected() {
        let mut cfg = AppConfig::default();
        cfg.dictionary.provider = "wordnik".to_string();
        let err = build_dictionary(&cfg).err().expect("unknown provider");
        assert!(err.to_string().contains("'wordnik'"));
    }

    #[test]
    fn reverse_help_mentions_english_input_failure() {
        use clap::CommandFactory;
        let cmd = Cli::command();
        let reverse = cmd
            .get_arguments()
            .find(|arg| arg.get_short() == Some('r'))
            .expect("-r flag");
        let help = reverse.get_help().expect("help text").to_string();
        assert!(help.contains("already English"));
    }

    #[test]
    fn missing_credential_message_names_variable() {
        let err = render_engine_error(EngineError::MissingCredential("EJ_KEY".to_string()));
        assert!(err.to_string().contains("'EJ_KEY'"));
    }

    #[test]
    fn cache_path_expansion() {
        assert_eq!(
            expand_cache_path(" /var/cache/ej.db ").expect("plain path"),
            PathBuf::from("/var/cache/ej.db")
        );
        assert!(expand_cache_path("$EJ_SURELY_UNSET_VARIABLE_FOR_TEST/ej.db").is_err());
    }

    #[tokio::test]
    async fn list_on_fresh_cache_file_is_empty() {
        let dir = std::env::temp_dir().join(format!("ej-cli-test-{}", std::process::id()));
        let mut cfg = AppConfig::default();
        cfg.cache.path = dir.join("ej.db").to_string_lossy().to_string();
        cfg.translate.provider = "mock".to_string();
        cfg.dictionary.provider = "mock".to_string();

        let store = open_store(&cfg).expect("open store");
        let engine = build_engine(&cfg, |_| None).expect("engine");
        let records = engine.list(&store).await.expect("list");
        assert!(records.is_empty());
        assert_eq!(serde_json::to_string(&records).expect("json"), "[]");

        drop(store);
        fs::remove_dir_all(&dir).expect("cleanup temp dir");
    }
}
