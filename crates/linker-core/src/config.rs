//! Configuration loader and path helpers.
//!
//! Uses Figment to merge `config.toml` + `config.<env>.toml` + `APP_*` env vars
//! (nested keys separated by `__`, e.g. `APP_LINKER__PIPELINE__WORKERS`).
//! Pipeline options live under the `[linker]` table.
use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::Error;
use crate::types::Category;

pub struct Config {
    figment: Figment,
}

impl Config {
    pub fn load() -> anyhow::Result<Self> {
        let env_name = env::var("RUST_ENV").unwrap_or_else(|_| "dev".to_string());

        let mut figment = Figment::new().merge(Toml::file("config.toml"));
        match env_name.as_str() {
            "dev" | "development" => figment = figment.merge(Toml::file("config.dev.toml")),
            "prod" | "production" => figment = figment.merge(Toml::file("config.prod.toml")),
            "test" | "testing" => figment = figment.merge(Toml::file("config.test.toml")),
            _ => {}
        }
        figment = figment.merge(Env::prefixed("APP_").split("__"));

        let config = Self { figment };
        config.validate()?;
        Ok(config)
    }

    pub fn from_figment(figment: Figment) -> anyhow::Result<Self> {
        let config = Self { figment };
        config.validate()?;
        Ok(config)
    }

    pub fn get<T>(&self, key: &str) -> anyhow::Result<T>
    where
        T: serde::de::DeserializeOwned,
    {
        self.figment
            .extract_inner(key)
            .map_err(|e| anyhow::anyhow!("Failed to get '{}': {}", key, e))
    }

    /// Typed `[linker]` table; every missing key falls back to its default.
    pub fn settings(&self) -> anyhow::Result<Settings> {
        if !self.figment.contains("linker") {
            return Ok(Settings::default());
        }
        self.get("linker")
    }

    fn validate(&self) -> anyhow::Result<()> {
        let settings = self.settings()?;
        let p = &settings.pipeline;
        let positive = [
            ("pipeline.workers", p.workers as u64),
            ("pipeline.mention_workers", p.mention_workers as u64),
            ("pipeline.job_table_shards", p.job_table_shards as u64),
            ("pipeline.record_timeout_secs", p.record_timeout_secs),
            ("pipeline.flush_interval_secs", p.flush_interval_secs),
            ("pipeline.drain_poll_millis", p.drain_poll_millis),
            ("pipeline.sink_retries", u64::from(p.sink_retries)),
            ("search.candidate_limit", settings.search.candidate_limit as u64),
        ];
        if let Some((key, _)) = positive.iter().find(|(_, v)| *v == 0) {
            return Err(Error::InvalidConfig(format!("{key} must be positive")).into());
        }
        for g in &settings.ner.gazetteers {
            if Category::parse(&g.category).is_none() {
                let msg = format!("unknown gazetteer category '{}'", g.category);
                return Err(Error::InvalidConfig(msg).into());
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub pipeline: PipelineSettings,
    pub search: SearchSettings,
    pub kb: KbSettings,
    pub ner: NerSettings,
    pub output: OutputSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineSettings {
    /// Records processed concurrently.
    pub workers: usize,
    /// Mentions resolved concurrently inside one record.
    pub mention_workers: usize,
    pub record_timeout_secs: u64,
    pub flush_interval_secs: u64,
    pub drain_poll_millis: u64,
    pub job_table_shards: usize,
    /// Failed sink writes tolerated per record before it is dropped.
    pub sink_retries: u32,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        let workers = std::thread::available_parallelism().map(|n| n.get()).unwrap_or(4);
        Self {
            workers,
            mention_workers: 4,
            record_timeout_secs: 120,
            flush_interval_secs: 5,
            drain_poll_millis: 500,
            job_table_shards: 16,
            sink_retries: 3,
        }
    }
}

impl PipelineSettings {
    pub fn record_timeout(&self) -> Duration {
        Duration::from_secs(self.record_timeout_secs)
    }

    pub fn flush_interval(&self) -> Duration {
        Duration::from_secs(self.flush_interval_secs)
    }

    pub fn drain_poll(&self) -> Duration {
        Duration::from_millis(self.drain_poll_millis)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchSettings {
    pub index_dir: String,
    pub candidate_limit: usize,
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self { index_dir: "indexes/labels".to_string(), candidate_limit: 15 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct KbSettings {
    /// N-Triples dump (`.nt` or `.nt.gz`).
    pub path: String,
    pub entity_prefix: String,
    pub predicate_prefix: String,
}

impl Default for KbSettings {
    fn default() -> Self {
        Self {
            path: "assets/wikidata-truthy.nt.gz".to_string(),
            entity_prefix: "http://www.wikidata.org/entity/".to_string(),
            predicate_prefix: "http://www.wikidata.org/prop/direct/".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct NerSettings {
    pub gazetteers: Vec<GazetteerSettings>,
}

/// One popularity dump (`<kb id>\t<label>\t<uri>` per line) and the category
/// its labels are recognised as.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GazetteerSettings {
    pub path: String,
    pub category: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputSettings {
    /// Output file; stdout when unset.
    pub path: Option<String>,
}

/// Expand a user-provided path string:
/// - Expands leading '~' to the user's home directory
/// - Expands ${VAR} and $VAR environment variables
/// - Returns a PathBuf without attempting to canonicalize
pub fn expand_path<S: AsRef<str>>(input: S) -> PathBuf {
    let s = input.as_ref();
    // Expand env vars first
    let expanded_env = shellexpand::env(s).unwrap_or(std::borrow::Cow::Borrowed(s));
    // Expand ~ at start
    let expanded = shellexpand::tilde(&expanded_env);
    PathBuf::from(expanded.as_ref())
}

/// Resolve a possibly relative path against a given base directory after expansion.
/// If `p` is absolute, it's returned as-is; otherwise `base.join(p)` is returned.
pub fn resolve_with_base<S: AsRef<str>>(base: &Path, p: S) -> PathBuf {
    let p = expand_path(p);
    if p.is_absolute() {
        p
    } else {
        base.join(p)
    }
}
