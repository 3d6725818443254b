use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::models::{FeedMode, UserId};
use crate::session::Credentials;

const DEFAULT_ENV_PREFIX: &str = "POSTLINE";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct Config {
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub feed: FeedConfig,
    #[serde(default)]
    pub media: MediaConfig,
    #[serde(default)]
    pub session: SessionConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ApiConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    /// Unset means requests are never cut short client-side.
    #[serde(default, with = "humantime_serde")]
    pub timeout: Option<Duration>,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            user_agent: default_user_agent(),
            timeout: None,
        }
    }
}

fn default_base_url() -> String {
    "http://localhost:5000/api/".into()
}

fn default_user_agent() -> String {
    format!("postline/{}", crate::VERSION)
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FeedConfig {
    #[serde(default)]
    pub mode: FeedMode,
    #[serde(default = "default_page_size")]
    pub page_size: usize,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            mode: FeedMode::default(),
            page_size: default_page_size(),
        }
    }
}

fn default_page_size() -> usize {
    10
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MediaConfig {
    #[serde(default = "default_workers")]
    pub workers: usize,
    #[serde(default = "default_max_queue_depth")]
    pub max_queue_depth: usize,
}

impl Default for MediaConfig {
    fn default() -> Self {
        Self {
            workers: default_workers(),
            max_queue_depth: default_max_queue_depth(),
        }
    }
}

fn default_workers() -> usize {
    4
}

fn default_max_queue_depth() -> usize {
    64
}

impl From<&MediaConfig> for crate::media::Config {
    fn from(cfg: &MediaConfig) -> Self {
        Self {
            workers: cfg.workers,
            max_queue_depth: cfg.max_queue_depth,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct SessionConfig {
    #[serde(default)]
    pub user_id: Option<i64>,
    #[serde(default)]
    pub token: String,
}

impl SessionConfig {
    /// Credentials when both halves are configured.
    pub fn credentials(&self) -> Option<Credentials> {
        let user_id = self.user_id?;
        let token = self.token.trim();
        if token.is_empty() {
            return None;
        }
        Some(Credentials {
            user_id: UserId(user_id),
            token: token.to_string(),
        })
    }
}

#[derive(Debug, Clone, Default)]
pub struct LoadOptions {
    pub config_file: Option<PathBuf>,
    pub env_prefix: Option<String>,
}

pub fn load(options: LoadOptions) -> Result<Config> {
    let mut cfg = Config::default();

    if let Some(path) = options.config_file.as_ref() {
        if path.exists() {
            let from_file = read_config_file(path)?;
            cfg = merge_config(cfg, from_file);
        }
    } else if let Some(default_path) = default_path() {
        if default_path.exists() {
            let from_file = read_config_file(&default_path)?;
            cfg = merge_config(cfg, from_file);
        }
    }

    let prefix = options.env_prefix.as_deref().unwrap_or(DEFAULT_ENV_PREFIX);
    cfg = merge_config(cfg, load_env(prefix));

    Ok(cfg)
}

fn read_config_file(path: &Path) -> Result<Config> {
    let data = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file at {}", path.display()))?;
    let config: Config = serde_yaml::from_str(&data)
        .with_context(|| format!("Failed to parse config file at {}", path.display()))?;
    Ok(config)
}

// Values equal to the defaults count as unset so a later layer only wins
// where it actually says something.
fn merge_config(mut base: Config, other: Config) -> Config {
    let defaults = Config::default();

    if !other.api.base_url.is_empty() && other.api.base_url != defaults.api.base_url {
        base.api.base_url = other.api.base_url;
    }
    if !other.api.user_agent.is_empty() && other.api.user_agent != defaults.api.user_agent {
        base.api.user_agent = other.api.user_agent;
    }
    if other.api.timeout.is_some() {
        base.api.timeout = other.api.timeout;
    }

    if other.feed.mode != defaults.feed.mode {
        base.feed.mode = other.feed.mode;
    }
    if other.feed.page_size != 0 && other.feed.page_size != defaults.feed.page_size {
        base.feed.page_size = other.feed.page_size;
    }

    if other.media.workers != 0 && other.media.workers != defaults.media.workers {
        base.media.workers = other.media.workers;
    }
    if other.media.max_queue_depth != defaults.media.max_queue_depth {
        base.media.max_queue_depth = other.media.max_queue_depth;
    }

    if other.session.user_id.is_some() {
        base.session.user_id = other.session.user_id;
    }
    if !other.session.token.is_empty() {
        base.session.token = other.session.token;
    }

    base
}

fn load_env(prefix: &str) -> Config {
    let mut map: HashMap<String, String> = HashMap::new();
    let upper_prefix = format!("{}_", prefix.to_uppercase());

    for (key, value) in env::vars() {
        if let Some(stripped) = key.strip_prefix(&upper_prefix) {
            let normalized = stripped.to_ascii_lowercase().replace("__", ".");
            map.insert(normalized, value);
        }
    }

    let mut cfg = Config::default();
    for (key, value) in map {
        apply_env_value(&mut cfg, &key, value);
    }
    cfg
}

fn apply_env_value(cfg: &mut Config, key: &str, value: String) {
    match key {
        "api.base_url" => cfg.api.base_url = value,
        "api.user_agent" => cfg.api.user_agent = value,
        "api.timeout" => {
            if let Ok(duration) = humantime::parse_duration(&value) {
                cfg.api.timeout = Some(duration);
            }
        }
        "feed.mode" => {
            if let Some(mode) = FeedMode::from_key(&value) {
                cfg.feed.mode = mode;
            }
        }
        "feed.page_size" => {
            if let Ok(parsed) = value.parse::<usize>() {
                cfg.feed.page_size = parsed;
            }
        }
        "media.workers" => {
            if let Ok(parsed) = value.parse::<usize>() {
                cfg.media.workers = parsed;
            }
        }
        "media.max_queue_depth" => {
            if let Ok(parsed) = value.parse::<usize>() {
                cfg.media.max_queue_depth = parsed;
            }
        }
        "session.user_id" => {
            if let Ok(parsed) = value.trim().parse::<i64>() {
                cfg.session.user_id = Some(parsed);
            }
        }
        "session.token" => cfg.session.token = value,
        _ => {}
    }
}

pub fn default_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("postline").join("config.yaml"))
}
