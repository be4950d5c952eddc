use std::{collections::HashMap, fs, time::Duration};

use anyhow::{bail, Context};
use client_core::{http::DEFAULT_REQUEST_TIMEOUT, ApiConfig};
use serde::Deserialize;
use url::Url;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Settings {
    pub api_base_url: String,
    pub api_token: Option<String>,
    pub request_timeout_secs: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api_base_url: "http://127.0.0.1:8000/api".into(),
            api_token: None,
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT.as_secs(),
        }
    }
}

pub fn load_settings() -> Settings {
    let raw = fs::read_to_string("reader.toml").ok();
    settings_from(raw.as_deref(), |key| std::env::var(key).ok())
}

/// Defaults, then the `reader.toml` contents, then the environment. An unparseable file is
/// ignored as a whole, and values of the wrong type are ignored one by one.
fn settings_from(raw_toml: Option<&str>, env: impl Fn(&str) -> Option<String>) -> Settings {
    let mut settings = Settings::default();

    if let Some(raw) = raw_toml {
        if let Ok(file_cfg) = toml::from_str::<HashMap<String, toml::Value>>(raw) {
            apply_file_overrides(&mut settings, &file_cfg);
        }
    }

    if let Some(v) = env("NEWS_API_URL") {
        settings.api_base_url = v;
    }
    if let Some(v) = env("APP__API_BASE_URL") {
        settings.api_base_url = v;
    }

    if let Some(v) = env("NEWS_API_TOKEN") {
        settings.api_token = Some(v);
    }
    if let Some(v) = env("APP__API_TOKEN") {
        settings.api_token = Some(v);
    }

    if let Some(v) = env("APP__REQUEST_TIMEOUT_SECS") {
        if let Ok(parsed) = v.trim().parse::<u64>() {
            settings.request_timeout_secs = parsed;
        }
    }

    settings
}

fn apply_file_overrides(settings: &mut Settings, file_cfg: &HashMap<String, toml::Value>) {
    if let Some(v) = file_cfg.get("api_base_url").and_then(toml::Value::as_str) {
        settings.api_base_url = v.to_owned();
    }
    if let Some(v) = file_cfg.get("api_token").and_then(toml::Value::as_str) {
        settings.api_token = Some(v.to_owned()).filter(|t| !t.trim().is_empty());
    }
    let timeout = match file_cfg.get("request_timeout_secs") {
        Some(toml::Value::Integer(secs)) => u64::try_from(*secs).ok(),
        Some(toml::Value::String(secs)) => secs.trim().parse::<u64>().ok(),
        _ => None,
    };
    if let Some(secs) = timeout {
        settings.request_timeout_secs = secs;
    }
}

pub fn prepare_api_config(settings: &Settings) -> anyhow::Result<ApiConfig> {
    let base_url = normalize_base_url(&settings.api_base_url)?;
    let request_timeout = if settings.request_timeout_secs == 0 {
        DEFAULT_REQUEST_TIMEOUT
    } else {
        Duration::from_secs(settings.request_timeout_secs)
    };
    Ok(ApiConfig {
        base_url,
        request_timeout,
    })
}

fn normalize_base_url(raw: &str) -> anyhow::Result<String> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(Settings::default().api_base_url);
    }
    let parsed = Url::parse(raw).with_context(|| format!("invalid api base url: {raw}"))?;
    if !matches!(parsed.scheme(), "http" | "https") {
        bail!("api base url must use http or https: {raw}");
    }
    Ok(raw.trim_end_matches('/').to_string())
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
