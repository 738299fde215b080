use std::{collections::HashMap, fs, path::Path, time::Duration};

use client_core::LabelLocale;
use tracing::warn;

pub const CONFIG_FILE: &str = "client.toml";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub server_url: String,
    pub handshake_timeout_secs: u64,
    pub locale: LabelLocale,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            server_url: "http://localhost:5000".into(),
            handshake_timeout_secs: 10,
            locale: LabelLocale::English,
        }
    }
}

impl Settings {
    pub fn handshake_timeout(&self) -> Duration {
        Duration::from_secs(self.handshake_timeout_secs)
    }

    fn set_locale(&mut self, raw: &str) {
        match LabelLocale::parse(raw) {
            Some(locale) => self.locale = locale,
            None => warn!(locale = raw, "ignoring unsupported locale"),
        }
    }

    fn set_handshake_timeout(&mut self, raw: &str) {
        match raw.trim().parse::<u64>() {
            Ok(secs) if secs > 0 => self.handshake_timeout_secs = secs,
            _ => warn!(value = raw, "ignoring invalid handshake timeout"),
        }
    }
}

/// Defaults, then `path`, then environment. `env` looks up one variable.
pub fn load_settings_from(path: &Path, env: impl Fn(&str) -> Option<String>) -> Settings {
    let mut settings = Settings::default();

    if let Ok(raw) = fs::read_to_string(path) {
        match toml::from_str::<HashMap<String, toml::Value>>(&raw) {
            Ok(file_cfg) => apply_file(&mut settings, &file_cfg),
            Err(err) => warn!(path = %path.display(), error = %err, "ignoring malformed config"),
        }
    }

    if let Some(v) = env("SERVER_URL") {
        settings.server_url = v;
    }
    if let Some(v) = env("APP__SERVER_URL") {
        settings.server_url = v;
    }
    if let Some(v) = env("APP__HANDSHAKE_TIMEOUT_SECS") {
        settings.set_handshake_timeout(&v);
    }
    if let Some(v) = env("APP__LOCALE") {
        settings.set_locale(&v);
    }

    settings
}

fn apply_file(settings: &mut Settings, file_cfg: &HashMap<String, toml::Value>) {
    if let Some(v) = file_cfg.get("server_url").and_then(toml::Value::as_str) {
        settings.server_url = v.to_string();
    }
    match file_cfg.get("handshake_timeout_secs") {
        Some(toml::Value::Integer(secs)) => settings.set_handshake_timeout(&secs.to_string()),
        Some(toml::Value::String(raw)) => settings.set_handshake_timeout(raw),
        Some(other) => warn!(value = %other, "ignoring invalid handshake timeout"),
        None => {}
    }
    if let Some(v) = file_cfg.get("locale").and_then(toml::Value::as_str) {
        settings.set_locale(v);
    }
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
