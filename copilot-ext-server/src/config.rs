// Copyright 2025 Sushanth (https://github.com/sushanthpy)
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use anyhow::{Context, Result};
use copilot_ext_client::COMPLETIONS_URL;
use copilot_ext_core::verify::PUBLIC_KEYS_URL;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

pub const ENV_ENVIRONMENT: &str = "ENVIRONMENT";
pub const ENV_HTTP_ADDR: &str = "COPILOT_EXT_HTTP_ADDR";
pub const ENV_PORT: &str = "PORT";
pub const ENV_PUBLIC_KEY: &str = "COPILOT_EXT_PUBLIC_KEY";
pub const ENV_PUBLIC_KEYS_URL: &str = "COPILOT_EXT_PUBLIC_KEYS_URL";
pub const ENV_CHAT_MODEL: &str = "OPENAI_CHAT_MODEL";
pub const ENV_COMPLETIONS_URL: &str = "COPILOT_EXT_COMPLETIONS_URL";

/// Agent server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    /// `development`, `staging`, `production`, ...
    #[serde(default = "default_environment")]
    pub environment: String,
    #[serde(default)]
    pub server: HttpServerConfig,
    #[serde(default)]
    pub verifier: VerifierConfig,
    #[serde(default)]
    pub chat: ChatConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct HttpServerConfig {
    /// HTTP listen address (e.g., "127.0.0.1:3000")
    #[serde(default = "default_http_addr")]
    pub listen_addr: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct VerifierConfig {
    /// PEM public key used instead of fetching one at startup.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub public_key: Option<String>,

    /// Public key metadata endpoint
    #[serde(default = "default_public_keys_url")]
    pub public_keys_url: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ChatConfig {
    /// Model requested by the built-in completions agent
    #[serde(default = "default_chat_model")]
    pub model: String,

    #[serde(default = "default_completions_url")]
    pub completions_url: String,
}

// Default values
fn default_environment() -> String {
    "development".to_string()
}

fn default_http_addr() -> String {
    "127.0.0.1:3000".to_string()
}

fn default_public_keys_url() -> String {
    PUBLIC_KEYS_URL.to_string()
}

fn default_chat_model() -> String {
    copilot_ext_client::DEFAULT_MODEL.to_string()
}

fn default_completions_url() -> String {
    COMPLETIONS_URL.to_string()
}

impl Default for HttpServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: default_http_addr(),
        }
    }
}

impl Default for VerifierConfig {
    fn default() -> Self {
        Self {
            public_key: None,
            public_keys_url: default_public_keys_url(),
        }
    }
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            model: default_chat_model(),
            completions_url: default_completions_url(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            environment: default_environment(),
            server: HttpServerConfig::default(),
            verifier: VerifierConfig::default(),
            chat: ChatConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Load configuration from TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        let config: Self = toml::from_str(&content)
            .with_context(|| format!("failed to parse config file {}", path.display()))?;
        Ok(config)
    }

    /// Load configuration from environment variables
    ///
    /// Supported environment variables:
    /// - ENVIRONMENT: deployment environment (default: development)
    /// - COPILOT_EXT_HTTP_ADDR: HTTP listen address (default: 127.0.0.1:3000)
    /// - PORT: listen on 0.0.0.0:{PORT}; ignored when COPILOT_EXT_HTTP_ADDR is set
    /// - COPILOT_EXT_PUBLIC_KEY: literal PEM public key (skips the key fetch)
    /// - COPILOT_EXT_PUBLIC_KEYS_URL: public key metadata endpoint
    /// - OPENAI_CHAT_MODEL: chat model (default: gpt-4o)
    /// - COPILOT_EXT_COMPLETIONS_URL: chat-completions endpoint
    pub fn from_env() -> Self {
        Self::merge_with(Self::default(), |key| std::env::var(key).ok())
    }

    /// Load configuration with priority: file > env > defaults
    ///
    /// Keys present in the file win over the environment; anything the file
    /// leaves out falls back to the environment, then to the defaults.
    pub fn load(config_file: Option<PathBuf>) -> Result<Self> {
        Self::load_with(config_file, |key| std::env::var(key).ok())
    }

    fn load_with(config_file: Option<PathBuf>, lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let config = Self::merge_with(Self::default(), lookup);

        match config_file {
            Some(path) if path.exists() => {
                tracing::info!("Loading configuration from file: {:?}", path);
                config.overlay_file(&path)
            }
            Some(path) => {
                tracing::warn!("Config file not found: {:?}, using defaults", path);
                Ok(config)
            }
            None => Ok(config),
        }
    }

    /// Replace every key the TOML file at `path` sets, leaving the rest.
    fn overlay_file(self, path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        let file: toml::Table = toml::from_str(&content)
            .with_context(|| format!("failed to parse config file {}", path.display()))?;

        let encoded = toml::Value::try_from(&self).context("failed to encode configuration")?;
        let toml::Value::Table(mut merged) = encoded else {
            anyhow::bail!("configuration did not encode as a table");
        };
        merge_tables(&mut merged, file);

        toml::Value::Table(merged)
            .try_into()
            .with_context(|| format!("failed to parse config file {}", path.display()))
    }

    /// Override fields whose variable `lookup` returns a value for.
    fn merge_with(mut config: Self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(environment) = lookup(ENV_ENVIRONMENT) {
            config.environment = environment;
        }

        if let Some(addr) = lookup(ENV_HTTP_ADDR) {
            config.server.listen_addr = addr;
        } else if let Some(port) = lookup(ENV_PORT) {
            config.server.listen_addr = format!("0.0.0.0:{}", port);
        }

        if let Some(key) = lookup(ENV_PUBLIC_KEY) {
            config.verifier.public_key = Some(key);
        }
        if let Some(url) = lookup(ENV_PUBLIC_KEYS_URL) {
            config.verifier.public_keys_url = url;
        }

        if let Some(model) = lookup(ENV_CHAT_MODEL) {
            config.chat.model = model;
        }
        if let Some(url) = lookup(ENV_COMPLETIONS_URL) {
            config.chat.completions_url = url;
        }

        config
    }

    /// Parse listen address as SocketAddr
    pub fn socket_addr(&self) -> Result<SocketAddr> {
        self.server
            .listen_addr
            .parse()
            .with_context(|| format!("invalid listen address {:?}", self.server.listen_addr))
    }

    pub fn is_development(&self) -> bool {
        self.environment == "development"
    }

    /// Anything that is not development (staging included).
    pub fn is_production(&self) -> bool {
        !self.is_development()
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        self.socket_addr()?;

        for (name, url) in [
            ("verifier.public_keys_url", &self.verifier.public_keys_url),
            ("chat.completions_url", &self.chat.completions_url),
        ] {
            let parsed = reqwest::Url::parse(url).with_context(|| format!("{} is not a valid URL", name))?;
            if !matches!(parsed.scheme(), "http" | "https") {
                anyhow::bail!("{} must be an http(s) URL, got {}", name, url);
            }
        }

        if self.chat.model.trim().is_empty() {
            anyhow::bail!("chat.model must not be empty");
        }

        if self.is_production() && self.verifier.public_key.is_some() {
            tracing::warn!("Using a pinned public key outside development; key rotation will not be picked up");
        }

        Ok(())
    }
}

fn merge_tables(base: &mut toml::Table, overlay: toml::Table) {
    for (key, value) in overlay {
        if let (Some(toml::Value::Table(existing)), toml::Value::Table(incoming)) = (base.get_mut(&key), &value) {
            merge_tables(existing, incoming.clone());
            continue;
        }
        base.insert(key, value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_default_config() {
        let config = ServerConfig::default();
        assert_eq!(config.server.listen_addr, "127.0.0.1:3000");
        assert_eq!(config.verifier.public_keys_url, PUBLIC_KEYS_URL);
        assert_eq!(config.chat.model, "gpt-4o");
        assert!(config.is_development());
        config.validate().unwrap();
    }

    #[test]
    fn test_env_overrides() {
        let config = ServerConfig::merge_with(
            ServerConfig::default(),
            lookup(&[
                ("ENVIRONMENT", "production"),
                ("PORT", "8080"),
                ("OPENAI_CHAT_MODEL", "gpt-4"),
                ("COPILOT_EXT_PUBLIC_KEY", "pem"),
            ]),
        );
        assert_eq!(config.server.listen_addr, "0.0.0.0:8080");
        assert_eq!(config.chat.model, "gpt-4");
        assert_eq!(config.verifier.public_key.as_deref(), Some("pem"));
        assert!(config.is_production());
    }

    #[test]
    fn test_http_addr_beats_port() {
        let config = ServerConfig::merge_with(
            ServerConfig::default(),
            lookup(&[("PORT", "8080"), ("COPILOT_EXT_HTTP_ADDR", "127.0.0.1:9000")]),
        );
        assert_eq!(config.server.listen_addr, "127.0.0.1:9000");
    }

    #[test]
    fn test_from_file_with_partial_sections() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
environment = "staging"

[server]
listen_addr = "0.0.0.0:4000"

[chat]
model = "gpt-3.5-turbo"
"#
        )
        .unwrap();

        let config = ServerConfig::from_file(file.path()).unwrap();
        assert_eq!(config.environment, "staging");
        assert_eq!(config.server.listen_addr, "0.0.0.0:4000");
        assert_eq!(config.chat.model, "gpt-3.5-turbo");
        assert_eq!(config.chat.completions_url, COMPLETIONS_URL);
        assert!(config.verifier.public_key.is_none());
        assert!(config.is_production());
    }

    #[test]
    fn test_load_missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = ServerConfig::load_with(Some(dir.path().join("absent.toml")), lookup(&[])).unwrap();
        assert_eq!(config.chat.completions_url, COMPLETIONS_URL);
    }

    #[test]
    fn test_load_file_beats_env() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
[chat]
model = "from-file"
"#
        )
        .unwrap();

        let config = ServerConfig::load_with(
            Some(file.path().to_path_buf()),
            lookup(&[
                ("OPENAI_CHAT_MODEL", "from-env"),
                ("COPILOT_EXT_COMPLETIONS_URL", "http://localhost:9000/chat"),
                ("COPILOT_EXT_PUBLIC_KEY", "pem"),
            ]),
        )
        .unwrap();

        assert_eq!(config.chat.model, "from-file");
        assert_eq!(config.chat.completions_url, "http://localhost:9000/chat");
        assert_eq!(config.verifier.public_key.as_deref(), Some("pem"));
        assert_eq!(config.server.listen_addr, "127.0.0.1:3000");
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = ServerConfig::default();
        config.server.listen_addr = "not an address".into();
        assert!(config.validate().is_err());

        let mut config = ServerConfig::default();
        config.verifier.public_keys_url = "ftp://example.com/keys".into();
        assert!(config.validate().is_err());

        let mut config = ServerConfig::default();
        config.chat.model = " ".into();
        assert!(config.validate().is_err());
    }
}
