//! Run configuration: target instance, credentials, content pool locations.
//!
//! Loaded from `populator.toml` (or the path in `POPULATOR_CONFIG`), falling
//! back to defaults plus environment overrides when no file is present.

use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PopulatorConfig {
    /// Base REST API URL of the target instance, e.g.
    /// `https://elias.dev.sitevision.net/rest-api`.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    #[serde(default = "default_system_username")]
    pub system_username: String,
    #[serde(default = "default_system_password")]
    pub system_password: String,

    /// Shared password of the generated test accounts.
    #[serde(default = "default_actor_password")]
    pub actor_password: String,

    /// Default run mode when none is given on the command line:
    /// `groups`, `channels` or `create-actors`.
    #[serde(default = "default_run_mode")]
    pub run_mode: String,

    #[serde(default = "default_messages_file")]
    pub messages_file: PathBuf,
    #[serde(default = "default_chat_messages_file")]
    pub chat_messages_file: PathBuf,
    #[serde(default = "default_chat_replies_file")]
    pub chat_replies_file: PathBuf,
    #[serde(default = "default_colleagues_file")]
    pub colleagues_file: PathBuf,

    /// Lowercased display name -> fixed handle, for accounts that do not
    /// follow the derivation convention.
    #[serde(default = "default_handle_aliases")]
    pub handle_aliases: HashMap<String, String>,

    /// Cap on how many listed actors take part in a channel run.
    #[serde(default)]
    pub actor_limit: Option<usize>,

    /// Seed for reproducible runs; entropy-seeded when unset.
    #[serde(default)]
    pub seed: Option<u64>,
}

impl Default for PopulatorConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            system_username: default_system_username(),
            system_password: default_system_password(),
            actor_password: default_actor_password(),
            run_mode: default_run_mode(),
            messages_file: default_messages_file(),
            chat_messages_file: default_chat_messages_file(),
            chat_replies_file: default_chat_replies_file(),
            colleagues_file: default_colleagues_file(),
            handle_aliases: default_handle_aliases(),
            actor_limit: None,
            seed: None,
        }
    }
}

fn default_base_url() -> String {
    "https://elias.dev.sitevision.net/rest-api".to_string()
}

fn default_system_username() -> String {
    "system".to_string()
}

fn default_system_password() -> String {
    "system".to_string()
}

fn default_actor_password() -> String {
    "123".to_string()
}

fn default_run_mode() -> String {
    "groups".to_string()
}

fn default_messages_file() -> PathBuf {
    PathBuf::from("data/messages.json")
}

fn default_chat_messages_file() -> PathBuf {
    PathBuf::from("data/chat-messages.json")
}

fn default_chat_replies_file() -> PathBuf {
    PathBuf::from("data/chat-replies.json")
}

fn default_colleagues_file() -> PathBuf {
    PathBuf::from("data/colleagues.json")
}

fn default_handle_aliases() -> HashMap<String, String> {
    // One well-known account on the dev instance predates the naming scheme.
    let mut aliases = HashMap::new();
    aliases.insert("elias abrache".to_string(), "elias".to_string());
    aliases
}

impl PopulatorConfig {
    fn config_path() -> PathBuf {
        env::var("POPULATOR_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("populator.toml"))
    }

    pub fn load() -> Self {
        let path = Self::config_path();

        if let Ok(contents) = fs::read_to_string(&path) {
            match toml::from_str::<PopulatorConfig>(&contents) {
                Ok(config) => {
                    tracing::info!("Loaded config from {:?}", path);
                    return config;
                }
                Err(e) => {
                    tracing::error!("Failed to parse {:?}: {}", path, e);
                }
            }
        }

        tracing::warn!("No config file found, using defaults + env vars");
        Self::from_env()
    }

    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(url) = env::var("POPULATOR_BASE_URL") {
            config.base_url = url;
        }
        if let Ok(user) = env::var("POPULATOR_SYSTEM_USERNAME") {
            config.system_username = user;
        }
        if let Ok(password) = env::var("POPULATOR_SYSTEM_PASSWORD") {
            config.system_password = password;
        }
        if let Ok(password) = env::var("POPULATOR_ACTOR_PASSWORD") {
            config.actor_password = password;
        }
        if let Ok(seed) = env::var("POPULATOR_SEED") {
            match seed.parse() {
                Ok(seed) => config.seed = Some(seed),
                Err(_) => tracing::warn!("Ignoring unparseable POPULATOR_SEED {:?}", seed),
            }
        }
        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_point_at_bundled_pools() {
        let config = PopulatorConfig::default();
        assert_eq!(config.messages_file, PathBuf::from("data/messages.json"));
        assert_eq!(config.run_mode, "groups");
        assert!(config.seed.is_none());
    }

    #[test]
    fn toml_overrides_merge_with_defaults() {
        let config: PopulatorConfig =
            toml::from_str("base_url = \"https://staging.example.test/rest-api\"\nseed = 7\n")
                .unwrap();
        assert_eq!(config.base_url, "https://staging.example.test/rest-api");
        assert_eq!(config.seed, Some(7));
        assert_eq!(config.system_username, "system");
        assert_eq!(
            config.handle_aliases.get("elias abrache").map(String::as_str),
            Some("elias")
        );
    }
}
