//! Relay configuration, read from `config/quill.json5`.

use std::fs;
use std::path::Path;

use anyhow::Context;
use quill_chat::ChatConfig;
use serde::{Deserialize, Serialize};

/// Written to disk when no config file exists yet.
const DEFAULT_CONFIG: &str = r#"{
  // Log filter in `tracing_subscriber::EnvFilter` syntax. RUST_LOG takes precedence.
  log_filter: "info",

  chat: {
    // Refuse chat from players without a chat session.
    enforce_secure_chat: false,
    // Hours a sender's expired key is still trusted by receiving clients.
    key_expiry_grace_period_hours: 8,
    // Slots in the signature cache. Clients and server must agree.
    signature_cache_size: 128,
    // Clients acknowledge once more than this many messages are unacknowledged.
    ack_threshold: 64,
    // Disconnect clients that leave more messages than this unacknowledged.
    max_unacknowledged: 4096,
  },

  // Milliseconds between two messages of the same player.
  message_interval_ms: 200,

  players: [
    { name: "Alice", signed: true, messages: ["Hi all!", "Anyone up for a build?"] },
    { name: "Bob", signed: true, messages: ["Hey Alice", "Sure, where?"] },
    { name: "Carol", signed: false, messages: ["I have no key, can you read me?"] },
    // Flips a bit in every signature it sends and gets disconnected.
    { name: "Mallory", signed: true, tamper: true, messages: ["Totally legit message"] },
  ],
}
"#;

/// The whole configuration file.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct QuillConfig {
    /// Default log filter.
    pub log_filter: String,
    /// Secure chat settings shared by server and clients.
    pub chat: ChatConfig,
    /// Delay between two messages of one player.
    pub message_interval_ms: u64,
    /// The simulated players.
    pub players: Vec<PlayerConfig>,
}

/// One simulated player.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerConfig {
    /// Display name. The player gets a random id.
    pub name: String,
    /// Whether the player opens a chat session and signs messages.
    #[serde(default)]
    pub signed: bool,
    /// Corrupt outgoing signatures.
    #[serde(default)]
    pub tamper: bool,
    /// What the player says, in order.
    #[serde(default)]
    pub messages: Vec<String>,
}

impl Default for QuillConfig {
    fn default() -> Self {
        Self {
            log_filter: "info".to_string(),
            chat: ChatConfig::default(),
            message_interval_ms: 200,
            players: Vec::new(),
        }
    }
}

impl QuillConfig {
    /// Loads the config at `path`, writing the default one first if it does not exist.
    pub fn load_or_create(path: &Path) -> anyhow::Result<Self> {
        if !path.exists() {
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent)
                    .with_context(|| format!("creating {}", parent.display()))?;
            }
            fs::write(path, DEFAULT_CONFIG)
                .with_context(|| format!("writing default config to {}", path.display()))?;
        }
        let text =
            fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
        Self::parse(&text).with_context(|| format!("parsing {}", path.display()))
    }

    /// Parses json5 config text.
    pub fn parse(text: &str) -> anyhow::Result<Self> {
        Ok(serde_json5::from_str(text)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_parses() {
        let config = QuillConfig::parse(DEFAULT_CONFIG).expect("default config is valid");
        assert!(!config.chat.enforce_secure_chat);
        assert_eq!(config.chat.signature_cache_size, 128);
        assert_eq!(config.players.len(), 4);
        assert!(config.players[3].tamper);
        assert!(!config.players[2].signed);
    }

    #[test]
    fn test_missing_fields_use_defaults() {
        let config = QuillConfig::parse("{ players: [{ name: \"Solo\" }] }").expect("valid");
        assert_eq!(config.chat, ChatConfig::default());
        assert_eq!(config.message_interval_ms, 200);
        assert!(!config.players[0].signed);
        assert!(config.players[0].messages.is_empty());
    }
}
