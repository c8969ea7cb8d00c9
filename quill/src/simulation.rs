//! Runs a configured set of simulated players against one relay server.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use quill_chat::LocalChatSession;
use quill_crypto::KeyStore;
use quill_crypto::key_store::PROFILE_KEY_LIFETIME;
use tokio::task::spawn_blocking;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::client::{ClientReport, SimulatedClient};
use crate::config::QuillConfig;
use crate::server::Server;

/// Connects every configured player, lets them talk, and collects what each one saw.
///
/// All players join before anyone speaks, so every client sees every message.
pub async fn run(
    config: &QuillConfig,
    key_store: Arc<KeyStore>,
    cancel_token: CancellationToken,
) -> anyhow::Result<Vec<ClientReport>> {
    let server = Server::new(
        config.chat.clone(),
        key_store.signature_validator(),
        cancel_token.child_token(),
    );

    let mut clients = Vec::with_capacity(config.players.len());
    for player in &config.players {
        let id = Uuid::new_v4();
        let session = if player.signed {
            let key_store = key_store.clone();
            let key_pair = spawn_blocking(move || {
                key_store.issue_profile_keys(id, PROFILE_KEY_LIFETIME)
            })
            .await?
            .with_context(|| format!("issuing profile keys for {}", player.name))?;
            Some(LocalChatSession::create(key_pair))
        } else {
            None
        };
        let client = SimulatedClient {
            name: player.name.clone(),
            id,
            session,
            messages: player.messages.clone(),
            tamper: player.tamper,
            message_interval: Duration::from_millis(config.message_interval_ms),
        };
        let connection = server.connect(id, player.name.clone());
        clients.push((client, connection));
    }

    let handles: Vec<_> = clients
        .into_iter()
        .map(|(client, connection)| {
            tokio::spawn(client.run(
                config.chat.clone(),
                key_store.signature_validator(),
                connection,
                cancel_token.child_token(),
            ))
        })
        .collect();

    let mut reports = Vec::with_capacity(handles.len());
    for handle in handles {
        reports.push(handle.await?);
    }
    server.shutdown().await;
    Ok(reports)
}

#[cfg(test)]
mod tests {
    use quill_chat::ChatConfig;

    use super::*;
    use crate::config::PlayerConfig;

    fn player(name: &str, signed: bool, tamper: bool, messages: &[&str]) -> PlayerConfig {
        PlayerConfig {
            name: name.to_string(),
            signed,
            tamper,
            messages: messages.iter().map(ToString::to_string).collect(),
        }
    }

    fn report<'a>(reports: &'a [ClientReport], name: &str) -> &'a ClientReport {
        reports
            .iter()
            .find(|r| r.name == name)
            .expect("every player reports")
    }

    #[tokio::test]
    async fn test_relay_delivers_and_kicks_tamperer() {
        let key_store = Arc::new(
            spawn_blocking(KeyStore::create)
                .await
                .expect("key generation task")
                .expect("authority key"),
        );
        let config = QuillConfig {
            chat: ChatConfig {
                enforce_secure_chat: false,
                ..ChatConfig::default()
            },
            message_interval_ms: 20,
            players: vec![
                player("Alice", true, false, &["one", "two", "three"]),
                player("Carol", false, false, &["plain"]),
                player("Mallory", true, true, &["forged"]),
            ],
            ..QuillConfig::default()
        };

        let reports = run(&config, key_store, CancellationToken::new())
            .await
            .expect("simulation runs");

        let alice = report(&reports, "Alice");
        assert!(!alice.closed_by_server);
        let contents: Vec<_> = alice.received.iter().map(|l| l.content.as_str()).collect();
        for expected in ["one", "two", "three", "plain"] {
            assert!(contents.contains(&expected), "Alice missed '{expected}'");
        }
        assert!(!contents.contains(&"forged"));
        assert!(alice.received.iter().all(|l| l.trusted));

        let mallory = report(&reports, "Mallory");
        assert!(mallory.closed_by_server);
        assert!(
            mallory
                .system
                .iter()
                .any(|line| line.starts_with("Disconnected:"))
        );
    }

    #[tokio::test]
    async fn test_enforced_secure_chat_rejects_unsigned_player() {
        let key_store = Arc::new(
            spawn_blocking(KeyStore::create)
                .await
                .expect("key generation task")
                .expect("authority key"),
        );
        let config = QuillConfig {
            message_interval_ms: 20,
            players: vec![
                player("Alice", true, false, &["signed"]),
                player("Carol", false, false, &["unsigned"]),
            ],
            ..QuillConfig::default()
        };
        assert!(config.chat.enforce_secure_chat);

        let reports = run(&config, key_store, CancellationToken::new())
            .await
            .expect("simulation runs");

        let alice = report(&reports, "Alice");
        assert!(alice.received.iter().any(|l| l.content == "signed" && l.trusted));
        assert!(!alice.received.iter().any(|l| l.content == "unsigned"));

        let carol = report(&reports, "Carol");
        assert!(!carol.closed_by_server);
        assert!(
            carol
                .system
                .iter()
                .any(|line| line.contains("missing profile public key"))
        );
    }
}
