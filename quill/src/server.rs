//! The relay server.
//!
//! Every connection gets its own task. Chat state lives per player behind a
//! blocking mutex, and a recipient's lock is held from packing a message until
//! its frame is queued, so frames reach each client in cache order.

use std::sync::Arc;

use quill_chat::{ChatConfig, ChatError, PlayerChatMessage, RemoteChatSession, ServerChatState};
use quill_crypto::RsaSignatureValidator;
use quill_protocol::packets::game::{
    CPlayerChat, CPlayerChatSession, CSystemChat, ClientboundGamePacket, ServerboundGamePacket,
};
use quill_utils::locks::{SyncMutex, SyncRwLock};
use rustc_hash::FxHashMap;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use uuid::Uuid;

/// The client's ends of a connection.
pub struct Connection {
    /// Serverbound frames.
    pub to_server: UnboundedSender<Vec<u8>>,
    /// Clientbound frames. Closed when the server drops the player.
    pub from_server: UnboundedReceiver<Vec<u8>>,
}

struct ConnectedPlayer {
    id: Uuid,
    name: String,
    chat: SyncMutex<ServerChatState>,
    outgoing: UnboundedSender<Vec<u8>>,
    kicked: CancellationToken,
}

impl ConnectedPlayer {
    fn send(&self, packet: &ClientboundGamePacket) {
        match packet.encode() {
            Ok(frame) => {
                if self.outgoing.send(frame).is_err() {
                    log::debug!("Dropped packet for {}, connection closed", self.name);
                }
            }
            Err(e) => log::error!("Failed to encode packet for {}: {e}", self.name),
        }
    }

    fn send_system(&self, content: impl Into<String>) {
        self.send(&ClientboundGamePacket::SystemChat(CSystemChat {
            content: content.into(),
            overlay: false,
        }));
    }

    fn session_packet(&self) -> ClientboundGamePacket {
        let session = self
            .chat
            .lock()
            .chat_session
            .as_ref()
            .map(RemoteChatSession::as_data);
        ClientboundGamePacket::PlayerChatSession(CPlayerChatSession {
            player: self.id,
            session,
        })
    }
}

/// Relays chat between connected players.
pub struct Server {
    /// Stops every connection task.
    pub cancel_token: CancellationToken,
    chat_config: ChatConfig,
    authority: RsaSignatureValidator,
    players: SyncRwLock<FxHashMap<Uuid, Arc<ConnectedPlayer>>>,
    tasks: TaskTracker,
}

impl Server {
    /// Creates a server trusting profile keys signed by `authority`.
    #[must_use]
    pub fn new(
        chat_config: ChatConfig,
        authority: RsaSignatureValidator,
        cancel_token: CancellationToken,
    ) -> Arc<Self> {
        Arc::new(Self {
            cancel_token,
            chat_config,
            authority,
            players: SyncRwLock::new(FxHashMap::default()),
            tasks: TaskTracker::new(),
        })
    }

    /// Accepts a new player and starts serving their connection.
    pub fn connect(self: &Arc<Self>, id: Uuid, name: String) -> Connection {
        let (to_server, incoming) = mpsc::unbounded_channel();
        let (outgoing, from_server) = mpsc::unbounded_channel();
        let player = Arc::new(ConnectedPlayer {
            id,
            name,
            chat: SyncMutex::new(ServerChatState::new(id, &self.chat_config)),
            outgoing,
            kicked: CancellationToken::new(),
        });

        {
            let mut players = self.players.write();
            for other in players.values() {
                player.send(&other.session_packet());
            }
            players.insert(id, player.clone());
            let announcement = player.session_packet();
            for other in players.values() {
                other.send(&announcement);
                other.send_system(format!("{} joined the chat", player.name));
            }
        }
        log::info!("{} joined with id {id}", player.name);

        let server = self.clone();
        self.tasks
            .spawn(async move { server.handle_connection(player, incoming).await });
        Connection {
            to_server,
            from_server,
        }
    }

    /// Stops all connections and waits for their tasks to finish.
    pub async fn shutdown(&self) {
        self.cancel_token.cancel();
        self.tasks.close();
        self.tasks.wait().await;
    }

    async fn handle_connection(
        self: Arc<Self>,
        player: Arc<ConnectedPlayer>,
        mut incoming: UnboundedReceiver<Vec<u8>>,
    ) {
        loop {
            tokio::select! {
                () = self.cancel_token.cancelled() => break,
                () = player.kicked.cancelled() => break,
                frame = incoming.recv() => {
                    let Some(frame) = frame else { break };
                    if let Err(reason) = self.handle_frame(&player, &frame) {
                        Self::kick(&player, &reason);
                        break;
                    }
                }
            }
        }
        self.remove_player(&player);
    }

    fn handle_frame(&self, player: &ConnectedPlayer, frame: &[u8]) -> Result<(), String> {
        let packet = ServerboundGamePacket::decode(frame).map_err(|e| e.to_string())?;
        match packet {
            ServerboundGamePacket::Chat(packet) => {
                let result = player.chat.lock().handle_chat(packet.into());
                match result {
                    Ok(message) => {
                        log::info!("<{}> {}", player.name, message.signed_content());
                        self.broadcast_chat(&message);
                        Ok(())
                    }
                    Err(e) => Self::reject(player, &e),
                }
            }
            ServerboundGamePacket::ChatAck(packet) => player
                .chat
                .lock()
                .handle_ack(packet.offset)
                .map_err(|e| e.to_string()),
            ServerboundGamePacket::ChatSessionUpdate(packet) => {
                let result = player
                    .chat
                    .lock()
                    .update_session(packet.session, &self.authority)
                    .map(|session| session.map(RemoteChatSession::as_data));
                match result {
                    Ok(None) => Ok(()),
                    Ok(Some(session)) => {
                        let announcement =
                            ClientboundGamePacket::PlayerChatSession(CPlayerChatSession {
                                player: player.id,
                                session: Some(session),
                            });
                        for other in self.players.read().values() {
                            other.send(&announcement);
                        }
                        Ok(())
                    }
                    Err(e) => Self::reject(player, &e),
                }
            }
        }
    }

    fn reject(player: &ConnectedPlayer, error: &ChatError) -> Result<(), String> {
        if error.should_disconnect() {
            return Err(error.to_string());
        }
        player.send_system(error.to_string());
        Ok(())
    }

    fn broadcast_chat(&self, message: &PlayerChatMessage) {
        let recipients: Vec<_> = self.players.read().values().cloned().collect();
        for recipient in recipients {
            let mut chat = recipient.chat.lock();
            match chat.send_chat_message(message) {
                Ok(relayed) => {
                    recipient.send(&ClientboundGamePacket::PlayerChat(CPlayerChat::from(
                        relayed,
                    )));
                }
                Err(e) => {
                    drop(chat);
                    Self::kick(&recipient, &e.to_string());
                }
            }
        }
    }

    fn kick(player: &ConnectedPlayer, reason: &str) {
        log::warn!("Disconnecting {}: {reason}", player.name);
        player.send_system(format!("Disconnected: {reason}"));
        player.kicked.cancel();
    }

    fn remove_player(&self, player: &ConnectedPlayer) {
        let remaining: Vec<_> = {
            let mut players = self.players.write();
            players.remove(&player.id);
            players.values().cloned().collect()
        };
        log::info!("{} left", player.name);
        for other in remaining {
            other.send_system(format!("{} left the chat", player.name));
        }
    }
}
