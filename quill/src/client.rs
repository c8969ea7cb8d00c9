//! A scripted player client.

use std::time::Duration;

use quill_chat::{
    ChatConfig, ClientChatState, LocalChatSession, MessageSignature, RemoteChatSession,
    RemoteChatSessionData, SubmittedChat,
};
use quill_crypto::RsaSignatureValidator;
use quill_protocol::packets::game::{
    CPlayerChatSession, ClientboundGamePacket, SChat, SChatAck, SChatSessionUpdate,
    ServerboundGamePacket,
};
use tokio::time::{Instant, interval, sleep_until};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::server::Connection;

/// How long a client stays connected after its last message.
const LINGER: Duration = Duration::from_millis(500);

/// A chat line as the client displayed it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReceivedLine {
    /// Who sent it.
    pub sender: Uuid,
    /// What was shown.
    pub content: String,
    /// Whether the sender's chain vouched for it.
    pub trusted: bool,
}

/// What a client saw during its run.
#[derive(Clone, Debug, Default)]
pub struct ClientReport {
    /// The player's name.
    pub name: String,
    /// Player chat, in arrival order.
    pub received: Vec<ReceivedLine>,
    /// System chat, in arrival order.
    pub system: Vec<String>,
    /// Messages the client could not prepare.
    pub failed_to_send: usize,
    /// Whether the server closed the connection before the client was done.
    pub closed_by_server: bool,
}

/// A player that sends a fixed list of messages.
pub struct SimulatedClient {
    /// Display name.
    pub name: String,
    /// Profile id.
    pub id: Uuid,
    /// Chat session to sign with, if any.
    pub session: Option<LocalChatSession>,
    /// Messages to send, in order.
    pub messages: Vec<String>,
    /// Flip a bit in every outgoing signature.
    pub tamper: bool,
    /// Delay between messages.
    pub message_interval: Duration,
}

impl SimulatedClient {
    /// Runs the script over `connection` and reports what was received.
    pub async fn run(
        self,
        chat_config: ChatConfig,
        authority: RsaSignatureValidator,
        mut connection: Connection,
        cancel_token: CancellationToken,
    ) -> ClientReport {
        let mut state = ClientChatState::new(self.id, chat_config);
        let mut report = ClientReport {
            name: self.name.clone(),
            ..ClientReport::default()
        };

        if let Some(session) = &self.session {
            let session = state.start_session(session);
            self.send(
                &connection,
                ServerboundGamePacket::ChatSessionUpdate(SChatSessionUpdate { session }),
            );
        }

        let mut messages = self.messages.iter();
        let mut ticker = interval(self.message_interval);
        let mut done_at: Option<Instant> = None;

        loop {
            tokio::select! {
                () = cancel_token.cancelled() => break,
                () = sleep_until(done_at.unwrap_or_else(Instant::now)), if done_at.is_some() => break,
                _ = ticker.tick(), if done_at.is_none() => {
                    match messages.next() {
                        Some(content) => self.chat(&mut state, &connection, content, &mut report),
                        None => done_at = Some(Instant::now() + LINGER),
                    }
                }
                frame = connection.from_server.recv() => {
                    let Some(frame) = frame else {
                        report.closed_by_server = true;
                        break;
                    };
                    if !self.handle_frame(&mut state, &connection, &authority, &frame, &mut report) {
                        break;
                    }
                }
            }
        }

        if let Some(offset) = state.acknowledge() {
            self.send(
                &connection,
                ServerboundGamePacket::ChatAck(SChatAck { offset }),
            );
        }
        log::debug!("{} disconnected", self.name);
        report
    }

    fn chat(
        &self,
        state: &mut ClientChatState,
        connection: &Connection,
        content: &str,
        report: &mut ClientReport,
    ) {
        match state.prepare_chat(content) {
            Ok(chat) => {
                let chat = if self.tamper { tamper(chat) } else { chat };
                self.send(connection, ServerboundGamePacket::Chat(SChat::from(chat)));
            }
            Err(e) => {
                log::warn!("[{}] Could not send '{content}': {e}", self.name);
                report.failed_to_send += 1;
            }
        }
    }

    /// Returns `false` once the connection is no longer usable.
    fn handle_frame(
        &self,
        state: &mut ClientChatState,
        connection: &Connection,
        authority: &RsaSignatureValidator,
        frame: &[u8],
        report: &mut ClientReport,
    ) -> bool {
        let packet = match ClientboundGamePacket::decode(frame) {
            Ok(packet) => packet,
            Err(e) => {
                log::error!("[{}] Bad packet from server: {e}", self.name);
                return false;
            }
        };
        match packet {
            ClientboundGamePacket::PlayerChat(packet) => match state.receive_chat(packet.into()) {
                Ok(received) => {
                    let content = received
                        .message
                        .filtered_content()
                        .map_or_else(|| "<filtered>".to_string(), |c| c.into_owned());
                    log::info!(
                        "[{}] {}{}: {content}",
                        self.name,
                        received.message.sender(),
                        if received.trusted { "" } else { " (not secure)" },
                    );
                    report.received.push(ReceivedLine {
                        sender: received.message.sender(),
                        content,
                        trusted: received.trusted,
                    });
                    if let Some(offset) = received.ack {
                        self.send(
                            connection,
                            ServerboundGamePacket::ChatAck(SChatAck { offset }),
                        );
                    }
                }
                Err(e) => {
                    log::error!("[{}] Failed to receive chat: {e}", self.name);
                    if e.should_disconnect() {
                        return false;
                    }
                }
            },
            ClientboundGamePacket::PlayerChatSession(CPlayerChatSession { player, session }) => {
                let session = session.and_then(|data| validate_session(player, data, authority));
                state.set_sender_session(player, session);
            }
            ClientboundGamePacket::SystemChat(packet) => {
                log::info!("[{}] * {}", self.name, packet.content);
                report.system.push(packet.content);
            }
        }
        true
    }

    fn send(&self, connection: &Connection, packet: ServerboundGamePacket) {
        match packet.encode() {
            Ok(frame) => {
                if connection.to_server.send(frame).is_err() {
                    log::debug!("[{}] Server is gone", self.name);
                }
            }
            Err(e) => log::error!("[{}] Failed to encode packet: {e}", self.name),
        }
    }
}

fn validate_session(
    player: Uuid,
    data: RemoteChatSessionData,
    authority: &RsaSignatureValidator,
) -> Option<RemoteChatSession> {
    data.validate(player, authority)
        .inspect_err(|e| log::warn!("Ignoring chat session of {player}: {e}"))
        .ok()
}

fn tamper(mut chat: SubmittedChat) -> SubmittedChat {
    if let Some(signature) = &chat.signature {
        let mut bytes = *signature.bytes();
        bytes[0] ^= 1;
        chat.signature = Some(MessageSignature::new(bytes));
    }
    chat
}
