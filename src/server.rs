use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use log::{debug, info, warn};
use tokio::sync::mpsc;
use tokio::sync::RwLock;
use uuid::Uuid;
use warp::ws::{Message, WebSocket};

use crate::error::RelayError;
use crate::messages::{ClientMessage, ServerMessage};
use crate::room::{ChatMessage, MessageSender, Participant, Room, UserDescriptor};

pub const EMPTY_ROOM_GRACE: Duration = Duration::from_secs(60);

type Rooms = Arc<RwLock<HashMap<String, Room>>>;
type Directory = Arc<RwLock<HashMap<String, String>>>; // socket_id -> room_id
type Connections = Arc<RwLock<HashMap<String, mpsc::UnboundedSender<Message>>>>;

#[derive(Clone)]
pub struct Server {
    rooms: Rooms,
    directory: Directory,
    connections: Connections,
}

impl Default for Server {
    fn default() -> Self {
        Self::new()
    }
}

impl Server {
    pub fn new() -> Self {
        Server {
            rooms: Arc::new(RwLock::new(HashMap::new())),
            directory: Arc::new(RwLock::new(HashMap::new())),
            connections: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    pub async fn handle_connection(&self, ws: WebSocket) {
        let socket_id = Uuid::new_v4().to_string();
        info!("Connection opened: {socket_id}");

        let (mut ws_tx, mut ws_rx) = ws.split();
        let (tx, mut rx) = mpsc::unbounded_channel();
        self.register_connection(&socket_id, tx).await;

        let server = self.clone();
        let reader_id = socket_id.clone();
        tokio::spawn(async move {
            while let Some(result) = ws_rx.next().await {
                match result {
                    Ok(msg) => {
                        if let Ok(text) = msg.to_str() {
                            match serde_json::from_str::<ClientMessage>(text) {
                                Ok(event) => server.handle_client_message(&reader_id, event).await,
                                Err(e) => warn!("Dropping unparseable frame from {reader_id}: {e}"),
                            }
                        }
                    }
                    Err(e) => {
                        warn!("WebSocket error on {reader_id}: {e}");
                        break;
                    }
                }
            }

            server.handle_disconnect(&reader_id).await;
        });

        tokio::spawn(async move {
            while let Some(message) = rx.recv().await {
                if let Err(e) = ws_tx.send(message).await {
                    debug!("Outbound send failed: {e}");
                    break;
                }
            }
        });
    }

    async fn register_connection(&self, socket_id: &str, tx: mpsc::UnboundedSender<Message>) {
        let mut connections = self.connections.write().await;
        connections.insert(socket_id.to_string(), tx);
    }

    pub async fn handle_client_message(&self, socket_id: &str, event: ClientMessage) {
        match event {
            ClientMessage::JoinRoom { room_id, user } => {
                if let Err(RelayError::RoomFull {
                    room_id,
                    max_participants,
                }) = self.join_room(socket_id, room_id, user).await
                {
                    self.send_to(
                        socket_id,
                        &ServerMessage::RoomFull {
                            room_id,
                            max_participants,
                        },
                    )
                    .await;
                }
            }
            ClientMessage::LeaveRoom => self.remove_from_room(socket_id).await,
            ClientMessage::Offer { target, offer } => {
                self.relay(
                    &target,
                    ServerMessage::Offer {
                        offer,
                        sender: socket_id.to_string(),
                    },
                )
                .await;
            }
            ClientMessage::Answer { target, answer } => {
                self.relay(
                    &target,
                    ServerMessage::Answer {
                        answer,
                        sender: socket_id.to_string(),
                    },
                )
                .await;
            }
            ClientMessage::IceCandidate { target, candidate } => {
                self.relay(
                    &target,
                    ServerMessage::IceCandidate {
                        candidate,
                        sender: socket_id.to_string(),
                    },
                )
                .await;
            }
            ClientMessage::ToggleVideo { is_video_on } => {
                let Ok(peers) = self
                    .update_participant(socket_id, |p| p.is_video_on = is_video_on)
                    .await
                else {
                    return; // raced with its own disconnect
                };
                self.broadcast(
                    &peers,
                    &ServerMessage::ParticipantVideoToggle {
                        socket_id: socket_id.to_string(),
                        is_video_on,
                    },
                )
                .await;
            }
            ClientMessage::ToggleAudio { is_audio_on } => {
                let Ok(peers) = self
                    .update_participant(socket_id, |p| p.is_audio_on = is_audio_on)
                    .await
                else {
                    return;
                };
                self.broadcast(
                    &peers,
                    &ServerMessage::ParticipantAudioToggle {
                        socket_id: socket_id.to_string(),
                        is_audio_on,
                    },
                )
                .await;
            }
            ClientMessage::StartScreenShare => self.set_screen_share(socket_id, true).await,
            ClientMessage::StopScreenShare => self.set_screen_share(socket_id, false).await,
            ClientMessage::SendMessage { text } => self.send_chat_message(socket_id, text).await,
            ClientMessage::StartRecording => {
                let Ok(peers) = self.room_peers(socket_id).await else {
                    return;
                };
                self.broadcast(
                    &peers,
                    &ServerMessage::RecordingStarted {
                        socket_id: socket_id.to_string(),
                    },
                )
                .await;
            }
            ClientMessage::StopRecording => {
                let Ok(peers) = self.room_peers(socket_id).await else {
                    return;
                };
                self.broadcast(
                    &peers,
                    &ServerMessage::RecordingStopped {
                        socket_id: socket_id.to_string(),
                    },
                )
                .await;
            }
        }
    }

    async fn join_room(
        &self,
        socket_id: &str,
        room_id: String,
        user: UserDescriptor,
    ) -> Result<(), RelayError> {
        let joined = Participant::new(socket_id.to_string(), &user);

        let (snapshot, others) = {
            let mut rooms = self.rooms.write().await;
            let room = rooms
                .entry(room_id.clone())
                .or_insert_with(|| Room::new(room_id.clone()));

            // Capacity is checked before the stale-entry replacement, so a
            // rejoin into a full room is rejected like any other join.
            if room.is_full() {
                warn!(
                    "Join rejected: room {room_id} is full ({}/{})",
                    room.participants.len(),
                    room.settings.max_participants
                );
                return Err(RelayError::RoomFull {
                    room_id,
                    max_participants: room.settings.max_participants,
                });
            }

            room.upsert_participant(joined.clone());
            let mut directory = self.directory.write().await;
            directory.insert(socket_id.to_string(), room_id.clone());

            info!(
                "{} joined room {room_id} ({}/{})",
                joined.name,
                room.participants.len(),
                room.settings.max_participants
            );

            let others: Vec<Participant> = room
                .participants
                .iter()
                .filter(|p| p.socket_id != socket_id)
                .cloned()
                .collect();
            let snapshot = ServerMessage::RoomState {
                participants: room.participants.clone(),
                messages: room.message_history(),
                room_info: room.info(),
            };
            (snapshot, others)
        };

        self.send_to(socket_id, &snapshot).await;
        self.broadcast(&others, &ServerMessage::ParticipantJoined { participant: joined })
            .await;
        // The joiner initiates an offer toward every existing member.
        self.send_to(
            socket_id,
            &ServerMessage::ExistingParticipants { participants: others },
        )
        .await;

        Ok(())
    }

    async fn handle_disconnect(&self, socket_id: &str) {
        self.remove_from_room(socket_id).await;
        let mut connections = self.connections.write().await;
        connections.remove(socket_id);
        info!("Connection closed: {socket_id}");
    }

    async fn remove_from_room(&self, socket_id: &str) {
        let remaining = {
            let mut rooms = self.rooms.write().await;
            let mut directory = self.directory.write().await;
            let Some(room_id) = directory.remove(socket_id) else {
                return;
            };
            let Some(room) = rooms.get_mut(&room_id) else {
                return;
            };

            room.remove_participant(socket_id);
            info!("{socket_id} left room {room_id}");
            if room.is_empty() {
                self.schedule_room_cleanup(room_id);
            }
            room.participants.clone()
        };

        self.broadcast(
            &remaining,
            &ServerMessage::ParticipantLeft {
                socket_id: socket_id.to_string(),
            },
        )
        .await;
    }

    // Delayed deletion re-checks emptiness at expiry, so a rejoin during the
    // grace period keeps the room (and its chat history) alive.
    fn schedule_room_cleanup(&self, room_id: String) {
        let rooms = Arc::clone(&self.rooms);
        tokio::spawn(async move {
            tokio::time::sleep(EMPTY_ROOM_GRACE).await;
            let mut rooms = rooms.write().await;
            if rooms.get(&room_id).is_some_and(Room::is_empty) {
                rooms.remove(&room_id);
                info!("Room {room_id} deleted after grace period");
            }
        });
    }

    async fn set_screen_share(&self, socket_id: &str, sharing: bool) {
        let Ok(peers) = self
            .update_participant(socket_id, |p| p.is_screen_sharing = sharing)
            .await
        else {
            return;
        };
        let event = if sharing {
            ServerMessage::ParticipantScreenShareStart {
                socket_id: socket_id.to_string(),
            }
        } else {
            ServerMessage::ParticipantScreenShareStop {
                socket_id: socket_id.to_string(),
            }
        };
        self.broadcast(&peers, &event).await;
    }

    async fn send_chat_message(&self, socket_id: &str, text: String) {
        let (message, recipients) = {
            let mut rooms = self.rooms.write().await;
            let directory = self.directory.read().await;
            let Some(room_id) = directory.get(socket_id) else {
                return;
            };
            let Some(room) = rooms.get_mut(room_id) else {
                return;
            };
            let Some(sender) = room.participant(socket_id) else {
                return;
            };

            let message = ChatMessage::new(
                text,
                MessageSender {
                    id: sender.user_id.clone(),
                    name: sender.name.clone(),
                },
            );
            room.push_message(message.clone());
            (message, room.participants.clone())
        };

        // Chat fans out to the sender as well.
        self.broadcast(&recipients, &ServerMessage::NewMessage { message })
            .await;
    }

    // Store-and-forward to one target; an unreachable target is dropped.
    async fn relay(&self, target: &str, message: ServerMessage) {
        self.send_to(target, &message).await;
    }

    // The flag lands on the stored record before the broadcast; later
    // joiners' snapshots must reflect it. Returns the other members.
    async fn update_participant<F>(
        &self,
        socket_id: &str,
        apply: F,
    ) -> Result<Vec<Participant>, RelayError>
    where
        F: FnOnce(&mut Participant),
    {
        let mut rooms = self.rooms.write().await;
        let directory = self.directory.read().await;
        let room_id = directory
            .get(socket_id)
            .ok_or_else(|| RelayError::NotJoined(socket_id.to_string()))?;
        let room = rooms
            .get_mut(room_id)
            .ok_or_else(|| RelayError::NotJoined(socket_id.to_string()))?;
        let participant = room
            .participant_mut(socket_id)
            .ok_or_else(|| RelayError::NotJoined(socket_id.to_string()))?;
        apply(participant);

        Ok(room
            .participants
            .iter()
            .filter(|p| p.socket_id != socket_id)
            .cloned()
            .collect())
    }

    async fn room_peers(&self, socket_id: &str) -> Result<Vec<Participant>, RelayError> {
        let rooms = self.rooms.read().await;
        let directory = self.directory.read().await;
        let room_id = directory
            .get(socket_id)
            .ok_or_else(|| RelayError::NotJoined(socket_id.to_string()))?;
        let room = rooms
            .get(room_id)
            .ok_or_else(|| RelayError::NotJoined(socket_id.to_string()))?;

        Ok(room
            .participants
            .iter()
            .filter(|p| p.socket_id != socket_id)
            .cloned()
            .collect())
    }

    pub async fn room_participants(&self, room_id: &str) -> Vec<Participant> {
        let rooms = self.rooms.read().await;
        rooms
            .get(room_id)
            .map(|room| room.participants.clone())
            .unwrap_or_default()
    }

    async fn send_to(&self, socket_id: &str, message: &ServerMessage) {
        if let Ok(text) = serde_json::to_string(message) {
            let connections = self.connections.read().await;
            if let Some(sender) = connections.get(socket_id) {
                let _ = sender.send(Message::text(text));
            }
        }
    }

    async fn broadcast(&self, recipients: &[Participant], message: &ServerMessage) {
        if let Ok(text) = serde_json::to_string(message) {
            let connections = self.connections.read().await;
            for participant in recipients {
                if let Some(sender) = connections.get(&participant.socket_id) {
                    let _ = sender.send(Message::text(text.clone()));
                }
            }
        }
    }
}
