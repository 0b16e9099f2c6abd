use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const DEFAULT_MAX_PARTICIPANTS: usize = 50;
pub const MESSAGE_HISTORY_LIMIT: usize = 100;

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomSettings {
    pub max_participants: usize,
    pub allow_recording: bool,
    pub allow_screen_share: bool,
    pub allow_chat: bool,
}

impl Default for RoomSettings {
    fn default() -> Self {
        RoomSettings {
            max_participants: DEFAULT_MAX_PARTICIPANTS,
            allow_recording: true,
            allow_screen_share: true,
            allow_chat: true,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionQuality {
    Good,
    Fair,
    Poor,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct UserDescriptor {
    pub id: String,
    pub name: String,
    pub email: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Participant {
    pub socket_id: String,
    pub user_id: String,
    pub name: String,
    pub email: String,
    pub is_video_on: bool,
    pub is_audio_on: bool,
    pub is_screen_sharing: bool,
    pub joined_at: DateTime<Utc>,
    pub connection_quality: ConnectionQuality,
}

impl Participant {
    pub fn new(socket_id: String, user: &UserDescriptor) -> Self {
        Participant {
            socket_id,
            user_id: user.id.clone(),
            name: user.name.clone(),
            email: user.email.clone(),
            is_video_on: true,
            is_audio_on: true,
            is_screen_sharing: false,
            joined_at: Utc::now(),
            connection_quality: ConnectionQuality::Good,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MessageSender {
    pub id: String,
    pub name: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: String,
    pub text: String,
    pub sender: MessageSender,
    pub timestamp: DateTime<Utc>,
}

impl ChatMessage {
    pub fn new(text: String, sender: MessageSender) -> Self {
        ChatMessage {
            id: Uuid::new_v4().to_string(),
            text,
            sender,
            timestamp: Utc::now(),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomInfo {
    pub id: String,
    pub participant_count: usize,
    pub max_participants: usize,
    pub settings: RoomSettings,
}

#[derive(Clone, Debug)]
pub struct Room {
    pub id: String,
    pub participants: Vec<Participant>, // join order
    messages: VecDeque<ChatMessage>,
    pub created_at: DateTime<Utc>,
    pub settings: RoomSettings,
}

impl Room {
    pub fn new(id: String) -> Self {
        Room {
            id,
            participants: Vec::new(),
            messages: VecDeque::new(),
            created_at: Utc::now(),
            settings: RoomSettings::default(),
        }
    }

    pub fn is_full(&self) -> bool {
        self.participants.len() >= self.settings.max_participants
    }

    pub fn is_empty(&self) -> bool {
        self.participants.is_empty()
    }

    // A rejoin with the same socket id replaces the stale entry.
    pub fn upsert_participant(&mut self, participant: Participant) {
        self.participants
            .retain(|p| p.socket_id != participant.socket_id);
        self.participants.push(participant);
    }

    pub fn remove_participant(&mut self, socket_id: &str) -> Option<Participant> {
        let pos = self
            .participants
            .iter()
            .position(|p| p.socket_id == socket_id)?;
        Some(self.participants.remove(pos))
    }

    pub fn participant(&self, socket_id: &str) -> Option<&Participant> {
        self.participants.iter().find(|p| p.socket_id == socket_id)
    }

    pub fn participant_mut(&mut self, socket_id: &str) -> Option<&mut Participant> {
        self.participants
            .iter_mut()
            .find(|p| p.socket_id == socket_id)
    }

    pub fn push_message(&mut self, message: ChatMessage) {
        self.messages.push_back(message);
        if self.messages.len() > MESSAGE_HISTORY_LIMIT {
            self.messages.pop_front();
        }
    }

    pub fn message_history(&self) -> Vec<ChatMessage> {
        self.messages.iter().cloned().collect()
    }

    pub fn info(&self) -> RoomInfo {
        RoomInfo {
            id: self.id.clone(),
            participant_count: self.participants.len(),
            max_participants: self.settings.max_participants,
            settings: self.settings.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(name: &str) -> UserDescriptor {
        UserDescriptor {
            id: format!("u-{name}"),
            name: name.to_string(),
            email: format!("{name}@example.com"),
        }
    }

    fn message(text: &str) -> ChatMessage {
        ChatMessage::new(
            text.to_string(),
            MessageSender {
                id: "u-1".to_string(),
                name: "Ada".to_string(),
            },
        )
    }

    #[test]
    fn rejoin_replaces_participant_with_same_socket_id() {
        let mut room = Room::new("r1".to_string());
        room.upsert_participant(Participant::new("s1".to_string(), &user("ada")));
        room.upsert_participant(Participant::new("s2".to_string(), &user("grace")));

        let mut rejoined = Participant::new("s1".to_string(), &user("ada"));
        rejoined.is_video_on = false;
        room.upsert_participant(rejoined);

        assert_eq!(room.participants.len(), 2);
        let ada = room.participant("s1").expect("still present");
        assert!(!ada.is_video_on);
        // replacement moves the entry to the end of the join order
        assert_eq!(room.participants[1].socket_id, "s1");
    }

    #[test]
    fn room_is_full_at_exactly_max_participants() {
        let mut room = Room::new("r1".to_string());
        room.settings.max_participants = 2;
        assert!(!room.is_full());

        room.upsert_participant(Participant::new("s1".to_string(), &user("ada")));
        assert!(!room.is_full());
        room.upsert_participant(Participant::new("s2".to_string(), &user("grace")));
        assert!(room.is_full());
    }

    #[test]
    fn history_keeps_only_the_most_recent_messages() {
        let mut room = Room::new("r1".to_string());
        for i in 0..=MESSAGE_HISTORY_LIMIT {
            room.push_message(message(&format!("m{i}")));
        }

        let history = room.message_history();
        assert_eq!(history.len(), MESSAGE_HISTORY_LIMIT);
        assert_eq!(history[0].text, "m1"); // the oldest one was dropped
        assert_eq!(history[MESSAGE_HISTORY_LIMIT - 1].text, "m100");
    }

    #[test]
    fn info_reflects_current_occupancy() {
        let mut room = Room::new("r1".to_string());
        room.upsert_participant(Participant::new("s1".to_string(), &user("ada")));

        let info = room.info();
        assert_eq!(info.id, "r1");
        assert_eq!(info.participant_count, 1);
        assert_eq!(info.max_participants, DEFAULT_MAX_PARTICIPANTS);

        room.remove_participant("s1");
        assert_eq!(room.info().participant_count, 0);
        assert!(room.is_empty());
    }
}
