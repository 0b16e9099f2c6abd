use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::room::{ChatMessage, Participant, RoomInfo, UserDescriptor};

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ClientMessage {
    #[serde(rename = "join-room", rename_all = "camelCase")]
    JoinRoom { room_id: String, user: UserDescriptor },
    #[serde(rename = "leave-room")]
    LeaveRoom,
    #[serde(rename = "offer")]
    Offer { target: String, offer: Value },
    #[serde(rename = "answer")]
    Answer { target: String, answer: Value },
    #[serde(rename = "ice-candidate")]
    IceCandidate { target: String, candidate: Value },
    #[serde(rename = "toggle-video", rename_all = "camelCase")]
    ToggleVideo { is_video_on: bool },
    #[serde(rename = "toggle-audio", rename_all = "camelCase")]
    ToggleAudio { is_audio_on: bool },
    #[serde(rename = "start-screen-share")]
    StartScreenShare,
    #[serde(rename = "stop-screen-share")]
    StopScreenShare,
    #[serde(rename = "send-message")]
    SendMessage { text: String },
    #[serde(rename = "start-recording")]
    StartRecording,
    #[serde(rename = "stop-recording")]
    StopRecording,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ServerMessage {
    #[serde(rename = "room-state", rename_all = "camelCase")]
    RoomState {
        participants: Vec<Participant>,
        messages: Vec<ChatMessage>,
        room_info: RoomInfo,
    },
    #[serde(rename = "existing-participants")]
    ExistingParticipants { participants: Vec<Participant> },
    #[serde(rename = "participant-joined")]
    ParticipantJoined { participant: Participant },
    #[serde(rename = "participant-left", rename_all = "camelCase")]
    ParticipantLeft { socket_id: String },
    #[serde(rename = "offer")]
    Offer { offer: Value, sender: String },
    #[serde(rename = "answer")]
    Answer { answer: Value, sender: String },
    #[serde(rename = "ice-candidate")]
    IceCandidate { candidate: Value, sender: String },
    #[serde(rename = "participant-video-toggle", rename_all = "camelCase")]
    ParticipantVideoToggle { socket_id: String, is_video_on: bool },
    #[serde(rename = "participant-audio-toggle", rename_all = "camelCase")]
    ParticipantAudioToggle { socket_id: String, is_audio_on: bool },
    #[serde(rename = "participant-screen-share-start", rename_all = "camelCase")]
    ParticipantScreenShareStart { socket_id: String },
    #[serde(rename = "participant-screen-share-stop", rename_all = "camelCase")]
    ParticipantScreenShareStop { socket_id: String },
    #[serde(rename = "new-message")]
    NewMessage { message: ChatMessage },
    #[serde(rename = "recording-started", rename_all = "camelCase")]
    RecordingStarted { socket_id: String },
    #[serde(rename = "recording-stopped", rename_all = "camelCase")]
    RecordingStopped { socket_id: String },
    #[serde(rename = "room-full", rename_all = "camelCase")]
    RoomFull {
        room_id: String,
        max_participants: usize,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn join_room_event_uses_wire_field_names() {
        let raw = r#"{
            "type": "join-room",
            "roomId": "r-main",
            "user": { "id": "u1", "name": "Ada", "email": "ada@example.com" }
        }"#;

        match serde_json::from_str::<ClientMessage>(raw).expect("valid event") {
            ClientMessage::JoinRoom { room_id, user } => {
                assert_eq!(room_id, "r-main");
                assert_eq!(user.name, "Ada");
            }
            other => panic!("wrong variant: {other:?}"),
        }
    }

    #[test]
    fn toggle_events_carry_camel_case_flags() {
        let raw = r#"{ "type": "toggle-video", "isVideoOn": false }"#;
        match serde_json::from_str::<ClientMessage>(raw).expect("valid event") {
            ClientMessage::ToggleVideo { is_video_on } => assert!(!is_video_on),
            other => panic!("wrong variant: {other:?}"),
        }

        let out = ServerMessage::ParticipantAudioToggle {
            socket_id: "s1".to_string(),
            is_audio_on: false,
        };
        let json = serde_json::to_value(&out).expect("serializable");
        assert_eq!(json["type"], "participant-audio-toggle");
        assert_eq!(json["socketId"], "s1");
        assert_eq!(json["isAudioOn"], false);
    }

    #[test]
    fn signaling_payloads_pass_through_opaquely() {
        let raw = r#"{
            "type": "ice-candidate",
            "target": "s2",
            "candidate": { "candidate": "candidate:1 1 UDP 2122252543 192.0.2.1 54400 typ host", "sdpMLineIndex": 0 }
        }"#;

        match serde_json::from_str::<ClientMessage>(raw).expect("valid event") {
            ClientMessage::IceCandidate { target, candidate } => {
                assert_eq!(target, "s2");
                assert_eq!(candidate["sdpMLineIndex"], 0);
            }
            other => panic!("wrong variant: {other:?}"),
        }
    }
}
