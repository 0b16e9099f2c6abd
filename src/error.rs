use thiserror::Error;

#[derive(Debug, Error)]
pub enum RelayError {
    #[error("room {room_id} is full ({max_participants} participants)")]
    RoomFull {
        room_id: String,
        max_participants: usize,
    },
    #[error("connection {0} is not joined to any room")]
    NotJoined(String),
}
