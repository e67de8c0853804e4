use shared::RoomErrorKind;

/// Client mistakes reported back to the offending connection only.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RelayError {
    #[error("Room not found")]
    RoomNotFound(String),
    #[error("Room is full")]
    RoomFull(String),
}

impl RelayError {
    pub fn kind(&self) -> RoomErrorKind {
        match self {
            RelayError::RoomNotFound(_) => RoomErrorKind::RoomNotFound,
            RelayError::RoomFull(_) => RoomErrorKind::RoomFull,
        }
    }

    pub fn room_code(&self) -> &str {
        match self {
            RelayError::RoomNotFound(code) | RelayError::RoomFull(code) => code,
        }
    }
}
