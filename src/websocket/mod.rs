mod message;

pub use message::{decode, encode, LobbyId, Message, MessageType, SessionId};
