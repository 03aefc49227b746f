pub mod chat_service;
pub mod message_service;
pub mod relationship_service;

pub use chat_service::{ChatService, SendReceipt};
pub use message_service::MessageService;
pub use relationship_service::RelationshipService;
