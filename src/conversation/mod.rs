pub mod repo;

pub use repo::{Conversation, ExchangeMeta, Message};
