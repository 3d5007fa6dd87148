pub mod chat;
pub mod disease;
