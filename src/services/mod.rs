pub mod conversation;
pub mod ingest;
pub mod reminder;
pub mod telegram;
pub mod water;
pub mod weather;
