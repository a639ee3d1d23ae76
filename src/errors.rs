/// Error taxonomy for the bot.
///
/// Propagation policy:
/// - `SourceUnavailable` on a timer tick is logged and the tick skipped; on
///   the lazy per-result ingestion it aborts the whole result recording.
/// - `Transport` on a reminder recipient is caught per-recipient; on a
///   direct reply it surfaces to the dispatcher and the update is dropped.
/// - `Database` is always fatal to the enclosing operation.
#[derive(Debug, thiserror::Error)]
pub enum BotError {
    #[error("External reader unavailable: {0}")]
    SourceUnavailable(String),

    #[error("Telegram transport error: {0}")]
    Transport(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}
