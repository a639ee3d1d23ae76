use sqlx::PgPool;

use crate::services::conversation::SharedConversationState;
use crate::services::ingest::SharedIngestCache;
use crate::services::telegram::TelegramClient;
use crate::services::water::WaterLevelClient;
use crate::services::weather::WeatherClient;

/// Shared application state handed to the dispatcher and every handler.
#[derive(Clone)]
pub struct BotContext {
    pub pool: PgPool,
    pub telegram: TelegramClient,
    pub weather: WeatherClient,
    pub water: WaterLevelClient,
    pub ingest_cache: SharedIngestCache,
    pub conversation: SharedConversationState,
    pub retention_rows: i64,
    pub bot_name: String,
}
