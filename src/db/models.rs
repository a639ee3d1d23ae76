use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::FromRow;
use uuid::Uuid;

/// One persisted snapshot combining the latest external readings and,
/// optionally, a user-submitted catch result and location.
///
/// Rows are append-only: "updating" the result fields means loading the
/// latest row, mutating it in memory, and inserting a new row with a fresh
/// timestamp. Read paths only ever consult the latest row by `timestamp_ms`.
#[derive(Debug, Clone, FromRow)]
pub struct Snapshot {
    pub id: Uuid,
    /// Epoch milliseconds at snapshot creation; the ordering key.
    pub timestamp_ms: i64,

    // Weather reading
    pub country: String,
    pub city: String,
    pub temperature_c: Decimal,
    pub feels_like_c: Decimal,
    pub humidity_pct: Decimal,
    pub pressure_hpa: Decimal,
    pub wind_direction_deg: Decimal,
    pub wind_speed_ms: Decimal,

    // Water-level reading
    pub water_level_cm: Decimal,
    pub water_delta_cm: Decimal,

    // Catch result, set only by the conversation flow
    pub result_label: Option<String>,
    pub result_author: Option<String>,
    pub result_latitude: Option<Decimal>,
    pub result_longitude: Option<Decimal>,

    pub created_at: DateTime<Utc>,
}

/// A registered conversation participant, keyed by Telegram chat id.
///
/// Inserted once on first /start; never updated (name changes are not
/// reflected).
#[derive(Debug, Clone, FromRow)]
pub struct BotUser {
    pub chat_id: i64,
    pub first_name: String,
    pub last_name: Option<String>,
    pub username: Option<String>,
    pub registered_at: DateTime<Utc>,
}
