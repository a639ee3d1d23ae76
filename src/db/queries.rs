use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

use super::models::{BotUser, Snapshot};

/// Parameters for inserting a new snapshot row.
pub struct InsertSnapshotParams {
    pub timestamp_ms: i64,
    pub country: String,
    pub city: String,
    pub temperature_c: Decimal,
    pub feels_like_c: Decimal,
    pub humidity_pct: Decimal,
    pub pressure_hpa: Decimal,
    pub wind_direction_deg: Decimal,
    pub wind_speed_ms: Decimal,
    pub water_level_cm: Decimal,
    pub water_delta_cm: Decimal,
    pub result_label: Option<String>,
    pub result_author: Option<String>,
    pub result_latitude: Option<Decimal>,
    pub result_longitude: Option<Decimal>,
}

const SNAPSHOT_COLUMNS: &str = "id, timestamp_ms, country, city, temperature_c, feels_like_c, \
     humidity_pct, pressure_hpa, wind_direction_deg, wind_speed_ms, \
     water_level_cm, water_delta_cm, \
     result_label, result_author, result_latitude, result_longitude, created_at";

/// Insert a new snapshot row (append-only).
pub async fn insert_snapshot(
    pool: &PgPool,
    params: InsertSnapshotParams,
) -> Result<Snapshot, sqlx::Error> {
    sqlx::query_as::<_, Snapshot>(&format!(
        "INSERT INTO snapshots (
            id, timestamp_ms, country, city, temperature_c, feels_like_c,
            humidity_pct, pressure_hpa, wind_direction_deg, wind_speed_ms,
            water_level_cm, water_delta_cm,
            result_label, result_author, result_latitude, result_longitude, created_at
        ) VALUES (
            $1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, NOW()
        )
        RETURNING {SNAPSHOT_COLUMNS}"
    ))
    .bind(Uuid::new_v4())
    .bind(params.timestamp_ms)
    .bind(&params.country)
    .bind(&params.city)
    .bind(params.temperature_c)
    .bind(params.feels_like_c)
    .bind(params.humidity_pct)
    .bind(params.pressure_hpa)
    .bind(params.wind_direction_deg)
    .bind(params.wind_speed_ms)
    .bind(params.water_level_cm)
    .bind(params.water_delta_cm)
    .bind(&params.result_label)
    .bind(&params.result_author)
    .bind(params.result_latitude)
    .bind(params.result_longitude)
    .fetch_one(pool)
    .await
}

/// Get the most recent snapshot (maximum `timestamp_ms`).
pub async fn latest_snapshot(pool: &PgPool) -> Result<Option<Snapshot>, sqlx::Error> {
    sqlx::query_as::<_, Snapshot>(&format!(
        "SELECT {SNAPSHOT_COLUMNS} FROM snapshots ORDER BY timestamp_ms DESC LIMIT 1"
    ))
    .fetch_optional(pool)
    .await
}

/// Get the timestamp of the oldest snapshot, if any.
pub async fn oldest_snapshot_timestamp(pool: &PgPool) -> Result<Option<i64>, sqlx::Error> {
    // MIN over an empty table yields a single NULL row
    sqlx::query_scalar::<_, Option<i64>>("SELECT MIN(timestamp_ms) FROM snapshots")
        .fetch_one(pool)
        .await
}

/// Delete every snapshot carrying the exact timestamp. Returns the number of
/// rows removed.
pub async fn delete_snapshots_at(pool: &PgPool, timestamp_ms: i64) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("DELETE FROM snapshots WHERE timestamp_ms = $1")
        .bind(timestamp_ms)
        .execute(pool)
        .await?;
    Ok(result.rows_affected())
}

/// Count all snapshot rows.
pub async fn count_snapshots(pool: &PgPool) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM snapshots")
        .fetch_one(pool)
        .await
}

/// Register a user if no row exists for the chat id. Existing rows are left
/// untouched, making registration idempotent.
pub async fn register_user_if_absent(
    pool: &PgPool,
    chat_id: i64,
    first_name: &str,
    last_name: Option<&str>,
    username: Option<&str>,
    registered_at: DateTime<Utc>,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        "INSERT INTO bot_users (chat_id, first_name, last_name, username, registered_at)
         VALUES ($1, $2, $3, $4, $5)
         ON CONFLICT (chat_id) DO NOTHING",
    )
    .bind(chat_id)
    .bind(first_name)
    .bind(last_name)
    .bind(username)
    .bind(registered_at)
    .execute(pool)
    .await?;
    Ok(result.rows_affected() > 0)
}

/// List all registered users in registration order.
pub async fn list_users(pool: &PgPool) -> Result<Vec<BotUser>, sqlx::Error> {
    sqlx::query_as::<_, BotUser>(
        "SELECT chat_id, first_name, last_name, username, registered_at
         FROM bot_users
         ORDER BY registered_at",
    )
    .fetch_all(pool)
    .await
}
