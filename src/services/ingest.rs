//! Ingestion and dedup cache.
//!
//! Orchestrates the two external readers into one snapshot, compares it
//! against the last row this process persisted, and only writes when
//! something actually changed. Retention is enforced after every write:
//! once the store exceeds the configured bound, every row carrying the
//! minimum timestamp is evicted.
//!
//! The in-memory last-saved reference is a write-side short-circuit only.
//! Read paths always go through `latest_snapshot`, so a stale cache can at
//! worst cause one redundant write, never a stale reply.

use chrono::Utc;
use futures::future;
use sqlx::PgPool;
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::db::models::Snapshot;
use crate::db::queries::{self, InsertSnapshotParams};
use crate::errors::BotError;
use crate::services::water::{WaterLevelClient, WaterReading};
use crate::services::weather::{WeatherClient, WeatherReading};

/// In-memory reference to the last snapshot this process persisted.
///
/// Both ingestion triggers (the interval timer and the lazy per-result
/// trigger) run the whole compare→persist→update sequence under this lock,
/// so two concurrent ingestions cannot both decide to persist from a stale
/// comparison.
#[derive(Debug, Default)]
pub struct IngestCache {
    pub last_saved: Option<Snapshot>,
}

pub type SharedIngestCache = Arc<Mutex<IngestCache>>;

/// Decide whether a candidate snapshot differs from the last persisted one.
///
/// The candidate always carries empty result fields, so a last row with a
/// recorded result or location counts as changed. Reading values are
/// Decimals rounded to one decimal place upstream, making this an exact
/// comparison.
pub fn observation_changed(
    last: &Snapshot,
    weather: &WeatherReading,
    water: &WaterReading,
) -> bool {
    last.country != weather.country
        || last.city != weather.city
        || last.temperature_c != weather.temperature_c
        || last.feels_like_c != weather.feels_like_c
        || last.humidity_pct != weather.humidity_pct
        || last.pressure_hpa != weather.pressure_hpa
        || last.wind_direction_deg != weather.wind_direction_deg
        || last.wind_speed_ms != weather.wind_speed_ms
        || last.water_level_cm != water.level_cm
        || last.water_delta_cm != water.delta_cm
        || last.result_label.is_some()
        || last.result_latitude.is_some()
        || last.result_longitude.is_some()
}

/// Fetch both readers and persist a new snapshot if the observation changed.
///
/// Returns the current snapshot either way: the freshly persisted row, or
/// the existing latest row when the write was deduplicated. Either reader
/// failing aborts the whole ingestion; nothing is persisted and the cache is
/// left untouched, so the next attempt re-evaluates against the same
/// baseline.
pub async fn ingest(
    pool: &PgPool,
    weather: &WeatherClient,
    water: &WaterLevelClient,
    cache: &SharedIngestCache,
    retention_rows: i64,
) -> Result<Snapshot, BotError> {
    let (weather_reading, water_reading) =
        future::try_join(weather.fetch_current(), water.fetch_current()).await?;

    let mut cache = cache.lock().await;

    let changed = match &cache.last_saved {
        Some(last) => observation_changed(last, &weather_reading, &water_reading),
        None => true,
    };

    if !changed {
        if let Some(current) = queries::latest_snapshot(pool).await? {
            tracing::debug!("Ingest: observation unchanged, skipping persist");
            return Ok(current);
        }
        // Cache claims a row exists but the store is empty (e.g. manual
        // cleanup); fall through and persist.
        tracing::warn!("Ingest: cache set but store empty, persisting anyway");
    }

    let params = snapshot_params(&weather_reading, &water_reading);
    let saved = save_with_retention(pool, params, retention_rows).await?;
    tracing::info!(
        timestamp_ms = saved.timestamp_ms,
        "Ingest: persisted new snapshot"
    );
    cache.last_saved = Some(saved.clone());
    Ok(saved)
}

/// Insert a snapshot row, then evict the oldest timestamp group if the store
/// exceeds the retention bound.
///
/// Also used by the conversation flow for result/location appends, so the
/// bound holds across all writers.
pub async fn save_with_retention(
    pool: &PgPool,
    params: InsertSnapshotParams,
    retention_rows: i64,
) -> Result<Snapshot, BotError> {
    let saved = queries::insert_snapshot(pool, params).await?;

    let count = queries::count_snapshots(pool).await?;
    if count > retention_rows {
        if let Some(oldest_ts) = queries::oldest_snapshot_timestamp(pool).await? {
            let removed = queries::delete_snapshots_at(pool, oldest_ts).await?;
            tracing::info!(
                timestamp_ms = oldest_ts,
                removed,
                "Retention: evicted oldest snapshot rows"
            );
        }
    }

    Ok(saved)
}

/// Build insert params for a fresh observation (empty result fields).
fn snapshot_params(weather: &WeatherReading, water: &WaterReading) -> InsertSnapshotParams {
    InsertSnapshotParams {
        timestamp_ms: Utc::now().timestamp_millis(),
        country: weather.country.clone(),
        city: weather.city.clone(),
        temperature_c: weather.temperature_c,
        feels_like_c: weather.feels_like_c,
        humidity_pct: weather.humidity_pct,
        pressure_hpa: weather.pressure_hpa,
        wind_direction_deg: weather.wind_direction_deg,
        wind_speed_ms: weather.wind_speed_ms,
        water_level_cm: water.level_cm,
        water_delta_cm: water.delta_cm,
        result_label: None,
        result_author: None,
        result_latitude: None,
        result_longitude: None,
    }
}

/// Run the scheduled ingestion loop. Never returns; spawn via
/// `tokio::spawn`.
///
/// The first ingestion runs immediately so the bot has a snapshot to serve
/// right after startup. A failed tick is logged and skipped; no partial
/// snapshot is ever persisted.
pub async fn run_ingest_poller(
    pool: PgPool,
    weather: WeatherClient,
    water: WaterLevelClient,
    cache: SharedIngestCache,
    retention_rows: i64,
    interval_secs: u64,
) {
    tracing::info!(interval_secs, "Ingest poller started");

    loop {
        match ingest(&pool, &weather, &water, &cache, retention_rows).await {
            Ok(snapshot) => {
                tracing::debug!(
                    timestamp_ms = snapshot.timestamp_ms,
                    "Ingest tick complete"
                );
            }
            Err(e) => {
                tracing::error!("Ingest tick failed, skipping: {}", e);
            }
        }

        tokio::time::sleep(std::time::Duration::from_secs(interval_secs)).await;
    }
}
