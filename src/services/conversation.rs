//! Result-selection → location-capture conversation flow.
//!
//! A user picks one of five qualitative catch-result buttons; a location
//! share arriving within the next two minutes is attached to the snapshot
//! that recorded the result. The awaiting-location deadline is a single
//! process-wide timestamp: a second user choosing a result clobbers it, and
//! a location reply from either user attaches to whichever snapshot is
//! most recent at that moment. Window expiry is passive — a late location
//! is simply ignored.

use chrono::{DateTime, Utc};
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::context::BotContext;
use crate::db::queries::{self, InsertSnapshotParams};
use crate::errors::BotError;
use crate::helpers::f64_to_decimal_full;
use crate::services::ingest;

/// How long after a recorded result a location share is still accepted, in
/// seconds.
const LOCATION_WINDOW_SECS: i64 = 120;

/// One of the five qualitative catch-result levels, worst to best.
///
/// The callback identifier equals the variant name; any other callback
/// payload is ignored by the dispatcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResultChoice {
    Unsatisfactory,
    Bad,
    Satisfactory,
    Good,
    Excellent,
}

impl ResultChoice {
    /// All choices in worst→best order, as shown on the keyboard.
    pub const ALL: [ResultChoice; 5] = [
        ResultChoice::Unsatisfactory,
        ResultChoice::Bad,
        ResultChoice::Satisfactory,
        ResultChoice::Good,
        ResultChoice::Excellent,
    ];

    /// Display label stored in the snapshot and shown on the button.
    pub fn label(self) -> &'static str {
        match self {
            ResultChoice::Unsatisfactory => "unsatisfactory",
            ResultChoice::Bad => "bad",
            ResultChoice::Satisfactory => "so-so",
            ResultChoice::Good => "good",
            ResultChoice::Excellent => "excellent",
        }
    }

    /// Callback payload identifier.
    pub fn callback_id(self) -> &'static str {
        match self {
            ResultChoice::Unsatisfactory => "UNSATISFACTORY",
            ResultChoice::Bad => "BAD",
            ResultChoice::Satisfactory => "SATISFACTORY",
            ResultChoice::Good => "GOOD",
            ResultChoice::Excellent => "EXCELLENT",
        }
    }

    /// Match a callback payload against the five identifiers. Returns `None`
    /// for anything else, preserving forward compatibility if buttons are
    /// extended.
    pub fn from_callback(data: &str) -> Option<ResultChoice> {
        Self::ALL.into_iter().find(|c| c.callback_id() == data)
    }
}

/// Shared conversation state: the single process-wide awaiting-location
/// deadline.
///
/// The result path writes it and the location path reads it under the same
/// mutex, so a location is never evaluated against a deadline that is being
/// concurrently replaced.
#[derive(Debug, Default)]
pub struct ConversationState {
    pub awaiting_location_since: Option<DateTime<Utc>>,
}

pub type SharedConversationState = Arc<Mutex<ConversationState>>;

/// Whether a location arriving at `now` falls inside the window opened at
/// `since`. No deadline means no pending result.
pub fn within_window(since: Option<DateTime<Utc>>, now: DateTime<Utc>) -> bool {
    match since {
        Some(since) => (now - since).num_seconds() <= LOCATION_WINDOW_SECS,
        None => false,
    }
}

/// Record a catch result against current conditions.
///
/// Runs a lazy ingestion first so the snapshot being annotated reflects the
/// moment of the report; a reader failure aborts the whole operation and
/// nothing is recorded. The annotated snapshot is appended as a new row,
/// the shared deadline is reset to now (clobbering any previous one), and
/// the originating message is edited in place to prompt for a location.
pub async fn record_result(
    ctx: &BotContext,
    choice: ResultChoice,
    author: &str,
    chat_id: i64,
    message_id: i64,
) -> Result<(), BotError> {
    let current = ingest::ingest(
        &ctx.pool,
        &ctx.weather,
        &ctx.water,
        &ctx.ingest_cache,
        ctx.retention_rows,
    )
    .await?;

    let params = annotate_with_result(&current, choice, author);
    let saved = ingest::save_with_retention(&ctx.pool, params, ctx.retention_rows).await?;
    tracing::info!(
        author,
        label = choice.label(),
        timestamp_ms = saved.timestamp_ms,
        "Recorded catch result"
    );

    {
        let mut conv = ctx.conversation.lock().await;
        conv.awaiting_location_since = Some(Utc::now());
    }

    let text = format!(
        "Your result today: {}! Thanks for the report, {}. \
         Now share your location (attach → Location) within the next \
         couple of minutes and I'll pin it to the report.",
        choice.label(),
        author,
    );
    ctx.telegram
        .edit_message_text(chat_id, message_id, &text)
        .await
}

/// Attach a location to the most recent snapshot if the awaiting-location
/// window is still open.
///
/// Returns `Ok(false)` when the window has expired or no result is pending;
/// the store is not touched in that case.
pub async fn record_location(
    ctx: &BotContext,
    latitude: f64,
    longitude: f64,
    now: DateTime<Utc>,
) -> Result<bool, BotError> {
    let accept = {
        let mut conv = ctx.conversation.lock().await;
        if within_window(conv.awaiting_location_since, now) {
            // Location received closes the window
            conv.awaiting_location_since = None;
            true
        } else {
            false
        }
    };
    if !accept {
        tracing::debug!("Location outside awaiting window, ignoring");
        return Ok(false);
    }

    let Some(current) = queries::latest_snapshot(&ctx.pool).await? else {
        tracing::warn!("Location accepted but snapshot store is empty");
        return Ok(false);
    };

    let params = annotate_with_location(&current, latitude, longitude);
    let saved = ingest::save_with_retention(&ctx.pool, params, ctx.retention_rows).await?;
    tracing::info!(
        latitude,
        longitude,
        timestamp_ms = saved.timestamp_ms,
        "Attached location to catch result"
    );
    Ok(true)
}

/// Copy the current snapshot into insert params with the result fields set
/// and a fresh timestamp. The store is append-only; this is how a snapshot
/// "mutates".
fn annotate_with_result(
    current: &crate::db::models::Snapshot,
    choice: ResultChoice,
    author: &str,
) -> InsertSnapshotParams {
    InsertSnapshotParams {
        timestamp_ms: Utc::now().timestamp_millis(),
        country: current.country.clone(),
        city: current.city.clone(),
        temperature_c: current.temperature_c,
        feels_like_c: current.feels_like_c,
        humidity_pct: current.humidity_pct,
        pressure_hpa: current.pressure_hpa,
        wind_direction_deg: current.wind_direction_deg,
        wind_speed_ms: current.wind_speed_ms,
        water_level_cm: current.water_level_cm,
        water_delta_cm: current.water_delta_cm,
        result_label: Some(choice.label().to_string()),
        result_author: Some(author.to_string()),
        result_latitude: current.result_latitude,
        result_longitude: current.result_longitude,
    }
}

/// Copy the current snapshot into insert params with the location set and a
/// fresh timestamp.
fn annotate_with_location(
    current: &crate::db::models::Snapshot,
    latitude: f64,
    longitude: f64,
) -> InsertSnapshotParams {
    InsertSnapshotParams {
        timestamp_ms: Utc::now().timestamp_millis(),
        country: current.country.clone(),
        city: current.city.clone(),
        temperature_c: current.temperature_c,
        feels_like_c: current.feels_like_c,
        humidity_pct: current.humidity_pct,
        pressure_hpa: current.pressure_hpa,
        wind_direction_deg: current.wind_direction_deg,
        wind_speed_ms: current.wind_speed_ms,
        water_level_cm: current.water_level_cm,
        water_delta_cm: current.water_delta_cm,
        result_label: current.result_label.clone(),
        result_author: current.result_author.clone(),
        result_latitude: Some(f64_to_decimal_full(latitude)),
        result_longitude: Some(f64_to_decimal_full(longitude)),
    }
}
