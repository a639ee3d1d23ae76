//! Water-level gauge feed client.
//!
//! Fetches a small XML document from the configured gauge station and
//! normalizes it into a [`WaterReading`]. The feed looks like:
//!
//! ```xml
//! <gauge>
//!   <station>Tver, Volga</station>
//!   <level>312.0</level>
//!   <delta>-4.0</delta>
//! </gauge>
//! ```

use rust_decimal::Decimal;
use serde::Deserialize;

use crate::errors::BotError;
use crate::helpers::f64_to_decimal_1dp;

/// Client for a gauge-station XML feed.
#[derive(Debug, Clone)]
pub struct WaterLevelClient {
    client: reqwest::Client,
    feed_url: String,
}

/// A normalized water-level reading: absolute level and change since the
/// previous measurement, both in centimetres.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WaterReading {
    pub level_cm: Decimal,
    pub delta_cm: Decimal,
}

#[derive(Debug, Deserialize)]
struct GaugeFeed {
    level: f64,
    delta: f64,
}

impl WaterLevelClient {
    pub fn new(feed_url: &str) -> Self {
        let client = reqwest::Client::builder()
            .build()
            .expect("Failed to build HTTP client");
        Self {
            client,
            feed_url: feed_url.to_string(),
        }
    }

    /// Fetch the current water-level reading, or fail with
    /// `SourceUnavailable`.
    pub async fn fetch_current(&self) -> Result<WaterReading, BotError> {
        let response = self.client.get(&self.feed_url).send().await.map_err(|e| {
            BotError::SourceUnavailable(format!("water gauge request failed: {}", e))
        })?;

        if !response.status().is_success() {
            return Err(BotError::SourceUnavailable(format!(
                "water gauge returned HTTP {}",
                response.status()
            )));
        }

        let body = response.text().await.map_err(|e| {
            BotError::SourceUnavailable(format!("water gauge body read error: {}", e))
        })?;

        parse_gauge_feed(&body)
    }
}

/// Parse the gauge XML into a reading. Pure function, unit-tested without a
/// server.
pub fn parse_gauge_feed(xml: &str) -> Result<WaterReading, BotError> {
    let feed: GaugeFeed = quick_xml::de::from_str(xml)
        .map_err(|e| BotError::SourceUnavailable(format!("water gauge XML error: {}", e)))?;

    Ok(WaterReading {
        level_cm: f64_to_decimal_1dp(feed.level),
        delta_cm: f64_to_decimal_1dp(feed.delta),
    })
}
