//! OpenWeatherMap current-weather client.
//!
//! Fetches the current conditions for the configured city and normalizes
//! them into a [`WeatherReading`]. Numeric fields are rounded to one decimal
//! place so that unchanged upstream readings compare equal in dedup.

use rust_decimal::Decimal;
use serde::Deserialize;

use crate::errors::BotError;
use crate::helpers::f64_to_decimal_1dp;

/// Client for an OpenWeatherMap-compatible current-weather endpoint.
#[derive(Debug, Clone)]
pub struct WeatherClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    city: String,
}

/// A normalized weather reading.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WeatherReading {
    pub country: String,
    pub city: String,
    pub temperature_c: Decimal,
    pub feels_like_c: Decimal,
    pub humidity_pct: Decimal,
    pub pressure_hpa: Decimal,
    pub wind_direction_deg: Decimal,
    pub wind_speed_ms: Decimal,
}

// --- OpenWeatherMap JSON response types ---

#[derive(Debug, Deserialize)]
struct OwmResponse {
    name: String,
    sys: OwmSys,
    main: OwmMain,
    wind: OwmWind,
}

#[derive(Debug, Deserialize)]
struct OwmSys {
    country: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OwmMain {
    temp: f64,
    feels_like: f64,
    humidity: f64,
    pressure: f64,
}

#[derive(Debug, Deserialize)]
struct OwmWind {
    deg: Option<f64>,
    speed: Option<f64>,
}

impl WeatherClient {
    pub fn new(base_url: &str, api_key: &str, city: &str) -> Self {
        let client = reqwest::Client::builder()
            .build()
            .expect("Failed to build HTTP client");
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            city: city.to_string(),
        }
    }

    /// Fetch the current weather reading, or fail with `SourceUnavailable`.
    pub async fn fetch_current(&self) -> Result<WeatherReading, BotError> {
        let url = format!(
            "{}?q={}&units=metric&appid={}",
            self.base_url, self.city, self.api_key
        );

        let response = self.client.get(&url).send().await.map_err(|e| {
            BotError::SourceUnavailable(format!("weather request failed: {}", e))
        })?;

        if !response.status().is_success() {
            return Err(BotError::SourceUnavailable(format!(
                "weather provider returned HTTP {}",
                response.status()
            )));
        }

        let body: OwmResponse = response.json().await.map_err(|e| {
            BotError::SourceUnavailable(format!("weather JSON parse error: {}", e))
        })?;

        Ok(normalize(body))
    }
}

/// Convert a raw provider response into a normalized reading.
fn normalize(body: OwmResponse) -> WeatherReading {
    WeatherReading {
        country: body.sys.country.unwrap_or_default(),
        city: body.name,
        temperature_c: f64_to_decimal_1dp(body.main.temp),
        feels_like_c: f64_to_decimal_1dp(body.main.feels_like),
        humidity_pct: f64_to_decimal_1dp(body.main.humidity),
        pressure_hpa: f64_to_decimal_1dp(body.main.pressure),
        wind_direction_deg: f64_to_decimal_1dp(body.wind.deg.unwrap_or(0.0)),
        wind_speed_ms: f64_to_decimal_1dp(body.wind.speed.unwrap_or(0.0)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;
    use wiremock::matchers::{method, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn sample_body() -> serde_json::Value {
        serde_json::json!({
            "name": "Tver",
            "sys": { "country": "RU" },
            "main": {
                "temp": 12.34,
                "feels_like": 10.91,
                "humidity": 81.0,
                "pressure": 1013.0
            },
            "wind": { "deg": 220.0, "speed": 4.56 }
        })
    }

    #[tokio::test]
    async fn test_fetch_current_normalizes_to_1dp() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(query_param("q", "Tver"))
            .and(query_param("appid", "key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(sample_body()))
            .mount(&server)
            .await;

        let client = WeatherClient::new(&server.uri(), "key", "Tver");
        let reading = client.fetch_current().await.unwrap();

        assert_eq!(reading.country, "RU");
        assert_eq!(reading.city, "Tver");
        assert_eq!(reading.temperature_c, Decimal::from_str("12.3").unwrap());
        assert_eq!(reading.feels_like_c, Decimal::from_str("10.9").unwrap());
        assert_eq!(reading.wind_speed_ms, Decimal::from_str("4.6").unwrap());
    }

    #[tokio::test]
    async fn test_fetch_current_http_error_is_source_unavailable() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let client = WeatherClient::new(&server.uri(), "key", "Tver");
        let err = client.fetch_current().await.unwrap_err();
        assert!(matches!(err, BotError::SourceUnavailable(_)));
    }

    #[tokio::test]
    async fn test_fetch_current_malformed_body_is_source_unavailable() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .mount(&server)
            .await;

        let client = WeatherClient::new(&server.uri(), "key", "Tver");
        let err = client.fetch_current().await.unwrap_err();
        assert!(matches!(err, BotError::SourceUnavailable(_)));
    }

    #[test]
    fn test_normalize_missing_wind_defaults_to_zero() {
        let body: OwmResponse = serde_json::from_value(serde_json::json!({
            "name": "Tver",
            "sys": {},
            "main": { "temp": 1.0, "feels_like": 0.5, "humidity": 90.0, "pressure": 1000.0 },
            "wind": {}
        }))
        .unwrap();
        let reading = normalize(body);
        assert_eq!(reading.wind_speed_ms, Decimal::ZERO);
        assert_eq!(reading.wind_direction_deg, Decimal::ZERO);
        assert_eq!(reading.country, "");
    }
}
