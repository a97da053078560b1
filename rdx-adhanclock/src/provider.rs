//! Timetable providers.
//!
//! The engine only needs `fetch_timetable`. Any failure, including a
//! response with a missing prayer time, means "no timetable" until the next
//! successful fetch.

use crate::config::ProviderConfig;
use crate::error::{AdhanError, Result};
use crate::timetable::{DailyTimetable, HijriDate, LocationInfo, Timetable};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::future::Future;
use std::time::Duration;
use tracing::debug;

/// What to fetch a timetable for.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LocationQuery {
    Coordinates { latitude: f64, longitude: f64 },
    Address { address: String },
}

impl LocationQuery {
    pub fn address(address: impl Into<String>) -> Self {
        LocationQuery::Address {
            address: address.into(),
        }
    }
}

/// A source of daily timetables.
pub trait TimetableProvider: Send + Sync {
    fn fetch_timetable(
        &self,
        query: &LocationQuery,
    ) -> impl Future<Output = Result<DailyTimetable>> + Send;
}

/// Serves one fixed timetable, e.g. from configuration.
#[derive(Debug, Clone, Default)]
pub struct StaticProvider {
    daily: Option<DailyTimetable>,
}

impl StaticProvider {
    pub fn new(daily: Option<DailyTimetable>) -> Self {
        Self { daily }
    }
}

impl TimetableProvider for StaticProvider {
    async fn fetch_timetable(&self, _query: &LocationQuery) -> Result<DailyTimetable> {
        self.daily.clone().ok_or(AdhanError::MissingTimetable)
    }
}

/// Client for the Aladhan timings API.
#[derive(Debug, Clone)]
pub struct AladhanProvider {
    client: reqwest::Client,
    base_url: String,
    method: u8,
}

impl AladhanProvider {
    pub fn new(config: &ProviderConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            method: config.method,
        })
    }
}

impl TimetableProvider for AladhanProvider {
    async fn fetch_timetable(&self, query: &LocationQuery) -> Result<DailyTimetable> {
        let request = match query {
            LocationQuery::Coordinates {
                latitude,
                longitude,
            } => self
                .client
                .get(format!("{}/timings", self.base_url))
                .query(&[
                    ("latitude", latitude.to_string()),
                    ("longitude", longitude.to_string()),
                    ("method", self.method.to_string()),
                ]),
            LocationQuery::Address { address } => self
                .client
                .get(format!("{}/timingsByAddress", self.base_url))
                .query(&[("address", address.as_str())]),
        };
        debug!(?query, "Requesting timetable.");
        let body = request
            .header("Accept", "application/json")
            .send()
            .await?
            .text()
            .await?;
        decode_response(&body, query)
    }
}

// --- Wire format ---

#[derive(Debug, Deserialize)]
struct Envelope {
    code: u16,
    #[serde(default)]
    status: String,
    data: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct DayData {
    timings: HashMap<String, String>,
    date: Option<DateData>,
    meta: Option<MetaData>,
}

#[derive(Debug, Deserialize)]
struct DateData {
    hijri: Option<HijriData>,
}

#[derive(Debug, Deserialize)]
struct HijriData {
    day: String,
    month: HijriMonth,
    year: String,
}

#[derive(Debug, Deserialize)]
struct HijriMonth {
    en: String,
    #[serde(default)]
    ar: String,
}

#[derive(Debug, Deserialize)]
struct MetaData {
    latitude: Option<f64>,
    longitude: Option<f64>,
    timezone: Option<String>,
}

/// Decodes a timings response body into a validated timetable.
pub(crate) fn decode_response(body: &str, query: &LocationQuery) -> Result<DailyTimetable> {
    let envelope: Envelope = serde_json::from_str(body)
        .map_err(|e| AdhanError::Provider(format!("unreadable response: {e}")))?;
    if envelope.code != 200 {
        let detail = match &envelope.data {
            serde_json::Value::String(message) => message.clone(),
            _ => envelope.status.clone(),
        };
        return Err(AdhanError::Provider(format!(
            "service answered {}: {detail}",
            envelope.code
        )));
    }
    let day: DayData = serde_json::from_value(envelope.data)
        .map_err(|e| AdhanError::Provider(format!("unexpected response shape: {e}")))?;

    let timetable = Timetable::from_entries(&day.timings)?;
    let hijri = day.date.and_then(|date| date.hijri).map(|h| HijriDate {
        day: h.day,
        month_en: h.month.en,
        month_ar: h.month.ar,
        year: h.year,
    });
    let location = day.meta.map(|meta| location_from_meta(meta, query));

    Ok(DailyTimetable {
        timetable,
        hijri,
        location,
    })
}

/// City and country come from the zone name ("America/New_York" gives
/// "New York" and "America"); a searched address takes precedence as city.
fn location_from_meta(meta: MetaData, query: &LocationQuery) -> LocationInfo {
    let zone = meta.timezone.clone().unwrap_or_default();
    let zone_city = zone.rsplit('/').next().unwrap_or_default().replace('_', " ");
    let country = zone.split('/').next().unwrap_or_default().to_string();

    let (city, latitude, longitude) = match query {
        LocationQuery::Address { address } => (
            address.clone(),
            meta.latitude.unwrap_or_default(),
            meta.longitude.unwrap_or_default(),
        ),
        LocationQuery::Coordinates {
            latitude,
            longitude,
        } => (zone_city, *latitude, *longitude),
    };

    LocationInfo {
        city,
        country,
        latitude,
        longitude,
        timezone: meta.timezone,
    }
}
