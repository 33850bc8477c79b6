//! Government groundwater endpoints (CGWB, IMD and India-WRIS).
//!
//! Each capability lives at a fixed path under one of three hosts and
//! answers with a `{"data": ...}` envelope:
//!
//! | Capability | Host | Path |
//! |---|---|---|
//! | DWLR station list | CGWB | `/api/dwlr-stations` |
//! | Water-level history | CGWB | `/api/water-levels/{id}?days=` |
//! | Water quality | CGWB | `/api/water-quality/{id}` |
//! | State statistics | CGWB | `/api/state-stats/{state}` |
//! | Rainfall | IMD | `/api/rainfall?state=&district=&year=` |
//! | Drought monitor | India-WRIS | `/api/drought-monitor` |
//!
//! Every fetch returns either complete data or an error; a response without
//! `data` is [`ProviderError::MissingData`]. Requests share the service-wide
//! client, so a slow host surfaces as [`ProviderError::Timeout`].

use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use tracing::debug;

use super::StationProvider;
use super::fields::water_quality_from;
use crate::aggregation::{classify_drought, sum_by_date};
use crate::config::GovernmentConfig;
use crate::error::ProviderError;
use crate::freshness::parse_date;
use crate::model::{
    DataSource, DroughtRecord, DroughtSeverity, RainfallObservation, RainfallQuery, SourceDomain,
    StateStats, StationRecord, StationStatus, TimeSeriesReading, WaterQuality, lenient_f64,
    lenient_string,
};

/// Water level (m) below which a CGWB station is critical, unless the record says otherwise.
const DEFAULT_CRITICAL_LEVEL: f64 = 2.0;

/// Water level (m) below which a CGWB station needs attention.
const DEFAULT_NORMAL_LEVEL: f64 = 10.0;

/// Client for the fixed government endpoints.
#[derive(Clone)]
pub struct GovernmentApiClient {
    client: reqwest::Client,
    config: Arc<GovernmentConfig>,
}

impl GovernmentApiClient {
    pub fn new(client: reqwest::Client, config: GovernmentConfig) -> Self {
        Self {
            client,
            config: Arc::new(config),
        }
    }

    /// GET `url` and unwrap the `data` envelope.
    async fn get_data<T: DeserializeOwned>(&self, url: &str) -> Result<T, ProviderError> {
        debug!(url, "government API request");
        let response = self.client.get(url).send().await?;
        let envelope: Envelope<T> = crate::http::read_json(response).await?;
        envelope.data.ok_or(ProviderError::MissingData)
    }

    fn cgwb(&self, path: &str) -> String {
        join_url(&self.config.cgwb_base_url, path)
    }

    /// Fetch the DWLR (digital water level recorder) station list.
    pub async fn fetch_dwlr_stations(&self) -> Result<Vec<StationRecord>, ProviderError> {
        let raw: Vec<CgwbStation> = self.get_data(&self.cgwb("/api/dwlr-stations")).await?;
        Ok(raw.into_iter().filter_map(transform_station).collect())
    }

    /// Fetch recent water-level readings for one station.
    pub async fn fetch_water_levels(
        &self,
        station_id: &str,
        days: u32,
    ) -> Result<Vec<TimeSeriesReading>, ProviderError> {
        let url = self.cgwb(&format!(
            "/api/water-levels/{}?days={}",
            urlencoding::encode(station_id),
            days
        ));
        let raw: Vec<CgwbReading> = self.get_data(&url).await?;

        Ok(raw
            .into_iter()
            .filter_map(|r| {
                Some(TimeSeriesReading {
                    date: r.date.as_deref().and_then(parse_date)?,
                    level: r.water_level?,
                    depth: r.depth,
                })
            })
            .collect())
    }

    /// Fetch daily rainfall from IMD, summed per date.
    pub async fn fetch_rainfall(
        &self,
        query: &RainfallQuery,
    ) -> Result<Vec<RainfallObservation>, ProviderError> {
        let mut params = Vec::new();
        if let Some(state) = &query.state {
            params.push(format!("state={}", urlencoding::encode(state)));
        }
        if let Some(district) = &query.district {
            params.push(format!("district={}", urlencoding::encode(district)));
        }
        if let Some(year) = query.year {
            params.push(format!("year={year}"));
        }

        let mut path = "/api/rainfall".to_string();
        if !params.is_empty() {
            path.push('?');
            path.push_str(&params.join("&"));
        }

        let raw: Vec<ImdRainfall> = self
            .get_data(&join_url(&self.config.imd_base_url, &path))
            .await?;

        Ok(sum_by_date(raw.into_iter().filter_map(|r| {
            Some((r.date.as_deref().and_then(parse_date)?, r.rainfall?))
        })))
    }

    /// Fetch the latest water-quality sample for one station.
    pub async fn fetch_water_quality(&self, station_id: &str) -> Result<WaterQuality, ProviderError> {
        let url = self.cgwb(&format!(
            "/api/water-quality/{}",
            urlencoding::encode(station_id)
        ));
        let raw: Map<String, Value> = self.get_data(&url).await?;
        water_quality_from(station_id, &raw).ok_or(ProviderError::MissingData)
    }

    /// Fetch CGWB's own statistics for one state.
    pub async fn fetch_state_stats(&self, state: &str) -> Result<StateStats, ProviderError> {
        let url = self.cgwb(&format!("/api/state-stats/{}", urlencoding::encode(state)));
        let raw: CgwbStateStats = self.get_data(&url).await?;

        let count = |v: Option<f64>| v.map(|n| n.max(0.0) as usize).unwrap_or(0);
        Ok(StateStats {
            state: raw.state.unwrap_or_else(|| state.trim().to_string()),
            total_stations: count(raw.total_stations),
            active_stations: count(raw.active_stations),
            critical_stations: count(raw.critical_stations),
            avg_water_level: raw.avg_water_level.unwrap_or(0.0),
            avg_rainfall: raw.avg_rainfall,
        })
    }

    /// Fetch the India-WRIS drought monitor.
    ///
    /// A record's own severity label wins; otherwise severity is derived from
    /// its deficit and decline flags.
    pub async fn fetch_drought_monitor(&self) -> Result<Vec<DroughtRecord>, ProviderError> {
        let raw: Vec<WrisDrought> = self
            .get_data(&join_url(&self.config.wris_base_url, "/api/drought-monitor"))
            .await?;

        Ok(raw
            .into_iter()
            .filter_map(|r| {
                let district = r.district?;
                let rainfall_deficit = r.rainfall_deficit.unwrap_or(false);
                let groundwater_decline = r.groundwater_decline.unwrap_or(false);
                let severity = r
                    .severity
                    .as_deref()
                    .and_then(severity_from_label)
                    .unwrap_or_else(|| classify_drought(rainfall_deficit, groundwater_decline));

                Some(DroughtRecord {
                    state: r.state.unwrap_or_default(),
                    district,
                    avg_rainfall: r.avg_rainfall.unwrap_or(0.0),
                    avg_water_level: r.avg_water_level.unwrap_or(0.0),
                    rainfall_deficit,
                    groundwater_decline,
                    severity,
                })
            })
            .collect())
    }
}

#[async_trait]
impl StationProvider for GovernmentApiClient {
    fn source(&self) -> DataSource {
        DataSource::Government
    }

    async fn stations(&self) -> Result<Vec<StationRecord>, ProviderError> {
        self.fetch_dwlr_stations().await
    }

    async fn water_levels(
        &self,
        station_id: &str,
        days: u32,
    ) -> Result<Vec<TimeSeriesReading>, ProviderError> {
        self.fetch_water_levels(station_id, days).await
    }

    async fn rainfall(
        &self,
        query: &RainfallQuery,
    ) -> Result<Vec<RainfallObservation>, ProviderError> {
        self.fetch_rainfall(query).await
    }

    async fn water_quality(&self, station_id: &str) -> Result<Option<WaterQuality>, ProviderError> {
        self.fetch_water_quality(station_id).await.map(Some)
    }

    async fn state_stats(&self, state: &str) -> Result<Option<StateStats>, ProviderError> {
        self.fetch_state_stats(state).await.map(Some)
    }

    async fn drought(&self) -> Result<Vec<DroughtRecord>, ProviderError> {
        self.fetch_drought_monitor().await
    }
}

/// Classify a CGWB station by its water level.
///
/// Below `critical_level` (default 2 m) is `Critical`, below `normal_level`
/// (default 10 m) is `Warning`, anything else (including no reading) is
/// `Active`.
pub fn determine_status(station: &CgwbStation) -> StationStatus {
    let Some(level) = station.water_level else {
        return StationStatus::Active;
    };
    let critical = station.critical_level.unwrap_or(DEFAULT_CRITICAL_LEVEL);
    let normal = station.normal_level.unwrap_or(DEFAULT_NORMAL_LEVEL);

    if level < critical {
        StationStatus::Critical
    } else if level < normal {
        StationStatus::Warning
    } else {
        StationStatus::Active
    }
}

/// Convert a CGWB station into a [`StationRecord`]; `None` without an ID.
pub fn transform_station(raw: CgwbStation) -> Option<StationRecord> {
    let status = determine_status(&raw);
    Some(StationRecord {
        id: Some(raw.station_id?),
        name: raw.station_name,
        state: raw.state,
        district: raw.district,
        latitude: raw.latitude,
        longitude: raw.longitude,
        current_level: raw.water_level,
        current_water_level: raw.water_level,
        depth: raw.well_depth,
        status: Some(status.label().to_string()),
        aquifer_type: raw.aquifer_type,
        last_updated: raw.last_updated,
        source_domain: Some(SourceDomain::GwLevelTs),
        ..Default::default()
    })
}

fn severity_from_label(label: &str) -> Option<DroughtSeverity> {
    match label.trim().to_ascii_lowercase().as_str() {
        "severe" | "extreme" => Some(DroughtSeverity::Severe),
        "moderate" | "mild" => Some(DroughtSeverity::Moderate),
        "normal" | "none" => Some(DroughtSeverity::Normal),
        _ => None,
    }
}

fn join_url(base: &str, path: &str) -> String {
    format!("{}{}", base.trim_end_matches('/'), path)
}

// ============================================================================
// Response Types
// ============================================================================

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    data: Option<T>,
}

/// A station as reported by the CGWB DWLR feed.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CgwbStation {
    #[serde(default, alias = "id", alias = "stationId", deserialize_with = "lenient_string")]
    pub station_id: Option<String>,
    #[serde(default, alias = "name", alias = "stationName")]
    pub station_name: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub district: Option<String>,
    #[serde(default, alias = "lat", deserialize_with = "lenient_f64")]
    pub latitude: Option<f64>,
    #[serde(default, alias = "lon", alias = "lng", deserialize_with = "lenient_f64")]
    pub longitude: Option<f64>,
    /// Depth to water, metres below ground.
    #[serde(default, alias = "waterLevel", deserialize_with = "lenient_f64")]
    pub water_level: Option<f64>,
    #[serde(default, alias = "depth", alias = "wellDepth", deserialize_with = "lenient_f64")]
    pub well_depth: Option<f64>,
    #[serde(default, alias = "criticalLevel", deserialize_with = "lenient_f64")]
    pub critical_level: Option<f64>,
    #[serde(default, alias = "normalLevel", deserialize_with = "lenient_f64")]
    pub normal_level: Option<f64>,
    #[serde(default, alias = "aquiferType")]
    pub aquifer_type: Option<String>,
    #[serde(default, alias = "lastUpdated", alias = "timestamp")]
    pub last_updated: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CgwbReading {
    #[serde(default, alias = "timestamp")]
    date: Option<String>,
    #[serde(default, alias = "level", alias = "waterLevel", deserialize_with = "lenient_f64")]
    water_level: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    depth: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct ImdRainfall {
    #[serde(default)]
    date: Option<String>,
    #[serde(default, alias = "rainfall_mm", deserialize_with = "lenient_f64")]
    rainfall: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct CgwbStateStats {
    #[serde(default)]
    state: Option<String>,
    #[serde(default, alias = "totalStations", deserialize_with = "lenient_f64")]
    total_stations: Option<f64>,
    #[serde(default, alias = "activeStations", deserialize_with = "lenient_f64")]
    active_stations: Option<f64>,
    #[serde(default, alias = "criticalStations", deserialize_with = "lenient_f64")]
    critical_stations: Option<f64>,
    #[serde(default, alias = "avgWaterLevel", deserialize_with = "lenient_f64")]
    avg_water_level: Option<f64>,
    #[serde(default, alias = "avgRainfall", deserialize_with = "lenient_f64")]
    avg_rainfall: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct WrisDrought {
    #[serde(default)]
    state: Option<String>,
    #[serde(default)]
    district: Option<String>,
    #[serde(default, alias = "avgRainfall", deserialize_with = "lenient_f64")]
    avg_rainfall: Option<f64>,
    #[serde(default, alias = "avgWaterLevel", deserialize_with = "lenient_f64")]
    avg_water_level: Option<f64>,
    #[serde(default, alias = "rainfallDeficit")]
    rainfall_deficit: Option<bool>,
    #[serde(default, alias = "groundwaterDecline")]
    groundwater_decline: Option<bool>,
    #[serde(default)]
    severity: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn cgwb(value: Value) -> CgwbStation {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_determine_status_thresholds() {
        assert_eq!(determine_status(&cgwb(json!({ "water_level": 1.5 }))), StationStatus::Critical);
        assert_eq!(determine_status(&cgwb(json!({ "water_level": 6.0 }))), StationStatus::Warning);
        assert_eq!(determine_status(&cgwb(json!({ "water_level": 10.0 }))), StationStatus::Active);
        assert_eq!(determine_status(&cgwb(json!({}))), StationStatus::Active);

        let custom = cgwb(json!({ "water_level": 4.0, "critical_level": 5, "normal_level": "8" }));
        assert_eq!(determine_status(&custom), StationStatus::Critical);
    }

    #[test]
    fn test_transform_station() {
        let raw = cgwb(json!({
            "id": 4521,
            "name": "Kota DWLR",
            "state": "Rajasthan",
            "district": "Kota",
            "lat": "25.18",
            "lng": 75.83,
            "water_level": 7.2,
            "depth": 90,
            "timestamp": "2024-07-10T06:00:00Z"
        }));

        let record = transform_station(raw).unwrap();
        assert_eq!(record.id.as_deref(), Some("4521"));
        assert_eq!(record.latitude, Some(25.18));
        assert_eq!(record.current_water_level, Some(7.2));
        assert_eq!(record.depth, Some(90.0));
        assert_eq!(record.status.as_deref(), Some("Warning"));
        assert_eq!(record.source_domain, Some(SourceDomain::GwLevelTs));

        assert!(transform_station(cgwb(json!({ "name": "anonymous" }))).is_none());
    }

    #[test]
    fn test_severity_labels() {
        assert_eq!(severity_from_label("Severe"), Some(DroughtSeverity::Severe));
        assert_eq!(severity_from_label(" mild "), Some(DroughtSeverity::Moderate));
        assert_eq!(severity_from_label("unknown"), None);
    }

    #[test]
    fn test_join_url_trims_trailing_slash() {
        assert_eq!(join_url("http://host/", "/api/x"), "http://host/api/x");
        assert_eq!(join_url("http://host", "/api/x"), "http://host/api/x");
    }
}
