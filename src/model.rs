//! Data models for groundwatch.
//!
//! Two station shapes exist on purpose:
//!
//! - [`StationRecord`]: whatever an upstream provider handed us, every field
//!   optional and possibly spelled several ways.
//! - [`Station`]: the canonical record produced by
//!   [`normalize_station`](crate::normalize::normalize_station). Everything the
//!   API returns is built from this shape.

use chrono::{DateTime, NaiveDate, Utc};
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Upstream resource category that produced a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceDomain {
    /// Groundwater level time series (depth to water).
    GwLevelTs,
    /// Rainfall gauges.
    Rainfall,
    /// Groundwater quality sampling.
    WaterQuality,
}

impl SourceDomain {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceDomain::GwLevelTs => "gw_level_ts",
            SourceDomain::Rainfall => "rainfall",
            SourceDomain::WaterQuality => "water_quality",
        }
    }
}

/// Operational status of a monitoring station.
///
/// Providers speak different vocabularies (the CGWB feed reports
/// `Critical`/`Warning`/`Active`, NWIC and the synthetic roster report
/// `Active`/`Inactive`/`Maintenance`). Every label is funnelled through
/// [`StationStatus::from_label`] so the rest of the crate sees one enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StationStatus {
    Active,
    Warning,
    Critical,
    Inactive,
    Maintenance,
}

impl StationStatus {
    /// Map a provider status label onto the unified vocabulary.
    ///
    /// Returns `None` for labels the table does not know; callers then fall
    /// back to freshness.
    pub fn from_label(label: &str) -> Option<Self> {
        let label = label.trim().to_ascii_lowercase();
        let status = match label.as_str() {
            "active" | "normal" | "online" | "functional" | "working" => StationStatus::Active,
            "warning" | "alert" | "watch" => StationStatus::Warning,
            "critical" | "danger" | "severe" => StationStatus::Critical,
            "inactive" | "offline" | "stale" | "non-functional" | "nonfunctional" | "closed" => {
                StationStatus::Inactive
            }
            "maintenance" | "under maintenance" | "under_maintenance" | "repair" => {
                StationStatus::Maintenance
            }
            _ => return None,
        };
        Some(status)
    }

    pub fn label(&self) -> &'static str {
        match self {
            StationStatus::Active => "Active",
            StationStatus::Warning => "Warning",
            StationStatus::Critical => "Critical",
            StationStatus::Inactive => "Inactive",
            StationStatus::Maintenance => "Maintenance",
        }
    }
}

/// A coordinate pair nested under `location` in some upstream payloads.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    #[serde(default, deserialize_with = "lenient_f64")]
    pub latitude: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub longitude: Option<f64>,
}

/// A station record as delivered by a provider, before normalization.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StationRecord {
    #[serde(default, deserialize_with = "lenient_string")]
    pub id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub district: Option<String>,

    #[serde(default, deserialize_with = "lenient_f64")]
    pub latitude: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub longitude: Option<f64>,
    #[serde(default)]
    pub location: Option<GeoPoint>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub lat: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub lng: Option<f64>,

    /// Domain-generic level; rainfall when the record came from a rainfall resource.
    #[serde(default, deserialize_with = "lenient_f64")]
    pub current_level: Option<f64>,
    /// Depth to groundwater. Never populated from rainfall.
    #[serde(default, deserialize_with = "lenient_f64")]
    pub current_water_level: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub level: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub rainfall: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub depth: Option<f64>,

    /// Provider status label, any vocabulary.
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub aquifer_type: Option<String>,
    #[serde(default)]
    pub last_updated: Option<String>,
    #[serde(default)]
    pub source_domain: Option<SourceDomain>,
}

/// Canonical monitoring station.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Station {
    pub id: String,
    pub name: String,
    pub state: String,
    pub district: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub current_level: f64,
    pub current_water_level: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rainfall: Option<f64>,
    pub depth: Option<f64>,
    pub status: StationStatus,
    pub aquifer_type: Option<String>,
    pub last_updated: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_domain: Option<SourceDomain>,
}

impl Station {
    /// Whether the station can be placed on a map.
    pub fn has_coordinates(&self) -> bool {
        self.latitude.is_some() && self.longitude.is_some()
    }

    /// The groundwater reading used for risk and drought math.
    pub fn groundwater_level(&self) -> f64 {
        self.current_water_level.unwrap_or(self.current_level)
    }
}

impl From<&Station> for StationRecord {
    fn from(station: &Station) -> Self {
        Self {
            id: Some(station.id.clone()),
            name: Some(station.name.clone()),
            state: Some(station.state.clone()),
            district: Some(station.district.clone()),
            latitude: station.latitude,
            longitude: station.longitude,
            location: None,
            lat: None,
            lng: None,
            current_level: Some(station.current_level),
            current_water_level: station.current_water_level,
            level: None,
            rainfall: station.rainfall,
            depth: station.depth,
            status: Some(station.status.label().to_string()),
            aquifer_type: station.aquifer_type.clone(),
            last_updated: Some(station.last_updated.to_rfc3339()),
            source_domain: station.source_domain,
        }
    }
}

/// One groundwater reading.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeSeriesReading {
    pub date: NaiveDate,
    /// Depth to water below ground level, metres.
    pub level: f64,
    /// Total well depth, metres.
    pub depth: Option<f64>,
}

/// Rainfall aggregated to one calendar date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RainfallObservation {
    pub date: NaiveDate,
    pub rainfall_mm: f64,
}

/// Rainfall scope for [`get_rainfall_data`](crate::service::DataService::get_rainfall_data).
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct RainfallQuery {
    pub state: Option<String>,
    pub district: Option<String>,
    pub year: Option<i32>,
}

impl RainfallQuery {
    /// Human-readable scope key (district, else state, else "all").
    pub fn scope(&self) -> &str {
        self.district
            .as_deref()
            .or(self.state.as_deref())
            .unwrap_or("all")
    }
}

/// Coarse drinking-water suitability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum QualityClass {
    Good,
    Acceptable,
    Poor,
}

/// A groundwater quality sample.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WaterQuality {
    pub station_id: String,
    pub sampled_on: NaiveDate,
    pub ph: Option<f64>,
    /// Total dissolved solids, mg/L.
    pub tds: Option<f64>,
    /// µS/cm.
    pub electrical_conductivity: Option<f64>,
    pub nitrate: Option<f64>,
    pub fluoride: Option<f64>,
    pub arsenic: Option<f64>,
    pub iron: Option<f64>,
    pub chloride: Option<f64>,
    pub hardness: Option<f64>,
}

impl WaterQuality {
    /// Classify against BIS 10500 drinking-water limits.
    ///
    /// - `Poor`: fluoride > 1.5, nitrate > 45, arsenic > 0.01 or TDS > 2000 (mg/L)
    /// - `Acceptable`: TDS > 500 or pH outside 6.5–8.5
    /// - `Good`: otherwise
    pub fn classification(&self) -> QualityClass {
        let exceeds = |value: Option<f64>, limit: f64| value.is_some_and(|v| v > limit);

        if exceeds(self.fluoride, 1.5)
            || exceeds(self.nitrate, 45.0)
            || exceeds(self.arsenic, 0.01)
            || exceeds(self.tds, 2000.0)
        {
            QualityClass::Poor
        } else if exceeds(self.tds, 500.0) || self.ph.is_some_and(|ph| !(6.5..=8.5).contains(&ph)) {
            QualityClass::Acceptable
        } else {
            QualityClass::Good
        }
    }
}

/// Per-state station statistics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StateStats {
    pub state: String,
    pub total_stations: usize,
    pub active_stations: usize,
    pub critical_stations: usize,
    pub avg_water_level: f64,
    #[serde(default)]
    pub avg_rainfall: Option<f64>,
}

/// Drought severity for a district, ordered from least to most severe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum DroughtSeverity {
    Normal,
    Moderate,
    Severe,
}

/// Drought indicators for one district.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DroughtRecord {
    pub state: String,
    pub district: String,
    pub avg_rainfall: f64,
    pub avg_water_level: f64,
    pub rainfall_deficit: bool,
    pub groundwater_decline: bool,
    pub severity: DroughtSeverity,
}

/// Depletion risk bands, by utilization of well depth.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Low,
    Moderate,
    High,
    Critical,
}

/// Derived risk assessment for a station.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RiskAssessment {
    pub station_id: String,
    pub risk_level: RiskLevel,
    /// 0–100.
    pub risk_score: u8,
    /// `currentWaterLevel / depth`.
    pub utilization_rate: f64,
    pub factors: Vec<String>,
    pub recommendations: Vec<String>,
}

/// A forecast point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Prediction {
    pub date: NaiveDate,
    pub predicted_level: f64,
    pub lower_bound: f64,
    pub upper_bound: f64,
    /// 0–1, decays with horizon.
    pub confidence: f64,
}

/// Direction of the recent groundwater trend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Trend {
    Improving,
    Stable,
    Declining,
}

/// Rule-based insight bundle for one station.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StationInsights {
    pub station_id: String,
    pub trend: Trend,
    pub risk_level: RiskLevel,
    pub summary: String,
    pub insights: Vec<String>,
    pub generated_at: DateTime<Utc>,
}

/// Network-wide summary for the dashboard screen.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    pub total_stations: usize,
    pub active_stations: usize,
    pub critical_stations: usize,
    pub warning_stations: usize,
    pub inactive_stations: usize,
    pub avg_water_level: f64,
    /// June through October.
    pub monsoon_active: bool,
    pub data_source: String,
    pub generated_at: DateTime<Utc>,
}

/// Where the current station list came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataSource {
    Nwic,
    Government,
    Mock,
}

impl DataSource {
    pub fn label(&self) -> &'static str {
        match self {
            DataSource::Nwic => "NWIC (India-WRIS)",
            DataSource::Government => "Government API",
            DataSource::Mock => "Simulated",
        }
    }
}

/// Cache and provider status for the settings screen.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataSourceInfo {
    pub use_real_data: bool,
    pub data_source: Option<String>,
    pub providers: Vec<String>,
    pub cached_stations: usize,
    pub last_fetch: Option<DateTime<Utc>>,
    pub cache_age_seconds: Option<u64>,
    pub cache_valid: bool,
}

/// Station list filter; every set field must match.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StationFilter {
    pub state: Option<String>,
    pub district: Option<String>,
    #[serde(default, deserialize_with = "status_label")]
    pub status: Option<StationStatus>,
    pub min_level: Option<f64>,
    pub max_level: Option<f64>,
}

impl StationFilter {
    pub fn matches(&self, station: &Station) -> bool {
        let text_eq = |want: &Option<String>, have: &str| {
            want.as_deref()
                .is_none_or(|w| w.trim().eq_ignore_ascii_case(have.trim()))
        };

        text_eq(&self.state, &station.state)
            && text_eq(&self.district, &station.district)
            && self.status.is_none_or(|s| s == station.status)
            && self.min_level.is_none_or(|min| station.current_level >= min)
            && self.max_level.is_none_or(|max| station.current_level <= max)
    }
}

/// Status labels in any case or spelling [`StationStatus::from_label`] knows.
fn status_label<'de, D>(deserializer: D) -> Result<Option<StationStatus>, D::Error>
where
    D: Deserializer<'de>,
{
    let label: Option<String> = Option::deserialize(deserializer)?;
    label
        .map(|label| {
            StationStatus::from_label(&label)
                .ok_or_else(|| D::Error::custom(format!("unknown station status `{label}`")))
        })
        .transpose()
}

/// Accept numbers, numeric strings, or null.
pub(crate) fn lenient_f64<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value: Option<Value> = Option::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(value_as_f64))
}

/// Accept strings or numbers (station codes are sometimes numeric).
pub(crate) fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value: Option<Value> = Option::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(value_as_string))
}

pub(crate) fn value_as_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
    .filter(|v| v.is_finite())
}

pub(crate) fn value_as_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_status_mapping_table() {
        assert_eq!(StationStatus::from_label("Active"), Some(StationStatus::Active));
        assert_eq!(StationStatus::from_label("normal"), Some(StationStatus::Active));
        assert_eq!(StationStatus::from_label("CRITICAL"), Some(StationStatus::Critical));
        assert_eq!(StationStatus::from_label("Warning"), Some(StationStatus::Warning));
        assert_eq!(StationStatus::from_label("offline"), Some(StationStatus::Inactive));
        assert_eq!(
            StationStatus::from_label(" Under Maintenance "),
            Some(StationStatus::Maintenance)
        );
        assert_eq!(StationStatus::from_label("unknown"), None);
    }

    #[test]
    fn test_record_accepts_loose_upstream_shapes() {
        let record: StationRecord = serde_json::from_value(json!({
            "id": 1201,
            "lat": "26.91",
            "lng": 75.78,
            "location": { "latitude": null, "longitude": "75.8" },
            "level": "12.5",
            "depth": "not a number",
            "sourceDomain": "gw_level_ts"
        }))
        .unwrap();

        assert_eq!(record.id.as_deref(), Some("1201"));
        assert_eq!(record.lat, Some(26.91));
        assert_eq!(record.lng, Some(75.78));
        assert_eq!(record.location.unwrap().longitude, Some(75.8));
        assert_eq!(record.level, Some(12.5));
        assert_eq!(record.depth, None);
        assert_eq!(record.source_domain, Some(SourceDomain::GwLevelTs));
    }

    #[test]
    fn test_water_quality_classification() {
        let mut sample = WaterQuality {
            station_id: "S1".to_string(),
            sampled_on: NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
            ph: Some(7.2),
            tds: Some(320.0),
            electrical_conductivity: None,
            nitrate: Some(12.0),
            fluoride: Some(0.6),
            arsenic: None,
            iron: None,
            chloride: None,
            hardness: None,
        };
        assert_eq!(sample.classification(), QualityClass::Good);

        sample.tds = Some(900.0);
        assert_eq!(sample.classification(), QualityClass::Acceptable);

        sample.fluoride = Some(2.1);
        assert_eq!(sample.classification(), QualityClass::Poor);
    }

    #[test]
    fn test_filter_is_and_combined() {
        let station = Station {
            id: "RJ001".to_string(),
            name: "Jaipur DWLR 1".to_string(),
            state: "Rajasthan".to_string(),
            district: "Jaipur".to_string(),
            latitude: Some(26.9),
            longitude: Some(75.8),
            current_level: 18.0,
            current_water_level: Some(18.0),
            rainfall: None,
            depth: Some(60.0),
            status: StationStatus::Active,
            aquifer_type: None,
            last_updated: Utc::now(),
            source_domain: None,
        };

        let filter = StationFilter {
            state: Some("rajasthan".to_string()),
            min_level: Some(10.0),
            max_level: Some(20.0),
            ..Default::default()
        };
        assert!(filter.matches(&station));

        let filter = StationFilter {
            state: Some("Rajasthan".to_string()),
            status: Some(StationStatus::Inactive),
            ..Default::default()
        };
        assert!(!filter.matches(&station));

        let filter = StationFilter {
            max_level: Some(17.9),
            ..Default::default()
        };
        assert!(!filter.matches(&station));
    }

    #[test]
    fn test_filter_status_uses_label_table() {
        let filter: StationFilter = serde_json::from_value(json!({ "status": "active" })).unwrap();
        assert_eq!(filter.status, Some(StationStatus::Active));

        let filter: StationFilter =
            serde_json::from_value(json!({ "status": "Under Maintenance", "minLevel": 2.0 })).unwrap();
        assert_eq!(filter.status, Some(StationStatus::Maintenance));
        assert_eq!(filter.min_level, Some(2.0));

        let filter: StationFilter = serde_json::from_value(json!({})).unwrap();
        assert_eq!(filter.status, None);

        assert!(serde_json::from_value::<StationFilter>(json!({ "status": "Flooded" })).is_err());
    }
}
