//! NWIC (National Water Informatics Centre) resource-query client.
//!
//! NWIC publishes groundwater level, rainfall and water-quality datasets
//! through one generic endpoint: each dataset is a *resource* addressed by
//! ID, and every query is a POST naming the resource, a filter object and a
//! record limit.
//!
//! # Wire Contract
//!
//! ```text
//! POST {base_url}
//! {"resource_id": "...", "filters": {...}, "limit": 1000}
//!
//! 200 {"result": {"records": [...]}}
//! 200 {"error": "..."}
//! ```
//!
//! Records use whatever column names the publishing agency chose, so every
//! logical field is resolved through a list of aliases.
//!
//! # Behaviour
//!
//! - Every query is a no-op unless real-data mode is on and a base URL is set.
//! - Failures are logged and absorbed; a failed resource contributes no records.
//! - Resource IDs for one domain are queried one after another with a pause
//!   between requests.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Datelike, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use tracing::{debug, warn};

use super::fields::{
    DISTRICT, GW_LEVEL, LATITUDE, LONGITUDE, OBSERVED_AT, RAINFALL, STATE, STATION_CODE,
    STATION_NAME, WELL_DEPTH, pick_date, pick_f64, pick_string, water_quality_from,
};
use super::{RealDataSwitch, StationProvider};
use crate::aggregation::{RainfallSample, drought_assessment, state_statistics, sum_by_date};
use crate::config::NwicConfig;
use crate::error::ProviderError;
use crate::freshness::{is_fresh_str_at, parse_timestamp};
use crate::model::{
    DataSource, DroughtRecord, RainfallObservation, RainfallQuery, SourceDomain, StateStats,
    StationRecord, TimeSeriesReading, WaterQuality,
};
use crate::normalize::normalize_all;

/// Known groundwater level (time series) resources.
const GW_LEVEL_RESOURCES: &[&str] = &[
    "a4c0a1d7-5b6e-4f0e-9b1a-2f8d3c7e6a01",
    "7d2f9c4e-1a3b-4c5d-8e9f-0a1b2c3d4e5f",
];

/// Known rainfall resources.
const RAINFALL_RESOURCES: &[&str] = &[
    "9e8d7c6b-5a4f-4e3d-2c1b-0a9f8e7d6c5b",
    "3b1c2d4e-6f7a-4b8c-9d0e-1f2a3b4c5d6e",
];

/// Known water-quality resources.
const WATER_QUALITY_RESOURCES: &[&str] = &["c5d6e7f8-a9b0-4c1d-8e2f-3a4b5c6d7e8f"];

const STATION_LIMIT: usize = 5000;
const RAINFALL_LIMIT: usize = 5000;
const WATER_QUALITY_LIMIT: usize = 100;

/// Client for the NWIC resource-query endpoint.
#[derive(Clone)]
pub struct NwicClient {
    client: reqwest::Client,
    config: Arc<NwicConfig>,
    switch: RealDataSwitch,
}

impl NwicClient {
    /// Create a client over a shared HTTP client.
    ///
    /// `switch` is the service-wide real-data flag; while it is off every
    /// query returns nothing without touching the network.
    pub fn new(client: reqwest::Client, config: NwicConfig, switch: RealDataSwitch) -> Self {
        Self {
            client,
            config: Arc::new(config),
            switch,
        }
    }

    /// Whether queries may be issued at all.
    pub fn is_active(&self) -> bool {
        self.readiness().is_ok()
    }

    fn readiness(&self) -> Result<&str, ProviderError> {
        if !self.switch.is_enabled() {
            return Err(ProviderError::Disabled);
        }
        self.config
            .base_url
            .as_deref()
            .ok_or(ProviderError::NotConfigured("GROUNDWATCH_NWIC_BASE_URL"))
    }

    /// Resource IDs for a domain: the configured override first, then the
    /// known seeds, without duplicates.
    pub fn resource_ids(&self, domain: SourceDomain) -> Vec<String> {
        let (overridden, seeds) = match domain {
            SourceDomain::GwLevelTs => (&self.config.resources.gw_level_ts, GW_LEVEL_RESOURCES),
            SourceDomain::Rainfall => (&self.config.resources.rainfall, RAINFALL_RESOURCES),
            SourceDomain::WaterQuality => {
                (&self.config.resources.water_quality, WATER_QUALITY_RESOURCES)
            }
        };

        let mut ids: Vec<String> = Vec::new();
        for id in overridden.iter().map(String::as_str).chain(seeds.iter().copied()) {
            let id = id.trim();
            if !id.is_empty() && !ids.iter().any(|known| known == id) {
                ids.push(id.to_string());
            }
        }
        ids
    }

    /// Query one resource.
    ///
    /// Returns an empty list when the client is inactive or `resource_id` is
    /// blank, and also on any failure (logged).
    pub async fn query_nwic(
        &self,
        resource_id: &str,
        filters: &Map<String, Value>,
        limit: usize,
    ) -> Vec<Value> {
        if resource_id.trim().is_empty() {
            return Vec::new();
        }

        match self.try_query(resource_id, filters, limit).await {
            Ok(records) => {
                debug!(resource_id, count = records.len(), "NWIC query complete");
                records
            }
            Err(e @ (ProviderError::Disabled | ProviderError::NotConfigured(_))) => {
                debug!(resource_id, reason = %e, "NWIC query skipped");
                Vec::new()
            }
            Err(e) => {
                warn!(resource_id, error = %e, "NWIC query failed");
                Vec::new()
            }
        }
    }

    async fn try_query(
        &self,
        resource_id: &str,
        filters: &Map<String, Value>,
        limit: usize,
    ) -> Result<Vec<Value>, ProviderError> {
        let url = self.readiness()?;
        let body = QueryRequest {
            resource_id,
            filters,
            limit,
        };

        let mut request = self.client.post(url).json(&body);
        if let Some(key) = &self.config.api_key {
            request = request.header("api-key", key);
        }

        let response: QueryResponse = crate::http::read_json(request.send().await?).await?;
        if let Some(error) = response.error.filter(|e| !e.is_null()) {
            let message = match error {
                Value::String(s) => s,
                other => other.to_string(),
            };
            return Err(ProviderError::Upstream(message));
        }

        Ok(response.result.map(|r| r.records).unwrap_or_default())
    }

    /// Query every resource known for `domain` and concatenate the records.
    ///
    /// Requests are sequential with the configured delay between them.
    pub async fn query_national(
        &self,
        domain: SourceDomain,
        filters: &Map<String, Value>,
        limit: usize,
    ) -> Vec<Value> {
        if !self.is_active() {
            return Vec::new();
        }

        let mut records = Vec::new();
        for (i, resource_id) in self.resource_ids(domain).iter().enumerate() {
            if i > 0 && !self.config.request_delay.is_zero() {
                tokio::time::sleep(self.config.request_delay).await;
            }
            records.extend(self.query_nwic(resource_id, filters, limit).await);
        }

        debug!(domain = domain.as_str(), count = records.len(), "NWIC national query");
        records
    }

    /// Current stations from the groundwater and rainfall resources, merged
    /// per station and limited to those observed in the last 30 days.
    pub async fn get_stations(&self) -> Vec<StationRecord> {
        let no_filters = Map::new();
        let (levels, rainfall) = tokio::join!(
            self.query_national(SourceDomain::GwLevelTs, &no_filters, STATION_LIMIT),
            self.query_national(SourceDomain::Rainfall, &no_filters, STATION_LIMIT),
        );

        let records: Vec<StationRecord> = levels
            .iter()
            .filter_map(|r| map_station_record(r, SourceDomain::GwLevelTs))
            .chain(
                rainfall
                    .iter()
                    .filter_map(|r| map_station_record(r, SourceDomain::Rainfall)),
            )
            .collect();

        let now = Utc::now();
        merge_stations(records, now)
            .into_iter()
            .filter(|s| s.last_updated.as_deref().is_some_and(|t| is_fresh_str_at(t, now)))
            .collect()
    }

    /// Groundwater readings for one station, newest first, one per date.
    pub async fn get_groundwater_timeseries(
        &self,
        station_id: &str,
        limit: usize,
    ) -> Vec<TimeSeriesReading> {
        let mut filters = Map::new();
        filters.insert("station_code".to_string(), json!(station_id));

        let records = self
            .query_national(SourceDomain::GwLevelTs, &filters, limit)
            .await;

        let mut series: Vec<TimeSeriesReading> = records
            .iter()
            .filter_map(Value::as_object)
            .filter(|obj| {
                pick_string(obj, STATION_CODE).is_none_or(|code| code.eq_ignore_ascii_case(station_id))
            })
            .filter_map(|obj| {
                Some(TimeSeriesReading {
                    date: pick_date(obj, OBSERVED_AT)?,
                    level: pick_f64(obj, GW_LEVEL)?,
                    depth: pick_f64(obj, WELL_DEPTH),
                })
            })
            .collect();

        series.sort_by(|a, b| b.date.cmp(&a.date));
        series.dedup_by_key(|r| r.date);
        series.truncate(limit);
        series
    }

    /// Rainfall summed per date, ascending.
    ///
    /// State and district are passed upstream as filters and re-checked
    /// locally; the year is applied locally.
    pub async fn get_rainfall(&self, query: &RainfallQuery) -> Vec<RainfallObservation> {
        let mut filters = Map::new();
        if let Some(state) = &query.state {
            filters.insert("state".to_string(), json!(state));
        }
        if let Some(district) = &query.district {
            filters.insert("district".to_string(), json!(district));
        }

        let records = self
            .query_national(SourceDomain::Rainfall, &filters, RAINFALL_LIMIT)
            .await;

        let same = |want: &Option<String>, have: Option<String>| {
            want.as_deref().is_none_or(|w| {
                have.is_some_and(|h| h.trim().eq_ignore_ascii_case(w.trim()))
            })
        };

        sum_by_date(
            records
                .iter()
                .filter_map(Value::as_object)
                .filter(|obj| same(&query.state, pick_string(obj, STATE)))
                .filter(|obj| same(&query.district, pick_string(obj, DISTRICT)))
                .filter_map(|obj| Some((pick_date(obj, OBSERVED_AT)?, pick_f64(obj, RAINFALL)?)))
                .filter(|(date, _)| query.year.is_none_or(|year| date.year() == year)),
        )
    }

    /// The most recent water-quality sample for a station.
    pub async fn get_water_quality(&self, station_id: &str) -> Option<WaterQuality> {
        let mut filters = Map::new();
        filters.insert("station_code".to_string(), json!(station_id));

        self.query_national(SourceDomain::WaterQuality, &filters, WATER_QUALITY_LIMIT)
            .await
            .iter()
            .filter_map(Value::as_object)
            .filter_map(|obj| water_quality_from(station_id, obj))
            .max_by_key(|sample| sample.sampled_on)
    }

    /// Statistics for every state present in the current data.
    pub async fn get_state_stats(&self) -> Vec<StateStats> {
        let (stations, rainfall) = tokio::join!(self.get_stations(), self.rainfall_samples());
        let stations = normalize_all(&stations, Utc::now());
        state_statistics(&stations, &rainfall)
    }

    /// District drought assessment from current levels and rainfall.
    pub async fn get_drought_data(&self) -> Vec<DroughtRecord> {
        let (stations, rainfall) = tokio::join!(self.get_stations(), self.rainfall_samples());
        let stations = normalize_all(&stations, Utc::now());
        drought_assessment(&stations, &rainfall)
    }

    async fn rainfall_samples(&self) -> Vec<RainfallSample> {
        self.query_national(SourceDomain::Rainfall, &Map::new(), RAINFALL_LIMIT)
            .await
            .iter()
            .filter_map(Value::as_object)
            .filter_map(|obj| {
                Some(RainfallSample {
                    state: pick_string(obj, STATE).unwrap_or_default(),
                    district: pick_string(obj, DISTRICT).unwrap_or_default(),
                    rainfall_mm: pick_f64(obj, RAINFALL)?,
                })
            })
            .collect()
    }
}

#[async_trait]
impl StationProvider for NwicClient {
    fn source(&self) -> DataSource {
        DataSource::Nwic
    }

    async fn stations(&self) -> Result<Vec<StationRecord>, ProviderError> {
        self.readiness()?;
        Ok(self.get_stations().await)
    }

    async fn water_levels(
        &self,
        station_id: &str,
        days: u32,
    ) -> Result<Vec<TimeSeriesReading>, ProviderError> {
        self.readiness()?;
        Ok(self
            .get_groundwater_timeseries(station_id, days as usize)
            .await)
    }

    async fn rainfall(
        &self,
        query: &RainfallQuery,
    ) -> Result<Vec<RainfallObservation>, ProviderError> {
        self.readiness()?;
        Ok(self.get_rainfall(query).await)
    }

    async fn water_quality(&self, station_id: &str) -> Result<Option<WaterQuality>, ProviderError> {
        self.readiness()?;
        Ok(self.get_water_quality(station_id).await)
    }

    async fn state_stats(&self, state: &str) -> Result<Option<StateStats>, ProviderError> {
        self.readiness()?;
        Ok(self
            .get_state_stats()
            .await
            .into_iter()
            .find(|s| s.state.eq_ignore_ascii_case(state.trim())))
    }

    async fn drought(&self) -> Result<Vec<DroughtRecord>, ProviderError> {
        self.readiness()?;
        Ok(self.get_drought_data().await)
    }
}

// ============================================================================
// Wire types
// ============================================================================

#[derive(Debug, Serialize)]
struct QueryRequest<'a> {
    resource_id: &'a str,
    filters: &'a Map<String, Value>,
    limit: usize,
}

#[derive(Debug, Deserialize)]
struct QueryResponse {
    #[serde(default)]
    result: Option<QueryResult>,
    #[serde(default)]
    error: Option<Value>,
}

#[derive(Debug, Default, Deserialize)]
struct QueryResult {
    #[serde(default)]
    records: Vec<Value>,
}

// ============================================================================
// Record mapping and merging
// ============================================================================

/// Map one upstream record onto a [`StationRecord`].
///
/// Returns `None` when no station code can be found. For rainfall records
/// `currentLevel` carries the rainfall value and `currentWaterLevel` stays
/// unset; for every other domain both carry the groundwater level.
pub fn map_station_record(record: &Value, domain: SourceDomain) -> Option<StationRecord> {
    let obj = record.as_object()?;
    let id = pick_string(obj, STATION_CODE)?;

    let (current_level, current_water_level, rainfall) = match domain {
        SourceDomain::Rainfall => {
            let rain = pick_f64(obj, RAINFALL);
            (rain, None, rain)
        }
        SourceDomain::GwLevelTs | SourceDomain::WaterQuality => {
            let level = pick_f64(obj, GW_LEVEL);
            (level, level, None)
        }
    };

    let last_updated = pick_string(obj, OBSERVED_AT)
        .map(|raw| parse_timestamp(&raw).map(|t| t.to_rfc3339()).unwrap_or(raw));

    Some(StationRecord {
        id: Some(id),
        name: pick_string(obj, STATION_NAME),
        state: pick_string(obj, STATE),
        district: pick_string(obj, DISTRICT),
        latitude: pick_f64(obj, LATITUDE),
        longitude: pick_f64(obj, LONGITUDE),
        current_level,
        current_water_level,
        rainfall,
        depth: pick_f64(obj, WELL_DEPTH),
        last_updated,
        source_domain: Some(domain),
        ..Default::default()
    })
}

/// Merge records describing the same station.
///
/// Records are keyed by `(id, state)`, first-seen order preserved.
/// Coordinates and descriptive fields keep the first non-null value.
/// Readings and `lastUpdated` come from whichever record was observed more
/// recently, falling back to the other record's non-null value; equal
/// timestamps keep the record seen first. `status` is recomputed from the
/// merged timestamp, and records without both coordinates are dropped.
pub fn merge_stations(records: Vec<StationRecord>, now: DateTime<Utc>) -> Vec<StationRecord> {
    let mut merged: Vec<StationRecord> = Vec::new();
    let mut index: HashMap<(String, String), usize> = HashMap::new();

    for record in records {
        let Some(id) = record.id.as_deref().map(str::trim).filter(|id| !id.is_empty()) else {
            continue;
        };
        let key = (
            id.to_string(),
            record.state.as_deref().unwrap_or_default().trim().to_lowercase(),
        );

        match index.get(&key) {
            Some(&i) => merge_into(&mut merged[i], record),
            None => {
                index.insert(key, merged.len());
                merged.push(record);
            }
        }
    }

    merged
        .into_iter()
        .filter(|r| r.latitude.is_some() && r.longitude.is_some())
        .map(|mut r| {
            let fresh = r.last_updated.as_deref().is_some_and(|t| is_fresh_str_at(t, now));
            r.status = Some(if fresh { "Active" } else { "Inactive" }.to_string());
            r
        })
        .collect()
}

fn merge_into(existing: &mut StationRecord, incoming: StationRecord) {
    let observed = |r: &StationRecord| r.last_updated.as_deref().and_then(parse_timestamp);
    let newer = match (observed(&incoming), observed(existing)) {
        (Some(a), Some(b)) => a > b,
        (Some(_), None) => true,
        (None, _) => false,
    };

    keep_first(&mut existing.name, incoming.name);
    keep_first(&mut existing.district, incoming.district);
    keep_first(&mut existing.latitude, incoming.latitude);
    keep_first(&mut existing.longitude, incoming.longitude);
    keep_first(&mut existing.depth, incoming.depth);
    keep_first(&mut existing.aquifer_type, incoming.aquifer_type);

    if newer {
        prefer_new(&mut existing.current_level, incoming.current_level);
        prefer_new(&mut existing.current_water_level, incoming.current_water_level);
        prefer_new(&mut existing.rainfall, incoming.rainfall);
        prefer_new(&mut existing.last_updated, incoming.last_updated);
        prefer_new(&mut existing.source_domain, incoming.source_domain);
    } else {
        keep_first(&mut existing.current_level, incoming.current_level);
        keep_first(&mut existing.current_water_level, incoming.current_water_level);
        keep_first(&mut existing.rainfall, incoming.rainfall);
        keep_first(&mut existing.last_updated, incoming.last_updated);
        keep_first(&mut existing.source_domain, incoming.source_domain);
    }
}

fn keep_first<T>(slot: &mut Option<T>, candidate: Option<T>) {
    if slot.is_none() {
        *slot = candidate;
    }
}

fn prefer_new<T>(slot: &mut Option<T>, candidate: Option<T>) {
    if candidate.is_some() {
        *slot = candidate;
    }
}
