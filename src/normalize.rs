//! Normalization of provider records into the canonical [`Station`] shape.

use chrono::{DateTime, Utc};

use crate::freshness::{is_fresh_at, parse_timestamp};
use crate::model::{Station, StationRecord, StationStatus};

/// Normalize a record of any upstream shape into a [`Station`].
///
/// Field resolution:
///
/// - `currentLevel`: `currentLevel`, then `currentWaterLevel`, then `level`, else `0`.
/// - coordinates: direct field, then nested `location.*`, then `lat`/`lng`.
/// - `lastUpdated`: missing or unparseable values become `now`, so a record of
///   unknown age is treated as fresh.
/// - `status`: a stale record is `Inactive` unless the provider declared
///   `Maintenance`; a fresh record keeps the declared status, or `Active`.
///
/// Pure and idempotent for a fixed `now`.
pub fn normalize_station(record: &StationRecord, now: DateTime<Utc>) -> Station {
    let current_level = record
        .current_level
        .or(record.current_water_level)
        .or(record.level)
        .unwrap_or(0.0);

    let nested = record.location.unwrap_or_default();
    let latitude = record.latitude.or(nested.latitude).or(record.lat);
    let longitude = record.longitude.or(nested.longitude).or(record.lng);

    let last_updated = record
        .last_updated
        .as_deref()
        .and_then(parse_timestamp)
        .unwrap_or(now);

    let declared = record.status.as_deref().and_then(StationStatus::from_label);
    let status = resolve_status(declared, is_fresh_at(last_updated, now));

    Station {
        id: text(&record.id),
        name: text(&record.name),
        state: text(&record.state),
        district: text(&record.district),
        latitude,
        longitude,
        current_level,
        current_water_level: record.current_water_level,
        rainfall: record.rainfall,
        depth: record.depth,
        status,
        aquifer_type: record.aquifer_type.clone(),
        last_updated,
        source_domain: record.source_domain,
    }
}

/// Normalize a batch, dropping records without an identifier.
pub fn normalize_all(records: &[StationRecord], now: DateTime<Utc>) -> Vec<Station> {
    records
        .iter()
        .filter(|r| r.id.as_deref().is_some_and(|id| !id.trim().is_empty()))
        .map(|r| normalize_station(r, now))
        .collect()
}

fn resolve_status(declared: Option<StationStatus>, fresh: bool) -> StationStatus {
    match (declared, fresh) {
        (Some(StationStatus::Maintenance), _) => StationStatus::Maintenance,
        (_, false) => StationStatus::Inactive,
        (Some(status), true) => status,
        (None, true) => StationStatus::Active,
    }
}

fn text(value: &Option<String>) -> String {
    value.as_deref().map(str::trim).unwrap_or_default().to_string()
}
