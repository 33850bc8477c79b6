//! Alias-based field lookup for loosely shaped upstream JSON records.

use chrono::NaiveDate;
use serde_json::{Map, Value};

use crate::freshness::parse_date;
use crate::model::{WaterQuality, value_as_f64, value_as_string};

pub const STATION_CODE: &[&str] = &[
    "station_code",
    "stationcode",
    "station_id",
    "stationid",
    "site_id",
    "well_id",
    "id",
];
pub const STATION_NAME: &[&str] = &["station_name", "stationname", "site_name", "well_name", "name"];
pub const STATE: &[&str] = &["state", "state_name", "statename"];
pub const DISTRICT: &[&str] = &["district", "district_name", "districtname"];
pub const LATITUDE: &[&str] = &["latitude", "lat", "y"];
pub const LONGITUDE: &[&str] = &["longitude", "lon", "long", "lng", "x"];
pub const GW_LEVEL: &[&str] = &[
    "water_level_mbgl",
    "depth_to_water_level_m",
    "depth_to_water_level",
    "water_level",
    "gw_level",
    "level",
];
pub const RAINFALL: &[&str] = &["rainfall_mm", "rainfall", "actual_rainfall", "rain_mm"];
pub const WELL_DEPTH: &[&str] = &["well_depth", "total_depth", "depth_m", "depth"];
pub const OBSERVED_AT: &[&str] = &[
    "date",
    "observation_date",
    "data_time",
    "datetime",
    "timestamp",
    "last_updated",
];
pub const SAMPLED_AT: &[&str] = &["sampling_date", "sample_date", "date", "observation_date"];

/// First numeric value whose key matches one of `aliases`, case-insensitively.
pub fn pick_f64(obj: &Map<String, Value>, aliases: &[&str]) -> Option<f64> {
    aliases
        .iter()
        .find_map(|alias| lookup(obj, alias).and_then(value_as_f64))
}

pub fn pick_string(obj: &Map<String, Value>, aliases: &[&str]) -> Option<String> {
    aliases
        .iter()
        .find_map(|alias| lookup(obj, alias).and_then(value_as_string))
}

fn lookup<'a>(obj: &'a Map<String, Value>, alias: &str) -> Option<&'a Value> {
    obj.iter()
        .find(|(key, value)| key.eq_ignore_ascii_case(alias) && !value.is_null())
        .map(|(_, value)| value)
}

pub fn pick_date(obj: &Map<String, Value>, aliases: &[&str]) -> Option<NaiveDate> {
    pick_string(obj, aliases).as_deref().and_then(parse_date)
}

/// Build a water-quality sample from a record; `None` without a usable date.
pub fn water_quality_from(station_id: &str, obj: &Map<String, Value>) -> Option<WaterQuality> {
    Some(WaterQuality {
        station_id: pick_string(obj, STATION_CODE).unwrap_or_else(|| station_id.to_string()),
        sampled_on: pick_date(obj, SAMPLED_AT)?,
        ph: pick_f64(obj, &["ph", "ph_value"]),
        tds: pick_f64(obj, &["tds", "tds_mg_l", "total_dissolved_solids"]),
        electrical_conductivity: pick_f64(obj, &["ec", "electrical_conductivity", "conductivity"]),
        nitrate: pick_f64(obj, &["nitrate", "no3"]),
        fluoride: pick_f64(obj, &["fluoride", "f"]),
        arsenic: pick_f64(obj, &["arsenic", "as"]),
        iron: pick_f64(obj, &["iron", "fe"]),
        chloride: pick_f64(obj, &["chloride", "cl"]),
        hardness: pick_f64(obj, &["total_hardness", "hardness", "th"]),
    })
}
