//! Aggregation logic over canonical stations.
//!
//! Everything here is a pure function of its inputs (plus an explicit `now`
//! where freshness or season matters), so the Data Service and the NWIC
//! aggregator can share it and tests can pin the clock.

use std::collections::BTreeMap;

use chrono::{DateTime, Datelike, NaiveDate, Utc};

use crate::freshness::is_fresh_at;
use crate::model::{
    DashboardStats, DroughtRecord, DroughtSeverity, RainfallObservation, RiskAssessment, RiskLevel,
    StateStats, Station, StationInsights, StationStatus, TimeSeriesReading, Trend,
};

/// Local rainfall below this fraction of the global mean is a deficit.
pub const RAINFALL_DEFICIT_RATIO: f64 = 0.8;

/// Mean depth to water (m below ground) beyond which groundwater is in decline.
pub const GROUNDWATER_DECLINE_M: f64 = 20.0;

/// Utilization thresholds for [`RiskLevel`].
const CRITICAL_UTILIZATION: f64 = 0.8;
const HIGH_UTILIZATION: f64 = 0.6;
const MODERATE_UTILIZATION: f64 = 0.4;

/// Mean change (m) between the two halves of a series that counts as a trend.
const TREND_THRESHOLD_M: f64 = 0.25;

/// Incrementally updated arithmetic mean.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RunningMean {
    count: usize,
    mean: f64,
}

impl RunningMean {
    pub fn push(&mut self, value: f64) {
        self.count += 1;
        self.mean += (value - self.mean) / self.count as f64;
    }

    pub fn count(&self) -> usize {
        self.count
    }

    pub fn mean(&self) -> Option<f64> {
        (self.count > 0).then_some(self.mean)
    }
}

/// One rainfall reading attributed to a district.
#[derive(Debug, Clone, PartialEq)]
pub struct RainfallSample {
    pub state: String,
    pub district: String,
    pub rainfall_mm: f64,
}

/// Whether a station counts toward `criticalStations`.
///
/// Either the provider flagged it critical or the water table sits deeper
/// than [`GROUNDWATER_DECLINE_M`].
pub fn is_critical(station: &Station) -> bool {
    station.status == StationStatus::Critical
        || station
            .current_water_level
            .is_some_and(|level| level > GROUNDWATER_DECLINE_M)
}

/// Sum same-date rainfall into one observation per date, ascending.
pub fn sum_by_date<I>(readings: I) -> Vec<RainfallObservation>
where
    I: IntoIterator<Item = (NaiveDate, f64)>,
{
    let mut totals: BTreeMap<NaiveDate, f64> = BTreeMap::new();
    for (date, mm) in readings {
        *totals.entry(date).or_insert(0.0) += mm;
    }
    totals
        .into_iter()
        .map(|(date, rainfall_mm)| RainfallObservation { date, rainfall_mm })
        .collect()
}

/// Put a water-level series in chronological order, one reading per date,
/// keeping only the newest `days` readings.
pub fn canonical_series(mut series: Vec<TimeSeriesReading>, days: usize) -> Vec<TimeSeriesReading> {
    series.sort_by_key(|r| r.date);
    series.dedup_by_key(|r| r.date);
    if series.len() > days {
        series.drain(..series.len() - days);
    }
    series
}

/// Statistics for one state over an already resolved station list.
///
/// `avgWaterLevel` is the mean `currentLevel` of the state's stations, `0`
/// when the state has none.
pub fn compute_state_stats(stations: &[Station], state: &str) -> StateStats {
    let mut total = 0;
    let mut active = 0;
    let mut critical = 0;
    let mut level = RunningMean::default();

    for station in stations
        .iter()
        .filter(|s| s.state.eq_ignore_ascii_case(state.trim()))
    {
        total += 1;
        if station.status == StationStatus::Active {
            active += 1;
        }
        if is_critical(station) {
            critical += 1;
        }
        level.push(station.current_level);
    }

    StateStats {
        state: state.trim().to_string(),
        total_stations: total,
        active_stations: active,
        critical_stations: critical,
        avg_water_level: level.mean().unwrap_or(0.0),
        avg_rainfall: None,
    }
}

/// Per-state statistics across every state seen in stations or rainfall.
///
/// Groundwater averages only use stations with a groundwater reading, so
/// rain gauges do not dilute them. Sorted by state name.
pub fn state_statistics(stations: &[Station], rainfall: &[RainfallSample]) -> Vec<StateStats> {
    #[derive(Default)]
    struct Acc {
        name: String,
        total: usize,
        active: usize,
        critical: usize,
        level: RunningMean,
        rain: RunningMean,
    }

    fn entry<'a>(states: &'a mut BTreeMap<String, Acc>, name: &str) -> Option<&'a mut Acc> {
        let name = name.trim();
        if name.is_empty() {
            return None;
        }
        let acc = states.entry(name.to_lowercase()).or_default();
        if acc.name.is_empty() {
            acc.name = name.to_string();
        }
        Some(acc)
    }

    let mut states: BTreeMap<String, Acc> = BTreeMap::new();

    for station in stations {
        let Some(acc) = entry(&mut states, &station.state) else {
            continue;
        };
        acc.total += 1;
        if station.status == StationStatus::Active {
            acc.active += 1;
        }
        if is_critical(station) {
            acc.critical += 1;
        }
        if let Some(level) = station.current_water_level {
            acc.level.push(level);
        }
    }

    for sample in rainfall {
        if let Some(acc) = entry(&mut states, &sample.state) {
            acc.rain.push(sample.rainfall_mm);
        }
    }

    states
        .into_values()
        .map(|acc| StateStats {
            state: acc.name,
            total_stations: acc.total,
            active_stations: acc.active,
            critical_stations: acc.critical,
            avg_water_level: acc.level.mean().unwrap_or(0.0),
            avg_rainfall: acc.rain.mean(),
        })
        .collect()
}

/// Combine the two drought indicators.
///
/// `Severe` when both hold, `Moderate` when one holds, else `Normal`.
pub fn classify_drought(rainfall_deficit: bool, groundwater_decline: bool) -> DroughtSeverity {
    match (rainfall_deficit, groundwater_decline) {
        (true, true) => DroughtSeverity::Severe,
        (true, false) | (false, true) => DroughtSeverity::Moderate,
        (false, false) => DroughtSeverity::Normal,
    }
}

/// District-level drought assessment.
///
/// A district has a rainfall deficit when its mean rainfall is below
/// [`RAINFALL_DEFICIT_RATIO`] of the mean over all samples, and groundwater
/// decline when its mean depth to water exceeds [`GROUNDWATER_DECLINE_M`].
/// A district with no data for an indicator does not trip it. Results are
/// ordered most severe first, then by state and district.
pub fn drought_assessment(stations: &[Station], rainfall: &[RainfallSample]) -> Vec<DroughtRecord> {
    #[derive(Default)]
    struct Acc {
        state: String,
        district: String,
        rain: RunningMean,
        level: RunningMean,
    }

    type Districts = BTreeMap<(String, String), Acc>;

    fn entry<'a>(districts: &'a mut Districts, state: &str, district: &str) -> Option<&'a mut Acc> {
        let (state, district) = (state.trim(), district.trim());
        if district.is_empty() {
            return None;
        }
        let key = (state.to_lowercase(), district.to_lowercase());
        let acc = districts.entry(key).or_default();
        if acc.district.is_empty() {
            acc.state = state.to_string();
            acc.district = district.to_string();
        }
        Some(acc)
    }

    let mut global = RunningMean::default();
    let mut districts = Districts::new();

    for sample in rainfall {
        global.push(sample.rainfall_mm);
        if let Some(acc) = entry(&mut districts, &sample.state, &sample.district) {
            acc.rain.push(sample.rainfall_mm);
        }
    }

    for station in stations {
        if let Some(level) = station.current_water_level {
            if let Some(acc) = entry(&mut districts, &station.state, &station.district) {
                acc.level.push(level);
            }
        }
    }

    let global_avg = global.mean().unwrap_or(0.0);
    let mut records: Vec<DroughtRecord> = districts
        .into_values()
        .map(|acc| {
            let rainfall_deficit = acc
                .rain
                .mean()
                .is_some_and(|local| local < RAINFALL_DEFICIT_RATIO * global_avg);
            let groundwater_decline = acc
                .level
                .mean()
                .is_some_and(|level| level > GROUNDWATER_DECLINE_M);

            DroughtRecord {
                state: acc.state,
                district: acc.district,
                avg_rainfall: acc.rain.mean().unwrap_or(0.0),
                avg_water_level: acc.level.mean().unwrap_or(0.0),
                rainfall_deficit,
                groundwater_decline,
                severity: classify_drought(rainfall_deficit, groundwater_decline),
            }
        })
        .collect();

    records.sort_by(|a, b| b.severity.cmp(&a.severity));
    records
}

/// Network-wide counters for the dashboard.
///
/// `criticalStations` uses [`is_critical`], the same rule as the per-state
/// statistics, so it can overlap with the status counters.
pub fn dashboard_stats(stations: &[Station], data_source: &str, now: DateTime<Utc>) -> DashboardStats {
    let count = |status: StationStatus| stations.iter().filter(|s| s.status == status).count();

    let mut level = RunningMean::default();
    for station in stations {
        level.push(station.current_level);
    }

    DashboardStats {
        total_stations: stations.len(),
        active_stations: count(StationStatus::Active),
        critical_stations: stations.iter().filter(|s| is_critical(s)).count(),
        warning_stations: count(StationStatus::Warning),
        inactive_stations: count(StationStatus::Inactive),
        avg_water_level: level.mean().unwrap_or(0.0),
        monsoon_active: is_monsoon(now),
        data_source: data_source.to_string(),
        generated_at: now,
    }
}

/// June through October (zero-indexed months 5 to 9).
pub fn is_monsoon(now: DateTime<Utc>) -> bool {
    (5..=9).contains(&now.month0())
}

/// Map a utilization rate onto a risk band.
pub fn risk_level_for(utilization: f64) -> RiskLevel {
    if utilization >= CRITICAL_UTILIZATION {
        RiskLevel::Critical
    } else if utilization >= HIGH_UTILIZATION {
        RiskLevel::High
    } else if utilization >= MODERATE_UTILIZATION {
        RiskLevel::Moderate
    } else {
        RiskLevel::Low
    }
}

/// Depletion risk for one station snapshot.
///
/// Utilization is depth to water over total well depth; a station without a
/// known depth scores zero and says so in its factors.
pub fn assess_risk(station: &Station, now: DateTime<Utc>) -> RiskAssessment {
    let level = station.groundwater_level();
    let utilization = match station.depth {
        Some(depth) if depth > 0.0 => (level / depth).max(0.0),
        _ => 0.0,
    };
    let risk_level = risk_level_for(utilization);
    let risk_score = (utilization * 100.0).round().clamp(0.0, 100.0) as u8;
    let fresh = is_fresh_at(station.last_updated, now);

    let mut factors = Vec::new();
    match station.depth {
        Some(depth) if depth > 0.0 => factors.push(format!(
            "Water table at {:.1} m in a {:.1} m well ({:.0}% of depth)",
            level,
            depth,
            utilization * 100.0
        )),
        _ => factors.push("Well depth unknown; utilization could not be computed".to_string()),
    }
    if level > GROUNDWATER_DECLINE_M {
        factors.push(format!("Depth to water exceeds {GROUNDWATER_DECLINE_M:.0} m"));
    }
    if !fresh {
        factors.push("No observation in the last 30 days".to_string());
    }
    match station.status {
        StationStatus::Critical => factors.push("Provider reports a critical water level".to_string()),
        StationStatus::Warning => factors.push("Provider reports a low water level".to_string()),
        StationStatus::Inactive => factors.push("Station is inactive".to_string()),
        StationStatus::Maintenance => factors.push("Station is under maintenance".to_string()),
        StationStatus::Active => {}
    }

    let mut recommendations: Vec<String> = match risk_level {
        RiskLevel::Critical => vec![
            "Restrict groundwater extraction in the surrounding area".to_string(),
            "Prioritise artificial recharge structures in the catchment".to_string(),
            "Notify the district groundwater authority".to_string(),
        ],
        RiskLevel::High => vec![
            "Reduce extraction and move irrigation to efficient schedules".to_string(),
            "Promote rooftop and farm-pond rainwater harvesting".to_string(),
        ],
        RiskLevel::Moderate => vec![
            "Monitor water levels weekly".to_string(),
            "Encourage less water-intensive cropping".to_string(),
        ],
        RiskLevel::Low => vec!["Continue routine monitoring".to_string()],
    };
    if !fresh || station.status == StationStatus::Inactive {
        recommendations.push("Verify telemetry and restore station reporting".to_string());
    }

    RiskAssessment {
        station_id: station.id.clone(),
        risk_level,
        risk_score,
        utilization_rate: utilization,
        factors,
        recommendations,
    }
}

/// Direction of a depth-to-water series (ascending by date).
///
/// Compares the mean of the older half with the newer half; a deepening
/// water table is a decline.
pub fn water_level_trend(series: &[TimeSeriesReading]) -> (Trend, f64) {
    if series.len() < 4 {
        return (Trend::Stable, 0.0);
    }
    let (older, newer) = series.split_at(series.len() / 2);
    let mean = |half: &[TimeSeriesReading]| {
        let mut m = RunningMean::default();
        half.iter().for_each(|r| m.push(r.level));
        m.mean().unwrap_or(0.0)
    };
    let change = mean(newer) - mean(older);

    let trend = if change > TREND_THRESHOLD_M {
        Trend::Declining
    } else if change < -TREND_THRESHOLD_M {
        Trend::Improving
    } else {
        Trend::Stable
    };
    (trend, change)
}

/// Rule-based insights for one station.
pub fn derive_insights(
    station: &Station,
    risk: &RiskAssessment,
    series: &[TimeSeriesReading],
    now: DateTime<Utc>,
) -> StationInsights {
    let (trend, change) = water_level_trend(series);
    let mut insights = Vec::new();

    match trend {
        Trend::Declining => insights.push(format!(
            "Water table has dropped {:.2} m over the last {} readings",
            change,
            series.len()
        )),
        Trend::Improving => insights.push(format!(
            "Water table has recovered {:.2} m over the last {} readings",
            -change,
            series.len()
        )),
        Trend::Stable => insights.push("Water table is broadly stable".to_string()),
    }

    insights.push(format!(
        "Depletion risk is {:?} ({}% of well depth in use)",
        risk.risk_level, risk.risk_score
    ));

    if is_monsoon(now) {
        insights.push("Monsoon recharge period: expect levels to rise over the coming weeks".to_string());
    } else if trend == Trend::Declining {
        insights.push("Dry season drawdown: plan extraction conservatively until the monsoon".to_string());
    }

    if let Some(aquifer) = &station.aquifer_type {
        insights.push(format!("{aquifer} aquifer"));
    }

    let summary = format!(
        "{} ({}, {}): {:?} trend, {:?} risk",
        station.name, station.district, station.state, trend, risk.risk_level
    );

    StationInsights {
        station_id: station.id.clone(),
        trend,
        risk_level: risk.risk_level,
        summary,
        insights,
        generated_at: now,
    }
}
