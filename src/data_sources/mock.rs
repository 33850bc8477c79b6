//! Synthetic groundwater data.
//!
//! The terminal fallback of every read: a fixed roster of DWLR stations across
//! eight states plus seasonal generators for water levels, rainfall, water
//! quality and forecasts. The roster is generated once when the catalog is
//! built and keeps each station's report age rather than a timestamp, so it
//! reads as equally fresh whenever it is served. The generators draw from
//! the catalog's RNG on every call.
//!
//! All generators take the RNG explicitly, so a seeded [`StdRng`] makes the
//! whole dataset reproducible.

use std::f64::consts::TAU;
use std::sync::{Mutex, PoisonError};

use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::debug;

use crate::model::{
    Prediction, RainfallObservation, Station, StationRecord, StationStatus, TimeSeriesReading,
    WaterQuality,
};

/// States in the synthetic network: name, code and `(district, lat, lon)`.
const STATES: &[(&str, &str, &[(&str, f64, f64)])] = &[
    (
        "Rajasthan",
        "RJ",
        &[
            ("Jaipur", 26.91, 75.79),
            ("Jodhpur", 26.24, 73.02),
            ("Kota", 25.18, 75.83),
            ("Bikaner", 28.02, 73.31),
        ],
    ),
    (
        "Maharashtra",
        "MH",
        &[
            ("Pune", 18.52, 73.86),
            ("Nagpur", 21.15, 79.09),
            ("Nashik", 19.99, 73.79),
            ("Aurangabad", 19.88, 75.34),
        ],
    ),
    (
        "Gujarat",
        "GJ",
        &[
            ("Ahmedabad", 23.02, 72.57),
            ("Surat", 21.17, 72.83),
            ("Rajkot", 22.30, 70.80),
        ],
    ),
    (
        "Punjab",
        "PB",
        &[
            ("Ludhiana", 30.90, 75.86),
            ("Amritsar", 31.63, 74.87),
            ("Patiala", 30.34, 76.39),
        ],
    ),
    (
        "Uttar Pradesh",
        "UP",
        &[
            ("Lucknow", 26.85, 80.95),
            ("Kanpur", 26.45, 80.33),
            ("Agra", 27.18, 78.01),
            ("Varanasi", 25.32, 82.97),
        ],
    ),
    (
        "Karnataka",
        "KA",
        &[
            ("Bengaluru Urban", 12.97, 77.59),
            ("Mysuru", 12.30, 76.64),
            ("Belagavi", 15.85, 74.50),
        ],
    ),
    (
        "Tamil Nadu",
        "TN",
        &[
            ("Chennai", 13.08, 80.27),
            ("Coimbatore", 11.02, 76.96),
            ("Madurai", 9.93, 78.12),
        ],
    ),
    (
        "Madhya Pradesh",
        "MP",
        &[
            ("Bhopal", 23.26, 77.41),
            ("Indore", 22.72, 75.86),
            ("Jabalpur", 23.18, 79.99),
        ],
    ),
];

const AQUIFER_TYPES: &[&str] = &[
    "Alluvial",
    "Hard Rock",
    "Basalt",
    "Sandstone",
    "Limestone",
    "Granite Gneiss",
];

/// Share of roster stations reporting normally.
const ACTIVE_SHARE: f64 = 0.85;

/// Day of year at which the water table is deepest (late May, pre-monsoon).
const DEEPEST_DAY_OF_YEAR: f64 = 140.0;

/// A roster station and how long before "now" it last reported.
#[derive(Debug, Clone, PartialEq)]
struct RosterEntry {
    record: StationRecord,
    age: Duration,
}

impl RosterEntry {
    fn stamped(&self, now: DateTime<Utc>) -> StationRecord {
        StationRecord {
            last_updated: Some((now - self.age).to_rfc3339()),
            ..self.record.clone()
        }
    }
}

/// Synthetic station roster plus the RNG its generators draw from.
pub struct MockCatalog {
    roster: Vec<RosterEntry>,
    rng: Mutex<StdRng>,
}

impl MockCatalog {
    /// Build a catalog, generating the roster from `rng`.
    pub fn new(mut rng: StdRng) -> Self {
        let roster = roster_entries(&mut rng);
        debug!(stations = roster.len(), "generated synthetic roster");
        Self {
            roster,
            rng: Mutex::new(rng),
        }
    }

    /// Seeded catalog, or entropy-seeded when `seed` is `None`.
    pub fn from_seed(seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self::new(rng)
    }

    /// The roster with every report age measured back from `now`.
    pub fn roster(&self, now: DateTime<Utc>) -> Vec<StationRecord> {
        self.roster.iter().map(|entry| entry.stamped(now)).collect()
    }

    /// Run `f` with exclusive access to the catalog RNG.
    pub fn with_rng<T>(&self, f: impl FnOnce(&mut StdRng) -> T) -> T {
        let mut rng = self.rng.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut rng)
    }

    /// Water levels for `station`, or for a generic well when it is unknown.
    pub fn water_levels(
        &self,
        station: Option<&Station>,
        days: u32,
        end: NaiveDate,
    ) -> Vec<TimeSeriesReading> {
        let (base_level, depth) = station
            .map(|s| (s.groundwater_level(), s.depth))
            .unwrap_or((15.0, Some(80.0)));
        self.with_rng(|rng| generate_water_level_series(base_level, depth, days, end, rng))
    }

    pub fn rainfall(&self, scope: &str, days: u32, end: NaiveDate) -> Vec<RainfallObservation> {
        self.with_rng(|rng| generate_rainfall_series(scope, days, end, rng))
    }

    pub fn water_quality(&self, station_id: &str, sampled_on: NaiveDate) -> WaterQuality {
        self.with_rng(|rng| generate_water_quality(station_id, sampled_on, rng))
    }

    pub fn predictions(&self, station: &Station, days: u32, start: NaiveDate) -> Vec<Prediction> {
        self.with_rng(|rng| generate_predictions(station, days, start, rng))
    }
}

/// Generate the synthetic roster.
///
/// Each state gets 5 to 8 stations (never fewer than it has districts),
/// assigned to districts round-robin. About 85% report `Active` within the
/// last two days; the rest are `Inactive` (last seen 35 to 120 days ago) or
/// `Maintenance` (1 to 10 days ago).
pub fn generate_roster<R: Rng + ?Sized>(rng: &mut R, now: DateTime<Utc>) -> Vec<StationRecord> {
    roster_entries(rng)
        .iter()
        .map(|entry| entry.stamped(now))
        .collect()
}

fn roster_entries<R: Rng + ?Sized>(rng: &mut R) -> Vec<RosterEntry> {
    let mut roster = Vec::new();

    for (state, code, districts) in STATES {
        let count = rng.gen_range(5..=8usize).max(districts.len());

        for n in 0..count {
            let (district, lat, lon) = districts[n % districts.len()];
            let depth = round2(rng.gen_range(30.0..150.0));
            let level = round2(rng.gen_range(2.0..(depth * 0.9).min(60.0)));

            let (status, age) = if rng.gen_bool(ACTIVE_SHARE) {
                (StationStatus::Active, Duration::minutes(rng.gen_range(0..48 * 60)))
            } else if rng.gen_bool(0.5) {
                (StationStatus::Inactive, Duration::days(rng.gen_range(35..=120)))
            } else {
                (StationStatus::Maintenance, Duration::days(rng.gen_range(1..=10)))
            };

            let record = StationRecord {
                id: Some(format!("DWLR-{}-{:03}", code, n + 1)),
                name: Some(format!("{} DWLR {}", district, n / districts.len() + 1)),
                state: Some(state.to_string()),
                district: Some(district.to_string()),
                latitude: Some(round4(lat + rng.gen_range(-0.15..0.15))),
                longitude: Some(round4(lon + rng.gen_range(-0.15..0.15))),
                current_level: Some(level),
                current_water_level: Some(level),
                depth: Some(depth),
                status: Some(status.label().to_string()),
                aquifer_type: Some(AQUIFER_TYPES[rng.gen_range(0..AQUIFER_TYPES.len())].to_string()),
                ..Default::default()
            };
            roster.push(RosterEntry { record, age });
        }
    }

    roster
}

/// Daily depth-to-water readings ending at `end`, ascending.
///
/// A yearly cosine centred on the pre-monsoon low plus daily noise, kept
/// between 0.1 m and the well depth.
pub fn generate_water_level_series<R: Rng + ?Sized>(
    base_level: f64,
    depth: Option<f64>,
    days: u32,
    end: NaiveDate,
    rng: &mut R,
) -> Vec<TimeSeriesReading> {
    let amplitude = (base_level * 0.15).clamp(0.5, 5.0);
    let floor = depth.filter(|d| *d > 0.1).unwrap_or(f64::MAX);

    (0..days)
        .rev()
        .map(|back| {
            let date = end - Duration::days(i64::from(back));
            let phase = (f64::from(date.ordinal()) - DEEPEST_DAY_OF_YEAR) / 365.0 * TAU;
            let level = base_level + amplitude * phase.cos() + rng.gen_range(-0.3..0.3);

            TimeSeriesReading {
                date,
                level: round2(level.clamp(0.1, floor)),
                depth,
            }
        })
        .collect()
}

/// Daily rainfall for a scope ending at `end`, ascending, one entry per day.
///
/// Wet-day probability and intensity follow the month: the June to September
/// monsoon is wet most days with frequent heavy falls, the post-monsoon
/// months taper off, and winter and summer are mostly dry. `scope` picks a
/// stable regional multiplier between 0.8 and 1.2.
pub fn generate_rainfall_series<R: Rng + ?Sized>(
    scope: &str,
    days: u32,
    end: NaiveDate,
    rng: &mut R,
) -> Vec<RainfallObservation> {
    let regional = regional_factor(scope);

    (0..days)
        .rev()
        .map(|back| {
            let date = end - Duration::days(i64::from(back));
            let rainfall_mm = daily_rainfall(date.month(), rng) * regional;
            RainfallObservation {
                date,
                rainfall_mm: round1(rainfall_mm),
            }
        })
        .collect()
}

fn daily_rainfall<R: Rng + ?Sized>(month: u32, rng: &mut R) -> f64 {
    match month {
        6..=9 => {
            if !rng.gen_bool(0.9) {
                0.0
            } else if rng.gen_bool(0.35) {
                rng.gen_range(25.0..90.0)
            } else {
                rng.gen_range(2.0..20.0)
            }
        }
        10 | 11 if rng.gen_bool(0.65) => rng.gen_range(0.5..15.0),
        12 | 1 | 2 if rng.gen_bool(0.45) => rng.gen_range(0.2..6.0),
        3..=5 if rng.gen_bool(0.4) => rng.gen_range(0.2..5.0),
        _ => 0.0,
    }
}

fn regional_factor(scope: &str) -> f64 {
    let hash = scope
        .to_lowercase()
        .bytes()
        .fold(0u32, |acc, b| acc.wrapping_mul(31).wrapping_add(u32::from(b)));
    0.8 + f64::from(hash % 41) / 100.0
}

/// A plausible groundwater quality sample.
pub fn generate_water_quality<R: Rng + ?Sized>(
    station_id: &str,
    sampled_on: NaiveDate,
    rng: &mut R,
) -> WaterQuality {
    let tds = round1(rng.gen_range(180.0..1400.0));
    WaterQuality {
        station_id: station_id.to_string(),
        sampled_on,
        ph: Some(round2(rng.gen_range(6.6..8.3))),
        tds: Some(tds),
        electrical_conductivity: Some(round1(tds * rng.gen_range(1.4..1.7))),
        nitrate: Some(round1(rng.gen_range(4.0..60.0))),
        fluoride: Some(round2(rng.gen_range(0.2..2.0))),
        arsenic: Some(round4(rng.gen_range(0.0..0.015))),
        iron: Some(round2(rng.gen_range(0.05..0.6))),
        chloride: Some(round1(rng.gen_range(20.0..400.0))),
        hardness: Some(round1(rng.gen_range(100.0..500.0))),
    }
}

/// Forecast the next `days` days after `start`.
///
/// Levels drift shallower through the monsoon and deeper otherwise. The
/// band widens and confidence decays (floored at 0.5) with the horizon.
pub fn generate_predictions<R: Rng + ?Sized>(
    station: &Station,
    days: u32,
    start: NaiveDate,
    rng: &mut R,
) -> Vec<Prediction> {
    let base = station.groundwater_level();
    let ceiling = station.depth.filter(|d| *d > 0.1).unwrap_or(f64::MAX);

    (1..=days)
        .map(|ahead| {
            let date = start + Duration::days(i64::from(ahead));
            let drift = if (6..=9).contains(&date.month()) { -0.05 } else { 0.03 };
            let step = f64::from(ahead);
            let predicted = (base + drift * step + rng.gen_range(-0.1..0.1)).clamp(0.1, ceiling);
            let spread = 0.3 + 0.15 * step;

            Prediction {
                date,
                predicted_level: round2(predicted),
                lower_bound: round2((predicted - spread).max(0.0)),
                upper_bound: round2(predicted + spread),
                confidence: round2((0.95 - 0.02 * step).max(0.5)),
            }
        })
        .collect()
}

fn round1(v: f64) -> f64 {
    (v * 10.0).round() / 10.0
}

fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

fn round4(v: f64) -> f64 {
    (v * 10_000.0).round() / 10_000.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalize::normalize_all;
    use chrono::TimeZone;
    use std::collections::HashSet;

    fn seeded() -> StdRng {
        StdRng::seed_from_u64(7)
    }

    fn fixed_now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 7, 15, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_roster_covers_every_state_and_district() {
        let roster = generate_roster(&mut seeded(), fixed_now());

        for (state, _, districts) in STATES {
            let in_state: Vec<_> = roster
                .iter()
                .filter(|r| r.state.as_deref() == Some(*state))
                .collect();
            assert!((5..=8).contains(&in_state.len()), "{state}: {}", in_state.len());

            let covered: HashSet<_> = in_state.iter().filter_map(|r| r.district.as_deref()).collect();
            assert_eq!(covered.len(), districts.len());
        }

        let ids: HashSet<_> = roster.iter().filter_map(|r| r.id.as_deref()).collect();
        assert_eq!(ids.len(), roster.len());
    }

    #[test]
    fn test_roster_levels_fit_inside_wells() {
        for record in generate_roster(&mut seeded(), fixed_now()) {
            let depth = record.depth.unwrap();
            let level = record.current_water_level.unwrap();
            assert!((30.0..=150.0).contains(&depth));
            assert!(level >= 2.0 && level <= depth * 0.9 + 0.01);
        }
    }

    #[test]
    fn test_roster_status_agrees_with_freshness() {
        let now = fixed_now();
        let stations = normalize_all(&generate_roster(&mut seeded(), now), now);

        let active = stations.iter().filter(|s| s.status == StationStatus::Active).count();
        assert!(active * 2 > stations.len());
        for station in &stations {
            let age = now - station.last_updated;
            match station.status {
                StationStatus::Active => assert!(age <= Duration::hours(48)),
                StationStatus::Inactive => assert!(age >= Duration::days(35)),
                StationStatus::Maintenance => assert!(age <= Duration::days(10)),
                other => panic!("unexpected status {other:?}"),
            }
        }
    }

    #[test]
    fn test_catalog_roster_stays_fresh_over_uptime() {
        let catalog = MockCatalog::new(seeded());
        let built = Utc::now();
        let statuses = |now: DateTime<Utc>| -> Vec<StationStatus> {
            normalize_all(&catalog.roster(now), now)
                .into_iter()
                .map(|s| s.status)
                .collect()
        };

        let later = built + Duration::days(31);
        let after = statuses(later);
        assert_eq!(after, statuses(built));

        let active = after.iter().filter(|s| **s == StationStatus::Active).count();
        assert!(active * 2 > after.len(), "active after 31 days: {active}/{}", after.len());

        let roster = catalog.roster(later);
        assert_eq!(roster, generate_roster(&mut seeded(), later));
    }

    #[test]
    fn test_same_seed_same_roster() {
        let now = fixed_now();
        assert_eq!(
            generate_roster(&mut seeded(), now),
            generate_roster(&mut seeded(), now)
        );
    }

    #[test]
    fn test_water_level_series_is_ascending_and_bounded() {
        let end = NaiveDate::from_ymd_opt(2024, 7, 15).unwrap();
        let series = generate_water_level_series(12.0, Some(40.0), 30, end, &mut seeded());

        assert_eq!(series.len(), 30);
        assert_eq!(series.last().unwrap().date, end);
        assert!(series.windows(2).all(|w| w[0].date < w[1].date));
        assert!(series.iter().all(|r| r.level > 0.0 && r.level <= 40.0));
    }

    #[test]
    fn test_monsoon_rainfall_is_mostly_wet_with_heavy_days() {
        let end = NaiveDate::from_ymd_opt(2024, 7, 31).unwrap();
        let series = generate_rainfall_series("Jaipur", 365, end, &mut seeded());

        assert_eq!(series.len(), 365);
        let wet = series.iter().filter(|o| o.rainfall_mm > 0.0).count();
        assert!(wet * 2 > series.len(), "wet days: {wet}");
        assert!(series.iter().any(|o| o.rainfall_mm > 20.0));

        assert!(
            series
                .iter()
                .filter(|o| o.date.month() == 4)
                .all(|o| o.rainfall_mm < 20.0)
        );
    }

    #[test]
    fn test_regional_factor_is_stable_and_bounded() {
        assert_eq!(regional_factor("Jaipur"), regional_factor("jaipur"));
        for scope in ["all", "Kota", "Tamil Nadu", ""] {
            let f = regional_factor(scope);
            assert!((0.8..=1.2).contains(&f));
        }
    }

    #[test]
    fn test_predictions_confidence_decays() {
        let now = fixed_now();
        let station = normalize_all(&generate_roster(&mut seeded(), now), now).remove(0);
        let start = now.date_naive();
        let predictions = generate_predictions(&station, 7, start, &mut seeded());

        assert_eq!(predictions.len(), 7);
        assert_eq!(predictions[0].date, start + Duration::days(1));
        assert!(predictions.windows(2).all(|w| w[0].confidence >= w[1].confidence));
        assert!(predictions.iter().all(|p| p.lower_bound <= p.predicted_level && p.predicted_level <= p.upper_bound));
    }

    #[test]
    fn test_catalog_survives_poisoned_lock() {
        let catalog = MockCatalog::from_seed(Some(1));
        let _ = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            catalog.with_rng::<()>(|_| panic!("boom"));
        }));

        let end = NaiveDate::from_ymd_opt(2024, 1, 31).unwrap();
        assert_eq!(catalog.rainfall("all", 10, end).len(), 10);
    }
}
