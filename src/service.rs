//! The Data Service: one entry point for every station read.
//!
//! Reads go to the station cache or the provider chain. Real providers are
//! tried in priority order (NWIC, then the government endpoints) while
//! real-data mode is on; the first one to answer with data wins, and the
//! synthetic catalog answers when none does. No method returns an error:
//! provider failures are logged and treated as "no data from this provider".

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::{NaiveDate, Utc};
use tracing::{debug, info, instrument, warn};

use crate::aggregation::{
    RainfallSample, assess_risk, canonical_series, compute_state_stats, dashboard_stats,
    derive_insights, drought_assessment,
};
use crate::cache::StationCache;
use crate::config::Config;
use crate::data_sources::{
    GovernmentApiClient, MockCatalog, NwicClient, Payload, RealDataSwitch, StationProvider,
};
use crate::error::ProviderError;
use crate::http::build_client;
use crate::model::{
    DashboardStats, DataSource, DataSourceInfo, DroughtRecord, Prediction, RainfallObservation,
    RainfallQuery, RiskAssessment, StateStats, Station, StationFilter, StationInsights,
    TimeSeriesReading, WaterQuality,
};
use crate::normalize::normalize_all;

/// Days of water-level history behind station insights.
const INSIGHT_WINDOW_DAYS: u32 = 30;

/// Days of synthetic rainfall behind the local drought assessment.
const DROUGHT_RAINFALL_DAYS: u32 = 90;

/// Rainfall window when no year is requested.
const DEFAULT_RAINFALL_DAYS: u32 = 365;

/// Longest water-level history or forecast served, in days.
pub const MAX_DAYS: u32 = 3650;

/// Multi-provider station data service.
pub struct DataService {
    providers: Vec<Arc<dyn StationProvider>>,
    mock: MockCatalog,
    real_data: RealDataSwitch,
    cache: StationCache,
}

impl DataService {
    /// Assemble a service from explicit parts.
    ///
    /// `providers` are tried in order. Providers that honour the real-data
    /// mode themselves should share `real_data`.
    pub fn new(
        providers: Vec<Arc<dyn StationProvider>>,
        mock: MockCatalog,
        real_data: RealDataSwitch,
        cache_duration: Duration,
    ) -> Self {
        Self {
            providers,
            mock,
            real_data,
            cache: StationCache::new(cache_duration),
        }
    }

    /// The production wiring: NWIC, then the government endpoints, over one
    /// shared HTTP client.
    pub fn from_config(config: &Config) -> Result<Self, ProviderError> {
        let client = build_client(config.request_timeout)?;
        let real_data = RealDataSwitch::new(config.use_real_data);

        let nwic = NwicClient::new(client.clone(), config.nwic.clone(), real_data.clone());
        let government = GovernmentApiClient::new(client, config.government.clone());

        Ok(Self::new(
            vec![Arc::new(nwic), Arc::new(government)],
            MockCatalog::from_seed(config.mock_seed),
            real_data,
            config.cache_duration,
        ))
    }

    pub fn use_real_data(&self) -> bool {
        self.real_data.is_enabled()
    }

    /// Switch between real and synthetic data. Always clears the cache.
    pub fn set_use_real_data(&self, enabled: bool) {
        self.real_data.set(enabled);
        self.cache.clear();
        info!(use_real_data = enabled, "data mode changed");
    }

    pub fn clear_cache(&self) {
        self.cache.clear();
        debug!("station cache cleared");
    }

    /// Ask each provider in turn; the first `Ok` carrying data wins.
    async fn first_available<T, F, Fut>(&self, operation: &'static str, fetch: F) -> Option<(T, DataSource)>
    where
        T: Payload,
        F: Fn(Arc<dyn StationProvider>) -> Fut,
        Fut: Future<Output = Result<T, ProviderError>>,
    {
        if !self.real_data.is_enabled() {
            return None;
        }

        for provider in &self.providers {
            let source = provider.source();
            match fetch(Arc::clone(provider)).await {
                Ok(data) if data.has_data() => {
                    debug!(provider = source.label(), operation, outcome = "ok", "provider answered");
                    return Some((data, source));
                }
                Ok(_) => {
                    debug!(provider = source.label(), operation, outcome = "empty", "provider answered");
                }
                Err(e) => {
                    warn!(provider = source.label(), operation, error = %e, "provider failed");
                }
            }
        }
        None
    }

    async fn resolve_stations(&self, force: bool) -> (Arc<Vec<Station>>, DataSource) {
        if !force {
            if let Some(hit) = self.cache.get() {
                return hit;
            }
        }

        let now = Utc::now();
        if let Some((records, source)) = self
            .first_available("stations", |p| async move { p.stations().await })
            .await
        {
            let stations = normalize_all(&records, now);
            if !stations.is_empty() {
                info!(provider = source.label(), count = stations.len(), "stations refreshed");
                return (self.cache.store(stations, source), source);
            }
        }

        let stations = normalize_all(&self.mock.roster(now), now);
        info!(count = stations.len(), "serving synthetic stations");
        (self.cache.store(stations, DataSource::Mock), DataSource::Mock)
    }

    /// The current station list.
    ///
    /// Served from cache while it is valid unless `force` is set. Never
    /// empty: the synthetic roster is the last resort.
    #[instrument(skip(self))]
    pub async fn get_stations(&self, force: bool) -> Arc<Vec<Station>> {
        self.resolve_stations(force).await.0
    }

    async fn find_station(&self, station_id: &str) -> Option<Station> {
        self.get_stations(false)
            .await
            .iter()
            .find(|s| s.id == station_id)
            .cloned()
    }

    /// Water-level history, oldest first, at most `days` readings.
    ///
    /// `days` is capped at [`MAX_DAYS`].
    #[instrument(skip(self))]
    pub async fn get_water_level_data(&self, station_id: &str, days: u32) -> Vec<TimeSeriesReading> {
        let days = days.min(MAX_DAYS);
        if days == 0 {
            return Vec::new();
        }

        if let Some((series, _)) = self
            .first_available("water_levels", |p| async move {
                p.water_levels(station_id, days).await
            })
            .await
        {
            return canonical_series(series, days as usize);
        }

        let station = self.find_station(station_id).await;
        let series = self
            .mock
            .water_levels(station.as_ref(), days, Utc::now().date_naive());
        canonical_series(series, days as usize)
    }

    /// Daily rainfall for a state or district.
    ///
    /// With `year` the window is that calendar year (up to today), otherwise
    /// the last 365 days.
    #[instrument(skip(self))]
    pub async fn get_rainfall_data(
        &self,
        state: Option<String>,
        district: Option<String>,
        year: Option<i32>,
    ) -> Vec<RainfallObservation> {
        let query = RainfallQuery {
            state,
            district,
            year,
        };

        if let Some((observations, _)) = self
            .first_available("rainfall", |p| {
                let query = &query;
                async move { p.rainfall(query).await }
            })
            .await
        {
            return observations;
        }

        self.synthetic_rainfall(&query, Utc::now().date_naive())
    }

    fn synthetic_rainfall(&self, query: &RainfallQuery, today: NaiveDate) -> Vec<RainfallObservation> {
        let Some((days, end)) = rainfall_window(query.year, today) else {
            return Vec::new();
        };
        self.mock.rainfall(query.scope(), days, end)
    }

    /// The latest water-quality sample for a station.
    #[instrument(skip(self))]
    pub async fn get_water_quality(&self, station_id: &str) -> WaterQuality {
        if let Some((Some(sample), _)) = self
            .first_available("water_quality", |p| async move {
                p.water_quality(station_id).await
            })
            .await
        {
            return sample;
        }

        self.mock.water_quality(station_id, Utc::now().date_naive())
    }

    /// Statistics for one state, computed locally when no provider has them.
    #[instrument(skip(self))]
    pub async fn get_state_stats(&self, state: &str) -> StateStats {
        if let Some((Some(stats), _)) = self
            .first_available("state_stats", |p| async move { p.state_stats(state).await })
            .await
        {
            return stats;
        }

        compute_state_stats(&self.get_stations(false).await, state)
    }

    /// District drought assessment.
    ///
    /// Falls back to assessing the synthetic roster against synthetic
    /// rainfall for the last 90 days.
    #[instrument(skip(self))]
    pub async fn get_drought_data(&self) -> Vec<DroughtRecord> {
        if let Some((records, _)) = self
            .first_available("drought", |p| async move { p.drought().await })
            .await
        {
            return records;
        }

        let now = Utc::now();
        let stations = normalize_all(&self.mock.roster(now), now);
        let today = now.date_naive();

        let mut districts: Vec<(&str, &str)> = stations
            .iter()
            .map(|s| (s.state.as_str(), s.district.as_str()))
            .collect();
        districts.sort_unstable();
        districts.dedup();

        let rainfall: Vec<RainfallSample> = districts
            .into_iter()
            .flat_map(|(state, district)| {
                self.mock
                    .rainfall(district, DROUGHT_RAINFALL_DAYS, today)
                    .into_iter()
                    .map(move |o| RainfallSample {
                        state: state.to_string(),
                        district: district.to_string(),
                        rainfall_mm: o.rainfall_mm,
                    })
            })
            .collect();

        drought_assessment(&stations, &rainfall)
    }

    /// Stations whose name, district or state contains `query`,
    /// case-insensitively. A blank query matches everything.
    #[instrument(skip(self))]
    pub async fn search_stations(&self, query: &str) -> Vec<Station> {
        let stations = self.get_stations(false).await;
        let needle = query.trim().to_lowercase();
        if needle.is_empty() {
            return stations.to_vec();
        }

        stations
            .iter()
            .filter(|s| {
                [&s.name, &s.district, &s.state]
                    .iter()
                    .any(|field| field.to_lowercase().contains(&needle))
            })
            .cloned()
            .collect()
    }

    #[instrument(skip(self))]
    pub async fn get_stations_by_filter(&self, filter: &StationFilter) -> Vec<Station> {
        self.get_stations(false)
            .await
            .iter()
            .filter(|s| filter.matches(s))
            .cloned()
            .collect()
    }

    #[instrument(skip(self))]
    pub async fn get_dashboard_stats(&self) -> DashboardStats {
        let (stations, source) = self.resolve_stations(false).await;
        dashboard_stats(&stations, source.label(), Utc::now())
    }

    /// Depletion risk for a station; `None` if the station is unknown.
    #[instrument(skip(self))]
    pub async fn get_risk_assessment(&self, station_id: &str) -> Option<RiskAssessment> {
        let station = self.find_station(station_id).await?;
        Some(assess_risk(&station, Utc::now()))
    }

    /// Rule-based insights from the risk assessment and the last 30 days of
    /// water levels; `None` if the station is unknown.
    #[instrument(skip(self))]
    pub async fn get_ai_insights(&self, station_id: &str) -> Option<StationInsights> {
        let station = self.find_station(station_id).await?;
        let now = Utc::now();
        let risk = assess_risk(&station, now);
        let series = self
            .get_water_level_data(station_id, INSIGHT_WINDOW_DAYS)
            .await;
        Some(derive_insights(&station, &risk, &series, now))
    }

    /// Synthetic forecast for the next `days` days, capped at [`MAX_DAYS`];
    /// empty for unknown stations.
    #[instrument(skip(self))]
    pub async fn get_predictions(&self, station_id: &str, days: u32) -> Vec<Prediction> {
        let days = days.min(MAX_DAYS);
        match self.find_station(station_id).await {
            Some(station) => self
                .mock
                .predictions(&station, days, Utc::now().date_naive()),
            None => Vec::new(),
        }
    }

    /// Cache and provider status. Never triggers a fetch.
    pub fn get_data_source_info(&self) -> DataSourceInfo {
        let snapshot = self.cache.snapshot();
        let providers = self
            .providers
            .iter()
            .map(|p| p.source())
            .chain(std::iter::once(DataSource::Mock))
            .map(|source| source.label().to_string())
            .collect();

        DataSourceInfo {
            use_real_data: self.use_real_data(),
            data_source: snapshot.source.map(|s| s.label().to_string()),
            providers,
            cached_stations: snapshot.stations,
            last_fetch: snapshot.last_fetch,
            cache_age_seconds: snapshot.age.map(|age| age.as_secs()),
            cache_valid: snapshot.valid,
        }
    }
}

/// Number of days and final date of a synthetic rainfall window.
///
/// `None` for a year entirely in the future.
fn rainfall_window(year: Option<i32>, today: NaiveDate) -> Option<(u32, NaiveDate)> {
    let Some(year) = year else {
        return Some((DEFAULT_RAINFALL_DAYS, today));
    };

    let start = NaiveDate::from_ymd_opt(year, 1, 1)?;
    let end = NaiveDate::from_ymd_opt(year, 12, 31)?.min(today);
    if end < start {
        return None;
    }
    let days = u32::try_from((end - start).num_days() + 1).ok()?;
    Some((days, end))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Datelike;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn mock_only() -> DataService {
        DataService::new(
            Vec::new(),
            MockCatalog::new(StdRng::seed_from_u64(11)),
            RealDataSwitch::new(false),
            Duration::from_secs(300),
        )
    }

    #[test]
    fn test_rainfall_window() {
        let today = NaiveDate::from_ymd_opt(2024, 7, 15).unwrap();

        assert_eq!(rainfall_window(None, today), Some((365, today)));
        assert_eq!(
            rainfall_window(Some(2023), today),
            Some((365, NaiveDate::from_ymd_opt(2023, 12, 31).unwrap()))
        );
        // 2024 is a leap year: Jan 1 to Jul 15 inclusive.
        assert_eq!(rainfall_window(Some(2024), today), Some((197, today)));
        assert_eq!(rainfall_window(Some(2025), today), None);
    }

    #[tokio::test]
    async fn test_mock_mode_serves_roster() {
        let service = mock_only();
        let stations = service.get_stations(false).await;

        assert!(!stations.is_empty());
        assert!(stations.iter().all(|s| s.id.starts_with("DWLR-")));
        assert_eq!(service.get_data_source_info().data_source.as_deref(), Some("Simulated"));
    }

    #[tokio::test]
    async fn test_search_is_case_insensitive_substring() {
        let service = mock_only();
        let hits = service.search_stations("JAIPUR").await;

        assert!(!hits.is_empty());
        for station in &hits {
            let haystack = format!("{} {} {}", station.name, station.district, station.state).to_lowercase();
            assert!(haystack.contains("jaipur"));
        }

        let all = service.search_stations("   ").await;
        assert_eq!(all.len(), service.get_stations(false).await.len());
    }

    #[tokio::test]
    async fn test_water_levels_are_ascending_and_truncated() {
        let service = mock_only();
        let id = service.get_stations(false).await[0].id.clone();
        let series = service.get_water_level_data(&id, 14).await;

        assert_eq!(series.len(), 14);
        assert!(series.windows(2).all(|w| w[0].date < w[1].date));
        assert!(service.get_water_level_data(&id, 0).await.is_empty());
    }

    #[tokio::test]
    async fn test_unknown_station_has_no_risk_or_insights() {
        let service = mock_only();
        assert!(service.get_risk_assessment("nope").await.is_none());
        assert!(service.get_ai_insights("nope").await.is_none());
        assert!(service.get_predictions("nope", 7).await.is_empty());
    }

    #[test]
    fn test_monsoon_rainfall_window_is_mostly_wet() {
        let service = mock_only();
        let query = RainfallQuery {
            state: None,
            district: Some("Jaipur".to_string()),
            year: None,
        };
        let today = NaiveDate::from_ymd_opt(2024, 8, 20).unwrap();

        let observations = service.synthetic_rainfall(&query, today);

        assert_eq!(observations.len(), 365);
        assert_eq!(observations.last().unwrap().date, today);
        let wet = observations.iter().filter(|o| o.rainfall_mm > 0.0).count();
        assert!(wet * 2 > observations.len(), "wet days: {wet}");
        assert!(observations.iter().any(|o| o.rainfall_mm > 20.0));
    }

    #[tokio::test]
    async fn test_rainfall_for_past_year_has_wet_monsoon() {
        let service = mock_only();
        let observations = service
            .get_rainfall_data(Some("Rajasthan".to_string()), None, Some(2023))
            .await;

        assert_eq!(observations.len(), 365);
        let monsoon: Vec<_> = observations
            .iter()
            .filter(|o| (6..=9).contains(&o.date.month()))
            .collect();
        let wet = monsoon.iter().filter(|o| o.rainfall_mm > 0.0).count();
        assert!(wet * 2 > monsoon.len(), "wet monsoon days: {wet}/{}", monsoon.len());
        assert!(monsoon.iter().any(|o| o.rainfall_mm > 20.0));
    }

    #[tokio::test]
    async fn test_days_are_capped() {
        let service = mock_only();
        let id = service.get_stations(false).await[0].id.clone();

        let series = service.get_water_level_data(&id, u32::MAX).await;
        assert_eq!(series.len(), MAX_DAYS as usize);
        assert_eq!(service.get_predictions(&id, u32::MAX).await.len(), MAX_DAYS as usize);
    }

    #[tokio::test]
    async fn test_dashboard_critical_is_sum_of_state_critical() {
        let service = mock_only();
        let stations = service.get_stations(false).await;

        let mut states: Vec<&str> = stations.iter().map(|s| s.state.as_str()).collect();
        states.sort_unstable();
        states.dedup();
        let mut per_state = 0;
        for state in states {
            per_state += service.get_state_stats(state).await.critical_stations;
        }

        assert!(per_state > 0);
        assert_eq!(service.get_dashboard_stats().await.critical_stations, per_state);
    }

    #[tokio::test]
    async fn test_local_drought_covers_roster_districts() {
        let service = mock_only();
        let records = service.get_drought_data().await;

        assert!(!records.is_empty());
        assert!(records.iter().any(|r| r.district == "Jaipur"));
        assert!(records.windows(2).all(|w| w[0].severity >= w[1].severity));
    }
}
