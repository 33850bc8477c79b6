//! Provider chain behaviour of the data service: fallback order, cache
//! coherence and the real-data switch.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use rand::SeedableRng;
use rand::rngs::StdRng;

use groundwatch::data_sources::{MockCatalog, RealDataSwitch, StationProvider};
use groundwatch::error::ProviderError;
use groundwatch::model::{DataSource, RiskLevel, StationRecord, TimeSeriesReading};
use groundwatch::service::DataService;

enum Behaviour {
    Fail,
    Empty,
    Stations(Vec<StationRecord>),
}

struct FakeProvider {
    source: DataSource,
    behaviour: Behaviour,
    calls: AtomicUsize,
}

impl FakeProvider {
    fn new(source: DataSource, behaviour: Behaviour) -> Arc<Self> {
        Arc::new(Self {
            source,
            behaviour,
            calls: AtomicUsize::new(0),
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl StationProvider for FakeProvider {
    fn source(&self) -> DataSource {
        self.source
    }

    async fn stations(&self) -> Result<Vec<StationRecord>, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.behaviour {
            Behaviour::Fail => Err(ProviderError::Upstream("connection refused".to_string())),
            Behaviour::Empty => Ok(Vec::new()),
            Behaviour::Stations(records) => Ok(records.clone()),
        }
    }

    async fn water_levels(
        &self,
        _station_id: &str,
        _days: u32,
    ) -> Result<Vec<TimeSeriesReading>, ProviderError> {
        match &self.behaviour {
            Behaviour::Fail => Err(ProviderError::Upstream("connection refused".to_string())),
            _ => Ok(Vec::new()),
        }
    }
}

fn well(id: &str, level: f64, depth: f64) -> StationRecord {
    StationRecord {
        id: Some(id.to_string()),
        name: Some(format!("Well {id}")),
        state: Some("Rajasthan".to_string()),
        district: Some("Jaipur".to_string()),
        latitude: Some(26.9),
        longitude: Some(75.8),
        current_water_level: Some(level),
        depth: Some(depth),
        last_updated: Some(Utc::now().to_rfc3339()),
        ..Default::default()
    }
}

fn service(providers: Vec<Arc<dyn StationProvider>>, real_data: bool) -> DataService {
    DataService::new(
        providers,
        MockCatalog::new(StdRng::seed_from_u64(7)),
        RealDataSwitch::new(real_data),
        Duration::from_secs(300),
    )
}

#[tokio::test]
async fn test_failing_and_empty_providers_fall_back_to_roster() {
    let failing = FakeProvider::new(DataSource::Nwic, Behaviour::Fail);
    let empty = FakeProvider::new(DataSource::Government, Behaviour::Empty);
    let service = service(vec![failing.clone(), empty.clone()], true);

    let stations = service.get_stations(false).await;

    assert!(!stations.is_empty());
    assert!(stations.iter().all(|s| s.id.starts_with("DWLR-")));
    assert_eq!(failing.calls(), 1);
    assert_eq!(empty.calls(), 1);
    assert_eq!(
        service.get_data_source_info().data_source.as_deref(),
        Some("Simulated")
    );
}

#[tokio::test]
async fn test_first_provider_with_data_wins() {
    let failing = FakeProvider::new(DataSource::Nwic, Behaviour::Fail);
    let government = FakeProvider::new(
        DataSource::Government,
        Behaviour::Stations(vec![well("GOV-1", 10.0, 50.0)]),
    );
    let service = service(vec![failing.clone(), government.clone()], true);

    let stations = service.get_stations(false).await;

    assert_eq!(stations.len(), 1);
    assert_eq!(stations[0].id, "GOV-1");
    assert_eq!(
        service.get_data_source_info().data_source.as_deref(),
        Some("Government API")
    );
}

#[tokio::test]
async fn test_cache_hit_returns_same_list_without_refetch() {
    let provider = FakeProvider::new(
        DataSource::Nwic,
        Behaviour::Stations(vec![well("NW-1", 10.0, 50.0)]),
    );
    let service = service(vec![provider.clone()], true);

    let first = service.get_stations(false).await;
    let second = service.get_stations(false).await;

    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(provider.calls(), 1);
}

#[tokio::test]
async fn test_force_bypasses_cache() {
    let provider = FakeProvider::new(
        DataSource::Nwic,
        Behaviour::Stations(vec![well("NW-1", 10.0, 50.0)]),
    );
    let service = service(vec![provider.clone()], true);

    let first = service.get_stations(false).await;
    let forced = service.get_stations(true).await;

    assert!(!Arc::ptr_eq(&first, &forced));
    assert_eq!(provider.calls(), 2);

    let cached = service.get_stations(false).await;
    assert!(Arc::ptr_eq(&forced, &cached));
    assert_eq!(provider.calls(), 2);
}

#[tokio::test]
async fn test_mock_mode_never_calls_providers() {
    let provider = FakeProvider::new(
        DataSource::Nwic,
        Behaviour::Stations(vec![well("NW-1", 10.0, 50.0)]),
    );
    let service = service(vec![provider.clone()], false);

    let stations = service.get_stations(true).await;

    assert!(stations.iter().all(|s| s.id.starts_with("DWLR-")));
    assert_eq!(provider.calls(), 0);
}

#[tokio::test]
async fn test_switching_mode_clears_cache() {
    let provider = FakeProvider::new(
        DataSource::Nwic,
        Behaviour::Stations(vec![well("NW-1", 10.0, 50.0)]),
    );
    let service = service(vec![provider.clone()], false);

    let synthetic = service.get_stations(false).await;
    assert!(synthetic.iter().all(|s| s.id.starts_with("DWLR-")));

    service.set_use_real_data(true);
    let info = service.get_data_source_info();
    assert!(info.use_real_data);
    assert!(!info.cache_valid);
    assert_eq!(info.cached_stations, 0);

    let real = service.get_stations(false).await;
    assert_eq!(real.len(), 1);
    assert_eq!(real[0].id, "NW-1");
    assert_eq!(provider.calls(), 1);
}

#[tokio::test]
async fn test_water_levels_fall_back_after_provider_error() {
    let failing = FakeProvider::new(DataSource::Nwic, Behaviour::Fail);
    let service = service(vec![failing], true);

    let series = service.get_water_level_data("anything", 10).await;

    assert_eq!(series.len(), 10);
    assert!(series.windows(2).all(|w| w[0].date < w[1].date));
}

#[tokio::test]
async fn test_risk_bands_follow_utilization() {
    let provider = FakeProvider::new(
        DataSource::Government,
        Behaviour::Stations(vec![
            well("DEEP", 85.0, 100.0),
            well("MID", 50.0, 100.0),
            well("SHALLOW", 10.0, 100.0),
        ]),
    );
    let service = service(vec![provider], true);

    let deep = service.get_risk_assessment("DEEP").await.unwrap();
    assert_eq!(deep.risk_level, RiskLevel::Critical);
    assert!((deep.utilization_rate - 0.85).abs() < 1e-9);

    let mid = service.get_risk_assessment("MID").await.unwrap();
    assert_eq!(mid.risk_level, RiskLevel::Moderate);

    let shallow = service.get_risk_assessment("SHALLOW").await.unwrap();
    assert_eq!(shallow.risk_level, RiskLevel::Low);
    assert!(shallow.risk_score < deep.risk_score);
}

#[tokio::test]
async fn test_state_stats_fall_back_to_local_computation() {
    let provider = FakeProvider::new(
        DataSource::Nwic,
        Behaviour::Stations(vec![well("A", 10.0, 50.0), well("B", 30.0, 50.0)]),
    );
    let service = service(vec![provider], true);

    let stats = service.get_state_stats("rajasthan").await;

    assert_eq!(stats.total_stations, 2);
    assert!((stats.avg_water_level - 20.0).abs() < 1e-9);
    assert_eq!(stats.critical_stations, 1);
}
