//! Upstream data providers for groundwater station data.
//!
//! # Data Sources
//!
//! - [`nwic`]: NWIC national resource-query endpoint (groundwater level,
//!   rainfall and water-quality resources, merged per station)
//! - [`government`]: fixed CGWB / IMD / India-WRIS endpoints
//! - [`mock`]: synthetic roster and seasonal generators; the terminal fallback
//!
//! Real providers implement [`StationProvider`]. The
//! [`DataService`](crate::service::DataService) holds them in priority order
//! and takes the first one that answers with data.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;

use crate::error::ProviderError;
use crate::model::{
    DataSource, DroughtRecord, RainfallObservation, RainfallQuery, StateStats, StationRecord,
    TimeSeriesReading, WaterQuality,
};

mod fields;
pub mod government;
pub mod mock;
pub mod nwic;

pub use government::GovernmentApiClient;
pub use mock::MockCatalog;
pub use nwic::NwicClient;

/// A real-data provider strategy.
///
/// Only [`stations`](StationProvider::stations) is mandatory; the other reads
/// default to "no data" so narrow providers (and test doubles) stay small.
#[async_trait]
pub trait StationProvider: Send + Sync {
    /// Which source this provider represents.
    fn source(&self) -> DataSource;

    async fn stations(&self) -> Result<Vec<StationRecord>, ProviderError>;

    async fn water_levels(
        &self,
        _station_id: &str,
        _days: u32,
    ) -> Result<Vec<TimeSeriesReading>, ProviderError> {
        Ok(Vec::new())
    }

    async fn rainfall(
        &self,
        _query: &RainfallQuery,
    ) -> Result<Vec<RainfallObservation>, ProviderError> {
        Ok(Vec::new())
    }

    async fn water_quality(&self, _station_id: &str) -> Result<Option<WaterQuality>, ProviderError> {
        Ok(None)
    }

    async fn state_stats(&self, _state: &str) -> Result<Option<StateStats>, ProviderError> {
        Ok(None)
    }

    async fn drought(&self) -> Result<Vec<DroughtRecord>, ProviderError> {
        Ok(Vec::new())
    }
}

/// Whether a provider response carries usable data.
pub trait Payload {
    fn has_data(&self) -> bool;
}

impl<T> Payload for Vec<T> {
    fn has_data(&self) -> bool {
        !self.is_empty()
    }
}

impl<T> Payload for Option<T> {
    fn has_data(&self) -> bool {
        self.is_some()
    }
}

/// Shared real-data mode flag.
///
/// Cloned into every provider that must honour the mode, so flipping it on
/// the service takes effect everywhere at once.
#[derive(Debug, Clone, Default)]
pub struct RealDataSwitch(Arc<AtomicBool>);

impl RealDataSwitch {
    pub fn new(enabled: bool) -> Self {
        Self(Arc::new(AtomicBool::new(enabled)))
    }

    pub fn is_enabled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }

    pub fn set(&self, enabled: bool) {
        self.0.store(enabled, Ordering::Release);
    }
}
