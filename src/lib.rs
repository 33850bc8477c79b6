//! Groundwatch - groundwater station data reconciliation with multi-provider fallback.
//!
//! # Overview
//!
//! Groundwatch serves groundwater monitoring data (DWLR stations, water-level
//! history, rainfall, water quality, drought and risk indicators) to UI
//! clients. Real data comes from the NWIC resource-query API and the fixed
//! CGWB / IMD / India-WRIS endpoints; a synthetic catalog answers whenever
//! they cannot, so every read returns something renderable.
//!
//! # Modules
//!
//! - [`model`]: Station, series and derived-indicator types
//! - [`normalize`]: Mapping of any provider record onto the canonical [`model::Station`]
//! - [`freshness`]: The 30-day freshness window and timestamp parsing
//! - [`data_sources`]: NWIC, government and synthetic providers
//! - [`aggregation`]: State statistics, drought, risk and insight derivations
//! - [`cache`]: Single-slot station cache
//! - [`service`]: The [`service::DataService`] façade and provider chain
//! - [`api`]: HTTP API handlers
//! - [`config`]: Environment configuration

pub mod aggregation;
pub mod api;
pub mod cache;
pub mod config;
pub mod data_sources;
pub mod error;
pub mod freshness;
pub mod http;
pub mod model;
pub mod normalize;
pub mod service;
