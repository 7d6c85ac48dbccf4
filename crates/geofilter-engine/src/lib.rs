// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! Service resolution, value domain harvesting and spatial predicates for
//! geodata portal filters.
//!
//! The components are usable on their own; [`FilterEngine`] wires them
//! together and owns the resulting state.

pub mod catalog;
pub mod engine;
pub mod error;
pub mod geojson;
pub mod harvest;
pub mod matcher;
pub mod rules;
pub mod service;
pub mod spatial;
pub mod state;
pub mod transport;

pub use catalog::{CatalogEntry, CatalogServiceType, InMemoryCatalog, LayerModel, ServiceCatalog};
pub use engine::{DomainRefresh, FilterEngine};
pub use error::{CatalogError, FilterError, ParseError, Result, TransportError};
pub use geojson::{FeatureParser, GeoJsonParser, ParsedFeature, ParserRegistry};
pub use harvest::{HarvestedDomain, ValueDomainHarvester};
pub use matcher::FeatureMatcher;
pub use rules::{RuleInput, RuleSet};
pub use service::{FixedProjection, MapProjection, ServiceResolver};
pub use spatial::{GeometryRef, SpatialFilterGeometry, SpatialGeometryProvider};
pub use state::{ChannelStateSink, NoopStateSink, StateAction, StateSink};
pub use transport::{FeatureTransport, HttpTransport, SensorTransport};
