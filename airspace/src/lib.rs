// SPDX-License-Identifier: Apache-2.0
// Copyright 2026 Joe Pearson
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Airspace geometry store and overlap resolution.
//!
//! Restricted and controlled airspaces are stacked on top of each other. When
//! all of them are painted on a map, the regions where they overlap are
//! painted multiple times. This crate stores airspaces in a spatially indexed
//! cache and resolves the overlap before rendering: every airspace loses the
//! area that is already claimed by an airspace with a lower floor, so each
//! location is painted exactly once.
//!
//! The read path of a viewport update flows through four stages:
//!
//! 1. [`query::plan`] turns the viewport and filters into a [`Query`].
//! 2. An [`AirspaceSource`] (the SQLite [`Store`] or the in-memory
//!    [`MemoryStore`]) returns the candidates sorted by floor.
//! 3. The [`OverlapResolver`] removes the area of lower airspaces from higher
//!    ones, working on the fixed-point coordinates of the [`codec`].
//! 4. [`project()`] converts the result back to geographic coordinates.
//!
//! [`ViewportRenderer`] wires these stages together.
//!
//! # Examples
//!
//! ```
//! use airspace::prelude::*;
//!
//! # fn main() -> Result<(), airspace::Error> {
//! let store = Store::open_in_memory()?;
//!
//! let ctr = AirspaceRecord::new(
//!     AirspaceMeta::new("ctr").with_limits(AltitudeLimit::Gnd, AltitudeLimit::Msl(2500)),
//!     polygon![(53.0, 9.0), (53.0, 10.0), (54.0, 10.0), (54.0, 9.0)],
//! );
//! let tma = AirspaceRecord::new(
//!     AirspaceMeta::new("tma").with_limits(AltitudeLimit::Msl(1500), AltitudeLimit::Fl(65)),
//!     polygon![(52.5, 8.5), (52.5, 10.5), (54.5, 10.5), (54.5, 8.5)],
//! );
//! store.upsert_batch(&[ctr, tma])?;
//!
//! let request = ViewportRequest::new(Bounds::new(8.0, 52.0, 11.0, 55.0), 10_000);
//! let viewport = ViewportRenderer::new(&store).render(&request)?;
//!
//! assert_eq!(viewport.airspaces.len(), 2);
//! # Ok(())
//! # }
//! ```

#![cfg_attr(docsrs, feature(doc_cfg))]

#[macro_use]
mod macros;

mod altitude;
pub mod clip;
pub mod codec;
mod error;
mod geom;
#[cfg(feature = "geojson")]
mod geojson;
pub mod project;
pub mod query;
mod store;
mod viewport;

pub mod prelude;

pub use geo;

pub use altitude::AltitudeLimit;
pub use clip::{ClipOptions, ClipStats, ClippedPolygon, OverlapResolver, Resolution};
pub use codec::{EncodedGeometry, FixedCoord};
pub use error::Error;
pub use geom::{Bounds, FixedRect};
#[cfg(feature = "geojson")]
pub use self::geojson::{records_from_feature, records_from_geojson};
pub use project::project;
pub use query::Query;
pub use store::{
    Airspace, AirspaceMeta, AirspaceRecord, AirspaceSource, MemoryStore, RegionInfo, Store,
    StoreOptions,
};
pub use viewport::{RenderedAirspace, RenderedViewport, ViewportRenderer, ViewportRequest};
