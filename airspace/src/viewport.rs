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

use std::time::Instant;

use geo::MultiPolygon;
use log::debug;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::clip::{ClipOptions, ClipStats, OverlapResolver};
use crate::error::Error;
use crate::geom::Bounds;
use crate::project::project;
use crate::query;
use crate::store::{AirspaceMeta, AirspaceSource};

/// A viewport update of the map.
#[derive(Clone, PartialEq, Debug)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ViewportRequest {
    pub bounds: Bounds,
    /// Airspaces with a floor above this altitude are not shown.
    pub max_altitude_ft: i32,
    pub excluded_type_codes: Vec<i32>,
}

impl ViewportRequest {
    pub fn new(bounds: Bounds, max_altitude_ft: i32) -> Self {
        Self {
            bounds,
            max_altitude_ft,
            excluded_type_codes: Vec::new(),
        }
    }

    pub fn with_excluded_types(mut self, type_codes: impl IntoIterator<Item = i32>) -> Self {
        self.excluded_type_codes = type_codes.into_iter().collect();
        self
    }
}

/// An airspace as it is painted on the map.
#[derive(Clone, PartialEq, Debug)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct RenderedAirspace {
    pub meta: AirspaceMeta,
    /// The area of the airspace that is not covered by a lower airspace.
    pub polygon: MultiPolygon<f64>,
    /// Whether a lower airspace cut into the polygon.
    pub clipped: bool,
}

/// The airspaces of a viewport, sorted by floor.
#[derive(Clone, PartialEq, Debug, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct RenderedViewport {
    pub airspaces: Vec<RenderedAirspace>,
    pub stats: ClipStats,
}

/// Renders viewports from an airspace source.
///
/// Each call to [`render`](Self::render) is a self-contained computation of
/// the store state, the viewport and the filters. Callers that pan or zoom
/// quickly should discard stale results themselves.
#[derive(Debug)]
pub struct ViewportRenderer<'a, S: ?Sized> {
    source: &'a S,
    resolver: OverlapResolver,
}

impl<'a, S: AirspaceSource + ?Sized> ViewportRenderer<'a, S> {
    pub fn new(source: &'a S) -> Self {
        Self {
            source,
            resolver: OverlapResolver::default(),
        }
    }

    pub fn with_options(mut self, options: ClipOptions) -> Self {
        self.resolver = OverlapResolver::new(options);
        self
    }

    /// Returns the airspaces of the viewport with their overlap resolved.
    ///
    /// Airspaces that are completely covered by lower ones are left out.
    ///
    /// # Errors
    ///
    /// Fails if the viewport is invalid or the source can't be read. Single
    /// airspaces that can't be read or clipped never fail the request.
    pub fn render(&self, request: &ViewportRequest) -> Result<RenderedViewport, Error> {
        let start = Instant::now();

        let query = query::plan(
            request.bounds,
            request.max_altitude_ft,
            &request.excluded_type_codes,
        )?;
        let candidates = self.source.query(&query)?;
        let resolution = self.resolver.resolve(&candidates);

        let airspaces: Vec<RenderedAirspace> = candidates
            .iter()
            .zip(&resolution.polygons)
            .filter_map(|(candidate, clipped)| {
                project(clipped).map(|polygon| RenderedAirspace {
                    meta: candidate.meta.clone(),
                    polygon,
                    clipped: clipped.is_clipped(),
                })
            })
            .collect();

        debug!(
            "rendered {} of {} airspace(s) in {} in {:?} ({})",
            airspaces.len(),
            candidates.len(),
            request.bounds,
            start.elapsed(),
            resolution.stats
        );

        Ok(RenderedViewport {
            airspaces,
            stats: resolution.stats,
        })
    }
}
