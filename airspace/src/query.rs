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

//! Viewport query planning.
//!
//! The planner translates what the map shows into the predicate the stores
//! evaluate in one indexed range query. It doesn't look at any geometry.

use log::trace;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::Error;
use crate::geom::Bounds;
use crate::store::AirspaceMeta;

/// A planned viewport query.
///
/// An airspace matches if its bounds intersect the viewport, its floor is at
/// or below `max_altitude_ft` and its type code is not excluded. Airspaces
/// without a floor always pass the altitude filter since they are assumed
/// to start at or below ground.
///
/// Results must be ordered by floor ascending with airspaces without floor
/// first and ties broken by identifier.
#[derive(Clone, PartialEq, Debug)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Query {
    lon_ranges: Vec<(f64, f64)>,
    south: f64,
    north: f64,
    max_altitude_ft: i32,
    excluded_types: Vec<i32>,
}

/// Plans the query for a viewport.
///
/// A viewport whose west edge is east of its east edge crosses the
/// anti-meridian and is split into two longitude ranges. Latitudes and
/// longitudes are clamped to the valid range.
///
/// # Errors
///
/// Returns [`InvalidViewport`] if any bound is not finite or the south edge
/// is north of the north edge.
///
/// [`InvalidViewport`]: Error::InvalidViewport
pub fn plan(
    viewport: Bounds,
    max_altitude_ft: i32,
    excluded_type_codes: &[i32],
) -> Result<Query, Error> {
    if !viewport.is_finite() || viewport.south > viewport.north {
        return Err(Error::InvalidViewport);
    }

    let south = viewport.south.clamp(-90.0, 90.0);
    let north = viewport.north.clamp(-90.0, 90.0);

    let lon_ranges = if viewport.east - viewport.west >= 360.0 {
        vec![(-180.0, 180.0)]
    } else {
        let west = wrap_longitude(viewport.west);
        let east = wrap_longitude(viewport.east);

        if west <= east {
            vec![(west, east)]
        } else {
            vec![(west, 180.0), (-180.0, east)]
        }
    };

    let mut excluded_types = excluded_type_codes.to_vec();
    excluded_types.sort_unstable();
    excluded_types.dedup();

    let query = Query {
        lon_ranges,
        south,
        north,
        max_altitude_ft,
        excluded_types,
    };

    trace!("planned {:?}", query);

    Ok(query)
}

/// Wraps a longitude into the range from -180° to 180°.
fn wrap_longitude(lon: f64) -> f64 {
    if (-180.0..=180.0).contains(&lon) {
        lon
    } else {
        (lon + 180.0).rem_euclid(360.0) - 180.0
    }
}

impl Query {
    /// The longitude ranges from west to east, one or two if the viewport
    /// crosses the anti-meridian.
    pub fn lon_ranges(&self) -> &[(f64, f64)] {
        &self.lon_ranges
    }

    pub fn south(&self) -> f64 {
        self.south
    }

    pub fn north(&self) -> f64 {
        self.north
    }

    pub fn max_altitude_ft(&self) -> i32 {
        self.max_altitude_ft
    }

    /// The excluded type codes, sorted and without duplicates.
    pub fn excluded_types(&self) -> &[i32] {
        &self.excluded_types
    }

    /// Returns the bounding boxes that cover the viewport.
    pub fn envelopes(&self) -> impl Iterator<Item = Bounds> + '_ {
        self.lon_ranges
            .iter()
            .map(|&(west, east)| Bounds::new(west, self.south, east, self.north))
    }

    /// Returns `true` if the bounds intersect the viewport.
    pub fn intersects(&self, bounds: &Bounds) -> bool {
        self.envelopes().any(|envelope| envelope.intersects(bounds))
    }

    /// Returns `true` if the airspace passes the altitude and type filter.
    pub fn accepts(&self, meta: &AirspaceMeta) -> bool {
        let below_ceiling = meta
            .lower_altitude_ft
            .is_none_or(|floor| floor <= self.max_altitude_ft);

        below_ceiling && self.excluded_types.binary_search(&meta.type_code).is_err()
    }
}
