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

use std::fmt::{Display, Formatter, Result};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::altitude::AltitudeLimit;
use crate::codec::{self, EncodedGeometry};
use crate::error::Error;
use crate::geom::Bounds;

/// Classification and display data of an airspace.
///
/// Except for the floor and the type code, which are filtered on, the
/// metadata is carried through the pipeline untouched.
#[derive(Clone, Eq, PartialEq, Hash, Debug, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct AirspaceMeta {
    /// Stable identifier, unique across the store.
    pub id: String,
    pub name: String,
    pub type_code: i32,
    pub icao_class: Option<i32>,
    /// Country or region code the airspace is published by.
    pub country: String,
    /// Floor in feet. An airspace without floor is assumed to start at or
    /// below ground.
    pub lower_altitude_ft: Option<i32>,
    /// Ceiling in feet or `None` if unlimited.
    pub upper_altitude_ft: Option<i32>,
    /// Opaque display properties.
    pub extra_properties: Option<String>,
}

impl AirspaceMeta {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Default::default()
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_type(mut self, type_code: i32) -> Self {
        self.type_code = type_code;
        self
    }

    pub fn with_icao_class(mut self, icao_class: i32) -> Self {
        self.icao_class = Some(icao_class);
        self
    }

    pub fn with_country(mut self, country: impl Into<String>) -> Self {
        self.country = country.into();
        self
    }

    /// Sets floor and ceiling from the published limits.
    pub fn with_limits(mut self, floor: AltitudeLimit, ceiling: AltitudeLimit) -> Self {
        self.lower_altitude_ft = floor.to_feet();
        self.upper_altitude_ft = ceiling.to_feet();
        self
    }

    pub fn with_extra_properties(mut self, properties: impl Into<String>) -> Self {
        self.extra_properties = Some(properties.into());
        self
    }
}

impl Display for AirspaceMeta {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        fn limit(ft: Option<i32>, none: &str) -> String {
            ft.map_or_else(|| none.to_string(), |ft| format!("{ft} ft"))
        }

        write!(
            f,
            "{} ({}): {} | {}/{}",
            self.name,
            self.id,
            self.type_code,
            limit(self.upper_altitude_ft, "unlimited"),
            limit(self.lower_altitude_ft, "unknown"),
        )
    }
}

/// An airspace as delivered by the ingestion into the store.
///
/// The polygon is in geographic coordinates with `x` as longitude and `y` as
/// latitude. An airspace that consists of several disjoint polygons is
/// ingested as several records.
#[derive(Clone, PartialEq, Debug)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct AirspaceRecord {
    pub meta: AirspaceMeta,
    pub polygon: geo::Polygon<f64>,
}

impl AirspaceRecord {
    pub fn new(meta: AirspaceMeta, polygon: geo::Polygon<f64>) -> Self {
        Self { meta, polygon }
    }
}

/// An airspace read from the store.
///
/// The geometry is kept in its fixed-point representation. Bounds are the
/// tight envelope of the geometry and are computed once when the airspace is
/// written.
#[derive(Clone, PartialEq, Debug)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Airspace {
    pub meta: AirspaceMeta,
    pub bounds: Bounds,
    pub geometry: EncodedGeometry,
}

impl TryFrom<&AirspaceRecord> for Airspace {
    type Error = Error;

    /// Validates and encodes the record.
    ///
    /// # Errors
    ///
    /// - [`EmptyId`] if the record has no identifier
    /// - [`CoordinateOutOfRange`] for coordinates outside of ±180°/±90°
    /// - [`DegenerateRing`] if a ring has less than three distinct points
    ///   after encoding
    ///
    /// [`EmptyId`]: Error::EmptyId
    /// [`CoordinateOutOfRange`]: Error::CoordinateOutOfRange
    /// [`DegenerateRing`]: Error::DegenerateRing
    fn try_from(record: &AirspaceRecord) -> std::result::Result<Self, Self::Error> {
        let id = &record.meta.id;

        if id.trim().is_empty() {
            return Err(Error::EmptyId);
        }

        let rings = std::iter::once(record.polygon.exterior()).chain(record.polygon.interiors());

        for c in rings.flat_map(|ring| ring.coords()) {
            if !codec::in_range(c.x, c.y) {
                return Err(Error::CoordinateOutOfRange {
                    id: id.clone(),
                    longitude: c.x,
                    latitude: c.y,
                });
            }
        }

        let geometry = EncodedGeometry::encode(&record.polygon);

        for ring in 0..geometry.num_rings().max(1) {
            let points = geometry.ring(ring).map_or(0, |r| r.len());
            if points < 3 {
                return Err(Error::DegenerateRing {
                    id: id.clone(),
                    ring,
                    points,
                });
            }
        }

        let bounds = geometry
            .envelope()
            .map(Bounds::from)
            .ok_or_else(|| Error::DegenerateRing {
                id: id.clone(),
                ring: 0,
                points: 0,
            })?;

        Ok(Self {
            meta: record.meta.clone(),
            bounds,
            geometry,
        })
    }
}
