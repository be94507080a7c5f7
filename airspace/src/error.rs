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

use std::fmt;

/// Errors reported by the airspace store and the viewport pipeline.
///
/// Only the write boundary and the storage layer surface errors to the
/// caller. Failures of a single airspace during rendering are logged and
/// isolated, they never abort a viewport.
#[derive(Clone, PartialEq, Debug)]
pub enum Error {
    /// A coordinate of the airspace is outside of ±180° longitude or ±90°
    /// latitude, or is not finite.
    CoordinateOutOfRange {
        id: String,
        longitude: f64,
        latitude: f64,
    },
    /// A ring of the airspace has less than three distinct points.
    DegenerateRing {
        id: String,
        ring: usize,
        points: usize,
    },
    /// The same identifier appears twice in one batch.
    DuplicateId(String),
    /// The airspace has no identifier.
    EmptyId,
    /// A record of a region batch belongs to another country.
    ForeignRecord { id: String, country: String },
    /// A persisted coordinate buffer can't be decoded.
    CorruptGeometry(String),
    /// The viewport bounds are not finite or south is above north.
    InvalidViewport,
    /// A polygon boolean operation failed.
    Geometry(String),
    /// An error of the underlying storage.
    Storage(String),
    /// The storage schema could not be migrated.
    Migration(String),
    /// A GeoJSON feature can't be converted into an airspace.
    InvalidFeature(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CoordinateOutOfRange {
                id,
                longitude,
                latitude,
            } => write!(
                f,
                "airspace {id} has coordinate ({latitude}, {longitude}) out of range"
            ),
            Self::DegenerateRing { id, ring, points } => write!(
                f,
                "ring {ring} of airspace {id} should have at least 3 points but has {points}"
            ),
            Self::DuplicateId(id) => write!(f, "airspace {id} appears more than once in batch"),
            Self::EmptyId => write!(f, "airspace has an empty identifier"),
            Self::ForeignRecord { id, country } => {
                write!(f, "airspace {id} doesn't belong to region {country}")
            }
            Self::CorruptGeometry(reason) => write!(f, "corrupt geometry: {reason}"),
            Self::InvalidViewport => write!(f, "invalid viewport bounds"),
            Self::Geometry(e) => write!(f, "geometry error: {e}"),
            Self::Storage(e) => write!(f, "storage error: {e}"),
            Self::Migration(e) => write!(f, "schema migration failed: {e}"),
            Self::InvalidFeature(e) => write!(f, "invalid feature: {e}"),
        }
    }
}

impl std::error::Error for Error {}

impl From<rusqlite::Error> for Error {
    fn from(e: rusqlite::Error) -> Self {
        Self::Storage(e.to_string())
    }
}

impl From<rusqlite_migration::Error> for Error {
    fn from(e: rusqlite_migration::Error) -> Self {
        Self::Migration(e.to_string())
    }
}

#[cfg(feature = "geojson")]
impl From<geojson::Error> for Error {
    fn from(e: geojson::Error) -> Self {
        Self::InvalidFeature(e.to_string())
    }
}
