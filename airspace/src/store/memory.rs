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

use std::collections::{BTreeMap, HashSet};

use chrono::Utc;
use geo::Point;
use log::debug;
use rstar::primitives::{GeomWithData, Rectangle};
use rstar::{RTree, AABB};

use super::{
    check_region, cmp_floor, prepare_batch, Airspace, AirspaceRecord, AirspaceSource, RegionInfo,
};
use crate::error::Error;
use crate::geom::Bounds;
use crate::query::Query;

type Entry = GeomWithData<Rectangle<Point<f64>>, String>;

fn envelope(bounds: &Bounds) -> AABB<Point<f64>> {
    AABB::from_corners(
        Point::new(bounds.west, bounds.south),
        Point::new(bounds.east, bounds.north),
    )
}

/// Airspace store that keeps everything in memory.
///
/// The airspaces are indexed by their bounding boxes in an R-tree. Intended
/// for tests and small, short lived datasets where a SQLite database is not
/// wanted. It has the same semantics as the [`Store`](super::Store).
#[derive(Clone, Debug, Default)]
pub struct MemoryStore {
    airspaces: BTreeMap<String, Airspace>,
    regions: BTreeMap<String, RegionInfo>,
    tree: RTree<Entry>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts the airspaces or replaces those with the same identifier.
    pub fn upsert_batch(&mut self, records: &[AirspaceRecord]) -> Result<usize, Error> {
        let airspaces = prepare_batch(records)?;
        let n = airspaces.len();

        for airspace in airspaces {
            self.airspaces.insert(airspace.meta.id.clone(), airspace);
        }

        self.reindex();
        Ok(n)
    }

    /// Replaces all airspaces of a country with the records.
    pub fn replace_region(
        &mut self,
        country: &str,
        records: &[AirspaceRecord],
    ) -> Result<usize, Error> {
        let airspaces = prepare_batch(records)?;
        check_region(country, &airspaces)?;
        let n = airspaces.len();

        self.airspaces.retain(|_, a| a.meta.country != country);
        for airspace in airspaces {
            self.airspaces.insert(airspace.meta.id.clone(), airspace);
        }

        self.regions.insert(
            country.to_string(),
            RegionInfo {
                country: country.to_string(),
                airspace_count: n,
                replaced_at: Utc::now(),
            },
        );

        self.reindex();
        Ok(n)
    }

    /// Removes all airspaces of a country and returns how many were removed.
    pub fn remove_region(&mut self, country: &str) -> usize {
        let before = self.airspaces.len();
        self.airspaces.retain(|_, a| a.meta.country != country);
        self.regions.remove(country);

        self.reindex();
        before - self.airspaces.len()
    }

    pub fn region(&self, country: &str) -> Option<RegionInfo> {
        self.regions.get(country).map(|info| RegionInfo {
            airspace_count: self.count_in(country),
            ..info.clone()
        })
    }

    pub fn get(&self, id: &str) -> Option<&Airspace> {
        self.airspaces.get(id)
    }

    pub fn len(&self) -> usize {
        self.airspaces.len()
    }

    pub fn is_empty(&self) -> bool {
        self.airspaces.is_empty()
    }

    fn count_in(&self, country: &str) -> usize {
        self.airspaces
            .values()
            .filter(|a| a.meta.country == country)
            .count()
    }

    fn reindex(&mut self) {
        let entries = self
            .airspaces
            .values()
            .map(|a| {
                GeomWithData::new(Rectangle::from_aabb(envelope(&a.bounds)), a.meta.id.clone())
            })
            .collect();

        self.tree = RTree::bulk_load(entries);
        debug!("indexed {} airspace(s)", self.tree.size());
    }
}

impl AirspaceSource for MemoryStore {
    fn query(&self, query: &Query) -> Result<Vec<Airspace>, Error> {
        let mut seen = HashSet::new();
        let mut airspaces = Vec::new();

        for bounds in query.envelopes() {
            for entry in self.tree.locate_in_envelope_intersecting(&envelope(&bounds)) {
                if !seen.insert(entry.data.as_str()) {
                    continue;
                }

                if let Some(airspace) = self.airspaces.get(&entry.data) {
                    if query.accepts(&airspace.meta) {
                        airspaces.push(airspace.clone());
                    }
                }
            }
        }

        airspaces.sort_by(|a, b| cmp_floor(&a.meta, &b.meta));
        Ok(airspaces)
    }
}
