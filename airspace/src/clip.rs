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

//! Overlap resolution of stacked airspaces.
//!
//! Where airspaces overlap on the map, only the lowest one should be painted.
//! The [`OverlapResolver`] removes from every airspace the area that is
//! already claimed by airspaces with a lower floor:
//!
//! ```text
//!  +-----------------+        +-----------------+
//!  | B (3000 ft)     |        | B               |
//!  |     +-----+     |   =>   |     +-----+     |
//!  |     | A   |     |        |     |     |     |
//!  |     | GND |     |        |     +-----+     |
//!  |     +-----+     |        |                 |
//!  +-----------------+        +-----------------+
//!                              B minus A, A untouched
//! ```
//!
//! The candidates must be sorted by floor ascending as returned by an
//! [`AirspaceSource`](crate::AirspaceSource). The resolver walks the
//! candidates in groups of equal floor. For a group only the candidates
//! before it, i.e. those with a strictly lower floor, are scanned. Each of
//! them is first checked by its bounding box and only those that pass end up
//! in the lower-overlap set of the candidate. The difference is computed on
//! the fixed-point coordinates and only for candidates with a non-empty
//! lower-overlap set.
//!
//! A failing difference never aborts the resolution. The candidate is
//! returned unclipped instead and the failure is counted in [`ClipStats`].
//! An invalid polygon below a candidate is left out of its lower-overlap set,
//! so the shared area is painted twice. These pairs are counted as well.

use std::cell::OnceCell;
use std::cmp::Ordering;
use std::fmt::{Display, Formatter};
use std::panic::{self, AssertUnwindSafe};

use geo::{BooleanOps, MultiPolygon, Polygon, Validation};
use log::{trace, warn};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::codec::{EncodedGeometry, FixedCoord};
use crate::geom::FixedRect;
use crate::store::{cmp_floor, Airspace};

/// Options of the [`OverlapResolver`].
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ClipOptions {
    /// Clip airspaces by the airspaces below them. If disabled, all
    /// candidates are returned unmodified.
    pub resolve_overlaps: bool,
    /// Check polygons for self-intersections before they enter a difference.
    pub validate: bool,
}

impl Default for ClipOptions {
    fn default() -> Self {
        Self {
            resolve_overlaps: true,
            validate: true,
        }
    }
}

impl ClipOptions {
    pub fn with_resolve_overlaps(mut self, resolve_overlaps: bool) -> Self {
        self.resolve_overlaps = resolve_overlaps;
        self
    }

    pub fn with_validate(mut self, validate: bool) -> Self {
        self.validate = validate;
        self
    }
}

/// Counters of a resolution.
#[derive(Copy, Clone, Eq, PartialEq, Debug, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ClipStats {
    /// Number of candidates.
    pub candidates: usize,
    /// Pairs a scan of every candidate against every other would compare.
    pub naive_pairs: usize,
    /// Pairs left after skipping candidates with an equal or higher floor.
    pub pairs_scanned: usize,
    /// Scanned pairs rejected by their bounding boxes.
    pub bbox_rejected: usize,
    /// Polygons subtracted from a candidate.
    pub difference_ops: usize,
    /// Candidates returned unclipped because the difference failed.
    pub failures: usize,
    /// Candidates completely covered by lower airspaces.
    pub empty: usize,
    /// Overlapping lower airspaces left out because their polygon is invalid.
    /// The area they share with the candidate is painted twice.
    pub invalid_lower: usize,
}

impl Display for ClipStats {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} candidates, {}/{} pairs scanned, {} rejected by bbox, {} differences, \
             {} failed, {} empty, {} invalid below",
            self.candidates,
            self.pairs_scanned,
            self.naive_pairs,
            self.bbox_rejected,
            self.difference_ops,
            self.failures,
            self.empty,
            self.invalid_lower
        )
    }
}

/// The result of resolving the overlap for one candidate.
#[derive(Clone, PartialEq, Debug)]
pub enum ClippedPolygon<'a> {
    /// Nothing below overlaps, the candidate keeps its geometry.
    Original(&'a EncodedGeometry),
    /// The part of the candidate not covered by lower airspaces. Clipping can
    /// split a polygon, thus there may be more than one.
    Clipped(Vec<EncodedGeometry>),
    /// The candidate is completely covered by lower airspaces.
    Empty,
}

impl ClippedPolygon<'_> {
    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Empty)
    }

    pub fn is_clipped(&self) -> bool {
        matches!(self, Self::Clipped(_))
    }

    /// Returns the geometries that remain of the candidate.
    pub fn geometries(&self) -> impl Iterator<Item = &EncodedGeometry> + '_ {
        let geometries = match self {
            Self::Original(geometry) => std::slice::from_ref(*geometry),
            Self::Clipped(geometries) => geometries.as_slice(),
            Self::Empty => &[],
        };

        geometries.iter()
    }
}

/// The clipped polygons in candidate order and the counters of the run.
#[derive(Clone, PartialEq, Debug)]
pub struct Resolution<'a> {
    pub polygons: Vec<ClippedPolygon<'a>>,
    pub stats: ClipStats,
}

/// A candidate with its polygon decoded on first use.
struct ClipCandidate<'a> {
    airspace: &'a Airspace,
    rect: Option<FixedRect>,
    polygon: OnceCell<Option<MultiPolygon<f64>>>,
}

impl<'a> ClipCandidate<'a> {
    fn new(airspace: &'a Airspace) -> Self {
        Self {
            airspace,
            rect: airspace.geometry.envelope(),
            polygon: OnceCell::new(),
        }
    }

    fn floor(&self) -> Option<i32> {
        self.airspace.meta.lower_altitude_ft
    }

    fn id(&self) -> &str {
        &self.airspace.meta.id
    }

    fn overlaps(&self, other: &ClipCandidate<'_>) -> bool {
        match (&self.rect, &other.rect) {
            (Some(a), Some(b)) => a.intersects(b),
            _ => false,
        }
    }

    /// The polygon in fixed-point units or `None` if it is invalid.
    fn polygon(&self, validate: bool) -> Option<&MultiPolygon<f64>> {
        self.polygon
            .get_or_init(|| {
                let polygon = self.airspace.geometry.to_fixed_polygon();

                if validate && !polygon.is_valid() {
                    warn!("airspace {} has an invalid polygon", self.id());
                    return None;
                }

                Some(MultiPolygon::new(vec![polygon]))
            })
            .as_ref()
    }
}

/// Clips airspaces by the airspaces below them.
///
/// # Examples
///
/// ```
/// use airspace::prelude::*;
/// use airspace::{query, Airspace, ClippedPolygon, OverlapResolver};
///
/// # fn main() -> Result<(), Error> {
/// let mut store = MemoryStore::new();
/// store.upsert_batch(&[
///     AirspaceRecord::new(
///         AirspaceMeta::new("ctr").with_limits(AltitudeLimit::Gnd, AltitudeLimit::Msl(2500)),
///         polygon![(53.0, 10.0), (53.0, 11.0), (54.0, 11.0), (54.0, 10.0)],
///     ),
///     AirspaceRecord::new(
///         AirspaceMeta::new("tma").with_limits(AltitudeLimit::Msl(1500), AltitudeLimit::Fl(65)),
///         polygon![(52.0, 9.0), (52.0, 12.0), (55.0, 12.0), (55.0, 9.0)],
///     ),
/// ])?;
///
/// let query = query::plan(Bounds::new(8.0, 51.0, 13.0, 56.0), 10_000, &[])?;
/// let candidates: Vec<Airspace> = store.query(&query)?;
///
/// let resolution = OverlapResolver::default().resolve(&candidates);
///
/// assert!(matches!(resolution.polygons[0], ClippedPolygon::Original(_)));
/// assert!(resolution.polygons[1].is_clipped());
/// # Ok(())
/// # }
/// ```
#[derive(Copy, Clone, Debug)]
pub struct OverlapResolver {
    options: ClipOptions,
    difference: Difference,
}

/// Subtracts the second polygon from the first, in fixed-point units.
type Difference = fn(&MultiPolygon<f64>, &MultiPolygon<f64>) -> MultiPolygon<f64>;

fn difference(subject: &MultiPolygon<f64>, other: &MultiPolygon<f64>) -> MultiPolygon<f64> {
    subject.difference(other)
}

impl Default for OverlapResolver {
    fn default() -> Self {
        Self::new(ClipOptions::default())
    }
}

impl OverlapResolver {
    pub fn new(options: ClipOptions) -> Self {
        Self {
            options,
            difference,
        }
    }

    #[cfg(test)]
    fn with_difference(mut self, difference: Difference) -> Self {
        self.difference = difference;
        self
    }

    /// Resolves the overlap of the candidates.
    ///
    /// Returns one clipped polygon per candidate in the order of the
    /// candidates. The candidates must be sorted by floor ascending with
    /// missing floors first.
    pub fn resolve<'a>(&self, airspaces: &'a [Airspace]) -> Resolution<'a> {
        debug_assert!(
            airspaces
                .windows(2)
                .all(|w| cmp_floor(&w[0].meta, &w[1].meta) != Ordering::Greater),
            "candidates are not sorted by floor"
        );

        let n = airspaces.len();
        let mut stats = ClipStats {
            candidates: n,
            naive_pairs: n * n.saturating_sub(1) / 2,
            ..Default::default()
        };

        if !self.options.resolve_overlaps {
            return Resolution {
                polygons: airspaces
                    .iter()
                    .map(|a| ClippedPolygon::Original(&a.geometry))
                    .collect(),
                stats,
            };
        }

        let candidates: Vec<ClipCandidate> = airspaces.iter().map(ClipCandidate::new).collect();
        let mut polygons = Vec::with_capacity(n);

        // Every candidate before a group has a strictly lower floor. The
        // candidates of the group and after it are never scanned.
        let mut settled = 0;
        for group in candidates.chunk_by(|a, b| a.floor() == b.floor()) {
            let below = &candidates[..settled];

            for candidate in group {
                polygons.push(self.clip(candidate, below, &mut stats));
            }

            settled += group.len();
        }

        Resolution { polygons, stats }
    }

    fn clip<'a>(
        &self,
        candidate: &ClipCandidate<'a>,
        below: &[ClipCandidate<'_>],
        stats: &mut ClipStats,
    ) -> ClippedPolygon<'a> {
        let original = ClippedPolygon::Original(&candidate.airspace.geometry);
        stats.pairs_scanned += below.len();

        let lower: Vec<&ClipCandidate> = below
            .iter()
            .filter(|other| {
                let overlaps = candidate.overlaps(other);
                if !overlaps {
                    stats.bbox_rejected += 1;
                }
                overlaps
            })
            .collect();

        if lower.is_empty() {
            return original;
        }

        let Some(subject) = candidate.polygon(self.options.validate) else {
            stats.failures += 1;
            return original;
        };

        let lower: Vec<&MultiPolygon<f64>> = lower
            .into_iter()
            .filter_map(|other| {
                let polygon = other.polygon(self.options.validate);
                if polygon.is_none() {
                    stats.invalid_lower += 1;
                }
                polygon
            })
            .collect();

        if lower.is_empty() {
            return original;
        }

        trace!(
            "clipping {} by {} lower airspace(s)",
            candidate.id(),
            lower.len()
        );

        let difference = panic::catch_unwind(AssertUnwindSafe(|| {
            lower
                .iter()
                .fold(subject.clone(), |remaining, &other| {
                    (self.difference)(&remaining, other)
                })
        }));

        let remaining = match difference {
            Ok(remaining) => remaining,
            Err(_) => {
                warn!("failed to clip airspace {}, keeping it unclipped", candidate.id());
                stats.failures += 1;
                return original;
            }
        };

        stats.difference_ops += lower.len();

        let geometries: Vec<EncodedGeometry> = remaining.iter().filter_map(to_geometry).collect();

        if geometries.is_empty() {
            stats.empty += 1;
            ClippedPolygon::Empty
        } else {
            ClippedPolygon::Clipped(geometries)
        }
    }
}

/// Rounds a polygon in fixed-point units back to the fixed-point grid.
///
/// Rings that collapse to less than three points are dropped. Returns `None`
/// if the exterior collapses.
fn to_geometry(polygon: &Polygon<f64>) -> Option<EncodedGeometry> {
    let geometry = EncodedGeometry::from_rings(
        std::iter::once(polygon.exterior())
            .chain(polygon.interiors())
            .map(|ring| {
                ring.coords()
                    .map(|c| FixedCoord::new(c.x.round() as i32, c.y.round() as i32))
            }),
    );

    if geometry.exterior().is_none_or(|ring| ring.len() < 3) {
        return None;
    }

    if geometry.rings().all(|ring| ring.len() >= 3) {
        return Some(geometry);
    }

    Some(EncodedGeometry::from_rings(
        geometry
            .rings()
            .filter(|ring| ring.len() >= 3)
            .map(|ring| ring.points()),
    ))
}
