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

use crate::codec::{self, FixedCoord};

/// Axis-aligned geographic bounds in degrees.
#[derive(Copy, Clone, PartialEq, Debug, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Bounds {
    pub west: f64,
    pub south: f64,
    pub east: f64,
    pub north: f64,
}

impl Bounds {
    /// Creates bounds from the south-west and north-east corner.
    pub fn new(west: f64, south: f64, east: f64, north: f64) -> Self {
        Self {
            west,
            south,
            east,
            north,
        }
    }

    /// Returns `true` if both bounds share at least one point.
    pub fn intersects(&self, other: &Bounds) -> bool {
        self.west <= other.east
            && other.west <= self.east
            && self.south <= other.north
            && other.south <= self.north
    }

    /// Returns `true` if all values are finite.
    pub fn is_finite(&self) -> bool {
        self.west.is_finite()
            && self.south.is_finite()
            && self.east.is_finite()
            && self.north.is_finite()
    }
}

impl From<FixedRect> for Bounds {
    fn from(rect: FixedRect) -> Self {
        Self {
            west: codec::to_degrees(rect.min.x),
            south: codec::to_degrees(rect.min.y),
            east: codec::to_degrees(rect.max.x),
            north: codec::to_degrees(rect.max.y),
        }
    }
}

impl Display for Bounds {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        write!(
            f,
            "[{}, {}, {}, {}]",
            self.west, self.south, self.east, self.north
        )
    }
}

/// Axis-aligned bounds in fixed-point units.
///
/// This is the envelope the overlap resolution uses to reject pairs of
/// airspaces without touching their polygons.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct FixedRect {
    pub min: FixedCoord,
    pub max: FixedCoord,
}

impl FixedRect {
    /// Returns the envelope of the points or `None` if there are no points.
    pub fn from_points(points: impl IntoIterator<Item = FixedCoord>) -> Option<Self> {
        points.into_iter().fold(None, |rect, p| {
            Some(match rect {
                None => FixedRect { min: p, max: p },
                Some(FixedRect { min, max }) => FixedRect {
                    min: FixedCoord::new(min.x.min(p.x), min.y.min(p.y)),
                    max: FixedCoord::new(max.x.max(p.x), max.y.max(p.y)),
                },
            })
        })
    }

    /// Returns `true` if both rectangles share at least one point.
    #[inline]
    pub fn intersects(&self, other: &FixedRect) -> bool {
        self.min.x <= other.max.x
            && other.min.x <= self.max.x
            && self.min.y <= other.max.y
            && other.min.y <= self.max.y
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bounds_intersect() {
        //  2 +-----+
        //    |  a  |
        //  1 |  +--+--+
        //    |  |  |  |
        //  0 +--+--+  | b
        //       |     |
        // -1    +-----+
        //    0  1  2  3
        let a = Bounds::new(0.0, 0.0, 2.0, 2.0);
        let b = Bounds::new(1.0, -1.0, 3.0, 1.0);
        let c = Bounds::new(2.5, 1.5, 3.0, 2.0);

        assert!(a.intersects(&b));
        assert!(b.intersects(&a));
        assert!(!a.intersects(&c));
        assert!(!c.intersects(&b));
    }

    #[test]
    fn touching_rects_intersect() {
        let a = FixedRect {
            min: FixedCoord::new(0, 0),
            max: FixedCoord::new(10, 10),
        };
        let b = FixedRect {
            min: FixedCoord::new(10, 0),
            max: FixedCoord::new(20, 10),
        };
        let c = FixedRect {
            min: FixedCoord::new(11, 0),
            max: FixedCoord::new(20, 10),
        };

        assert!(a.intersects(&b));
        assert!(!a.intersects(&c));
    }

    #[test]
    fn rect_from_points() {
        let rect = FixedRect::from_points([
            FixedCoord::new(5, -3),
            FixedCoord::new(-2, 8),
            FixedCoord::new(1, 1),
        ]);

        assert_eq!(
            rect,
            Some(FixedRect {
                min: FixedCoord::new(-2, -3),
                max: FixedCoord::new(5, 8),
            })
        );
        assert_eq!(FixedRect::from_points(std::iter::empty()), None);
    }
}
