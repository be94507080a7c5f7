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

//! Fixed-point geometry codec.
//!
//! Geographic coordinates are stored as 32-bit signed integers in units of
//! 10⁻⁷ degree, which is about 1.11 cm at the equator. A polygon is kept as a
//! flat buffer of interleaved `x` (longitude) and `y` (latitude) values and a
//! ring offset table. The offset table lists the cumulative number of points
//! at the end of each ring. Ring 0 is the exterior, all following rings are
//! holes.
//!
//! Rings are stored open, i.e. the closing point that repeats the first point
//! is not part of the buffer.
//!
//! ```text
//! coords: [x0, y0, x1, y1, x2, y2, x3, y3, x4, y4, x5, y5, x6, y6]
//! rings:  [4, 7]
//!          |  '-- hole with the points 4..7
//!          '----- exterior with the points 0..4
//! ```
//!
//! The persisted byte layout is little-endian for both buffers. Scale, integer
//! width and offset table must stay as they are to read existing stores.

use std::fmt::{Display, Formatter};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::Error;
use crate::geom::FixedRect;

/// Fixed-point units per degree.
pub const SCALE: f64 = 10_000_000.0;

/// Quantization step in degree.
pub const STEP: f64 = 1.0 / SCALE;

/// Converts degree into fixed-point units.
///
/// Values outside of the `i32` range saturate. Callers are expected to reject
/// coordinates outside of ±180° before encoding.
#[inline]
pub fn to_fixed(degree: f64) -> i32 {
    (degree * SCALE).round() as i32
}

/// Converts fixed-point units into degree.
#[inline]
pub fn to_degrees(value: i32) -> f64 {
    value as f64 / SCALE
}

/// Returns `true` if the coordinate can be encoded.
pub fn in_range(longitude: f64, latitude: f64) -> bool {
    (-180.0..=180.0).contains(&longitude) && (-90.0..=90.0).contains(&latitude)
}

/// A coordinate in fixed-point units.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct FixedCoord {
    /// Longitude in 10⁻⁷ degree.
    pub x: i32,
    /// Latitude in 10⁻⁷ degree.
    pub y: i32,
}

impl FixedCoord {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Encodes a geographic coordinate.
    pub fn from_degrees(longitude: f64, latitude: f64) -> Self {
        Self {
            x: to_fixed(longitude),
            y: to_fixed(latitude),
        }
    }

    pub fn longitude(&self) -> f64 {
        to_degrees(self.x)
    }

    pub fn latitude(&self) -> f64 {
        to_degrees(self.y)
    }
}

impl From<geo::Coord<f64>> for FixedCoord {
    fn from(c: geo::Coord<f64>) -> Self {
        Self::from_degrees(c.x, c.y)
    }
}

impl From<FixedCoord> for geo::Coord<f64> {
    fn from(c: FixedCoord) -> Self {
        geo::Coord {
            x: c.longitude(),
            y: c.latitude(),
        }
    }
}

impl Display for FixedCoord {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "({0}, {1})", self.latitude(), self.longitude())
    }
}

/// A polygon in fixed-point representation.
///
/// The geometry owns its buffers. Read access to rings and points goes through
/// borrowed [`Ring`] views, so bounding boxes and buffer level checks never
/// allocate. Geographic coordinates are only materialized by [`decode`].
///
/// [`decode`]: Self::decode
#[derive(Clone, Eq, PartialEq, Hash, Debug, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct EncodedGeometry {
    coords: Vec<i32>,
    rings: Vec<u32>,
}

impl EncodedGeometry {
    /// Encodes a geographic polygon.
    ///
    /// The closing point of each ring and consecutive points that collapse
    /// onto the same fixed-point coordinate are dropped. Encoding doesn't
    /// check the ring sizes, the store rejects degenerate rings before they
    /// are persisted.
    pub fn encode(polygon: &geo::Polygon<f64>) -> Self {
        Self::from_rings(
            std::iter::once(polygon.exterior())
                .chain(polygon.interiors())
                .map(|ring| ring.coords().map(|&c| FixedCoord::from(c))),
        )
    }

    /// Builds the geometry from rings of fixed-point coordinates.
    ///
    /// Rings may be open or closed.
    pub fn from_rings<R, P>(rings: R) -> Self
    where
        R: IntoIterator<Item = P>,
        P: IntoIterator<Item = FixedCoord>,
    {
        let mut geometry = Self::default();

        for ring in rings {
            let start = geometry.coords.len();

            for point in ring {
                let len = geometry.coords.len();
                if len > start && geometry.coords[len - 2..] == [point.x, point.y] {
                    continue;
                }
                geometry.coords.extend([point.x, point.y]);
            }

            // drop the closing point
            let len = geometry.coords.len();
            if len - start >= 4 && geometry.coords[start..start + 2] == geometry.coords[len - 2..]
            {
                geometry.coords.truncate(len - 2);
            }

            geometry.rings.push((geometry.coords.len() / 2) as u32);
        }

        geometry
    }

    /// Creates the geometry from a coordinate buffer and a ring offset table.
    ///
    /// # Errors
    ///
    /// Returns [`CorruptGeometry`] if the buffers are inconsistent.
    ///
    /// [`CorruptGeometry`]: Error::CorruptGeometry
    pub fn from_parts(coords: Vec<i32>, rings: Vec<u32>) -> Result<Self, Error> {
        if coords.len() % 2 != 0 {
            return Err(Error::CorruptGeometry(format!(
                "coordinate buffer has odd length {}",
                coords.len()
            )));
        }

        let Some(&last) = rings.last() else {
            return Err(Error::CorruptGeometry("ring offset table is empty".into()));
        };

        if last as usize != coords.len() / 2 {
            return Err(Error::CorruptGeometry(format!(
                "ring offset table ends at {last} but buffer has {} points",
                coords.len() / 2
            )));
        }

        let mut start = 0usize;
        for (i, &end) in rings.iter().enumerate() {
            let end = end as usize;
            if end < start.saturating_add(3) {
                return Err(Error::CorruptGeometry(format!(
                    "ring {i} ends at {end} but starts at {start}"
                )));
            }
            start = end;
        }

        Ok(Self { coords, rings })
    }

    /// Reads the geometry from its persisted little-endian byte buffers.
    ///
    /// The bytes are copied into owned, properly aligned integer buffers. The
    /// source slices may point anywhere, e.g. into a page of the database.
    pub fn from_bytes(coords: &[u8], rings: &[u8]) -> Result<Self, Error> {
        if coords.len() % 4 != 0 || rings.len() % 4 != 0 {
            return Err(Error::CorruptGeometry(format!(
                "buffers of {} and {} bytes are not 32 bit aligned",
                coords.len(),
                rings.len()
            )));
        }

        let coords = coords
            .chunks_exact(4)
            .map(|b| i32::from_le_bytes([b[0], b[1], b[2], b[3]]))
            .collect();
        let rings = rings
            .chunks_exact(4)
            .map(|b| u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
            .collect();

        Self::from_parts(coords, rings)
    }

    /// Returns the coordinate buffer as little-endian bytes.
    pub fn coords_to_bytes(&self) -> Vec<u8> {
        self.coords.iter().flat_map(|v| v.to_le_bytes()).collect()
    }

    /// Returns the ring offset table as little-endian bytes.
    pub fn rings_to_bytes(&self) -> Vec<u8> {
        self.rings.iter().flat_map(|v| v.to_le_bytes()).collect()
    }

    /// The flat coordinate buffer of interleaved `x` and `y` values.
    pub fn coords(&self) -> &[i32] {
        &self.coords
    }

    /// The cumulative point counts marking the end of each ring.
    pub fn ring_offsets(&self) -> &[u32] {
        &self.rings
    }

    pub fn num_points(&self) -> usize {
        self.coords.len() / 2
    }

    pub fn num_rings(&self) -> usize {
        self.rings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rings.is_empty()
    }

    /// Returns a view on the ring at the index.
    pub fn ring(&self, index: usize) -> Option<Ring<'_>> {
        let end = *self.rings.get(index)? as usize;
        let start = match index {
            0 => 0,
            _ => self.rings[index - 1] as usize,
        };

        self.coords
            .get(start * 2..end * 2)
            .map(|coords| Ring { coords })
    }

    /// Returns the exterior ring.
    pub fn exterior(&self) -> Option<Ring<'_>> {
        self.ring(0)
    }

    /// Iterates over all rings, starting with the exterior.
    pub fn rings(&self) -> impl Iterator<Item = Ring<'_>> + '_ {
        (0..self.rings.len()).filter_map(|i| self.ring(i))
    }

    /// Returns the envelope of the exterior ring.
    ///
    /// Holes lie within the exterior, so they never extend the envelope.
    pub fn envelope(&self) -> Option<FixedRect> {
        self.exterior()
            .and_then(|ring| FixedRect::from_points(ring.points()))
    }

    /// Returns the polygon with coordinates kept in fixed-point units.
    ///
    /// All values are integers, which `f64` represents exactly. This is the
    /// numeric domain the overlap resolution works in.
    pub fn to_fixed_polygon(&self) -> geo::Polygon<f64> {
        self.to_polygon(|p| geo::Coord {
            x: p.x as f64,
            y: p.y as f64,
        })
    }

    /// Decodes the polygon into geographic coordinates.
    pub fn decode(&self) -> geo::Polygon<f64> {
        self.to_polygon(|p| p.into())
    }

    fn to_polygon(&self, f: impl Fn(FixedCoord) -> geo::Coord<f64>) -> geo::Polygon<f64> {
        let mut rings = self
            .rings()
            .map(|ring| geo::LineString::from(ring.points().map(&f).collect::<Vec<_>>()));

        let exterior = rings.next().unwrap_or_else(|| geo::LineString::new(Vec::new()));
        geo::Polygon::new(exterior, rings.collect())
    }
}

/// A borrowed view on one ring of an [`EncodedGeometry`].
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub struct Ring<'a> {
    coords: &'a [i32],
}

impl<'a> Ring<'a> {
    pub fn len(&self) -> usize {
        self.coords.len() / 2
    }

    pub fn is_empty(&self) -> bool {
        self.coords.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<FixedCoord> {
        match self.coords.get(index * 2..index * 2 + 2) {
            Some(&[x, y]) => Some(FixedCoord { x, y }),
            _ => None,
        }
    }

    pub fn points(&self) -> impl Iterator<Item = FixedCoord> + 'a {
        self.coords
            .chunks_exact(2)
            .map(|c| FixedCoord { x: c[0], y: c[1] })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn donut() -> geo::Polygon<f64> {
        //  54.0 +-------------+
        //       |  +-------+  |
        //       |  | hole  |  |
        //       |  +-------+  |
        //  53.0 +-------------+
        //      9.0          10.0
        geo::Polygon::new(
            geo::LineString::from(vec![(9.0, 53.0), (10.0, 53.0), (10.0, 54.0), (9.0, 54.0)]),
            vec![geo::LineString::from(vec![
                (9.25, 53.25),
                (9.25, 53.75),
                (9.75, 53.75),
                (9.75, 53.25),
            ])],
        )
    }

    #[test]
    fn round_trip_within_quantization_step() {
        let samples = [
            (0.0, 0.0),
            (9.993_333_333, 53.630_277_777),
            (-179.999_999_99, -89.999_999_99),
            (180.0, 90.0),
            (-0.000_000_04, 0.000_000_06),
            (12.345_678_91, -45.678_912_34),
        ];

        for (lon, lat) in samples {
            let p = FixedCoord::from_degrees(lon, lat);
            assert!((p.longitude() - lon).abs() <= STEP, "{lon} -> {p}");
            assert!((p.latitude() - lat).abs() <= STEP, "{lat} -> {p}");
        }
    }

    #[test]
    fn scale_is_ten_to_the_seventh() {
        let p = FixedCoord::from_degrees(180.0, -90.0);
        assert_eq!(p, FixedCoord::new(1_800_000_000, -900_000_000));
    }

    #[test]
    fn encode_builds_offset_table() {
        let geometry = EncodedGeometry::encode(&donut());

        // closing points are dropped
        assert_eq!(geometry.ring_offsets(), &[4, 8]);
        assert_eq!(geometry.num_points(), 8);
        assert_eq!(geometry.num_rings(), 2);
        assert_eq!(
            geometry.exterior().and_then(|r| r.get(1)),
            Some(FixedCoord::new(100_000_000, 530_000_000))
        );
        assert_eq!(geometry.ring(1).map(|r| r.len()), Some(4));
        assert!(geometry.ring(2).is_none());
    }

    #[test]
    fn encode_drops_collapsed_points() {
        let polygon = geo::Polygon::new(
            geo::LineString::from(vec![
                (9.0, 53.0),
                (9.000_000_01, 53.000_000_01),
                (10.0, 53.0),
                (10.0, 54.0),
            ]),
            vec![],
        );

        let geometry = EncodedGeometry::encode(&polygon);
        assert_eq!(geometry.ring_offsets(), &[3]);
    }

    #[test]
    fn bytes_round_trip() {
        let geometry = EncodedGeometry::encode(&donut());
        let coords = geometry.coords_to_bytes();
        let rings = geometry.rings_to_bytes();

        assert_eq!(coords.len(), 8 * 2 * 4);
        assert_eq!(rings, vec![4, 0, 0, 0, 8, 0, 0, 0]);

        // read from an odd offset to mimic a misaligned page
        let mut page = vec![0u8];
        page.extend_from_slice(&coords);
        let read = EncodedGeometry::from_bytes(&page[1..], &rings).unwrap();

        assert_eq!(read, geometry);
    }

    #[test]
    fn corrupt_buffers_are_rejected() {
        let geometry = EncodedGeometry::encode(&donut());
        let coords = geometry.coords_to_bytes();
        let rings = geometry.rings_to_bytes();

        // truncated coordinate buffer
        assert!(matches!(
            EncodedGeometry::from_bytes(&coords[..coords.len() - 8], &rings),
            Err(Error::CorruptGeometry(_))
        ));
        // not a multiple of four
        assert!(matches!(
            EncodedGeometry::from_bytes(&coords[..coords.len() - 1], &rings),
            Err(Error::CorruptGeometry(_))
        ));
        // no rings at all
        assert!(matches!(
            EncodedGeometry::from_bytes(&coords, &[]),
            Err(Error::CorruptGeometry(_))
        ));
        // ring with two points
        assert!(matches!(
            EncodedGeometry::from_parts(vec![0, 0, 1, 1, 2, 2, 3, 3, 4, 4], vec![2, 5]),
            Err(Error::CorruptGeometry(_))
        ));
    }

    #[test]
    fn offsets_near_the_integer_limit_are_rejected() {
        let coords = vec![0, 0, 10, 0, 10, 10, 0, 10];

        assert!(matches!(
            EncodedGeometry::from_parts(coords.clone(), vec![0xFFFF_FFFE, 4]),
            Err(Error::CorruptGeometry(_))
        ));
        assert!(matches!(
            EncodedGeometry::from_parts(coords.clone(), vec![u32::MAX, 4]),
            Err(Error::CorruptGeometry(_))
        ));

        let rings: Vec<u8> = [0xFFFF_FFFEu32, 4]
            .iter()
            .flat_map(|v| v.to_le_bytes())
            .collect();
        let coords: Vec<u8> = coords.iter().flat_map(|v: &i32| v.to_le_bytes()).collect();
        assert!(matches!(
            EncodedGeometry::from_bytes(&coords, &rings),
            Err(Error::CorruptGeometry(_))
        ));
    }

    #[test]
    fn envelope_without_decoding() {
        let geometry = EncodedGeometry::encode(&donut());

        assert_eq!(
            geometry.envelope(),
            Some(FixedRect {
                min: FixedCoord::new(90_000_000, 530_000_000),
                max: FixedCoord::new(100_000_000, 540_000_000),
            })
        );
    }

    #[test]
    fn decode_restores_polygon() {
        let polygon = donut();
        let decoded = EncodedGeometry::encode(&polygon).decode();

        // geo closes the rings again
        assert_eq!(decoded, polygon);
    }

    #[test]
    fn fixed_polygon_keeps_integer_units() {
        let fixed = EncodedGeometry::encode(&donut()).to_fixed_polygon();
        let first = fixed.exterior().0[0];

        assert_eq!(first, geo::Coord { x: 90_000_000.0, y: 530_000_000.0 });
    }
}
