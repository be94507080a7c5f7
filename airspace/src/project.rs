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

//! Conversion of clipped polygons into geographic coordinates.

use geo::MultiPolygon;

use crate::clip::ClippedPolygon;

/// Projects a clipped polygon back into degree.
///
/// Returns `None` for an [`Empty`](ClippedPolygon::Empty) polygon, which is
/// not displayed at all.
pub fn project(polygon: &ClippedPolygon<'_>) -> Option<MultiPolygon<f64>> {
    if polygon.is_empty() {
        return None;
    }

    Some(MultiPolygon::new(
        polygon.geometries().map(|geometry| geometry.decode()).collect(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::EncodedGeometry;

    #[test]
    fn empty_is_not_projected() {
        assert_eq!(project(&ClippedPolygon::Empty), None);
    }

    #[test]
    fn projects_into_degree() {
        let geometry = EncodedGeometry::encode(&polygon![
            (47.25, 11.0),
            (47.25, 11.5),
            (47.5, 11.5)
        ]);

        let projected = project(&ClippedPolygon::Original(&geometry)).unwrap();

        assert_eq!(
            projected,
            MultiPolygon::new(vec![polygon![
                (47.25, 11.0),
                (47.25, 11.5),
                (47.5, 11.5)
            ]])
        );
    }

    #[test]
    fn keeps_all_parts_of_a_split_polygon() {
        let parts = vec![
            EncodedGeometry::encode(&polygon![(0.0, 0.0), (0.0, 1.0), (1.0, 1.0)]),
            EncodedGeometry::encode(&polygon![(0.0, 2.0), (0.0, 3.0), (1.0, 3.0)]),
        ];

        let projected = project(&ClippedPolygon::Clipped(parts)).unwrap();

        assert_eq!(projected.0.len(), 2);
    }
}
