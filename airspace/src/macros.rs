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

/// Creates a [`geo::Point<f64>`] from latitude and longitude.
///
/// Note: This macro accepts (latitude, longitude) but internally creates
/// the geo::Point with (longitude, latitude) to match geo's coordinate order.
#[macro_export]
macro_rules! coord {
    ($latitude:expr, $longitude:expr) => {
        $crate::geo::Point::new($longitude, $latitude)
    };
}

/// Creates a [`geo::Polygon<f64>`] with the coordinates as exterior ring.
///
/// ```
/// use airspace::polygon;
///
/// let p = polygon![(53.0, 9.0), (53.0, 10.0), (54.0, 10.0), (54.0, 9.0)];
/// assert_eq!(p.exterior().0.len(), 5);
/// ```
///
/// Note: Coordinates are specified as (latitude, longitude) but internally
/// converted to geo's (longitude, latitude) coordinate order. The ring is
/// closed by geo if the last coordinate doesn't repeat the first.
#[macro_export]
macro_rules! polygon {
    ( $( ($lat:expr, $lon:expr) ),* $(,)? ) => {{
        $crate::geo::Polygon::new(
            $crate::geo::LineString::from(vec![ $( $crate::geo::Coord { x: $lon, y: $lat }, )* ]),
            vec![]
        )
    }};
}
