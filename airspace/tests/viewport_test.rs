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

use airspace::prelude::*;

const ROWS: usize = 13;
const COLS: usize = 83;
const SPACING: f64 = 0.08;
const SIZE: f64 = 0.1;

fn square(meta: AirspaceMeta, row: usize, col: usize) -> AirspaceRecord {
    let lon = 5.0 + col as f64 * SPACING;
    let lat = 47.0 + row as f64 * SPACING;

    AirspaceRecord::new(
        meta,
        polygon![
            (lat, lon),
            (lat, lon + SIZE),
            (lat + SIZE, lon + SIZE),
            (lat + SIZE, lon)
        ],
    )
}

fn floor(row: usize, col: usize) -> u32 {
    ((row + col) % 4) as u32 * 1000
}

/// A grid of 1079 partially overlapping squares. Neighbours overlap by a
/// fifth of their size, the center of each square is never covered.
fn germany() -> Vec<AirspaceRecord> {
    (0..ROWS)
        .flat_map(|row| (0..COLS).map(move |col| (row, col)))
        .map(|(row, col)| {
            let meta = AirspaceMeta::new(format!("DE-{row:02}-{col:02}"))
                .with_country("DE")
                .with_type(4)
                .with_limits(AltitudeLimit::Msl(floor(row, col)), AltitudeLimit::Fl(100));
            square(meta, row, col)
        })
        .collect()
}

/// 265 squares that repeat squares of the grid 500 ft higher up.
fn austria() -> Vec<AirspaceRecord> {
    (0..ROWS * COLS)
        .step_by(4)
        .take(265)
        .map(|k| {
            let (row, col) = (k / COLS, k % COLS);
            let meta = AirspaceMeta::new(format!("AT-{k:04}"))
                .with_country("AT")
                .with_type(1)
                .with_limits(
                    AltitudeLimit::Msl(floor(row, col) + 500),
                    AltitudeLimit::Fl(100),
                );
            square(meta, row, col)
        })
        .collect()
}

fn store() -> Store {
    let store = Store::open_in_memory().unwrap();
    assert_eq!(store.replace_region("DE", &germany()), Ok(1079));
    assert_eq!(store.replace_region("AT", &austria()), Ok(265));
    store
}

fn request() -> ViewportRequest {
    ViewportRequest::new(Bounds::new(4.0, 46.0, 12.0, 49.0), 10_000)
}

#[test]
fn overlapping_regions_render_once() {
    let store = store();

    let viewport = ViewportRenderer::new(&store).render(&request()).unwrap();

    assert_eq!(viewport.stats.candidates, 1344);
    assert_eq!(viewport.airspaces.len(), 1079);
    assert_eq!(viewport.stats.empty, 265);
    assert_eq!(viewport.stats.failures, 0);

    assert!(viewport.airspaces.iter().all(|a| a.meta.country == "DE"));
    assert!(viewport.stats.pairs_scanned < viewport.stats.naive_pairs);
    assert!(viewport.stats.bbox_rejected > 0);
    assert!(viewport.stats.difference_ops < viewport.stats.naive_pairs);
}

#[test]
fn rendering_is_reproducible() {
    let store = store();
    let renderer = ViewportRenderer::new(&store);

    let first = renderer.render(&request()).unwrap();
    let second = renderer.render(&request()).unwrap();

    assert_eq!(first, second);
}

#[test]
fn airspaces_are_sorted_by_floor() {
    let store = store();

    let viewport = ViewportRenderer::new(&store).render(&request()).unwrap();

    assert!(viewport.airspaces.windows(2).all(|w| {
        (w[0].meta.lower_altitude_ft, &w[0].meta.id) < (w[1].meta.lower_altitude_ft, &w[1].meta.id)
    }));
}

//  47.1 +    +
//       |\  /|
//       | \/ |
//       | /\ |
//       |/  \|
//  47.0 +    +
//       5.0  5.1
#[test]
fn invalid_polygon_does_not_break_the_viewport() {
    let store = store();

    let bow_tie = AirspaceRecord::new(
        AirspaceMeta::new("bow-tie")
            .with_type(2)
            .with_limits(AltitudeLimit::Msl(5000), AltitudeLimit::Fl(100)),
        polygon![(47.0, 5.0), (47.1, 5.1), (47.0, 5.1), (47.1, 5.0)],
    );
    store.upsert_batch(&[bow_tie]).unwrap();

    let viewport = ViewportRenderer::new(&store).render(&request()).unwrap();

    assert_eq!(viewport.stats.candidates, 1345);
    assert_eq!(viewport.stats.failures, 1);
    assert_eq!(viewport.stats.empty, 265);
    assert_eq!(viewport.airspaces.len(), 1080);

    let bow_tie = viewport.airspaces.last().unwrap();
    assert_eq!(bow_tie.meta.id, "bow-tie");
    assert!(!bow_tie.clipped);
}

#[test]
fn replacing_a_region_removes_its_overlap() {
    let store = store();
    store.remove_region("AT").unwrap();

    let viewport = ViewportRenderer::new(&store).render(&request()).unwrap();

    assert_eq!(viewport.stats.candidates, 1079);
    assert_eq!(viewport.airspaces.len(), 1079);
    assert_eq!(viewport.stats.empty, 0);
}

#[test]
fn altitude_and_type_filter() {
    let store = store();

    // floors at 0 and 500 ft only
    let low = ViewportRequest::new(Bounds::new(4.0, 46.0, 12.0, 49.0), 500);
    let viewport = ViewportRenderer::new(&store).render(&low).unwrap();
    assert!(viewport
        .airspaces
        .iter()
        .all(|a| a.meta.lower_altitude_ft.is_some_and(|ft| ft <= 500)));
    assert!(viewport.airspaces.iter().all(|a| a.meta.country == "DE"));

    // without the repeated squares nothing is consumed
    let without_repeats = request().with_excluded_types([1]);
    let viewport = ViewportRenderer::new(&store).render(&without_repeats).unwrap();
    assert_eq!(viewport.airspaces.len(), 1079);
    assert_eq!(viewport.stats.empty, 0);
}
