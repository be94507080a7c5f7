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

use rusqlite_migration::{Migrations, M};

/// Airspaces with their fixed-point geometry.
///
/// The viewport index covers the bounding box, the floor and the type code,
/// so the range query is answered from the index before rows are read.
const AIRSPACES: &str = "
CREATE TABLE airspaces (
    id                TEXT PRIMARY KEY NOT NULL,
    name              TEXT NOT NULL,
    type_code         INTEGER NOT NULL,
    icao_class        INTEGER,
    country           TEXT NOT NULL,
    lower_altitude_ft INTEGER,
    upper_altitude_ft INTEGER,
    west              REAL NOT NULL,
    east              REAL NOT NULL,
    south             REAL NOT NULL,
    north             REAL NOT NULL,
    coords            BLOB NOT NULL,
    rings             BLOB NOT NULL,
    extra_properties  TEXT
);

CREATE INDEX airspaces_viewport
    ON airspaces (west, east, south, north, lower_altitude_ft, type_code);

CREATE INDEX airspaces_floor ON airspaces (lower_altitude_ft, id);

CREATE INDEX airspaces_country ON airspaces (country);
";

const REGIONS: &str = "
CREATE TABLE regions (
    country     TEXT PRIMARY KEY NOT NULL,
    replaced_at TEXT NOT NULL
);
";

pub(super) fn migrations() -> Migrations<'static> {
    Migrations::new(vec![M::up(AIRSPACES), M::up(REGIONS)])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn migrations_are_valid() {
        assert!(migrations().validate().is_ok());
    }
}
