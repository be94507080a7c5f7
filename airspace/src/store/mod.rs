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

//! Persistent, spatially indexed airspace storage.
//!
//! The ingestion writes [`AirspaceRecord`]s in batches, either as an upsert
//! keyed by identifier or as a replacement of a whole region. Every record is
//! validated and encoded at this boundary. Reads return [`Airspace`]s, which
//! keep the geometry in its fixed-point representation, sorted by floor.

use std::cmp::Ordering;
use std::collections::HashSet;
use std::time::Duration;

use chrono::{DateTime, Utc};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::Error;
use crate::query::Query;

mod memory;
mod record;
mod schema;
mod sqlite;

pub use memory::MemoryStore;
pub use record::{Airspace, AirspaceMeta, AirspaceRecord};
pub use sqlite::Store;

/// A source of airspaces for viewport queries.
pub trait AirspaceSource {
    /// Returns all airspaces that match the query.
    ///
    /// The airspaces are sorted by floor ascending, airspaces without floor
    /// first, and ties are broken by identifier. The overlap resolution
    /// relies on this order. Airspaces whose stored geometry can't be read
    /// are skipped.
    fn query(&self, query: &Query) -> Result<Vec<Airspace>, Error>;
}

/// Options of the SQLite [`Store`].
#[derive(Clone, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct StoreOptions {
    /// Number of idle read connections kept open.
    pub readers: usize,
    /// How long a connection waits for a lock held by another connection.
    pub busy_timeout: Duration,
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self {
            readers: 4,
            busy_timeout: Duration::from_secs(5),
        }
    }
}

impl StoreOptions {
    pub fn with_readers(mut self, readers: usize) -> Self {
        self.readers = readers;
        self
    }

    pub fn with_busy_timeout(mut self, busy_timeout: Duration) -> Self {
        self.busy_timeout = busy_timeout;
        self
    }
}

/// Bookkeeping of a region that was replaced as a whole.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct RegionInfo {
    pub country: String,
    pub airspace_count: usize,
    pub replaced_at: DateTime<Utc>,
}

/// Orders airspaces by floor with missing floors first, then by identifier.
pub(crate) fn cmp_floor(a: &AirspaceMeta, b: &AirspaceMeta) -> Ordering {
    a.lower_altitude_ft
        .cmp(&b.lower_altitude_ft)
        .then_with(|| a.id.cmp(&b.id))
}

/// Validates and encodes a batch.
///
/// The batch is rejected as a whole if any record is invalid, so a batch is
/// either written completely or not at all.
fn prepare_batch(records: &[AirspaceRecord]) -> Result<Vec<Airspace>, Error> {
    let mut ids = HashSet::with_capacity(records.len());

    records
        .iter()
        .map(|record| {
            if !ids.insert(record.meta.id.as_str()) {
                return Err(Error::DuplicateId(record.meta.id.clone()));
            }
            Airspace::try_from(record)
        })
        .collect()
}

/// Checks that all airspaces of a region batch belong to the region.
fn check_region(country: &str, airspaces: &[Airspace]) -> Result<(), Error> {
    match airspaces.iter().find(|a| a.meta.country != country) {
        Some(foreign) => Err(Error::ForeignRecord {
            id: foreign.meta.id.clone(),
            country: country.to_string(),
        }),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: &str) -> AirspaceRecord {
        AirspaceRecord::new(
            AirspaceMeta::new(id).with_country("DE"),
            polygon![(52.5, 7.0), (52.5, 7.5), (53.0, 7.25)],
        )
    }

    #[test]
    fn duplicate_ids_reject_batch() {
        let batch = [record("a"), record("b"), record("a")];
        assert_eq!(
            prepare_batch(&batch),
            Err(Error::DuplicateId("a".to_string()))
        );
    }

    #[test]
    fn floor_order_puts_missing_floor_first() {
        let mut metas = vec![
            AirspaceMeta {
                lower_altitude_ft: Some(1000),
                ..AirspaceMeta::new("b")
            },
            AirspaceMeta {
                lower_altitude_ft: Some(1000),
                ..AirspaceMeta::new("a")
            },
            AirspaceMeta::new("z"),
            AirspaceMeta {
                lower_altitude_ft: Some(0),
                ..AirspaceMeta::new("c")
            },
        ];

        metas.sort_by(cmp_floor);

        let ids: Vec<_> = metas.iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, ["z", "c", "a", "b"]);
    }

    #[test]
    fn region_batch_must_not_contain_foreign_records() {
        let mut foreign = record("b");
        foreign.meta.country = "AT".to_string();

        let airspaces = prepare_batch(&[record("a"), foreign]).unwrap();

        assert_eq!(
            check_region("DE", &airspaces),
            Err(Error::ForeignRecord {
                id: "b".to_string(),
                country: "DE".to_string(),
            })
        );
    }
}
