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

use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};
use log::{debug, info, trace, warn};
use rusqlite::types::{Value, ValueRef};
use rusqlite::{
    params, params_from_iter, Connection, OpenFlags, Row, Transaction, TransactionBehavior,
};

use super::{
    check_region, prepare_batch, schema, Airspace, AirspaceMeta, AirspaceRecord, AirspaceSource,
    RegionInfo, StoreOptions,
};
use crate::codec::EncodedGeometry;
use crate::error::Error;
use crate::geom::Bounds;
use crate::query::Query;

const SELECT_AIRSPACES: &str = "SELECT id, name, type_code, icao_class, country, \
    lower_altitude_ft, upper_altitude_ft, west, east, south, north, coords, rings, \
    extra_properties FROM airspaces";

const INSERT_AIRSPACE: &str = "INSERT OR REPLACE INTO airspaces (id, name, type_code, \
    icao_class, country, lower_altitude_ft, upper_altitude_ft, west, east, south, north, \
    coords, rings, extra_properties) \
    VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)";

const SELECT_REGIONS: &str = "SELECT r.country, r.replaced_at, \
    (SELECT COUNT(*) FROM airspaces a WHERE a.country = r.country) FROM regions r";

#[derive(Clone, Debug)]
enum Location {
    File(PathBuf),
    Memory,
}

impl Location {
    fn connect(&self, options: &StoreOptions) -> Result<Connection, Error> {
        let flags = OpenFlags::SQLITE_OPEN_READ_WRITE
            | OpenFlags::SQLITE_OPEN_CREATE
            | OpenFlags::SQLITE_OPEN_NO_MUTEX;

        let conn = match self {
            Self::File(path) => Connection::open_with_flags(path, flags)?,
            Self::Memory => Connection::open_in_memory_with_flags(flags)?,
        };

        conn.busy_timeout(options.busy_timeout)?;
        Ok(conn)
    }
}

/// Airspace store backed by SQLite.
///
/// The store can be shared between threads. Writes are serialized and each
/// batch is written in one transaction, so readers never see a partially
/// written batch. Reads of a file based store use a pool of separate
/// connections and don't wait for each other. The database runs in WAL mode,
/// in which readers also don't wait for a writer. An in-memory store has a
/// single connection that serves reads and writes.
///
/// # Examples
///
/// ```
/// use airspace::prelude::*;
/// use airspace::query;
///
/// # fn main() -> Result<(), Error> {
/// let store = Store::open_in_memory()?;
///
/// store.replace_region(
///     "DE",
///     &[AirspaceRecord::new(
///         AirspaceMeta::new("ED-R146").with_country("DE"),
///         polygon![(52.5, 7.0), (52.5, 7.5), (53.0, 7.25)],
///     )],
/// )?;
///
/// let query = query::plan(Bounds::new(6.0, 52.0, 8.0, 54.0), 10_000, &[])?;
/// assert_eq!(store.query(&query)?.len(), 1);
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct Store {
    writer: Mutex<Connection>,
    readers: Mutex<Vec<Connection>>,
    location: Location,
    options: StoreOptions,
}

impl Store {
    /// Opens or creates the store at the path.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, Error> {
        Self::open_with(path, StoreOptions::default())
    }

    pub fn open_with(path: impl AsRef<Path>, options: StoreOptions) -> Result<Self, Error> {
        Self::init(Location::File(path.as_ref().to_path_buf()), options)
    }

    /// Creates a store that lives in memory until it is dropped.
    pub fn open_in_memory() -> Result<Self, Error> {
        Self::open_in_memory_with(StoreOptions::default())
    }

    pub fn open_in_memory_with(options: StoreOptions) -> Result<Self, Error> {
        Self::init(Location::Memory, options)
    }

    fn init(location: Location, options: StoreOptions) -> Result<Self, Error> {
        let mut writer = location.connect(&options)?;

        if let Location::File(_) = location {
            let mode: String =
                writer.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))?;
            trace!("journal mode is {mode}");
        }

        schema::migrations().to_latest(&mut writer)?;
        info!("opened airspace store at {:?}", location);

        Ok(Self {
            writer: Mutex::new(writer),
            readers: Mutex::new(Vec::new()),
            location,
            options,
        })
    }

    /// Inserts the airspaces or replaces those with the same identifier.
    ///
    /// Returns the number of written airspaces.
    ///
    /// # Errors
    ///
    /// The whole batch is rejected without writing anything if one record is
    /// invalid (see [`Airspace::try_from`]) or an identifier appears twice.
    pub fn upsert_batch(&self, records: &[AirspaceRecord]) -> Result<usize, Error> {
        let airspaces = prepare_batch(records)?;

        let mut conn = lock(&self.writer);
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        insert(&tx, &airspaces)?;
        tx.commit()?;

        debug!("upserted {} airspace(s)", airspaces.len());
        Ok(airspaces.len())
    }

    /// Replaces all airspaces of a country with the records.
    ///
    /// Existing airspaces of the country that are not part of the batch are
    /// removed. All records must carry the country code.
    pub fn replace_region(
        &self,
        country: &str,
        records: &[AirspaceRecord],
    ) -> Result<usize, Error> {
        let airspaces = prepare_batch(records)?;
        check_region(country, &airspaces)?;

        let mut conn = lock(&self.writer);
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let removed = tx.execute("DELETE FROM airspaces WHERE country = ?1", [country])?;
        insert(&tx, &airspaces)?;
        tx.execute(
            "INSERT INTO regions (country, replaced_at) VALUES (?1, ?2) \
             ON CONFLICT (country) DO UPDATE SET replaced_at = excluded.replaced_at",
            params![country, Utc::now().to_rfc3339()],
        )?;
        tx.commit()?;

        info!(
            "replaced region {country}: {removed} airspace(s) removed, {} inserted",
            airspaces.len()
        );
        Ok(airspaces.len())
    }

    /// Removes all airspaces of a country and returns how many were removed.
    pub fn remove_region(&self, country: &str) -> Result<usize, Error> {
        let mut conn = lock(&self.writer);
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let removed = tx.execute("DELETE FROM airspaces WHERE country = ?1", [country])?;
        tx.execute("DELETE FROM regions WHERE country = ?1", [country])?;
        tx.commit()?;

        info!("removed region {country}: {removed} airspace(s)");
        Ok(removed)
    }

    /// Returns the bookkeeping of a region that was replaced as a whole.
    pub fn region(&self, country: &str) -> Result<Option<RegionInfo>, Error> {
        let sql = format!("{SELECT_REGIONS} WHERE r.country = ?1");
        let mut regions = self.read_regions(&sql, [country])?;
        Ok(regions.pop())
    }

    /// Returns all regions sorted by country.
    pub fn regions(&self) -> Result<Vec<RegionInfo>, Error> {
        let sql = format!("{SELECT_REGIONS} ORDER BY r.country");
        self.read_regions(&sql, params![])
    }

    /// Returns the airspace with the identifier.
    ///
    /// # Errors
    ///
    /// Unlike a viewport query, this fails with [`CorruptGeometry`] if the
    /// stored geometry can't be read.
    ///
    /// [`CorruptGeometry`]: Error::CorruptGeometry
    pub fn get(&self, id: &str) -> Result<Option<Airspace>, Error> {
        self.with_reader(|conn| {
            let mut stmt = conn.prepare_cached(&format!("{SELECT_AIRSPACES} WHERE id = ?1"))?;
            let mut rows = stmt.query_map([id], read_airspace)?;

            let Some(row) = rows.next() else {
                return Ok(None);
            };

            let (meta, bounds, geometry) = row?;
            Ok(Some(Airspace {
                meta,
                bounds,
                geometry: geometry?,
            }))
        })
    }

    /// Returns the number of stored airspaces.
    pub fn len(&self) -> Result<usize, Error> {
        self.with_reader(|conn| {
            let count: i64 =
                conn.query_row("SELECT COUNT(*) FROM airspaces", [], |row| row.get(0))?;
            Ok(count as usize)
        })
    }

    pub fn is_empty(&self) -> Result<bool, Error> {
        self.len().map(|len| len == 0)
    }

    fn read_regions<P: rusqlite::Params>(
        &self,
        sql: &str,
        params: P,
    ) -> Result<Vec<RegionInfo>, Error> {
        self.with_reader(|conn| {
            let mut stmt = conn.prepare_cached(sql)?;
            let rows = stmt.query_map(params, |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, i64>(2)?,
                ))
            })?;

            rows.map(|row| -> Result<RegionInfo, Error> {
                let (country, replaced_at, count) = row?;
                let replaced_at = DateTime::parse_from_rfc3339(&replaced_at)
                    .map_err(|e| Error::Storage(format!("region {country}: {e}")))?
                    .with_timezone(&Utc);

                Ok(RegionInfo {
                    country,
                    airspace_count: count as usize,
                    replaced_at,
                })
            })
            .collect()
        })
    }

    /// Runs `f` with a pooled read connection.
    fn with_reader<T>(&self, f: impl FnOnce(&Connection) -> Result<T, Error>) -> Result<T, Error> {
        if let Location::Memory = self.location {
            return f(&lock(&self.writer));
        }

        let pooled = lock(&self.readers).pop();
        let conn = match pooled {
            Some(conn) => conn,
            None => {
                let conn = self.location.connect(&self.options)?;
                conn.pragma_update(None, "query_only", true)?;
                conn
            }
        };

        let result = f(&conn);

        let mut readers = lock(&self.readers);
        if readers.len() < self.options.readers {
            readers.push(conn);
        }

        result
    }
}

impl AirspaceSource for Store {
    fn query(&self, query: &Query) -> Result<Vec<Airspace>, Error> {
        let (sql, values) = to_sql(query);
        trace!("query airspaces: {sql}");

        self.with_reader(|conn| {
            let mut stmt = conn.prepare_cached(&sql)?;
            let rows = stmt.query_map(params_from_iter(values.iter()), read_airspace)?;

            let mut airspaces = Vec::new();
            for row in rows {
                let (meta, bounds, geometry) = row?;
                match geometry {
                    Ok(geometry) => airspaces.push(Airspace {
                        meta,
                        bounds,
                        geometry,
                    }),
                    Err(e) => warn!("skipping airspace {}: {e}", meta.id),
                }
            }

            debug!("query returned {} airspace(s)", airspaces.len());
            Ok(airspaces)
        })
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

fn insert(tx: &Transaction<'_>, airspaces: &[Airspace]) -> Result<(), Error> {
    let mut stmt = tx.prepare_cached(INSERT_AIRSPACE)?;

    for airspace in airspaces {
        let Airspace {
            meta,
            bounds,
            geometry,
        } = airspace;

        stmt.execute(params![
            meta.id,
            meta.name,
            meta.type_code,
            meta.icao_class,
            meta.country,
            meta.lower_altitude_ft,
            meta.upper_altitude_ft,
            bounds.west,
            bounds.east,
            bounds.south,
            bounds.north,
            geometry.coords_to_bytes(),
            geometry.rings_to_bytes(),
            meta.extra_properties,
        ])?;
    }

    Ok(())
}

/// Builds the SQL of the viewport query and its parameters.
fn to_sql(query: &Query) -> (String, Vec<Value>) {
    let mut values = Vec::new();

    let lon = query
        .lon_ranges()
        .iter()
        .map(|&(west, east)| {
            values.push(Value::Real(west));
            values.push(Value::Real(east));
            "(east >= ? AND west <= ?)"
        })
        .collect::<Vec<_>>()
        .join(" OR ");

    values.push(Value::Real(query.south()));
    values.push(Value::Real(query.north()));
    values.push(Value::Integer(query.max_altitude_ft().into()));

    let mut sql = format!(
        "{SELECT_AIRSPACES} WHERE ({lon}) AND north >= ? AND south <= ? \
         AND (lower_altitude_ft IS NULL OR lower_altitude_ft <= ?)"
    );

    if !query.excluded_types().is_empty() {
        let placeholders = vec!["?"; query.excluded_types().len()].join(", ");
        sql.push_str(&format!(" AND type_code NOT IN ({placeholders})"));
        values.extend(
            query
                .excluded_types()
                .iter()
                .map(|&t| Value::Integer(t.into())),
        );
    }

    sql.push_str(" ORDER BY lower_altitude_ft ASC, id ASC");

    (sql, values)
}

type AirspaceRow = (AirspaceMeta, Bounds, Result<EncodedGeometry, Error>);

/// Reads a row of [`SELECT_AIRSPACES`].
///
/// The geometry blobs are borrowed from the row and copied into an owned
/// geometry. A geometry that can't be decoded doesn't fail the row.
fn read_airspace(row: &Row<'_>) -> rusqlite::Result<AirspaceRow> {
    let meta = AirspaceMeta {
        id: row.get(0)?,
        name: row.get(1)?,
        type_code: row.get(2)?,
        icao_class: row.get(3)?,
        country: row.get(4)?,
        lower_altitude_ft: row.get(5)?,
        upper_altitude_ft: row.get(6)?,
        extra_properties: row.get(13)?,
    };

    let bounds = Bounds {
        west: row.get(7)?,
        east: row.get(8)?,
        south: row.get(9)?,
        north: row.get(10)?,
    };

    let geometry = match (row.get_ref(11)?, row.get_ref(12)?) {
        (ValueRef::Blob(coords), ValueRef::Blob(rings)) => {
            EncodedGeometry::from_bytes(coords, rings)
        }
        _ => Err(Error::CorruptGeometry("geometry is not stored as blob".into())),
    };

    Ok((meta, bounds, geometry))
}
