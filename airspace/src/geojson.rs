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

//! GeoJSON ingestion and output.
//!
//! Features follow the OpenAIP airspace export: the properties carry the
//! `name`, a numeric `type` and `icaoClass`, the `country` and the vertical
//! limits as objects:
//!
//! ```json
//! "lowerLimit": { "value": 1500, "unit": 1, "referenceDatum": 1 }
//! ```
//!
//! with `unit` 0 = metre, 1 = feet, 6 = flight level and `referenceDatum`
//! 0 = GND, 1 = MSL, 2 = STD.

use geo::BoundingRect;
use geojson::feature::Id;
use geojson::{Feature, GeoJson, Geometry, JsonObject, JsonValue, Value};

use crate::altitude::AltitudeLimit;
use crate::error::Error;
use crate::store::{AirspaceMeta, AirspaceRecord};
use crate::viewport::RenderedAirspace;

const KNOWN_PROPERTIES: [&str; 8] = [
    "_id",
    "id",
    "name",
    "type",
    "icaoClass",
    "country",
    "lowerLimit",
    "upperLimit",
];

/// Converts a feature into airspace records.
///
/// A Polygon yields one record. The polygons of a MultiPolygon are split
/// into independent records with the identifiers suffixed by `#0`, `#1`
/// and so on. Properties that are not part of the airspace metadata are kept
/// as JSON in [`AirspaceMeta::extra_properties`].
///
/// # Errors
///
/// Returns [`InvalidFeature`] if the feature has no identifier, no geometry
/// or limits that can't be read. Any other geometry than (Multi)Polygon is
/// rejected with a [`Geometry`] error.
///
/// [`InvalidFeature`]: Error::InvalidFeature
/// [`Geometry`]: Error::Geometry
#[cfg_attr(docsrs, doc(cfg(feature = "geojson")))]
pub fn records_from_feature(feature: &Feature) -> Result<Vec<AirspaceRecord>, Error> {
    let empty = JsonObject::new();
    let properties = feature.properties.as_ref().unwrap_or(&empty);
    let meta = meta(feature, properties)?;

    let geometry = feature
        .geometry
        .as_ref()
        .ok_or_else(|| Error::InvalidFeature(format!("airspace {} has no geometry", meta.id)))?;

    match &geometry.value {
        Value::Polygon(_) => {
            let polygon = geo::Polygon::<f64>::try_from(geometry.value.clone())?;
            Ok(vec![AirspaceRecord::new(meta, polygon)])
        }
        Value::MultiPolygon(_) => {
            let polygons = geo::MultiPolygon::<f64>::try_from(geometry.value.clone())?;
            Ok(polygons
                .into_iter()
                .enumerate()
                .map(|(i, polygon)| {
                    let meta = AirspaceMeta {
                        id: format!("{}#{i}", meta.id),
                        ..meta.clone()
                    };
                    AirspaceRecord::new(meta, polygon)
                })
                .collect())
        }
        other => Err(Error::Geometry(format!(
            "airspace {} has unsupported geometry {}",
            meta.id,
            type_name(other)
        ))),
    }
}

/// Converts a feature or feature collection into airspace records.
#[cfg_attr(docsrs, doc(cfg(feature = "geojson")))]
pub fn records_from_geojson(geojson: &GeoJson) -> Result<Vec<AirspaceRecord>, Error> {
    match geojson {
        GeoJson::Feature(feature) => records_from_feature(feature),
        GeoJson::FeatureCollection(collection) => {
            let mut records = Vec::with_capacity(collection.features.len());
            for feature in &collection.features {
                records.extend(records_from_feature(feature)?);
            }
            Ok(records)
        }
        GeoJson::Geometry(_) => Err(Error::InvalidFeature(
            "expected a feature or feature collection".to_string(),
        )),
    }
}

fn meta(feature: &Feature, properties: &JsonObject) -> Result<AirspaceMeta, Error> {
    let id = ["_id", "id"]
        .iter()
        .find_map(|key| properties.get(*key).and_then(json_id))
        .or_else(|| match &feature.id {
            Some(Id::String(id)) => Some(id.clone()),
            Some(Id::Number(n)) => Some(n.to_string()),
            None => None,
        })
        .ok_or_else(|| Error::InvalidFeature("feature has no id".to_string()))?;

    let int = |key: &str| {
        properties
            .get(key)
            .and_then(JsonValue::as_i64)
            .and_then(|n| i32::try_from(n).ok())
    };

    let mut meta = AirspaceMeta::new(id);
    meta.name = string(properties, "name").unwrap_or_default();
    meta.type_code = int("type").unwrap_or_default();
    meta.icao_class = int("icaoClass");
    meta.country = string(properties, "country").unwrap_or_default();

    let floor = limit(properties.get("lowerLimit"), &meta.id)?;
    let ceiling = limit(properties.get("upperLimit"), &meta.id)?;
    meta.lower_altitude_ft = floor.and_then(|l| l.to_feet());
    meta.upper_altitude_ft = ceiling.and_then(|l| l.to_feet());

    let extra: JsonObject = properties
        .iter()
        .filter(|(key, _)| !KNOWN_PROPERTIES.contains(&key.as_str()))
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect();

    if !extra.is_empty() {
        meta.extra_properties = Some(JsonValue::Object(extra).to_string());
    }

    Ok(meta)
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Point(_) => "Point",
        Value::MultiPoint(_) => "MultiPoint",
        Value::LineString(_) => "LineString",
        Value::MultiLineString(_) => "MultiLineString",
        Value::Polygon(_) => "Polygon",
        Value::MultiPolygon(_) => "MultiPolygon",
        Value::GeometryCollection(_) => "GeometryCollection",
    }
}

fn json_id(value: &JsonValue) -> Option<String> {
    match value {
        JsonValue::String(s) if !s.is_empty() => Some(s.clone()),
        JsonValue::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn string(properties: &JsonObject, key: &str) -> Option<String> {
    properties
        .get(key)
        .and_then(JsonValue::as_str)
        .map(str::to_string)
}

/// Reads a vertical limit object.
fn limit(value: Option<&JsonValue>, id: &str) -> Result<Option<AltitudeLimit>, Error> {
    let Some(value) = value.filter(|v| !v.is_null()) else {
        return Ok(None);
    };

    let invalid = || Error::InvalidFeature(format!("airspace {id} has invalid limit {value}"));
    let field = |key: &str| value.get(key).and_then(JsonValue::as_f64);

    let amount = field("value").filter(|v| *v >= 0.0).ok_or_else(invalid)?;
    let unit = field("unit").ok_or_else(invalid)? as i64;
    let datum = field("referenceDatum").unwrap_or(1.0) as i64;

    let feet = match unit {
        // metre
        0 => (amount * 3.28084).round() as u32,
        // feet
        1 => amount.round() as u32,
        // flight level
        6 => return Ok(Some(AltitudeLimit::Fl(amount.round() as u16))),
        _ => return Err(invalid()),
    };

    let limit = match datum {
        0 if feet == 0 => AltitudeLimit::Gnd,
        0 => AltitudeLimit::Agl(feet),
        1 => AltitudeLimit::Msl(feet),
        2 => AltitudeLimit::Fl((feet / 100) as u16),
        _ => return Err(invalid()),
    };

    Ok(Some(limit))
}

impl RenderedAirspace {
    /// Returns the rendered airspace as GeoJSON feature.
    ///
    /// The metadata is written as properties in the same format that is read
    /// by [`records_from_feature`], extended by `clipped`.
    #[cfg_attr(docsrs, doc(cfg(feature = "geojson")))]
    pub fn to_geojson(&self) -> GeoJson {
        let meta = &self.meta;
        let mut properties = meta
            .extra_properties
            .as_deref()
            .and_then(json_object)
            .unwrap_or_default();

        let limit = |ft: Option<i32>| match ft {
            Some(ft) => JsonValue::from(JsonObject::from_iter([
                ("value".to_string(), JsonValue::from(ft)),
                ("unit".to_string(), JsonValue::from(1_i32)),
                ("referenceDatum".to_string(), JsonValue::from(1_i32)),
            ])),
            None => JsonValue::Null,
        };

        properties.insert("_id".to_string(), JsonValue::from(meta.id.as_str()));
        properties.insert("name".to_string(), JsonValue::from(meta.name.as_str()));
        properties.insert("type".to_string(), JsonValue::from(meta.type_code));
        properties.insert(
            "icaoClass".to_string(),
            meta.icao_class.map_or(JsonValue::Null, JsonValue::from),
        );
        properties.insert("country".to_string(), JsonValue::from(meta.country.as_str()));
        properties.insert("lowerLimit".to_string(), limit(meta.lower_altitude_ft));
        properties.insert("upperLimit".to_string(), limit(meta.upper_altitude_ft));
        properties.insert("clipped".to_string(), JsonValue::from(self.clipped));

        GeoJson::Feature(Feature {
            bbox: self
                .polygon
                .bounding_rect()
                .map(|rect| vec![rect.min().x, rect.min().y, rect.max().x, rect.max().y]),
            geometry: Some(Geometry::new(Value::from(&self.polygon))),
            id: Some(Id::String(meta.id.clone())),
            properties: Some(properties),
            foreign_members: None,
        })
    }
}

fn json_object(s: &str) -> Option<JsonObject> {
    match s.parse::<JsonValue>() {
        Ok(JsonValue::Object(object)) => Some(object),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FEATURE: &str = r#"{
        "type": "Feature",
        "geometry": {
            "type": "Polygon",
            "coordinates": [[[9.0, 53.0], [10.0, 53.0], [10.0, 54.0], [9.0, 54.0], [9.0, 53.0]]]
        },
        "properties": {
            "_id": "62614a3fd7bb4e3a4d9ba8d7",
            "name": "HAMBURG CTR",
            "type": 4,
            "icaoClass": 3,
            "country": "DE",
            "lowerLimit": { "value": 0, "unit": 1, "referenceDatum": 0 },
            "upperLimit": { "value": 25, "unit": 6, "referenceDatum": 2 },
            "frequency": "126.850"
        }
    }"#;

    #[test]
    fn reads_openaip_feature() {
        let geojson: GeoJson = FEATURE.parse().unwrap();
        let records = records_from_geojson(&geojson).unwrap();

        assert_eq!(records.len(), 1);

        let meta = &records[0].meta;
        assert_eq!(meta.id, "62614a3fd7bb4e3a4d9ba8d7");
        assert_eq!(meta.name, "HAMBURG CTR");
        assert_eq!(meta.type_code, 4);
        assert_eq!(meta.icao_class, Some(3));
        assert_eq!(meta.country, "DE");
        assert_eq!(meta.lower_altitude_ft, Some(0));
        assert_eq!(meta.upper_altitude_ft, Some(2500));
        assert_eq!(
            meta.extra_properties.as_deref(),
            Some(r#"{"frequency":"126.850"}"#)
        );

        assert_eq!(
            records[0].polygon,
            polygon![(53.0, 9.0), (53.0, 10.0), (54.0, 10.0), (54.0, 9.0)]
        );
    }

    #[test]
    fn multi_polygon_is_split() {
        let geojson: GeoJson = r#"{
            "type": "Feature",
            "geometry": {
                "type": "MultiPolygon",
                "coordinates": [
                    [[[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 0.0]]],
                    [[[2.0, 0.0], [3.0, 0.0], [3.0, 1.0], [2.0, 0.0]]]
                ]
            },
            "properties": {
                "_id": "split",
                "lowerLimit": { "value": 300, "unit": 0, "referenceDatum": 1 }
            }
        }"#
        .parse()
        .unwrap();

        let records = records_from_geojson(&geojson).unwrap();

        let ids: Vec<_> = records.iter().map(|r| r.meta.id.as_str()).collect();
        assert_eq!(ids, ["split#0", "split#1"]);
        assert_eq!(records[1].meta.lower_altitude_ft, Some(984));
    }

    #[test]
    fn feature_without_id_is_rejected() {
        let geojson: GeoJson = r#"{
            "type": "Feature",
            "geometry": { "type": "Point", "coordinates": [0.0, 0.0] },
            "properties": { "name": "nameless" }
        }"#
        .parse()
        .unwrap();

        assert!(matches!(
            records_from_geojson(&geojson),
            Err(Error::InvalidFeature(_))
        ));
    }

    #[test]
    fn point_geometry_is_rejected() {
        let geojson: GeoJson = r#"{
            "type": "Feature",
            "geometry": { "type": "Point", "coordinates": [0.0, 0.0] },
            "properties": { "_id": "point" }
        }"#
        .parse()
        .unwrap();

        assert!(matches!(
            records_from_geojson(&geojson),
            Err(Error::Geometry(_))
        ));
    }

    #[test]
    fn rendered_airspace_round_trips_metadata() {
        let geojson: GeoJson = FEATURE.parse().unwrap();
        let record = records_from_geojson(&geojson).unwrap().remove(0);

        let rendered = RenderedAirspace {
            meta: record.meta.clone(),
            polygon: geo::MultiPolygon::new(vec![record.polygon.clone()]),
            clipped: true,
        };

        let GeoJson::Feature(feature) = rendered.to_geojson() else {
            panic!("expected a feature");
        };

        assert_eq!(feature.bbox, Some(vec![9.0, 53.0, 10.0, 54.0]));

        let properties = feature.properties.as_ref().unwrap();
        assert_eq!(properties.get("clipped"), Some(&JsonValue::Bool(true)));
        assert_eq!(
            properties.get("frequency"),
            Some(&JsonValue::from("126.850"))
        );

        // the limits come back in feet above MSL
        let meta = &records_from_feature(&feature).unwrap()[0].meta;
        assert_eq!(meta.lower_altitude_ft, Some(0));
        assert_eq!(meta.upper_altitude_ft, Some(2500));
        assert_eq!(meta.name, "HAMBURG CTR");
    }
}
