//! GeoJSON input adaptation.
//!
//! Decodes `FeatureCollection` text into regions, trails and observations.
//! Ring closure and (lon, lat) order come from the `geojson` -> `geo` conversion.

use std::convert::TryInto;

use ::geojson::{feature::Id, Feature, GeoJson, Value};
use log::{debug, info};

use crate::error::{Result, SightlineError};
use crate::{Coordinate, Observation, Polygon, Polyline, Region, Trail};

/// Decode `Polygon` features into regions.
///
/// Names are read from `name_property`, falling back to the feature id.
pub fn regions_from_geojson(text: &str, name_property: &str) -> Result<Vec<Region>> {
    let mut regions = Vec::new();
    for (index, feature) in parse_features(text)?.into_iter().enumerate() {
        let id = feature_id(&feature, index);
        let name = feature_name(&feature, name_property, &id);
        let Some(geometry) = feature.geometry else {
            debug!("Feature {} has no geometry, skipping", index);
            continue;
        };

        match geometry.value {
            value @ Value::Polygon(_) => {
                let polygon: geo::Polygon<f64> = value.try_into().map_err(geojson_error)?;
                regions.push(Region::new(id, name, Polygon::from(&polygon)));
            }
            other => return Err(unsupported(&other, index)),
        }
    }

    info!("Loaded {} regions", regions.len());
    Ok(regions)
}

/// Decode `LineString` features into trails.
pub fn trails_from_geojson(text: &str, name_property: &str) -> Result<Vec<Trail>> {
    let mut trails = Vec::new();
    for (index, feature) in parse_features(text)?.into_iter().enumerate() {
        let id = feature_id(&feature, index);
        let name = feature_name(&feature, name_property, &id);
        let Some(geometry) = feature.geometry else {
            debug!("Feature {} has no geometry, skipping", index);
            continue;
        };

        match geometry.value {
            value @ Value::LineString(_) => {
                let line: geo::LineString<f64> = value.try_into().map_err(geojson_error)?;
                trails.push(Trail::new(id, name, Polyline::from(&line)));
            }
            other => return Err(unsupported(&other, index)),
        }
    }

    info!("Loaded {} trails", trails.len());
    Ok(trails)
}

/// Decode `Point` features into observations; properties become the payload.
pub fn observations_from_geojson(text: &str) -> Result<Vec<Observation>> {
    let mut observations = Vec::new();
    for (index, feature) in parse_features(text)?.into_iter().enumerate() {
        let id = feature_id(&feature, index);
        let attributes = feature
            .properties
            .clone()
            .map(serde_json::Value::Object)
            .unwrap_or(serde_json::Value::Null);
        let Some(geometry) = feature.geometry else {
            debug!("Feature {} has no geometry, skipping", index);
            continue;
        };

        match geometry.value {
            value @ Value::Point(_) => {
                let point: geo::Point<f64> = value.try_into().map_err(geojson_error)?;
                let observation =
                    Observation::new(id, Coordinate::from(point)).with_attributes(attributes);
                observations.push(observation);
            }
            other => return Err(unsupported(&other, index)),
        }
    }

    debug!("Loaded {} observations", observations.len());
    Ok(observations)
}

/// Accept a `FeatureCollection` or a single `Feature`.
fn parse_features(text: &str) -> Result<Vec<Feature>> {
    let geojson: GeoJson = text
        .parse()
        .map_err(|e: ::geojson::Error| SightlineError::GeoJson(e.to_string()))?;

    match geojson {
        GeoJson::FeatureCollection(collection) => Ok(collection.features),
        GeoJson::Feature(feature) => Ok(vec![feature]),
        GeoJson::Geometry(geometry) => Err(unsupported(&geometry.value, 0)),
    }
}

fn feature_id(feature: &Feature, index: usize) -> String {
    match &feature.id {
        Some(Id::String(s)) => s.clone(),
        Some(Id::Number(n)) => n.to_string(),
        None => index.to_string(),
    }
}

fn feature_name(feature: &Feature, property: &str, fallback: &str) -> String {
    feature
        .property(property)
        .and_then(|v| v.as_str())
        .unwrap_or(fallback)
        .to_string()
}

fn geojson_error(e: ::geojson::Error) -> SightlineError {
    SightlineError::GeoJson(e.to_string())
}

fn unsupported(value: &Value, index: usize) -> SightlineError {
    let kind = match value {
        Value::Point(_) => "Point",
        Value::MultiPoint(_) => "MultiPoint",
        Value::LineString(_) => "LineString",
        Value::MultiLineString(_) => "MultiLineString",
        Value::Polygon(_) => "Polygon",
        Value::MultiPolygon(_) => "MultiPolygon",
        Value::GeometryCollection(_) => "GeometryCollection",
    };
    SightlineError::UnsupportedGeometry {
        kind: kind.to_string(),
        index,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const WATERSHEDS: &str = r#"{
        "type": "FeatureCollection",
        "features": [
            {
                "type": "Feature",
                "id": "huc-0106",
                "properties": { "NAME": "Saco" },
                "geometry": {
                    "type": "Polygon",
                    "coordinates": [[
                        [-71.0, 43.0], [-70.0, 43.0], [-70.0, 44.0], [-71.0, 44.0], [-71.0, 43.0]
                    ]]
                }
            },
            {
                "type": "Feature",
                "id": 7,
                "properties": {},
                "geometry": {
                    "type": "Polygon",
                    "coordinates": [[[0.0, 0.0], [1.0, 0.0], [1.0, 1.0]]]
                }
            }
        ]
    }"#;

    #[test]
    fn test_regions_from_geojson() {
        let regions = regions_from_geojson(WATERSHEDS, "NAME").unwrap();
        assert_eq!(regions.len(), 2);
        assert_eq!(regions[0].id, "huc-0106");
        assert_eq!(regions[0].name, "Saco");
        assert_eq!(regions[1].id, "7");
        assert_eq!(regions[1].name, "7");
        // Open ring was closed during conversion
        assert!(regions[1].polygon.validate().is_ok());
    }

    #[test]
    fn test_trails_from_geojson() {
        let text = r#"{
            "type": "Feature",
            "properties": { "name": "Ridge Trail" },
            "geometry": { "type": "LineString", "coordinates": [[-71.0, 43.0], [-70.99, 43.01]] }
        }"#;
        let trails = trails_from_geojson(text, "name").unwrap();
        assert_eq!(trails.len(), 1);
        assert_eq!(trails[0].id, "0");
        assert_eq!(trails[0].name, "Ridge Trail");
        assert_eq!(trails[0].polyline.vertices[1], Coordinate::new(-70.99, 43.01));
    }

    #[test]
    fn test_observations_keep_properties() {
        let text = r#"{
            "type": "FeatureCollection",
            "features": [
                {
                    "type": "Feature",
                    "id": "obs-1",
                    "properties": { "taxon": "Lynx canadensis" },
                    "geometry": { "type": "Point", "coordinates": [-70.5, 43.5] }
                },
                { "type": "Feature", "properties": null, "geometry": null }
            ]
        }"#;
        let observations = observations_from_geojson(text).unwrap();
        assert_eq!(observations.len(), 1);
        assert_eq!(observations[0].coord, Coordinate::new(-70.5, 43.5));
        assert_eq!(observations[0].attributes["taxon"], "Lynx canadensis");
    }

    #[test]
    fn test_unsupported_geometry() {
        let err = trails_from_geojson(WATERSHEDS, "NAME").unwrap_err();
        assert_eq!(
            err,
            SightlineError::UnsupportedGeometry {
                kind: "Polygon".to_string(),
                index: 0
            }
        );
    }

    #[test]
    fn test_malformed_json() {
        assert!(matches!(
            regions_from_geojson("{ not geojson", "name"),
            Err(SightlineError::GeoJson(_))
        ));
    }
}
