use crate::colormap::LinearColorMap;
use crate::demand::DEMAND_FORMULA;
use crate::pipeline::PipelineOutput;
use crate::types::{ResidentArea, ScoredArea};
use anyhow::{Context, Result};
use geo::Geometry;
use geojson::{Feature, FeatureCollection, JsonObject, JsonValue};
use std::fs;
use std::path::Path;
use tracing::info;

/// CSS color names used by the layer scales.
mod palette {
    pub const BLUE: &str = "#0000ff";
    pub const GREEN: &str = "#008000";
    pub const YELLOW: &str = "#ffff00";
    pub const ORANGE: &str = "#ffa500";
    pub const RED: &str = "#ff0000";
    pub const MAGENTA: &str = "#ff00ff";
    pub const DARK_BLUE: &str = "#00008b";
    pub const LIGHT_BLUE: &str = "#add8e6";
}

const RESIDENT_COLORS: &[&str] = &[
    palette::BLUE,
    palette::GREEN,
    palette::YELLOW,
    palette::RED,
];

const STATION_COLORS: &[&str] = &[
    palette::BLUE,
    palette::GREEN,
    palette::YELLOW,
    palette::ORANGE,
    palette::RED,
    palette::MAGENTA,
];

const DEMAND_COLORS: &[&str] = &[
    palette::DARK_BLUE,
    palette::DARK_BLUE,
    palette::BLUE,
    palette::BLUE,
    palette::LIGHT_BLUE,
    palette::LIGHT_BLUE,
    palette::RED,
    palette::RED,
];

fn value_range(values: impl Iterator<Item = f64>) -> (f64, f64) {
    let mut min = f64::INFINITY;
    let mut max = f64::NEG_INFINITY;
    for v in values {
        min = min.min(v);
        max = max.max(v);
    }
    if min > max {
        (0.0, 0.0)
    } else {
        (min, max)
    }
}

fn feature(
    geometry: &Geometry<f64>,
    fill_color: String,
    tooltip: String,
    data: &[(&str, JsonValue)],
) -> Feature {
    let mut properties = JsonObject::new();
    properties.insert("fillColor".to_string(), fill_color.into());
    properties.insert("color".to_string(), "black".into());
    properties.insert("weight".to_string(), 1.into());
    properties.insert("fillOpacity".to_string(), 0.7.into());
    properties.insert("tooltip".to_string(), tooltip.into());
    for (key, value) in data {
        properties.insert((*key).to_string(), value.clone());
    }

    Feature {
        bbox: None,
        geometry: Some(geojson::Geometry::new(geojson::Value::from(geometry))),
        id: None,
        properties: Some(properties),
        foreign_members: None,
    }
}

fn collection(features: Vec<Feature>) -> FeatureCollection {
    FeatureCollection {
        bbox: None,
        features,
        foreign_members: None,
    }
}

/// Choropleth of resident counts per postal code.
pub fn residents_layer(areas: &[ResidentArea]) -> FeatureCollection {
    let (vmin, vmax) = value_range(areas.iter().map(|a| a.einwohner as f64));
    let color_map = LinearColorMap::new(RESIDENT_COLORS, vmin, vmax);

    collection(
        areas
            .iter()
            .map(|area| {
                feature(
                    &area.geometry,
                    color_map.color(area.einwohner as f64),
                    format!("PLZ: {}, Einwohner: {}", area.plz, area.einwohner),
                    &[
                        ("PLZ", area.plz.into()),
                        ("Einwohner", area.einwohner.into()),
                    ],
                )
            })
            .collect(),
    )
}

/// Choropleth of charging-station counts per postal code.
pub fn charging_stations_layer(areas: &[ScoredArea]) -> FeatureCollection {
    let (vmin, vmax) = value_range(areas.iter().map(|a| a.number as f64));
    let color_map = LinearColorMap::new(STATION_COLORS, vmin, vmax);

    collection(
        areas
            .iter()
            .map(|area| {
                feature(
                    &area.geometry,
                    color_map.color(area.number as f64),
                    format!("PLZ: {}, Number: {}", area.plz, area.number),
                    &[("PLZ", area.plz.into()), ("Number", area.number.into())],
                )
            })
            .collect(),
    )
}

/// Choropleth of the demand score per postal code. The scoring formula
/// rides along as collection metadata so the page can display it next to
/// the layer.
pub fn demand_layer(areas: &[ScoredArea]) -> FeatureCollection {
    let (vmin, vmax) = value_range(areas.iter().map(|a| a.demand as f64));
    let color_map = LinearColorMap::new(DEMAND_COLORS, vmin, vmax);

    let mut layer = collection(
        areas
            .iter()
            .map(|area| {
                feature(
                    &area.geometry,
                    color_map.color(area.demand as f64),
                    format!("PLZ: {}, Demand: {}", area.plz, area.demand),
                    &[("PLZ", area.plz.into()), ("Demand", area.demand.into())],
                )
            })
            .collect(),
    );

    let mut members = JsonObject::new();
    members.insert("formula".to_string(), DEMAND_FORMULA.into());
    layer.foreign_members = Some(members);
    layer
}

/// Writes the three layers as GeoJSON files under `dir`.
pub fn write_layers(dir: &Path, output: &PipelineOutput) -> Result<()> {
    fs::create_dir_all(dir).with_context(|| format!("Failed to create layer dir: {:?}", dir))?;

    let layers = [
        ("residents", residents_layer(&output.residents)),
        ("charging_stations", charging_stations_layer(&output.scored)),
        ("demand", demand_layer(&output.scored)),
    ];
    for (name, layer) in layers {
        let path = dir.join(format!("{name}.geojson"));
        let json = serde_json::to_string(&layer)
            .with_context(|| format!("Failed to serialize {name} layer"))?;
        fs::write(&path, json).with_context(|| format!("Failed to write {:?}", path))?;
        info!("Wrote {} features to {:?}", layer.features.len(), path);
    }
    Ok(())
}
