use crate::config::AppConfig;
use crate::data::{self, field, RawTable};
use crate::demand;
use crate::error::PipelineError;
use crate::types::{
    MergedArea, NormalizedResident, NormalizedStation, ResidentArea, ScoredArea, StationArea,
    StationCount,
};
use anyhow::Result;
use geo::Geometry;
use std::collections::{BTreeMap, HashMap};
use std::str::FromStr;
use tracing::info;
use wkt::TryFromWkt;

/// Region filter for the station register. Only Berlin rows survive.
const STATION_REGION: &str = "Berlin";
/// Open PLZ interval for the station register filter.
const STATION_PLZ_BOUNDS: (u32, u32) = (10115, 14200);
/// Open PLZ interval for the resident table filter. The resident table
/// has no region column, so the interval does all the work.
const RESIDENT_PLZ_BOUNDS: (u32, u32) = (10000, 14200);

/// The postal-code-to-geometry reference table: PLZ mapped to the WKT
/// text of its polygon. Immutable, used only for joining.
#[derive(Debug, Clone)]
pub struct GeoReference {
    wkt_by_plz: HashMap<u32, String>,
}

impl GeoReference {
    pub fn from_table(raw: &RawTable, join_column: &str) -> Result<Self, PipelineError> {
        let plz_idx = raw.column(join_column)?;
        let geometry_idx = raw.column("geometry")?;

        let mut wkt_by_plz = HashMap::with_capacity(raw.len());
        for (row, record) in raw.records().iter().enumerate() {
            let plz = parse_cell::<u32>(raw.name(), row, join_column, field(record, plz_idx))?;
            wkt_by_plz.insert(plz, field(record, geometry_idx).to_string());
        }
        Ok(GeoReference { wkt_by_plz })
    }

    pub fn wkt_for(&self, plz: u32) -> Option<&str> {
        self.wkt_by_plz.get(&plz).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.wkt_by_plz.len()
    }

    pub fn is_empty(&self) -> bool {
        self.wkt_by_plz.is_empty()
    }
}

fn parse_cell<T: FromStr>(
    table: &'static str,
    row: usize,
    column: &str,
    value: &str,
) -> Result<T, PipelineError>
where
    T::Err: std::fmt::Display,
{
    value.trim().parse::<T>().map_err(|e| {
        PipelineError::parse(
            "numeric value",
            format!("{table} row {row}, column '{column}', value '{value}'"),
            e,
        )
    })
}

/// Comma decimal separator to dot.
fn to_dot_decimal(value: &str) -> String {
    value.replace(',', ".")
}

/// Normalizes the raw charging-station register: selects the source
/// columns (schema error when one is missing), renames them to the
/// canonical keys, rewrites the coordinate columns as dot-decimal
/// strings, and keeps only Berlin rows whose PLZ lies strictly inside
/// the configured bounds.
pub fn preprocess_stations(raw: &RawTable) -> Result<Vec<NormalizedStation>, PipelineError> {
    let plz_idx = raw.column("Postleitzahl")?;
    let region_idx = raw.column("Bundesland")?;
    let lat_idx = raw.column("Breitengrad")?;
    let lon_idx = raw.column("Längengrad")?;
    let kw_idx = raw.column("Nennleistung Ladeeinrichtung [kW]")?;

    let (lower, upper) = STATION_PLZ_BOUNDS;
    let mut rows = Vec::new();
    for (row, record) in raw.records().iter().enumerate() {
        let plz = parse_cell::<u32>(raw.name(), row, "Postleitzahl", field(record, plz_idx))?;
        if field(record, region_idx) != STATION_REGION {
            continue;
        }
        if plz <= lower || plz >= upper {
            continue;
        }
        rows.push(NormalizedStation {
            plz,
            kw: field(record, kw_idx).to_string(),
            breitengrad: to_dot_decimal(field(record, lat_idx)),
            laengengrad: to_dot_decimal(field(record, lon_idx)),
        });
    }
    Ok(rows)
}

/// Normalizes the raw resident table the same way, without a region
/// filter and with the wider PLZ interval.
pub fn preprocess_residents(raw: &RawTable) -> Result<Vec<NormalizedResident>, PipelineError> {
    let plz_idx = raw.column("plz")?;
    let einwohner_idx = raw.column("einwohner")?;
    let lat_idx = raw.column("lat")?;
    let lon_idx = raw.column("lon")?;

    let (lower, upper) = RESIDENT_PLZ_BOUNDS;
    let mut rows = Vec::new();
    for (row, record) in raw.records().iter().enumerate() {
        let plz = parse_cell::<u32>(raw.name(), row, "plz", field(record, plz_idx))?;
        let einwohner =
            parse_cell::<u64>(raw.name(), row, "einwohner", field(record, einwohner_idx))?;
        if plz <= lower || plz >= upper {
            continue;
        }
        rows.push(NormalizedResident {
            plz,
            einwohner,
            breitengrad: to_dot_decimal(field(record, lat_idx)),
            laengengrad: to_dot_decimal(field(record, lon_idx)),
        });
    }
    Ok(rows)
}

/// Sorts rows by PLZ ascending and left-joins the geometry reference,
/// parsing each matched WKT entry into a shape. Rows whose PLZ has no
/// reference entry cannot be plotted and are dropped; malformed WKT on a
/// matched row is fatal. Output keeps the sorted input order.
pub fn sort_by_plz_add_geometry<T, U>(
    mut rows: Vec<T>,
    geo_ref: &GeoReference,
    plz_of: impl Fn(&T) -> u32,
    with_geometry: impl Fn(T, Geometry<f64>) -> U,
) -> Result<Vec<U>, PipelineError> {
    rows.sort_by_key(&plz_of);

    let mut joined = Vec::with_capacity(rows.len());
    for row in rows {
        let plz = plz_of(&row);
        let Some(wkt_text) = geo_ref.wkt_for(plz) else {
            continue;
        };
        let geometry = Geometry::try_from_wkt_str(wkt_text)
            .map_err(|e| PipelineError::parse("WKT geometry", format!("PLZ {plz}"), e))?;
        joined.push(with_geometry(row, geometry));
    }
    Ok(joined)
}

pub fn add_station_geometry(
    rows: Vec<NormalizedStation>,
    geo_ref: &GeoReference,
) -> Result<Vec<StationArea>, PipelineError> {
    sort_by_plz_add_geometry(rows, geo_ref, |r| r.plz, |r, geometry| StationArea {
        plz: r.plz,
        kw: r.kw,
        breitengrad: r.breitengrad,
        laengengrad: r.laengengrad,
        geometry,
    })
}

pub fn add_resident_geometry(
    rows: Vec<NormalizedResident>,
    geo_ref: &GeoReference,
) -> Result<Vec<ResidentArea>, PipelineError> {
    sort_by_plz_add_geometry(rows, geo_ref, |r| r.plz, |r, geometry| ResidentArea {
        plz: r.plz,
        einwohner: r.einwohner,
        breitengrad: r.breitengrad,
        laengengrad: r.laengengrad,
        geometry,
    })
}

/// Groups station rows by PLZ: one output row per distinct code with the
/// row count and the geometry of the first row seen for that code.
/// Output is ordered by PLZ ascending. An empty input yields an empty,
/// correctly typed output.
pub fn count_plz_occurrences(stations: &[StationArea]) -> Vec<StationCount> {
    let mut counts: BTreeMap<u32, StationCount> = BTreeMap::new();
    for station in stations {
        counts
            .entry(station.plz)
            .and_modify(|c| c.number += 1)
            .or_insert_with(|| StationCount {
                plz: station.plz,
                number: 1,
                geometry: station.geometry.clone(),
            });
    }
    counts.into_values().collect()
}

/// Left-joins station counts onto the population table by PLZ. Every
/// population row is preserved; a code with no station row means zero
/// stations, so the count is filled with 0 rather than dropped (unlike
/// the geometry join, where a missing match makes the row unplottable).
/// Station counts without a population row are dropped.
pub fn merge_stations_residents(
    counts: &[StationCount],
    residents: &[ResidentArea],
) -> Vec<MergedArea> {
    let number_by_plz: HashMap<u32, u64> = counts.iter().map(|c| (c.plz, c.number)).collect();
    residents
        .iter()
        .map(|r| MergedArea {
            plz: r.plz,
            einwohner: r.einwohner,
            number: number_by_plz.get(&r.plz).copied().unwrap_or(0),
            geometry: r.geometry.clone(),
        })
        .collect()
}

/// Everything the rendering layer and the server consume.
#[derive(Debug, Clone)]
pub struct PipelineOutput {
    pub residents: Vec<ResidentArea>,
    pub counts: Vec<StationCount>,
    pub scored: Vec<ScoredArea>,
}

/// Loads the three input tables and runs the full pipeline:
/// normalize → join geometry → aggregate stations → merge → score.
pub fn run(config: &AppConfig) -> Result<PipelineOutput> {
    let geodata = data::load_geodata(&config.input)?;
    let geo_ref = GeoReference::from_table(&geodata, &config.input.join_column)?;
    info!("Geometry reference covers {} postal codes", geo_ref.len());

    let stations_raw = data::load_stations(&config.input)?;
    let stations = add_station_geometry(preprocess_stations(&stations_raw)?, &geo_ref)?;
    let counts = count_plz_occurrences(&stations);
    info!(
        "{} station rows aggregated into {} postal codes",
        stations.len(),
        counts.len()
    );

    let residents_raw = data::load_residents(&config.input)?;
    let residents = add_resident_geometry(preprocess_residents(&residents_raw)?, &geo_ref)?;
    info!("{} resident areas after geometry join", residents.len());

    let merged = merge_stations_residents(&counts, &residents);
    let scored = demand::score(merged)?;

    Ok(PipelineOutput {
        residents,
        counts,
        scored,
    })
}
