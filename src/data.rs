use crate::config::InputConfig;
use crate::error::PipelineError;
use anyhow::{Context, Result};
use csv::{ReaderBuilder, StringRecord};
use std::fs::File;
use std::io::Read;
use std::path::Path;
use tracing::info;

/// A CSV table read wholesale into memory: header row plus records.
/// Column resolution happens lazily so that the pipeline stages own the
/// schema checks for the columns they need.
#[derive(Debug, Clone)]
pub struct RawTable {
    name: &'static str,
    headers: StringRecord,
    records: Vec<StringRecord>,
}

impl RawTable {
    pub fn from_reader(name: &'static str, reader: impl Read, delimiter: u8) -> Result<Self> {
        let mut rdr = ReaderBuilder::new().delimiter(delimiter).from_reader(reader);
        let headers = rdr.headers()?.clone();
        let records = rdr.records().collect::<Result<Vec<_>, _>>()?;
        Ok(RawTable {
            name,
            headers,
            records,
        })
    }

    pub fn load(name: &'static str, path: &Path, delimiter: u8) -> Result<Self> {
        let file =
            File::open(path).with_context(|| format!("Failed to open CSV file: {:?}", path))?;
        let table = Self::from_reader(name, file, delimiter)
            .with_context(|| format!("Failed to read CSV file: {:?}", path))?;
        info!("Loaded {} rows from {:?}", table.len(), path);
        Ok(table)
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Index of a named column, or a schema error when the table does
    /// not carry it.
    pub fn column(&self, column: &str) -> Result<usize, PipelineError> {
        self.headers
            .iter()
            .position(|h| h == column)
            .ok_or_else(|| PipelineError::schema(self.name, column))
    }

    pub fn records(&self) -> &[StringRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// A field by index, treating short records like empty cells.
pub fn field(record: &StringRecord, idx: usize) -> &str {
    record.get(idx).unwrap_or("")
}

/// The three input tables. Delimiters differ per source: the station
/// register and the geometry reference are semicolon-separated, the
/// resident counts use commas.
pub fn load_stations(input: &InputConfig) -> Result<RawTable> {
    RawTable::load("Ladesaeulenregister", &input.stations_csv, b';')
}

pub fn load_residents(input: &InputConfig) -> Result<RawTable> {
    RawTable::load("plz_einwohner", &input.residents_csv, b',')
}

pub fn load_geodata(input: &InputConfig) -> Result<RawTable> {
    RawTable::load("geodata_berlin_plz", &input.geometry_csv, b';')
}
