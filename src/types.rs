use geo::Geometry;

/// Charging-station row after locale normalization: canonical column
/// names, coordinates as dot-decimal strings.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedStation {
    pub plz: u32,
    pub kw: String,
    pub breitengrad: String,
    pub laengengrad: String,
}

/// Resident-count row after locale normalization.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedResident {
    pub plz: u32,
    pub einwohner: u64,
    pub breitengrad: String,
    pub laengengrad: String,
}

/// A charging-station row with its postal-code geometry attached.
#[derive(Debug, Clone, PartialEq)]
pub struct StationArea {
    pub plz: u32,
    pub kw: String,
    pub breitengrad: String,
    pub laengengrad: String,
    pub geometry: Geometry<f64>,
}

/// A resident-count row with its postal-code geometry attached.
#[derive(Debug, Clone, PartialEq)]
pub struct ResidentArea {
    pub plz: u32,
    pub einwohner: u64,
    pub breitengrad: String,
    pub laengengrad: String,
    pub geometry: Geometry<f64>,
}

/// One row per distinct PLZ: how many stations it has, and the geometry
/// of the first station row seen for that code.
#[derive(Debug, Clone, PartialEq)]
pub struct StationCount {
    pub plz: u32,
    pub number: u64,
    pub geometry: Geometry<f64>,
}

/// Population row with the station count joined on. `number` is 0 for
/// postal codes without any station, never absent.
#[derive(Debug, Clone, PartialEq)]
pub struct MergedArea {
    pub plz: u32,
    pub einwohner: u64,
    pub number: u64,
    pub geometry: Geometry<f64>,
}

/// A merged row with its demand score attached. Negative demand means
/// the area already has more stations than the formula's target.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredArea {
    pub plz: u32,
    pub einwohner: u64,
    pub number: u64,
    pub demand: i64,
    pub geometry: Geometry<f64>,
}
