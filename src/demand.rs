use crate::error::PipelineError;
use crate::types::{MergedArea, ScoredArea};

/// Assumed electric-vehicle adoption fraction per resident.
pub const EV_RATE: f64 = 0.01;
/// Target number of electric vehicles served per charging station.
pub const EVPCS: f64 = 10.0;

/// Human-readable form of the scoring formula, shown next to the demand
/// layer.
pub const DEMAND_FORMULA: &str = "Demand = (EV_RATE * Einwohner / EVPCS) - Number";

/// Charging-station demand for one postal code:
/// `round(EV_RATE * einwohner / EVPCS - number)`.
///
/// Both inputs must be non-negative; a negative value is a validation
/// error. Halfway cases round to even. The result may be negative when
/// the area already has more stations than the formula's target.
pub fn demand(einwohner: i64, number: i64) -> Result<i64, PipelineError> {
    if einwohner < 0 || number < 0 {
        return Err(PipelineError::Validation(
            "the number of residents and the number of charging stations must be non-negative"
                .to_string(),
        ));
    }
    let raw = EV_RATE * einwohner as f64 / EVPCS - number as f64;
    Ok(raw.round_ties_even() as i64)
}

/// Applies `demand` element-wise over the merged table. A validation
/// failure on any row aborts the whole computation; callers never see a
/// partially scored table.
pub fn score(merged: Vec<MergedArea>) -> Result<Vec<ScoredArea>, PipelineError> {
    merged
        .into_iter()
        .map(|area| {
            let demand = demand(area.einwohner as i64, area.number as i64)?;
            Ok(ScoredArea {
                plz: area.plz,
                einwohner: area.einwohner,
                number: area.number,
                demand,
                geometry: area.geometry,
            })
        })
        .collect()
}
