use chrono::{DateTime, Utc};
use rand::Rng;
use rand_distr::{Distribution, Normal};

use crate::models::{ClinicalState, Measurement, VitalPanel, VitalParameter};

/// Builds a full panel for a patient in `state`.
///
/// Each value is drawn from a normal distribution centred on the midpoint of
/// the parameter's configured range with a standard deviation of a quarter of
/// the range width. Counted parameters are rounded to whole numbers, the rest
/// to one decimal place.
pub fn generate<R: Rng + ?Sized>(
    state: ClinicalState,
    rng: &mut R,
    timestamp: DateTime<Utc>,
) -> VitalPanel {
    let measurements = VitalParameter::ALL
        .iter()
        .map(|&parameter| Measurement {
            parameter,
            code: parameter.code(),
            unit: parameter.unit(),
            value: sample(parameter, state, rng),
            timestamp,
        })
        .collect();

    VitalPanel { state, measurements }
}

fn sample<R: Rng + ?Sized>(parameter: VitalParameter, state: ClinicalState, rng: &mut R) -> f64 {
    let (mean, std_dev) = distribution_params(parameter, state);
    let raw = match Normal::new(mean, std_dev) {
        Ok(normal) => normal.sample(rng),
        Err(_) => mean,
    };

    if parameter.is_integer() {
        raw.round()
    } else {
        (raw * 10.0).round() / 10.0
    }
}

/// Mean and standard deviation used for `parameter` under `state`.
pub fn distribution_params(parameter: VitalParameter, state: ClinicalState) -> (f64, f64) {
    let (min, max) = parameter.range(state);
    ((min + max) / 2.0, (max - min) / 4.0)
}
