use rand::{seq::SliceRandom, Rng};

use crate::table::CanonicalField;

pub const UNKNOWN: &str = "Unknown";

/// Cell spellings that mean "no value".
const MISSING_MARKERS: [&str; 4] = ["nan", "NaN", "null", ""];

/// Reference lists used when a whole column is missing from the input.
pub const FALLBACK_INDUSTRIES: [&str; 3] = ["FinTech", "E-commerce", "HealthTech"];
pub const FALLBACK_CITIES: [&str; 3] = ["Mumbai", "Delhi", "Bangalore"];
pub const FALLBACK_INVESTORS: [&str; 3] = ["Sequoia", "Accel", "Matrix"];

/// Trimmed value, or `Unknown` for blanks and missing markers.
pub fn clean_text(raw: Option<&str>) -> String {
    match raw.map(str::trim) {
        Some(v) if !MISSING_MARKERS.contains(&v) => v.to_string(),
        _ => UNKNOWN.to_string(),
    }
}

/// Value for a text column the input does not have at all.
pub fn backfill_text<R: Rng + ?Sized>(field: CanonicalField, row: usize, rng: &mut R) -> String {
    let pick = |list: &[&str], rng: &mut R| -> String {
        list.choose(rng).copied().unwrap_or(UNKNOWN).to_string()
    };
    match field {
        CanonicalField::StartupName => format!("Startup_{}", row),
        CanonicalField::Industry => pick(&FALLBACK_INDUSTRIES, rng),
        CanonicalField::City => pick(&FALLBACK_CITIES, rng),
        CanonicalField::Investor => pick(&FALLBACK_INVESTORS, rng),
        _ => UNKNOWN.to_string(),
    }
}
