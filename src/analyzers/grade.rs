/// Converts a fuel level (percent) into the gauge band.
///
/// | Range   | Band     |
/// |---------|----------|
/// | < 15    | critical |
/// | < 25    | low      |
/// | < 50    | moderate |
/// | >= 50   | healthy  |
/// | missing | unknown  |
pub fn fuel_band(pct: Option<f64>) -> String {
    match pct {
        None => "unknown".into(),
        Some(p) if p < 15.0 => "critical".into(),
        Some(p) if p < LOW_FUEL_PCT => "low".into(),
        Some(p) if p < 50.0 => "moderate".into(),
        Some(_) => "healthy".into(),
    }
}

/// Sites below this fuel level count as low-fuel in KPI snapshots.
pub const LOW_FUEL_PCT: f64 = 25.0;
