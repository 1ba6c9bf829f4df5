// conversions between the magnitude encodings found in datasheets and network files

/// Linear magnitude of a voltage ratio given in dB, `10^(db / 20)`.
pub fn db_to_voltage_ratio(db: f64) -> f64 {
    rfconversions::power::db_to_linear(db).sqrt()
}

/// Reflection-coefficient magnitude `|(vswr - 1) / (vswr + 1)|`.
pub fn vswr_to_reflection(vswr: f64) -> f64 {
    ((vswr - 1.0) / (vswr + 1.0)).abs()
}
