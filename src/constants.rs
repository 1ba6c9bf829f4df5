/// Boltzmann constant in J/K (SI units).
pub const BOLTZMANN: f64 = 1.380649e-23;

/// Speed of light in vacuum, m/s.
pub const SPEED_OF_LIGHT: f64 = 299_792_458.0;

/// Reference impedance the thermal noise generator is normalised to, in ohms.
pub const REFERENCE_IMPEDANCE: f64 = 50.0;

/// Real or imaginary parts of a cascaded wave below this magnitude are set to zero.
pub const SNAP_THRESHOLD: f64 = 1e-15;

/// Default isolation of "off" paths in ideal device models, in dB.
pub const DEFAULT_ISOLATION_DB: f64 = -120.0;
