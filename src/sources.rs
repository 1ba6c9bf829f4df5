use std::f64::consts::PI;
use std::fs;
use std::path::Path;

use num_complex::Complex64;
use rand::Rng;
use tracing::{debug, info, warn};

use crate::constants::{BOLTZMANN, REFERENCE_IMPEDANCE};
use crate::error::{Error, Result};
use crate::frequency::FrequencyGrid;
use crate::interpolation::interpolate;

/// Voltage spectral density of a matched load at `temperature_k`, V/sqrt(bin).
pub fn thermal_noise_voltage(temperature_k: f64, resolution_hz: f64) -> f64 {
    (REFERENCE_IMPEDANCE * BOLTZMANN * temperature_k * resolution_hz).sqrt()
}

/// Flat, zero-phase thermal noise wave vector of `length` bins.
pub fn thermal_noise(temperature_k: f64, resolution_hz: f64, length: usize) -> Result<Vec<Complex64>> {
    if length == 0 {
        return Err(Error::EmptyGrid);
    }
    let v = thermal_noise_voltage(temperature_k, resolution_hz);
    debug!(
        "thermal noise {} V for {} K at {:.0} Hz resolution",
        v, temperature_k, resolution_hz
    );
    Ok(vec![Complex64::new(v, 0.0); length])
}

/// [`thermal_noise`] with the bin resolution of `grid`.
pub fn thermal_noise_on_grid(temperature_k: f64, grid: &FrequencyGrid) -> Result<Vec<Complex64>> {
    thermal_noise(temperature_k, grid.resolution(), grid.len())
}

/// One random realisation of thermal noise: the same RMS magnitude as
/// [`thermal_noise`], with an independent uniformly distributed phase per bin.
pub fn thermal_noise_realization<R: Rng + ?Sized>(
    temperature_k: f64,
    resolution_hz: f64,
    length: usize,
    rng: &mut R,
) -> Result<Vec<Complex64>> {
    if length == 0 {
        return Err(Error::EmptyGrid);
    }
    let v = thermal_noise_voltage(temperature_k, resolution_hz);
    Ok((0..length)
        .map(|_| Complex64::from_polar(v, rng.gen_range(-PI..PI)))
        .collect())
}

/// Antenna voltage spectrum on a uniform grid.
#[derive(Clone, Debug, PartialEq)]
pub struct AntennaSpectrum {
    pub grid: FrequencyGrid,
    pub voltage: Vec<Complex64>,
}

/// Read a residue table: frequency in GHz in the first column, linear power
/// residue in the last. Frequencies are returned in Hz.
pub fn parse_residues(text: &str) -> Result<(Vec<f64>, Vec<f64>)> {
    let mut frequencies = Vec::new();
    let mut residues = Vec::new();
    for (index, raw) in text.lines().enumerate() {
        let tokens: Vec<&str> = raw.split_whitespace().collect();
        if tokens.is_empty() {
            continue;
        }
        if tokens.len() < 2 {
            return Err(Error::Format {
                line: index + 1,
                message: "expected a frequency and a residue".to_string(),
            });
        }
        let number = |token: &str| {
            token.parse::<f64>().map_err(|_| Error::Format {
                line: index + 1,
                message: format!("invalid number {:?}", token),
            })
        };
        frequencies.push(number(tokens[0])? * 1e9);
        residues.push(number(tokens[tokens.len() - 1])?);
    }
    Ok((frequencies, residues))
}

/// Resample a residue table onto a uniform grid spanning the file, with the
/// same number of points, and convert it to `V = sqrt(k R residue)`.
///
/// Negative residues give NaN voltages; they are reported but not rejected.
pub fn residues_to_voltage(text: &str, impedance_ohms: f64) -> Result<AntennaSpectrum> {
    let (frequencies, residues) = parse_residues(text)?;
    let (min, max) = frequencies
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &f| (lo.min(f), hi.max(f)));
    let grid = FrequencyGrid::linspace(min, max, frequencies.len())?;
    let resampled = interpolate(grid.f(), &frequencies, &residues)?;

    let negative = resampled.iter().filter(|&&r| r < 0.0).count();
    if negative > 0 {
        warn!("{} negative residues, their voltages are NaN", negative);
    }

    let voltage = resampled
        .iter()
        .map(|&r| Complex64::new((BOLTZMANN * impedance_ohms * r).sqrt(), 0.0))
        .collect();
    info!("antenna spectrum on {}", grid);
    Ok(AntennaSpectrum { grid, voltage })
}

pub fn read_residues<P: AsRef<Path>>(path: P, impedance_ohms: f64) -> Result<AntennaSpectrum> {
    residues_to_voltage(&fs::read_to_string(path)?, impedance_ohms)
}
