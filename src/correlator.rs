use std::fmt;

use num_complex::Complex64;

use crate::error::{Error, Result};

/// Cross-correlate two channel spectra: `a * conj(b)` at every bin.
pub fn correlate(a: &[Complex64], b: &[Complex64]) -> Result<Vec<Complex64>> {
    if a.len() != b.len() {
        return Err(Error::LengthMismatch {
            expected: a.len(),
            found: b.len(),
        });
    }
    Ok(a.iter().zip(b.iter()).map(|(x, y)| x * y.conj()).collect())
}

/// Average over all bins, `None` for an empty spectrum.
pub fn mean(spectrum: &[Complex64]) -> Option<Complex64> {
    if spectrum.is_empty() {
        return None;
    }
    let sum: Complex64 = spectrum.iter().sum();
    Some(sum / spectrum.len() as f64)
}

/// Correlation spectrum together with its band average.
#[derive(Clone, Debug, PartialEq)]
pub struct Correlation {
    pub spectrum: Vec<Complex64>,
    pub mean: Complex64,
}

impl fmt::Display for Correlation {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "Correlation {{ bins: {}, mean: {:.4e} at {:.2} deg }}",
            self.spectrum.len(),
            self.mean.norm(),
            self.mean.arg().to_degrees()
        )
    }
}

impl Correlation {
    pub fn new(a: &[Complex64], b: &[Complex64]) -> Result<Correlation> {
        let spectrum = correlate(a, b)?;
        let mean = mean(&spectrum).ok_or(Error::EmptyGrid)?;
        Ok(Correlation { spectrum, mean })
    }

    pub fn magnitude(&self) -> Vec<f64> {
        self.spectrum.iter().map(|c| c.norm()).collect()
    }

    pub fn phase_deg(&self) -> Vec<f64> {
        self.spectrum.iter().map(|c| c.arg().to_degrees()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(seed: f64) -> Vec<Complex64> {
        (1..=8)
            .map(|k| Complex64::from_polar(seed * k as f64, 0.3 * k as f64 - seed))
            .collect()
    }

    #[test]
    fn self_correlation_is_power() {
        let x = sample(0.7);
        let corr = correlate(&x, &x).unwrap();
        for (c, v) in corr.iter().zip(x.iter()) {
            assert!((c.re - v.norm_sqr()).abs() < 1e-12);
            assert_eq!(c.im, 0.0);
            assert!(c.re >= 0.0);
        }
    }

    #[test]
    fn swapping_inputs_negates_phase() {
        let x = sample(0.7);
        let y = sample(1.9);
        let xy = correlate(&x, &y).unwrap();
        let yx = correlate(&y, &x).unwrap();
        for (a, b) in xy.iter().zip(yx.iter()) {
            assert_eq!(a.arg(), -b.arg());
        }
    }

    #[test]
    fn lengths_must_match() {
        let result = correlate(&sample(1.0), &sample(1.0)[..4]);
        assert!(matches!(
            result,
            Err(Error::LengthMismatch {
                expected: 8,
                found: 4
            })
        ));
    }

    #[test]
    fn summary_mean_and_phase() {
        let a = vec![Complex64::new(0.0, 1.0); 4];
        let b = vec![Complex64::new(1.0, 0.0); 4];
        let corr = Correlation::new(&a, &b).unwrap();
        assert_eq!(corr.mean, Complex64::new(0.0, 1.0));
        assert_eq!(corr.magnitude(), vec![1.0; 4]);
        for phase in corr.phase_deg() {
            assert!((phase - 90.0).abs() < 1e-12);
        }
    }

    #[test]
    fn empty_spectrum_has_no_mean() {
        assert!(mean(&[]).is_none());
        assert!(matches!(Correlation::new(&[], &[]), Err(Error::EmptyGrid)));
    }
}
