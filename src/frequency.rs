use std::fmt;

use crate::error::{Error, Result};

/// Strictly increasing list of frequencies in Hz shared by every quantity of a run.
#[derive(Clone, Debug, PartialEq)]
pub struct FrequencyGrid {
    f: Vec<f64>,
}

impl fmt::Display for FrequencyGrid {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "FrequencyGrid {{ start: {} Hz, stop: {} Hz, points: {} }}",
            self.min(),
            self.max(),
            self.len()
        )
    }
}

impl FrequencyGrid {
    pub fn new(f: Vec<f64>) -> Result<FrequencyGrid> {
        if f.is_empty() {
            return Err(Error::EmptyGrid);
        }
        if let Some(i) = f.iter().position(|v| !v.is_finite()) {
            return Err(Error::NonFiniteGrid(i));
        }
        if let Some(i) = f.windows(2).position(|w| !(w[1] > w[0])) {
            return Err(Error::NonIncreasingGrid(i + 1));
        }
        Ok(FrequencyGrid { f })
    }

    /// `points` evenly spaced frequencies from `start` to `stop`, both included.
    ///
    /// A single point grid holds only `start`.
    pub fn linspace(start: f64, stop: f64, points: usize) -> Result<FrequencyGrid> {
        let f = match points {
            0 => return Err(Error::EmptyGrid),
            1 => vec![start],
            n => {
                let step = (stop - start) / (n - 1) as f64;
                (0..n)
                    .map(|i| if i == n - 1 { stop } else { start + step * i as f64 })
                    .collect()
            }
        };
        FrequencyGrid::new(f)
    }

    pub fn f(&self) -> &[f64] {
        &self.f
    }

    pub fn len(&self) -> usize {
        self.f.len()
    }

    pub fn is_empty(&self) -> bool {
        self.f.is_empty()
    }

    pub fn min(&self) -> f64 {
        self.f[0]
    }

    pub fn max(&self) -> f64 {
        self.f[self.f.len() - 1]
    }

    /// Bin resolution in Hz, `(max - min) / len`.
    pub fn resolution(&self) -> f64 {
        (self.max() - self.min()) / self.len() as f64
    }
}
