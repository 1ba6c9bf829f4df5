use std::fmt;

use ndarray::{s, Array2, Array3, ArrayView2, Axis};
use num_complex::Complex64;
use tracing::debug;

use crate::constants::REFERENCE_IMPEDANCE;
use crate::error::{Error, Result};
use crate::frequency::FrequencyGrid;
use crate::interpolation::interpolate_complex;

// determinant magnitude below which a transmission block counts as singular
const SINGULAR_THRESHOLD: f64 = 1e-15;

/// Scattering matrices of one 2-port or 4-port device across a frequency grid.
///
/// `s[[f, i, j]]` is the coefficient from port `j` to port `i` (zero based) at
/// grid point `f`.
#[derive(Clone, Debug, PartialEq)]
pub struct Network {
    frequency: FrequencyGrid,
    s: Array3<Complex64>,
    z0: f64, // ohms, reference impedance
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "Network {{ ports: {}, points: {}, start: {} Hz, stop: {} Hz, z0: {} }}",
            self.nports(),
            self.nfreq(),
            self.frequency.min(),
            self.frequency.max(),
            self.z0
        )
    }
}

impl Network {
    pub fn new(frequency: FrequencyGrid, s: Array3<Complex64>) -> Result<Network> {
        let (nfreq, rows, cols) = s.dim();
        if nfreq != frequency.len() {
            return Err(Error::LengthMismatch {
                expected: frequency.len(),
                found: nfreq,
            });
        }
        if rows != cols || !(rows == 2 || rows == 4) {
            return Err(Error::PortCount {
                expected: if rows <= 2 { 2 } else { 4 },
                found: rows,
            });
        }
        Ok(Network {
            frequency,
            s,
            z0: REFERENCE_IMPEDANCE,
        })
    }

    /// Build a network by evaluating `entry(f_hz, row, col)` at every grid point.
    pub fn from_fn<F>(frequency: &FrequencyGrid, nports: usize, entry: F) -> Result<Network>
    where
        F: Fn(f64, usize, usize) -> Complex64,
    {
        let f = frequency.f();
        let s = Array3::from_shape_fn((f.len(), nports, nports), |(fi, i, j)| entry(f[fi], i, j));
        Network::new(frequency.clone(), s)
    }

    pub fn with_z0(mut self, z0: f64) -> Network {
        self.z0 = z0;
        self
    }

    pub fn frequency(&self) -> &FrequencyGrid {
        &self.frequency
    }

    pub fn s(&self) -> &Array3<Complex64> {
        &self.s
    }

    pub fn z0(&self) -> f64 {
        self.z0
    }

    pub fn nports(&self) -> usize {
        self.s.dim().1
    }

    pub fn nfreq(&self) -> usize {
        self.s.dim().0
    }

    /// One matrix entry across the whole grid, zero-based port indices.
    pub fn entry(&self, row: usize, col: usize) -> Vec<Complex64> {
        self.s.slice(s![.., row, col]).to_vec()
    }

    pub fn s21(&self) -> Vec<Complex64> {
        self.entry(1, 0)
    }

    /// Resample every matrix entry onto `target`.
    pub fn interpolate(&self, target: &FrequencyGrid) -> Result<Network> {
        let n = self.nports();
        let mut s = Array3::<Complex64>::zeros((target.len(), n, n));
        for i in 0..n {
            for j in 0..n {
                let resampled = interpolate_complex(target.f(), self.frequency.f(), &self.entry(i, j))?;
                for (fi, value) in resampled.into_iter().enumerate() {
                    s[[fi, i, j]] = value;
                }
            }
        }
        debug!(
            "interpolated {}-port network from {} to {} points",
            n,
            self.nfreq(),
            target.len()
        );
        Ok(Network::new(target.clone(), s)?.with_z0(self.z0))
    }

    /// Cascade `other` behind `self` through transfer (T) parameters.
    ///
    /// The first half of the ports faces the source and the second half the
    /// load, so port 2 of a 2-port, or ports 3 and 4 of a 4-port, feed port 1,
    /// or ports 1 and 2, of `other`. Both networks must share port count and grid.
    pub fn cascade(&self, other: &Network) -> Result<Network> {
        if other.nports() != self.nports() {
            return Err(Error::PortCount {
                expected: self.nports(),
                found: other.nports(),
            });
        }
        if other.frequency != self.frequency {
            return Err(Error::GridMismatch);
        }

        let n = self.nports();
        let mut s = Array3::<Complex64>::zeros((self.nfreq(), n, n));
        for (fi, &f) in self.frequency.f().iter().enumerate() {
            let t = s_to_t(self.s.index_axis(Axis(0), fi), f)?
                .dot(&s_to_t(other.s.index_axis(Axis(0), fi), f)?);
            s.index_axis_mut(Axis(0), fi).assign(&t_to_s(t.view(), f)?);
        }
        debug!("cascaded two {}-port networks over {} points", n, self.nfreq());
        Ok(Network::new(self.frequency.clone(), s)?.with_z0(self.z0))
    }

    /// Keep only the grid points inside `[lo_hz, hi_hz]`, both ends included.
    pub fn trim(&self, lo_hz: f64, hi_hz: f64) -> Result<Network> {
        let f = self.frequency.f();
        let kept: Vec<usize> = (0..f.len())
            .filter(|&i| f[i] >= lo_hz && f[i] <= hi_hz)
            .collect();
        let frequency = FrequencyGrid::new(kept.iter().map(|&i| f[i]).collect())?;
        let s = self.s.select(Axis(0), &kept);
        Ok(Network::new(frequency, s)?.with_z0(self.z0))
    }
}

// (11, 12, 21, 22) blocks of a square matrix split at half its size
fn blocks(
    m: ArrayView2<Complex64>,
) -> (
    Array2<Complex64>,
    Array2<Complex64>,
    Array2<Complex64>,
    Array2<Complex64>,
) {
    let h = m.nrows() / 2;
    (
        m.slice(s![..h, ..h]).to_owned(),
        m.slice(s![..h, h..]).to_owned(),
        m.slice(s![h.., ..h]).to_owned(),
        m.slice(s![h.., h..]).to_owned(),
    )
}

fn assemble(
    b11: &Array2<Complex64>,
    b12: &Array2<Complex64>,
    b21: &Array2<Complex64>,
    b22: &Array2<Complex64>,
) -> Array2<Complex64> {
    let h = b11.nrows();
    let mut m = Array2::<Complex64>::zeros((2 * h, 2 * h));
    m.slice_mut(s![..h, ..h]).assign(b11);
    m.slice_mut(s![..h, h..]).assign(b12);
    m.slice_mut(s![h.., ..h]).assign(b21);
    m.slice_mut(s![h.., h..]).assign(b22);
    m
}

// Closed-form inverse of a 1x1 or 2x2 block.
fn invert(m: &Array2<Complex64>, f: f64) -> Result<Array2<Complex64>> {
    let det = if m.nrows() == 1 {
        m[[0, 0]]
    } else {
        m[[0, 0]] * m[[1, 1]] - m[[0, 1]] * m[[1, 0]]
    };
    if det.norm() < SINGULAR_THRESHOLD {
        return Err(Error::SingularTransfer(f));
    }
    if m.nrows() == 1 {
        return Ok(Array2::from_elem((1, 1), det.inv()));
    }
    let mut inverse = Array2::<Complex64>::zeros((2, 2));
    inverse[[0, 0]] = m[[1, 1]] / det;
    inverse[[0, 1]] = -m[[0, 1]] / det;
    inverse[[1, 0]] = -m[[1, 0]] / det;
    inverse[[1, 1]] = m[[0, 0]] / det;
    Ok(inverse)
}

fn s_to_t(s: ArrayView2<Complex64>, f: f64) -> Result<Array2<Complex64>> {
    let (s11, s12, s21, s22) = blocks(s);
    let s21_inv = invert(&s21, f)?;
    let t11 = &s12 - &s11.dot(&s21_inv).dot(&s22);
    let t12 = s11.dot(&s21_inv);
    let t21 = s21_inv.dot(&s22).mapv(|v| -v);
    Ok(assemble(&t11, &t12, &t21, &s21_inv))
}

fn t_to_s(t: ArrayView2<Complex64>, f: f64) -> Result<Array2<Complex64>> {
    let (t11, t12, t21, t22) = blocks(t);
    let t22_inv = invert(&t22, f)?;
    let s11 = t12.dot(&t22_inv);
    let s12 = &t11 - &s11.dot(&t21);
    let s22 = t22_inv.dot(&t21).mapv(|v| -v);
    Ok(assemble(&s11, &s12, &t22_inv, &s22))
}

/// Align several networks onto one grid.
pub fn interpolate_networks(networks: &[Network], target: &FrequencyGrid) -> Result<Vec<Network>> {
    networks.iter().map(|n| n.interpolate(target)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conversions::db_to_voltage_ratio;

    fn ramp(grid: &FrequencyGrid) -> Network {
        Network::from_fn(grid, 2, |f, i, j| {
            Complex64::new(f / 1.0e9 + i as f64, j as f64 - f / 1.0e9)
        })
        .unwrap()
    }

    #[test]
    fn from_fn_indexes_row_then_column() {
        let grid = FrequencyGrid::new(vec![1.0e9, 2.0e9]).unwrap();
        let network = Network::from_fn(&grid, 4, |_, i, j| Complex64::new((10 * i + j) as f64, 0.0))
            .unwrap();
        assert_eq!(network.nports(), 4);
        assert_eq!(network.nfreq(), 2);
        assert_eq!(network.entry(2, 3), vec![Complex64::new(23.0, 0.0); 2]);
        assert_eq!(network.s21()[1], Complex64::new(10.0, 0.0));
    }

    #[test]
    fn three_port_is_rejected() {
        let grid = FrequencyGrid::new(vec![1.0e9]).unwrap();
        let result = Network::new(grid, Array3::zeros((1, 3, 3)));
        assert!(matches!(result, Err(Error::PortCount { found: 3, .. })));
    }

    #[test]
    fn matrix_count_must_match_grid() {
        let grid = FrequencyGrid::new(vec![1.0e9, 2.0e9]).unwrap();
        let result = Network::new(grid, Array3::zeros((3, 2, 2)));
        assert!(matches!(
            result,
            Err(Error::LengthMismatch {
                expected: 2,
                found: 3
            })
        ));
    }

    fn matched(grid: &FrequencyGrid, loss_db: f64) -> Network {
        let transmission = Complex64::new(db_to_voltage_ratio(-loss_db), 0.0);
        Network::from_fn(grid, 2, |_, i, j| {
            if i == j {
                Complex64::new(0.0, 0.0)
            } else {
                transmission
            }
        })
        .unwrap()
    }

    // 4-port joining port k to port `pairs[k]`
    fn wired(grid: &FrequencyGrid, pairs: [usize; 4]) -> Network {
        Network::from_fn(grid, 4, |_, i, j| {
            if pairs[j] == i {
                Complex64::new(1.0, 0.0)
            } else {
                Complex64::new(0.0, 0.0)
            }
        })
        .unwrap()
    }

    #[test]
    fn cascade_with_through_is_a_no_op() {
        let grid = FrequencyGrid::linspace(1.0e9, 3.0e9, 5).unwrap();
        let network = ramp(&grid);
        let through = matched(&grid, 0.0);
        for result in [network.cascade(&through).unwrap(), through.cascade(&network).unwrap()] {
            for (a, b) in result.s().iter().zip(network.s().iter()) {
                assert!((a - b).norm() < 1e-12, "expected {}, got {}", b, a);
            }
        }
    }

    #[test]
    fn cascaded_attenuators_add_in_db() {
        let grid = FrequencyGrid::linspace(1.0e9, 2.0e9, 3).unwrap();
        let result = matched(&grid, 3.0).cascade(&matched(&grid, 7.0)).unwrap();
        let expected = db_to_voltage_ratio(-10.0);
        for k in 0..3 {
            assert!((result.s()[[k, 1, 0]].norm() - expected).abs() < 1e-12);
            assert!((result.s()[[k, 0, 1]].norm() - expected).abs() < 1e-12);
            assert!(result.s()[[k, 0, 0]].norm() < 1e-12);
            assert!(result.s()[[k, 1, 1]].norm() < 1e-12);
        }
    }

    #[test]
    fn two_crossovers_make_a_through() {
        let grid = FrequencyGrid::linspace(1.0e9, 2.0e9, 2).unwrap();
        let crossover = wired(&grid, [3, 2, 1, 0]);
        let result = crossover.cascade(&crossover).unwrap();
        let through = wired(&grid, [2, 3, 0, 1]);
        for (a, b) in result.s().iter().zip(through.s().iter()) {
            assert!((a - b).norm() < 1e-12);
        }
    }

    #[test]
    fn cascade_checks_ports_and_grid() {
        let grid = FrequencyGrid::linspace(1.0e9, 2.0e9, 2).unwrap();
        let other_grid = FrequencyGrid::linspace(1.0e9, 3.0e9, 2).unwrap();
        let result = matched(&grid, 1.0).cascade(&wired(&grid, [2, 3, 0, 1]));
        assert!(matches!(
            result,
            Err(Error::PortCount {
                expected: 2,
                found: 4
            })
        ));
        let result = matched(&grid, 1.0).cascade(&matched(&other_grid, 1.0));
        assert!(matches!(result, Err(Error::GridMismatch)));
    }

    #[test]
    fn open_network_cannot_be_cascaded() {
        let grid = FrequencyGrid::linspace(1.0e9, 2.0e9, 2).unwrap();
        let open = Network::from_fn(&grid, 2, |_, _, _| Complex64::new(0.0, 0.0)).unwrap();
        let result = open.cascade(&matched(&grid, 1.0));
        assert!(matches!(result, Err(Error::SingularTransfer(f)) if f == 1.0e9));
    }

    #[test]
    fn trim_keeps_both_ends() {
        let grid = FrequencyGrid::linspace(1.0e9, 5.0e9, 5).unwrap();
        let network = ramp(&grid).with_z0(75.0);
        let trimmed = network.trim(2.0e9, 4.0e9).unwrap();
        assert_eq!(trimmed.frequency().f(), &[2.0e9, 3.0e9, 4.0e9]);
        assert_eq!(trimmed.entry(1, 0), network.entry(1, 0)[1..4].to_vec());
        assert_eq!(trimmed.z0(), 75.0);
    }

    #[test]
    fn trim_outside_grid_is_empty() {
        let grid = FrequencyGrid::linspace(1.0e9, 5.0e9, 5).unwrap();
        let result = ramp(&grid).trim(2.5e9, 2.7e9);
        assert!(matches!(result, Err(Error::EmptyGrid)));
    }

    #[test]
    fn interpolate_onto_same_grid_is_identity() {
        let grid = FrequencyGrid::linspace(1.0e9, 2.0e9, 7).unwrap();
        let network = ramp(&grid);
        assert_eq!(network.interpolate(&grid).unwrap(), network);
    }

    #[test]
    fn interpolate_keeps_entry_ordering() {
        let coarse = FrequencyGrid::linspace(1.0e9, 3.0e9, 3).unwrap();
        let fine = FrequencyGrid::linspace(1.0e9, 3.0e9, 5).unwrap();
        let network = ramp(&coarse).interpolate(&fine).unwrap();
        assert_eq!(network.nfreq(), 5);
        // the ramp is linear in frequency, so resampling reproduces it
        assert_eq!(network.entry(1, 0)[1], Complex64::new(2.5, -1.5));
        assert_eq!(network.entry(0, 1)[3], Complex64::new(2.5, -1.5));
    }
}
