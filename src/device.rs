//! Idealised and measured device models.
//!
//! Every model turns a frequency grid into a [`Network`] of shape (F, N, N).
//! Parameters are not checked for physical sense: a negative delay-line length
//! or a passive attenuator with gain are evaluated as given.

use std::f64::consts::{FRAC_1_SQRT_2, PI};

use num_complex::Complex64;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::constants::{DEFAULT_ISOLATION_DB, SPEED_OF_LIGHT};
use crate::conversions::db_to_voltage_ratio as voltage_ratio;
use crate::error::Result;
use crate::frequency::FrequencyGrid;
use crate::network::Network;

/// Anything that can produce S-parameters on a frequency grid.
pub trait SParameterModel {
    fn nports(&self) -> usize;

    fn s_parameters(&self, frequency: &FrequencyGrid) -> Result<Network>;
}

/// Path configuration of the ideal transfer switch.
///
/// States are named after the port wiring, not after a control line:
/// `Through` joins ports 1 and 3, `Crossed` joins ports 1 and 2. A measured
/// switch table labels its states however the vendor does, so a datasheet
/// "on" state may correspond to either variant here.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SwitchState {
    /// 1 <-> 3 and 2 <-> 4
    Through,
    /// 1 <-> 2 and 3 <-> 4
    Crossed,
}

#[derive(Clone, Debug, PartialEq)]
pub enum DeviceModel {
    Switch {
        state: SwitchState,
        isolation_db: f64,
    },
    Coupler,
    /// Rat-race coupler with the S21 and S31 paths detuned.
    PerturbedCoupler {
        s21_amplitude_db: f64,
        s21_phase_deg: f64,
        s31_amplitude_db: f64,
        s31_phase_deg: f64,
    },
    Amplifier {
        gain: f64, // linear voltage gain
        isolation_db: f64,
    },
    Attenuator {
        loss_db: f64,
        isolation_db: f64,
    },
    DelayLine {
        length_m: f64,
        isolation_db: f64,
    },
    FileLoaded(Network),
}

fn polar_deg(magnitude: f64, phase_deg: f64) -> Complex64 {
    Complex64::from_polar(magnitude, phase_deg.to_radians())
}

// rows are output ports, columns input ports; ports on one side of the hybrid
// never couple to each other
const RAT_RACE_PHASE_DEG: [[Option<f64>; 4]; 4] = [
    [None, Some(-90.0), Some(-90.0), None],
    [Some(-90.0), None, None, Some(90.0)],
    [Some(-90.0), None, None, Some(-90.0)],
    [None, Some(90.0), Some(-90.0), None],
];

fn rat_race(i: usize, j: usize) -> Complex64 {
    match RAT_RACE_PHASE_DEG[i][j] {
        Some(phase) => polar_deg(FRAC_1_SQRT_2, phase),
        None => Complex64::new(0.0, 0.0),
    }
}

fn two_port(transmission: Complex64, i: usize, j: usize, isolation: f64) -> Complex64 {
    if i == j {
        Complex64::new(isolation, 0.0)
    } else {
        transmission
    }
}

impl DeviceModel {
    pub fn switch(state: SwitchState) -> DeviceModel {
        DeviceModel::Switch {
            state,
            isolation_db: DEFAULT_ISOLATION_DB,
        }
    }

    pub fn amplifier(gain: f64) -> DeviceModel {
        DeviceModel::Amplifier {
            gain,
            isolation_db: DEFAULT_ISOLATION_DB,
        }
    }

    /// Amplifier from a power gain in dB.
    pub fn amplifier_db(gain_db: f64) -> DeviceModel {
        DeviceModel::amplifier(voltage_ratio(gain_db))
    }

    pub fn attenuator(loss_db: f64) -> DeviceModel {
        DeviceModel::Attenuator {
            loss_db,
            isolation_db: DEFAULT_ISOLATION_DB,
        }
    }

    pub fn delay_line(length_m: f64) -> DeviceModel {
        DeviceModel::DelayLine {
            length_m,
            isolation_db: DEFAULT_ISOLATION_DB,
        }
    }

    /// Replace the placeholder magnitude used for isolated and reflected paths.
    pub fn with_isolation_db(self, db: f64) -> DeviceModel {
        match self {
            DeviceModel::Switch { state, .. } => DeviceModel::Switch {
                state,
                isolation_db: db,
            },
            DeviceModel::Amplifier { gain, .. } => DeviceModel::Amplifier {
                gain,
                isolation_db: db,
            },
            DeviceModel::Attenuator { loss_db, .. } => DeviceModel::Attenuator {
                loss_db,
                isolation_db: db,
            },
            DeviceModel::DelayLine { length_m, .. } => DeviceModel::DelayLine {
                length_m,
                isolation_db: db,
            },
            other => other,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            DeviceModel::Switch { .. } => "switch",
            DeviceModel::Coupler => "coupler",
            DeviceModel::PerturbedCoupler { .. } => "perturbed coupler",
            DeviceModel::Amplifier { .. } => "amplifier",
            DeviceModel::Attenuator { .. } => "attenuator",
            DeviceModel::DelayLine { .. } => "delay line",
            DeviceModel::FileLoaded(_) => "file",
        }
    }

    fn warn_if_non_physical(&self) {
        match self {
            DeviceModel::DelayLine { length_m, .. } if *length_m < 0.0 => {
                warn!("delay line length {} m is negative", length_m)
            }
            DeviceModel::Attenuator { loss_db, .. } if *loss_db < 0.0 => {
                warn!("attenuator loss {} dB is negative, the model has gain", loss_db)
            }
            DeviceModel::Amplifier { gain, .. } if *gain < 0.0 => {
                warn!("amplifier gain {} is negative", gain)
            }
            _ => {}
        }
    }
}

impl SParameterModel for DeviceModel {
    fn nports(&self) -> usize {
        match self {
            DeviceModel::Switch { .. }
            | DeviceModel::Coupler
            | DeviceModel::PerturbedCoupler { .. } => 4,
            DeviceModel::Amplifier { .. }
            | DeviceModel::Attenuator { .. }
            | DeviceModel::DelayLine { .. } => 2,
            DeviceModel::FileLoaded(network) => network.nports(),
        }
    }

    fn s_parameters(&self, frequency: &FrequencyGrid) -> Result<Network> {
        self.warn_if_non_physical();
        debug!("building {} model on {}", self.name(), frequency);
        let n = self.nports();
        match self {
            DeviceModel::Switch {
                state,
                isolation_db,
            } => {
                let off = Complex64::new(voltage_ratio(*isolation_db), 0.0);
                let on = Complex64::new(1.0, 0.0);
                Network::from_fn(frequency, n, |_, i, j| {
                    let connected = match state {
                        SwitchState::Through => i.abs_diff(j) == 2,
                        SwitchState::Crossed => i / 2 == j / 2 && i != j,
                    };
                    if connected {
                        on
                    } else {
                        off
                    }
                })
            }
            DeviceModel::Coupler => Network::from_fn(frequency, n, |_, i, j| rat_race(i, j)),
            DeviceModel::PerturbedCoupler {
                s21_amplitude_db,
                s21_phase_deg,
                s31_amplitude_db,
                s31_phase_deg,
            } => Network::from_fn(frequency, n, |_, i, j| match (i, j) {
                (1, 0) => polar_deg(
                    FRAC_1_SQRT_2 + voltage_ratio(*s21_amplitude_db),
                    -90.0 + s21_phase_deg,
                ),
                (2, 0) => polar_deg(
                    FRAC_1_SQRT_2 + voltage_ratio(*s31_amplitude_db),
                    -90.0 + s31_phase_deg,
                ),
                _ => rat_race(i, j),
            }),
            DeviceModel::Amplifier { gain, isolation_db } => {
                let isolation = voltage_ratio(*isolation_db);
                let transmission = Complex64::new(*gain, 0.0);
                Network::from_fn(frequency, n, |_, i, j| {
                    two_port(transmission, i, j, isolation)
                })
            }
            DeviceModel::Attenuator {
                loss_db,
                isolation_db,
            } => {
                let isolation = voltage_ratio(*isolation_db);
                let transmission = Complex64::new(voltage_ratio(-loss_db), 0.0);
                Network::from_fn(frequency, n, |_, i, j| {
                    two_port(transmission, i, j, isolation)
                })
            }
            DeviceModel::DelayLine {
                length_m,
                isolation_db,
            } => {
                let isolation = voltage_ratio(*isolation_db);
                Network::from_fn(frequency, n, |f, i, j| {
                    let theta = 2.0 * PI * f * length_m / SPEED_OF_LIGHT;
                    two_port(Complex64::from_polar(1.0, theta), i, j, isolation)
                })
            }
            DeviceModel::FileLoaded(network) => {
                if network.frequency() == frequency {
                    Ok(network.clone())
                } else {
                    network.interpolate(frequency)
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid() -> FrequencyGrid {
        FrequencyGrid::linspace(1.0e9, 5.0e9, 9).unwrap()
    }

    fn assert_approx(actual: f64, expected: f64, tol: f64, msg: &str) {
        assert!(
            (actual - expected).abs() < tol,
            "{msg}: expected {expected:e}, got {actual:e}"
        );
    }

    #[test]
    fn coupler_has_equal_split_and_no_reflection() {
        let network = DeviceModel::Coupler.s_parameters(&grid()).unwrap();
        let coupled = [(0, 1), (0, 2), (1, 0), (1, 3), (2, 0), (2, 3), (3, 1), (3, 2)];
        for fi in 0..network.nfreq() {
            for &(i, j) in coupled.iter() {
                assert_approx(network.s()[[fi, i, j]].norm(), FRAC_1_SQRT_2, 1e-12, "coupled");
            }
            for i in 0..4 {
                assert_eq!(network.s()[[fi, i, i]].norm(), 0.0);
            }
        }
    }

    #[test]
    fn coupler_phase_pattern() {
        let network = DeviceModel::Coupler.s_parameters(&grid()).unwrap();
        assert_approx(network.s()[[0, 1, 0]].arg().to_degrees(), -90.0, 1e-9, "S21");
        assert_approx(network.s()[[0, 1, 3]].arg().to_degrees(), 90.0, 1e-9, "S24");
        assert_approx(network.s()[[0, 3, 1]].arg().to_degrees(), 90.0, 1e-9, "S42");
        assert_approx(network.s()[[0, 2, 3]].arg().to_degrees(), -90.0, 1e-9, "S34");
    }

    #[test]
    fn switch_through_connects_one_to_three() {
        let network = DeviceModel::switch(SwitchState::Through)
            .s_parameters(&grid())
            .unwrap();
        let s = network.s();
        assert_eq!(s[[0, 2, 0]], Complex64::new(1.0, 0.0));
        assert_eq!(s[[0, 0, 2]], Complex64::new(1.0, 0.0));
        assert_eq!(s[[0, 3, 1]], Complex64::new(1.0, 0.0));
        assert_approx(s[[0, 1, 0]].norm(), 1e-6, 1e-12, "isolated S21");
        assert_approx(s[[0, 0, 0]].norm(), 1e-6, 1e-12, "S11");
    }

    #[test]
    fn switch_crossed_connects_one_to_two() {
        let network = DeviceModel::switch(SwitchState::Crossed)
            .s_parameters(&grid())
            .unwrap();
        let s = network.s();
        assert_eq!(s[[3, 1, 0]], Complex64::new(1.0, 0.0));
        assert_eq!(s[[3, 2, 3]], Complex64::new(1.0, 0.0));
        assert_approx(s[[3, 2, 0]].norm(), 1e-6, 1e-12, "isolated S31");
    }

    #[test]
    fn switch_states_use_disjoint_port_pairs() {
        let through = DeviceModel::switch(SwitchState::Through)
            .s_parameters(&grid())
            .unwrap();
        let crossed = DeviceModel::switch(SwitchState::Crossed)
            .s_parameters(&grid())
            .unwrap();
        let on = Complex64::new(1.0, 0.0);
        for i in 0..4 {
            let through_row: Vec<usize> = (0..4).filter(|&j| through.s()[[0, i, j]] == on).collect();
            let crossed_row: Vec<usize> = (0..4).filter(|&j| crossed.s()[[0, i, j]] == on).collect();
            assert_eq!(through_row.len(), 1);
            assert_eq!(crossed_row.len(), 1);
            assert_ne!(through_row, crossed_row);
            assert_eq!(through.s()[[0, through_row[0], i]], on, "reciprocal");
        }
    }

    #[test]
    fn isolation_placeholder_is_configurable() {
        let network = DeviceModel::amplifier(2.0)
            .with_isolation_db(-60.0)
            .s_parameters(&grid())
            .unwrap();
        assert_approx(network.s()[[0, 0, 0]].norm(), 1e-3, 1e-12, "S11");
        assert_eq!(network.s21()[0], Complex64::new(2.0, 0.0));
    }

    #[test]
    fn amplifier_db_is_power_gain() {
        let network = DeviceModel::amplifier_db(20.0).s_parameters(&grid()).unwrap();
        assert_approx(network.s21()[4].re, 10.0, 1e-9, "20 dB gain");
        assert_approx(network.entry(0, 1)[4].re, 10.0, 1e-9, "S12");
    }

    #[test]
    fn attenuator_reduces_transmission() {
        let network = DeviceModel::attenuator(6.0).s_parameters(&grid()).unwrap();
        assert_approx(network.s21()[0].norm(), 0.501187, 1e-6, "6 dB pad");
    }

    #[test]
    fn delay_line_phase_follows_frequency() {
        let length = 0.1;
        let network = DeviceModel::delay_line(length).s_parameters(&grid()).unwrap();
        for (fi, &f) in network.frequency().f().iter().enumerate() {
            let expected = Complex64::from_polar(1.0, 2.0 * PI * f * length / SPEED_OF_LIGHT);
            let actual = network.s21()[fi];
            assert_approx((actual - expected).norm(), 0.0, 1e-12, "S21");
            assert_approx(actual.norm(), 1.0, 1e-12, "unity magnitude");
        }
    }

    #[test]
    fn negative_length_is_evaluated_as_given() {
        let network = DeviceModel::delay_line(-0.1).s_parameters(&grid()).unwrap();
        assert_approx(network.s21()[0].norm(), 1.0, 1e-12, "unity magnitude");
    }

    #[test]
    fn perturbed_coupler_only_detunes_two_paths() {
        let network = DeviceModel::PerturbedCoupler {
            s21_amplitude_db: -40.0,
            s21_phase_deg: 5.0,
            s31_amplitude_db: -40.0,
            s31_phase_deg: 0.0,
        }
        .s_parameters(&grid())
        .unwrap();
        assert_approx(network.s()[[0, 1, 0]].norm(), FRAC_1_SQRT_2 + 0.01, 1e-9, "S21");
        assert_approx(network.s()[[0, 1, 0]].arg().to_degrees(), -85.0, 1e-9, "S21 phase");
        assert_approx(network.s()[[0, 0, 1]].norm(), FRAC_1_SQRT_2, 1e-12, "S12");
    }

    #[test]
    fn file_loaded_resamples_to_requested_grid() {
        let coarse = FrequencyGrid::linspace(1.0e9, 5.0e9, 3).unwrap();
        let network = DeviceModel::amplifier(3.0).s_parameters(&coarse).unwrap();
        let loaded = DeviceModel::FileLoaded(network);
        assert_eq!(loaded.nports(), 2);
        let resampled = loaded.s_parameters(&grid()).unwrap();
        assert_eq!(resampled.nfreq(), 9);
        assert_eq!(resampled.s21()[5], Complex64::new(3.0, 0.0));
    }
}
