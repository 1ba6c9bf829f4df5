//! Hand-copied datasheet tables.
//!
//! Each row is one frequency in MHz followed by whatever columns the part's
//! datasheet prints. A [`DatasheetMap`] says which column feeds which matrix
//! entry. Diagonal entries are read as VSWR, everything else as dB.

use ndarray::Array3;
use num_complex::Complex64;
use serde::Deserialize;
use tracing::debug;

use crate::conversions::{db_to_voltage_ratio, vswr_to_reflection};
use crate::error::{Error, Result};
use crate::frequency::FrequencyGrid;
use crate::interpolation::interpolate;
use crate::network::Network;

/// Column indices of a datasheet table.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct DatasheetMap {
    pub frequency_column: usize,
    /// `columns[i][j]` is the column holding S(i+1)(j+1)
    pub columns: Vec<Vec<usize>>,
}

impl DatasheetMap {
    /// Build a map from the nested layout `[[freq], [s11, s12, ..], [s21, ..], ..]`.
    pub fn from_nested(meta: &[Vec<usize>]) -> Result<DatasheetMap> {
        match meta.split_first() {
            Some((first, rows)) if first.len() == 1 => Ok(DatasheetMap {
                frequency_column: first[0],
                columns: rows.to_vec(),
            }),
            _ => Err(Error::MetaShape {
                rows: meta.len(),
                cols: meta.first().map_or(0, |r| r.len()),
                ports: 0,
            }),
        }
    }

    fn check(&self, ports: usize) -> Result<()> {
        let bad_row = self.columns.iter().find(|r| r.len() != ports);
        if self.columns.len() != ports || bad_row.is_some() {
            return Err(Error::MetaShape {
                rows: self.columns.len(),
                cols: bad_row.map_or(ports, |r| r.len()),
                ports,
            });
        }
        Ok(())
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct DatasheetOptions {
    pub ports: usize,
    /// dB columns are losses printed as positive numbers
    pub negate_db: bool,
    pub start_hz: f64,
    pub stop_hz: f64,
    pub points: usize,
}

fn column(tokens: &[&str], index: usize, line: usize) -> Result<f64> {
    let token = tokens.get(index).ok_or_else(|| Error::Format {
        line,
        message: format!("column {} missing, row has {} columns", index, tokens.len()),
    })?;
    token.parse().map_err(|_| Error::Format {
        line,
        message: format!("invalid number {:?} in column {}", token, index),
    })
}

/// Turn a datasheet table into a network on `linspace(start_hz, stop_hz, points)`.
pub fn parse_datasheet(
    text: &str,
    map: &DatasheetMap,
    options: &DatasheetOptions,
) -> Result<Network> {
    let n = options.ports;
    map.check(n)?;

    let mut frequencies = Vec::new();
    let mut channels: Vec<Vec<f64>> = vec![Vec::new(); n * n];

    for (index, raw) in text.lines().enumerate() {
        let line = index + 1;
        let tokens: Vec<&str> = raw.split_whitespace().collect();
        if tokens.is_empty() {
            continue;
        }
        frequencies.push(column(&tokens, map.frequency_column, line)? * 1e6);
        for i in 0..n {
            for j in 0..n {
                let value = column(&tokens, map.columns[i][j], line)?;
                let magnitude = if i == j {
                    vswr_to_reflection(value)
                } else if options.negate_db {
                    db_to_voltage_ratio(-value)
                } else {
                    db_to_voltage_ratio(value)
                };
                channels[i * n + j].push(magnitude);
            }
        }
    }
    debug!("datasheet has {} rows for a {}-port part", frequencies.len(), n);

    let grid = FrequencyGrid::linspace(options.start_hz, options.stop_hz, options.points)?;
    let mut s = Array3::<Complex64>::zeros((grid.len(), n, n));
    for (k, channel) in channels.iter().enumerate() {
        let resampled = interpolate(grid.f(), &frequencies, channel)?;
        for (fi, value) in resampled.into_iter().enumerate() {
            s[[fi, k / n, k % n]] = Complex64::new(value, 0.0);
        }
    }
    Network::new(grid, s)
}

#[cfg(test)]
mod tests {
    use super::*;

    const TRANSFER_SWITCH: &str = "1000.0 0.04 0.04 92.45 100.96 1.01 1.01 1.01 1.01 120.0
1500.0 0.05 0.05 98.61 87.38 1.01 1.01 1.01 1.01 120.0
2000.0 0.06 0.06 100.79 97.34 1.01 1.02 1.01 1.01 120.0
2500.0 0.07 0.06 97.51 104.72 1.03 1.03 1.03 1.02 120.0
3000.0 0.07 0.07 93.32 102.92 1.05 1.05 1.04 1.04 120.0
3500.0 0.08 0.08 98.46 99.72 1.06 1.07 1.05 1.05 120.0
4000.0 0.08 0.08 95.89 93.03 1.07 1.09 1.06 1.06 120.0
4500.0 0.09 0.09 92.30 99.42 1.07 1.09 1.07 1.07 120.0
5000.0 0.10 0.09 95.75 90.70 1.08 1.10 1.07 1.07 120.0";

    fn switch_on_map() -> DatasheetMap {
        DatasheetMap::from_nested(&[
            vec![0],
            vec![5, 1, 4, 9],
            vec![1, 6, 9, 4],
            vec![4, 9, 6, 2],
            vec![9, 4, 2, 6],
        ])
        .unwrap()
    }

    fn options(points: usize) -> DatasheetOptions {
        DatasheetOptions {
            ports: 4,
            negate_db: true,
            start_hz: 1.0e9,
            stop_hz: 5.0e9,
            points,
        }
    }

    fn assert_approx(actual: f64, expected: f64, tol: f64, msg: &str) {
        assert!(
            (actual - expected).abs() < tol,
            "{msg}: expected {expected:.6e}, got {actual:.6e}"
        );
    }

    #[test]
    fn vswr_and_db_columns_are_converted() {
        let network = parse_datasheet(TRANSFER_SWITCH, &switch_on_map(), &options(9)).unwrap();
        assert_eq!(network.nfreq(), 9);
        let s = network.s();
        assert_approx(s[[0, 0, 0]].re, 0.01 / 2.01, 1e-12, "S11 from VSWR 1.01");
        assert_approx(s[[0, 0, 1]].re, 10f64.powf(-0.04 / 20.0), 1e-12, "S12 loss");
        assert_approx(s[[0, 0, 3]].re, 1e-6, 1e-15, "S14 isolation");
        assert_approx(s[[8, 3, 3]].re, 0.10 / 2.10, 1e-12, "S44 at 5 GHz");
        assert_eq!(s[[4, 1, 2]].im, 0.0);
    }

    #[test]
    fn channels_are_interpolated_onto_requested_grid() {
        let network = parse_datasheet(TRANSFER_SWITCH, &switch_on_map(), &options(17)).unwrap();
        assert_eq!(network.frequency().f()[1], 1.25e9);
        let expected =
            (10f64.powf(-0.04 / 20.0) + 10f64.powf(-0.05 / 20.0)) / 2.0;
        assert_approx(network.s()[[1, 0, 1]].re, expected, 1e-12, "S12 midpoint");
    }

    #[test]
    fn positive_db_without_negation_is_gain() {
        let map = DatasheetMap {
            frequency_column: 0,
            columns: vec![vec![1, 2], vec![2, 1]],
        };
        let table = "1000 1.5 20\n2000 1.5 20\n";
        let options = DatasheetOptions {
            ports: 2,
            negate_db: false,
            start_hz: 1.0e9,
            stop_hz: 2.0e9,
            points: 3,
        };
        let network = parse_datasheet(table, &map, &options).unwrap();
        assert_approx(network.s21()[1].re, 10.0, 1e-9, "20 dB");
        assert_approx(network.s()[[1, 0, 0]].re, 0.2, 1e-12, "VSWR 1.5");
    }

    #[test]
    fn map_shape_must_match_ports() {
        let map = DatasheetMap {
            frequency_column: 0,
            columns: vec![vec![1, 2], vec![2, 1]],
        };
        let result = parse_datasheet(TRANSFER_SWITCH, &map, &options(9));
        assert!(matches!(
            result,
            Err(Error::MetaShape {
                rows: 2,
                ports: 4,
                ..
            })
        ));
    }

    #[test]
    fn missing_column_reports_line() {
        let result = parse_datasheet("1000 0.1 0.1\n", &switch_on_map(), &options(9));
        assert!(matches!(result, Err(Error::Format { line: 1, .. })));
    }

    #[test]
    fn single_row_cannot_be_interpolated() {
        let first_row = TRANSFER_SWITCH.lines().next().unwrap();
        let result = parse_datasheet(first_row, &switch_on_map(), &options(9));
        assert!(matches!(result, Err(Error::InsufficientPoints(1))));
    }
}
