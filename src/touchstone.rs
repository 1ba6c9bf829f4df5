//! Reader and writer for 2-port and 4-port network files.
//!
//! The reader accepts `MA`, `DB` and `RI` encodings. 2-port data rows carry
//! the frequency and four value pairs on one line (S11 S21 S12 S22). 4-port
//! records are a 9-value row (frequency and the first matrix row) followed by
//! three 8-value rows, or a frequency-only row followed by four 8-value rows,
//! which is the layout the writer produces.

use std::fmt::Write as _;
use std::fs;
use std::path::Path;

use ndarray::Array3;
use num_complex::Complex64;
use tracing::{debug, info};

use crate::constants::REFERENCE_IMPEDANCE;
use crate::conversions::db_to_voltage_ratio;
use crate::error::{Error, Result};
use crate::frequency::FrequencyGrid;
use crate::network::Network;

/// Encoding of each value pair in the data rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataFormat {
    MA, // magnitude, angle in degrees
    DB, // dB magnitude, angle in degrees
    RI, // real, imaginary
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct OptionLine {
    multiplier: f64,
    format: DataFormat,
    z0: f64,
}

fn parse_option_line(line: &str) -> Result<OptionLine> {
    let tokens: Vec<String> = line
        .trim_start_matches('#')
        .split_whitespace()
        .map(|t| t.to_uppercase())
        .collect();

    let mut multiplier = 1.0;
    let mut format = None;
    let mut s_parameters = false;
    let mut z0 = REFERENCE_IMPEDANCE;

    let mut iter = tokens.iter();
    while let Some(token) = iter.next() {
        match token.as_str() {
            "GHZ" => multiplier = 1e9,
            "MHZ" => multiplier = 1e6,
            "KHZ" => multiplier = 1e3,
            "HZ" => multiplier = 1.0,
            "MA" => format = Some(DataFormat::MA),
            "DB" => format = Some(DataFormat::DB),
            "RI" => format = Some(DataFormat::RI),
            "S" => s_parameters = true,
            "R" => {
                if let Some(value) = iter.next() {
                    z0 = value.parse().map_err(|_| Error::UnsupportedFormat(line.to_string()))?;
                }
            }
            unit if unit.ends_with("HZ") => {
                return Err(Error::UnsupportedFrequencyUnit(unit.to_string()))
            }
            _ => return Err(Error::UnsupportedFormat(line.to_string())),
        }
    }

    match format {
        Some(format) if s_parameters => Ok(OptionLine {
            multiplier,
            format,
            z0,
        }),
        _ => Err(Error::UnsupportedFormat(line.to_string())),
    }
}

fn pair_to_complex(format: DataFormat, a: f64, b: f64) -> Complex64 {
    match format {
        DataFormat::MA => Complex64::from_polar(a, b.to_radians()),
        DataFormat::DB => Complex64::from_polar(db_to_voltage_ratio(a), b.to_radians()),
        DataFormat::RI => Complex64::new(a, b),
    }
}

fn parse_values(line: &str, line_number: usize) -> Result<Vec<f64>> {
    line.split_whitespace()
        .map(|token| {
            token.parse::<f64>().map_err(|_| Error::Format {
                line: line_number,
                message: format!("invalid number {:?}", token),
            })
        })
        .collect()
}

// one data record: frequency in file units plus the flattened value pairs
struct Record {
    line: usize,
    frequency: f64,
    values: Vec<f64>,
}

fn parse_records(content: &str, nports: usize) -> Result<(OptionLine, Vec<Record>)> {
    let values_per_record = 2 * nports * nports;
    let mut option: Option<OptionLine> = None;
    let mut records = Vec::new();
    let mut pending: Option<Record> = None;

    for (index, raw) in content.lines().enumerate() {
        let line_number = index + 1;
        let line = raw.split('!').next().unwrap_or("").trim();
        if line.is_empty() {
            continue;
        }
        if line.starts_with('#') {
            if option.is_some() {
                return Err(Error::Format {
                    line: line_number,
                    message: "second option line".to_string(),
                });
            }
            let parsed = parse_option_line(line)?;
            debug!("option line {:?} parsed as {:?}", line, parsed);
            option = Some(parsed);
            continue;
        }
        if option.is_none() {
            return Err(Error::Format {
                line: line_number,
                message: "data before the option line".to_string(),
            });
        }

        let values = parse_values(line, line_number)?;
        match (nports, values.len()) {
            (2, 9) | (4, 9) | (4, 1) => {
                if let Some(open) = pending.take() {
                    return Err(Error::Format {
                        line: line_number,
                        message: format!("record starting at line {} is incomplete", open.line),
                    });
                }
                let record = Record {
                    line: line_number,
                    frequency: values[0],
                    values: values[1..].to_vec(),
                };
                if record.values.len() == values_per_record {
                    records.push(record);
                } else {
                    pending = Some(record);
                }
            }
            (4, 8) => {
                let mut open = pending.take().ok_or_else(|| Error::Format {
                    line: line_number,
                    message: "continuation row without a frequency row".to_string(),
                })?;
                open.values.extend(values);
                if open.values.len() == values_per_record {
                    records.push(open);
                } else {
                    pending = Some(open);
                }
            }
            (2, found) => {
                return Err(Error::RowWidth {
                    line: line_number,
                    found,
                    expected: "9".to_string(),
                })
            }
            (_, found) => {
                return Err(Error::RowWidth {
                    line: line_number,
                    found,
                    expected: "9, 8 or 1".to_string(),
                })
            }
        }
    }

    if let Some(open) = pending {
        return Err(Error::Format {
            line: open.line,
            message: "record is incomplete at end of file".to_string(),
        });
    }
    let option = option.ok_or_else(|| Error::UnsupportedFormat(String::new()))?;
    Ok((option, records))
}

fn parse_network(content: &str, nports: usize) -> Result<Network> {
    let (option, records) = parse_records(content, nports)?;
    let frequencies: Vec<f64> = records
        .iter()
        .map(|r| r.frequency * option.multiplier)
        .collect();
    let grid = FrequencyGrid::new(frequencies)?;

    let mut s = Array3::<Complex64>::zeros((records.len(), nports, nports));
    for (fi, record) in records.iter().enumerate() {
        for (k, pair) in record.values.chunks_exact(2).enumerate() {
            let value = pair_to_complex(option.format, pair[0], pair[1]);
            // 2-port files list S11 S21 S12 S22, i.e. column-major
            let (i, j) = if nports == 2 {
                (k % 2, k / 2)
            } else {
                (k / nports, k % nports)
            };
            s[[fi, i, j]] = value;
        }
    }

    info!(
        "read {}-port network with {} points ({:?} format)",
        nports,
        records.len(),
        option.format
    );
    Ok(Network::new(grid, s)?.with_z0(option.z0))
}

pub fn parse_s2p(content: &str) -> Result<Network> {
    parse_network(content, 2)
}

pub fn parse_s4p(content: &str) -> Result<Network> {
    parse_network(content, 4)
}

pub fn read_s2p<P: AsRef<Path>>(path: P) -> Result<Network> {
    parse_s2p(&fs::read_to_string(path)?)
}

pub fn read_s4p<P: AsRef<Path>>(path: P) -> Result<Network> {
    parse_s4p(&fs::read_to_string(path)?)
}

/// Read a `.s2p` or `.s4p` file, picking the port count from the extension.
pub fn read_network<P: AsRef<Path>>(path: P) -> Result<Network> {
    let path = path.as_ref();
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase());
    match extension.as_deref() {
        Some("s2p") => read_s2p(path),
        Some("s4p") => read_s4p(path),
        _ => Err(Error::UnknownDevice(path.display().to_string())),
    }
}

fn header(network: &Network) -> String {
    format!("# Hz S RI R {}\n", network.z0())
}

/// Render a 4-port network: frequency on its own line, then one line of
/// real/imaginary pairs per matrix row.
pub fn format_s4p(network: &Network) -> Result<String> {
    if network.nports() != 4 {
        return Err(Error::PortCount {
            expected: 4,
            found: network.nports(),
        });
    }
    let s = network.s();
    let mut out = header(network);
    for (fi, f) in network.frequency().f().iter().enumerate() {
        let _ = writeln!(out, "{:<20.6}", f);
        for i in 0..4 {
            for j in 0..4 {
                let value = s[[fi, i, j]];
                let _ = write!(out, "{:<20.6}{:<20.6}", value.re, value.im);
            }
            out.push('\n');
        }
    }
    Ok(out)
}

/// Render a 2-port network, one line per frequency.
pub fn format_s2p(network: &Network) -> Result<String> {
    if network.nports() != 2 {
        return Err(Error::PortCount {
            expected: 2,
            found: network.nports(),
        });
    }
    let s = network.s();
    let mut out = header(network);
    for (fi, f) in network.frequency().f().iter().enumerate() {
        let _ = write!(out, "{:<20.6}", f);
        for (i, j) in [(0, 0), (1, 0), (0, 1), (1, 1)] {
            let value = s[[fi, i, j]];
            let _ = write!(out, "{:<20.6}{:<20.6}", value.re, value.im);
        }
        out.push('\n');
    }
    Ok(out)
}

pub fn write_s4p<P: AsRef<Path>>(path: P, network: &Network) -> Result<()> {
    fs::write(path, format_s4p(network)?)?;
    Ok(())
}

pub fn write_s2p<P: AsRef<Path>>(path: P, network: &Network) -> Result<()> {
    fs::write(path, format_s2p(network)?)?;
    Ok(())
}
