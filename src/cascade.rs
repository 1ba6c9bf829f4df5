//! Wave propagation through an ordered chain of 2-port and 4-port devices.
//!
//! Only forward transmission is followed: the outgoing waves of one stage
//! become the incident waves of the next, and reflections are not fed back.

use num_complex::Complex64;
use serde::Deserialize;
use tracing::{debug, info};

use crate::constants::SNAP_THRESHOLD;
use crate::error::{Error, Result};
use crate::network::Network;

/// Which signal path(s) a 2-port stage sits on.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Branch {
    #[default]
    Both,
    A,
    B,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StageKind {
    TwoPort {
        branch: Branch,
    },
    /// `cross_input` swaps the two sources before they enter the device,
    /// `flip_input` drives ports 2 and 3 and reads ports 1 and 4 instead of
    /// driving 1 and 4 and reading 2 and 3.
    FourPort {
        cross_input: bool,
        flip_input: bool,
    },
}

impl StageKind {
    pub fn nports(&self) -> usize {
        match self {
            StageKind::TwoPort { .. } => 2,
            StageKind::FourPort { .. } => 4,
        }
    }
}

// the definition of a stage in the device chain
#[derive(Clone, Debug, PartialEq)]
pub struct Stage {
    pub name: String,
    pub network: Network,
    pub kind: StageKind,
}

impl Stage {
    pub fn two_port(name: &str, network: Network) -> Stage {
        Stage {
            name: name.to_string(),
            network,
            kind: StageKind::TwoPort {
                branch: Branch::Both,
            },
        }
    }

    pub fn four_port(name: &str, network: Network) -> Stage {
        Stage {
            name: name.to_string(),
            network,
            kind: StageKind::FourPort {
                cross_input: false,
                flip_input: false,
            },
        }
    }

    pub fn with_kind(mut self, kind: StageKind) -> Stage {
        self.kind = kind;
        self
    }
}

/// The two wave vectors leaving a stage.
#[derive(Clone, Debug, PartialEq)]
pub struct CascadeOutput {
    pub name: String, // like "Coupler Output"
    pub a: Vec<Complex64>,
    pub b: Vec<Complex64>,
}

fn snap(value: Complex64) -> Complex64 {
    let clean = |x: f64| if x.abs() < SNAP_THRESHOLD { 0.0 } else { x };
    Complex64::new(clean(value.re), clean(value.im))
}

/// Outgoing waves `b = S a` at every port; `None` ports have no incident wave.
pub fn scatter(device: &Network, incident: &[Option<&[Complex64]>]) -> Result<Vec<Vec<Complex64>>> {
    let n = device.nports();
    let nfreq = device.nfreq();
    if incident.len() != n {
        return Err(Error::PortCount {
            expected: n,
            found: incident.len(),
        });
    }
    for wave in incident.iter().flatten() {
        if wave.len() != nfreq {
            return Err(Error::LengthMismatch {
                expected: nfreq,
                found: wave.len(),
            });
        }
    }

    let s = device.s();
    let outgoing = (0..n)
        .map(|i| {
            (0..nfreq)
                .map(|fi| {
                    let sum = incident
                        .iter()
                        .enumerate()
                        .filter_map(|(j, wave)| wave.map(|w| s[[fi, i, j]] * w[fi]))
                        .sum();
                    snap(sum)
                })
                .collect()
        })
        .collect();
    Ok(outgoing)
}

fn expect_ports(device: &Network, expected: usize) -> Result<()> {
    if device.nports() != expected {
        return Err(Error::PortCount {
            expected,
            found: device.nports(),
        });
    }
    Ok(())
}

/// S21 times the wave entering port 1.
pub fn feed_two_port(device: &Network, input: &[Complex64]) -> Result<Vec<Complex64>> {
    expect_ports(device, 2)?;
    let mut outgoing = scatter(device, &[Some(input), None])?;
    Ok(outgoing.swap_remove(1))
}

/// Superpose two sources through a 4-port device.
///
/// Forward wiring returns `(S21 a1 + S24 a4, S31 a1 + S34 a4)`, flipped wiring
/// returns `(S12 a2 + S13 a3, S42 a2 + S43 a3)`.
pub fn feed_four_port(
    device: &Network,
    source_a: &[Complex64],
    source_b: &[Complex64],
    cross_input: bool,
    flip_input: bool,
) -> Result<(Vec<Complex64>, Vec<Complex64>)> {
    expect_ports(device, 4)?;
    let (x, y) = if cross_input {
        (source_b, source_a)
    } else {
        (source_a, source_b)
    };
    let (incident, out_x, out_y) = if flip_input {
        ([None, Some(x), Some(y), None], 0, 3)
    } else {
        ([Some(x), None, None, Some(y)], 1, 2)
    };
    let mut outgoing = scatter(device, &incident)?;
    let b_y = outgoing.swap_remove(out_y);
    let b_x = outgoing.swap_remove(out_x);
    Ok((b_x, b_y))
}

/// Single-path chain of 2-port devices.
pub fn cascade_two_port(devices: &[Network], input: &[Complex64]) -> Result<Vec<Complex64>> {
    let (first, rest) = devices.split_first().ok_or(Error::EmptyChain)?;
    let mut wave = feed_two_port(first, input)?;
    for device in rest {
        if device.frequency() != first.frequency() {
            return Err(Error::GridMismatch);
        }
        wave = feed_two_port(device, &wave)?;
    }
    Ok(wave)
}

fn check_chain(stages: &[Stage]) -> Result<()> {
    let first = stages.first().ok_or(Error::EmptyChain)?;
    for stage in stages {
        if stage.network.frequency() != first.network.frequency() {
            return Err(Error::GridMismatch);
        }
        expect_ports(&stage.network, stage.kind.nports())?;
    }
    Ok(())
}

fn cascade_stage(stage: &Stage, a: &[Complex64], b: &[Complex64]) -> Result<CascadeOutput> {
    let (a, b) = match stage.kind {
        StageKind::FourPort {
            cross_input,
            flip_input,
        } => feed_four_port(&stage.network, a, b, cross_input, flip_input)?,
        StageKind::TwoPort { branch } => match branch {
            Branch::Both => (feed_two_port(&stage.network, a)?, feed_two_port(&stage.network, b)?),
            Branch::A => (feed_two_port(&stage.network, a)?, b.to_vec()),
            Branch::B => (a.to_vec(), feed_two_port(&stage.network, b)?),
        },
    };
    debug!("cascaded stage {:?} ({:?})", stage.name, stage.kind);
    Ok(CascadeOutput {
        name: stage.name.clone() + " Output",
        a,
        b,
    })
}

/// Run two sources through the chain and return the output of every stage.
pub fn cascade_return_vector(
    stages: &[Stage],
    source_a: &[Complex64],
    source_b: &[Complex64],
) -> Result<Vec<CascadeOutput>> {
    check_chain(stages)?;
    let mut outputs: Vec<CascadeOutput> = Vec::with_capacity(stages.len());
    for stage in stages {
        let output = match outputs.last() {
            Some(previous) => cascade_stage(stage, &previous.a, &previous.b)?,
            None => cascade_stage(stage, source_a, source_b)?,
        };
        outputs.push(output);
    }
    info!("cascaded {} stages", stages.len());
    Ok(outputs)
}

/// Run two sources through the chain and return the final pair of waves.
pub fn cascade(stages: &[Stage], source_a: &[Complex64], source_b: &[Complex64]) -> Result<CascadeOutput> {
    let mut outputs = cascade_return_vector(stages, source_a, source_b)?;
    outputs.pop().ok_or(Error::EmptyChain)
}
