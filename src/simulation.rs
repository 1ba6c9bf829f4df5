//! One complete run: sources on a master grid, device matrices on the same
//! grid, the cascade of both sources, and the correlation of the two outputs.

use num_complex::Complex64;
use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::info;

use crate::cascade::{cascade_return_vector, CascadeOutput, Stage, StageKind};
use crate::correlator::Correlation;
use crate::device::{DeviceModel, SParameterModel};
use crate::error::{Error, Result};
use crate::frequency::FrequencyGrid;
use crate::interpolation::interpolate_complex;
use crate::sources::{thermal_noise_on_grid, thermal_noise_realization, AntennaSpectrum};

/// Signal fed into one of the two inputs of the chain.
#[derive(Clone, Debug, PartialEq)]
pub enum Source {
    Antenna(AntennaSpectrum),
    /// Matched load; a `seed` draws a random-phase realisation instead of the
    /// flat zero-phase spectrum.
    Thermal {
        temperature_k: f64,
        seed: Option<u64>,
    },
    Constant(Complex64),
}

impl Source {
    pub fn wave(&self, grid: &FrequencyGrid) -> Result<Vec<Complex64>> {
        match self {
            Source::Antenna(spectrum) => {
                if spectrum.grid == *grid {
                    Ok(spectrum.voltage.clone())
                } else {
                    interpolate_complex(grid.f(), spectrum.grid.f(), &spectrum.voltage)
                }
            }
            Source::Thermal {
                temperature_k,
                seed: None,
            } => thermal_noise_on_grid(*temperature_k, grid),
            Source::Thermal {
                temperature_k,
                seed: Some(seed),
            } => {
                let mut rng = StdRng::seed_from_u64(*seed);
                thermal_noise_realization(*temperature_k, grid.resolution(), grid.len(), &mut rng)
            }
            Source::Constant(value) => Ok(vec![*value; grid.len()]),
        }
    }
}

/// A stage before it has been evaluated on a grid.
#[derive(Clone, Debug, PartialEq)]
pub struct StagePlan {
    pub name: String,
    pub kind: StageKind,
    pub model: DeviceModel,
}

impl StagePlan {
    pub fn build(&self, grid: &FrequencyGrid) -> Result<Stage> {
        Ok(Stage {
            name: self.name.clone(),
            network: self.model.s_parameters(grid)?,
            kind: self.kind,
        })
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Simulation {
    /// Master grid; when absent the first antenna source defines it.
    pub grid: Option<FrequencyGrid>,
    pub source_a: Source,
    pub source_b: Source,
    pub stages: Vec<StagePlan>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct SimulationResult {
    pub grid: FrequencyGrid,
    pub input_a: Vec<Complex64>,
    pub input_b: Vec<Complex64>,
    pub outputs: Vec<CascadeOutput>,
    pub correlation: Correlation,
}

impl SimulationResult {
    pub fn output(&self) -> Option<&CascadeOutput> {
        self.outputs.last()
    }
}

impl Simulation {
    pub fn frequency_grid(&self) -> Result<FrequencyGrid> {
        if let Some(grid) = &self.grid {
            return Ok(grid.clone());
        }
        [&self.source_a, &self.source_b]
            .into_iter()
            .find_map(|source| match source {
                Source::Antenna(spectrum) => Some(spectrum.grid.clone()),
                _ => None,
            })
            .ok_or(Error::EmptyGrid)
    }

    pub fn run(&self) -> Result<SimulationResult> {
        let grid = self.frequency_grid()?;
        info!("running {} stages on {}", self.stages.len(), grid);

        let input_a = self.source_a.wave(&grid)?;
        let input_b = self.source_b.wave(&grid)?;
        let stages = self
            .stages
            .iter()
            .map(|plan| plan.build(&grid))
            .collect::<Result<Vec<Stage>>>()?;

        let outputs = cascade_return_vector(&stages, &input_a, &input_b)?;
        let last = outputs.last().ok_or(Error::EmptyChain)?;
        let correlation = Correlation::new(&last.a, &last.b)?;
        info!("{}", correlation);

        Ok(SimulationResult {
            grid,
            input_a,
            input_b,
            outputs,
            correlation,
        })
    }
}
