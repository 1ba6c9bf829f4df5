mod cascade;
pub mod cli;
mod config;
mod constants;
mod conversions;
mod correlator;
mod datasheet;
mod device;
mod error;
mod frequency;
mod interpolation;
mod network;
mod simulation;
mod sources;
mod touchstone;

pub use cascade::{
    cascade, cascade_return_vector, cascade_two_port, feed_four_port, feed_two_port, scatter,
    Branch, CascadeOutput, Stage, StageKind,
};
pub use config::{load_config, parse_config};
pub use constants::{BOLTZMANN, DEFAULT_ISOLATION_DB, REFERENCE_IMPEDANCE, SPEED_OF_LIGHT};
pub use conversions::{db_to_voltage_ratio, vswr_to_reflection};
pub use correlator::{correlate, mean, Correlation};
pub use datasheet::{parse_datasheet, DatasheetMap, DatasheetOptions};
pub use device::{DeviceModel, SParameterModel, SwitchState};
pub use error::{Error, Result};
pub use frequency::FrequencyGrid;
pub use interpolation::{interpolate, interpolate_complex};
pub use network::{interpolate_networks, Network};
pub use simulation::{Simulation, SimulationResult, Source, StagePlan};
pub use sources::{
    parse_residues, read_residues, residues_to_voltage, thermal_noise, thermal_noise_on_grid,
    thermal_noise_realization, thermal_noise_voltage, AntennaSpectrum,
};
pub use touchstone::{
    format_s2p, format_s4p, parse_s2p, parse_s4p, read_network, read_s2p, read_s4p, write_s2p,
    write_s4p, DataFormat,
};
