use std::fs;
use std::path::{Path, PathBuf};

use num_complex::Complex64;
use serde::Deserialize;
use tracing::{debug, info};

use crate::cascade::{Branch, StageKind};
use crate::constants::{DEFAULT_ISOLATION_DB, REFERENCE_IMPEDANCE};
use crate::datasheet::{parse_datasheet, DatasheetMap, DatasheetOptions};
use crate::device::{DeviceModel, SwitchState};
use crate::error::{Error, Result};
use crate::frequency::FrequencyGrid;
use crate::simulation::{Simulation, Source, StagePlan};
use crate::sources::read_residues;
use crate::touchstone::read_network;

#[derive(Deserialize, Debug)]
struct Config {
    grid: Option<GridConfig>,
    sources: SourcesConfig,
    stages: Vec<StageConfig>,
    isolation_db: Option<f64>,
}

#[derive(Deserialize, Debug)]
struct IncludedConfig {
    stages: Vec<StageConfig>,
}

#[derive(Deserialize, Debug)]
struct GridConfig {
    start_hz: f64,
    stop_hz: f64,
    points: usize,
}

#[derive(Deserialize, Debug)]
struct SourcesConfig {
    a: SourceConfig,
    b: SourceConfig,
}

fn default_impedance() -> f64 {
    REFERENCE_IMPEDANCE
}

#[derive(Deserialize, Debug)]
#[serde(tag = "type", rename_all = "snake_case")]
enum SourceConfig {
    Antenna {
        file_path: String,
        #[serde(default = "default_impedance")]
        impedance_ohms: f64,
    },
    Thermal {
        temperature_k: f64,
        seed: Option<u64>,
    },
    Constant {
        re: f64,
        #[serde(default)]
        im: f64,
    },
}

#[derive(Deserialize, Debug)]
#[serde(tag = "type", rename_all = "snake_case")]
enum StageConfig {
    FourPort {
        name: Option<String>,
        #[serde(default)]
        cross_input: bool,
        #[serde(default)]
        flip_input: bool,
        device: DeviceConfig,
    },
    TwoPort {
        name: Option<String>,
        #[serde(default)]
        branch: Branch,
        device: DeviceConfig,
    },
    Include {
        path: String,
    },
}

#[derive(Deserialize, Debug)]
#[serde(tag = "model", rename_all = "snake_case")]
enum DeviceConfig {
    Switch {
        state: SwitchState,
    },
    Coupler,
    PerturbedCoupler {
        #[serde(default)]
        s21_amplitude_db: f64,
        #[serde(default)]
        s21_phase_deg: f64,
        #[serde(default)]
        s31_amplitude_db: f64,
        #[serde(default)]
        s31_phase_deg: f64,
    },
    Amplifier {
        gain: Option<f64>,
        gain_db: Option<f64>,
    },
    Attenuator {
        loss_db: f64,
    },
    DelayLine {
        length_m: f64,
    },
    Touchstone {
        file_path: String,
    },
    Datasheet {
        file_path: String,
        // [[freq], [s11, s12, ..], [s21, ..], ..]
        map: Vec<Vec<usize>>,
        ports: usize,
        #[serde(default)]
        negate_db: bool,
        start_hz: f64,
        stop_hz: f64,
        points: usize,
    },
}

/// Load a run description; relative paths resolve against the file's directory.
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Simulation> {
    let path = path.as_ref();
    info!("loading config {}", path.display());
    let content = fs::read_to_string(path)?;
    let base_dir = path.parent().unwrap_or_else(|| Path::new("."));
    let mut includes = vec![fs::canonicalize(path)?];
    build_simulation(&content, base_dir, &mut includes)
}

/// Parse a run description held in memory.
pub fn parse_config(content: &str, base_dir: &Path) -> Result<Simulation> {
    build_simulation(content, base_dir, &mut Vec::new())
}

// `includes` holds the canonical paths of the files currently being read,
// outermost first.
fn build_simulation(
    content: &str,
    base_dir: &Path,
    includes: &mut Vec<PathBuf>,
) -> Result<Simulation> {
    let config: Config = toml::from_str(content)?;
    debug!("config: {:#?}", config);

    let isolation_db = config.isolation_db.unwrap_or(DEFAULT_ISOLATION_DB);
    let grid = config
        .grid
        .map(|g| FrequencyGrid::linspace(g.start_hz, g.stop_hz, g.points))
        .transpose()?;

    let mut stages = Vec::new();
    load_stages_recursive(config.stages, isolation_db, &mut stages, base_dir, includes)?;

    Ok(Simulation {
        grid,
        source_a: load_source(config.sources.a, base_dir)?,
        source_b: load_source(config.sources.b, base_dir)?,
        stages,
    })
}

fn load_source(source: SourceConfig, base_dir: &Path) -> Result<Source> {
    Ok(match source {
        SourceConfig::Antenna {
            file_path,
            impedance_ohms,
        } => Source::Antenna(read_residues(base_dir.join(file_path), impedance_ohms)?),
        SourceConfig::Thermal {
            temperature_k,
            seed,
        } => Source::Thermal {
            temperature_k,
            seed,
        },
        SourceConfig::Constant { re, im } => Source::Constant(Complex64::new(re, im)),
    })
}

fn load_stages_recursive(
    stage_configs: Vec<StageConfig>,
    isolation_db: f64,
    stages: &mut Vec<StagePlan>,
    base_dir: &Path,
    includes: &mut Vec<PathBuf>,
) -> Result<()> {
    for stage_config in stage_configs {
        let (name, kind, device) = match stage_config {
            StageConfig::FourPort {
                name,
                cross_input,
                flip_input,
                device,
            } => (
                name,
                StageKind::FourPort {
                    cross_input,
                    flip_input,
                },
                device,
            ),
            StageConfig::TwoPort {
                name,
                branch,
                device,
            } => (name, StageKind::TwoPort { branch }, device),
            StageConfig::Include { path } => {
                let included_path = base_dir.join(&path);
                info!("loading included config {}", included_path.display());
                let content = fs::read_to_string(&included_path)?;
                let canonical = fs::canonicalize(&included_path)?;
                if includes.contains(&canonical) {
                    return Err(Error::IncludeCycle(included_path.display().to_string()));
                }
                let included: IncludedConfig = toml::from_str(&content)?;

                let new_base_dir = included_path.parent().unwrap_or_else(|| Path::new("."));
                includes.push(canonical);
                load_stages_recursive(included.stages, isolation_db, stages, new_base_dir, includes)?;
                includes.pop();
                continue;
            }
        };
        let model = load_device(device, isolation_db, base_dir)?;
        let name = name.unwrap_or_else(|| format!("Stage {} ({})", stages.len() + 1, model.name()));
        stages.push(StagePlan { name, kind, model });
    }
    Ok(())
}

fn load_device(device: DeviceConfig, isolation_db: f64, base_dir: &Path) -> Result<DeviceModel> {
    let model = match device {
        DeviceConfig::Switch { state } => DeviceModel::switch(state),
        DeviceConfig::Coupler => DeviceModel::Coupler,
        DeviceConfig::PerturbedCoupler {
            s21_amplitude_db,
            s21_phase_deg,
            s31_amplitude_db,
            s31_phase_deg,
        } => DeviceModel::PerturbedCoupler {
            s21_amplitude_db,
            s21_phase_deg,
            s31_amplitude_db,
            s31_phase_deg,
        },
        DeviceConfig::Amplifier { gain, gain_db } => match (gain, gain_db) {
            (Some(gain), None) => DeviceModel::amplifier(gain),
            (None, Some(gain_db)) => DeviceModel::amplifier_db(gain_db),
            _ => {
                return Err(Error::InvalidDevice(
                    "amplifier needs exactly one of `gain` or `gain_db`".to_string(),
                ))
            }
        },
        DeviceConfig::Attenuator { loss_db } => DeviceModel::attenuator(loss_db),
        DeviceConfig::DelayLine { length_m } => DeviceModel::delay_line(length_m),
        DeviceConfig::Touchstone { file_path } => {
            // device files are relative to the config that names them
            DeviceModel::FileLoaded(read_network(base_dir.join(file_path))?)
        }
        DeviceConfig::Datasheet {
            file_path,
            map,
            ports,
            negate_db,
            start_hz,
            stop_hz,
            points,
        } => {
            let full_path: PathBuf = base_dir.join(file_path);
            let text = fs::read_to_string(&full_path)?;
            let options = DatasheetOptions {
                ports,
                negate_db,
                start_hz,
                stop_hz,
                points,
            };
            DeviceModel::FileLoaded(parse_datasheet(
                &text,
                &DatasheetMap::from_nested(&map)?,
                &options,
            )?)
        }
    };
    Ok(model.with_isolation_db(isolation_db))
}
