use thiserror::Error;

/// Everything that can go wrong while building or cascading networks.
///
/// Variants fall into three groups: malformed input files or configuration,
/// dimension mismatches between devices and wave vectors, and degenerate
/// numeric input such as empty or single-point grids.
#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("parse error at line {line}: {message}")]
    Format { line: usize, message: String },

    #[error("unsupported option line {0:?}: expected S parameters in MA, DB or RI format")]
    UnsupportedFormat(String),

    #[error("unsupported frequency unit {0:?}")]
    UnsupportedFrequencyUnit(String),

    #[error("line {line} has {found} values, expected {expected}")]
    RowWidth {
        line: usize,
        found: usize,
        expected: String,
    },

    #[error("datasheet column map is {rows}x{cols}, expected {ports}x{ports}")]
    MetaShape {
        rows: usize,
        cols: usize,
        ports: usize,
    },

    #[error("config error: {0}")]
    Config(#[from] toml::de::Error),

    #[error("unknown device file type for {0:?}, expected .s2p or .s4p")]
    UnknownDevice(String),

    #[error("invalid device description: {0}")]
    InvalidDevice(String),

    #[error("config {0} includes itself")]
    IncludeCycle(String),

    #[error("expected a {expected}-port network, got {found} ports")]
    PortCount { expected: usize, found: usize },

    #[error("length mismatch: expected {expected} points, got {found}")]
    LengthMismatch { expected: usize, found: usize },

    #[error("networks are defined on different frequency grids")]
    GridMismatch,

    #[error("transmission block is singular at {0} Hz, the network cannot be cascaded")]
    SingularTransfer(f64),

    #[error("device chain is empty")]
    EmptyChain,

    #[error("interpolation needs at least 2 source points, got {0}")]
    InsufficientPoints(usize),

    #[error("frequency grid is empty")]
    EmptyGrid,

    #[error("frequency grid is not strictly increasing at index {0}")]
    NonIncreasingGrid(usize),

    #[error("frequency {0} is not a finite number")]
    NonFiniteGrid(usize),
}

pub type Result<T> = std::result::Result<T, Error>;
