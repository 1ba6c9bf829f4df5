use std::process;

use crate::load_config;
use crate::SimulationResult;

pub struct Config {}

impl Config {
    pub fn run(args: &[String]) -> Result<Config, Box<dyn std::error::Error>> {
        if args.len() < 2 {
            return Err("not enough arguments".into());
        }

        // Check for special flags
        match args[1].as_str() {
            "--version" | "-v" => {
                print_version();
                process::exit(0);
            }
            "--help" | "-h" => {
                print_help();
                process::exit(0);
            }
            _ => {
                if args.len() > 2 {
                    return Err(
                        "too many arguments, expecting only 2, such as `rpachain filepath`".into(),
                    );
                }
            }
        }

        // rpachain arg[1], such as rpachain files/demo.toml
        let cwd = std::env::current_dir()?;
        let file_path = args[1].clone();
        println!("Config Path: {}", file_path);
        let full_path_to_config = cwd.join(file_path);
        println!("Full Path: {}", full_path_to_config.display());

        let simulation = load_config(&full_path_to_config)?;
        let result = simulation.run()?;
        print_simulation(&result);

        Ok(Config {})
    }
}

fn version_line() -> String {
    format!("{} {}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"))
}

pub fn print_version() {
    println!("{}", version_line());
}

pub fn print_error(error: &str) {
    const RED: &str = "\x1b[31m";
    const RESET: &str = "\x1b[0m";
    println!("{}Problem running the chain: {error}{}", RED, RESET);
}

pub fn print_help() {
    // ANSI color codes
    const BOLD: &str = "\x1b[1m";
    const CYAN: &str = "\x1b[36m";
    const GREEN: &str = "\x1b[32m";
    const YELLOW: &str = "\x1b[33m";
    const RESET: &str = "\x1b[0m";

    println!(
        "📡 rpachain S-parameter cascade and correlator{}",
        RESET
    );
    println!();
    println!("{}{}VERSION:{}", BOLD, YELLOW, RESET);
    println!("    {}{}{}", GREEN, env!("CARGO_PKG_VERSION"), RESET);
    println!();
    println!("{}{}USAGE:{}", BOLD, YELLOW, RESET);
    println!("    {} rpachain <FILE_PATH>{}", GREEN, RESET);
    println!();
    println!("     FILE_PATH: path to a toml run description");
    println!();
    println!("     Both sources are cascaded through every stage on one frequency grid");
    println!("     and the two outputs are cross-correlated.");
    println!();
    println!("{}{}OPTIONS:{}", BOLD, YELLOW, RESET);
    println!(
        "    {}  -v, --version{}{}    Print version information",
        GREEN, RESET, RESET
    );
    println!(
        "    {}  -h, --help{}{}       Print help information",
        GREEN, RESET, RESET
    );
    println!();
    println!("{}{}ENVIRONMENT:{}", BOLD, YELLOW, RESET);
    println!("    {}  RUST_LOG{}         Log filter, defaults to `info`", GREEN, RESET);
    println!();
    println!("{}{}EXAMPLES:{}", BOLD, YELLOW, RESET);
    println!("    {} # Single file (Relative path){}", CYAN, RESET);
    println!("    {} rpachain files/demo.toml{}", GREEN, RESET);
    println!();
}

fn power_db(voltage: f64) -> f64 {
    20.0 * voltage.log10()
}

pub fn print_simulation(result: &SimulationResult) {
    let grid = &result.grid;
    let n = grid.len();
    println!();
    println!("Grid: {}", grid);
    println!("Resolution:\t{:>12.4e} Hz", grid.resolution());

    // the formatting `{:>8.2}` aligns positive and negative numbers on the decimal,
    // with two digits after the decimal (hundredths place)
    let centre = n / 2;
    println!("\nNode 0: Input");
    println!("|A| at centre:\t{:>8.2} dBV", power_db(result.input_a[centre].norm()));
    println!("|B| at centre:\t{:>8.2} dBV", power_db(result.input_b[centre].norm()));
    for (i, output) in result.outputs.iter().enumerate() {
        println!("\nNode {}: {}", i + 1, output.name);
        println!("|A| at centre:\t{:>8.2} dBV", power_db(output.a[centre].norm()));
        println!("|B| at centre:\t{:>8.2} dBV", power_db(output.b[centre].norm()));
    }

    let correlation = &result.correlation;
    let magnitude = correlation.magnitude();
    let phase = correlation.phase_deg();
    println!();
    println!("Correlation Summary:");
    println!("--------------------");
    println!("Number of Stages: {}", result.outputs.len());
    for (label, k) in [("Start", 0), ("Centre", centre), ("Stop", n - 1)] {
        println!(
            "{:<8}{:>14.4} Hz  |C| {:>12.4e}  phase {:>8.2} deg",
            label,
            grid.f()[k],
            magnitude[k],
            phase[k]
        );
    }
    println!("Mean |C|:\t{:>12.4e}", correlation.mean.norm());
    println!("Mean phase:\t{:>8.2} deg", correlation.mean.arg().to_degrees());
}
