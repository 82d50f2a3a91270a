use std::{fs, path::PathBuf, time::Duration};

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use qchem_core::{
    BatchDriver, CalculationConfig, DistanceGeometry, GeometryGenerator, MoleculeSet, RhfSolver,
};

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: QcCommand,
}

#[derive(Subcommand, Debug)]
enum QcCommand {
    /// Compute Hartree-Fock energies and dipole moments for a set of molecules
    Run {
        /// JSON array of {"name", "smiles"} objects. Uses the built-in tutorial set if omitted
        #[arg(long, short)]
        molecules: Option<PathBuf>,
        /// JSON calculation config. Flags given on the command line take precedence
        #[arg(long, short)]
        config: Option<PathBuf>,
        /// Name of a built-in basis set or path to a BSE JSON file
        #[arg(long, short)]
        basis: Option<String>,
        /// Total charge of every molecule
        #[arg(long, allow_hyphen_values = true)]
        charge: Option<i32>,
        /// Number of unpaired electrons
        #[arg(long)]
        spin: Option<u32>,
        /// The maximum number of iterations the SCF loop should attempt before the
        /// system is considered to not converge
        #[arg(long)]
        max_iterations: Option<usize>,
        /// Wall clock budget per molecule, in seconds
        #[arg(long)]
        timeout: Option<f64>,
        /// Number of molecules computed in parallel, 0 uses one thread per core
        #[arg(long, short, default_value_t = 1)]
        jobs: usize,
        /// Also write the full report as JSON to this file
        #[arg(long)]
        json: Option<PathBuf>,
    },
    /// Embed a SMILES string in 3D and print the structure as XYZ
    Embed {
        #[arg(long, short)]
        smiles: String,
    },
}

fn main() -> anyhow::Result<()> {
    pretty_env_logger::init();

    let args: Args = Args::parse();

    match args.command {
        QcCommand::Run {
            molecules,
            config,
            basis,
            charge,
            spin,
            max_iterations,
            timeout,
            jobs,
            json,
        } => {
            let mut config = match config {
                Some(path) => CalculationConfig::load(&path)
                    .with_context(|| format!("failed to load config {}", path.display()))?,
                None => CalculationConfig::default(),
            };
            if let Some(basis) = basis {
                config = config.with_basis(basis);
            }
            if let Some(charge) = charge {
                config = config.with_charge(charge);
            }
            if let Some(spin) = spin {
                config = config.with_spin(spin);
            }
            if let Some(max_iterations) = max_iterations {
                config = config.with_max_iterations(max_iterations);
            }
            if let Some(timeout) = timeout {
                if !(timeout > 0.0) {
                    bail!("timeout must be a positive number of seconds, got {timeout}");
                }
                let timeout = Duration::try_from_secs_f64(timeout)
                    .with_context(|| format!("invalid timeout of {timeout} s"))?;
                config = config.with_timeout(timeout);
            }
            config.validate()?;
            log::debug!("{config:?}");

            let molecules = match molecules {
                Some(path) => MoleculeSet::load(&path)
                    .with_context(|| format!("failed to load molecules {}", path.display()))?,
                None => MoleculeSet::tutorial(),
            };
            if molecules.is_empty() {
                bail!("no molecules to compute");
            }

            let generator = DistanceGeometry::new(config.embedding.clone());
            let driver = BatchDriver::new(generator, RhfSolver, config).with_jobs(jobs);
            let report = driver.run(&molecules);

            println!("{}", report.table());
            let failures = report.failure_table();
            if !failures.is_empty() {
                println!("{failures}");
            }
            println!("{}", report.summary());

            if let Some(path) = json {
                let contents = report.to_json()?;
                fs::write(&path, contents)
                    .with_context(|| format!("failed to write report to {}", path.display()))?;
            }

            if !report.all_succeeded() {
                bail!("{} of {} molecules failed", report.summary().failed, molecules.len());
            }
        }
        QcCommand::Embed { smiles } => {
            let geometry = DistanceGeometry::default().generate(&smiles, None)?;
            print!("{}", geometry.to_xyz(&smiles));
        }
    }

    Ok(())
}
