//! csgrn CLI - compile CSG scene files for the GPU ray marcher
//!
//! Checks, dumps and compiles scene files into the three GPU buffers.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::level_filters::LevelFilter;

use csgrn::{Compiled, CsgrnError, Diagnostic, SceneError, Settings};

mod export;

use export::BinaryExport;

/// Settings file picked up from the working directory when `--config` is absent.
const DEFAULT_CONFIG: &str = "csgrn.toml";

#[derive(Parser)]
#[command(name = "csgrn")]
#[command(about = "Compile CSG scene files into GPU ray marching buffers", long_about = None)]
struct Cli {
    /// Settings file (default: ./csgrn.toml if present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// More log output (-v warnings, -vv info, -vvv debug)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// No log output
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Parse, flatten and validate a scene
    Check {
        /// Scene file
        file: PathBuf,
    },
    /// Print the flattened instruction program
    Dump {
        /// Scene file
        file: PathBuf,
    },
    /// Write GPU buffers for a scene
    Compile {
        /// Scene file
        file: PathBuf,
        /// Output directory
        #[arg(short, long)]
        output: PathBuf,
        /// Also write the flattened scene as scene.json
        #[arg(long)]
        json: bool,
    },
    /// Display information about a scene
    Info {
        /// Scene file
        file: PathBuf,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.quiet);

    let settings = load_settings(cli.config.as_deref())?;

    match cli.command {
        Commands::Check { file } => check(&file, &settings)?,
        Commands::Dump { file } => {
            let compiled = compile(&file, &settings)?;
            print!("{}", compiled.flat);
        }
        Commands::Compile { file, output, json } => {
            compile_to_dir(&file, &output, json, &settings)?;
        }
        Commands::Info { file } => show_info(&file, &settings)?,
    }

    Ok(())
}

fn init_logging(verbose: u8, quiet: bool) {
    let level = if quiet {
        LevelFilter::OFF
    } else {
        match verbose {
            0 => LevelFilter::ERROR,
            1 => LevelFilter::WARN,
            2 => LevelFilter::INFO,
            _ => LevelFilter::DEBUG,
        }
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();
}

fn load_settings(path: Option<&Path>) -> Result<Settings> {
    match path {
        Some(path) => Settings::load(path)
            .with_context(|| format!("failed to load settings from {}", path.display())),
        None if Path::new(DEFAULT_CONFIG).exists() => Settings::load(DEFAULT_CONFIG)
            .with_context(|| format!("failed to load settings from {DEFAULT_CONFIG}")),
        None => Ok(Settings::default()),
    }
}

fn print_diagnostics(file: &Path, diagnostics: &[Diagnostic]) {
    for d in diagnostics {
        eprintln!("{}:{}", file.display(), d);
    }
}

/// Compile a scene, printing its diagnostics whether or not it loads.
fn compile(file: &Path, settings: &Settings) -> Result<Compiled> {
    match csgrn::compile_file(file, settings) {
        Ok(compiled) => {
            print_diagnostics(file, &compiled.diagnostics);
            Ok(compiled)
        }
        Err(CsgrnError::Scene(SceneError::NoRoot { diagnostics })) => {
            print_diagnostics(file, &diagnostics);
            anyhow::bail!("{}: scene has no root node", file.display());
        }
        Err(e) => Err(e).with_context(|| format!("failed to compile {}", file.display())),
    }
}

fn check(file: &Path, settings: &Settings) -> Result<()> {
    let compiled = compile(file, settings)?;

    println!(
        "{}: ok ({} primitives, {} operations, {} instructions, {} diagnostics)",
        file.display(),
        compiled.stats.primitives,
        compiled.stats.operations,
        compiled.stats.instructions,
        compiled.diagnostics.len()
    );
    if !compiled.fits_evaluator(settings) {
        println!(
            "warning: program needs a stack depth of {}, evaluator provides {}",
            compiled.stats.max_stack_depth, settings.gpu.evaluator_stack_depth
        );
    }
    Ok(())
}

fn compile_to_dir(file: &Path, output: &Path, json: bool, settings: &Settings) -> Result<()> {
    let compiled = compile(file, settings)?;

    let scene_json = if json {
        Some(serde_json::to_string_pretty(&compiled.flat)?)
    } else {
        None
    };

    let mut export = BinaryExport::new(output);
    compiled
        .submit(&mut export)
        .with_context(|| format!("failed to write buffers to {}", output.display()))?;

    if let Some(scene_json) = scene_json {
        fs::write(output.join("scene.json"), scene_json)?;
    }

    println!(
        "Compiled {} to {} ({} bytes)",
        file.display(),
        output.display(),
        export.written()
    );
    Ok(())
}

fn show_info(file: &Path, settings: &Settings) -> Result<()> {
    let compiled = compile(file, settings)?;
    let tree = compiled.tree_stats;

    println!("csgrn scene: {}", file.display());
    println!("  Primitives: {}", tree.leaves);
    println!("  Operations: {}", tree.operations);
    println!("  Tree depth: {}", tree.depth);
    println!("  Diagnostics: {}", compiled.diagnostics.len());

    println!("\nProgram:");
    println!("  Instructions: {}", compiled.stats.instructions);
    println!(
        "  Max stack depth: {} (evaluator: {})",
        compiled.stats.max_stack_depth, settings.gpu.evaluator_stack_depth
    );

    println!("\nBuffers:");
    println!("  primitives.bin: {} bytes", compiled.gpu.primitive_bytes().len());
    println!("  operations.bin: {} bytes", compiled.gpu.operation_bytes().len());
    println!("  instructions.bin: {} bytes", compiled.gpu.instruction_bytes().len());
    println!("  Total: {} bytes", compiled.gpu.total_bytes());

    Ok(())
}
