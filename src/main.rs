use std::path::Path;

use clap::Parser;
use fiberlay::{
    input, material, optimize_layout, post_processor, FlattenError, StrainEnergyProblem,
};

/// Relaxes a fiber course layout toward its reference shape
#[derive(Parser, Debug)]
#[command(name = "fiberlay", version, about)]
struct Cli {
    /// Input json with material, reference geometry, layout and elements
    input: String,

    /// Directory for layout.csv and energy.csv
    #[arg(short, long, default_value = ".")]
    output_dir: String,

    /// Overrides the optimizer step size from the input file
    #[arg(long)]
    step_size: Option<f64>,

    /// Overrides the iteration budget from the input file
    #[arg(long)]
    iterations: Option<u64>,

    /// Hide the progress bar
    #[arg(short, long)]
    quiet: bool,

    /// Log every iteration
    #[arg(long)]
    log: bool,
}

fn run(cli: &Cli) -> Result<(), FlattenError> {
    let mut flattening_input = input::load_input_file(&cli.input)?;
    println!(
        "info: loaded {} triangles over {} vertices",
        flattening_input.mesh.elements.len(),
        flattening_input.mesh.vertex_count
    );

    material::validate_stiffness(&flattening_input.stiffness)?;

    let settings = &mut flattening_input.settings;
    if let Some(step_size) = cli.step_size {
        settings.step_size = step_size;
    }
    if let Some(iterations) = cli.iterations {
        settings.iterations = iterations;
    }
    settings.show_progress = !cli.quiet;
    settings.log_iterations = cli.log;

    let problem = StrainEnergyProblem::new(flattening_input.mesh, flattening_input.stiffness);

    println!(
        "info: running {} iterations with step size {:e}...",
        flattening_input.settings.iterations, flattening_input.settings.step_size
    );
    let start = std::time::Instant::now();
    let result = optimize_layout(
        &problem,
        &flattening_input.initial_layout,
        &flattening_input.settings,
    )?;
    let elapsed = (std::time::Instant::now() - start).as_secs_f32();

    println!("info: starting strain energy {:e}", result.initial_energy);
    println!(
        "info: final strain energy {:e} after {:.3} seconds",
        result.final_energy(),
        elapsed
    );
    if result.final_energy() > result.initial_energy {
        println!("warning: strain energy increased, the step size may be too large");
    }

    let output_dir = Path::new(&cli.output_dir);
    if let Err(err) = std::fs::create_dir_all(output_dir) {
        return Err(FlattenError::PostProcessor(format!(
            "Unable to create output directory {}: {err}",
            cli.output_dir
        )));
    }
    let layout_output = output_dir.join("layout.csv");
    let energy_output = output_dir.join("energy.csv");

    post_processor::csv_output(
        &flattening_input.initial_layout,
        &result,
        &layout_output.to_string_lossy(),
        &energy_output.to_string_lossy(),
    )
}

fn main() {
    let cli = Cli::parse();

    if let Err(err) = run(&cli) {
        println!("{err}");
        std::process::exit(1)
    }
}
