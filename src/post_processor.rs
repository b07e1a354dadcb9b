use std::io::Write;

use crate::{
    datatypes::{FlatteningResult, Vertex},
    error::FlattenError,
};

fn create_file(path: &str) -> Result<std::fs::File, FlattenError> {
    match std::fs::File::create(path) {
        Ok(f) => Ok(f),
        Err(err) => Err(FlattenError::PostProcessor(format!(
            "Failed to create {path}: {err}"
        ))),
    }
}

fn write_error(path: &str) -> impl Fn(std::io::Error) -> FlattenError + '_ {
    move |err| FlattenError::PostProcessor(format!("Failed to write {path}: {err}"))
}

/// Writes optimization results to two CSV files
///
/// # Arguments
/// * `initial_layout` - The layout the optimizer started from
/// * `result` - The optimizer result
/// * `layout_output` - The filename of the output layout csv
/// * `energy_output` - The filename of the output energy csv
pub fn csv_output(
    initial_layout: &[Vertex],
    result: &FlatteningResult,
    layout_output: &str,
    energy_output: &str,
) -> Result<(), FlattenError> {
    if initial_layout.len() != result.layout.len() {
        return Err(FlattenError::PostProcessor(format!(
            "Initial layout has {} vertices but the result has {}",
            initial_layout.len(),
            result.layout.len()
        )));
    }

    let mut layout_file = create_file(layout_output)?;
    let mut energy_file = create_file(energy_output)?;

    // Write layout
    writeln!(layout_file, "vertex,u0,v0,u,v").map_err(write_error(layout_output))?;
    for (i, (start, end)) in std::iter::zip(initial_layout, &result.layout).enumerate() {
        writeln!(
            layout_file,
            "{i},{u0},{v0},{u},{v}",
            u0 = start.x,
            v0 = start.y,
            u = end.x,
            v = end.y,
        )
        .map_err(write_error(layout_output))?;
    }

    // Write energy trajectory, row 0 is the starting energy
    writeln!(energy_file, "iteration,energy").map_err(write_error(energy_output))?;
    writeln!(energy_file, "0,{}", result.initial_energy).map_err(write_error(energy_output))?;
    for (i, energy) in result.energy_trajectory.iter().enumerate() {
        writeln!(energy_file, "{},{}", i + 1, energy).map_err(write_error(energy_output))?;
    }

    println!(
        "info: wrote output to {} and {}",
        layout_output, energy_output
    );

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn writes_layout_and_trajectory() {
        let dir = std::env::temp_dir().join(format!("fiberlay-csv-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let layout_path = dir.join("layout.csv");
        let energy_path = dir.join("energy.csv");

        let initial = vec![Vertex::new(0.0, 0.0), Vertex::new(2.0, 0.0)];
        let result = FlatteningResult {
            layout: vec![Vertex::new(0.5, 0.0), Vertex::new(1.5, 0.0)],
            initial_energy: 3.0,
            energy_trajectory: vec![2.0, 1.0],
        };

        csv_output(
            &initial,
            &result,
            layout_path.to_str().unwrap(),
            energy_path.to_str().unwrap(),
        )
        .unwrap();

        let layout_csv = std::fs::read_to_string(&layout_path).unwrap();
        let energy_csv = std::fs::read_to_string(&energy_path).unwrap();
        assert_eq!(layout_csv, "vertex,u0,v0,u,v\n0,0,0,0.5,0\n1,2,0,1.5,0\n");
        assert_eq!(energy_csv, "iteration,energy\n0,3\n1,2\n2,1\n");

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn mismatched_layouts_are_rejected() {
        let result = FlatteningResult {
            layout: vec![Vertex::new(0.0, 0.0)],
            initial_energy: 0.0,
            energy_trajectory: vec![],
        };
        assert!(matches!(
            csv_output(&[], &result, "unused-layout.csv", "unused-energy.csv"),
            Err(FlattenError::PostProcessor(_))
        ));
    }
}
