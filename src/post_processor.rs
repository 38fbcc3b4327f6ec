use std::io::Write;

use tracing::info;

use crate::{
    datatypes::{AnalysisReport, CellState, Grid},
    error::Result,
};

/// Renders the layout as text, one line per grid row, top row first
pub fn render_grid(grid: &Grid) -> String {
    let resolution = grid.resolution;
    let mut out = String::with_capacity((2 * resolution.nelx + 1) * resolution.nely * 3);

    for row in 0..resolution.nely {
        for col in 0..resolution.nelx {
            out.push_str(match grid.get(row, col) {
                CellState::Solid => "██",
                CellState::Void => "  ",
            });
        }
        out.push('\n');
    }

    out
}

/// Writes the per-element stress field
///
/// # Arguments
/// * `report` - A finished analysis
/// * `writer` - Destination for `col,row,sigma_x,sigma_y` rows
pub fn write_stress_csv<W: Write>(report: &AnalysisReport, mut writer: W) -> Result<()> {
    let nely = report.grid.resolution.nely;

    writeln!(writer, "col,row,sigma_x,sigma_y")?;
    for stress in &report.stress_field {
        writeln!(
            writer,
            "{col},{row},{sx},{sy}",
            col = stress.element / nely,
            row = stress.element % nely,
            sx = stress.sigma_x,
            sy = stress.sigma_y,
        )?;
    }
    writer.flush()?;

    Ok(())
}

/// Writes the stress field to a CSV file
pub fn csv_output(report: &AnalysisReport, elements_output: &str) -> Result<()> {
    let file = std::fs::File::create(elements_output)?;
    write_stress_csv(report, std::io::BufWriter::new(file))?;

    info!("wrote element stresses to {}", elements_output);

    Ok(())
}
