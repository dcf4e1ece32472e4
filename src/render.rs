use std::fmt;

use crate::reflection::{EffortGrid, INFEASIBLE};

/// Shades for working mirrors, from easy to hard, each covering a fifth of [0, 1).
const SHADES: [char; 5] = ['.', ':', '+', '*', '#'];
const INFEASIBLE_SHADE: char = 'X';

/// Text heatmap of an effort grid, the highest row of windows on top.
#[derive(Copy, Clone, Debug)]
pub struct HeatmapDisplayer<'a> {
    grid: &'a EffortGrid,
}

impl EffortGrid {
    pub fn to_heatmap(&self) -> HeatmapDisplayer<'_> {
        HeatmapDisplayer { grid: self }
    }
}

pub fn shade(effort: f64) -> char {
    if effort >= INFEASIBLE {
        return INFEASIBLE_SHADE;
    }
    let index = (effort.max(0.0) * SHADES.len() as f64) as usize;
    SHADES[index.min(SHADES.len() - 1)]
}

impl<'a> fmt::Display for HeatmapDisplayer<'a> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let g = self.grid;
        let label_width = g.rows().saturating_sub(1).to_string().len();

        writeln!(f, "Mirror effort grid (0 = easy, 1 = impossible)")?;
        for row in (0..g.rows()).rev() {
            write!(f, "row {:>width$} |", row, width = label_width)?;
            for column in 0..g.columns() {
                write!(f, " {:>2}", shade(g.get(row, column)))?;
            }
            writeln!(f)?;
        }

        write!(f, "    {:>width$}  ", "", width = label_width)?;
        for column in 0..g.columns() {
            write!(f, " {:>2}", column)?;
        }
        writeln!(f)?;

        write!(f, "legend:")?;
        for (index, shade) in SHADES.iter().enumerate() {
            write!(f, " {} <{:.1}", shade, (index + 1) as f64 / SHADES.len() as f64)?;
        }
        write!(f, " {} infeasible", INFEASIBLE_SHADE)
    }
}
