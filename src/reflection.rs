//! Mirror orientation and effort model.
//!
//! Every window of the facade carries a flat mirror that should redirect the
//! sun into a target area on the ground in front of the building. For a
//! given sun position the required mirror normal follows from the law of
//! reflection; the effort score measures how far that normal is from the
//! neutral orientation of the mirror.

use itertools::Itertools;
use nalgebra::{DMatrix, Vector3};
use tracing::{debug, trace, warn};
use uom::si::{
    angle::{degree, radian},
    f64::Angle,
    length::meter,
};

use crate::model::{EngineConfig, Facing, FacingConfig, GridLayout, MirrorLimits, WallAxis};
use crate::tools::sun::SunPosition;

/// Shortest vector that is still treated as a direction.
const MIN_DIRECTION_NORM: f64 = 1e-12;

/// Effort of a mirror that can't reach the required orientation.
pub const INFEASIBLE: f64 = 1.0;

/// Whether the sun shines on the face: above the horizon and in front of it.
pub fn is_sun_visible(sun: &SunPosition, facing: &FacingConfig) -> bool {
    sun.elevation.get::<degree>() > 0.0 && facing.faces_azimuth(sun.azimuth.get::<degree>())
}

/// A single mirror window and the ground point it should light up.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Window {
    pub row: usize,
    pub column: usize,
    pub position: Vector3<f64>,
    pub target: Vector3<f64>,
}

impl Window {
    /// Window at `row` (counted from the lowest one) and `column`.
    /// Columns are centered on the facade, the wall plane itself is at zero
    /// of the facing's wall axis.
    pub fn new(layout: &GridLayout, facing: &FacingConfig, row: usize, column: usize) -> Self {
        let dy = layout.horizontal_spacing.get::<meter>();
        let dz = layout.vertical_spacing.get::<meter>();
        let along = column as f64 * dy - (layout.columns - 1) as f64 * dy / 2.0;
        let height = row as f64 * dz + layout.base_height.get::<meter>();
        let [offset_x, offset_y] = facing.target_offset;

        let (position, target) = match facing.wall_axis {
            WallAxis::X => (
                Vector3::new(0.0, along, height),
                Vector3::new(offset_x, along + offset_y, 0.0),
            ),
            WallAxis::Y => (
                Vector3::new(along, 0.0, height),
                Vector3::new(along + offset_x, offset_y, 0.0),
            ),
        };

        Window {
            row,
            column,
            position,
            target,
        }
    }
}

/// All windows of the layout, row by row starting from the lowest.
pub fn window_grid(layout: &GridLayout, facing: &FacingConfig) -> Vec<Window> {
    (0..layout.rows)
        .cartesian_product(0..layout.columns)
        .map(|(row, column)| Window::new(layout, facing, row, column))
        .collect()
}

/// Mirror normal that reflects the sun into the window's target.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct MirrorOrientation {
    pub normal: Vector3<f64>,
    /// Angle between the normal and the vertical, 90° is horizontal
    pub theta: Angle,
    /// Direction of the normal within the horizontal plane, (-180°, 180°]
    pub phi: Angle,
}

impl MirrorOrientation {
    /// Orientation needed to send sunlight arriving along `-sun_vector` from
    /// `window` to its target.
    ///
    /// Fails when the geometry does not define a mirror plane, i.e. the
    /// target coincides with the window or the light would have to be sent
    /// straight back to the sun.
    pub fn for_window(sun_vector: &Vector3<f64>, window: &Window) -> anyhow::Result<Self> {
        let incident = -*sun_vector;
        let outgoing = (window.target - window.position)
            .try_normalize(MIN_DIRECTION_NORM)
            .ok_or_else(|| {
                anyhow::anyhow!(
                    "Target of window ({}, {}) coincides with the window",
                    window.row,
                    window.column
                )
            })?;
        let normal = (incident + outgoing)
            .try_normalize(MIN_DIRECTION_NORM)
            .ok_or_else(|| {
                anyhow::anyhow!(
                    "Window ({}, {}) would have to reflect the sun back onto itself",
                    window.row,
                    window.column
                )
            })?;

        Ok(MirrorOrientation {
            normal,
            theta: Angle::new::<radian>(normal.z.clamp(-1.0, 1.0).acos()),
            phi: Angle::new::<radian>(normal.y.atan2(normal.x)),
        })
    }

    pub fn effort(&self, limits: &MirrorLimits) -> f64 {
        effort_score(self.theta, self.phi, limits)
    }
}

/// Normalized distance of a mirror orientation from the neutral one
/// (theta = 90°, phi = 0°), in [0, 1].
///
/// Both angles contribute linearly, relative to their limits. Exceeding
/// either limit alone makes the mirror infeasible, even when the average
/// would stay below one.
pub fn effort_score(theta: Angle, phi: Angle, limits: &MirrorLimits) -> f64 {
    let tilt = (theta.get::<degree>() - 90.0).abs();
    let swing = phi.get::<degree>().abs();
    let max_theta = limits.max_theta.get::<degree>();
    let max_phi = limits.max_phi.get::<degree>();

    if swing > max_phi || tilt > max_theta {
        return INFEASIBLE;
    }
    ((tilt / max_theta + swing / max_phi) / 2.0).min(INFEASIBLE)
}

/// Effort score of every window. Row 0 is the lowest row of windows.
#[derive(Clone, Debug, PartialEq)]
pub struct EffortGrid {
    cells: DMatrix<f64>,
}

/// Statistics over the mirrors that can reach their target.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct WorkingSummary {
    pub count: usize,
    pub min_effort: f64,
    pub mean_effort: f64,
}

impl EffortGrid {
    pub fn from_matrix(cells: DMatrix<f64>) -> Self {
        EffortGrid { cells }
    }

    pub fn rows(&self) -> usize {
        self.cells.nrows()
    }

    pub fn columns(&self) -> usize {
        self.cells.ncols()
    }

    pub fn get(&self, row: usize, column: usize) -> f64 {
        self.cells[(row, column)]
    }

    fn is_working(effort: f64) -> bool {
        effort < INFEASIBLE
    }

    /// Share of mirrors that can reflect light at all, in percent.
    pub fn percent_working(&self) -> f64 {
        let total = self.cells.len();
        if total == 0 {
            return 0.0;
        }
        let working = self.cells.iter().filter(|e| Self::is_working(**e)).count();
        100.0 * working as f64 / total as f64
    }

    pub fn working_summary(&self) -> Option<WorkingSummary> {
        let working: Vec<f64> = self
            .cells
            .iter()
            .copied()
            .filter(|e| Self::is_working(*e))
            .collect();
        let min_effort = working.iter().copied().reduce(f64::min)?;
        Some(WorkingSummary {
            count: working.len(),
            min_effort,
            mean_effort: working.iter().sum::<f64>() / working.len() as f64,
        })
    }
}

#[cfg(test)]
impl EffortGrid {
    pub fn filled(rows: usize, columns: usize, effort: f64) -> Self {
        EffortGrid {
            cells: DMatrix::from_element(rows, columns, effort),
        }
    }

    pub fn as_matrix(&self) -> &DMatrix<f64> {
        &self.cells
    }
}

/// Result of computing a sun configuration for the whole facade.
#[derive(Clone, Debug, PartialEq)]
pub struct EffortReport {
    pub facing: Facing,
    pub sun: SunPosition,
    pub sun_vector: Vector3<f64>,
    pub grid: EffortGrid,
    pub percent_working: f64,
}

#[derive(Clone, Debug, PartialEq)]
pub enum Outcome {
    /// The sun is below the horizon or behind the building, nothing to compute
    NotVisible { facing: Facing, sun: SunPosition },
    Computed(EffortReport),
}

#[derive(Clone, Debug, Default)]
pub struct ReflectionEngine {
    config: EngineConfig,
}

impl ReflectionEngine {
    pub fn new(config: EngineConfig) -> Self {
        ReflectionEngine { config }
    }

    /// Same as [`run`](Self::run), with the facing given by name.
    pub fn run_named(&self, facing: &str, sun: &SunPosition) -> anyhow::Result<Outcome> {
        Ok(self.run(facing.parse()?, sun))
    }

    pub fn run(&self, facing: Facing, sun: &SunPosition) -> Outcome {
        let facing_config = facing.config();
        if !is_sun_visible(sun, facing_config) {
            debug!(
                %facing,
                azimuth = sun.azimuth.get::<degree>(),
                elevation = sun.elevation.get::<degree>(),
                "sun not visible"
            );
            return Outcome::NotVisible { facing, sun: *sun };
        }

        let sun_vector = sun.sun_vector();
        let grid = self.effort_grid(facing_config, &sun_vector);
        let percent_working = grid.percent_working();
        debug!(
            %facing,
            azimuth = sun.azimuth.get::<degree>(),
            elevation = sun.elevation.get::<degree>(),
            percent_working,
            "effort grid computed"
        );

        Outcome::Computed(EffortReport {
            facing,
            sun: *sun,
            sun_vector,
            grid,
            percent_working,
        })
    }

    /// Effort of every window for the given sun direction, without checking
    /// whether the sun actually shines on the facade.
    pub fn effort_grid(&self, facing: &FacingConfig, sun_vector: &Vector3<f64>) -> EffortGrid {
        let layout = &self.config.grid;
        let mut cells = DMatrix::from_element(layout.rows, layout.columns, INFEASIBLE);
        for window in window_grid(layout, facing) {
            cells[(window.row, window.column)] =
                match MirrorOrientation::for_window(sun_vector, &window) {
                    Ok(orientation) => {
                        trace!(
                            row = window.row,
                            column = window.column,
                            normal = ?orientation.normal,
                            "mirror orientation"
                        );
                        orientation.effort(&self.config.mirror)
                    }
                    Err(e) => {
                        warn!("{e}, marking the mirror as infeasible");
                        INFEASIBLE
                    }
                };
        }
        EffortGrid::from_matrix(cells)
    }
}
