use std::fmt;
use std::fs;
use std::path::Path;
use std::str::FromStr;

use itertools::Itertools;
use uom::si::{
    angle::degree,
    f64::{Angle, Length},
    length::meter,
};

#[cfg(test)]
use proptest::{
    arbitrary::Arbitrary,
    strategy::{BoxedStrategy, Strategy},
};

/// Cardinal direction a building wall faces.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Facing {
    East,
    South,
    West,
    North,
}

impl Facing {
    pub const ALL: [Facing; 4] = [Facing::East, Facing::South, Facing::West, Facing::North];

    pub fn config(self) -> &'static FacingConfig {
        match self {
            Facing::East => &EAST,
            Facing::South => &SOUTH,
            Facing::West => &WEST,
            Facing::North => &NORTH,
        }
    }
}

impl FromStr for Facing {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.trim().to_ascii_lowercase().as_str() {
            "east" => Facing::East,
            "south" => Facing::South,
            "west" => Facing::West,
            "north" => Facing::North,
            _ => anyhow::bail!(
                "Unknown building facing {:?}, expected one of {}",
                s,
                Facing::ALL.iter().join(", ")
            ),
        })
    }
}

impl fmt::Display for Facing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Facing::East => "East",
            Facing::South => "South",
            Facing::West => "West",
            Facing::North => "North",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
impl Arbitrary for Facing {
    type Parameters = ();
    type Strategy = BoxedStrategy<Facing>;

    fn arbitrary_with(_args: Self::Parameters) -> Self::Strategy {
        proptest::sample::select(Facing::ALL.to_vec()).boxed()
    }
}

/// Range of sun azimuths in degrees, both ends inclusive.
/// When `start >= end` the range wraps through north (360° / 0°).
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct AzimuthInterval {
    pub start: f64,
    pub end: f64,
}

impl AzimuthInterval {
    pub const fn new(start: f64, end: f64) -> Self {
        AzimuthInterval { start, end }
    }

    pub fn wraps(&self) -> bool {
        self.start >= self.end
    }

    pub fn contains(&self, azimuth: f64) -> bool {
        if self.wraps() {
            azimuth >= self.start || azimuth <= self.end
        } else {
            self.start <= azimuth && azimuth <= self.end
        }
    }
}

/// Horizontal coordinate that stays constant (zero) across the facade plane.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum WallAxis {
    X,
    Y,
}

/// Static description of one building face.
#[derive(Clone, Debug, PartialEq)]
pub struct FacingConfig {
    /// Sun azimuths for which the sun is in front of the face
    pub azimuth_ranges: &'static [AzimuthInterval],
    pub wall_axis: WallAxis,
    /// Ground-plane offset of the reflection target from a window, in metres
    pub target_offset: [f64; 2],
}

impl FacingConfig {
    pub fn faces_azimuth(&self, azimuth: f64) -> bool {
        self.azimuth_ranges
            .iter()
            .any(|range| range.contains(azimuth))
    }
}

static EAST: FacingConfig = FacingConfig {
    azimuth_ranges: &[AzimuthInterval::new(45.0, 135.0)],
    wall_axis: WallAxis::X,
    target_offset: [10.0, 0.0],
};

static SOUTH: FacingConfig = FacingConfig {
    azimuth_ranges: &[AzimuthInterval::new(135.0, 225.0)],
    wall_axis: WallAxis::Y,
    target_offset: [0.0, 10.0],
};

static WEST: FacingConfig = FacingConfig {
    azimuth_ranges: &[AzimuthInterval::new(225.0, 315.0)],
    wall_axis: WallAxis::X,
    target_offset: [-10.0, 0.0],
};

static NORTH: FacingConfig = FacingConfig {
    azimuth_ranges: &[
        AzimuthInterval::new(315.0, 360.0),
        AzimuthInterval::new(0.0, 45.0),
    ],
    wall_axis: WallAxis::Y,
    target_offset: [0.0, -10.0],
};

/// Orientation of the street in front of the building.
/// Only reported back to the user, the reflection model does not use it.
#[derive(Copy, Clone, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum StreetOrientation {
    NorthSouth,
    EastWest,
}

impl fmt::Display for StreetOrientation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StreetOrientation::NorthSouth => f.write_str("North-South"),
            StreetOrientation::EastWest => f.write_str("East-West"),
        }
    }
}

/// Regular layout of mirror windows on the facade.
#[derive(Clone, Debug, PartialEq)]
pub struct GridLayout {
    pub rows: usize,
    pub columns: usize,
    pub horizontal_spacing: Length,
    pub vertical_spacing: Length,
    /// Height of the lowest window row above the ground
    pub base_height: Length,
}

impl Default for GridLayout {
    fn default() -> Self {
        GridLayout {
            rows: 10,
            columns: 5,
            horizontal_spacing: Length::new::<meter>(1.5),
            vertical_spacing: Length::new::<meter>(1.5),
            base_height: Length::new::<meter>(2.0),
        }
    }
}

#[cfg(test)]
impl Arbitrary for GridLayout {
    type Parameters = ();
    type Strategy = BoxedStrategy<GridLayout>;

    fn arbitrary_with(_args: Self::Parameters) -> Self::Strategy {
        (1usize..15, 1usize..10, 0.1f64..5f64, 0.1f64..5f64, 0f64..20f64)
            .prop_map(|tuple| GridLayout {
                rows: tuple.0,
                columns: tuple.1,
                horizontal_spacing: Length::new::<meter>(tuple.2),
                vertical_spacing: Length::new::<meter>(tuple.3),
                base_height: Length::new::<meter>(tuple.4),
            })
            .boxed()
    }
}

/// How far a mirror can be tilted away from the neutral orientation.
#[derive(Clone, Debug, PartialEq)]
pub struct MirrorLimits {
    /// Maximal swing within the facade plane, around the neutral azimuth
    pub max_phi: Angle,
    /// Maximal tilt up or down from horizontal
    pub max_theta: Angle,
}

impl Default for MirrorLimits {
    fn default() -> Self {
        MirrorLimits {
            max_phi: Angle::new::<degree>(50.0),
            max_theta: Angle::new::<degree>(50.0),
        }
    }
}

#[cfg(test)]
impl Arbitrary for MirrorLimits {
    type Parameters = ();
    type Strategy = BoxedStrategy<MirrorLimits>;

    fn arbitrary_with(_args: Self::Parameters) -> Self::Strategy {
        (1f64..180f64, 1f64..90f64)
            .prop_map(|tuple| MirrorLimits {
                max_phi: Angle::new::<degree>(tuple.0),
                max_theta: Angle::new::<degree>(tuple.1),
            })
            .boxed()
    }
}

/// Parameters of the reflection effort engine.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct EngineConfig {
    pub grid: GridLayout,
    pub mirror: MirrorLimits,
}

impl EngineConfig {
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let string = fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("Could not read config {}: {}", path.display(), e))?;
        Self::from_json(&string)
    }

    pub fn from_json(json: &str) -> anyhow::Result<Self> {
        let loaded: as_loaded::EngineConfig = json5::from_str(json)?;
        let converted = loaded.try_into()?;
        Ok(converted)
    }
}

impl TryFrom<as_loaded::EngineConfig> for EngineConfig {
    type Error = anyhow::Error;
    fn try_from(value: as_loaded::EngineConfig) -> Result<Self, Self::Error> {
        Ok(EngineConfig {
            grid: value.grid.convert()?,
            mirror: value.mirror.convert()?,
        })
    }
}

mod as_loaded {
    use serde::Deserialize;
    use uom::si::{
        angle::degree,
        f64::{Angle, Length},
        length::meter,
    };

    /// Every key is optional, missing ones fall back to the defaults
    #[derive(Clone, Debug, Default, Deserialize, PartialEq)]
    #[serde(deny_unknown_fields)]
    pub struct EngineConfig {
        #[serde(default)]
        pub grid: GridLayout,
        #[serde(default)]
        pub mirror: MirrorLimits,
    }

    #[derive(Clone, Debug, Default, Deserialize, PartialEq)]
    #[serde(deny_unknown_fields)]
    pub struct GridLayout {
        pub rows: Option<usize>,
        pub columns: Option<usize>,
        pub horizontal_spacing: Option<Length>,
        pub vertical_spacing: Option<Length>,
        pub base_height: Option<Length>,
    }

    impl GridLayout {
        pub fn convert(self) -> anyhow::Result<super::GridLayout> {
            let default = super::GridLayout::default();
            let converted = super::GridLayout {
                rows: self.rows.unwrap_or(default.rows),
                columns: self.columns.unwrap_or(default.columns),
                horizontal_spacing: self
                    .horizontal_spacing
                    .unwrap_or(default.horizontal_spacing),
                vertical_spacing: self.vertical_spacing.unwrap_or(default.vertical_spacing),
                base_height: self.base_height.unwrap_or(default.base_height),
            };

            if converted.rows == 0 || converted.columns == 0 {
                anyhow::bail!(
                    "Window grid must have at least one row and column, got {}x{}",
                    converted.rows,
                    converted.columns
                );
            }
            for (label, spacing) in [
                ("horizontal_spacing", converted.horizontal_spacing),
                ("vertical_spacing", converted.vertical_spacing),
            ] {
                let spacing = spacing.get::<meter>();
                if !(spacing.is_finite() && spacing > 0.0) {
                    anyhow::bail!("Grid {} must be positive, got {}", label, spacing);
                }
            }
            let base_height = converted.base_height.get::<meter>();
            if !(base_height.is_finite() && base_height >= 0.0) {
                anyhow::bail!("Grid base_height must not be negative, got {}", base_height);
            }
            Ok(converted)
        }
    }

    /// Limits are given in degrees
    #[derive(Clone, Debug, Default, Deserialize, PartialEq)]
    #[serde(deny_unknown_fields)]
    pub struct MirrorLimits {
        pub max_phi: Option<f64>,
        pub max_theta: Option<f64>,
    }

    impl MirrorLimits {
        pub fn convert(self) -> anyhow::Result<super::MirrorLimits> {
            let default = super::MirrorLimits::default();
            let max_phi = limit("max_phi", self.max_phi, default.max_phi, 180.0)?;
            let max_theta = limit("max_theta", self.max_theta, default.max_theta, 90.0)?;
            Ok(super::MirrorLimits { max_phi, max_theta })
        }
    }

    fn limit(label: &str, value: Option<f64>, default: Angle, max: f64) -> anyhow::Result<Angle> {
        match value {
            None => Ok(default),
            Some(value) if value > 0.0 && value <= max => Ok(Angle::new::<degree>(value)),
            Some(value) => anyhow::bail!(
                "Mirror {} must be within (0, {}] degrees, got {}",
                label,
                max,
                value
            ),
        }
    }
}
