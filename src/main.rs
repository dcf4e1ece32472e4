mod model;
mod reflection;
mod render;
mod tools;

use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;
use uom::si::angle::degree;

use model::*;
use reflection::*;
use tools::sun::*;

#[derive(Parser)]
#[command(
    name = "mirror_planner",
    about = "Estimate how hard it is for window mirrors to reflect sunlight onto the street"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Simulate the mirror grid at a given hour after sunrise
    Simulate {
        #[command(flatten)]
        location: LocationArgs,
        /// Orientation of the street in front of the building (display only)
        #[arg(long, value_enum, default_value_t = StreetOrientation::NorthSouth)]
        street: StreetOrientation,
        /// Direction the building face points to: East, South, West or North
        #[arg(long, default_value = "East")]
        facing: String,
        /// Whole hours after sunrise
        #[arg(long, default_value_t = 0)]
        hour: u32,
        /// Engine configuration (json5)
        #[arg(long)]
        config: Option<PathBuf>,
    },
    /// Print sunrise, sunset and the selectable hours of a day
    Daylight {
        #[command(flatten)]
        location: LocationArgs,
    },
    /// Simulate the mirror grid for an explicit sun position
    Sun {
        /// Sun azimuth in degrees, clockwise from north
        #[arg(long, allow_negative_numbers = true)]
        azimuth: f64,
        /// Sun elevation above the horizon in degrees
        #[arg(long, allow_negative_numbers = true)]
        elevation: f64,
        /// Direction the building face points to: East, South, West or North
        #[arg(long)]
        facing: String,
        /// Engine configuration (json5)
        #[arg(long)]
        config: Option<PathBuf>,
    },
}

#[derive(Args)]
struct LocationArgs {
    #[arg(long, default_value = "New York")]
    city: String,
    #[arg(long, default_value = "USA")]
    country: String,
    /// Latitude in degrees, north positive
    #[arg(long, default_value_t = 40.7128, allow_negative_numbers = true)]
    latitude: f64,
    /// Longitude in degrees, east positive
    #[arg(long, default_value_t = -74.0060, allow_negative_numbers = true)]
    longitude: f64,
    /// IANA time zone name
    #[arg(long, default_value = "America/New_York")]
    timezone: String,
    /// Local calendar date (YYYY-MM-DD)
    #[arg(long, default_value = "2025-03-27")]
    date: NaiveDate,
}

fn main() -> anyhow::Result<()> {
    init_tracing();
    let cli = Cli::parse();

    match cli.command {
        Commands::Simulate {
            location,
            street,
            facing,
            hour,
            config,
        } => simulate(&SpaProvider, &location, street, &facing, hour, config),
        Commands::Daylight { location } => daylight(&SpaProvider, &location),
        Commands::Sun {
            azimuth,
            elevation,
            facing,
            config,
        } => {
            let engine = ReflectionEngine::new(load_config(config)?);
            let outcome = engine.run_named(&facing, &SunPosition::from_degrees(azimuth, elevation))?;
            print_outcome(&outcome);
            Ok(())
        }
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();
}

fn load_config(path: Option<PathBuf>) -> anyhow::Result<EngineConfig> {
    match path {
        Some(path) => {
            info!(path = %path.display(), "loading engine config");
            EngineConfig::load(path)
        }
        None => Ok(EngineConfig::default()),
    }
}

fn daylight(provider: &impl SolarPositionProvider, location: &LocationArgs) -> anyhow::Result<()> {
    let timezone = parse_timezone(&location.timezone)?;
    let daylight = provider.daylight(
        location.date,
        location.latitude,
        location.longitude,
        timezone,
    )?;

    println!("{}, {} on {}", location.city, location.country, location.date);
    println!("Sunrise: {}", daylight.sunrise.format("%H:%M %Z"));
    println!("Sunset:  {}", daylight.sunset.format("%H:%M %Z"));
    println!("Hours from sunrise: 0..={}", daylight.hour_slots()? - 1);
    Ok(())
}

fn simulate(
    provider: &impl SolarPositionProvider,
    location: &LocationArgs,
    street: StreetOrientation,
    facing: &str,
    hour: u32,
    config: Option<PathBuf>,
) -> anyhow::Result<()> {
    let facing: Facing = facing.parse()?;
    let engine = ReflectionEngine::new(load_config(config)?);
    let timezone = parse_timezone(&location.timezone)?;
    info!(
        city = %location.city,
        country = %location.country,
        latitude = location.latitude,
        longitude = location.longitude,
        %street,
        %facing,
        date = %location.date,
        hour,
        "simulating"
    );

    let daylight = provider.daylight(
        location.date,
        location.latitude,
        location.longitude,
        timezone,
    )?;
    let datetime = daylight.at_hour(hour)?;
    let sun = provider.solar_position(&datetime, location.latitude, location.longitude)?;

    println!("Sun position at {}", datetime.format("%H:%M"));
    println!(
        "Azimuth: {:.2}°, Elevation: {:.2}°",
        sun.azimuth.get::<degree>(),
        sun.elevation.get::<degree>()
    );
    print_outcome(&engine.run(facing, &sun));
    Ok(())
}

fn print_outcome(outcome: &Outcome) {
    match outcome {
        Outcome::NotVisible { facing, sun } => {
            println!(
                "The sun (azimuth {:.1}°, elevation {:.1}°) is not in front of the {} building face at this time.",
                sun.azimuth.get::<degree>(),
                sun.elevation.get::<degree>(),
                facing
            );
        }
        Outcome::Computed(report) => {
            let v = report.sun_vector;
            println!(
                "{} face, sun azimuth {:.1}°, elevation {:.1}°, direction ({:.3}, {:.3}, {:.3})",
                report.facing,
                report.sun.azimuth.get::<degree>(),
                report.sun.elevation.get::<degree>(),
                v.x,
                v.y,
                v.z
            );
            println!("{}", report.grid.to_heatmap());
            if let Some(summary) = report.grid.working_summary() {
                println!(
                    "{} working mirrors, lowest effort {:.2}, mean effort {:.2}",
                    summary.count, summary.min_effort, summary.mean_effort
                );
            }
            println!(
                "{:.1}% of mirrors can reflect light at this time.",
                report.percent_working
            );
        }
    }
}
