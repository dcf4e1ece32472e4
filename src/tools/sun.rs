use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};
use chrono_tz::Tz;
use nalgebra::Vector3;
use spa::SunriseAndSet;
use uom::si::{angle::degree, f64::Angle, ratio::ratio};

use super::normalize_azimuth;

/// Get three dimensional Vector from azimuth and elevation angle.
///
/// Output vector coordinate system is following:
/// - north -> positive x axis / south -> negative x axis
/// - east -> positive y axis / west -> negative y axis
/// - z: up
///
/// # Arguments
/// * `azimuth` - angle between north and the sun, clockwise
/// * `elevation_angle` - angle between the sun and the horizon
///
/// # Returns
/// * `Vector3<f64>` - three dimensional unit vector
pub fn get_vector_from_azimuth_elevation(azimuth: &Angle, elevation_angle: &Angle) -> Vector3<f64> {
    let x = azimuth.cos().get::<ratio>() * elevation_angle.cos().get::<ratio>();
    let y = azimuth.sin().get::<ratio>() * elevation_angle.cos().get::<ratio>();
    let z = elevation_angle.sin().get::<ratio>();
    Vector3::new(x, y, z).normalize()
}

/// Position of the sun on the sky as seen from the observer.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct SunPosition {
    /// Compass bearing, 0° is north, clockwise, in [0°, 360°)
    pub azimuth: Angle,
    /// Angle above the horizon, negative below it
    pub elevation: Angle,
}

impl SunPosition {
    pub fn from_degrees(azimuth: f64, elevation: f64) -> Self {
        SunPosition {
            azimuth: Angle::new::<degree>(normalize_azimuth(azimuth)),
            elevation: Angle::new::<degree>(elevation),
        }
    }

    pub fn sun_vector(&self) -> Vector3<f64> {
        get_vector_from_azimuth_elevation(&self.azimuth, &self.elevation)
    }
}

/// Sunrise and sunset of a single local day.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Daylight {
    pub sunrise: DateTime<Tz>,
    pub sunset: DateTime<Tz>,
}

impl Daylight {
    /// Number of whole-hour offsets from sunrise that can be selected, the
    /// last one may fall slightly after sunset.
    pub fn hour_slots(&self) -> anyhow::Result<u32> {
        let hours = (self.sunset - self.sunrise).num_hours().max(0);
        let hours = u32::try_from(hours)
            .ok()
            .filter(|hours| *hours < u32::MAX)
            .ok_or_else(|| {
                anyhow::anyhow!(
                    "Daylight from {} to {} is too long to split into hours",
                    self.sunrise,
                    self.sunset
                )
            })?;
        Ok(hours + 1)
    }

    /// Time `offset` whole hours after sunrise.
    pub fn at_hour(&self, offset: u32) -> anyhow::Result<DateTime<Tz>> {
        let slots = self.hour_slots()?;
        if offset >= slots {
            anyhow::bail!(
                "Hour offset {} is out of range, the day has {} hour slots (0..={})",
                offset,
                slots,
                slots - 1
            );
        }
        Ok(self.sunrise + Duration::hours(i64::from(offset)))
    }
}

/// Source of sun positions for a place and time.
pub trait SolarPositionProvider {
    /// Sun azimuth and elevation at `datetime` for the given location.
    ///
    /// # Arguments
    /// * `datetime` - local time of the observation
    /// * `latitude` - latitude of the location in degrees, north positive
    /// * `longitude` - longitude of the location in degrees, east positive
    fn solar_position(
        &self,
        datetime: &DateTime<Tz>,
        latitude: f64,
        longitude: f64,
    ) -> anyhow::Result<SunPosition>;

    /// Sunrise and sunset on the local calendar `date`.
    fn daylight(
        &self,
        date: NaiveDate,
        latitude: f64,
        longitude: f64,
        timezone: Tz,
    ) -> anyhow::Result<Daylight>;
}

/// Provider backed by the NREL Solar Position Algorithm.
#[derive(Copy, Clone, Debug, Default)]
pub struct SpaProvider;

impl SolarPositionProvider for SpaProvider {
    fn solar_position(
        &self,
        datetime: &DateTime<Tz>,
        latitude: f64,
        longitude: f64,
    ) -> anyhow::Result<SunPosition> {
        let solar_position =
            spa::calc_solar_position(datetime.with_timezone(&Utc), latitude, longitude)?;
        Ok(SunPosition::from_degrees(
            solar_position.azimuth,
            90.0 - solar_position.zenith_angle,
        ))
    }

    fn daylight(
        &self,
        date: NaiveDate,
        latitude: f64,
        longitude: f64,
        timezone: Tz,
    ) -> anyhow::Result<Daylight> {
        // Local noon keeps the UTC day aligned with the local one for all
        // time zones within +-12 h.
        let noon = local_datetime(date, 12, timezone)?;
        match spa::calc_sunrise_and_set(noon.with_timezone(&Utc), latitude, longitude)? {
            SunriseAndSet::Daylight(sunrise, sunset) => Ok(Daylight {
                sunrise: sunrise.with_timezone(&timezone),
                sunset: sunset.with_timezone(&timezone),
            }),
            SunriseAndSet::PolarDay => {
                let next_date = date
                    .succ_opt()
                    .ok_or_else(|| anyhow::anyhow!("No day follows {}", date))?;
                Ok(Daylight {
                    sunrise: start_of_day(date, timezone)?,
                    sunset: start_of_day(next_date, timezone)?,
                })
            }
            SunriseAndSet::PolarNight => anyhow::bail!(
                "The sun does not rise on {} at latitude {}",
                date,
                latitude
            ),
        }
    }
}

/// Parse an IANA time zone identifier, e.g. `America/New_York`.
pub fn parse_timezone(name: &str) -> anyhow::Result<Tz> {
    name.parse::<Tz>()
        .map_err(|e| anyhow::anyhow!("Unknown time zone {:?}: {}", name, e))
}

/// First whole local hour of `date` that exists in `timezone`. This is
/// midnight unless a DST change skips it.
fn start_of_day(date: NaiveDate, timezone: Tz) -> anyhow::Result<DateTime<Tz>> {
    (0..24)
        .find_map(|hour| {
            timezone
                .from_local_datetime(&date.and_hms_opt(hour, 0, 0)?)
                .earliest()
        })
        .ok_or_else(|| anyhow::anyhow!("{} has no valid hour in time zone {:?}", date, timezone))
}

fn local_datetime(date: NaiveDate, hour: u32, timezone: Tz) -> anyhow::Result<DateTime<Tz>> {
    let naive = date
        .and_hms_opt(hour, 0, 0)
        .ok_or_else(|| anyhow::anyhow!("Invalid hour {} on {}", hour, date))?;
    timezone
        .from_local_datetime(&naive)
        .earliest()
        .ok_or_else(|| anyhow::anyhow!("{} does not exist in time zone {:?}", naive, timezone))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use chrono::Timelike;
    use test_case::test_case;
    use test_strategy::proptest;

    #[test]
    fn vector_due_north_on_horizon() {
        let vector = SunPosition::from_degrees(0.0, 0.0).sun_vector();
        assert_abs_diff_eq!(vector, Vector3::new(1.0, 0.0, 0.0), epsilon = 1e-12);
    }

    #[test]
    fn vector_south_45deg() {
        let vector = SunPosition::from_degrees(180.0, 45.0).sun_vector();
        let half_sqrt2 = std::f64::consts::FRAC_1_SQRT_2;
        assert_abs_diff_eq!(
            vector,
            Vector3::new(-half_sqrt2, 0.0, half_sqrt2),
            epsilon = 1e-12
        );
    }

    #[test]
    fn vector_zenith() {
        let vector = SunPosition::from_degrees(123.0, 90.0).sun_vector();
        assert_abs_diff_eq!(vector, Vector3::new(0.0, 0.0, 1.0), epsilon = 1e-12);
    }

    #[proptest]
    fn sun_vector_is_unit(
        #[strategy(0f64..360f64)] azimuth: f64,
        #[strategy(-90f64..=90f64)] elevation: f64,
    ) {
        let vector = SunPosition::from_degrees(azimuth, elevation).sun_vector();
        assert_abs_diff_eq!(vector.norm(), 1.0, epsilon = 1e-9);
    }

    #[proptest]
    fn from_degrees_wraps_azimuth(#[strategy(-1e6f64..1e6f64)] azimuth: f64) {
        let position = SunPosition::from_degrees(azimuth, 10.0);
        // Tolerates the degree -> radian -> degree round trip
        let wrapped = position.azimuth.get::<degree>();
        assert!((0.0..=360.0).contains(&wrapped), "wrapped to {}", wrapped);
    }

    #[test]
    fn spa_summer_noon_new_york() {
        let timezone = parse_timezone("America/New_York").unwrap();
        let datetime = timezone.with_ymd_and_hms(2025, 6, 21, 13, 0, 0).unwrap();
        let position = SpaProvider
            .solar_position(&datetime, 40.7128, -74.0060)
            .unwrap();
        // Solar noon is close to 12:57 EDT, elevation 90 - 40.7 + 23.4
        let elevation = position.elevation.get::<degree>();
        let azimuth = position.azimuth.get::<degree>();
        assert!((71.0..74.0).contains(&elevation), "elevation {}", elevation);
        assert!((165.0..195.0).contains(&azimuth), "azimuth {}", azimuth);
    }

    #[test]
    fn spa_sun_below_horizon_at_night() {
        let datetime = Tz::UTC.with_ymd_and_hms(2025, 3, 27, 0, 0, 0).unwrap();
        let position = SpaProvider.solar_position(&datetime, 51.5, 0.0).unwrap();
        assert!(position.elevation.get::<degree>() < 0.0);
    }

    #[test]
    fn daylight_new_york_spring() {
        let timezone = parse_timezone("America/New_York").unwrap();
        let date = NaiveDate::from_ymd_opt(2025, 3, 27).unwrap();
        let daylight = SpaProvider
            .daylight(date, 40.7128, -74.0060, timezone)
            .unwrap();

        assert_eq!(daylight.sunrise.date_naive(), date);
        assert_eq!(daylight.sunrise.hour(), 6);
        assert_eq!(daylight.sunset.hour(), 19);
        assert_eq!(daylight.hour_slots().unwrap(), 13);
    }

    #[test]
    fn daylight_polar_day_spans_whole_day() {
        let date = NaiveDate::from_ymd_opt(2025, 6, 21).unwrap();
        let daylight = SpaProvider.daylight(date, 80.0, 0.0, Tz::UTC).unwrap();
        assert_eq!(daylight.sunset - daylight.sunrise, Duration::days(1));
        assert_eq!(daylight.hour_slots().unwrap(), 25);
    }

    #[test]
    fn daylight_polar_night_is_error() {
        let date = NaiveDate::from_ymd_opt(2025, 12, 21).unwrap();
        let message = format!(
            "{}",
            SpaProvider.daylight(date, 80.0, 0.0, Tz::UTC).unwrap_err()
        );
        message
            .find("does not rise")
            .expect("Error message should say that the sun does not rise");
    }

    #[test_case(0, 6; "at sunrise")]
    #[test_case(3, 9; "three hours later")]
    #[test_case(12, 18; "last slot")]
    fn at_hour_offsets_from_sunrise(offset: u32, expected_hour: u32) {
        let daylight = Daylight {
            sunrise: Tz::UTC.with_ymd_and_hms(2025, 3, 27, 6, 30, 0).unwrap(),
            sunset: Tz::UTC.with_ymd_and_hms(2025, 3, 27, 18, 45, 0).unwrap(),
        };
        let time = daylight.at_hour(offset).unwrap();
        assert_eq!(time.hour(), expected_hour);
        assert_eq!(time.minute(), 30);
    }

    #[test]
    fn at_hour_out_of_range() {
        let daylight = Daylight {
            sunrise: Tz::UTC.with_ymd_and_hms(2025, 3, 27, 6, 30, 0).unwrap(),
            sunset: Tz::UTC.with_ymd_and_hms(2025, 3, 27, 18, 45, 0).unwrap(),
        };
        let message = format!("{}", daylight.at_hour(13).unwrap_err());
        message
            .find("13")
            .expect("Error message should contain the rejected offset");
    }

    #[test]
    fn hour_slots_short_day() {
        let daylight = Daylight {
            sunrise: Tz::UTC.with_ymd_and_hms(2025, 3, 27, 6, 30, 0).unwrap(),
            sunset: Tz::UTC.with_ymd_and_hms(2025, 3, 27, 18, 45, 0).unwrap(),
        };
        assert_eq!(daylight.hour_slots().unwrap(), 13);
    }

    #[test]
    fn hour_slots_too_long() {
        let daylight = Daylight {
            sunrise: DateTime::<Utc>::MIN_UTC.with_timezone(&Tz::UTC),
            sunset: DateTime::<Utc>::MAX_UTC.with_timezone(&Tz::UTC),
        };
        let message = format!("{}", daylight.hour_slots().unwrap_err());
        message
            .find("too long")
            .expect("Error message should say that the daylight is too long");
    }

    #[test]
    fn start_of_day_is_midnight() {
        let date = NaiveDate::from_ymd_opt(2025, 3, 27).unwrap();
        let start = start_of_day(date, parse_timezone("America/New_York").unwrap()).unwrap();
        assert_eq!(start.date_naive(), date);
        assert_eq!(start.hour(), 0);
    }

    #[test]
    fn start_of_day_skipped_midnight() {
        // Cuba switches to summer time at 00:00 on 2025-03-09, local midnight does not exist
        let timezone = parse_timezone("America/Havana").unwrap();
        let date = NaiveDate::from_ymd_opt(2025, 3, 9).unwrap();
        let start = start_of_day(date, timezone).unwrap();
        assert_eq!(start.date_naive(), date);
        assert_eq!(start.hour(), 1);
        assert_eq!(
            start.with_timezone(&Utc),
            Utc.with_ymd_and_hms(2025, 3, 9, 5, 0, 0).unwrap()
        );
    }

    #[test]
    fn unknown_timezone() {
        let message = format!("{}", parse_timezone("Mars/Olympus_Mons").unwrap_err());
        message
            .find("Mars/Olympus_Mons")
            .expect("Error message should contain the name of the time zone");
    }
}
