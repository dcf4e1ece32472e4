pub mod sun;

/// Wrap a compass bearing in degrees into the [0, 360) range.
/// Exact multiples of 360 map to 0, negative bearings count counterclockwise.
pub fn normalize_azimuth(degrees: f64) -> f64 {
    let wrapped = degrees.rem_euclid(360.0);
    // rem_euclid rounds tiny negative inputs up to exactly 360
    if wrapped >= 360.0 {
        0.0
    } else {
        wrapped
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;
    use test_strategy::proptest;

    #[test_case(0.0, 0.0; "north")]
    #[test_case(360.0, 0.0; "full turn")]
    #[test_case(-10.0, 350.0; "negative")]
    #[test_case(725.0, 5.0; "two turns")]
    #[test_case(-1e-20, 0.0; "tiny negative")]
    fn normalize_azimuth_example(input: f64, expected: f64) {
        assert_eq!(normalize_azimuth(input), expected);
    }

    #[proptest]
    fn normalize_azimuth_range(#[strategy(-1e9f64..1e9f64)] degrees: f64) {
        let wrapped = normalize_azimuth(degrees);
        assert!((0.0..360.0).contains(&wrapped), "{} wrapped to {}", degrees, wrapped);
    }
}
