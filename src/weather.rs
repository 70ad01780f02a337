//! Weather aggregation across stations.
//!
//! Readings are passed primary first. Scalar fields are averaged over the
//! stations that report them, text fields take the first station that has one,
//! and wind is combined as a vector so that directions either side of north
//! average correctly and opposing winds cancel.

use crate::{FusedReading, PartialReading};

// ---

/// Combine station readings (primary first) into one fused reading.
pub fn fuse(readings: &[PartialReading]) -> FusedReading {
    // ---
    let (wind_direction_deg, wind_speed_ms) = fuse_wind(readings);

    FusedReading {
        text_description: readings.iter().find_map(|r| r.text_description.clone()),
        temperature_c: mean_of(readings, |r| r.temperature_c),
        dewpoint_c: mean_of(readings, |r| r.dewpoint_c),
        wind_direction_deg,
        wind_speed_ms,
        barometric_pressure_pa: mean_of(readings, |r| r.barometric_pressure_pa),
        sea_level_pressure_pa: mean_of(readings, |r| r.sea_level_pressure_pa),
        visibility_m: mean_of(readings, |r| r.visibility_m),
        relative_humidity_pct: mean_of(readings, |r| r.relative_humidity_pct),
        wind_chill_c: mean_of(readings, |r| r.wind_chill_c),
    }
}

fn mean_of<F>(readings: &[PartialReading], field: F) -> Option<f64>
where
    F: Fn(&PartialReading) -> Option<f64>,
{
    // ---
    let values: Vec<f64> = readings.iter().filter_map(field).collect();
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}

/// Returns fused `(direction, speed)`.
///
/// The vector mean needs at least two complete direction/speed pairs and no
/// station reporting a direction without a speed. Otherwise direction falls
/// back to the mean of reported directions and speed to the first reported
/// speed; speed is never averaged as a plain scalar.
fn fuse_wind(readings: &[PartialReading]) -> (Option<f64>, Option<f64>) {
    // ---
    let pairs: Vec<(f64, f64)> = readings
        .iter()
        .filter_map(|r| Some((r.wind_direction_deg?, r.wind_speed_ms?)))
        .collect();
    let direction_only = readings
        .iter()
        .any(|r| r.wind_direction_deg.is_some() && r.wind_speed_ms.is_none());

    if pairs.len() >= 2 && !direction_only {
        let (direction, speed) = vector_mean(&pairs);
        return (Some(direction), Some(speed));
    }

    (
        mean_of(readings, |r| r.wind_direction_deg),
        readings.iter().find_map(|r| r.wind_speed_ms),
    )
}

/// Vector mean of `(direction_deg, speed)` pairs; direction in `[0, 360)`.
pub fn vector_mean(pairs: &[(f64, f64)]) -> (f64, f64) {
    // ---
    let n = pairs.len() as f64;
    let (sx, sy) = pairs.iter().fold((0.0, 0.0), |(x, y), (dir, speed)| {
        let rad = dir.to_radians();
        (x + speed * rad.cos(), y + speed * rad.sin())
    });
    let (x, y) = (sx / n, sy / n);

    let mut direction = y.atan2(x).to_degrees();
    if direction < 0.0 {
        direction += 360.0;
    }
    if direction >= 360.0 {
        direction -= 360.0;
    }
    (direction, x.hypot(y))
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;

    fn fuse_pair(primary: &PartialReading, secondary: &PartialReading) -> FusedReading {
        fuse(&[primary.clone(), secondary.clone()])
    }

    fn wind(direction: f64, speed: f64) -> PartialReading {
        PartialReading {
            wind_direction_deg: Some(direction),
            wind_speed_ms: Some(speed),
            ..Default::default()
        }
    }

    fn close(a: Option<f64>, b: f64) -> bool {
        a.map_or(false, |a| (a - b).abs() < 1e-9)
    }

    #[test]
    fn test_opposing_winds_cancel() {
        // ---
        let fused = fuse_pair(&wind(0.0, 10.0), &wind(180.0, 10.0));
        assert!(fused.wind_speed_ms.unwrap().abs() < 1e-9);
    }

    #[test]
    fn test_identical_winds_unchanged() {
        // ---
        let fused = fuse_pair(&wind(250.0, 6.2), &wind(250.0, 6.2));
        assert!(close(fused.wind_direction_deg, 250.0));
        assert!(close(fused.wind_speed_ms, 6.2));
    }

    #[test]
    fn test_wind_across_north_averages_to_north() {
        // ---
        let fused = fuse_pair(&wind(350.0, 5.0), &wind(10.0, 5.0));
        let dir = fused.wind_direction_deg.unwrap();
        assert!(dir < 1e-9 || (360.0 - dir) < 1e-9, "got {dir}");
        // A plain mean would have produced 180.
        let speed = fused.wind_speed_ms.unwrap();
        assert!((speed - 5.0 * 10f64.to_radians().cos()).abs() < 1e-9);
    }

    #[test]
    fn test_vector_direction_is_normalized() {
        // ---
        let fused = fuse_pair(&wind(270.0, 4.0), &wind(290.0, 4.0));
        assert!(close(fused.wind_direction_deg, 280.0));
    }

    #[test]
    fn test_missing_field_falls_back_to_secondary() {
        // ---
        let primary = PartialReading::default();
        let secondary = PartialReading {
            dewpoint_c: Some(5.0),
            ..Default::default()
        };
        assert_eq!(fuse_pair(&primary, &secondary).dewpoint_c, Some(5.0));
    }

    #[test]
    fn test_scalar_average() {
        // ---
        let primary = PartialReading {
            temperature_c: Some(20.0),
            ..Default::default()
        };
        let secondary = PartialReading {
            temperature_c: Some(24.0),
            ..Default::default()
        };
        assert_eq!(fuse_pair(&primary, &secondary).temperature_c, Some(22.0));
    }

    #[test]
    fn test_text_prefers_primary() {
        // ---
        let primary = PartialReading {
            text_description: Some("Cloudy".to_string()),
            ..Default::default()
        };
        let secondary = PartialReading {
            text_description: Some("Clear".to_string()),
            ..Default::default()
        };
        let fused = fuse_pair(&primary, &secondary);
        assert_eq!(fused.text_description.as_deref(), Some("Cloudy"));

        let fused = fuse_pair(&PartialReading::default(), &secondary);
        assert_eq!(fused.text_description.as_deref(), Some("Clear"));
    }

    #[test]
    fn test_primary_only_value_kept() {
        // ---
        let primary = PartialReading {
            visibility_m: Some(16090.0),
            ..Default::default()
        };
        let fused = fuse_pair(&primary, &PartialReading::default());
        assert_eq!(fused.visibility_m, Some(16090.0));
    }

    #[test]
    fn test_speed_not_averaged_without_both_directions() {
        // ---
        let primary = PartialReading {
            wind_speed_ms: Some(4.0),
            ..Default::default()
        };
        let secondary = wind(90.0, 8.0);
        let fused = fuse_pair(&primary, &secondary);
        assert_eq!(fused.wind_direction_deg, Some(90.0));
        assert_eq!(fused.wind_speed_ms, Some(4.0));
    }

    #[test]
    fn test_direction_mean_when_speed_missing() {
        // ---
        let primary = PartialReading {
            wind_direction_deg: Some(100.0),
            ..Default::default()
        };
        let secondary = wind(120.0, 3.0);
        let fused = fuse_pair(&primary, &secondary);
        assert_eq!(fused.wind_direction_deg, Some(110.0));
        assert_eq!(fused.wind_speed_ms, Some(3.0));
    }

    #[test]
    fn test_both_empty_stays_empty() {
        // ---
        let fused = fuse_pair(&PartialReading::default(), &PartialReading::default());
        assert!(fused.is_empty());
    }
}
