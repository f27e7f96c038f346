use log::debug;
use uom::si::f64::Velocity;
use uom::si::velocity::{kilometer_per_hour, meter_per_second};

use crate::errors::DeltaLapError;

use super::{Lap, TelemetrySample};

/// Earth radius used for great-circle distances, in meters
pub const EARTH_RADIUS_M: f64 = 6_371_000.;

/// A telemetry sample with the distance traveled since the start of its lap.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DistanceTaggedSample<'lap> {
    /// Meters traveled since the first sample, non-decreasing
    pub distance: f64,
    pub sample: &'lap TelemetrySample,
}

/// Great-circle distance in meters between two latitude/longitude pairs.
pub fn haversine_distance_m(from: (f64, f64), to: (f64, f64)) -> f64 {
    let (lat1, lon1) = (from.0.to_radians(), from.1.to_radians());
    let (lat2, lon2) = (to.0.to_radians(), to.1.to_radians());
    let dlat = lat2 - lat1;
    let dlon = lon2 - lon1;

    let a = (dlat / 2.).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon / 2.).sin().powi(2);
    // rounding can push `a` a hair above 1 for antipodal points
    2. * EARTH_RADIUS_M * a.clamp(0., 1.).sqrt().asin()
}

fn kmh_to_mps(speed_kmh: f64) -> f64 {
    Velocity::new::<kilometer_per_hour>(speed_kmh).get::<meter_per_second>()
}

/// Distance covered between two consecutive samples.
///
/// GPS is preferred when both samples carry a position, otherwise the mean of
/// the available speeds is integrated over the elapsed time. Inconsistent data
/// (time going backwards, negative speed) never yields a negative increment.
fn distance_increment(prev: &TelemetrySample, cur: &TelemetrySample) -> f64 {
    let increment = match (prev.position(), cur.position()) {
        (Some(from), Some(to)) => haversine_distance_m(from, to),
        _ => {
            let avg_speed_kmh = match (prev.valid_speed(), cur.valid_speed()) {
                (Some(a), Some(b)) => (a + b) / 2.,
                (Some(speed), None) | (None, Some(speed)) => speed,
                (None, None) => 0.,
            };
            kmh_to_mps(avg_speed_kmh) * (cur.time - prev.time)
        }
    };
    if increment.is_finite() {
        increment.max(0.)
    } else {
        0.
    }
}

/// Convert a lap's time-ordered samples into a cumulative distance curve.
///
/// The first sample sits at distance 0. Steps where neither GPS nor speed is
/// available contribute nothing instead of failing the whole lap.
pub fn estimate_distance(lap: &Lap) -> Result<Vec<DistanceTaggedSample<'_>>, DeltaLapError> {
    let Some(first) = lap.samples.first() else {
        return Err(DeltaLapError::EmptyLap {
            lap_number: lap.lap_number,
        });
    };

    let mut tagged = Vec::with_capacity(lap.samples.len());
    tagged.push(DistanceTaggedSample {
        distance: 0.,
        sample: first,
    });

    let mut cumulative = 0.;
    let mut gps_steps = 0usize;
    for (prev, cur) in lap.samples.iter().zip(lap.samples.iter().skip(1)) {
        if prev.position().is_some() && cur.position().is_some() {
            gps_steps += 1;
        }
        cumulative += distance_increment(prev, cur);
        tagged.push(DistanceTaggedSample {
            distance: cumulative,
            sample: cur,
        });
    }

    debug!(
        "Lap {}: estimated {:.1}m over {} samples ({} GPS steps)",
        lap.lap_number,
        cumulative,
        tagged.len(),
        gps_steps
    );
    Ok(tagged)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn sample(time: f64, speed: Option<f64>) -> TelemetrySample {
        TelemetrySample {
            time,
            speed,
            ..Default::default()
        }
    }

    #[test]
    fn test_empty_lap_fails() {
        let lap = Lap::default();
        match estimate_distance(&lap) {
            Err(DeltaLapError::EmptyLap { lap_number }) => assert_eq!(lap_number, 0),
            _ => panic!("Expected EmptyLap error"),
        }
    }

    #[test]
    fn test_single_sample_starts_at_zero() {
        let lap = Lap::from_samples(1, vec![sample(0., Some(100.))]);
        let tagged = estimate_distance(&lap).unwrap();
        assert_eq!(tagged.len(), 1);
        assert_eq!(tagged[0].distance, 0.);
    }

    #[test]
    fn test_speed_integration() {
        // 36 km/h is 10 m/s
        let lap = Lap::from_samples(
            1,
            vec![
                sample(0., Some(36.)),
                sample(1., Some(36.)),
                sample(3., Some(72.)),
            ],
        );
        let tagged = estimate_distance(&lap).unwrap();
        assert!((tagged[1].distance - 10.).abs() < 1e-9);
        // mean of 10 and 20 m/s over 2s
        assert!((tagged[2].distance - 40.).abs() < 1e-9);
    }

    #[test]
    fn test_haversine_one_degree_of_latitude() {
        let distance = haversine_distance_m((0., 0.), (1., 0.));
        let expected = EARTH_RADIUS_M * std::f64::consts::PI / 180.;
        assert!((distance - expected).abs() < 1e-6);
    }

    #[test]
    fn test_gps_preferred_over_speed() {
        let mut a = sample(0., Some(3600.));
        let mut b = sample(1., Some(3600.));
        a.latitude = Some(45.);
        a.longitude = Some(7.);
        b.latitude = Some(45.0001);
        b.longitude = Some(7.);
        let lap = Lap::from_samples(1, vec![a, b]);
        let tagged = estimate_distance(&lap).unwrap();
        // ~11.1m from GPS rather than 1000m from speed
        assert!(tagged[1].distance > 11. && tagged[1].distance < 11.2);
    }

    #[test]
    fn test_single_gps_pair_and_missing_speed_does_not_fail() {
        let mut samples = vec![
            sample(0., None),
            sample(1., None),
            sample(2., None),
            sample(3., None),
        ];
        samples[1].latitude = Some(45.);
        samples[1].longitude = Some(7.);
        samples[2].latitude = Some(45.001);
        samples[2].longitude = Some(7.);
        let lap = Lap::from_samples(1, samples);

        let tagged = estimate_distance(&lap).unwrap();
        assert_eq!(tagged[1].distance, 0.);
        assert!(tagged[2].distance > 100.);
        assert_eq!(tagged[3].distance, tagged[2].distance);
    }

    #[test]
    fn test_time_going_backwards_is_clamped() {
        let lap = Lap::from_samples(
            1,
            vec![
                sample(5., Some(100.)),
                sample(4., Some(100.)),
                sample(6., Some(100.)),
            ],
        );
        let tagged = estimate_distance(&lap).unwrap();
        assert_eq!(tagged[1].distance, 0.);
        assert!(tagged[2].distance > 0.);
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        #[test]
        fn prop_distance_is_non_decreasing_from_zero(
            steps in prop::collection::vec(
                (-1.0f64..2.0, prop::option::of(-50.0f64..300.0), prop::option::of((44.0f64..46.0, 6.0f64..8.0))),
                1..60,
            )
        ) {
            let mut time = 0.;
            let samples = steps
                .iter()
                .map(|(dt, speed, gps)| {
                    time += dt;
                    TelemetrySample {
                        time,
                        speed: *speed,
                        latitude: gps.map(|g| g.0),
                        longitude: gps.map(|g| g.1),
                        ..Default::default()
                    }
                })
                .collect::<Vec<_>>();
            let lap = Lap::from_samples(1, samples);
            let tagged = estimate_distance(&lap).unwrap();

            prop_assert_eq!(tagged.len(), lap.samples.len());
            prop_assert_eq!(tagged[0].distance, 0.);
            for pair in tagged.windows(2) {
                prop_assert!(pair[1].distance >= pair[0].distance);
            }
        }
    }
}
