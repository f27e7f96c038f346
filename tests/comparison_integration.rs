// End-to-end comparisons on synthetic laps
//
// Covers the full pipeline from session files or in-memory laps down to the
// serialized report:
// 1. Lap selection
// 2. Distance estimation and alignment
// 3. Time gap, sector and classification analysis
// 4. Report and failure serialization

use deltalap::{
    Channel, ComparisonEngine, ComparisonOutcome, DeltaLapError, DriverSlot, EngineConfig,
    LapSelector, SessionRecord, TelemetrySample,
    loader::load_session_jsonl,
    telemetry::{Lap, LapSample, Session, SessionInfo, estimate_distance},
};
use tempfile::tempdir;

/// Lap driven at a constant speed with one sample per second
fn constant_speed_lap(lap_number: u32, speed_kmh: f64, seconds: usize) -> Lap {
    Lap::from_samples(
        lap_number,
        (0..=seconds)
            .map(|t| TelemetrySample {
                time: 1000. + t as f64,
                speed: Some(speed_kmh),
                throttle: Some(if t % 20 < 15 { 100. } else { 0. }),
                brake: Some(if t % 20 < 15 { 0. } else { 70. }),
                gear: Some(4),
                rpm: Some(7500.),
                ..Default::default()
            })
            .collect(),
    )
}

fn session(name: &str, laps: Vec<Lap>) -> Session {
    let mut session = Session::new(
        SessionInfo {
            driver_name: Some(name.to_string()),
            session_name: Some("Race".to_string()),
            track_name: Some("Spa".to_string()),
        },
        laps,
    );
    session.mark_fastest_lap();
    session
}

#[test]
fn test_uniformly_faster_driver_wins() {
    // 54.18 km/h for 100s covers 1505m, so the shared grid has 150 points
    let fast = session("Alice", vec![constant_speed_lap(1, 54.18, 100)]);
    let slow = session("Bob", vec![constant_speed_lap(1, 45., 130)]);

    let report = ComparisonEngine::default()
        .compare(&fast, &slow, LapSelector::Fastest, LapSelector::Fastest)
        .unwrap();

    assert_eq!(report.overall.data_points, 150);
    assert_eq!(report.overall.faster_driver, DriverSlot::Driver1);
    assert_eq!(report.overall.faster_driver_name, "Alice");
    assert!(report.overall.total_time_delta < 0.);
    assert_eq!(report.overall.total_distance, 1490.);

    let time_comparison = &report.comparison_metrics.time_comparison;
    assert!(time_comparison.time_delta_array[1..].iter().all(|d| *d < 0.));
    assert!(time_comparison.zero_crossings.is_empty());
    assert_eq!(time_comparison.sector_analysis.len(), 3);

    assert_eq!(report.sector_analysis.len(), 3);
    for sector in &report.sector_analysis {
        assert_eq!(sector.dominant_driver, Some(DriverSlot::Driver1));
        assert!(sector.driver1.sector_time < sector.driver2.sector_time);
    }
    assert!(report.speed_analysis.speed_advantage_percentage > 99.);
    assert!(report.speed_analysis.top_speed_zones.is_empty());
}

#[test]
fn test_identical_laps_have_no_gap() {
    let alice = session("Alice", vec![constant_speed_lap(3, 120., 60)]);
    let bob = session("Bob", vec![constant_speed_lap(3, 120., 60)]);

    let report = ComparisonEngine::default()
        .compare(&alice, &bob, LapSelector::Number(3), LapSelector::Number(3))
        .unwrap();
    let time_comparison = &report.comparison_metrics.time_comparison;

    assert!(time_comparison.time_delta_array.iter().all(|d| *d == 0.));
    assert_eq!(time_comparison.cumulative_delta_final, 0.);
    assert_eq!(time_comparison.statistics.even_percentage, 100.);
    assert_eq!(report.overall.total_time_delta, 0.);
    // aligned time starts from zero for both laps
    assert_eq!(report.aligned_data.driver1.value(Channel::Time, 0), 0.);
}

#[test]
fn test_lap_not_found_is_a_failure_value() {
    let alice = session("Alice", vec![constant_speed_lap(1, 120., 60)]);
    let bob = session("Bob", vec![constant_speed_lap(1, 120., 60)]);

    let outcome = ComparisonEngine::default().compare_outcome(
        &alice,
        &bob,
        LapSelector::Number(12),
        LapSelector::Fastest,
    );
    let json = serde_json::to_value(&outcome).unwrap();
    assert_eq!(json["success"], false);
    assert_eq!(json["error"], "Lap 12 not found for Alice");
    assert!(json.get("aligned_data").is_none());

    let stopped = session("Carl", vec![constant_speed_lap(1, 0., 60)]);
    let result =
        ComparisonEngine::default().compare(&alice, &stopped, LapSelector::First, LapSelector::First);
    assert!(matches!(result, Err(DeltaLapError::NonPositiveDistance { .. })));
}

#[test]
fn test_report_json_shape() {
    let alice = session("Alice", vec![constant_speed_lap(1, 160., 45)]);
    let bob = session("Bob", vec![constant_speed_lap(1, 150., 50)]);

    let config = EngineConfig {
        sector_count: 4,
        ..Default::default()
    };
    let outcome: ComparisonOutcome = ComparisonEngine::new(config)
        .unwrap()
        .compare(&alice, &bob, LapSelector::Fastest, LapSelector::Fastest)
        .map(|report| report.without_points())
        .into();
    let json = serde_json::to_value(&outcome).unwrap();

    assert_eq!(json["success"], true);
    assert_eq!(json["driver1"]["name"], "Alice");
    assert_eq!(json["driver2"]["lap_number"], 1);
    let distance = json["aligned_data"]["distance"].as_array().unwrap();
    assert_eq!(
        json["aligned_data"]["driver1"]["speed"].as_array().unwrap().len(),
        distance.len()
    );
    assert!(json["aligned_data"]["driver2"]["gear"].is_array());
    assert!(json["aligned_data"]["driver1"].get("steering_angle").is_none());

    let metrics = &json["comparison_metrics"];
    for key in [
        "speed_comparison",
        "time_comparison",
        "throttle_comparison",
        "brake_comparison",
        "performance_summary",
        "cornering_analysis",
    ] {
        assert!(metrics.get(key).is_some(), "missing {key}");
    }
    assert!(metrics["time_comparison"]["zero_crossings"].is_array());
    assert!(metrics["time_comparison"]["cumulative_delta_array"].is_array());

    let sectors = json["sector_analysis"].as_object().unwrap();
    assert_eq!(sectors.len(), 4);
    assert_eq!(sectors["sector_1"]["sector_number"], 1);
    assert!(sectors.contains_key("sector_4"));

    assert_eq!(json["overall"]["interpolation_spacing_m"], 10.);
    assert!(json["speed_analysis"]["top_speed_zones"].as_array().unwrap().len() == 1);
    assert!(json.get("comparison_points").is_none());
}

#[test]
fn test_dynamics_channels_feed_handling_analysis() {
    let with_dynamics = |lap_number: u32, lateral: f64| {
        Lap::from_samples(
            lap_number,
            (0..=60)
                .map(|t| TelemetrySample {
                    time: t as f64,
                    speed: Some(100.),
                    throttle: Some(60.),
                    brake: Some(0.),
                    lateral_accel: Some(lateral),
                    steering_angle: Some(0.02),
                    ..Default::default()
                })
                .collect(),
        )
    };
    // expected lateral proxy is 100^2 * 0.02 / 1000 = 0.2
    let understeer = session("Alice", vec![with_dynamics(1, 0.8)]);
    let oversteer = session("Bob", vec![with_dynamics(1, 0.)]);

    let report = ComparisonEngine::default()
        .compare(&understeer, &oversteer, LapSelector::First, LapSelector::First)
        .unwrap();
    let dynamics = &report.dynamics_analysis;

    assert!(dynamics.channels_available);
    assert_eq!(dynamics.driver1.total_understeer_events, report.overall.data_points);
    assert_eq!(dynamics.driver2.total_oversteer_events, report.overall.data_points);
    assert_eq!(
        dynamics.driver1.handling_balance,
        deltalap::analysis::HandlingBalance::UndersteerTendency
    );
    assert_eq!(
        dynamics.driver2.handling_balance,
        deltalap::analysis::HandlingBalance::OversteerTendency
    );
}

#[test]
fn test_missing_channel_is_zero_filled() {
    let mut lap = constant_speed_lap(1, 100., 60);
    lap.samples.iter_mut().for_each(|s| s.rpm = None);
    let alice = session("Alice", vec![lap]);
    let bob = session("Bob", vec![constant_speed_lap(1, 100., 60)]);

    let report = ComparisonEngine::default()
        .compare(&alice, &bob, LapSelector::First, LapSelector::First)
        .unwrap();

    assert!(report.aligned_data.driver1.degraded_channels.contains(&Channel::Rpm));
    let rpm = report.aligned_data.driver1.channel(Channel::Rpm).unwrap();
    assert_eq!(rpm.len(), report.overall.data_points);
    assert!(rpm.iter().all(|v| *v == 0.));
    assert!(!report.aligned_data.driver2.degraded_channels.contains(&Channel::Rpm));
    // speed is intact, so the comparison itself still holds
    assert_eq!(report.overall.total_time_delta, 0.);
}

#[test]
fn test_single_gps_pair_without_speed_does_not_fail() {
    let mut samples = (0..5)
        .map(|t| TelemetrySample {
            time: t as f64,
            ..Default::default()
        })
        .collect::<Vec<_>>();
    samples[2].latitude = Some(50.4372);
    samples[2].longitude = Some(5.9714);
    samples[3].latitude = Some(50.4381);
    samples[3].longitude = Some(5.9714);
    let lap = Lap::from_samples(1, samples);

    let tagged = estimate_distance(&lap).unwrap();
    assert_eq!(tagged.len(), 5);
    assert_eq!(tagged[2].distance, 0.);
    assert!(tagged[3].distance > 90. && tagged[3].distance < 110.);
    assert_eq!(tagged[4].distance, tagged[3].distance);
}

#[test]
fn test_compare_sessions_loaded_from_files() {
    let dir = tempdir().unwrap();
    let write_session = |file_name: &str, driver: &str, speeds: [f64; 2]| {
        let path = dir.path().join(file_name);
        let mut records = vec![SessionRecord::SessionChange(SessionInfo {
            driver_name: Some(driver.to_string()),
            ..Default::default()
        })];
        for (lap_number, speed) in [(1, speeds[0]), (2, speeds[1])] {
            let lap = constant_speed_lap(lap_number, speed, 40);
            records.extend(lap.samples.into_iter().map(|sample| {
                SessionRecord::DataPoint(Box::new(LapSample { lap_number, sample }))
            }));
        }
        serde_jsonlines::write_json_lines(&path, &records).unwrap();
        path
    };
    let path1 = write_session("alice.jsonl", "Alice", [150., 160.]);
    let path2 = write_session("bob.jsonl", "Bob", [155., 150.]);

    let alice = load_session_jsonl(&path1).unwrap();
    let bob = load_session_jsonl(&path2).unwrap();
    assert_eq!(alice.laps.len(), 2);

    let report = ComparisonEngine::default()
        .compare(&alice, &bob, LapSelector::Number(2), LapSelector::First)
        .unwrap();
    assert_eq!(report.driver1.lap_number, 2);
    assert_eq!(report.driver2.lap_number, 1);
    assert_eq!(report.overall.faster_driver, DriverSlot::Driver1);
}
