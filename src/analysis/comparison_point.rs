use serde::{Deserialize, Serialize};

use crate::alignment::{AlignedDataset, AlignedDriver, Channel};

use super::{ActionClassifier, DriverAction, DynamicsClassifier, VehicleDynamics};

/// One driver's values at a grid point.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct DriverPoint {
    pub time: f64,
    pub speed: f64,
    pub throttle: f64,
    pub brake: f64,
    pub gear: f64,
    pub rpm: f64,
    pub action: DriverAction,
    pub dynamics: VehicleDynamics,
}

/// Both drivers at the same grid index, with `driver1 - driver2` deltas.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ComparisonPoint {
    pub index: usize,
    pub distance: f64,
    pub time_delta: f64,
    pub speed_delta: f64,
    pub throttle_delta: f64,
    pub brake_delta: f64,
    pub gear_delta: f64,
    pub rpm_delta: f64,
    pub driver1: DriverPoint,
    pub driver2: DriverPoint,
}

impl ComparisonPoint {
    pub fn new(index: usize, distance: f64, driver1: DriverPoint, driver2: DriverPoint) -> Self {
        Self {
            index,
            distance,
            time_delta: driver1.time - driver2.time,
            speed_delta: driver1.speed - driver2.speed,
            throttle_delta: driver1.throttle - driver2.throttle,
            brake_delta: driver1.brake - driver2.brake,
            gear_delta: driver1.gear - driver2.gear,
            rpm_delta: driver1.rpm - driver2.rpm,
            driver1,
            driver2,
        }
    }

    pub fn driver(&self, slot: super::DriverSlot) -> &DriverPoint {
        match slot {
            super::DriverSlot::Driver1 => &self.driver1,
            super::DriverSlot::Driver2 => &self.driver2,
        }
    }
}

/// Zip the aligned channels of both drivers by index and classify every point.
pub fn build_comparison_points(
    dataset: &AlignedDataset,
    actions: &ActionClassifier,
    dynamics: &DynamicsClassifier,
) -> Vec<ComparisonPoint> {
    let points = dataset.len();
    let dynamics1 = dynamics.classify_aligned(&dataset.driver1, points);
    let dynamics2 = dynamics.classify_aligned(&dataset.driver2, points);

    dataset
        .distance
        .iter()
        .enumerate()
        .map(|(idx, distance)| {
            ComparisonPoint::new(
                idx,
                *distance,
                driver_point(&dataset.driver1, idx, actions, dynamics1[idx]),
                driver_point(&dataset.driver2, idx, actions, dynamics2[idx]),
            )
        })
        .collect()
}

fn driver_point(
    driver: &AlignedDriver,
    idx: usize,
    actions: &ActionClassifier,
    dynamics: VehicleDynamics,
) -> DriverPoint {
    let throttle = driver.value(Channel::Throttle, idx);
    let brake = driver.value(Channel::Brake, idx);
    DriverPoint {
        time: driver.value(Channel::Time, idx),
        speed: driver.value(Channel::Speed, idx),
        throttle,
        brake,
        gear: driver.value(Channel::Gear, idx),
        rpm: driver.value(Channel::Rpm, idx),
        action: actions.classify(throttle, brake),
        dynamics,
    }
}
