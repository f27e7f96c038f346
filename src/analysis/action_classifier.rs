use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::percentage;

/// What the driver is doing with the pedals at a given point.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DriverAction {
    FullThrottle,
    PartialThrottle,
    Coasting,
    Braking,
    TrailBraking,
}

impl DriverAction {
    pub const ALL: [DriverAction; 5] = [
        DriverAction::FullThrottle,
        DriverAction::PartialThrottle,
        DriverAction::Coasting,
        DriverAction::Braking,
        DriverAction::TrailBraking,
    ];
}

impl std::fmt::Display for DriverAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DriverAction::FullThrottle => write!(f, "Full Throttle"),
            DriverAction::PartialThrottle => write!(f, "Partial Throttle"),
            DriverAction::Coasting => write!(f, "Coasting"),
            DriverAction::Braking => write!(f, "Braking"),
            DriverAction::TrailBraking => write!(f, "Trail Braking"),
        }
    }
}

/// Pedal thresholds, all in percent.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ActionThresholds {
    pub full_throttle: f64,
    /// Kept for configuration compatibility; partial throttle is the fallback category
    pub partial_throttle: f64,
    pub braking: f64,
    /// Throttle still applied while braking that makes it trail braking
    pub trail_braking_throttle: f64,
    pub coasting: f64,
}

impl Default for ActionThresholds {
    fn default() -> Self {
        Self {
            full_throttle: 95.,
            partial_throttle: 10.,
            braking: 5.,
            trail_braking_throttle: 15.,
            coasting: 5.,
        }
    }
}

/// A change of action between two consecutive points.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ActionTransition {
    /// Index of the first point with the new action
    pub index: usize,
    pub from: DriverAction,
    pub to: DriverAction,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ActionSequenceAnalysis {
    /// Percentage of points per action, every action listed
    pub action_distribution: BTreeMap<DriverAction, f64>,
    pub transitions: Vec<ActionTransition>,
    /// Most frequent action, `None` for an empty sequence
    pub dominant_action: Option<DriverAction>,
    pub total_transitions: usize,
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ActionClassifier {
    thresholds: ActionThresholds,
}

impl ActionClassifier {
    pub fn new(thresholds: ActionThresholds) -> Self {
        Self { thresholds }
    }

    /// Ordered rules, first match wins.
    pub fn classify(&self, throttle: f64, brake: f64) -> DriverAction {
        let t = &self.thresholds;
        if throttle >= t.full_throttle {
            return DriverAction::FullThrottle;
        }
        if brake >= t.braking {
            if throttle >= t.trail_braking_throttle {
                return DriverAction::TrailBraking;
            }
            return DriverAction::Braking;
        }
        if throttle <= t.coasting && brake <= t.coasting {
            return DriverAction::Coasting;
        }
        DriverAction::PartialThrottle
    }

    /// Classify a whole throttle/brake channel pair. Extra values in the
    /// longer channel are ignored.
    pub fn analyze_sequence(&self, throttle: &[f64], brake: &[f64]) -> ActionSequenceAnalysis {
        let actions = throttle
            .iter()
            .zip(brake)
            .map(|(t, b)| self.classify(*t, *b))
            .collect::<Vec<_>>();

        let transitions = actions
            .windows(2)
            .enumerate()
            .filter(|(_, pair)| pair[0] != pair[1])
            .map(|(idx, pair)| ActionTransition {
                index: idx + 1,
                from: pair[0],
                to: pair[1],
            })
            .collect::<Vec<_>>();

        let action_distribution = action_distribution(&actions);
        // ties go to the earlier category in declaration order
        let dominant_action = if actions.is_empty() {
            None
        } else {
            DriverAction::ALL
                .iter()
                .copied()
                .reduce(|best, action| {
                    if action_distribution[&action] > action_distribution[&best] {
                        action
                    } else {
                        best
                    }
                })
        };

        ActionSequenceAnalysis {
            action_distribution,
            total_transitions: transitions.len(),
            transitions,
            dominant_action,
        }
    }
}

/// Classify with the default thresholds.
pub fn classify_action(throttle: f64, brake: f64) -> DriverAction {
    ActionClassifier::default().classify(throttle, brake)
}

/// Share of each action in `actions`, in percent. Every action gets an entry.
pub fn action_distribution(actions: &[DriverAction]) -> BTreeMap<DriverAction, f64> {
    DriverAction::ALL
        .iter()
        .map(|action| {
            let count = actions.iter().filter(|a| *a == action).count();
            (*action, percentage(count, actions.len()))
        })
        .collect()
}
