//! Exponential smoothing of landmark positions within a session.

use std::collections::BTreeMap;

use vtryon_models::{Landmark, LandmarkName};

/// EMA filter over landmark coordinates.
///
/// Landmarks missing from an observation keep their previous state but are
/// not emitted, so a dropped keypoint is never resurrected from history.
#[derive(Debug, Clone)]
pub struct LandmarkSmoother {
    alpha: f32,
    state: BTreeMap<LandmarkName, Landmark>,
}

impl LandmarkSmoother {
    pub fn new(alpha: f32) -> Self {
        Self {
            alpha: alpha.clamp(0.0, 1.0),
            state: BTreeMap::new(),
        }
    }

    /// Blend an observation into the running state and return the smoothed values.
    pub fn smooth(
        &mut self,
        observed: BTreeMap<LandmarkName, Landmark>,
    ) -> BTreeMap<LandmarkName, Landmark> {
        let mut out = BTreeMap::new();
        for (name, current) in observed {
            let smoothed = match self.state.get(&name) {
                Some(prev) => Landmark::new(
                    self.alpha * current.x + (1.0 - self.alpha) * prev.x,
                    self.alpha * current.y + (1.0 - self.alpha) * prev.y,
                    current.confidence,
                ),
                None => current,
            };
            self.state.insert(name, smoothed);
            out.insert(name, smoothed);
        }
        out
    }

    pub fn reset(&mut self) {
        self.state.clear();
    }
}
