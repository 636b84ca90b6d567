//! Totally ordered pitch key for active-note tracking.

use core::cmp::Ordering;

/// A pitch usable as a map key.
///
/// Pitch is an octave-relative log-frequency value. NaN is not a valid
/// pitch, and `-0.0` is folded into `0.0` so both address the same note.
#[derive(Clone, Copy, Debug)]
pub struct PitchKey(f32);

impl PitchKey {
    /// Wrap `pitch`, or `None` if it is NaN.
    pub fn new(pitch: f32) -> Option<Self> {
        if pitch.is_nan() {
            None
        } else {
            Some(Self(pitch + 0.0))
        }
    }

    /// The wrapped pitch.
    pub fn pitch(self) -> f32 {
        self.0
    }
}

impl PartialEq for PitchKey {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for PitchKey {}

impl PartialOrd for PitchKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for PitchKey {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.total_cmp(&other.0)
    }
}
