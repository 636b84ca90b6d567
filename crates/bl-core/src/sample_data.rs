//! Sample data handed to instruments for sample playback.

use alloc::vec::Vec;

/// One contiguous recording with the pitch it was recorded at.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Slice {
    /// Pitch at which the samples play back unshifted
    pub root_pitch: f32,
    /// Sample rate of the recording in hertz
    pub sample_rate: u32,
    /// Mono sample values
    pub samples: Vec<f32>,
}

impl Slice {
    pub fn new(root_pitch: f32, sample_rate: u32, samples: Vec<f32>) -> Self {
        Self { root_pitch, sample_rate, samples }
    }
}

/// A set of slices, kept sorted by root pitch.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SampleData {
    slices: Vec<Slice>,
}

impl SampleData {
    /// Build sample data from slices in any order.
    pub fn new(mut slices: Vec<Slice>) -> Self {
        slices.sort_by(|a, b| a.root_pitch.total_cmp(&b.root_pitch));
        Self { slices }
    }

    /// Slices in ascending root pitch order.
    pub fn slices(&self) -> &[Slice] {
        &self.slices
    }

    pub fn is_empty(&self) -> bool {
        self.slices.is_empty()
    }

    /// Pick the slice to play `pitch` with: the lowest slice whose root
    /// pitch is at or above `pitch`, falling back to the highest slice.
    pub fn select(&self, pitch: f32) -> Option<&Slice> {
        self.slices
            .iter()
            .find(|slice| slice.root_pitch >= pitch)
            .or_else(|| self.slices.last())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec;

    fn data() -> SampleData {
        SampleData::new(vec![
            Slice::new(1.0, 48000, vec![0.1]),
            Slice::new(-1.0, 48000, vec![0.2]),
            Slice::new(0.0, 48000, vec![0.3]),
        ])
    }

    #[test]
    fn slices_are_sorted_by_root_pitch() {
        let pitches: Vec<f32> = data().slices().iter().map(|s| s.root_pitch).collect();
        assert_eq!(pitches, vec![-1.0, 0.0, 1.0]);
    }

    #[test]
    fn select_picks_nearest_slice_above() {
        let data = data();
        assert_eq!(data.select(-0.5).unwrap().root_pitch, 0.0);
        assert_eq!(data.select(0.0).unwrap().root_pitch, 0.0);
        assert_eq!(data.select(5.0).unwrap().root_pitch, 1.0);
    }

    #[test]
    fn select_on_empty_is_none() {
        assert!(SampleData::default().select(0.0).is_none());
    }
}
