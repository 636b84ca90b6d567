//! Conversions between beats, seconds and samples.
//!
//! Beats are the tempo-relative unit of musical position. Seconds drive the
//! engine clock, and samples are the render-side unit used to timestamp
//! instrument messages.

/// Seconds in one minute (tempo is expressed in beats per minute).
pub const SECONDS_PER_MINUTE: f64 = 60.0;

/// Convert a beat duration to seconds at `tempo` beats per minute.
///
/// `tempo` must be positive.
pub fn beats_to_seconds(tempo: f64, beats: f64) -> f64 {
    debug_assert!(tempo > 0.0, "tempo must be positive");
    beats * SECONDS_PER_MINUTE / tempo
}

/// Convert a duration in seconds to beats at `tempo` beats per minute.
pub fn seconds_to_beats(tempo: f64, seconds: f64) -> f64 {
    seconds * tempo / SECONDS_PER_MINUTE
}

/// Convert seconds to an absolute sample index (truncating).
pub fn seconds_to_samples(sample_rate: u32, seconds: f64) -> i64 {
    (seconds * sample_rate as f64) as i64
}

/// Convert an absolute sample index to seconds.
pub fn samples_to_seconds(sample_rate: u32, samples: i64) -> f64 {
    debug_assert!(sample_rate > 0, "sample rate must be positive");
    samples as f64 / sample_rate as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn one_beat_per_second_at_sixty_bpm() {
        assert_eq!(beats_to_seconds(60.0, 1.0), 1.0);
        assert_eq!(seconds_to_beats(60.0, 2.5), 2.5);
    }

    #[test]
    fn beats_scale_with_tempo() {
        // 120 BPM: two beats per second
        assert_eq!(seconds_to_beats(120.0, 1.0), 2.0);
        assert_eq!(beats_to_seconds(120.0, 1.0), 0.5);
    }

    #[test]
    fn zero_tempo_yields_no_beats() {
        assert_eq!(seconds_to_beats(0.0, 10.0), 0.0);
    }

    #[test]
    fn seconds_to_samples_truncates() {
        assert_eq!(seconds_to_samples(48000, 1.0), 48000);
        assert_eq!(seconds_to_samples(48000, 0.5), 24000);
        assert_eq!(seconds_to_samples(4, 0.6), 2);
    }

    #[test]
    fn samples_to_seconds_inverts_exact_values() {
        assert_eq!(samples_to_seconds(44100, 44100), 1.0);
        assert_eq!(seconds_to_samples(44100, samples_to_seconds(44100, 22050)), 22050);
    }
}
