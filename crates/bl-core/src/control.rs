//! Clamped control values and the instrument control set.

use crate::error::Error;

/// A single clamped numeric parameter.
///
/// `min <= value <= max` holds at all times.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Control {
    pub value: f32,
    pub min: f32,
    pub max: f32,
}

impl Control {
    /// Create a control with a default value and inclusive bounds.
    pub fn new(value: f32, min: f32, max: f32) -> Self {
        debug_assert!(min <= value && value <= max);
        Self { value, min, max }
    }

    /// Create a control with no practical bounds.
    pub fn unbounded(value: f32) -> Self {
        Self::new(value, f32::MIN, f32::MAX)
    }

    /// Clamp and store `value`, returning whether the stored value changed.
    ///
    /// NaN is ignored.
    pub fn set_value(&mut self, value: f32) -> bool {
        if value.is_nan() {
            return false;
        }
        let value = value.clamp(self.min, self.max);
        if value == self.value {
            return false;
        }
        self.value = value;
        true
    }
}

/// Instrument-wide control slots.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u32)]
pub enum ControlType {
    /// Linear output gain
    Gain = 0,
    /// Number of simultaneous voices
    VoiceCount,
    /// Oscillator waveform selector
    OscillatorShape,
    /// How sample data is played back
    SamplePlaybackMode,
    /// Envelope attack in seconds
    Attack,
    /// Envelope decay in seconds
    Decay,
    /// Envelope sustain level
    Sustain,
    /// Envelope release in seconds
    Release,
    /// Pitch offset in octaves
    PitchShift,
    /// Whether a sounding voice restarts on note-on (0 or 1)
    Retrigger,
    /// Filter type selector
    FilterType,
    /// Filter cutoff in hertz
    FilterFrequency,
}

impl ControlType {
    /// Number of control types.
    pub const COUNT: usize = 12;

    /// All control types in index order.
    pub const ALL: [ControlType; Self::COUNT] = [
        ControlType::Gain,
        ControlType::VoiceCount,
        ControlType::OscillatorShape,
        ControlType::SamplePlaybackMode,
        ControlType::Attack,
        ControlType::Decay,
        ControlType::Sustain,
        ControlType::Release,
        ControlType::PitchShift,
        ControlType::Retrigger,
        ControlType::FilterType,
        ControlType::FilterFrequency,
    ];

    /// Position of this type in a [`ControlArray`].
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Default value and bounds for this control.
    pub fn default_control(self) -> Control {
        match self {
            ControlType::Gain => Control::new(1.0, 0.0, 1.0),
            ControlType::VoiceCount => Control::new(8.0, 1.0, 20.0),
            ControlType::OscillatorShape => Control::new(0.0, 0.0, 4.0),
            ControlType::SamplePlaybackMode => Control::new(0.0, 0.0, 3.0),
            ControlType::Attack => Control::new(0.0, 0.0, 60.0),
            ControlType::Decay => Control::new(0.0, 0.0, 60.0),
            ControlType::Sustain => Control::new(1.0, 0.0, 1.0),
            ControlType::Release => Control::new(0.0, 0.0, 60.0),
            ControlType::PitchShift => Control::unbounded(0.0),
            ControlType::Retrigger => Control::new(0.0, 0.0, 1.0),
            ControlType::FilterType => Control::new(0.0, 0.0, 2.0),
            ControlType::FilterFrequency => Control::new(0.0, 0.0, f32::MAX),
        }
    }
}

impl TryFrom<u32> for ControlType {
    type Error = Error;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        ControlType::ALL
            .get(value as usize)
            .copied()
            .ok_or(Error::InvalidControlType(value))
    }
}

/// Per-note control slots.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u32)]
pub enum NoteControlType {
    /// Linear note gain
    Gain = 0,
    /// Note pitch offset in octaves
    PitchShift,
}

impl NoteControlType {
    /// Number of note control types.
    pub const COUNT: usize = 2;

    /// All note control types in index order.
    pub const ALL: [NoteControlType; Self::COUNT] =
        [NoteControlType::Gain, NoteControlType::PitchShift];

    /// Position of this type in a [`NoteControlArray`].
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Default value and bounds for this note control.
    pub fn default_control(self) -> Control {
        match self {
            NoteControlType::Gain => Control::new(1.0, 0.0, 1.0),
            NoteControlType::PitchShift => Control::unbounded(0.0),
        }
    }
}

impl TryFrom<u32> for NoteControlType {
    type Error = Error;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        NoteControlType::ALL
            .get(value as usize)
            .copied()
            .ok_or(Error::InvalidNoteControlType(value))
    }
}

/// Initial value for one control, applied at instrument creation.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ControlOverride {
    pub control_type: ControlType,
    pub value: f32,
}

impl ControlOverride {
    pub const fn new(control_type: ControlType, value: f32) -> Self {
        Self { control_type, value }
    }
}

/// Initial value for one note control, applied at note-on.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct NoteControlOverride {
    pub control_type: NoteControlType,
    pub value: f32,
}

impl NoteControlOverride {
    pub const fn new(control_type: NoteControlType, value: f32) -> Self {
        Self { control_type, value }
    }
}

/// Controls of an instrument, indexed by [`ControlType::index`].
pub type ControlArray = [Control; ControlType::COUNT];

/// Controls of a sounding note, indexed by [`NoteControlType::index`].
pub type NoteControlArray = [Control; NoteControlType::COUNT];

/// Build an instrument control array from defaults plus `overrides`.
///
/// Later overrides of the same type win. Values are clamped.
pub fn build_controls(overrides: &[ControlOverride]) -> ControlArray {
    let mut controls = ControlType::ALL.map(ControlType::default_control);
    for o in overrides {
        controls[o.control_type.index()].set_value(o.value);
    }
    controls
}

/// Build a note control array from defaults plus `overrides`.
pub fn build_note_controls(overrides: &[NoteControlOverride]) -> NoteControlArray {
    let mut controls = NoteControlType::ALL.map(NoteControlType::default_control);
    for o in overrides {
        controls[o.control_type.index()].set_value(o.value);
    }
    controls
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_value_clamps_and_reports_change() {
        let mut c = Control::new(0.5, 0.0, 1.0);
        assert!(c.set_value(2.0));
        assert_eq!(c.value, 1.0);
        // Already at the clamped value
        assert!(!c.set_value(3.0));
        assert!(c.set_value(-1.0));
        assert_eq!(c.value, 0.0);
    }

    #[test]
    fn set_value_ignores_nan() {
        let mut c = Control::new(0.5, 0.0, 1.0);
        assert!(!c.set_value(f32::NAN));
        assert_eq!(c.value, 0.5);
    }

    #[test]
    fn defaults_lie_within_bounds() {
        for t in ControlType::ALL {
            let c = t.default_control();
            assert!(c.min <= c.value && c.value <= c.max, "{:?}", t);
        }
        for t in NoteControlType::ALL {
            let c = t.default_control();
            assert!(c.min <= c.value && c.value <= c.max, "{:?}", t);
        }
    }

    #[test]
    fn index_matches_all_order() {
        for (i, t) in ControlType::ALL.iter().enumerate() {
            assert_eq!(t.index(), i);
        }
        for (i, t) in NoteControlType::ALL.iter().enumerate() {
            assert_eq!(t.index(), i);
        }
    }

    #[test]
    fn try_from_rejects_out_of_range() {
        assert_eq!(ControlType::try_from(0), Ok(ControlType::Gain));
        assert_eq!(ControlType::try_from(11), Ok(ControlType::FilterFrequency));
        assert_eq!(ControlType::try_from(12), Err(Error::InvalidControlType(12)));
        assert_eq!(NoteControlType::try_from(1), Ok(NoteControlType::PitchShift));
        assert_eq!(NoteControlType::try_from(2), Err(Error::InvalidNoteControlType(2)));
    }

    #[test]
    fn build_controls_applies_clamped_overrides() {
        let controls = build_controls(&[
            ControlOverride::new(ControlType::Gain, 0.25),
            ControlOverride::new(ControlType::VoiceCount, 100.0),
        ]);
        assert_eq!(controls[ControlType::Gain.index()].value, 0.25);
        assert_eq!(controls[ControlType::VoiceCount.index()].value, 20.0);
        assert_eq!(controls[ControlType::Sustain.index()].value, 1.0);
    }

    #[test]
    fn build_note_controls_defaults() {
        let controls = build_note_controls(&[]);
        assert_eq!(controls[NoteControlType::Gain.index()].value, 1.0);
        assert_eq!(controls[NoteControlType::PitchShift.index()].value, 0.0);
    }
}
