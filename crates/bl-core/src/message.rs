//! Messages carried from the control context to the render context.

use crate::control::{ControlType, NoteControlType};
use crate::sample_data::SampleData;

/// A state change for an instrument's DSP adapter.
#[derive(Clone, Debug, PartialEq)]
pub enum Message {
    /// Start a note
    NoteOn { pitch: f32, intensity: f32 },
    /// Release a note
    NoteOff { pitch: f32 },
    /// Set an instrument control
    ControlChange { control_type: ControlType, value: f32 },
    /// Set a control of one sounding note
    NoteControlChange { pitch: f32, control_type: NoteControlType, value: f32 },
    /// Set the frequency of pitch zero in hertz
    ReferenceFrequencyChange { frequency: f32 },
    /// Replace the instrument's sample data
    SampleDataChange { data: SampleData },
}

/// A message stamped with the absolute sample at which it takes effect.
#[derive(Clone, Debug, PartialEq)]
pub struct TimedMessage {
    pub sample: i64,
    pub message: Message,
}

impl TimedMessage {
    pub fn new(sample: i64, message: Message) -> Self {
        Self { sample, message }
    }
}
