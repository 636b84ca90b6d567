//! Engine configuration.

use bl_core::{Error, Result};

/// Configuration for an [`crate::Engine`] and its [`crate::Renderer`].
#[derive(Clone, Debug, PartialEq)]
pub struct EngineConfig {
    /// Render sample rate in hertz
    pub sample_rate: u32,
    /// Frequency of pitch zero in hertz
    pub reference_frequency: f32,
    /// Initial tempo in beats per minute
    pub tempo: f64,
    /// Largest block the renderer accepts in one call, in frames
    pub max_frames: usize,
    /// Ring capacity of each instrument's message queue
    pub message_capacity: usize,
    /// Ring capacity for instrument registration commands
    pub command_capacity: usize,
    /// Ring capacity for objects handed back from the render side
    pub reclaim_capacity: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            sample_rate: 48000,
            reference_frequency: 440.0,
            tempo: 120.0,
            max_frames: 4096,
            message_capacity: 1024,
            command_capacity: 128,
            reclaim_capacity: 256,
        }
    }
}

impl EngineConfig {
    pub fn with_sample_rate(mut self, sample_rate: u32) -> Self {
        self.sample_rate = sample_rate;
        self
    }

    pub fn with_reference_frequency(mut self, reference_frequency: f32) -> Self {
        self.reference_frequency = reference_frequency;
        self
    }

    pub fn with_tempo(mut self, tempo: f64) -> Self {
        self.tempo = tempo;
        self
    }

    pub fn with_max_frames(mut self, max_frames: usize) -> Self {
        self.max_frames = max_frames;
        self
    }

    pub fn with_message_capacity(mut self, message_capacity: usize) -> Self {
        self.message_capacity = message_capacity;
        self
    }

    pub fn with_command_capacity(mut self, command_capacity: usize) -> Self {
        self.command_capacity = command_capacity;
        self
    }

    pub fn with_reclaim_capacity(mut self, reclaim_capacity: usize) -> Self {
        self.reclaim_capacity = reclaim_capacity;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.sample_rate == 0 {
            return Err(Error::InvalidConfig("sample_rate must be positive"));
        }
        if !(self.reference_frequency >= 0.0 && self.reference_frequency.is_finite()) {
            return Err(Error::InvalidConfig("reference_frequency must be finite and non-negative"));
        }
        if !(self.tempo >= 0.0 && self.tempo.is_finite()) {
            return Err(Error::InvalidConfig("tempo must be finite and non-negative"));
        }
        if self.max_frames == 0 {
            return Err(Error::InvalidConfig("max_frames must be positive"));
        }
        if self.message_capacity == 0 || self.command_capacity == 0 || self.reclaim_capacity == 0 {
            return Err(Error::InvalidConfig("ring capacities must be positive"));
        }
        Ok(())
    }
}
