//! Error type shared by the control and render sides.
//!
//! Variants carry only plain values so that an error can be produced on the
//! render thread without touching the allocator.

use thiserror::Error;

/// Errors reported by engine operations.
#[derive(Error, Clone, Copy, Debug, PartialEq)]
pub enum Error {
    #[error("invalid or destroyed instrument handle")]
    InvalidInstrument,

    #[error("invalid or destroyed performer handle")]
    InvalidPerformer,

    #[error("invalid or destroyed task handle")]
    InvalidTask,

    #[error("control type {0} is out of range")]
    InvalidControlType(u32),

    #[error("note control type {0} is out of range")]
    InvalidNoteControlType(u32),

    #[error("pitch must be a number")]
    InvalidPitch,

    #[error("note is not on")]
    NoteNotOn,

    #[error("task duration {0} must be positive")]
    InvalidDuration(f64),

    #[error("loop length {0} must be positive")]
    InvalidLoopLength(f64),

    #[error("position {0} must be a number")]
    InvalidPosition(f64),

    #[error("invalid config: {0}")]
    InvalidConfig(&'static str),

    #[error("instrument limit of {0} reached")]
    InstrumentLimit(usize),

    #[error("buffer of {frames} frames exceeds the maximum of {max}")]
    BufferTooLarge { frames: usize, max: usize },

    #[error("output buffer does not match the channel and frame counts")]
    InvalidBuffer,
}

/// Result alias used across the engine.
pub type Result<T> = core::result::Result<T, Error>;
