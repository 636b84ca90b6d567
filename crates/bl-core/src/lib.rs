//! Core types for the beatline music engine.
//!
//! This crate defines the plain data shared between the control context
//! (which schedules and edits) and the render context (which produces
//! audio): time conversions, clamped controls, instrument messages and
//! sample data.
//!
//! Designed to be `no_std` compatible with the `alloc` crate.

#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

mod control;
mod error;
mod message;
mod pitch;
mod sample_data;
pub mod time;

pub use control::{
    build_controls, build_note_controls, Control, ControlArray, ControlOverride, ControlType,
    NoteControlArray, NoteControlOverride, NoteControlType,
};
pub use error::{Error, Result};
pub use message::{Message, TimedMessage};
pub use pitch::PitchKey;
pub use sample_data::{SampleData, Slice};
pub use time::{beats_to_seconds, samples_to_seconds, seconds_to_beats, seconds_to_samples};
