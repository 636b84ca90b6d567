//! Shared test instruments.

#![allow(dead_code)]

use beatline::{ControlArray, ControlType, NoteControlType, Processor};
use std::sync::{Arc, Mutex};

/// What a [`Recorder`] saw, with the absolute frame it happened at.
#[derive(Clone, Debug, PartialEq)]
pub enum Event {
    NoteOn { frame: usize, pitch: f32, intensity: f32 },
    NoteOff { frame: usize, pitch: f32 },
    Control { frame: usize, control_type: ControlType, value: f32 },
    NoteControl { frame: usize, pitch: f32, control_type: NoteControlType, value: f32 },
}

pub type Events = Arc<Mutex<Vec<Event>>>;

/// Processor that logs every message and outputs 1.0 while a note is on.
///
/// Frames are counted from the first processed sample, so blocks must be
/// rendered contiguously from time zero.
pub struct Recorder {
    events: Events,
    frame: usize,
    notes: usize,
}

impl Recorder {
    pub fn new() -> (Self, Events) {
        let events = Events::default();
        (Self { events: events.clone(), frame: 0, notes: 0 }, events)
    }
}

impl Processor for Recorder {
    fn init(&mut self, _sample_rate: u32, _reference_frequency: f32, _controls: &ControlArray) {}

    fn process(&mut self, output: &mut [f32]) {
        output.fill(if self.notes > 0 { 1.0 } else { 0.0 });
        self.frame += output.len();
    }

    fn set_note_on(&mut self, pitch: f32, intensity: f32) {
        self.notes += 1;
        self.events.lock().unwrap().push(Event::NoteOn { frame: self.frame, pitch, intensity });
    }

    fn set_note_off(&mut self, pitch: f32) {
        self.notes = self.notes.saturating_sub(1);
        self.events.lock().unwrap().push(Event::NoteOff { frame: self.frame, pitch });
    }

    fn set_control(&mut self, control_type: ControlType, value: f32) {
        self.events.lock().unwrap().push(Event::Control { frame: self.frame, control_type, value });
    }

    fn set_note_control(&mut self, pitch: f32, control_type: NoteControlType, value: f32) {
        self.events
            .lock()
            .unwrap()
            .push(Event::NoteControl { frame: self.frame, pitch, control_type, value });
    }
}

/// Install `env_logger` once so engine diagnostics show with `RUST_LOG`.
pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}
