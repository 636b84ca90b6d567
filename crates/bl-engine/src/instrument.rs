//! Control half of an instrument.

use alloc::boxed::Box;
use alloc::collections::BTreeMap;

use bl_core::{
    build_note_controls, ControlArray, ControlType, Message, NoteControlArray, NoteControlOverride,
    NoteControlType, PitchKey, SampleData,
};

use crate::logging::{log_trace, log_warn, Logger};
use crate::message_queue::MessageSender;

/// Called with `(pitch, intensity)` when a note starts.
pub type NoteOnCallback = Box<dyn FnMut(f32, f32) + Send>;
/// Called with the pitch when a note stops.
pub type NoteOffCallback = Box<dyn FnMut(f32) + Send>;
/// Called with the new clamped value when a control changes.
pub type ControlCallback = Box<dyn FnMut(ControlType, f32) + Send>;

/// Authoritative control-side state of an instrument.
///
/// Every state change is stamped with the current update sample and sent
/// to the render half. Redundant changes send nothing.
pub struct Instrument {
    controls: ControlArray,
    note_controls: BTreeMap<PitchKey, NoteControlArray>,
    reference_frequency: f32,
    update_sample: i64,
    sender: MessageSender,
    note_on_callback: Option<NoteOnCallback>,
    note_off_callback: Option<NoteOffCallback>,
    control_callback: Option<ControlCallback>,
    logger: Logger,
}

impl Instrument {
    pub(crate) fn new(
        controls: ControlArray,
        reference_frequency: f32,
        update_sample: i64,
        sender: MessageSender,
        logger: Logger,
    ) -> Self {
        Self {
            controls,
            note_controls: BTreeMap::new(),
            reference_frequency,
            update_sample,
            sender,
            note_on_callback: None,
            note_off_callback: None,
            control_callback: None,
            logger,
        }
    }

    pub fn control(&self, control_type: ControlType) -> f32 {
        self.controls[control_type.index()].value
    }

    pub fn controls(&self) -> &ControlArray {
        &self.controls
    }

    /// Value of a note control, or `None` if the note is not on.
    pub fn note_control(&self, pitch: f32, control_type: NoteControlType) -> Option<f32> {
        let key = PitchKey::new(pitch)?;
        self.note_controls.get(&key).map(|controls| controls[control_type.index()].value)
    }

    pub fn is_note_on(&self, pitch: f32) -> bool {
        PitchKey::new(pitch).is_some_and(|key| self.note_controls.contains_key(&key))
    }

    /// Pitches of the sounding notes in ascending order.
    pub fn notes_on(&self) -> impl Iterator<Item = f32> + '_ {
        self.note_controls.keys().map(|key| key.pitch())
    }

    pub fn reference_frequency(&self) -> f32 {
        self.reference_frequency
    }

    /// Sample at which new messages are stamped.
    pub fn update_sample(&self) -> i64 {
        self.update_sample
    }

    /// Messages waiting for room in the render queue.
    pub fn backlog_len(&self) -> usize {
        self.sender.backlog_len()
    }

    /// Clamp and store a control. Returns whether the value changed.
    pub fn set_control(&mut self, control_type: ControlType, value: f32) -> bool {
        let control = &mut self.controls[control_type.index()];
        if !control.set_value(value) {
            return false;
        }
        let value = control.value;
        if let Some(callback) = &mut self.control_callback {
            callback(control_type, value);
        }
        self.send(Message::ControlChange { control_type, value });
        true
    }

    /// Clamp and store a control of a sounding note. Returns whether the
    /// value changed; nothing happens if the note is not on.
    pub fn set_note_control(&mut self, pitch: f32, control_type: NoteControlType, value: f32) -> bool {
        let Some(key) = PitchKey::new(pitch) else {
            return false;
        };
        let Some(controls) = self.note_controls.get_mut(&key) else {
            return false;
        };
        let control = &mut controls[control_type.index()];
        if !control.set_value(value) {
            return false;
        }
        let value = control.value;
        self.send(Message::NoteControlChange { pitch: key.pitch(), control_type, value });
        true
    }

    /// Start a note. Returns `false` if it was already on.
    ///
    /// Note controls that differ from their defaults follow the note-on at
    /// the same sample.
    pub fn set_note_on(&mut self, pitch: f32, intensity: f32, overrides: &[NoteControlOverride]) -> bool {
        let Some(key) = PitchKey::new(pitch) else {
            return false;
        };
        if self.note_controls.contains_key(&key) {
            return false;
        }
        let controls = build_note_controls(overrides);
        self.note_controls.insert(key, controls);
        let pitch = key.pitch();
        if let Some(callback) = &mut self.note_on_callback {
            callback(pitch, intensity);
        }
        self.send(Message::NoteOn { pitch, intensity });
        for control_type in NoteControlType::ALL {
            let value = controls[control_type.index()].value;
            if value != control_type.default_control().value {
                self.send(Message::NoteControlChange { pitch, control_type, value });
            }
        }
        true
    }

    /// Stop a note. Returns `false` if it was not on.
    pub fn set_note_off(&mut self, pitch: f32) -> bool {
        let Some(key) = PitchKey::new(pitch) else {
            return false;
        };
        if self.note_controls.remove(&key).is_none() {
            return false;
        }
        self.note_stopped(key.pitch());
        true
    }

    /// Stop every sounding note in ascending pitch order.
    pub fn set_all_notes_off(&mut self) {
        let notes = core::mem::take(&mut self.note_controls);
        for key in notes.into_keys() {
            self.note_stopped(key.pitch());
        }
    }

    /// Set the frequency of pitch zero. Returns whether it changed.
    pub fn set_reference_frequency(&mut self, frequency: f32) -> bool {
        if frequency.is_nan() || frequency == self.reference_frequency {
            return false;
        }
        self.reference_frequency = frequency;
        self.send(Message::ReferenceFrequencyChange { frequency });
        true
    }

    pub fn set_sample_data(&mut self, data: SampleData) {
        self.send(Message::SampleDataChange { data });
    }

    pub fn set_note_on_callback(&mut self, callback: Option<NoteOnCallback>) {
        self.note_on_callback = callback;
    }

    pub fn set_note_off_callback(&mut self, callback: Option<NoteOffCallback>) {
        self.note_off_callback = callback;
    }

    pub fn set_control_callback(&mut self, callback: Option<ControlCallback>) {
        self.control_callback = callback;
    }

    /// Advance the stamp for future messages and retry any backlog.
    pub(crate) fn update(&mut self, update_sample: i64) {
        debug_assert!(update_sample >= self.update_sample, "update sample must not decrease");
        self.update_sample = self.update_sample.max(update_sample);
        if self.sender.backlog_len() > 0 && self.sender.flush() == 0 {
            log_trace!(self.logger, "instrument message backlog drained");
        }
    }

    fn note_stopped(&mut self, pitch: f32) {
        if let Some(callback) = &mut self.note_off_callback {
            callback(pitch);
        }
        self.send(Message::NoteOff { pitch });
    }

    fn send(&mut self, message: Message) {
        if !self.sender.send(self.update_sample, message) && self.sender.backlog_len() == 1 {
            log_warn!(self.logger, "instrument message queue full, deferring messages");
        }
    }
}
