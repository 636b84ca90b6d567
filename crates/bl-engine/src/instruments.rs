//! Handle-addressed collection of instruments.
//!
//! This is what task callbacks receive, so scheduled code can play notes
//! and change controls while the engine is updating.

use bl_core::{ControlType, Error, NoteControlOverride, NoteControlType, Result, SampleData};
use slotmap::{new_key_type, SlotMap};

use crate::instrument::{ControlCallback, Instrument, NoteOffCallback, NoteOnCallback};

new_key_type! {
    /// Handle to an instrument owned by an [`crate::Engine`].
    pub struct InstrumentId;
}

#[derive(Default)]
pub struct Instruments {
    map: SlotMap<InstrumentId, Instrument>,
}

impl Instruments {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    pub fn contains(&self, id: InstrumentId) -> bool {
        self.map.contains_key(id)
    }

    pub fn ids(&self) -> impl Iterator<Item = InstrumentId> + '_ {
        self.map.keys()
    }

    pub fn get(&self, id: InstrumentId) -> Result<&Instrument> {
        self.map.get(id).ok_or(Error::InvalidInstrument)
    }

    pub fn get_mut(&mut self, id: InstrumentId) -> Result<&mut Instrument> {
        self.map.get_mut(id).ok_or(Error::InvalidInstrument)
    }

    pub fn control(&self, id: InstrumentId, control_type: ControlType) -> Result<f32> {
        Ok(self.get(id)?.control(control_type))
    }

    pub fn set_control(&mut self, id: InstrumentId, control_type: ControlType, value: f32) -> Result<()> {
        self.get_mut(id)?.set_control(control_type, value);
        Ok(())
    }

    /// Fails with [`Error::NoteNotOn`] if the note is not sounding.
    pub fn note_control(&self, id: InstrumentId, pitch: f32, control_type: NoteControlType) -> Result<f32> {
        let pitch = check_pitch(pitch)?;
        self.get(id)?.note_control(pitch, control_type).ok_or(Error::NoteNotOn)
    }

    /// Fails with [`Error::NoteNotOn`] if the note is not sounding.
    pub fn set_note_control(
        &mut self,
        id: InstrumentId,
        pitch: f32,
        control_type: NoteControlType,
        value: f32,
    ) -> Result<()> {
        let pitch = check_pitch(pitch)?;
        let instrument = self.get_mut(id)?;
        if !instrument.is_note_on(pitch) {
            return Err(Error::NoteNotOn);
        }
        instrument.set_note_control(pitch, control_type, value);
        Ok(())
    }

    pub fn is_note_on(&self, id: InstrumentId, pitch: f32) -> Result<bool> {
        let pitch = check_pitch(pitch)?;
        Ok(self.get(id)?.is_note_on(pitch))
    }

    /// Start a note. Starting a note that is already on does nothing.
    pub fn set_note_on(
        &mut self,
        id: InstrumentId,
        pitch: f32,
        intensity: f32,
        overrides: &[NoteControlOverride],
    ) -> Result<()> {
        let pitch = check_pitch(pitch)?;
        self.get_mut(id)?.set_note_on(pitch, intensity, overrides);
        Ok(())
    }

    /// Stop a note. Stopping a note that is not on does nothing.
    pub fn set_note_off(&mut self, id: InstrumentId, pitch: f32) -> Result<()> {
        let pitch = check_pitch(pitch)?;
        self.get_mut(id)?.set_note_off(pitch);
        Ok(())
    }

    pub fn set_all_notes_off(&mut self, id: InstrumentId) -> Result<()> {
        self.get_mut(id)?.set_all_notes_off();
        Ok(())
    }

    /// Negative frequencies are clamped to zero.
    pub fn set_reference_frequency(&mut self, id: InstrumentId, frequency: f32) -> Result<()> {
        self.get_mut(id)?.set_reference_frequency(frequency.max(0.0));
        Ok(())
    }

    pub fn set_sample_data(&mut self, id: InstrumentId, data: SampleData) -> Result<()> {
        self.get_mut(id)?.set_sample_data(data);
        Ok(())
    }

    pub fn set_note_on_callback(&mut self, id: InstrumentId, callback: Option<NoteOnCallback>) -> Result<()> {
        self.get_mut(id)?.set_note_on_callback(callback);
        Ok(())
    }

    pub fn set_note_off_callback(&mut self, id: InstrumentId, callback: Option<NoteOffCallback>) -> Result<()> {
        self.get_mut(id)?.set_note_off_callback(callback);
        Ok(())
    }

    pub fn set_control_callback(&mut self, id: InstrumentId, callback: Option<ControlCallback>) -> Result<()> {
        self.get_mut(id)?.set_control_callback(callback);
        Ok(())
    }

    pub(crate) fn insert(&mut self, instrument: Instrument) -> InstrumentId {
        self.map.insert(instrument)
    }

    pub(crate) fn remove(&mut self, id: InstrumentId) -> Option<Instrument> {
        self.map.remove(id)
    }

    pub(crate) fn iter_mut(&mut self) -> impl Iterator<Item = (InstrumentId, &mut Instrument)> + '_ {
        self.map.iter_mut()
    }

    /// Stamp future messages of every instrument with `update_sample`.
    pub(crate) fn update(&mut self, update_sample: i64) {
        for instrument in self.map.values_mut() {
            instrument.update(update_sample);
        }
    }
}

fn check_pitch(pitch: f32) -> Result<f32> {
    if pitch.is_nan() {
        Err(Error::InvalidPitch)
    } else {
        Ok(pitch)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logging::Logger;
    use crate::message_queue::message_queue;
    use bl_core::build_controls;

    fn with_one() -> (Instruments, InstrumentId) {
        let mut instruments = Instruments::new();
        let (sender, _receiver) = message_queue(16);
        let id = instruments.insert(Instrument::new(build_controls(&[]), 440.0, 0, sender, Logger::facade()));
        (instruments, id)
    }

    #[test]
    fn destroyed_handle_is_rejected() {
        let (mut instruments, id) = with_one();
        instruments.remove(id);
        assert_eq!(instruments.set_note_on(id, 0.0, 1.0, &[]), Err(Error::InvalidInstrument));
        assert_eq!(instruments.control(id, ControlType::Gain), Err(Error::InvalidInstrument));
    }

    #[test]
    fn nan_pitch_is_rejected() {
        let (mut instruments, id) = with_one();
        assert_eq!(instruments.set_note_on(id, f32::NAN, 1.0, &[]), Err(Error::InvalidPitch));
        assert_eq!(instruments.is_note_on(id, f32::NAN), Err(Error::InvalidPitch));
    }

    #[test]
    fn note_control_needs_note_on() {
        let (mut instruments, id) = with_one();
        assert_eq!(
            instruments.set_note_control(id, 0.0, NoteControlType::Gain, 0.5),
            Err(Error::NoteNotOn)
        );
        instruments.set_note_on(id, 0.0, 1.0, &[]).unwrap();
        instruments.set_note_control(id, 0.0, NoteControlType::Gain, 0.5).unwrap();
        assert_eq!(instruments.note_control(id, 0.0, NoteControlType::Gain), Ok(0.5));
    }

    #[test]
    fn control_round_trips_clamped() {
        let (mut instruments, id) = with_one();
        instruments.set_control(id, ControlType::Sustain, -3.0).unwrap();
        assert_eq!(instruments.control(id, ControlType::Sustain), Ok(0.0));
        instruments.set_control(id, ControlType::Sustain, 0.4).unwrap();
        assert_eq!(instruments.control(id, ControlType::Sustain), Ok(0.4));
    }

    #[test]
    fn negative_reference_frequency_clamps_to_zero() {
        let (mut instruments, id) = with_one();
        instruments.set_reference_frequency(id, -10.0).unwrap();
        assert_eq!(instruments.get(id).unwrap().reference_frequency(), 0.0);
    }
}
