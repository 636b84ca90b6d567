//! DSP adapter trait and the render half of an instrument.

use alloc::boxed::Box;
use alloc::vec;
use alloc::vec::Vec;

use bl_core::{ControlArray, ControlType, Message, NoteControlType, SampleData};

use crate::message_queue::MessageReceiver;
use crate::reclaim::{Reclaimer, Retired};

/// Sound generator driven by an instrument.
///
/// Every method runs on the render thread and must not allocate, free or
/// block. `process` receives a zeroed mono block and writes (or adds) its
/// output into it.
pub trait Processor: Send {
    /// Called once on the control thread before the processor is handed to
    /// the renderer.
    fn init(&mut self, sample_rate: u32, reference_frequency: f32, controls: &ControlArray);

    /// Render a block of mono samples.
    fn process(&mut self, output: &mut [f32]);

    fn set_note_on(&mut self, pitch: f32, intensity: f32);

    fn set_note_off(&mut self, pitch: f32);

    fn set_control(&mut self, control_type: ControlType, value: f32);

    fn set_note_control(&mut self, _pitch: f32, _control_type: NoteControlType, _value: f32) {}

    fn set_reference_frequency(&mut self, _frequency: f32) {}

    /// Take new sample data. Whatever is returned (usually the previous data)
    /// is freed later on the control thread.
    fn set_sample_data(&mut self, data: SampleData) -> Option<SampleData> {
        Some(data)
    }
}

/// Render half of an instrument: a message receiver feeding a processor.
pub struct InstrumentProcessor {
    receiver: MessageReceiver,
    processor: Box<dyn Processor>,
    scratch: Vec<f32>,
}

impl InstrumentProcessor {
    /// `max_frames` sizes the scratch block used for multichannel output.
    pub fn new(receiver: MessageReceiver, processor: Box<dyn Processor>, max_frames: usize) -> Self {
        Self { receiver, processor, scratch: vec![0.0; max_frames] }
    }

    /// Render `output.len()` mono samples starting at absolute sample
    /// `process_sample`, applying each queued message at its exact offset.
    pub fn process(&mut self, output: &mut [f32], process_sample: i64, reclaimer: &mut Reclaimer) {
        render_block(&mut self.receiver, &mut *self.processor, output, process_sample, reclaimer);
    }

    /// Render `frames` frames and write the mono signal to every channel of
    /// the interleaved `output`.
    ///
    /// `frames` must not exceed the `max_frames` given at construction.
    pub fn process_interleaved(
        &mut self,
        output: &mut [f32],
        channels: usize,
        frames: usize,
        process_sample: i64,
        reclaimer: &mut Reclaimer,
    ) {
        let mono = self.render_scratch(frames, process_sample, reclaimer);
        for (frame, &sample) in output.chunks_exact_mut(channels).zip(mono) {
            frame.fill(sample);
        }
    }

    /// Like [`Self::process_interleaved`] but adds into `output`.
    pub fn mix_interleaved(
        &mut self,
        output: &mut [f32],
        channels: usize,
        frames: usize,
        process_sample: i64,
        reclaimer: &mut Reclaimer,
    ) {
        let mono = self.render_scratch(frames, process_sample, reclaimer);
        for (frame, &sample) in output.chunks_exact_mut(channels).zip(mono) {
            for out in frame {
                *out += sample;
            }
        }
    }

    fn render_scratch(&mut self, frames: usize, process_sample: i64, reclaimer: &mut Reclaimer) -> &[f32] {
        let frames = frames.min(self.scratch.len());
        let block = &mut self.scratch[..frames];
        render_block(&mut self.receiver, &mut *self.processor, block, process_sample, reclaimer);
        block
    }
}

fn render_block(
    receiver: &mut MessageReceiver,
    processor: &mut dyn Processor,
    output: &mut [f32],
    process_sample: i64,
    reclaimer: &mut Reclaimer,
) {
    let len = output.len();
    let end_sample = process_sample + len as i64;
    let mut frame = 0;
    while let Some(timed) = receiver.next_before(end_sample) {
        // Late messages apply at the start of the block
        let offset = (timed.sample - process_sample).clamp(0, len as i64) as usize;
        if offset > frame {
            let span = &mut output[frame..offset];
            span.fill(0.0);
            processor.process(span);
            frame = offset;
        }
        apply_message(processor, timed.message, reclaimer);
    }
    if frame < len {
        let span = &mut output[frame..];
        span.fill(0.0);
        processor.process(span);
    }
}

fn apply_message(processor: &mut dyn Processor, message: Message, reclaimer: &mut Reclaimer) {
    match message {
        Message::NoteOn { pitch, intensity } => processor.set_note_on(pitch, intensity),
        Message::NoteOff { pitch } => processor.set_note_off(pitch),
        Message::ControlChange { control_type, value } => processor.set_control(control_type, value),
        Message::NoteControlChange { pitch, control_type, value } => {
            processor.set_note_control(pitch, control_type, value)
        }
        Message::ReferenceFrequencyChange { frequency } => processor.set_reference_frequency(frequency),
        Message::SampleDataChange { data } => {
            if let Some(old) = processor.set_sample_data(data) {
                reclaimer.retire(Retired::SampleData(old));
            }
        }
    }
}
