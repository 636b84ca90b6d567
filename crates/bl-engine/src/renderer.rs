//! Render-context entry point.
//!
//! The [`Renderer`] owns the render halves of all instruments. It is moved
//! to the audio thread and driven from the audio callback. Registration
//! and removal arrive as commands through a ring, and everything it lets go
//! of is handed back through the reclaim ring, so a render call never
//! allocates or frees.

use alloc::boxed::Box;
use ringbuf::traits::Consumer;
use ringbuf::HeapCons;

use bl_core::{seconds_to_samples, Error, Result};

use crate::instruments::InstrumentId;
use crate::processor::InstrumentProcessor;
use crate::reclaim::{Reclaimer, Retired};

/// Most instruments that can be live at the same time.
pub const MAX_INSTRUMENTS: usize = 64;

/// Change to the renderer's instrument table.
pub(crate) enum RenderCommand {
    Insert { id: InstrumentId, processor: Box<InstrumentProcessor> },
    Remove { id: InstrumentId },
}

struct Slot {
    id: InstrumentId,
    processor: Box<InstrumentProcessor>,
}

pub struct Renderer {
    sample_rate: u32,
    max_frames: usize,
    commands: HeapCons<RenderCommand>,
    reclaimer: Reclaimer,
    slots: heapless::Vec<Slot, MAX_INSTRUMENTS>,
}

impl Renderer {
    pub(crate) fn new(
        sample_rate: u32,
        max_frames: usize,
        commands: HeapCons<RenderCommand>,
        reclaimer: Reclaimer,
    ) -> Self {
        Self { sample_rate, max_frames, commands, reclaimer, slots: heapless::Vec::new() }
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn max_frames(&self) -> usize {
        self.max_frames
    }

    /// Instruments currently registered on the render side.
    pub fn instrument_count(&self) -> usize {
        self.slots.len()
    }

    pub fn contains(&self, id: InstrumentId) -> bool {
        self.slots.iter().any(|slot| slot.id == id)
    }

    /// Render one instrument into the interleaved `output`, overwriting it.
    ///
    /// `timestamp` is the engine time in seconds of the first frame. The
    /// mono signal is written to all `channels`.
    pub fn process(
        &mut self,
        id: InstrumentId,
        output: &mut [f32],
        channels: usize,
        frames: usize,
        timestamp: f64,
    ) -> Result<()> {
        #[cfg(feature = "alloc_check")]
        {
            assert_no_alloc::assert_no_alloc(|| self.render_one(id, output, channels, frames, timestamp))
        }
        #[cfg(not(feature = "alloc_check"))]
        {
            self.render_one(id, output, channels, frames, timestamp)
        }
    }

    /// Render every instrument and sum them into the interleaved `output`,
    /// which is cleared first.
    pub fn process_all(&mut self, output: &mut [f32], channels: usize, frames: usize, timestamp: f64) -> Result<()> {
        #[cfg(feature = "alloc_check")]
        {
            assert_no_alloc::assert_no_alloc(|| self.render_mix(output, channels, frames, timestamp))
        }
        #[cfg(not(feature = "alloc_check"))]
        {
            self.render_mix(output, channels, frames, timestamp)
        }
    }

    fn render_one(
        &mut self,
        id: InstrumentId,
        output: &mut [f32],
        channels: usize,
        frames: usize,
        timestamp: f64,
    ) -> Result<()> {
        self.apply_commands();
        let len = self.check_buffer(output.len(), channels, frames)?;
        let process_sample = seconds_to_samples(self.sample_rate, timestamp);
        let slot = self
            .slots
            .iter_mut()
            .find(|slot| slot.id == id)
            .ok_or(Error::InvalidInstrument)?;
        slot.processor
            .process_interleaved(&mut output[..len], channels, frames, process_sample, &mut self.reclaimer);
        Ok(())
    }

    fn render_mix(&mut self, output: &mut [f32], channels: usize, frames: usize, timestamp: f64) -> Result<()> {
        self.apply_commands();
        let len = self.check_buffer(output.len(), channels, frames)?;
        let output = &mut output[..len];
        output.fill(0.0);
        let process_sample = seconds_to_samples(self.sample_rate, timestamp);
        for slot in self.slots.iter_mut() {
            slot.processor
                .mix_interleaved(output, channels, frames, process_sample, &mut self.reclaimer);
        }
        Ok(())
    }

    fn check_buffer(&self, len: usize, channels: usize, frames: usize) -> Result<usize> {
        if frames > self.max_frames {
            return Err(Error::BufferTooLarge { frames, max: self.max_frames });
        }
        let needed = channels.checked_mul(frames).ok_or(Error::InvalidBuffer)?;
        if channels == 0 || len < needed {
            return Err(Error::InvalidBuffer);
        }
        Ok(needed)
    }

    fn apply_commands(&mut self) {
        while let Some(command) = self.commands.try_pop() {
            match command {
                RenderCommand::Insert { id, processor } => {
                    if let Err(slot) = self.slots.push(Slot { id, processor }) {
                        self.reclaimer.retire(Retired::Processor(slot.processor));
                    }
                }
                RenderCommand::Remove { id } => {
                    if let Some(index) = self.slots.iter().position(|slot| slot.id == id) {
                        let slot = self.slots.swap_remove(index);
                        self.reclaimer.retire(Retired::Processor(slot.processor));
                    }
                }
            }
        }
    }
}
