//! Control-context engine.
//!
//! The [`Engine`] owns instruments and performers and advances the clock.
//! Each [`Engine::update`] walks the clock forward to a target timestamp in
//! steps that stop at every task boundary of every playing performer, so
//! no begin or end is skipped no matter how large the jump.

use alloc::boxed::Box;
use alloc::sync::Arc;
use ringbuf::traits::Split;
use ringbuf::HeapRb;
use slotmap::{new_key_type, SlotMap};

use bl_core::{
    beats_to_seconds, build_controls, seconds_to_beats, seconds_to_samples, ControlOverride, Error,
    Result,
};

use crate::config::EngineConfig;
use crate::instrument::Instrument;
use crate::instruments::{InstrumentId, Instruments};
use crate::logging::{log_debug, log_info, log_trace, log_warn, Logger};
use crate::message_queue::message_queue;
use crate::outbox::Outbox;
use crate::performer::Performer;
use crate::processor::{InstrumentProcessor, Processor};
use crate::reclaim::{reclaim_channel, Reclaimed};
use crate::renderer::{RenderCommand, Renderer, MAX_INSTRUMENTS};
use crate::task::{Task, TaskEvent, TaskId};

new_key_type! {
    /// Handle to a performer owned by an [`Engine`].
    pub struct PerformerId;
}

pub struct Engine {
    config: EngineConfig,
    tempo: f64,
    timestamp: f64,
    reference_frequency: f32,
    instruments: Instruments,
    performers: SlotMap<PerformerId, Performer>,
    /// Owning performer of every live task
    task_owners: SlotMap<TaskId, PerformerId>,
    commands: Outbox<RenderCommand>,
    reclaimed: Reclaimed,
    logger: Logger,
}

impl Engine {
    /// Create an engine and the renderer that plays its instruments.
    ///
    /// Diagnostics go to the `log` facade.
    pub fn new(config: EngineConfig) -> Result<(Self, Renderer)> {
        Self::build(config, Logger::facade())
    }

    /// Like [`Engine::new`], with diagnostics sent to `sink`.
    pub fn with_logger(config: EngineConfig, sink: Arc<dyn log::Log>) -> Result<(Self, Renderer)> {
        Self::build(config, Logger::new(sink))
    }

    fn build(config: EngineConfig, logger: Logger) -> Result<(Self, Renderer)> {
        config.validate()?;
        let (producer, consumer) = HeapRb::<RenderCommand>::new(config.command_capacity).split();
        let (reclaimer, reclaimed) = reclaim_channel(config.reclaim_capacity);
        let renderer = Renderer::new(config.sample_rate, config.max_frames, consumer, reclaimer);
        log_info!(
            logger,
            "engine created: {} Hz, {} BPM, reference {} Hz",
            config.sample_rate,
            config.tempo,
            config.reference_frequency
        );
        let engine = Self {
            tempo: config.tempo,
            timestamp: 0.0,
            reference_frequency: config.reference_frequency,
            instruments: Instruments::new(),
            performers: SlotMap::with_key(),
            task_owners: SlotMap::with_key(),
            commands: Outbox::new(producer),
            reclaimed,
            logger,
            config,
        };
        Ok((engine, renderer))
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn sample_rate(&self) -> u32 {
        self.config.sample_rate
    }

    /// Current time in seconds.
    pub fn timestamp(&self) -> f64 {
        self.timestamp
    }

    /// Tempo in beats per minute.
    pub fn tempo(&self) -> f64 {
        self.tempo
    }

    /// Negative tempos are clamped to zero. At zero the clock still moves but
    /// performers do not.
    pub fn set_tempo(&mut self, tempo: f64) {
        if tempo.is_nan() {
            return;
        }
        self.tempo = tempo.max(0.0);
    }

    pub fn reference_frequency(&self) -> f32 {
        self.reference_frequency
    }

    /// Set the frequency of pitch zero for every instrument. Negative values
    /// are clamped to zero.
    pub fn set_reference_frequency(&mut self, frequency: f32) {
        if frequency.is_nan() {
            return;
        }
        self.reference_frequency = frequency.max(0.0);
        for (_, instrument) in self.instruments.iter_mut() {
            instrument.set_reference_frequency(self.reference_frequency);
        }
    }

    /// Convert beats to seconds at the current tempo. Zero tempo yields
    /// infinity.
    pub fn beats_to_seconds(&self, beats: f64) -> f64 {
        if self.tempo > 0.0 {
            beats_to_seconds(self.tempo, beats)
        } else {
            f64::INFINITY
        }
    }

    /// Convert seconds to beats at the current tempo.
    pub fn seconds_to_beats(&self, seconds: f64) -> f64 {
        seconds_to_beats(self.tempo, seconds)
    }

    /// Advance the clock to `timestamp` seconds, running every task event
    /// that falls in between. Earlier timestamps are ignored.
    pub fn update(&mut self, timestamp: f64) {
        self.collect_garbage();
        self.commands.flush();
        while self.timestamp < timestamp {
            if self.tempo <= 0.0 {
                self.timestamp = timestamp;
                self.instruments.update(self.sample());
                break;
            }

            let mut step = seconds_to_beats(self.tempo, timestamp - self.timestamp);
            let mut has_tasks_to_process = false;
            for performer in self.performers.values() {
                if let Some(distance) = performer.next_due_distance() {
                    if distance < step {
                        step = distance;
                        has_tasks_to_process = true;
                    }
                }
            }

            if step <= 0.0 && !has_tasks_to_process {
                // Tempo too small for the remaining time to cover any beats
                self.timestamp = timestamp;
                self.instruments.update(self.sample());
                break;
            }

            if step > 0.0 {
                self.timestamp = if has_tasks_to_process {
                    (self.timestamp + beats_to_seconds(self.tempo, step)).min(timestamp)
                } else {
                    timestamp
                };
                // Instruments first, so messages sent by task callbacks carry
                // the sample of the boundary being crossed
                self.instruments.update(self.sample());
                for performer in self.performers.values_mut() {
                    performer.update(step, &mut self.instruments);
                }
            }

            if has_tasks_to_process {
                for performer in self.performers.values_mut() {
                    performer.process_all_tasks_at_position(&mut self.instruments);
                }
            }
        }
    }

    /// Drop objects the renderer has released. Called by [`Engine::update`].
    pub fn collect_garbage(&mut self) {
        let freed = self.reclaimed.drain();
        if freed > 0 {
            log_trace!(self.logger, "reclaimed {} render objects", freed);
        }
        let leaked = self.reclaimed.take_leaked();
        if leaked > 0 {
            log_warn!(self.logger, "reclaim ring full, leaked {} render objects", leaked);
        }
    }

    fn sample(&self) -> i64 {
        seconds_to_samples(self.config.sample_rate, self.timestamp)
    }

    fn send_command(&mut self, command: RenderCommand) {
        if !self.commands.push(command) {
            log_warn!(
                self.logger,
                "render command ring full, {} commands waiting",
                self.commands.backlog_len()
            );
        }
    }

    // =====================================================================
    // Instruments
    // =====================================================================

    /// Create an instrument driven by `processor`.
    ///
    /// The processor is initialized here and then handed to the renderer.
    pub fn create_instrument<P>(&mut self, mut processor: P, overrides: &[ControlOverride]) -> Result<InstrumentId>
    where
        P: Processor + 'static,
    {
        if self.instruments.len() >= MAX_INSTRUMENTS {
            return Err(Error::InstrumentLimit(MAX_INSTRUMENTS));
        }
        let controls = build_controls(overrides);
        processor.init(self.config.sample_rate, self.reference_frequency, &controls);
        let (sender, receiver) = message_queue(self.config.message_capacity);
        let render = Box::new(InstrumentProcessor::new(receiver, Box::new(processor), self.config.max_frames));
        let instrument = Instrument::new(controls, self.reference_frequency, self.sample(), sender, self.logger.clone());
        let id = self.instruments.insert(instrument);
        self.send_command(RenderCommand::Insert { id, processor: render });
        log_debug!(self.logger, "created instrument {:?}", id);
        Ok(id)
    }

    /// Destroy an instrument. Sounding notes are stopped (their callbacks
    /// run) before the renderer lets go of the processor.
    pub fn destroy_instrument(&mut self, id: InstrumentId) -> Result<()> {
        let mut instrument = self
            .instruments
            .remove(id)
            .ok_or_else(|| rejected(&self.logger, Error::InvalidInstrument))?;
        instrument.set_all_notes_off();
        self.send_command(RenderCommand::Remove { id });
        log_debug!(self.logger, "destroyed instrument {:?}", id);
        Ok(())
    }

    pub fn instruments(&self) -> &Instruments {
        &self.instruments
    }

    pub fn instruments_mut(&mut self) -> &mut Instruments {
        &mut self.instruments
    }

    // =====================================================================
    // Performers
    // =====================================================================

    pub fn create_performer(&mut self) -> PerformerId {
        let id = self.performers.insert(Performer::new());
        log_debug!(self.logger, "created performer {:?}", id);
        id
    }

    /// Destroy a performer. Its active tasks end and all of its tasks are
    /// destroyed.
    pub fn destroy_performer(&mut self, id: PerformerId) -> Result<()> {
        let mut performer = self
            .performers
            .remove(id)
            .ok_or_else(|| rejected(&self.logger, Error::InvalidPerformer))?;
        for task in performer.clear(&mut self.instruments) {
            self.task_owners.remove(task);
        }
        log_debug!(self.logger, "destroyed performer {:?}", id);
        Ok(())
    }

    pub fn performer(&self, id: PerformerId) -> Result<&Performer> {
        self.performers.get(id).ok_or(Error::InvalidPerformer)
    }

    pub fn start_performer(&mut self, id: PerformerId) -> Result<()> {
        let (performer, _) = self.performer_and_instruments(id)?;
        performer.start();
        Ok(())
    }

    /// Stop a performer. Its active tasks end.
    pub fn stop_performer(&mut self, id: PerformerId) -> Result<()> {
        let (performer, instruments) = self.performer_and_instruments(id)?;
        performer.stop(instruments);
        Ok(())
    }

    /// Jump to `position` beats. Negative positions are clamped to zero.
    pub fn set_performer_position(&mut self, id: PerformerId, position: f64) -> Result<()> {
        let position = self.check_position(position)?.max(0.0);
        let (performer, instruments) = self.performer_and_instruments(id)?;
        performer.set_position(position, instruments);
        Ok(())
    }

    pub fn set_performer_looping(&mut self, id: PerformerId, is_looping: bool) -> Result<()> {
        let (performer, instruments) = self.performer_and_instruments(id)?;
        performer.set_looping(is_looping, instruments);
        Ok(())
    }

    /// Negative loop begins are clamped to zero.
    pub fn set_performer_loop_begin(&mut self, id: PerformerId, loop_begin: f64) -> Result<()> {
        let loop_begin = self.check_position(loop_begin)?.max(0.0);
        let (performer, instruments) = self.performer_and_instruments(id)?;
        performer.set_loop_begin(loop_begin, instruments);
        Ok(())
    }

    pub fn set_performer_loop_length(&mut self, id: PerformerId, loop_length: f64) -> Result<()> {
        if !(loop_length > 0.0 && loop_length.is_finite()) {
            return Err(rejected(&self.logger, Error::InvalidLoopLength(loop_length)));
        }
        let (performer, instruments) = self.performer_and_instruments(id)?;
        performer.set_loop_length(loop_length, instruments);
        Ok(())
    }

    fn performer_and_instruments(&mut self, id: PerformerId) -> Result<(&mut Performer, &mut Instruments)> {
        let performer = self
            .performers
            .get_mut(id)
            .ok_or_else(|| rejected(&self.logger, Error::InvalidPerformer))?;
        Ok((performer, &mut self.instruments))
    }

    // =====================================================================
    // Tasks
    // =====================================================================

    /// Schedule `callback` over `[position, position + duration)` beats on
    /// a performer. Lower `priority` values run first at equal positions.
    pub fn create_task<F>(
        &mut self,
        performer: PerformerId,
        position: f64,
        duration: f64,
        priority: i32,
        callback: F,
    ) -> Result<TaskId>
    where
        F: FnMut(TaskEvent, &mut Instruments) + Send + 'static,
    {
        let position = self.check_position(position)?;
        let duration = self.check_duration(duration)?;
        let owner = self
            .performers
            .get_mut(performer)
            .ok_or_else(|| rejected(&self.logger, Error::InvalidPerformer))?;
        let id = self.task_owners.insert(performer);
        owner.add_task(id, position, duration, priority, Box::new(callback));
        log_debug!(self.logger, "created task {:?} at {} for {} beats", id, position, duration);
        Ok(id)
    }

    /// Destroy a task, ending it first if active.
    pub fn destroy_task(&mut self, id: TaskId) -> Result<()> {
        let (performer, instruments) = self.task_and_instruments(id)?;
        performer.remove_task(id, instruments);
        self.task_owners.remove(id);
        log_debug!(self.logger, "destroyed task {:?}", id);
        Ok(())
    }

    pub fn task(&self, id: TaskId) -> Result<&Task> {
        let owner = self.task_owners.get(id).ok_or(Error::InvalidTask)?;
        self.performers
            .get(*owner)
            .and_then(|performer| performer.task(id))
            .ok_or(Error::InvalidTask)
    }

    pub fn set_task_position(&mut self, id: TaskId, position: f64) -> Result<()> {
        let position = self.check_position(position)?;
        let (performer, instruments) = self.task_and_instruments(id)?;
        performer.set_task_position(id, position, instruments);
        Ok(())
    }

    pub fn set_task_duration(&mut self, id: TaskId, duration: f64) -> Result<()> {
        let duration = self.check_duration(duration)?;
        let (performer, instruments) = self.task_and_instruments(id)?;
        performer.set_task_duration(id, duration, instruments);
        Ok(())
    }

    pub fn set_task_priority(&mut self, id: TaskId, priority: i32) -> Result<()> {
        let (performer, _) = self.task_and_instruments(id)?;
        performer.set_task_priority(id, priority);
        Ok(())
    }

    /// Replace a task's callback. An active task ends on the old callback
    /// and begins again on the new one.
    pub fn set_task_callback<F>(&mut self, id: TaskId, callback: F) -> Result<()>
    where
        F: FnMut(TaskEvent, &mut Instruments) + Send + 'static,
    {
        let (performer, instruments) = self.task_and_instruments(id)?;
        performer.set_task_callback(id, Box::new(callback), instruments);
        Ok(())
    }

    fn task_and_instruments(&mut self, id: TaskId) -> Result<(&mut Performer, &mut Instruments)> {
        let owner = *self
            .task_owners
            .get(id)
            .ok_or_else(|| rejected(&self.logger, Error::InvalidTask))?;
        let performer = self.performers.get_mut(owner).ok_or(Error::InvalidTask)?;
        Ok((performer, &mut self.instruments))
    }

    fn check_position(&self, position: f64) -> Result<f64> {
        if position.is_finite() {
            Ok(position)
        } else {
            Err(rejected(&self.logger, Error::InvalidPosition(position)))
        }
    }

    fn check_duration(&self, duration: f64) -> Result<f64> {
        if duration > 0.0 && duration.is_finite() {
            Ok(duration)
        } else {
            Err(rejected(&self.logger, Error::InvalidDuration(duration)))
        }
    }
}

impl Drop for Engine {
    fn drop(&mut self) {
        for performer in self.performers.values_mut() {
            performer.stop(&mut self.instruments);
        }
        for (_, instrument) in self.instruments.iter_mut() {
            instrument.set_all_notes_off();
        }
    }
}

fn rejected(logger: &Logger, error: Error) -> Error {
    log_debug!(logger, "rejected: {}", error);
    error
}
