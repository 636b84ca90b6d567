//! Scheduling and cross-thread messaging for the beatline music engine.
//!
//! The control context owns an [`Engine`]: instruments, performers and
//! their tasks. [`Engine::update`] advances the clock and runs task
//! callbacks, which change instrument state through [`Instruments`]. Each
//! change becomes a sample-stamped message on a lock-free queue that the
//! render context drains in [`Renderer::process`], applying every message
//! at its exact sample offset inside the block.
//!
//! Designed to be `no_std` compatible with the `alloc` crate.

#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

mod config;
mod engine;
mod instrument;
mod instruments;
mod logging;
mod message_queue;
mod outbox;
mod performer;
mod processor;
mod reclaim;
mod renderer;
mod task;

pub use config::EngineConfig;
pub use engine::{Engine, PerformerId};
pub use instrument::{ControlCallback, Instrument, NoteOffCallback, NoteOnCallback};
pub use instruments::{InstrumentId, Instruments};
pub use logging::{Logger, LOG_TARGET};
pub use message_queue::{message_queue, MessageReceiver, MessageSender};
pub use performer::Performer;
pub use processor::{InstrumentProcessor, Processor};
pub use reclaim::{Reclaimer, Retired};
pub use renderer::{Renderer, MAX_INSTRUMENTS};
pub use task::{Task, TaskCallback, TaskEvent, TaskId};
