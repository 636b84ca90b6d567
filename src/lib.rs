//! beatline: a real-time music engine.
//!
//! Tasks are scheduled on performers in beats and run on the control
//! thread as the engine clock advances. Instrument changes they make are
//! stamped with an absolute sample and applied by the render thread at the
//! exact frame, without locks or allocation.
//!
//! ```
//! use beatline::{Engine, EngineConfig, TaskEvent};
//! # use beatline::{ControlArray, ControlType, Processor};
//! # struct Silence;
//! # impl Processor for Silence {
//! #     fn init(&mut self, _: u32, _: f32, _: &ControlArray) {}
//! #     fn process(&mut self, _: &mut [f32]) {}
//! #     fn set_note_on(&mut self, _: f32, _: f32) {}
//! #     fn set_note_off(&mut self, _: f32) {}
//! #     fn set_control(&mut self, _: ControlType, _: f32) {}
//! # }
//!
//! let (mut engine, mut renderer) = Engine::new(EngineConfig::default()).unwrap();
//! let piano = engine.create_instrument(Silence, &[]).unwrap();
//! let performer = engine.create_performer();
//! engine
//!     .create_task(performer, 1.0, 0.5, 0, move |event, instruments| match event {
//!         TaskEvent::Begin => instruments.set_note_on(piano, 0.0, 1.0, &[]).unwrap(),
//!         TaskEvent::End => instruments.set_note_off(piano, 0.0).unwrap(),
//!         TaskEvent::Update { .. } => {}
//!     })
//!     .unwrap();
//! engine.start_performer(performer).unwrap();
//!
//! engine.update(1.0);
//! let mut block = [0.0f32; 2 * 256];
//! renderer.process(piano, &mut block, 2, 256, 0.0).unwrap();
//! ```

#![cfg_attr(not(feature = "std"), no_std)]

pub use bl_core::*;
pub use bl_engine::*;
