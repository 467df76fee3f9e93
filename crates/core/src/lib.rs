//! Core library for the Glowbit 8x8 display simulator.
//!
//! A lesson program, translated from visual blocks into calls against
//! [`RuntimeSession`], queues display, sound and timing commands and
//! registers handlers for simulated input. The session executes queued
//! commands strictly one at a time against its framebuffers, dispatches
//! triggered events and hands rendered frames to the host.
//!
//! Time is virtual: the host advances the session clock, which keeps every
//! module deterministic under test.

pub mod color;
pub mod command;
pub mod config;
pub mod display;
pub mod error;
pub mod events;
pub mod framebuffer;
pub mod queue;
pub mod raster;
pub mod session;
pub mod sound;
pub mod timeline;

pub use color::Rgb;
pub use command::{Command, CommandKind, Pitch, SurfaceId};
pub use config::{AppConfig, DisplayConfig, SoundConfig, TimingConfig};
pub use display::{DisplayEngine, Frame, FrameLog, RenderSink};
pub use error::{GlowbitError, Result};
pub use events::{EventName, EventRegistry};
pub use framebuffer::{Framebuffer, PixelMatrix, SurfaceGeometry, DISPLAY_SIZE};
pub use queue::{CommandId, CommandQueue, CompletedCommand, QueueState};
pub use session::{Handler, Program, RunStatus, RuntimeSession};
pub use sound::{Mute, ToneBackend, ToneCompletion, ToneLength, ToneLog};
pub use timeline::{SessionClock, TimerSlot};
