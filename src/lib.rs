//! # MorseTilt
//!
//! Tilt and button gestures to a Morse line protocol.
//!
//! ## Architecture
//!
//! Two tasks connected by one bounded [`EventChannel`]:
//! - [`GestureClassifier`] turns motion samples and button presses into
//!   [`MorseEvent`]s
//! - [`MorseEncoder`] serializes events into lines like `".-  \n"`
//!
//! Neither side sees the other's state. All hardware access goes through
//! the traits in [`hal`], so the whole pipeline runs on host in tests.

#![cfg_attr(not(test), no_std)]

pub mod channel;
pub mod classifier;
pub mod config;
pub mod encoder;
pub mod event;
pub mod hal;
pub mod logging;
pub mod sample;
pub mod stats;
pub mod status;
pub mod tasks;

pub use channel::{EventChannel, EventConsumer, EventProducer};
pub use classifier::{GestureClassifier, TickEvents};
pub use config::{ConfigError, PipelineConfig};
pub use encoder::MorseEncoder;
pub use event::MorseEvent;
pub use sample::MotionSample;
pub use stats::{ClassifierStats, EncoderStats};
pub use tasks::{ClassifierTask, EncoderTask};
