//! contour - system output equalizer core
//!
//! Inserts a global 10-band parametric equalizer into the macOS audio
//! output path: an audio graph chains an N-band equalizer unit into the
//! system's default output, and [`EqualizerCore`] mutates per-band gains
//! while audio flows. [`OutputDeviceRegistry`] discovers output devices and
//! switches the system default; [`AppMonitor`] keeps per-application
//! session bookkeeping in sync with the running-application set.
//!
//! All OS access goes through the [`host::AudioHost`] seam;
//! `host::coreaudio::CoreAudioHost` is the production backend on macOS.
//! Presentation (windows, sliders, device pickers) lives outside this
//! crate and calls in through the small control surfaces exposed here.
//!
//! Nothing is cleaned up automatically: the graph must be stopped (and a
//! standalone equalizer shut down) explicitly before process exit.

pub mod apps;
pub mod config;
pub mod device;
pub mod eq;
pub mod error;
pub mod graph;
pub mod host;

pub use apps::{AppMonitor, AppSession, RunningApp, WorkspaceProbe};
pub use config::{AppSessionConfig, EqConfig};
pub use device::{OutputDevice, OutputDeviceRegistry};
pub use eq::{EqualizerCore, BAND_COUNT, BAND_FREQUENCIES, GAIN_MAX_DB, GAIN_MIN_DB};
pub use error::{AudioError, BuildStage};
pub use graph::{AudioGraph, GraphState};
pub use host::{AudioHost, DeviceId, OsStatus};
