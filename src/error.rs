//! Error types for the equalizer core.
//!
//! Every host-API failure is surfaced to the caller as one of these typed
//! errors. The only local recoveries in the crate are the device registry's
//! skip-on-name-failure during refresh and `AudioGraph::stop` on a graph
//! that was never built.

use crate::host::{DeviceId, OsStatus};

/// Errors surfaced by the equalizer core, graph, and device registry.
#[derive(Debug, Clone, PartialEq)]
pub enum AudioError {
    /// No audio component matching the requested description exists on this host.
    ComponentNotFound,
    /// The equalizer unit could not be brought into (or was not in) a usable state.
    InitializationFailed(String),
    /// Band index outside 0..10.
    InvalidBand(usize),
    /// The host rejected a gain parameter write.
    ParameterWriteFailed { band: usize, status: OsStatus },
    /// A step of the graph build sequence failed.
    GraphBuildFailed { stage: BuildStage, status: OsStatus },
    /// The graph was already built (or already ran its one-shot lifecycle).
    AlreadyBuilt,
    /// The host device list query failed.
    DeviceQueryFailed(OsStatus),
    /// The host rejected the default output device switch.
    DeviceSwitchFailed { device: DeviceId, status: OsStatus },
}

impl std::fmt::Display for AudioError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ComponentNotFound => write!(f, "no matching audio component found on this host"),
            Self::InitializationFailed(reason) => {
                write!(f, "equalizer unit initialization failed: {reason}")
            }
            Self::InvalidBand(band) => write!(f, "band index {band} out of range (0..10)"),
            Self::ParameterWriteFailed { band, status } => {
                write!(f, "gain write for band {band} rejected: {status}")
            }
            Self::GraphBuildFailed { stage, status } => {
                write!(f, "graph build failed at {stage}: {status}")
            }
            Self::AlreadyBuilt => write!(f, "graph was already built"),
            Self::DeviceQueryFailed(status) => write!(f, "device list query failed: {status}"),
            Self::DeviceSwitchFailed { device, status } => {
                write!(f, "switch to output device {} rejected: {status}", device.0)
            }
        }
    }
}

impl std::error::Error for AudioError {}

/// Identifies the step of `AudioGraph::build` that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildStage {
    CreateGraph,
    AddEqualizerNode,
    AddOutputNode,
    OpenGraph,
    ResolveEqualizerUnit,
    ProgramBands,
    ConnectNodes,
    InitializeGraph,
    StartGraph,
}

impl std::fmt::Display for BuildStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::CreateGraph => "graph creation",
            Self::AddEqualizerNode => "equalizer node add",
            Self::AddOutputNode => "output node add",
            Self::OpenGraph => "graph open",
            Self::ResolveEqualizerUnit => "equalizer unit resolution",
            Self::ProgramBands => "band programming",
            Self::ConnectNodes => "node connection",
            Self::InitializeGraph => "graph initialization",
            Self::StartGraph => "graph start",
        };
        f.write_str(name)
    }
}
