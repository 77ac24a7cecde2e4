//! Host audio subsystem seam.
//!
//! The core never talks to CoreAudio directly; everything it needs from the
//! OS is expressed by the [`AudioHost`] trait: component discovery by
//! type/subtype/manufacturer triple, unit lifecycle, global-scope parameter
//! writes, the graph node API, and device property queries. Every call is a
//! synchronous request that either succeeds or returns the host's status
//! code, which callers translate into a typed [`crate::AudioError`].
//!
//! [`coreaudio::CoreAudioHost`] is the production implementation; tests
//! drive the same trait with scriptable fakes.

#[cfg(target_os = "macos")]
pub mod coreaudio;

#[cfg(test)]
pub(crate) mod fake;

/// Host status code, `0` meaning success.
///
/// CoreAudio statuses are frequently packed fourcc tags ('!dat', 'fmt?'),
/// so the display form shows the tag alongside the integer when printable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct OsStatus(pub i32);

impl OsStatus {
    pub const OK: OsStatus = OsStatus(0);

    pub fn is_ok(self) -> bool {
        self.0 == 0
    }
}

impl std::fmt::Display for OsStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let bytes = (self.0 as u32).to_be_bytes();
        if bytes.iter().all(|b| b.is_ascii_graphic()) {
            let tag: String = bytes.iter().map(|&b| b as char).collect();
            write!(f, "OSStatus {} ('{}')", self.0, tag)
        } else {
            write!(f, "OSStatus {}", self.0)
        }
    }
}

/// Result of a host call that reports a raw status on failure.
pub type HostResult<T> = Result<T, OsStatus>;

/// Pack a four-character tag into its big-endian code.
pub const fn fourcc(tag: &[u8; 4]) -> u32 {
    u32::from_be_bytes(*tag)
}

/// Audio component identity triple (type, subtype, manufacturer).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ComponentDesc {
    pub component_type: u32,
    pub sub_type: u32,
    pub manufacturer: u32,
}

/// Apple's 10-band parametric equalizer effect ('aufx'/'nbeq'/'appl').
pub const NBAND_EQ: ComponentDesc = ComponentDesc {
    component_type: fourcc(b"aufx"),
    sub_type: fourcc(b"nbeq"),
    manufacturer: fourcc(b"appl"),
};

/// The host's default output unit ('auou'/'def '/'appl').
pub const DEFAULT_OUTPUT: ComponentDesc = ComponentDesc {
    component_type: fourcc(b"auou"),
    sub_type: fourcc(b"def "),
    manufacturer: fourcc(b"appl"),
};

/// Global parameter scope.
pub const SCOPE_GLOBAL: u32 = 0;

/// Opaque handle to a discovered (not yet instantiated) component.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ComponentRef(pub u64);

/// Opaque handle to a live processing unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct UnitRef(pub u64);

/// Opaque handle to a processing graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GraphRef(pub u64);

/// Node index within a graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeRef(pub i32);

/// Host audio device identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DeviceId(pub u32);

/// The host audio subsystem contract.
///
/// Implementations must apply parameter writes atomically with respect to
/// the render thread (CoreAudio guarantees this); the core introduces no
/// buffering or batching on top, so two rapid writes to the same parameter
/// land in call order and the last one wins.
pub trait AudioHost: Send + Sync {
    // Components and units
    fn find_component(&self, desc: ComponentDesc) -> Option<ComponentRef>;
    fn instantiate(&self, component: ComponentRef) -> HostResult<UnitRef>;
    fn initialize_unit(&self, unit: UnitRef) -> HostResult<()>;
    fn uninitialize_unit(&self, unit: UnitRef) -> HostResult<()>;
    fn dispose_unit(&self, unit: UnitRef) -> HostResult<()>;
    fn set_parameter(
        &self,
        unit: UnitRef,
        param: u32,
        scope: u32,
        element: u32,
        value: f32,
    ) -> HostResult<()>;

    // Graph lifecycle
    fn new_graph(&self) -> HostResult<GraphRef>;
    fn add_node(&self, graph: GraphRef, desc: ComponentDesc) -> HostResult<NodeRef>;
    fn open_graph(&self, graph: GraphRef) -> HostResult<()>;
    fn node_unit(&self, graph: GraphRef, node: NodeRef) -> HostResult<UnitRef>;
    fn connect(
        &self,
        graph: GraphRef,
        source: NodeRef,
        source_output: u32,
        dest: NodeRef,
        dest_input: u32,
    ) -> HostResult<()>;
    fn initialize_graph(&self, graph: GraphRef) -> HostResult<()>;
    fn start_graph(&self, graph: GraphRef) -> HostResult<()>;
    fn stop_graph(&self, graph: GraphRef) -> HostResult<()>;
    fn uninitialize_graph(&self, graph: GraphRef) -> HostResult<()>;
    fn close_graph(&self, graph: GraphRef) -> HostResult<()>;
    fn dispose_graph(&self, graph: GraphRef) -> HostResult<()>;

    // Devices
    fn device_ids(&self) -> HostResult<Vec<DeviceId>>;
    fn output_channels(&self, device: DeviceId) -> u32;
    fn device_name(&self, device: DeviceId) -> HostResult<String>;
    fn set_default_output_device(&self, device: DeviceId) -> HostResult<()>;
}
