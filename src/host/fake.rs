//! Scriptable in-memory host for unit tests.
//!
//! Records every call and can be told to fail specific operations or
//! specific parameter writes with a chosen status.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use super::{
    AudioHost, ComponentDesc, ComponentRef, DeviceId, GraphRef, HostResult, NodeRef, OsStatus,
    UnitRef, DEFAULT_OUTPUT, NBAND_EQ,
};

/// Operations that can be scripted to fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HostOp {
    Instantiate,
    InitializeUnit,
    NewGraph,
    AddEqualizerNode,
    AddOutputNode,
    OpenGraph,
    NodeUnit,
    Connect,
    InitializeGraph,
    StartGraph,
    StopGraph,
    DeviceIds,
    SetDefaultOutput,
}

/// A device visible to the fake host. `name: None` makes the name lookup fail.
#[derive(Debug, Clone)]
pub struct FakeDevice {
    pub id: u32,
    pub name: Option<String>,
    pub output_channels: u32,
}

#[derive(Default)]
struct FakeState {
    components: Vec<ComponentDesc>,
    devices: Vec<FakeDevice>,
    failures: HashMap<HostOp, OsStatus>,
    param_failures: HashMap<u32, OsStatus>,
    // (unit, param) -> last value written
    params: HashMap<(u64, u32), f32>,
    writes: Vec<(UnitRef, u32, f32)>,
    events: Vec<String>,
    node_units: HashMap<i32, UnitRef>,
    disposed_units: Vec<UnitRef>,
    disposed_graphs: Vec<GraphRef>,
    default_output: Option<DeviceId>,
}

pub struct FakeHost {
    state: Mutex<FakeState>,
    next_id: AtomicU64,
}

impl FakeHost {
    /// Host with the standard equalizer and default-output components present.
    pub fn new() -> Self {
        let mut state = FakeState::default();
        state.components = vec![NBAND_EQ, DEFAULT_OUTPUT];
        Self {
            state: Mutex::new(state),
            next_id: AtomicU64::new(1),
        }
    }

    /// Host with no components installed at all.
    pub fn without_components() -> Self {
        let host = Self::new();
        host.state.lock().components.clear();
        host
    }

    pub fn fail_on(&self, op: HostOp, status: OsStatus) {
        self.state.lock().failures.insert(op, status);
    }

    pub fn clear_failures(&self) {
        let mut state = self.state.lock();
        state.failures.clear();
        state.param_failures.clear();
    }

    /// Fail every write to one parameter id.
    pub fn fail_param(&self, param: u32, status: OsStatus) {
        self.state.lock().param_failures.insert(param, status);
    }

    pub fn push_device(&self, device: FakeDevice) {
        self.state.lock().devices.push(device);
    }

    pub fn last_param(&self, unit: UnitRef, param: u32) -> Option<f32> {
        self.state.lock().params.get(&(unit.0, param)).copied()
    }

    pub fn writes(&self) -> Vec<(UnitRef, u32, f32)> {
        self.state.lock().writes.clone()
    }

    pub fn events(&self) -> Vec<String> {
        self.state.lock().events.clone()
    }

    pub fn disposed_units(&self) -> Vec<UnitRef> {
        self.state.lock().disposed_units.clone()
    }

    pub fn disposed_graphs(&self) -> Vec<GraphRef> {
        self.state.lock().disposed_graphs.clone()
    }

    pub fn default_output(&self) -> Option<DeviceId> {
        self.state.lock().default_output
    }

    fn next(&self) -> u64 {
        self.next_id.fetch_add(1, Ordering::Relaxed)
    }

    fn check(&self, op: HostOp, event: &str) -> HostResult<()> {
        let mut state = self.state.lock();
        state.events.push(event.to_string());
        match state.failures.get(&op) {
            Some(&status) => Err(status),
            None => Ok(()),
        }
    }
}

impl AudioHost for FakeHost {
    fn find_component(&self, desc: ComponentDesc) -> Option<ComponentRef> {
        let state = self.state.lock();
        state
            .components
            .iter()
            .position(|c| *c == desc)
            .map(|idx| ComponentRef(idx as u64))
    }

    fn instantiate(&self, _component: ComponentRef) -> HostResult<UnitRef> {
        self.check(HostOp::Instantiate, "instantiate")?;
        Ok(UnitRef(self.next()))
    }

    fn initialize_unit(&self, _unit: UnitRef) -> HostResult<()> {
        self.check(HostOp::InitializeUnit, "initialize_unit")
    }

    fn uninitialize_unit(&self, _unit: UnitRef) -> HostResult<()> {
        self.state.lock().events.push("uninitialize_unit".into());
        Ok(())
    }

    fn dispose_unit(&self, unit: UnitRef) -> HostResult<()> {
        let mut state = self.state.lock();
        state.events.push("dispose_unit".into());
        state.disposed_units.push(unit);
        Ok(())
    }

    fn set_parameter(
        &self,
        unit: UnitRef,
        param: u32,
        _scope: u32,
        _element: u32,
        value: f32,
    ) -> HostResult<()> {
        let mut state = self.state.lock();
        state.writes.push((unit, param, value));
        if let Some(&status) = state.param_failures.get(&param) {
            return Err(status);
        }
        state.params.insert((unit.0, param), value);
        Ok(())
    }

    fn new_graph(&self) -> HostResult<GraphRef> {
        self.check(HostOp::NewGraph, "new_graph")?;
        Ok(GraphRef(self.next()))
    }

    fn add_node(&self, _graph: GraphRef, desc: ComponentDesc) -> HostResult<NodeRef> {
        let op = if desc == NBAND_EQ {
            HostOp::AddEqualizerNode
        } else {
            HostOp::AddOutputNode
        };
        self.check(op, "add_node")?;
        let node = NodeRef(self.next() as i32);
        let unit = UnitRef(self.next());
        self.state.lock().node_units.insert(node.0, unit);
        Ok(node)
    }

    fn open_graph(&self, _graph: GraphRef) -> HostResult<()> {
        self.check(HostOp::OpenGraph, "open_graph")
    }

    fn node_unit(&self, _graph: GraphRef, node: NodeRef) -> HostResult<UnitRef> {
        self.check(HostOp::NodeUnit, "node_unit")?;
        let state = self.state.lock();
        state.node_units.get(&node.0).copied().ok_or(OsStatus(-1))
    }

    fn connect(
        &self,
        _graph: GraphRef,
        _source: NodeRef,
        _source_output: u32,
        _dest: NodeRef,
        _dest_input: u32,
    ) -> HostResult<()> {
        self.check(HostOp::Connect, "connect")
    }

    fn initialize_graph(&self, _graph: GraphRef) -> HostResult<()> {
        self.check(HostOp::InitializeGraph, "initialize_graph")
    }

    fn start_graph(&self, _graph: GraphRef) -> HostResult<()> {
        self.check(HostOp::StartGraph, "start_graph")
    }

    fn stop_graph(&self, _graph: GraphRef) -> HostResult<()> {
        self.check(HostOp::StopGraph, "stop_graph")
    }

    fn uninitialize_graph(&self, _graph: GraphRef) -> HostResult<()> {
        self.state.lock().events.push("uninitialize_graph".into());
        Ok(())
    }

    fn close_graph(&self, _graph: GraphRef) -> HostResult<()> {
        self.state.lock().events.push("close_graph".into());
        Ok(())
    }

    fn dispose_graph(&self, graph: GraphRef) -> HostResult<()> {
        let mut state = self.state.lock();
        state.events.push("dispose_graph".into());
        state.disposed_graphs.push(graph);
        Ok(())
    }

    fn device_ids(&self) -> HostResult<Vec<DeviceId>> {
        self.check(HostOp::DeviceIds, "device_ids")?;
        let state = self.state.lock();
        Ok(state.devices.iter().map(|d| DeviceId(d.id)).collect())
    }

    fn output_channels(&self, device: DeviceId) -> u32 {
        let state = self.state.lock();
        state
            .devices
            .iter()
            .find(|d| d.id == device.0)
            .map(|d| d.output_channels)
            .unwrap_or(0)
    }

    fn device_name(&self, device: DeviceId) -> HostResult<String> {
        let state = self.state.lock();
        match state.devices.iter().find(|d| d.id == device.0) {
            Some(FakeDevice { name: Some(n), .. }) => Ok(n.clone()),
            _ => Err(OsStatus(-1)),
        }
    }

    fn set_default_output_device(&self, device: DeviceId) -> HostResult<()> {
        self.check(HostOp::SetDefaultOutput, "set_default_output")?;
        let mut state = self.state.lock();
        if state.devices.iter().any(|d| d.id == device.0) {
            state.default_output = Some(device);
            Ok(())
        } else {
            // kAudioHardwareBadDeviceError ('!dv!')
            Err(OsStatus(0x2164_7621))
        }
    }
}
