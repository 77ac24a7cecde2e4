//! CoreAudio implementation of the host seam.
//!
//! Unit and component handling goes through the AudioToolbox component API;
//! the graph operations use the AUGraph API (declared in the `bindings`
//! module below, AUGraph is not covered by the `coreaudio` crate); device
//! queries use the AudioObject property API from `coreaudio::sys`, with
//! `core-foundation` handling the CFString name reads.

use core_foundation::base::TCFType;
use core_foundation::string::{CFString, CFStringRef};
use coreaudio::sys::{
    kAudioDevicePropertyDeviceNameCFString, kAudioDevicePropertyScopeOutput,
    kAudioDevicePropertyStreamConfiguration, kAudioHardwarePropertyDefaultOutputDevice,
    kAudioHardwarePropertyDevices, kAudioObjectPropertyElementMaster,
    kAudioObjectPropertyScopeGlobal, kAudioObjectSystemObject, AudioBuffer, AudioBufferList,
    AudioDeviceID, AudioObjectGetPropertyData, AudioObjectGetPropertyDataSize,
    AudioObjectPropertyAddress, AudioObjectSetPropertyData,
};
use std::ptr;

use super::{
    AudioHost, ComponentDesc, ComponentRef, DeviceId, GraphRef, HostResult, NodeRef, OsStatus,
    UnitRef,
};

#[allow(non_upper_case_globals)]
#[allow(non_camel_case_types)]
#[allow(non_snake_case)]
mod bindings {
    use std::os::raw::c_void;

    pub type OSStatus = i32;
    pub type AudioComponent = *mut c_void;
    pub type AudioComponentInstance = *mut c_void;
    pub type AudioUnit = AudioComponentInstance;
    pub type AUGraph = *mut c_void;
    pub type AUNode = i32;

    pub const noErr: OSStatus = 0;

    #[repr(C)]
    #[derive(Debug, Clone, Copy, Default)]
    pub struct AudioComponentDescription {
        pub componentType: u32,
        pub componentSubType: u32,
        pub componentManufacturer: u32,
        pub componentFlags: u32,
        pub componentFlagsMask: u32,
    }

    #[link(name = "AudioToolbox", kind = "framework")]
    extern "C" {
        pub fn AudioComponentFindNext(
            inComponent: AudioComponent,
            inDesc: *const AudioComponentDescription,
        ) -> AudioComponent;

        pub fn AudioComponentInstanceNew(
            inComponent: AudioComponent,
            outInstance: *mut AudioComponentInstance,
        ) -> OSStatus;

        pub fn AudioComponentInstanceDispose(inInstance: AudioComponentInstance) -> OSStatus;

        pub fn AudioUnitInitialize(inUnit: AudioUnit) -> OSStatus;

        pub fn AudioUnitUninitialize(inUnit: AudioUnit) -> OSStatus;

        pub fn AudioUnitSetParameter(
            inUnit: AudioUnit,
            inID: u32,
            inScope: u32,
            inElement: u32,
            inValue: f32,
            inBufferOffsetInFrames: u32,
        ) -> OSStatus;

        pub fn NewAUGraph(outGraph: *mut AUGraph) -> OSStatus;

        pub fn AUGraphAddNode(
            inGraph: AUGraph,
            inDescription: *const AudioComponentDescription,
            outNode: *mut AUNode,
        ) -> OSStatus;

        pub fn AUGraphOpen(inGraph: AUGraph) -> OSStatus;

        pub fn AUGraphNodeInfo(
            inGraph: AUGraph,
            inNode: AUNode,
            outDescription: *mut AudioComponentDescription,
            outAudioUnit: *mut AudioUnit,
        ) -> OSStatus;

        pub fn AUGraphConnectNodeInput(
            inGraph: AUGraph,
            inSourceNode: AUNode,
            inSourceOutputNumber: u32,
            inDestNode: AUNode,
            inDestInputNumber: u32,
        ) -> OSStatus;

        pub fn AUGraphInitialize(inGraph: AUGraph) -> OSStatus;

        pub fn AUGraphUninitialize(inGraph: AUGraph) -> OSStatus;

        pub fn AUGraphStart(inGraph: AUGraph) -> OSStatus;

        pub fn AUGraphStop(inGraph: AUGraph) -> OSStatus;

        pub fn AUGraphClose(inGraph: AUGraph) -> OSStatus;

        pub fn DisposeAUGraph(inGraph: AUGraph) -> OSStatus;
    }
}

use bindings::*;

fn desc_to_raw(desc: ComponentDesc) -> AudioComponentDescription {
    AudioComponentDescription {
        componentType: desc.component_type,
        componentSubType: desc.sub_type,
        componentManufacturer: desc.manufacturer,
        componentFlags: 0,
        componentFlagsMask: 0,
    }
}

fn status(code: OSStatus) -> HostResult<()> {
    if code == noErr {
        Ok(())
    } else {
        Err(OsStatus(code))
    }
}

/// The production host, backed by AudioToolbox and the AudioObject API.
///
/// Handles are raw pointers carried as integers; they stay valid for as long
/// as the owning core keeps them, which the ownership rules in `eq` and
/// `graph` guarantee.
#[derive(Debug, Default)]
pub struct CoreAudioHost;

impl CoreAudioHost {
    pub fn new() -> Self {
        CoreAudioHost
    }
}

impl AudioHost for CoreAudioHost {
    fn find_component(&self, desc: ComponentDesc) -> Option<ComponentRef> {
        let raw = desc_to_raw(desc);
        let component = unsafe { AudioComponentFindNext(ptr::null_mut(), &raw) };
        if component.is_null() {
            None
        } else {
            Some(ComponentRef(component as u64))
        }
    }

    fn instantiate(&self, component: ComponentRef) -> HostResult<UnitRef> {
        let mut instance: AudioComponentInstance = ptr::null_mut();
        status(unsafe { AudioComponentInstanceNew(component.0 as AudioComponent, &mut instance) })?;
        Ok(UnitRef(instance as u64))
    }

    fn initialize_unit(&self, unit: UnitRef) -> HostResult<()> {
        status(unsafe { AudioUnitInitialize(unit.0 as AudioUnit) })
    }

    fn uninitialize_unit(&self, unit: UnitRef) -> HostResult<()> {
        status(unsafe { AudioUnitUninitialize(unit.0 as AudioUnit) })
    }

    fn dispose_unit(&self, unit: UnitRef) -> HostResult<()> {
        status(unsafe { AudioComponentInstanceDispose(unit.0 as AudioComponentInstance) })
    }

    fn set_parameter(
        &self,
        unit: UnitRef,
        param: u32,
        scope: u32,
        element: u32,
        value: f32,
    ) -> HostResult<()> {
        status(unsafe { AudioUnitSetParameter(unit.0 as AudioUnit, param, scope, element, value, 0) })
    }

    fn new_graph(&self) -> HostResult<GraphRef> {
        let mut graph: AUGraph = ptr::null_mut();
        status(unsafe { NewAUGraph(&mut graph) })?;
        Ok(GraphRef(graph as u64))
    }

    fn add_node(&self, graph: GraphRef, desc: ComponentDesc) -> HostResult<NodeRef> {
        let raw = desc_to_raw(desc);
        let mut node: AUNode = 0;
        status(unsafe { AUGraphAddNode(graph.0 as AUGraph, &raw, &mut node) })?;
        Ok(NodeRef(node))
    }

    fn open_graph(&self, graph: GraphRef) -> HostResult<()> {
        status(unsafe { AUGraphOpen(graph.0 as AUGraph) })
    }

    fn node_unit(&self, graph: GraphRef, node: NodeRef) -> HostResult<UnitRef> {
        let mut unit: AudioUnit = ptr::null_mut();
        status(unsafe { AUGraphNodeInfo(graph.0 as AUGraph, node.0, ptr::null_mut(), &mut unit) })?;
        if unit.is_null() {
            return Err(OsStatus(-1));
        }
        Ok(UnitRef(unit as u64))
    }

    fn connect(
        &self,
        graph: GraphRef,
        source: NodeRef,
        source_output: u32,
        dest: NodeRef,
        dest_input: u32,
    ) -> HostResult<()> {
        status(unsafe {
            AUGraphConnectNodeInput(graph.0 as AUGraph, source.0, source_output, dest.0, dest_input)
        })
    }

    fn initialize_graph(&self, graph: GraphRef) -> HostResult<()> {
        status(unsafe { AUGraphInitialize(graph.0 as AUGraph) })
    }

    fn start_graph(&self, graph: GraphRef) -> HostResult<()> {
        status(unsafe { AUGraphStart(graph.0 as AUGraph) })
    }

    fn stop_graph(&self, graph: GraphRef) -> HostResult<()> {
        status(unsafe { AUGraphStop(graph.0 as AUGraph) })
    }

    fn uninitialize_graph(&self, graph: GraphRef) -> HostResult<()> {
        status(unsafe { AUGraphUninitialize(graph.0 as AUGraph) })
    }

    fn close_graph(&self, graph: GraphRef) -> HostResult<()> {
        status(unsafe { AUGraphClose(graph.0 as AUGraph) })
    }

    fn dispose_graph(&self, graph: GraphRef) -> HostResult<()> {
        status(unsafe { DisposeAUGraph(graph.0 as AUGraph) })
    }

    fn device_ids(&self) -> HostResult<Vec<DeviceId>> {
        let address = AudioObjectPropertyAddress {
            mSelector: kAudioHardwarePropertyDevices,
            mScope: kAudioObjectPropertyScopeGlobal,
            mElement: kAudioObjectPropertyElementMaster,
        };

        let mut size: u32 = 0;
        let code = unsafe {
            AudioObjectGetPropertyDataSize(
                kAudioObjectSystemObject,
                &address,
                0,
                ptr::null(),
                &mut size,
            )
        };
        status(code)?;

        let count = size as usize / std::mem::size_of::<AudioDeviceID>();
        let mut ids: Vec<AudioDeviceID> = vec![0; count];
        let mut data_size = size;
        let code = unsafe {
            AudioObjectGetPropertyData(
                kAudioObjectSystemObject,
                &address,
                0,
                ptr::null(),
                &mut data_size,
                ids.as_mut_ptr() as *mut _,
            )
        };
        status(code)?;

        Ok(ids.into_iter().map(DeviceId).collect())
    }

    fn output_channels(&self, device: DeviceId) -> u32 {
        let address = AudioObjectPropertyAddress {
            mSelector: kAudioDevicePropertyStreamConfiguration,
            mScope: kAudioDevicePropertyScopeOutput,
            mElement: kAudioObjectPropertyElementMaster,
        };

        let mut size: u32 = 0;
        let code = unsafe {
            AudioObjectGetPropertyDataSize(device.0, &address, 0, ptr::null(), &mut size)
        };
        if code != 0 || size == 0 {
            return 0;
        }

        let mut buffer = vec![0u8; size as usize];
        let code = unsafe {
            AudioObjectGetPropertyData(
                device.0,
                &address,
                0,
                ptr::null(),
                &mut size,
                buffer.as_mut_ptr() as *mut _,
            )
        };
        if code != 0 {
            return 0;
        }

        let buffer_list = unsafe { &*(buffer.as_ptr() as *const AudioBufferList) };
        let buffers_ptr: *const AudioBuffer = &buffer_list.mBuffers as *const _;
        let mut total = 0u32;
        for i in 0..buffer_list.mNumberBuffers {
            let audio_buffer = unsafe { &*buffers_ptr.add(i as usize) };
            total += audio_buffer.mNumberChannels;
        }
        total
    }

    fn device_name(&self, device: DeviceId) -> HostResult<String> {
        let address = AudioObjectPropertyAddress {
            mSelector: kAudioDevicePropertyDeviceNameCFString,
            mScope: kAudioObjectPropertyScopeGlobal,
            mElement: kAudioObjectPropertyElementMaster,
        };

        let mut name_ref: CFStringRef = ptr::null();
        let mut size = std::mem::size_of::<CFStringRef>() as u32;
        let code = unsafe {
            AudioObjectGetPropertyData(
                device.0,
                &address,
                0,
                ptr::null(),
                &mut size,
                &mut name_ref as *mut _ as *mut _,
            )
        };
        status(code)?;
        if name_ref.is_null() {
            return Err(OsStatus(-1));
        }

        let cf_string = unsafe { CFString::wrap_under_create_rule(name_ref) };
        Ok(cf_string.to_string())
    }

    fn set_default_output_device(&self, device: DeviceId) -> HostResult<()> {
        let address = AudioObjectPropertyAddress {
            mSelector: kAudioHardwarePropertyDefaultOutputDevice,
            mScope: kAudioObjectPropertyScopeGlobal,
            mElement: kAudioObjectPropertyElementMaster,
        };

        let id: AudioDeviceID = device.0;
        let code = unsafe {
            AudioObjectSetPropertyData(
                kAudioObjectSystemObject,
                &address,
                0,
                ptr::null(),
                std::mem::size_of::<AudioDeviceID>() as u32,
                &id as *const _ as *const _,
            )
        };
        status(code)
    }
}
