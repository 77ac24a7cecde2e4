//! Audio graph lifecycle.
//!
//! [`AudioGraph`] wires the equalizer into a running output chain: a
//! two-node graph (equalizer node into the host's default output node),
//! built and started in one shot. The equalizer node is resolved to its
//! live unit and handed to the owned [`EqualizerCore`], so exactly one unit
//! instance serves both processing and parameter control.
//!
//! The lifecycle is one-shot and strictly forward: Uninitialized through
//! build to Running, and through stop to Disposed. There is no restart.

use parking_lot::Mutex;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::eq::EqualizerCore;
use crate::error::{AudioError, BuildStage};
use crate::host::{AudioHost, GraphRef, DEFAULT_OUTPUT, NBAND_EQ};

/// Graph lifecycle states, strictly forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GraphState {
    Uninitialized,
    Built,
    Running,
    Stopped,
    Disposed,
}

#[derive(Default)]
struct BuildProgress {
    opened: bool,
    attached: bool,
    initialized: bool,
}

struct GraphInner {
    state: GraphState,
    graph: Option<GraphRef>,
}

/// Owns the equalizer-to-output processing chain and its lifecycle.
pub struct AudioGraph {
    host: Arc<dyn AudioHost>,
    equalizer: Arc<EqualizerCore>,
    inner: Mutex<GraphInner>,
}

impl AudioGraph {
    /// Create an unbuilt graph. The equalizer core is constructed here and
    /// receives its live unit when `build` resolves the equalizer node.
    pub fn new(host: Arc<dyn AudioHost>) -> Self {
        let equalizer = Arc::new(EqualizerCore::new(host.clone()));
        Self {
            host,
            equalizer,
            inner: Mutex::new(GraphInner {
                state: GraphState::Uninitialized,
                graph: None,
            }),
        }
    }

    /// The equalizer core fed by this graph. Parameter control goes through
    /// here while the graph runs.
    pub fn equalizer(&self) -> &Arc<EqualizerCore> {
        &self.equalizer
    }

    /// Build and start the chain: create graph, add equalizer and default
    /// output nodes, open, resolve the equalizer unit, program its bands,
    /// connect channel 0, initialize, start.
    ///
    /// Any failing step aborts the whole sequence, tears down whatever was
    /// created, and leaves the state at Uninitialized; no partially-built
    /// graph is left started. Building in any state but Uninitialized fails
    /// with [`AudioError::AlreadyBuilt`] and leaves the current graph
    /// untouched.
    pub fn build(&self) -> Result<(), AudioError> {
        let mut inner = self.inner.lock();
        if inner.state != GraphState::Uninitialized {
            return Err(AudioError::AlreadyBuilt);
        }

        let graph = self
            .host
            .new_graph()
            .map_err(|status| AudioError::GraphBuildFailed {
                stage: BuildStage::CreateGraph,
                status,
            })?;

        let mut progress = BuildProgress::default();
        match self.assemble(graph, &mut inner, &mut progress) {
            Ok(()) => {
                inner.graph = Some(graph);
                inner.state = GraphState::Running;
                debug!("audio graph running");
                Ok(())
            }
            Err(err) => {
                self.abort_build(graph, &progress);
                inner.state = GraphState::Uninitialized;
                Err(err)
            }
        }
    }

    /// Stop and release the chain: stop, uninitialize, close, dispose, and
    /// detach the equalizer unit. No-op on a never-built or already-stopped
    /// graph. Teardown errors after the stop are logged, not surfaced; there
    /// is no caller-visible recovery for them.
    pub fn stop(&self) {
        let mut inner = self.inner.lock();
        if inner.state != GraphState::Running {
            return;
        }
        let graph = match inner.graph.take() {
            Some(graph) => graph,
            None => {
                inner.state = GraphState::Disposed;
                return;
            }
        };

        if let Err(status) = self.host.stop_graph(graph) {
            warn!(%status, "graph stop reported an error");
        }
        inner.state = GraphState::Stopped;

        if let Err(status) = self.host.uninitialize_graph(graph) {
            warn!(%status, "graph uninitialize failed during stop");
        }
        if let Err(status) = self.host.close_graph(graph) {
            warn!(%status, "graph close failed during stop");
        }
        if let Err(status) = self.host.dispose_graph(graph) {
            warn!(%status, "graph dispose failed during stop");
        }

        self.equalizer.detach_unit();
        inner.state = GraphState::Disposed;
        debug!("audio graph disposed");
    }

    pub fn is_running(&self) -> bool {
        self.inner.lock().state == GraphState::Running
    }

    pub fn state(&self) -> GraphState {
        self.inner.lock().state
    }

    fn assemble(
        &self,
        graph: GraphRef,
        inner: &mut GraphInner,
        progress: &mut BuildProgress,
    ) -> Result<(), AudioError> {
        let stage = |stage: BuildStage| {
            move |status| AudioError::GraphBuildFailed { stage, status }
        };

        let eq_node = self
            .host
            .add_node(graph, NBAND_EQ)
            .map_err(stage(BuildStage::AddEqualizerNode))?;
        let output_node = self
            .host
            .add_node(graph, DEFAULT_OUTPUT)
            .map_err(stage(BuildStage::AddOutputNode))?;

        self.host
            .open_graph(graph)
            .map_err(stage(BuildStage::OpenGraph))?;
        progress.opened = true;

        let eq_unit = self
            .host
            .node_unit(graph, eq_node)
            .map_err(stage(BuildStage::ResolveEqualizerUnit))?;
        self.equalizer.attach_unit(eq_unit).map_err(|err| match err {
            AudioError::ParameterWriteFailed { status, .. } => AudioError::GraphBuildFailed {
                stage: BuildStage::ProgramBands,
                status,
            },
            other => other,
        })?;
        progress.attached = true;

        self.host
            .connect(graph, eq_node, 0, output_node, 0)
            .map_err(stage(BuildStage::ConnectNodes))?;

        self.host
            .initialize_graph(graph)
            .map_err(stage(BuildStage::InitializeGraph))?;
        progress.initialized = true;
        inner.state = GraphState::Built;

        self.host
            .start_graph(graph)
            .map_err(stage(BuildStage::StartGraph))?;
        Ok(())
    }

    fn abort_build(&self, graph: GraphRef, progress: &BuildProgress) {
        if progress.attached {
            self.equalizer.detach_unit();
        }
        if progress.initialized {
            if let Err(status) = self.host.uninitialize_graph(graph) {
                warn!(%status, "graph uninitialize failed during build abort");
            }
        }
        if progress.opened {
            if let Err(status) = self.host.close_graph(graph) {
                warn!(%status, "graph close failed during build abort");
            }
        }
        if let Err(status) = self.host.dispose_graph(graph) {
            warn!(%status, "graph dispose failed during build abort");
        }
    }
}
