//! 10-band parametric equalizer control.
//!
//! [`EqualizerCore`] owns exactly one live N-band equalizer unit and is the
//! only component that touches its parameters. The unit comes from one of
//! two paths: [`EqualizerCore::initialize`] discovers and instantiates a
//! standalone unit, or the audio graph resolves its equalizer node and hands
//! the node's unit over, so a single instance serves both processing and
//! parameter control.
//!
//! Gain writes go straight to the live unit, global scope; the host applies
//! them atomically with respect to the render thread. The cached gain is
//! updated only when the host accepts the write, so the cache never diverges
//! from the unit.

use parking_lot::Mutex;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::error::AudioError;
use crate::host::{AudioHost, OsStatus, UnitRef, NBAND_EQ, SCOPE_GLOBAL};

/// Number of equalizer bands. Fixed.
pub const BAND_COUNT: usize = 10;

/// Center frequencies in Hz, ascending, one per band. Fixed.
pub const BAND_FREQUENCIES: [f32; BAND_COUNT] = [
    32.0, 64.0, 125.0, 250.0, 500.0, 1000.0, 2000.0, 4000.0, 8000.0, 16000.0,
];

/// Gain range in dB. Values outside are clamped before reaching the unit.
pub const GAIN_MIN_DB: f32 = -20.0;
pub const GAIN_MAX_DB: f32 = 20.0;

/// Bandwidth of every band, in octaves. Fixed.
const BANDWIDTH_OCTAVES: f32 = 1.0;

// AUNBandEQ parameter id bases; the band index is added to the base.
pub(crate) const PARAM_FILTER_TYPE: u32 = 2000;
pub(crate) const PARAM_FREQUENCY: u32 = 3000;
pub(crate) const PARAM_GAIN: u32 = 4000;
pub(crate) const PARAM_BANDWIDTH: u32 = 5000;

/// kAUNBandEQFilterType_Parametric
const FILTER_TYPE_PARAMETRIC: f32 = 0.0;

/// Who is responsible for disposing the live unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum UnitOwnership {
    /// Created by `initialize`; disposed by `shutdown`.
    Standalone,
    /// Resolved from a graph node; the graph teardown disposes it.
    Graph,
}

struct EqState {
    unit: Option<(UnitRef, UnitOwnership)>,
    gains: [f32; BAND_COUNT],
}

/// Owns and parametrizes one 10-band equalizer effect unit.
///
/// All control-plane calls are synchronous. The internal mutex serializes
/// concurrent `set_gain` callers so cached-value updates cannot race; the
/// parameter writes themselves rely on the host's atomic application, with
/// no batching on top (last write wins).
pub struct EqualizerCore {
    host: Arc<dyn AudioHost>,
    state: Mutex<EqState>,
}

impl EqualizerCore {
    /// Create a core with no live unit yet.
    pub fn new(host: Arc<dyn AudioHost>) -> Self {
        Self {
            host,
            state: Mutex::new(EqState {
                unit: None,
                gains: [0.0; BAND_COUNT],
            }),
        }
    }

    /// Locate the equalizer component, instantiate and initialize it, and
    /// program all 10 bands (fixed frequency, parametric filter, 1.0 octave
    /// bandwidth, gain 0.0 dB).
    ///
    /// On any failure after instantiation the unit is torn down before the
    /// error is returned; the core is never left holding a half-configured
    /// unit.
    pub fn initialize(&self) -> Result<(), AudioError> {
        let mut state = self.state.lock();
        if state.unit.is_some() {
            return Err(AudioError::InitializationFailed(
                "equalizer unit already exists".into(),
            ));
        }

        let component = self
            .host
            .find_component(NBAND_EQ)
            .ok_or(AudioError::ComponentNotFound)?;

        let unit = self.host.instantiate(component).map_err(|status| {
            AudioError::InitializationFailed(format!("instantiation failed: {status}"))
        })?;

        if let Err(status) = self.host.initialize_unit(unit) {
            let _ = self.host.dispose_unit(unit);
            return Err(AudioError::InitializationFailed(format!(
                "unit initialization failed: {status}"
            )));
        }

        if let Err((band, status)) = self.program_bands(unit) {
            let _ = self.host.uninitialize_unit(unit);
            let _ = self.host.dispose_unit(unit);
            return Err(AudioError::InitializationFailed(format!(
                "programming band {band} failed: {status}"
            )));
        }

        debug!(unit = unit.0, "equalizer unit initialized");
        state.unit = Some((unit, UnitOwnership::Standalone));
        state.gains = [0.0; BAND_COUNT];
        Ok(())
    }

    /// Adopt a live unit resolved from the graph's equalizer node and
    /// program its bands. The unit stays graph-owned; graph teardown
    /// disposes it.
    pub(crate) fn attach_unit(&self, unit: UnitRef) -> Result<(), AudioError> {
        let mut state = self.state.lock();
        if state.unit.is_some() {
            return Err(AudioError::InitializationFailed(
                "equalizer unit already exists".into(),
            ));
        }

        if let Err((band, status)) = self.program_bands(unit) {
            return Err(AudioError::ParameterWriteFailed { band, status });
        }

        debug!(unit = unit.0, "equalizer unit attached from graph");
        state.unit = Some((unit, UnitOwnership::Graph));
        state.gains = [0.0; BAND_COUNT];
        Ok(())
    }

    /// Drop the graph-owned unit handle. Called by the graph on stop, after
    /// which parameter writes fail until a new unit exists.
    pub(crate) fn detach_unit(&self) {
        self.state.lock().unit = None;
    }

    /// Dispose a standalone unit. Graph-owned units are only detached here;
    /// the graph teardown owns their disposal. Idempotent.
    pub fn shutdown(&self) {
        let mut state = self.state.lock();
        if let Some((unit, ownership)) = state.unit.take() {
            if ownership == UnitOwnership::Standalone {
                if let Err(status) = self.host.uninitialize_unit(unit) {
                    warn!(unit = unit.0, %status, "unit uninitialize failed during shutdown");
                }
                if let Err(status) = self.host.dispose_unit(unit) {
                    warn!(unit = unit.0, %status, "unit dispose failed during shutdown");
                }
            }
        }
    }

    /// Write one band's gain to the live unit.
    ///
    /// The gain is clamped to [-20, +20] dB first. The cached value is
    /// updated only when the host accepts the write, so a failed write
    /// leaves the cache on the last applied value.
    pub fn set_gain(&self, band: usize, gain: f32) -> Result<(), AudioError> {
        if band >= BAND_COUNT {
            return Err(AudioError::InvalidBand(band));
        }
        let clamped = gain.clamp(GAIN_MIN_DB, GAIN_MAX_DB);

        let mut state = self.state.lock();
        let (unit, _) = state.unit.ok_or_else(|| {
            AudioError::InitializationFailed("no live equalizer unit".into())
        })?;

        self.host
            .set_parameter(unit, PARAM_GAIN + band as u32, SCOPE_GLOBAL, 0, clamped)
            .map_err(|status| AudioError::ParameterWriteFailed { band, status })?;

        state.gains[band] = clamped;
        Ok(())
    }

    /// Last accepted gain for a band, 0.0 for a never-set or out-of-range
    /// band. This is the lenient read path the UI polls.
    pub fn gain(&self, band: usize) -> f32 {
        let state = self.state.lock();
        state.gains.get(band).copied().unwrap_or(0.0)
    }

    /// The fixed frequency table, ascending.
    pub fn frequencies(&self) -> [f32; BAND_COUNT] {
        BAND_FREQUENCIES
    }

    /// Set all 10 bands back to 0.0 dB, band 0 through 9. Aborts on the
    /// first failing write.
    pub fn reset(&self) -> Result<(), AudioError> {
        for band in 0..BAND_COUNT {
            self.set_gain(band, 0.0)?;
        }
        Ok(())
    }

    pub fn is_initialized(&self) -> bool {
        self.state.lock().unit.is_some()
    }

    fn program_bands(&self, unit: UnitRef) -> Result<(), (usize, OsStatus)> {
        for (band, &frequency) in BAND_FREQUENCIES.iter().enumerate() {
            let idx = band as u32;
            let writes = [
                (PARAM_FILTER_TYPE + idx, FILTER_TYPE_PARAMETRIC),
                (PARAM_FREQUENCY + idx, frequency),
                (PARAM_BANDWIDTH + idx, BANDWIDTH_OCTAVES),
                (PARAM_GAIN + idx, 0.0),
            ];
            for (param, value) in writes {
                self.host
                    .set_parameter(unit, param, SCOPE_GLOBAL, 0, value)
                    .map_err(|status| (band, status))?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::fake::{FakeHost, HostOp};

    fn initialized_core() -> (Arc<FakeHost>, EqualizerCore) {
        let host = Arc::new(FakeHost::new());
        let core = EqualizerCore::new(host.clone());
        core.initialize().expect("initialize");
        (host, core)
    }

    fn live_unit(core: &EqualizerCore) -> UnitRef {
        core.state.lock().unit.expect("live unit").0
    }

    #[test]
    fn set_then_get_round_trips_for_all_bands() {
        let (_host, core) = initialized_core();
        for band in 0..BAND_COUNT {
            let gain = -20.0 + 4.0 * band as f32;
            core.set_gain(band, gain).unwrap();
            assert!((core.gain(band) - gain).abs() < 1e-6);
        }
    }

    #[test]
    fn invalid_band_is_rejected_and_cache_untouched() {
        let (_host, core) = initialized_core();
        core.set_gain(4, 3.0).unwrap();

        assert_eq!(core.set_gain(10, 1.0), Err(AudioError::InvalidBand(10)));
        assert_eq!(core.set_gain(usize::MAX, 1.0), Err(AudioError::InvalidBand(usize::MAX)));

        for band in 0..BAND_COUNT {
            let expected = if band == 4 { 3.0 } else { 0.0 };
            assert_eq!(core.gain(band), expected);
        }
    }

    #[test]
    fn gain_clamps_before_reaching_the_unit() {
        let (host, core) = initialized_core();
        let unit = live_unit(&core);

        core.set_gain(3, 25.0).unwrap();
        assert_eq!(host.last_param(unit, PARAM_GAIN + 3), Some(20.0));
        assert_eq!(core.gain(3), 20.0);

        core.set_gain(3, -25.0).unwrap();
        assert_eq!(host.last_param(unit, PARAM_GAIN + 3), Some(-20.0));
        assert_eq!(core.gain(3), -20.0);
    }

    #[test]
    fn frequencies_are_fixed_and_ascending() {
        let (_host, core) = initialized_core();
        let expected = [
            32.0, 64.0, 125.0, 250.0, 500.0, 1000.0, 2000.0, 4000.0, 8000.0, 16000.0,
        ];
        assert_eq!(core.frequencies(), expected);

        core.set_gain(0, 12.0).unwrap();
        core.set_gain(9, -12.0).unwrap();
        assert_eq!(core.frequencies(), expected);
        assert!(expected.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn reset_returns_every_band_to_zero() {
        let (_host, core) = initialized_core();
        for band in 0..BAND_COUNT {
            core.set_gain(band, 7.5).unwrap();
        }
        core.reset().unwrap();
        for band in 0..BAND_COUNT {
            assert_eq!(core.gain(band), 0.0);
        }
    }

    #[test]
    fn out_of_range_read_is_lenient() {
        let (_host, core) = initialized_core();
        assert_eq!(core.gain(10), 0.0);
        assert_eq!(core.gain(usize::MAX), 0.0);
    }

    #[test]
    fn set_gain_without_unit_fails() {
        let host = Arc::new(FakeHost::new());
        let core = EqualizerCore::new(host);
        assert!(matches!(
            core.set_gain(0, 1.0),
            Err(AudioError::InitializationFailed(_))
        ));
        assert_eq!(core.gain(0), 0.0);
    }

    #[test]
    fn missing_component_reported() {
        let host = Arc::new(FakeHost::without_components());
        let core = EqualizerCore::new(host);
        assert_eq!(core.initialize(), Err(AudioError::ComponentNotFound));
        assert!(!core.is_initialized());
    }

    #[test]
    fn failed_instantiation_reported() {
        let host = Arc::new(FakeHost::new());
        host.fail_on(HostOp::Instantiate, OsStatus(-50));
        let core = EqualizerCore::new(host);
        assert!(matches!(
            core.initialize(),
            Err(AudioError::InitializationFailed(_))
        ));
        assert!(!core.is_initialized());
    }

    #[test]
    fn failed_band_programming_tears_the_unit_down() {
        let host = Arc::new(FakeHost::new());
        host.fail_param(PARAM_FREQUENCY + 5, OsStatus(-10867));
        let core = EqualizerCore::new(host.clone());

        assert!(matches!(
            core.initialize(),
            Err(AudioError::InitializationFailed(_))
        ));
        assert!(!core.is_initialized());
        assert_eq!(host.disposed_units().len(), 1);
    }

    #[test]
    fn failed_write_leaves_cache_on_last_applied_value() {
        let (host, core) = initialized_core();
        core.set_gain(3, 6.0).unwrap();

        host.fail_param(PARAM_GAIN + 3, OsStatus(-10867));
        let err = core.set_gain(3, 11.0).unwrap_err();
        assert!(matches!(err, AudioError::ParameterWriteFailed { band: 3, .. }));
        assert_eq!(core.gain(3), 6.0);

        host.clear_failures();
        core.set_gain(3, 11.0).unwrap();
        assert_eq!(core.gain(3), 11.0);
    }

    #[test]
    fn rapid_writes_land_in_order_last_wins() {
        let (host, core) = initialized_core();
        let unit = live_unit(&core);

        core.set_gain(2, 1.0).unwrap();
        core.set_gain(2, 2.0).unwrap();

        let gain_writes: Vec<f32> = host
            .writes()
            .into_iter()
            .filter(|(u, param, _)| *u == unit && *param == PARAM_GAIN + 2)
            .map(|(_, _, value)| value)
            .collect();
        // One 0.0 from band programming, then the two caller writes in order.
        assert_eq!(gain_writes, vec![0.0, 1.0, 2.0]);
        assert_eq!(host.last_param(unit, PARAM_GAIN + 2), Some(2.0));
    }

    #[test]
    fn initialize_programs_every_band() {
        let (host, core) = initialized_core();
        let unit = live_unit(&core);
        for (band, &freq) in BAND_FREQUENCIES.iter().enumerate() {
            let idx = band as u32;
            assert_eq!(
                host.last_param(unit, PARAM_FILTER_TYPE + idx),
                Some(FILTER_TYPE_PARAMETRIC)
            );
            assert_eq!(host.last_param(unit, PARAM_FREQUENCY + idx), Some(freq));
            assert_eq!(
                host.last_param(unit, PARAM_BANDWIDTH + idx),
                Some(BANDWIDTH_OCTAVES)
            );
            assert_eq!(host.last_param(unit, PARAM_GAIN + idx), Some(0.0));
        }
    }

    #[test]
    fn double_initialize_is_rejected() {
        let (_host, core) = initialized_core();
        assert!(matches!(
            core.initialize(),
            Err(AudioError::InitializationFailed(_))
        ));
        assert!(core.is_initialized());
    }

    #[test]
    fn shutdown_disposes_standalone_unit_once() {
        let (host, core) = initialized_core();
        core.shutdown();
        core.shutdown();
        assert_eq!(host.disposed_units().len(), 1);
        assert!(!core.is_initialized());
    }
}
