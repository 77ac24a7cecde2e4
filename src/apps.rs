//! Per-application audio session bookkeeping.
//!
//! Tracks one [`AppSession`] per regular (dock-visible) running
//! application: desired volume and an eq-enabled flag, keyed by bundle id.
//! This is pure UI-facing state; no audio effect is bound to it. The
//! running-application set comes from a [`WorkspaceProbe`], polled by
//! `refresh`; subscribers get the full session list over a channel whenever
//! the set actually changes, after it has settled (no-op refreshes are
//! deduplicated away).

use crossbeam_channel::{unbounded, Receiver, Sender};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::debug;

/// One running application as reported by the workspace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunningApp {
    pub bundle_id: String,
    pub name: String,
}

/// Source of the running-application set. The production implementation
/// wraps `NSWorkspace`; tests script their own.
pub trait WorkspaceProbe: Send + Sync {
    fn running_apps(&self) -> Vec<RunningApp>;
}

/// Desired audio state for one application. Bookkeeping only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppSession {
    pub bundle_id: String,
    pub name: String,
    pub volume: f32,
    pub eq_enabled: bool,
}

struct MonitorInner {
    sessions: HashMap<String, AppSession>,
}

/// Keeps the per-app session set in sync with the running applications.
pub struct AppMonitor {
    probe: Box<dyn WorkspaceProbe>,
    inner: Mutex<MonitorInner>,
    subscribers: Mutex<Vec<Sender<Vec<AppSession>>>>,
}

impl AppMonitor {
    pub fn new(probe: Box<dyn WorkspaceProbe>) -> Self {
        Self {
            probe,
            inner: Mutex::new(MonitorInner {
                sessions: HashMap::new(),
            }),
            subscribers: Mutex::new(Vec::new()),
        }
    }

    /// Poll the workspace and rebuild the session set. Surviving bundle ids
    /// keep their volume and eq flag; vanished applications are pruned; new
    /// ones start at volume 1.0 with the equalizer disabled. Subscribers
    /// are notified only when the set of applications changed.
    pub fn refresh(&self) {
        let apps = self.probe.running_apps();

        let mut inner = self.inner.lock();
        let mut next: HashMap<String, AppSession> = HashMap::new();
        for app in apps {
            if app.bundle_id.is_empty() || next.contains_key(&app.bundle_id) {
                continue;
            }
            let session = match inner.sessions.get(&app.bundle_id) {
                Some(existing) => AppSession {
                    bundle_id: app.bundle_id.clone(),
                    name: app.name,
                    volume: existing.volume,
                    eq_enabled: existing.eq_enabled,
                },
                None => AppSession {
                    bundle_id: app.bundle_id.clone(),
                    name: app.name,
                    volume: 1.0,
                    eq_enabled: false,
                },
            };
            next.insert(session.bundle_id.clone(), session);
        }

        let changed = {
            let mut old: Vec<&String> = inner.sessions.keys().collect();
            let mut new: Vec<&String> = next.keys().collect();
            old.sort();
            new.sort();
            old != new
        };

        inner.sessions = next;
        if !changed {
            return;
        }

        let snapshot = Self::sorted(&inner.sessions);
        debug!(count = snapshot.len(), "application set changed");
        drop(inner);
        self.notify(snapshot);
    }

    /// Sessions sorted by display name.
    pub fn sessions(&self) -> Vec<AppSession> {
        Self::sorted(&self.inner.lock().sessions)
    }

    /// Receive the full session list on every settled set change.
    pub fn subscribe(&self) -> Receiver<Vec<AppSession>> {
        let (tx, rx) = unbounded();
        self.subscribers.lock().push(tx);
        rx
    }

    /// Set the desired volume for an application, clamped to [0, 1].
    /// Unknown bundle ids are ignored.
    pub fn set_volume(&self, bundle_id: &str, volume: f32) {
        let mut inner = self.inner.lock();
        if let Some(session) = inner.sessions.get_mut(bundle_id) {
            session.volume = volume.clamp(0.0, 1.0);
        }
    }

    /// Desired volume for an application, 1.0 when unknown.
    pub fn volume(&self, bundle_id: &str) -> f32 {
        self.inner
            .lock()
            .sessions
            .get(bundle_id)
            .map(|s| s.volume)
            .unwrap_or(1.0)
    }

    pub fn set_eq_enabled(&self, bundle_id: &str, enabled: bool) {
        let mut inner = self.inner.lock();
        if let Some(session) = inner.sessions.get_mut(bundle_id) {
            session.eq_enabled = enabled;
        }
    }

    pub fn eq_enabled(&self, bundle_id: &str) -> bool {
        self.inner
            .lock()
            .sessions
            .get(bundle_id)
            .map(|s| s.eq_enabled)
            .unwrap_or(false)
    }

    fn sorted(sessions: &HashMap<String, AppSession>) -> Vec<AppSession> {
        let mut list: Vec<AppSession> = sessions.values().cloned().collect();
        list.sort_by(|a, b| a.name.cmp(&b.name));
        list
    }

    fn notify(&self, snapshot: Vec<AppSession>) {
        let mut subscribers = self.subscribers.lock();
        subscribers.retain(|tx| tx.send(snapshot.clone()).is_ok());
    }
}

#[cfg(target_os = "macos")]
pub mod workspace {
    //! NSWorkspace-backed probe for the running-application set.

    use objc2_app_kit::{NSApplicationActivationPolicy, NSWorkspace};

    use super::{RunningApp, WorkspaceProbe};

    /// Polls the shared workspace for regular (dock-visible) applications.
    pub struct NsWorkspaceProbe;

    impl WorkspaceProbe for NsWorkspaceProbe {
        fn running_apps(&self) -> Vec<RunningApp> {
            let workspace = NSWorkspace::sharedWorkspace();
            let apps = workspace.runningApplications();

            let mut result = Vec::new();
            for app in apps.iter() {
                if app.activationPolicy() != NSApplicationActivationPolicy::Regular {
                    continue;
                }
                let Some(bundle_id) = app.bundleIdentifier() else {
                    continue;
                };
                let name = app
                    .localizedName()
                    .map(|n| n.to_string())
                    .unwrap_or_else(|| "Unknown".to_string());
                result.push(RunningApp {
                    bundle_id: bundle_id.to_string(),
                    name,
                });
            }
            result
        }
    }
}
