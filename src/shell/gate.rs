//! Navigation loading gate.
//!
//! Every push or replace navigation starts a new activation in `Loading`. The
//! activation becomes `Ready` once its minimum display timer has fired and its
//! view has reported ready; views declared [`Readiness::Immediate`] count as
//! ready from the start. Traversal (back/forward) leaves the gate alone.
//!
//! Timers and view signals carry the activation they were issued for, and
//! anything addressed to a superseded activation is dropped, so a newer
//! navigation can never be revealed early by an older timer.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, trace};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LoadingState {
    Loading,
    Ready,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NavigationKind {
    Push,
    Replace,
    Traverse,
}

/// Whether the destination view has background work of its own.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Readiness {
    Immediate,
    Deferred,
}

/// Monotonic id of one gate activation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Activation(u64);

#[derive(Clone, Copy, Debug)]
pub struct GateConfig {
    min_display: Duration,
}

impl GateConfig {
    pub const DEFAULT_MIN_DISPLAY: Duration = Duration::from_millis(6000);

    #[must_use]
    pub const fn new() -> Self {
        Self {
            min_display: Self::DEFAULT_MIN_DISPLAY,
        }
    }

    #[must_use]
    pub const fn with_min_display(mut self, min_display: Duration) -> Self {
        self.min_display = min_display;
        self
    }

    #[must_use]
    pub const fn min_display(&self) -> Duration {
        self.min_display
    }
}

impl Default for GateConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Published gate state.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GateSnapshot {
    pub activation: Activation,
    pub state: LoadingState,
    timer_elapsed: bool,
    view_ready: bool,
}

impl GateSnapshot {
    fn loading(activation: Activation, readiness: Readiness) -> Self {
        Self {
            activation,
            state: LoadingState::Loading,
            timer_elapsed: false,
            view_ready: readiness == Readiness::Immediate,
        }
    }

    fn settle(&mut self) {
        if self.timer_elapsed && self.view_ready {
            self.state = LoadingState::Ready;
        }
    }
}

pub struct NavigationGate {
    config: GateConfig,
    state: Arc<watch::Sender<GateSnapshot>>,
    timer: Option<JoinHandle<()>>,
}

impl NavigationGate {
    /// Mount the gate for the initial view; the first activation starts now.
    ///
    /// Must be called from within a tokio runtime.
    #[must_use]
    pub fn mount(config: GateConfig, readiness: Readiness) -> Self {
        let first = Activation(1);
        let (state, _) = watch::channel(GateSnapshot::loading(first, readiness));
        let mut gate = Self {
            config,
            state: Arc::new(state),
            timer: None,
        };
        gate.arm(first);
        gate
    }

    /// Route transition hook. Returns the new activation, or `None` for
    /// traversal, which never touches the gate.
    pub fn navigate(&mut self, kind: NavigationKind, readiness: Readiness) -> Option<Activation> {
        if kind == NavigationKind::Traverse {
            trace!("traversal keeps the current view");
            return None;
        }

        let mut next = self.activation();
        self.state.send_modify(|snapshot| {
            next = Activation(snapshot.activation.0 + 1);
            *snapshot = GateSnapshot::loading(next, readiness);
        });
        self.arm(next);
        debug!(activation = next.0, ?kind, ?readiness, "gate reset to loading");
        Some(next)
    }

    /// Report that the view of `activation` finished its own work. Returns
    /// `false` when the signal is stale or repeated.
    pub fn mark_view_ready(&self, activation: Activation) -> bool {
        self.state.send_if_modified(|snapshot| {
            if snapshot.activation != activation || snapshot.view_ready {
                return false;
            }
            snapshot.view_ready = true;
            snapshot.settle();
            true
        })
    }

    #[must_use]
    pub fn state(&self) -> LoadingState {
        self.state.borrow().state
    }

    #[must_use]
    pub fn activation(&self) -> Activation {
        self.state.borrow().activation
    }

    #[must_use]
    pub fn snapshot(&self) -> GateSnapshot {
        *self.state.borrow()
    }

    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<GateSnapshot> {
        self.state.subscribe()
    }

    /// Wait until the current activation is revealed and return it.
    pub async fn ready(&self) -> Activation {
        let mut receiver = self.subscribe();
        let revealed = receiver
            .wait_for(|snapshot| snapshot.state == LoadingState::Ready)
            .await
            .map(|snapshot| snapshot.activation);
        revealed.unwrap_or_else(|_| self.activation())
    }

    fn arm(&mut self, activation: Activation) {
        if let Some(previous) = self.timer.take() {
            previous.abort();
        }

        let state = Arc::clone(&self.state);
        let delay = tokio::time::sleep(self.config.min_display);
        self.timer = Some(tokio::spawn(async move {
            delay.await;
            state.send_if_modified(|snapshot| {
                if snapshot.activation != activation {
                    return false;
                }
                snapshot.timer_elapsed = true;
                snapshot.settle();
                true
            });
        }));
    }
}

impl Drop for NavigationGate {
    fn drop(&mut self) {
        if let Some(timer) = self.timer.take() {
            timer.abort();
        }
    }
}
