//! Scheduler / notifier loop.
//!
//! Polling is a chain of one-shot timers: each fired cycle arms the next one
//! only after its own extract → diff → notify sequence has finished, so time
//! spent waiting on the user never counts towards the next interval.
//!
//! ```text
//!            start()                    timer fires
//!   Idle ───────────────▶ Armed ──────────────────────▶ Running
//!    ▲ ▲                   │  ▲                          │  │  │
//!    │ └──── stop() ───────┘  └──── no update/declined ──┘  │  │
//!    │                                                      │  │ reload
//!    │         page visible                 page hidden     │  ▼
//!    └──────────────────────── Hidden ◀─────────────────────┘ Reloaded
//! ```
//!
//! Every detection, automatic or manual, runs under one async cycle guard, so
//! two cycles never overlap on the same instance.

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use tokio::runtime::Handle;
use tokio::sync::watch;
use tokio::task::{AbortHandle, JoinHandle};

use crate::error::Result;
use crate::host::{Host, Visibility};
use crate::models::Fingerprint;
use crate::pipeline::diff::{self, Change};
use crate::pipeline::extract::FingerprintExtractor;
use crate::pipeline::notify::{Callbacks, Decision, Notification};
use crate::pipeline::resolve::{Mode, ResolvedConfig};
use crate::utils::trace;

/// Where the automatic loop currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// No timer armed.
    Idle,
    /// A one-shot timer is pending.
    Armed,
    /// A fired cycle is in flight.
    Running,
    /// Parked until the page becomes visible again.
    Hidden,
    /// A reload was triggered; the automatic loop is over.
    Reloaded,
}

#[derive(Debug)]
enum Timer {
    Idle,
    Armed(AbortHandle),
    Running,
    Hidden,
    Reloaded,
}

impl Timer {
    fn phase(&self) -> Phase {
        match self {
            Timer::Idle => Phase::Idle,
            Timer::Armed(_) => Phase::Armed,
            Timer::Running => Phase::Running,
            Timer::Hidden => Phase::Hidden,
            Timer::Reloaded => Phase::Reloaded,
        }
    }
}

#[derive(Debug)]
struct State {
    baseline: Option<Fingerprint>,
    timer: Timer,
    hidden: bool,
    /// Bumped by every stop so that a cycle in flight knows not to re-arm.
    epoch: u64,
}

/// Detection engine shared between the public handle and its timer tasks.
pub struct Engine {
    config: ResolvedConfig,
    extractor: FingerprintExtractor,
    notification: Notification,
    runtime: Option<Handle>,
    state: Mutex<State>,
    cycle: tokio::sync::Mutex<()>,
}

impl Engine {
    pub fn new(config: ResolvedConfig, host: &Host, callbacks: Callbacks) -> Arc<Self> {
        let extractor = FingerprintExtractor::new(Arc::clone(&host.fetcher), &config);
        let notification = Notification::new(
            &config,
            callbacks,
            Arc::clone(&host.prompt),
            Arc::clone(&host.reloader),
        );
        let hidden = config.mode.pause_on_hidden()
            && host
                .visibility
                .as_ref()
                .is_some_and(|rx| rx.borrow().is_hidden());

        Arc::new(Self {
            config,
            extractor,
            notification,
            runtime: Handle::try_current().ok(),
            state: Mutex::new(State {
                baseline: None,
                timer: Timer::Idle,
                hidden,
                epoch: 0,
            }),
            cycle: tokio::sync::Mutex::new(()),
        })
    }

    pub fn config(&self) -> &ResolvedConfig {
        &self.config
    }

    pub fn phase(&self) -> Phase {
        self.state().timer.phase()
    }

    pub fn baseline(&self) -> Option<Fingerprint> {
        self.state().baseline.clone()
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn step(&self, message: fmt::Arguments<'_>) {
        trace::step(self.config.debug, message);
    }

    /// Begin automatic polling. No-op in manual mode or while a cycle is
    /// armed or running.
    pub fn start(self: &Arc<Self>) {
        if self.config.mode.is_manual() {
            self.step(format_args!("Manual mode, start() ignored"));
            return;
        }

        let mut state = self.state();
        if matches!(state.timer, Timer::Armed(_) | Timer::Running) {
            self.step(format_args!("Detection already running"));
            return;
        }
        self.step(format_args!("Starting update detection"));
        self.arm(&mut state);
    }

    /// Cancel a pending timer. A cycle already in flight finishes its check
    /// but does not schedule another one.
    pub fn stop(&self) {
        let mut state = self.state();
        self.step(format_args!("Stopping update detection"));
        Self::halt(&mut state, Timer::Idle);
    }

    /// Forget the baseline and stop.
    pub fn reset(&self) {
        let mut state = self.state();
        self.step(format_args!("Resetting baseline"));
        state.baseline = None;
        Self::halt(&mut state, Timer::Idle);
    }

    fn halt(state: &mut State, next: Timer) {
        if let Timer::Armed(handle) = &state.timer {
            handle.abort();
        }
        state.timer = next;
        state.epoch = state.epoch.wrapping_add(1);
    }

    fn arm(self: &Arc<Self>, state: &mut State) {
        let Mode::Polling { interval, .. } = self.config.mode else {
            return;
        };

        if self.config.mode.pause_on_hidden() && state.hidden {
            self.step(format_args!("Page hidden, checks paused"));
            state.timer = Timer::Hidden;
            return;
        }

        let Some(runtime) = &self.runtime else {
            log::warn!("[UpdateNotifier] No Tokio runtime available, automatic polling disabled");
            state.timer = Timer::Idle;
            return;
        };

        let engine = Arc::clone(self);
        let epoch = state.epoch;
        let task = runtime.spawn(async move {
            tokio::time::sleep(interval).await;
            engine.fire(epoch).await;
        });
        state.timer = Timer::Armed(task.abort_handle());
    }

    async fn fire(self: Arc<Self>, epoch: u64) {
        {
            let mut state = self.state();
            if state.epoch != epoch {
                return;
            }
            if self.config.mode.pause_on_hidden() && state.hidden {
                self.step(format_args!("Page hidden when timer fired, checks paused"));
                state.timer = Timer::Hidden;
                return;
            }
            state.timer = Timer::Running;
        }

        let outcome = self.run_cycle(epoch).await;

        let mut state = self.state();
        if state.epoch != epoch {
            self.step(format_args!("Stopped during a check, not rescheduling"));
            return;
        }
        match outcome {
            Ok(Some(Decision::Reloaded)) => state.timer = Timer::Reloaded,
            Ok(_) => self.arm(&mut state),
            Err(e) => {
                log::error!("[UpdateNotifier] Automatic checks stopped: {e}");
                state.timer = Timer::Idle;
            }
        }
    }

    async fn run_cycle(&self, epoch: u64) -> Result<Option<Decision>> {
        let _cycle = self.cycle.lock().await;
        // A manual check may have stopped or reloaded while we waited.
        if self.state().epoch != epoch {
            self.step(format_args!("Stopped while waiting for a manual check, skipping"));
            return Ok(None);
        }
        if !self.detect().await.is_update() {
            return Ok(None);
        }
        self.notification.run().await.map(Some)
    }

    /// Extract and diff against the baseline. Caller holds the cycle guard.
    async fn detect(&self) -> Change {
        let fingerprint = self.extractor.extract().await;
        let digest = fingerprint.digest();
        let change = diff::diff(&mut self.state().baseline, fingerprint);
        self.step(format_args!("Fingerprint {digest}: {change}"));
        if change.is_update() {
            log::info!("[UpdateNotifier] New version detected ({change})");
        }
        change
    }

    /// Extract and diff only; never notifies.
    pub async fn check_now(&self) -> bool {
        let _cycle = self.cycle.lock().await;
        self.step(format_args!("Manual check (silent)"));
        self.detect().await.is_update()
    }

    /// Extract, diff, and run the notification protocol on an update.
    ///
    /// Returns whether an update was detected. Fails only when the update
    /// callback fails.
    pub async fn check_update(&self) -> Result<bool> {
        let _cycle = self.cycle.lock().await;
        self.step(format_args!("Manual check with prompt"));
        let change = self.detect().await;
        if !change.is_update() {
            return Ok(false);
        }

        if self.notification.run().await? == Decision::Reloaded {
            Self::halt(&mut self.state(), Timer::Reloaded);
        }
        Ok(true)
    }

    /// Record a visibility change. Becoming visible resumes an idle or
    /// paused loop.
    pub fn set_visibility(self: &Arc<Self>, visibility: Visibility) {
        let mut state = self.state();
        state.hidden = visibility.is_hidden();
        self.step(format_args!("Page visibility changed: {visibility:?}"));

        if !state.hidden && matches!(state.timer, Timer::Idle | Timer::Hidden) {
            self.step(format_args!("Page visible again, resuming checks"));
            self.arm(&mut state);
        }
    }

    /// Follow the host's visibility signal until the engine goes away.
    pub fn watch_visibility(
        self: &Arc<Self>,
        mut visibility: watch::Receiver<Visibility>,
    ) -> Option<JoinHandle<()>> {
        let runtime = self.runtime.as_ref()?;
        let engine: Weak<Self> = Arc::downgrade(self);
        Some(runtime.spawn(async move {
            while visibility.changed().await.is_ok() {
                let current = *visibility.borrow_and_update();
                let Some(engine) = engine.upgrade() else {
                    break;
                };
                engine.set_visibility(current);
            }
        }))
    }
}
