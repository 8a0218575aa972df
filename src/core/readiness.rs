//! Style-readiness gate
//!
//! Engines throw away runtime-added sources and layers when their style is
//! swapped, and reject mutation while the new style is still loading. The gate
//! watches for `style.load`, polls `is_style_loaded` on a fixed interval until
//! it reports true, and tells its owner about every readiness edge.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::time::Instant;

use crate::core::config::GateConfig;
use crate::core::handle::{MapHandle, WeakMapHandle};
use crate::engine::{EventTarget, ListenerId, MapEngine};
use crate::input::events::EventKind;
use crate::runtime::{self, AsyncHandle};
use crate::{Error, Result};

/// A readiness edge reported by the gate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Readiness {
    /// The style finished loading; mutation is allowed again
    Ready,
    /// A style (re)load started; runtime objects are gone or about to be
    NotReady,
    /// A bounded poll gave up on the current style-load cycle
    TimedOut,
}

/// Edge detector over successive `is_style_loaded` answers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadinessTracker {
    ready: bool,
}

impl ReadinessTracker {
    pub fn new(ready: bool) -> Self {
        Self { ready }
    }

    pub fn is_ready(&self) -> bool {
        self.ready
    }

    /// Records one probe. Only a change of state produces a value.
    pub fn observe(&mut self, loaded: bool) -> Option<Readiness> {
        if loaded == self.ready {
            return None;
        }
        self.ready = loaded;
        Some(if loaded {
            Readiness::Ready
        } else {
            Readiness::NotReady
        })
    }

    /// A new style-load cycle began
    pub fn restart(&mut self) -> Option<Readiness> {
        self.observe(false)
    }
}

/// Resolves once the engine reports its style loaded
pub async fn wait_until_loaded<E: MapEngine>(
    handle: &MapHandle<E>,
    config: &GateConfig,
) -> Result<()> {
    let started = Instant::now();
    loop {
        if handle.with(|engine| engine.is_style_loaded())? {
            return Ok(());
        }
        if let Some(limit) = config.timeout {
            if started.elapsed() >= limit {
                return Err(Error::StyleTimeout(limit));
            }
        }
        runtime::delay(config.poll_interval).await;
    }
}

/// Cancellable readiness poll owned by one binder.
///
/// Dropping or disarming the gate cancels the poll task and unsubscribes from
/// `style.load`, so no tick runs after the owner is torn down.
pub struct ReadinessGate<E: MapEngine> {
    handle: WeakMapHandle<E>,
    config: GateConfig,
    listener: Option<ListenerId>,
    task: Option<Box<dyn AsyncHandle>>,
    ready: Arc<AtomicBool>,
}

impl<E: MapEngine> ReadinessGate<E> {
    /// Arms the gate, probing the style once to learn the starting state
    pub fn arm<F>(handle: &MapHandle<E>, config: GateConfig, on_change: F) -> Result<Self>
    where
        F: FnMut(Readiness) + Send + 'static,
    {
        let loaded = handle.with(|engine| engine.is_style_loaded())?;
        Self::arm_from(handle, config, loaded, on_change)
    }

    /// Arms the gate from a style state the caller already probed. When the
    /// style is not loaded yet, polling starts right away.
    pub fn arm_from<F>(
        handle: &MapHandle<E>,
        config: GateConfig,
        loaded: bool,
        on_change: F,
    ) -> Result<Self>
    where
        F: FnMut(Readiness) + Send + 'static,
    {
        config.validate()?;

        let (cycles_tx, cycles_rx) = mpsc::unbounded_channel();
        let notify = cycles_tx.clone();
        let listener = handle.with(|engine| {
            engine.on(
                EventKind::StyleLoad,
                EventTarget::Map,
                Box::new(move |_| {
                    let _ = notify.send(());
                }),
            )
        })?;
        if !loaded {
            let _ = cycles_tx.send(());
        }
        // The listener keeps the only remaining sender; unsubscribing ends the task.
        drop(cycles_tx);

        let ready = Arc::new(AtomicBool::new(loaded));
        let task = runtime::spawn(poll_cycles(
            handle.downgrade(),
            config,
            cycles_rx,
            ready.clone(),
            ReadinessTracker::new(loaded),
            on_change,
        ));
        log::debug!(
            "readiness gate armed (style loaded: {}, interval {:?})",
            loaded,
            config.poll_interval
        );

        Ok(Self {
            handle: handle.downgrade(),
            config,
            listener: Some(listener),
            task: Some(task),
            ready,
        })
    }

    /// Style state as of the last probe
    pub fn is_ready(&self) -> bool {
        self.ready.load(Ordering::SeqCst)
    }

    pub fn is_armed(&self) -> bool {
        self.task.is_some()
    }

    pub fn config(&self) -> &GateConfig {
        &self.config
    }

    /// Cancels the poll and unsubscribes. Safe to call more than once.
    ///
    /// Must not be called while the map handle is locked.
    pub fn disarm(&mut self) {
        if let Some(task) = self.task.take() {
            task.cancel();
        }
        if let Some(listener) = self.listener.take() {
            if let Some(handle) = self.handle.upgrade() {
                let _ = handle.with(|engine| engine.off(listener));
            }
            log::debug!("readiness gate disarmed");
        }
    }
}

impl<E: MapEngine> Drop for ReadinessGate<E> {
    fn drop(&mut self) {
        self.disarm();
    }
}

async fn poll_cycles<E, F>(
    handle: WeakMapHandle<E>,
    config: GateConfig,
    mut cycles: mpsc::UnboundedReceiver<()>,
    ready: Arc<AtomicBool>,
    mut tracker: ReadinessTracker,
    mut on_change: F,
) where
    E: MapEngine,
    F: FnMut(Readiness) + Send + 'static,
{
    while cycles.recv().await.is_some() {
        // Several style.load events before the first tick are one cycle
        while cycles.try_recv().is_ok() {}

        if let Some(change) = tracker.restart() {
            ready.store(false, Ordering::SeqCst);
            on_change(change);
        }

        let started = Instant::now();
        loop {
            let loaded = match handle.try_with(|engine| Ok(engine.is_style_loaded())) {
                Ok(loaded) => loaded,
                Err(err) => {
                    log::debug!("stopping readiness poll: {}", err);
                    return;
                }
            };
            ready.store(loaded, Ordering::SeqCst);
            if let Some(change) = tracker.observe(loaded) {
                on_change(change);
            }
            if loaded {
                break;
            }
            if let Some(limit) = config.timeout {
                if started.elapsed() >= limit {
                    log::warn!("style did not finish loading within {:?}", limit);
                    on_change(Readiness::TimedOut);
                    break;
                }
            }
            runtime::delay(config.poll_interval).await;
        }
    }
}
