//! Mount/unmount lifecycle shared by every gated binder

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::core::config::GateConfig;
use crate::core::handle::{MapHandle, WeakMapHandle};
use crate::core::readiness::{Readiness, ReadinessGate};
use crate::engine::MapEngine;
use crate::traits::Binding;
use crate::{Error, Result};

struct Slot<B> {
    binding: B,
    /// Cleared on unmount; late readiness callbacks check it under the lock
    live: bool,
}

fn lock<B>(slot: &Mutex<Slot<B>>) -> Result<MutexGuard<'_, Slot<B>>> {
    slot.lock().map_err(|_| Error::Poisoned)
}

/// A binding mounted on a map, re-attached by its readiness gate.
///
/// Locks are always taken map first, then binding state.
pub struct Mounted<E: MapEngine, B: Binding<E>> {
    handle: MapHandle<E>,
    slot: Arc<Mutex<Slot<B>>>,
    gate: Option<ReadinessGate<E>>,
}

impl<E: MapEngine, B: Binding<E>> Mounted<E, B> {
    /// Probes the style once: attaches when it is loaded, runs `detach`
    /// otherwise, then arms the gate for the following style-load cycles.
    pub fn mount(handle: &MapHandle<E>, binding: B, gate: GateConfig) -> Result<Self> {
        gate.validate()?;
        let slot = Arc::new(Mutex::new(Slot {
            binding,
            live: true,
        }));

        let loaded = handle.try_with(|engine| {
            let loaded = engine.is_style_loaded();
            let mut state = lock(&slot)?;
            if loaded {
                state.binding.attach(engine)?;
            } else {
                log::debug!(
                    "style not loaded yet, deferring {}",
                    state.binding.describe()
                );
                state.binding.detach(engine)?;
            }
            Ok(loaded)
        })?;

        let weak = handle.downgrade();
        let shared = slot.clone();
        let gate = ReadinessGate::arm_from(handle, gate, loaded, move |readiness| {
            apply(&weak, &shared, readiness)
        })?;

        Ok(Self {
            handle: handle.clone(),
            slot,
            gate: Some(gate),
        })
    }

    pub fn handle(&self) -> &MapHandle<E> {
        &self.handle
    }

    /// Style state as of the gate's last probe
    pub fn is_ready(&self) -> bool {
        self.gate.as_ref().is_some_and(|gate| gate.is_ready())
    }

    pub fn is_mounted(&self) -> bool {
        self.gate.is_some()
    }

    /// Runs `f` against the binding and the engine
    pub fn with_binding<R>(&self, f: impl FnOnce(&mut B, &mut E) -> Result<R>) -> Result<R> {
        self.handle.try_with(|engine| {
            let mut state = lock(&self.slot)?;
            f(&mut state.binding, engine)
        })
    }

    /// Reads binding state without touching the engine
    pub fn inspect<R>(&self, f: impl FnOnce(&B) -> R) -> Result<R> {
        let state = lock(&self.slot)?;
        Ok(f(&state.binding))
    }

    /// Cancels the gate, then detaches
    pub fn unmount(mut self) -> Result<()> {
        self.teardown()
    }

    fn teardown(&mut self) -> Result<()> {
        let Some(mut gate) = self.gate.take() else {
            return Ok(());
        };
        gate.disarm();

        self.handle.try_with(|engine| {
            let mut state = lock(&self.slot)?;
            state.live = false;
            log::debug!("unmounting {}", state.binding.describe());
            state.binding.detach(engine)
        })
    }
}

impl<E: MapEngine, B: Binding<E>> Drop for Mounted<E, B> {
    fn drop(&mut self) {
        match self.teardown() {
            Ok(()) | Err(Error::MapDestroyed) => {}
            Err(err) => log::warn!("detach on drop failed: {}", err),
        }
    }
}

impl<E: MapEngine, B: Binding<E>> fmt::Debug for Mounted<E, B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let binding = self
            .inspect(|binding| binding.describe())
            .unwrap_or_else(|_| "<poisoned>".to_string());
        f.debug_struct("Mounted")
            .field("binding", &binding)
            .field("mounted", &self.is_mounted())
            .finish()
    }
}

fn apply<E: MapEngine, B: Binding<E>>(
    handle: &WeakMapHandle<E>,
    slot: &Mutex<Slot<B>>,
    readiness: Readiness,
) {
    let outcome = handle.try_with(|engine| {
        let mut state = lock(slot)?;
        if !state.live {
            return Ok(());
        }
        match readiness {
            Readiness::Ready => state.binding.attach(engine),
            Readiness::NotReady => state.binding.detach(engine),
            Readiness::TimedOut => {
                state.binding.on_timeout();
                Ok(())
            }
        }
    });
    match outcome {
        Ok(()) | Err(Error::MapDestroyed) => {}
        Err(err) => log::error!("{:?} handling failed: {}", readiness, err),
    }
}
