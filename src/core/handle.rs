use std::fmt;
use std::sync::{Arc, Mutex, Weak};

use crate::engine::MapEngine;
use crate::{Error, Result};

/// Shared reference to the engine instance a host created.
///
/// Handles only come out of [`MapHost::mount`](crate::core::map::MapHost::mount),
/// so a binder can never hold one before the engine exists. Once the host
/// unmounts, every access through a stale clone fails with
/// [`Error::MapDestroyed`].
pub struct MapHandle<E> {
    inner: Arc<Mutex<Option<E>>>,
}

impl<E> Clone for MapHandle<E> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<E> fmt::Debug for MapHandle<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MapHandle")
            .field("holders", &Arc::strong_count(&self.inner))
            .finish()
    }
}

impl<E: MapEngine> MapHandle<E> {
    pub(crate) fn new(engine: E) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Some(engine))),
        }
    }

    /// Runs `f` with exclusive access to the engine
    pub fn with<R>(&self, f: impl FnOnce(&mut E) -> R) -> Result<R> {
        let mut guard = self.inner.lock().map_err(|_| Error::Poisoned)?;
        match guard.as_mut() {
            Some(engine) => Ok(f(engine)),
            None => Err(Error::MapDestroyed),
        }
    }

    /// Like [`MapHandle::with`] for closures that already return a `Result`
    pub fn try_with<R>(&self, f: impl FnOnce(&mut E) -> Result<R>) -> Result<R> {
        self.with(f)?
    }

    pub fn is_alive(&self) -> bool {
        self.inner
            .lock()
            .map(|guard| guard.is_some())
            .unwrap_or(false)
    }

    pub fn downgrade(&self) -> WeakMapHandle<E> {
        WeakMapHandle {
            inner: Arc::downgrade(&self.inner),
        }
    }

    pub fn same_map(&self, other: &MapHandle<E>) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Takes the engine out; later accesses fail with `MapDestroyed`
    pub(crate) fn destroy(&self) -> Option<E> {
        self.inner.lock().ok().and_then(|mut guard| guard.take())
    }
}

/// Non-owning handle, used by listeners that live inside the engine itself
pub struct WeakMapHandle<E> {
    inner: Weak<Mutex<Option<E>>>,
}

impl<E> Clone for WeakMapHandle<E> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<E> fmt::Debug for WeakMapHandle<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WeakMapHandle").finish()
    }
}

impl<E: MapEngine> WeakMapHandle<E> {
    pub fn upgrade(&self) -> Option<MapHandle<E>> {
        self.inner.upgrade().map(|inner| MapHandle { inner })
    }

    /// Runs `f` against the engine if the map is still around
    pub fn try_with<R>(&self, f: impl FnOnce(&mut E) -> Result<R>) -> Result<R> {
        self.upgrade().ok_or(Error::MapDestroyed)?.try_with(f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::MapOptions;
    use crate::engine::memory::MemoryEngine;

    fn handle() -> MapHandle<MemoryEngine> {
        MapHandle::new(MemoryEngine::create(&MapOptions::new().resolved()).unwrap())
    }

    #[test]
    fn test_clones_share_the_engine() {
        let handle = handle();
        let clone = handle.clone();
        clone.with(|engine| engine.set_style_loaded(false)).unwrap();
        assert!(!handle.with(|engine| engine.is_style_loaded()).unwrap());
        assert!(handle.same_map(&clone));
    }

    #[test]
    fn test_destroyed_handle_fails() {
        let handle = handle();
        let clone = handle.clone();
        assert!(handle.destroy().is_some());

        assert!(!clone.is_alive());
        assert!(matches!(clone.with(|_| ()), Err(Error::MapDestroyed)));
        assert!(handle.destroy().is_none());
    }

    #[test]
    fn test_weak_handle_does_not_keep_map() {
        let handle = handle();
        let weak = handle.downgrade();
        assert!(weak.upgrade().is_some());

        drop(handle);
        assert!(weak.upgrade().is_none());
        assert!(matches!(weak.try_with(|_| Ok(())), Err(Error::MapDestroyed)));
    }
}
