use std::fmt;

use crossbeam_channel::{bounded, unbounded, Receiver, Sender, TrySendError};

/// Outbound event queue of one binder or host.
///
/// Cloning an emitter shares the queue, which is how engine listeners push
/// events out without touching the map handle. Receivers handed out by
/// [`Emitter::subscribe`] also share the queue: each event is delivered once.
///
/// Events stay queued until someone drains them. An emitter built with
/// [`Emitter::new`] grows without limit, so owners that forward
/// high-frequency events (`mousemove`, `render`, `move`) and never drain
/// should use [`Emitter::bounded`], which drops the oldest event when full.
pub struct Emitter<T> {
    sender: Sender<T>,
    receiver: Receiver<T>,
}

impl<T> Clone for Emitter<T> {
    fn clone(&self) -> Self {
        Self {
            sender: self.sender.clone(),
            receiver: self.receiver.clone(),
        }
    }
}

impl<T: fmt::Debug> Emitter<T> {
    pub fn new() -> Self {
        let (sender, receiver) = unbounded();
        Self { sender, receiver }
    }

    /// A queue holding at most `capacity` events; the oldest one is dropped
    /// to make room for a new one
    pub fn bounded(capacity: usize) -> Self {
        let (sender, receiver) = bounded(capacity.max(1));
        Self { sender, receiver }
    }

    /// Queues an event
    pub fn emit(&self, event: T) {
        log::trace!("emit {:?}", event);
        let mut event = event;
        loop {
            match self.sender.try_send(event) {
                Ok(()) => return,
                Err(TrySendError::Full(rejected)) => {
                    if let Ok(dropped) = self.receiver.try_recv() {
                        log::trace!("queue full, dropping {:?}", dropped);
                    }
                    event = rejected;
                }
                // The emitter keeps its own receiver, so this cannot happen.
                Err(TrySendError::Disconnected(_)) => return,
            }
        }
    }

    /// `None` for an unbounded queue
    pub fn capacity(&self) -> Option<usize> {
        self.sender.capacity()
    }

    pub fn subscribe(&self) -> Receiver<T> {
        self.receiver.clone()
    }

    /// Takes every queued event
    pub fn drain(&self) -> Vec<T> {
        self.receiver.try_iter().collect()
    }

    pub fn pending(&self) -> usize {
        self.receiver.len()
    }
}

impl<T: fmt::Debug> Default for Emitter<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for Emitter<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Emitter")
            .field("pending", &self.receiver.len())
            .finish()
    }
}
