//! A minimal, unbounded listener registry.
//!
//! Grounded on `alloy-core`'s `BotManager`, which stores its dispatcher as
//! an `Arc<dyn Fn(BoxedEvent, BoxedBot) + Send + Sync>` and mutates a
//! `RwLock`-guarded table from both the transport loop and the application.
//! Here the same shape is generalized into a small reusable registry: no
//! listener-count cap (`spec.md` §9 calls out the source's unbounded
//! max-listeners setting explicitly), idempotent removal, and `once`
//! semantics that fire at most one time no matter how many events arrive.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;

/// Handle returned by [`Emitter::on`]/[`Emitter::once`], used to remove a
/// listener later. Opaque and cheap to copy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

static FRESH_ID: AtomicU64 = AtomicU64::new(1);

impl ListenerId {
    /// Allocates a fresh id from a crate-wide counter. For listener
    /// registries that need identity-aware storage (scoped instance
    /// listeners keyed by `(event_name, kind)`, filtered by identity at
    /// emit time) instead of a plain [`Emitter`].
    pub fn fresh() -> Self {
        Self(FRESH_ID.fetch_add(1, Ordering::Relaxed))
    }
}

struct Entry<F> {
    id: ListenerId,
    once: bool,
    listener: F,
}

/// A listener registry for a single event bus.
///
/// `F` is the listener closure type, typically `Arc<dyn Fn(Args) + Send + Sync>`.
pub struct Emitter<F> {
    next_id: AtomicU64,
    listeners: Mutex<Vec<Entry<F>>>,
}

impl<F> Default for Emitter<F> {
    fn default() -> Self {
        Self {
            next_id: AtomicU64::new(1),
            listeners: Mutex::new(Vec::new()),
        }
    }
}

impl<F> Emitter<F> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a listener that fires on every emission.
    pub fn on(&self, listener: F) -> ListenerId {
        self.register(listener, false)
    }

    /// Registers a listener that fires at most once (I5), then is removed.
    pub fn once(&self, listener: F) -> ListenerId {
        self.register(listener, true)
    }

    fn register(&self, listener: F, once: bool) -> ListenerId {
        let id = ListenerId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.listeners.lock().push(Entry { id, once, listener });
        id
    }

    /// Removes a listener by id. A no-op if the id is not currently
    /// registered (P8 — idempotent, tolerates racing with auto-cleanup or a
    /// prior `once` firing).
    pub fn off(&self, id: ListenerId) {
        self.listeners.lock().retain(|e| e.id != id);
    }

    /// Removes every listener currently registered.
    pub fn remove_all(&self) {
        self.listeners.lock().clear();
    }

    /// Returns the number of listeners currently registered.
    pub fn len(&self) -> usize {
        self.listeners.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Convenience alias for the common case: an `Arc`-shared `Fn(Args)`
/// listener, cloneable and safely callable from the dispatch loop while a
/// caller concurrently registers or removes other listeners.
pub type ArcListener<Args> = Arc<dyn Fn(Args) + Send + Sync>;

impl<Args: Clone + 'static> Emitter<ArcListener<Args>> {
    /// Invokes every listener with a clone of `args`, in registration
    /// order, then removes the `once` listeners that fired (I5).
    pub fn emit_and_sweep(&self, args: Args) {
        let fire: Vec<Entry<ArcListener<Args>>> = {
            let mut guard = self.listeners.lock();
            let snapshot: Vec<Entry<ArcListener<Args>>> = guard
                .iter()
                .map(|e| Entry {
                    id: e.id,
                    once: e.once,
                    listener: e.listener.clone(),
                })
                .collect();
            guard.retain(|e| !e.once);
            snapshot
        };
        for entry in fire {
            (entry.listener)(args.clone());
        }
    }
}

impl<F> std::fmt::Debug for Emitter<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Emitter")
            .field("listener_count", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering as AOrdering};

    #[test]
    fn once_listener_fires_exactly_once() {
        let emitter: Emitter<ArcListener<i32>> = Emitter::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let calls2 = calls.clone();
        emitter.once(Arc::new(move |_| {
            calls2.fetch_add(1, AOrdering::SeqCst);
        }));

        emitter.emit_and_sweep(1);
        emitter.emit_and_sweep(2);
        emitter.emit_and_sweep(3);

        assert_eq!(calls.load(AOrdering::SeqCst), 1);
        assert!(emitter.is_empty());
    }

    #[test]
    fn on_listener_fires_every_time() {
        let emitter: Emitter<ArcListener<i32>> = Emitter::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let calls2 = calls.clone();
        emitter.on(Arc::new(move |_| {
            calls2.fetch_add(1, AOrdering::SeqCst);
        }));

        emitter.emit_and_sweep(1);
        emitter.emit_and_sweep(2);

        assert_eq!(calls.load(AOrdering::SeqCst), 2);
        assert_eq!(emitter.len(), 1);
    }

    #[test]
    fn off_is_idempotent() {
        let emitter: Emitter<ArcListener<i32>> = Emitter::new();
        let id = emitter.on(Arc::new(|_| {}));

        emitter.off(id);
        emitter.off(id); // removing again must not panic or error

        assert!(emitter.is_empty());
    }

    #[test]
    fn registration_order_preserved() {
        let emitter: Emitter<ArcListener<i32>> = Emitter::new();
        let order = Arc::new(Mutex::new(Vec::new()));

        for i in 0..3 {
            let order = order.clone();
            emitter.on(Arc::new(move |_| order.lock().push(i)));
        }
        emitter.emit_and_sweep(1);

        assert_eq!(*order.lock(), vec![0, 1, 2]);
    }
}
