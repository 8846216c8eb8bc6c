use super::BoxedReceiver;
use std::{fmt, num::NonZeroU64};

/// Index of a receiver inside its channel
///
/// Indices start at 1, grow monotonically and are never reused,
/// even after the receiver is removed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ReceiverIndex(NonZeroU64);

impl ReceiverIndex {
    const FIRST: Self = match NonZeroU64::new(1) {
        Some(index) => Self(index),
        None => unreachable!(),
    };

    /// Returns the numeric value of this index
    pub fn get(self) -> u64 {
        self.0.get()
    }

    fn next(self) -> Self {
        Self(self.0.saturating_add(1))
    }
}

impl fmt::Display for ReceiverIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

/// State of a registered receiver
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReceiverState {
    /// The receiver is invoked by every send
    Active,
    /// The receiver is skipped until resumed
    Paused,
}

/// Arena position plus the index that must still live there.
/// A vacated and reused slot holds a different index, so stale keys never resolve.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct ReceiverKey {
    slot: usize,
    index: ReceiverIndex,
}

impl ReceiverKey {
    pub(crate) fn index(self) -> ReceiverIndex {
        self.index
    }
}

pub(crate) struct Entry<T> {
    index: ReceiverIndex,
    state: ReceiverState,
    // `None` while the receiver is running
    receiver: Option<BoxedReceiver<T>>,
}

impl<T> Entry<T> {
    pub(crate) fn state(&self) -> ReceiverState {
        self.state
    }

    pub(crate) fn set_state(&mut self, state: ReceiverState) {
        self.state = state;
    }
}

pub(crate) struct Registry<T> {
    slots: Vec<Option<Entry<T>>>,
    vacant: Vec<usize>,
    order: Vec<ReceiverKey>,
    next_index: ReceiverIndex,
}

impl<T> Registry<T> {
    pub(crate) fn with_capacity(capacity: usize) -> Self {
        Self {
            slots: Vec::with_capacity(capacity),
            vacant: Vec::new(),
            order: Vec::with_capacity(capacity),
            next_index: ReceiverIndex::FIRST,
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.order.len()
    }

    /// Keys of all entries in registration order
    pub(crate) fn keys(&self) -> &[ReceiverKey] {
        &self.order
    }

    pub(crate) fn insert(&mut self, receiver: BoxedReceiver<T>) -> ReceiverKey {
        let index = self.next_index;
        self.next_index = index.next();
        let entry = Entry {
            index,
            state: ReceiverState::Active,
            receiver: Some(receiver),
        };
        let slot = match self.vacant.pop() {
            Some(slot) => {
                self.slots[slot] = Some(entry);
                slot
            }
            None => {
                self.slots.push(Some(entry));
                self.slots.len() - 1
            }
        };
        let key = ReceiverKey { slot, index };
        self.order.push(key);
        key
    }

    pub(crate) fn get(&self, key: ReceiverKey) -> Option<&Entry<T>> {
        self.slots
            .get(key.slot)?
            .as_ref()
            .filter(|entry| entry.index == key.index)
    }

    pub(crate) fn get_mut(&mut self, key: ReceiverKey) -> Option<&mut Entry<T>> {
        self.slots
            .get_mut(key.slot)?
            .as_mut()
            .filter(|entry| entry.index == key.index)
    }

    pub(crate) fn remove(&mut self, key: ReceiverKey) -> Option<Entry<T>> {
        self.get(key)?;
        let entry = self.slots[key.slot].take();
        self.vacant.push(key.slot);
        self.order.retain(|k| *k != key);
        entry
    }

    /// Moves the receiver out of an active entry so it can run without borrowing the registry
    pub(crate) fn take_active(&mut self, key: ReceiverKey) -> Option<BoxedReceiver<T>> {
        match self.get_mut(key) {
            Some(entry) if entry.state == ReceiverState::Active => entry.receiver.take(),
            _ => None,
        }
    }

    /// Puts a receiver back after it ran.
    /// Hands it back to the caller when its entry was removed meanwhile.
    pub(crate) fn restore(
        &mut self,
        key: ReceiverKey,
        receiver: BoxedReceiver<T>,
    ) -> Option<BoxedReceiver<T>> {
        match self.get_mut(key) {
            Some(entry) => {
                entry.receiver = Some(receiver);
                None
            }
            None => Some(receiver),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn noop() -> BoxedReceiver<i32> {
        Box::new(|_: &i32| {})
    }

    #[test]
    fn indices_start_at_one_and_keep_order() {
        let mut registry = Registry::with_capacity(0);
        let a = registry.insert(noop());
        let b = registry.insert(noop());
        let c = registry.insert(noop());

        assert_eq!(a.index().get(), 1);
        assert_eq!(b.index().get(), 2);
        assert_eq!(c.index().get(), 3);
        assert_eq!(registry.keys(), &[a, b, c]);
        assert_eq!(registry.len(), 3);
    }

    #[test]
    fn reused_slot_does_not_resolve_stale_key() {
        let mut registry = Registry::with_capacity(4);
        let a = registry.insert(noop());
        let b = registry.insert(noop());

        assert!(registry.remove(a).is_some());
        assert!(registry.remove(a).is_none());

        let c = registry.insert(noop());
        assert_eq!(c.slot, a.slot);
        assert_eq!(c.index().get(), 3);
        assert!(registry.get(a).is_none());
        assert!(registry.get(c).is_some());
        assert_eq!(registry.keys(), &[b, c]);
    }

    #[test]
    fn only_active_receivers_are_taken() {
        let mut registry = Registry::with_capacity(0);
        let a = registry.insert(noop());

        registry.get_mut(a).unwrap().set_state(ReceiverState::Paused);
        assert!(registry.take_active(a).is_none());

        registry.get_mut(a).unwrap().set_state(ReceiverState::Active);
        let receiver = registry.take_active(a).unwrap();
        // already running
        assert!(registry.take_active(a).is_none());
        assert!(registry.restore(a, receiver).is_none());
        assert!(registry.take_active(a).is_some());
    }

    #[test]
    fn restore_after_remove_returns_receiver() {
        let mut registry = Registry::with_capacity(0);
        let a = registry.insert(noop());
        let receiver = registry.take_active(a).unwrap();

        let removed = registry.remove(a).unwrap();
        assert_eq!(removed.state(), ReceiverState::Active);
        assert!(registry.restore(a, receiver).is_some());
        assert_eq!(registry.len(), 0);
    }
}
