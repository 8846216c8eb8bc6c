//! # Channels
//!
//! A channel is the receiver registry and dispatch state of one payload type.

mod registry;

pub use self::registry::{ReceiverIndex, ReceiverState};
pub(crate) use self::registry::{Entry, ReceiverKey};

use self::registry::Registry;
use crate::error::{InterruptError, PauseError, ResumeError};

/// A receiver of payloads of type `T`
///
/// Implemented for every `FnMut(&T)`, so closures and plain functions can be
/// registered directly. Implement it by hand for handler objects.
///
/// ```rust
/// use typebus::{Bus, Receiver};
///
/// struct Tick(u32);
///
/// struct Counter {
///     total: u32,
/// }
///
/// impl Receiver<Tick> for Counter {
///     fn receive(&mut self, event: &Tick) {
///         self.total += event.0;
///     }
/// }
///
/// let bus = Bus::new();
/// let subscription = bus.receive_with::<Tick, _>(Counter { total: 0 });
/// bus.send(Tick(1)).unwrap();
/// assert!(subscription.is_valid());
/// ```
pub trait Receiver<T>: 'static {
    /// Handles one payload
    fn receive(&mut self, event: &T);
}

impl<T, F> Receiver<T> for F
where
    F: FnMut(&T) + 'static,
{
    fn receive(&mut self, event: &T) {
        self(event)
    }
}

pub(crate) type BoxedReceiver<T> = Box<dyn Receiver<T> + Send>;

/// Dispatch state of a channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum DispatchState {
    /// No send is in progress
    #[default]
    Idle,
    /// A send is walking the receivers
    Dispatching,
    /// The running send was interrupted and stops before the next receiver
    Interrupted,
}

/// What a dispatch does with the next snapshotted key
pub(crate) enum Step<T> {
    Invoke(BoxedReceiver<T>),
    Skip,
    Stop,
}

pub(crate) struct Channel<T> {
    state: DispatchState,
    registry: Registry<T>,
}

impl<T> Channel<T> {
    pub(crate) fn with_capacity(capacity: usize) -> Self {
        Self {
            state: DispatchState::Idle,
            registry: Registry::with_capacity(capacity),
        }
    }

    pub(crate) fn state(&self) -> DispatchState {
        self.state
    }

    pub(crate) fn len(&self) -> usize {
        self.registry.len()
    }

    pub(crate) fn insert(&mut self, receiver: BoxedReceiver<T>) -> ReceiverKey {
        self.registry.insert(receiver)
    }

    pub(crate) fn remove(&mut self, key: ReceiverKey) -> Option<Entry<T>> {
        self.registry.remove(key)
    }

    pub(crate) fn receiver_state(&self, key: ReceiverKey) -> Option<ReceiverState> {
        self.registry.get(key).map(Entry::state)
    }

    pub(crate) fn pause(&mut self, key: ReceiverKey) -> Result<(), PauseError> {
        let entry = self.registry.get_mut(key).ok_or(PauseError::NotFound)?;
        match entry.state() {
            ReceiverState::Active => {
                entry.set_state(ReceiverState::Paused);
                Ok(())
            }
            ReceiverState::Paused => Err(PauseError::AlreadyPaused),
        }
    }

    pub(crate) fn resume(&mut self, key: ReceiverKey) -> Result<(), ResumeError> {
        let entry = self.registry.get_mut(key).ok_or(ResumeError::NotFound)?;
        match entry.state() {
            ReceiverState::Paused => {
                entry.set_state(ReceiverState::Active);
                Ok(())
            }
            ReceiverState::Active => Err(ResumeError::AlreadyActive),
        }
    }

    /// Enters `Dispatching` and snapshots the keys to visit.
    /// Returns `None` when a dispatch is already running.
    pub(crate) fn begin_dispatch(&mut self) -> Option<Vec<ReceiverKey>> {
        if self.state != DispatchState::Idle {
            return None;
        }
        self.state = DispatchState::Dispatching;
        Some(self.registry.keys().to_vec())
    }

    pub(crate) fn next_step(&mut self, key: ReceiverKey) -> Step<T> {
        if self.state != DispatchState::Dispatching {
            return Step::Stop;
        }
        match self.registry.take_active(key) {
            Some(receiver) => Step::Invoke(receiver),
            None => Step::Skip,
        }
    }

    pub(crate) fn finish_step(
        &mut self,
        key: ReceiverKey,
        receiver: BoxedReceiver<T>,
    ) -> Option<BoxedReceiver<T>> {
        self.registry.restore(key, receiver)
    }

    pub(crate) fn finish_dispatch(&mut self) {
        self.state = DispatchState::Idle;
    }

    pub(crate) fn interrupt(&mut self) -> Result<(), InterruptError> {
        if self.state != DispatchState::Dispatching {
            return Err(InterruptError::NotDispatching);
        }
        self.state = DispatchState::Interrupted;
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn channel_with(receivers: usize) -> (Channel<()>, Vec<ReceiverKey>) {
        let mut channel = Channel::with_capacity(receivers);
        let keys = (0..receivers)
            .map(|_| channel.insert(Box::new(|_: &()| {})))
            .collect();
        (channel, keys)
    }

    #[test]
    fn dispatch_cannot_begin_twice() {
        let (mut channel, keys) = channel_with(2);
        assert_eq!(channel.begin_dispatch(), Some(keys));
        assert_eq!(channel.state(), DispatchState::Dispatching);
        assert_eq!(channel.begin_dispatch(), None);
        assert_eq!(channel.state(), DispatchState::Dispatching);

        channel.finish_dispatch();
        assert_eq!(channel.state(), DispatchState::Idle);
        assert!(channel.begin_dispatch().is_some());
    }

    #[test]
    fn interrupt_only_while_dispatching() {
        let (mut channel, keys) = channel_with(2);
        assert_eq!(channel.interrupt(), Err(InterruptError::NotDispatching));
        assert_eq!(channel.state(), DispatchState::Idle);

        channel.begin_dispatch();
        assert!(matches!(channel.next_step(keys[0]), Step::Invoke(_)));
        assert_eq!(channel.interrupt(), Ok(()));
        assert_eq!(channel.state(), DispatchState::Interrupted);
        assert_eq!(channel.interrupt(), Err(InterruptError::NotDispatching));
        assert!(matches!(channel.next_step(keys[1]), Step::Stop));

        channel.finish_dispatch();
        assert_eq!(channel.state(), DispatchState::Idle);
    }

    #[test]
    fn paused_and_removed_entries_are_skipped() {
        let (mut channel, keys) = channel_with(3);
        channel.pause(keys[0]).unwrap();
        let removed = channel.remove(keys[1]);
        assert!(removed.is_some());

        channel.begin_dispatch();
        assert!(matches!(channel.next_step(keys[0]), Step::Skip));
        assert!(matches!(channel.next_step(keys[1]), Step::Skip));
        assert!(matches!(channel.next_step(keys[2]), Step::Invoke(_)));
    }

    #[test]
    fn pause_and_resume_toggle_state() {
        let (mut channel, keys) = channel_with(1);
        let key = keys[0];
        assert_eq!(channel.resume(key), Err(ResumeError::AlreadyActive));
        assert_eq!(channel.pause(key), Ok(()));
        assert_eq!(channel.receiver_state(key), Some(ReceiverState::Paused));
        assert_eq!(channel.pause(key), Err(PauseError::AlreadyPaused));
        assert_eq!(channel.resume(key), Ok(()));
        assert_eq!(channel.receiver_state(key), Some(ReceiverState::Active));

        let _ = channel.remove(key);
        assert_eq!(channel.pause(key), Err(PauseError::NotFound));
        assert_eq!(channel.resume(key), Err(ResumeError::NotFound));
        assert_eq!(channel.receiver_state(key), None);
    }
}
