use super::Shared;
use crate::{
    channel::{Channel, ReceiverIndex, ReceiverKey, ReceiverState},
    error::{PauseError, RemoveError, ResumeError},
};
use std::{any::type_name, fmt, marker::PhantomData, sync::Weak};
use tracing::{debug, trace};

/// Handle to one registered receiver of `T`
///
/// Returned by [Bus::receive](crate::Bus::receive). It is the only way to pause,
/// resume or remove that receiver, and can be used from inside any receiver,
/// including the one it refers to.
///
/// Dropping a subscription leaves its receiver registered.
/// A default subscription is unbound and every operation on it fails.
pub struct Subscription<T: 'static> {
    bus: Weak<Shared>,
    binding: Binding,
    _payload: PhantomData<fn(&T)>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Binding {
    Unbound,
    Bound(ReceiverKey),
    Removed,
}

impl<T: 'static> Subscription<T> {
    pub(crate) fn bound(bus: Weak<Shared>, key: ReceiverKey) -> Self {
        Self {
            bus,
            binding: Binding::Bound(key),
            _payload: PhantomData,
        }
    }

    /// Returns true while the subscription refers to a receiver
    pub fn is_valid(&self) -> bool {
        matches!(self.binding, Binding::Bound(_))
    }

    /// Returns the index of the receiver, if bound
    pub fn index(&self) -> Option<ReceiverIndex> {
        match self.binding {
            Binding::Bound(key) => Some(key.index()),
            _ => None,
        }
    }

    /// Returns the current state of the receiver, if it is still registered
    pub fn state(&self) -> Option<ReceiverState> {
        self.with_channel(|channel, key| channel.receiver_state(key))
            .flatten()
    }

    /// Stops invoking the receiver until [resume](Subscription::resume) is called
    ///
    /// A paused receiver keeps its position in the registration order.
    pub fn pause(&self) -> Result<(), PauseError> {
        let result = self
            .with_channel(Channel::pause)
            .unwrap_or(Err(PauseError::NotFound));
        if let Err(error) = &result {
            debug!(channel = type_name::<T>(), %error, "pause rejected");
        }
        result
    }

    /// Invokes the receiver again on subsequent sends
    pub fn resume(&self) -> Result<(), ResumeError> {
        let result = self
            .with_channel(Channel::resume)
            .unwrap_or(Err(ResumeError::NotFound));
        if let Err(error) = &result {
            debug!(channel = type_name::<T>(), %error, "resume rejected");
        }
        result
    }

    /// Unregisters the receiver and unbinds this subscription
    ///
    /// When called while the receiver is running, the current invocation
    /// completes and the receiver is dropped afterwards.
    pub fn remove(&mut self) -> Result<(), RemoveError> {
        let key = match self.binding {
            Binding::Bound(key) => key,
            Binding::Removed => return Err(RemoveError::AlreadyRemoved),
            Binding::Unbound => return Err(RemoveError::NotFound),
        };
        let entry = self
            .with_channel(|channel, key| channel.remove(key))
            .flatten();
        match entry {
            Some(entry) => {
                self.binding = Binding::Removed;
                trace!(
                    channel = type_name::<T>(),
                    index = %key.index(),
                    "receiver removed"
                );
                // dropped with no borrow of the bus held
                drop(entry);
                Ok(())
            }
            None => {
                debug!(channel = type_name::<T>(), index = %key.index(), "remove rejected");
                Err(RemoveError::NotFound)
            }
        }
    }

    fn with_channel<R>(&self, f: impl FnOnce(&mut Channel<T>, ReceiverKey) -> R) -> Option<R> {
        let key = match self.binding {
            Binding::Bound(key) => key,
            _ => return None,
        };
        let bus = self.bus.upgrade()?;
        bus.with_existing(|channel| f(channel, key))
    }
}

impl<T: 'static> Default for Subscription<T> {
    fn default() -> Self {
        Self {
            bus: Weak::new(),
            binding: Binding::Unbound,
            _payload: PhantomData,
        }
    }
}

impl<T: 'static> fmt::Debug for Subscription<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("channel", &type_name::<T>())
            .field("index", &self.index())
            .field("removed", &(self.binding == Binding::Removed))
            .finish()
    }
}
