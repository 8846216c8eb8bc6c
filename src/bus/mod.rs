//! # Bus
//!
//! [`Bus`] owns one channel per payload type. Channels are created on first use
//! and live as long as the bus.

use crate::{
    channel::{BoxedReceiver, Channel, DispatchState, Receiver, ReceiverKey, Step},
    common::{Lazy, TypeMap},
    error::{InterruptError, SendError},
};
use parking_lot::ReentrantMutex;
use std::{any::type_name, cell::RefCell, fmt, marker::PhantomData, sync::Arc};
use tracing::{debug, trace, warn};

mod subscription;


pub use subscription::*;

static GLOBAL: Lazy<Bus> = Lazy::new(Bus::new);

/// State shared by a bus and its subscriptions.
/// The dispatching thread re-enters the lock from receivers, other threads wait.
pub(crate) struct Shared {
    channels: ReentrantMutex<RefCell<TypeMap>>,
    receiver_capacity: usize,
}

impl Shared {
    /// Runs `f` on the channel of `T` if it was already created
    pub(crate) fn with_existing<T: 'static, R>(
        &self,
        f: impl FnOnce(&mut Channel<T>) -> R,
    ) -> Option<R> {
        let channels = self.channels.lock();
        let mut channels = channels.borrow_mut();
        channels.get_mut::<Channel<T>>().map(f)
    }
}

/// Runs `f` on the channel of `T`, creating the channel when needed.
/// The borrow is released before returning, so `f` must not call out to receivers.
fn with_channel<T: 'static, R>(
    channels: &RefCell<TypeMap>,
    capacity: usize,
    f: impl FnOnce(&mut Channel<T>) -> R,
) -> R {
    let mut channels = channels.borrow_mut();
    f(channels.get_or_insert_with(|| Channel::<T>::with_capacity(capacity)))
}

/// Synchronous event bus
///
/// Each payload type `T` addresses its own channel. Sending a `T` invokes every
/// active receiver of `T` in registration order, on the calling thread.
///
/// Cloning a bus gives another handle to the same channels.
///
/// ```rust
/// use std::sync::{
///     atomic::{AtomicU32, Ordering},
///     Arc,
/// };
/// use typebus::Bus;
///
/// struct Damage(u32);
///
/// let bus = Bus::new();
/// let total = Arc::new(AtomicU32::new(0));
/// let counter = total.clone();
/// let mut subscription = bus.receive(move |event: &Damage| {
///     counter.fetch_add(event.0, Ordering::SeqCst);
/// });
///
/// bus.send(Damage(3)).unwrap();
/// subscription.pause().unwrap();
/// bus.send(Damage(5)).unwrap();
/// subscription.resume().unwrap();
/// bus.send(Damage(7)).unwrap();
/// subscription.remove().unwrap();
/// bus.send(Damage(11)).unwrap();
///
/// assert_eq!(total.load(Ordering::SeqCst), 10);
/// ```
#[derive(Clone)]
pub struct Bus {
    shared: Arc<Shared>,
}

impl Bus {
    /// Creates an empty bus
    pub fn new() -> Self {
        Self::with_capacity(0)
    }

    /// Creates an empty bus whose channels preallocate room for `receivers` receivers
    pub fn with_capacity(receivers: usize) -> Self {
        Self {
            shared: Arc::new(Shared {
                channels: ReentrantMutex::new(RefCell::new(TypeMap::new())),
                receiver_capacity: receivers,
            }),
        }
    }

    /// Sends a payload to every active receiver of `T`
    ///
    /// Receivers run in registration order. Receivers registered while the
    /// send is running are first invoked by the next send; receivers paused or
    /// removed while it is running are not invoked once reached.
    ///
    /// Fails and hands the payload back when called from a receiver of the
    /// same channel.
    ///
    /// If a receiver panics, the channel returns to idle, the panicking receiver
    /// is removed and the panic is propagated.
    pub fn send<T: 'static>(&self, event: T) -> Result<(), SendError<T>> {
        let channels = self.shared.channels.lock();
        let capacity = self.shared.receiver_capacity;
        let keys = match with_channel(&channels, capacity, Channel::<T>::begin_dispatch) {
            Some(keys) => keys,
            None => {
                debug!(channel = type_name::<T>(), "reentrant send rejected");
                return Err(SendError::Reentrant(event));
            }
        };
        trace!(
            channel = type_name::<T>(),
            receivers = keys.len(),
            "dispatch started"
        );

        let mut dispatch = Dispatch::<T> {
            channels: &channels,
            capacity,
            in_flight: None,
            _payload: PhantomData,
        };
        for key in keys {
            let mut receiver = match dispatch.with_channel(|channel| channel.next_step(key)) {
                Step::Invoke(receiver) => receiver,
                Step::Skip => continue,
                Step::Stop => {
                    debug!(channel = type_name::<T>(), "dispatch interrupted");
                    break;
                }
            };
            dispatch.in_flight = Some(key);
            receiver.receive(&event);
            dispatch.in_flight = None;
            let removed = dispatch.with_channel(|channel| channel.finish_step(key, receiver));
            drop(removed);
        }
        Ok(())
    }

    /// Builds a payload from `args` and sends it
    ///
    /// The conversion is explicit: `T` must implement `From<A>`.
    pub fn send_from<T: 'static, A: Into<T>>(&self, args: A) -> Result<(), SendError<T>> {
        self.send(args.into())
    }

    /// Registers a closure as an active receiver of `T`
    pub fn receive<T, F>(&self, receiver: F) -> Subscription<T>
    where
        T: 'static,
        F: FnMut(&T) + Send + 'static,
    {
        self.register::<T>(Box::new(receiver))
    }

    /// Registers a [Receiver] implementation as an active receiver of `T`
    pub fn receive_with<T, R>(&self, receiver: R) -> Subscription<T>
    where
        T: 'static,
        R: Receiver<T> + Send,
    {
        self.register::<T>(Box::new(receiver))
    }

    /// Stops the running send of `T` before its next receiver
    ///
    /// The receiver that is currently running is not aborted.
    pub fn interrupt<T: 'static>(&self) -> Result<(), InterruptError> {
        let result = self
            .shared
            .with_existing(Channel::<T>::interrupt)
            .unwrap_or(Err(InterruptError::NotDispatching));
        if let Err(error) = &result {
            debug!(channel = type_name::<T>(), %error, "interrupt rejected");
        }
        result
    }

    /// Returns the dispatch state of the channel of `T`
    pub fn dispatch_state<T: 'static>(&self) -> DispatchState {
        self.shared
            .with_existing(|channel: &mut Channel<T>| channel.state())
            .unwrap_or_default()
    }

    /// Returns the number of registered receivers of `T`, paused ones included
    pub fn receiver_count<T: 'static>(&self) -> usize {
        self.shared
            .with_existing(|channel: &mut Channel<T>| channel.len())
            .unwrap_or(0)
    }

    fn register<T: 'static>(&self, receiver: BoxedReceiver<T>) -> Subscription<T> {
        let channels = self.shared.channels.lock();
        let key = with_channel(&channels, self.shared.receiver_capacity, |channel| {
            channel.insert(receiver)
        });
        trace!(
            channel = type_name::<T>(),
            index = %key.index(),
            "receiver registered"
        );
        Subscription::bound(Arc::downgrade(&self.shared), key)
    }
}

impl Default for Bus {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Bus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let channels = self.shared.channels.lock();
        let channels = channels.try_borrow().map(|channels| channels.len()).ok();
        f.debug_struct("Bus").field("channels", &channels).finish()
    }
}

/// One running send. Dropping it, also while unwinding, returns the channel to idle.
struct Dispatch<'a, T: 'static> {
    channels: &'a RefCell<TypeMap>,
    capacity: usize,
    in_flight: Option<ReceiverKey>,
    _payload: PhantomData<fn(&T)>,
}

impl<T: 'static> Dispatch<'_, T> {
    fn with_channel<R>(&self, f: impl FnOnce(&mut Channel<T>) -> R) -> R {
        with_channel(self.channels, self.capacity, f)
    }
}

impl<T: 'static> Drop for Dispatch<'_, T> {
    fn drop(&mut self) {
        let in_flight = self.in_flight.take();
        let mut channels = match self.channels.try_borrow_mut() {
            Ok(channels) => channels,
            Err(_) => return,
        };
        let channel = match channels.get_mut::<Channel<T>>() {
            Some(channel) => channel,
            None => return,
        };
        channel.finish_dispatch();
        let panicked = in_flight.and_then(|key| channel.remove(key));
        drop(channels);

        if let (Some(key), Some(entry)) = (in_flight, panicked) {
            warn!(
                channel = type_name::<T>(),
                index = %key.index(),
                "receiver panicked and was removed"
            );
            drop(entry);
        } else {
            trace!(channel = type_name::<T>(), "dispatch finished");
        }
    }
}

/// Returns the process-wide default bus
///
/// It is created on first use and never dropped.
pub fn global() -> &'static Bus {
    &GLOBAL
}

/// Sends a payload on the [global] bus, see [Bus::send]
pub fn send<T: 'static>(event: T) -> Result<(), SendError<T>> {
    global().send(event)
}

/// Builds a payload and sends it on the [global] bus, see [Bus::send_from]
pub fn send_from<T: 'static, A: Into<T>>(args: A) -> Result<(), SendError<T>> {
    global().send_from(args)
}

/// Registers a closure on the [global] bus, see [Bus::receive]
pub fn receive<T, F>(receiver: F) -> Subscription<T>
where
    T: 'static,
    F: FnMut(&T) + Send + 'static,
{
    global().receive(receiver)
}

/// Registers a [Receiver] on the [global] bus, see [Bus::receive_with]
pub fn receive_with<T, R>(receiver: R) -> Subscription<T>
where
    T: 'static,
    R: Receiver<T> + Send,
{
    global().receive_with(receiver)
}

/// Interrupts the running send of `T` on the [global] bus, see [Bus::interrupt]
pub fn interrupt<T: 'static>() -> Result<(), InterruptError> {
    global().interrupt::<T>()
}
