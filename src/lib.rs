#![warn(missing_docs)]
#![warn(clippy::missing_safety_doc)]
#![warn(clippy::missing_panics_doc)]

//! Synchronous in-process event bus
//!
//! Every payload type has its own channel: sending a `T` reaches the receivers
//! registered for `T` and nothing else. Receivers run on the sending thread,
//! in registration order, and can be paused, resumed or removed through the
//! [Subscription] returned when they are registered.
//!
//! ```rust
//! use std::sync::{Arc, Mutex};
//! use typebus::Bus;
//!
//! struct Update {
//!     delta: f32,
//! }
//!
//! let bus = Bus::new();
//! let seen = Arc::new(Mutex::new(Vec::new()));
//!
//! let log = seen.clone();
//! bus.receive(move |event: &Update| log.lock().unwrap().push(event.delta));
//! let log = seen.clone();
//! let bus_inner = bus.clone();
//! bus.receive(move |event: &Update| {
//!     log.lock().unwrap().push(event.delta * 10.0);
//!     // the rest of the receivers of `Update` are skipped
//!     bus_inner.interrupt::<Update>().unwrap();
//! });
//! let log = seen.clone();
//! bus.receive(move |event: &Update| log.lock().unwrap().push(-event.delta));
//!
//! bus.send(Update { delta: 0.5 }).unwrap();
//! assert_eq!(*seen.lock().unwrap(), [0.5, 5.0]);
//! ```

#[macro_use]
mod common;

mod bus;
pub mod channel;
pub mod error;

pub use bus::{global, interrupt, receive, receive_with, send, send_from, Bus, Subscription};
pub use channel::{DispatchState, Receiver, ReceiverIndex, ReceiverState};
pub use error::{InterruptError, PauseError, RemoveError, ResumeError, SendError};

#[doc(hidden)]
pub use doc_comment::doc_comment as __doc_comment;

/// Declare payload types bound to the [global] bus
///
/// Every declared struct gets associated `send`, `receive` and `interrupt`
/// functions that forward to the global bus.
///
/// ## Syntax
///
/// `<visibility>? struct <name>;` \
/// `<visibility>? struct <name> { <fields> }`
///
///
/// ## Example
///
/// ```rust
/// typebus::declare! {
///     /// Frame started
///     #[derive(Debug, Clone)]
///     pub struct Update {
///         pub delta: f32,
///     }
///
///     /// Frame must be drawn
///     pub(crate) struct Draw;
/// }
///
/// let mut subscription = Update::receive(|event| assert_eq!(event.delta, 0.5));
/// Update { delta: 0.5 }.send().unwrap();
/// assert!(Draw::interrupt().is_err());
/// subscription.remove().unwrap();
/// ```
#[macro_export]
macro_rules! declare {
    () => {};

    (@impl $v:vis $name:ident) => {
        impl $name {
            $crate::__doc_comment! {
                concat!("Sends this ", stringify!($name), " on the global bus"),
                #[allow(dead_code)]
                $v fn send(self) -> Result<(), $crate::SendError<$name>> {
                    $crate::send(self)
                }
            }

            $crate::__doc_comment! {
                concat!("Registers a receiver of ", stringify!($name), " on the global bus"),
                #[allow(dead_code)]
                $v fn receive<F>(receiver: F) -> $crate::Subscription<$name>
                where
                    F: FnMut(&$name) + Send + 'static,
                {
                    $crate::receive(receiver)
                }
            }

            $crate::__doc_comment! {
                concat!("Interrupts the running send of ", stringify!($name), " on the global bus"),
                #[allow(dead_code)]
                $v fn interrupt() -> Result<(), $crate::InterruptError> {
                    $crate::interrupt::<$name>()
                }
            }
        }
    };

    (
        $(#[$attr:meta])*
        $v:vis struct $name:ident;
        $($next:tt)*
    ) => {
        $(#[$attr])*
        $v struct $name;

        $crate::declare!(@impl $v $name);
        $crate::declare!($($next)*);
    };

    (
        $(#[$attr:meta])*
        $v:vis struct $name:ident { $($fields:tt)* }
        $($next:tt)*
    ) => {
        $(#[$attr])*
        $v struct $name { $($fields)* }

        $crate::declare!(@impl $v $name);
        $crate::declare!($($next)*);
    };
}
