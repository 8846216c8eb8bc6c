//! Errors reported by the bus
//!
//! Every error is a misuse of a channel or subscription state machine.
//! An operation that fails has no effect.

use std::{any::type_name, fmt};
use thiserror::Error;

/// This enumeration is the list of the possible error outcomes for
/// [send](crate::Bus::send)
///
/// The payload that could not be sent is handed back.
#[non_exhaustive]
pub enum SendError<T> {
    /// A send on the same channel is already in progress
    Reentrant(T),
}

impl<T> SendError<T> {
    /// Returns the payload that was not sent
    pub fn into_inner(self) -> T {
        match self {
            SendError::Reentrant(payload) => payload,
        }
    }
}

impl<T> fmt::Debug for SendError<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SendError::Reentrant(_) => write!(f, "SendError in {}: Reentrant", type_name::<T>()),
        }
    }
}

impl<T> fmt::Display for SendError<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SendError::Reentrant(_) => write!(
                f,
                "channel `{}` is already dispatching, reentrant send rejected",
                type_name::<T>()
            ),
        }
    }
}

impl<T> std::error::Error for SendError<T> {}

/// Error of [interrupt](crate::Bus::interrupt)
#[non_exhaustive]
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum InterruptError {
    /// The channel is not dispatching, or was already interrupted
    #[error("channel is not dispatching")]
    NotDispatching,
}

/// Error of [Subscription::pause](crate::Subscription::pause)
#[non_exhaustive]
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum PauseError {
    /// The subscription is unbound or its receiver is gone
    #[error("receiver not found")]
    NotFound,
    /// The receiver is already paused
    #[error("receiver is already paused")]
    AlreadyPaused,
}

/// Error of [Subscription::resume](crate::Subscription::resume)
#[non_exhaustive]
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum ResumeError {
    /// The subscription is unbound or its receiver is gone
    #[error("receiver not found")]
    NotFound,
    /// The receiver is already active
    #[error("receiver is already active")]
    AlreadyActive,
}

/// Error of [Subscription::remove](crate::Subscription::remove)
#[non_exhaustive]
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum RemoveError {
    /// The subscription was never bound, or its bus is gone
    #[error("receiver not found")]
    NotFound,
    /// The receiver was already removed through this subscription
    #[error("receiver is already removed")]
    AlreadyRemoved,
}

#[cfg(test)]
mod test {
    use super::*;

    struct Opaque;

    #[test]
    fn send_error_does_not_need_debug_payload() {
        let error = SendError::Reentrant(Opaque);
        let debug = format!("{:?}", error);
        assert!(debug.starts_with("SendError in "));
        assert!(debug.ends_with("Opaque: Reentrant"));
        assert!(error.to_string().contains("reentrant send rejected"));
        let Opaque = error.into_inner();
    }
}
