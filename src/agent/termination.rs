//! Termination policies
//!
//! A termination policy is consulted before every turn of the conversation
//! loop. When it says stop, the loop exits without calling the provider.

use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::config::DEFAULT_MAX_MESSAGES;
use crate::session::Message;

/// Default lifetime of a [`Timeout`] policy.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// Predicate deciding whether another turn may begin.
///
/// Implementations must not change their answer for the same history
/// between calls except through the passage of time.
pub trait TerminationPolicy: Send + Sync {
    fn should_continue(&self, history: &[Message]) -> bool;
}

impl<T: TerminationPolicy + ?Sized> TerminationPolicy for Arc<T> {
    fn should_continue(&self, history: &[Message]) -> bool {
        (**self).should_continue(history)
    }
}

impl<T: TerminationPolicy + ?Sized> TerminationPolicy for Box<T> {
    fn should_continue(&self, history: &[Message]) -> bool {
        (**self).should_continue(history)
    }
}

/// Continue while the history holds fewer than `n` messages.
///
/// Every message counts, including the injected system message and any prior
/// conversation supplied by the caller.
///
/// # Example
/// ```
/// use parley::agent::{MaxMessages, TerminationPolicy};
/// use parley::session::Message;
///
/// let policy = MaxMessages::new(2);
/// assert!(policy.should_continue(&[Message::user("hi")]));
/// assert!(!policy.should_continue(&[Message::user("hi"), Message::assistant("hello")]));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MaxMessages(pub usize);

impl MaxMessages {
    pub fn new(limit: usize) -> Self {
        Self(limit)
    }

    pub fn limit(&self) -> usize {
        self.0
    }
}

impl Default for MaxMessages {
    fn default() -> Self {
        Self(DEFAULT_MAX_MESSAGES)
    }
}

impl TerminationPolicy for MaxMessages {
    fn should_continue(&self, history: &[Message]) -> bool {
        history.len() < self.0
    }
}

/// Continue until a fixed deadline passes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timeout {
    deadline: Instant,
}

impl Timeout {
    /// Deadline `after` from now.
    pub fn new(after: Duration) -> Self {
        Self {
            deadline: Instant::now() + after,
        }
    }

    /// Explicit deadline.
    pub fn at(deadline: Instant) -> Self {
        Self { deadline }
    }

    pub fn deadline(&self) -> Instant {
        self.deadline
    }
}

impl Default for Timeout {
    fn default() -> Self {
        Self::new(DEFAULT_TIMEOUT)
    }
}

impl TerminationPolicy for Timeout {
    fn should_continue(&self, _history: &[Message]) -> bool {
        Instant::now() < self.deadline
    }
}
