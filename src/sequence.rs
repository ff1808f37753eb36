//! Sequence affinity for the consumer's mutable state.
//!
//! A [`SequenceChecker`] starts detached and binds to the first thread that
//! checks it, so a consumer can be built on one thread and handed to the
//! blocking worker that runs it. Every check afterwards must come from that
//! same thread. A successful check yields a [`SequenceToken`], which the
//! packet builder demands before it touches in-flight packet state.

use std::marker::PhantomData;
use std::sync::OnceLock;
use std::thread::{self, ThreadId};

#[derive(Debug, Default)]
pub struct SequenceChecker {
    bound: OnceLock<ThreadId>,
}

/// Proof that the holder is running on the bound sequence. Not `Send`.
#[derive(Debug)]
pub struct SequenceToken<'a> {
    _checker: PhantomData<&'a SequenceChecker>,
    _not_send: PhantomData<*const ()>,
}

impl SequenceChecker {
    pub fn detached() -> Self {
        Self::default()
    }

    pub fn called_on_valid_sequence(&self) -> bool {
        let current = thread::current().id();
        *self.bound.get_or_init(|| current) == current
    }

    /// Checks the calling thread and hands out a token. Calling from the
    /// wrong thread is a programming error and trips a debug assertion.
    pub fn check(&self) -> SequenceToken<'_> {
        debug_assert!(
            self.called_on_valid_sequence(),
            "consumer state touched off its bound sequence"
        );
        SequenceToken {
            _checker: PhantomData,
            _not_send: PhantomData,
        }
    }

    pub fn detach(&mut self) {
        self.bound = OnceLock::new();
    }

    pub fn is_bound(&self) -> bool {
        self.bound.get().is_some()
    }
}
