//! Login redirect hook.
//!
//! When the session cannot be recovered the client has to send the user back
//! to the login screen. How that happens depends on the surface: the
//! dashboard answers with a redirect, the CLI prints a hint.

use std::sync::atomic::{AtomicUsize, Ordering};

/// Receives the "go to login" signal.
pub trait LoginRedirect: Send + Sync {
    fn redirect_to_login(&self);
}

/// Ignores the signal.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopRedirect;

impl LoginRedirect for NoopRedirect {
    fn redirect_to_login(&self) {}
}

/// Counts how often the signal fired so the caller can act on it after the
/// request completes.
#[derive(Debug, Default)]
pub struct RecordingRedirect {
    count: AtomicUsize,
}

impl RecordingRedirect {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn count(&self) -> usize {
        self.count.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn was_redirected(&self) -> bool {
        self.count() > 0
    }
}

impl LoginRedirect for RecordingRedirect {
    fn redirect_to_login(&self) {
        self.count.fetch_add(1, Ordering::SeqCst);
    }
}
