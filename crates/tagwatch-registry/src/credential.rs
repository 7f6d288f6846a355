//! Single-flight credential memoization.
//!
//! A [`CredentialCache`] runs its acquisition function at most once for its
//! whole lifetime. Callers that arrive while the acquisition is in flight
//! wait for it and receive the same outcome; later callers get the stored
//! outcome immediately. Each registry client owns one cache, so a token is
//! acquired at most once per registry group per poll cycle.
//!
//! The outcome is memoized whether it is a token or an error. There is no
//! expiry: the owning client is rebuilt every cycle, and an expired token
//! shows up as a manifest fetch failure rather than a refresh.

use std::future::Future;
use tokio::sync::OnceCell;

/// Compute-once cell shared by concurrent waiters.
pub struct CredentialCache<T, E> {
    cell: OnceCell<Result<T, E>>,
}

impl<T, E> Default for CredentialCache<T, E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T, E> CredentialCache<T, E> {
    /// Creates an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self {
            cell: OnceCell::new(),
        }
    }

    /// Returns true once an acquisition has completed (successfully or not).
    #[must_use]
    pub fn is_resolved(&self) -> bool {
        self.cell.initialized()
    }
}

impl<T: Clone, E: Clone> CredentialCache<T, E> {
    /// Returns the cached value, acquiring it with `acquire` on first use.
    ///
    /// If the acquiring caller is cancelled before `acquire` finishes, the
    /// next waiter runs its own `acquire` instead.
    ///
    /// # Errors
    ///
    /// Returns the error produced by the single acquisition.
    pub async fn get_or_acquire<F, Fut>(&self, acquire: F) -> Result<T, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        self.cell.get_or_init(acquire).await.clone()
    }

    /// Returns the cached outcome without acquiring.
    #[must_use]
    pub fn peek(&self) -> Option<Result<T, E>> {
        self.cell.get().cloned()
    }
}

impl<T, E> std::fmt::Debug for CredentialCache<T, E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = match self.cell.get() {
            None => "empty",
            Some(Ok(_)) => "acquired",
            Some(Err(_)) => "failed",
        };
        f.debug_struct("CredentialCache")
            .field("state", &state)
            .finish()
    }
}
