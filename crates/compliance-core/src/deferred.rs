//! Deferred values
//!
//! A [`Deferred`] is a value that is still being fetched when the loader
//! returns. It is cloneable and every clone observes the same outcome, so
//! the same fetch can be handed to the page and to the menu reconciler.

use crate::error::FetchError;
use futures::future::{BoxFuture, FutureExt, Shared};
use std::fmt;
use std::future::Future;
use std::time::Duration;

/// Outcome of a deferred fetch
pub type FetchResult<T> = Result<T, FetchError>;

/// Shared handle to a value resolving in the background
#[derive(Clone)]
pub struct Deferred<T>
where
    T: Clone + Send + Sync + 'static,
{
    inner: Shared<BoxFuture<'static, FetchResult<T>>>,
}

impl<T> Deferred<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// Already resolved value
    #[must_use]
    pub fn ready(value: T) -> Self {
        Self::lazy(futures::future::ready(Ok(value)))
    }

    /// Already failed value
    #[must_use]
    pub fn failed(error: FetchError) -> Self {
        Self::lazy(futures::future::ready(Err(error)))
    }

    /// Start `future` on the runtime now
    ///
    /// The work proceeds whether or not anyone awaits the handle. A panicking
    /// or aborted task resolves to [`FetchError::Cancelled`].
    ///
    /// Must be called from within a tokio runtime.
    #[must_use]
    pub fn spawn<F>(future: F) -> Self
    where
        F: Future<Output = FetchResult<T>> + Send + 'static,
    {
        let handle = tokio::spawn(future);
        Self::lazy(async move { handle.await.unwrap_or(Err(FetchError::Cancelled)) })
    }

    /// Wrap `future` without starting it; it runs when first awaited
    #[must_use]
    pub fn lazy<F>(future: F) -> Self
    where
        F: Future<Output = FetchResult<T>> + Send + 'static,
    {
        Self {
            inner: future.boxed().shared(),
        }
    }

    /// Wait for the outcome
    pub async fn resolve(&self) -> FetchResult<T> {
        self.inner.clone().await
    }

    /// Outcome if already resolved and observed by some clone
    #[must_use]
    pub fn peek(&self) -> Option<&FetchResult<T>> {
        self.inner.peek()
    }

    /// Both handles observe the same underlying fetch
    #[must_use]
    pub fn same_fetch(&self, other: &Self) -> bool {
        self.inner.ptr_eq(&other.inner)
    }
}

impl<T> fmt::Debug for Deferred<T>
where
    T: Clone + Send + Sync + fmt::Debug + 'static,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.peek() {
            Some(outcome) => f.debug_tuple("Deferred").field(outcome).finish(),
            None => f.write_str("Deferred(<pending>)"),
        }
    }
}

/// Bound `future` by `budget`, failing with [`FetchError::Timeout`]
pub async fn with_timeout<T, F>(budget: Duration, future: F) -> FetchResult<T>
where
    F: Future<Output = FetchResult<T>>,
{
    match tokio::time::timeout(budget, future).await {
        Ok(outcome) => outcome,
        Err(_) => Err(FetchError::Timeout {
            after_ms: u64::try_from(budget.as_millis()).unwrap_or(u64::MAX),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::oneshot;

    #[tokio::test]
    async fn ready_and_failed_resolve_immediately() {
        assert_eq!(Deferred::ready(3).resolve().await, Ok(3));
        assert_eq!(
            Deferred::<u8>::failed(FetchError::Cancelled).resolve().await,
            Err(FetchError::Cancelled)
        );
    }

    #[tokio::test]
    async fn clones_share_one_outcome() {
        let (tx, rx) = oneshot::channel::<u32>();
        let deferred = Deferred::spawn(async move { rx.await.map_err(|_| FetchError::Cancelled) });
        let clone = deferred.clone();

        assert!(deferred.same_fetch(&clone));
        assert!(clone.peek().is_none());

        tx.send(7).unwrap();
        assert_eq!(deferred.resolve().await, Ok(7));
        assert_eq!(clone.peek(), Some(&Ok(7)));
    }

    #[tokio::test]
    async fn independent_fetches_are_distinct() {
        let a = Deferred::ready(1);
        let b = Deferred::ready(1);
        assert!(!a.same_fetch(&b));
    }

    #[tokio::test]
    async fn aborted_task_resolves_cancelled() {
        let deferred: Deferred<u8> = Deferred::spawn(async {
            let exploded = true;
            assert!(!exploded, "source exploded");
            Ok(0)
        });
        assert_eq!(deferred.resolve().await, Err(FetchError::Cancelled));
    }

    #[tokio::test(start_paused = true)]
    async fn timeout_maps_to_fetch_error() {
        let slow = async {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok::<_, FetchError>(1)
        };
        let outcome = with_timeout(Duration::from_millis(250), slow).await;
        assert_eq!(outcome, Err(FetchError::Timeout { after_ms: 250 }));

        let fast = with_timeout(Duration::from_millis(250), async { Ok::<_, FetchError>(2) }).await;
        assert_eq!(fast, Ok(2));
    }
}
