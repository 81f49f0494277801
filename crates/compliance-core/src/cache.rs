//! Read-through cache in front of the external data source using moka
//!
//! The tabular source is slow and rate limited. [`CachedSource`] keeps
//! answers per ORCID for a configurable time, collapses concurrent requests
//! for the same key into one upstream call, and never caches failures.

use crate::config::SourceConfig;
use crate::error::FetchError;
use crate::source::{ComplianceSource, ScientistLookup};
use async_trait::async_trait;
use compliance_model::{ArticleRecord, Scientist};
use moka::future::Cache;
use std::sync::Arc;
use std::time::Duration;

/// Which publication list a cached entry holds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum ArticleQuery {
    Covered,
    NotCovered,
}

/// Statistics for cache monitoring
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub article_entries: u64,
    pub scientist_entries: u64,
}

/// Caching wrapper around any [`ComplianceSource`]
#[derive(Debug)]
pub struct CachedSource<S> {
    inner: S,
    articles: Cache<(ArticleQuery, String), Arc<Vec<ArticleRecord>>>,
    scientists: Cache<String, ScientistLookup>,
    roster: Cache<(), Arc<Vec<Scientist>>>,
}

impl<S: ComplianceSource> CachedSource<S> {
    /// Create cache with `max_capacity` entries per query kind and `ttl`
    #[must_use]
    pub fn new(inner: S, max_capacity: u64, ttl: Duration) -> Self {
        Self {
            inner,
            articles: Cache::builder()
                .max_capacity(max_capacity)
                .time_to_live(ttl)
                .build(),
            scientists: Cache::builder()
                .max_capacity(max_capacity)
                .time_to_live(ttl)
                .build(),
            roster: Cache::builder().max_capacity(1).time_to_live(ttl).build(),
        }
    }

    /// Create from the `[source]` config section
    #[must_use]
    pub fn from_config(inner: S, config: &SourceConfig) -> Self {
        Self::new(inner, config.cache_capacity, config.cache_ttl())
    }

    /// Wrapped source
    #[inline]
    #[must_use]
    pub fn inner(&self) -> &S {
        &self.inner
    }

    /// Drop every cached answer
    pub fn invalidate_all(&self) {
        self.articles.invalidate_all();
        self.scientists.invalidate_all();
        self.roster.invalidate_all();
    }

    /// Drop the cached answers for one ORCID
    pub async fn invalidate_orcid(&self, orcid: &str) {
        self.articles
            .invalidate(&(ArticleQuery::Covered, orcid.to_string()))
            .await;
        self.articles
            .invalidate(&(ArticleQuery::NotCovered, orcid.to_string()))
            .await;
        self.scientists.invalidate(orcid).await;
    }

    /// Approximate entry counts
    #[must_use]
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            article_entries: self.articles.entry_count(),
            scientist_entries: self.scientists.entry_count(),
        }
    }

    async fn articles(
        &self,
        query: ArticleQuery,
        orcid: &str,
    ) -> Result<Vec<ArticleRecord>, FetchError> {
        let loaded = self
            .articles
            .try_get_with((query, orcid.to_string()), async {
                tracing::debug!(?query, orcid, "article cache miss");
                let records = match query {
                    ArticleQuery::Covered => self.inner.covered_by_policy(orcid).await?,
                    ArticleQuery::NotCovered => self.inner.not_covered_by_policy(orcid).await?,
                };
                Ok::<_, FetchError>(Arc::new(records))
            })
            .await
            .map_err(unshare)?;
        Ok(loaded.as_ref().clone())
    }
}

#[async_trait]
impl<S: ComplianceSource> ComplianceSource for CachedSource<S> {
    async fn covered_by_policy(&self, orcid: &str) -> Result<Vec<ArticleRecord>, FetchError> {
        self.articles(ArticleQuery::Covered, orcid).await
    }

    async fn not_covered_by_policy(&self, orcid: &str) -> Result<Vec<ArticleRecord>, FetchError> {
        self.articles(ArticleQuery::NotCovered, orcid).await
    }

    async fn scientist_by_orcid(&self, orcid: &str) -> Result<ScientistLookup, FetchError> {
        self.scientists
            .try_get_with(orcid.to_string(), self.inner.scientist_by_orcid(orcid))
            .await
            .map_err(unshare)
    }

    async fn all_scientists(&self) -> Result<Vec<Scientist>, FetchError> {
        let roster = self
            .roster
            .try_get_with((), async {
                Ok::<_, FetchError>(Arc::new(self.inner.all_scientists().await?))
            })
            .await
            .map_err(unshare)?;
        Ok(roster.as_ref().clone())
    }
}

fn unshare(error: Arc<FetchError>) -> FetchError {
    error.as_ref().clone()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Debug, Default)]
    struct CountingSource {
        calls: AtomicUsize,
        fail: bool,
    }

    #[async_trait]
    impl ComplianceSource for CountingSource {
        async fn covered_by_policy(&self, _orcid: &str) -> Result<Vec<ArticleRecord>, FetchError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(FetchError::upstream("rate limited"));
            }
            Ok(vec![ArticleRecord::new("a-1", true)])
        }

        async fn not_covered_by_policy(
            &self,
            _orcid: &str,
        ) -> Result<Vec<ArticleRecord>, FetchError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(vec![])
        }

        async fn scientist_by_orcid(&self, orcid: &str) -> Result<ScientistLookup, FetchError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(ScientistLookup::found(Scientist::new("s-1", "Ada", orcid)))
        }

        async fn all_scientists(&self) -> Result<Vec<Scientist>, FetchError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(vec![Scientist::new("s-1", "Ada", "0000-1")])
        }
    }

    fn cached(fail: bool) -> CachedSource<CountingSource> {
        CachedSource::new(
            CountingSource {
                calls: AtomicUsize::new(0),
                fail,
            },
            100,
            Duration::from_secs(60),
        )
    }

    #[tokio::test]
    async fn repeated_queries_hit_cache() {
        let source = cached(false);
        for _ in 0..3 {
            assert_eq!(source.covered_by_policy("0000-1").await.unwrap().len(), 1);
        }
        assert_eq!(source.inner().calls.load(Ordering::SeqCst), 1);

        source.not_covered_by_policy("0000-1").await.unwrap();
        assert_eq!(source.inner().calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn failures_are_not_cached() {
        let source = cached(true);
        assert!(source.covered_by_policy("0000-1").await.is_err());
        assert!(source.covered_by_policy("0000-1").await.is_err());
        assert_eq!(source.inner().calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn scientist_exists_goes_through_cache() {
        let source = cached(false);
        assert!(source.scientist_exists("0000-9").await.unwrap());
        assert!(source.scientist_exists("0000-9").await.unwrap());
        assert_eq!(source.inner().calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn invalidation_forces_reload() {
        let source = cached(false);
        source.covered_by_policy("0000-1").await.unwrap();
        source.all_scientists().await.unwrap();

        source.invalidate_orcid("0000-1").await;
        source.covered_by_policy("0000-1").await.unwrap();
        assert_eq!(source.inner().calls.load(Ordering::SeqCst), 3);

        source.invalidate_all();
        source.all_scientists().await.unwrap();
        assert_eq!(source.inner().calls.load(Ordering::SeqCst), 4);
    }
}
