//! Rate-limited deal store wrapper.
//!
//! Wraps any [`DealStore`] so that every call waits for a permit from a
//! governor rate limiter.

use std::num::NonZeroU32;
use std::sync::Arc;

use async_trait::async_trait;
use governor::{Quota, RateLimiter};
use nonzero_ext::nonzero;

use super::record::SubmissionRecord;
use super::store::DealStore;
use crate::error::StoreResult;

type DefaultRateLimiter = RateLimiter<
    governor::state::NotKeyed,
    governor::state::InMemoryState,
    governor::clock::DefaultClock,
>;

pub struct RateLimitedStore<S: DealStore> {
    inner: S,
    limiter: Arc<DefaultRateLimiter>,
}

impl<S: DealStore> RateLimitedStore<S> {
    /// At most `requests_per_second` calls per second; zero is treated as one.
    pub fn new(store: S, requests_per_second: u32) -> Self {
        let rate = NonZeroU32::new(requests_per_second).unwrap_or(nonzero!(1u32));
        Self::with_quota(store, Quota::per_second(rate).allow_burst(nonzero!(1u32)))
    }

    pub fn with_quota(store: S, quota: Quota) -> Self {
        Self {
            inner: store,
            limiter: Arc::new(RateLimiter::direct(quota)),
        }
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }

    async fn wait_for_permit(&self) {
        self.limiter.until_ready().await;
    }
}

#[async_trait]
impl<S: DealStore> DealStore for RateLimitedStore<S> {
    async fn find_or_create_company(&self, name: &str) -> StoreResult<String> {
        self.wait_for_permit().await;
        self.inner.find_or_create_company(name).await
    }

    async fn create_deal_record(&self, record: &SubmissionRecord) -> StoreResult<String> {
        self.wait_for_permit().await;
        self.inner.create_deal_record(record).await
    }
}

/// Extension trait for easy rate limiting.
pub trait DealStoreExt: DealStore + Sized {
    fn rate_limited(self, requests_per_second: u32) -> RateLimitedStore<Self> {
        RateLimitedStore::new(self, requests_per_second)
    }
}

impl<S: DealStore + Sized> DealStoreExt for S {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::deal::Deal;
    use crate::submission::{submit_deals, SellingMarkup};
    use crate::testing::MockDealStore;
    use std::time::Instant;

    #[tokio::test]
    async fn test_calls_are_spaced_out() {
        let store = MockDealStore::new().rate_limited(4);
        let deals: Vec<Deal> = ["A", "B"]
            .into_iter()
            .map(|partner| Deal {
                partner: partner.into(),
                cpa: Some(1.0),
                ..Default::default()
            })
            .collect();

        let start = Instant::now();
        let report = submit_deals(&store, &deals, &SellingMarkup::default()).await;

        // Four calls at 4/s with no burst: three waits of 250ms.
        assert_eq!(report.succeeded(), 2);
        assert!(start.elapsed().as_millis() >= 700, "{:?}", start.elapsed());
        assert_eq!(store.inner().records().len(), 2);
    }

    #[tokio::test]
    async fn test_zero_rate_falls_back_to_one() {
        let store = MockDealStore::new().rate_limited(0);
        assert!(store.find_or_create_company("Acme").await.is_ok());
    }
}
