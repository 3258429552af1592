//! The external deal store seam and batch submission.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use tracing::{error, info};

use super::record::{SellingMarkup, SubmissionRecord};
use crate::deal::Deal;
use crate::error::{StoreError, StoreResult};

/// Where approved deals end up.
#[async_trait]
pub trait DealStore: Send + Sync {
    /// Id of the advertiser named `name`, creating it when missing.
    async fn find_or_create_company(&self, name: &str) -> StoreResult<String>;

    /// Write one offer, returning the new record's id.
    async fn create_deal_record(&self, record: &SubmissionRecord) -> StoreResult<String>;
}

/// Result of submitting one deal.
#[derive(Debug, Clone, PartialEq)]
pub struct DealSubmission {
    pub deal: Deal,
    pub result: Result<String, StoreError>,
}

impl DealSubmission {
    pub fn succeeded(&self) -> bool {
        self.result.is_ok()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SubmissionReport {
    pub submissions: Vec<DealSubmission>,
    pub elapsed: Duration,
}

impl SubmissionReport {
    pub fn succeeded(&self) -> usize {
        self.submissions.iter().filter(|s| s.succeeded()).count()
    }

    pub fn failed(&self) -> usize {
        self.submissions.len() - self.succeeded()
    }

    pub fn any_succeeded(&self) -> bool {
        self.succeeded() > 0
    }
}

/// Submit every deal independently. A failure is recorded and the batch
/// carries on.
pub async fn submit_deals(
    store: &dyn DealStore,
    deals: &[Deal],
    markup: &SellingMarkup,
) -> SubmissionReport {
    let start = Instant::now();
    info!(count = deals.len(), "Submitting deals");

    let mut submissions = Vec::with_capacity(deals.len());
    for deal in deals {
        let result = submit_one(store, deal, markup).await;
        if let Err(err) = &result {
            error!(partner = %deal.partner, geo = %deal.geo, error = %err, "Deal submission failed");
        }
        submissions.push(DealSubmission {
            deal: deal.clone(),
            result,
        });
    }

    let report = SubmissionReport {
        submissions,
        elapsed: start.elapsed(),
    };
    info!(
        succeeded = report.succeeded(),
        failed = report.failed(),
        elapsed_ms = report.elapsed.as_millis() as u64,
        "Submission finished"
    );
    report
}

async fn submit_one(
    store: &dyn DealStore,
    deal: &Deal,
    markup: &SellingMarkup,
) -> StoreResult<String> {
    let partner = deal.partner.trim();
    if partner.is_empty() {
        return Err(StoreError::EmptyCompanyName);
    }

    let company_id = store.find_or_create_company(partner).await?;
    let record = SubmissionRecord::from_deal(deal, company_id, markup);
    store.create_deal_record(&record).await
}
